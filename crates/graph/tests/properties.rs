use chatmap_graph::{
    filter_records, reconcile, DateRange, FilterCriteria, Projector, RecordStore,
};
use chatmap_protocol::{ChatDataset, RawChatRecord, RawChatRef, TagsDoc};
use chrono::NaiveDate;
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::HashSet;

const NAMES: [&str; 4] = ["alpha plan", "Beta notes", "ALPHA retro", "gamma"];
const TAGS: [&str; 2] = ["x", "y"];

#[derive(Debug, Clone)]
struct ChatShape {
    parent: Option<Index>,
    dangling: bool,
    name: usize,
    day: u32,
    favorite: bool,
    tag: Option<usize>,
    /// Declared child ref; never turned into a parent link
    child: Option<Index>,
}

fn chat_shape() -> impl Strategy<Value = ChatShape> {
    (
        proptest::option::of(any::<Index>()),
        proptest::bool::weighted(0.1),
        0..NAMES.len(),
        1u32..=28,
        any::<bool>(),
        proptest::option::of(0..TAGS.len()),
        proptest::option::weighted(0.2, any::<Index>()),
    )
        .prop_map(|(parent, dangling, name, day, favorite, tag, child)| ChatShape {
            parent,
            dangling,
            name,
            day,
            favorite,
            tag,
            child,
        })
}

fn build_store(shapes: &[ChatShape]) -> RecordStore {
    let mut favorites = Vec::new();
    let mut tags = TagsDoc::new();
    let total = shapes.len();
    let chats = shapes
        .iter()
        .enumerate()
        .map(|(i, shape)| {
            let id = format!("c{i}");
            let parent = if shape.dangling {
                Some(RawChatRef::new(format!("prompts/ghost{i}")))
            } else {
                shape.parent
                    .as_ref()
                    .filter(|_| i > 0)
                    .map(|p| RawChatRef::new(format!("prompts/c{}", p.index(i))))
            };
            if shape.favorite {
                favorites.push(id.clone());
            }
            if let Some(t) = shape.tag {
                tags.insert(id.clone(), vec![TAGS[t].to_string()]);
            }
            RawChatRecord {
                file_name: NAMES[shape.name].to_string(),
                file_id: id,
                parent,
                children: shape
                    .child
                    .iter()
                    .map(|c| RawChatRef::new(format!("prompts/c{}", c.index(total))))
                    .collect(),
                created_date: None,
                modified_date: Some(format!("2024-03-{:02}T12:00:00Z", shape.day)),
                description: None,
            }
        })
        .collect();
    RecordStore::load(
        &ChatDataset {
            folder_id: None,
            chats,
        },
        favorites,
        tags,
        TAGS.iter().map(|t| t.to_string()).collect(),
    )
}

fn criteria() -> impl Strategy<Value = FilterCriteria> {
    (
        proptest::option::of(prop_oneof![Just("alpha"), Just("notes"), Just("A")]),
        proptest::option::of(0..TAGS.len()),
        any::<bool>(),
        any::<bool>(),
        proptest::option::of(1u32..=28),
        proptest::option::of(1u32..=28),
    )
        .prop_map(|(query, tag, favorites_only, has_branch_only, start, end)| FilterCriteria {
            text_query: query.unwrap_or_default().to_string(),
            tag: tag.map(|t| TAGS[t].to_string()),
            favorites_only,
            has_branch_only,
            date_range: DateRange {
                start: start.and_then(|d| NaiveDate::from_ymd_opt(2024, 3, d)),
                end: end.and_then(|d| NaiveDate::from_ymd_opt(2024, 3, d)),
            },
        })
}

fn relaxations(criteria: &FilterCriteria) -> Vec<FilterCriteria> {
    let mut out = Vec::new();
    let mut c = criteria.clone();
    c.text_query.clear();
    out.push(c);
    let mut c = criteria.clone();
    c.tag = None;
    out.push(c);
    let mut c = criteria.clone();
    c.favorites_only = false;
    out.push(c);
    let mut c = criteria.clone();
    c.has_branch_only = false;
    out.push(c);
    let mut c = criteria.clone();
    c.date_range.start = None;
    out.push(c);
    let mut c = criteria.clone();
    c.date_range.end = None;
    out.push(c);
    out
}

proptest! {
    #[test]
    fn reconciled_sets_are_ancestor_closed(
        shapes in prop::collection::vec(chat_shape(), 1..40),
        picks in prop::collection::vec(any::<Index>(), 0..20),
    ) {
        let store = build_store(&shapes);
        let subset: Vec<usize> = picks.iter().map(|p| p.index(store.len())).collect();
        let visible = reconcile(&store, subset.iter().copied());

        for idx in subset {
            prop_assert!(visible.contains(idx));
        }
        for idx in visible.iter() {
            if let Some(parent) = store.parent_of(idx) {
                prop_assert!(visible.contains(parent), "parent of {} missing", idx);
            }
        }
    }

    #[test]
    fn reconcile_is_idempotent(
        shapes in prop::collection::vec(chat_shape(), 1..40),
        picks in prop::collection::vec(any::<Index>(), 0..20),
    ) {
        let store = build_store(&shapes);
        let once = reconcile(&store, picks.iter().map(|p| p.index(store.len())));
        let twice = reconcile(&store, once.iter().collect::<Vec<_>>());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn relaxing_one_criterion_never_shrinks_matches(
        shapes in prop::collection::vec(chat_shape(), 1..40),
        strict in criteria(),
    ) {
        let store = build_store(&shapes);
        let base: HashSet<usize> = filter_records(&store, &strict).into_iter().collect();
        for relaxed in relaxations(&strict) {
            let wider: HashSet<usize> = filter_records(&store, &relaxed).into_iter().collect();
            prop_assert!(base.is_subset(&wider), "relaxed {:?} lost matches", relaxed);
        }
    }

    #[test]
    fn projected_edges_connect_visible_nodes(
        shapes in prop::collection::vec(chat_shape(), 1..40),
        c in criteria(),
    ) {
        let store = build_store(&shapes);
        let visible = reconcile(&store, filter_records(&store, &c));
        let frame = Projector::default().project(&store, &visible);
        let ids: HashSet<&str> = frame.nodes.iter().map(|n| n.id.as_str()).collect();

        prop_assert_eq!(frame.nodes.len(), visible.len());
        prop_assert_eq!(frame.counter.total, store.len());
        for edge in &frame.edges {
            prop_assert!(ids.contains(edge.from.as_str()));
            prop_assert!(ids.contains(edge.to.as_str()));
        }
    }

    #[test]
    fn branch_filter_matches_declared_and_resolved_links(
        shapes in prop::collection::vec(chat_shape(), 1..40),
    ) {
        let store = build_store(&shapes);
        let only_branches = FilterCriteria {
            has_branch_only: true,
            ..FilterCriteria::default()
        };
        let matched: HashSet<usize> = filter_records(&store, &only_branches).into_iter().collect();

        for idx in 0..store.len() {
            let record = store.get(idx).unwrap();
            let has_resolved_child = (0..store.len()).any(|j| store.parent_of(j) == Some(idx));
            let expected = record.parent_ref.is_some()
                || !record.child_refs.is_empty()
                || has_resolved_child;
            prop_assert_eq!(matched.contains(&idx), expected, "chat {}", idx);
            if shapes[idx].child.is_some() {
                prop_assert!(matched.contains(&idx), "declared child ignored for {}", idx);
            }
        }
    }
}

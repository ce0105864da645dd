use chatmap_graph::{run_pipeline, DateRange, FilterCriteria, Projector, RecordStore};
use chatmap_protocol::{ChatDataset, EdgeDescriptor, RawChatRecord, RawChatRef, TagsDoc};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

fn chat(id: &str, name: &str, parent: Option<&str>, modified: Option<&str>) -> RawChatRecord {
    RawChatRecord {
        file_name: name.to_string(),
        file_id: id.to_string(),
        parent: parent.map(RawChatRef::new),
        children: Vec::new(),
        created_date: None,
        modified_date: modified.map(str::to_string),
        description: None,
    }
}

fn chain() -> RecordStore {
    let dataset = ChatDataset {
        folder_id: None,
        chats: vec![
            chat("A", "Kickoff", None, None),
            chat("B", "Follow-up", Some("prompts/A"), None),
            chat("C", "Deep dive", Some("prompts/B"), None),
        ],
    };
    RecordStore::load(&dataset, Vec::new(), TagsDoc::new(), Vec::new())
}

fn edge(from: &str, to: &str) -> EdgeDescriptor {
    EdgeDescriptor {
        from: from.to_string(),
        to: to.to_string(),
    }
}

#[test]
fn text_match_on_leaf_pulls_in_ancestors() {
    let store = chain();
    let criteria = FilterCriteria {
        text_query: "deep".into(),
        ..Default::default()
    };
    let (visible, frame) = run_pipeline(&store, &criteria, &Projector::default());

    let ids: Vec<&str> = visible.ids(&store).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert_eq!(frame.edges, vec![edge("A", "B"), edge("B", "C")]);
}

#[test]
fn no_match_renders_empty_graph_with_counter() {
    let store = chain();
    let criteria = FilterCriteria {
        text_query: "nothing like this".into(),
        ..Default::default()
    };
    let (visible, frame) = run_pipeline(&store, &criteria, &Projector::default());

    assert!(visible.is_empty());
    assert!(frame.nodes.is_empty());
    assert!(frame.edges.is_empty());
    assert_eq!(frame.counter.to_string(), "0 of 3");
}

#[test]
fn start_date_boundary_is_midnight() {
    let dataset = ChatDataset {
        folder_id: None,
        chats: vec![
            chat("late", "Late", None, Some("2024-01-01T23:59:59Z")),
            chat("early", "Early", None, Some("2024-01-02T00:00:00Z")),
        ],
    };
    let store = RecordStore::load(&dataset, Vec::new(), TagsDoc::new(), Vec::new());
    let criteria = FilterCriteria {
        date_range: DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 2),
            end: None,
        },
        ..Default::default()
    };
    let (visible, _) = run_pipeline(&store, &criteria, &Projector::default());

    assert_eq!(visible.ids(&store).collect::<Vec<_>>(), vec!["early"]);
}

#[test]
fn favorite_toggle_does_not_bypass_tag_filter() {
    let mut tags = TagsDoc::new();
    tags.insert("C".into(), vec!["keep".into()]);
    let dataset = ChatDataset {
        folder_id: None,
        chats: vec![
            chat("A", "Kickoff", None, None),
            chat("B", "Follow-up", Some("prompts/A"), None),
            chat("C", "Deep dive", Some("prompts/A"), None),
        ],
    };
    let mut store = RecordStore::load(&dataset, Vec::new(), tags, vec!["keep".into()]);
    let criteria = FilterCriteria {
        tag: Some("keep".into()),
        ..Default::default()
    };

    store.toggle_favorite("B").unwrap();
    let (visible, frame) = run_pipeline(&store, &criteria, &Projector::default());

    assert!(!visible.contains_id(&store, "B"));
    assert!(frame.node("B").is_none());
    assert_eq!(visible.ids(&store).collect::<Vec<_>>(), vec!["A", "C"]);
}

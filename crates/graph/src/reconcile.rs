use crate::store::RecordStore;
use std::collections::BTreeSet;

/// Records displayed in one cycle, closed under resolved ancestors.
///
/// Members are load-order indices into the [`RecordStore`]; iteration follows load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    members: BTreeSet<usize>,
}

impl VisibleSet {
    pub fn contains(&self, idx: usize) -> bool {
        self.members.contains(&idx)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    pub fn ids<'s>(&'s self, store: &'s RecordStore) -> impl Iterator<Item = &'s str> + 's {
        self.iter()
            .filter_map(move |idx| store.get(idx).map(|r| r.id.as_str()))
    }

    pub fn contains_id(&self, store: &RecordStore, id: &str) -> bool {
        store.index_of(id).is_some_and(|idx| self.contains(idx))
    }
}

/// Restore ancestor closure over a filtered subset.
///
/// Each surviving record's parent chain is walked upward, adding missing ancestors, and
/// the walk stops at the first ancestor already present. Indices outside the store are
/// ignored. Running it again on its own output returns the same set.
pub fn reconcile(store: &RecordStore, filtered: impl IntoIterator<Item = usize>) -> VisibleSet {
    let seeds: Vec<usize> = filtered
        .into_iter()
        .filter(|&idx| idx < store.len())
        .collect();
    let mut members: BTreeSet<usize> = seeds.iter().copied().collect();
    let matched = members.len();

    for &seed in &seeds {
        let mut current = store.parent_of(seed);
        while let Some(parent) = current {
            if !members.insert(parent) {
                break;
            }
            current = store.parent_of(parent);
        }
    }

    log::debug!(
        "Reconciled {matched} matching chats into {} visible",
        members.len()
    );
    VisibleSet { members }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmap_protocol::{ChatDataset, RawChatRecord, RawChatRef, TagsDoc};
    use pretty_assertions::assert_eq;

    fn store(links: &[(&str, Option<&str>)]) -> RecordStore {
        let chats = links
            .iter()
            .map(|(id, parent)| RawChatRecord {
                file_name: id.to_string(),
                file_id: id.to_string(),
                parent: parent.map(|p| RawChatRef::new(format!("prompts/{p}"))),
                children: Vec::new(),
                created_date: None,
                modified_date: None,
                description: None,
            })
            .collect();
        RecordStore::load(
            &ChatDataset {
                folder_id: None,
                chats,
            },
            Vec::new(),
            TagsDoc::new(),
            Vec::new(),
        )
    }

    fn ids(store: &RecordStore, set: &VisibleSet) -> Vec<String> {
        set.ids(store).map(str::to_string).collect()
    }

    #[test]
    fn restores_missing_ancestors() {
        let store = store(&[("A", None), ("B", Some("A")), ("C", Some("B")), ("D", None)]);
        let visible = reconcile(&store, [2]);
        assert_eq!(ids(&store, &visible), vec!["A", "B", "C"]);
    }

    #[test]
    fn empty_input_stays_empty() {
        let store = store(&[("A", None)]);
        assert!(reconcile(&store, Vec::<usize>::new()).is_empty());
    }

    #[test]
    fn dangling_parent_is_effective_root() {
        let store = store(&[("A", Some("missing")), ("B", Some("A"))]);
        let visible = reconcile(&store, [1]);
        assert_eq!(ids(&store, &visible), vec!["A", "B"]);
    }

    #[test]
    fn cycles_terminate() {
        let store = store(&[("A", Some("B")), ("B", Some("A")), ("C", Some("A"))]);
        let visible = reconcile(&store, [2]);
        assert_eq!(visible.len(), 3);
    }

    #[test]
    fn idempotent_on_own_output() {
        let store = store(&[("A", None), ("B", Some("A")), ("C", Some("B")), ("D", Some("A"))]);
        let once = reconcile(&store, [2, 3]);
        let twice = reconcile(&store, once.iter().collect::<Vec<_>>());
        assert_eq!(once, twice);
    }

    #[test]
    fn ignores_out_of_range_indices() {
        let store = store(&[("A", None)]);
        let visible = reconcile(&store, [0, 7]);
        assert_eq!(visible.len(), 1);
        assert!(visible.contains_id(&store, "A"));
    }
}

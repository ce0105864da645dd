use crate::error::{GraphError, Result};
use crate::types::{normalize_tag, AnnotationOverlay, ChatRecord};
use chatmap_protocol::{ChatDataset, FavoritesDoc, RecordDetail, TagsDoc, VocabularyDoc};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

/// Full dataset of one session plus the mutable annotation overlay.
///
/// Records are immutable once loaded and addressed by their load-order index. The
/// resolved parent graph lives in `forest` (edge = parent -> child); node `i` of the
/// forest is record `i`.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<ChatRecord>,
    index: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    forest: DiGraph<usize, ()>,
    overlay: AnnotationOverlay,
    root: Option<usize>,
    unresolved_parents: usize,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a complete store from the four bulk-load documents.
    ///
    /// Records without a usable id and duplicate ids are skipped. Parent refs that do not
    /// resolve to another loaded record leave the record as a root.
    pub fn load(
        dataset: &ChatDataset,
        favorites: FavoritesDoc,
        tags: TagsDoc,
        vocabulary: VocabularyDoc,
    ) -> Self {
        let mut records = Vec::with_capacity(dataset.chats.len());
        let mut index = HashMap::with_capacity(dataset.chats.len());

        for raw in &dataset.chats {
            let Some(record) = ChatRecord::from_raw(raw) else {
                log::warn!("Skipping chat without id: {:?}", raw.file_name);
                continue;
            };
            if index.contains_key(&record.id) {
                log::warn!("Skipping duplicate chat id {}", record.id);
                continue;
            }
            index.insert(record.id.clone(), records.len());
            records.push(record);
        }

        let mut forest = DiGraph::with_capacity(records.len(), records.len());
        for idx in 0..records.len() {
            forest.add_node(idx);
        }

        let mut parents = Vec::with_capacity(records.len());
        let mut unresolved_parents = 0;
        for (idx, record) in records.iter().enumerate() {
            let resolved = match record.parent_id() {
                Some(parent_id) => match index.get(parent_id) {
                    Some(&p) if p != idx => Some(p),
                    Some(_) => {
                        log::debug!("Chat {} names itself as parent, treating as root", record.id);
                        None
                    }
                    None => {
                        log::debug!(
                            "Chat {} references missing parent {parent_id}, treating as root",
                            record.id
                        );
                        unresolved_parents += 1;
                        None
                    }
                },
                None => None,
            };
            if let Some(p) = resolved {
                forest.add_edge(NodeIndex::new(p), NodeIndex::new(idx), ());
            }
            parents.push(resolved);
        }

        if unresolved_parents > 0 {
            log::warn!("{unresolved_parents} chats reference missing parents; shown as roots");
        }
        if is_cyclic_directed(&forest) {
            log::warn!("Parent links contain a cycle; ancestor walks stop at repeated chats");
        }

        let root = records
            .iter()
            .position(ChatRecord::is_declared_root)
            .or(if records.is_empty() { None } else { Some(0) });

        log::info!(
            "Loaded {} chats ({} links, {} favorites, {} tags)",
            records.len(),
            forest.edge_count(),
            favorites.len(),
            vocabulary.len()
        );

        Self {
            records,
            index,
            parents,
            forest,
            overlay: AnnotationOverlay::from_docs(favorites, tags, vocabulary),
            root,
            unresolved_parents,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ChatRecord] {
        &self.records
    }

    pub fn get(&self, idx: usize) -> Option<&ChatRecord> {
        self.records.get(idx)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn record(&self, id: &str) -> Option<&ChatRecord> {
        self.index_of(id).and_then(|idx| self.records.get(idx))
    }

    /// Resolved parent of a record; `None` for roots and dangling refs.
    pub fn parent_of(&self, idx: usize) -> Option<usize> {
        self.parents.get(idx).copied().flatten()
    }

    /// True when the record has a parent or at least one child.
    ///
    /// Declared refs count even when dangling; resolved children count even when the
    /// parent's `child_refs` list is empty.
    pub fn has_branch(&self, idx: usize) -> bool {
        let Some(record) = self.records.get(idx) else {
            return false;
        };
        record.parent_ref.is_some()
            || !record.child_refs.is_empty()
            || self
                .forest
                .neighbors_directed(NodeIndex::new(idx), Direction::Outgoing)
                .next()
                .is_some()
    }

    pub fn unresolved_parent_count(&self) -> usize {
        self.unresolved_parents
    }

    /// Session root: first chat without a parent ref, else the first chat loaded.
    pub fn root(&self) -> Option<&ChatRecord> {
        self.root.and_then(|idx| self.records.get(idx))
    }

    /// Default camera target for the first draw.
    pub fn default_focus_id(&self) -> Option<&str> {
        self.root().map(|r| r.id.as_str())
    }

    pub fn overlay(&self) -> &AnnotationOverlay {
        &self.overlay
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.overlay.is_favorite(id)
    }

    pub fn tags_of(&self, id: &str) -> Vec<String> {
        self.overlay.tags_of(id)
    }

    pub fn detail(&self, id: &str) -> Option<RecordDetail> {
        let record = self.record(id)?;
        Some(RecordDetail {
            id: record.id.clone(),
            name: record.display_name.clone(),
            created_at: record.created_at.clone(),
            modified_at: record.modified_at.clone(),
            description: record.description.clone(),
            favorite: self.overlay.is_favorite(&record.id),
            tags: self.overlay.tags_of(&record.id),
        })
    }

    fn require(&self, id: &str) -> Result<String> {
        self.record(id)
            .map(|r| r.id.clone())
            .ok_or_else(|| GraphError::UnknownRecord(id.to_string()))
    }

    /// Flip favorite membership; returns the new state.
    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool> {
        let id = self.require(id)?;
        if self.overlay.favorites.remove(&id) {
            Ok(false)
        } else {
            self.overlay.favorites.insert(id);
            Ok(true)
        }
    }

    /// Assign a tag; `Ok(false)` when it was already assigned.
    pub fn add_tag(&mut self, id: &str, tag: &str) -> Result<bool> {
        let id = self.require(id)?;
        let tag = normalize_tag(tag).ok_or_else(|| GraphError::InvalidTag(tag.to_string()))?;
        Ok(self
            .overlay
            .tags_by_record
            .entry(id)
            .or_default()
            .insert(tag.to_string()))
    }

    /// Unassign a tag; `Ok(false)` when it was not assigned.
    pub fn remove_tag(&mut self, id: &str, tag: &str) -> Result<bool> {
        let id = self.require(id)?;
        let tag = normalize_tag(tag).ok_or_else(|| GraphError::InvalidTag(tag.to_string()))?;
        let Some(tags) = self.overlay.tags_by_record.get_mut(&id) else {
            return Ok(false);
        };
        let removed = tags.remove(tag);
        if tags.is_empty() {
            self.overlay.tags_by_record.remove(&id);
        }
        Ok(removed)
    }

    pub fn has_global_tag(&self, tag: &str) -> bool {
        normalize_tag(tag).is_some_and(|t| self.overlay.vocabulary.contains(t))
    }

    /// Add a tag to the vocabulary; `Ok(false)` when already known.
    pub fn add_global_tag(&mut self, tag: &str) -> Result<bool> {
        let tag = normalize_tag(tag).ok_or_else(|| GraphError::InvalidTag(tag.to_string()))?;
        Ok(self.overlay.vocabulary.insert(tag.to_string()))
    }

    /// Drop a tag from the vocabulary and from every record that carries it.
    ///
    /// Returns `Ok(false)` when nothing changed.
    pub fn remove_global_tag(&mut self, tag: &str) -> Result<bool> {
        let tag = normalize_tag(tag).ok_or_else(|| GraphError::InvalidTag(tag.to_string()))?;
        let in_vocabulary = self.overlay.vocabulary.remove(tag);

        let mut untagged = 0;
        self.overlay.tags_by_record.retain(|_, tags| {
            if tags.remove(tag) {
                untagged += 1;
            }
            !tags.is_empty()
        });
        log::debug!("Removed tag {tag:?} from vocabulary and {untagged} chats");

        Ok(in_vocabulary || untagged > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmap_protocol::{RawChatRecord, RawChatRef};
    use pretty_assertions::assert_eq;

    fn chat(id: &str, parent: Option<&str>) -> RawChatRecord {
        RawChatRecord {
            file_name: id.to_uppercase(),
            file_id: id.into(),
            parent: parent.map(|p| RawChatRef::new(format!("prompts/{p}"))),
            children: Vec::new(),
            created_date: None,
            modified_date: None,
            description: None,
        }
    }

    fn store(chats: Vec<RawChatRecord>) -> RecordStore {
        let dataset = ChatDataset {
            folder_id: None,
            chats,
        };
        RecordStore::load(&dataset, Vec::new(), TagsDoc::new(), Vec::new())
    }

    #[test]
    fn resolves_namespaced_parents() {
        let store = store(vec![chat("a", None), chat("b", Some("a")), chat("c", Some("b"))]);
        assert_eq!(store.parent_of(1), Some(0));
        assert_eq!(store.parent_of(2), Some(1));
        assert!(store.has_branch(0));
        assert_eq!(store.default_focus_id(), Some("a"));
    }

    #[test]
    fn dangling_and_self_parents_become_roots() {
        let store = store(vec![chat("a", Some("ghost")), chat("b", Some("b"))]);
        assert_eq!(store.parent_of(0), None);
        assert_eq!(store.parent_of(1), None);
        assert_eq!(store.unresolved_parent_count(), 1);
        // Both declare a parent, so neither is a declared root.
        assert_eq!(store.default_focus_id(), Some("a"));
        assert!(store.has_branch(0));
    }

    #[test]
    fn root_is_first_chat_without_parent() {
        let store = store(vec![chat("b", Some("a")), chat("a", None)]);
        assert_eq!(store.default_focus_id(), Some("a"));
        assert!(RecordStore::new().default_focus_id().is_none());
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let store = store(vec![chat("a", None), chat("a", Some("x"))]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.parent_of(0), None);
    }

    #[test]
    fn has_branch_uses_parent_pointers_as_truth() {
        let store = store(vec![chat("a", None), chat("b", Some("a")), chat("c", None)]);
        assert!(store.has_branch(0));
        assert!(store.has_branch(1));
        assert!(!store.has_branch(2));
    }

    #[test]
    fn declared_children_alone_make_a_branch() {
        let mut lister = chat("a", None);
        lister.children = vec![RawChatRef::new("prompts/ghost")];
        let store = store(vec![lister, chat("b", None)]);

        // No parent links at all, only a declared (dangling) child.
        assert_eq!(store.parent_of(1), None);
        assert!(store.has_branch(0));
        assert!(!store.has_branch(1));
    }

    #[test]
    fn toggle_favorite_twice_restores() {
        let mut store = store(vec![chat("a", None)]);
        assert_eq!(store.toggle_favorite("a"), Ok(true));
        assert!(store.is_favorite("a"));
        assert_eq!(store.toggle_favorite("a"), Ok(false));
        assert!(!store.is_favorite("a"));
        assert_eq!(
            store.toggle_favorite("zzz"),
            Err(GraphError::UnknownRecord("zzz".into()))
        );
    }

    #[test]
    fn tag_mutations_are_idempotent() {
        let mut store = store(vec![chat("a", None)]);
        assert_eq!(store.add_tag("a", "work"), Ok(true));
        assert_eq!(store.add_tag("a", " work "), Ok(false));
        assert_eq!(store.tags_of("a"), vec!["work".to_string()]);
        assert_eq!(store.remove_tag("a", "other"), Ok(false));
        assert_eq!(store.remove_tag("a", "work"), Ok(true));
        assert!(store.overlay().tags_by_record.is_empty());
        assert_eq!(store.add_tag("a", "  "), Err(GraphError::InvalidTag("  ".into())));
    }

    #[test]
    fn global_tag_removal_cascades() {
        let mut store = store(vec![chat("a", None), chat("b", None)]);
        store.add_global_tag("work").unwrap();
        store.add_global_tag("alpha").unwrap();
        assert_eq!(store.add_global_tag("work"), Ok(false));
        assert_eq!(
            store.overlay().vocabulary_doc(),
            vec!["alpha".to_string(), "work".to_string()]
        );

        store.add_tag("a", "work").unwrap();
        store.add_tag("b", "work").unwrap();
        store.add_tag("b", "alpha").unwrap();

        assert_eq!(store.remove_global_tag("work"), Ok(true));
        assert!(!store.has_global_tag("work"));
        assert!(store.tags_of("a").is_empty());
        assert_eq!(store.tags_of("b"), vec!["alpha".to_string()]);
        assert_eq!(store.remove_global_tag("work"), Ok(false));
    }

    #[test]
    fn detail_carries_annotations() {
        let mut store = store(vec![chat("a", None)]);
        store.toggle_favorite("a").unwrap();
        store.add_tag("a", "x").unwrap();
        let detail = store.detail("a").unwrap();
        assert_eq!(detail.name, "A");
        assert!(detail.favorite);
        assert_eq!(detail.tags, vec!["x".to_string()]);
        assert!(store.detail("nope").is_none());
    }
}

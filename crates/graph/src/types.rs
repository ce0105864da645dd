use chatmap_protocol::{
    normalize_opt_ref, normalize_ref, FavoritesDoc, RawChatRecord, TagsDoc, VocabularyDoc,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One conversation or branch, normalized from its ingestion form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    /// Canonical id (namespace stripped)
    pub id: String,

    /// Human-readable name, possibly carrying repeated branch markers
    pub display_name: String,

    /// Timestamps exactly as ingested (ISO 8601)
    pub created_at: Option<String>,
    pub modified_at: Option<String>,

    /// `modified_at` parsed for date filtering; `None` when missing or unparseable
    pub modified: Option<DateTime<Utc>>,

    /// Free text, never empty
    pub description: Option<String>,

    /// Parent reference as ingested (may be namespaced or dangling)
    pub parent_ref: Option<String>,

    /// Canonical ids of declared children
    pub child_refs: Vec<String>,

    /// Lowercased display name for substring matching
    pub(crate) search_key: String,
}

impl ChatRecord {
    /// Normalize an ingested record. Returns `None` when it has no usable id.
    pub fn from_raw(raw: &RawChatRecord) -> Option<Self> {
        let id = normalize_ref(&raw.file_id)?.to_string();
        let description = raw
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let parent_ref = raw
            .parent_ref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let child_refs = raw
            .child_refs()
            .filter_map(normalize_ref)
            .map(str::to_string)
            .collect();

        Some(Self {
            search_key: raw.file_name.to_lowercase(),
            id,
            display_name: raw.file_name.clone(),
            created_at: raw.created_date.clone(),
            modified_at: raw.modified_date.clone(),
            modified: raw.modified_date.as_deref().and_then(parse_timestamp),
            description,
            parent_ref,
            child_refs,
        })
    }

    /// Canonical id of the declared parent, without checking that it exists.
    pub fn parent_id(&self) -> Option<&str> {
        normalize_opt_ref(self.parent_ref.as_deref())
    }

    pub fn is_declared_root(&self) -> bool {
        self.parent_ref.is_none()
    }
}

/// Parse an ISO 8601 / RFC 3339 timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Trimmed tag, or `None` if nothing is left.
pub fn normalize_tag(tag: &str) -> Option<&str> {
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// User-controlled metadata layered over the immutable records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationOverlay {
    pub favorites: HashSet<String>,
    pub tags_by_record: HashMap<String, BTreeSet<String>>,
    pub vocabulary: BTreeSet<String>,
}

impl AnnotationOverlay {
    pub fn from_docs(favorites: FavoritesDoc, tags: TagsDoc, vocabulary: VocabularyDoc) -> Self {
        let favorites = favorites
            .iter()
            .filter_map(|id| normalize_ref(id))
            .map(str::to_string)
            .collect();

        let mut tags_by_record: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (id, tags) in tags {
            let Some(id) = normalize_ref(&id) else {
                continue;
            };
            let set: BTreeSet<String> = tags
                .iter()
                .filter_map(|t| normalize_tag(t))
                .map(str::to_string)
                .collect();
            if !set.is_empty() {
                tags_by_record.entry(id.to_string()).or_default().extend(set);
            }
        }

        let vocabulary = vocabulary
            .iter()
            .filter_map(|t| normalize_tag(t))
            .map(str::to_string)
            .collect();

        Self {
            favorites,
            tags_by_record,
            vocabulary,
        }
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    pub fn has_tag(&self, id: &str, tag: &str) -> bool {
        self.tags_by_record
            .get(id)
            .is_some_and(|tags| tags.contains(tag))
    }

    pub fn tags_of(&self, id: &str) -> Vec<String> {
        self.tags_by_record
            .get(id)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Full favorites collection, sorted for stable output.
    pub fn favorites_doc(&self) -> FavoritesDoc {
        let mut ids: Vec<String> = self.favorites.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn tags_doc(&self) -> TagsDoc {
        self.tags_by_record
            .iter()
            .filter(|(_, tags)| !tags.is_empty())
            .map(|(id, tags)| (id.clone(), tags.iter().cloned().collect()))
            .collect()
    }

    pub fn vocabulary_doc(&self) -> VocabularyDoc {
        self.vocabulary.iter().cloned().collect()
    }
}

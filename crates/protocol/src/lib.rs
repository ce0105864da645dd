//! # Chatmap Protocol
//!
//! Wire types shared between the ingestion output, the annotation service, the
//! filtering engine and whatever draws the graph.
//!
//! ```text
//! chat_data.json ──> ChatDataset ──┐
//! favorites.json ──> FavoritesDoc ─┤
//! tags.json ───────> TagsDoc ──────┼──> engine ──> ViewFrame ──> renderer
//! all_tags.json ───> VocabularyDoc ┘           └─> FocusRequest / RecordDetail
//! ```

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub mod refs;

pub use refs::{namespaced, normalize_opt_ref, normalize_ref, RECORD_NAMESPACE};

/// Favorite record ids, as persisted.
pub type FavoritesDoc = Vec<String>;

/// Tag assignments per record id, as persisted.
pub type TagsDoc = BTreeMap<String, Vec<String>>;

/// Global tag vocabulary, as persisted.
pub type VocabularyDoc = Vec<String>;

/// Reference to another record inside the dataset (`{"id": "prompts/<id>"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawChatRef {
    #[serde(default)]
    pub id: Option<String>,
}

impl RawChatRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

/// One chat as emitted by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawChatRecord {
    #[serde(default)]
    pub file_name: String,
    pub file_id: String,
    #[serde(default)]
    pub parent: Option<RawChatRef>,
    #[serde(default)]
    pub children: Vec<RawChatRef>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub modified_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RawChatRecord {
    /// Raw parent reference, if the record declares one.
    pub fn parent_ref(&self) -> Option<&str> {
        self.parent.as_ref().and_then(|p| p.id.as_deref())
    }

    /// Raw child references in declaration order, skipping empty entries.
    pub fn child_refs(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|c| c.id.as_deref())
    }
}

/// Full `chat_data.json` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatDataset {
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub chats: Vec<RawChatRecord>,
}

impl ChatDataset {
    /// Fill in missing parent links from the parents' `children` lists.
    ///
    /// A child that already names a parent keeps it; the first listing parent wins.
    /// Returns the number of links repaired.
    pub fn repair_links(&mut self) -> usize {
        let by_id: HashMap<String, usize> = self
            .chats
            .iter()
            .enumerate()
            .filter_map(|(idx, chat)| normalize_ref(&chat.file_id).map(|id| (id.to_string(), idx)))
            .collect();

        let mut fixes: BTreeMap<usize, String> = BTreeMap::new();
        for chat in &self.chats {
            let Some(parent_id) = normalize_ref(&chat.file_id) else {
                continue;
            };
            for child_ref in chat.child_refs() {
                let Some(child_id) = normalize_ref(child_ref) else {
                    continue;
                };
                let Some(&child_idx) = by_id.get(child_id) else {
                    continue;
                };
                if self.chats[child_idx].parent_ref().is_none() && !fixes.contains_key(&child_idx)
                {
                    fixes.insert(child_idx, namespaced(parent_id));
                }
            }
        }

        let repaired = fixes.len();
        for (idx, parent) in fixes {
            self.chats[idx].parent = Some(RawChatRef::new(parent));
        }
        repaired
    }
}

/// Node as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub id: String,
    pub label: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover_text: Option<String>,
}

/// Parent -> child edge between two visible nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct EdgeDescriptor {
    pub from: String,
    pub to: String,
}

/// "`visible` of `total`" counter shown next to the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VisibleCount {
    pub visible: usize,
    pub total: usize,
}

impl fmt::Display for VisibleCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.visible, self.total)
    }
}

/// Immutable presentation model for one pipeline cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ViewFrame {
    pub nodes: Vec<NodeDescriptor>,
    pub edges: Vec<EdgeDescriptor>,
    pub counter: VisibleCount,
}

impl ViewFrame {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CameraAnimation {
    pub duration_ms: u64,
    pub easing: String,
}

/// Camera move requested from the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FocusRequest {
    pub target_id: String,
    pub scale: f64,
    /// `None` means jump without animation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<CameraAnimation>,
}

impl FocusRequest {
    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }
}

/// Everything the detail panel shows for one selected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetail {
    pub id: String,
    pub name: String,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub description: Option<String>,
    pub favorite: bool,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApiStatusKind {
    Success,
    Error,
}

/// Reply body of the annotation write endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ApiStatus {
    pub status: ApiStatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiStatus {
    pub fn success() -> Self {
        Self {
            status: ApiStatusKind::Success,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatusKind::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ApiStatusKind::Success
    }
}

/// JSON Schema of the renderer contract (frame plus focus request).
pub fn renderer_schema() -> serde_json::Value {
    serde_json::json!({
        "frame": schemars::schema_for!(ViewFrame),
        "focus": schemars::schema_for!(FocusRequest),
        "detail": schemars::schema_for!(RecordDetail),
    })
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chat(id: &str, parent: Option<&str>, children: &[&str]) -> RawChatRecord {
        RawChatRecord {
            file_name: format!("chat {id}"),
            file_id: id.to_string(),
            parent: parent.map(RawChatRef::new),
            children: children.iter().map(|c| RawChatRef::new(*c)).collect(),
            created_date: None,
            modified_date: None,
            description: None,
        }
    }

    #[test]
    fn parses_ingestion_payload() {
        let raw = r#"{
            "folderId": "folder-1",
            "chats": [
                {"fileName": "Root", "fileId": "a", "parent": null, "children": [{"id": "prompts/b"}],
                 "createdDate": "2024-01-01T10:00:00.000Z", "modifiedDate": "2024-01-02T10:00:00.000Z",
                 "description": null},
                {"fileName": "Branch of Root", "fileId": "b", "parent": {"id": "prompts/a"}, "children": []}
            ]
        }"#;
        let dataset: ChatDataset = serde_json::from_str(raw).unwrap();
        assert_eq!(dataset.folder_id.as_deref(), Some("folder-1"));
        assert_eq!(dataset.chats.len(), 2);
        assert_eq!(dataset.chats[1].parent_ref(), Some("prompts/a"));
        assert_eq!(dataset.chats[0].child_refs().collect::<Vec<_>>(), vec!["prompts/b"]);
        assert_eq!(dataset.chats[1].created_date, None);
    }

    #[test]
    fn repair_links_fills_missing_parents_only() {
        let mut dataset = ChatDataset {
            folder_id: None,
            chats: vec![
                chat("a", None, &["prompts/b", "prompts/c"]),
                chat("b", None, &[]),
                chat("c", Some("prompts/x"), &[]),
                chat("d", None, &["prompts/b", "prompts/missing"]),
            ],
        };

        assert_eq!(dataset.repair_links(), 1);
        assert_eq!(dataset.chats[1].parent_ref(), Some("prompts/a"));
        assert_eq!(dataset.chats[2].parent_ref(), Some("prompts/x"));
        assert_eq!(dataset.chats[0].parent_ref(), None);
        assert_eq!(dataset.repair_links(), 0);
    }

    #[test]
    fn counter_renders_as_of() {
        let counter = VisibleCount {
            visible: 0,
            total: 3,
        };
        assert_eq!(counter.to_string(), "0 of 3");
    }

    #[test]
    fn hover_text_is_omitted_when_absent() {
        let node = NodeDescriptor {
            id: "a".into(),
            label: "A".into(),
            color: "#97C2FC".into(),
            hover_text: None,
        };
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("hoverText").is_none());
    }

    #[test]
    fn api_status_wire_shape() {
        let ok = serde_json::to_string(&ApiStatus::success()).unwrap();
        assert_eq!(ok, r#"{"status":"success"}"#);
        let err: ApiStatus =
            serde_json::from_str(r#"{"status":"error","message":"Failed to save tags"}"#).unwrap();
        assert!(!err.is_success());
    }

    #[test]
    fn renderer_schema_covers_contract() {
        let schema = renderer_schema();
        assert!(schema.get("frame").is_some());
        assert!(schema.get("focus").is_some());
    }
}

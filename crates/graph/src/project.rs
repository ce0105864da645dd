use crate::reconcile::VisibleSet;
use crate::store::RecordStore;
use chatmap_protocol::{EdgeDescriptor, NodeDescriptor, ViewFrame, VisibleCount};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FAVORITE_COLOR: &str = "#FFD700";
pub const DEFAULT_NODE_COLOR: &str = "#97C2FC";
pub const DEFAULT_BRANCH_MARKER: &str = "Branch of ";

/// Presentation settings for projected nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub favorite_color: String,
    pub default_color: String,
    /// Prefix repeated once per branch level in ingested names
    pub branch_marker: String,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            favorite_color: DEFAULT_FAVORITE_COLOR.to_string(),
            default_color: DEFAULT_NODE_COLOR.to_string(),
            branch_marker: DEFAULT_BRANCH_MARKER.to_string(),
        }
    }
}

/// Strip every leading (case-insensitive) copy of `marker` from a display name.
///
/// A copy only counts when whitespace or the end of the name follows it, so
/// "Branch office" keeps its first word. Falls back to the trimmed name when nothing
/// would be left.
pub fn display_label(name: &str, marker: &str) -> String {
    let marker = marker.trim();
    let mut rest = name.trim();
    if !marker.is_empty() {
        while let Some(head) = rest.get(..marker.len()) {
            let tail = &rest[marker.len()..];
            let at_boundary = tail.chars().next().map_or(true, char::is_whitespace);
            if !at_boundary || !head.eq_ignore_ascii_case(marker) {
                break;
            }
            rest = tail.trim_start();
        }
    }
    if rest.is_empty() {
        name.trim().to_string()
    } else {
        rest.to_string()
    }
}

/// Maps a reconciled set into node and edge descriptors.
#[derive(Debug, Clone, Default)]
pub struct Projector {
    config: ProjectionConfig,
}

impl Projector {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Node descriptor for one record; color depends only on favorite status.
    pub fn node(&self, store: &RecordStore, idx: usize) -> Option<NodeDescriptor> {
        let record = store.get(idx)?;
        let color = if store.is_favorite(&record.id) {
            &self.config.favorite_color
        } else {
            &self.config.default_color
        };
        Some(NodeDescriptor {
            id: record.id.clone(),
            label: display_label(&record.display_name, &self.config.branch_marker),
            color: color.clone(),
            hover_text: record.description.clone(),
        })
    }

    pub fn node_by_id(&self, store: &RecordStore, id: &str) -> Option<NodeDescriptor> {
        store.index_of(id).and_then(|idx| self.node(store, idx))
    }

    /// Edges only connect records that are both visible.
    pub fn project(&self, store: &RecordStore, visible: &VisibleSet) -> ViewFrame {
        let mut nodes = Vec::with_capacity(visible.len());
        let mut edges = Vec::new();

        for idx in visible.iter() {
            let Some(node) = self.node(store, idx) else {
                continue;
            };
            if let Some(parent) = store.parent_of(idx).filter(|&p| visible.contains(p)) {
                if let Some(parent_record) = store.get(parent) {
                    edges.push(EdgeDescriptor {
                        from: parent_record.id.clone(),
                        to: node.id.clone(),
                    });
                }
            }
            nodes.push(node);
        }

        ViewFrame {
            nodes,
            edges,
            counter: VisibleCount {
                visible: visible.len(),
                total: store.len(),
            },
        }
    }
}

//! # Chatmap Graph
//!
//! Filtering engine for a forest of branching chats that never breaks an ancestor chain.
//!
//! ## Features
//!
//! - **Record store** - immutable chats plus favorites/tags overlay
//! - **Filter evaluation** - text, tag, favorite, branch and date predicates
//! - **Reconciliation** - re-adds filtered-out ancestors of every visible chat
//! - **Projection** - node/edge descriptors ready for a renderer
//! - **Focus control** - first-draw vs. steady camera behavior
//!
//! ## Architecture
//!
//! ```text
//! ChatDataset + annotation docs
//!     │
//!     ├──> RecordStore (petgraph forest, overlay)
//!     │
//!     ├──> filter_records(criteria)     -> matching indices
//!     │
//!     ├──> reconcile(matching)          -> VisibleSet (ancestor-closed)
//!     │
//!     ├──> Projector::project(visible)  -> ViewFrame
//!     │
//!     └──> FocusController::after_render(visible) -> Option<FocusRequest>
//! ```

mod error;
mod filter;
mod focus;
mod project;
mod reconcile;
mod store;
mod types;

pub use error::{GraphError, Result};
pub use filter::{filter_records, matches, DateRange, FilterCriteria, RecordFilter};
pub use focus::{effective_root, FocusConfig, FocusController, FocusPhase};
pub use project::{
    display_label, ProjectionConfig, Projector, DEFAULT_BRANCH_MARKER,
    DEFAULT_FAVORITE_COLOR, DEFAULT_NODE_COLOR,
};
pub use reconcile::{reconcile, VisibleSet};
pub use store::RecordStore;
pub use types::{normalize_tag, parse_timestamp, AnnotationOverlay, ChatRecord};

pub use chatmap_protocol::normalize_ref;

/// Filter, reconcile and project in one pass.
pub fn run_pipeline(
    store: &RecordStore,
    criteria: &FilterCriteria,
    projector: &Projector,
) -> (VisibleSet, chatmap_protocol::ViewFrame) {
    let matching = filter_records(store, criteria);
    let visible = reconcile(store, matching);
    let frame = projector.project(store, &visible);
    (visible, frame)
}

//! # Chatmap Session
//!
//! Drives one interactive view over a chat forest: bulk load, filter cycles, focus and
//! annotation edits with full-collection persistence.
//!
//! ## Architecture
//!
//! ```text
//! DatasetSource ──try_join──> RecordStore (swapped in whole)
//!                                  │
//! apply_filters / edits ──> run_cycle ──> GraphRenderer::render(frame)
//!                                  │            │
//!                                  │      Confirmed | Deferred
//!                                  │            │
//!                                  └──── on_rendered ──> FocusController
//!
//! edits ──> AnnotationService (full favorites / tags / vocabulary)
//! ```

mod error;
mod render;
mod session;

pub use error::{AnnotationKind, Result, SessionError};
pub use render::{DetailSurface, GraphRenderer, NullDetail, NullRenderer, RenderAck};
pub use session::{ChatSession, GraphViewState};

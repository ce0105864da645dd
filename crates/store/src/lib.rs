//! # Chatmap Store
//!
//! Backends for the chat dataset and the three annotation documents
//! (favorites, tags by record, tag vocabulary).
//!
//! ## Architecture
//!
//! ```text
//! DatasetSource ──> ChatDataset + FavoritesDoc + TagsDoc + VocabularyDoc
//! AnnotationService <── full-collection writes
//! RefreshTrigger ──> external ingestion, then reload
//!
//! JsonFileStore   files in a data directory (tmp + rename writes)
//! HttpAnnotations the /api/* endpoints served by `chatmap serve`
//! MemoryStore     process-local, with failure switches
//! CommandRefresh  runs a configured command
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use chatmap_store::{DataLayout, DatasetSource, JsonFileStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = JsonFileStore::new(DataLayout::in_dir("data"));
//!     let dataset = store.load_dataset().await?;
//!     println!("{} chats", dataset.chats.len());
//!     Ok(())
//! }
//! ```

mod error;
mod files;
mod http;
mod memory;
mod paths;
mod refresh;
mod service;

pub use error::{Result, StoreError};
pub use files::{read_json_or_default, write_json, JsonFileStore};
pub use http::{
    HttpAnnotations, CHATS_ENDPOINT, FAVORITES_ENDPOINT, TAGS_ENDPOINT, VOCABULARY_ENDPOINT,
};
pub use memory::MemoryStore;
pub use paths::{
    DataLayout, CHATS_FILE_NAME, CONFIG_FILE_NAME, FAVORITES_FILE_NAME, TAGS_FILE_NAME,
    VOCABULARY_FILE_NAME,
};
pub use refresh::CommandRefresh;
pub use service::{AnnotationService, DatasetSource, NoopRefresh, RefreshTrigger};

use crate::error::Result;
use async_trait::async_trait;
use chatmap_protocol::{ChatDataset, FavoritesDoc, TagsDoc, VocabularyDoc};

/// Bulk-load side: the dataset plus the three annotation documents.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn load_dataset(&self) -> Result<ChatDataset>;

    async fn load_favorites(&self) -> Result<FavoritesDoc>;

    async fn load_tags(&self) -> Result<TagsDoc>;

    async fn load_vocabulary(&self) -> Result<VocabularyDoc>;
}

/// Write side of the annotation documents. Every call carries the full collection.
#[async_trait]
pub trait AnnotationService: Send + Sync {
    async fn save_favorites(&self, favorites: &FavoritesDoc) -> Result<()>;

    async fn save_tags(&self, tags: &TagsDoc) -> Result<()>;

    async fn save_vocabulary(&self, vocabulary: &VocabularyDoc) -> Result<()>;
}

/// Asks the ingestion side to rebuild the dataset.
#[async_trait]
pub trait RefreshTrigger: Send + Sync {
    async fn refresh(&self) -> Result<()>;
}

/// Trigger for setups without an ingestion hook; the reload just rereads the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRefresh;

#[async_trait]
impl RefreshTrigger for NoopRefresh {
    async fn refresh(&self) -> Result<()> {
        log::debug!("No refresh command configured, reloading current data");
        Ok(())
    }
}

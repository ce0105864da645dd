use crate::error::{Result, StoreError};
use crate::paths::DataLayout;
use crate::service::{AnnotationService, DatasetSource};
use async_trait::async_trait;
use chatmap_protocol::{ChatDataset, FavoritesDoc, TagsDoc, VocabularyDoc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Dataset and annotation documents kept as JSON files in one data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    layout: DataLayout,
}

impl JsonFileStore {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Dataset as stored, without link repair.
    pub async fn read_raw_dataset(&self) -> Result<ChatDataset> {
        let path = self.layout.chats_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Rewrite the dataset with repaired parent links; returns how many were fixed.
    pub async fn repair_dataset(&self) -> Result<usize> {
        let mut dataset = self.read_raw_dataset().await?;
        let repaired = dataset.repair_links();
        if repaired > 0 {
            write_json(&self.layout.chats_path(), &dataset).await?;
        }
        log::info!("Repaired {repaired} parent links");
        Ok(repaired)
    }
}

#[async_trait]
impl DatasetSource for JsonFileStore {
    async fn load_dataset(&self) -> Result<ChatDataset> {
        let mut dataset = self.read_raw_dataset().await?;
        if self.layout.repair_links {
            let repaired = dataset.repair_links();
            if repaired > 0 {
                log::info!("Repaired {repaired} parent links while loading");
            }
        }
        Ok(dataset)
    }

    async fn load_favorites(&self) -> Result<FavoritesDoc> {
        Ok(read_json_or_default(&self.layout.favorites_path()).await)
    }

    async fn load_tags(&self) -> Result<TagsDoc> {
        Ok(read_json_or_default(&self.layout.tags_path()).await)
    }

    async fn load_vocabulary(&self) -> Result<VocabularyDoc> {
        Ok(read_json_or_default(&self.layout.vocabulary_path()).await)
    }
}

#[async_trait]
impl AnnotationService for JsonFileStore {
    async fn save_favorites(&self, favorites: &FavoritesDoc) -> Result<()> {
        write_json(&self.layout.favorites_path(), favorites).await
    }

    async fn save_tags(&self, tags: &TagsDoc) -> Result<()> {
        write_json(&self.layout.tags_path(), tags).await
    }

    async fn save_vocabulary(&self, vocabulary: &VocabularyDoc) -> Result<()> {
        write_json(&self.layout.vocabulary_path(), vocabulary).await
    }
}

/// Missing, empty or corrupt documents read as the type's default.
pub async fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to read {}: {err}", path.display());
            }
            return T::default();
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("{} is corrupted, using defaults: {err}", path.display());
            T::default()
        }
    }
}

/// Pretty-printed write through a temp file and rename.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

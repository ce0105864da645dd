use crate::error::{Result, StoreError};
use crate::service::{AnnotationService, DatasetSource, RefreshTrigger};
use async_trait::async_trait;
use chatmap_protocol::{ChatDataset, FavoritesDoc, TagsDoc, VocabularyDoc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryDocs {
    dataset: ChatDataset,
    favorites: FavoritesDoc,
    tags: TagsDoc,
    vocabulary: VocabularyDoc,
}

/// Process-local backend holding all four documents.
///
/// Reads and writes can be switched to fail, which is how hosts exercise their error
/// paths without a real service.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<MemoryDocs>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    refreshes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(dataset: ChatDataset) -> Self {
        Self::with_annotations(dataset, Vec::new(), TagsDoc::new(), Vec::new())
    }

    pub fn with_annotations(
        dataset: ChatDataset,
        favorites: FavoritesDoc,
        tags: TagsDoc,
        vocabulary: VocabularyDoc,
    ) -> Self {
        Self {
            docs: Mutex::new(MemoryDocs {
                dataset,
                favorites,
                tags,
                vocabulary,
            }),
            ..Self::default()
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Replace the dataset, as an ingestion run would.
    pub fn replace_dataset(&self, dataset: ChatDataset) -> Result<()> {
        let mut docs = self.lock()?;
        docs.dataset = dataset;
        Ok(())
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn favorites(&self) -> FavoritesDoc {
        self.read(|d| d.favorites.clone()).unwrap_or_default()
    }

    pub fn tags(&self) -> TagsDoc {
        self.read(|d| d.tags.clone()).unwrap_or_default()
    }

    pub fn vocabulary(&self) -> VocabularyDoc {
        self.read(|d| d.vocabulary.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryDocs>> {
        self.docs
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryDocs) -> T) -> Result<T> {
        let docs = self.lock()?;
        Ok(f(&docs))
    }

    fn checked_read<T>(&self, f: impl FnOnce(&MemoryDocs) -> T) -> Result<T> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Other("memory store read disabled".to_string()));
        }
        self.read(f)
    }

    fn write(&self, endpoint: &str, f: impl FnOnce(&mut MemoryDocs)) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                endpoint: endpoint.to_string(),
                message: "memory store write disabled".to_string(),
            });
        }
        let mut docs = self.lock()?;
        f(&mut docs);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl DatasetSource for MemoryStore {
    async fn load_dataset(&self) -> Result<ChatDataset> {
        self.checked_read(|d| d.dataset.clone())
    }

    async fn load_favorites(&self) -> Result<FavoritesDoc> {
        self.checked_read(|d| d.favorites.clone())
    }

    async fn load_tags(&self) -> Result<TagsDoc> {
        self.checked_read(|d| d.tags.clone())
    }

    async fn load_vocabulary(&self) -> Result<VocabularyDoc> {
        self.checked_read(|d| d.vocabulary.clone())
    }
}

#[async_trait]
impl AnnotationService for MemoryStore {
    async fn save_favorites(&self, favorites: &FavoritesDoc) -> Result<()> {
        self.write("favorites", |d| d.favorites = favorites.clone())
    }

    async fn save_tags(&self, tags: &TagsDoc) -> Result<()> {
        self.write("tags", |d| d.tags = tags.clone())
    }

    async fn save_vocabulary(&self, vocabulary: &VocabularyDoc) -> Result<()> {
        self.write("all-tags", |d| d.vocabulary = vocabulary.clone())
    }
}

#[async_trait]
impl RefreshTrigger for MemoryStore {
    async fn refresh(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::RefreshFailed("memory store read disabled".to_string()));
        }
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_replace_whole_documents() {
        let store = MemoryStore::new(ChatDataset::default());
        store.save_favorites(&vec!["a".into()]).await.unwrap();
        store.save_favorites(&vec!["b".into()]).await.unwrap();
        assert_eq!(store.favorites(), vec!["b".to_string()]);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn failure_switches() {
        let store = MemoryStore::new(ChatDataset::default());
        store.set_fail_writes(true);
        assert!(store.save_vocabulary(&Vec::new()).await.is_err());
        assert_eq!(store.write_count(), 0);

        store.set_fail_reads(true);
        assert!(store.load_dataset().await.is_err());
        assert!(store.refresh().await.is_err());
    }

    #[tokio::test]
    async fn poisoned_lock_is_reported() {
        let store = std::sync::Arc::new(MemoryStore::new(ChatDataset::default()));
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.docs.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let err = store.replace_dataset(ChatDataset::default()).unwrap_err();
        assert!(matches!(err, StoreError::Other(_)));
        assert!(store.save_tags(&TagsDoc::new()).await.is_err());
        assert!(store.load_dataset().await.is_err());
    }
}

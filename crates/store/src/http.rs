use crate::error::{Result, StoreError};
use crate::service::{AnnotationService, DatasetSource};
use async_trait::async_trait;
use chatmap_protocol::{ApiStatus, ChatDataset, FavoritesDoc, TagsDoc, VocabularyDoc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const CHATS_ENDPOINT: &str = "/api/chats";
pub const FAVORITES_ENDPOINT: &str = "/api/favorites";
pub const TAGS_ENDPOINT: &str = "/api/tags";
pub const VOCABULARY_ENDPOINT: &str = "/api/all-tags";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the annotation HTTP service (`chatmap serve`).
#[derive(Debug, Clone)]
pub struct HttpAnnotations {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAnnotations {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self.client.get(self.url(endpoint)).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(StoreError::Rejected {
                endpoint: endpoint.to_string(),
                message: format!("HTTP {status}"),
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post_json<T: Serialize + ?Sized + Sync>(&self, endpoint: &str, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value)?;
        let response = self
            .client
            .post(self.url(endpoint))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let reply: Option<ApiStatus> = serde_json::from_slice(&bytes).ok();

        if status.is_success() && reply.as_ref().map_or(true, ApiStatus::is_success) {
            return Ok(());
        }
        let message = reply
            .and_then(|r| r.message)
            .unwrap_or_else(|| format!("HTTP {status}"));
        log::warn!("Write to {endpoint} failed: {message}");
        Err(StoreError::Rejected {
            endpoint: endpoint.to_string(),
            message,
        })
    }
}

#[async_trait]
impl DatasetSource for HttpAnnotations {
    async fn load_dataset(&self) -> Result<ChatDataset> {
        self.get_json(CHATS_ENDPOINT).await
    }

    async fn load_favorites(&self) -> Result<FavoritesDoc> {
        self.get_json(FAVORITES_ENDPOINT).await
    }

    async fn load_tags(&self) -> Result<TagsDoc> {
        self.get_json(TAGS_ENDPOINT).await
    }

    async fn load_vocabulary(&self) -> Result<VocabularyDoc> {
        self.get_json(VOCABULARY_ENDPOINT).await
    }
}

#[async_trait]
impl AnnotationService for HttpAnnotations {
    async fn save_favorites(&self, favorites: &FavoritesDoc) -> Result<()> {
        self.post_json(FAVORITES_ENDPOINT, favorites).await
    }

    async fn save_tags(&self, tags: &TagsDoc) -> Result<()> {
        self.post_json(TAGS_ENDPOINT, tags).await
    }

    async fn save_vocabulary(&self, vocabulary: &VocabularyDoc) -> Result<()> {
        self.post_json(VOCABULARY_ENDPOINT, vocabulary).await
    }
}

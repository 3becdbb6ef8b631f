//! Clip-creation calls against the streaming platform's API (§4.8).

use async_trait::async_trait;
use ingestor_config::PlatformSettings;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("platform API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("platform API returned an error response: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

#[derive(Debug, Clone)]
pub struct ClipMetadata {
    pub embed_url: String,
    pub thumbnail_url: String,
}

#[async_trait]
pub trait ClipPlatform: Send + Sync {
    /// Request a clip centered on the current instant; returns the
    /// platform's clip id.
    async fn request_clip(&self, broadcaster_id: u64) -> Result<String>;

    /// Retrieve metadata for a previously requested clip, once it has had
    /// time to materialize.
    async fn get_clip_metadata(&self, clip_id: &str) -> Result<ClipMetadata>;
}

#[derive(Deserialize)]
struct CreateClipEnvelope {
    data: Vec<CreateClipEntry>,
}

#[derive(Deserialize)]
struct CreateClipEntry {
    id: String,
}

#[derive(Deserialize)]
struct ClipEnvelope {
    data: Vec<ClipEntry>,
}

#[derive(Deserialize)]
struct ClipEntry {
    embed_url: String,
    thumbnail_url: String,
}

pub struct HttpClipPlatform {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpClipPlatform {
    pub fn new(settings: &PlatformSettings) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build platform HTTP client"),
            base_url: settings.base_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        }
    }
}

#[async_trait]
impl ClipPlatform for HttpClipPlatform {
    async fn request_clip(&self, broadcaster_id: u64) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/clips", self.base_url))
            .query(&[("broadcaster_id", broadcaster_id.to_string())])
            .header("Client-Id", &self.client_id)
            .bearer_auth(&self.client_secret)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PlatformError::Api(e.to_string()))?
            .json::<CreateClipEnvelope>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|entry| entry.id)
            .ok_or_else(|| PlatformError::Api("clip creation returned no data".to_string()))
    }

    async fn get_clip_metadata(&self, clip_id: &str) -> Result<ClipMetadata> {
        let response = self
            .http
            .get(format!("{}/clips", self.base_url))
            .query(&[("id", clip_id)])
            .header("Client-Id", &self.client_id)
            .bearer_auth(&self.client_secret)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PlatformError::Api(e.to_string()))?
            .json::<ClipEnvelope>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|entry| ClipMetadata {
                embed_url: entry.embed_url,
                thumbnail_url: entry.thumbnail_url,
            })
            .ok_or_else(|| PlatformError::Api(format!("clip {clip_id} not found")))
    }
}

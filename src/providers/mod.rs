pub mod demo;
pub mod gemini;
pub mod minimax;

pub use demo::DemoComposite;
pub use gemini::GeminiTryOn;
pub use minimax::MiniMaxVideo;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::cache::entry::ArtifactKind;
use crate::image_processing;
use crate::request::GenerationRequest;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("generation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("provider returned no artifact: {0}")]
    MissingArtifact(String),

    #[error("unsupported request for this provider: {0}")]
    Unsupported(String),

    #[error("artifact processing failed: {0}")]
    Artifact(String),
}

/// Result of a successful provider call: a resolvable artifact reference
/// plus whatever metadata the backend reported.
#[derive(Clone, Debug)]
pub struct GeneratedArtifact {
    pub artifact_ref: String,
    pub kind: ArtifactKind,
    pub metadata: Value,
}

/// External generation backend. Calls take seconds, may hang, and may fail;
/// the resolver bounds them with a timeout and never caches failures.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
    -> Result<GeneratedArtifact, ProviderError>;
}

/// Downloads an image and sniffs its mime type, preferring magic bytes over
/// the Content-Type header.
pub(crate) async fn fetch_image_bytes(
    client: &reqwest::Client,
    url: &str,
) -> Result<(Vec<u8>, String), ProviderError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Api {
            status: status.as_u16(),
            detail: format!("fetching {url} failed"),
        });
    }
    let header_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());
    let bytes = response.bytes().await?;
    let mime = image_processing::detect_mime_type(bytes.as_ref())
        .map(str::to_string)
        .or(header_mime)
        .unwrap_or_else(|| "image/jpeg".to_string());
    Ok((bytes.to_vec(), mime))
}

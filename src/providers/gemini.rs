use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::assets::AssetStorage;
use crate::cache::entry::ArtifactKind;
use crate::image_processing;
use crate::providers::{GeneratedArtifact, GenerationProvider, ProviderError, fetch_image_bytes};
use crate::request::{GenerationRequest, TransformParams};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const TRYON_PROMPT: &str = "You are a virtual try-on assistant. Using the first image as the person \
(preserve identity, pose, lighting, and background) and the second image as the garment, \
compose a realistic, high-quality image of the person wearing the garment. \
Respect garment texture, color, and prints; adapt folds and fit naturally. \
Avoid altering the person's face, hair, or background beyond what is necessary for realism. \
Return only the final composed image.";

/// Garment compositing backed by a Gemini-style `generateContent` endpoint:
/// person image, garment image and prompt go in as inline parts, the
/// composed image comes back as inline data and is persisted locally.
pub struct GeminiTryOn {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    assets: Arc<AssetStorage>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

impl GeminiTryOn {
    pub fn new(api_key: String, model: String, assets: Arc<AssetStorage>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            assets,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl GenerationProvider for GeminiTryOn {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, ProviderError> {
        let TransformParams::Composite { garment_ref } = &request.params else {
            return Err(ProviderError::Unsupported(
                "try-on provider only handles composite requests".to_string(),
            ));
        };

        let (person_bytes, person_mime) = fetch_image_bytes(&self.client, &request.input_ref).await?;
        let (garment_bytes, garment_mime) = fetch_image_bytes(&self.client, garment_ref).await?;

        let body = json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": person_mime, "data": BASE64.encode(&person_bytes) } },
                    { "inlineData": { "mimeType": garment_mime, "data": BASE64.encode(&garment_bytes) } },
                    { "text": TRYON_PROMPT },
                ]
            }]
        });
        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                detail,
            });
        }
        let payload: GenerateContentResponse = response.json().await?;
        if let Some(message) = payload.error.and_then(|err| err.message) {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                detail: message,
            });
        }

        let parts = payload
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts)
            .unwrap_or_default();
        // Text parts carry commentary; the composed image is the first
        // inline-data part.
        let inline = parts
            .into_iter()
            .filter(|part| part.text.is_none())
            .find_map(|part| part.inline_data)
            .and_then(|inline| inline.data.map(|data| (data, inline.mime_type)));
        let Some((encoded, mime_type)) = inline else {
            return Err(ProviderError::MissingArtifact(
                "no image parts in response".to_string(),
            ));
        };

        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|err| ProviderError::Artifact(format!("invalid inline image payload: {err}")))?;
        let mime_type = mime_type.unwrap_or_else(|| "image/png".to_string());
        let key = AssetStorage::artifact_key(
            "tryon",
            &request.user_id,
            image_processing::extension_for_mime(&mime_type),
        );
        self.assets
            .put(&key, &bytes)
            .await
            .map_err(|err| ProviderError::Artifact(err.to_string()))?;

        Ok(GeneratedArtifact {
            artifact_ref: self.assets.public_url(&key),
            kind: ArtifactKind::Image,
            metadata: json!({
                "provider": "gemini",
                "model": self.model,
                "mime_type": mime_type,
                "asset_key": key,
            }),
        })
    }
}

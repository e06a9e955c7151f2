use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::warn;

use crate::assets::AssetStorage;
use crate::cache::entry::ArtifactKind;
use crate::image_processing;
use crate::providers::{GeneratedArtifact, GenerationProvider, ProviderError, fetch_image_bytes};
use crate::request::{GenerationRequest, TransformParams};

/// Offline try-on stand-in for demo deployments and missing API keys:
/// pastes a scaled garment onto the selfie locally instead of calling a
/// generation backend.
pub struct DemoComposite {
    client: Client,
    assets: Arc<AssetStorage>,
}

impl DemoComposite {
    pub fn new(assets: Arc<AssetStorage>) -> Self {
        Self {
            client: Client::new(),
            assets,
        }
    }
}

#[async_trait]
impl GenerationProvider for DemoComposite {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, ProviderError> {
        let TransformParams::Composite { garment_ref } = &request.params else {
            return Err(ProviderError::Unsupported(
                "demo provider only handles composite requests".to_string(),
            ));
        };

        let (person_bytes, person_mime) = fetch_image_bytes(&self.client, &request.input_ref).await?;
        let (garment_bytes, garment_mime) = fetch_image_bytes(&self.client, garment_ref).await?;

        // If the composite fails (odd format, zero-sized image) fall back to
        // returning the selfie untouched rather than failing the request.
        let (bytes, mime_type) = match image_processing::overlay_garment(
            &person_bytes,
            &person_mime,
            &garment_bytes,
            &garment_mime,
        ) {
            Ok(png) => (png, "image/png".to_string()),
            Err(err) => {
                warn!(error = %err, "demo composite failed, returning selfie as-is");
                (person_bytes, person_mime)
            }
        };

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
                "provider": "demo",
                "mime_type": mime_type,
                "asset_key": key,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn composites_locally_and_stores_the_result() {
        let server = MockServer::start().await;
        let png = image_processing::encode_png(&RgbaImage::from_pixel(
            64,
            64,
            image::Rgba([120, 30, 30, 255]),
        ))
        .unwrap();
        for name in ["/selfie.png", "/garment.png"] {
            Mock::given(method("GET"))
                .and(path(name))
                .respond_with(ResponseTemplate::new(200).set_body_raw(png.clone(), "image/png"))
                .mount(&server)
                .await;
        }

        let dir = tempdir().unwrap();
        let assets = Arc::new(AssetStorage::new(
            dir.path().to_path_buf(),
            "http://localhost:8002/static".to_string(),
        ));
        let provider = DemoComposite::new(assets.clone());
        let request = GenerationRequest::new(
            "u1".to_string(),
            format!("{}/selfie.png", server.uri()),
            TransformParams::Composite {
                garment_ref: format!("{}/garment.png", server.uri()),
            },
        )
        .unwrap();

        let artifact = provider.generate(&request).await.unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Image);
        assert_eq!(artifact.metadata["provider"], "demo");
        let key = artifact.metadata["asset_key"].as_str().unwrap();
        assert!(assets.resolve_path(key).exists());
    }

    #[tokio::test]
    async fn unreachable_source_image_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/selfie.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let assets = Arc::new(AssetStorage::new(
            dir.path().to_path_buf(),
            "http://localhost:8002/static".to_string(),
        ));
        let provider = DemoComposite::new(assets);
        let request = GenerationRequest::new(
            "u1".to_string(),
            format!("{}/selfie.png", server.uri()),
            TransformParams::Composite {
                garment_ref: format!("{}/garment.png", server.uri()),
            },
        )
        .unwrap();

        let result = provider.generate(&request).await;
        assert!(matches!(
            result,
            Err(ProviderError::Api { status: 404, .. })
        ));
    }
}

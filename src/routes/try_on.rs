use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;
use crate::product;
use crate::request::{GenerationRequest, TransformParams};
use crate::routes::AppState;
use crate::routes::validation::validate_http_url;

#[derive(Debug, Deserialize)]
pub struct TryOnRequest {
    pub user_id: String,
    pub selfie_url: String,
    pub product_image_url: Option<String>,
    pub product_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub image_url: String,
    pub attrs: Value,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

pub async fn try_on(
    State(state): State<AppState>,
    Json(payload): Json<TryOnRequest>,
) -> Result<Json<TryOnResponse>, ServiceError> {
    validate_http_url(&payload.selfie_url)?;

    let direct = payload
        .product_image_url
        .as_deref()
        .filter(|value| !value.trim().is_empty());
    let page = payload
        .product_url
        .as_deref()
        .filter(|value| !value.trim().is_empty());
    let garment_ref = match (direct, page) {
        (Some(direct), _) => {
            validate_http_url(direct)?;
            direct.to_string()
        }
        (None, Some(page)) => {
            validate_http_url(page)?;
            product::resolve_product_image(&state.http, page)
                .await
                .ok_or_else(|| {
                    ServiceError::Validation(
                        "missing product_image_url or resolvable product_url".to_string(),
                    )
                })?
        }
        (None, None) => {
            return Err(ServiceError::Validation(
                "missing product_image_url or resolvable product_url".to_string(),
            ));
        }
    };

    // Attribute heuristics work off whatever text we have for the product.
    let text_hint = payload.product_url.as_deref().unwrap_or(&garment_ref);
    let attrs = Value::Object(product::extract_attrs(text_hint));

    let request = GenerationRequest::new(
        payload.user_id,
        payload.selfie_url,
        TransformParams::Composite { garment_ref },
    )?;
    let resolved = state
        .resolver
        .resolve(
            state.tryon_provider.as_ref(),
            &request,
            state.config.tryon_cache_ttl,
        )
        .await?;

    Ok(Json(TryOnResponse {
        image_url: resolved.artifact_ref,
        attrs,
        latency_ms: resolved.latency_ms,
        cache_hit: resolved.cache_hit,
    }))
}

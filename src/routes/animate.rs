use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::request::{Action, Aspect, GenerationRequest, TransformParams};
use crate::routes::AppState;
use crate::routes::validation::validate_http_url;

fn default_action() -> String {
    "turn".to_string()
}

fn default_duration() -> u8 {
    4
}

pub(crate) fn default_aspect() -> String {
    "9:16".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AnimateRequest {
    pub user_id: String,
    pub image_url: String,
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default = "default_duration")]
    pub duration_s: u8,
    #[serde(default = "default_aspect")]
    pub aspect: String,
}

#[derive(Debug, Serialize)]
pub struct AnimateResponse {
    pub video_url: String,
    pub captions: Vec<String>,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

pub async fn animate(
    State(state): State<AppState>,
    Json(payload): Json<AnimateRequest>,
) -> Result<Json<AnimateResponse>, ServiceError> {
    validate_http_url(&payload.image_url)?;
    let action = Action::parse(&payload.action)?;
    let aspect = Aspect::parse(&payload.aspect)?;

    let request = GenerationRequest::new(
        payload.user_id,
        payload.image_url,
        TransformParams::Animate {
            action,
            duration_s: payload.duration_s,
            aspect,
        },
    )?;
    let resolved = state
        .resolver
        .resolve(
            state.video_provider.as_ref(),
            &request,
            state.config.video_cache_ttl,
        )
        .await?;

    Ok(Json(AnimateResponse {
        video_url: resolved.artifact_ref,
        captions: vec![format!("{} to show fit", action.title())],
        latency_ms: resolved.latency_ms,
        cache_hit: resolved.cache_hit,
    }))
}

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::request::{Action, Aspect, GenerationRequest, TransformParams};
use crate::routes::AppState;
use crate::routes::animate::default_aspect;
use crate::routes::validation::validate_http_url;

#[derive(Debug, Deserialize)]
pub struct ComposeRequest {
    pub user_id: String,
    pub image_url: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default = "default_aspect")]
    pub aspect: String,
}

#[derive(Debug, Serialize)]
pub struct ComposeResponse {
    pub video_url: String,
    pub captions: Vec<String>,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

pub async fn compose(
    State(state): State<AppState>,
    Json(payload): Json<ComposeRequest>,
) -> Result<Json<ComposeResponse>, ServiceError> {
    validate_http_url(&payload.image_url)?;
    let actions = payload
        .actions
        .iter()
        .map(|raw| Action::parse(raw))
        .collect::<Result<Vec<Action>, ServiceError>>()?;
    let aspect = Aspect::parse(&payload.aspect)?;

    let request = GenerationRequest::new(
        payload.user_id,
        payload.image_url,
        TransformParams::ComposeActions {
            actions: actions.clone(),
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

    Ok(Json(ComposeResponse {
        video_url: resolved.artifact_ref,
        captions: actions
            .iter()
            .map(|action| action.title().to_string())
            .collect(),
        latency_ms: resolved.latency_ms,
        cache_hit: resolved.cache_hit,
    }))
}

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::entry::HistoryEntry;
use crate::error::ServiceError;
use crate::request::validate_user_id;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub entries: Vec<HistoryEntry>,
    pub count: usize,
}

pub async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ServiceError> {
    validate_user_id(&user_id)?;
    let entries = state.resolver.history(&user_id, query.limit).await?;
    Ok(Json(HistoryResponse {
        count: entries.len(),
        entries,
    }))
}

#[derive(Debug, Serialize)]
pub struct LastArtifactResponse {
    pub artifact_ref: String,
}

pub async fn last_artifact(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<LastArtifactResponse>, ServiceError> {
    validate_user_id(&user_id)?;
    match state.resolver.last_artifact(&user_id).await? {
        Some(artifact_ref) => Ok(Json(LastArtifactResponse { artifact_ref })),
        None => Err(ServiceError::NotFound(format!(
            "no artifact recorded for user {user_id}"
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub context: Value,
}

pub async fn session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<SessionResponse>, ServiceError> {
    validate_user_id(&user_id)?;
    match state.resolver.session(&user_id).await? {
        Some(context) => Ok(Json(SessionResponse { context })),
        None => Err(ServiceError::NotFound(format!(
            "no session recorded for user {user_id}"
        ))),
    }
}

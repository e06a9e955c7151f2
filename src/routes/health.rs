use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::routes::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": "tryon-gateway",
        "version": crate::VERSION,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}

/// Store reachability probe so callers can decide whether to degrade.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = match state.store.ping().await {
        Ok(()) => "connected",
        Err(err) => {
            warn!(error = %err, "store ping failed");
            "unreachable"
        }
    };
    Json(HealthResponse {
        status: if store == "connected" {
            "healthy"
        } else {
            "degraded"
        },
        store,
        timestamp: Utc::now().to_rfc3339(),
        version: crate::VERSION,
    })
}

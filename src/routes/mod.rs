pub mod animate;
pub mod compose;
pub mod health;
pub mod history;
pub mod storyboard;
pub mod try_on;
pub mod upload;
pub mod validation;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::assets::AssetStorage;
use crate::cache::resolver::Resolver;
use crate::config::Config;
use crate::providers::GenerationProvider;
use crate::store::KvStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn KvStore>,
    pub resolver: Arc<Resolver>,
    pub assets: Arc<AssetStorage>,
    pub tryon_provider: Arc<dyn GenerationProvider>,
    pub video_provider: Arc<dyn GenerationProvider>,
    pub http: reqwest::Client,
}

pub fn router(state: AppState) -> Router {
    let asset_dir = state.assets.base_dir().to_path_buf();
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/try_on", post(try_on::try_on))
        .route("/animate", post(animate::animate))
        .route("/compose", post(compose::compose))
        .route("/storyboard", post(storyboard::storyboard))
        .route("/history/{user_id}", get(history::history))
        .route("/last/{user_id}", get(history::last_artifact))
        .route("/session/{user_id}", get(history::session))
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(50 * 1024 * 1024)),
        )
        .nest_service("/static", ServeDir::new(asset_dir))
        // The caller is a browser extension on arbitrary shop origins.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use tryon_gateway::assets::AssetStorage;
use tryon_gateway::cache::resolver::Resolver;
use tryon_gateway::config::{Config, StoreBackend};
use tryon_gateway::providers::{DemoComposite, GeminiTryOn, GenerationProvider, MiniMaxVideo};
use tryon_gateway::routes::{self, AppState};
use tryon_gateway::store::{FileStore, KvStore, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tryon_gateway=info,tower_http=info")),
        )
        .init();

    let config = Arc::new(Config::from_env());
    info!(version = tryon_gateway::VERSION, bind = %config.bind_address, "starting tryon-gateway");

    let store: Arc<dyn KvStore> = match &config.store {
        StoreBackend::Memory => {
            info!("using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::File(dir) => {
            info!(dir = %dir.display(), "using file store");
            Arc::new(FileStore::new(dir.clone()))
        }
    };
    let assets = Arc::new(AssetStorage::new(
        config.asset_dir.clone(),
        format!("{}/static", config.public_base_url),
    ));

    let tryon_provider: Arc<dyn GenerationProvider> = match (&config.gemini_api_key, config.demo_mode)
    {
        (Some(api_key), false) => Arc::new(GeminiTryOn::new(
            api_key.clone(),
            config.genai_model.clone(),
            assets.clone(),
        )),
        _ => {
            warn!("demo mode or missing GEMINI_API_KEY, using local composite provider");
            Arc::new(DemoComposite::new(assets.clone()))
        }
    };
    if config.minimax_api_key.is_none() {
        warn!("MINIMAX_API_KEY not set, video generation requests will fail");
    }
    let video_provider: Arc<dyn GenerationProvider> = Arc::new(MiniMaxVideo::new(
        config.minimax_api_key.clone().unwrap_or_default(),
        config.minimax_base_url.clone(),
    ));

    let resolver = Arc::new(Resolver::new(
        store.clone(),
        config.history_cap,
        config.provider_timeout,
    ));

    let state = AppState {
        config: config.clone(),
        store,
        resolver,
        assets,
        tryon_provider,
        video_provider,
        http: reqwest::Client::new(),
    };
    let router = routes::router(state);

    let tcp_listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("listening on http://{}", config.bind_address);
    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

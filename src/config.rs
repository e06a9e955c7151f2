use std::env;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;

#[derive(Clone, Debug)]
pub enum StoreBackend {
    Memory,
    File(PathBuf),
}

/// All runtime configuration, resolved once at startup and passed down
/// explicitly; nothing below `main` reads the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    pub store: StoreBackend,
    pub asset_dir: PathBuf,
    pub public_base_url: String,
    pub gemini_api_key: Option<String>,
    pub genai_model: String,
    pub minimax_api_key: Option<String>,
    pub minimax_base_url: String,
    pub demo_mode: bool,
    pub tryon_cache_ttl: Duration,
    pub video_cache_ttl: Duration,
    pub history_cap: usize,
    pub provider_timeout: StdDuration,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8002);
        let bind_address = format!("0.0.0.0:{port}");

        let store = match non_empty_var("STORE_URL").as_deref() {
            Some("memory://") => StoreBackend::Memory,
            Some(value) => StoreBackend::File(PathBuf::from(value.trim_start_matches("file://"))),
            None => StoreBackend::File(default_data_dir().join("store")),
        };
        let asset_dir = non_empty_var("ASSET_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir().join("assets"));

        Self {
            public_base_url: resolve_public_base_url(&bind_address),
            bind_address,
            store,
            asset_dir,
            gemini_api_key: non_empty_var("GEMINI_API_KEY")
                .or_else(|| non_empty_var("GOOGLE_API_KEY"))
                .or_else(|| non_empty_var("GOOGLE_GENAI_API_KEY")),
            genai_model: non_empty_var("GENAI_MODEL")
                .unwrap_or_else(|| "gemini-2.5-flash-image-preview".to_string()),
            minimax_api_key: non_empty_var("MINIMAX_API_KEY"),
            minimax_base_url: non_empty_var("MINIMAX_BASE_URL")
                .unwrap_or_else(|| "https://api.minimax.chat/v1".to_string()),
            demo_mode: matches!(
                env::var("DEMO_MODE").unwrap_or_default().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            tryon_cache_ttl: Duration::seconds(int_var("TRYON_CACHE_TTL_SECS", 86_400)),
            video_cache_ttl: Duration::seconds(int_var("VIDEO_CACHE_TTL_SECS", 3_600)),
            history_cap: int_var("HISTORY_CAP", 20) as usize,
            provider_timeout: StdDuration::from_secs(int_var("PROVIDER_TIMEOUT_SECS", 300) as u64),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn int_var(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn default_data_dir() -> PathBuf {
    let mut base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("tryon-gateway");
    base
}

fn resolve_public_base_url(bind_address: &str) -> String {
    let raw = non_empty_var("PUBLIC_BASE_URL")
        .or_else(|| non_empty_var("DOMAIN"))
        .unwrap_or_else(|| bind_address.to_string());
    let trimmed = raw.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

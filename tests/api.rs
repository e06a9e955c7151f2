use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Duration;
use serde_json::{Value, json};
use tower::ServiceExt;

use tryon_gateway::assets::AssetStorage;
use tryon_gateway::cache::entry::ArtifactKind;
use tryon_gateway::cache::resolver::Resolver;
use tryon_gateway::config::{Config, StoreBackend};
use tryon_gateway::providers::{GeneratedArtifact, GenerationProvider, ProviderError};
use tryon_gateway::request::GenerationRequest;
use tryon_gateway::routes::{AppState, router};
use tryon_gateway::store::MemoryStore;

struct StaticProvider {
    kind: ArtifactKind,
    artifact_ref: &'static str,
    calls: AtomicUsize,
}

impl StaticProvider {
    fn new(kind: ArtifactKind, artifact_ref: &'static str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            artifact_ref,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for StaticProvider {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedArtifact {
            artifact_ref: self.artifact_ref.to_string(),
            kind: self.kind,
            metadata: json!({ "provider": "stub" }),
        })
    }
}

struct TestApp {
    router: Router,
    tryon: Arc<StaticProvider>,
    video: Arc<StaticProvider>,
    _asset_dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let asset_dir = tempfile::tempdir().expect("temp asset dir");
    let config = Arc::new(Config {
        bind_address: "127.0.0.1:0".to_string(),
        store: StoreBackend::Memory,
        asset_dir: asset_dir.path().to_path_buf(),
        public_base_url: "http://localhost:8002".to_string(),
        gemini_api_key: None,
        genai_model: "test-model".to_string(),
        minimax_api_key: None,
        minimax_base_url: "http://localhost:1".to_string(),
        demo_mode: true,
        tryon_cache_ttl: Duration::hours(24),
        video_cache_ttl: Duration::hours(1),
        history_cap: 20,
        provider_timeout: StdDuration::from_secs(5),
    });
    let store = Arc::new(MemoryStore::new());
    let resolver = Arc::new(Resolver::new(
        store.clone(),
        config.history_cap,
        config.provider_timeout,
    ));
    let assets = Arc::new(AssetStorage::new(
        config.asset_dir.clone(),
        format!("{}/static", config.public_base_url),
    ));
    let tryon = StaticProvider::new(ArtifactKind::Image, "http://localhost:8002/static/tryon/result.png");
    let video = StaticProvider::new(ArtifactKind::Video, "https://cdn.test/clip.mp4");
    let state = AppState {
        config,
        store,
        resolver,
        assets,
        tryon_provider: tryon.clone(),
        video_provider: video.clone(),
        http: reqwest::Client::new(),
    };
    TestApp {
        router: router(state),
        tryon,
        video,
        _asset_dir: asset_dir,
    }
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn try_on_body() -> Value {
    json!({
        "user_id": "u1",
        "selfie_url": "https://example.com/selfie.jpg",
        "product_image_url": "https://shop.example/red-hoodie.jpg",
    })
}

#[tokio::test]
async fn try_on_generates_then_serves_from_cache() {
    let app = test_app();

    let (status, first) = post_json(&app.router, "/try_on", try_on_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cache_hit"], false);
    assert_eq!(
        first["image_url"],
        "http://localhost:8002/static/tryon/result.png"
    );
    assert_eq!(first["attrs"]["color"], "red");
    assert_eq!(first["attrs"]["type"], "hoodie");

    let (status, second) = post_json(&app.router, "/try_on", try_on_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cache_hit"], true);
    assert_eq!(second["image_url"], first["image_url"]);
    assert_eq!(app.tryon.calls(), 1);

    // Both requests were logged.
    let (status, history) = get_json(&app.router, "/history/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["count"], 2);
    assert_eq!(history["entries"][0]["kind"], "image");
}

#[tokio::test]
async fn try_on_without_product_sources_is_rejected() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/try_on",
        json!({ "user_id": "u1", "selfie_url": "https://example.com/selfie.jpg" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(app.tryon.calls(), 0);
}

#[tokio::test]
async fn try_on_rejects_non_http_selfie_urls() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/try_on",
        json!({
            "user_id": "u1",
            "selfie_url": "file:///etc/passwd",
            "product_image_url": "https://shop.example/a.jpg",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn animate_returns_video_and_captions() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/animate",
        json!({
            "user_id": "u1",
            "image_url": "https://example.com/tryon.png",
            "action": "turn",
            "duration_s": 4,
            "aspect": "9:16",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["video_url"], "https://cdn.test/clip.mp4");
    assert_eq!(body["captions"][0], "Turn to show fit");
    assert_eq!(body["cache_hit"], false);
    assert_eq!(app.video.calls(), 1);
}

#[tokio::test]
async fn animate_rejects_out_of_range_duration_without_provider_call() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/animate",
        json!({
            "user_id": "u1",
            "image_url": "https://example.com/tryon.png",
            "action": "turn",
            "duration_s": 10,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("between 3 and 6")
    );
    assert_eq!(app.video.calls(), 0);

    let (_, history) = get_json(&app.router, "/history/u1").await;
    assert_eq!(history["count"], 0);
}

#[tokio::test]
async fn animate_rejects_unknown_action_and_aspect() {
    let app = test_app();
    let (status, _) = post_json(
        &app.router,
        "/animate",
        json!({
            "user_id": "u1",
            "image_url": "https://example.com/tryon.png",
            "action": "backflip",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app.router,
        "/animate",
        json!({
            "user_id": "u1",
            "image_url": "https://example.com/tryon.png",
            "aspect": "2:1",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.video.calls(), 0);
}

#[tokio::test]
async fn compose_requires_at_least_one_action() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/compose",
        json!({
            "user_id": "u1",
            "image_url": "https://example.com/tryon.png",
            "actions": [],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn compose_returns_one_caption_per_action() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/compose",
        json!({
            "user_id": "u1",
            "image_url": "https://example.com/tryon.png",
            "actions": ["turn", "wave"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["captions"], json!(["Turn", "Wave"]));
    assert_eq!(app.video.calls(), 1);
}

#[tokio::test]
async fn storyboard_is_pure_planning() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/storyboard",
        json!({
            "image_url": "https://example.com/tryon.png",
            "product_attrs": { "type": "hoodie", "color": "red" },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["beats"], json!(["turn", "wave", "close_up"]));
    assert_eq!(app.video.calls(), 0);
    assert_eq!(app.tryon.calls(), 0);
}

#[tokio::test]
async fn history_of_unknown_user_is_empty_not_an_error() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/history/nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["entries"], json!([]));
}

#[tokio::test]
async fn history_limit_query_caps_results() {
    let app = test_app();
    for i in 0..4 {
        let (status, _) = post_json(
            &app.router,
            "/animate",
            json!({
                "user_id": "u1",
                "image_url": format!("https://example.com/tryon-{i}.png"),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = get_json(&app.router, "/history/u1?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(
        body["entries"][0]["input_ref"],
        "https://example.com/tryon-3.png"
    );
}

#[tokio::test]
async fn last_artifact_404s_until_a_generation_happens() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/last/u1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    post_json(&app.router, "/try_on", try_on_body()).await;
    let (status, body) = get_json(&app.router, "/last/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["artifact_ref"],
        "http://localhost:8002/static/tryon/result.png"
    );
}

#[tokio::test]
async fn session_reflects_the_latest_request_context() {
    let app = test_app();
    post_json(&app.router, "/try_on", try_on_body()).await;
    let (status, body) = get_json(&app.router, "/session/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context"]["input_ref"], "https://example.com/selfie.jpg");
    assert_eq!(body["context"]["namespace"], "tryon");
}

#[tokio::test]
async fn health_reports_store_reachability() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
}

#[tokio::test]
async fn root_returns_the_service_banner() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["service"], "tryon-gateway");
}

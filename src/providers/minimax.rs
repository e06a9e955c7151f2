use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{Duration, Instant, sleep};
use tracing::debug;

use crate::cache::entry::ArtifactKind;
use crate::providers::{GeneratedArtifact, GenerationProvider, ProviderError};
use crate::request::{Action, Aspect, GenerationRequest, TransformParams};

const VIDEO_MODEL: &str = "video-01";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const POLL_DEADLINE: Duration = Duration::from_secs(300);

fn action_prompt(action: Action) -> &'static str {
    match action {
        Action::Turn => {
            "The person slowly turns around to show the outfit from different angles, smooth rotation movement"
        }
        Action::Wave => {
            "The person waves their hand in a friendly greeting gesture while wearing the outfit"
        }
        Action::Walk => {
            "The person takes a few steps forward in a natural walking motion, showing the outfit in movement"
        }
    }
}

/// Image-to-video generation via a MiniMax-style API: submit the task, then
/// poll its status until completion or the deadline.
pub struct MiniMaxVideo {
    client: Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct VideoTaskResponse {
    status: Option<String>,
    id: Option<String>,
    video_url: Option<String>,
    url: Option<String>,
    error: Option<String>,
}

impl MiniMaxVideo {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn submit(
        &self,
        image_url: &str,
        action: Action,
        duration_s: u8,
        aspect: Aspect,
    ) -> Result<VideoTaskResponse, ProviderError> {
        let payload = json!({
            "model": VIDEO_MODEL,
            "prompt": action_prompt(action),
            "image": image_url,
            "duration": duration_s,
            "aspect_ratio": aspect.as_str(),
            "quality": "high",
            "fps": 24,
        });
        debug!(action = action.as_str(), duration_s, "submitting video generation");
        let response = self
            .client
            .post(format!("{}/video/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn poll(&self, task_id: &str) -> Result<VideoTaskResponse, ProviderError> {
        let deadline = Instant::now() + POLL_DEADLINE;
        while Instant::now() <= deadline {
            let response = self
                .client
                .get(format!("{}/video/generations/{task_id}", self.base_url))
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            let payload = Self::parse_response(response).await?;
            match payload.status.as_deref() {
                Some("completed") => return Ok(payload),
                Some("failed") => {
                    return Err(ProviderError::Api {
                        status: 502,
                        detail: payload
                            .error
                            .unwrap_or_else(|| "video generation failed".to_string()),
                    });
                }
                status => {
                    debug!(task_id, status = status.unwrap_or("unknown"), "still processing");
                    sleep(self.poll_interval).await;
                }
            }
        }
        Err(ProviderError::Timeout {
            seconds: POLL_DEADLINE.as_secs(),
        })
    }

    async fn parse_response(
        response: reqwest::Response,
    ) -> Result<VideoTaskResponse, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response.json().await?)
    }

    fn video_url(payload: VideoTaskResponse) -> Result<String, ProviderError> {
        payload
            .video_url
            .or(payload.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ProviderError::MissingArtifact("no video url in response".to_string()))
    }
}

#[async_trait]
impl GenerationProvider for MiniMaxVideo {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, ProviderError> {
        let (action, duration_s, aspect, actions) = match &request.params {
            TransformParams::Animate {
                action,
                duration_s,
                aspect,
            } => (*action, *duration_s, *aspect, vec![*action]),
            TransformParams::ComposeActions { actions, aspect } => {
                let primary = actions.first().copied().ok_or_else(|| {
                    ProviderError::Unsupported("compose request without actions".to_string())
                })?;
                // One clip for the primary action, sized to the sequence:
                // two seconds per beat, capped at the provider maximum.
                let duration_s = (actions.len() * 2).min(6) as u8;
                (primary, duration_s, *aspect, actions.clone())
            }
            TransformParams::Composite { .. } => {
                return Err(ProviderError::Unsupported(
                    "video provider cannot composite garments".to_string(),
                ));
            }
        };

        let mut payload = self
            .submit(&request.input_ref, action, duration_s, aspect)
            .await?;
        if payload.status.as_deref() == Some("processing") {
            let task_id = payload.id.clone().ok_or_else(|| {
                ProviderError::MissingArtifact("processing response without task id".to_string())
            })?;
            payload = self.poll(&task_id).await?;
        }
        let task_id = payload.id.clone();
        let video_url = Self::video_url(payload)?;

        Ok(GeneratedArtifact {
            artifact_ref: video_url,
            kind: ArtifactKind::Video,
            metadata: json!({
                "provider": "minimax",
                "model": VIDEO_MODEL,
                "action": action,
                "actions": actions,
                "duration_s": duration_s,
                "aspect": aspect,
                "task_id": task_id,
            }),
        })
    }
}

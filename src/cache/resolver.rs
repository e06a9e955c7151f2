use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tracing::warn;

use crate::cache::entry::{ArtifactKind, CacheEntry, HistoryEntry};
use crate::cache::fingerprint;
use crate::error::ServiceError;
use crate::providers::{GenerationProvider, ProviderError};
use crate::request::GenerationRequest;
use crate::store::KvStore;

pub const DEFAULT_HISTORY_CAP: usize = 20;

const LAST_ARTIFACT_TTL: StdDuration = StdDuration::from_secs(3600);
const SESSION_TTL: StdDuration = StdDuration::from_secs(3600);

fn history_key(user_id: &str) -> String {
    format!("hist:{user_id}")
}

fn last_key(user_id: &str) -> String {
    format!("last:{user_id}")
}

fn session_key(user_id: &str) -> String {
    format!("sess:{user_id}")
}

/// Outcome of a resolve call: either a verified cache entry or a freshly
/// generated artifact, never a partial state.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub artifact_ref: String,
    pub kind: ArtifactKind,
    pub metadata: Value,
    pub cache_hit: bool,
    pub latency_ms: u64,
}

/// The fetch-or-generate component shared by both operation families:
/// fingerprint the request, serve from the store on an unexpired hit,
/// otherwise call the provider once (bounded by a timeout), persist the
/// result, and keep the user's bounded history current.
///
/// Concurrent identical misses may each call the provider; the last write
/// wins and the artifacts are interchangeable, so no in-flight
/// de-duplication is attempted.
pub struct Resolver {
    store: Arc<dyn KvStore>,
    history_cap: usize,
    provider_timeout: StdDuration,
}

impl Resolver {
    pub fn new(store: Arc<dyn KvStore>, history_cap: usize, provider_timeout: StdDuration) -> Self {
        Self {
            store,
            history_cap,
            provider_timeout,
        }
    }

    pub async fn resolve(
        &self,
        provider: &dyn GenerationProvider,
        request: &GenerationRequest,
        ttl: Duration,
    ) -> Result<Resolved, ServiceError> {
        let started = Instant::now();
        let params_value = serde_json::to_value(&request.params)
            .map_err(|err| ServiceError::Internal(format!("encoding params failed: {err}")))?;
        let key = fingerprint::cache_key(
            request.params.namespace(),
            &fingerprint::fingerprint(&request.user_id, &request.input_ref, &params_value),
        );

        if let Some(entry) = self.lookup(&key).await {
            self.record_success(request, &params_value, &entry.artifact_ref, entry.kind)
                .await;
            return Ok(Resolved {
                artifact_ref: entry.artifact_ref,
                kind: entry.kind,
                metadata: entry.metadata,
                cache_hit: true,
                latency_ms: started.elapsed().as_millis() as u64,
            });
        }

        let generated = match tokio::time::timeout(self.provider_timeout, provider.generate(request))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProviderError::Timeout {
                    seconds: self.provider_timeout.as_secs(),
                }
                .into());
            }
        };

        let now = Utc::now();
        let entry = CacheEntry {
            artifact_ref: generated.artifact_ref.clone(),
            kind: generated.kind,
            metadata: generated.metadata.clone(),
            created_at: now,
            expires_at: now + ttl,
        };
        match serde_json::to_string(&entry) {
            Ok(payload) => {
                if let Err(err) = self.store.set(&key, &payload, ttl.to_std().ok()).await {
                    warn!(key = %key, error = %err, "cache write failed, returning uncached result");
                }
            }
            Err(err) => warn!(key = %key, error = %err, "cache entry encoding failed"),
        }
        self.record_success(request, &params_value, &generated.artifact_ref, generated.kind)
            .await;

        Ok(Resolved {
            artifact_ref: generated.artifact_ref,
            kind: generated.kind,
            metadata: generated.metadata,
            cache_hit: false,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Newest-first history for one user. Unknown users read as empty.
    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, ServiceError> {
        let limit = limit.unwrap_or(self.history_cap).min(self.history_cap);
        let rows = self.store.range(&history_key(user_id), limit).await?;
        Ok(rows
            .iter()
            .filter_map(|row| serde_json::from_str(row).ok())
            .collect())
    }

    pub async fn last_artifact(&self, user_id: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.store.get(&last_key(user_id)).await?)
    }

    /// Advisory session context; never load bearing.
    pub async fn session(&self, user_id: &str) -> Result<Option<Value>, ServiceError> {
        let raw = self.store.get(&session_key(user_id)).await?;
        Ok(raw.and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let raw = match self.store.get(key).await {
            Ok(value) => value?,
            Err(err) => {
                warn!(key = %key, error = %err, "cache store unreachable, treating as miss");
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key = %key, error = %err, "discarding unreadable cache entry");
                return None;
            }
        };
        if entry.is_expired(Utc::now()) {
            return None;
        }
        Some(entry)
    }

    /// Records a user-facing completion: history append (head insert, tail
    /// trim), last-artifact pointer, advisory session context. Runs on
    /// cache hits too; failures here are logged, never surfaced.
    async fn record_success(
        &self,
        request: &GenerationRequest,
        params_value: &Value,
        artifact_ref: &str,
        kind: ArtifactKind,
    ) {
        let entry = HistoryEntry {
            kind,
            input_ref: request.input_ref.clone(),
            artifact_ref: artifact_ref.to_string(),
            params: params_value.clone(),
            created_at: Utc::now(),
        };
        match serde_json::to_string(&entry) {
            Ok(line) => {
                if let Err(err) = self
                    .store
                    .push_capped(&history_key(&request.user_id), &line, self.history_cap)
                    .await
                {
                    warn!(user_id = %request.user_id, error = %err, "history append failed");
                }
            }
            Err(err) => warn!(user_id = %request.user_id, error = %err, "history entry encoding failed"),
        }
        if let Err(err) = self
            .store
            .set(&last_key(&request.user_id), artifact_ref, Some(LAST_ARTIFACT_TTL))
            .await
        {
            warn!(user_id = %request.user_id, error = %err, "last-artifact write failed");
        }
        let session = json!({
            "input_ref": request.input_ref,
            "namespace": request.params.namespace(),
        });
        if let Err(err) = self
            .store
            .set(&session_key(&request.user_id), &session.to_string(), Some(SESSION_TTL))
            .await
        {
            warn!(user_id = %request.user_id, error = %err, "session write failed");
        }
    }
}

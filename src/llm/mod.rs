//! Unified access to the generative chat backends: a named registry with
//! default-backend fallback, retry with exponential backoff, and
//! per-backend usage counters.

/// OpenAI-compatible HTTP chat backend.
pub mod http;

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Result alias for chat-backend operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Attempts made per completion call before the failure is surfaced.
const MAX_ATTEMPTS: u32 = 3;
/// Backoff before the second attempt; doubles for each further attempt.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Errors raised by chat backends and the service wrapping them.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The backend endpoint could not be reached.
    #[error("chat backend unreachable: {message}")]
    Transport {
        /// Human-readable summary of the transport failure.
        message: String,
        /// Underlying client error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered with a non-success HTTP status.
    #[error("chat backend returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The request exceeded the per-attempt deadline.
    #[error("chat request timed out after {0:?}")]
    Timeout(Duration),
    /// The backend answered but the completion content was missing.
    #[error("chat response carried no completion content")]
    MalformedResponse,
    /// No backend is registered under the requested (or default) name.
    #[error("no chat backend registered under `{name}`")]
    UnknownBackend {
        /// The name that failed to resolve.
        name: String,
    },
}

/// One entry of a chat conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Speaker role (`system` or `user`).
    pub role: &'static str,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// A single completion request handed to a backend.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Ordered conversation to complete.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature; high for novelty, low for determinism.
    pub temperature: f32,
    /// Upper bound on the completion length.
    pub max_tokens: u32,
}

/// Abstraction over one generative chat endpoint.
pub trait ChatBackend: Send + Sync {
    /// Produce a completion for the request, returning the raw text.
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'static, LlmResult<String>>;
}

#[derive(Debug, Default)]
struct BackendCounters {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Point-in-time usage counters for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendMetrics {
    /// Logical completion calls issued.
    pub requests: u64,
    /// Calls that eventually produced a completion.
    pub successes: u64,
    /// Calls that exhausted every attempt.
    pub failures: u64,
    /// Cumulative wall-clock latency of successful calls, in milliseconds.
    pub total_latency_ms: u64,
}

/// Registry of chat backends with retry and usage accounting. An unknown
/// backend name falls back to the configured default so a stale client
/// selection degrades instead of erroring.
pub struct LlmService {
    backends: HashMap<String, Arc<dyn ChatBackend>>,
    default_backend: String,
    counters: DashMap<String, Arc<BackendCounters>>,
}

impl LlmService {
    /// Create an empty registry whose fallback is `default_backend`.
    pub fn new(default_backend: impl Into<String>) -> Self {
        Self {
            backends: HashMap::new(),
            default_backend: default_backend.into(),
            counters: DashMap::new(),
        }
    }

    /// Build the registry from configuration, skipping backends whose HTTP
    /// client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut service = Self::new(config.default_backend.clone());
        for settings in &config.backends {
            match http::HttpChatBackend::new(settings) {
                Ok(backend) => service.register(settings.name.clone(), Arc::new(backend)),
                Err(err) => warn!(
                    backend = %settings.name,
                    error = %err,
                    "skipping chat backend; client construction failed"
                ),
            }
        }
        service
    }

    /// Register a backend under `name`.
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn ChatBackend>) {
        self.backends.insert(name.into(), backend);
    }

    /// Name of the fallback backend.
    pub fn default_backend(&self) -> &str {
        &self.default_backend
    }

    /// Run a completion against the named backend, retrying transient
    /// failures with exponential backoff before surfacing the last error.
    pub async fn complete(&self, backend: &str, request: CompletionRequest) -> LlmResult<String> {
        let (name, resolved) = self.resolve(backend)?;
        let counters = self.counters_for(name);
        counters.requests.fetch_add(1, Ordering::Relaxed);

        let started = Instant::now();
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=MAX_ATTEMPTS {
            match resolved.complete(request.clone()).await {
                Ok(text) => {
                    let elapsed = started.elapsed();
                    counters.successes.fetch_add(1, Ordering::Relaxed);
                    counters
                        .total_latency_ms
                        .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
                    info!(
                        backend = name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "chat completion succeeded"
                    );
                    return Ok(text);
                }
                Err(err) if attempt < MAX_ATTEMPTS => {
                    warn!(backend = name, attempt, error = %err, "chat completion failed; retrying");
                    sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(backend = name, attempts = MAX_ATTEMPTS, error = %err, "chat completion exhausted retries");
                    return Err(err);
                }
            }
        }

        unreachable!("retry loop always returns")
    }

    /// Usage counters recorded for `backend`, if it was ever called.
    pub fn metrics(&self, backend: &str) -> Option<BackendMetrics> {
        self.counters.get(backend).map(|counters| BackendMetrics {
            requests: counters.requests.load(Ordering::Relaxed),
            successes: counters.successes.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
            total_latency_ms: counters.total_latency_ms.load(Ordering::Relaxed),
        })
    }

    fn resolve(&self, name: &str) -> LlmResult<(&str, &Arc<dyn ChatBackend>)> {
        if let Some((key, backend)) = self.backends.get_key_value(name) {
            return Ok((key.as_str(), backend));
        }

        warn!(
            requested = name,
            fallback = %self.default_backend,
            "unknown chat backend; falling back to default"
        );
        self.backends
            .get_key_value(&self.default_backend)
            .map(|(key, backend)| (key.as_str(), backend))
            .ok_or_else(|| LlmError::UnknownBackend {
                name: self.default_backend.clone(),
            })
    }

    fn counters_for(&self, name: &str) -> Arc<BackendCounters> {
        self.counters
            .entry(name.to_owned())
            .or_default()
            .clone()
    }
}

/// Parse a JSON payload out of a chat completion. Tries the whole response
/// first, then the widest brace-delimited window, which covers completions
/// wrapped in prose or code fences.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str::<T>(raw.trim()) {
        return Some(value);
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<T>(&raw[start..=end]).ok()
}

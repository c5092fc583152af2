use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of live game sessions.
    pub active_sessions: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(active_sessions: usize) -> Self {
        Self {
            status: "ok".to_string(),
            active_sessions,
        }
    }

    /// Create a health response indicating the puzzle repository is away
    /// and the service runs in generative-only mode.
    pub fn degraded(active_sessions: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            active_sessions,
        }
    }
}

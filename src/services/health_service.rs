use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with the current health payload while logging connectivity
/// issues with the puzzle repository.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let sessions = state.session_count();

    match state.puzzle_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "repository health check failed");
            }
        }
        None => warn!("puzzle repository unavailable (degraded mode)"),
    }

    if state.is_degraded().await {
        HealthResponse::degraded(sessions)
    } else {
        HealthResponse::ok(sessions)
    }
}

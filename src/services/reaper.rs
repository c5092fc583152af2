//! Background eviction of idle sessions and stale cached puzzles.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::state::{AppState, SharedState};

/// How often the reaper scans the registry.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Idle time after which a session is evicted.
pub const SESSION_TTL: Duration = Duration::from_secs(600);
/// Age after which a cached puzzle is dropped from the lookup cache. Long
/// enough to outlive any live session and its answer-reveal flows.
pub const PUZZLE_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Spawn the reaper loop. Called exactly once at startup; the task runs for
/// the lifetime of the process.
pub fn spawn(state: SharedState) -> JoinHandle<()> {
    tokio::spawn(run(state))
}

async fn run(state: SharedState) {
    loop {
        sleep(SWEEP_INTERVAL).await;
        sweep(&state);
    }
}

/// One scan: evict sessions idle past [`SESSION_TTL`] and cache entries
/// older than [`PUZZLE_CACHE_TTL`].
pub(crate) fn sweep(state: &AppState) {
    for session_id in state.evict_idle_sessions(SESSION_TTL) {
        info!(%session_id, "evicted idle session");
    }

    let stale = state.evict_stale_puzzles(PUZZLE_CACHE_TTL);
    if stale > 0 {
        debug!(count = stale, "dropped stale puzzle cache entries");
    }
}

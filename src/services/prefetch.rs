//! Background queue refills (the "catapult"): fire-and-forget bursts that
//! keep each session's puzzle buffer topped up so foreground requests never
//! wait on generation.

use tracing::{debug, warn};

use crate::services::puzzle_source;
use crate::state::SharedState;

/// Schedule a background burst producing up to `count` puzzles for the
/// session. The caller never awaits the burst; completion is observable
/// only through logs. Overlapping bursts for one session are tolerated;
/// surplus puzzles just sit in the ring buffer.
pub fn schedule_burst(state: &SharedState, session_id: &str, count: usize) {
    let state = state.clone();
    let session_id = session_id.to_owned();
    tokio::spawn(run_burst(state, session_id, count));
}

/// Burst body, one puzzle per iteration. The session is re-checked every
/// round so a burst outliving its session stops early instead of erroring;
/// a cleared session mid-burst is expected, not a failure.
pub(crate) async fn run_burst(state: SharedState, session_id: String, count: usize) {
    for produced in 0..count {
        let Some(session) = state.session(&session_id) else {
            debug!(%session_id, produced, "session gone; aborting prefetch burst");
            return;
        };

        let puzzle = match puzzle_source::produce_puzzle(
            &state,
            session.difficulty,
            session.language,
            &session.backend,
            Some(&session.vocabulary),
        )
        .await
        {
            Ok(puzzle) => puzzle,
            Err(err) => {
                warn!(%session_id, produced, error = %err, "prefetch burst stopped early");
                return;
            }
        };

        // The session may have been cleared while we were generating.
        if state.session(&session_id).is_none() {
            debug!(%session_id, "session cleared mid-burst; dropping puzzle");
            return;
        }

        let mut queue = session.queue.lock().await;
        if let Some(displaced) = queue.push(puzzle) {
            debug!(
                %session_id,
                displaced = %displaced.id,
                "queue full; displaced oldest buffered puzzle"
            );
        }
    }

    debug!(%session_id, count, "prefetch burst completed");
}

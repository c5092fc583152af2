//! Session registry operations: start, next-puzzle, clear, demo, and
//! answer reveal.

use std::sync::Arc;

use tracing::{info, warn};

use crate::dto::game::{
    AnswerView, ClearSessionResponse, DemoPuzzleRequest, DemoPuzzleView, NextPuzzleRequest,
    PuzzleView, StartSessionRequest, StartSessionResponse,
};
use crate::error::ServiceError;
use crate::services::{prefetch, puzzle_source};
use crate::state::SharedState;
use crate::state::session::{REFILL_BURST, REFILL_WATERMARK, START_BURST, Session};

/// Start a game session: tear down any colliding session, produce the
/// first puzzle synchronously, and schedule a background burst so the
/// following puzzles are already buffered when the player asks for them.
///
/// The first puzzle is returned directly and never enters the queue, so it
/// is delivered before any prefetched puzzle.
pub async fn start_session(
    state: &SharedState,
    request: StartSessionRequest,
) -> Result<StartSessionResponse, ServiceError> {
    let StartSessionRequest {
        session_id,
        difficulty,
        language,
        llm,
    } = request;
    let backend = llm.unwrap_or_else(|| state.llm().default_backend().to_owned());

    info!(
        %session_id,
        difficulty = difficulty.as_str(),
        language = language.as_str(),
        %backend,
        "starting game session"
    );

    if state.remove_session(&session_id).is_some() {
        warn!(%session_id, "session already exists; replacing it");
    }

    let session = Arc::new(Session::new(difficulty, language, backend));
    state.insert_session(session_id.clone(), session.clone());

    let first = puzzle_source::produce_puzzle(
        state,
        difficulty,
        language,
        &session.backend,
        Some(&session.vocabulary),
    )
    .await?;

    prefetch::schedule_burst(state, &session_id, START_BURST);

    info!(%session_id, first_puzzle = %first.id, "game session started");
    Ok(StartSessionResponse {
        status: "success".into(),
        message: "Game session started".into(),
        first_puzzle: PuzzleView::from(first.as_ref()),
    })
}

/// Deliver the next puzzle of a session, preferring the buffered queue.
///
/// An empty queue falls back to synchronous generation; the latency is
/// visible to the caller but the case is rare since bursts usually stay
/// ahead. Dropping under the low watermark schedules a refill burst.
pub async fn next_puzzle(
    state: &SharedState,
    request: NextPuzzleRequest,
) -> Result<PuzzleView, ServiceError> {
    let session_id = request.session_id;
    let session = state
        .session(&session_id)
        .ok_or_else(|| ServiceError::SessionNotFound(session_id.clone()))?;
    session.touch();

    let (popped, remaining) = {
        let mut queue = session.queue.lock().await;
        let popped = queue.pop();
        (popped, queue.len())
    };

    let puzzle = match popped {
        Some(puzzle) => puzzle,
        None => {
            warn!(%session_id, "puzzle queue empty; generating synchronously");
            puzzle_source::produce_puzzle(
                state,
                session.difficulty,
                session.language,
                &session.backend,
                Some(&session.vocabulary),
            )
            .await?
        }
    };

    if remaining < REFILL_WATERMARK {
        prefetch::schedule_burst(state, &session_id, REFILL_BURST);
    }

    info!(%session_id, puzzle = %puzzle.id, remaining, "next puzzle delivered");
    Ok(PuzzleView::from(puzzle.as_ref()))
}

/// Tear a session down, discarding its queue and vocabulary. Idempotent:
/// clearing an absent session succeeds quietly.
pub fn clear_session(state: &SharedState, session_id: &str) -> ClearSessionResponse {
    if state.remove_session(session_id).is_some() {
        info!(%session_id, "session cleared");
    }

    ClearSessionResponse {
        status: "success".into(),
        message: "Session cleared".into(),
    }
}

/// Produce a one-off demo puzzle with no session affinity. Always takes the
/// generative path and returns the answer inline.
pub async fn demo_puzzle(
    state: &SharedState,
    request: DemoPuzzleRequest,
) -> Result<DemoPuzzleView, ServiceError> {
    let DemoPuzzleRequest {
        difficulty,
        language,
        llm,
    } = request;
    let backend = llm.unwrap_or_else(|| state.llm().default_backend().to_owned());

    let puzzle = puzzle_source::produce_puzzle(state, difficulty, language, &backend, None).await?;

    warn!(puzzle = %puzzle.id, "demo endpoint revealed an answer");
    Ok(DemoPuzzleView::from(puzzle.as_ref()))
}

/// Reveal the canonical answer of a cached puzzle, used by skip flows.
pub fn puzzle_answer(state: &SharedState, puzzle_id: &str) -> Result<AnswerView, ServiceError> {
    let puzzle = state
        .cached_puzzle(puzzle_id)
        .ok_or_else(|| ServiceError::PuzzleNotFound(puzzle_id.to_owned()))?;

    Ok(AnswerView {
        puzzle_id: puzzle.id.clone(),
        answer: puzzle.content.answer().to_owned(),
        explanation: puzzle.content.explanation().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::dto::game::PuzzleFace;
    use crate::llm::LlmResult;
    use crate::services::puzzle_source::testing::{en_reply, scripted_state, zh_reply};
    use crate::state::puzzle::{Difficulty, Language};
    use crate::state::session::QUEUE_CAPACITY;

    fn start_request(session_id: &str, language: Language) -> StartSessionRequest {
        StartSessionRequest {
            session_id: session_id.into(),
            difficulty: Difficulty::Easy,
            language,
            llm: Some("qwen".into()),
        }
    }

    fn next_request(session_id: &str) -> NextPuzzleRequest {
        NextPuzzleRequest {
            session_id: session_id.into(),
        }
    }

    /// Synthetic English puzzles with globally distinct tokens, plentiful
    /// enough that racing bursts never drain the script.
    fn en_replies(count: usize) -> Vec<LlmResult<String>> {
        (0..count)
            .map(|tag| {
                en_reply(
                    [
                        &format!("in{tag}a"),
                        &format!("in{tag}b"),
                        &format!("in{tag}c"),
                    ],
                    &format!("ans{tag}"),
                )
            })
            .collect()
    }

    /// Distinct Chinese triples `[char1, char2, answer]` from a fixed pool.
    fn zh_replies(count: usize) -> Vec<LlmResult<String>> {
        const POOL: &[[&str; 3]] = &[
            ["天", "人", "地"],
            ["山", "流", "水"],
            ["日", "亮", "月"],
            ["春", "暖", "风"],
            ["学", "堂", "校"],
            ["海", "浪", "洋"],
            ["花", "木", "草"],
            ["雪", "寒", "冰"],
            ["星", "夜", "空"],
            ["金", "银", "铜"],
        ];
        POOL.iter()
            .take(count)
            .map(|[char1, char2, answer]| zh_reply(char1, char2, answer))
            .collect()
    }

    #[tokio::test]
    async fn start_session_returns_first_puzzle_without_answer() {
        let (state, _backend) = scripted_state(zh_replies(6));

        let response = start_session(&state, start_request("s1", Language::Zh))
            .await
            .unwrap();

        assert_eq!(response.status, "success");
        let PuzzleFace::Char { pattern, .. } = &response.first_puzzle.face else {
            panic!("expected a char puzzle");
        };
        assert!((1..=3).contains(pattern));
        let json = serde_json::to_value(&response.first_puzzle).unwrap();
        assert!(json.get("answer").is_none());
    }

    #[tokio::test]
    async fn colliding_session_is_replaced() {
        let (state, _backend) = scripted_state(zh_replies(10));

        start_session(&state, start_request("s1", Language::Zh))
            .await
            .unwrap();
        let first = state.session("s1").unwrap();
        start_session(&state, start_request("s1", Language::Zh))
            .await
            .unwrap();
        let second = state.session("s1").unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(state.session_count(), 1);
    }

    #[tokio::test]
    async fn session_lifecycle_delivers_distinct_puzzles() {
        let (state, _backend) = scripted_state(en_replies(40));

        let started = start_session(&state, start_request("s1", Language::En))
            .await
            .unwrap();
        let mut ids = HashSet::new();
        let mut tokens: HashSet<String> = HashSet::new();
        ids.insert(started.first_puzzle.puzzle_id.clone());
        let first = state
            .cached_puzzle(&started.first_puzzle.puzzle_id)
            .unwrap();
        tokens.extend(first.content.tokens().map(str::to_owned));

        for _ in 0..5 {
            let view = next_puzzle(&state, next_request("s1")).await.unwrap();
            assert!(ids.insert(view.puzzle_id.clone()), "duplicate puzzle id");
            let puzzle = state.cached_puzzle(&view.puzzle_id).unwrap();
            for token in puzzle.content.tokens() {
                assert!(
                    tokens.insert(token.to_owned()),
                    "token `{token}` repeated across the session"
                );
            }
        }

        let cleared = clear_session(&state, "s1");
        assert_eq!(cleared.status, "success");

        let err = next_puzzle(&state, next_request("s1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::SessionNotFound(id) if id == "s1"));
    }

    #[tokio::test]
    async fn clear_session_is_idempotent() {
        let (state, _backend) = scripted_state(vec![]);
        assert_eq!(clear_session(&state, "never-existed").status, "success");
        assert_eq!(clear_session(&state, "never-existed").status, "success");
    }

    #[tokio::test]
    async fn empty_queue_generates_synchronously() {
        let (state, backend) = scripted_state(en_replies(4));
        state.insert_session(
            "s1".into(),
            Arc::new(Session::new(Difficulty::Easy, Language::En, "qwen".into())),
        );

        let view = next_puzzle(&state, next_request("s1")).await.unwrap();
        assert!(state.cached_puzzle(&view.puzzle_id).is_some());
        assert!(backend.calls() >= 1);
    }

    #[tokio::test]
    async fn unknown_session_fails_with_not_found() {
        let (state, _backend) = scripted_state(vec![]);
        let err = next_puzzle(&state, next_request("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn low_watermark_pop_schedules_one_refill_burst() {
        let (state, backend) = scripted_state(en_replies(10));
        let session = Arc::new(Session::new(Difficulty::Easy, Language::En, "qwen".into()));
        state.insert_session("s1".into(), session.clone());

        // Fill the queue to exactly the watermark.
        prefetch::run_burst(state.clone(), "s1".into(), REFILL_WATERMARK).await;
        assert_eq!(session.queue.lock().await.len(), REFILL_WATERMARK);
        let calls_before = backend.calls();

        // Popping 3 -> 2 crosses the watermark and schedules one burst of 3.
        next_puzzle(&state, next_request("s1")).await.unwrap();

        // Let the spawned burst drain the scripted backend.
        for _ in 0..1000 {
            if backend.calls() == calls_before + REFILL_BURST {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(backend.calls(), calls_before + REFILL_BURST);
        assert!(session.queue.lock().await.len() <= QUEUE_CAPACITY);
    }

    #[tokio::test]
    async fn demo_puzzle_reveals_the_answer() {
        let (state, _backend) = scripted_state(zh_replies(1));

        let view = demo_puzzle(
            &state,
            DemoPuzzleRequest {
                difficulty: Difficulty::Easy,
                language: Language::Zh,
                llm: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(view.answer, "地");
        let reveal = puzzle_answer(&state, &view.puzzle_id).unwrap();
        assert_eq!(reveal.answer, "地");
    }

    #[tokio::test]
    async fn missing_puzzle_answer_is_not_found() {
        let (state, _backend) = scripted_state(vec![]);
        let err = puzzle_answer(&state, "puzzle_0_dead").unwrap_err();
        assert!(matches!(err, ServiceError::PuzzleNotFound(_)));
    }
}

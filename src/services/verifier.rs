//! Two-phase answer verification: exact match first, semantic fallback via
//! the chat backend, degrading to reject-by-default when the backend is
//! unavailable.

use serde::Deserialize;
use tracing::{info, warn};

use crate::dto::game::{MatchType, ValidateAnswerRequest, ValidationResult};
use crate::error::ServiceError;
use crate::llm::{CompletionRequest, extract_json};
use crate::services::prompts;
use crate::state::SharedState;
use crate::state::puzzle::normalize_token;

#[derive(Debug, Deserialize)]
struct VerdictPayload {
    correct: bool,
    #[serde(default)]
    reason: String,
}

/// Verify a player's answer against the cached puzzle.
///
/// Phase 1 compares normalized strings and never touches a backend. Phase 2
/// asks the chat backend whether a non-exact answer is an equally valid
/// solution. A failing backend yields a degraded "exact match only" reject
/// instead of an error: a wrong answer is the safe default when
/// verification is unavailable.
pub async fn validate_answer(
    state: &SharedState,
    request: ValidateAnswerRequest,
) -> Result<ValidationResult, ServiceError> {
    let ValidateAnswerRequest {
        puzzle_id,
        answer,
        llm,
    } = request;
    let backend = llm.unwrap_or_else(|| state.llm().default_backend().to_owned());

    let puzzle = state
        .cached_puzzle(&puzzle_id)
        .ok_or_else(|| ServiceError::PuzzleNotFound(puzzle_id.clone()))?;
    let canonical = puzzle.content.answer().to_owned();

    if normalize_token(&answer) == normalize_token(&canonical) {
        info!(%puzzle_id, "answer matched exactly");
        return Ok(ValidationResult {
            correct: true,
            match_type: MatchType::Exact,
            reason: "answer matches exactly".into(),
            correct_answer: canonical,
        });
    }

    info!(%puzzle_id, "checking alternative answer with chat backend");
    let request = CompletionRequest {
        messages: prompts::verification_messages(&puzzle, &answer),
        temperature: prompts::VERIFICATION_TEMPERATURE,
        max_tokens: prompts::VERIFICATION_MAX_TOKENS,
    };

    match state.llm().complete(&backend, request).await {
        Ok(response) => match extract_json::<VerdictPayload>(&response) {
            Some(verdict) => {
                info!(%puzzle_id, correct = verdict.correct, "semantic verification verdict");
                Ok(ValidationResult {
                    correct: verdict.correct,
                    match_type: if verdict.correct {
                        MatchType::LlmVerified
                    } else {
                        MatchType::Incorrect
                    },
                    reason: verdict.reason,
                    correct_answer: canonical,
                })
            }
            None => {
                warn!(%puzzle_id, "unparseable verification verdict; degrading");
                Ok(degraded_result(canonical))
            }
        },
        Err(err) => {
            warn!(%puzzle_id, error = %err, "verification backend failed; degrading");
            Ok(degraded_result(canonical))
        }
    }
}

fn degraded_result(correct_answer: String) -> ValidationResult {
    ValidationResult {
        correct: false,
        match_type: MatchType::Error,
        reason: "verification service unavailable, exact match only".into(),
        correct_answer,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::LlmError;
    use crate::services::puzzle_source::testing::scripted_state;
    use crate::state::SharedState;
    use crate::state::puzzle::{Difficulty, Puzzle, PuzzleOrigin, samples};

    fn request(puzzle_id: &str, answer: &str) -> ValidateAnswerRequest {
        ValidateAnswerRequest {
            puzzle_id: puzzle_id.into(),
            answer: answer.into(),
            llm: None,
        }
    }

    fn cache_word_puzzle(state: &SharedState) -> Arc<Puzzle> {
        let puzzle = Arc::new(Puzzle::new(
            Difficulty::Easy,
            PuzzleOrigin::Generated,
            samples::word_content(["sun", "moon", "candle"], "light"),
        ));
        state.cache_puzzle(&puzzle);
        puzzle
    }

    #[tokio::test]
    async fn unknown_puzzle_id_is_an_error() {
        let (state, _backend) = scripted_state(vec![]);
        let err = validate_answer(&state, request("nope", "light"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PuzzleNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn exact_match_never_calls_the_backend() {
        let (state, backend) = scripted_state(vec![]);
        let puzzle = cache_word_puzzle(&state);

        let result = validate_answer(&state, request(&puzzle.id, "  LIGHT "))
            .await
            .unwrap();

        assert!(result.correct);
        assert_eq!(result.match_type, MatchType::Exact);
        assert_eq!(result.correct_answer, "light");
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn alternative_answer_accepted_by_the_backend() {
        let (state, backend) = scripted_state([Ok(
            r#"{"correct": true, "reason": "beam also forms all three"}"#.to_owned(),
        )]);
        let puzzle = cache_word_puzzle(&state);

        let result = validate_answer(&state, request(&puzzle.id, "beam"))
            .await
            .unwrap();

        assert!(result.correct);
        assert_eq!(result.match_type, MatchType::LlmVerified);
        assert_eq!(result.correct_answer, "light");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn rejected_answer_reports_incorrect() {
        let (state, _backend) = scripted_state([Ok(
            r#"{"correct": false, "reason": "no valid compounds"}"#.to_owned(),
        )]);
        let puzzle = cache_word_puzzle(&state);

        let result = validate_answer(&state, request(&puzzle.id, "tree"))
            .await
            .unwrap();

        assert!(!result.correct);
        assert_eq!(result.match_type, MatchType::Incorrect);
        assert_eq!(result.reason, "no valid compounds");
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_degrades_instead_of_erroring() {
        let (state, _backend) = scripted_state([
            Err(LlmError::Timeout(std::time::Duration::from_secs(60))),
            Err(LlmError::Timeout(std::time::Duration::from_secs(60))),
            Err(LlmError::Timeout(std::time::Duration::from_secs(60))),
        ]);
        let puzzle = cache_word_puzzle(&state);

        let result = validate_answer(&state, request(&puzzle.id, "beam"))
            .await
            .unwrap();

        assert!(!result.correct);
        assert_eq!(result.match_type, MatchType::Error);
        assert_eq!(result.correct_answer, "light");
    }

    #[tokio::test]
    async fn unparseable_verdict_degrades() {
        let (state, _backend) = scripted_state([Ok("I think it is fine".to_owned())]);
        let puzzle = cache_word_puzzle(&state);

        let result = validate_answer(&state, request(&puzzle.id, "beam"))
            .await
            .unwrap();

        assert_eq!(result.match_type, MatchType::Error);
    }
}

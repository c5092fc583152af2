//! Produces one validated puzzle per call: repository rows first, then the
//! generative fallback with bounded retries.

use std::sync::Arc;

use rand::seq::IndexedRandom;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::llm::{CompletionRequest, extract_json};
use crate::services::prompts;
use crate::state::SharedState;
use crate::state::puzzle::{
    CharPuzzle, Difficulty, Language, Puzzle, PuzzleContent, PuzzleOrigin, WordPuzzle,
};
use crate::state::session::Vocabulary;

/// Generation attempts before the resolver gives up.
const MAX_GENERATION_ATTEMPTS: usize = 3;

/// Produce one validated puzzle for the given parameters.
///
/// With a session vocabulary, pre-authored repository rows are preferred:
/// rows repeating consumed tokens (or violating the uniqueness rule) are
/// filtered out and one survivor is picked uniformly at random. When that
/// yields nothing (no repository installed, a query failure, or the
/// session exhausted every non-repeating row), generation takes over.
/// Without a vocabulary (demo flow) the repository is bypassed entirely.
///
/// Either way the puzzle lands in the process-wide lookup cache before it
/// is handed back, so answer lookups can find it by id alone.
pub async fn produce_puzzle(
    state: &SharedState,
    difficulty: Difficulty,
    language: Language,
    backend: &str,
    vocabulary: Option<&Mutex<Vocabulary>>,
) -> Result<Arc<Puzzle>, ServiceError> {
    if let Some(vocabulary) = vocabulary {
        if let Some(puzzle) = from_repository(state, difficulty, language, vocabulary).await {
            return Ok(puzzle);
        }
    }

    generate(state, difficulty, language, backend, vocabulary).await
}

async fn from_repository(
    state: &SharedState,
    difficulty: Difficulty,
    language: Language,
    vocabulary: &Mutex<Vocabulary>,
) -> Option<Arc<Puzzle>> {
    let store = state.puzzle_store().await?;
    let rows = match store.find_puzzles(difficulty, language).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "repository query failed; falling back to generation");
            return None;
        }
    };

    // Pick and record under one lock so concurrent bursts cannot agree on
    // the same row.
    let mut guard = vocabulary.lock().await;
    let candidates: Vec<_> = rows
        .into_iter()
        .filter(|row| {
            row.content.has_unique_tokens() && !guard.contains_any(row.content.tokens())
        })
        .collect();

    let row = candidates.choose(&mut rand::rng())?;
    guard.record(row.content.tokens());
    drop(guard);

    let puzzle = Arc::new(Puzzle::new(
        difficulty,
        PuzzleOrigin::Repository,
        row.content.clone(),
    ));
    state.cache_puzzle(&puzzle);
    debug!(
        puzzle = %puzzle.id,
        candidates = candidates.len(),
        "picked puzzle from repository"
    );
    Some(puzzle)
}

async fn generate(
    state: &SharedState,
    difficulty: Difficulty,
    language: Language,
    backend: &str,
    vocabulary: Option<&Mutex<Vocabulary>>,
) -> Result<Arc<Puzzle>, ServiceError> {
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let request = CompletionRequest {
            messages: prompts::generation_messages(difficulty, language),
            temperature: prompts::GENERATION_TEMPERATURE,
            max_tokens: prompts::GENERATION_MAX_TOKENS,
        };

        let response = state
            .llm()
            .complete(backend, request)
            .await
            .map_err(|source| ServiceError::GenerationFailed {
                attempts: attempt,
                source: Some(source),
            })?;

        let Some(content) = parse_content(&response, language) else {
            warn!(attempt, "generated puzzle failed to parse; retrying");
            continue;
        };

        if !content.has_unique_tokens() {
            warn!(attempt, "generated puzzle violates token uniqueness; retrying");
            continue;
        }

        if let Some(vocabulary) = vocabulary {
            let mut guard = vocabulary.lock().await;
            if guard.contains_any(content.tokens()) {
                warn!(attempt, "generated puzzle repeats session vocabulary; retrying");
                continue;
            }
            guard.record(content.tokens());
        }

        let puzzle = Arc::new(Puzzle::new(difficulty, PuzzleOrigin::Generated, content));
        state.cache_puzzle(&puzzle);
        debug!(puzzle = %puzzle.id, attempt, "generated puzzle accepted");
        return Ok(puzzle);
    }

    Err(ServiceError::GenerationFailed {
        attempts: MAX_GENERATION_ATTEMPTS,
        source: None,
    })
}

fn parse_content(raw: &str, language: Language) -> Option<PuzzleContent> {
    match language {
        Language::Zh => extract_json::<CharPuzzle>(raw).map(PuzzleContent::Char),
        Language::En => extract_json::<WordPuzzle>(raw).map(PuzzleContent::Word),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::llm::testing::ScriptedBackend;
    use crate::llm::{LlmResult, LlmService};
    use crate::state::{AppState, SharedState};

    /// JSON completion for an English puzzle built from the given tokens.
    pub(crate) fn en_reply(inputs: [&str; 3], answer: &str) -> LlmResult<String> {
        Ok(format!(
            r#"{{"word1":"{a}","word2":"{b}","word3":"{c}","answer":"{answer}","phrase1":"{a} {answer}","phrase2":"{b} {answer}","phrase3":"{c} {answer}","explanation":"test"}}"#,
            a = inputs[0],
            b = inputs[1],
            c = inputs[2],
        ))
    }

    /// JSON completion for a Chinese puzzle built from the given tokens.
    pub(crate) fn zh_reply(char1: &str, char2: &str, answer: &str) -> LlmResult<String> {
        Ok(format!(
            r#"{{"char1":"{char1}","char2":"{char2}","answer":"{answer}","word1":"{char1}{answer}","word2":"{answer}{char2}","pattern":1,"explanation":"test"}}"#,
        ))
    }

    /// Application state wired to a scripted `qwen` backend.
    pub(crate) fn scripted_state(
        replies: impl IntoIterator<Item = LlmResult<String>>,
    ) -> (SharedState, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::with_replies(replies));
        let mut service = LlmService::new("qwen");
        service.register("qwen", backend.clone());
        (AppState::new(Arc::new(service)), backend)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::{en_reply, scripted_state, zh_reply};
    use super::*;
    use crate::dao::models::PuzzleRow;
    use crate::dao::puzzle_store::memory::StaticPuzzleStore;
    use crate::llm::LlmError;
    use crate::state::puzzle::samples::{char_content, word_content};

    fn row(inputs: [&str; 3], answer: &str) -> PuzzleRow {
        PuzzleRow {
            difficulty: Difficulty::Easy,
            content: word_content(inputs, answer),
            is_used: false,
        }
    }

    #[tokio::test]
    async fn repository_row_wins_over_generation() {
        let (state, backend) = scripted_state(vec![]);
        let store = StaticPuzzleStore::with_rows(vec![row(["sun", "moon", "candle"], "light")]);
        state.install_puzzle_store(Arc::new(store)).await;

        let vocabulary = Mutex::new(Vocabulary::new());
        let puzzle = produce_puzzle(&state, Difficulty::Easy, Language::En, "qwen", Some(&vocabulary))
            .await
            .unwrap();

        assert_eq!(puzzle.origin, PuzzleOrigin::Repository);
        assert_eq!(backend.calls(), 0);
        assert!(state.cached_puzzle(&puzzle.id).is_some());
        assert!(vocabulary.lock().await.contains_any(["light"]));
    }

    #[tokio::test]
    async fn consumed_rows_are_filtered_out() {
        let (state, backend) = scripted_state([en_reply(["salt", "high", "foot"], "ball")]);
        let store = StaticPuzzleStore::with_rows(vec![row(["sun", "moon", "candle"], "light")]);
        state.install_puzzle_store(Arc::new(store)).await;

        let vocabulary = Mutex::new(Vocabulary::new());
        vocabulary.lock().await.record(["light"]);

        let puzzle = produce_puzzle(&state, Difficulty::Easy, Language::En, "qwen", Some(&vocabulary))
            .await
            .unwrap();

        assert_eq!(puzzle.origin, PuzzleOrigin::Generated);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_repository_rows_never_surface() {
        // Row whose answer repeats an input must be rejected even though the
        // repository is expected to hold only valid content.
        let (state, _backend) = scripted_state([en_reply(["salt", "high", "foot"], "ball")]);
        let bad = PuzzleRow {
            difficulty: Difficulty::Easy,
            content: word_content(["sun", "moon", "sun"], "light"),
            is_used: false,
        };
        let store = StaticPuzzleStore::with_rows(vec![bad]);
        state.install_puzzle_store(Arc::new(store)).await;

        let vocabulary = Mutex::new(Vocabulary::new());
        let puzzle = produce_puzzle(&state, Difficulty::Easy, Language::En, "qwen", Some(&vocabulary))
            .await
            .unwrap();
        assert_eq!(puzzle.origin, PuzzleOrigin::Generated);
    }

    #[tokio::test]
    async fn repository_failure_falls_back_to_generation() {
        let (state, backend) = scripted_state([en_reply(["salt", "high", "foot"], "ball")]);
        state
            .install_puzzle_store(Arc::new(StaticPuzzleStore::failing()))
            .await;

        let vocabulary = Mutex::new(Vocabulary::new());
        let puzzle = produce_puzzle(&state, Difficulty::Easy, Language::En, "qwen", Some(&vocabulary))
            .await
            .unwrap();

        assert_eq!(puzzle.origin, PuzzleOrigin::Generated);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn demo_flow_bypasses_the_repository() {
        let (state, backend) = scripted_state([zh_reply("天", "人", "地")]);
        let store = StaticPuzzleStore::with_rows(vec![row(["sun", "moon", "candle"], "light")]);
        let queries = store.query_counter();
        state.install_puzzle_store(Arc::new(store)).await;

        let puzzle = produce_puzzle(&state, Difficulty::Easy, Language::Zh, "qwen", None)
            .await
            .unwrap();

        assert_eq!(puzzle.origin, PuzzleOrigin::Generated);
        assert_eq!(backend.calls(), 1);
        assert_eq!(queries.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_and_invalid_generations_are_retried() {
        let (state, backend) = scripted_state([
            Ok("not json at all".to_owned()),
            // Valid JSON, but the answer repeats an input token.
            en_reply(["sun", "moon", "candle"], "sun"),
            en_reply(["salt", "high", "foot"], "ball"),
        ]);

        let vocabulary = Mutex::new(Vocabulary::new());
        let puzzle = produce_puzzle(&state, Difficulty::Easy, Language::En, "qwen", Some(&vocabulary))
            .await
            .unwrap();

        assert_eq!(backend.calls(), 3);
        assert_eq!(puzzle.content.answer(), "ball");
    }

    #[tokio::test]
    async fn generation_fails_after_exhausting_attempts() {
        let (state, backend) = scripted_state([
            Ok("garbage".to_owned()),
            Ok("garbage".to_owned()),
            Ok("garbage".to_owned()),
        ]);

        let err = produce_puzzle(&state, Difficulty::Easy, Language::En, "qwen", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::GenerationFailed { attempts: 3, source: None }
        ));
        assert_eq!(backend.calls(), 3);
        assert_eq!(state.cached_puzzle_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_exhaustion_surfaces_the_source() {
        let (state, _backend) = scripted_state([
            Err(LlmError::MalformedResponse),
            Err(LlmError::MalformedResponse),
            Err(LlmError::MalformedResponse),
        ]);

        let err = produce_puzzle(&state, Difficulty::Easy, Language::En, "qwen", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::GenerationFailed { source: Some(_), .. }
        ));
    }

    #[tokio::test]
    async fn zh_generation_parses_char_content() {
        let (state, _backend) = scripted_state([zh_reply("学", "堂", "校")]);

        let puzzle = produce_puzzle(&state, Difficulty::Medium, Language::Zh, "qwen", None)
            .await
            .unwrap();

        assert_eq!(puzzle.language(), Language::Zh);
        assert_eq!(puzzle.content.inputs(), char_content("学", "堂", "校").inputs());
        assert_eq!(puzzle.content.answer(), "校");
    }
}

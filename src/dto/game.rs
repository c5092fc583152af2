use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dto::{format_timestamp, validation::validate_identifier};
use crate::state::puzzle::{Difficulty, Language, Puzzle, PuzzleContent};

const MAX_ANSWER_LENGTH: usize = 64;

/// Payload starting a fresh game session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartSessionRequest {
    /// Opaque client-generated session identifier.
    pub session_id: String,
    /// Difficulty tier for every puzzle of the session.
    pub difficulty: Difficulty,
    /// Language mode for every puzzle of the session.
    pub language: Language,
    /// Chat backend to generate with; the default backend when omitted.
    #[serde(default)]
    pub llm: Option<String>,
}

impl Validate for StartSessionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_identifier(&self.session_id) {
            errors.add("session_id", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload requesting the next puzzle of a session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NextPuzzleRequest {
    /// Session to draw from.
    pub session_id: String,
}

impl Validate for NextPuzzleRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_identifier(&self.session_id) {
            errors.add("session_id", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload tearing a session down at the end of a round.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClearSessionRequest {
    /// Session to clear; clearing an absent session is not an error.
    pub session_id: String,
}

impl Validate for ClearSessionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_identifier(&self.session_id) {
            errors.add("session_id", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload submitting an answer for verification.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateAnswerRequest {
    /// Puzzle the answer belongs to.
    pub puzzle_id: String,
    /// The player's answer.
    pub answer: String,
    /// Chat backend for the semantic fallback; the default when omitted.
    #[serde(default)]
    pub llm: Option<String>,
}

impl Validate for ValidateAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_identifier(&self.puzzle_id) {
            errors.add("puzzle_id", err);
        }

        if self.answer.trim().is_empty() {
            let mut err = ValidationError::new("answer_empty");
            err.message = Some("Answer must not be empty".into());
            errors.add("answer", err);
        } else if self.answer.chars().count() > MAX_ANSWER_LENGTH {
            let mut err = ValidationError::new("answer_length");
            err.message =
                Some(format!("Answer must be at most {MAX_ANSWER_LENGTH} characters").into());
            errors.add("answer", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload requesting a one-off demo puzzle with no session affinity.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DemoPuzzleRequest {
    /// Difficulty tier to generate at.
    pub difficulty: Difficulty,
    /// Language mode to generate in.
    pub language: Language,
    /// Chat backend to generate with; the default backend when omitted.
    #[serde(default)]
    pub llm: Option<String>,
}

/// Player-facing projection of a puzzle. Never carries the answer.
#[derive(Debug, Serialize, ToSchema)]
pub struct PuzzleView {
    /// Puzzle identifier used for answer submission and reveal.
    pub puzzle_id: String,
    /// Language mode of the puzzle.
    pub language: Language,
    /// Difficulty tier of the puzzle.
    pub difficulty: Difficulty,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// The language-specific inputs.
    #[serde(flatten)]
    pub face: PuzzleFace,
}

/// Language-specific fields shown to the player.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum PuzzleFace {
    /// Chinese 2-input face.
    Char {
        /// First input character.
        char1: String,
        /// Second input character.
        char2: String,
        /// Ordering tag in `1..=3`.
        pattern: u8,
    },
    /// English 3-input face.
    Word {
        /// First input word.
        word1: String,
        /// Second input word.
        word2: String,
        /// Third input word.
        word3: String,
    },
}

impl From<&Puzzle> for PuzzleView {
    fn from(puzzle: &Puzzle) -> Self {
        let face = match &puzzle.content {
            PuzzleContent::Char(content) => PuzzleFace::Char {
                char1: content.char1.clone(),
                char2: content.char2.clone(),
                pattern: content.pattern,
            },
            PuzzleContent::Word(content) => PuzzleFace::Word {
                word1: content.word1.clone(),
                word2: content.word2.clone(),
                word3: content.word3.clone(),
            },
        };

        Self {
            puzzle_id: puzzle.id.clone(),
            language: puzzle.language(),
            difficulty: puzzle.difficulty,
            created_at: format_timestamp(puzzle.created_at),
            face,
        }
    }
}

/// Response returned once a session has started.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartSessionResponse {
    /// Always `success` on the happy path.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
    /// First puzzle, delivered synchronously and never queued.
    pub first_puzzle: PuzzleView,
}

/// Response returned after clearing a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClearSessionResponse {
    /// Always `success`; clearing is idempotent.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
}

/// Full projection of a demo puzzle, answer included.
#[derive(Debug, Serialize, ToSchema)]
pub struct DemoPuzzleView {
    /// Puzzle identifier.
    pub puzzle_id: String,
    /// Language mode of the puzzle.
    pub language: Language,
    /// Difficulty tier of the puzzle.
    pub difficulty: Difficulty,
    /// The canonical answer, revealed for demo flows only.
    pub answer: String,
    /// Short explanation of the solution.
    pub explanation: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// The language-specific inputs and solution words.
    #[serde(flatten)]
    pub detail: DemoPuzzleDetail,
}

/// Language-specific detail of a demo puzzle.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum DemoPuzzleDetail {
    /// Chinese 2-input detail including the solution compounds.
    Char {
        /// First input character.
        char1: String,
        /// Second input character.
        char2: String,
        /// Ordering tag in `1..=3`.
        pattern: u8,
        /// Compound formed with the first input.
        word1: String,
        /// Compound formed with the second input.
        word2: String,
    },
    /// English 3-input detail including the solution phrases.
    Word {
        /// First input word.
        word1: String,
        /// Second input word.
        word2: String,
        /// Third input word.
        word3: String,
        /// Phrase formed with the first input.
        phrase1: String,
        /// Phrase formed with the second input.
        phrase2: String,
        /// Phrase formed with the third input.
        phrase3: String,
    },
}

impl From<&Puzzle> for DemoPuzzleView {
    fn from(puzzle: &Puzzle) -> Self {
        let detail = match &puzzle.content {
            PuzzleContent::Char(content) => DemoPuzzleDetail::Char {
                char1: content.char1.clone(),
                char2: content.char2.clone(),
                pattern: content.pattern,
                word1: content.word1.clone(),
                word2: content.word2.clone(),
            },
            PuzzleContent::Word(content) => DemoPuzzleDetail::Word {
                word1: content.word1.clone(),
                word2: content.word2.clone(),
                word3: content.word3.clone(),
                phrase1: content.phrase1.clone(),
                phrase2: content.phrase2.clone(),
                phrase3: content.phrase3.clone(),
            },
        };

        Self {
            puzzle_id: puzzle.id.clone(),
            language: puzzle.language(),
            difficulty: puzzle.difficulty,
            answer: puzzle.content.answer().to_owned(),
            explanation: puzzle.content.explanation().to_owned(),
            created_at: format_timestamp(puzzle.created_at),
            detail,
        }
    }
}

/// Answer reveal used by skip and demo flows.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerView {
    /// Puzzle the answer belongs to.
    pub puzzle_id: String,
    /// The canonical answer.
    pub answer: String,
    /// Short explanation of the solution.
    pub explanation: String,
}

/// How a verification verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// The answer matched the canonical one character-for-character.
    Exact,
    /// The semantic check accepted an alternative answer.
    LlmVerified,
    /// The semantic check rejected the answer.
    Incorrect,
    /// The semantic check was unavailable; only exact matches count.
    Error,
}

/// Verdict returned for an answer submission. Always carries the canonical
/// answer so the client can reveal it regardless of the verdict.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationResult {
    /// Whether the answer was accepted.
    pub correct: bool,
    /// How the verdict was reached.
    pub match_type: MatchType,
    /// Short justification.
    pub reason: String,
    /// The canonical answer.
    pub correct_answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::puzzle::{PuzzleOrigin, samples};
    use validator::Validate;

    #[test]
    fn puzzle_view_never_leaks_the_answer() {
        let puzzle = Puzzle::new(
            Difficulty::Easy,
            PuzzleOrigin::Generated,
            samples::word_content(["sun", "moon", "candle"], "light"),
        );
        let view = PuzzleView::from(&puzzle);
        let json = serde_json::to_value(&view).unwrap();

        assert!(json.get("answer").is_none());
        assert_eq!(json["word1"], "sun");
        assert_eq!(json["language"], "en");
    }

    #[test]
    fn char_view_carries_the_pattern_tag() {
        let puzzle = Puzzle::new(
            Difficulty::Medium,
            PuzzleOrigin::Repository,
            samples::char_content("学", "堂", "校"),
        );
        let json = serde_json::to_value(PuzzleView::from(&puzzle)).unwrap();

        assert_eq!(json["char1"], "学");
        assert_eq!(json["pattern"], 1);
        assert!(json.get("word1").is_none());
    }

    #[test]
    fn demo_view_reveals_answer_and_phrases() {
        let puzzle = Puzzle::new(
            Difficulty::Easy,
            PuzzleOrigin::Generated,
            samples::word_content(["sun", "moon", "candle"], "light"),
        );
        let json = serde_json::to_value(DemoPuzzleView::from(&puzzle)).unwrap();

        assert_eq!(json["answer"], "light");
        assert_eq!(json["phrase1"], "sun light");
    }

    #[test]
    fn answer_request_validation_rejects_bad_input() {
        let valid = ValidateAnswerRequest {
            puzzle_id: "puzzle_1_abc".into(),
            answer: "light".into(),
            llm: None,
        };
        assert!(valid.validate().is_ok());

        let blank_answer = ValidateAnswerRequest {
            puzzle_id: "puzzle_1_abc".into(),
            answer: "   ".into(),
            llm: None,
        };
        assert!(blank_answer.validate().is_err());

        let bad_id = ValidateAnswerRequest {
            puzzle_id: "has space".into(),
            answer: "light".into(),
            llm: None,
        };
        assert!(bad_id.validate().is_err());
    }
}

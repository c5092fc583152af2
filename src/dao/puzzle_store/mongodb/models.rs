use serde::{Deserialize, Serialize};

use crate::dao::models::PuzzleRow;
use crate::state::puzzle::{CharPuzzle, Difficulty, Language, PuzzleContent, WordPuzzle};

/// Flat document shape used in the `puzzles` collection. Chinese rows fill
/// the `char*`/`pattern` columns and reuse `word1`/`word2` for the two
/// compounds; English rows fill `word1..3` and `phrase1..3`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPuzzleDocument {
    pub language: Language,
    pub difficulty: Difficulty,
    pub answer: String,
    #[serde(default)]
    pub char1: Option<String>,
    #[serde(default)]
    pub char2: Option<String>,
    #[serde(default)]
    pub pattern: Option<i32>,
    #[serde(default)]
    pub word1: Option<String>,
    #[serde(default)]
    pub word2: Option<String>,
    #[serde(default)]
    pub word3: Option<String>,
    #[serde(default)]
    pub phrase1: Option<String>,
    #[serde(default)]
    pub phrase2: Option<String>,
    #[serde(default)]
    pub phrase3: Option<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub is_used: bool,
}

impl MongoPuzzleDocument {
    /// Assemble the typed content from the flat columns; `None` when the
    /// row is missing fields its language variant requires.
    pub fn into_row(self) -> Option<PuzzleRow> {
        let content = match self.language {
            Language::Zh => PuzzleContent::Char(CharPuzzle {
                char1: self.char1?,
                char2: self.char2?,
                answer: self.answer,
                word1: self.word1?,
                word2: self.word2?,
                pattern: self
                    .pattern
                    .and_then(|raw| u8::try_from(raw).ok())
                    .filter(|tag| (1..=3).contains(tag))
                    .unwrap_or(1),
                explanation: self.explanation,
            }),
            Language::En => PuzzleContent::Word(WordPuzzle {
                word1: self.word1?,
                word2: self.word2?,
                word3: self.word3?,
                answer: self.answer,
                phrase1: self.phrase1?,
                phrase2: self.phrase2?,
                phrase3: self.phrase3?,
                explanation: self.explanation,
            }),
        };

        Some(PuzzleRow {
            difficulty: self.difficulty,
            content,
            is_used: self.is_used,
        })
    }
}

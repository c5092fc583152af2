use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Difficulty tiers offered to players, mapped to education stages in the
/// generation prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Elementary-school vocabulary.
    Easy,
    /// Middle-school vocabulary.
    Medium,
    /// High-school vocabulary.
    Hard,
    /// University-level vocabulary.
    Professional,
}

impl Difficulty {
    /// Stable lowercase name used in prompts, logs, and repository queries.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Professional => "professional",
        }
    }
}

/// Language mode of a puzzle, which also fixes its structural variant:
/// `zh` puzzles carry two input characters, `en` puzzles three input words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Chinese character-association mode (2 inputs + pattern tag).
    Zh,
    /// English word-association mode (3 inputs).
    En,
}

impl Language {
    /// Stable lowercase name used in prompts, logs, and repository queries.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }
}

/// Where a puzzle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleOrigin {
    /// Pulled from the persistent puzzle repository.
    Repository,
    /// Produced by a generative chat backend.
    Generated,
}

/// Two-character Chinese puzzle: the answer combines with both inputs into
/// common words, with `pattern` describing the ordering of the combinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharPuzzle {
    /// First input character.
    pub char1: String,
    /// Second input character.
    pub char2: String,
    /// The connecting character players must find.
    pub answer: String,
    /// Compound formed from the first input and the answer.
    pub word1: String,
    /// Compound formed from the second input and the answer.
    pub word2: String,
    /// Ordering tag in `1..=3` (answer in the middle, on the outside, or on
    /// the right of both compounds).
    #[serde(deserialize_with = "deserialize_pattern")]
    pub pattern: u8,
    /// Short human explanation of the solution.
    #[serde(default)]
    pub explanation: String,
}

/// Three-word English puzzle: the answer forms a compound word or common
/// phrase with each of the three inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPuzzle {
    /// First input word.
    pub word1: String,
    /// Second input word.
    pub word2: String,
    /// Third input word.
    pub word3: String,
    /// The connecting word players must find.
    pub answer: String,
    /// Compound/phrase formed with the first input.
    pub phrase1: String,
    /// Compound/phrase formed with the second input.
    pub phrase2: String,
    /// Compound/phrase formed with the third input.
    pub phrase3: String,
    /// Short human explanation of the solution.
    #[serde(default)]
    pub explanation: String,
}

/// The content of a puzzle in either language variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PuzzleContent {
    /// Chinese 2-input variant.
    Char(CharPuzzle),
    /// English 3-input variant.
    Word(WordPuzzle),
}

impl PuzzleContent {
    /// Language variant this content belongs to.
    pub fn language(&self) -> Language {
        match self {
            PuzzleContent::Char(_) => Language::Zh,
            PuzzleContent::Word(_) => Language::En,
        }
    }

    /// The input tokens shown to the player.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            PuzzleContent::Char(inner) => vec![&inner.char1, &inner.char2],
            PuzzleContent::Word(inner) => vec![&inner.word1, &inner.word2, &inner.word3],
        }
    }

    /// The answer token.
    pub fn answer(&self) -> &str {
        match self {
            PuzzleContent::Char(inner) => &inner.answer,
            PuzzleContent::Word(inner) => &inner.answer,
        }
    }

    /// The explanation attached by the generator, possibly empty.
    pub fn explanation(&self) -> &str {
        match self {
            PuzzleContent::Char(inner) => &inner.explanation,
            PuzzleContent::Word(inner) => &inner.explanation,
        }
    }

    /// All tokens a session consumes when this puzzle is delivered: the
    /// inputs plus the answer.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        let mut tokens = self.inputs();
        tokens.push(self.answer());
        tokens.into_iter()
    }

    /// Check the token-uniqueness rule puzzles must satisfy before they can
    /// be shown to a player: the answer differs from every input, and the
    /// 3-input variant additionally has pairwise-distinct inputs.
    /// Comparison is trimmed and case-insensitive.
    pub fn has_unique_tokens(&self) -> bool {
        let answer = normalize_token(self.answer());
        if answer.is_empty() {
            return false;
        }

        let inputs: Vec<String> = self.inputs().into_iter().map(normalize_token).collect();
        if inputs.iter().any(|input| input.is_empty() || *input == answer) {
            return false;
        }

        if let PuzzleContent::Word(_) = self {
            for (index, input) in inputs.iter().enumerate() {
                if inputs[index + 1..].contains(input) {
                    return false;
                }
            }
        }

        true
    }
}

/// One deliverable question unit.
#[derive(Debug, Clone)]
pub struct Puzzle {
    /// Globally unique identifier (`puzzle_<unix>_<hex suffix>`).
    pub id: String,
    /// Difficulty tier the puzzle was requested at.
    pub difficulty: Difficulty,
    /// Whether the puzzle came from the repository or a generator.
    pub origin: PuzzleOrigin,
    /// The language-specific content.
    pub content: PuzzleContent,
    /// When the puzzle was produced.
    pub created_at: OffsetDateTime,
}

impl Puzzle {
    /// Build a puzzle around validated content, minting a fresh id.
    pub fn new(difficulty: Difficulty, origin: PuzzleOrigin, content: PuzzleContent) -> Self {
        let now = OffsetDateTime::now_utc();
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("puzzle_{}_{}", now.unix_timestamp(), &suffix[..8]),
            difficulty,
            origin,
            content,
            created_at: now,
        }
    }

    /// Language variant, derived from the content.
    pub fn language(&self) -> Language {
        self.content.language()
    }
}

/// Canonical form used for every token comparison in the crate: answer
/// matching, vocabulary tracking, and the uniqueness rule. Lowercasing is a
/// no-op for Chinese characters, so one normalization covers both modes.
pub fn normalize_token(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Accept the pattern tag as either a JSON number or a numeric string; the
/// generators are inconsistent about which they emit.
fn deserialize_pattern<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPattern {
        Number(u8),
        Text(String),
    }

    let pattern = match RawPattern::deserialize(deserializer)? {
        RawPattern::Number(value) => value,
        RawPattern::Text(value) => value
            .trim()
            .parse::<u8>()
            .map_err(|_| serde::de::Error::custom(format!("invalid pattern tag `{value}`")))?,
    };

    if (1..=3).contains(&pattern) {
        Ok(pattern)
    } else {
        Err(serde::de::Error::custom(format!(
            "pattern tag {pattern} outside 1..=3"
        )))
    }
}

#[cfg(test)]
pub(crate) mod samples {
    use super::*;

    pub(crate) fn char_content(char1: &str, char2: &str, answer: &str) -> PuzzleContent {
        PuzzleContent::Char(CharPuzzle {
            char1: char1.into(),
            char2: char2.into(),
            answer: answer.into(),
            word1: format!("{char1}{answer}"),
            word2: format!("{answer}{char2}"),
            pattern: 1,
            explanation: String::new(),
        })
    }

    pub(crate) fn word_content(inputs: [&str; 3], answer: &str) -> PuzzleContent {
        PuzzleContent::Word(WordPuzzle {
            word1: inputs[0].into(),
            word2: inputs[1].into(),
            word3: inputs[2].into(),
            answer: answer.into(),
            phrase1: format!("{} {answer}", inputs[0]),
            phrase2: format!("{} {answer}", inputs[1]),
            phrase3: format!("{} {answer}", inputs[2]),
            explanation: String::new(),
        })
    }
}

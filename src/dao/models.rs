use crate::state::puzzle::{Difficulty, PuzzleContent};

/// One pre-authored puzzle row held by the repository. Rows carry the same
/// content as a generated puzzle plus a usage flag maintained by external
/// tooling; the flag plays no role in selection here.
#[derive(Debug, Clone)]
pub struct PuzzleRow {
    /// Difficulty tier the row was authored for.
    pub difficulty: Difficulty,
    /// Language-specific puzzle content.
    pub content: PuzzleContent,
    /// Usage marker maintained outside this service.
    pub is_used: bool,
}

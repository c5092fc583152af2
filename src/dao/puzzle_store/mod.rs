#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::models::PuzzleRow;
use crate::dao::storage::StorageResult;
use crate::state::puzzle::{Difficulty, Language};

/// Abstraction over the persistent puzzle repository.
pub trait PuzzleStore: Send + Sync {
    /// Fetch every row authored for the given difficulty and language.
    fn find_puzzles(
        &self,
        difficulty: Difficulty,
        language: Language,
    ) -> BoxFuture<'static, StorageResult<Vec<PuzzleRow>>>;
    /// Cheap liveness probe used by the supervisor loop.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the underlying connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

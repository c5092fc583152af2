//! Process-wide shared state: the session registry, the puzzle lookup
//! cache, and the installable puzzle repository.

/// Puzzle domain types and the content-uniqueness rule.
pub mod puzzle;
/// Per-session state: bounded queue and vocabulary tracking.
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use tokio::time::Instant;

use crate::dao::puzzle_store::PuzzleStore;
use crate::llm::LlmService;
use crate::state::puzzle::Puzzle;
use crate::state::session::Session;

/// Cheaply clonable handle to the central application state.
pub type SharedState = Arc<AppState>;

struct CachedPuzzle {
    puzzle: Arc<Puzzle>,
    cached_at: Instant,
}

/// Central application state. Sessions and cached puzzles live in
/// concurrent maps; the puzzle repository is an installable slot so the
/// service keeps running in degraded (generative-only) mode while the
/// database is away.
pub struct AppState {
    llm: Arc<LlmService>,
    sessions: DashMap<String, Arc<Session>>,
    puzzles: DashMap<String, CachedPuzzle>,
    puzzle_store: RwLock<Option<Arc<dyn PuzzleStore>>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a repository is installed.
    pub fn new(llm: Arc<LlmService>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            llm,
            sessions: DashMap::new(),
            puzzles: DashMap::new(),
            puzzle_store: RwLock::new(None),
            degraded: degraded_tx,
        })
    }

    /// Handle to the chat backend registry.
    pub fn llm(&self) -> &LlmService {
        &self.llm
    }

    /// Obtain a handle to the current puzzle repository, if one is installed.
    pub async fn puzzle_store(&self) -> Option<Arc<dyn PuzzleStore>> {
        let guard = self.puzzle_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a puzzle repository implementation and leave degraded mode.
    pub async fn install_puzzle_store(&self, store: Arc<dyn PuzzleStore>) {
        {
            let mut guard = self.puzzle_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current puzzle repository and enter degraded mode.
    pub async fn clear_puzzle_store(&self) {
        {
            let mut guard = self.puzzle_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Whether the service currently runs without a repository.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.puzzle_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) async fn update_degraded(&self, value: bool) {
        if self.is_degraded().await == value {
            return;
        }

        let _ = self.degraded.send(value);
    }

    /// Look up a live session by id.
    pub fn session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Register a session under `id`, returning the replaced one if any.
    pub fn insert_session(&self, id: String, session: Arc<Session>) -> Option<Arc<Session>> {
        self.sessions.insert(id, session)
    }

    /// Remove a session, returning it if it existed.
    pub fn remove_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Register a puzzle in the process-wide lookup cache so answer
    /// delivery and verification can find it by id alone.
    pub fn cache_puzzle(&self, puzzle: &Arc<Puzzle>) {
        self.puzzles.insert(
            puzzle.id.clone(),
            CachedPuzzle {
                puzzle: puzzle.clone(),
                cached_at: Instant::now(),
            },
        );
    }

    /// Look up a cached puzzle by id. Cached puzzles are immutable, so the
    /// returned handle needs no further synchronization.
    pub fn cached_puzzle(&self, id: &str) -> Option<Arc<Puzzle>> {
        self.puzzles.get(id).map(|entry| entry.puzzle.clone())
    }

    /// Number of puzzles currently held by the lookup cache.
    pub fn cached_puzzle_count(&self) -> usize {
        self.puzzles.len()
    }

    /// Drop every session idle longer than `ttl`, returning the evicted ids.
    pub fn evict_idle_sessions(&self, ttl: Duration) -> Vec<String> {
        let mut evicted = Vec::new();
        self.sessions.retain(|id, session| {
            if session.idle_for() > ttl {
                evicted.push(id.clone());
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Drop every cached puzzle older than `ttl`, returning how many went.
    pub fn evict_stale_puzzles(&self, ttl: Duration) -> usize {
        let before = self.puzzles.len();
        self.puzzles
            .retain(|_, entry| entry.cached_at.elapsed() <= ttl);
        before - self.puzzles.len()
    }
}

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::state::puzzle::{Difficulty, Language, Puzzle, normalize_token};

/// Maximum number of buffered puzzles per session.
pub const QUEUE_CAPACITY: usize = 6;
/// Queue length below which a refill burst is scheduled.
pub const REFILL_WATERMARK: usize = 3;
/// Burst size scheduled right after a session starts.
pub const START_BURST: usize = 5;
/// Burst size scheduled by the low-watermark trigger.
pub const REFILL_BURST: usize = 3;

/// Bounded FIFO buffer of ready puzzles. Appending beyond capacity silently
/// displaces the oldest entry; undelivered puzzles are fungible, so dropping
/// one is preferable to blocking a prefetch burst.
#[derive(Debug, Default)]
pub struct PuzzleQueue {
    items: VecDeque<Arc<Puzzle>>,
}

impl PuzzleQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            items: VecDeque::with_capacity(QUEUE_CAPACITY),
        }
    }

    /// Append a puzzle, returning the displaced oldest entry when full.
    pub fn push(&mut self, puzzle: Arc<Puzzle>) -> Option<Arc<Puzzle>> {
        let displaced = if self.items.len() == QUEUE_CAPACITY {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(puzzle);
        displaced
    }

    /// Remove and return the oldest buffered puzzle.
    pub fn pop(&mut self) -> Option<Arc<Puzzle>> {
        self.items.pop_front()
    }

    /// Number of buffered puzzles.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no puzzles.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Tokens a session has already consumed, in normalized form. Used to keep
/// repository picks from repeating words within one play-through. Grows for
/// the life of the session and is discarded with it.
#[derive(Debug, Default)]
pub struct Vocabulary {
    seen: HashSet<String>,
}

impl Vocabulary {
    /// Create an empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any of `tokens` was already consumed by this session.
    pub fn contains_any<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> bool {
        tokens
            .into_iter()
            .any(|token| self.seen.contains(&normalize_token(token)))
    }

    /// Mark `tokens` as consumed.
    pub fn record<'a>(&mut self, tokens: impl IntoIterator<Item = &'a str>) {
        for token in tokens {
            self.seen.insert(normalize_token(token));
        }
    }

    /// Number of distinct consumed tokens.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no token was consumed yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Per-session state: configuration fixed at start, the buffered puzzle
/// queue, and the vocabulary of consumed tokens.
///
/// The queue and vocabulary locks are only ever held for in-memory
/// mutations, never across a repository or chat-backend call.
#[derive(Debug)]
pub struct Session {
    /// Difficulty tier chosen at session start.
    pub difficulty: Difficulty,
    /// Language mode chosen at session start.
    pub language: Language,
    /// Chat backend name requested for this session.
    pub backend: String,
    /// Buffered puzzles awaiting delivery.
    pub queue: Mutex<PuzzleQueue>,
    /// Tokens consumed so far.
    pub vocabulary: Mutex<Vocabulary>,
    last_access: StdMutex<Instant>,
}

impl Session {
    /// Create fresh session state with an empty queue and vocabulary.
    pub fn new(difficulty: Difficulty, language: Language, backend: String) -> Self {
        Self {
            difficulty,
            language,
            backend,
            queue: Mutex::new(PuzzleQueue::new()),
            vocabulary: Mutex::new(Vocabulary::new()),
            last_access: StdMutex::new(Instant::now()),
        }
    }

    /// Refresh the last-access timestamp; called on every delivery.
    pub fn touch(&self) {
        let mut guard = self.last_access.lock().expect("last_access lock poisoned");
        *guard = Instant::now();
    }

    /// How long the session has been idle.
    pub fn idle_for(&self) -> Duration {
        let guard = self.last_access.lock().expect("last_access lock poisoned");
        guard.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::puzzle::samples::{char_content, word_content};
    use crate::state::puzzle::PuzzleOrigin;

    fn puzzle(tag: usize) -> Arc<Puzzle> {
        Arc::new(Puzzle::new(
            Difficulty::Easy,
            PuzzleOrigin::Generated,
            word_content([&format!("in{tag}a"), &format!("in{tag}b"), &format!("in{tag}c")], &format!("ans{tag}")),
        ))
    }

    #[test]
    fn queue_delivers_in_fifo_order() {
        let mut queue = PuzzleQueue::new();
        let first = puzzle(1);
        let second = puzzle(2);
        assert!(queue.push(first.clone()).is_none());
        assert!(queue.push(second.clone()).is_none());

        assert_eq!(queue.pop().unwrap().id, first.id);
        assert_eq!(queue.pop().unwrap().id, second.id);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn queue_overflow_drops_the_oldest_entry() {
        let mut queue = PuzzleQueue::new();
        let entries: Vec<_> = (0..QUEUE_CAPACITY + 1).map(puzzle).collect();

        for entry in &entries[..QUEUE_CAPACITY] {
            assert!(queue.push(entry.clone()).is_none());
        }
        assert_eq!(queue.len(), QUEUE_CAPACITY);

        let displaced = queue.push(entries[QUEUE_CAPACITY].clone());
        assert_eq!(displaced.unwrap().id, entries[0].id);
        assert_eq!(queue.len(), QUEUE_CAPACITY);
        assert_eq!(queue.pop().unwrap().id, entries[1].id);
    }

    #[test]
    fn vocabulary_matches_case_insensitively() {
        let mut vocabulary = Vocabulary::new();
        vocabulary.record(["Sun", "light"]);

        assert!(vocabulary.contains_any(["SUN"]));
        assert!(vocabulary.contains_any([" light "]));
        assert!(!vocabulary.contains_any(["moon", "star"]));
        assert_eq!(vocabulary.len(), 2);
    }

    #[test]
    fn vocabulary_tracks_chinese_tokens() {
        let mut vocabulary = Vocabulary::new();
        vocabulary.record(char_content("学", "堂", "校").tokens());

        assert!(vocabulary.contains_any(["校"]));
        assert!(!vocabulary.contains_any(["天"]));
    }

    #[tokio::test(start_paused = true)]
    async fn touch_resets_idle_time() {
        let session = Session::new(Difficulty::Easy, Language::En, "qwen".into());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(session.idle_for() >= Duration::from_secs(30));

        session.touch();
        assert!(session.idle_for() < Duration::from_secs(1));
    }
}

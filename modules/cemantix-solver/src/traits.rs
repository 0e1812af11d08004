// Trait abstractions for the solver's collaborators.
//
// GameClient / GameSession: the page-interaction layer (one session per worker).
// SimilarityModel: the embedding space, consumed only through "most similar".
// FeedbackStore: the exchange point between explorers and the strategist.
//
// Workers only see these traits, so tests run against in-memory mocks.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use cemantix_common::{AggregatedView, FeedbackSnapshot, Guess, SourceId, WINNING_SCORE};

// ---------------------------------------------------------------------------
// Game interface
// ---------------------------------------------------------------------------

pub type GameResult<T> = std::result::Result<T, GameError>;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Game session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("Game element missing: {0}")]
    ElementMissing(String),

    #[error("Stale game state: {0}")]
    Stale(String),

    #[error("Game I/O error: {0}")]
    Io(String),
}

impl GameError {
    /// Transient errors are worth retrying; a lost session is not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, GameError::SessionUnavailable(_))
    }
}

/// What the game said about a submitted word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuessOutcome {
    Scored(f64),
    /// The game rejected the word (not in its dictionary).
    Unknown,
}

impl GuessOutcome {
    pub fn is_win(&self) -> bool {
        matches!(self, GuessOutcome::Scored(s) if *s == WINNING_SCORE)
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            GuessOutcome::Scored(s) => Some(*s),
            GuessOutcome::Unknown => None,
        }
    }
}

#[async_trait]
pub trait GameClient: Send + Sync {
    /// Open a fresh session (one per worker).
    async fn open_session(&self) -> GameResult<Box<dyn GameSession>>;
}

#[async_trait]
pub trait GameSession: Send {
    /// Dismiss the one-time welcome dialog, if the game shows one.
    async fn dismiss_dialog(&mut self) -> GameResult<()> {
        Ok(())
    }

    async fn submit_guess(&mut self, word: &str) -> GameResult<GuessOutcome>;

    /// Visible feedback rows, best first, bounded to ~100 close + ~100 far.
    async fn current_feedback(&mut self) -> GameResult<Vec<Guess>>;

    async fn check_success(&mut self) -> GameResult<bool>;

    async fn close(&mut self) -> GameResult<()>;
}

// ---------------------------------------------------------------------------
// SimilarityModel
// ---------------------------------------------------------------------------

pub trait SimilarityModel: Send + Sync {
    fn contains(&self, word: &str) -> bool;

    /// Up to `top_n` words nearest to `positive` and away from `negative`,
    /// best first. Callers pass only words the model contains.
    fn most_similar(&self, positive: &[String], negative: &[String], top_n: usize) -> Vec<String>;
}

// ---------------------------------------------------------------------------
// FeedbackStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Replace `source`'s snapshot entirely.
    async fn publish(&self, source: SourceId, snapshot: &FeedbackSnapshot) -> Result<()>;

    /// Merge every readable snapshot. Unreadable snapshots are skipped.
    async fn aggregate(&self) -> AggregatedView;

    /// Empty every source's snapshot.
    async fn reset_all(&self) -> Result<()>;

    /// Delete `source`'s snapshot.
    async fn remove(&self, source: SourceId) -> Result<()>;

    /// Append to the strategist's log of submitted words.
    async fn record_tried(&self, words: &[String]) -> Result<()>;

    /// Every word in the tried log, in submission order.
    async fn tried(&self) -> Result<Vec<String>>;

    async fn remove_tried(&self) -> Result<()>;
}

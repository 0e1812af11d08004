// Test mocks for the solver.
//
// Three mocks matching the three trait boundaries:
// - MockGame (GameClient): word→score map, shared submission log
// - MockModel (SimilarityModel): fixed neighbours, records every query
// - MemoryFeedbackStore (FeedbackStore): in-memory snapshots and tried log

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use cemantix_common::{normalize_word, AggregatedView, FeedbackSnapshot, Guess, SourceId, WINNING_SCORE};

use crate::traits::{
    FeedbackStore, GameClient, GameError, GameResult, GameSession, GuessOutcome, SimilarityModel,
};

// ---------------------------------------------------------------------------
// MockGame
// ---------------------------------------------------------------------------

#[derive(Default)]
struct GameLog {
    submitted: Mutex<Vec<String>>,
    feedback_failures: AtomicU32,
    submit_failures: AtomicU32,
    feedback_reads: AtomicU32,
    sessions_opened: AtomicU32,
    sessions_closed: AtomicU32,
}

/// Word→score game. Unregistered words are `Unknown`. Each session keeps its
/// own board; the submission log and failure budget are shared.
/// Builder pattern: `.with_scores()`, `.with_target()`, `.with_feedback_failures()`.
#[derive(Clone, Default)]
pub struct MockGame {
    scores: Arc<HashMap<String, f64>>,
    fail_open: bool,
    log: Arc<GameLog>,
}

impl MockGame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scores(mut self, scores: &[(&str, f64)]) -> Self {
        let map = Arc::make_mut(&mut self.scores);
        for (word, score) in scores {
            map.insert(normalize_word(word), *score);
        }
        self
    }

    /// Register the hidden word (scores 100).
    pub fn with_target(self, word: &str) -> Self {
        self.with_scores(&[(word, WINNING_SCORE)])
    }

    /// The next `n` feedback reads (across all sessions) fail with a transient error.
    pub fn with_feedback_failures(self, n: u32) -> Self {
        self.log.feedback_failures.store(n, Ordering::SeqCst);
        self
    }

    /// The next `n` submissions fail with a transient error (they are still logged).
    pub fn with_submit_failures(self, n: u32) -> Self {
        self.log.submit_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Every submission from every session, in order.
    pub fn submitted(&self) -> Vec<String> {
        self.log.submitted.lock().unwrap().clone()
    }

    pub fn feedback_reads(&self) -> u32 {
        self.log.feedback_reads.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> u32 {
        self.log.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> u32 {
        self.log.sessions_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameClient for MockGame {
    async fn open_session(&self) -> GameResult<Box<dyn GameSession>> {
        if self.fail_open {
            return Err(GameError::SessionUnavailable("MockGame: open refused".into()));
        }
        self.log.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            game: self.clone(),
            rows: Vec::new(),
            solved: false,
        }))
    }
}

struct MockSession {
    game: MockGame,
    rows: Vec<Guess>,
    solved: bool,
}

#[async_trait]
impl GameSession for MockSession {
    async fn submit_guess(&mut self, word: &str) -> GameResult<GuessOutcome> {
        let log = &self.game.log;
        log.submitted.lock().unwrap().push(word.to_string());
        if take_one(&log.submit_failures) {
            return Err(GameError::ElementMissing("MockGame: guess input not found".into()));
        }
        let Some(score) = self.game.scores.get(&normalize_word(word)).copied() else {
            return Ok(GuessOutcome::Unknown);
        };
        if !self.rows.iter().any(|g| g.word == word) {
            self.rows.push(Guess::new(word, score));
        }
        if score == WINNING_SCORE {
            self.solved = true;
        }
        Ok(GuessOutcome::Scored(score))
    }

    async fn current_feedback(&mut self) -> GameResult<Vec<Guess>> {
        let log = &self.game.log;
        log.feedback_reads.fetch_add(1, Ordering::SeqCst);
        if take_one(&log.feedback_failures) {
            return Err(GameError::Stale("MockGame: feedback table re-rendered".into()));
        }
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(rows)
    }

    async fn check_success(&mut self) -> GameResult<bool> {
        Ok(self.solved)
    }

    async fn close(&mut self) -> GameResult<()> {
        self.game.log.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Consume one unit of a failure budget.
fn take_one(budget: &AtomicU32) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// ---------------------------------------------------------------------------
// MockModel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ModelQuery {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub top_n: usize,
}

type QueryKey = (Vec<String>, Vec<String>);

/// Similarity model with a fixed vocabulary. Answers every query with the
/// default neighbours unless a specific response was registered for the exact
/// (positive, negative) pair. Input words are never returned.
pub struct MockModel {
    known: Vec<String>,
    neighbours: Vec<String>,
    responses: HashMap<QueryKey, Vec<String>>,
    queries: Mutex<Vec<ModelQuery>>,
}

impl MockModel {
    pub fn new(known: &[&str], neighbours: &[&str]) -> Self {
        Self {
            known: known.iter().map(|w| w.to_string()).collect(),
            neighbours: neighbours.iter().map(|w| w.to_string()).collect(),
            responses: HashMap::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_to(mut self, positive: &[&str], negative: &[&str], response: &[&str]) -> Self {
        let key = (to_strings(positive), to_strings(negative));
        self.responses.insert(key, to_strings(response));
        self
    }

    /// Every query so far, in call order.
    pub fn queries(&self) -> Vec<ModelQuery> {
        self.queries.lock().unwrap().clone()
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl SimilarityModel for MockModel {
    fn contains(&self, word: &str) -> bool {
        self.known.iter().any(|w| w == word)
    }

    fn most_similar(&self, positive: &[String], negative: &[String], top_n: usize) -> Vec<String> {
        self.queries.lock().unwrap().push(ModelQuery {
            positive: positive.to_vec(),
            negative: negative.to_vec(),
            top_n,
        });
        let key = (positive.to_vec(), negative.to_vec());
        self.responses
            .get(&key)
            .unwrap_or(&self.neighbours)
            .iter()
            .filter(|w| !positive.contains(w) && !negative.contains(w))
            .take(top_n)
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// MemoryFeedbackStore
// ---------------------------------------------------------------------------

/// In-memory store. Snapshots are replaced wholesale like the file store.
#[derive(Default)]
pub struct MemoryFeedbackStore {
    snapshots: Mutex<HashMap<SourceId, FeedbackSnapshot>>,
    tried: Mutex<Vec<String>>,
    resets: AtomicU32,
    fail_publish: bool,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `publish` returns an error.
    pub fn failing_publish() -> Self {
        Self {
            fail_publish: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self, source: SourceId) -> Option<FeedbackSnapshot> {
        self.snapshots.lock().unwrap().get(&source).cloned()
    }

    pub fn sources(&self) -> Vec<SourceId> {
        let mut sources: Vec<_> = self.snapshots.lock().unwrap().keys().copied().collect();
        sources.sort();
        sources
    }

    pub fn reset_count(&self) -> u32 {
        self.resets.load(Ordering::SeqCst)
    }

    /// Seed a source's snapshot from raw rows.
    pub fn seed(&self, source: SourceId, rows: &[(&str, f64)]) {
        let rows: Vec<Guess> = rows.iter().map(|(w, s)| Guess::new(*w, *s)).collect();
        self.snapshots
            .lock()
            .unwrap()
            .insert(source, FeedbackSnapshot::from_feedback(source, &rows));
    }
}

#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    async fn publish(&self, source: SourceId, snapshot: &FeedbackSnapshot) -> Result<()> {
        if self.fail_publish {
            bail!("MemoryFeedbackStore: publish refused");
        }
        self.snapshots.lock().unwrap().insert(source, snapshot.clone());
        Ok(())
    }

    async fn aggregate(&self) -> AggregatedView {
        let snapshots: Vec<FeedbackSnapshot> = self.snapshots.lock().unwrap().values().cloned().collect();
        AggregatedView::from_snapshots(snapshots)
    }

    async fn reset_all(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        for snapshot in self.snapshots.lock().unwrap().values_mut() {
            *snapshot = FeedbackSnapshot::empty();
        }
        Ok(())
    }

    async fn remove(&self, source: SourceId) -> Result<()> {
        self.snapshots.lock().unwrap().remove(&source);
        Ok(())
    }

    async fn record_tried(&self, words: &[String]) -> Result<()> {
        self.tried.lock().unwrap().extend_from_slice(words);
        Ok(())
    }

    async fn tried(&self) -> Result<Vec<String>> {
        Ok(self.tried.lock().unwrap().clone())
    }

    async fn remove_tried(&self) -> Result<()> {
        self.tried.lock().unwrap().clear();
        Ok(())
    }
}

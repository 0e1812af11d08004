use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

// --- Constants ---

/// Maximum number of records kept per snapshot category (and in the merged far list).
pub const SNAPSHOT_CAP: usize = 100;

/// Score reported for the hidden word itself.
pub const WINNING_SCORE: f64 = 100.0;

/// Lowest score the game can report.
pub const MIN_SCORE: f64 = -100.0;

/// Close words within this many points of the best score form the top cluster.
pub const TOP_CLUSTER_SPAN: f64 = 10.0;

// --- SourceId ---

/// Identifies the worker that produced a snapshot. The strategist is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl SourceId {
    pub const STRATEGIST: SourceId = SourceId(0);

    pub fn is_strategist(self) -> bool {
        self == Self::STRATEGIST
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Guess (raw game feedback row) ---

/// One visible row of game feedback: a word and its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub word: String,
    pub score: f64,
}

impl Guess {
    pub fn new(word: impl Into<String>, score: f64) -> Self {
        Self {
            word: word.into(),
            score,
        }
    }
}

/// True if `score` is a finite value the game could have produced.
pub fn is_valid_score(score: f64) -> bool {
    score.is_finite() && (MIN_SCORE..=WINNING_SCORE).contains(&score)
}

// --- ScoreRecord ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub word: String,
    pub score: f64,
    pub source: SourceId,
}

impl ScoreRecord {
    /// Build a record, rejecting empty words and scores outside [-100, 100].
    pub fn new(word: impl Into<String>, score: f64, source: SourceId) -> Option<Self> {
        let word = word.into();
        let word = word.trim();
        if word.is_empty() || !is_valid_score(score) {
            return None;
        }
        Some(Self {
            word: word.to_string(),
            score,
            source,
        })
    }

    pub fn is_win(&self) -> bool {
        self.score == WINNING_SCORE
    }
}

fn by_score_desc(a: &ScoreRecord, b: &ScoreRecord) -> std::cmp::Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.word.cmp(&b.word))
}

fn by_score_asc(a: &ScoreRecord, b: &ScoreRecord) -> std::cmp::Ordering {
    a.score.total_cmp(&b.score).then_with(|| a.word.cmp(&b.word))
}

// --- FeedbackSnapshot ---

/// A single worker's view of the game: its best and worst scored words.
/// Always replaced wholesale, never appended to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    /// Highest-scoring positive records, best first.
    pub close: Vec<ScoreRecord>,
    /// Negative records, most negative first.
    pub far: Vec<ScoreRecord>,
}

impl FeedbackSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Split visible game feedback into capped close/far lists.
    pub fn from_feedback(source: SourceId, rows: &[Guess]) -> Self {
        let records: Vec<ScoreRecord> = rows
            .iter()
            .filter_map(|g| ScoreRecord::new(g.word.as_str(), g.score, source))
            .collect();

        let mut close: Vec<ScoreRecord> = records.iter().filter(|r| r.score > 0.0).cloned().collect();
        close.sort_by(by_score_desc);
        close.dedup_by(|a, b| a.word == b.word);
        close.truncate(SNAPSHOT_CAP);

        let mut far: Vec<ScoreRecord> = records.into_iter().filter(|r| r.score < 0.0).collect();
        far.sort_by(by_score_asc);
        far.dedup_by(|a, b| a.word == b.word);
        far.truncate(SNAPSHOT_CAP);

        Self { close, far }
    }

    /// Keep only the `n` best close words and drop the far list.
    pub fn top(mut self, n: usize) -> Self {
        self.close.truncate(n);
        self.far.clear();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty() && self.far.is_empty()
    }
}

// --- AggregatedView ---

/// Merge of every worker's snapshot. Derived on demand; never cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedView {
    /// One record per word (highest score kept), best first.
    pub close: Vec<ScoreRecord>,
    /// One record per word (most negative kept), most negative first, capped.
    pub far: Vec<ScoreRecord>,
}

impl AggregatedView {
    pub fn merge<C, F>(close: C, far: F) -> Self
    where
        C: IntoIterator<Item = ScoreRecord>,
        F: IntoIterator<Item = ScoreRecord>,
    {
        let mut best: HashMap<String, ScoreRecord> = HashMap::new();
        for record in close {
            if !is_valid_score(record.score) {
                continue;
            }
            match best.get(&record.word) {
                Some(existing) if existing.score >= record.score => {}
                _ => {
                    best.insert(record.word.clone(), record);
                }
            }
        }
        let mut close: Vec<ScoreRecord> = best.into_values().collect();
        close.sort_by(by_score_desc);

        let mut worst: HashMap<String, ScoreRecord> = HashMap::new();
        for record in far {
            if !is_valid_score(record.score) {
                continue;
            }
            match worst.get(&record.word) {
                Some(existing) if existing.score <= record.score => {}
                _ => {
                    worst.insert(record.word.clone(), record);
                }
            }
        }
        let mut far: Vec<ScoreRecord> = worst.into_values().collect();
        far.sort_by(by_score_asc);
        far.truncate(SNAPSHOT_CAP);

        Self { close, far }
    }

    pub fn from_snapshots<I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = FeedbackSnapshot>,
    {
        let (close, far): (Vec<_>, Vec<_>) = snapshots
            .into_iter()
            .map(|s| (s.close, s.far))
            .unzip();
        Self::merge(close.into_iter().flatten(), far.into_iter().flatten())
    }

    /// The winning record, if any source has seen it.
    pub fn winner(&self) -> Option<&ScoreRecord> {
        self.close.iter().find(|r| r.is_win())
    }

    pub fn best_score(&self) -> Option<f64> {
        self.close.first().map(|r| r.score)
    }

    pub fn close_words(&self) -> Vec<String> {
        self.close.iter().map(|r| r.word.clone()).collect()
    }

    pub fn far_words(&self) -> Vec<String> {
        self.far.iter().map(|r| r.word.clone()).collect()
    }

    /// Every close word within `TOP_CLUSTER_SPAN` of the best score, best first.
    pub fn top_cluster(&self) -> Vec<String> {
        let Some(top) = self.best_score() else {
            return Vec::new();
        };
        self.close
            .iter()
            .take_while(|r| top - r.score <= TOP_CLUSTER_SPAN)
            .map(|r| r.word.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty() && self.far.is_empty()
    }
}

// --- TriedSet ---

/// Normalized form used for case-insensitive word comparison.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Every word the strategist has submitted this session. Only grows.
#[derive(Debug, Clone, Default)]
pub struct TriedSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl TriedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submission. Returns false if the word was already tried.
    pub fn insert(&mut self, word: &str) -> bool {
        if self.seen.insert(normalize_word(word)) {
            self.order.push(word.to_string());
            true
        } else {
            false
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.seen.contains(&normalize_word(word))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Words in submission order.
    pub fn words(&self) -> &[String] {
        &self.order
    }
}

// --- CandidateBatch ---

/// Ordered, distinct guesses for one strategist cycle. Earlier means higher priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateBatch {
    words: Vec<String>,
}

impl CandidateBatch {
    pub fn singleton(word: impl Into<String>) -> Self {
        Self {
            words: vec![word.into()],
        }
    }

    /// Keep the first occurrence of each word, dropping anything already tried.
    pub fn from_ranked<I>(ranked: I, tried: &TriedSet) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let words = ranked
            .into_iter()
            .filter(|w| !w.trim().is_empty())
            .filter(|w| !tried.contains(w))
            .filter(|w| seen.insert(normalize_word(w)))
            .collect();
        Self { words }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        let key = normalize_word(word);
        self.words.iter().any(|w| normalize_word(w) == key)
    }
}

impl IntoIterator for CandidateBatch {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.into_iter()
    }
}

// --- SessionState ---

/// Per-worker counters. `try_count` and `guesses` only increase.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub try_count: u64,
    pub guesses: u64,
    pub started_at: Instant,
    pub found: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            try_count: 0,
            guesses: 0,
            started_at: Instant::now(),
            found: false,
        }
    }

    /// Advance to the next cycle and return its number (starting at 1).
    pub fn next_try(&mut self) -> u64 {
        self.try_count += 1;
        self.try_count
    }

    pub fn record_guess(&mut self) {
        self.guesses += 1;
    }

    pub fn latch_found(&mut self) {
        self.found = true;
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

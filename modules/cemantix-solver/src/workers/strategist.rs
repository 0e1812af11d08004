//! Strategist: turns the merged feedback of every worker into targeted
//! guesses and confirms the answer once it lands.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use cemantix_common::{FeedbackSnapshot, SessionState, SolverError, SourceId, TriedSet, WINNING_SCORE};

use crate::candidates::{CandidateGenerator, GeneratorConfig};
use crate::coordinator::Coordinator;
use crate::infra::retry::{pace, poll_success, read_feedback};
use crate::infra::{RetryPolicy, Vocabulary};
use crate::traits::{FeedbackStore, GameClient, GameSession, SimilarityModel};

use super::worker_rng;

#[derive(Debug, Clone)]
pub struct StrategistConfig {
    /// First wait after an empty batch. Doubles on each consecutive empty batch.
    pub empty_batch_backoff: Duration,
    pub max_backoff: Duration,
    pub guess_delay: Duration,
    /// Throwaway guess that forces the feedback table to refresh.
    pub filler_word: String,
    pub confirm_attempts: u32,
    pub retry: RetryPolicy,
    pub seed: Option<u64>,
    pub generator: GeneratorConfig,
}

impl Default for StrategistConfig {
    fn default() -> Self {
        Self {
            empty_batch_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            guess_delay: Duration::from_millis(100),
            filler_word: "lave".to_string(),
            confirm_attempts: 5,
            retry: RetryPolicy::default(),
            seed: None,
            generator: GeneratorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategistPhase {
    GuessLoop,
    SuccessHold,
    Terminate,
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    /// The hidden word, if it was confirmed.
    pub word: Option<String>,
    pub elapsed: Duration,
    pub cycles: u64,
    pub guesses: u64,
    /// Worker whose signal latched `found`.
    pub found_by: Option<SourceId>,
}

pub struct Strategist {
    client: Arc<dyn GameClient>,
    store: Arc<dyn FeedbackStore>,
    generator: CandidateGenerator,
    coordinator: Coordinator,
    config: StrategistConfig,
}

impl Strategist {
    pub fn new(
        client: Arc<dyn GameClient>,
        store: Arc<dyn FeedbackStore>,
        model: Arc<dyn SimilarityModel>,
        lexicon: Arc<Vocabulary>,
        coordinator: Coordinator,
        config: StrategistConfig,
    ) -> Self {
        let generator = CandidateGenerator::new(model, lexicon, config.generator.clone());
        Self {
            client,
            store,
            generator,
            coordinator,
            config,
        }
    }

    /// Guess until the word is confirmed or quit is signalled elsewhere.
    /// Always signals quit on the way out.
    pub async fn run(self) -> Result<Solution, SolverError> {
        let source = SourceId::STRATEGIST;
        let mut session = self
            .client
            .open_session()
            .await
            .map_err(|e| SolverError::Init(format!("Strategist: {e}")))?;

        if let Err(e) = session.dismiss_dialog().await {
            warn!(error = %e, "Failed to dismiss dialog");
        }
        if let Err(e) = self.store.publish(source, &FeedbackSnapshot::empty()).await {
            warn!(error = %e, "Failed to reset own snapshot");
        }
        if let Err(e) = self.store.remove_tried().await {
            warn!(error = %e, "Failed to reset tried log");
        }
        info!("Strategist started");

        let mut state = SessionState::new();
        let mut winner: Option<String> = None;
        let mut phase = StrategistPhase::GuessLoop;
        while phase != StrategistPhase::Terminate {
            phase = match phase {
                StrategistPhase::GuessLoop => {
                    let (next, word) = self.guess_loop(session.as_mut(), &mut state).await;
                    winner = word;
                    next
                }
                StrategistPhase::SuccessHold => {
                    let confirmed = self.confirm(session.as_mut()).await;
                    if confirmed.is_none() {
                        warn!(submitted = ?winner, "Could not confirm the winning word from feedback");
                    }
                    winner = confirmed.or(winner);
                    StrategistPhase::Terminate
                }
                StrategistPhase::Terminate => StrategistPhase::Terminate,
            };
        }

        let elapsed = state.elapsed();
        self.coordinator.signal_quit();
        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close session");
        }
        if let Err(e) = self.store.remove(source).await {
            warn!(error = %e, "Failed to remove snapshot");
        }
        if let Err(e) = self.store.remove_tried().await {
            warn!(error = %e, "Failed to remove tried log");
        }

        let solution = Solution {
            word: winner,
            elapsed,
            cycles: state.try_count,
            guesses: state.guesses,
            found_by: self.coordinator.found_by(),
        };
        match &solution.word {
            Some(word) => info!(
                word = word.as_str(),
                at = %chrono::Utc::now().to_rfc3339(),
                elapsed_secs = elapsed.as_secs_f64(),
                cycles = solution.cycles,
                guesses = solution.guesses,
                "Solved"
            ),
            None => info!(cycles = solution.cycles, guesses = solution.guesses, "Strategist stopped without a word"),
        }
        Ok(solution)
    }

    /// Returns the next phase and, on success, the winning submission.
    async fn guess_loop(
        &self,
        session: &mut dyn GameSession,
        state: &mut SessionState,
    ) -> (StrategistPhase, Option<String>) {
        let mut rng = worker_rng(self.config.seed);
        let mut tried = TriedSet::new();
        let mut backoff = self.config.empty_batch_backoff;

        loop {
            if self.coordinator.is_quit() {
                return (StrategistPhase::Terminate, None);
            }
            // Only cycles that produce guesses count.
            let try_count = state.try_count + 1;
            let view = self.store.aggregate().await;
            let winner_known = view.winner().is_some_and(|w| !tried.contains(&w.word));

            // Someone else won but has not republished yet.
            let batch = if self.coordinator.is_found() && !winner_known {
                Default::default()
            } else {
                self.generator.generate(&view, &tried, try_count, &mut rng)
            };

            if batch.is_empty() {
                debug!(try_count, backoff_ms = backoff.as_millis() as u64, "No candidates, backing off");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(self.config.max_backoff);
                continue;
            }
            backoff = self.config.empty_batch_backoff;
            state.next_try();

            debug!(try_count, candidates = batch.len(), best = ?view.best_score(), "New batch");
            for word in batch {
                if self.coordinator.is_found() && !winner_known {
                    debug!(try_count, "Found elsewhere, abandoning batch");
                    break;
                }
                tried.insert(&word);
                if let Err(e) = self.store.record_tried(std::slice::from_ref(&word)).await {
                    warn!(error = %e, "Failed to record tried word");
                }
                match session.submit_guess(&word).await {
                    Ok(outcome) => {
                        state.record_guess();
                        debug!(word = word.as_str(), score = ?outcome.score(), "Guess");
                        if outcome.is_win() {
                            return (self.on_win(state, &word), Some(word));
                        }
                    }
                    Err(e) => warn!(word = word.as_str(), error = %e, "Guess submission failed"),
                }
                pace(self.config.guess_delay).await;
            }

            if let Ok(rows) = read_feedback(session, &self.config.retry).await {
                let snapshot = FeedbackSnapshot::from_feedback(SourceId::STRATEGIST, &rows);
                if let Err(e) = self.store.publish(SourceId::STRATEGIST, &snapshot).await {
                    warn!(error = %e, "Failed to publish snapshot");
                }
                if poll_success(session, &self.config.retry).await {
                    let word = rows.iter().find(|g| g.score == WINNING_SCORE).map(|g| g.word.clone());
                    return (self.on_win(state, word.as_deref().unwrap_or("?")), word);
                }
            }
        }
    }

    fn on_win(&self, state: &mut SessionState, word: &str) -> StrategistPhase {
        state.latch_found();
        if !self.coordinator.signal_found(SourceId::STRATEGIST) {
            info!(
                word,
                found_by = ?self.coordinator.found_by(),
                "Strategist won after another worker; not authoritative"
            );
        }
        StrategistPhase::SuccessHold
    }

    /// Read the winning word back from the feedback table, refreshing it with
    /// a filler guess between attempts.
    async fn confirm(&self, session: &mut dyn GameSession) -> Option<String> {
        for attempt in 1..=self.config.confirm_attempts {
            match read_feedback(session, &self.config.retry).await {
                Ok(rows) => {
                    if let Some(row) = rows.iter().find(|g| g.score == WINNING_SCORE) {
                        return Some(row.word.clone());
                    }
                }
                Err(e) => debug!(attempt, error = %e, "Confirmation read failed"),
            }
            if let Err(e) = session.submit_guess(&self.config.filler_word).await {
                debug!(attempt, error = %e, "Filler guess failed");
            }
        }
        None
    }
}

//! Explorer: plays random vocabulary words to map the score landscape and
//! publishes what it has seen for the strategist.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use cemantix_common::{FeedbackSnapshot, SessionState, SolverError, SourceId};

use crate::coordinator::Coordinator;
use crate::infra::retry::{pace, poll_success, read_feedback};
use crate::infra::{RetryPolicy, Vocabulary};
use crate::traits::{FeedbackStore, GameClient, GameSession};

use super::worker_rng;

#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Publish a snapshot (and check for success) every this many guesses.
    pub publish_every: u64,
    /// Pause between refreshes once the word is found.
    pub hold_interval: Duration,
    /// Close words republished on each hold refresh.
    pub hold_top_words: usize,
    /// Throwaway guess used to refresh the feedback table while holding.
    pub filler_word: String,
    /// Played once after opening the session.
    pub warmup_words: Vec<String>,
    pub guess_delay: Duration,
    pub retry: RetryPolicy,
    pub seed: Option<u64>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            publish_every: 100,
            hold_interval: Duration::from_secs(5),
            hold_top_words: 3,
            filler_word: "lave".to_string(),
            warmup_words: vec!["oh".to_string(), "ah".to_string()],
            guess_delay: Duration::from_millis(50),
            retry: RetryPolicy::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExplorerPhase {
    GuessLoop,
    SuccessHold,
    Terminate,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplorerReport {
    pub source: SourceId,
    pub tries: u64,
    pub reshuffles: u64,
    pub submit_errors: u64,
}

/// Shuffled pass over the vocabulary; reshuffles the full list when exhausted.
struct Deck {
    words: Vec<String>,
    next: usize,
    reshuffles: u64,
}

impl Deck {
    fn new(vocabulary: &Vocabulary, rng: &mut StdRng) -> Self {
        Self {
            words: vocabulary.shuffled(rng),
            next: 0,
            reshuffles: 0,
        }
    }

    fn draw(&mut self, rng: &mut StdRng) -> String {
        if self.next >= self.words.len() {
            self.words.shuffle(rng);
            self.next = 0;
            self.reshuffles += 1;
            debug!(reshuffles = self.reshuffles, "Vocabulary exhausted, reshuffled");
        }
        self.next += 1;
        self.words[self.next - 1].clone()
    }
}

pub struct Explorer {
    source: SourceId,
    client: Arc<dyn GameClient>,
    store: Arc<dyn FeedbackStore>,
    vocabulary: Arc<Vocabulary>,
    coordinator: Coordinator,
    config: ExplorerConfig,
}

impl Explorer {
    pub fn new(
        source: SourceId,
        client: Arc<dyn GameClient>,
        store: Arc<dyn FeedbackStore>,
        vocabulary: Arc<Vocabulary>,
        coordinator: Coordinator,
        config: ExplorerConfig,
    ) -> Self {
        Self {
            source,
            client,
            store,
            vocabulary,
            coordinator,
            config,
        }
    }

    /// Play until the strategist signals quit. Only session setup can fail.
    pub async fn run(self) -> Result<ExplorerReport, SolverError> {
        let source = self.source;
        if self.vocabulary.is_empty() {
            return Err(SolverError::Init(format!("Explorer {source}: vocabulary is empty")));
        }
        let mut session = self
            .client
            .open_session()
            .await
            .map_err(|e| SolverError::Init(format!("Explorer {source}: {e}")))?;

        let mut rng = worker_rng(self.config.seed);
        let mut deck = Deck::new(&self.vocabulary, &mut rng);
        let mut state = SessionState::new();
        let mut submit_errors = 0u64;

        if let Err(e) = session.dismiss_dialog().await {
            debug!(source = %source, error = %e, "No dialog to dismiss");
        }
        self.publish(&FeedbackSnapshot::empty()).await;
        for word in &self.config.warmup_words {
            if let Err(e) = session.submit_guess(word).await {
                warn!(source = %source, word = word.as_str(), error = %e, "Warm-up guess failed");
            }
        }
        info!(source = %source, words = self.vocabulary.len(), "Explorer started");

        let mut phase = ExplorerPhase::GuessLoop;
        while phase != ExplorerPhase::Terminate {
            phase = match phase {
                ExplorerPhase::GuessLoop => {
                    self.guess_loop(session.as_mut(), &mut deck, &mut state, &mut rng, &mut submit_errors)
                        .await
                }
                ExplorerPhase::SuccessHold => self.hold(session.as_mut()).await,
                ExplorerPhase::Terminate => ExplorerPhase::Terminate,
            };
        }

        if let Err(e) = session.close().await {
            warn!(source = %source, error = %e, "Failed to close session");
        }
        if let Err(e) = self.store.remove(source).await {
            warn!(source = %source, error = %e, "Failed to remove snapshot");
        }

        let report = ExplorerReport {
            source,
            tries: state.try_count,
            reshuffles: deck.reshuffles,
            submit_errors,
        };
        info!(
            source = %source,
            tries = report.tries,
            reshuffles = report.reshuffles,
            submit_errors = report.submit_errors,
            "Explorer finished"
        );
        Ok(report)
    }

    async fn guess_loop(
        &self,
        session: &mut dyn GameSession,
        deck: &mut Deck,
        state: &mut SessionState,
        rng: &mut StdRng,
        submit_errors: &mut u64,
    ) -> ExplorerPhase {
        loop {
            if self.coordinator.is_quit() {
                return ExplorerPhase::Terminate;
            }
            if self.coordinator.is_found() {
                return ExplorerPhase::SuccessHold;
            }

            let word = deck.draw(rng);
            let mut won = false;
            match session.submit_guess(&word).await {
                Ok(outcome) => {
                    state.record_guess();
                    debug!(source = %self.source, word = word.as_str(), score = ?outcome.score(), "Guess");
                    won = outcome.is_win();
                }
                Err(e) => {
                    *submit_errors += 1;
                    warn!(source = %self.source, word = word.as_str(), error = %e, "Guess submission failed");
                }
            }
            let try_count = state.next_try();

            // Latch before the winner becomes visible to anyone else.
            if won {
                self.latch_found(state, try_count);
                self.publish_feedback(session, None).await;
                return ExplorerPhase::SuccessHold;
            }
            if try_count % self.config.publish_every == 0 {
                self.publish_feedback(session, None).await;
                if poll_success(session, &self.config.retry).await {
                    self.latch_found(state, try_count);
                    return ExplorerPhase::SuccessHold;
                }
            }

            pace(self.config.guess_delay).await;
        }
    }

    fn latch_found(&self, state: &mut SessionState, try_count: u64) {
        state.latch_found();
        if self.coordinator.signal_found(self.source) {
            info!(source = %self.source, try_count, "Explorer found the word");
        }
    }

    /// Clear every snapshot once, then keep republishing our best few words
    /// until quit so the strategist can pick up the winner.
    async fn hold(&self, session: &mut dyn GameSession) -> ExplorerPhase {
        info!(source = %self.source, "Explorer holding");
        if let Err(e) = self.store.reset_all().await {
            warn!(source = %self.source, error = %e, "Failed to reset snapshots");
        }

        loop {
            if self.coordinator.is_quit() {
                return ExplorerPhase::Terminate;
            }
            if let Err(e) = session.submit_guess(&self.config.filler_word).await {
                debug!(source = %self.source, error = %e, "Filler guess failed");
            }
            self.publish_feedback(session, Some(self.config.hold_top_words)).await;

            tokio::select! {
                _ = self.coordinator.wait_quit() => return ExplorerPhase::Terminate,
                _ = tokio::time::sleep(self.config.hold_interval) => {}
            }
        }
    }

    async fn publish_feedback(&self, session: &mut dyn GameSession, top: Option<usize>) {
        let rows = match read_feedback(session, &self.config.retry).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(source = %self.source, error = %e, "Feedback unavailable, skipping publish");
                return;
            }
        };
        let snapshot = FeedbackSnapshot::from_feedback(self.source, &rows);
        let snapshot = match top {
            Some(n) => snapshot.top(n),
            None => snapshot,
        };
        self.publish(&snapshot).await;
    }

    async fn publish(&self, snapshot: &FeedbackSnapshot) {
        if let Err(e) = self.store.publish(self.source, snapshot).await {
            warn!(source = %self.source, error = %e, "Failed to publish snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFeedbackStore, MockGame};

    fn config() -> ExplorerConfig {
        ExplorerConfig {
            publish_every: 2,
            hold_interval: Duration::from_millis(5),
            warmup_words: Vec::new(),
            guess_delay: Duration::ZERO,
            retry: RetryPolicy::immediate(3),
            seed: Some(7),
            ..ExplorerConfig::default()
        }
    }

    fn explorer(
        game: &MockGame,
        store: &Arc<MemoryFeedbackStore>,
        words: &[&str],
        coordinator: &Coordinator,
    ) -> Explorer {
        Explorer::new(
            SourceId(1),
            Arc::new(game.clone()),
            store.clone(),
            Arc::new(Vocabulary::from_words(words)),
            coordinator.clone(),
            config(),
        )
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..5_000 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition never became true");
    }

    #[tokio::test]
    async fn exhausted_vocabulary_is_reshuffled() {
        let game = MockGame::new();
        let store = Arc::new(MemoryFeedbackStore::new());
        let coordinator = Coordinator::new();
        let handle = tokio::spawn(explorer(&game, &store, &["abri", "bac", "cal"], &coordinator).run());

        wait_until(|| game.submitted().len() >= 10).await;
        coordinator.signal_quit();
        let report = handle.await.unwrap().unwrap();

        assert!(report.tries >= 10);
        assert!(report.reshuffles >= 3);
        assert!(game
            .submitted()
            .iter()
            .all(|w| ["abri", "bac", "cal"].contains(&w.as_str())));
    }

    #[tokio::test]
    async fn publishes_feedback_periodically() {
        let game = MockGame::new().with_scores(&[("chien", 30.0), ("avion", -12.0)]);
        let store = Arc::new(MemoryFeedbackStore::new());
        let coordinator = Coordinator::new();
        let handle = tokio::spawn(explorer(&game, &store, &["chien", "avion"], &coordinator).run());

        wait_until(|| {
            store
                .snapshot(SourceId(1))
                .is_some_and(|s| s.close.len() == 1 && s.far.len() == 1)
        })
        .await;
        coordinator.signal_quit();
        handle.await.unwrap().unwrap();

        assert!(store.snapshot(SourceId(1)).is_none(), "snapshot removed on exit");
        assert_eq!(game.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn winning_guess_signals_found_and_holds() {
        let game = MockGame::new().with_target("chat").with_scores(&[("lave", 3.0)]);
        let store = Arc::new(MemoryFeedbackStore::new());
        let coordinator = Coordinator::new();
        let handle = tokio::spawn(explorer(&game, &store, &["chat"], &coordinator).run());

        wait_until(|| coordinator.is_found()).await;
        assert_eq!(coordinator.found_by(), Some(SourceId(1)));

        // Hold republishes the winner after the reset.
        wait_until(|| {
            store.reset_count() == 1
                && store
                    .snapshot(SourceId(1))
                    .is_some_and(|s| s.close.first().is_some_and(|r| r.is_win()))
                && game.submitted().iter().any(|w| w == "lave")
        })
        .await;

        coordinator.signal_quit();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.tries, 1);
        assert_eq!(store.reset_count(), 1);
    }

    /// Records whether `found` was already latched when a winning snapshot
    /// was published.
    struct LatchWatchingStore {
        inner: MemoryFeedbackStore,
        coordinator: Coordinator,
        found_at_win_publish: std::sync::Mutex<Vec<bool>>,
    }

    #[async_trait::async_trait]
    impl FeedbackStore for LatchWatchingStore {
        async fn publish(&self, source: SourceId, snapshot: &FeedbackSnapshot) -> anyhow::Result<()> {
            if snapshot.close.iter().any(|r| r.is_win()) {
                self.found_at_win_publish.lock().unwrap().push(self.coordinator.is_found());
            }
            self.inner.publish(source, snapshot).await
        }

        async fn aggregate(&self) -> cemantix_common::AggregatedView {
            self.inner.aggregate().await
        }

        async fn reset_all(&self) -> anyhow::Result<()> {
            self.inner.reset_all().await
        }

        async fn remove(&self, source: SourceId) -> anyhow::Result<()> {
            self.inner.remove(source).await
        }

        async fn record_tried(&self, words: &[String]) -> anyhow::Result<()> {
            self.inner.record_tried(words).await
        }

        async fn tried(&self) -> anyhow::Result<Vec<String>> {
            self.inner.tried().await
        }

        async fn remove_tried(&self) -> anyhow::Result<()> {
            self.inner.remove_tried().await
        }
    }

    #[tokio::test]
    async fn found_is_latched_before_the_winner_is_published() {
        let game = MockGame::new().with_target("chat");
        let coordinator = Coordinator::new();
        let store = Arc::new(LatchWatchingStore {
            inner: MemoryFeedbackStore::new(),
            coordinator: coordinator.clone(),
            found_at_win_publish: std::sync::Mutex::new(Vec::new()),
        });
        let explorer = Explorer::new(
            SourceId(1),
            Arc::new(game.clone()),
            store.clone(),
            Arc::new(Vocabulary::from_words(["chat"])),
            coordinator.clone(),
            ExplorerConfig {
                publish_every: 1_000,
                ..config()
            },
        );
        let handle = tokio::spawn(explorer.run());

        wait_until(|| !store.found_at_win_publish.lock().unwrap().is_empty()).await;
        coordinator.signal_quit();
        handle.await.unwrap().unwrap();

        let seen = store.found_at_win_publish.lock().unwrap().clone();
        assert!(seen.iter().all(|found| *found), "winner published before found: {seen:?}");
        assert_eq!(coordinator.found_by(), Some(SourceId(1)));
    }

    #[tokio::test]
    async fn hold_republishes_without_waiting() {
        let game = MockGame::new().with_target("chat");
        let store = Arc::new(MemoryFeedbackStore::new());
        let coordinator = Coordinator::new();
        let explorer = Explorer::new(
            SourceId(1),
            Arc::new(game.clone()),
            store.clone(),
            Arc::new(Vocabulary::from_words(["chat"])),
            coordinator.clone(),
            ExplorerConfig {
                hold_interval: Duration::from_secs(3600),
                ..config()
            },
        );
        let handle = tokio::spawn(explorer.run());

        // The winner reappears after the reset long before one interval passes.
        wait_until(|| {
            store.reset_count() == 1
                && store
                    .snapshot(SourceId(1))
                    .is_some_and(|s| s.close.first().is_some_and(|r| r.is_win()))
        })
        .await;
        coordinator.signal_quit();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("hold should stop on quit")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn found_elsewhere_stops_guessing() {
        let game = MockGame::new();
        let store = Arc::new(MemoryFeedbackStore::new());
        let coordinator = Coordinator::new();
        coordinator.signal_found(SourceId(2));

        let handle = tokio::spawn(explorer(&game, &store, &["abri", "bac"], &coordinator).run());
        wait_until(|| store.reset_count() == 1).await;
        coordinator.signal_quit();
        let report = handle.await.unwrap().unwrap();

        assert_eq!(report.tries, 0);
    }

    #[tokio::test]
    async fn publish_failures_are_not_fatal() {
        let game = MockGame::new();
        let store = Arc::new(MemoryFeedbackStore::failing_publish());
        let coordinator = Coordinator::new();
        let handle = tokio::spawn(explorer(&game, &store, &["abri"], &coordinator).run());

        wait_until(|| game.submitted().len() >= 5).await;
        coordinator.signal_quit();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn submit_errors_are_counted_not_fatal() {
        let game = MockGame::new().with_submit_failures(3);
        let store = Arc::new(MemoryFeedbackStore::new());
        let coordinator = Coordinator::new();
        let handle = tokio::spawn(explorer(&game, &store, &["abri"], &coordinator).run());

        wait_until(|| game.submitted().len() >= 5).await;
        coordinator.signal_quit();
        let report = handle.await.unwrap().unwrap();

        assert_eq!(report.submit_errors, 3);
        assert!(report.tries >= 5);
    }

    #[tokio::test]
    async fn empty_vocabulary_fails_init() {
        let game = MockGame::new();
        let store = Arc::new(MemoryFeedbackStore::new());
        let result = explorer(&game, &store, &[], &Coordinator::new()).run().await;

        assert!(matches!(result, Err(SolverError::Init(_))));
        assert_eq!(game.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn unavailable_game_fails_init() {
        let game = MockGame::new().failing_open();
        let store = Arc::new(MemoryFeedbackStore::new());
        let result = explorer(&game, &store, &["abri"], &Coordinator::new()).run().await;

        assert!(matches!(result, Err(SolverError::Init(_))));
    }
}

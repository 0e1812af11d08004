use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use cemantix_common::{SolverError, SourceId};

use crate::coordinator::Coordinator;
use crate::infra::Vocabulary;
use crate::traits::{FeedbackStore, GameClient, SimilarityModel};
use crate::workers::{Explorer, ExplorerConfig, ExplorerReport, Solution, Strategist, StrategistConfig};

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SolverReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub solution: Solution,
    pub explorers: Vec<ExplorerReport>,
    /// Explorers that failed to start or panicked.
    pub explorer_failures: usize,
}

impl std::fmt::Display for SolverReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Solver Run Complete ===")?;
        writeln!(f, "Run:        {}", self.run_id)?;
        match &self.solution.word {
            Some(word) => writeln!(f, "Word:       {word}")?,
            None => writeln!(f, "Word:       (not found)")?,
        }
        writeln!(f, "Elapsed:    {:.1}s", self.solution.elapsed.as_secs_f64())?;
        writeln!(f, "Cycles:     {}", self.solution.cycles)?;
        writeln!(f, "Guesses:    {}", self.solution.guesses)?;
        if let Some(source) = self.solution.found_by {
            writeln!(f, "Found by:   worker {source}")?;
        }
        writeln!(f, "\nExplorers:")?;
        for e in &self.explorers {
            writeln!(
                f,
                "  {}: {} tries, {} reshuffles, {} submit errors",
                e.source, e.tries, e.reshuffles, e.submit_errors
            )?;
        }
        if self.explorer_failures > 0 {
            writeln!(f, "  failed: {}", self.explorer_failures)?;
        }
        Ok(())
    }
}

/// Runs one strategist and `explorers` explorers against a game until the
/// strategist confirms the word.
pub struct Solver {
    client: Arc<dyn GameClient>,
    store: Arc<dyn FeedbackStore>,
    model: Arc<dyn SimilarityModel>,
    vocabulary: Arc<Vocabulary>,
    lexicon: Arc<Vocabulary>,
    explorers: usize,
    explorer_config: ExplorerConfig,
    strategist_config: StrategistConfig,
}

impl Solver {
    pub fn new(
        client: Arc<dyn GameClient>,
        store: Arc<dyn FeedbackStore>,
        model: Arc<dyn SimilarityModel>,
        vocabulary: Arc<Vocabulary>,
        lexicon: Arc<Vocabulary>,
    ) -> Self {
        Self {
            client,
            store,
            model,
            vocabulary,
            lexicon,
            explorers: 3,
            explorer_config: ExplorerConfig::default(),
            strategist_config: StrategistConfig::default(),
        }
    }

    pub fn with_explorers(mut self, n: usize) -> Self {
        self.explorers = n;
        self
    }

    pub fn with_explorer_config(mut self, config: ExplorerConfig) -> Self {
        self.explorer_config = config;
        self
    }

    pub fn with_strategist_config(mut self, config: StrategistConfig) -> Self {
        self.strategist_config = config;
        self
    }

    pub async fn run(self) -> Result<SolverReport, SolverError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let coordinator = Coordinator::new();
        info!(%run_id, explorers = self.explorers, "Starting solver run");

        let mut explorers = JoinSet::new();
        for i in 1..=self.explorers {
            let source = SourceId(i as u32);
            let mut config = self.explorer_config.clone();
            config.seed = config.seed.map(|s| s.wrapping_add(i as u64));
            let explorer = Explorer::new(
                source,
                self.client.clone(),
                self.store.clone(),
                self.vocabulary.clone(),
                coordinator.clone(),
                config,
            );
            explorers.spawn(explorer.run());
        }

        let strategist = Strategist::new(
            self.client.clone(),
            self.store.clone(),
            self.model.clone(),
            self.lexicon.clone(),
            coordinator.clone(),
            self.strategist_config.clone(),
        );
        let outcome = tokio::spawn(strategist.run()).await;

        // A failed strategist never signals quit itself.
        let solution = match outcome {
            Ok(Ok(solution)) => Ok(solution),
            Ok(Err(e)) => {
                error!(%run_id, error = %e, "Strategist failed");
                Err(e)
            }
            Err(e) => {
                error!(%run_id, error = %e, "Strategist task panicked");
                Err(SolverError::Anyhow(anyhow!("Strategist task failed: {e}")))
            }
        };
        coordinator.signal_quit();

        let mut reports = Vec::new();
        let mut explorer_failures = 0;
        while let Some(joined) = explorers.join_next().await {
            match joined {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(e)) => {
                    warn!(%run_id, error = %e, "Explorer failed");
                    explorer_failures += 1;
                }
                Err(e) => {
                    warn!(%run_id, error = %e, "Explorer task panicked");
                    explorer_failures += 1;
                }
            }
        }
        reports.sort_by_key(|r| r.source);

        let report = SolverReport {
            run_id,
            started_at,
            solution: solution?,
            explorers: reports,
            explorer_failures,
        };
        info!(
            %run_id,
            word = ?report.solution.word,
            explorers_ok = report.explorers.len(),
            explorer_failures,
            "Solver run finished"
        );
        Ok(report)
    }
}

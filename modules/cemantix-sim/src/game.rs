//! HiddenWordGame: scores guesses against a hidden word.
//!
//! Each player gets a `GameBoard` holding their own guess history, like one
//! browser tab on the real game.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::embedding::EmbeddingTable;

/// Score shown for the hidden word.
pub const WIN_SCORE: f64 = 100.0;

/// Highest score any other word can show, so only the target reads as a win.
const MAX_NEAR_SCORE: f64 = 99.99;

/// Rows the real game keeps visible on each side of the table.
pub const VISIBLE_ROWS: usize = 100;

#[derive(Clone)]
pub struct HiddenWordGame {
    table: Arc<EmbeddingTable>,
    target: String,
}

impl HiddenWordGame {
    pub fn new(table: Arc<EmbeddingTable>, target: &str) -> Result<Self> {
        if !table.contains(target) {
            bail!("Hidden word {target:?} is not in the embedding table");
        }
        Ok(Self {
            table,
            target: target.to_string(),
        })
    }

    /// Pick a hidden word at random among `candidates` known to the table.
    pub fn random<R: Rng>(table: Arc<EmbeddingTable>, candidates: &[String], rng: &mut R) -> Result<Self> {
        let known: Vec<&String> = candidates.iter().filter(|w| table.contains(w)).collect();
        let target = known
            .choose(rng)
            .ok_or_else(|| anyhow!("No candidate word is known to the embedding table"))?
            .to_string();
        Self::new(table, &target)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn table(&self) -> &Arc<EmbeddingTable> {
        &self.table
    }

    /// Score a word on the game's [-100, 100] scale, rounded to 2 decimals.
    /// `None` means the game does not know the word.
    pub fn score(&self, word: &str) -> Option<f64> {
        if word == self.target {
            return Some(WIN_SCORE);
        }
        let cos = self.table.similarity(word, &self.target)? as f64;
        let score = (cos * 10_000.0).round() / 100.0;
        Some(score.clamp(-WIN_SCORE, MAX_NEAR_SCORE))
    }

    pub fn new_board(&self) -> GameBoard {
        GameBoard {
            game: self.clone(),
            rows: Vec::new(),
            seen: HashSet::new(),
            solved: false,
        }
    }
}

/// One player's guess history.
pub struct GameBoard {
    game: HiddenWordGame,
    rows: Vec<(String, f64)>,
    seen: HashSet<String>,
    solved: bool,
}

impl GameBoard {
    /// Submit a guess. Repeated guesses return the same score without a new row.
    pub fn guess(&mut self, word: &str) -> Option<f64> {
        let word = word.trim();
        let score = self.game.score(word)?;
        if self.seen.insert(word.to_string()) {
            self.rows.push((word.to_string(), score));
        }
        if score == WIN_SCORE {
            self.solved = true;
        }
        Some(score)
    }

    pub fn solved(&self) -> bool {
        self.solved
    }

    pub fn guess_count(&self) -> usize {
        self.rows.len()
    }

    /// Visible table: the `close_limit` best non-negative rows and the
    /// `far_limit` most negative rows, best first.
    pub fn visible(&self, close_limit: usize, far_limit: usize) -> Vec<(String, f64)> {
        let mut sorted = self.rows.clone();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut out: Vec<(String, f64)> = sorted
            .iter()
            .filter(|(_, s)| *s >= 0.0)
            .take(close_limit)
            .cloned()
            .collect();
        let mut far: Vec<(String, f64)> = sorted
            .iter()
            .rev()
            .filter(|(_, s)| *s < 0.0)
            .take(far_limit)
            .cloned()
            .collect();
        far.reverse();
        out.extend(far);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn game() -> HiddenWordGame {
        let table = EmbeddingTable::from_pairs(vec![
            ("chat", vec![1.0, 0.0]),
            ("chaton", vec![0.95, 0.05]),
            ("chien", vec![0.6, 0.4]),
            ("avion", vec![-1.0, 0.1]),
        ])
        .unwrap();
        HiddenWordGame::new(Arc::new(table), "chat").unwrap()
    }

    #[test]
    fn target_scores_exactly_one_hundred() {
        let g = game();
        assert_eq!(g.score("chat"), Some(WIN_SCORE));
        assert!(g.score("chaton").unwrap() < WIN_SCORE);
        assert!(g.score("avion").unwrap() < 0.0);
        assert_eq!(g.score("inconnu"), None);
    }

    #[test]
    fn unknown_target_is_rejected() {
        let table = Arc::new(EmbeddingTable::from_pairs(vec![("chat", vec![1.0])]).unwrap());
        assert!(HiddenWordGame::new(table, "chien").is_err());
    }

    #[test]
    fn random_target_comes_from_known_candidates() {
        let g = game();
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = vec!["inconnu".to_string(), "chien".to_string()];
        let picked = HiddenWordGame::random(g.table().clone(), &candidates, &mut rng).unwrap();
        assert_eq!(picked.target(), "chien");
    }

    #[test]
    fn board_tracks_rows_and_success() {
        let mut board = game().new_board();
        board.guess("avion");
        board.guess("chien");
        board.guess("chien");
        assert_eq!(board.guess_count(), 2);
        assert!(!board.solved());

        board.guess("chat");
        assert!(board.solved());

        let visible = board.visible(10, 10);
        assert_eq!(visible.first().map(|(w, _)| w.as_str()), Some("chat"));
        assert_eq!(visible.last().map(|(w, _)| w.as_str()), Some("avion"));
    }
}

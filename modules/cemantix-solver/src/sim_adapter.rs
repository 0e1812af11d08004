// Thin adapter: the simulated game implements GameClient, and its embedding
// table implements SimilarityModel.

use std::sync::Arc;

use async_trait::async_trait;

use cemantix_common::Guess;
use cemantix_sim::game::VISIBLE_ROWS;
use cemantix_sim::{EmbeddingTable, GameBoard, HiddenWordGame};

use crate::traits::{GameClient, GameError, GameResult, GameSession, GuessOutcome, SimilarityModel};

#[async_trait]
impl GameClient for HiddenWordGame {
    async fn open_session(&self) -> GameResult<Box<dyn GameSession>> {
        Ok(Box::new(SimSession {
            board: Some(self.new_board()),
        }))
    }
}

/// One board per session. Closing drops the board.
pub struct SimSession {
    board: Option<GameBoard>,
}

impl SimSession {
    fn board(&mut self) -> GameResult<&mut GameBoard> {
        self.board
            .as_mut()
            .ok_or_else(|| GameError::SessionUnavailable("simulated session closed".into()))
    }
}

#[async_trait]
impl GameSession for SimSession {
    async fn submit_guess(&mut self, word: &str) -> GameResult<GuessOutcome> {
        Ok(match self.board()?.guess(word) {
            Some(score) => GuessOutcome::Scored(score),
            None => GuessOutcome::Unknown,
        })
    }

    async fn current_feedback(&mut self) -> GameResult<Vec<Guess>> {
        let rows = self.board()?.visible(VISIBLE_ROWS, VISIBLE_ROWS);
        Ok(rows.into_iter().map(|(word, score)| Guess::new(word, score)).collect())
    }

    async fn check_success(&mut self) -> GameResult<bool> {
        Ok(self.board()?.solved())
    }

    async fn close(&mut self) -> GameResult<()> {
        self.board = None;
        Ok(())
    }
}

impl SimilarityModel for EmbeddingTable {
    fn contains(&self, word: &str) -> bool {
        EmbeddingTable::contains(self, word)
    }

    fn most_similar(&self, positive: &[String], negative: &[String], top_n: usize) -> Vec<String> {
        let positive: Vec<&str> = positive.iter().map(String::as_str).collect();
        let negative: Vec<&str> = negative.iter().map(String::as_str).collect();
        EmbeddingTable::most_similar(self, &positive, &negative, top_n)
            .into_iter()
            .map(|(word, _)| word)
            .collect()
    }
}

/// Shared model handle for the strategist.
pub fn similarity_model(table: Arc<EmbeddingTable>) -> Arc<dyn SimilarityModel> {
    table
}

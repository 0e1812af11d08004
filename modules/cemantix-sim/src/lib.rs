//! cemantix-sim: an offline stand-in for the guessing game.
//!
//! Domain-agnostic: no dependency on the solver's types. Scores guesses by
//! cosine similarity against a hidden word in an in-memory embedding table.

pub mod embedding;
pub mod game;

pub use embedding::EmbeddingTable;
pub use game::{GameBoard, HiddenWordGame};

use std::collections::HashMap;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use cemantix_common::SolverError;

/// A flat word list in file order.
///
/// Lexical expansion relies on this order: it assumes neighbouring lines are
/// lexically related (e.g. an alphabetically sorted dictionary).
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from words in order. Blank entries are dropped; a repeated word
    /// keeps its first position.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Self::default();
        for w in words {
            let w = w.as_ref().trim();
            if w.is_empty() {
                continue;
            }
            vocab.positions.entry(w.to_string()).or_insert(vocab.words.len());
            vocab.words.push(w.to_string());
        }
        vocab
    }

    /// One word per line.
    pub fn parse(text: &str) -> Self {
        Self::from_words(text.lines())
    }

    pub async fn load(path: &Path) -> Result<Self, SolverError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            SolverError::Vocabulary(format!("Failed to read {}: {e}", path.display()))
        })?;
        let vocab = Self::parse(&text);
        info!(path = %path.display(), words = vocab.len(), "Loaded word list");
        Ok(vocab)
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

    /// Line index of `word`, if present.
    pub fn position(&self, word: &str) -> Option<usize> {
        self.positions.get(word).copied()
    }

    pub fn shuffled<R: Rng>(&self, rng: &mut R) -> Vec<String> {
        let mut words = self.words.clone();
        words.shuffle(rng);
        words
    }
}

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::error::SolverError;

/// Process-level configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of explorer workers running next to the strategist.
    pub explorers: usize,

    // Inputs
    pub vocabulary_path: PathBuf,
    pub lexicon_path: PathBuf,
    pub model_path: Option<PathBuf>,

    // Feedback store
    pub store_dir: PathBuf,

    // Tuning
    pub publish_every: u64,
    pub max_neighbors: usize,
    pub filler_word: String,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            explorers: 3,
            vocabulary_path: PathBuf::from("cemantix_words_rough.txt"),
            lexicon_path: PathBuf::from("liste_francais_maculins_utf8.txt"),
            model_path: None,
            store_dir: PathBuf::from("feedback"),
            publish_every: 100,
            max_neighbors: 50,
            filler_word: "lave".to_string(),
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, SolverError> {
        let defaults = Self::default();
        let config = Self {
            explorers: parsed_env("CEMANTIX_EXPLORERS")?.unwrap_or(defaults.explorers),
            vocabulary_path: env::var("CEMANTIX_VOCABULARY")
                .map(PathBuf::from)
                .unwrap_or(defaults.vocabulary_path),
            lexicon_path: env::var("CEMANTIX_LEXICON")
                .map(PathBuf::from)
                .unwrap_or(defaults.lexicon_path),
            model_path: env::var("CEMANTIX_MODEL").ok().map(PathBuf::from),
            store_dir: env::var("CEMANTIX_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
            publish_every: parsed_env("CEMANTIX_PUBLISH_EVERY")?.unwrap_or(defaults.publish_every),
            max_neighbors: parsed_env("CEMANTIX_MAX_NEIGHBORS")?.unwrap_or(defaults.max_neighbors),
            filler_word: env::var("CEMANTIX_FILLER_WORD").unwrap_or(defaults.filler_word),
            seed: parsed_env("CEMANTIX_SEED")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        if self.publish_every == 0 {
            return Err(SolverError::Config(
                "CEMANTIX_PUBLISH_EVERY must be at least 1".to_string(),
            ));
        }
        if self.filler_word.trim().is_empty() {
            return Err(SolverError::Config(
                "CEMANTIX_FILLER_WORD must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Log the effective configuration.
    pub fn log_summary(&self) {
        info!(
            explorers = self.explorers,
            vocabulary = %self.vocabulary_path.display(),
            lexicon = %self.lexicon_path.display(),
            model = ?self.model_path,
            store_dir = %self.store_dir.display(),
            publish_every = self.publish_every,
            max_neighbors = self.max_neighbors,
            seeded = self.seed.is_some(),
            "Loaded config"
        );
    }
}

fn parsed_env<T: FromStr>(key: &str) -> Result<Option<T>, SolverError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SolverError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(None),
    }
}

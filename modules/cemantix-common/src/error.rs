use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Vocabulary error: {0}")]
    Vocabulary(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

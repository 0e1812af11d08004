pub mod retry;
pub mod vocabulary;

pub use retry::RetryPolicy;
pub use vocabulary::Vocabulary;

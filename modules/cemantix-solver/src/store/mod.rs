//! Feedback store: per-source snapshots shared between workers without locks.

pub mod file;

pub use file::FileFeedbackStore;

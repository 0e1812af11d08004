pub mod candidates;
pub mod coordinator;
pub mod infra;
pub mod sim_adapter;
pub mod solver;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod workers;

pub use coordinator::Coordinator;
pub use solver::{Solver, SolverReport};
pub use workers::explorer::{Explorer, ExplorerConfig, ExplorerReport};
pub use workers::strategist::{Solution, Strategist, StrategistConfig};

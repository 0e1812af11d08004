//! Game-playing workers. Each owns one game session and runs as its own task.

pub mod explorer;
pub mod strategist;

use rand::rngs::StdRng;
use rand::SeedableRng;

pub use explorer::{Explorer, ExplorerConfig, ExplorerReport};
pub use strategist::{Solution, Strategist, StrategistConfig};

/// Deterministic when seeded, OS entropy otherwise.
pub(crate) fn worker_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

//! Execution strategy selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How workers are driven through generations.
///
/// All strategies produce bit-identical grids for the same initial state and
/// generation count, whatever the worker count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Single control flow over the whole grid, no barrier.
    Sequential,
    /// One long-lived thread per worker, each looping over its range.
    #[default]
    ThreadPerWorker,
    /// Fixed worker pool fed one generation at a time by a dispatcher, with
    /// a completion signal fed back after every generation.
    Farm,
    /// Data-parallel loop over worker indices on a dedicated rayon pool,
    /// statically pinning index `i` to pool thread `i`.
    ParallelFor,
}

impl Strategy {
    /// Get all available strategies.
    pub fn all() -> [Strategy; 4] {
        [
            Strategy::Sequential,
            Strategy::ThreadPerWorker,
            Strategy::Farm,
            Strategy::ParallelFor,
        ]
    }

    /// Command-line and config name.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::ThreadPerWorker => "thread-per-worker",
            Strategy::Farm => "farm",
            Strategy::ParallelFor => "parallel-for",
        }
    }

    /// Whether the strategy spreads cells over several workers.
    pub fn is_parallel(&self) -> bool {
        !matches!(self, Strategy::Sequential)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown strategy '{0}' (expected sequential, thread-per-worker, farm or parallel-for)")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::all()
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

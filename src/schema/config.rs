//! Configuration types for grid simulation runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Seed;
use crate::compute::Strategy;

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Grid height in cells (number of rows).
    pub rows: usize,
    /// Grid width in cells (number of columns).
    pub cols: usize,
    /// Number of generations to compute.
    pub iterations: u64,
    /// Number of workers sharing the grid.
    pub workers: usize,
    /// Execution strategy driving the workers.
    #[serde(default)]
    pub strategy: Strategy,
    /// Initial state generator.
    #[serde(default)]
    pub seed: Seed,
    /// Optional frame output. `None` disables rendering.
    #[serde(default)]
    pub frames: Option<FrameConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rows: 256,
            cols: 256,
            iterations: 100,
            workers: 4,
            strategy: Strategy::default(),
            seed: Seed::default(),
            frames: None,
        }
    }
}

/// Where and how rendered frames are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Output directory; one `<generation>.png` file per generation.
    pub directory: PathBuf,
}

impl SimulationConfig {
    /// Total number of cells (rows * cols). Fails on an empty grid or one
    /// whose cell count does not fit in `usize`.
    #[inline]
    pub fn grid_size(&self) -> Result<usize, ConfigError> {
        match self.rows.checked_mul(self.cols) {
            Some(cells) if cells > 0 => Ok(cells),
            _ => Err(ConfigError::InvalidDimensions),
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cells = self.grid_size()?;
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount);
        }
        if self.workers > cells {
            return Err(ConfigError::TooManyWorkers {
                workers: self.workers,
                cells,
            });
        }
        self.seed.validate(self.rows, self.cols)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid dimensions (rows, columns) must be non-zero")]
    InvalidDimensions,
    #[error("Worker count must be non-zero")]
    InvalidWorkerCount,
    #[error("{workers} workers exceed the {cells} cells of the grid")]
    TooManyWorkers { workers: usize, cells: usize },
    #[error("Initial state has {actual} cells, grid needs {expected}")]
    StateLength { expected: usize, actual: usize },
    #[error("Seed cell ({row}, {col}) lies outside the grid")]
    SeedCellOutOfBounds { row: usize, col: usize },
    #[error("Seed density {0} is outside [0, 1]")]
    InvalidDensity(f64),
}

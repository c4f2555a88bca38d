//! Seed types for initializing grid simulations.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Initial grid state for a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    /// Pattern to use for seeding.
    pub pattern: Pattern,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            pattern: Pattern::Random {
                seed: 0,
                density: 0.5,
            },
        }
    }
}

/// Initial grid patterns. Cells are binary: 0 is dead, 1 is alive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    /// Reproducible random fill.
    Random {
        /// PRNG seed. The same seed always yields the same grid.
        seed: u64,
        /// Probability that a cell starts alive.
        density: f64,
    },
    /// All cells dead except the listed (row, col) positions.
    Live {
        cells: Vec<(usize, usize)>,
    },
    /// Exact flat row-major state; length must equal rows * cols.
    Explicit {
        states: Vec<u8>,
    },
}

impl Seed {
    /// Seed with a fixed random pattern.
    pub fn random(seed: u64) -> Self {
        Self {
            pattern: Pattern::Random { seed, density: 0.5 },
        }
    }

    /// Check that the pattern fits a `rows` x `cols` grid.
    pub fn validate(&self, rows: usize, cols: usize) -> Result<(), ConfigError> {
        let cells = cell_count(rows, cols)?;
        match &self.pattern {
            Pattern::Random { density, .. } => {
                if !(0.0..=1.0).contains(density) {
                    return Err(ConfigError::InvalidDensity(*density));
                }
            }
            Pattern::Live { cells } => {
                if let Some(&(row, col)) = cells.iter().find(|&&(r, c)| r >= rows || c >= cols) {
                    return Err(ConfigError::SeedCellOutOfBounds { row, col });
                }
            }
            Pattern::Explicit { states } => {
                if states.len() != cells {
                    return Err(ConfigError::StateLength {
                        expected: cells,
                        actual: states.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Generate the flat row-major initial state.
    pub fn generate(&self, rows: usize, cols: usize) -> Result<Vec<u8>, ConfigError> {
        self.validate(rows, cols)?;
        let count = cell_count(rows, cols)?;

        let cells = match &self.pattern {
            Pattern::Random { seed, density } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                (0..count)
                    .map(|_| u8::from(rng.gen_bool(*density)))
                    .collect()
            }
            Pattern::Live { cells } => {
                let mut grid = vec![0u8; count];
                for &(row, col) in cells {
                    grid[row * cols + col] = 1;
                }
                grid
            }
            Pattern::Explicit { states } => states.iter().map(|&s| u8::from(s != 0)).collect(),
        };

        Ok(cells)
    }
}

fn cell_count(rows: usize, cols: usize) -> Result<usize, ConfigError> {
    match rows.checked_mul(cols) {
        Some(cells) if cells > 0 => Ok(cells),
        _ => Err(ConfigError::InvalidDimensions),
    }
}

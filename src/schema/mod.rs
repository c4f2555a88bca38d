//! Schema module - Configuration and seeding types for grid simulations.

mod config;
mod seed;

pub use config::*;
pub use seed::*;

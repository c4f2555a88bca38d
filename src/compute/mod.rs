//! Compute module - the parallel grid-iteration engine.
//!
//! Leaves first: the double-buffered [`GridStore`], the range
//! [`partition`]er, the [`GenerationBarrier`] and the [`Rule`] contract.
//! [`Engine`] combines them and drives workers with one of the four
//! [`Strategy`] variants.

mod barrier;
mod engine;
mod farm;
mod grid;
mod parallel_for;
mod partition;
mod rule;
mod sequential;
mod strategy;
mod threaded;
mod worker;

pub use barrier::*;
pub use engine::*;
pub use grid::*;
pub use partition::*;
pub use rule::*;
pub use strategy::*;

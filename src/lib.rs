//! gridsim - Parallel double-buffered 2D cellular automaton engine.
//!
//! This crate computes successive generations of a toroidal 2D cellular
//! automaton with one of several interchangeable execution strategies, and
//! can render every generation into a frame sink for later playback.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration types and seeding for simulations
//! - `compute`: Grid store, partitioner, barrier, rules and the engine
//! - `render`: Frames, cell renderers and frame sinks
//!
//! Workers own a fixed contiguous range of the flat grid. Each generation
//! they read the front buffer, write their range of the back buffer and meet
//! at a barrier; the last to arrive swaps the buffers before anyone moves on.
//!
//! # Example
//!
//! ```rust,no_run
//! use gridsim::{
//!     compute::{Dims, Engine, LifeRule, Strategy},
//!     render::{Monochrome, PngSink},
//!     schema::Seed,
//! };
//!
//! let initial = Seed::random(0).generate(512, 512).unwrap();
//! let mut engine =
//!     Engine::new(initial, Dims::new(512, 512), 8, Strategy::ThreadPerWorker, LifeRule).unwrap();
//!
//! // Plain run
//! engine.run(100).unwrap();
//!
//! // Rendered run, one PNG file per generation
//! let mut sink = PngSink::create("frames").unwrap();
//! let report = engine.run_rendered(10, &Monochrome, &mut sink).unwrap();
//! println!("{}", report);
//! ```

pub mod compute;
pub mod render;
pub mod schema;

// Re-export commonly used types
pub use compute::{Dims, Engine, EngineError, LifeRule, Rule, RunReport, Strategy};
pub use render::{FrameSink, Monochrome, PngSink, Renderer};
pub use schema::{Pattern, Seed, SimulationConfig};

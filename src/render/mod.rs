//! Rendering collaborators: frames, renderers and sinks.
//!
//! Rendering is optional. When enabled, the engine snapshots each generation
//! into a [`Frame`] with a [`Renderer`] and hands it to a [`FrameSink`]. Sink
//! failures are logged and skipped; they never affect the simulation.

mod frame;
mod sink;

pub use frame::{Frame, Monochrome, Renderer};
pub use sink::{FrameSink, FrameTally, MemorySink, PngSink, RenderError};

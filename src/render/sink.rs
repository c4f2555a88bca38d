//! Frame sinks: where rendered generations end up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageError};

use super::Frame;

/// Frame output errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Frame I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Frame encoding failed: {0}")]
    Image(#[from] ImageError),
    #[error("Frame is {actual} pixels, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Consumer of rendered frames, one per generation.
pub trait FrameSink {
    fn save_frame(&mut self, generation: u64, frame: &Frame) -> Result<(), RenderError>;
}

/// Writes each frame as `<directory>/<generation>.png` (8-bit grayscale).
#[derive(Debug)]
pub struct PngSink {
    directory: PathBuf,
}

impl PngSink {
    /// Create the sink, creating `directory` if needed.
    pub fn create<P: AsRef<Path>>(directory: P) -> Result<Self, RenderError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    /// Path of the file holding `generation`.
    pub fn frame_path(&self, generation: u64) -> PathBuf {
        self.directory.join(format!("{}.png", generation))
    }
}

impl FrameSink for PngSink {
    fn save_frame(&mut self, generation: u64, frame: &Frame) -> Result<(), RenderError> {
        let mismatch = || RenderError::DimensionMismatch {
            expected: frame.rows.saturating_mul(frame.cols),
            actual: frame.pixels.len(),
        };
        if frame.rows.checked_mul(frame.cols) != Some(frame.pixels.len()) {
            return Err(mismatch());
        }
        let width = u32::try_from(frame.cols).map_err(|_| mismatch())?;
        let height = u32::try_from(frame.rows).map_err(|_| mismatch())?;

        let img = GrayImage::from_raw(width, height, frame.pixels.clone()).ok_or_else(mismatch)?;
        img.save(self.frame_path(generation))?;
        Ok(())
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<(u64, Frame)>,
}

impl FrameSink for MemorySink {
    fn save_frame(&mut self, generation: u64, frame: &Frame) -> Result<(), RenderError> {
        self.frames.push((generation, frame.clone()));
        Ok(())
    }
}

/// Count of delivered and dropped frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameTally {
    pub saved: u64,
    pub failed: u64,
}

impl FrameTally {
    /// Hand one frame to the sink. Failures are logged and counted, never
    /// propagated.
    pub fn deliver(&mut self, sink: &mut dyn FrameSink, generation: u64, frame: &Frame) {
        match sink.save_frame(generation, frame) {
            Ok(()) => self.saved += 1,
            Err(e) => {
                log::warn!("Skipping frame {}: {}", generation, e);
                self.failed += 1;
            }
        }
    }
}

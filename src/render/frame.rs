//! Grayscale frames and cell-to-pixel renderers.

use crate::compute::Dims;

/// Row-major 8-bit grayscale canvas, one pixel per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub rows: usize,
    pub cols: usize,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Black canvas of the given size.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            pixels: vec![0; rows * cols],
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.pixels[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.pixels[row * self.cols + col] = value;
    }
}

/// Turns a generation into a [`Frame`].
pub trait Renderer<T>: Sync {
    /// Pixel value for one cell state.
    fn pixel(&self, state: &T) -> u8;

    /// Allocate an empty canvas for a grid of `dims`.
    fn build_canvas(&self, dims: Dims) -> Frame {
        Frame::new(dims.rows, dims.cols)
    }

    /// Render a whole flat grid.
    fn render(&self, grid: &[T], dims: Dims) -> Frame {
        let mut frame = self.build_canvas(dims);
        for (pixel, state) in frame.pixels.iter_mut().zip(grid) {
            *pixel = self.pixel(state);
        }
        frame
    }
}

impl<T, F> Renderer<T> for F
where
    F: Fn(&T) -> u8 + Sync,
{
    #[inline]
    fn pixel(&self, state: &T) -> u8 {
        self(state)
    }
}

/// Dead cells black, everything else white.
#[derive(Debug, Clone, Copy, Default)]
pub struct Monochrome;

impl Renderer<u8> for Monochrome {
    #[inline]
    fn pixel(&self, state: &u8) -> u8 {
        if *state == 0 { 0 } else { 255 }
    }
}

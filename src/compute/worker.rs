//! Per-generation worker step shared by the parallel strategies.

use std::ops::Range;

use crossbeam_channel::Receiver;

use super::{Dims, GenerationBarrier, GridStore, Release, Rule};
use crate::render::{Frame, FrameSink, FrameTally, Renderer};

/// Everything a worker touches during a run. Shared by reference among all
/// workers of one run.
pub(crate) struct GenerationContext<'a, T, R> {
    pub store: &'a GridStore<T>,
    pub rule: &'a R,
    pub dims: Dims,
    pub barrier: &'a GenerationBarrier,
    pub renderer: Option<&'a dyn Renderer<T>>,
}

impl<T, R> GenerationContext<'_, T, R>
where
    T: Copy + Send + Sync,
    R: Rule<T>,
{
    /// Apply the rule to every cell of `range`, reading the current
    /// generation and writing the next.
    ///
    /// The caller must own `range` exclusively for the run and call this at
    /// most once per generation, before its rendezvous.
    pub fn compute(&self, range: Range<usize>) {
        let start = range.start;
        let read = self.store.current();
        // SAFETY: ranges handed to workers partition the grid, so no other
        // worker writes these cells; the back buffer is neither read nor
        // published until every worker has arrived at the barrier, which
        // happens after this view is dropped.
        let out = unsafe { self.store.back_range_mut(range) };
        for (offset, cell) in out.iter_mut().enumerate() {
            *cell = self.rule.next_state(read, start + offset, self.dims);
        }
    }

    /// Arrive at the generation boundary. The last arriver swaps the buffers
    /// and, when rendering, snapshots the new generation; only it receives
    /// the frame.
    pub fn rendezvous(&self, worker: usize) -> (Release, Option<Frame>) {
        let (release, frame) = self.barrier.arrive_and_wait_with(worker, || {
            // SAFETY: all participants are parked at the barrier, so every
            // write of this generation is complete and nobody reads.
            unsafe { self.store.publish() };
            self.renderer
                .map(|renderer| renderer.render(self.store.current(), self.dims))
        });
        (release, frame.flatten())
    }
}

/// Hand frames to the sink as workers publish them, until every sender is
/// gone. Runs on the caller's thread, outside the workers' hot loop.
pub(crate) fn drain_frames(
    frames: Receiver<(u64, Frame)>,
    mut sink: Option<&mut dyn FrameSink>,
) -> FrameTally {
    let mut tally = FrameTally::default();
    for (generation, frame) in frames {
        if let Some(sink) = sink.as_deref_mut() {
            tally.deliver(sink, generation, &frame);
        }
    }
    tally
}

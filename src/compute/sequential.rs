//! Sequential strategy: one control flow over the whole grid.

use super::{Dims, GridStore, Rule};
use crate::render::{FrameSink, FrameTally, Renderer};

/// Run `iterations` generations on the calling thread. Frames are rendered
/// and saved inline, right after each swap.
pub(crate) fn run<T, R>(
    store: &mut GridStore<T>,
    rule: &R,
    dims: Dims,
    iterations: u64,
    first_generation: u64,
    mut frames: Option<(&dyn Renderer<T>, &mut dyn FrameSink)>,
) -> FrameTally
where
    T: Copy,
    R: Rule<T>,
{
    let mut tally = FrameTally::default();

    for j in 0..iterations {
        let (read, write) = store.split();
        for (index, cell) in write.iter_mut().enumerate() {
            *cell = rule.next_state(read, index, dims);
        }
        store.swap();

        if let Some((renderer, sink)) = frames.as_mut() {
            let frame = renderer.render(store.current(), dims);
            tally.deliver(&mut **sink, first_generation + j, &frame);
        }
    }

    tally
}

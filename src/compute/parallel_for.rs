//! Data-parallel loop strategy.
//!
//! The per-generation work is a parallel `for` over worker indices `0..W`
//! on a dedicated rayon pool of exactly `W` threads. `ThreadPool::broadcast`
//! runs the body once on every pool thread, so index `i` stays pinned to
//! thread `i` for the whole run and no work is stolen.

use std::ops::Range;
use std::thread;

use crossbeam_channel::unbounded;

use super::worker::{GenerationContext, drain_frames};
use super::{EngineError, Rule};
use crate::render::{FrameSink, FrameTally};

pub(crate) fn run<T, R>(
    ctx: &GenerationContext<'_, T, R>,
    ranges: &[Range<usize>],
    iterations: u64,
    first_generation: u64,
    sink: Option<&mut dyn FrameSink>,
) -> Result<(Vec<u64>, FrameTally), EngineError>
where
    T: Copy + Send + Sync,
    R: Rule<T>,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ranges.len())
        .thread_name(|i| format!("gridsim-pf-{}", i))
        .build()?;

    let (frame_tx, frame_rx) = unbounded();

    thread::scope(|s| {
        let driver = s.spawn(move || {
            pool.broadcast(|broadcast| {
                let worker = broadcast.index();
                let range = ranges[worker].clone();

                let mut releases = 0u64;
                for j in 0..iterations {
                    ctx.compute(range.clone());
                    let (_, frame) = ctx.rendezvous(worker);
                    releases += 1;

                    if let Some(frame) = frame {
                        if frame_tx.send((first_generation + j, frame)).is_err() {
                            log::warn!("Frame {} dropped: drain closed", first_generation + j);
                        }
                    }
                }
                releases
            })
        });

        let tally = drain_frames(frame_rx, sink);
        let releases = driver.join().map_err(|_| EngineError::WorkerPanicked)?;

        Ok((releases, tally))
    })
}

//! Thread-per-worker strategy: `W` long-lived threads, each owning one range
//! for the whole run.

use std::ops::Range;
use std::thread;

use crossbeam_channel::unbounded;

use super::worker::{GenerationContext, drain_frames};
use super::{EngineError, Rule};
use crate::render::{FrameSink, FrameTally};

/// Spawn one thread per range, run `iterations` generations, join them all.
///
/// Returns the number of barrier releases each worker observed.
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
    let (frame_tx, frame_rx) = unbounded();
    // Workers hold at the gate until every thread exists; a closed gate
    // sends them home before they reach the barrier.
    let (start_tx, start_rx) = unbounded::<()>();

    thread::scope(|s| {
        let mut handles = Vec::with_capacity(ranges.len());
        for (worker, range) in ranges.iter().cloned().enumerate() {
            let frame_tx = frame_tx.clone();
            let start_rx = start_rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("gridsim-worker-{}", worker))
                .spawn_scoped(s, move || {
                    if start_rx.recv().is_err() {
                        return 0;
                    }
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
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    drop(start_tx);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(EngineError::WorkerSpawn(e));
                }
            }
        }
        drop(frame_tx);

        for _ in 0..handles.len() {
            // Receivers live in the spawned threads, so this cannot fail.
            let _ = start_tx.send(());
        }
        drop(start_tx);

        let tally = drain_frames(frame_rx, sink);

        let releases = handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| EngineError::WorkerPanicked))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((releases, tally))
    })
}

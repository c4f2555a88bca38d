//! Worker-pool farm with feedback.
//!
//! ```text
//!              Compute(g) / Retire
//!   dispatcher ───────────────────▶ worker 0 .. worker W-1
//!        ▲                                 │
//!        └──────── Feedback(g) ────────────┘  (barrier leader only)
//! ```
//!
//! The dispatcher (the caller's thread) sends one task per generation to
//! every worker through a private lane. Workers compute their fixed range,
//! meet at the barrier, and the participant that completes the rendezvous
//! reports the generation back. Only then does the dispatcher hand out the
//! next generation, or retire the pool after the last one. The reporter is
//! whoever closes the barrier, not a fixed worker id, so the loop does not
//! depend on how ranges map to workers.

use std::ops::Range;
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use super::worker::GenerationContext;
use super::{EngineError, Rule};
use crate::render::{Frame, FrameSink, FrameTally};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Compute { generation: u64 },
    Retire,
}

#[derive(Debug)]
struct Feedback {
    generation: u64,
    frame: Option<Frame>,
}

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
    let (feedback_tx, feedback_rx) = unbounded();

    thread::scope(|s| {
        let mut lanes = Vec::with_capacity(ranges.len());
        let mut handles = Vec::with_capacity(ranges.len());

        for (worker, range) in ranges.iter().cloned().enumerate() {
            let (task_tx, task_rx) = bounded(1);
            let feedback_tx = feedback_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("gridsim-farm-{}", worker))
                .spawn_scoped(s, move || work(ctx, worker, range, task_rx, feedback_tx));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Workers already started are idle on their lanes; closing
                    // the lanes retires them without a rendezvous.
                    drop(lanes);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(EngineError::WorkerSpawn(e));
                }
            }
            lanes.push(task_tx);
        }
        drop(feedback_tx);

        let outcome = dispatch(&lanes, &feedback_rx, iterations, first_generation, sink);
        // Closing the lanes retires any worker still waiting for a task.
        drop(lanes);

        let releases = handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| EngineError::WorkerPanicked))
            .collect::<Result<Vec<_>, _>>()?;

        outcome.map(|tally| (releases, tally))
    })
}

fn work<T, R>(
    ctx: &GenerationContext<'_, T, R>,
    worker: usize,
    range: Range<usize>,
    tasks: Receiver<Task>,
    feedback: Sender<Feedback>,
) -> u64
where
    T: Copy + Send + Sync,
    R: Rule<T>,
{
    let mut releases = 0;
    while let Ok(Task::Compute { generation }) = tasks.recv() {
        ctx.compute(range.clone());
        let (release, frame) = ctx.rendezvous(worker);
        releases += 1;

        if release.leader && feedback.send(Feedback { generation, frame }).is_err() {
            break;
        }
    }
    releases
}

fn dispatch(
    lanes: &[Sender<Task>],
    feedback: &Receiver<Feedback>,
    iterations: u64,
    first_generation: u64,
    mut sink: Option<&mut dyn FrameSink>,
) -> Result<FrameTally, EngineError> {
    let mut tally = FrameTally::default();
    if iterations == 0 {
        send_all(lanes, Task::Retire)?;
        return Ok(tally);
    }

    let last = first_generation + iterations - 1;
    send_all(
        lanes,
        Task::Compute {
            generation: first_generation,
        },
    )?;

    loop {
        let Feedback { generation, frame } = feedback
            .recv()
            .map_err(|_| EngineError::WorkerLost { worker: None })?;
        log::debug!("farm: generation {} complete", generation);

        // Re-dispatch before saving so workers overlap with frame I/O.
        let next = if generation < last {
            Task::Compute {
                generation: generation + 1,
            }
        } else {
            Task::Retire
        };
        send_all(lanes, next)?;

        if let (Some(frame), Some(sink)) = (frame, sink.as_deref_mut()) {
            tally.deliver(sink, generation, &frame);
        }

        if next == Task::Retire {
            return Ok(tally);
        }
    }
}

fn send_all(lanes: &[Sender<Task>], task: Task) -> Result<(), EngineError> {
    for (worker, lane) in lanes.iter().enumerate() {
        lane.send(task).map_err(|_| EngineError::WorkerLost {
            worker: Some(worker),
        })?;
    }
    Ok(())
}

//! Reusable generation barrier.
//!
//! All `P` participants call [`GenerationBarrier::arrive_and_wait`] at the end
//! of each generation. Arrivals below `P` block; the `P`-th arrival runs the
//! optional release action, re-arms the barrier for the next generation and
//! wakes everyone. A participant that never arrives blocks the others forever.

use parking_lot::{Condvar, Mutex};

/// Observable barrier state between rendezvous points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierPhase {
    /// No participant has arrived at the pending rendezvous.
    Idle,
    /// Some, but not all, participants are parked.
    Waiting { arrived: usize },
}

/// Outcome of one rendezvous for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    /// Index of the rendezvous this participant was released from.
    pub generation: u64,
    /// Whether this participant was the last to arrive and ran the release
    /// action.
    pub leader: bool,
}

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
}

/// Rendezvous for a fixed number of participants, reusable across
/// generations without reconstruction.
#[derive(Debug)]
pub struct GenerationBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl GenerationBarrier {
    pub fn new(parties: usize) -> Self {
        debug_assert!(parties > 0, "barrier needs at least one participant");
        Self {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// Number of participants per rendezvous.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Number of completed rendezvous since construction.
    pub fn completed(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn phase(&self) -> BarrierPhase {
        match self.state.lock().arrived {
            0 => BarrierPhase::Idle,
            arrived => BarrierPhase::Waiting { arrived },
        }
    }

    /// Block until all participants have arrived at the current rendezvous.
    pub fn arrive_and_wait(&self, participant: usize) -> Release {
        self.arrive_and_wait_with(participant, || ()).0
    }

    /// Like [`arrive_and_wait`](Self::arrive_and_wait), but the last arriver
    /// runs `on_release` before anyone is let through, and gets its result.
    ///
    /// While `on_release` runs, every other participant is parked at this
    /// rendezvous, so it may touch state that participants otherwise share.
    pub fn arrive_and_wait_with<U>(
        &self,
        participant: usize,
        on_release: impl FnOnce() -> U,
    ) -> (Release, Option<U>) {
        let mut state = self.state.lock();
        let generation = state.generation;
        state.arrived += 1;

        if state.arrived >= self.parties {
            let output = on_release();
            state.arrived = 0;
            state.generation += 1;
            self.released.notify_all();
            log::trace!(
                "barrier released generation {} (leader: participant {})",
                generation,
                participant
            );
            return (
                Release {
                    generation,
                    leader: true,
                },
                Some(output),
            );
        }

        while state.generation == generation {
            self.released.wait(&mut state);
        }

        (
            Release {
                generation,
                leader: false,
            },
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_single_participant_never_blocks() {
        let barrier = GenerationBarrier::new(1);
        for g in 0..3 {
            let release = barrier.arrive_and_wait(0);
            assert_eq!(release.generation, g);
            assert!(release.leader);
        }
        assert_eq!(barrier.completed(), 3);
        assert_eq!(barrier.phase(), BarrierPhase::Idle);
    }

    #[test]
    fn test_waiting_phase() {
        let barrier = GenerationBarrier::new(2);

        std::thread::scope(|s| {
            let waiter = s.spawn(|| barrier.arrive_and_wait(0));
            while barrier.phase() == BarrierPhase::Idle {
                std::thread::sleep(Duration::from_millis(1));
            }
            assert_eq!(barrier.phase(), BarrierPhase::Waiting { arrived: 1 });

            let release = barrier.arrive_and_wait(1);
            assert!(release.leader);
            assert!(!waiter.join().unwrap().leader);
        });

        assert_eq!(barrier.phase(), BarrierPhase::Idle);
    }

    #[test]
    fn test_exactly_one_leader_per_generation() {
        const PARTIES: usize = 4;
        const GENERATIONS: u64 = 50;

        let barrier = GenerationBarrier::new(PARTIES);
        let actions = AtomicUsize::new(0);

        let observed: Vec<Vec<Release>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..PARTIES)
                .map(|id| {
                    let barrier = &barrier;
                    let actions = &actions;
                    s.spawn(move || {
                        (0..GENERATIONS)
                            .map(|_| {
                                barrier
                                    .arrive_and_wait_with(id, || {
                                        actions.fetch_add(1, Ordering::SeqCst)
                                    })
                                    .0
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(actions.load(Ordering::SeqCst), GENERATIONS as usize);
        assert_eq!(barrier.completed(), GENERATIONS);

        for releases in &observed {
            assert_eq!(releases.len(), GENERATIONS as usize);
            for (g, release) in releases.iter().enumerate() {
                assert_eq!(release.generation, g as u64);
            }
        }
        for g in 0..GENERATIONS as usize {
            let leaders = observed.iter().filter(|r| r[g].leader).count();
            assert_eq!(leaders, 1);
        }
    }

    #[test]
    fn test_no_participant_passes_early() {
        const PARTIES: usize = 3;
        const GENERATIONS: usize = 20;

        let barrier = GenerationBarrier::new(PARTIES);
        let arrivals = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for id in 0..PARTIES {
                let barrier = &barrier;
                let arrivals = &arrivals;
                s.spawn(move || {
                    for g in 0..GENERATIONS {
                        arrivals.fetch_add(1, Ordering::SeqCst);
                        barrier.arrive_and_wait(id);
                        // Everyone has arrived at rendezvous g.
                        assert!(arrivals.load(Ordering::SeqCst) >= (g + 1) * PARTIES);
                    }
                });
            }
        });
    }
}

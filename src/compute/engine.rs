//! Grid engine - main simulation driver.
//!
//! Owns the double-buffered grid, the static worker ranges and the
//! generation barrier, and drives them with the configured [`Strategy`].

use std::fmt;
use std::ops::Range;

use super::worker::GenerationContext;
use super::{
    Dims, GenerationBarrier, GridStore, LifeRule, Rule, Strategy, farm, parallel_for, partition,
    sequential, threaded,
};
use crate::render::{FrameSink, FrameTally, RenderError, Renderer};
use crate::schema::{ConfigError, SimulationConfig};

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    /// Reserved for fallible rules; the built-in rules cannot fail.
    #[error("Rule evaluation failed: {0}")]
    RuleEvaluation(String),
    #[error("Frame sink failed: {0}")]
    RenderSink(#[from] RenderError),
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("Worker {} stopped before the run completed", .worker.map_or("?".to_string(), |w| w.to_string()))]
    WorkerLost { worker: Option<usize> },
    #[error("A worker thread panicked")]
    WorkerPanicked,
}

/// Summary of one [`Engine::run`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub strategy: Strategy,
    pub workers: usize,
    /// Generations computed by this run.
    pub generations: u64,
    /// Barrier releases observed by each worker, indexed by worker id.
    pub releases_observed: Vec<u64>,
    pub frames_saved: u64,
    pub frames_failed: u64,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} generations, {} worker(s) ({}), {} frames saved, {} skipped",
            self.generations, self.workers, self.strategy, self.frames_saved, self.frames_failed
        )
    }
}

/// Cellular automaton engine over cells of type `T` with rule `R`.
///
/// Ranges and the barrier are set up once in [`Engine::new`] and reused by
/// every run. The grid is exclusively owned: callers only see it between
/// runs.
pub struct Engine<T, R> {
    dims: Dims,
    store: GridStore<T>,
    ranges: Vec<Range<usize>>,
    barrier: GenerationBarrier,
    rule: R,
    strategy: Strategy,
    /// Generations computed since construction.
    generation: u64,
}

impl<T, R> Engine<T, R>
where
    T: Copy + Send + Sync,
    R: Rule<T>,
{
    /// Validate the configuration and build the engine. No thread is
    /// started here.
    ///
    /// The worker count is checked for every strategy, but the sequential
    /// strategy always runs as a single worker.
    pub fn new(
        initial: Vec<T>,
        dims: Dims,
        workers: usize,
        strategy: Strategy,
        rule: R,
    ) -> Result<Self, EngineError> {
        let cells = match dims.checked_cells() {
            Some(cells) if cells > 0 => cells,
            _ => return Err(ConfigError::InvalidDimensions.into()),
        };
        if initial.len() != cells {
            return Err(ConfigError::StateLength {
                expected: cells,
                actual: initial.len(),
            }
            .into());
        }

        let mut ranges = partition(cells, workers)?;
        if !strategy.is_parallel() {
            ranges = partition(cells, 1)?;
        }
        log::debug!(
            "{}x{} grid split into {} range(s): {:?}",
            dims.rows,
            dims.cols,
            ranges.len(),
            ranges
        );

        Ok(Self {
            dims,
            store: GridStore::new(initial),
            barrier: GenerationBarrier::new(ranges.len()),
            ranges,
            rule,
            strategy,
            generation: 0,
        })
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Number of workers (1 for the sequential strategy).
    pub fn workers(&self) -> usize {
        self.ranges.len()
    }

    /// Static range assigned to each worker.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Generations computed since construction.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current generation, row-major.
    pub fn state(&self) -> &[T] {
        self.store.current()
    }

    pub fn into_state(self) -> Vec<T> {
        self.store.into_current()
    }

    /// Compute `iterations` generations without rendering.
    pub fn run(&mut self, iterations: u64) -> Result<RunReport, EngineError> {
        self.execute(iterations, None, None)
    }

    /// Compute `iterations` generations, rendering each one into `sink`.
    ///
    /// Frames are numbered by generation since construction, starting at 0
    /// for the first computed generation. A failing sink only skips frames.
    pub fn run_rendered(
        &mut self,
        iterations: u64,
        renderer: &dyn Renderer<T>,
        sink: &mut dyn FrameSink,
    ) -> Result<RunReport, EngineError> {
        self.execute(iterations, Some(renderer), Some(sink))
    }

    fn context<'a>(
        &'a self,
        renderer: Option<&'a dyn Renderer<T>>,
    ) -> GenerationContext<'a, T, R> {
        GenerationContext {
            store: &self.store,
            rule: &self.rule,
            dims: self.dims,
            barrier: &self.barrier,
            renderer,
        }
    }

    fn execute(
        &mut self,
        iterations: u64,
        renderer: Option<&dyn Renderer<T>>,
        sink: Option<&mut dyn FrameSink>,
    ) -> Result<RunReport, EngineError> {
        log::info!(
            "Running {} generation(s) on {}x{} with {} worker(s) ({})",
            iterations,
            self.dims.rows,
            self.dims.cols,
            self.workers(),
            self.strategy
        );

        let first = self.generation;
        let (releases_observed, tally): (Vec<u64>, FrameTally) = match self.strategy {
            Strategy::Sequential => {
                let tally = sequential::run(
                    &mut self.store,
                    &self.rule,
                    self.dims,
                    iterations,
                    first,
                    renderer.zip(sink),
                );
                (vec![iterations], tally)
            }
            Strategy::ThreadPerWorker => {
                threaded::run(&self.context(renderer), &self.ranges, iterations, first, sink)?
            }
            Strategy::Farm => {
                farm::run(&self.context(renderer), &self.ranges, iterations, first, sink)?
            }
            Strategy::ParallelFor => {
                parallel_for::run(&self.context(renderer), &self.ranges, iterations, first, sink)?
            }
        };

        self.generation += iterations;

        let report = RunReport {
            strategy: self.strategy,
            workers: self.workers(),
            generations: iterations,
            releases_observed,
            frames_saved: tally.saved,
            frames_failed: tally.failed,
        };
        log::info!("Run complete: {}", report);
        Ok(report)
    }
}

impl<T, R> fmt::Debug for Engine<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("dims", &self.dims)
            .field("strategy", &self.strategy)
            .field("workers", &self.ranges.len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl Engine<u8, LifeRule> {
    /// Build a binary engine with the reference rule from a configuration.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let initial = config.seed.generate(config.rows, config.cols)?;
        Self::new(
            initial,
            Dims::new(config.rows, config.cols),
            config.workers,
            config.strategy,
            LifeRule,
        )
    }

    /// Number of live cells in the current generation.
    pub fn live_cells(&self) -> usize {
        self.state().iter().filter(|&&s| s != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Strategy;
    use crate::render::{Frame, MemorySink, Monochrome};
    use crate::schema::{Pattern, Seed};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const EXAMPLE: [u8; 16] = [0, 1, 1, 0, 1, 1, 0, 0, 0, 0, 1, 1, 1, 0, 0, 1];
    const EXAMPLE_NEXT: [u8; 16] = [0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0, 0];

    fn life(
        initial: Vec<u8>,
        dims: Dims,
        workers: usize,
        strategy: Strategy,
    ) -> Engine<u8, LifeRule> {
        Engine::new(initial, dims, workers, strategy, LifeRule).unwrap()
    }

    fn run_life(initial: &[u8], dims: Dims, workers: usize, strategy: Strategy, n: u64) -> Vec<u8> {
        let mut engine = life(initial.to_vec(), dims, workers, strategy);
        engine.run(n).unwrap();
        engine.into_state()
    }

    #[test]
    fn test_example_single_generation_all_strategies() {
        let dims = Dims::new(4, 4);
        for strategy in Strategy::all() {
            let next = run_life(&EXAMPLE, dims, 2, strategy, 1);
            assert_eq!(next, EXAMPLE_NEXT, "strategy {}", strategy);
        }
    }

    #[test]
    fn test_deterministic_across_worker_counts() {
        let dims = Dims::new(12, 9);
        let initial = Seed::random(3).generate(dims.rows, dims.cols).unwrap();
        let expected = run_life(&initial, dims, 1, Strategy::Sequential, 25);

        for strategy in Strategy::all() {
            for workers in [1, 2, 5, dims.cells()] {
                let state = run_life(&initial, dims, workers, strategy, 25);
                assert_eq!(state, expected, "{} with {} workers", strategy, workers);
            }
        }
    }

    #[test]
    fn test_block_is_stable() {
        let dims = Dims::new(6, 6);
        let mut grid = vec![0u8; dims.cells()];
        for (r, c) in [(2, 2), (2, 3), (3, 2), (3, 3)] {
            grid[dims.index(r, c)] = 1;
        }
        for strategy in Strategy::all() {
            assert_eq!(run_life(&grid, dims, 3, strategy, 17), grid);
        }
    }

    #[test]
    fn test_blinker_period_two() {
        let dims = Dims::new(5, 5);
        let mut grid = vec![0u8; dims.cells()];
        for c in 1..=3 {
            grid[dims.index(2, c)] = 1;
        }
        for strategy in Strategy::all() {
            assert_ne!(run_life(&grid, dims, 4, strategy, 1), grid);
            assert_eq!(run_life(&grid, dims, 4, strategy, 2), grid);
        }
    }

    #[test]
    fn test_each_worker_observes_every_release() {
        let dims = Dims::new(8, 8);
        let initial = Seed::random(11).generate(8, 8).unwrap();

        for strategy in Strategy::all() {
            let mut engine = life(initial.clone(), dims, 4, strategy);
            let report = engine.run(9).unwrap();
            assert_eq!(report.generations, 9);
            assert_eq!(report.releases_observed.len(), engine.workers());
            assert!(report.releases_observed.iter().all(|&r| r == 9));
        }
    }

    #[test]
    fn test_no_torn_generation_is_observed() {
        // Every cell carries its generation number. A read that mixed two
        // generations would see differing values.
        let dims = Dims::new(8, 8);
        let torn = AtomicUsize::new(0);
        let rule = |grid: &[u64], index: usize, _dims: Dims| {
            let g = grid[index];
            if grid.iter().any(|&v| v != g) {
                torn.fetch_add(1, Ordering::Relaxed);
            }
            g + 1
        };

        for strategy in Strategy::all() {
            let mut engine = Engine::new(vec![0u64; 64], dims, 8, strategy, &rule).unwrap();
            engine.run(30).unwrap();
            assert!(engine.state().iter().all(|&v| v == 30));
        }
        assert_eq!(torn.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_successive_runs_accumulate() {
        let dims = Dims::new(10, 10);
        let initial = Seed::random(5).generate(10, 10).unwrap();
        let expected = run_life(&initial, dims, 1, Strategy::Sequential, 7);

        for strategy in Strategy::all() {
            let mut engine = life(initial.clone(), dims, 3, strategy);
            engine.run(3).unwrap();
            engine.run(0).unwrap();
            engine.run(4).unwrap();
            assert_eq!(engine.generation(), 7);
            assert_eq!(engine.state(), expected.as_slice());
        }
    }

    #[test]
    fn test_frames_match_generations() {
        let dims = Dims::new(6, 5);
        let initial = Seed::random(9).generate(6, 5).unwrap();

        // Reference frames from the plain rule.
        let mut reference = Vec::new();
        let mut grid = initial.clone();
        for _ in 0..6 {
            grid = (0..dims.cells())
                .map(|i| LifeRule.next_state(&grid, i, dims))
                .collect();
            reference.push(Monochrome.render(&grid, dims));
        }

        for strategy in Strategy::all() {
            let mut engine = life(initial.clone(), dims, 3, strategy);
            let mut sink = MemorySink::default();
            let report = engine.run_rendered(6, &Monochrome, &mut sink).unwrap();

            assert_eq!(report.frames_saved, 6);
            assert_eq!(report.frames_failed, 0);

            let mut frames = sink.frames;
            frames.sort_by_key(|(g, _)| *g);
            let generations: Vec<u64> = frames.iter().map(|(g, _)| *g).collect();
            assert_eq!(generations, (0..6).collect::<Vec<_>>());
            let frames: Vec<Frame> = frames.into_iter().map(|(_, f)| f).collect();
            assert_eq!(frames, reference, "strategy {}", strategy);
        }
    }

    #[test]
    fn test_frame_numbers_continue_across_runs() {
        let dims = Dims::new(4, 4);
        let mut engine = life(EXAMPLE.to_vec(), dims, 2, Strategy::Farm);
        let mut sink = MemorySink::default();
        engine.run(2).unwrap();
        engine.run_rendered(2, &Monochrome, &mut sink).unwrap();
        let mut generations: Vec<u64> = sink.frames.iter().map(|(g, _)| *g).collect();
        generations.sort_unstable();
        assert_eq!(generations, vec![2, 3]);
    }

    #[test]
    fn test_failing_sink_does_not_abort() {
        struct Broken;
        impl FrameSink for Broken {
            fn save_frame(&mut self, _: u64, _: &Frame) -> Result<(), RenderError> {
                Err(std::io::Error::other("read-only filesystem").into())
            }
        }

        let dims = Dims::new(4, 4);
        let expected = run_life(&EXAMPLE, dims, 1, Strategy::Sequential, 5);
        for strategy in Strategy::all() {
            let mut engine = life(EXAMPLE.to_vec(), dims, 2, strategy);
            let report = engine.run_rendered(5, &Monochrome, &mut Broken).unwrap();
            assert_eq!(report.frames_saved, 0);
            assert_eq!(report.frames_failed, 5);
            assert_eq!(engine.state(), expected.as_slice());
        }
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let dims = Dims::new(2, 2);
        let err = Engine::new(vec![0u8; 4], dims, 0, Strategy::Farm, LifeRule).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfiguration(ConfigError::InvalidWorkerCount)
        ));

        let err = Engine::new(vec![0u8; 4], dims, 5, Strategy::Sequential, LifeRule).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfiguration(ConfigError::TooManyWorkers { workers: 5, cells: 4 })
        ));

        let err = Engine::new(vec![0u8; 3], dims, 1, Strategy::Farm, LifeRule).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfiguration(ConfigError::StateLength { .. })
        ));

        let err =
            Engine::new(Vec::<u8>::new(), Dims::new(0, 3), 1, Strategy::Farm, LifeRule).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfiguration(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_overflowing_dimensions_rejected() {
        for dims in [Dims::new(usize::MAX, 2), Dims::new(usize::MAX / 3, 4)] {
            let err = Engine::new(Vec::<u8>::new(), dims, 1, Strategy::Farm, LifeRule).unwrap_err();
            assert!(matches!(
                err,
                EngineError::InvalidConfiguration(ConfigError::InvalidDimensions)
            ));
        }
    }

    #[test]
    fn test_workers_run_on_named_threads() {
        let names = parking_lot::Mutex::new(std::collections::BTreeSet::new());
        let rule = |grid: &[u8], index: usize, _dims: Dims| {
            if let Some(name) = std::thread::current().name() {
                names.lock().insert(name.to_string());
            }
            grid[index]
        };

        let expected = [
            (Strategy::ThreadPerWorker, "gridsim-worker-"),
            (Strategy::Farm, "gridsim-farm-"),
            (Strategy::ParallelFor, "gridsim-pf-"),
        ];
        for (strategy, prefix) in expected {
            names.lock().clear();
            let mut engine = Engine::new(vec![0u8; 9], Dims::new(3, 3), 3, strategy, &rule).unwrap();
            engine.run(2).unwrap();

            let seen: Vec<String> = names.lock().iter().cloned().collect();
            let wanted: Vec<String> = (0..3).map(|i| format!("{}{}", prefix, i)).collect();
            assert_eq!(seen, wanted, "strategy {}", strategy);
        }
    }

    #[test]
    fn test_spawn_failure_message() {
        let err = EngineError::WorkerSpawn(std::io::Error::other("resource temporarily unavailable"));
        assert_eq!(
            err.to_string(),
            "Failed to spawn worker thread: resource temporarily unavailable"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_debug_summary() {
        let engine = life(vec![0u8; 16], Dims::new(4, 4), 2, Strategy::Farm);
        let debug = format!("{:?}", engine);
        assert!(debug.starts_with("Engine {"));
        assert!(debug.contains("workers: 2"));
        assert!(debug.contains("generation: 0"));
        assert!(debug.contains("Farm"));
    }

    #[test]
    fn test_sequential_runs_single_worker() {
        let engine = life(vec![0u8; 16], Dims::new(4, 4), 4, Strategy::Sequential);
        assert_eq!(engine.workers(), 1);
        assert_eq!(engine.ranges(), &[0..16]);
    }

    #[test]
    fn test_from_config() {
        let config = SimulationConfig {
            rows: 3,
            cols: 3,
            iterations: 1,
            workers: 2,
            strategy: Strategy::ParallelFor,
            seed: Seed {
                pattern: Pattern::Live {
                    cells: vec![(1, 0), (1, 1), (1, 2)],
                },
            },
            frames: None,
        };
        let mut engine = Engine::from_config(&config).unwrap();
        assert_eq!(engine.live_cells(), 3);
        engine.run(config.iterations).unwrap();
        // On a 3x3 torus every cell neighbors the whole blinker row.
        assert_eq!(engine.live_cells(), 9);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_strategies_agree(
            rows in 1usize..10,
            cols in 1usize..10,
            cells in proptest::collection::vec(0u8..=1, 100),
            workers in 1usize..8,
            iterations in 0u64..6,
        ) {
            let dims = Dims::new(rows, cols);
            let initial = cells[..dims.cells()].to_vec();
            let workers = workers.min(dims.cells());
            let expected = run_life(&initial, dims, 1, Strategy::Sequential, iterations);

            for strategy in Strategy::all() {
                prop_assert_eq!(&run_life(&initial, dims, workers, strategy, iterations), &expected);
            }
        }
    }
}

//! gridsim CLI - Run a cellular automaton for a fixed number of generations.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use gridsim::{
    compute::{Engine, Strategy},
    render::{Monochrome, PngSink},
    schema::{FrameConfig, Seed, SimulationConfig},
};

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct Invocation {
    strategy: Option<Strategy>,
    frames: Option<PathBuf>,
    seed: Option<u64>,
    config: Option<PathBuf>,
    example: bool,
    positional: Vec<String>,
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut invocation = Invocation::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--strategy" => {
                let name = value("--strategy")?;
                invocation.strategy = Some(name.parse::<Strategy>().map_err(|e| e.to_string())?);
            }
            "--frames" => invocation.frames = Some(PathBuf::from(value("--frames")?)),
            "--seed" => {
                let seed = value("--seed")?;
                invocation.seed = Some(
                    seed.parse::<u64>()
                        .map_err(|e| format!("Invalid seed '{}': {}", seed, e))?,
                );
            }
            "--config" => invocation.config = Some(PathBuf::from(value("--config")?)),
            "--example" => invocation.example = true,
            _ => invocation.positional.push(arg.clone()),
        }
    }

    Ok(invocation)
}

/// Exit status for a malformed command line.
const USAGE_EXIT: i32 = -1;

/// Whether the positional arguments have a runnable shape: three or four
/// values, or none at all when a config file supplies them.
fn arity_ok(invocation: &Invocation) -> bool {
    match invocation.positional.len() {
        3 | 4 => true,
        0 => invocation.config.is_some(),
        _ => false,
    }
}

fn parse_count<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| format!("Invalid {} '{}': {}", name, raw, e))
}

/// Worker count when none is given on the command line.
fn default_workers(strategy: Strategy, cells: usize) -> usize {
    if !strategy.is_parallel() {
        return 1;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, cells.max(1))
}

/// Build the run configuration from positional arguments and flags.
fn build_config(invocation: &Invocation) -> Result<SimulationConfig, String> {
    let mut config = match &invocation.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|e| format!("Error reading config file: {}", e))?;
            serde_json::from_str(&raw).map_err(|e| format!("Error parsing config: {}", e))?
        }
        None => SimulationConfig::default(),
    };

    if let Some(strategy) = invocation.strategy {
        config.strategy = strategy;
    }

    match invocation.positional.as_slice() {
        [] if invocation.config.is_some() => {}
        [rows, cols, iterations, workers @ ..] if workers.len() <= 1 => {
            config.rows = parse_count("rows", rows)?;
            config.cols = parse_count("columns", cols)?;
            config.iterations = parse_count("iterations", iterations)?;
            config.workers = match workers.first() {
                Some(raw) => parse_count("workers", raw)?,
                None => default_workers(config.strategy, config.rows * config.cols),
            };
        }
        _ => return Err("Expected: rows columns iterations [workers]".to_string()),
    }

    if let Some(seed) = invocation.seed {
        config.seed = Seed::random(seed);
    }
    if let Some(directory) = &invocation.frames {
        config.frames = Some(FrameConfig {
            directory: directory.clone(),
        });
    }

    Ok(config)
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {} [--strategy NAME] [--frames DIR] [--seed N] [--config FILE] rows columns iterations [workers]",
        program
    );
    eprintln!();
    eprintln!("Run a toroidal Game of Life grid for a fixed number of generations.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  rows        Grid rows");
    eprintln!("  columns     Grid columns");
    eprintln!("  iterations  Number of generations");
    eprintln!("  workers     Worker count (default: available cores)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --strategy  sequential | thread-per-worker | farm | parallel-for");
    eprintln!("  --frames    Write one PNG frame per generation into DIR");
    eprintln!("  --seed      Seed for the random initial grid (default: 0)");
    eprintln!("  --config    Load a JSON configuration (positional arguments override it)");
    eprintln!("  --example   Print an example JSON configuration");
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("gridsim");

    let invocation = parse_args(args.get(1..).unwrap_or(&[])).unwrap_or_else(|e| {
        eprintln!("{}", e);
        print_usage(program);
        std::process::exit(USAGE_EXIT);
    });

    if invocation.example {
        print_example_config();
        return;
    }

    if !arity_ok(&invocation) {
        print_usage(program);
        std::process::exit(USAGE_EXIT);
    }

    let config = build_config(&invocation).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let mut engine = Engine::from_config(&config).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    log::info!(
        "Grid {}x{}, {} generation(s), {} worker(s), strategy {}",
        config.rows,
        config.cols,
        config.iterations,
        engine.workers(),
        config.strategy
    );
    log::info!("Initial live cells: {}", engine.live_cells());

    let start = Instant::now();
    let result = match &config.frames {
        Some(frames) => {
            let mut sink = PngSink::create(&frames.directory).unwrap_or_else(|e| {
                eprintln!("Error preparing frame directory: {}", e);
                std::process::exit(1);
            });
            engine.run_rendered(config.iterations, &Monochrome, &mut sink)
        }
        None => engine.run(config.iterations),
    };

    let report = result.unwrap_or_else(|e| {
        eprintln!("Run failed: {}", e);
        std::process::exit(1);
    });
    let elapsed = start.elapsed();

    log::info!("{} in {:.3}s", report, elapsed.as_secs_f64());
    println!("{}", engine.live_cells());
}

fn print_example_config() {
    let config = SimulationConfig {
        frames: Some(FrameConfig {
            directory: PathBuf::from("frames"),
        }),
        ..Default::default()
    };

    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example config: {}", e),
    }
}

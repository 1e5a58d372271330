use std::io::{self, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use klein::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use klein::{Automaton, Cell, Execution, PatternKind, SimulationConfig, Topology, ALIVE};
use klein_gpu::GpuAutomaton;

const DEFAULT_STEPS: u64 = 100;
const DEFAULT_EVERY: u64 = 10;
const RATE_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Conway's Life on a Klein bottle, printed as text frames.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Grid width in cells, a power of two.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u32,
    /// Grid height in cells, a power of two.
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,
    /// Initial pattern: empty, full, random, glider, gliders, rings, stripes,
    /// random-rings, random-stripes or squares.
    #[arg(long, default_value = "gliders")]
    pattern: PatternKind,
    /// Probability used by the random patterns.
    #[arg(short, long, default_value_t = 0.5)]
    probability: f64,
    /// Seed for the random patterns.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of generations to run.
    #[arg(short = 'n', long, default_value_t = DEFAULT_STEPS)]
    steps: u64,
    /// Print a frame every this many generations.
    #[arg(long, default_value_t = DEFAULT_EVERY, value_parser = clap::value_parser!(u64).range(1..))]
    every: u64,
    /// Pause between generations.
    #[arg(long, value_name = "MILLISECONDS", default_value_t = 0)]
    interval_ms: u64,
    /// Compute generations on one thread.
    #[arg(long)]
    serial: bool,
    /// Compute generations with the GPU kernel.
    #[arg(long, conflicts_with = "serial")]
    gpu: bool,
    /// Only print the final summary.
    #[arg(short, long)]
    quiet: bool,
}

impl CliArgs {
    fn config(&self) -> SimulationConfig {
        SimulationConfig {
            width: self.width,
            height: self.height,
            execution: if self.serial {
                Execution::Serial
            } else {
                Execution::Parallel
            },
            rng_seed: self.seed,
        }
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Logs generations per second at most once per interval.
struct RateLog {
    generations: u64,
    since: Instant,
}

impl RateLog {
    fn new() -> Self {
        Self {
            generations: 0,
            since: Instant::now(),
        }
    }

    fn record(&mut self, generations: u64) {
        self.generations += generations;
        let elapsed = self.since.elapsed();
        if elapsed >= RATE_LOG_INTERVAL {
            let rate = self.generations as f64 / elapsed.as_secs_f64();
            log::info!("generations/s: {:.1}", rate);
            self.generations = 0;
            self.since = Instant::now();
        }
    }
}

fn render_frame(topology: &Topology, step: u64, cells: &[Cell]) -> String {
    let width = topology.width() as usize;
    let alive = cells.iter().filter(|&&cell| cell == ALIVE).count();
    let mut frame = format!("generation {step}, population {alive}\n");
    frame.reserve(cells.len() + topology.height() as usize);
    for row in cells.chunks(width) {
        frame.extend(row.iter().map(|&cell| if cell == ALIVE { '#' } else { '.' }));
        frame.push('\n');
    }
    frame
}

fn print_frame(frame: &str) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(frame.as_bytes())?;
    writeln!(stdout)?;
    Ok(())
}

fn run_cpu(mut automaton: Automaton, args: &CliArgs) -> anyhow::Result<()> {
    let (sender, receiver) = mpsc::sync_channel(1);
    let steps = args.steps;
    let every = args.every;
    let interval = args.interval();

    // Spawn a background thread to advance the grid; the printer only ever
    // sees finished generations.
    let stepper = thread::spawn(move || {
        let mut rate = RateLog::new();
        if sender.send(automaton.snapshot()).is_err() {
            return automaton;
        }
        for _ in 0..steps {
            if !interval.is_zero() {
                thread::sleep(interval);
            }
            automaton.step();
            rate.record(1);
            if automaton.step_count() % every == 0 && sender.send(automaton.snapshot()).is_err() {
                break;
            }
        }
        automaton
    });

    for generation in receiver {
        if !args.quiet {
            print_frame(&render_frame(
                generation.topology(),
                generation.step(),
                generation.cells(),
            ))?;
        }
    }

    let automaton = stepper
        .join()
        .map_err(|_| anyhow::anyhow!("stepping thread panicked"))?;
    println!(
        "finished at generation {} with population {}",
        automaton.step_count(),
        automaton.population()
    );
    Ok(())
}

fn run_gpu(automaton: &Automaton, args: &CliArgs) -> anyhow::Result<()> {
    let mut gpu = GpuAutomaton::from_automaton(automaton).context("create GPU automaton")?;
    let topology = *gpu.topology();
    let mut rate = RateLog::new();

    let mut cells = gpu.read_current()?;
    if !args.quiet {
        print_frame(&render_frame(&topology, gpu.step_count(), &cells))?;
    }

    let mut remaining = args.steps;
    while remaining > 0 {
        // with a pause every generation is its own submission
        let batch = if args.interval_ms > 0 {
            thread::sleep(args.interval());
            1
        } else {
            remaining.min(args.every)
        };
        gpu.step_n(batch);
        remaining -= batch;
        rate.record(batch);

        let at_frame = gpu.step_count() % args.every == 0;
        if at_frame || remaining == 0 {
            cells = gpu.read_current()?;
        }
        if at_frame && !args.quiet {
            print_frame(&render_frame(&topology, gpu.step_count(), &cells))?;
        }
    }

    println!(
        "finished at generation {} with population {}",
        gpu.step_count(),
        cells.iter().filter(|&&cell| cell == ALIVE).count()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = CliArgs::parse();

    let pattern = args.pattern.with_probability(args.probability)?;
    let mut automaton = Automaton::with_config(&args.config()).context("create automaton")?;
    automaton.seed(&pattern).context("seed automaton")?;
    log::info!(
        "{pattern} on a {}x{} Klein bottle, {} alive",
        automaton.width(),
        automaton.height(),
        automaton.population()
    );

    if args.gpu {
        run_gpu(&automaton, &args)
    } else {
        run_cpu(automaton, &args)
    }
}

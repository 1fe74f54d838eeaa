// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CLI tool estimating π by Monte Carlo sampling until a limit is reached.

use clap::{Parser, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use sample_until::{CpuPinningPolicy, SampleUntil, StopReason, WorkerCount};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

fn main() -> sample_until::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = SampleUntil {
        duration: cli.duration_ms.map(Duration::from_millis),
        count: cli.count,
        memory_fraction: cli.memory_fraction,
        size_mb: cli.size_mb,
        num_workers: WorkerCount::try_from(cli.num_workers)?,
        batch_size: cli.batch_size,
        liveness_timeout: Duration::from_millis(cli.liveness_timeout_ms),
        cpu_pinning: match cli.cpu_pinning {
            CpuPinningCli::No => CpuPinningPolicy::No,
            CpuPinningCli::IfSupported => CpuPinningPolicy::IfSupported,
            CpuPinningCli::Always => CpuPinningPolicy::Always,
        },
    };

    let start = Instant::now();
    match (cli.scenario, cli.seed) {
        (Scenario::Collect, None) => {
            let sampled = config.sample(|| in_circle(&mut rand::rng()))?;
            report(
                count_inside(&sampled.samples),
                sampled.samples.len(),
                &sampled.stop_reasons,
            );
            print_advisories(&sampled.advisories);
        }
        (Scenario::Collect, Some(seed)) => {
            let sampled =
                config.sample_inputs(|index| in_circle(&mut seeded(seed, index)), 0u64..)?;
            report(
                count_inside(&sampled.samples),
                sampled.samples.len(),
                &sampled.stop_reasons,
            );
            print_advisories(&sampled.advisories);
        }
        (Scenario::Fold, None) => {
            let folded = config.fold(
                || in_circle(&mut rand::rng()),
                |inside, hit| inside + usize::from(hit),
                0,
            )?;
            report(folded.acc, folded.count, &folded.stop_reasons);
            print_advisories(&folded.advisories);
        }
        (Scenario::Fold, Some(seed)) => {
            let folded = config.fold_inputs(
                |index| in_circle(&mut seeded(seed, index)),
                0u64..,
                |inside, hit| inside + usize::from(hit),
                0,
            )?;
            report(folded.acc, folded.count, &folded.stop_reasons);
            print_advisories(&folded.advisories);
        }
    }
    println!("elapsed = {:?}", start.elapsed());
    Ok(())
}

/// Draws a point uniformly in the unit square, and returns whether it falls in
/// the quarter of the unit disk.
fn in_circle(rng: &mut impl Rng) -> bool {
    let x: f64 = rng.random();
    let y: f64 = rng.random();
    x * x + y * y <= 1.0
}

/// Returns a reproducible generator for the sample of the given index.
fn seeded(seed: u64, index: u64) -> ChaCha12Rng {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    rng.set_stream(index);
    rng
}

fn count_inside(samples: &[bool]) -> usize {
    samples.iter().filter(|&&hit| hit).count()
}

fn report(inside: usize, total: usize, stop_reasons: &[StopReason]) {
    println!("samples = {total}");
    if total != 0 {
        println!("pi ~ {}", 4.0 * inside as f64 / total as f64);
    }
    for (id, reason) in stop_reasons.iter().enumerate() {
        println!("worker #{id}: {reason}");
    }
}

fn print_advisories(advisories: &[sample_until::Advisory]) {
    for advisory in advisories {
        eprintln!("warning: {advisory}");
    }
}

/// CLI tool estimating π by Monte Carlo sampling until a limit is reached.
#[derive(Parser, Debug, PartialEq)]
#[command(version)]
struct Cli {
    /// Number of worker threads, or -1 for the available parallelism.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    num_workers: isize,

    /// Whether to collect all the samples or to count them on the fly.
    #[arg(long, value_enum, default_value_t = Scenario::Fold)]
    scenario: Scenario,

    /// Stop after this number of milliseconds.
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Stop after this number of samples.
    #[arg(long)]
    count: Option<usize>,

    /// Stop once this fraction of the host memory is used.
    #[arg(long)]
    memory_fraction: Option<f64>,

    /// Stop once the samples are estimated to take this many megabytes.
    #[arg(long)]
    size_mb: Option<f64>,

    /// Number of samples sent at once to the folding thread.
    #[arg(long, default_value_t = NonZeroUsize::MIN)]
    batch_size: NonZeroUsize,

    /// Milliseconds to wait for the folding thread before warning.
    #[arg(long, default_value_t = 5_000)]
    liveness_timeout_ms: u64,

    /// Policy to pin worker threads to CPUs.
    #[arg(long, value_enum, default_value_t = CpuPinningCli::No)]
    cpu_pinning: CpuPinningCli,

    /// Seed to draw reproducible points, one random stream per sample index.
    #[arg(long)]
    seed: Option<u64>,
}

/// Scenario to run.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Scenario {
    /// Collect all the samples, then count the hits.
    Collect,
    /// Count the hits on a dedicated folding thread.
    Fold,
}

/// Policy to pin worker threads to CPUs.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CpuPinningCli {
    /// Don't pin worker threads.
    No,
    /// Pin worker threads if supported on this platform.
    IfSupported,
    /// Pin worker threads, or fail if unsupported.
    Always,
}

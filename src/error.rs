// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors returned by sampling runs.

use thiserror::Error;

/// Errors that can occur when configuring or running a sampling pipeline.
///
/// Configuration errors are always returned before any worker thread is
/// spawned.
#[derive(Debug, Error)]
pub enum Error {
    /// No stopping condition was given and the inputs aren't provably finite.
    #[error("provide at least one stopping condition")]
    MissingStoppingCondition,
    /// The time budget is zero.
    #[error("duration has to be > 0")]
    NonPositiveDuration,
    /// The sample count is zero.
    #[error("count has to be > 0")]
    NonPositiveCount,
    /// The memory fraction is outside of `[0, 1]`.
    #[error("memory fraction has to be between 0 and 1, got {0}")]
    MemoryFractionOutOfRange(f64),
    /// The output size limit isn't a positive number of megabytes.
    #[error("size limit has to be > 0 MB, got {0}")]
    NonPositiveSize(f64),
    /// The number of workers is neither positive nor the `-1` sentinel.
    #[error("number of workers has to be >= 1 or -1, got {0}")]
    InvalidWorkerCount(isize),
    /// Querying the available parallelism of the host failed.
    #[error("failed to query the available parallelism: {0}")]
    AvailableParallelism(#[source] std::io::Error),
    /// Worker threads can't be pinned to CPUs on this platform, but
    /// [`CpuPinningPolicy::Always`](crate::CpuPinningPolicy::Always) was
    /// requested.
    #[error("pinning threads to CPUs is not implemented on this platform")]
    CpuPinningUnsupported,
    /// A worker thread couldn't be pinned to its CPU.
    #[error("failed to pin worker thread #{0} to CPU #{0}: {1}")]
    CpuPinning(usize, #[source] std::io::Error),
    /// The operating system refused to spawn a thread.
    #[error("failed to spawn a thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// Some worker threads panicked while sampling.
    #[error("{0} worker thread(s) panicked")]
    WorkerPanicked(usize),
    /// The aggregating thread terminated without publishing its result.
    #[error("folding process crashed")]
    FoldingCrashed,
}

/// Result type of sampling runs.
pub type Result<T> = std::result::Result<T, Error>;

// Copyright 2024-2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration of the worker threads.

use crate::error::{Error, Result};
use std::convert::TryFrom;
use std::num::NonZeroUsize;

/// Number of worker threads to run a sampling pipeline on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerCount {
    /// Use the number of threads returned by
    /// [`std::thread::available_parallelism()`].
    AvailableParallelism,
    /// Use the given number of threads.
    Count(NonZeroUsize),
}

impl Default for WorkerCount {
    /// Samples on the calling thread.
    fn default() -> Self {
        WorkerCount::Count(NonZeroUsize::MIN)
    }
}

impl WorkerCount {
    /// Sentinel value requesting all the available hardware parallelism.
    pub const ALL: isize = -1;

    /// Resolves the number of worker threads.
    pub fn resolve(self) -> Result<NonZeroUsize> {
        match self {
            WorkerCount::AvailableParallelism => {
                std::thread::available_parallelism().map_err(Error::AvailableParallelism)
            }
            WorkerCount::Count(count) => Ok(count),
        }
    }
}

impl TryFrom<isize> for WorkerCount {
    type Error = Error;

    /// Parses a worker count, where `-1` requests all the available
    /// parallelism.
    fn try_from(num_workers: isize) -> Result<Self> {
        if num_workers == Self::ALL {
            return Ok(WorkerCount::AvailableParallelism);
        }
        usize::try_from(num_workers)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(WorkerCount::Count)
            .ok_or(Error::InvalidWorkerCount(num_workers))
    }
}

impl TryFrom<usize> for WorkerCount {
    type Error = Error;

    fn try_from(num_workers: usize) -> Result<Self> {
        let count = NonZeroUsize::new(num_workers).ok_or(Error::InvalidWorkerCount(0))?;
        Ok(WorkerCount::Count(count))
    }
}

/// Policy to pin worker threads to CPUs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CpuPinningPolicy {
    /// Don't pin worker threads to CPUs.
    #[default]
    No,
    /// Pin each worker thread to a CPU, if CPU pinning is supported and
    /// implemented on this platform.
    IfSupported,
    /// Pin each worker thread to a CPU. The run fails with
    /// [`Error::CpuPinningUnsupported`] if CPU pinning isn't implemented on
    /// this platform, or with [`Error::CpuPinning`] if a worker can't run on
    /// the CPU of its index.
    Always,
}

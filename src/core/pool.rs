// Copyright 2024-2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A pool of scoped worker threads, each running its own sampler.

use crate::config::CpuPinningPolicy;
use crate::error::{Error, Result};
use crate::macros::{log_debug, log_error, log_warn};
// Platforms that support `libc::sched_setaffinity()`.
#[cfg(all(
    not(miri),
    any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    )
))]
use nix::{
    errno::Errno,
    sched::{sched_getaffinity, sched_setaffinity, CpuSet},
    unistd::Pid,
};
use std::thread::{Scope, ScopedJoinHandle};

/// Splits an input stream into `num_workers` interleaved sub-streams, and
/// returns the one of worker `id`, i.e. the items at positions `id`,
/// `id + num_workers`, `id + 2 * num_workers`, etc.
///
/// Each worker walks its own clone of the stream, so the sub-streams are
/// disjoint and cover all the items regardless of timing.
pub fn interleave<I: Iterator>(
    inputs: I,
    id: usize,
    num_workers: usize,
) -> impl Iterator<Item = I::Item> {
    inputs.skip(id).step_by(num_workers)
}

/// Handles to the worker threads spawned in a scope.
///
/// Dropping the pool joins all the threads that haven't been joined yet.
pub struct WorkerPool<'scope, R> {
    /// Handles to all the worker threads in the pool.
    threads: Vec<WorkerThreadHandle<'scope, R>>,
    /// Policy to pin worker threads to CPUs.
    cpu_pinning: CpuPinningPolicy,
}

/// Handle to a worker thread in the pool.
struct WorkerThreadHandle<'scope, R> {
    /// Worker index.
    id: usize,
    /// Thread handle object.
    handle: ScopedJoinHandle<'scope, Result<R>>,
}

impl<'scope, R: Send + 'scope> WorkerPool<'scope, R> {
    /// Creates an empty pool for `num_threads` workers.
    ///
    /// With [`CpuPinningPolicy::Always`], this checks that each worker can be
    /// pinned to the CPU of its index, before any thread is spawned.
    pub fn new(cpu_pinning: CpuPinningPolicy, num_threads: usize) -> Result<Self> {
        match cpu_pinning {
            CpuPinningPolicy::No => (),
            CpuPinningPolicy::IfSupported => {
                #[cfg(any(
                    miri,
                    not(any(
                        target_os = "android",
                        target_os = "dragonfly",
                        target_os = "freebsd",
                        target_os = "linux"
                    ))
                ))]
                log_warn!("Pinning threads to CPUs is not implemented on this platform.");
            }
            CpuPinningPolicy::Always => check_cpus(num_threads)?,
        }

        Ok(Self {
            threads: Vec::with_capacity(num_threads),
            cpu_pinning,
        })
    }

    /// Spawns a worker thread running the given function.
    ///
    /// If the thread can't be pinned as required, `work` is dropped without
    /// running and [`WorkerPool::join`] reports the error.
    pub fn spawn<'env>(
        &mut self,
        scope: &'scope Scope<'scope, 'env>,
        work: impl FnOnce() -> R + Send + 'scope,
    ) -> Result<()> {
        let id = self.threads.len();
        let cpu_pinning = self.cpu_pinning;
        let handle = std::thread::Builder::new()
            .name(format!("sample-until-worker-{id}"))
            .spawn_scoped(scope, move || {
                pin_to_cpu(id, cpu_pinning)?;
                Ok(work())
            })
            .map_err(Error::Spawn)?;
        log_debug!("[main thread] Spawned worker thread #{id}");
        self.threads.push(WorkerThreadHandle { id, handle });
        Ok(())
    }

    /// Joins all the worker threads and returns their outputs, in the order in
    /// which the threads were spawned.
    ///
    /// All the threads are joined even if some of them failed. Panics are
    /// reported first, as [`Error::WorkerPanicked`], then the first thread
    /// that couldn't be pinned to its CPU.
    pub fn join(mut self) -> Result<Vec<R>> {
        log_debug!("[main thread] Joining threads in the pool...");
        let mut outputs = Vec::with_capacity(self.threads.len());
        let mut num_panics = 0;
        let mut first_error = None;
        for t in self.threads.drain(..) {
            match t.handle.join() {
                Ok(Ok(output)) => {
                    log_debug!("[main thread] Thread #{} joined", t.id);
                    outputs.push(output);
                }
                Ok(Err(e)) => {
                    log_error!("[main thread] Thread #{} didn't run: {e}", t.id);
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    log_error!("[main thread] Thread #{} panicked", t.id);
                    num_panics += 1;
                }
            }
        }
        log_debug!("[main thread] Joined threads.");

        if num_panics != 0 {
            log_error!("[main thread] {num_panics} worker thread(s) panicked!");
            return Err(Error::WorkerPanicked(num_panics));
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }
}

impl<R> Drop for WorkerPool<'_, R> {
    /// Joins the remaining threads in the pool.
    fn drop(&mut self) {
        for t in self.threads.drain(..) {
            let result = t.handle.join();
            if result.is_err() {
                log_error!("[main thread] Thread #{} panicked", t.id);
            }
        }
    }
}

/// Checks that worker threads may run on each of the CPUs `0..num_threads`.
#[cfg(all(
    not(miri),
    any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    )
))]
fn check_cpus(num_threads: usize) -> Result<()> {
    let allowed = sched_getaffinity(Pid::from_raw(0)).map_err(|e| Error::CpuPinning(0, e.into()))?;
    for id in 0..num_threads {
        match allowed.is_set(id) {
            Ok(true) => (),
            Ok(false) => {
                log_error!("Thread #{id} can't be pinned: CPU #{id} isn't available");
                return Err(Error::CpuPinning(id, Errno::EINVAL.into()));
            }
            Err(e) => return Err(Error::CpuPinning(id, e.into())),
        }
    }
    Ok(())
}

#[cfg(any(
    miri,
    not(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    ))
))]
fn check_cpus(_num_threads: usize) -> Result<()> {
    log_error!("Pinning threads to CPUs is not implemented on this platform.");
    Err(Error::CpuPinningUnsupported)
}

/// Pins the current thread to the CPU of the given index, following the given
/// policy.
#[allow(unused_variables)]
fn pin_to_cpu(id: usize, cpu_pinning: CpuPinningPolicy) -> Result<()> {
    #[cfg(all(
        not(miri),
        any(
            target_os = "android",
            target_os = "dragonfly",
            target_os = "freebsd",
            target_os = "linux"
        )
    ))]
    {
        let pin = || -> nix::Result<()> {
            let mut cpu_set = CpuSet::new();
            cpu_set.set(id)?;
            sched_setaffinity(Pid::from_raw(0), &cpu_set)
        };
        match cpu_pinning {
            CpuPinningPolicy::No => (),
            CpuPinningPolicy::IfSupported => match pin() {
                Ok(()) => log_debug!("Pinned thread #{id} to CPU #{id}"),
                Err(_e) => log_warn!("Failed to set CPU affinity for thread #{id}: {_e}"),
            },
            CpuPinningPolicy::Always => {
                if let Err(e) = pin() {
                    log_error!("Failed to set CPU affinity for thread #{id}: {e}");
                    return Err(Error::CpuPinning(id, e.into()));
                }
                log_debug!("Pinned thread #{id} to CPU #{id}");
            }
        }
    }
    Ok(())
}

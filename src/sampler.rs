// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Entry points of sampling runs.

use crate::config::{CpuPinningPolicy, WorkerCount};
use crate::core::{
    aggregate, await_result, drive, interleave, queue_capacity, BatchSink, FoldSink, OnceFlag,
    Run, WorkerPool,
};
use crate::error::{Error, Result};
use crate::input::{classify, Finiteness};
#[cfg(feature = "log_parallelism")]
use crate::macros::log_info;
use crate::macros::{log_debug, log_error, log_warn};
use crate::outcome::{Advisory, Folded, Sampled};
use crate::stop::{ConditionSet, StopPlan, StopReason};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Configuration of a sampling run.
///
/// At least one limit among `duration`, `count`, `memory_fraction` and
/// `size_mb` must be set, unless the inputs are finite. All limits are
/// approximate: they are checked after each sample, so every worker may
/// produce one sample beyond them.
///
/// ```
/// # use sample_until::SampleUntil;
/// let sampled = SampleUntil {
///     count: Some(100),
///     ..Default::default()
/// }
/// .sample(|| 42)
/// .unwrap();
/// assert_eq!(sampled.samples.len(), 100);
/// ```
#[derive(Clone, Debug)]
pub struct SampleUntil {
    /// Stop once this time has elapsed since the start of the run.
    pub duration: Option<Duration>,
    /// Stop once this number of samples was produced. With several workers,
    /// each worker produces its share rounded up.
    pub count: Option<usize>,
    /// Stop once the fraction of used host memory reaches this value, between
    /// 0 and 1.
    pub memory_fraction: Option<f64>,
    /// Stop once the estimated serialized size of the samples reaches this
    /// number of megabytes.
    pub size_mb: Option<f64>,
    /// Number of worker threads.
    pub num_workers: WorkerCount,
    /// Number of samples that a worker sends at once to the folding thread.
    pub batch_size: NonZeroUsize,
    /// How long to wait for the folding thread before warning that it is
    /// slow.
    pub liveness_timeout: Duration,
    /// Policy to pin worker threads to CPUs.
    pub cpu_pinning: CpuPinningPolicy,
}

impl Default for SampleUntil {
    fn default() -> Self {
        Self {
            duration: None,
            count: None,
            memory_fraction: None,
            size_mb: None,
            num_workers: WorkerCount::default(),
            batch_size: NonZeroUsize::MIN,
            liveness_timeout: Duration::from_secs(5),
            cpu_pinning: CpuPinningPolicy::No,
        }
    }
}

impl SampleUntil {
    /// Calls `f` repeatedly until a limit is reached, and collects the
    /// samples.
    ///
    /// ```
    /// # use sample_until::{SampleUntil, WorkerCount};
    /// # use std::time::Duration;
    /// let sampled = SampleUntil {
    ///     duration: Some(Duration::from_millis(10)),
    ///     num_workers: WorkerCount::try_from(2usize).unwrap(),
    ///     ..Default::default()
    /// }
    /// .sample(|| 1)
    /// .unwrap();
    /// assert!(sampled.samples.len() >= 2);
    /// assert_eq!(sampled.stop_reasons.len(), 2);
    /// ```
    pub fn sample<T, F>(&self, f: F) -> Result<Sampled<T>>
    where
        T: Serialize + Send,
        F: Fn() -> T + Sync,
    {
        self.sample_inputs(|()| f(), std::iter::repeat(()))
    }

    /// Applies `f` to the inputs until a limit is reached or the inputs are
    /// exhausted, and collects the samples.
    ///
    /// With several workers, worker `i` out of `n` processes the inputs at
    /// positions `i`, `i + n`, `i + 2n`, etc., each worker iterating over its
    /// own clone of `inputs`.
    ///
    /// ```
    /// # use sample_until::{SampleUntil, StopReason};
    /// let sampled = SampleUntil::default()
    ///     .sample_inputs(|x| x * x, 0..5)
    ///     .unwrap();
    /// assert_eq!(sampled.samples, [0, 1, 4, 9, 16]);
    /// assert_eq!(sampled.stop_reasons, [StopReason::InputExhausted]);
    /// ```
    pub fn sample_inputs<I, T, F, It>(&self, f: F, inputs: It) -> Result<Sampled<T>>
    where
        It: IntoIterator<Item = I>,
        It::IntoIter: Clone + Send,
        T: Serialize + Send,
        F: Fn(I) -> T + Sync,
    {
        self.sample_inputs_with(f, inputs, |_: &mut ConditionSet<T>| ())
    }

    /// Like [`SampleUntil::sample_inputs()`], with additional stopping
    /// conditions.
    ///
    /// `custom_conditions` is called once per sampling worker, and appends
    /// that worker's own conditions after the configured limits. Custom
    /// conditions aren't divided between the workers. If they are non-empty,
    /// they count as a stopping condition for infinite inputs.
    ///
    /// ```
    /// # use sample_until::stop::{CountReached, StopReason};
    /// # use sample_until::SampleUntil;
    /// let sampled = SampleUntil::default()
    ///     .sample_inputs_with(|x| x, 0u64.., |conditions| {
    ///         conditions.push(CountReached::new(3).unwrap())
    ///     })
    ///     .unwrap();
    /// assert_eq!(sampled.samples, [0, 1, 2]);
    /// assert_eq!(sampled.stop_reasons, [StopReason::CountReached]);
    /// ```
    pub fn sample_inputs_with<I, T, F, It, K>(
        &self,
        f: F,
        inputs: It,
        custom_conditions: K,
    ) -> Result<Sampled<T>>
    where
        It: IntoIterator<Item = I>,
        It::IntoIter: Clone + Send,
        T: Serialize + Send,
        F: Fn(I) -> T + Sync,
        K: Fn(&mut ConditionSet<T>),
    {
        let inputs = inputs.into_iter();
        let num_workers = self.num_workers.resolve()?;
        let plan = self.stop_plan(num_workers)?;
        let new_conditions = || instantiate(&plan, &custom_conditions);
        let mut first_conditions = new_conditions();
        let advisories = check_finiteness(&inputs, &first_conditions)?;

        if num_workers.get() == 1 {
            let (samples, run) = drive(inputs, &f, &mut first_conditions, Vec::new());
            log_debug!("Sampled {} items on the current thread", run.count);
            return Ok(Sampled {
                samples,
                stop_reasons: stop_reasons(std::iter::once(&run)),
                advisories,
            });
        }

        let n = num_workers.get();
        let mut first_conditions = Some(first_conditions);
        let outputs = std::thread::scope(|scope| {
            let mut pool = WorkerPool::new(self.cpu_pinning, n)?;
            for id in 0..n {
                let inputs = interleave(inputs.clone(), id, n);
                let mut conditions = first_conditions.take().unwrap_or_else(&new_conditions);
                let f = &f;
                pool.spawn(scope, move || drive(inputs, f, &mut conditions, Vec::new()))?;
            }
            pool.join()
        })?;

        let (partitions, runs): (Vec<_>, Vec<_>) = outputs.into_iter().unzip();
        #[cfg(feature = "log_parallelism")]
        log_statistics(&runs);
        let samples = partitions.into_iter().flatten().collect();
        Ok(Sampled {
            samples,
            stop_reasons: stop_reasons(&runs),
            advisories,
        })
    }

    /// Calls `f` repeatedly until a limit is reached, and folds the samples
    /// with `combine` starting from `initial`.
    ///
    /// With `n > 1` workers, `n - 1` threads sample and one thread folds, so
    /// `combine` is applied sequentially but samples of different workers are
    /// interleaved in arrival order.
    pub fn fold<T, A, F, C>(&self, f: F, combine: C, initial: A) -> Result<Folded<A>>
    where
        T: Serialize + Send,
        A: Send,
        F: Fn() -> T + Sync,
        C: Fn(A, T) -> A + Send,
    {
        self.fold_inputs(|()| f(), std::iter::repeat(()), combine, initial)
    }

    /// Applies `f` to the inputs until a limit is reached or the inputs are
    /// exhausted, and folds the samples with `combine` starting from
    /// `initial`.
    ///
    /// ```
    /// # use sample_until::{SampleUntil, WorkerCount};
    /// let folded = SampleUntil {
    ///     num_workers: WorkerCount::try_from(4usize).unwrap(),
    ///     ..Default::default()
    /// }
    /// .fold_inputs(|x| x, 0..100u64, |acc, x| acc + x, 10)
    /// .unwrap();
    /// assert_eq!(folded.acc, 4960);
    /// assert_eq!(folded.count, 100);
    /// ```
    pub fn fold_inputs<I, T, A, F, C, It>(
        &self,
        f: F,
        inputs: It,
        combine: C,
        initial: A,
    ) -> Result<Folded<A>>
    where
        It: IntoIterator<Item = I>,
        It::IntoIter: Clone + Send,
        T: Serialize + Send,
        A: Send,
        F: Fn(I) -> T + Sync,
        C: Fn(A, T) -> A + Send,
    {
        self.fold_inputs_with(f, inputs, combine, initial, |_: &mut ConditionSet<T>| ())
    }

    /// Like [`SampleUntil::fold_inputs()`], with additional stopping
    /// conditions appended by `custom_conditions` for each sampling worker, as
    /// in [`SampleUntil::sample_inputs_with()`].
    pub fn fold_inputs_with<I, T, A, F, C, It, K>(
        &self,
        f: F,
        inputs: It,
        combine: C,
        initial: A,
        custom_conditions: K,
    ) -> Result<Folded<A>>
    where
        It: IntoIterator<Item = I>,
        It::IntoIter: Clone + Send,
        T: Serialize + Send,
        A: Send,
        F: Fn(I) -> T + Sync,
        C: Fn(A, T) -> A + Send,
        K: Fn(&mut ConditionSet<T>),
    {
        let inputs = inputs.into_iter();
        let num_workers = self.num_workers.resolve()?;
        // One of the workers folds.
        let num_samplers = NonZeroUsize::new(num_workers.get() - 1).unwrap_or(num_workers);
        let plan = self.stop_plan(num_samplers)?;
        let new_conditions = || instantiate(&plan, &custom_conditions);
        let mut first_conditions = new_conditions();
        let mut advisories = check_finiteness(&inputs, &first_conditions)?;

        if num_workers.get() == 1 {
            let sink = FoldSink::new(initial, combine);
            let (sink, run) = drive(inputs, &f, &mut first_conditions, sink);
            log_debug!("Folded {} items on the current thread", run.count);
            return Ok(Folded {
                acc: sink.into_inner(),
                count: run.count,
                stop_reasons: stop_reasons(std::iter::once(&run)),
                advisories,
            });
        }

        let n = num_samplers.get();
        let mut first_conditions = Some(first_conditions);
        let (sender, receiver) = crossbeam_channel::bounded(queue_capacity(num_samplers));
        let (result_sender, result_receiver) = crossbeam_channel::bounded(1);
        let backpressure = OnceFlag::new();
        let (runs, result) = std::thread::scope(|scope| {
            let mut pool = WorkerPool::new(self.cpu_pinning, n)?;
            let aggregator = std::thread::Builder::new()
                .name("sample-until-aggregator".into())
                .spawn_scoped(scope, move || {
                    aggregate(receiver, combine, initial, n, result_sender);
                })
                .map_err(Error::Spawn)?;
            log_debug!("[main thread] Spawned the aggregator thread");

            for id in 0..n {
                let inputs = interleave(inputs.clone(), id, n);
                let mut conditions = first_conditions.take().unwrap_or_else(&new_conditions);
                // Owned by the worker, so that it sends its done marker even if
                // the worker never runs.
                let sink = BatchSink::new(id, self.batch_size, sender.clone(), &backpressure);
                let f = &f;
                pool.spawn(scope, move || {
                    let (_sink, run) = drive(inputs, f, &mut conditions, sink);
                    run
                })?;
            }
            // The aggregator only observes a disconnection once all the
            // workers are gone.
            drop(sender);

            let runs = pool.join();
            let result = await_result(&result_receiver, self.liveness_timeout, &mut advisories);
            if aggregator.join().is_err() {
                log_error!("[main thread] The aggregator thread panicked");
            }
            Ok::<_, Error>((runs, result))
        })?;

        let runs = runs?;
        #[cfg(feature = "log_parallelism")]
        log_statistics(&runs);
        let (acc, count) = result?;
        if backpressure.is_raised() {
            advisories.push(Advisory::QueueFull);
        }
        Ok(Folded {
            acc,
            count,
            stop_reasons: stop_reasons(&runs),
            advisories,
        })
    }

    /// Validates the configured limits, and divides them between the given
    /// number of sampling workers.
    fn stop_plan(&self, num_samplers: NonZeroUsize) -> Result<StopPlan> {
        StopPlan::new(
            self.duration,
            self.count,
            self.memory_fraction,
            self.size_mb,
            num_samplers,
        )
    }
}

/// Creates the conditions of one sampling worker: the configured limits,
/// followed by the custom conditions.
fn instantiate<T: Serialize>(
    plan: &StopPlan,
    custom_conditions: &impl Fn(&mut ConditionSet<T>),
) -> ConditionSet<T> {
    let mut conditions = plan.instantiate();
    custom_conditions(&mut conditions);
    conditions
}

/// Rejects infinite inputs without any stopping condition.
fn check_finiteness<T>(
    inputs: &impl Iterator,
    conditions: &ConditionSet<T>,
) -> Result<Vec<Advisory>> {
    let mut advisories = Vec::new();
    if conditions.is_empty() {
        match classify(inputs) {
            Finiteness::Finite => (),
            Finiteness::Infinite => return Err(Error::MissingStoppingCondition),
            Finiteness::Unknown => {
                log_warn!("{}", Advisory::UnknownFiniteness);
                advisories.push(Advisory::UnknownFiniteness);
            }
        }
    }
    Ok(advisories)
}

/// Calls `f` repeatedly on `num_workers` threads until the given duration has
/// elapsed, and returns all the samples.
///
/// `num_workers` must be at least 1, or [`WorkerCount::ALL`] to use all the
/// available parallelism.
///
/// ```
/// # use std::time::Duration;
/// let samples = sample_until::sample_until_time_elapsed(|| 1u8, Duration::from_millis(5), 1)
///     .unwrap();
/// assert!(!samples.is_empty());
/// ```
pub fn sample_until_time_elapsed<T, F>(
    f: F,
    duration: Duration,
    num_workers: isize,
) -> Result<Vec<T>>
where
    T: Serialize + Send,
    F: Fn() -> T + Sync,
{
    let sampled = SampleUntil {
        duration: Some(duration),
        num_workers: WorkerCount::try_from(num_workers)?,
        ..Default::default()
    }
    .sample(f)?;
    Ok(sampled.samples)
}

/// Collects the reasons why each worker stopped.
///
/// A worker stopped by a disconnected aggregator has no reason, but then the
/// whole run fails anyway.
fn stop_reasons<'a>(runs: impl IntoIterator<Item = &'a Run>) -> Vec<StopReason> {
    runs.into_iter()
        .filter_map(|run| {
            if let Some(_reason) = run.reason {
                log_debug!("{_reason} ({} samples)", run.count);
            }
            run.reason
        })
        .collect()
}

#[cfg(feature = "log_parallelism")]
fn log_statistics(runs: &[Run]) {
    log_info!("Sampling statistics:");
    for (id, run) in runs.iter().enumerate() {
        log_info!("- worker #{id}: {} samples", run.count);
    }
    log_info!(
        "- total: {} samples",
        runs.iter().map(|run| run.count).sum::<usize>()
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stop::{
        MemoryPressure, MemoryProbe, OutputSize, Progress, SizeEstimator, StoppingCondition,
    };

    fn workers(n: usize) -> WorkerCount {
        WorkerCount::try_from(n).unwrap()
    }

    /// Fires once a sample reaches the given value.
    struct AtLeast(u64);

    impl StoppingCondition<u64> for AtLeast {
        fn should_stop(&mut self, progress: &Progress<'_, u64>) -> bool {
            *progress.latest >= self.0
        }

        fn reason(&self) -> StopReason {
            StopReason::Custom("a sample is large enough")
        }
    }

    struct FixedMemory(f64);

    impl MemoryProbe for FixedMemory {
        fn used_fraction(&mut self) -> f64 {
            self.0
        }
    }

    struct FixedSize(u64);

    impl<T> SizeEstimator<T> for FixedSize {
        fn encoded_len(&self, _value: &T) -> Option<u64> {
            Some(self.0)
        }
    }

    #[test]
    fn test_missing_stopping_condition() {
        let config = SampleUntil::default();
        assert!(matches!(
            config.sample(|| 1),
            Err(Error::MissingStoppingCondition)
        ));
        assert!(matches!(
            config.sample_inputs(|x| x, 0u64..),
            Err(Error::MissingStoppingCondition)
        ));
        assert!(matches!(
            config.fold(|| 1, |acc: u64, x: u64| acc + x, 0),
            Err(Error::MissingStoppingCondition)
        ));
    }

    #[test]
    fn test_invalid_configuration_spawns_nothing() {
        let config = SampleUntil {
            count: Some(0),
            num_workers: workers(4),
            ..Default::default()
        };
        let result = config.sample(|| -> u8 { panic!("sampled with an invalid configuration") });
        assert!(matches!(result, Err(Error::NonPositiveCount)));

        let config = SampleUntil {
            memory_fraction: Some(1.5),
            num_workers: workers(3),
            ..Default::default()
        };
        let result = config.fold(
            || -> u8 { panic!("sampled with an invalid configuration") },
            |acc: u64, x| acc + u64::from(x),
            0,
        );
        assert!(matches!(result, Err(Error::MemoryFractionOutOfRange(_))));
    }

    #[test]
    fn test_unknown_finiteness() {
        let mut remaining = 10;
        let inputs = std::iter::from_fn(move || {
            remaining -= 1;
            (remaining > 0).then_some(remaining)
        });
        let sampled = SampleUntil::default().sample_inputs(|x| x, inputs).unwrap();
        assert_eq!(sampled.samples, [9, 8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(sampled.advisories, [Advisory::UnknownFiniteness]);
        assert_eq!(sampled.stop_reasons, [StopReason::InputExhausted]);
    }

    #[test]
    fn test_no_advisory_with_stopping_condition() {
        let sampled = SampleUntil {
            count: Some(5),
            ..Default::default()
        }
        .sample_inputs(|x| x, (0u64..).filter(|x| x % 3 == 0))
        .unwrap();
        assert_eq!(sampled.samples, [0, 3, 6, 9, 12]);
        assert!(sampled.advisories.is_empty());
    }

    #[test]
    fn test_collect_count_divided_between_workers() {
        let sampled = SampleUntil {
            count: Some(10),
            num_workers: workers(4),
            ..Default::default()
        }
        .sample_inputs(|x| x, 0u64..)
        .unwrap();
        // Each worker produces ceil(10 / 4) = 3 samples.
        assert_eq!(sampled.samples.len(), 12);
        assert_eq!(sampled.stop_reasons, [StopReason::CountReached; 4]);
        let mut samples = sampled.samples;
        samples.sort();
        assert_eq!(samples, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_fold_count_divided_between_samplers() {
        let folded = SampleUntil {
            count: Some(10),
            num_workers: workers(4),
            ..Default::default()
        }
        .fold(|| 1u64, |acc, x| acc + x, 0)
        .unwrap();
        // Three workers sample ceil(10 / 3) = 4 samples each.
        assert_eq!(folded.count, 12);
        assert_eq!(folded.acc, 12);
        assert_eq!(folded.stop_reasons, [StopReason::CountReached; 3]);
    }

    #[test]
    fn test_fold_two_workers() {
        let folded = SampleUntil {
            num_workers: workers(2),
            batch_size: NonZeroUsize::new(7).unwrap(),
            ..Default::default()
        }
        .fold_inputs(
            |x| x,
            0..100u64,
            |mut acc: Vec<u64>, x| {
                acc.push(x);
                acc
            },
            Vec::new(),
        )
        .unwrap();
        // A single sampler preserves the order of the inputs.
        assert_eq!(folded.acc, (0..100).collect::<Vec<_>>());
        assert_eq!(folded.count, 100);
        assert_eq!(folded.stop_reasons, [StopReason::InputExhausted]);
    }

    #[test]
    fn test_fold_backpressure() {
        let folded = SampleUntil {
            count: Some(60),
            num_workers: workers(3),
            ..Default::default()
        }
        .fold(
            || 1u64,
            |acc, x| {
                std::thread::sleep(Duration::from_millis(2));
                acc + x
            },
            0,
        )
        .unwrap();
        // No sample is lost.
        assert_eq!(folded.count, 60);
        assert_eq!(folded.acc, 60);
        assert!(folded.advisories.contains(&Advisory::QueueFull));
    }

    #[test]
    fn test_fold_slow_aggregator() {
        let folded = SampleUntil {
            count: Some(10),
            num_workers: workers(2),
            liveness_timeout: Duration::from_millis(1),
            ..Default::default()
        }
        .fold(
            || 1u64,
            |acc, x| {
                std::thread::sleep(Duration::from_millis(20));
                acc + x
            },
            0,
        )
        .unwrap();
        assert_eq!(folded.acc, 10);
        assert!(folded.advisories.contains(&Advisory::AggregatorSlow));
    }

    #[test]
    fn test_fold_crashed_aggregator() {
        let result = SampleUntil {
            count: Some(1000),
            num_workers: workers(3),
            ..Default::default()
        }
        .fold(
            || 1u64,
            |acc: u64, x: u64| {
                if acc == 100 {
                    panic!("arithmetic panic");
                }
                acc + x
            },
            0,
        );
        assert!(matches!(result, Err(Error::FoldingCrashed)));
    }

    #[test]
    fn test_fold_worker_panics() {
        let result = SampleUntil {
            num_workers: workers(3),
            ..Default::default()
        }
        .fold_inputs(
            |x: u64| {
                if x == 50 {
                    panic!("arithmetic panic");
                }
                x
            },
            0..100,
            |acc, x| acc + x,
            0,
        );
        assert!(matches!(result, Err(Error::WorkerPanicked(1))));
    }

    #[test]
    fn test_collect_worker_panics() {
        let result = SampleUntil {
            num_workers: workers(4),
            ..Default::default()
        }
        .sample_inputs(
            |x: u64| {
                if x % 2 == 0 {
                    panic!("arithmetic panic");
                }
                x
            },
            0..100,
        );
        // Workers 0 and 2 only see even inputs.
        assert!(matches!(result, Err(Error::WorkerPanicked(2))));
    }

    #[test]
    fn test_memory_pressure_stops_after_one_sample() {
        let sampled = SampleUntil {
            memory_fraction: Some(0.0),
            num_workers: workers(3),
            ..Default::default()
        }
        .sample(|| 1u8)
        .unwrap();
        assert_eq!(sampled.samples, [1, 1, 1]);
        assert_eq!(sampled.stop_reasons, [StopReason::MemoryPressure; 3]);
    }

    #[test]
    fn test_output_size() {
        let sampled = SampleUntil {
            size_mb: Some(0.01),
            ..Default::default()
        }
        .sample(|| [0u8; 10])
        .unwrap();
        // Each sample is estimated to 10 bytes.
        assert_eq!(sampled.samples.len(), 1000);
        assert_eq!(sampled.stop_reasons, [StopReason::OutputSize]);
    }

    #[test]
    fn test_output_size_of_structs() {
        #[derive(Serialize)]
        struct Point {
            x: f64,
            y: f64,
        }

        let sampled = SampleUntil {
            size_mb: Some(0.0016),
            num_workers: workers(2),
            ..Default::default()
        }
        .sample(|| Point { x: 0.5, y: -0.5 })
        .unwrap();
        // 16 bytes per point, and 800 bytes per worker.
        assert!((100..=102).contains(&sampled.samples.len()));
        assert!(sampled.samples.iter().all(|p| p.x == 0.5 && p.y == -0.5));
        assert_eq!(sampled.stop_reasons, [StopReason::OutputSize; 2]);
    }

    #[test]
    fn test_sample_until_time_elapsed() {
        let start = std::time::Instant::now();
        let samples = sample_until_time_elapsed(|| 0u8, Duration::from_millis(20), 2).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(samples.len() >= 2);

        let start = std::time::Instant::now();
        let samples = sample_until_time_elapsed(
            || {
                std::thread::sleep(Duration::from_millis(1));
                0u8
            },
            Duration::from_millis(20),
            1,
        )
        .unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(20));
        // At most one sample beyond the budget, plus some scheduling slack.
        assert!(elapsed < Duration::from_millis(20 + 1 + 50));
        assert!((1..=20).contains(&samples.len()));

        assert!(matches!(
            sample_until_time_elapsed(|| 0u8, Duration::from_millis(20), 0),
            Err(Error::InvalidWorkerCount(0))
        ));
        assert!(matches!(
            sample_until_time_elapsed(|| 0u8, Duration::ZERO, 1),
            Err(Error::NonPositiveDuration)
        ));
    }

    #[test]
    fn test_custom_condition_on_infinite_inputs() {
        let sampled = SampleUntil {
            num_workers: workers(2),
            ..Default::default()
        }
        .sample_inputs_with(|x| x, 0u64.., |conditions| conditions.push(AtLeast(5)))
        .unwrap();
        // Worker 0 sees 0, 2, 4, 6 and worker 1 sees 1, 3, 5.
        assert_eq!(sampled.samples, [0, 2, 4, 6, 1, 3, 5]);
        assert_eq!(
            sampled.stop_reasons,
            [StopReason::Custom("a sample is large enough"); 2]
        );
        assert!(sampled.advisories.is_empty());
    }

    #[test]
    fn test_custom_conditions_after_configured_limits() {
        let sampled = SampleUntil {
            count: Some(4),
            ..Default::default()
        }
        .sample_inputs_with(|x| x, 0u64.., |conditions| conditions.push(AtLeast(3)))
        .unwrap();
        // Both fire on the fourth sample.
        assert_eq!(sampled.samples, [0, 1, 2, 3]);
        assert_eq!(sampled.stop_reasons, [StopReason::CountReached]);
    }

    #[test]
    fn test_memory_pressure_with_custom_reading() {
        let folded = SampleUntil {
            num_workers: workers(3),
            ..Default::default()
        }
        .fold_inputs_with(
            |x| x,
            0u64..,
            |acc, x| acc + x,
            0,
            |conditions| {
                conditions.push(MemoryPressure::with_probe(0.9, FixedMemory(0.95)).unwrap())
            },
        )
        .unwrap();
        // Each of the two samplers stops after its first sample.
        assert_eq!(folded.count, 2);
        assert_eq!(folded.acc, 1);
        assert_eq!(folded.stop_reasons, [StopReason::MemoryPressure; 2]);

        let folded = SampleUntil {
            count: Some(50),
            num_workers: workers(3),
            ..Default::default()
        }
        .fold_inputs_with(
            |x| x,
            0u64..,
            |acc, x| acc + x,
            0,
            |conditions| {
                conditions.push(MemoryPressure::with_probe(0.9, FixedMemory(0.5)).unwrap())
            },
        )
        .unwrap();
        assert_eq!(folded.count, 50);
        assert_eq!(folded.stop_reasons, [StopReason::CountReached; 2]);
    }

    #[test]
    fn test_custom_size_estimator() {
        let sampled = SampleUntil::default()
            .sample_inputs_with(
                |x| x,
                0u64..,
                |conditions| {
                    conditions.push(OutputSize::with_estimator(0.001, FixedSize(100)).unwrap())
                },
            )
            .unwrap();
        // 1000 bytes of 100-byte samples.
        assert_eq!(sampled.samples, (0..10).collect::<Vec<_>>());
        assert_eq!(sampled.stop_reasons, [StopReason::OutputSize]);
    }

    #[test]
    #[cfg(all(
        not(miri),
        any(
            target_os = "android",
            target_os = "dragonfly",
            target_os = "freebsd",
            target_os = "linux"
        )
    ))]
    fn test_cpu_pinning_always_beyond_available_cpus() {
        use nix::sched::{sched_getaffinity, CpuSet};
        use nix::unistd::Pid;

        let allowed = sched_getaffinity(Pid::from_raw(0)).unwrap();
        let Some(unavailable) = (0..CpuSet::count()).find(|&id| !allowed.is_set(id).unwrap()) else {
            return;
        };

        let result = SampleUntil {
            count: Some(10),
            // A single worker samples on the current thread, unpinned.
            num_workers: workers(unavailable.max(1) + 1),
            cpu_pinning: CpuPinningPolicy::Always,
            ..Default::default()
        }
        .sample(|| -> u8 { panic!("sampled without a CPU") });
        assert!(matches!(result, Err(Error::CpuPinning(id, _)) if id == unavailable));

        // One more worker folds.
        let result = SampleUntil {
            count: Some(10),
            num_workers: workers(unavailable + 2),
            cpu_pinning: CpuPinningPolicy::Always,
            ..Default::default()
        }
        .fold(
            || -> u8 { panic!("sampled without a CPU") },
            |acc: u64, x| acc + u64::from(x),
            0,
        );
        assert!(matches!(result, Err(Error::CpuPinning(id, _)) if id == unavailable));
    }

    #[test]
    #[cfg(any(
        miri,
        not(any(
            target_os = "android",
            target_os = "dragonfly",
            target_os = "freebsd",
            target_os = "linux"
        ))
    ))]
    fn test_cpu_pinning_always_unsupported() {
        let result = SampleUntil {
            count: Some(10),
            num_workers: workers(2),
            cpu_pinning: CpuPinningPolicy::Always,
            ..Default::default()
        }
        .sample(|| -> u8 { panic!("sampled without a CPU") });
        assert!(matches!(result, Err(Error::CpuPinningUnsupported)));
    }
}

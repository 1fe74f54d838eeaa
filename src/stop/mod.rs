// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Stopping conditions, deciding when a worker stops sampling.
//!
//! Conditions are only evaluated between two samples, so a run overshoots its
//! limits by up to one sample per worker.

mod count;
mod memory;
mod size;
mod time;

use crate::error::Result;
pub use count::CountReached;
pub use memory::{MemoryPressure, MemoryProbe, SystemMemory};
use serde::Serialize;
pub use size::{BincodeSize, OutputSize, SizeEstimator};
use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
pub use time::TimeElapsed;

/// Progress of a worker, as observed right after producing a sample.
pub struct Progress<'a, T> {
    /// Number of samples produced so far by this worker, including the latest
    /// one.
    pub count: usize,
    /// The latest sample.
    pub latest: &'a T,
}

/// Reason why a worker stopped sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The time budget elapsed.
    TimeElapsed,
    /// The worker produced its share of the requested samples.
    CountReached,
    /// The host memory usage exceeded the threshold.
    MemoryPressure,
    /// The estimated output size exceeded the limit.
    OutputSize,
    /// All the inputs were consumed.
    InputExhausted,
    /// A user-defined condition fired.
    Custom(&'static str),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TimeElapsed => f.write_str("Stopped because time elapsed."),
            StopReason::CountReached => f.write_str("Stopped because number of samples reached."),
            StopReason::MemoryPressure => f.write_str("Stopped because memory usage exceeded."),
            StopReason::OutputSize => f.write_str("Stopped because output size exceeded."),
            StopReason::InputExhausted => f.write_str("Stopped because all inputs were used."),
            StopReason::Custom(reason) => write!(f, "Stopped because {reason}."),
        }
    }
}

/// A predicate over the progress of a worker.
pub trait StoppingCondition<T> {
    /// Returns whether the worker should stop after the given progress.
    fn should_stop(&mut self, progress: &Progress<'_, T>) -> bool;

    /// Reason reported when this condition fires.
    fn reason(&self) -> StopReason;
}

/// An ordered set of stopping conditions.
///
/// Conditions are evaluated in the order in which they were pushed, and the
/// first one that fires decides the reported reason.
pub struct ConditionSet<T> {
    conditions: Vec<Box<dyn StoppingCondition<T> + Send>>,
}

impl<T> ConditionSet<T> {
    /// Creates an empty set, which never fires.
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Appends a condition, evaluated after all the previous ones.
    pub fn push(&mut self, condition: impl StoppingCondition<T> + Send + 'static) {
        self.conditions.push(Box::new(condition));
    }

    /// Number of conditions in this set.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Returns true if this set has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns the reason of the first condition that fires, if any.
    pub fn evaluate(&mut self, progress: &Progress<'_, T>) -> Option<StopReason> {
        self.conditions
            .iter_mut()
            .find_map(|condition| condition.should_stop(progress).then(|| condition.reason()))
    }
}

impl<T> Default for ConditionSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated limits of a run, already divided between its sampling workers.
///
/// Each worker instantiates its own [`ConditionSet`] from this plan, so that
/// calibration state is never shared.
#[derive(Clone)]
pub(crate) struct StopPlan {
    time: Option<TimeElapsed>,
    count: Option<CountReached>,
    memory: Option<MemoryPressure>,
    size: Option<OutputSize>,
}

impl StopPlan {
    /// Validates the given limits and divides them between `num_samplers`
    /// workers. The time budget starts now.
    pub(crate) fn new(
        duration: Option<Duration>,
        count: Option<usize>,
        memory_fraction: Option<f64>,
        size_mb: Option<f64>,
        num_samplers: NonZeroUsize,
    ) -> Result<Self> {
        let start = Instant::now();
        Ok(Self {
            time: duration
                .map(|duration| TimeElapsed::new(start, duration))
                .transpose()?,
            count: count
                .map(|count| CountReached::new(count).map(|count| count.divided(num_samplers)))
                .transpose()?,
            memory: memory_fraction.map(MemoryPressure::new).transpose()?,
            size: size_mb
                .map(|size_mb| OutputSize::new(size_mb).map(|size| size.divided(num_samplers)))
                .transpose()?,
        })
    }

    /// Creates a fresh set of conditions for one worker.
    pub(crate) fn instantiate<T: Serialize>(&self) -> ConditionSet<T> {
        let mut conditions = ConditionSet::new();
        if let Some(time) = self.time {
            conditions.push(time);
        }
        if let Some(count) = self.count {
            conditions.push(count);
        }
        if let Some(memory) = &self.memory {
            conditions.push(memory.clone());
        }
        if let Some(size) = &self.size {
            conditions.push(size.clone());
        }
        conditions
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    struct Never;

    impl StoppingCondition<u32> for Never {
        fn should_stop(&mut self, _progress: &Progress<'_, u32>) -> bool {
            false
        }

        fn reason(&self) -> StopReason {
            StopReason::Custom("never")
        }
    }

    struct Odd;

    impl StoppingCondition<u32> for Odd {
        fn should_stop(&mut self, progress: &Progress<'_, u32>) -> bool {
            progress.latest % 2 == 1
        }

        fn reason(&self) -> StopReason {
            StopReason::Custom("the sample is odd")
        }
    }

    fn progress(count: usize, latest: &u32) -> Progress<'_, u32> {
        Progress { count, latest }
    }

    #[test]
    fn test_empty_set_never_fires() {
        let mut conditions = ConditionSet::<u32>::new();
        assert!(conditions.is_empty());
        assert_eq!(conditions.evaluate(&progress(usize::MAX, &0)), None);
    }

    #[test]
    fn test_first_registered_condition_wins() {
        let mut conditions = ConditionSet::new();
        conditions.push(Never);
        conditions.push(Odd);
        conditions.push(CountReached::new(2).unwrap());
        assert_eq!(conditions.len(), 3);

        assert_eq!(conditions.evaluate(&progress(1, &0)), None);
        assert_eq!(
            conditions.evaluate(&progress(1, &1)),
            Some(StopReason::Custom("the sample is odd"))
        );
        assert_eq!(
            conditions.evaluate(&progress(2, &2)),
            Some(StopReason::CountReached)
        );
        // Both fire, the odd condition was registered first.
        assert_eq!(
            conditions.evaluate(&progress(2, &3)),
            Some(StopReason::Custom("the sample is odd"))
        );
    }

    #[test]
    fn test_time_reported_before_count() {
        let plan = StopPlan::new(
            Some(Duration::from_nanos(1)),
            Some(1),
            None,
            None,
            NonZeroUsize::MIN,
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(1));
        let mut conditions = plan.instantiate::<u32>();
        assert_eq!(
            conditions.evaluate(&progress(1, &0)),
            Some(StopReason::TimeElapsed)
        );
    }

    #[test]
    fn test_plan_validation() {
        let plan = |duration, count, memory, size| {
            StopPlan::new(duration, count, memory, size, NonZeroUsize::MIN)
        };
        assert!(matches!(
            plan(Some(Duration::ZERO), None, None, None),
            Err(Error::NonPositiveDuration)
        ));
        assert!(matches!(
            plan(None, Some(0), None, None),
            Err(Error::NonPositiveCount)
        ));
        assert!(matches!(
            plan(None, None, Some(80.0), None),
            Err(Error::MemoryFractionOutOfRange(_))
        ));
        assert!(matches!(
            plan(None, None, None, Some(-1.0)),
            Err(Error::NonPositiveSize(_))
        ));
        assert!(plan(None, None, None, None)
            .unwrap()
            .instantiate::<u32>()
            .is_empty());
        assert!(!plan(None, Some(10), None, None)
            .unwrap()
            .instantiate::<u32>()
            .is_empty());
    }

    #[test]
    fn test_plan_divides_count() {
        let num_samplers = NonZeroUsize::new(4).unwrap();
        let plan = StopPlan::new(None, Some(10), None, None, num_samplers).unwrap();
        let mut conditions = plan.instantiate::<u32>();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions.evaluate(&progress(2, &0)), None);
        assert_eq!(
            conditions.evaluate(&progress(3, &0)),
            Some(StopReason::CountReached)
        );
    }

    #[test]
    fn test_plan_instances_are_independent() {
        let plan = StopPlan::new(None, None, None, Some(0.0001), NonZeroUsize::MIN).unwrap();
        let mut first = plan.instantiate::<Vec<u8>>();
        let mut second = plan.instantiate::<Vec<u8>>();

        // Calibrating the first instance on large samples doesn't affect the
        // second one.
        let large = vec![0u8; 60];
        let progress = Progress {
            count: 2,
            latest: &large,
        };
        assert_eq!(first.evaluate(&progress), Some(StopReason::OutputSize));

        let small = vec![0u8; 1];
        let progress = Progress {
            count: 2,
            latest: &small,
        };
        assert_eq!(second.evaluate(&progress), None);
    }
}

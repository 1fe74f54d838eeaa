// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{Progress, StopReason, StoppingCondition};
use crate::error::{Error, Result};
use std::num::NonZeroUsize;

/// Stops once the given number of samples has been produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountReached {
    target: NonZeroUsize,
}

impl CountReached {
    /// Creates a condition firing after `target` samples.
    ///
    /// Fails if the target is zero.
    pub fn new(target: usize) -> Result<Self> {
        let target = NonZeroUsize::new(target).ok_or(Error::NonPositiveCount)?;
        Ok(Self { target })
    }

    /// Returns the share of this target that each of `parts` workers must
    /// reach, rounded up so that the workers never under-count in total.
    pub fn divided(self, parts: NonZeroUsize) -> Self {
        let share = self.target.get().div_ceil(parts.get());
        Self {
            // The share of a non-zero target is non-zero.
            target: NonZeroUsize::new(share).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Number of samples after which this condition fires.
    pub fn target(&self) -> usize {
        self.target.get()
    }
}

impl<T> StoppingCondition<T> for CountReached {
    fn should_stop(&mut self, progress: &Progress<'_, T>) -> bool {
        progress.count >= self.target.get()
    }

    fn reason(&self) -> StopReason {
        StopReason::CountReached
    }
}

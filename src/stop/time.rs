// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{Progress, StopReason, StoppingCondition};
use crate::error::{Error, Result};
use std::time::{Duration, Instant};

/// Stops once the given duration has elapsed since the start instant.
#[derive(Clone, Copy, Debug)]
pub struct TimeElapsed {
    start: Instant,
    duration: Duration,
}

impl TimeElapsed {
    /// Creates a condition firing `duration` after `start`.
    ///
    /// Fails if the duration is zero.
    pub fn new(start: Instant, duration: Duration) -> Result<Self> {
        if duration.is_zero() {
            return Err(Error::NonPositiveDuration);
        }
        Ok(Self { start, duration })
    }
}

impl<T> StoppingCondition<T> for TimeElapsed {
    fn should_stop(&mut self, _progress: &Progress<'_, T>) -> bool {
        self.start.elapsed() >= self.duration
    }

    fn reason(&self) -> StopReason {
        StopReason::TimeElapsed
    }
}

// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{Progress, StopReason, StoppingCondition};
use crate::error::{Error, Result};
use sysinfo::System;

/// Source of the host-wide memory usage.
pub trait MemoryProbe {
    /// Returns the fraction of the host memory currently in use, in `[0, 1]`.
    fn used_fraction(&mut self) -> f64;
}

/// Queries the memory usage of the host operating system.
pub struct SystemMemory {
    system: System,
}

impl SystemMemory {
    /// Creates a new probe.
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SystemMemory {
    /// Each clone refreshes its own view of the system.
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemory {
    fn used_fraction(&mut self) -> f64 {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return 0.0;
        }
        self.system.used_memory() as f64 / total as f64
    }
}

/// Stops once the host memory usage reaches the given fraction.
#[derive(Clone)]
pub struct MemoryPressure<P = SystemMemory> {
    threshold: f64,
    probe: P,
}

impl MemoryPressure {
    /// Creates a condition firing when the host memory usage reaches
    /// `threshold`, e.g. `0.8`.
    ///
    /// Fails if the threshold is outside of `[0, 1]`.
    pub fn new(threshold: f64) -> Result<Self> {
        Self::with_probe(threshold, SystemMemory::new())
    }
}

impl<P> MemoryPressure<P> {
    /// Creates a condition reading the memory usage from the given probe.
    pub fn with_probe(threshold: f64, probe: P) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::MemoryFractionOutOfRange(threshold));
        }
        Ok(Self { threshold, probe })
    }
}

impl<T, P: MemoryProbe> StoppingCondition<T> for MemoryPressure<P> {
    fn should_stop(&mut self, _progress: &Progress<'_, T>) -> bool {
        self.probe.used_fraction() >= self.threshold
    }

    fn reason(&self) -> StopReason {
        StopReason::MemoryPressure
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct FixedMemory(f64);

    impl MemoryProbe for FixedMemory {
        fn used_fraction(&mut self) -> f64 {
            self.0
        }
    }

    fn fires<P: MemoryProbe>(condition: &mut MemoryPressure<P>) -> bool {
        condition.should_stop(&Progress {
            count: 1,
            latest: &(),
        })
    }

    #[test]
    fn test_threshold_out_of_range() {
        for threshold in [-0.1, 1.5, 80.0, f64::NAN] {
            assert!(matches!(
                MemoryPressure::new(threshold),
                Err(Error::MemoryFractionOutOfRange(_))
            ));
        }
        assert!(MemoryPressure::new(0.0).is_ok());
        assert!(MemoryPressure::new(1.0).is_ok());
    }

    #[test]
    fn test_fires_at_threshold() {
        let mut below = MemoryPressure::with_probe(0.5, FixedMemory(0.4)).unwrap();
        assert!(!fires(&mut below));
        let mut at = MemoryPressure::with_probe(0.5, FixedMemory(0.5)).unwrap();
        assert!(fires(&mut at));
    }

    #[test]
    fn test_system_memory() {
        let fraction = SystemMemory::new().used_fraction();
        assert!((0.0..=1.0).contains(&fraction));

        let mut always = MemoryPressure::new(0.0).unwrap();
        assert!(fires(&mut always));
    }
}

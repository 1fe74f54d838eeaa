// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Results of sampling runs.

use crate::stop::StopReason;
use std::fmt;

/// A non-fatal observation made during a run.
///
/// Each advisory is also logged at the warn level when the `log` feature is
/// enabled, and is reported at most once per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advisory {
    /// No stopping condition was given, and the inputs may be infinite.
    UnknownFiniteness,
    /// The aggregation queue was full at least once: the fold function is
    /// slower than the sampling workers.
    QueueFull,
    /// The aggregating thread didn't respond within the liveness timeout.
    AggregatorSlow,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::UnknownFiniteness => f.write_str(
                "Could not determine whether the inputs are finite, the run may never stop",
            ),
            Advisory::QueueFull => f.write_str("The fold function cannot keep up with the samplers"),
            Advisory::AggregatorSlow => {
                f.write_str("The folding thread is taking longer than the liveness timeout")
            }
        }
    }
}

/// Samples collected by [`SampleUntil::sample()`](crate::SampleUntil::sample)
/// or [`SampleUntil::sample_inputs()`](crate::SampleUntil::sample_inputs).
#[derive(Debug)]
pub struct Sampled<T> {
    /// All the samples. Samples of the same worker are in production order,
    /// and workers are concatenated in index order.
    pub samples: Vec<T>,
    /// Why each worker stopped, indexed by worker.
    pub stop_reasons: Vec<StopReason>,
    /// Advisories raised during the run.
    pub advisories: Vec<Advisory>,
}

/// Accumulator folded by [`SampleUntil::fold()`](crate::SampleUntil::fold) or
/// [`SampleUntil::fold_inputs()`](crate::SampleUntil::fold_inputs).
#[derive(Debug)]
pub struct Folded<A> {
    /// The final accumulator.
    pub acc: A,
    /// Number of samples folded into the accumulator.
    pub count: usize,
    /// Why each sampling worker stopped, indexed by worker.
    pub stop_reasons: Vec<StopReason>,
    /// Advisories raised during the run.
    pub advisories: Vec<Advisory>,
}

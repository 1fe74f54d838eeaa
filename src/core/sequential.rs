// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sequential sampling of one input stream on the current thread.

use crate::stop::{ConditionSet, Progress, StopReason};
use std::ops::ControlFlow;

/// Destination of the samples produced by a worker.
pub trait Sink<T>: Sized {
    /// Accepts one sample, and hands the sink back.
    ///
    /// Returns [`ControlFlow::Break`] if the sink can't accept any more
    /// samples.
    fn push(self, sample: T) -> ControlFlow<Self, Self>;
}

impl<T> Sink<T> for Vec<T> {
    fn push(mut self, sample: T) -> ControlFlow<Self, Self> {
        Vec::push(&mut self, sample);
        ControlFlow::Continue(self)
    }
}

/// A sink folding samples into an accumulator.
pub struct FoldSink<A, C> {
    acc: A,
    combine: C,
}

impl<A, C> FoldSink<A, C> {
    /// Creates a sink folding with `combine`, starting from `initial`.
    pub fn new(initial: A, combine: C) -> Self {
        Self {
            acc: initial,
            combine,
        }
    }

    /// Returns the accumulator.
    pub fn into_inner(self) -> A {
        self.acc
    }
}

impl<T, A, C: Fn(A, T) -> A> Sink<T> for FoldSink<A, C> {
    fn push(self, sample: T) -> ControlFlow<Self, Self> {
        let acc = (self.combine)(self.acc, sample);
        ControlFlow::Continue(Self {
            acc,
            combine: self.combine,
        })
    }
}

/// Summary of a sequential run.
#[derive(Debug, PartialEq, Eq)]
pub struct Run {
    /// Number of samples produced.
    pub count: usize,
    /// Why the run stopped, or [`None`] if the sink stopped accepting samples.
    pub reason: Option<StopReason>,
}

/// Applies `f` to the inputs in order, pushing each sample into the sink until
/// a stopping condition fires or the inputs are exhausted. Returns the sink
/// along with a summary of the run.
///
/// The conditions are evaluated after each sample, so at least one sample is
/// produced if there is any input.
pub fn drive<I, T, F, S>(
    inputs: impl Iterator<Item = I>,
    f: &F,
    conditions: &mut ConditionSet<T>,
    mut sink: S,
) -> (S, Run)
where
    F: Fn(I) -> T + ?Sized,
    S: Sink<T>,
{
    let mut count = 0;
    for input in inputs {
        let sample = f(input);
        count += 1;
        let reason = conditions.evaluate(&Progress {
            count,
            latest: &sample,
        });
        sink = match sink.push(sample) {
            ControlFlow::Continue(sink) => sink,
            ControlFlow::Break(sink) => {
                return (
                    sink,
                    Run {
                        count,
                        reason: None,
                    },
                )
            }
        };
        if reason.is_some() {
            return (sink, Run { count, reason });
        }
    }
    (
        sink,
        Run {
            count,
            reason: Some(StopReason::InputExhausted),
        },
    )
}

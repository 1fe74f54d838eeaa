// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{Progress, StopReason, StoppingCondition};
use crate::error::{Error, Result};
use crate::macros::{log_debug, log_warn};
use serde::Serialize;
use std::num::NonZeroUsize;

/// Number of bytes in a megabyte.
const BYTES_PER_MB: f64 = 1_000_000.0;

/// Estimator of the serialized size of values.
pub trait SizeEstimator<T: ?Sized> {
    /// Returns the number of bytes that the given value occupies once
    /// serialized, or [`None`] if it can't be serialized.
    fn encoded_len(&self, value: &T) -> Option<u64>;
}

/// Measures values by their [`bincode`] encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeSize;

impl<T: Serialize + ?Sized> SizeEstimator<T> for BincodeSize {
    fn encoded_len(&self, value: &T) -> Option<u64> {
        bincode::serialized_size(value).ok()
    }
}

/// Stops once the collected samples are estimated to exceed a size limit.
///
/// The size of one sample is calibrated once, on the second sample: with a
/// length-prefixed encoding of the output sequence, appending the second
/// sample costs exactly its own encoded length. The estimate is then
/// extrapolated to all the samples. Samples that encode to zero bytes are
/// counted as one byte, so that the condition eventually fires.
#[derive(Clone, Debug)]
pub struct OutputSize<E = BincodeSize> {
    /// Limit in bytes.
    limit: f64,
    /// Calibrated size of one sample in bytes.
    estimate: Option<u64>,
    estimator: E,
}

impl OutputSize {
    /// Creates a condition firing once the output reaches `limit_mb`
    /// megabytes.
    ///
    /// Fails if the limit isn't positive.
    pub fn new(limit_mb: f64) -> Result<Self> {
        Self::with_estimator(limit_mb, BincodeSize)
    }
}

impl<E> OutputSize<E> {
    /// Creates a condition measuring samples with the given estimator.
    pub fn with_estimator(limit_mb: f64, estimator: E) -> Result<Self> {
        // Written to also reject NaN.
        if !(limit_mb > 0.0) {
            return Err(Error::NonPositiveSize(limit_mb));
        }
        Ok(Self {
            limit: limit_mb * BYTES_PER_MB,
            estimate: None,
            estimator,
        })
    }

    /// Returns the share of this limit allotted to each of `parts` workers.
    pub fn divided(self, parts: NonZeroUsize) -> Self {
        Self {
            limit: self.limit / parts.get() as f64,
            ..self
        }
    }

    /// Calibrated size of one sample in bytes, if known yet.
    pub fn estimate(&self) -> Option<u64> {
        self.estimate
    }
}

impl<T, E: SizeEstimator<T>> StoppingCondition<T> for OutputSize<E> {
    fn should_stop(&mut self, progress: &Progress<'_, T>) -> bool {
        let estimate = match self.estimate {
            Some(estimate) => estimate,
            // Not decidable before the second sample.
            None if progress.count < 2 => return false,
            None => match self.estimator.encoded_len(progress.latest) {
                Some(len) => {
                    let estimate = len.max(1);
                    log_debug!("Estimated the size of one sample to {estimate} bytes");
                    self.estimate = Some(estimate);
                    estimate
                }
                None => {
                    log_warn!("Failed to serialize a sample, its size cannot be estimated");
                    return false;
                }
            },
        };
        estimate as f64 * progress.count as f64 >= self.limit
    }

    fn reason(&self) -> StopReason {
        StopReason::OutputSize
    }
}

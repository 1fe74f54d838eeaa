// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Aggregation pipeline: sampling workers send batches of samples through a
//! bounded queue to a single thread that folds them.

use super::sequential::Sink;
use super::sync::OnceFlag;
use crate::error::{Error, Result};
use crate::macros::{log_debug, log_error, log_warn};
use crate::outcome::Advisory;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendError, Sender, TrySendError};
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::time::Duration;

/// Message sent from a sampling worker to the aggregator.
pub enum Message<T> {
    /// A batch of samples.
    Batch(Vec<T>),
    /// The sending worker won't send any more samples.
    Done,
}

/// Capacity of the queue fed by the given number of sampling workers.
pub fn queue_capacity(num_samplers: NonZeroUsize) -> usize {
    2 * num_samplers.get()
}

/// A sink batching samples and sending them to the aggregator.
///
/// Dropping the sink flushes the last partial batch and sends exactly one
/// [`Message::Done`], even if the worker is panicking.
pub struct BatchSink<'a, T> {
    /// Worker index.
    id: usize,
    batch: Vec<T>,
    batch_size: NonZeroUsize,
    sender: Sender<Message<T>>,
    /// Raised the first time any worker finds the queue full.
    backpressure: &'a OnceFlag,
    /// Whether the aggregator hung up.
    disconnected: bool,
}

impl<'a, T> BatchSink<'a, T> {
    /// Creates a sink sending batches of `batch_size` samples.
    pub fn new(
        id: usize,
        batch_size: NonZeroUsize,
        sender: Sender<Message<T>>,
        backpressure: &'a OnceFlag,
    ) -> Self {
        Self {
            id,
            batch: Vec::with_capacity(batch_size.get()),
            batch_size,
            sender,
            backpressure,
            disconnected: false,
        }
    }

    /// Sends a message, blocking while the queue is full.
    fn send(&mut self, message: Message<T>) -> ControlFlow<()> {
        if self.disconnected {
            return ControlFlow::Break(());
        }
        let result = match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                if self.backpressure.raise() {
                    log_warn!(
                        "The aggregation queue is full: the fold function cannot keep up with the samplers"
                    );
                }
                self.sender.send(message)
            }
            Err(TrySendError::Disconnected(message)) => Err(SendError(message)),
        };
        match result {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => {
                log_error!(
                    "[thread {}] The aggregator hung up, stopping this worker",
                    self.id
                );
                self.disconnected = true;
                ControlFlow::Break(())
            }
        }
    }

    /// Sends the pending samples, if any.
    fn flush(&mut self) -> ControlFlow<()> {
        if self.batch.is_empty() {
            return ControlFlow::Continue(());
        }
        let batch = std::mem::replace(
            &mut self.batch,
            Vec::with_capacity(self.batch_size.get()),
        );
        self.send(Message::Batch(batch))
    }
}

impl<T> Sink<T> for BatchSink<'_, T> {
    fn push(mut self, sample: T) -> ControlFlow<Self, Self> {
        Vec::push(&mut self.batch, sample);
        if self.batch.len() < self.batch_size.get() {
            return ControlFlow::Continue(self);
        }
        match self.flush() {
            ControlFlow::Continue(()) => ControlFlow::Continue(self),
            ControlFlow::Break(()) => ControlFlow::Break(self),
        }
    }
}

impl<T> Drop for BatchSink<'_, T> {
    fn drop(&mut self) {
        // A panicking worker may leave an inconsistent batch behind.
        if !std::thread::panicking() {
            let _ = self.flush();
        }
        log_debug!("[thread {}] Sending the done marker", self.id);
        let _ = self.send(Message::Done);
    }
}

/// Folds all the samples received on the queue, until every one of the
/// `num_samplers` workers has sent [`Message::Done`], then sends the
/// accumulator and the number of folded samples on `result`.
///
/// If the queue is disconnected early, nothing is sent.
pub fn aggregate<T, A>(
    receiver: Receiver<Message<T>>,
    combine: impl Fn(A, T) -> A,
    initial: A,
    num_samplers: usize,
    result: Sender<(A, usize)>,
) {
    let mut acc = initial;
    let mut count = 0;
    let mut finished_workers = 0;
    while finished_workers < num_samplers {
        match receiver.recv() {
            Ok(Message::Batch(batch)) => {
                for sample in batch {
                    acc = combine(acc, sample);
                    count += 1;
                }
            }
            Ok(Message::Done) => {
                finished_workers += 1;
                log_debug!(
                    "[aggregator] {finished_workers}/{num_samplers} workers are done, {count} samples folded"
                );
            }
            Err(_) => {
                log_error!("[aggregator] The queue was disconnected before all workers were done");
                return;
            }
        }
    }
    if result.send((acc, count)).is_err() {
        log_error!("[aggregator] Nobody is waiting for the folded result");
    }
}

/// Waits until the aggregator sends its result.
///
/// Each wait lasts at most `timeout`. On the first timeout, an
/// [`Advisory::AggregatorSlow`] is recorded and the wait goes on. If the
/// aggregator hung up without a result, this fails with
/// [`Error::FoldingCrashed`].
pub fn await_result<R>(
    result: &Receiver<R>,
    timeout: Duration,
    advisories: &mut Vec<Advisory>,
) -> Result<R> {
    loop {
        match result.recv_timeout(timeout) {
            Ok(result) => return Ok(result),
            Err(RecvTimeoutError::Timeout) => {
                if !advisories.contains(&Advisory::AggregatorSlow) {
                    log_warn!(
                        "The folding thread didn't respond within {timeout:?}, still waiting for it"
                    );
                    advisories.push(Advisory::AggregatorSlow);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                log_error!("The folding thread terminated without a result");
                return Err(Error::FoldingCrashed);
            }
        }
    }
}

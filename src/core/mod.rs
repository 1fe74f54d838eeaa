// Copyright 2024-2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Core engine: sequential sampling, worker pool, aggregation pipeline and
//! synchronization primitives.

mod aggregate;
mod pool;
mod sequential;
mod sync;

pub use aggregate::{aggregate, await_result, queue_capacity, BatchSink};
pub use pool::{interleave, WorkerPool};
pub use sequential::{drive, FoldSink, Run};
pub use sync::OnceFlag;

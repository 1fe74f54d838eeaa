// Copyright 2024-2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![doc = include_str!("../README.md")]
#![forbid(missing_docs, unsafe_code)]

mod config;
mod core;
mod error;
mod input;
mod macros;
mod outcome;
mod sampler;
pub mod stop;

pub use config::{CpuPinningPolicy, WorkerCount};
pub use error::{Error, Result};
pub use outcome::{Advisory, Folded, Sampled};
pub use sampler::{sample_until_time_elapsed, SampleUntil};
pub use stop::StopReason;

// Copyright 2024-2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Synchronization primitives

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, Ordering};

/// A flag shared between threads, that reports only its first raise.
pub struct OnceFlag {
    raised: CachePadded<AtomicBool>,
}

impl OnceFlag {
    /// Creates a lowered flag.
    pub fn new() -> Self {
        Self {
            raised: CachePadded::new(AtomicBool::new(false)),
        }
    }

    /// Raises the flag. Returns true if this call is the first one to raise
    /// it.
    pub fn raise(&self) -> bool {
        !self.raised.swap(true, Ordering::Relaxed)
    }

    /// Returns whether the flag was raised.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }
}

// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Finiteness of input streams, as far as it can be decided up front.

/// Whether an input stream ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Finiteness {
    /// The stream has an upper bound on its length.
    Finite,
    /// The stream reports itself as endless, like [`std::iter::repeat()`] or
    /// an unbounded range.
    Infinite,
    /// The stream doesn't say.
    Unknown,
}

/// Classifies an input stream from its [`Iterator::size_hint()`].
pub(crate) fn classify(inputs: &impl Iterator) -> Finiteness {
    match inputs.size_hint() {
        (_, Some(_)) => Finiteness::Finite,
        (usize::MAX, None) => Finiteness::Infinite,
        (_, None) => Finiteness::Unknown,
    }
}

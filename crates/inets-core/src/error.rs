//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Error values returned by the runtime.
//!
//! Plain enum with hand-written `Display`/`std::error::Error` impls, rather
//! than a `thiserror` derive: the runtime only has a handful of fatal,
//! non-recoverable conditions and the variants carry diagnostic context that
//! reads better spelled out than generated.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A worker's band has no room left for a block of `requested` cells.
    HeapExhausted {
        worker: usize,
        requested: u32,
        band_remaining: u32,
    },
    /// The caller supplied a program table that violates the runtime's contract
    /// (an out-of-range function id, or an arity table shorter than referenced).
    MalformedProgram { function_id: u32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HeapExhausted {
                worker,
                requested,
                band_remaining,
            } => write!(
                f,
                "worker {worker} band exhausted: requested {requested} cells, {band_remaining} remaining"
            ),
            Error::MalformedProgram { function_id } => {
                write!(f, "program table has no rule for function id {function_id}")
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

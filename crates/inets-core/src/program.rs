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

//! The program-table contract: the fixed interface a code generator is
//! expected to hand the runtime. Building that generator (turning source
//! text into an arity table, a name table, and rewrite rules) is out of
//! scope here; this module only defines the contract those tables satisfy.

use crate::cell::{Cell, Loc};
use crate::heap::WorkerHeap;
use crate::link::link;

/// Mutable context passed to a rule body while it materializes a
/// right-hand-side graph.
pub struct RuleCtx<'a> {
    pub heap: &'a mut WorkerHeap,
    pub cost: &'a mut u64,
}

impl<'a> RuleCtx<'a> {
    /// Allocates a block of `size` cells in the calling worker's band.
    pub fn alloc(&mut self, size: u32) -> Loc {
        self.heap.alloc(size)
    }

    /// Writes `cell` at `loc`, repairing a binder back-edge if needed.
    pub fn link(&mut self, loc: Loc, cell: Cell) {
        link(self.heap, loc, cell);
    }

    /// Allocates a fresh DUP label, for implicit `cpy` nodes a rule body
    /// inserts when a right-hand-side variable is used more than once.
    pub fn fresh_label(&mut self) -> u32 {
        self.heap.fresh_label()
    }
}

/// The table + rewrite-rule contract a program supplies to the runtime.
///
/// Implementations are produced by a separate code generator (not part of
/// this crate); `inets-cli`'s `sample` module hand-writes one as a stand-in.
pub trait Rules: Send + Sync {
    /// Number of distinct function/constructor ids this program defines, for
    /// the one-time validation `Runtime::new` performs. `0` (the default)
    /// opts out of validation for programs that don't track this.
    fn function_count(&self) -> u32 {
        0
    }

    /// Number of argument cells a CTR/FUN node of this id carries.
    fn arity(&self, fid: u32) -> u32;

    /// A human-readable name for readback, if the program supplies one.
    fn name(&self, _fid: u32) -> Option<&str> {
        None
    }

    /// Argument indices that must be forced to WHNF before `try_rewrite` is
    /// attempted. An empty slice means every rule for this function matches
    /// on shape alone (e.g. arity).
    fn strict_args(&self, fid: u32) -> &[u32];

    /// Attempts to fire a rule for function `fid`. `args` holds one cell per
    /// argument slot, already forced to WHNF for every index named by
    /// `strict_args`. Returns the new cell to place at `host` on a match, or
    /// `None` if no rule applies (the FUN node is then left as WHNF).
    fn try_rewrite(&self, ctx: &mut RuleCtx, fid: u32, host: Loc, args: &[Cell]) -> Option<Cell>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A `Rules` implementation with no functions at all, for tests of
    /// modules that only need *some* `&dyn Rules` to satisfy a signature.
    pub(crate) struct EmptyRules;

    impl Rules for EmptyRules {
        fn arity(&self, _fid: u32) -> u32 {
            0
        }
        fn strict_args(&self, _fid: u32) -> &[u32] {
            &[]
        }
        fn try_rewrite(&self, _ctx: &mut RuleCtx, _fid: u32, _host: Loc, _args: &[Cell]) -> Option<Cell> {
            None
        }
    }
}

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

//! The parallel normalizer: walks every redex reachable from a root,
//! reducing each to WHNF and forking into the worker pool wherever a node
//! has two independent children and the calling slice has room to split.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::cell::{Cell, Loc, Tag};
use crate::heap::WorkerHeap;
use crate::program::Rules;
use crate::reduce::reduce;
use crate::workers::{PoolShared, WorkPacket};

/// A shared, heap-sized bit-set recording which locations a normalizer pass
/// has already visited, so two workers racing down shared structure don't
/// duplicate work.
pub struct Visited {
    bits: Vec<AtomicU64>,
}

impl Visited {
    pub fn new(len: usize) -> Visited {
        let words = len.div_ceil(64);
        let mut bits = Vec::with_capacity(words);
        bits.resize_with(words, || AtomicU64::new(0));
        Visited { bits }
    }

    /// Marks `loc` visited. Returns `true` the first time it is called for
    /// that location, `false` on every subsequent call.
    pub fn mark(&self, loc: Loc) -> bool {
        let idx = loc as usize / 64;
        let bit = 1u64 << (loc as usize % 64);
        let prev = self.bits[idx].fetch_or(bit, Ordering::AcqRel);
        prev & bit == 0
    }

    pub fn clear_all(&self) {
        for word in &self.bits {
            word.store(0, Ordering::Relaxed);
        }
    }
}

/// The heap locations a WHNF term still needs normalized inside it.
fn children(rules: &dyn Rules, term: Cell) -> Vec<Loc> {
    match term.tag() {
        Tag::Lam => vec![term.loc(1)],
        Tag::App | Tag::Sup | Tag::Op2 => vec![term.loc(0), term.loc(1)],
        Tag::Dp0 | Tag::Dp1 => vec![term.loc(2)],
        Tag::Ctr | Tag::Fun => {
            let arity = rules.arity(term.ext());
            (0..arity).map(|i| term.loc(i)).collect()
        }
        _ => Vec::new(),
    }
}

/// Reduces `host` to WHNF and recursively normalizes every child, forking
/// across the `sidx..sidx+slen` slice of the worker pool where there is a
/// two-way split and room to use more than one worker on it.
pub fn normal_go(
    heap: &mut WorkerHeap,
    rules: &dyn Rules,
    pool: &PoolShared,
    host: Loc,
    sidx: u32,
    slen: u32,
    cost: &mut u64,
    visited: &Visited,
) {
    if !visited.mark(host) {
        return;
    }
    let term = reduce(heap, rules, host, slen, cost);
    let kids = children(rules, term);
    match kids.len() {
        0 => {}
        2 if slen >= 2 => {
            let half = slen / 2;
            let packet = WorkPacket {
                host: kids[1],
                sidx: sidx + half,
                slen: slen - half,
            };
            let target = (sidx + half) as usize;
            debug!(worker = heap.worker_id, target, host = kids[1], "fork");
            // Post the second half to a sibling worker without waiting, so
            // it runs concurrently with the first half below, then join.
            pool.fork(target, packet);
            normal_go(heap, rules, pool, kids[0], sidx, half.max(1), cost, visited);
            let delta = pool.join(target);
            debug!(worker = heap.worker_id, target, delta, "join");
            *cost += delta;
        }
        _ => {
            for k in kids {
                normal_go(heap, rules, pool, k, sidx, slen, cost, visited);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visited_mark_is_once_only() {
        let v = Visited::new(200);
        assert!(v.mark(5));
        assert!(!v.mark(5));
        assert!(v.mark(6));
    }

    #[test]
    fn clear_all_resets_marks() {
        let v = Visited::new(200);
        v.mark(5);
        v.clear_all();
        assert!(v.mark(5));
    }
}

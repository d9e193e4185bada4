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

//! Structural, incremental collection of a discarded subterm.
//!
//! There is no tracing collector: whenever a term becomes unreachable (an
//! `ERA` lands on it, or a node it was part of is rewritten away) its cells
//! are walked once, recursively, and returned to the allocator's free lists.

use crate::cell::{Cell, Tag};
use crate::heap::WorkerHeap;
use crate::program::Rules;

/// Recursively frees `term` and everything it (transitively) owns.
pub fn collect(heap: &mut WorkerHeap, rules: &dyn Rules, term: Cell) {
    match term.tag() {
        // A discarded variable occurrence: erase the opposite binder slot
        // so the sibling side of a DUP can tell its other half is gone.
        Tag::Dp0 => heap.set(term.loc(1), Cell::era()),
        Tag::Dp1 => heap.set(term.loc(0), Cell::era()),
        Tag::Var => heap.set(term.loc(0), Cell::era()),

        Tag::Lam => {
            let binder = heap.get(term.loc(0));
            if binder.tag() != Tag::Era {
                heap.set(term.loc(0), Cell::era());
            }
            let body = heap.get(term.loc(1));
            collect(heap, rules, body);
            heap.clear(term.val(), 2);
        }

        Tag::App | Tag::Sup | Tag::Op2 => {
            let a = heap.get(term.loc(0));
            let b = heap.get(term.loc(1));
            collect(heap, rules, a);
            collect(heap, rules, b);
            heap.clear(term.val(), 2);
        }

        Tag::Ctr | Tag::Fun => {
            let arity = rules.arity(term.ext());
            for i in 0..arity {
                let arg = heap.get(term.loc(i));
                collect(heap, rules, arg);
            }
            heap.clear(term.val(), arity);
        }

        Tag::Num | Tag::Era | Tag::Nil | Tag::Arg | Tag::Flo => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapCells;
    use crate::program::tests::EmptyRules;

    #[test]
    fn collecting_app_frees_both_children_and_node() {
        let cells = HeapCells::new(1, 16);
        let mut heap = WorkerHeap::new(cells, 0);
        let app = heap.alloc(2);
        heap.set(app, Cell::num(1));
        heap.set(app + 1, Cell::num(2));
        collect(&mut heap, &EmptyRules, Cell::app(app));
        // The 2-cell block is back on the free list.
        let reused = heap.alloc(2);
        assert_eq!(reused, app);
    }

    #[test]
    fn collecting_num_is_a_no_op() {
        let cells = HeapCells::new(1, 16);
        let mut heap = WorkerHeap::new(cells, 0);
        collect(&mut heap, &EmptyRules, Cell::num(7));
        assert_eq!(heap.band_used(), 0);
    }

    #[test]
    fn collecting_dp0_erases_opposite_slot_only() {
        let cells = HeapCells::new(1, 16);
        let mut heap = WorkerHeap::new(cells, 0);
        let dup = heap.alloc(3);
        heap.set(dup, Cell::arg(100));
        heap.set(dup + 1, Cell::arg(101));
        heap.set(dup + 2, Cell::num(9));
        collect(&mut heap, &EmptyRules, Cell::dp0(0, dup));
        assert_eq!(heap.get(dup + 1), Cell::era());
        assert_eq!(heap.get(dup), Cell::arg(100));
    }
}

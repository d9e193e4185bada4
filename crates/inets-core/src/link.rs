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

//! Binder/variable back-edge maintenance.
//!
//! A binder slot (a LAM's slot 0, or a DUP node's slot 0/1) holds an `ARG`
//! cell pointing at the location of its use site. Writing any variable-like
//! cell (`Var`/`Dp0`/`Dp1`) into the heap must repair that back-edge so the
//! binder always points at wherever the variable now actually lives.

use crate::cell::{Cell, Loc, Tag};
use crate::collect::collect;
use crate::heap::WorkerHeap;
use crate::program::Rules;

/// Writes `cell` at `loc`, repairing the binder back-edge if `cell` is
/// variable-like.
pub fn link(heap: &WorkerHeap, loc: Loc, cell: Cell) {
    heap.set(loc, cell);
    if cell.is_var_like() {
        let arg = Cell::arg(loc);
        let binder_slot = match cell.tag() {
            Tag::Dp0 => cell.loc(0),
            Tag::Dp1 => cell.loc(1),
            Tag::Var => cell.loc(0),
            _ => unreachable!("is_var_like implies Dp0, Dp1, or Var"),
        };
        heap.set(binder_slot, arg);
    }
}

/// Substitutes `val` into whatever `lnk` (a cell freshly read out of a
/// binder slot) describes: an `ARG` means the variable is still live and
/// `val` is linked into its use site; an `ERA` means the binder was already
/// discarded, so `val` is collected instead.
pub fn subst(heap: &mut WorkerHeap, rules: &dyn Rules, lnk: Cell, val: Cell) {
    if lnk.tag() == Tag::Era {
        collect(heap, rules, val);
    } else {
        debug_assert_eq!(lnk.tag(), Tag::Arg);
        link(heap, lnk.val(), val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapCells;
    use crate::program::tests::EmptyRules;

    #[test]
    fn link_repairs_binder_back_edge() {
        let cells = HeapCells::new(1, 16);
        let heap = WorkerHeap::new(cells, 0);
        // A LAM whose binder slot is empty; its use site is location 8.
        link(&heap, 8, Cell::var(0));
        assert_eq!(heap.get(0), Cell::arg(8));
    }

    #[test]
    fn subst_into_arg_links_value() {
        let cells = HeapCells::new(1, 16);
        let mut heap = WorkerHeap::new(cells, 0);
        subst(&mut heap, &EmptyRules, Cell::arg(5), Cell::num(42));
        assert_eq!(heap.get(5), Cell::num(42));
    }

    #[test]
    fn subst_into_era_collects_value_without_touching_heap() {
        let cells = HeapCells::new(1, 16);
        let mut heap = WorkerHeap::new(cells, 0);
        subst(&mut heap, &EmptyRules, Cell::era(), Cell::num(42));
        assert_eq!(heap.band_used(), 0);
    }
}

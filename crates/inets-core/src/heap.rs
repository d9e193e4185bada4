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

//! Per-worker banded heap allocator.
//!
//! The cell arena and the DUP lock table are shared across all workers
//! behind an `Arc`; everything else (bump pointer, free lists, the DUP
//! label generator) is private to one worker's band and is never touched
//! by another thread, so it needs no synchronization at all.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::cell::{Cell, Loc};
use crate::error::Error;

/// Largest node size kept on a free list. Blocks bigger than this (wide
/// constructors) are simply never recycled.
pub const MAX_ARITY: usize = 16;

/// Per-worker stride for the DUP label generator's disjoint ranges.
const LABEL_STRIDE: u32 = 1 << 16;

/// The cell arena and per-location DUP lock bytes, shared by every worker.
pub struct HeapCells {
    cells: Vec<AtomicU64>,
    locks: Vec<AtomicU8>,
    band_size: u32,
}

impl HeapCells {
    /// Allocates `num_workers` bands of `band_size` cells each.
    pub fn new(num_workers: usize, band_size: u32) -> Arc<HeapCells> {
        let total = num_workers as u64 * band_size as u64;
        let total = usize::try_from(total).expect("heap size overflows usize");
        let mut cells = Vec::with_capacity(total);
        cells.resize_with(total, || AtomicU64::new(0));
        let mut locks = Vec::with_capacity(total);
        locks.resize_with(total, || AtomicU8::new(0));
        Arc::new(HeapCells {
            cells,
            locks,
            band_size,
        })
    }

    #[inline]
    pub fn get(&self, loc: Loc) -> Cell {
        Cell(self.cells[loc as usize].load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, loc: Loc, cell: Cell) {
        self.cells[loc as usize].store(cell.0, Ordering::Release);
    }

    /// Attempts to acquire the DUP lock at `loc`. The only node type that
    /// needs one: every other rewrite is confined to the worker that is
    /// already descending through it.
    #[inline]
    pub fn try_lock(&self, loc: Loc) -> bool {
        self.locks[loc as usize]
            .compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    pub fn unlock(&self, loc: Loc) {
        self.locks[loc as usize].store(0, Ordering::Release);
    }
}

/// One worker's exclusive view into its band: a bump pointer, size-indexed
/// free lists, and a disjoint range of DUP labels.
pub struct WorkerHeap {
    pub worker_id: usize,
    cells: Arc<HeapCells>,
    band_start: Loc,
    band_size: u32,
    next: u32,
    free_lists: Vec<Vec<Loc>>,
    next_label: u32,
    /// Total cells bumped from the band (excludes free-list reuse); used for
    /// heap-accounting tests and the `size` field of a normalize report.
    pub bump_count: u64,
}

impl WorkerHeap {
    pub fn new(cells: Arc<HeapCells>, worker_id: usize) -> Self {
        let band_size = cells.band_size;
        WorkerHeap {
            worker_id,
            band_start: worker_id as u32 * band_size,
            band_size,
            next: 0,
            free_lists: vec![Vec::new(); MAX_ARITY + 1],
            next_label: worker_id as u32 * LABEL_STRIDE,
            bump_count: 0,
            cells,
        }
    }

    #[inline]
    pub fn get(&self, loc: Loc) -> Cell {
        self.cells.get(loc)
    }

    #[inline]
    pub fn set(&self, loc: Loc, cell: Cell) {
        self.cells.set(loc, cell);
    }

    #[inline]
    pub fn try_lock(&self, loc: Loc) -> bool {
        self.cells.try_lock(loc)
    }

    #[inline]
    pub fn unlock(&self, loc: Loc) {
        self.cells.unlock(loc);
    }

    /// Allocates a contiguous block of `size` cells, reusing a free-list
    /// entry of the same size if one is available.
    ///
    /// Panics if the band has no room left: a rewrite rule can be partway
    /// through materializing a right-hand side graph when this happens, and
    /// there is no sensible state to unwind to, so the failure is fatal.
    pub fn alloc(&mut self, size: u32) -> Loc {
        if size == 0 {
            return 0;
        }
        let idx = size as usize;
        if idx < self.free_lists.len() {
            if let Some(loc) = self.free_lists[idx].pop() {
                return loc;
            }
        }
        if self.next + size > self.band_size {
            let err = Error::HeapExhausted {
                worker: self.worker_id,
                requested: size,
                band_remaining: self.band_size - self.next,
            };
            panic!("{err}");
        }
        let loc = self.band_start + self.next;
        self.next += size;
        self.bump_count += size as u64;
        loc
    }

    /// Returns a block of `size` cells to the free list. Blocks larger than
    /// [`MAX_ARITY`] are dropped rather than tracked.
    pub fn clear(&mut self, loc: Loc, size: u32) {
        if size == 0 {
            return;
        }
        let idx = size as usize;
        if idx >= self.free_lists.len() {
            return;
        }
        self.free_lists[idx].push(loc);
    }

    /// Allocates a fresh DUP label from this worker's disjoint range.
    pub fn fresh_label(&mut self) -> u32 {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    /// Cells bumped from the band so far (live + freed-but-recycled).
    pub fn band_used(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_allocates_disjoint_blocks() {
        let cells = HeapCells::new(1, 64);
        let mut heap = WorkerHeap::new(cells, 0);
        let a = heap.alloc(2);
        let b = heap.alloc(3);
        assert_eq!(a, 0);
        assert_eq!(b, 2);
        assert_eq!(heap.band_used(), 5);
    }

    #[test]
    fn free_list_recycles_same_size_block() {
        let cells = HeapCells::new(1, 64);
        let mut heap = WorkerHeap::new(cells, 0);
        let a = heap.alloc(3);
        heap.clear(a, 3);
        let b = heap.alloc(3);
        assert_eq!(a, b);
        assert_eq!(heap.band_used(), 3);
    }

    #[test]
    #[should_panic(expected = "band exhausted")]
    fn alloc_past_band_size_panics() {
        let cells = HeapCells::new(1, 4);
        let mut heap = WorkerHeap::new(cells, 0);
        heap.alloc(5);
    }

    #[test]
    fn workers_own_disjoint_bands_and_label_ranges() {
        let cells = HeapCells::new(2, 64);
        let mut w0 = WorkerHeap::new(cells.clone(), 0);
        let mut w1 = WorkerHeap::new(cells, 1);
        assert_eq!(w0.alloc(1), 0);
        assert_eq!(w1.alloc(1), 64);
        assert_ne!(w0.fresh_label(), w1.fresh_label());
    }

    #[test]
    fn dup_lock_is_exclusive() {
        let cells = HeapCells::new(1, 64);
        assert!(cells.try_lock(10));
        assert!(!cells.try_lock(10));
        cells.unlock(10);
        assert!(cells.try_lock(10));
    }
}

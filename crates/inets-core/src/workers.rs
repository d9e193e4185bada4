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

//! Worker pool: one OS thread per band, coordinated by a `Mutex`+`Condvar`
//! pair per worker carrying a single packed work packet at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::cell::Loc;
use crate::heap::HeapCells;
use crate::normal::{normal_go, Visited};
use crate::program::Rules;

/// A unit of normalizer work: the root to descend into and this call's
/// slice of the worker pool (`sidx..sidx+slen`).
#[derive(Debug, Clone, Copy)]
pub struct WorkPacket {
    pub host: Loc,
    pub sidx: u32,
    pub slen: u32,
}

enum Msg {
    Work(WorkPacket),
    Stop,
}

struct Slot {
    msg: Option<Msg>,
    done: bool,
    cost: u64,
}

struct WorkerSlot {
    slot: Mutex<Slot>,
    has_work: Condvar,
    has_result: Condvar,
}

/// The coordination primitive shared by every worker thread, including the
/// threads themselves (so a worker can dispatch a sub-call to a sibling).
pub struct PoolShared {
    slots: Vec<WorkerSlot>,
}

impl PoolShared {
    fn new(num_workers: usize) -> PoolShared {
        let mut slots = Vec::with_capacity(num_workers);
        slots.resize_with(num_workers, || WorkerSlot {
            slot: Mutex::new(Slot {
                msg: None,
                done: true,
                cost: 0,
            }),
            has_work: Condvar::new(),
            has_result: Condvar::new(),
        });
        PoolShared { slots }
    }

    /// Hands `packet` to `worker` and returns immediately, without waiting
    /// for a result. The caller is free to do its own work before `join`ing.
    pub fn fork(&self, worker: usize, packet: WorkPacket) {
        let mut slot = self.slots[worker].slot.lock().unwrap();
        slot.msg = Some(Msg::Work(packet));
        slot.done = false;
        self.slots[worker].has_work.notify_one();
    }

    /// Blocks until `worker` reports a result for its most recent `fork`,
    /// returning the rewrite cost that sub-call accumulated.
    pub fn join(&self, worker: usize) -> u64 {
        let mut slot = self.slots[worker].slot.lock().unwrap();
        while !slot.done {
            slot = self.slots[worker].has_result.wait(slot).unwrap();
        }
        slot.cost
    }

    /// `fork` immediately followed by `join`; for callers with no local work
    /// to overlap with the forked call.
    pub fn fork_and_join(&self, worker: usize, packet: WorkPacket) -> u64 {
        self.fork(worker, packet);
        self.join(worker)
    }

    fn wait_for_work(&self, id: usize) -> Msg {
        let mut slot = self.slots[id].slot.lock().unwrap();
        loop {
            if let Some(msg) = slot.msg.take() {
                return msg;
            }
            slot = self.slots[id].has_work.wait(slot).unwrap();
        }
    }

    fn complete(&self, id: usize, cost: u64) {
        let mut slot = self.slots[id].slot.lock().unwrap();
        slot.cost = cost;
        slot.done = true;
        self.slots[id].has_result.notify_one();
    }

    fn stop(&self, id: usize) {
        let mut slot = self.slots[id].slot.lock().unwrap();
        slot.msg = Some(Msg::Stop);
        self.slots[id].has_work.notify_one();
    }
}

/// A fixed-size pool of band-owning worker threads.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
    total_bumped: Arc<AtomicU64>,
}

impl WorkerPool {
    pub fn spawn(
        cells: Arc<HeapCells>,
        rules: Arc<dyn Rules>,
        visited: Arc<Visited>,
        num_workers: usize,
    ) -> WorkerPool {
        let shared = Arc::new(PoolShared::new(num_workers));
        let total_bumped = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::with_capacity(num_workers);
        for id in 0..num_workers {
            let shared = shared.clone();
            let cells = cells.clone();
            let rules = rules.clone();
            let visited = visited.clone();
            let total_bumped = total_bumped.clone();
            handles.push(thread::spawn(move || {
                worker_loop(id, shared, cells, rules, visited, total_bumped)
            }));
        }
        WorkerPool {
            shared,
            handles,
            total_bumped,
        }
    }

    pub fn fork_and_join(&self, worker: usize, packet: WorkPacket) -> u64 {
        self.shared.fork_and_join(worker, packet)
    }

    /// Sum of cells bumped across every worker's band since the pool started.
    pub fn total_bumped(&self) -> u64 {
        self.total_bumped.load(Ordering::Relaxed)
    }

    pub fn shutdown(mut self) {
        for id in 0..self.handles.len() {
            self.shared.stop(id);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    id: usize,
    shared: Arc<PoolShared>,
    cells: Arc<HeapCells>,
    rules: Arc<dyn Rules>,
    visited: Arc<Visited>,
    total_bumped: Arc<AtomicU64>,
) {
    let mut heap = crate::heap::WorkerHeap::new(cells, id);
    let mut prev_bumped = 0u64;
    loop {
        match shared.wait_for_work(id) {
            Msg::Stop => break,
            Msg::Work(packet) => {
                let mut cost = 0u64;
                normal_go(
                    &mut heap,
                    rules.as_ref(),
                    &shared,
                    packet.host,
                    packet.sidx,
                    packet.slen,
                    &mut cost,
                    &visited,
                );
                total_bumped.fetch_add(heap.bump_count - prev_bumped, Ordering::Relaxed);
                prev_bumped = heap.bump_count;
                shared.complete(id, cost);
            }
        }
    }
}

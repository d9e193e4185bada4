//! A parallel interaction-net graph-reduction runtime.
//!
//! Build a term graph into a [`Runtime`]'s `builder` heap, then call
//! [`Runtime::normalize`] to drive it to normal form across a worker pool.
//! Turning source text into that initial graph, and into the [`Rules`]
//! table a [`Runtime`] consumes, is somebody else's job — this crate only
//! implements the fixed contract in between.

pub mod cell;
pub mod collect;
pub mod error;
pub mod heap;
pub mod link;
pub mod normal;
pub mod program;
pub mod readback;
pub mod reduce;
pub mod stack;
pub mod workers;

pub use cell::{Cell, Loc, Op, Tag};
pub use error::{Error, Result};
pub use program::{RuleCtx, Rules};

use std::sync::Arc;

use heap::{HeapCells, WorkerHeap};
use normal::Visited;
use workers::{WorkPacket, WorkerPool};

/// Tunables for a [`Runtime`]: worker count and per-worker band size.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    pub workers: usize,
    pub band_size: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            workers: 4,
            band_size: 1 << 20,
        }
    }
}

/// Cost and size accounting for one [`Runtime::normalize`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeReport {
    /// Total interaction rules fired.
    pub cost: u64,
    /// Total cells bumped from every band, including the construction band.
    pub size: u64,
}

/// A graph-reduction runtime: a shared heap, a program's rule table, and
/// the worker pool that drives normalization.
pub struct Runtime {
    cells: Arc<HeapCells>,
    rules: Arc<dyn Rules>,
    visited: Arc<Visited>,
    builder: WorkerHeap,
    config: RuntimeConfig,
}

impl Runtime {
    /// Validates `rules` against its own declared function count (if any),
    /// then allocates a heap with one extra band reserved for graph
    /// construction ahead of the `config.workers` normalizer bands.
    pub fn new(rules: Arc<dyn Rules>, config: RuntimeConfig) -> Result<Runtime> {
        assert!(config.workers >= 1, "a runtime needs at least one worker");
        for fid in 0..rules.function_count() {
            let arity = rules.arity(fid);
            for &i in rules.strict_args(fid) {
                if i >= arity {
                    return Err(Error::MalformedProgram { function_id: fid });
                }
            }
        }

        let total_bands = config.workers + 1;
        let cells = HeapCells::new(total_bands, config.band_size);
        let builder = WorkerHeap::new(cells.clone(), config.workers);
        let heap_len = total_bands * config.band_size as usize;
        let visited = Arc::new(Visited::new(heap_len));

        Ok(Runtime {
            cells,
            rules,
            visited,
            builder,
            config,
        })
    }

    /// The heap used to construct an initial term graph before normalizing.
    /// Lives in a band the worker pool never touches.
    pub fn builder(&mut self) -> &mut WorkerHeap {
        &mut self.builder
    }

    pub fn rules(&self) -> &dyn Rules {
        self.rules.as_ref()
    }

    /// Serializes the (ideally already-normalized) term at `host` to text.
    pub fn read_back(&self, host: Loc) -> String {
        readback::read_back(&self.cells, self.rules.as_ref(), host)
    }

    /// Drives the term at `host` to normal form, spawning a fresh worker
    /// pool and repeating full passes until a pass fires zero rules.
    pub fn normalize(&mut self, host: Loc) -> NormalizeReport {
        let pool = WorkerPool::spawn(
            self.cells.clone(),
            self.rules.clone(),
            self.visited.clone(),
            self.config.workers,
        );

        let mut total_cost = 0u64;
        loop {
            self.visited.clear_all();
            let packet = WorkPacket {
                host,
                sidx: 0,
                slen: self.config.workers as u32,
            };
            let delta = pool.fork_and_join(0, packet);
            total_cost += delta;
            if delta == 0 {
                break;
            }
        }

        let size = self.builder.band_used() as u64 + pool.total_bumped();
        pool.shutdown();
        NormalizeReport {
            cost: total_cost,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::link::link;
    use crate::program::tests::EmptyRules;

    /// `(\x.x) 5` normalizes to `5` in a single pass, start to finish
    /// through the public `Runtime` facade.
    #[test]
    fn identity_application_through_runtime() {
        let mut rt = Runtime::new(Arc::new(EmptyRules), RuntimeConfig {
            workers: 2,
            band_size: 256,
        })
        .unwrap();

        let app = {
            let heap = rt.builder();
            let lam = heap.alloc(2);
            // The body is just the bound variable; `link` repairs the
            // binder slot's back-edge automatically.
            link(heap, lam + 1, Cell::var(lam));
            let app = heap.alloc(2);
            link(heap, app, Cell::lam(lam));
            link(heap, app + 1, Cell::num(9));
            app
        };

        let report = rt.normalize(app);
        assert_eq!(report.cost, 1);
        assert_eq!(rt.read_back(app), "9");
    }
}

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

//! Reduction throughput benchmarks: a `gen_tree`/`sum_tree` program run at a
//! handful of depths, across a handful of worker-pool sizes.
//!
//! Each bench builds a fresh [`Runtime`] and a fresh term graph per
//! iteration, since `normalize` consumes the worker pool's `Visited`
//! bitset state and a pre-normalized term costs nothing to re-normalize.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode};
use std::time::Duration;

use inets_core::cell::{Cell, Loc, Op, Tag};
use inets_core::program::{RuleCtx, Rules};
use inets_core::{Runtime, RuntimeConfig};

const LEAF: u32 = 0;
const NODE: u32 = 1;
const GEN_TREE: u32 = 2;
const SUM_TREE: u32 = 3;

/// The same `gen_tree`/`sum_tree` shape as the CLI's sample program,
/// reproduced locally so this bench doesn't need a dependency from
/// `inets-core` back onto `inets-cli`.
struct TreeProgram;

impl Rules for TreeProgram {
    fn function_count(&self) -> u32 {
        4
    }

    fn arity(&self, fid: u32) -> u32 {
        match fid {
            LEAF => 1,
            NODE => 2,
            GEN_TREE => 1,
            SUM_TREE => 1,
            _ => 0,
        }
    }

    fn strict_args(&self, fid: u32) -> &[u32] {
        match fid {
            GEN_TREE => &[0],
            SUM_TREE => &[0],
            _ => &[],
        }
    }

    fn try_rewrite(&self, ctx: &mut RuleCtx, fid: u32, _host: Loc, args: &[Cell]) -> Option<Cell> {
        match fid {
            GEN_TREE => Some(rewrite_gen_tree(ctx, args[0])),
            SUM_TREE => Some(rewrite_sum_tree(ctx, args[0])),
            _ => None,
        }
    }
}

fn rewrite_gen_tree(ctx: &mut RuleCtx, depth: Cell) -> Cell {
    if depth.tag() != Tag::Num || depth.num_val() <= 0 {
        let leaf = ctx.alloc(1);
        ctx.link(leaf, Cell::num(1));
        return Cell::ctr(LEAF, leaf);
    }

    let label = ctx.fresh_label();
    let dup_loc = ctx.alloc(3);
    ctx.link(dup_loc + 2, Cell::num(depth.num_val() - 1));

    let left_call = ctx.alloc(1);
    ctx.link(left_call, Cell::dp0(label, dup_loc));
    let right_call = ctx.alloc(1);
    ctx.link(right_call, Cell::dp1(label, dup_loc));

    let node = ctx.alloc(2);
    ctx.link(node, Cell::fun(GEN_TREE, left_call));
    ctx.link(node + 1, Cell::fun(GEN_TREE, right_call));
    Cell::ctr(NODE, node)
}

fn rewrite_sum_tree(ctx: &mut RuleCtx, tree: Cell) -> Cell {
    match tree.tag() {
        Tag::Ctr if tree.ext() == LEAF => ctx.heap.get(tree.loc(0)),
        Tag::Ctr if tree.ext() == NODE => {
            let l = ctx.heap.get(tree.loc(0));
            let r = ctx.heap.get(tree.loc(1));
            let sum_l = ctx.alloc(1);
            ctx.link(sum_l, l);
            let sum_r = ctx.alloc(1);
            ctx.link(sum_r, r);
            let op = ctx.alloc(2);
            ctx.link(op, Cell::fun(SUM_TREE, sum_l));
            ctx.link(op + 1, Cell::fun(SUM_TREE, sum_r));
            Cell::op2(Op::Add, op)
        }
        _ => {
            let loc = ctx.alloc(1);
            ctx.link(loc, tree);
            Cell::fun(SUM_TREE, loc)
        }
    }
}

fn run_once(depth: i64, workers: usize) -> u64 {
    let mut rt = Runtime::new(
        std::sync::Arc::new(TreeProgram),
        RuntimeConfig {
            workers,
            band_size: 1 << 16,
        },
    )
    .unwrap();

    let host = {
        let heap = rt.builder();
        let depth_cell = heap.alloc(1);
        heap.set(depth_cell, Cell::num(depth as u64));
        let tree = heap.alloc(1);
        heap.set(tree, Cell::fun(GEN_TREE, depth_cell));
        let sum = heap.alloc(1);
        heap.set(sum, Cell::fun(SUM_TREE, tree));
        sum
    };
    let report = rt.normalize(host);
    report.cost
}

fn bench_gen_sum_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("gen_sum_tree");
    group.sample_size(10);
    group.sampling_mode(SamplingMode::Flat);
    group.warm_up_time(Duration::from_millis(200));
    group.measurement_time(Duration::from_secs(1));

    for &depth in &[4i64, 8, 12] {
        for &workers in &[1usize, 2, 4] {
            group.bench_with_input(
                BenchmarkId::new(format!("depth{depth}"), workers),
                &(depth, workers),
                |b, &(depth, workers)| {
                    b.iter(|| run_once(depth, workers));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_gen_sum_tree);
criterion_main!(benches);

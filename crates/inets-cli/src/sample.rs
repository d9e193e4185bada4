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

//! A hand-written rule table exercising constructor fan-out, standing in
//! for what a source-language compiler would otherwise generate.
//!
//! Defines three functions over a binary `Tree` (`Leaf`, `Node`):
//!   - `gen_tree(depth)`: builds a perfect tree of the given depth, doubling
//!     fan-out through `SUP` at every level rather than actually branching.
//!   - `sum_tree(tree)`: folds a tree down to the sum of its leaves.
//!   - `main(n)`: `sum_tree(gen_tree(n))`, the program `inets-cli` runs by
//!     default.

use inets_core::cell::{Cell, Loc, Op, Tag};
use inets_core::program::{RuleCtx, Rules};

pub const LEAF: u32 = 0;
pub const NODE: u32 = 1;
pub const GEN_TREE: u32 = 2;
pub const SUM_TREE: u32 = 3;
pub const MAIN: u32 = 4;

pub struct SampleProgram;

impl Rules for SampleProgram {
    fn function_count(&self) -> u32 {
        5
    }

    fn name(&self, fid: u32) -> Option<&str> {
        match fid {
            LEAF => Some("Leaf"),
            NODE => Some("Node"),
            GEN_TREE => Some("gen_tree"),
            SUM_TREE => Some("sum_tree"),
            MAIN => Some("main"),
            _ => None,
        }
    }

    fn arity(&self, fid: u32) -> u32 {
        match fid {
            LEAF => 1,      // Leaf(value)
            NODE => 2,      // Node(left, right)
            GEN_TREE => 1,  // gen_tree(depth)
            SUM_TREE => 1,  // sum_tree(tree)
            MAIN => 1,      // main(n)
            _ => 0,
        }
    }

    fn strict_args(&self, fid: u32) -> &[u32] {
        match fid {
            GEN_TREE => &[0],
            SUM_TREE => &[0],
            MAIN => &[0],
            _ => &[],
        }
    }

    fn try_rewrite(&self, ctx: &mut RuleCtx, fid: u32, _host: Loc, args: &[Cell]) -> Option<Cell> {
        match fid {
            GEN_TREE => Some(rewrite_gen_tree(ctx, args[0])),
            SUM_TREE => Some(rewrite_sum_tree(ctx, args[0])),
            MAIN => {
                let tree = rewrite_gen_tree(ctx, args[0]);
                Some(rewrite_sum_tree(ctx, tree))
            }
            _ => None,
        }
    }
}

/// `gen_tree(0) = Leaf(1)`; `gen_tree(d) = Node(gen_tree(d-1), gen_tree(d-1))`,
/// sharing both recursive calls through a single `DUP` of `d - 1` so the
/// two subtrees are built once and fanned out via `SUP` as they're consumed.
fn rewrite_gen_tree(ctx: &mut RuleCtx, depth: Cell) -> Cell {
    if depth.tag() != Tag::Num {
        // Depth isn't known yet (e.g. it's itself a SUP/DUP chain still
        // settling); leave the call stuck, the reducer will retry it once
        // `depth` reaches WHNF on a later pass.
        return Cell::fun(GEN_TREE, {
            let loc = ctx.alloc(1);
            ctx.link(loc, depth);
            loc
        });
    }
    if depth.num_val() <= 0 {
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

/// `sum_tree(Leaf(v)) = v`; `sum_tree(Node(l, r)) = sum_tree(l) + sum_tree(r)`.
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
            // Not yet a constructor (stuck call, or a SUP the reducer hasn't
            // commuted through this call yet); leave it for the next pass.
            let loc = ctx.alloc(1);
            ctx.link(loc, tree);
            Cell::fun(SUM_TREE, loc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arities_match_constructor_shapes() {
        let p = SampleProgram;
        assert_eq!(p.arity(LEAF), 1);
        assert_eq!(p.arity(NODE), 2);
        assert_eq!(p.arity(MAIN), 1);
    }
}

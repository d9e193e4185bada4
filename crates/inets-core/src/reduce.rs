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

//! Weak-head-normal-form reduction: the interaction rules themselves.
//!
//! `reduce` drives a single redex chain to WHNF. It is written as ordinary
//! recursive descent rather than a hand-rolled stack machine: the function's
//! own host-language call stack plays the role of the return stack the
//! design notes describe, which keeps each rule's logic in one place. The
//! two are equivalent for any chain a single worker can reach; nothing here
//! depends on stack frames being inspectable.

use tracing::trace;

use crate::cell::{Cell, Loc, Op, Tag};
use crate::heap::WorkerHeap;
use crate::link::{link, subst};
use crate::program::{RuleCtx, Rules};

/// Reduces the term at `host` to weak head normal form.
///
/// `slen` is the width of the work slice the caller (the parallel
/// normalizer) is currently responsible for; a value greater than one tells
/// an `Op2` redex at the very top of this call to leave its second argument
/// unreduced, so the normalizer can fork across both.
pub fn reduce(heap: &mut WorkerHeap, rules: &dyn Rules, host: Loc, slen: u32, cost: &mut u64) -> Cell {
    reduce_inner(heap, rules, host, slen, cost, true)
}

fn reduce_inner(
    heap: &mut WorkerHeap,
    rules: &dyn Rules,
    host: Loc,
    slen: u32,
    cost: &mut u64,
    top: bool,
) -> Cell {
    loop {
        let term = heap.get(host);
        match term.tag() {
            Tag::App => {
                let fun_val = reduce_inner(heap, rules, term.loc(0), slen, cost, false);
                match fun_val.tag() {
                    Tag::Lam => {
                        let result = app_lam(heap, rules, term, fun_val);
                        heap.set(host, result);
                        *cost += 1;
                        trace!(rule = "APP-LAM", host, cost = *cost, "fired");
                        continue;
                    }
                    Tag::Sup => {
                        let result = app_sup(heap, term, fun_val);
                        heap.set(host, result);
                        *cost += 1;
                        trace!(rule = "APP-SUP", host, cost = *cost, "fired");
                        continue;
                    }
                    _ => {
                        heap.set(term.loc(0), fun_val);
                        return heap.get(host);
                    }
                }
            }

            Tag::Dp0 | Tag::Dp1 => {
                let dup_base = term.val();
                if !heap.try_lock(dup_base) {
                    // Another worker is mid-rewrite on this node. Leave it;
                    // the normalizer's next pass will try again.
                    return term;
                }
                let cur = heap.get(host);
                if cur.0 != term.0 {
                    heap.unlock(dup_base);
                    continue; // rewritten out from under us; re-dispatch
                }
                let label = term.ext();
                let val = reduce_inner(heap, rules, term.loc(2), slen, cost, false);
                let fired = match val.tag() {
                    Tag::Lam => {
                        dup_lam(heap, rules, label, dup_base, host, val);
                        Some("DUP-LAM")
                    }
                    Tag::Sup if val.ext() == label => {
                        dup_sup_same(heap, rules, dup_base, host, val);
                        Some("DUP-SUP-SAME")
                    }
                    Tag::Sup => {
                        dup_sup_diff(heap, rules, label, dup_base, host, val);
                        Some("DUP-SUP-DIFF")
                    }
                    Tag::Num => {
                        dup_num(heap, rules, dup_base, host, val);
                        Some("DUP-NUM")
                    }
                    Tag::Ctr => {
                        let arity = rules.arity(val.ext());
                        dup_ctr(heap, rules, label, dup_base, host, val, arity);
                        Some("DUP-CTR")
                    }
                    Tag::Era => {
                        dup_era(heap, rules, dup_base, host);
                        Some("DUP-ERA")
                    }
                    _ => None,
                };
                if let Some(rule) = fired {
                    heap.unlock(dup_base);
                    *cost += 1;
                    trace!(rule, host, cost = *cost, "fired");
                    continue;
                }
                heap.set(term.loc(2), val);
                heap.unlock(dup_base);
                return term;
            }

            Tag::Op2 => {
                let a = reduce_inner(heap, rules, term.loc(0), slen, cost, false);
                if a.tag() == Tag::Sup {
                    let result = op2_sup_l(heap, term, a);
                    heap.set(host, result);
                    *cost += 1;
                    trace!(rule = "OP2-SUP-L", host, cost = *cost, "fired");
                    continue;
                }
                if top && slen > 1 {
                    heap.set(term.loc(0), a);
                    return heap.get(host);
                }
                let b = reduce_inner(heap, rules, term.loc(1), slen, cost, false);
                if b.tag() == Tag::Sup {
                    let result = op2_sup_r(heap, term, a, b);
                    heap.set(host, result);
                    *cost += 1;
                    trace!(rule = "OP2-SUP-R", host, cost = *cost, "fired");
                    continue;
                }
                if a.tag() == Tag::Num && b.tag() == Tag::Num {
                    let result = op2_num(heap, term, a, b);
                    heap.set(host, result);
                    *cost += 1;
                    trace!(rule = "OP2-NUM", host, cost = *cost, "fired");
                    continue;
                }
                heap.set(term.loc(0), a);
                heap.set(term.loc(1), b);
                return heap.get(host);
            }

            Tag::Fun => {
                let fid = term.ext();
                let arity = rules.arity(fid);
                let strict = rules.strict_args(fid).to_vec();
                let mut args: Vec<Cell> = (0..arity).map(|i| heap.get(term.loc(i))).collect();
                let mut commuted = false;
                for i in strict {
                    let whnf = reduce_inner(heap, rules, term.loc(i), slen, cost, false);
                    if whnf.tag() == Tag::Sup {
                        let result = fun_sup(heap, term, fid, arity, i, whnf);
                        heap.set(host, result);
                        *cost += 1;
                        trace!(rule = "FUN-SUP", host, cost = *cost, "fired");
                        commuted = true;
                        break;
                    }
                    heap.set(term.loc(i), whnf);
                    args[i as usize] = whnf;
                }
                if commuted {
                    continue;
                }
                let mut ctx = RuleCtx {
                    heap: &mut *heap,
                    cost: &mut *cost,
                };
                match rules.try_rewrite(&mut ctx, fid, host, &args) {
                    Some(new_cell) => {
                        heap.set(host, new_cell);
                        *cost += 1;
                        trace!(rule = "FUN", fid, host, cost = *cost, "fired");
                        continue;
                    }
                    None => return term,
                }
            }

            _ => return term,
        }
    }
}

// --- rule bodies --------------------------------------------------------

fn app_lam(heap: &mut WorkerHeap, rules: &dyn Rules, app: Cell, lam: Cell) -> Cell {
    let arg = heap.get(app.loc(1));
    let binder = heap.get(lam.loc(0));
    subst(heap, rules, binder, arg);
    let body = heap.get(lam.loc(1));
    heap.clear(app.val(), 2);
    heap.clear(lam.val(), 2);
    body
}

fn app_sup(heap: &mut WorkerHeap, app: Cell, sup: Cell) -> Cell {
    let label = sup.ext();
    let a = heap.get(sup.loc(0));
    let b = heap.get(sup.loc(1));
    let c = heap.get(app.loc(1));

    let dup_loc = heap.alloc(3);
    link(heap, dup_loc + 2, c);

    let app0 = app.val();
    link(heap, app0, a);
    link(heap, app0 + 1, Cell::dp0(label, dup_loc));

    let app1 = sup.val();
    link(heap, app1, b);
    link(heap, app1 + 1, Cell::dp1(label, dup_loc));

    let sup_loc = heap.alloc(2);
    link(heap, sup_loc, Cell::app(app0));
    link(heap, sup_loc + 1, Cell::app(app1));
    Cell::sup(label, sup_loc)
}

fn dup_finish(heap: &mut WorkerHeap, rules: &dyn Rules, dup_base: Loc, host: Loc, out0: Cell, out1: Cell) {
    let slot0 = heap.get(dup_base);
    let slot1 = heap.get(dup_base + 1);
    subst(heap, rules, slot0, out0);
    subst(heap, rules, slot1, out1);
    heap.clear(dup_base, 3);
    let _ = host; // host's new value was already written by the subst above
}

fn dup_lam(heap: &mut WorkerHeap, rules: &dyn Rules, label: u32, dup_base: Loc, host: Loc, lam: Cell) {
    let x0 = heap.alloc(2);
    let x1 = heap.alloc(2);
    let body_dup = heap.alloc(3);
    let sup_loc = heap.alloc(2);

    let old_binder = heap.get(lam.loc(0));
    let body = heap.get(lam.loc(1));

    link(heap, sup_loc, Cell::var(x0));
    link(heap, sup_loc + 1, Cell::var(x1));
    subst(heap, rules, old_binder, Cell::sup(label, sup_loc));

    link(heap, body_dup + 2, body);
    link(heap, x0 + 1, Cell::dp0(label, body_dup));
    link(heap, x1 + 1, Cell::dp1(label, body_dup));

    heap.clear(lam.val(), 2);
    dup_finish(heap, rules, dup_base, host, Cell::lam(x0), Cell::lam(x1));
}

fn dup_sup_same(heap: &mut WorkerHeap, rules: &dyn Rules, dup_base: Loc, host: Loc, sup: Cell) {
    let a = heap.get(sup.loc(0));
    let b = heap.get(sup.loc(1));
    heap.clear(sup.val(), 2);
    dup_finish(heap, rules, dup_base, host, a, b);
}

fn dup_sup_diff(heap: &mut WorkerHeap, rules: &dyn Rules, label: u32, dup_base: Loc, host: Loc, sup: Cell) {
    let sup_label = sup.ext();
    let a = heap.get(sup.loc(0));
    let b = heap.get(sup.loc(1));

    let dup_a = heap.alloc(3);
    let dup_b = heap.alloc(3);
    link(heap, dup_a + 2, a);
    link(heap, dup_b + 2, b);

    let sup_x = heap.alloc(2);
    let sup_y = heap.alloc(2);
    link(heap, sup_x, Cell::dp0(label, dup_a));
    link(heap, sup_x + 1, Cell::dp0(label, dup_b));
    link(heap, sup_y, Cell::dp1(label, dup_a));
    link(heap, sup_y + 1, Cell::dp1(label, dup_b));

    heap.clear(sup.val(), 2);
    dup_finish(
        heap,
        rules,
        dup_base,
        host,
        Cell::sup(sup_label, sup_x),
        Cell::sup(sup_label, sup_y),
    );
}

fn dup_num(heap: &mut WorkerHeap, rules: &dyn Rules, dup_base: Loc, host: Loc, num: Cell) {
    dup_finish(heap, rules, dup_base, host, num, num);
}

fn dup_ctr(
    heap: &mut WorkerHeap,
    rules: &dyn Rules,
    label: u32,
    dup_base: Loc,
    host: Loc,
    ctr: Cell,
    arity: u32,
) {
    let fid = ctr.ext();
    if arity == 0 {
        dup_finish(heap, rules, dup_base, host, Cell::ctr(fid, 0), Cell::ctr(fid, 0));
        return;
    }
    let n = arity;
    // Captured before the loop: the last iteration reuses `dup_base` itself
    // as the duplication node for the final argument, overwriting these two
    // slots with new back-edges. Reading them after the loop would subst
    // the constructor into the wrong (brand new) use sites instead of the
    // two real consumers of this DUP.
    let slot0 = heap.get(dup_base);
    let slot1 = heap.get(dup_base + 1);
    let ctr0 = heap.alloc(n);
    let ctr1 = heap.alloc(n);
    for i in 0..n {
        let arg_i = heap.get(ctr.loc(i));
        if i + 1 == n {
            // Reuse the original 3-cell DUP node for the last argument's
            // duplication instead of allocating a new one.
            link(heap, dup_base + 2, arg_i);
            link(heap, ctr0 + i, Cell::dp0(label, dup_base));
            link(heap, ctr1 + i, Cell::dp1(label, dup_base));
        } else {
            let dloc = heap.alloc(3);
            link(heap, dloc + 2, arg_i);
            link(heap, ctr0 + i, Cell::dp0(label, dloc));
            link(heap, ctr1 + i, Cell::dp1(label, dloc));
        }
    }
    heap.clear(ctr.val(), n);
    subst(heap, rules, slot0, Cell::ctr(fid, ctr0));
    subst(heap, rules, slot1, Cell::ctr(fid, ctr1));
}

fn dup_era(heap: &mut WorkerHeap, rules: &dyn Rules, dup_base: Loc, host: Loc) {
    dup_finish(heap, rules, dup_base, host, Cell::era(), Cell::era());
}

fn op2_num(heap: &mut WorkerHeap, term: Cell, a: Cell, b: Cell) -> Cell {
    let op = term.op();
    let (x, y) = (a.num_val(), b.num_val());
    let result = match op {
        Op::Add => x.wrapping_add(y),
        Op::Sub => x.wrapping_sub(y),
        Op::Mul => x.wrapping_mul(y),
        Op::Div => {
            if y == 0 {
                0
            } else {
                x.wrapping_div(y)
            }
        }
        Op::Mod => {
            if y == 0 {
                0
            } else {
                x.wrapping_rem(y)
            }
        }
        Op::And => x & y,
        Op::Or => x | y,
        Op::Xor => x ^ y,
        Op::Shl => x.wrapping_shl(y as u32 & 63),
        Op::Shr => x.wrapping_shr(y as u32 & 63),
        Op::Ltn => (x < y) as i64,
        Op::Lte => (x <= y) as i64,
        Op::Eql => (x == y) as i64,
        Op::Gte => (x >= y) as i64,
        Op::Gtn => (x > y) as i64,
        Op::Neq => (x != y) as i64,
    };
    heap.clear(term.val(), 2);
    Cell::num(result as u64)
}

fn op2_sup_l(heap: &mut WorkerHeap, term: Cell, sup: Cell) -> Cell {
    let label = sup.ext();
    let a = heap.get(sup.loc(0));
    let b = heap.get(sup.loc(1));
    let y = heap.get(term.loc(1));

    let dloc = heap.alloc(3);
    link(heap, dloc + 2, y);

    let op0 = term.val();
    let op1 = sup.val();
    link(heap, op0, a);
    link(heap, op0 + 1, Cell::dp0(label, dloc));
    link(heap, op1, b);
    link(heap, op1 + 1, Cell::dp1(label, dloc));

    let sup_loc = heap.alloc(2);
    link(heap, sup_loc, Cell::op2(term.op(), op0));
    link(heap, sup_loc + 1, Cell::op2(term.op(), op1));
    Cell::sup(label, sup_loc)
}

fn op2_sup_r(heap: &mut WorkerHeap, term: Cell, a: Cell, sup: Cell) -> Cell {
    let label = sup.ext();
    let b0 = heap.get(sup.loc(0));
    let b1 = heap.get(sup.loc(1));

    let dloc = heap.alloc(3);
    link(heap, dloc + 2, a);

    let op0 = term.val();
    let op1 = sup.val();
    link(heap, op0, Cell::dp0(label, dloc));
    link(heap, op0 + 1, b0);
    link(heap, op1, Cell::dp1(label, dloc));
    link(heap, op1 + 1, b1);

    let sup_loc = heap.alloc(2);
    link(heap, sup_loc, Cell::op2(term.op(), op0));
    link(heap, sup_loc + 1, Cell::op2(term.op(), op1));
    Cell::sup(label, sup_loc)
}

fn fun_sup(heap: &mut WorkerHeap, fun: Cell, fid: u32, arity: u32, sup_index: u32, sup: Cell) -> Cell {
    let label = sup.ext();
    let a = heap.get(sup.loc(0));
    let b = heap.get(sup.loc(1));
    let fun0 = heap.alloc(arity);
    let fun1 = heap.alloc(arity);
    for i in 0..arity {
        if i == sup_index {
            link(heap, fun0 + i, a);
            link(heap, fun1 + i, b);
        } else {
            let arg_i = heap.get(fun.loc(i));
            let dloc = heap.alloc(3);
            link(heap, dloc + 2, arg_i);
            link(heap, fun0 + i, Cell::dp0(label, dloc));
            link(heap, fun1 + i, Cell::dp1(label, dloc));
        }
    }
    heap.clear(fun.val(), arity);
    heap.clear(sup.val(), 2);
    let sup_loc = heap.alloc(2);
    link(heap, sup_loc, Cell::fun(fid, fun0));
    link(heap, sup_loc + 1, Cell::fun(fid, fun1));
    Cell::sup(label, sup_loc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapCells;
    use crate::program::tests::EmptyRules;

    /// Builds `(\x.x) 5` and checks it reduces to `5`.
    #[test]
    fn identity_application_reduces_to_argument() {
        let cells = HeapCells::new(1, 64);
        let mut heap = WorkerHeap::new(cells, 0);

        let lam = heap.alloc(2);
        link(&heap, lam + 1, Cell::var(lam)); // body: the bound variable itself; repairs the binder slot

        let app = heap.alloc(2);
        link(&heap, app, Cell::lam(lam));
        link(&heap, app + 1, Cell::num(5));

        let mut cost = 0u64;
        let result = reduce(&mut heap, &EmptyRules, app, 1, &mut cost);
        assert_eq!(result, Cell::num(5));
        assert_eq!(cost, 1);
    }

    /// `dup a b = 7` then forcing `a` yields `7` and frees the DUP node.
    #[test]
    fn duplicating_a_number_yields_two_copies() {
        let cells = HeapCells::new(1, 64);
        let mut heap = WorkerHeap::new(cells, 0);

        let dup = heap.alloc(3);
        let use_a = heap.alloc(1);
        let use_b = heap.alloc(1);
        // `link` repairs each binder back-edge (`dup`/`dup + 1`) as it writes
        // the matching use-site cell, the same way real DUP construction does.
        link(&heap, use_a, Cell::dp0(0, dup));
        link(&heap, use_b, Cell::dp1(0, dup));
        link(&heap, dup + 2, Cell::num(7));

        let mut cost = 0u64;
        let result = reduce(&mut heap, &EmptyRules, use_a, 1, &mut cost);
        assert_eq!(result.tag(), Tag::Num);
        assert_eq!(result.num_val(), 7);
        // The sibling use site was substituted too.
        assert_eq!(heap.get(use_b), Cell::num(7));
    }

    #[test]
    fn op2_add_of_two_nums_computes_sum() {
        let cells = HeapCells::new(1, 64);
        let mut heap = WorkerHeap::new(cells, 0);

        let args = heap.alloc(2);
        link(&heap, args, Cell::num(2));
        link(&heap, args + 1, Cell::num(3));
        let op_host = heap.alloc(1);
        heap.set(op_host, Cell::op2(Op::Add, args));

        let mut cost = 0u64;
        let result = reduce(&mut heap, &EmptyRules, op_host, 1, &mut cost);
        assert_eq!(result.num_val(), 5);
    }

    /// A `Rules` stub declaring one binary constructor, for `dup_ctr` tests.
    struct PairCtrRules;
    impl Rules for PairCtrRules {
        fn arity(&self, fid: u32) -> u32 {
            if fid == 5 {
                2
            } else {
                0
            }
        }
        fn strict_args(&self, _fid: u32) -> &[u32] {
            &[]
        }
        fn try_rewrite(&self, _ctx: &mut RuleCtx, _fid: u32, _host: Loc, _args: &[Cell]) -> Option<Cell> {
            None
        }
    }

    /// `dup a b = Pair(1, 2)` then forcing `a` must substitute a *matching*
    /// `Pair` into both use sites, each argument independently duplicated —
    /// not leave the original DUP's back-edges dangling into themselves.
    #[test]
    fn duplicating_a_constructor_substitutes_both_use_sites_intact() {
        let cells = HeapCells::new(1, 64);
        let mut heap = WorkerHeap::new(cells, 0);

        let ctr_args = heap.alloc(2);
        link(&heap, ctr_args, Cell::num(1));
        link(&heap, ctr_args + 1, Cell::num(2));

        let dup = heap.alloc(3);
        let use_a = heap.alloc(1);
        let use_b = heap.alloc(1);
        link(&heap, use_a, Cell::dp0(0, dup));
        link(&heap, use_b, Cell::dp1(0, dup));
        link(&heap, dup + 2, Cell::ctr(5, ctr_args));

        let mut cost = 0u64;
        let result = reduce(&mut heap, &PairCtrRules, use_a, 1, &mut cost);

        assert_eq!(result.tag(), Tag::Ctr);
        assert_eq!(result.ext(), 5);
        let other = heap.get(use_b);
        assert_eq!(other.tag(), Tag::Ctr);
        assert_eq!(other.ext(), 5);

        // Each argument was independently DUPed; reading through the two
        // per-argument DUP redexes on both sides recovers the original pair.
        let left_arg0 = heap.get(result.loc(0));
        let left_arg1 = heap.get(result.loc(1));
        let right_arg0 = heap.get(other.loc(0));
        let right_arg1 = heap.get(other.loc(1));
        assert_eq!(heap.get(left_arg0.loc(2)), Cell::num(1));
        assert_eq!(heap.get(left_arg1.loc(2)), Cell::num(2));
        assert_eq!(heap.get(right_arg0.loc(2)), Cell::num(1));
        assert_eq!(heap.get(right_arg1.loc(2)), Cell::num(2));
    }
}

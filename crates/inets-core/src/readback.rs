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

//! Graph-to-text readback.
//!
//! Only consumed by the test suite and the CLI's final printout; nothing in
//! the reducer or normalizer depends on it. A `DUP` is transparent here: it
//! reads straight through to its shared value, pushing a direction marker
//! first so that a `SUP` of the same label encountered underneath resolves
//! to the matching branch instead of printing the literal superposition —
//! this is the one case a fully-normalized graph can still contain a live
//! `DUP`/`SUP` pair (sharing that was never forced together).

use std::collections::HashMap;

use crate::cell::{Loc, Tag};
use crate::heap::HeapCells;
use crate::program::Rules;
use crate::stack::Stack;

const MAX_DEPTH: u32 = 4096;

/// Assigns each binder a name in the order it is first encountered, rather
/// than by its (arbitrary, allocation-order) heap location.
struct VarNames {
    next: u32,
    names: HashMap<Loc, u32>,
}

impl VarNames {
    fn new() -> VarNames {
        VarNames {
            next: 0,
            names: HashMap::new(),
        }
    }

    /// A `Var`/`Dp0`/`Dp1` cell's `.val()` points back at its binder's own
    /// slot 0, so the binder location doubles as a stable key here.
    fn assign(&mut self, binder: Loc) -> u32 {
        let next = &mut self.next;
        *self.names.entry(binder).or_insert_with(|| {
            let n = *next;
            *next += 1;
            n
        })
    }
}

pub fn read_back(cells: &HeapCells, rules: &dyn Rules, host: Loc) -> String {
    let mut dirs: Stack<(u32, bool)> = Stack::new();
    let mut vars = VarNames::new();
    read_term(cells, rules, host, &mut dirs, &mut vars, 0)
}

fn read_term(
    cells: &HeapCells,
    rules: &dyn Rules,
    loc: Loc,
    dirs: &mut Stack<(u32, bool)>,
    vars: &mut VarNames,
    depth: u32,
) -> String {
    if depth > MAX_DEPTH {
        return "...".to_string();
    }
    let term = cells.get(loc);
    match term.tag() {
        Tag::Var => format!("x{}", vars.assign(term.val())),

        Tag::Dp0 | Tag::Dp1 => {
            let side = term.tag() == Tag::Dp1;
            dirs.push((term.ext(), side));
            let s = read_term(cells, rules, term.loc(2), dirs, vars, depth + 1);
            dirs.pop();
            s
        }

        Tag::Lam => {
            let binder = cells.get(term.loc(0));
            let body = read_term(cells, rules, term.loc(1), dirs, vars, depth + 1);
            if binder.tag() == Tag::Era {
                format!("\\_.{body}")
            } else {
                format!("\\x{}.{body}", vars.assign(term.loc(0)))
            }
        }

        Tag::App => format!(
            "({} {})",
            read_term(cells, rules, term.loc(0), dirs, vars, depth + 1),
            read_term(cells, rules, term.loc(1), dirs, vars, depth + 1)
        ),

        Tag::Sup => {
            let label = term.ext();
            if let Some((_, side)) = dirs.find(|(l, _)| *l == label) {
                let branch = if *side { term.loc(1) } else { term.loc(0) };
                read_term(cells, rules, branch, dirs, vars, depth + 1)
            } else {
                format!(
                    "{{{} {}}}",
                    read_term(cells, rules, term.loc(0), dirs, vars, depth + 1),
                    read_term(cells, rules, term.loc(1), dirs, vars, depth + 1)
                )
            }
        }

        Tag::Ctr | Tag::Fun => {
            let fid = term.ext();
            let arity = rules.arity(fid);
            let name = rules
                .name(fid)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("f{fid}"));
            if arity == 0 {
                name
            } else {
                let args: Vec<String> = (0..arity)
                    .map(|i| read_term(cells, rules, term.loc(i), dirs, vars, depth + 1))
                    .collect();
                format!("({name} {})", args.join(" "))
            }
        }

        Tag::Op2 => format!(
            "({} {} {})",
            read_term(cells, rules, term.loc(0), dirs, vars, depth + 1),
            term.op().symbol(),
            read_term(cells, rules, term.loc(1), dirs, vars, depth + 1)
        ),

        Tag::Num => format!("{}", term.num_val()),
        Tag::Era => "*".to_string(),
        Tag::Nil => "()".to_string(),
        Tag::Arg => "_".to_string(),
        Tag::Flo => "?".to_string(),
    }
}

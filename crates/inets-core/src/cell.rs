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

//! Tagged 64-bit cell encoding.
//!
//! A [`Cell`] packs a 4-bit tag, a 24-bit auxiliary `ext` field, and a 36-bit
//! `val` field into one `u64`. For `NUM` cells the `ext`+`val` fields are
//! read as one 60-bit payload instead.

use std::fmt;

/// A heap location: an absolute index into the shared cell arena.
pub type Loc = u32;

const TAG_SHIFT: u32 = 60;
const EXT_SHIFT: u32 = 36;
const EXT_MASK: u64 = (1 << 24) - 1;
const VAL_MASK: u64 = (1 << 36) - 1;
/// Mask for the combined `ext`+`val` payload used by `NUM` cells.
pub const NUM_MASK: u64 = (1 << 60) - 1;
const NUM_SIGN_BIT: u64 = 1 << 59;

/// The tag occupying the top 4 bits of a [`Cell`].
///
/// Ordered so that `tag as u8 <= Tag::Var as u8` identifies exactly the
/// variable-like tags (`Dp0`, `Dp1`, `Var`) that carry a back-edge to a
/// binder — the linker relies on this ordering, not on an explicit match.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    Dp0 = 0,
    Dp1 = 1,
    Var = 2,
    Arg = 3,
    Era = 4,
    Lam = 5,
    App = 6,
    Sup = 7,
    Ctr = 8,
    Fun = 9,
    Op2 = 10,
    Num = 11,
    Flo = 12,
    Nil = 13,
}

impl Tag {
    const ALL: [Tag; 14] = [
        Tag::Dp0,
        Tag::Dp1,
        Tag::Var,
        Tag::Arg,
        Tag::Era,
        Tag::Lam,
        Tag::App,
        Tag::Sup,
        Tag::Ctr,
        Tag::Fun,
        Tag::Op2,
        Tag::Num,
        Tag::Flo,
        Tag::Nil,
    ];

    /// Recovers a `Tag` from its packed 4-bit value.
    ///
    /// Panics on an out-of-range tag; a well-formed heap never produces one
    /// (see the invariants in the data-model section of the design docs).
    pub fn from_u8(v: u8) -> Tag {
        Self::ALL
            .into_iter()
            .find(|t| *t as u8 == v)
            .unwrap_or_else(|| panic!("invalid tag bits: {v}"))
    }
}

/// Binary opcode carried in the `ext` field of an `Op2` cell.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Mod = 4,
    And = 5,
    Or = 6,
    Xor = 7,
    Shl = 8,
    Shr = 9,
    Ltn = 10,
    Lte = 11,
    Eql = 12,
    Gte = 13,
    Gtn = 14,
    Neq = 15,
}

impl Op {
    const ALL: [Op; 16] = [
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Mod,
        Op::And,
        Op::Or,
        Op::Xor,
        Op::Shl,
        Op::Shr,
        Op::Ltn,
        Op::Lte,
        Op::Eql,
        Op::Gte,
        Op::Gtn,
        Op::Neq,
    ];

    pub fn from_u32(v: u32) -> Op {
        Self::ALL
            .into_iter()
            .find(|o| *o as u32 == v)
            .unwrap_or_else(|| panic!("invalid op2 opcode: {v}"))
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::And => "&",
            Op::Or => "|",
            Op::Xor => "^",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::Ltn => "<",
            Op::Lte => "<=",
            Op::Eql => "==",
            Op::Gte => ">=",
            Op::Gtn => ">",
            Op::Neq => "!=",
        }
    }
}

/// A tagged 64-bit pointer into the heap.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell(pub u64);

impl Cell {
    #[inline]
    pub const fn new(tag: Tag, ext: u32, val: u32) -> Cell {
        Cell(
            ((tag as u64) << TAG_SHIFT)
                | (((ext as u64) & EXT_MASK) << EXT_SHIFT)
                | ((val as u64) & VAL_MASK),
        )
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        Tag::from_u8((self.0 >> TAG_SHIFT) as u8)
    }

    #[inline]
    pub fn ext(&self) -> u32 {
        ((self.0 >> EXT_SHIFT) & EXT_MASK) as u32
    }

    #[inline]
    pub fn val(&self) -> Loc {
        (self.0 & VAL_MASK) as u32
    }

    /// The location of the `i`-th cell of this node's block.
    #[inline]
    pub fn loc(&self, i: u32) -> Loc {
        self.val() + i
    }

    #[inline]
    pub fn op(&self) -> Op {
        Op::from_u32(self.ext())
    }

    // --- Constructors for each tag -----------------------------------

    #[inline]
    pub fn dp0(label: u32, val: Loc) -> Cell {
        Cell::new(Tag::Dp0, label, val)
    }
    #[inline]
    pub fn dp1(label: u32, val: Loc) -> Cell {
        Cell::new(Tag::Dp1, label, val)
    }
    #[inline]
    pub fn var(val: Loc) -> Cell {
        Cell::new(Tag::Var, 0, val)
    }
    #[inline]
    pub fn arg(val: Loc) -> Cell {
        Cell::new(Tag::Arg, 0, val)
    }
    #[inline]
    pub fn era() -> Cell {
        Cell::new(Tag::Era, 0, 0)
    }
    #[inline]
    pub fn lam(val: Loc) -> Cell {
        Cell::new(Tag::Lam, 0, val)
    }
    #[inline]
    pub fn app(val: Loc) -> Cell {
        Cell::new(Tag::App, 0, val)
    }
    #[inline]
    pub fn sup(label: u32, val: Loc) -> Cell {
        Cell::new(Tag::Sup, label, val)
    }
    #[inline]
    pub fn ctr(fid: u32, val: Loc) -> Cell {
        Cell::new(Tag::Ctr, fid, val)
    }
    #[inline]
    pub fn fun(fid: u32, val: Loc) -> Cell {
        Cell::new(Tag::Fun, fid, val)
    }
    #[inline]
    pub fn op2(op: Op, val: Loc) -> Cell {
        Cell::new(Tag::Op2, op as u32, val)
    }
    #[inline]
    pub fn nil() -> Cell {
        Cell::new(Tag::Nil, 0, 0)
    }

    /// A boxed 60-bit numeric literal, masked into the combined `ext`+`val` payload.
    #[inline]
    pub fn num(n: u64) -> Cell {
        let masked = n & NUM_MASK;
        Cell(((Tag::Num as u64) << TAG_SHIFT) | masked)
    }

    /// The raw unsigned 60-bit payload of a `NUM` cell.
    #[inline]
    pub fn num_bits(&self) -> u64 {
        debug_assert_eq!(self.tag(), Tag::Num);
        self.0 & NUM_MASK
    }

    /// Sign-extends the 60-bit payload into an `i64` for arithmetic.
    #[inline]
    pub fn num_val(&self) -> i64 {
        let bits = self.num_bits();
        if bits & NUM_SIGN_BIT != 0 {
            (bits | !NUM_MASK) as i64
        } else {
            bits as i64
        }
    }

    #[inline]
    pub fn is_var_like(&self) -> bool {
        (self.tag() as u8) <= (Tag::Var as u8)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag() == Tag::Num {
            write!(f, "Num({})", self.num_val())
        } else {
            f.debug_struct("Cell")
                .field("tag", &self.tag())
                .field("ext", &self.ext())
                .field("val", &self.val())
                .finish()
        }
    }
}

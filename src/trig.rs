//! Expansion of `sin`/`cos` into a canonical basis.
//!
//! Arguments are split into monomial terms; sums go through the angle
//! addition formulas and small integer multiples are unfolded, so only
//! `sin(m)`/`cos(m)` of a unit-coefficient monomial (or of an opaque
//! non-polynomial argument) ever become atoms.

use num_traits::{One, Signed};

use crate::expr::{add, has_negative_lead, mul, neg, sub, Expr};
use crate::poly::{Atom, Coeff, Poly, UnOpType};

const MAX_MULTIPLE: i64 = 12;

#[derive(Clone, Copy)]
enum Trig {
    Sin,
    Cos,
}

pub(crate) fn sin(arg: &Expr) -> Expr {
    expand(Trig::Sin, arg)
}

pub(crate) fn cos(arg: &Expr) -> Expr {
    expand(Trig::Cos, arg)
}

fn atom(op: Trig, arg: &Expr) -> Expr {
    let op = match op {
        Trig::Sin => UnOpType::Sin,
        Trig::Cos => UnOpType::Cos,
    };
    Expr::atom(Atom::UnOp(op, arg.clone()))
}

/// `sin(-u) = -sin(u)`, `cos(-u) = cos(u)`.
fn reflected(op: Trig, arg: &Expr) -> Expr {
    let pos = neg(arg);
    match op {
        Trig::Sin => neg(&expand(Trig::Sin, &pos)),
        Trig::Cos => expand(Trig::Cos, &pos),
    }
}

fn angle_addition(op: Trig, a: &Expr, b: &Expr) -> Expr {
    match op {
        Trig::Sin => add(&mul(&sin(a), &cos(b)), &mul(&cos(a), &sin(b))),
        Trig::Cos => sub(&mul(&cos(a), &cos(b)), &mul(&sin(a), &sin(b))),
    }
}

fn expand(op: Trig, arg: &Expr) -> Expr {
    if arg.is_zero() {
        return match op {
            Trig::Sin => Expr::zero(),
            Trig::Cos => Expr::one(),
        };
    }
    if !arg.is_polynomial() {
        if has_negative_lead(arg) {
            return reflected(op, arg);
        }
        return atom(op, arg);
    }
    let num = arg.num_poly();
    if num.len() > 1 {
        let (m, k) = match num.terms().next() {
            Some((m, k)) => (m.clone(), k.clone()),
            None => unreachable!("polynomial with several terms"),
        };
        let head = Expr::from_poly(Poly::term(m, k));
        let tail = sub(arg, &head);
        return angle_addition(op, &head, &tail);
    }
    let (m, k) = match num.terms().next() {
        Some((m, k)) => (m.clone(), k.clone()),
        None => unreachable!("nonzero polynomial has a term"),
    };
    if k.is_negative() {
        return reflected(op, arg);
    }
    if m.is_one() || k.is_one() || !k.is_integer() || k > Coeff::from_integer(MAX_MULTIPLE.into()) {
        return atom(op, arg);
    }
    // k·m with integer 1 < k <= MAX_MULTIPLE
    let unit = Expr::from_poly(Poly::term(m.clone(), Coeff::one()));
    let rest = Expr::from_poly(Poly::term(m, k - Coeff::one()));
    angle_addition(op, &rest, &unit)
}

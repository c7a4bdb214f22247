//! Sparse multivariate polynomials with exact rational coefficients.
//!
//! Indeterminates are [`Atom`]s: plain symbols or a unary function applied to
//! an [`Expr`]. Products are kept reduced modulo `sin(u)^2 + cos(u)^2 - 1`
//! so that trigonometric identities become structural equalities.

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::expr::Expr;
use crate::symbol::Symbol;

pub type Coeff = BigRational;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnOpType {
    Sin,
    Cos,
    Exp,
    Log,
}

impl UnOpType {
    pub fn name(self) -> &'static str {
        match self {
            UnOpType::Sin => "sin",
            UnOpType::Cos => "cos",
            UnOpType::Exp => "exp",
            UnOpType::Log => "log",
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Atom {
    Sym(Symbol),
    UnOp(UnOpType, Expr),
}

impl Atom {
    pub fn depends_on(&self, s: &Symbol) -> bool {
        match self {
            Atom::Sym(name) => name == s,
            Atom::UnOp(_, arg) => arg.depends_on(s),
        }
    }
}

/// Product of atoms with positive exponents, sorted by atom.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Monomial(Vec<(Atom, u32)>);

impl Monomial {
    pub fn one() -> Self {
        Monomial(Vec::new())
    }

    pub fn atom(atom: Atom, exp: u32) -> Self {
        if exp == 0 {
            return Monomial::one();
        }
        Monomial(vec![(atom, exp)])
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    pub fn factors(&self) -> &[(Atom, u32)] {
        &self.0
    }

    pub fn degree(&self) -> u32 {
        self.0.iter().map(|(_, e)| e).sum()
    }

    pub fn mul(&self, other: &Monomial) -> Monomial {
        let mut out = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            let (a, ea) = &self.0[i];
            let (b, eb) = &other.0[j];
            match a.cmp(b) {
                Ordering::Less => {
                    out.push((a.clone(), *ea));
                    i += 1;
                }
                Ordering::Greater => {
                    out.push((b.clone(), *eb));
                    j += 1;
                }
                Ordering::Equal => {
                    out.push((a.clone(), ea + eb));
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&self.0[i..]);
        out.extend_from_slice(&other.0[j..]);
        Monomial(out)
    }

    pub fn checked_div(&self, other: &Monomial) -> Option<Monomial> {
        let mut out = Vec::with_capacity(self.0.len());
        let mut j = 0;
        for (a, ea) in &self.0 {
            if j < other.0.len() {
                let (b, eb) = &other.0[j];
                match a.cmp(b) {
                    Ordering::Greater => return None,
                    Ordering::Equal => {
                        j += 1;
                        if eb > ea {
                            return None;
                        }
                        if ea > eb {
                            out.push((a.clone(), ea - eb));
                        }
                        continue;
                    }
                    Ordering::Less => {}
                }
            }
            out.push((a.clone(), *ea));
        }
        if j < other.0.len() {
            return None;
        }
        Some(Monomial(out))
    }

    pub fn gcd(&self, other: &Monomial) -> Monomial {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            let (a, ea) = &self.0[i];
            let (b, eb) = &other.0[j];
            match a.cmp(b) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    out.push((a.clone(), *ea.min(eb)));
                    i += 1;
                    j += 1;
                }
            }
        }
        Monomial(out)
    }

    /// Term order: graded lex on the plain symbols, ties broken by graded
    /// lex on the function atoms. `sin(u)^2` leads `sin(u)^2 + cos(u)^2 - 1`.
    pub fn graded_cmp(&self, other: &Monomial) -> Ordering {
        let (sa, fa) = self.0.split_at(self.symbol_count());
        let (sb, fb) = other.0.split_at(other.symbol_count());
        graded_lex(sa, sb).then_with(|| graded_lex(fa, fb))
    }

    fn symbol_count(&self) -> usize {
        self.0.iter().take_while(|(a, _)| matches!(a, Atom::Sym(_))).count()
    }

    pub(crate) fn partition(&self, mut pred: impl FnMut(&Atom) -> bool) -> (Monomial, Monomial) {
        let (hit, kept): (Vec<_>, Vec<_>) = self.0.iter().cloned().partition(|(a, _)| pred(a));
        (Monomial(hit), Monomial(kept))
    }

    pub(crate) fn lowered(&self, idx: usize) -> Monomial {
        let mut out = self.0.clone();
        if out[idx].1 == 1 {
            out.remove(idx);
        } else {
            out[idx].1 -= 1;
        }
        Monomial(out)
    }

    // rest of the monomial and the matching cos(u)
    fn split_sin_square(&self) -> Option<(Monomial, Atom)> {
        let idx = self
            .0
            .iter()
            .position(|(a, e)| *e >= 2 && matches!(a, Atom::UnOp(UnOpType::Sin, _)))?;
        let mut rest = self.0.clone();
        let cos = match &rest[idx].0 {
            Atom::UnOp(_, arg) => Atom::UnOp(UnOpType::Cos, arg.clone()),
            Atom::Sym(_) => return None,
        };
        if rest[idx].1 == 2 {
            rest.remove(idx);
        } else {
            rest[idx].1 -= 2;
        }
        Some((Monomial(rest), cos))
    }

    fn has_sin_square(&self) -> bool {
        self.0
            .iter()
            .any(|(a, e)| *e >= 2 && matches!(a, Atom::UnOp(UnOpType::Sin, _)))
    }
}

fn graded_lex(a: &[(Atom, u32)], b: &[(Atom, u32)]) -> Ordering {
    let degree = |f: &[(Atom, u32)]| f.iter().map(|(_, e)| e).sum::<u32>();
    degree(a).cmp(&degree(b)).then_with(|| {
        for ((x, ex), (y, ey)) in a.iter().zip(b) {
            match x.cmp(y) {
                Ordering::Less => return Ordering::Greater,
                Ordering::Greater => return Ordering::Less,
                Ordering::Equal if ex != ey => return ex.cmp(ey),
                Ordering::Equal => {}
            }
        }
        a.len().cmp(&b.len())
    })
}

/// Rewrites every `sin(u)^2` of the term as `1 - cos(u)^2`.
fn reduce_term(m: Monomial, c: Coeff, out: &mut impl FnMut(Monomial, Coeff)) {
    let mut work = vec![(m, c)];
    while let Some((m, c)) = work.pop() {
        match m.split_sin_square() {
            None => out(m, c),
            Some((rest, cos)) => {
                work.push((rest.mul(&Monomial::atom(cos, 2)), -c.clone()));
                work.push((rest, c));
            }
        }
    }
}

#[derive(PartialEq, Eq)]
struct Ranked(Monomial);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.graded_cmp(&other.0)
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Poly {
    terms: BTreeMap<Monomial, Coeff>,
}

impl Poly {
    pub fn zero() -> Self {
        Poly::default()
    }

    pub fn one() -> Self {
        Poly::constant(Coeff::one())
    }

    pub fn constant(c: Coeff) -> Self {
        Poly::term(Monomial::one(), c)
    }

    pub fn term(m: Monomial, c: Coeff) -> Self {
        let mut p = Poly::zero();
        p.add_term(m, c);
        p
    }

    pub fn from_atom(atom: Atom) -> Self {
        Poly::term(Monomial::atom(atom, 1), Coeff::one())
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.as_constant().is_some_and(One::is_one)
    }

    pub fn as_constant(&self) -> Option<&Coeff> {
        match self.terms.len() {
            0 => None,
            1 => self.terms.get(&Monomial::one()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &Coeff)> {
        self.terms.iter()
    }

    pub fn add_term(&mut self, m: Monomial, c: Coeff) {
        if c.is_zero() {
            return;
        }
        match self.terms.get_mut(&m) {
            Some(existing) => {
                *existing += c;
                if existing.is_zero() {
                    self.terms.remove(&m);
                }
            }
            None => {
                self.terms.insert(m, c);
            }
        }
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), c.clone());
        }
        out
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), -c.clone());
        }
        out
    }

    pub fn neg(&self) -> Poly {
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), -c.clone())).collect(),
        }
    }

    pub fn scale(&self, k: &Coeff) -> Poly {
        if k.is_zero() {
            return Poly::zero();
        }
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), c * k)).collect(),
        }
    }

    pub fn mul(&self, other: &Poly) -> Poly {
        let mut out = Poly::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                let m = ma.mul(mb);
                if m.has_sin_square() {
                    reduce_term(m, ca * cb, &mut |m, c| out.add_term(m, c));
                } else {
                    out.add_term(m, ca * cb);
                }
            }
        }
        out
    }

    pub fn pow(&self, k: u32) -> Poly {
        (0..k).fold(Poly::one(), |acc, _| acc.mul(self))
    }

    pub fn reduce_pythagorean(self) -> Poly {
        if !self.terms.keys().any(Monomial::has_sin_square) {
            return self;
        }
        let mut out = Poly::zero();
        for (m, c) in self.terms {
            reduce_term(m, c, &mut |m, c| out.add_term(m, c));
        }
        out
    }

    pub fn leading_term(&self) -> Option<(&Monomial, &Coeff)> {
        self.terms.iter().max_by(|a, b| a.0.graded_cmp(b.0))
    }

    pub fn monomial_content(&self) -> Monomial {
        let mut it = self.terms.keys();
        let first = match it.next() {
            Some(m) => m.clone(),
            None => return Monomial::one(),
        };
        it.fold(first, |acc, m| if acc.is_one() { acc } else { acc.gcd(m) })
    }

    /// Divides every term by `m`, which must divide all of them.
    pub fn div_monomial(&self, m: &Monomial) -> Poly {
        if m.is_one() {
            return self.clone();
        }
        let mut out = Poly::zero();
        for (mm, c) in &self.terms {
            if let Some(q) = mm.checked_div(m) {
                out.add_term(q, c.clone());
            }
        }
        out
    }

    /// Rational `k` such that `self / k` has coprime integer coefficients and
    /// a positive leading coefficient.
    pub fn integer_content(&self) -> Coeff {
        let mut gcd = BigInt::zero();
        let mut lcm = BigInt::one();
        for c in self.terms.values() {
            gcd = gcd.gcd(c.numer());
            lcm = lcm.lcm(c.denom());
        }
        if gcd.is_zero() {
            return Coeff::one();
        }
        let k = Coeff::new(gcd, lcm);
        match self.leading_term() {
            Some((_, lc)) if lc.is_negative() => -k,
            _ => k,
        }
    }

    fn symbol_degrees(&self) -> BTreeMap<&Symbol, u32> {
        let mut out = BTreeMap::new();
        for m in self.terms.keys() {
            for (a, e) in m.factors() {
                if let Atom::Sym(s) = a {
                    let slot = out.entry(s).or_insert(0);
                    *slot = (*slot).max(*e);
                }
            }
        }
        out
    }

    /// Exact quotient `self / d` modulo the Pythagorean identity, or `None`
    /// when none is found.
    ///
    /// The search is complete when the leading monomial of `d` has no `sin`
    /// factor. Otherwise a miss only means the fraction stays uncancelled.
    pub fn div_exact(&self, d: &Poly) -> Option<Poly> {
        let (lm_d, lc_d) = d.leading_term()?;
        if self.is_zero() {
            return Some(Poly::zero());
        }
        if d.len() == 1 {
            let mut out = Poly::zero();
            for (m, c) in &self.terms {
                out.add_term(m.checked_div(lm_d)?, c / lc_d);
            }
            return Some(out);
        }
        // symbols are free, so their degrees add up under multiplication
        let have = self.symbol_degrees();
        if d
            .symbol_degrees()
            .into_iter()
            .any(|(s, e)| have.get(s).map_or(true, |&h| h < e))
        {
            return None;
        }

        let mut rem: BTreeMap<Ranked, Coeff> = self
            .terms
            .iter()
            .map(|(m, c)| (Ranked(m.clone()), c.clone()))
            .collect();
        let mut quot = Poly::zero();
        let budget = 2 * self.len() + 16;
        while let Some((Ranked(lead), lc)) = rem.pop_last() {
            if quot.len() >= budget {
                return None;
            }
            let qm = lead.checked_div(lm_d)?;
            let qc = lc / lc_d;
            for (m, c) in &d.terms {
                if m == lm_d {
                    continue;
                }
                reduce_term(m.mul(&qm), -(c * &qc), &mut |m, c| match rem.entry(Ranked(m)) {
                    Entry::Occupied(mut slot) => {
                        *slot.get_mut() += c;
                        if slot.get().is_zero() {
                            slot.remove();
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(c);
                    }
                });
            }
            quot.add_term(qm, qc);
        }
        Some(quot)
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.terms.keys().flat_map(|m| m.factors().iter().map(|(a, _)| a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::sym;

    fn x() -> Atom {
        Atom::Sym(Symbol::new("x"))
    }

    fn y() -> Atom {
        Atom::Sym(Symbol::new("y"))
    }

    fn int(n: i64) -> Coeff {
        Coeff::from_integer(n.into())
    }

    #[test]
    fn monomial_division() {
        let m = Monomial::atom(x(), 3).mul(&Monomial::atom(y(), 1));
        let d = Monomial::atom(x(), 2);
        assert_eq!(m.checked_div(&d), Some(Monomial::atom(x(), 1).mul(&Monomial::atom(y(), 1))));
        assert_eq!(d.checked_div(&m), None);
        assert_eq!(m.gcd(&d), d);
    }

    #[test]
    fn exact_division_of_difference_of_squares() {
        let px = Poly::from_atom(x());
        let py = Poly::from_atom(y());
        let num = px.mul(&px).sub(&py.mul(&py));
        let den = px.sub(&py);
        assert_eq!(num.div_exact(&den), Some(px.add(&py)));
        assert_eq!(den.div_exact(&num), None);
    }

    #[test]
    fn pythagorean_reduction() {
        let s = Poly::from_atom(Atom::UnOp(UnOpType::Sin, sym("u")));
        let c = Poly::from_atom(Atom::UnOp(UnOpType::Cos, sym("u")));
        let one = s.mul(&s).add(&c.mul(&c));
        assert!(one.is_one());
        let quartic = s.mul(&s).mul(&s.mul(&s));
        let expected = Poly::one()
            .sub(&c.mul(&c).scale(&int(2)))
            .add(&c.mul(&c).mul(&c.mul(&c)));
        assert_eq!(quartic, expected);
    }

    #[test]
    fn exact_division_modulo_pythagoras() {
        let m = Poly::from_atom(Atom::Sym(Symbol::new("m")));
        let s = Poly::from_atom(Atom::UnOp(UnOpType::Sin, sym("u")));
        let c = Poly::from_atom(Atom::UnOp(UnOpType::Cos, sym("v")));
        // m·sin(u) + sin(u)^2 is stored as m·sin(u) + 1 - cos(u)^2
        let d = m.add(&s);
        assert_eq!(s.mul(&d).div_exact(&d), Some(s.clone()));

        let d = m.mul(&m).add(&s.mul(&c)).add(&Poly::one());
        let cube = d.pow(3);
        assert_eq!(cube.div_exact(&d), Some(d.pow(2)));
        assert_eq!(cube.div_exact(&d.pow(2)), Some(d.clone()));
        assert_eq!(d.div_exact(&cube), None);
    }

    #[test]
    fn integer_content_fixes_sign_and_scale() {
        let px = Poly::from_atom(x());
        let py = Poly::from_atom(y());
        let p = px.scale(&Coeff::new((-1).into(), 2.into())).add(&py.scale(&Coeff::new(1.into(), 3.into())));
        let k = p.integer_content();
        assert_eq!(k, Coeff::new((-1).into(), 6.into()));
        assert_eq!(p.scale(&k.recip()), px.scale(&int(3)).sub(&py.scale(&int(2))));
    }

    #[test]
    fn symbols_outrank_functions() {
        let s = Monomial::atom(Atom::UnOp(UnOpType::Sin, sym("u")), 3);
        assert_eq!(Monomial::atom(x(), 1).graded_cmp(&s), Ordering::Greater);
        let c = Monomial::atom(Atom::UnOp(UnOpType::Cos, sym("u")), 2);
        assert_eq!(Monomial::atom(Atom::UnOp(UnOpType::Sin, sym("u")), 2).graded_cmp(&c), Ordering::Greater);
    }

    #[test]
    fn graded_order_prefers_degree() {
        let a = Monomial::atom(x(), 2);
        let b = Monomial::atom(x(), 1).mul(&Monomial::atom(y(), 1));
        let c = Monomial::atom(y(), 1);
        assert_eq!(c.graded_cmp(&a), Ordering::Less);
        assert_eq!(a.graded_cmp(&b), Ordering::Greater);
    }
}

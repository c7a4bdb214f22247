//! Canonical symbolic expressions.
//!
//! An [`Expr`] is an immutable, reference-counted rational function whose
//! numerator and denominator are [`Poly`]s over [`Atom`]s. Every constructor
//! and operator returns the canonical form, so structurally equal values are
//! equal and `a - b` is exactly zero whenever `a` and `b` agree up to the
//! supported identities (field arithmetic, angle addition, Pythagoras).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::iter::{Product, Sum};
use std::ops::Neg;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::AlgebraError;
use crate::poly::{Atom, Coeff, Monomial, Poly, UnOpType};
use crate::symbol::Symbol;
use crate::trig;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expr(Rc<Frac>);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Frac {
    num: Poly,
    den: Poly,
}

pub fn sym(name: &str) -> Expr {
    Expr::symbol(Symbol::new(name))
}

pub fn c(val: i64) -> Expr {
    Expr::int(val)
}

pub fn rat(n: i64, d: i64) -> Expr {
    Expr::rational(n, d)
}

impl Expr {
    pub fn zero() -> Self {
        Expr::from_poly(Poly::zero())
    }

    pub fn one() -> Self {
        Expr::from_poly(Poly::one())
    }

    pub fn int(val: i64) -> Self {
        Expr::from_coeff(Coeff::from_integer(BigInt::from(val)))
    }

    /// Panics if `d == 0`.
    pub fn rational(n: i64, d: i64) -> Self {
        assert!(d != 0, "rational constant with zero denominator");
        Expr::from_coeff(Coeff::new(BigInt::from(n), BigInt::from(d)))
    }

    pub fn from_coeff(c: Coeff) -> Self {
        Expr::from_poly(Poly::constant(c))
    }

    pub fn symbol(s: Symbol) -> Self {
        Expr::atom(Atom::Sym(s))
    }

    pub(crate) fn atom(a: Atom) -> Self {
        Expr::from_poly(Poly::from_atom(a))
    }

    pub(crate) fn from_poly(num: Poly) -> Self {
        Expr(Rc::new(Frac { num, den: Poly::one() }))
    }

    pub(crate) fn num_poly(&self) -> &Poly {
        &self.0.num
    }

    pub(crate) fn den_poly(&self) -> &Poly {
        &self.0.den
    }

    pub fn numer(&self) -> Expr {
        Expr::from_poly(self.0.num.clone())
    }

    pub fn denom(&self) -> Expr {
        Expr::from_poly(self.0.den.clone())
    }

    pub fn is_zero(&self) -> bool {
        self.0.num.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.den.is_one() && self.0.num.is_one()
    }

    pub fn is_polynomial(&self) -> bool {
        self.0.den.is_one()
    }

    pub fn as_rational(&self) -> Option<Coeff> {
        if !self.0.den.is_one() {
            return None;
        }
        if self.0.num.is_zero() {
            return Some(Coeff::zero());
        }
        self.0.num.as_constant().cloned()
    }

    pub fn as_symbol(&self) -> Option<Symbol> {
        if !self.0.den.is_one() || self.0.num.len() != 1 {
            return None;
        }
        let (m, k) = self.0.num.terms().next()?;
        match m.factors() {
            [(Atom::Sym(s), 1)] if k.is_one() => Some(s.clone()),
            _ => None,
        }
    }

    /// Mathematical equality, insensitive to uncancelled common factors.
    pub fn equiv(&self, other: &Expr) -> bool {
        self == other || sub(self, other).is_zero()
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    pub(crate) fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        for atom in self.0.num.atoms().chain(self.0.den.atoms()) {
            match atom {
                Atom::Sym(s) => {
                    out.insert(s.clone());
                }
                Atom::UnOp(_, arg) => arg.collect_symbols(out),
            }
        }
    }

    pub fn depends_on(&self, s: &Symbol) -> bool {
        self.0
            .num
            .atoms()
            .chain(self.0.den.atoms())
            .any(|atom| atom.depends_on(s))
    }

    pub fn checked_div(&self, rhs: &Expr) -> Option<Expr> {
        Some(mul(self, &rhs.recip()?))
    }

    pub fn recip(&self) -> Option<Expr> {
        if self.is_zero() {
            return None;
        }
        Some(normalize(self.0.den.clone(), self.0.num.clone()))
    }

    pub fn powi(&self, n: i32) -> Expr {
        if n < 0 {
            let inv = self.recip().unwrap_or_else(|| panic!("zero raised to negative power {n}"));
            return inv.powi(-n);
        }
        let mut result = Expr::one();
        let mut base = self.clone();
        let mut k = n as u32;
        while k > 0 {
            if k & 1 == 1 {
                result = mul(&result, &base);
            }
            k >>= 1;
            if k > 0 {
                base = mul(&base, &base);
            }
        }
        result
    }

    pub fn sin(&self) -> Expr {
        trig::sin(self)
    }

    pub fn cos(&self) -> Expr {
        trig::cos(self)
    }

    pub fn exp(&self) -> Expr {
        if self.is_zero() {
            return Expr::one();
        }
        Expr::atom(Atom::UnOp(UnOpType::Exp, self.clone()))
    }

    pub fn ln(&self) -> Expr {
        if self.is_one() {
            return Expr::zero();
        }
        Expr::atom(Atom::UnOp(UnOpType::Log, self.clone()))
    }

    pub fn diff(&self, s: &Symbol) -> Expr {
        if !self.depends_on(s) {
            return Expr::zero();
        }
        self.derive_with(&mut |x: &Symbol| if x == s { Expr::one() } else { Expr::zero() })
    }

    /// Total derivative by the chain rule: every symbol `x` contributes
    /// `∂self/∂x · dsym(x)`.
    pub fn derive_with<F>(&self, dsym: &mut F) -> Expr
    where
        F: FnMut(&Symbol) -> Expr,
    {
        let mut cache = HashMap::new();
        self.derive_cached(dsym, &mut cache)
    }

    fn derive_cached<F>(&self, dsym: &mut F, cache: &mut HashMap<Atom, Expr>) -> Expr
    where
        F: FnMut(&Symbol) -> Expr,
    {
        let dnum = derive_poly(&self.0.num, dsym, cache);
        if self.0.den.is_one() {
            return dnum;
        }
        let dden = derive_poly(&self.0.den, dsym, cache);
        if dden.is_zero() {
            return mul(&dnum, &normalize(Poly::one(), self.0.den.clone()));
        }
        // (n' d - n d') / d^2
        let n = self.numer();
        let d = self.denom();
        let top = sub(&mul(&dnum, &d), &mul(&n, &dden));
        div(&top, &mul(&d, &d))
    }

    pub fn subs(&self, map: &Substitution) -> Expr {
        if map.is_empty() {
            return self.clone();
        }
        let mut cache = HashMap::new();
        self.subs_cached(map, &mut cache)
    }

    fn subs_cached(&self, map: &Substitution, cache: &mut HashMap<Atom, Expr>) -> Expr {
        let touched = self
            .0
            .num
            .atoms()
            .chain(self.0.den.atoms())
            .any(|atom| map.touches(atom));
        if !touched {
            return self.clone();
        }
        let num = subs_poly(&self.0.num, map, cache);
        if self.0.den.is_one() {
            return num;
        }
        let den = subs_poly(&self.0.den, map, cache);
        div(&num, &den)
    }

    /// Expensive cancellation pass: simplifies function arguments and removes
    /// polynomial factors shared by numerator and denominator.
    pub fn simplify(&self) -> Expr {
        let mut changed = false;
        let mut map: HashMap<Atom, Expr> = HashMap::new();
        for atom in self.0.num.atoms().chain(self.0.den.atoms()) {
            if let Atom::UnOp(op, arg) = atom {
                let simple = arg.simplify();
                if simple != *arg {
                    changed = true;
                    map.insert(atom.clone(), apply_unop(*op, &simple));
                }
            }
        }
        let base = if changed {
            let num = rebuild_poly(&self.0.num, &map);
            let den = rebuild_poly(&self.0.den, &map);
            div(&num, &den)
        } else {
            self.clone()
        };
        if base.0.den.is_one() {
            return base;
        }
        cancel_common_factors(&base)
    }

    /// Cancels every power of the polynomial `factor` shared by numerator
    /// and denominator.
    pub fn cancel_factor(&self, factor: &Expr) -> Expr {
        let f = factor.num_poly();
        if self.0.den.is_one() || f.is_zero() || f.as_constant().is_some() {
            return self.clone();
        }
        let (mut num, mut den) = (self.0.num.clone(), self.0.den.clone());
        let mut hits = 0;
        while let Some(qd) = den.div_exact(f) {
            match num.div_exact(f) {
                Some(qn) => {
                    num = qn;
                    den = qd;
                    hits += 1;
                }
                None => break,
            }
        }
        if hits == 0 {
            return self.clone();
        }
        normalize(num, den)
    }

    pub fn eval(&self, values: &HashMap<Symbol, f64>) -> Result<f64, AlgebraError> {
        let num = eval_poly(&self.0.num, values)?;
        let den = eval_poly(&self.0.den, values)?;
        let val = num / den;
        if !val.is_finite() {
            return Err(AlgebraError::NonFinite(self.to_string()));
        }
        Ok(val)
    }
}

pub(crate) fn apply_unop(op: UnOpType, arg: &Expr) -> Expr {
    match op {
        UnOpType::Sin => arg.sin(),
        UnOpType::Cos => arg.cos(),
        UnOpType::Exp => arg.exp(),
        UnOpType::Log => arg.ln(),
    }
}

fn normalize(mut num: Poly, mut den: Poly) -> Expr {
    assert!(!den.is_zero(), "division by zero");
    if num.is_zero() {
        return Expr::zero();
    }
    if let Some(k) = den.as_constant() {
        return Expr::from_poly(num.scale(&k.recip()));
    }
    let common = num.monomial_content().gcd(&den.monomial_content());
    if !common.is_one() {
        num = num.div_monomial(&common);
        den = den.div_monomial(&common);
    }
    if let Some(k) = den.as_constant() {
        return Expr::from_poly(num.scale(&k.recip()));
    }
    if den.len() > 1 {
        if let Some(q) = num.div_exact(&den) {
            return Expr::from_poly(q);
        }
        if num.len() > 1 {
            if let Some(q) = den.div_exact(&num) {
                num = Poly::one();
                den = q;
                if let Some(k) = den.as_constant() {
                    return Expr::from_poly(num.scale(&k.recip()));
                }
            }
        }
    }
    // integer denominator coefficients, positive leading term
    let k = den.integer_content();
    if !k.is_one() {
        let inv = k.recip();
        num = num.scale(&inv);
        den = den.scale(&inv);
    }
    Expr(Rc::new(Frac { num, den }))
}

/// Sum of fractions grouped by denominator, so that terms over the same
/// denominator are added as plain polynomials and normalized once.
#[derive(Default)]
struct FracSum(BTreeMap<Poly, Poly>);

impl FracSum {
    fn push_poly(&mut self, num: &Poly, den: &Poly) {
        if num.is_zero() {
            return;
        }
        let slot = self.0.entry(den.clone()).or_default();
        for (m, k) in num.terms() {
            slot.add_term(m.clone(), k.clone());
        }
    }

    fn push(&mut self, e: &Expr) {
        self.push_poly(&e.0.num, &e.0.den);
    }

    /// Adds `factor · e`.
    fn push_scaled(&mut self, factor: &Poly, e: &Expr) {
        if e.is_zero() {
            return;
        }
        self.push_poly(&factor.mul(&e.0.num), &e.0.den);
    }

    fn finish(self) -> Expr {
        let mut parts: Vec<Expr> = self
            .0
            .into_iter()
            .filter(|(_, num)| !num.is_zero())
            .map(|(den, num)| normalize(num, den))
            .collect();
        parts.sort_by_key(|e| e.0.den.len());
        parts.iter().fold(Expr::zero(), |acc, e| add(&acc, e))
    }
}

pub fn add(lhs: &Expr, rhs: &Expr) -> Expr {
    if lhs.is_zero() {
        return rhs.clone();
    }
    if rhs.is_zero() {
        return lhs.clone();
    }
    let (a, b) = (&*lhs.0, &*rhs.0);
    if a.den == b.den {
        return normalize(a.num.add(&b.num), a.den.clone());
    }
    if a.den.is_one() {
        return normalize(a.num.mul(&b.den).add(&b.num), b.den.clone());
    }
    if b.den.is_one() {
        return normalize(a.num.add(&b.num.mul(&a.den)), a.den.clone());
    }
    if let Some(q) = a.den.div_exact(&b.den) {
        return normalize(a.num.add(&b.num.mul(&q)), a.den.clone());
    }
    if let Some(q) = b.den.div_exact(&a.den) {
        return normalize(a.num.mul(&q).add(&b.num), b.den.clone());
    }
    normalize(
        a.num.mul(&b.den).add(&b.num.mul(&a.den)),
        a.den.mul(&b.den),
    )
}

pub fn sub(lhs: &Expr, rhs: &Expr) -> Expr {
    add(lhs, &neg(rhs))
}

pub fn neg(e: &Expr) -> Expr {
    if e.is_zero() {
        return e.clone();
    }
    Expr(Rc::new(Frac {
        num: e.0.num.neg(),
        den: e.0.den.clone(),
    }))
}

pub fn mul(lhs: &Expr, rhs: &Expr) -> Expr {
    if lhs.is_zero() || rhs.is_zero() {
        return Expr::zero();
    }
    let (a, b) = (&*lhs.0, &*rhs.0);
    if a.den.is_one() && b.den.is_one() {
        return Expr::from_poly(a.num.mul(&b.num));
    }
    let (mut n1, mut d1) = (a.num.clone(), a.den.clone());
    let (mut n2, mut d2) = (b.num.clone(), b.den.clone());
    if d2.len() > 1 {
        if let Some(q) = n1.div_exact(&d2) {
            n1 = q;
            d2 = Poly::one();
        }
    }
    if d1.len() > 1 {
        if let Some(q) = n2.div_exact(&d1) {
            n2 = q;
            d1 = Poly::one();
        }
    }
    normalize(n1.mul(&n2), d1.mul(&d2))
}

/// Panics on an exact zero divisor; see [`Expr::checked_div`].
pub fn div(lhs: &Expr, rhs: &Expr) -> Expr {
    match rhs.recip() {
        Some(inv) => mul(lhs, &inv),
        None => panic!("division by zero: ({lhs}) / 0"),
    }
}

fn derive_poly<F>(p: &Poly, dsym: &mut F, cache: &mut HashMap<Atom, Expr>) -> Expr
where
    F: FnMut(&Symbol) -> Expr,
{
    let mut poly_part = Poly::zero();
    let mut sum = FracSum::default();
    for (m, k) in p.terms() {
        for (idx, (atom, e)) in m.factors().iter().enumerate() {
            let da = derive_atom(atom, dsym, cache);
            if da.is_zero() {
                continue;
            }
            let factor = k * Coeff::from_integer(BigInt::from(*e));
            let rest = m.lowered(idx);
            if da.is_polynomial() {
                for (dm, dk) in da.num_poly().terms() {
                    poly_part.add_term(rest.mul(dm), dk * &factor);
                }
            } else {
                sum.push_scaled(&Poly::term(rest, factor), &da);
            }
        }
    }
    sum.push_poly(&poly_part.reduce_pythagorean(), &Poly::one());
    sum.finish()
}

fn derive_atom<F>(atom: &Atom, dsym: &mut F, cache: &mut HashMap<Atom, Expr>) -> Expr
where
    F: FnMut(&Symbol) -> Expr,
{
    if let Some(hit) = cache.get(atom) {
        return hit.clone();
    }
    let out = match atom {
        Atom::Sym(s) => dsym(s),
        Atom::UnOp(op, arg) => {
            let darg = arg.derive_cached(dsym, cache);
            if darg.is_zero() {
                Expr::zero()
            } else {
                match op {
                    UnOpType::Sin => mul(&arg.cos(), &darg),
                    UnOpType::Cos => neg(&mul(&arg.sin(), &darg)),
                    UnOpType::Exp => mul(&Expr::atom(atom.clone()), &darg),
                    UnOpType::Log => div(&darg, arg),
                }
            }
        }
    };
    cache.insert(atom.clone(), out.clone());
    out
}

fn subs_poly(p: &Poly, map: &Substitution, cache: &mut HashMap<Atom, Expr>) -> Expr {
    // collect the terms by their substituted factors, so every distinct
    // product of replacements is built once
    let mut groups: BTreeMap<Monomial, Poly> = BTreeMap::new();
    for (m, k) in p.terms() {
        let (hit, kept) = m.partition(|atom| map.touches(atom));
        groups.entry(hit).or_default().add_term(kept, k.clone());
    }
    let mut sum = FracSum::default();
    for (hit, rest) in groups {
        let mut value = Expr::one();
        for (atom, e) in hit.factors() {
            let v = match cache.get(atom) {
                Some(v) => v.clone(),
                None => {
                    let v = subs_atom(atom, map, cache);
                    cache.insert(atom.clone(), v.clone());
                    v
                }
            };
            value = mul(&value, &v.powi(*e as i32));
            if value.is_zero() {
                break;
            }
        }
        sum.push_scaled(&rest, &value);
    }
    sum.finish()
}

fn subs_atom(atom: &Atom, map: &Substitution, cache: &mut HashMap<Atom, Expr>) -> Expr {
    match atom {
        Atom::Sym(s) => map.get(s).cloned().unwrap_or_else(|| Expr::symbol(s.clone())),
        Atom::UnOp(op, arg) => {
            if !map.touches(atom) {
                return Expr::atom(atom.clone());
            }
            apply_unop(*op, &arg.subs_cached(map, cache))
        }
    }
}

fn rebuild_poly(p: &Poly, map: &HashMap<Atom, Expr>) -> Expr {
    let mut sum = FracSum::default();
    for (m, k) in p.terms() {
        let (hit, kept) = m.partition(|atom| map.contains_key(atom));
        let mut value = Expr::one();
        for (atom, e) in hit.factors() {
            value = mul(&value, &map[atom].powi(*e as i32));
        }
        sum.push_scaled(&Poly::term(kept, k.clone()), &value);
    }
    sum.finish()
}

/// Removes shared polynomial factors found among the coefficient polynomials
/// of the denominator viewed as univariate in each of its atoms.
fn cancel_common_factors(e: &Expr) -> Expr {
    let mut num = e.0.num.clone();
    let mut den = e.0.den.clone();
    loop {
        let mut progressed = false;
        for cand in factor_candidates(&den) {
            if cand.len() < 2 {
                continue;
            }
            if let (Some(qn), Some(qd)) = (num.div_exact(&cand), den.div_exact(&cand)) {
                num = qn;
                den = qd;
                progressed = true;
                break;
            }
        }
        if !progressed || den.is_one() {
            break;
        }
    }
    normalize(num, den)
}

fn factor_candidates(p: &Poly) -> Vec<Poly> {
    let atoms: BTreeSet<&Atom> = p.atoms().collect();
    let mut out: Vec<Poly> = Vec::new();
    for atom in atoms {
        let mut by_power: BTreeMap<u32, Poly> = BTreeMap::new();
        for (m, k) in p.terms() {
            let mut rest = Vec::new();
            let mut power = 0;
            for (a, e) in m.factors() {
                if a == atom {
                    power = *e;
                } else {
                    rest.push((a.clone(), *e));
                }
            }
            let rest = rest
                .into_iter()
                .fold(Monomial::one(), |acc, (a, e)| acc.mul(&Monomial::atom(a, e)));
            by_power.entry(power).or_default().add_term(rest, k.clone());
        }
        if by_power.len() < 2 {
            continue;
        }
        for coeff in by_power.into_values() {
            let content = coeff.monomial_content();
            let prim = coeff.div_monomial(&content);
            if prim.is_zero() {
                continue;
            }
            let prim = prim.scale(&prim.integer_content().recip());
            if !out.contains(&prim) {
                out.push(prim);
            }
        }
    }
    out.push(p.clone());
    out
}

fn eval_poly(p: &Poly, values: &HashMap<Symbol, f64>) -> Result<f64, AlgebraError> {
    let mut total = 0.0;
    for (m, k) in p.terms() {
        let mut term = k.to_f64().unwrap_or(f64::NAN);
        for (atom, e) in m.factors() {
            term *= eval_atom(atom, values)?.powi(*e as i32);
        }
        total += term;
    }
    Ok(total)
}

fn eval_atom(atom: &Atom, values: &HashMap<Symbol, f64>) -> Result<f64, AlgebraError> {
    match atom {
        Atom::Sym(s) => values
            .get(s)
            .copied()
            .ok_or_else(|| AlgebraError::UnboundSymbol(s.name().to_string())),
        Atom::UnOp(op, arg) => {
            let x = arg.eval(values)?;
            Ok(match op {
                UnOpType::Sin => x.sin(),
                UnOpType::Cos => x.cos(),
                UnOpType::Exp => x.exp(),
                UnOpType::Log => x.ln(),
            })
        }
    }
}

/// Symbol to expression mapping applied by [`Expr::subs`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Substitution(BTreeMap<Symbol, Expr>);

impl Substitution {
    pub fn new() -> Self {
        Substitution::default()
    }

    pub fn insert(&mut self, s: Symbol, value: Expr) {
        self.0.insert(s, value);
    }

    pub fn with(mut self, s: Symbol, value: Expr) -> Self {
        self.insert(s, value);
        self
    }

    pub fn get(&self, s: &Symbol) -> Option<&Expr> {
        self.0.get(s)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn touches(&self, atom: &Atom) -> bool {
        match atom {
            Atom::Sym(s) => self.0.contains_key(s),
            Atom::UnOp(_, arg) => arg
                .num_poly()
                .atoms()
                .chain(arg.den_poly().atoms())
                .any(|a| self.touches(a)),
        }
    }
}

impl FromIterator<(Symbol, Expr)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (Symbol, Expr)>>(iter: I) -> Self {
        Substitution(iter.into_iter().collect())
    }
}

/// Maps every symbol to zero.
pub fn zip0<'a, I>(symbols: I) -> Substitution
where
    I: IntoIterator<Item = &'a Symbol>,
{
    symbols.into_iter().map(|s| (s.clone(), Expr::zero())).collect()
}

macro_rules! gen_binop_impls {
    ($($trait:ident : $method:ident => $func:ident),* $(,)?) => {
        $(
            impl std::ops::$trait<Expr> for Expr {
                type Output = Expr;
                fn $method(self, rhs: Expr) -> Expr {
                    $func(&self, &rhs)
                }
            }

            impl<'a> std::ops::$trait<&'a Expr> for Expr {
                type Output = Expr;
                fn $method(self, rhs: &'a Expr) -> Expr {
                    $func(&self, rhs)
                }
            }

            impl<'a> std::ops::$trait<Expr> for &'a Expr {
                type Output = Expr;
                fn $method(self, rhs: Expr) -> Expr {
                    $func(self, &rhs)
                }
            }

            impl<'a, 'b> std::ops::$trait<&'b Expr> for &'a Expr {
                type Output = Expr;
                fn $method(self, rhs: &'b Expr) -> Expr {
                    $func(self, rhs)
                }
            }

            impl std::ops::$trait<i64> for Expr {
                type Output = Expr;
                fn $method(self, rhs: i64) -> Expr {
                    $func(&self, &Expr::int(rhs))
                }
            }

            impl<'a> std::ops::$trait<i64> for &'a Expr {
                type Output = Expr;
                fn $method(self, rhs: i64) -> Expr {
                    $func(self, &Expr::int(rhs))
                }
            }

            impl std::ops::$trait<Expr> for i64 {
                type Output = Expr;
                fn $method(self, rhs: Expr) -> Expr {
                    $func(&Expr::int(self), &rhs)
                }
            }

            impl<'a> std::ops::$trait<&'a Expr> for i64 {
                type Output = Expr;
                fn $method(self, rhs: &'a Expr) -> Expr {
                    $func(&Expr::int(self), rhs)
                }
            }
        )*
    };
}

gen_binop_impls! {
    Add: add => add,
    Sub: sub => sub,
    Mul: mul => mul,
    Div: div => div,
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        neg(&self)
    }
}

impl<'a> Neg for &'a Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        neg(self)
    }
}

impl From<i64> for Expr {
    fn from(val: i64) -> Self {
        Expr::int(val)
    }
}

impl Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        let mut sum = FracSum::default();
        iter.for_each(|e| sum.push(&e));
        sum.finish()
    }
}

impl<'a> Sum<&'a Expr> for Expr {
    fn sum<I: Iterator<Item = &'a Expr>>(iter: I) -> Expr {
        let mut sum = FracSum::default();
        iter.for_each(|e| sum.push(e));
        sum.finish()
    }
}

impl Product for Expr {
    fn product<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        iter.fold(Expr::one(), |acc, e| mul(&acc, &e))
    }
}

pub(crate) fn has_negative_lead(e: &Expr) -> bool {
    e.num_poly()
        .leading_term()
        .is_some_and(|(_, k)| k.is_negative())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_canonical() {
        let (x, y) = (sym("x"), sym("y"));
        assert_eq!(&x + &y - &x, y);
        assert_eq!((&x + &y) * (&x - &y), &x * &x - &y * &y);
        assert_eq!(&x * 2 / 2, x);
        assert!((&x - &x).is_zero());
        assert_eq!(rat(1, 2) + rat(1, 2), c(1));
    }

    #[test]
    fn fractions_cancel() {
        let (x, y) = (sym("x"), sym("y"));
        let q = (&x * &x - &y * &y) / (&x - &y);
        assert_eq!(q, &x + &y);
        let r = (&x * &y) / (&x * &x);
        assert_eq!(r, &y / &x);
        assert_eq!(r.denom(), x);
        assert!((&y / &x * &x).equiv(&y));
    }

    #[test]
    fn symbol_queries() {
        let x = sym("x");
        assert_eq!(x.as_symbol(), Some(Symbol::new("x")));
        assert_eq!((&x * 2).as_symbol(), None);
        assert_eq!(c(3).as_rational(), Some(Coeff::from_integer(3.into())));
        let e = (&x + sym("y")).sin() / sym("z");
        let names: Vec<_> = e.free_symbols().into_iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, ["x", "y", "z"]);
    }

    #[test]
    fn partial_derivatives() {
        let (x, y) = (sym("x"), sym("y"));
        let xs = Symbol::new("x");
        assert_eq!((&x * &x * &y).diff(&xs), 2 * &x * &y);
        assert_eq!(x.sin().diff(&xs), x.cos());
        assert_eq!((&x * &y).cos().diff(&xs), -(&y * (&x * &y).sin()));
        assert_eq!((1 / &x).diff(&xs), -1 / (&x * &x));
        assert_eq!(x.ln().diff(&xs), 1 / &x);
        assert_eq!(y.exp().diff(&xs), c(0));
    }

    #[test]
    fn substitution() {
        let (x, y) = (sym("x"), sym("y"));
        let map = Substitution::new().with(Symbol::new("x"), &y + 1);
        assert_eq!((&x * &x).subs(&map), &y * &y + 2 * &y + 1);
        assert_eq!(x.sin().subs(&map), (&y + 1).sin());
        let zero = zip0(&[Symbol::new("y")]);
        assert_eq!((&x * &y + &x).subs(&zero), x);
    }

    #[test]
    fn trig_identities_vanish() {
        let (p, q) = (sym("p"), sym("q"));
        let pyth = p.sin().powi(2) + p.cos().powi(2);
        assert_eq!(pyth, c(1));
        let sum = (&p + &q).sin() - (p.sin() * q.cos() + p.cos() * q.sin());
        assert!(sum.is_zero());
        assert_eq!((-&p).sin(), -p.sin());
        assert_eq!((-&p).cos(), p.cos());
        assert!(((2 * &p).sin() - 2 * p.sin() * p.cos()).is_zero());
    }

    #[test]
    fn simplify_cancels_polynomial_factor() {
        let (a, b, x) = (sym("a"), sym("b"), sym("x"));
        let factor = &a + &b;
        let num = &factor * (&x + 1);
        let den = &factor * (&x * &x + 3);
        let e = num / den;
        let s = e.simplify();
        assert!(s.equiv(&((&x + 1) / (&x * &x + 3))));
        assert_eq!(s, (&x + 1) / (&x * &x + 3));
    }

    #[test]
    fn numeric_evaluation() {
        let (x, y) = (sym("x"), sym("y"));
        let e = &x * y.cos() / 2;
        let values: HashMap<Symbol, f64> =
            [(Symbol::new("x"), 3.0), (Symbol::new("y"), 0.0)].into_iter().collect();
        assert_eq!(e.eval(&values), Ok(1.5));
        assert!(matches!(
            sym("z").eval(&values),
            Err(AlgebraError::UnboundSymbol(name)) if name == "z"
        ));
    }

    #[test]
    fn denominators_have_integer_content() {
        let (x, y) = (sym("x"), sym("y"));
        let e = 1 / (&x / 2 + &y);
        assert_eq!(e.numer(), c(2));
        assert_eq!(e.denom(), &x + 2 * &y);
        let flipped = 1 / (-&x / 3 - &y);
        assert_eq!(flipped.numer(), c(-3));
        assert_eq!(flipped.denom(), &x + 3 * &y);
        assert_eq!(e.to_string(), "2/(x + 2*y)");
    }

    #[test]
    fn grouped_sums_and_substitutions() {
        let (x, y, z, a) = (sym("x"), sym("y"), sym("z"), sym("a"));
        let d = &a + 1;
        let parts = vec![&y / &d, &z / &d, c(1), -(&y / &d)];
        let total: Expr = parts.iter().sum();
        assert_eq!(total, (&z + &d) / &d);
        let map = Substitution::new().with(Symbol::new("x"), 1 / &d);
        let e = &x * &y + &x * &z + &x * &x;
        let expected = (&y + &z) / &d + 1 / (&d * &d);
        assert_eq!(e.subs(&map), expected);
        assert_eq!(e.subs(&map).denom(), &d * &d);
    }

    #[test]
    fn cancel_factor_removes_shared_powers() {
        let (x, y, p) = (sym("x"), sym("y"), sym("p"));
        let f = &x * p.cos() + &y;
        let num = f.num_poly().pow(2).mul((&x + 1).num_poly());
        let den = f.num_poly().pow(3).mul((&y + 2).num_poly());
        let raw = normalize(num, den);
        let cancelled = raw.cancel_factor(&f);
        assert_eq!(cancelled, (&x + 1) / (&f * (&y + 2)));
        assert!(cancelled.equiv(&raw));
        assert_eq!((&x / &y).cancel_factor(&f), &x / &y);
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn division_by_zero_panics() {
        let _ = sym("x") / c(0);
    }
}

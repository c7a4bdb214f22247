//! Time derivatives of expressions whose base variables implicitly depend on time.
//!
//! A [`DerivativeTable`] hands out one symbol per (variable, order) pair and
//! remembers the derivative chain `x -> xdot -> xddot -> ...`, so equations
//! built at different times stay structurally comparable. Tables are plain
//! values owned by a derivation context; nothing is shared globally.

use std::collections::HashMap;

use tracing::trace;

use crate::expr::Expr;
use crate::matrix::Matrix;
use crate::symbol::{split_index, Symbol};

/// Derivative edges between the entries of `fullvars`.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DiffGraph {
    pub to: Vec<Option<usize>>,
    pub from: Vec<Option<usize>>,
}

#[derive(Default, Debug, Clone)]
pub struct DerivativeTable {
    fullvars: Vec<Symbol>, // base variables and their derivatives
    index: HashMap<Symbol, usize>,
    var_diff: DiffGraph,
}

/// Values whose entries can be mapped expression by expression.
pub trait Symbolic: Clone {
    fn map_exprs(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> Self;
}

impl Symbolic for Expr {
    fn map_exprs(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> Self {
        f(self)
    }
}

impl Symbolic for Matrix {
    fn map_exprs(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> Self {
        self.map(|e| f(e))
    }
}

/// `p1` -> `pdot1`, `pddot1`, ...; `x` -> `xdot`, `xddot`, ...
pub fn derivative_name(base: &str, order: usize) -> String {
    let (stem, digits) = split_index(base);
    format!("{stem}{}dot{digits}", "d".repeat(order.saturating_sub(1)))
}

impl DerivativeTable {
    pub fn new() -> Self {
        DerivativeTable::default()
    }

    pub fn len(&self) -> usize {
        self.fullvars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fullvars.is_empty()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.fullvars
    }

    pub fn diff_graph(&self) -> &DiffGraph {
        &self.var_diff
    }

    fn intern(&mut self, s: &Symbol) -> usize {
        if let Some(&idx) = self.index.get(s) {
            return idx;
        }
        self.push(s.clone(), None)
    }

    fn push(&mut self, s: Symbol, from: Option<usize>) -> usize {
        let idx = self.fullvars.len();
        self.index.insert(s.clone(), idx);
        self.fullvars.push(s);
        self.var_diff.to.push(None);
        self.var_diff.from.push(from);
        idx
    }

    fn root(&self, mut idx: usize) -> (usize, usize) {
        let mut order = 0;
        while let Some(prev) = self.var_diff.from[idx] {
            idx = prev;
            order += 1;
        }
        (idx, order)
    }

    /// Index of the derivative of `fullvars[idx]`, created on demand.
    fn next(&mut self, idx: usize) -> usize {
        if let Some(d) = self.var_diff.to[idx] {
            return d;
        }
        let (root, order) = self.root(idx);
        let mut name = derivative_name(self.fullvars[root].name(), order + 1);
        let mut sym = Symbol::new(&name);
        while self.index.contains_key(&sym) {
            name.push('_');
            sym = Symbol::new(&name);
        }
        trace!(base = %self.fullvars[root], order = order + 1, symbol = %sym, "new derivative symbol");
        let d = self.push(sym, Some(idx));
        self.var_diff.to[idx] = Some(d);
        d
    }

    /// Registers `base_vars` as base variables, so that no derivative symbol
    /// created afterwards reuses one of their names.
    pub fn declare(&mut self, base_vars: &[Symbol]) {
        for s in base_vars {
            self.intern(s);
        }
    }

    /// The symbol for the `order`-th derivative of `base`, registering it if needed.
    pub fn derivative_of(&mut self, base: &Symbol, order: usize) -> Symbol {
        let mut idx = self.intern(base);
        for _ in 0..order {
            idx = self.next(idx);
        }
        self.fullvars[idx].clone()
    }

    pub fn lookup(&self, base: &Symbol, order: usize) -> Option<Symbol> {
        let mut idx = *self.index.get(base)?;
        for _ in 0..order {
            idx = self.var_diff.to[idx]?;
        }
        Some(self.fullvars[idx].clone())
    }

    /// The variable `s` is a derivative of, if it was registered as one.
    pub fn base_of(&self, s: &Symbol) -> Option<Symbol> {
        let idx = *self.index.get(s)?;
        let (root, order) = self.root(idx);
        (order > 0).then(|| self.fullvars[root].clone())
    }

    /// Derivative order of `s` relative to its base (0 for base variables).
    pub fn order_of(&self, s: &Symbol) -> Option<usize> {
        let idx = *self.index.get(s)?;
        Some(self.root(idx).1)
    }

    /// `ds/dt` when `s` is one of `base_vars` or a registered derivative of one.
    fn rate_of(&mut self, s: &Symbol, base_vars: &[Symbol]) -> Option<Symbol> {
        let idx = if base_vars.contains(s) {
            self.intern(s)
        } else {
            let idx = *self.index.get(s)?;
            let (root, _) = self.root(idx);
            if !base_vars.contains(&self.fullvars[root]) {
                return None;
            }
            idx
        };
        let d = self.next(idx);
        Some(self.fullvars[d].clone())
    }

    fn derive_once(&mut self, e: &Expr, base_vars: &[Symbol]) -> Expr {
        e.derive_with(&mut |s: &Symbol| match self.rate_of(s, base_vars) {
            Some(d) => Expr::symbol(d),
            None => Expr::zero(),
        })
    }

    /// `order`-th time derivative of `target`, treating `base_vars` as
    /// functions of time and every other symbol as constant.
    pub fn time_deriv<T: Symbolic>(&mut self, target: &T, base_vars: &[Symbol], order: usize) -> T {
        if order == 0 {
            return target.clone();
        }
        self.declare(base_vars);
        let mut current = target.clone();
        for _ in 0..order {
            current = current.map_exprs(&mut |e| self.derive_once(e, base_vars));
        }
        current
    }
}

//! Lagrangian models and their control-oriented state-space forms.

use std::cell::OnceCell;
use std::collections::BTreeSet;

use crate::deriv::DerivativeTable;
use crate::error::{ModelError, Result};
use crate::expr::{zip0, Expr};
use crate::matrix::Matrix;
use crate::symbol::{symbol_range, Symbol};

mod lagrange;
mod transforms;

pub use lagrange::{generate_symbolic_model, new_model_from_equations_of_motion};

/// Knobs shared by the assembler and the transforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeriveOptions {
    /// Run [`Expr::simplify`] over every produced expression.
    pub simplify: bool,
}

impl DeriveOptions {
    pub fn new() -> Self {
        DeriveOptions::default()
    }

    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    pub(crate) fn finish(&self, m: Matrix) -> Matrix {
        if self.simplify {
            m.simplify()
        } else {
            m
        }
    }
}

impl From<bool> for DeriveOptions {
    fn from(simplify: bool) -> Self {
        DeriveOptions { simplify }
    }
}

/// Generalized forces as handed to the assembler: a list, a column or a row.
#[derive(Debug, Clone)]
pub enum ExternalForces {
    List(Vec<Expr>),
    Matrix(Matrix),
}

impl ExternalForces {
    /// Column vector of the forces. A matrix with more than one row and
    /// column is rejected.
    pub fn into_column(self) -> Result<Matrix> {
        match self {
            ExternalForces::List(v) => Ok(Matrix::column(v)),
            ExternalForces::Matrix(m) if m.is_vector() => Ok(m.to_column()),
            ExternalForces::Matrix(m) => Err(ModelError::InvalidArgument(format!(
                "external forces must be a vector, got a {}x{} matrix",
                m.rows(),
                m.cols()
            ))),
        }
    }
}

impl From<Vec<Expr>> for ExternalForces {
    fn from(v: Vec<Expr>) -> Self {
        ExternalForces::List(v)
    }
}

impl From<&[Expr]> for ExternalForces {
    fn from(v: &[Expr]) -> Self {
        ExternalForces::List(v.to_vec())
    }
}

impl<const N: usize> From<[Expr; N]> for ExternalForces {
    fn from(v: [Expr; N]) -> Self {
        ExternalForces::List(v.into())
    }
}

impl From<Matrix> for ExternalForces {
    fn from(m: Matrix) -> Self {
        ExternalForces::Matrix(m)
    }
}

impl From<&Matrix> for ExternalForces {
    fn from(m: &Matrix) -> Self {
        ExternalForces::Matrix(m.clone())
    }
}

/// Planar rotation by `phi`.
pub fn rz(phi: &Expr) -> Matrix {
    Matrix::from_rows(vec![vec![phi.cos(), -phi.sin()], vec![phi.sin(), phi.cos()]])
}

/// `xx`, `ff`, `gg` of `xdot = ff + gg·u`.
#[derive(Debug, Clone)]
struct StateEquation {
    xx: Matrix,
    ff: Matrix,
    gg: Matrix,
}

#[derive(Debug, Clone)]
struct NormalForm {
    zz: Matrix,
    fz: Matrix,
    gz: Matrix,
    ww: Vec<Symbol>,
    ww_def: Matrix,
}

/// Equations of motion `eqns = MM·ttdd + rest(ttheta, ttd) - qq = 0` together
/// with the artifacts produced by the state-equation transforms.
#[derive(Debug, Clone)]
pub struct SymbolicModel {
    ttheta: Vec<Symbol>,
    ttd: Vec<Symbol>,
    ttdd: Vec<Symbol>,
    qq: Matrix,
    tau: Vec<Symbol>,
    eqns: Matrix,
    table: DerivativeTable,
    mm: OnceCell<Matrix>,
    state: Option<StateEquation>,
    aa: Option<Matrix>,
    normal_form: Option<NormalForm>,
}

impl SymbolicModel {
    fn new(
        ttheta: Vec<Symbol>,
        mut table: DerivativeTable,
        qq: Matrix,
        tau: Vec<Symbol>,
        eqns: Matrix,
    ) -> Self {
        table.declare(&ttheta);
        let ttd = ttheta.iter().map(|s| table.derivative_of(s, 1)).collect();
        let ttdd = ttheta.iter().map(|s| table.derivative_of(s, 2)).collect();
        SymbolicModel {
            ttheta,
            ttd,
            ttdd,
            qq,
            tau,
            eqns,
            table,
            mm: OnceCell::new(),
            state: None,
            aa: None,
            normal_form: None,
        }
    }

    pub fn dim(&self) -> usize {
        self.ttheta.len()
    }

    pub fn ttheta(&self) -> &[Symbol] {
        &self.ttheta
    }

    pub fn ttd(&self) -> &[Symbol] {
        &self.ttd
    }

    pub fn ttdd(&self) -> &[Symbol] {
        &self.ttdd
    }

    pub fn qq(&self) -> &Matrix {
        &self.qq
    }

    /// Free symbols of the nonzero forces.
    pub fn tau(&self) -> &[Symbol] {
        &self.tau
    }

    pub fn eqns(&self) -> &Matrix {
        &self.eqns
    }

    pub fn derivative_table(&self) -> &DerivativeTable {
        &self.table
    }

    /// `∂eqns/∂ttdd`, computed on first access.
    pub fn mass_matrix(&self) -> &Matrix {
        self.mm.get_or_init(|| self.eqns.jacobian(&self.ttdd))
    }

    /// Terms of the equations that do not depend on the accelerations
    /// (forces included).
    pub fn rest(&self) -> Matrix {
        self.eqns.subs(&zip0(&self.ttdd))
    }

    pub fn simplify_eqns(&mut self) {
        self.eqns = self.eqns.simplify();
        self.mm = OnceCell::new();
    }

    fn state(&self, name: &'static str) -> Result<&StateEquation> {
        self.state.as_ref().ok_or(ModelError::Unavailable(name))
    }

    fn normal_form(&self, name: &'static str) -> Result<&NormalForm> {
        self.normal_form.as_ref().ok_or(ModelError::Unavailable(name))
    }

    pub fn xx(&self) -> Result<&Matrix> {
        self.state("xx").map(|s| &s.xx)
    }

    pub fn ff(&self) -> Result<&Matrix> {
        self.state("ff").map(|s| &s.ff)
    }

    pub fn gg(&self) -> Result<&Matrix> {
        self.state("gg").map(|s| &s.gg)
    }

    /// Accelerations of the actuated coordinates, used as new inputs.
    pub fn aa(&self) -> Result<&Matrix> {
        self.aa.as_ref().ok_or(ModelError::Unavailable("aa"))
    }

    pub fn zz(&self) -> Result<&Matrix> {
        self.normal_form("zz").map(|nf| &nf.zz)
    }

    pub fn fz(&self) -> Result<&Matrix> {
        self.normal_form("fz").map(|nf| &nf.fz)
    }

    pub fn gz(&self) -> Result<&Matrix> {
        self.normal_form("gz").map(|nf| &nf.gz)
    }

    pub fn ww(&self) -> Result<&[Symbol]> {
        self.normal_form("ww").map(|nf| nf.ww.as_slice())
    }

    pub fn ww_def(&self) -> Result<&Matrix> {
        self.normal_form("ww_def").map(|nf| &nf.ww_def)
    }

    /// `stem1..stemN`, renamed if any of them is already in use.
    fn fresh_symbols(&self, stem: &str, count: usize) -> Vec<Symbol> {
        let mut taken: BTreeSet<Symbol> = self.table.symbols().iter().cloned().collect();
        for e in self.eqns.iter().chain(self.qq.iter()) {
            e.collect_symbols(&mut taken);
        }
        let mut stem = stem.to_string();
        loop {
            let candidates = symbol_range(&stem, 1..=count);
            if candidates.iter().all(|s| !taken.contains(s)) {
                return candidates;
            }
            stem.push('_');
        }
    }
}

fn input_symbols(qq: &Matrix) -> Vec<Symbol> {
    let mut tau = Vec::new();
    for f in qq.iter().filter(|f| !f.is_zero()) {
        for s in f.free_symbols() {
            if !tau.contains(&s) {
                tau.push(s);
            }
        }
    }
    tau
}

/// Fails unless `exprs` are jointly affine in `tau`.
fn check_affine(exprs: &Matrix, tau: &[Symbol], what: &str) -> Result<()> {
    let jac = exprs.jacobian(tau);
    match jac.iter().find(|e| tau.iter().any(|s| e.depends_on(s))) {
        Some(bad) => {
            let names: Vec<&str> = tau.iter().map(Symbol::name).collect();
            Err(ModelError::InvalidArgument(format!(
                "{what} must be affine in the inputs [{}], found coefficient `{bad}`",
                names.join(", ")
            )))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{c, sym};
    use crate::symbol::symbols;

    #[test]
    fn force_coercion() {
        let f = sym("F1");
        let col = ExternalForces::from(vec![c(0), f.clone()]).into_column().unwrap();
        assert_eq!(col.shape(), (2, 1));
        let row = ExternalForces::from(Matrix::row(vec![c(0), f.clone()])).into_column().unwrap();
        assert_eq!(row, col);
        let square = Matrix::eye(2);
        assert!(matches!(
            ExternalForces::from(&square).into_column(),
            Err(ModelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rotation_is_orthogonal() {
        let r = rz(&sym("phi"));
        assert_eq!(&r.transpose() * &r, Matrix::eye(2));
        assert_eq!(rz(&c(0)), Matrix::eye(2));
    }

    #[test]
    fn inputs_in_order_of_appearance() {
        let qq = Matrix::column(vec![c(0), sym("tau2") * 2, sym("tau1") + sym("tau2")]);
        assert_eq!(input_symbols(&qq), vec![Symbol::new("tau2"), Symbol::new("tau1")]);
    }

    #[test]
    fn inputs_must_enter_affinely() {
        let tau = symbols("b, u");
        let product = Matrix::column(vec![c(0), sym("b") * sym("u")]);
        assert!(matches!(
            check_affine(&product, &tau, "external forces"),
            Err(ModelError::InvalidArgument(msg)) if msg.contains("b, u")
        ));
        let affine = Matrix::column(vec![sym("u") * 2 + sym("b"), sym("u") * sym("k").cos()]);
        assert!(check_affine(&affine, &tau, "external forces").is_ok());
    }

    #[test]
    fn options_builder() {
        assert!(!DeriveOptions::new().simplify);
        assert!(DeriveOptions::new().with_simplify(true).simplify);
        assert_eq!(DeriveOptions::from(true), DeriveOptions { simplify: true });
    }
}

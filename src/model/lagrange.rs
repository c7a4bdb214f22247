use std::collections::BTreeSet;
use std::time::Instant;

use tracing::{debug, info};

use super::{check_affine, input_symbols, DeriveOptions, ExternalForces, SymbolicModel};
use crate::deriv::DerivativeTable;
use crate::error::{ModelError, Result};
use crate::expr::Expr;
use crate::matrix::Matrix;
use crate::symbol::Symbol;

/// Coordinates must form a vector of distinct plain symbols.
fn coordinates(ttheta: &Matrix) -> Result<Vec<Symbol>> {
    if ttheta.is_empty() || !ttheta.is_vector() {
        return Err(ModelError::InvalidArgument(format!(
            "coordinates must be a nonempty vector, got a {}x{} matrix",
            ttheta.rows(),
            ttheta.cols()
        )));
    }
    let syms = ttheta
        .symbols()
        .map_err(|e| ModelError::InvalidArgument(e.to_string()))?;
    let mut seen = BTreeSet::new();
    if let Some(dup) = syms.iter().find(|s| !seen.insert(*s)) {
        return Err(ModelError::InvalidArgument(format!("coordinate `{dup}` appears twice")));
    }
    Ok(syms)
}

/// Derives `d/dt(∂L/∂ttd) - ∂L/∂ttheta - qq = 0` for `L = t - v`.
///
/// `qq` holds one generalized force per coordinate and may be given as a
/// list, a column or a row. Its length is checked before anything is
/// differentiated. Every free symbol of a nonzero force is an input, so the
/// forces must be affine in them: a force like `b*u` with a parameter `b`
/// goes through [`new_model_from_equations_of_motion`] with explicit inputs.
pub fn generate_symbolic_model(
    t: &Expr,
    v: &Expr,
    ttheta: &Matrix,
    qq: impl Into<ExternalForces>,
    opts: impl Into<DeriveOptions>,
) -> Result<SymbolicModel> {
    let opts = opts.into();
    let ttheta = coordinates(ttheta)?;
    let n = ttheta.len();
    let forces = qq.into().into_column()?;
    if forces.len() != n {
        return Err(ModelError::InvalidArgument(format!(
            "expected {n} external forces, got {}",
            forces.len()
        )));
    }

    let tau = input_symbols(&forces);
    check_affine(&forces, &tau, "external forces")?;

    info!(coordinates = n, simplify = opts.simplify, "Assembling Euler-Lagrange equations");
    let start = Instant::now();

    let mut table = DerivativeTable::new();
    table.declare(&ttheta);
    let ttd: Vec<Symbol> = ttheta.iter().map(|s| table.derivative_of(s, 1)).collect();
    let lagrangian = t - v;

    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let momentum = lagrangian.diff(&ttd[i]);
        let d_momentum = table.time_deriv(&momentum, &ttheta, 1);
        rows.push(d_momentum - lagrangian.diff(&ttheta[i]) - &forces[i]);
    }
    let eqns = opts.finish(Matrix::column(rows));

    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        derivative_symbols = table.len(),
        "Equations of motion ready"
    );

    Ok(SymbolicModel::new(ttheta, table, forces, tau, eqns))
}

/// Wraps equations of motion derived elsewhere. The forces are recovered as
/// `qq = -(∂eqns/∂tau)·tau`, so `eqns` must be affine in the inputs.
pub fn new_model_from_equations_of_motion(
    eqns: &Matrix,
    ttheta: &Matrix,
    tau: &[Symbol],
) -> Result<SymbolicModel> {
    let coords = coordinates(ttheta)?;
    if !eqns.is_vector() || eqns.len() != coords.len() {
        return Err(ModelError::InvalidArgument(format!(
            "expected {} equations, got a {}x{} matrix",
            coords.len(),
            eqns.rows(),
            eqns.cols()
        )));
    }
    let eqns = eqns.to_column();
    check_affine(&eqns, tau, "equations of motion")?;
    let qq = -(eqns.jacobian(tau) * Matrix::from_symbols(tau));
    debug!(coordinates = coords.len(), inputs = tau.len(), "Wrapping equations of motion");
    Ok(SymbolicModel::new(coords, DerivativeTable::new(), qq, tau.to_vec(), eqns))
}

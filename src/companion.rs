//! First-order companion form of linear second-order systems.

use tracing::debug;

use crate::deriv::DerivativeTable;
use crate::error::{ModelError, Result};
use crate::matrix::Matrix;

/// Rewrites `p2·ẍ + p1·ẋ + p0·x = 0` with `xx = (x, ẋ)` as the implicit
/// first-order system `P0bar·xx + P1bar·ẋx = 0` and returns `(P0bar, P1bar)`.
///
/// `p0`, `p1` and `p2` share the shape `m × N`; `xx` is a vector of `2N`
/// symbols. The first `N` rows encode `xx[N..] - ẋx[..N] = 0`.
pub fn transform_2nd_to_1st_order_matrices(
    p0: &Matrix,
    p1: &Matrix,
    p2: &Matrix,
    xx: &Matrix,
) -> Result<(Matrix, Matrix)> {
    if p1.shape() != p0.shape() || p2.shape() != p0.shape() {
        return Err(ModelError::InvalidArgument(format!(
            "coefficient matrices differ in shape: {:?}, {:?}, {:?}",
            p0.shape(),
            p1.shape(),
            p2.shape()
        )));
    }
    let n = p0.cols();
    if !xx.is_vector() || xx.len() != 2 * n {
        return Err(ModelError::InvalidArgument(format!(
            "state vector must have {} entries, got a {}x{} matrix",
            2 * n,
            xx.rows(),
            xx.cols()
        )));
    }
    let xx_syms = xx
        .symbols()
        .map_err(|e| ModelError::InvalidArgument(e.to_string()))?;
    let xx = xx.to_column();

    let mut table = DerivativeTable::new();
    let xxd = table.time_deriv(&xx, &xx_syms, 1);
    let xxd_syms = xxd.symbols()?;

    let top = xx.block(n..2 * n, 0..1) - xxd.block(0..n, 0..1);
    let bottom = p2 * &xxd.block(n..2 * n, 0..1) + p1 * &xxd.block(0..n, 0..1) + p0 * &xx.block(0..n, 0..1);
    let implicit = top.col_join(&bottom);

    debug!(n, rows = implicit.rows(), "Built first-order companion system");
    Ok((implicit.jacobian(&xx_syms), implicit.jacobian(&xxd_syms)))
}

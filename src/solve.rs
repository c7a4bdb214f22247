//! Exact linear solving over the field of rational functions.

use tracing::trace;

use crate::error::AlgebraError;
use crate::expr::{zip0, Expr};
use crate::matrix::Matrix;
use crate::symbol::Symbol;

/// Pivot preference: constants first, then the shortest expressions.
fn pivot_weight(e: &Expr) -> usize {
    match e.as_rational() {
        Some(_) => 0,
        None => e.num_poly().len() + e.den_poly().len(),
    }
}

fn shape(m: &Matrix) -> String {
    format!("{}x{}", m.rows(), m.cols())
}

fn square(m: &Matrix) -> Result<usize, AlgebraError> {
    let n = m.rows();
    if m.cols() != n {
        return Err(AlgebraError::ShapeMismatch {
            expected: format!("{n}x{n}"),
            found: shape(m),
        });
    }
    Ok(n)
}

impl Matrix {
    /// Fraction-free (Bareiss) elimination. Every division is exact, so the
    /// intermediate entries stay polynomial when the input is.
    fn bareiss(&self) -> Result<Expr, AlgebraError> {
        let n = square(self)?;
        let mut a: Vec<Vec<Expr>> = (0..n)
            .map(|r| (0..n).map(|c| self[(r, c)].clone()).collect())
            .collect();
        let mut negate = false;
        let mut prev = Expr::one();
        for k in 0..n {
            let pivot = (k..n)
                .filter(|&r| !a[r][k].is_zero())
                .min_by_key(|&r| pivot_weight(&a[r][k]))
                .ok_or(AlgebraError::Singular { column: k })?;
            if pivot != k {
                a.swap(k, pivot);
                negate = !negate;
            }
            trace!(col = k, pivot, "elimination step");
            for i in k + 1..n {
                for j in k + 1..n {
                    let updated = (&a[i][j] * &a[k][k] - &a[i][k] * &a[k][j]) / &prev;
                    a[i][j] = updated;
                }
            }
            prev = a[k][k].clone();
        }
        Ok(if negate { -prev } else { prev })
    }

    pub fn det(&self) -> Result<Expr, AlgebraError> {
        match self.bareiss() {
            Err(AlgebraError::Singular { .. }) => Ok(Expr::zero()),
            other => other,
        }
    }

    /// Transposed cofactor matrix, so that `self · adj = det · I`.
    pub fn adjugate(&self) -> Result<Matrix, AlgebraError> {
        let n = square(self)?;
        if n == 1 {
            return Ok(Matrix::eye(1));
        }
        let mut adj = Matrix::zeros(n, n);
        for r in 0..n {
            let rows: Vec<usize> = (0..n).filter(|&i| i != r).collect();
            for c in 0..n {
                let cols: Vec<usize> = (0..n).filter(|&j| j != c).collect();
                let minor = self.select_rows(&rows).select_cols(&cols).det()?;
                adj[(c, r)] = if (r + c) % 2 == 0 { minor } else { -minor };
            }
        }
        Ok(adj)
    }

    /// Solves `self · X = rhs` as `adj(self) · rhs / det(self)`.
    pub fn solve(&self, rhs: &Matrix) -> Result<Matrix, AlgebraError> {
        let n = square(self)?;
        if rhs.rows() != n {
            return Err(AlgebraError::ShapeMismatch {
                expected: format!("{n}xk"),
                found: shape(rhs),
            });
        }
        let det = self.bareiss()?;
        let adj = self.adjugate()?;
        Ok((&adj * rhs).map(|e| e / &det))
    }

    pub fn inverse(&self) -> Result<Matrix, AlgebraError> {
        let det = self.bareiss()?;
        Ok(self.adjugate()?.map(|e| e / &det))
    }
}

/// Solves the equations `eqns = 0` for `unknowns`, which must appear linearly.
pub fn solve_linear(eqns: &Matrix, unknowns: &[Symbol]) -> Result<Matrix, AlgebraError> {
    let coeffs = eqns.to_column().jacobian(unknowns);
    if let Some(bad) = coeffs
        .iter()
        .find(|e| unknowns.iter().any(|u| e.depends_on(u)))
    {
        return Err(AlgebraError::NotLinear(bad.to_string()));
    }
    let rest = eqns.to_column().subs(&zip0(unknowns));
    coeffs.solve(&-rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{c, sym};
    use crate::symbol::symbols;

    #[test]
    fn solves_symbolic_system() {
        let (a, b, x, y) = (sym("a"), sym("b"), sym("x"), sym("y"));
        let eqns = Matrix::column(vec![&a * &x + &y - 1, &x - &b * &y]);
        let sol = solve_linear(&eqns, &symbols("x, y")).unwrap();
        let back = eqns.subs(
            &symbols("x, y")
                .into_iter()
                .zip(sol.iter().cloned())
                .collect(),
        );
        assert!(back.is_zero());
        assert!(sol[0].equiv(&(&b / (&a * &b + 1))));
    }

    #[test]
    fn inverse_of_rotation_is_transpose() {
        let p = sym("p");
        let rot = Matrix::from_rows(vec![vec![p.cos(), -p.sin()], vec![p.sin(), p.cos()]]);
        let inv = rot.inverse().unwrap();
        assert!(inv.equiv(&rot.transpose()));
    }

    #[test]
    fn singular_system_is_reported() {
        let x = sym("x");
        let m = Matrix::from_rows(vec![vec![x.clone(), &x * 2], vec![c(1), c(2)]]);
        assert_eq!(m.solve(&Matrix::zeros(2, 1)), Err(AlgebraError::Singular { column: 1 }));
    }

    #[test]
    fn determinant_and_adjugate() {
        let (a, b, p) = (sym("a"), sym("b"), sym("p"));
        let m = Matrix::from_rows(vec![
            vec![&a + 1, p.cos(), c(0)],
            vec![p.cos(), b.clone(), p.sin()],
            vec![c(0), p.sin(), c(1)],
        ]);
        let det = m.det().unwrap();
        // expansion along the first row, with sin^2 + cos^2 = 1
        let expected = (&a + 1) * (&b - 1 + p.cos().powi(2)) - p.cos().powi(2);
        assert_eq!(det, expected);
        let prod = &m * &m.adjugate().unwrap();
        assert_eq!(prod, Matrix::eye(3).scale(&det));
        let degenerate = Matrix::from_rows(vec![vec![a.clone(), &a * 2], vec![b.clone(), &b * 2]]);
        assert_eq!(degenerate.det(), Ok(c(0)));
        assert!(matches!(
            Matrix::zeros(2, 3).det(),
            Err(AlgebraError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn solves_three_by_three_symbolic_system() {
        let (k, m, p) = (sym("k"), sym("m"), sym("p"));
        let mm = Matrix::from_rows(vec![
            vec![&m + 2, p.cos(), c(1)],
            vec![p.cos(), &m + 1, c(0)],
            vec![c(1), c(0), m.clone()],
        ]);
        let rhs = Matrix::column(vec![&k * p.sin(), c(1), -&k]);
        let x = mm.solve(&rhs).unwrap();
        assert!((&mm * &x).equiv(&rhs));
        let det = mm.det().unwrap();
        for e in x.iter() {
            assert!(det.num_poly().div_exact(e.den_poly()).is_some());
        }
    }

    #[test]
    fn nonlinear_unknowns_are_rejected() {
        let x = sym("x");
        let eqns = Matrix::column(vec![&x * &x - 1]);
        assert!(matches!(
            solve_linear(&eqns, &symbols("x")),
            Err(AlgebraError::NotLinear(_))
        ));
    }
}

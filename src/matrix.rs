//! Dense matrices of expressions.

use std::ops::{Index, IndexMut, Range};

use crate::error::AlgebraError;
use crate::expr::{Expr, Substitution};
use crate::symbol::Symbol;

/// Row-major `rows × cols` matrix of [`Expr`]. Vectors are `n × 1` columns.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Expr>,
}

impl Matrix {
    /// Panics if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<Expr>) -> Self {
        assert_eq!(data.len(), rows * cols, "matrix data does not match {rows}x{cols}");
        Matrix { rows, cols, data }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix::from_vec(rows, cols, vec![Expr::zero(); rows * cols])
    }

    pub fn eye(n: usize) -> Self {
        Matrix::from_fn(n, n, |r, c| if r == c { Expr::one() } else { Expr::zero() })
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> Expr) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Matrix { rows, cols, data }
    }

    pub fn column(entries: Vec<Expr>) -> Self {
        let n = entries.len();
        Matrix::from_vec(n, 1, entries)
    }

    pub fn row(entries: Vec<Expr>) -> Self {
        let n = entries.len();
        Matrix::from_vec(1, n, entries)
    }

    /// Panics on ragged input.
    pub fn from_rows(rows: Vec<Vec<Expr>>) -> Self {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(nrows * ncols);
        for row in rows {
            assert_eq!(row.len(), ncols, "ragged rows in matrix literal");
            data.extend(row);
        }
        Matrix { rows: nrows, cols: ncols, data }
    }

    pub fn from_symbols(symbols: &[Symbol]) -> Self {
        Matrix::column(symbols.iter().map(Symbol::to_expr).collect())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.data.iter()
    }

    pub fn into_vec(self) -> Vec<Expr> {
        self.data
    }

    pub fn get(&self, r: usize, c: usize) -> Option<&Expr> {
        if r < self.rows && c < self.cols {
            self.data.get(r * self.cols + c)
        } else {
            None
        }
    }

    pub fn transpose(&self) -> Matrix {
        Matrix::from_fn(self.cols, self.rows, |r, c| self[(c, r)].clone())
    }

    /// Entries of a row or column vector as a column.
    pub fn to_column(&self) -> Matrix {
        Matrix::column(self.data.clone())
    }

    pub fn block(&self, rows: Range<usize>, cols: Range<usize>) -> Matrix {
        assert!(rows.end <= self.rows && cols.end <= self.cols, "block out of bounds");
        let (r0, c0) = (rows.start, cols.start);
        Matrix::from_fn(rows.len(), cols.len(), |r, c| self[(r0 + r, c0 + c)].clone())
    }

    pub fn select_rows(&self, idx: &[usize]) -> Matrix {
        Matrix::from_fn(idx.len(), self.cols, |r, c| self[(idx[r], c)].clone())
    }

    pub fn select_cols(&self, idx: &[usize]) -> Matrix {
        Matrix::from_fn(self.rows, idx.len(), |r, c| self[(r, idx[c])].clone())
    }

    /// Horizontal concatenation `[self | other]`.
    pub fn row_join(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.rows, other.rows, "row_join needs equal row counts");
        Matrix::from_fn(self.rows, self.cols + other.cols, |r, c| {
            if c < self.cols {
                self[(r, c)].clone()
            } else {
                other[(r, c - self.cols)].clone()
            }
        })
    }

    /// Vertical concatenation `[self; other]`.
    pub fn col_join(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.cols, other.cols, "col_join needs equal column counts");
        let mut data = self.data.clone();
        data.extend(other.data.iter().cloned());
        Matrix::from_vec(self.rows + other.rows, self.cols, data)
    }

    pub fn col_stack(parts: &[&Matrix]) -> Matrix {
        match parts.split_first() {
            None => Matrix::zeros(0, 0),
            Some((first, rest)) => rest.iter().fold((*first).clone(), |acc, m| acc.col_join(m)),
        }
    }

    pub fn map(&self, f: impl FnMut(&Expr) -> Expr) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn scale(&self, k: &Expr) -> Matrix {
        self.map(|e| e * k)
    }

    pub fn subs(&self, map: &Substitution) -> Matrix {
        self.map(|e| e.subs(map))
    }

    pub fn simplify(&self) -> Matrix {
        self.map(Expr::simplify)
    }

    /// Jacobian of the entries (read as a column) with respect to `vars`.
    pub fn jacobian(&self, vars: &[Symbol]) -> Matrix {
        Matrix::from_fn(self.len(), vars.len(), |r, c| self.data[r].diff(&vars[c]))
    }

    pub fn symbols(&self) -> Result<Vec<Symbol>, AlgebraError> {
        self.data
            .iter()
            .map(|e| e.as_symbol().ok_or_else(|| AlgebraError::NotASymbol(e.to_string())))
            .collect()
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(Expr::is_zero)
    }

    /// Entry-wise [`Expr::equiv`] with equal shapes.
    pub fn equiv(&self, other: &Matrix) -> bool {
        self.shape() == other.shape() && self.data.iter().zip(&other.data).all(|(a, b)| a.equiv(b))
    }

    pub fn is_symmetric(&self) -> bool {
        self.rows == self.cols
            && (0..self.rows).all(|r| (r + 1..self.cols).all(|c| self[(r, c)].equiv(&self[(c, r)])))
    }

    fn zip_with(&self, other: &Matrix, op: &str, f: impl Fn(&Expr, &Expr) -> Expr) -> Matrix {
        assert_eq!(
            self.shape(),
            other.shape(),
            "matrix {op}: shapes {:?} and {:?} differ",
            self.shape(),
            other.shape()
        );
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(a, b)| f(a, b)).collect(),
        }
    }

    fn matmul(&self, other: &Matrix) -> Matrix {
        assert_eq!(
            self.cols, other.rows,
            "matrix product: {}x{} times {}x{}",
            self.rows, self.cols, other.rows, other.cols
        );
        Matrix::from_fn(self.rows, other.cols, |r, c| {
            (0..self.cols).map(|k| &self[(r, k)] * &other[(k, c)]).sum()
        })
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Expr;
    fn index(&self, (r, c): (usize, usize)) -> &Expr {
        assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut Expr {
        assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        &mut self.data[r * self.cols + c]
    }
}

/// Flat row-major indexing, convenient for vectors.
impl Index<usize> for Matrix {
    type Output = Expr;
    fn index(&self, i: usize) -> &Expr {
        &self.data[i]
    }
}

impl IndexMut<usize> for Matrix {
    fn index_mut(&mut self, i: usize) -> &mut Expr {
        &mut self.data[i]
    }
}

impl<'a> IntoIterator for &'a Matrix {
    type Item = &'a Expr;
    type IntoIter = std::slice::Iter<'a, Expr>;
    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

macro_rules! gen_matrix_ops {
    ($($trait:ident : $method:ident => |$a:ident, $b:ident| $body:expr),* $(,)?) => {
        $(
            impl<'a, 'b> std::ops::$trait<&'b Matrix> for &'a Matrix {
                type Output = Matrix;
                fn $method(self, rhs: &'b Matrix) -> Matrix {
                    let ($a, $b) = (self, rhs);
                    $body
                }
            }

            impl std::ops::$trait<Matrix> for Matrix {
                type Output = Matrix;
                fn $method(self, rhs: Matrix) -> Matrix {
                    let ($a, $b) = (&self, &rhs);
                    $body
                }
            }

            impl<'b> std::ops::$trait<&'b Matrix> for Matrix {
                type Output = Matrix;
                fn $method(self, rhs: &'b Matrix) -> Matrix {
                    let ($a, $b) = (&self, rhs);
                    $body
                }
            }

            impl<'a> std::ops::$trait<Matrix> for &'a Matrix {
                type Output = Matrix;
                fn $method(self, rhs: Matrix) -> Matrix {
                    let ($a, $b) = (self, &rhs);
                    $body
                }
            }
        )*
    };
}

gen_matrix_ops! {
    Add: add => |a, b| a.zip_with(b, "sum", |x, y| x + y),
    Sub: sub => |a, b| a.zip_with(b, "difference", |x, y| x - y),
    Mul: mul => |a, b| a.matmul(b),
}

impl std::ops::Neg for &Matrix {
    type Output = Matrix;
    fn neg(self) -> Matrix {
        self.map(|e| -e)
    }
}

impl std::ops::Neg for Matrix {
    type Output = Matrix;
    fn neg(self) -> Matrix {
        -&self
    }
}

impl std::ops::Mul<&Expr> for &Matrix {
    type Output = Matrix;
    fn mul(self, k: &Expr) -> Matrix {
        self.scale(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{c, sym};
    use crate::symbol::symbols;

    #[test]
    fn blocks_and_joins() {
        let m = Matrix::from_fn(3, 3, |r, c| Expr::int((3 * r + c) as i64));
        assert_eq!(m.block(1..3, 0..2), Matrix::from_rows(vec![vec![c(3), c(4)], vec![c(6), c(7)]]));
        let joined = m.block(0..3, 0..1).row_join(&m.block(0..3, 1..3));
        assert_eq!(joined, m);
        let stacked = m.block(0..1, 0..3).col_join(&m.block(1..3, 0..3));
        assert_eq!(stacked, m);
        assert_eq!(m.transpose()[(0, 2)], c(6));
        assert_eq!(m.select_rows(&[2, 0]).select_cols(&[1]), Matrix::column(vec![c(7), c(1)]));
    }

    #[test]
    fn products_and_jacobian() {
        let (x, y) = (sym("x"), sym("y"));
        let v = Matrix::column(vec![&x * &y, x.sin()]);
        let jac = v.jacobian(&symbols("x, y"));
        assert_eq!(jac, Matrix::from_rows(vec![vec![y.clone(), x.clone()], vec![x.cos(), c(0)]]));
        let prod = &Matrix::eye(2) * &jac;
        assert_eq!(prod, jac);
        let quad = &v.transpose() * &v;
        assert_eq!(quad.shape(), (1, 1));
        assert_eq!(quad[0], &x * &x * &y * &y + x.sin().powi(2));
    }

    #[test]
    fn symbol_extraction() {
        let v = Matrix::column(vec![sym("p1"), sym("q1")]);
        assert_eq!(v.symbols().map(|s| s.len()), Ok(2));
        let bad = Matrix::column(vec![sym("p1") * 2]);
        assert!(matches!(bad.symbols(), Err(AlgebraError::NotASymbol(_))));
    }
}

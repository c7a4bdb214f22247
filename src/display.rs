use std::fmt;

use colored::*;
use num_traits::{One, Signed};

use crate::expr::Expr;
use crate::matrix::Matrix;
use crate::poly::{Atom, Coeff, Monomial, Poly};

/// Colors applied by [`Expr::to_pretty_string`]; plain output uses identity styling.
#[derive(Clone, Copy)]
enum Style {
    Plain,
    Pretty,
}

impl Style {
    fn number(self, s: String) -> String {
        match self {
            Style::Plain => s,
            Style::Pretty => s.green().to_string(),
        }
    }

    fn symbol(self, s: &str) -> String {
        match self {
            Style::Plain => s.to_string(),
            Style::Pretty => s.blue().to_string(),
        }
    }

    fn function(self, s: &str) -> String {
        match self {
            Style::Plain => s.to_string(),
            Style::Pretty => s.red().to_string(),
        }
    }
}

fn write_atom(atom: &Atom, style: Style) -> String {
    match atom {
        Atom::Sym(s) => style.symbol(s.name()),
        Atom::UnOp(op, arg) => format!("{}({})", style.function(op.name()), write_expr(arg, style)),
    }
}

/// Unsigned term `|k|·m`.
fn write_term(m: &Monomial, k: &Coeff, style: Style) -> String {
    let k = k.abs();
    let mut parts = Vec::new();
    if m.is_one() || !k.numer().is_one() {
        parts.push(style.number(k.numer().to_string()));
    }
    for (atom, e) in m.factors() {
        let base = write_atom(atom, style);
        if *e == 1 {
            parts.push(base);
        } else {
            parts.push(format!("{base}^{}", style.number(e.to_string())));
        }
    }
    let mut out = parts.join("*");
    if !k.denom().is_one() {
        out.push('/');
        out.push_str(&style.number(k.denom().to_string()));
    }
    out
}

fn write_poly(p: &Poly, style: Style) -> String {
    if p.is_zero() {
        return style.number("0".to_string());
    }
    let mut out = String::new();
    for (i, (m, k)) in p.terms().enumerate() {
        let body = write_term(m, k, style);
        match (i, k.is_negative()) {
            (0, true) => {
                out.push('-');
                out.push_str(&body);
            }
            (0, false) => out.push_str(&body),
            (_, true) => {
                out.push_str(" - ");
                out.push_str(&body);
            }
            (_, false) => {
                out.push_str(" + ");
                out.push_str(&body);
            }
        }
    }
    out
}

fn needs_parens(p: &Poly) -> bool {
    if p.len() > 1 {
        return true;
    }
    match p.terms().next() {
        Some((m, k)) => m.factors().len() > 1 || (!m.is_one() && !k.is_one()),
        None => false,
    }
}

fn write_expr(e: &Expr, style: Style) -> String {
    let num = e.num_poly();
    let den = e.den_poly();
    if den.is_one() {
        return write_poly(num, style);
    }
    let top = if num.len() > 1 {
        format!("({})", write_poly(num, style))
    } else {
        write_poly(num, style)
    };
    let bottom = if needs_parens(den) {
        format!("({})", write_poly(den, style))
    } else {
        write_poly(den, style)
    };
    format!("{top}/{bottom}")
}

impl Expr {
    /// Terminal rendering with numbers, symbols and functions colored.
    pub fn to_pretty_string(&self) -> String {
        write_expr(self, Style::Pretty)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&write_expr(self, Style::Plain))
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&write_expr(self, Style::Plain))
    }
}

impl Matrix {
    pub fn to_pretty_string(&self) -> String {
        self.render(|e| e.to_pretty_string())
    }

    fn render(&self, cell: impl Fn(&Expr) -> String) -> String {
        let rows: Vec<String> = (0..self.rows())
            .map(|r| {
                let cells: Vec<String> = (0..self.cols()).map(|c| cell(&self[(r, c)])).collect();
                format!("[{}]", cells.join(", "))
            })
            .collect();
        format!("[{}]", rows.join(", "))
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(|e| e.to_string()))
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix{}x{}{}", self.rows(), self.cols(), self)
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{c, rat, sym};

    #[test]
    fn plain_rendering() {
        let (g, l1, p1) = (sym("g"), sym("l1"), sym("p1"));
        assert_eq!((-&g * p1.sin() / &l1).to_string(), "-g*sin(p1)/l1");
        assert_eq!((sym("m") * sym("x").powi(2) * rat(1, 2)).to_string(), "m*x^2/2");
        assert_eq!(c(0).to_string(), "0");
        assert_eq!((&g + 1).to_string(), "1 + g");
        assert_eq!((c(1) / (&g + &l1)).to_string(), "1/(g + l1)");
    }
}

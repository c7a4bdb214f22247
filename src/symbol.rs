use std::fmt;
use std::ops::RangeInclusive;
use std::rc::Rc;

use crate::expr::Expr;

/// Atomic named unknown. Symbols with the same name are the same symbol.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Symbol(Rc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn to_expr(&self) -> Expr {
        Expr::symbol(self.clone())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<Symbol> for Expr {
    fn from(s: Symbol) -> Self {
        Expr::symbol(s)
    }
}

impl From<&Symbol> for Expr {
    fn from(s: &Symbol) -> Self {
        Expr::symbol(s.clone())
    }
}

/// Symbols from a comma separated list, e.g. `symbols("m0, m1, l1, g")`.
pub fn symbols(names: &str) -> Vec<Symbol> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(Symbol::new)
        .collect()
}

/// Indexed family `prefix{i}` for every `i` in `range`: `symbol_range("x", 1..=3)` is `x1, x2, x3`.
pub fn symbol_range(prefix: &str, range: RangeInclusive<usize>) -> Vec<Symbol> {
    range.map(|i| Symbol::new(&format!("{prefix}{i}"))).collect()
}

/// Splits a name into its leading part and trailing digits: `"q12"` -> `("q", "12")`.
pub(crate) fn split_index(name: &str) -> (&str, &str) {
    let stem_len = name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if stem_len == 0 {
        return (name, "");
    }
    name.split_at(stem_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_compare_by_name() {
        assert_eq!(Symbol::new("p1"), Symbol::new("p1"));
        assert_ne!(Symbol::new("p1"), Symbol::new("p2"));
    }

    #[test]
    fn parses_lists_and_ranges() {
        let params = symbols("m0, m1,l1 , g");
        assert_eq!(params.len(), 4);
        assert_eq!(params[2].name(), "l1");
        let xs = symbol_range("x", 1..=3);
        assert_eq!(xs.iter().map(Symbol::name).collect::<Vec<_>>(), ["x1", "x2", "x3"]);
    }

    #[test]
    fn splits_trailing_index() {
        assert_eq!(split_index("q12"), ("q", "12"));
        assert_eq!(split_index("phi"), ("phi", ""));
        assert_eq!(split_index("42"), ("42", ""));
    }
}

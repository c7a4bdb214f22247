//! Error types for symbolic algebra and model derivation.

use thiserror::Error;

/// Errors raised by the expression algebra.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlgebraError {
    /// No nonzero pivot left in the given column of a linear system.
    #[error("linear system is singular (no pivot in column {column})")]
    Singular { column: usize },

    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        expected: String,
        found: String,
    },

    /// An unknown appears nonlinearly in a system handed to the linear solver.
    #[error("unknowns appear nonlinearly in coefficient `{0}`")]
    NotLinear(String),

    /// An entry that must be a plain symbol is a compound expression.
    #[error("expected a symbol, found `{0}`")]
    NotASymbol(String),

    #[error("no value bound for symbol `{0}`")]
    UnboundSymbol(String),

    /// Numeric evaluation produced NaN or infinity.
    #[error("expression `{0}` does not evaluate to a finite number")]
    NonFinite(String),
}

/// Errors raised while deriving or transforming a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Malformed input to a public entry point.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The equations cannot be solved for the requested unknowns.
    #[error("unsolvable system: {0}")]
    Unsolvable(#[from] AlgebraError),

    /// The model does not have the structure a transform needs.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The attribute is produced by a transform that has not run yet.
    #[error("attribute `{0}` is not available; run the producing transform first")]
    Unavailable(&'static str),
}

pub type Result<T, E = ModelError> = std::result::Result<T, E>;

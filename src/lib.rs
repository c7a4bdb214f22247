//! Symbolic equations of motion for Lagrangian multibody systems.
//!
//! Kinetic and potential energy go in as exact symbolic expressions; out come
//! the Euler-Lagrange equations, the mass matrix and state-space forms used
//! for control design (explicit state equation, collocated partial
//! linearization and the Lagrange-Byrnes-Isidori normal form).
//!
//! ```
//! use lagrange_cas::*;
//!
//! vars!(q1, qdot1, m, force);
//! let ttheta = Matrix::column(vec![q1.clone()]);
//! let t = &m * qdot1.powi(2) / 2;
//! let model = generate_symbolic_model(&t, &c(0), &ttheta, vec![force.clone()], false).unwrap();
//! assert_eq!(model.mass_matrix()[0], m);
//! ```

pub mod companion;
pub mod deriv;
mod display;
pub mod error;
pub mod expr;
pub mod matrix;
pub mod model;
pub mod poly;
pub mod solve;
pub mod symbol;
mod trig;

pub use companion::transform_2nd_to_1st_order_matrices;
pub use deriv::{DerivativeTable, Symbolic};
pub use error::{AlgebraError, ModelError, Result};
pub use expr::{c, rat, sym, zip0, Expr, Substitution};
pub use matrix::Matrix;
pub use model::{
    generate_symbolic_model, new_model_from_equations_of_motion, rz, DeriveOptions,
    ExternalForces, SymbolicModel,
};
pub use solve::solve_linear;
pub use symbol::{symbol_range, symbols, Symbol};

/// Binds each identifier to the symbol of the same name.
#[macro_export]
macro_rules! vars {
    ($($name:ident),* $(,)?) => {
        $(
            let $name = $crate::sym(stringify!($name));
        )*
    };
}

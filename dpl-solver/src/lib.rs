//! DPL Solver - Generic expression evaluation
//!
//! The solver is parametric over:
//! - an `Atom` type implementing the operations it supports
//! - a literal parser turning atom text into an `Atom`
//! - an `OperatorTable` choosing operators and their symbols
//! - a list of `Step`s giving the evaluation passes in priority order
//!
//! The unit solver, the numerical solver and the logical solver are all
//! instances of the same `ExpressionSolver`.

mod atom;
mod operator;
mod solver;

pub use atom::{Atom, Scalar};
pub use operator::{default_steps, Operator, OperatorTable, OperatorType, Step};
pub use solver::{solve, ExpressionSolver};

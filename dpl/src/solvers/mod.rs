//! Expression solvers bound to an environment

mod function;
mod logical;
mod numerical;
mod template;

pub use function::FunctionSolver;
pub use logical::{logical_table, LogicalSolver};
pub use numerical::{numerical_table, NumericalSolver};
pub use template::TemplateSolver;

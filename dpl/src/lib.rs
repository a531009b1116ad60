//! DPL - Declarative Parameter Language
//!
//! Parameters are written one per line as `name type = value units`, grouped
//! by indentation and refined by properties such as `!options`, `!constant`
//! or `!condition`. Values can reference other parameters, native functions,
//! numerical expressions with units and text templates. Case blocks select
//! parameters by condition.
//!
//! - `Dpl`: collects code, units, sources and functions and runs the parse
//! - `Environment`: the parsed nodes with their typed values
//! - `Documentation`: every occurrence of every parameter, for reference pages

pub mod docs;
pub mod driver;
pub mod environment;
pub mod lists;
pub mod node;
pub mod parser;
pub mod settings;
pub mod solvers;
pub mod value;

mod process;

pub use docs::{Documentation, ParType, ParameterItem};
pub use driver::{Dpl, ParseOptions, Parsed};
pub use environment::{Datum, Environment, Requested};
pub use lists::{EnvSource, EnvUnit, FunctionData, NativeFn};
pub use node::{Node, NodeKind, NodeView, SourceRef};
pub use settings::{EnvType, Format};
pub use value::{DataType, Payload, Value};

pub use dpl_core::{DplError, ErrorKind, Result};
pub use dpl_units::Quantity;

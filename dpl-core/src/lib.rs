//! DPL Core - Fundamental types
//!
//! This crate provides the core types used throughout the workspace:
//! - `Fraction`: exact rational exponents
//! - `NdArray`: row-major n-dimensional arrays with scalar broadcasting
//! - `Magnitude`: numeric values with absolute uncertainty
//! - `DplError`: structured errors with kind, message and arguments

mod array;
mod error;
mod fraction;
mod magnitude;

pub use array::{NdArray, SliceSpec};
pub use error::{codes, DplError, ErrorContext, ErrorKind, Result};
pub use fraction::{Fraction, FractionError, SYMBOL_FRACTION};
pub use magnitude::{format_sci, is_close, Magnitude, MAGNITUDE_PRECISION};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::codes;
    pub use crate::{DplError, ErrorKind, Fraction, Magnitude, NdArray, Result, SliceSpec};
}

//! DPL Units - Dimensional quantities
//!
//! This crate provides:
//! - `Dimensions`: rational exponents over the 8 base axes
//! - `UnitRegistry`: prefixes, units and physical constants
//! - `BaseUnits`: products of prefixed units, parsed by the unit solver
//! - `Quantity`: magnitude with units, arithmetic and conversions
//! - `UnitEnvironment`: scoped custom units
//! - `System`: SI, AU, CGS, Gaussian, ESU and EMU systems of units
//!
//! # Example
//!
//! ```
//! use dpl_units::Quantity;
//!
//! let speed = Quantity::parse(36.0, "km/h").unwrap();
//! let speed = speed.to("m/s").unwrap();
//! assert!((speed.as_scalar().unwrap() - 10.0).abs() < 1e-9);
//! ```

pub mod base_units;
pub mod convert;
pub mod dimension;
pub mod environment;
pub mod functions;
pub mod parse;
pub mod quantity;
pub mod systems;
pub mod unit;
pub mod units;

pub use base_units::{BaseUnits, UnitId};
pub use convert::{convert, Conversion, Rule, Transform};
pub use dimension::Dimensions;
pub use environment::{unit_from_quantity, UnitEnvironment};
pub use parse::{solve_units, UnitAtom};
pub use quantity::Quantity;
pub use systems::System;
pub use unit::{Definition, PrefixDef, Prefixes, UnitDef, UnitType};
pub use units::{find_unit, UnitRegistry, UNITS};

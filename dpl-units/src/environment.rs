//! Scoped extension of the unit registry
//!
//! Custom units live on a thread-local stack of scopes. `UnitEnvironment::enter`
//! pushes a scope and returns a guard; dropping the guard removes its scope and
//! any scope entered after it, so the units disappear on every exit path
//! including early returns with `?`.

use crate::quantity::Quantity;
use crate::unit::{Prefixes, UnitDef};
use crate::units::UNITS;
use crate::Dimensions;
use dpl_core::{DplError, Result};
use std::cell::RefCell;
use tracing::debug;

thread_local! {
    static SCOPES: RefCell<Vec<Vec<UnitDef>>> = const { RefCell::new(Vec::new()) };
}

/// Custom unit from an active environment
pub fn custom_unit(symbol: &str) -> Option<UnitDef> {
    SCOPES.with(|scopes| {
        scopes
            .borrow()
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|u| u.symbol == symbol)
            .cloned()
    })
}

/// Symbols of all custom units currently in scope
pub fn custom_symbols() -> Vec<String> {
    SCOPES.with(|scopes| {
        scopes
            .borrow()
            .iter()
            .flat_map(|scope| scope.iter().map(|u| u.symbol.clone()))
            .collect()
    })
}

/// Guard of one custom unit scope
#[derive(Debug)]
pub struct UnitEnvironment {
    symbols: Vec<String>,
    /// Stack height before this scope was pushed
    depth: usize,
}

impl UnitEnvironment {
    /// Push a scope with the given units.
    /// Fails with `SymbolExists` when a symbol is already known.
    pub fn enter(units: Vec<UnitDef>) -> Result<UnitEnvironment> {
        let mut symbols: Vec<String> = Vec::with_capacity(units.len());
        for unit in &units {
            if UNITS.contains(&unit.symbol)
                || custom_unit(&unit.symbol).is_some()
                || symbols.contains(&unit.symbol)
            {
                return Err(DplError::symbol_exists(&unit.symbol));
            }
            symbols.push(unit.symbol.clone());
        }
        let depth = SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            scopes.push(units);
            scopes.len() - 1
        });
        debug!(units = ?symbols, depth, "entered unit environment");
        Ok(UnitEnvironment { symbols, depth })
    }

    /// Scope of `(symbol, magnitude, dimensions)` entries without prefixes
    pub fn with_units(units: &[(&str, f64, Dimensions)]) -> Result<UnitEnvironment> {
        UnitEnvironment::enter(
            units
                .iter()
                .map(|(symbol, magnitude, dims)| UnitDef::custom(symbol, *magnitude, *dims))
                .collect(),
        )
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

impl Drop for UnitEnvironment {
    fn drop(&mut self) {
        SCOPES.with(|scopes| scopes.borrow_mut().truncate(self.depth));
        debug!(units = ?self.symbols, "left unit environment");
    }
}

/// Custom unit equal to a quantity, e.g. `$unit length = 1 cm`
pub fn unit_from_quantity(symbol: &str, quantity: &Quantity) -> Result<UnitDef> {
    let value = quantity
        .magnitude
        .as_scalar()
        .ok_or_else(|| DplError::invalid_input("Custom unit requires a scalar value").with_arg(symbol))?;
    let magnitude = value * quantity.baseunits.magnitude()?;
    let dimensions = quantity.baseunits.dimensions()?;
    Ok(UnitDef::custom(symbol, magnitude, dimensions).with_prefixes(Prefixes::None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_core::ErrorKind;

    #[test]
    fn test_scope_lifetime() {
        {
            let env = UnitEnvironment::with_units(&[("xu", 3.0, Dimensions::LENGTH)]).unwrap();
            assert_eq!(env.symbols(), &["xu".to_string()]);
            assert!(custom_unit("xu").is_some());
        }
        assert!(custom_unit("xu").is_none());
    }

    #[test]
    fn test_conflicts() {
        let err = UnitEnvironment::with_units(&[("m", 1.0, Dimensions::LENGTH)]).unwrap_err();
        assert!(err.is(ErrorKind::SymbolExists));
        let _outer = UnitEnvironment::with_units(&[("yu", 1.0, Dimensions::LENGTH)]).unwrap();
        let err = UnitEnvironment::with_units(&[("yu", 2.0, Dimensions::TIME)]).unwrap_err();
        assert!(err.is(ErrorKind::SymbolExists));
        assert_eq!(err.args, vec!["yu".to_string()]);
        let inner = UnitEnvironment::with_units(&[("zu", 2.0, Dimensions::TIME)]).unwrap();
        assert_eq!(custom_symbols(), vec!["yu".to_string(), "zu".to_string()]);
        drop(inner);
        assert_eq!(custom_symbols(), vec!["yu".to_string()]);
    }

    #[test]
    fn test_out_of_order_release() {
        let outer = UnitEnvironment::with_units(&[("outer_u", 1.0, Dimensions::LENGTH)]).unwrap();
        let inner = UnitEnvironment::with_units(&[("inner_u", 2.0, Dimensions::TIME)]).unwrap();
        drop(outer);
        assert!(custom_unit("outer_u").is_none());
        assert!(custom_unit("inner_u").is_none());
        drop(inner);
        assert!(custom_symbols().is_empty());

        let first = UnitEnvironment::with_units(&[("first_u", 1.0, Dimensions::MASS)]).unwrap();
        let second = UnitEnvironment::with_units(&[("second_u", 1.0, Dimensions::MASS)]).unwrap();
        drop(second);
        assert_eq!(custom_symbols(), vec!["first_u".to_string()]);
        drop(first);
        assert!(custom_symbols().is_empty());
    }

    #[test]
    fn test_released_on_error() {
        fn failing() -> Result<()> {
            let _env = UnitEnvironment::with_units(&[("wu", 1.0, Dimensions::MASS)])?;
            Quantity::parse(1.0, "kwu")?;
            Ok(())
        }
        assert!(failing().is_err());
        assert!(custom_unit("wu").is_none());
    }

    #[test]
    fn test_unit_from_quantity() {
        let q = Quantity::parse(2.0, "cm").unwrap();
        let unit = unit_from_quantity("len", &q).unwrap();
        assert!((unit.magnitude - 0.02).abs() < 1e-15);
        assert_eq!(unit.dimensions, Dimensions::LENGTH);
    }
}

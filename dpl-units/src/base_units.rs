//! Base units: an ordered multiset of prefixed unit symbols with exponents
//!
//! Insertion order is kept for printing; duplicates are merged and zero
//! exponents dropped on construction. Aggregate magnitude and dimensions
//! are computed on demand from the registry.

use crate::dimension::DIMENSION_SYMBOLS;
use crate::parse::{parse_unit_id, solve_units, SYMBOL_SYSTEM_UNIT};
use crate::systems;
use crate::units::{find_unit, UNITS};
use crate::Dimensions;
use dpl_core::{DplError, Fraction, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Separator between unit factors in an expression
pub const SYMBOL_MULTIPLY: &str = "*";

/// Prefixed unit symbol, e.g. prefix "k" and base "m"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId {
    pub prefix: String,
    pub base: String,
}

impl UnitId {
    pub fn new(prefix: &str, base: &str) -> Self {
        UnitId { prefix: prefix.to_string(), base: base.to_string() }
    }

    /// Unit without prefix
    pub fn plain(base: &str) -> Self {
        UnitId::new("", base)
    }

    pub fn symbol(&self) -> String {
        format!("{}{}", self.prefix, self.base)
    }

    pub fn is_system(&self) -> bool {
        self.base.starts_with(SYMBOL_SYSTEM_UNIT)
    }

    /// Magnitude and dimensions of this unit raised to `exp`
    pub fn resolve(&self, exp: Fraction) -> Result<(f64, Dimensions)> {
        let (magnitude, dimensions) = if self.is_system() {
            systems::resolve(&self.base)?
        } else {
            let unit = find_unit(&self.base)
                .ok_or_else(|| DplError::invalid_unit("Unknown unit", &self.base))?;
            let prefix = if self.prefix.is_empty() {
                1.0
            } else {
                UNITS
                    .prefix(&self.prefix)
                    .ok_or_else(|| DplError::invalid_unit("Unknown unit prefix", &self.symbol()))?
                    .magnitude
            };
            (prefix * unit.magnitude, unit.dimensions)
        };
        Ok((magnitude.powf(exp.to_f64()), dimensions.checked_scale(exp)?))
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.base)
    }
}

/// Ordered mapping from prefixed unit to exponent
#[derive(Debug, Clone, Default)]
pub struct BaseUnits {
    units: Vec<(UnitId, Fraction)>,
}

impl BaseUnits {
    // ========== Construction ==========

    pub fn new() -> Self {
        BaseUnits { units: Vec::new() }
    }

    /// Canonical form: duplicates merged in first-seen order, zero exponents dropped
    pub fn from_ids(units: impl IntoIterator<Item = (UnitId, Fraction)>) -> Result<Self> {
        let mut merged: Vec<(UnitId, Fraction)> = Vec::new();
        for (id, exp) in units {
            match merged.iter_mut().find(|(u, _)| *u == id) {
                Some((_, e)) => *e = e.checked_add(exp)?,
                None => merged.push((id, exp)),
            }
        }
        merged.retain(|(_, e)| !e.is_zero());
        Ok(BaseUnits { units: merged })
    }

    /// Parse a unit expression; any numeric factor is ignored
    pub fn parse(expression: &str) -> Result<Self> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(BaseUnits::new());
        }
        Ok(solve_units(expression)?.baseunits)
    }

    /// Base axis units (`m g s K C cd mol rad`) with the given exponents
    pub fn from_dimensions(dimensions: &Dimensions) -> Result<Self> {
        BaseUnits::from_ids(
            DIMENSION_SYMBOLS
                .iter()
                .zip(dimensions.exponents)
                .map(|(symbol, exp)| (UnitId::plain(symbol), exp)),
        )
    }

    /// Build from symbol/exponent pairs like `[("km", 1), ("s", -1)]`
    pub fn from_map<S: AsRef<str>>(map: impl IntoIterator<Item = (S, Fraction)>) -> Result<Self> {
        let mut units = Vec::new();
        for (symbol, exp) in map {
            units.push((parse_unit_id(symbol.as_ref())?, exp));
        }
        BaseUnits::from_ids(units)
    }

    // ========== Accessors ==========

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(UnitId, Fraction)> {
        self.units.iter()
    }

    /// Unit symbols without prefixes, in order
    pub fn bases(&self) -> Vec<&str> {
        self.units.iter().map(|(id, _)| id.base.as_str()).collect()
    }

    pub fn exponent(&self, symbol: &str) -> Option<Fraction> {
        self.units.iter().find(|(id, _)| id.symbol() == symbol).map(|(_, e)| *e)
    }

    /// Aggregate magnitude: product of (prefix * unit)^exp
    pub fn magnitude(&self) -> Result<f64> {
        let mut magnitude = 1.0;
        for (id, exp) in &self.units {
            magnitude *= id.resolve(*exp)?.0;
        }
        Ok(magnitude)
    }

    /// Aggregate dimensions: sum of exp * unit dimensions
    pub fn dimensions(&self) -> Result<Dimensions> {
        let mut dimensions = Dimensions::DIMENSIONLESS;
        for (id, exp) in &self.units {
            dimensions = dimensions.checked_add(&id.resolve(*exp)?.1)?;
        }
        Ok(dimensions)
    }

    /// Expression like "km*s-1"; empty when there are no units
    pub fn expression(&self) -> String {
        self.units
            .iter()
            .map(|(id, exp)| {
                if *exp == Fraction::ONE {
                    id.symbol()
                } else {
                    format!("{}{}", id.symbol(), exp)
                }
            })
            .collect::<Vec<_>>()
            .join(SYMBOL_MULTIPLY)
    }

    // ========== Arithmetic ==========

    /// Add exponents per unit (unit multiplication)
    pub fn add(&self, other: &BaseUnits) -> Result<BaseUnits> {
        BaseUnits::from_ids(self.units.iter().cloned().chain(other.units.iter().cloned()))
    }

    /// Subtract exponents per unit (unit division)
    pub fn sub(&self, other: &BaseUnits) -> Result<BaseUnits> {
        let mut units = self.units.clone();
        for (id, e) in &other.units {
            units.push((id.clone(), e.checked_neg()?));
        }
        BaseUnits::from_ids(units)
    }

    /// Multiply every exponent (unit powers)
    pub fn scale(&self, factor: Fraction) -> Result<BaseUnits> {
        let mut units = Vec::with_capacity(self.units.len());
        for (id, e) in &self.units {
            units.push((id.clone(), e.checked_mul(factor)?));
        }
        BaseUnits::from_ids(units)
    }

    /// Merge units of equal dimensions into the first one of each kind.
    /// Returns the new units and the factor the numeric value must be multiplied by.
    pub fn rebase(&self) -> Result<(BaseUnits, f64)> {
        let mut groups: Vec<(Dimensions, UnitId, f64, Fraction)> = Vec::new();
        let mut factor = 1.0;
        for (id, exp) in &self.units {
            let (magnitude, dimensions) = id.resolve(Fraction::ONE)?;
            match groups.iter_mut().find(|(dims, ..)| *dims == dimensions) {
                Some((_, _, first, total)) => {
                    factor *= (magnitude / *first).powf(exp.to_f64());
                    *total = total.checked_add(*exp)?;
                }
                None => groups.push((dimensions, id.clone(), magnitude, *exp)),
            }
        }
        let units = groups.into_iter().map(|(_, id, _, exp)| (id, exp));
        Ok((BaseUnits::from_ids(units)?, factor))
    }
}

/// Equality ignores order
impl PartialEq for BaseUnits {
    fn eq(&self, other: &Self) -> bool {
        self.units.len() == other.units.len()
            && self.units.iter().all(|(id, exp)| {
                other.units.iter().any(|(o, e)| o == id && e == exp)
            })
    }
}

impl fmt::Display for BaseUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression())
    }
}

impl Serialize for BaseUnits {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.units.len()))?;
        for (id, exp) in &self.units {
            map.serialize_entry(&id.symbol(), exp)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_core::ErrorKind;

    #[test]
    fn test_magnitude_and_dimensions() {
        let bu = BaseUnits::parse("km/s").unwrap();
        assert_eq!(bu.magnitude().unwrap(), 1e3);
        assert_eq!(bu.dimensions().unwrap(), Dimensions::VELOCITY);
        let bu = BaseUnits::parse("N").unwrap();
        assert_eq!(bu.magnitude().unwrap(), 1e3);
    }

    #[test]
    fn test_arithmetic() {
        let a = BaseUnits::parse("kg*m").unwrap();
        let b = BaseUnits::parse("m*s2").unwrap();
        assert_eq!(a.add(&b).unwrap().expression(), "kg*m2*s2");
        assert_eq!(a.sub(&b).unwrap().expression(), "kg*s-2");
        let half = Fraction::new(1, 2).unwrap();
        assert_eq!(BaseUnits::parse("m2").unwrap().scale(half).unwrap().expression(), "m");
    }

    #[test]
    fn test_exponent_overflow() {
        let big = BaseUnits::from_map([("m", Fraction::from_int(i64::MAX))]).unwrap();
        let err = big.add(&BaseUnits::parse("m").unwrap()).unwrap_err();
        assert!(err.is(ErrorKind::InvalidInput));
        assert!(big.scale(Fraction::from_int(2)).is_err());
        assert!(BaseUnits::from_map([("m", Fraction::from_int(i64::MIN))]).unwrap().sub(&big).is_err());
    }

    #[test]
    fn test_order_insensitive_equality() {
        let a = BaseUnits::parse("kg*m").unwrap();
        let b = BaseUnits::parse("m*kg").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, BaseUnits::parse("g*m").unwrap());
    }

    #[test]
    fn test_expression_round_trip() {
        for expr in ["km*s-1", "g1:2*cm-3:2", "[c]2*kg", "m"] {
            let bu = BaseUnits::parse(expr).unwrap();
            assert_eq!(BaseUnits::parse(&bu.expression()).unwrap(), bu);
        }
    }

    #[test]
    fn test_from_dimensions() {
        let bu = BaseUnits::from_dimensions(&Dimensions::FORCE).unwrap();
        assert_eq!(bu.expression(), "m*g*s-2");
        assert_eq!(bu.magnitude().unwrap(), 1.0);
    }

    #[test]
    fn test_from_map() {
        let bu = BaseUnits::from_map([("km", Fraction::ONE), ("s", Fraction::from_int(-1))]).unwrap();
        assert_eq!(bu, BaseUnits::parse("km/s").unwrap());
        assert!(BaseUnits::from_map([("kmin", Fraction::ONE)]).is_err());
    }

    #[test]
    fn test_rebase() {
        let (bu, factor) = BaseUnits::parse("cm*m*dm").unwrap().rebase().unwrap();
        assert_eq!(bu.expression(), "cm3");
        assert!((factor - 1000.0).abs() < 1e-9);
        let (bu, factor) = BaseUnits::parse("km*s/m").unwrap().rebase().unwrap();
        assert_eq!(bu.expression(), "s");
        assert!((factor - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_serialize_as_map() {
        let bu = BaseUnits::parse("km/s").unwrap();
        let json = serde_json::to_string(&bu).unwrap();
        assert_eq!(json, r#"{"km":"1","s":"-1"}"#);
    }
}

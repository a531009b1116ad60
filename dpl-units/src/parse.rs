//! Unit expression parsing
//!
//! Supports formats:
//! - Numbers: "3.5", "-1e-10"
//! - Simple units: "m", "kg", "[c]"
//! - Powers: "m2", "s-1", "cm1:2", "m^2"
//! - Products and quotients: "kg*m/s2", "g/(cm*s)"
//! - System units: "#SLEN", "#CFOR2"

use crate::base_units::{BaseUnits, UnitId};
use crate::unit::Prefixes;
use crate::units::{find_unit, match_suffix, UNITS};
use dpl_core::{DplError, Fraction, Result};
use dpl_solver::{Atom, ExpressionSolver, Operator, OperatorTable, Step};
use dpl_solver::OperatorType;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Marks a unit of a system of units, e.g. `#SLEN`
pub const SYMBOL_SYSTEM_UNIT: char = '#';

// ============ Compiled regex patterns ============

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?[0-9.]+(e[0-9+-]+)?$").unwrap())
}

fn exponent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\^?([0-9:+-]+)$").unwrap())
}

// ============ Unit atom ============

/// Normalized (magnitude, base units) pair produced by the unit solver
#[derive(Debug, Clone, PartialEq)]
pub struct UnitAtom {
    pub magnitude: f64,
    pub baseunits: BaseUnits,
}

impl UnitAtom {
    pub fn number(magnitude: f64) -> Self {
        UnitAtom { magnitude, baseunits: BaseUnits::new() }
    }

    pub fn unit(id: UnitId, exp: Fraction) -> Result<Self> {
        Ok(UnitAtom { magnitude: 1.0, baseunits: BaseUnits::from_ids([(id, exp)])? })
    }
}

impl Atom for UnitAtom {
    fn mul(self, other: Self) -> Result<Self> {
        Ok(UnitAtom {
            magnitude: self.magnitude * other.magnitude,
            baseunits: self.baseunits.add(&other.baseunits)?,
        })
    }

    fn truediv(self, other: Self) -> Result<Self> {
        Ok(UnitAtom {
            magnitude: self.magnitude / other.magnitude,
            baseunits: self.baseunits.sub(&other.baseunits)?,
        })
    }
}

impl fmt::Display for UnitAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.baseunits.is_empty() {
            write!(f, "Atom({:.3e})", self.magnitude)
        } else {
            write!(f, "Atom({:.3e} {})", self.magnitude, self.baseunits)
        }
    }
}

/// Parse a single token: a number or a (prefixed) unit symbol with exponent
pub fn parse_atom(text: &str) -> Result<UnitAtom> {
    let text = text.trim();
    if number_regex().is_match(text) {
        let value = text
            .parse::<f64>()
            .map_err(|_| DplError::invalid_input("Unrepresentable number").with_arg(text))?;
        return Ok(UnitAtom::number(value));
    }
    let (symbol, exp) = match exponent_regex().captures(text) {
        Some(caps) => {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let exp = caps.get(1).map_or("", |m| m.as_str());
            (&text[..text.len() - whole.len()], Fraction::from_str(exp)?)
        }
        None => (text, Fraction::ONE),
    };
    if symbol.is_empty() {
        return Err(DplError::invalid_unit("Exponent without a unit symbol", text));
    }
    UnitAtom::unit(parse_unit_id(symbol)?, exp)
}

/// Split a symbol like "km" into prefix and unit, checking the prefix policy
pub fn parse_unit_id(symbol: &str) -> Result<UnitId> {
    if symbol.starts_with(SYMBOL_SYSTEM_UNIT) {
        return Ok(UnitId::plain(symbol));
    }
    let base = match_suffix(symbol).ok_or_else(|| DplError::invalid_unit("Unknown unit", symbol))?;
    let prefix = &symbol[..symbol.len() - base.len()];
    if prefix.is_empty() {
        return Ok(UnitId::plain(&base));
    }
    if UNITS.prefix(prefix).is_none() {
        return Err(DplError::invalid_unit("Unknown unit prefix", symbol));
    }
    let unit = find_unit(&base).ok_or_else(|| DplError::invalid_unit("Unknown unit", &base))?;
    match &unit.prefixes {
        Prefixes::All => {}
        Prefixes::None => return Err(DplError::prefix_not_allowed(&base)),
        Prefixes::Only(list) if !list.iter().any(|p| p == prefix) => {
            return Err(DplError::prefix_not_listed(&base, prefix, list));
        }
        Prefixes::Only(_) => {}
    }
    Ok(UnitId::new(prefix, &base))
}

/// Evaluate a unit expression like "kg*m/s2" into a single atom
pub fn solve_units(expression: &str) -> Result<UnitAtom> {
    let table = OperatorTable::new().with_all(&[Operator::Par, Operator::Mul, Operator::Truediv]);
    let steps = vec![
        Step::new(OperatorType::Args, &[Operator::Par]),
        Step::new(OperatorType::Binary, &[Operator::Mul, Operator::Truediv]),
    ];
    ExpressionSolver::new(parse_atom, table).with_steps(steps).solve(expression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_core::ErrorKind;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_atom("1e-10").unwrap().magnitude, 1e-10);
        assert_eq!(parse_atom("-2.5").unwrap().magnitude, -2.5);
        assert!(parse_atom("42").unwrap().baseunits.is_empty());
    }

    #[test]
    fn test_parse_symbol() {
        let atom = parse_atom("km").unwrap();
        assert_eq!(atom.baseunits.expression(), "km");
        let atom = parse_atom("s-1").unwrap();
        assert_eq!(atom.baseunits.expression(), "s-1");
        let atom = parse_atom("cm1:2").unwrap();
        assert_eq!(atom.baseunits.expression(), "cm1:2");
        let atom = parse_atom("m^2").unwrap();
        assert_eq!(atom.baseunits.expression(), "m2");
        let atom = parse_atom("[a_0]3").unwrap();
        assert_eq!(atom.baseunits.expression(), "[a_0]3");
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_atom("qq").unwrap_err();
        assert!(err.is(ErrorKind::InvalidUnit));
        let err = parse_atom("xxm").unwrap_err();
        assert_eq!(err.message, "Unknown unit prefix");
        let err = parse_atom("kmin").unwrap_err();
        assert!(err.is(ErrorKind::PrefixNotAllowed));
        assert_eq!(err.args, vec!["min".to_string()]);
        let err = parse_atom("Mrad").unwrap_err();
        assert!(err.is(ErrorKind::PrefixNotAllowed));
        assert_eq!(err.args, vec!["rad".to_string(), "M".to_string()]);
    }

    #[test]
    fn test_exponent_after_group() {
        let err = solve_units("(m/s)^2").unwrap_err();
        assert!(err.is(ErrorKind::InvalidUnit));
        assert_eq!(err.args, vec!["^2".to_string()]);
        let err = parse_atom("^3").unwrap_err();
        assert_eq!(err.message, "Exponent without a unit symbol");
    }

    #[test]
    fn test_exponent_overflow() {
        let err = solve_units("m9223372036854775807*m9223372036854775807").unwrap_err();
        assert!(err.is(ErrorKind::InvalidInput));
        assert!(solve_units("m9223372036854775807/m").is_ok());
    }

    #[test]
    fn test_solve_units() {
        let atom = solve_units("kg*m/s2").unwrap();
        assert_eq!(atom.magnitude, 1.0);
        assert_eq!(atom.baseunits.expression(), "kg*m*s-2");
        let atom = solve_units("5/9*K").unwrap();
        assert!((atom.magnitude - 5.0 / 9.0).abs() < 1e-15);
        let atom = solve_units("g/(cm*s)").unwrap();
        assert_eq!(atom.baseunits.expression(), "g*cm-1*s-1");
        let atom = solve_units("m*m/m").unwrap();
        assert_eq!(atom.baseunits.expression(), "m");
    }

    #[test]
    fn test_system_units() {
        let atom = parse_atom("#SLEN2").unwrap();
        assert_eq!(atom.baseunits.expression(), "#SLEN2");
    }
}

//! Unit representation with magnitude, dimensions and prefix policy

use crate::Dimensions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which SI prefixes a unit accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prefixes {
    All,
    None,
    Only(Vec<String>),
}

impl Prefixes {
    pub fn only(list: &[&str]) -> Self {
        Prefixes::Only(list.iter().map(|s| s.to_string()).collect())
    }

    pub fn allows(&self, prefix: &str) -> bool {
        match self {
            Prefixes::All => true,
            Prefixes::None => false,
            Prefixes::Only(list) => list.iter().any(|p| p == prefix),
        }
    }
}

/// How a unit is defined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Definition {
    /// One of the 8 base axes
    Base,
    /// Expression the unit solver evaluates to the same magnitude and dimensions
    Expression(String),
    /// Affine temperature scale (Celsius, Fahrenheit)
    Temperature,
    /// Logarithmic scale (Bel, Neper and their referenced families)
    Logarithmic,
    /// Added at runtime by a unit environment
    Custom,
}

/// Classification controlling conversion rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    Standard,
    Logarithmic,
    Temperature,
    Dimensionless,
}

/// Represents a unit with its magnitude relative to the base units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    /// The unit symbol (e.g., "m", "eV", "[c]")
    pub symbol: String,
    /// The unit name (e.g., "meter", "electronvolt")
    pub name: String,
    /// Factor to convert to base units (gram is the mass base)
    pub magnitude: f64,
    /// The dimensional signature
    pub dimensions: Dimensions,
    pub definition: Definition,
    pub prefixes: Prefixes,
    /// Category for organization (e.g., "length", "energy", "constant")
    pub category: String,
}

impl UnitDef {
    pub fn new(
        symbol: &str,
        name: &str,
        magnitude: f64,
        dimensions: Dimensions,
        definition: Definition,
        prefixes: Prefixes,
        category: &str,
    ) -> Self {
        UnitDef {
            symbol: symbol.to_string(),
            name: name.to_string(),
            magnitude,
            dimensions,
            definition,
            prefixes,
            category: category.to_string(),
        }
    }

    /// Runtime unit without prefixes, named after its symbol
    pub fn custom(symbol: &str, magnitude: f64, dimensions: Dimensions) -> Self {
        UnitDef::new(symbol, symbol, magnitude, dimensions, Definition::Custom, Prefixes::None, "custom")
    }

    /// Builder: replace the prefix policy
    pub fn with_prefixes(mut self, prefixes: Prefixes) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// Builder: replace the display name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Physical constants use bracketed symbols like `[c]`
    pub fn is_constant(&self) -> bool {
        self.symbol.starts_with('[')
    }

    pub fn unit_type(&self) -> UnitType {
        match self.definition {
            Definition::Temperature => UnitType::Temperature,
            Definition::Logarithmic => UnitType::Logarithmic,
            _ if self.dimensions.is_dimensionless() => UnitType::Dimensionless,
            _ => UnitType::Standard,
        }
    }

    pub fn expression(&self) -> Option<&str> {
        match &self.definition {
            Definition::Expression(expr) => Some(expr),
            _ => None,
        }
    }
}

impl fmt::Display for UnitDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.name)
    }
}

/// Decimal prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixDef {
    pub symbol: String,
    pub name: String,
    pub magnitude: f64,
}

impl PrefixDef {
    pub fn new(symbol: &str, name: &str, magnitude: f64) -> Self {
        PrefixDef { symbol: symbol.to_string(), name: name.to_string(), magnitude }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_policy() {
        assert!(Prefixes::All.allows("k"));
        assert!(!Prefixes::None.allows("k"));
        let only = Prefixes::only(&["k", "M"]);
        assert!(only.allows("M"));
        assert!(!only.allows("m"));
    }

    #[test]
    fn test_unit_type() {
        let cel = UnitDef::new("Cel", "degree Celsius", 1.0, Dimensions::TEMPERATURE, Definition::Temperature, Prefixes::None, "temperature");
        assert_eq!(cel.unit_type(), UnitType::Temperature);
        let pct = UnitDef::new("%", "percent", 1e-2, Dimensions::DIMENSIONLESS, Definition::Expression("1e-2".into()), Prefixes::None, "ratio");
        assert_eq!(pct.unit_type(), UnitType::Dimensionless);
        let x = UnitDef::custom("x", 3.0, Dimensions::LENGTH);
        assert_eq!(x.unit_type(), UnitType::Standard);
        assert_eq!(x.prefixes, Prefixes::None);
        assert!(!x.is_constant());
    }
}

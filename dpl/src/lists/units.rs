//! Custom units defined with `$unit`

use crate::node::SourceRef;
use crate::settings::sign;
use dpl_core::{DplError, Result};
use dpl_units::environment::custom_unit;
use dpl_units::{unit_from_quantity, Quantity, UnitDef, UnitEnvironment, UNITS};
use tracing::debug;

/// A custom unit, named `[name]`
#[derive(Debug, Clone, PartialEq)]
pub struct EnvUnit {
    pub name: String,
    /// Value and units as written
    pub value: f64,
    pub units: Option<String>,
    pub quantity: Quantity,
    /// Registry entry resolved when the unit was defined
    pub def: UnitDef,
    pub source: SourceRef,
}

impl EnvUnit {
    /// Custom unit `[name]` equal to `value units`.
    /// Units it is expressed in must be in scope.
    pub fn new(name: &str, value: f64, units: Option<&str>, source: SourceRef) -> Result<Self> {
        let name = format!("[{}]", name);
        let quantity = Quantity::parse(value, units.unwrap_or(""))?;
        let def = unit_from_quantity(&name, &quantity)?;
        Ok(EnvUnit { name, value, units: units.map(str::to_string), quantity, def, source })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitList {
    units: Vec<EnvUnit>,
}

impl UnitList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, unit: EnvUnit) -> Result<()> {
        if self.get(&unit.name).is_some() || UNITS.contains(&unit.name) {
            return Err(DplError::symbol_exists(&unit.name));
        }
        debug!(unit = %unit.name, quantity = %unit.quantity, "custom unit defined");
        self.units.push(unit);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&EnvUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvUnit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// `*` selects all units, otherwise an exact name with or without brackets
    pub fn query(&self, query: &str) -> Vec<EnvUnit> {
        let query = query.trim();
        self.units
            .iter()
            .filter(|u| {
                query == sign::WILDCARD || u.name == query || u.name == format!("[{}]", query)
            })
            .cloned()
            .collect()
    }

    /// Make the units known to the unit solver until the guard is dropped.
    /// Units already in scope are skipped.
    pub fn enter(&self) -> Result<UnitEnvironment> {
        let defs = self
            .units
            .iter()
            .filter(|u| custom_unit(&u.name).is_none())
            .map(|u| u.def.clone())
            .collect();
        UnitEnvironment::enter(defs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_core::ErrorKind;

    #[test]
    fn test_custom_units_in_scope() {
        let mut units = UnitList::new();
        units.add(EnvUnit::new("length", 1.0, Some("cm"), SourceRef::new("test", 1)).unwrap()).unwrap();
        {
            let _scope = units.enter().unwrap();
            let width = Quantity::parse(3.0, "[length]").unwrap();
            assert!((width.value_in("mm").unwrap().as_scalar().unwrap() - 30.0).abs() < 1e-9);
            let _nested = units.enter().unwrap();
        }
        assert!(Quantity::parse(3.0, "[length]").is_err());
    }

    #[test]
    fn test_chained_definitions() {
        let mut units = UnitList::new();
        units.add(EnvUnit::new("span", 2.0, Some("cm"), SourceRef::new("test", 1)).unwrap()).unwrap();
        let stride = {
            let _scope = units.enter().unwrap();
            EnvUnit::new("stride", 3.0, Some("[span]"), SourceRef::new("test", 2)).unwrap()
        };
        units.add(stride).unwrap();
        assert!((units.get("[stride]").unwrap().def.magnitude - 0.06).abs() < 1e-12);

        let _scope = units.enter().unwrap();
        let walk = Quantity::parse(2.0, "[stride]").unwrap();
        assert!((walk.value_in("cm").unwrap().as_scalar().unwrap() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicates() {
        let mut units = UnitList::new();
        let unit = EnvUnit::new("x", 2.0, Some("s"), SourceRef::new("test", 1)).unwrap();
        units.add(unit.clone()).unwrap();
        assert!(units.add(unit).unwrap_err().is(ErrorKind::SymbolExists));
        assert_eq!(units.query("x").len(), 1);
        assert_eq!(units.query("*").len(), 1);
    }
}

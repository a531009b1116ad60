//! Systems of units
//!
//! Each physical quantity has a three letter code and, per system, the unit
//! expression it is measured in. A system unit symbol is written as
//! `#<system letter><code>`, e.g. `#SLEN` (SI length) or `#CFOR` (CGS force).

use crate::parse::{solve_units, SYMBOL_SYSTEM_UNIT};
use crate::Dimensions;
use dpl_core::{DplError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum System {
    SI,
    AU,
    CGS,
    GAUSS,
    ESU,
    EMU,
}

impl System {
    pub const ALL: [System; 6] = [System::SI, System::AU, System::CGS, System::GAUSS, System::ESU, System::EMU];

    /// Letter used in system unit symbols
    pub fn letter(&self) -> char {
        match self {
            System::SI => 'S',
            System::AU => 'A',
            System::CGS => 'C',
            System::GAUSS => 'G',
            System::ESU => 'E',
            System::EMU => 'M',
        }
    }

    pub fn from_letter(letter: char) -> Option<System> {
        System::ALL.into_iter().find(|s| s.letter() == letter)
    }

    fn column(&self) -> usize {
        match self {
            System::SI => 0,
            System::AU => 1,
            System::CGS => 2,
            System::GAUSS => 3,
            System::ESU => 4,
            System::EMU => 5,
        }
    }

    /// Symbol of a quantity in this system, e.g. `#SLEN` for SI "Length"
    pub fn symbol(&self, quantity: &str) -> Result<String> {
        let row = quantity_by_name(quantity)
            .ok_or_else(|| DplError::invalid_input("Unknown physical quantity").with_arg(quantity))?;
        Ok(format!("{}{}{}", SYMBOL_SYSTEM_UNIT, self.letter(), row.code))
    }

    /// Unit expression of a quantity in this system, if the system defines one
    pub fn expression(&self, row: &QuantityRow) -> Option<&'static str> {
        row.units[self.column()]
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            System::SI => "SI",
            System::AU => "AU",
            System::CGS => "CGS",
            System::GAUSS => "GAUSS",
            System::ESU => "ESU",
            System::EMU => "EMU",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for System {
    type Err = DplError;

    fn from_str(s: &str) -> Result<Self> {
        System::ALL
            .into_iter()
            .find(|system| system.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| DplError::invalid_input("Unknown system of units").with_arg(s))
    }
}

/// One physical quantity with its unit in each system (SI, AU, CGS, GAUSS, ESU, EMU)
#[derive(Debug, Clone, Copy)]
pub struct QuantityRow {
    pub name: &'static str,
    pub code: &'static str,
    pub units: [Option<&'static str>; 6],
}

const fn row(name: &'static str, code: &'static str, units: [Option<&'static str>; 6]) -> QuantityRow {
    QuantityRow { name, code, units }
}

const N: Option<&str> = None;

const fn u(expr: &'static str) -> Option<&'static str> {
    Some(expr)
}

// ========== Quantity table ==========

pub static QUANTITY_LIST: &[QuantityRow] = &[
    row("AbsorbedDose", "ADO", [u("Gy"), N, u("Rad"), u("Rad"), u("Rad"), u("Rad")]),
    row("Acceleration", "ACC", [u("m/s2"), N, u("Gal"), u("Gal"), u("Gal"), u("Gal")]),
    row("Action", "ACT", [u("J*s"), u("[hbar]"), N, N, N, N]),
    row("AmountOfSubstance", "AOS", [u("mol"), N, N, N, N, N]),
    row("AngularFrequency", "AFR", [u("rad/s"), N, N, N, N, N]),
    row("Capacitance", "CAP", [u("F"), N, N, u("cm"), u("cm"), N]),
    row("CatalyticActivity", "CAC", [u("kat"), N, N, N, N, N]),
    row("Conductance", "CON", [u("S"), N, N, N, N, N]),
    row("DynamicViscosity", "DVI", [u("Pa*s"), N, u("P"), u("P"), u("P"), u("P")]),
    row("ElectricCurrent", "ECU", [u("A"), u("[e]*E_h/[hbar]"), u("Bi"), u("statA"), u("statA"), u("abA")]),
    row("ElectricCharge", "ECH", [u("C"), u("[e]"), N, u("statC"), u("statC"), u("abC")]),
    row("ElectricChargeDensity", "ECD", [u("C/m3"), u("[e]/[a_0]3"), N, N, N, N]),
    row("ElectricPotential", "EPO", [u("V"), u("E_h/[e]"), N, u("statV"), u("statV"), N]),
    row("ElectricDipoleMoment", "EDM", [u("C*m"), u("[e]*[a_0]"), N, u("statC*cm"), u("statC*cm"), u("abC*cm")]),
    row("ElectricDisplField", "EDF", [u("C*m2"), N, N, u("statC/cm2"), u("statC/cm2"), u("abC/cm2")]),
    row("ElectricField", "EFI", [u("V/m"), u("E_h/([e]*[a_0])"), N, u("statV/cm"), u("statV/cm"), N]),
    row("ElectricFieldGradient", "EFG", [u("V/m2"), u("E_h/([e]*[a_0]2)"), N, N, N, N]),
    row("ElectricFlux", "EFL", [u("V*m"), N, N, u("statC"), u("statC"), u("abC")]),
    row("ElectricPolarizability", "EPL", [u("m2/J"), u("[e]2*[a_0]2/E_h"), N, N, N, N]),
    row("ElectromotiveForce", "EFO", [u("V"), N, N, N, N, N]),
    row("Energy", "ENE", [u("J"), u("E_h"), u("erg"), u("erg"), u("erg"), u("erg")]),
    row("EquivalentDose", "EDO", [u("Sv"), N, N, N, N, N]),
    row("Force", "FOR", [u("N"), u("E_h/[a_0]"), u("dyn"), u("dyn"), u("dyn"), u("dyn")]),
    row("Frequency", "FRE", [u("Hz"), N, N, N, N, N]),
    row("Heat", "HEA", [u("J"), N, N, N, N, N]),
    row("Illuminance", "ILL", [u("lx"), N, N, N, N, N]),
    row("Impedance", "IMP", [u("Ohm"), N, N, N, N, N]),
    row("Inductance", "IND", [u("H"), N, N, u("s2/cm"), N, u("abH")]),
    row("Irradience", "IRR", [u("W/m2"), u("E_h2/([hbar]*[a_0]2)"), N, N, N, N]),
    row("KinematicViscosity", "KVI", [u("m2/s"), N, u("St"), u("St"), u("St"), u("St")]),
    row("Length", "LEN", [u("m"), u("[a_0]"), u("cm"), u("cm"), u("cm"), u("cm")]),
    row("LuminousIntensity", "LIN", [u("cd"), N, N, N, N, N]),
    row("LuminousFlux", "LFL", [u("lm"), N, N, N, N, N]),
    row("MagneticField", "MFI", [u("A/m"), N, u("Oe"), u("statOe"), u("statA/cm"), u("statOe")]),
    row("MagneticFlux", "MFL", [u("Wb"), N, u("Mx"), u("statG*cm2"), N, u("statG*cm2")]),
    row("MagneticFluxDensity", "MFD", [u("T"), u("[hbar]/([e]*[a_0]2)"), u("G"), u("statG"), N, u("statG")]),
    row("MagneticDipoleMoment", "MDM", [u("J/T"), u("[hbar]*[e]/[m_e]"), N, u("erg/statG"), u("statC*cm2"), u("abA*cm2")]),
    row("Magnetizability", "MAG", [u("J/T2"), u("[e]2*[a_0]2/[m_e]"), N, N, N, N]),
    row("Mass", "MAS", [u("kg"), u("[m_e]"), u("g"), u("g"), u("g"), u("g")]),
    row("Momentum", "MOM", [u("kg*m/s"), u("[hbar]/[a_0]"), N, N, N, N]),
    row("Permittivity", "PER", [u("F/m"), u("[e]2/([a_0]*E_h)"), N, N, N, N]),
    row("PlaneAngle", "PAN", [u("rad"), N, N, N, N, N]),
    row("Power", "POW", [u("W"), N, u("erg/s"), u("erg/s"), u("erg/s"), u("erg/s")]),
    row("Pressure", "PRE", [u("Pa"), u("E_h/[a_0]3"), u("Ba"), u("Ba"), u("Ba"), u("Ba")]),
    row("RadiantFlux", "RFL", [u("W"), N, N, N, N, N]),
    row("Radioactivity", "RAD", [u("Bq"), N, N, N, N, N]),
    row("Reactance", "REA", [u("Ohm"), N, N, N, N, N]),
    row("Resistance", "RES", [u("Ohm"), N, N, u("s/cm"), u("s/cm"), u("abOhm")]),
    row("Resistivity", "REI", [u("Ohm*m"), N, N, u("s"), u("s"), u("abOhm*cm")]),
    row("SolidAnge", "SAN", [u("sr"), N, N, N, N, N]),
    row("Stress", "STR", [u("Pa"), N, N, N, N, N]),
    row("Temperature", "TEM", [u("K"), N, N, N, N, N]),
    row("Time", "TIM", [u("s"), u("[hbar]/E_h"), u("s"), u("s"), u("s"), u("s")]),
    row("Velocity", "VEL", [u("m/s"), u("[a_0]*E_h/[hbar]"), u("cm/s"), u("cm/s"), u("cm/s"), u("cm/s")]),
    row("Voltage", "VOL", [u("V"), N, N, N, N, N]),
    row("Wavenumber", "WAV", [u("m-1"), N, u("Ka"), u("Ka"), u("Ka"), u("Ka")]),
    row("Weight", "WEI", [u("N"), N, N, N, N, N]),
    row("Work", "WOR", [u("J"), N, N, N, N, N]),
    // Constants
    row("BohrMagneton", "BMA", [u("[mu_B]"), u("[mu_B]"), u("[mu_B]"), u("[esu_mu_B]"), u("[emu_mu_B]"), u("[emu_mu_B]")]),
    row("CoulombConst", "CCO", [u("[k_e]"), u("[k_e]"), u("[k_e]"), u("1"), u("1"), u("[c]2")]),
    row("ElementaryCharge", "ELC", [u("[e]"), u("[e]"), u("[e]"), u("[esu_e]"), u("[esu_e]"), u("[emu_e]")]),
    row("PermeabilityVacuum", "PBV", [u("[mu_0]"), u("[mu_0]"), u("[mu_0]"), u("1"), u("[c]-2"), u("1")]),
    row("PermittivityVacuum", "PTV", [u("[eps_0]"), u("[eps_0]"), u("[eps_0]"), u("1"), u("1"), u("[c]-2")]),
];

pub fn quantity_by_name(name: &str) -> Option<&'static QuantityRow> {
    QUANTITY_LIST.iter().find(|row| row.name == name)
}

pub fn quantity_by_code(code: &str) -> Option<&'static QuantityRow> {
    QUANTITY_LIST.iter().find(|row| row.code == code)
}

/// Split `#SLEN` into its system and quantity row
pub fn lookup(symbol: &str) -> Result<(System, &'static QuantityRow)> {
    let invalid = || DplError::invalid_unit("Unknown system unit", symbol);
    let rest = symbol.strip_prefix(SYMBOL_SYSTEM_UNIT).ok_or_else(invalid)?;
    let mut chars = rest.chars();
    let system = chars.next().and_then(System::from_letter).ok_or_else(invalid)?;
    let row = quantity_by_code(chars.as_str()).ok_or_else(invalid)?;
    Ok((system, row))
}

/// Magnitude and dimensions of a system unit symbol
pub fn resolve(symbol: &str) -> Result<(f64, Dimensions)> {
    let (system, row) = lookup(symbol)?;
    let expression = system.expression(row).ok_or_else(|| {
        DplError::invalid_unit("Quantity is not defined in this system of units", symbol)
            .with_arg(system)
    })?;
    let atom = solve_units(expression)?;
    Ok((atom.magnitude * atom.baseunits.magnitude()?, atom.baseunits.dimensions()?))
}

/// Unit expression of the first quantity in `system` with the given dimensions
pub fn expression_for(system: System, dimensions: &Dimensions) -> Result<&'static str> {
    for row in QUANTITY_LIST {
        let Some(expression) = system.expression(row) else {
            continue;
        };
        if solve_units(expression)?.baseunits.dimensions()? == *dimensions {
            return Ok(expression);
        }
    }
    Err(DplError::dimension_mismatch(dimensions, system))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_core::ErrorKind;

    #[test]
    fn test_symbols() {
        assert_eq!(System::SI.symbol("Length").unwrap(), "#SLEN");
        assert_eq!(System::CGS.symbol("Force").unwrap(), "#CFOR");
        assert!(System::SI.symbol("Happiness").is_err());
        assert_eq!("gauss".parse::<System>().unwrap(), System::GAUSS);
    }

    #[test]
    fn test_resolve() {
        let (mag, dims) = resolve("#SLEN").unwrap();
        assert_eq!(mag, 1.0);
        assert_eq!(dims, Dimensions::LENGTH);
        let (mag, dims) = resolve("#CFOR").unwrap();
        assert!((mag - 1e-2).abs() < 1e-15);
        assert_eq!(dims, Dimensions::FORCE);
        let (mag, dims) = resolve("#GCCO").unwrap();
        assert_eq!(mag, 1.0);
        assert!(dims.is_dimensionless());
    }

    #[test]
    fn test_resolve_errors() {
        assert!(resolve("#XLEN").unwrap_err().is(ErrorKind::InvalidUnit));
        assert!(resolve("#SXXX").unwrap_err().is(ErrorKind::InvalidUnit));
        assert!(resolve("#CACT").unwrap_err().is(ErrorKind::InvalidUnit));
    }

    #[test]
    fn test_table_expressions_parse() {
        for row in QUANTITY_LIST {
            for system in System::ALL {
                if let Some(expression) = system.expression(row) {
                    let atom = solve_units(expression).unwrap();
                    atom.baseunits.dimensions().unwrap();
                }
            }
        }
    }

    #[test]
    fn test_expression_for() {
        assert_eq!(expression_for(System::CGS, &Dimensions::FORCE).unwrap(), "dyn");
        assert_eq!(expression_for(System::SI, &Dimensions::ENERGY).unwrap(), "J");
        let err = expression_for(System::CGS, &Dimensions::TEMPERATURE).unwrap_err();
        assert!(err.is(ErrorKind::DimensionMismatch));
    }
}

//! Unit conversions
//!
//! Three rules are tried in order:
//!
//! 1. **Temperature**: either side uses `Cel` or `degF`; affine maps between
//!    single temperature units.
//! 2. **Logarithmic**: either side uses a Bel or Neper unit; ratio, power,
//!    amplitude and level conversions.
//! 3. **Standard**: equal dimensions scale linearly, opposite dimensions invert.
//!
//! Every rule maps `value * from.magnitude` through a transform and divides by
//! `to.magnitude`. Errors are propagated through the derivative of the transform.

use crate::base_units::BaseUnits;
use dpl_core::{DplError, ErrorKind, Magnitude, Result};
use std::f64::consts::LN_10;

/// Units triggering the temperature rule
pub const TEMPERATURE_UNITS: [&str; 2] = ["Cel", "degF"];

/// Units triggering the logarithmic rule
pub const LOGARITHMIC_UNITS: [&str; 13] = [
    "Np", "B", "Bm", "BmW", "BW", "BV", "BuV", "BA", "BuA", "BOhm", "BSPL", "BSIL", "BSWL",
];

/// Bel to Neper factor
const NEPERS_PER_BEL: f64 = 1.151277918;

/// Which rule handled a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Temperature,
    Logarithmic,
    Standard,
}

/// Value transform applied between the two unit magnitudes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Linear,
    Inverse,
    /// `slope * x + offset`
    Affine { slope: f64, offset: f64 },
    /// `exp * log10(x * conv)`
    RatioToBel { exp: f64, conv: f64 },
    /// `10^(x / exp) * conv`
    BelToRatio { exp: f64, conv: f64 },
    /// `exp * ln(x * conv)`
    RatioToNeper { exp: f64, conv: f64 },
    /// `e^(x / exp) * conv`
    NeperToRatio { exp: f64, conv: f64 },
}

impl Transform {
    fn shift(offset: f64) -> Transform {
        Transform::Affine { slope: 1.0, offset }
    }

    pub fn value(&self, x: f64) -> f64 {
        match *self {
            Transform::Linear => x,
            Transform::Inverse => 1.0 / x,
            Transform::Affine { slope, offset } => slope * x + offset,
            Transform::RatioToBel { exp, conv } => exp * (x * conv).log10(),
            Transform::BelToRatio { exp, conv } => 10f64.powf(x / exp) * conv,
            Transform::RatioToNeper { exp, conv } => exp * (x * conv).ln(),
            Transform::NeperToRatio { exp, conv } => (x / exp).exp() * conv,
        }
    }

    pub fn derivative(&self, x: f64) -> f64 {
        match *self {
            Transform::Linear => 1.0,
            Transform::Inverse => -1.0 / (x * x),
            Transform::Affine { slope, .. } => slope,
            Transform::RatioToBel { exp, .. } => exp / (x * LN_10),
            Transform::BelToRatio { exp, conv } => 10f64.powf(x / exp) * conv * LN_10 / exp,
            Transform::RatioToNeper { exp, .. } => exp / x,
            Transform::NeperToRatio { exp, conv } => (x / exp).exp() * conv / exp,
        }
    }
}

/// Resolved conversion between two sets of base units
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub rule: Rule,
    pub transform: Transform,
    pub from: f64,
    pub to: f64,
}

impl Conversion {
    /// Resolve how values in `from` are expressed in `to`
    pub fn new(from: &BaseUnits, to: &BaseUnits) -> Result<Conversion> {
        let units1 = from.bases();
        let units2 = to.bases();
        let uses = |list: &[&str]| units1.iter().chain(units2.iter()).any(|u| list.contains(u));

        let (rule, transform) = if uses(&TEMPERATURE_UNITS) {
            (Rule::Temperature, temperature_transform(&units1, &units2)?)
        } else if uses(&LOGARITHMIC_UNITS) {
            (Rule::Logarithmic, logarithmic_transform(&units1, &units2)?)
        } else {
            (Rule::Standard, standard_transform(from, to)?)
        };
        Ok(Conversion { rule, transform, from: from.magnitude()?, to: to.magnitude()? })
    }

    pub fn convert_value(&self, value: f64) -> f64 {
        self.transform.value(value * self.from) / self.to
    }

    /// Convert a magnitude, propagating its error
    pub fn apply(&self, magnitude: &Magnitude) -> Magnitude {
        let (t, from, to) = (self.transform, self.from, self.to);
        magnitude.apply(
            |v| t.value(v * from) / to,
            |v| t.derivative(v * from) * from / to,
        )
    }
}

/// Convert a magnitude from one set of units to another
pub fn convert(magnitude: &Magnitude, from: &BaseUnits, to: &BaseUnits) -> Result<Magnitude> {
    Ok(Conversion::new(from, to)?.apply(magnitude))
}

fn mismatch(units1: &[&str], units2: &[&str]) -> DplError {
    DplError::dimension_mismatch(units1.join("*"), units2.join("*"))
}

// ========== Temperature ==========

fn temperature_transform(units1: &[&str], units2: &[&str]) -> Result<Transform> {
    if units1.len() != 1 || units2.len() != 1 {
        return Err(DplError::new(
            ErrorKind::DimensionMismatch,
            "Only simple units can be converted between each other",
        )
        .with_arg(units1.join("*"))
        .with_arg(units2.join("*")));
    }
    let affine = |slope: f64, offset: f64| Transform::Affine { slope, offset };
    let transform = match (units1[0], units2[0]) {
        (a, b) if a == b => Transform::Linear,
        ("K", "Cel") => affine(1.0, -273.15),
        ("K", "degF") => affine(9.0 / 5.0, -273.15 * 9.0 / 5.0 + 32.0),
        ("degR", "degF") => affine(9.0 / 5.0, -459.67),
        ("degR", "Cel") => affine(1.0, -491.67 * 5.0 / 9.0),
        ("Cel", "K") => affine(1.0, 273.15),
        ("Cel", "degF") => affine(9.0 / 5.0, 32.0),
        ("Cel", "degR") => affine(1.0, 491.67 * 5.0 / 9.0),
        ("degF", "K") => affine(5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0),
        ("degF", "Cel") => affine(5.0 / 9.0, -32.0 * 5.0 / 9.0),
        ("degF", "degR") => affine(5.0 / 9.0, 459.67 * 5.0 / 9.0),
        _ => return Err(mismatch(units1, units2)),
    };
    Ok(transform)
}

// ========== Logarithmic ==========

fn logarithmic_transform(units1: &[&str], units2: &[&str]) -> Result<Transform> {
    if !(1..=2).contains(&units1.len()) || !(1..=2).contains(&units2.len()) {
        return Err(DplError::new(
            ErrorKind::DimensionMismatch,
            "Only simple and fraction units can be converted between each other",
        )
        .with_arg(units1.join("*"))
        .with_arg(units2.join("*")));
    }
    let to_bel = |exp: f64, conv: f64| Transform::RatioToBel { exp, conv };
    let from_bel = |exp: f64, conv: f64| Transform::BelToRatio { exp, conv };
    let transform = match (units1[0], units2[0]) {
        (a, b) if a == b => Transform::Linear,
        // power ratios
        ("PR", "Np") => Transform::RatioToNeper { exp: 0.5, conv: 1.0 },
        ("Np", "PR") => Transform::NeperToRatio { exp: 0.5, conv: 1.0 },
        ("PR", "B") => to_bel(1.0, 1.0),
        ("B", "PR") => from_bel(1.0, 1.0),
        ("W", "Bm") | ("W", "BmW") => to_bel(1.0, 1.0),
        ("Bm", "W") | ("BmW", "W") => from_bel(1.0, 1.0),
        ("W", "BW") => to_bel(1.0, 1e-3),
        ("BW", "W") => from_bel(1.0, 1e3),
        ("W", "BSIL") | ("W", "BSWL") => to_bel(1.0, 1e9),
        ("BSIL", "W") | ("BSWL", "W") => from_bel(1.0, 1e-9),
        // amplitude ratios
        ("AR", "Np") => Transform::RatioToNeper { exp: 1.0, conv: 1.0 },
        ("Np", "AR") => Transform::NeperToRatio { exp: 1.0, conv: 1.0 },
        ("AR", "B") => to_bel(2.0, 1.0),
        ("B", "AR") => from_bel(2.0, 1.0),
        ("V", "BV") => to_bel(2.0, 1e-3),
        ("BV", "V") => from_bel(2.0, 1e3),
        ("V", "BuV") => to_bel(2.0, 1e3),
        ("BuV", "V") => from_bel(2.0, 1e-3),
        ("A", "BA") => to_bel(2.0, 1.0),
        ("BA", "A") => from_bel(2.0, 1.0),
        ("A", "BuA") => to_bel(2.0, 1e6),
        ("BuA", "A") => from_bel(2.0, 1e-6),
        ("Ohm", "BOhm") => to_bel(2.0, 1e-3),
        ("BOhm", "Ohm") => from_bel(2.0, 1e3),
        ("Pa", "BSPL") => to_bel(2.0, 50.0),
        ("BSPL", "Pa") => from_bel(2.0, 0.02),
        // levels with different references
        ("BW", "Bm") | ("BW", "BmW") => Transform::shift(3.0),
        ("Bm", "BW") | ("BmW", "BW") => Transform::shift(-3.0),
        ("Bm", "BmW") | ("BmW", "Bm") => Transform::Linear,
        ("BV", "BuV") => Transform::shift(12.0),
        ("BuV", "BV") => Transform::shift(-12.0),
        // Bel and Neper
        ("B", "Np") => Transform::Affine { slope: NEPERS_PER_BEL, offset: 0.0 },
        ("Np", "B") => Transform::Affine { slope: 1.0 / NEPERS_PER_BEL, offset: 0.0 },
        _ => return Err(mismatch(units1, units2)),
    };
    Ok(transform)
}

/// Add or subtract two logarithmic magnitudes in linear space.
/// `right` must already be expressed in the units of `left`.
pub fn logarithmic_sum(
    left: &Magnitude,
    right: &Magnitude,
    units: &BaseUnits,
    subtract: bool,
) -> Result<Magnitude> {
    let m = units.magnitude()?;
    let linear = |mag: &Magnitude| {
        mag.apply(|v| 10f64.powf(v * m), |v| LN_10 * m * 10f64.powf(v * m))
    };
    let (a, b) = (linear(left), linear(right));
    let sum = if subtract { a.sub(&b)? } else { a.add(&b)? };
    Ok(sum.apply(|v| v.log10() / m, |v| 1.0 / (v * LN_10 * m)))
}

// ========== Standard ==========

fn standard_transform(from: &BaseUnits, to: &BaseUnits) -> Result<Transform> {
    let dims1 = from.dimensions()?;
    let dims2 = to.dimensions()?;
    if dims1 == dims2 {
        Ok(Transform::Linear)
    } else if -dims1 == dims2 {
        Ok(Transform::Inverse)
    } else if from.is_empty() && to.bases() == ["rad"] {
        Ok(Transform::Linear)
    } else {
        Err(DplError::dimension_mismatch(from.expression(), to.expression()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(v: f64, from: &str, to: &str) -> f64 {
        let from = BaseUnits::parse(from).unwrap();
        let to = BaseUnits::parse(to).unwrap();
        Conversion::new(&from, &to).unwrap().convert_value(v)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_standard() {
        assert!(close(value(1.0, "km", "m"), 1000.0));
        assert!(close(value(1.0, "N", "dyn"), 1e5));
        assert!(close(value(2.0, "Hz", "s"), 0.5));
        assert!((value(180.0, "deg", "rad") - std::f64::consts::PI).abs() < 1e-6);
        assert!(close(value(0.5, "", "rad"), 0.5));
    }

    #[test]
    fn test_standard_mismatch() {
        let err = Conversion::new(&BaseUnits::parse("m").unwrap(), &BaseUnits::parse("s").unwrap())
            .unwrap_err();
        assert!(err.is(ErrorKind::DimensionMismatch));
    }

    #[test]
    fn test_temperature() {
        assert!(close(value(23.0, "K", "Cel"), -250.15));
        assert!(close(value(100.0, "Cel", "degF"), 212.0));
        assert!(close(value(32.0, "degF", "K"), 273.15));
        assert!(close(value(0.0, "degR", "Cel"), -273.15));
        assert!(close(value(1.0, "Cel", "kK"), 0.27415));
        assert!(close(value(21.0, "Cel", "Cel"), 21.0));
        let err = Conversion::new(&BaseUnits::parse("Cel/s").unwrap(), &BaseUnits::parse("K/s").unwrap())
            .unwrap_err();
        assert!(err.is(ErrorKind::DimensionMismatch));
    }

    #[test]
    fn test_power_levels() {
        assert!(close(value(1.0, "W", "dBm"), 30.0));
        assert!(close(value(1.0, "W", "dBW"), 0.0));
        assert!(close(value(30.0, "dBm", "W"), 1.0));
        assert!(close(value(0.0, "dBW", "dBm"), 30.0));
        assert!(close(value(100.0, "PR", "dB"), 20.0));
    }

    #[test]
    fn test_amplitude_levels() {
        assert!(close(value(1.0, "V", "dBV"), 0.0));
        assert!(close(value(10.0, "AR", "dB"), 20.0));
        assert!(close(value(0.0, "dBV", "dBuV"), 120.0));
        assert!(close(value(2e-5, "Pa", "dBSPL"), 0.0));
    }

    #[test]
    fn test_bel_neper() {
        assert!(close(value(1.0, "B", "Np"), NEPERS_PER_BEL));
        assert!(close(value(1.0, "AR", "Np"), 0.0));
        assert!(close(value(1.0, "Np", "AR"), std::f64::consts::E));
    }

    #[test]
    fn test_logarithmic_mismatch() {
        let err = Conversion::new(&BaseUnits::parse("dBm").unwrap(), &BaseUnits::parse("Pa").unwrap())
            .unwrap_err();
        assert!(err.is(ErrorKind::DimensionMismatch));
    }

    #[test]
    fn test_error_propagation() {
        let km = BaseUnits::parse("km").unwrap();
        let m = BaseUnits::parse("m").unwrap();
        let mag = convert(&Magnitude::new(2.0).with_error(0.1), &km, &m).unwrap();
        assert!(close(mag.as_scalar().unwrap(), 2000.0));
        assert!(close(*mag.error.unwrap().as_scalar().unwrap(), 100.0));
    }

    #[test]
    fn test_logarithmic_sum() {
        let db = BaseUnits::parse("dB").unwrap();
        let sum = logarithmic_sum(&Magnitude::new(10.0), &Magnitude::new(10.0), &db, false).unwrap();
        assert!(close(sum.as_scalar().unwrap(), 10.0 + 10.0 * 2f64.log10()));
    }
}

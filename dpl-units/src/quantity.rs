//! Quantities: magnitudes paired with base units
//!
//! The numeric value of a quantity is expressed in its current units, so the
//! value in base axis units is `magnitude * baseunits.magnitude()`. Whenever
//! the total dimensions are zero, every unit carrying dimensions is folded
//! into the magnitude and only dimensionless units (`%`, `PR`, `dB`) remain.

use crate::base_units::BaseUnits;
use crate::convert::{logarithmic_sum, Conversion, Rule};
use crate::parse::solve_units;
use crate::systems::{self, System};
use crate::Dimensions;
use dpl_core::{DplError, Fraction, Magnitude, Result, SliceSpec, MAGNITUDE_PRECISION};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

/// Largest denominator tried when a float power is turned into a unit exponent
const MAX_EXPONENT_DENOMINATOR: i64 = 12;

#[derive(Debug, Clone)]
pub struct Quantity {
    pub magnitude: Magnitude,
    pub baseunits: BaseUnits,
}

impl Quantity {
    // ========== Construction ==========

    pub fn new(magnitude: impl Into<Magnitude>, baseunits: BaseUnits) -> Result<Quantity> {
        Quantity { magnitude: magnitude.into(), baseunits }.fold_dimensionless()
    }

    /// Value times a unit expression, e.g. `Quantity::parse(3.0, "km/s")`
    pub fn parse(magnitude: impl Into<Magnitude>, expression: &str) -> Result<Quantity> {
        let magnitude = magnitude.into();
        if expression.trim().is_empty() {
            return Ok(Quantity::dimensionless(magnitude));
        }
        let atom = solve_units(expression)?;
        Quantity::new(magnitude.scale(atom.magnitude), atom.baseunits)
    }

    pub fn dimensionless(magnitude: impl Into<Magnitude>) -> Quantity {
        Quantity { magnitude: magnitude.into(), baseunits: BaseUnits::new() }
    }

    /// Value in the base axis units of the given dimensions
    pub fn from_dimensions(magnitude: impl Into<Magnitude>, dimensions: &Dimensions) -> Result<Quantity> {
        Quantity::new(magnitude, BaseUnits::from_dimensions(dimensions)?)
    }

    /// Builder: set an absolute error
    pub fn with_error(mut self, error: f64) -> Quantity {
        self.magnitude = self.magnitude.with_error(error);
        self
    }

    /// Builder: set an error relative to the value
    pub fn with_relative_error(mut self, rel: f64) -> Quantity {
        self.magnitude = self.magnitude.with_relative_error(rel);
        self
    }

    fn fold_dimensionless(mut self) -> Result<Quantity> {
        if self.baseunits.is_empty() || !self.baseunits.dimensions()?.is_dimensionless() {
            return Ok(self);
        }
        let mut kept = Vec::new();
        for (id, exp) in self.baseunits.iter() {
            let (magnitude, dimensions) = id.resolve(*exp)?;
            if dimensions.is_dimensionless() {
                kept.push((id.clone(), *exp));
            } else {
                self.magnitude = self.magnitude.scale(magnitude);
            }
        }
        self.baseunits = BaseUnits::from_ids(kept)?;
        Ok(self)
    }

    // ========== Accessors ==========

    pub fn dimensions(&self) -> Result<Dimensions> {
        self.baseunits.dimensions()
    }

    pub fn is_dimensionless(&self) -> Result<bool> {
        Ok(self.dimensions()?.is_dimensionless())
    }

    /// Unit expression, empty for plain numbers
    pub fn units(&self) -> String {
        self.baseunits.expression()
    }

    pub fn as_scalar(&self) -> Option<f64> {
        self.magnitude.as_scalar()
    }

    pub fn is_scalar(&self) -> bool {
        self.magnitude.is_scalar()
    }

    /// Numeric value expressed in other units
    pub fn value_in(&self, units: &str) -> Result<Magnitude> {
        Ok(self.to(units)?.magnitude)
    }

    // ========== Arithmetic ==========

    pub fn add(&self, other: &Quantity) -> Result<Quantity> {
        self.combine(other, false)
    }

    pub fn sub(&self, other: &Quantity) -> Result<Quantity> {
        self.combine(other, true)
    }

    fn combine(&self, other: &Quantity, subtract: bool) -> Result<Quantity> {
        let dims1 = self.dimensions()?;
        let dims2 = other.dimensions()?;
        if dims1 != dims2 {
            return Err(DplError::dimension_mismatch(self.units(), other.units())
                .with_note("Only units with the same dimension can be added or subtracted"));
        }
        let conversion = Conversion::new(&other.baseunits, &self.baseunits)?;
        let right = conversion.apply(&other.magnitude);
        let magnitude = if conversion.rule == Rule::Logarithmic {
            if self.baseunits.bases() != other.baseunits.bases() {
                return Err(DplError::dimension_mismatch(self.units(), other.units())
                    .with_note("Only the same logarithmic units can be added or subtracted"));
            }
            logarithmic_sum(&self.magnitude, &right, &self.baseunits, subtract)?
        } else if subtract {
            self.magnitude.sub(&right)?
        } else {
            self.magnitude.add(&right)?
        };
        Quantity::new(magnitude, self.baseunits.clone())
    }

    pub fn mul(&self, other: &Quantity) -> Result<Quantity> {
        Quantity::new(self.magnitude.mul(&other.magnitude)?, self.baseunits.add(&other.baseunits)?)
    }

    pub fn div(&self, other: &Quantity) -> Result<Quantity> {
        Quantity::new(self.magnitude.div(&other.magnitude)?, self.baseunits.sub(&other.baseunits)?)
    }

    pub fn pow(&self, exp: Fraction) -> Result<Quantity> {
        Quantity::new(self.magnitude.powf(exp.to_f64()), self.baseunits.scale(exp)?)
    }

    /// Power by a float; with units the exponent must be a simple fraction
    pub fn powf(&self, exp: f64) -> Result<Quantity> {
        if self.baseunits.is_empty() {
            return Ok(Quantity::dimensionless(self.magnitude.powf(exp)));
        }
        self.pow(exponent_fraction(exp)?)
    }

    /// Power by another quantity, which must be a dimensionless scalar
    pub fn pow_quantity(&self, exp: &Quantity) -> Result<Quantity> {
        let exp = exp.to_units(&BaseUnits::new())?;
        let value = exp
            .as_scalar()
            .ok_or_else(|| DplError::invalid_input("Exponent must be a scalar").with_arg(&exp))?;
        self.powf(value)
    }

    pub fn neg(&self) -> Quantity {
        Quantity { magnitude: self.magnitude.neg(), baseunits: self.baseunits.clone() }
    }

    pub fn scale(&self, factor: f64) -> Quantity {
        Quantity { magnitude: self.magnitude.scale(factor), baseunits: self.baseunits.clone() }
    }

    // ========== Conversion ==========

    /// Convert to a unit expression; a numeric factor in the expression is honored
    pub fn to(&self, units: &str) -> Result<Quantity> {
        if units.trim().is_empty() {
            return self.to_units(&BaseUnits::new());
        }
        let atom = solve_units(units)?;
        let converted = Conversion::new(&self.baseunits, &atom.baseunits)?.apply(&self.magnitude);
        Ok(Quantity { magnitude: converted.scale(1.0 / atom.magnitude), baseunits: atom.baseunits })
    }

    pub fn to_units(&self, baseunits: &BaseUnits) -> Result<Quantity> {
        let magnitude = Conversion::new(&self.baseunits, baseunits)?.apply(&self.magnitude);
        Ok(Quantity { magnitude, baseunits: baseunits.clone() })
    }

    /// Express in the units of a system, e.g. newtons as `dyn` in CGS
    pub fn to_system(&self, system: System) -> Result<Quantity> {
        let expression = systems::expression_for(system, &self.dimensions()?)?;
        self.to(expression)
    }

    /// Merge units of equal dimensions, e.g. `cm*m*dm` becomes `cm3`
    pub fn rebase(&self) -> Result<Quantity> {
        let (baseunits, factor) = self.baseunits.rebase()?;
        Quantity::new(self.magnitude.scale(factor), baseunits)
    }

    // ========== Comparison ==========

    /// Values close within the magnitude precision and identical units.
    /// A nonzero right side is first converted to the units of `self`.
    pub fn equals(&self, other: &Quantity) -> Result<bool> {
        let other = if other.magnitude.value.all(|v| *v != 0.0) {
            other.to_units(&self.baseunits)?
        } else {
            other.clone()
        };
        Ok(self.magnitude.allclose(&other.magnitude, MAGNITUDE_PRECISION)
            && self.baseunits == other.baseunits)
    }

    pub fn lt(&self, other: &Quantity) -> Result<bool> {
        self.compare(other, |a, b| a < b)
    }

    pub fn le(&self, other: &Quantity) -> Result<bool> {
        self.compare(other, |a, b| a <= b)
    }

    pub fn gt(&self, other: &Quantity) -> Result<bool> {
        self.compare(other, |a, b| a > b)
    }

    pub fn ge(&self, other: &Quantity) -> Result<bool> {
        self.compare(other, |a, b| a >= b)
    }

    fn compare(&self, other: &Quantity, f: impl Fn(f64, f64) -> bool) -> Result<bool> {
        let other = other.to_units(&self.baseunits)?;
        let result = self.magnitude.value.zip_with(&other.magnitude.value, |a, b| f(*a, *b))?;
        Ok(result.all(|x| *x))
    }

    // ========== Arrays ==========

    pub fn slice(&self, specs: &[SliceSpec]) -> Result<Quantity> {
        Ok(Quantity { magnitude: self.magnitude.slice(specs)?, baseunits: self.baseunits.clone() })
    }

    /// Quantities along the first axis
    pub fn rows(&self) -> Vec<Quantity> {
        self.magnitude
            .rows()
            .into_iter()
            .map(|magnitude| Quantity { magnitude, baseunits: self.baseunits.clone() })
            .collect()
    }
}

/// Turn a float exponent into a fraction with a small denominator
fn exponent_fraction(exp: f64) -> Result<Fraction> {
    for den in 1..=MAX_EXPONENT_DENOMINATOR {
        let num = exp * den as f64;
        if (num - num.round()).abs() < 1e-9 {
            return Ok(Fraction::new(num.round() as i64, den)?);
        }
    }
    Err(DplError::invalid_input("Unit exponent cannot be represented as a fraction").with_arg(exp))
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other).unwrap_or(false)
    }
}

impl From<f64> for Quantity {
    fn from(value: f64) -> Self {
        Quantity::dimensionless(value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.baseunits.is_empty() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, self.baseunits)
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Quantity", 3)?;
        state.serialize_field("value", &self.magnitude.value.to_json(|v| (*v).into()))?;
        if let Some(error) = &self.magnitude.error {
            state.serialize_field("error", &error.to_json(|v| (*v).into()))?;
        }
        state.serialize_field("units", &self.units())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_core::ErrorKind;

    fn q(value: f64, units: &str) -> Quantity {
        Quantity::parse(value, units).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_parse() {
        let speed = q(3.0, "km/s");
        assert_eq!(speed.as_scalar(), Some(3.0));
        assert_eq!(speed.units(), "km*s-1");
        let scaled = q(2.0, "1e3*m");
        assert_eq!(scaled.as_scalar(), Some(2000.0));
        assert_eq!(scaled.units(), "m");
    }

    #[test]
    fn test_dimensionless_fold() {
        let ratio = q(1.0, "m/km");
        assert!(ratio.baseunits.is_empty());
        assert!(close(ratio.as_scalar().unwrap(), 1e-3));
        let percent = q(5.0, "%");
        assert_eq!(percent.units(), "%");
    }

    #[test]
    fn test_add_converts_to_left_units() {
        let sum = q(1.0, "m").add(&q(20.0, "cm")).unwrap();
        assert!(close(sum.as_scalar().unwrap(), 1.2));
        assert_eq!(sum.units(), "m");
        let err = q(1.0, "m").add(&q(1.0, "s")).unwrap_err();
        assert!(err.is(ErrorKind::DimensionMismatch));
    }

    #[test]
    fn test_mul_div_pow() {
        let area = q(2.0, "m").mul(&q(3.0, "m")).unwrap();
        assert_eq!(area.units(), "m2");
        assert!(close(area.as_scalar().unwrap(), 6.0));
        let speed = q(10.0, "m").div(&q(2.0, "s")).unwrap();
        assert_eq!(speed.units(), "m*s-1");
        let root = area.pow(Fraction::new(1, 2).unwrap()).unwrap();
        assert_eq!(root.units(), "m");
        assert!(close(root.as_scalar().unwrap(), 6f64.sqrt()));
        assert_eq!(q(4.0, "s").powf(-1.0).unwrap().units(), "s-1");
        assert!(q(4.0, "s").powf(0.3183).is_err());
    }

    #[test]
    fn test_to() {
        let length = q(1221.424, "cm").to("m").unwrap();
        assert!(close(length.as_scalar().unwrap(), 12.21424));
        let temp = q(23.0, "K").to("Cel").unwrap();
        assert!(close(temp.as_scalar().unwrap(), -250.15));
        let force = q(1.0, "N").to_system(System::CGS).unwrap();
        assert_eq!(force.units(), "dyn");
        assert!(close(force.as_scalar().unwrap(), 1e5));
        let err = q(1.0, "m").to("s").unwrap_err();
        assert!(err.is(ErrorKind::DimensionMismatch));
    }

    #[test]
    fn test_algebraic_laws() {
        let a = q(2.0, "m");
        let b = q(30.0, "cm");
        let c = q(0.5, "km");
        assert!(a.add(&b).unwrap().equals(&b.add(&a).unwrap()).unwrap());
        let left = a.add(&b).unwrap().add(&c).unwrap();
        let right = a.add(&b.add(&c).unwrap()).unwrap();
        assert!(left.equals(&right).unwrap());
        assert!(a.sub(&b).unwrap().neg().equals(&b.sub(&a).unwrap()).unwrap());

        let t = q(3.0, "s");
        let ab = a.mul(&t).unwrap();
        let ba = t.mul(&a).unwrap();
        assert_eq!(ab.baseunits, ba.baseunits);
        assert!(ab.equals(&ba).unwrap());
    }

    #[test]
    fn test_conversion_round_trip() {
        let length = q(1221.424, "cm");
        let back = length.to("ft").unwrap().to("cm").unwrap();
        assert!(back.equals(&length).unwrap());
        assert_eq!(back.units(), "cm");
        let temp = q(23.0, "K");
        let back = temp.to("degF").unwrap().to("K").unwrap();
        assert!((back.as_scalar().unwrap() - 23.0).abs() <= MAGNITUDE_PRECISION * 23.0);
    }

    #[test]
    fn test_scalar_keeps_exponents() {
        let two = Quantity::dimensionless(2.0);
        for units in ["km*s-1", "cm1:2", "g*m-3:2"] {
            let value = q(3.0, units);
            let doubled = value.mul(&two).unwrap();
            assert_eq!(doubled.baseunits, value.baseunits);
            assert_eq!(doubled.units(), value.units());
            assert!(close(doubled.as_scalar().unwrap(), 6.0));
            let halved = value.div(&two).unwrap();
            assert_eq!(halved.units(), value.units());
            assert!(close(halved.as_scalar().unwrap(), 1.5));
        }
    }

    #[test]
    fn test_equality() {
        assert_eq!(q(1.0, "km"), q(1000.0, "m"));
        assert_ne!(q(1.0, "km"), q(1.0, "m"));
        assert!(q(1.0, "m").equals(&q(1.0, "s")).is_err());
        assert!(!q(0.0, "m").equals(&q(0.0, "s")).unwrap());
    }

    #[test]
    fn test_comparison() {
        assert!(q(1.0, "km").gt(&q(999.0, "m")).unwrap());
        assert!(q(1.0, "km").le(&q(1000.0, "m")).unwrap());
        assert!(q(1.0, "m").lt(&q(1.0, "s")).is_err());
    }

    #[test]
    fn test_rebase() {
        let volume = q(1.0, "cm*m*dm").rebase().unwrap();
        assert_eq!(volume.units(), "cm3");
        assert!(close(volume.as_scalar().unwrap(), 1000.0));
    }

    #[test]
    fn test_logarithmic_add() {
        let sum = q(10.0, "dB").add(&q(10.0, "dB")).unwrap();
        assert!(close(sum.as_scalar().unwrap(), 10.0 + 10.0 * 2f64.log10()));
        let err = q(10.0, "dBm").add(&q(10.0, "dBmW")).unwrap_err();
        assert!(err.is(ErrorKind::DimensionMismatch));
    }

    #[test]
    fn test_error_propagation() {
        let length = q(2.0, "m").with_error(0.1);
        let area = length.mul(&q(3.0, "m")).unwrap();
        let error = area.magnitude.error.unwrap();
        assert!(close(*error.as_scalar().unwrap(), 0.3));
    }

    #[test]
    fn test_rows() {
        let q = Quantity::parse(Magnitude::from_vec(vec![1.0, 2.0, 3.0]), "m").unwrap();
        let rows = q.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].as_scalar(), Some(3.0));
        assert_eq!(rows[2].units(), "m");
    }

    #[test]
    fn test_display() {
        assert_eq!(q(3.0, "km").to_string(), "3.000e+00 km");
        assert_eq!(Quantity::from(2.0).to_string(), "2.000e+00");
    }
}

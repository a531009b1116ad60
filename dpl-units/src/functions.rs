//! Mathematical functions on quantities
//!
//! Values are transformed element-wise and errors propagated through the
//! derivative. Trigonometric functions take angles (or plain numbers, read
//! as radians); inverse trigonometric functions return radians.

use crate::base_units::BaseUnits;
use crate::quantity::Quantity;
use dpl_core::{DplError, Fraction, Magnitude, NdArray, Result};
use std::f64::consts::LN_10;

fn radians(q: &Quantity) -> Result<Magnitude> {
    Ok(q.to("rad")?.magnitude)
}

fn plain(q: &Quantity) -> Result<Magnitude> {
    Ok(q.to_units(&BaseUnits::new())?.magnitude)
}

fn with_units(magnitude: Magnitude, q: &Quantity) -> Result<Quantity> {
    Quantity::new(magnitude, q.baseunits.clone())
}

// ========== Powers ==========

pub fn sqrt(q: &Quantity) -> Result<Quantity> {
    q.pow(Fraction::new(1, 2)?)
}

pub fn cbrt(q: &Quantity) -> Result<Quantity> {
    let magnitude = q.magnitude.apply(f64::cbrt, |x| 1.0 / (3.0 * x.cbrt().powi(2)));
    Quantity::new(magnitude, q.baseunits.scale(Fraction::new(1, 3)?)?)
}

pub fn power(q: &Quantity, exp: f64) -> Result<Quantity> {
    q.powf(exp)
}

// ========== Trigonometry ==========

pub fn sin(q: &Quantity) -> Result<Quantity> {
    Ok(Quantity::dimensionless(radians(q)?.apply(f64::sin, f64::cos)))
}

pub fn cos(q: &Quantity) -> Result<Quantity> {
    Ok(Quantity::dimensionless(radians(q)?.apply(f64::cos, |x| -x.sin())))
}

pub fn tan(q: &Quantity) -> Result<Quantity> {
    Ok(Quantity::dimensionless(radians(q)?.apply(f64::tan, |x| 1.0 / x.cos().powi(2))))
}

pub fn arcsin(q: &Quantity) -> Result<Quantity> {
    let magnitude = plain(q)?.apply(f64::asin, |x| 1.0 / (1.0 - x * x).sqrt());
    Quantity::new(magnitude, BaseUnits::parse("rad")?)
}

pub fn arccos(q: &Quantity) -> Result<Quantity> {
    let magnitude = plain(q)?.apply(f64::acos, |x| -1.0 / (1.0 - x * x).sqrt());
    Quantity::new(magnitude, BaseUnits::parse("rad")?)
}

pub fn arctan(q: &Quantity) -> Result<Quantity> {
    let magnitude = plain(q)?.apply(f64::atan, |x| 1.0 / (1.0 + x * x));
    Quantity::new(magnitude, BaseUnits::parse("rad")?)
}

// ========== Exponentials ==========

pub fn exp(q: &Quantity) -> Result<Quantity> {
    Ok(Quantity::dimensionless(plain(q)?.apply(f64::exp, f64::exp)))
}

pub fn log(q: &Quantity) -> Result<Quantity> {
    Ok(Quantity::dimensionless(plain(q)?.apply(f64::ln, |x| 1.0 / x)))
}

pub fn log10(q: &Quantity) -> Result<Quantity> {
    Ok(Quantity::dimensionless(plain(q)?.apply(f64::log10, |x| 1.0 / (x * LN_10))))
}

// ========== Rounding ==========

pub fn abs(q: &Quantity) -> Result<Quantity> {
    with_units(q.magnitude.apply_keep_error(f64::abs), q)
}

/// Round half to even
pub fn round(q: &Quantity) -> Result<Quantity> {
    with_units(Magnitude::from_array(q.magnitude.value.map(|v| v.round_ties_even())), q)
}

pub fn floor(q: &Quantity) -> Result<Quantity> {
    with_units(Magnitude::from_array(q.magnitude.value.map(|v| v.floor())), q)
}

pub fn ceil(q: &Quantity) -> Result<Quantity> {
    with_units(Magnitude::from_array(q.magnitude.value.map(|v| v.ceil())), q)
}

// ========== Ranges ==========

/// Endpoints in common units: a plain number takes the units of the other side
fn endpoints(start: &Quantity, stop: &Quantity) -> Result<(f64, f64, BaseUnits)> {
    let (start, stop) = if start.baseunits.is_empty() && !stop.baseunits.is_empty() {
        let start = Quantity { magnitude: start.magnitude.clone(), baseunits: stop.baseunits.clone() };
        (start, stop.clone())
    } else {
        (start.clone(), stop.to_units(&start.baseunits)?)
    };
    let scalar = |q: &Quantity| {
        q.as_scalar()
            .ok_or_else(|| DplError::invalid_input("Range endpoints must be scalars").with_arg(q))
    };
    Ok((scalar(&start)?, scalar(&stop)?, start.baseunits))
}

fn spaced(a: f64, b: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let step = (b - a) / (num - 1) as f64;
            (0..num).map(|i| if i == num - 1 { b } else { a + step * i as f64 }).collect()
        }
    }
}

/// `num` evenly spaced values from `start` to `stop` inclusive
pub fn linspace(start: &Quantity, stop: &Quantity, num: usize) -> Result<Quantity> {
    let (a, b, baseunits) = endpoints(start, stop)?;
    Quantity::new(Magnitude::from_array(NdArray::from_vec(spaced(a, b, num))), baseunits)
}

/// `num` values from `10^start` to `10^stop`, evenly spaced in the exponent
pub fn logspace(start: &Quantity, stop: &Quantity, num: usize) -> Result<Quantity> {
    let (a, b, baseunits) = endpoints(start, stop)?;
    let values = spaced(a, b, num).into_iter().map(|x| 10f64.powf(x)).collect();
    Quantity::new(Magnitude::from_vec(values), baseunits)
}

/// Apply a function by name, as used by expression solvers
pub fn call(name: &str, q: &Quantity) -> Result<Quantity> {
    match name {
        "sqrt" => sqrt(q),
        "cbrt" => cbrt(q),
        "sin" => sin(q),
        "cos" => cos(q),
        "tan" => tan(q),
        "arcsin" => arcsin(q),
        "arccos" => arccos(q),
        "arctan" => arctan(q),
        "exp" => exp(q),
        "log" => log(q),
        "log10" => log10(q),
        "abs" => abs(q),
        "round" => round(q),
        "floor" => floor(q),
        "ceil" => ceil(q),
        _ => Err(DplError::invalid_input("Unknown function").with_arg(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_core::ErrorKind;
    use std::f64::consts::PI;

    fn q(value: f64, units: &str) -> Quantity {
        Quantity::parse(value, units).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * b.abs().max(1.0)
    }

    #[test]
    fn test_roots() {
        let side = sqrt(&q(16.0, "m2")).unwrap();
        assert_eq!(side.units(), "m");
        assert!(close(side.as_scalar().unwrap(), 4.0));
        let side = cbrt(&q(27.0, "cm3")).unwrap();
        assert_eq!(side.units(), "cm");
        assert!(close(side.as_scalar().unwrap(), 3.0));
    }

    #[test]
    fn test_trigonometry() {
        assert!(close(sin(&q(90.0, "deg")).unwrap().as_scalar().unwrap(), 1.0));
        assert!(close(cos(&q(PI, "")).unwrap().as_scalar().unwrap(), -1.0));
        let angle = arcsin(&q(1.0, "")).unwrap();
        assert_eq!(angle.units(), "rad");
        assert!(close(angle.as_scalar().unwrap(), PI / 2.0));
        assert!(sin(&q(1.0, "m")).unwrap_err().is(ErrorKind::DimensionMismatch));
    }

    #[test]
    fn test_exponentials() {
        assert!(close(log10(&q(1000.0, "")).unwrap().as_scalar().unwrap(), 3.0));
        assert!(close(exp(&q(0.0, "")).unwrap().as_scalar().unwrap(), 1.0));
        assert!(close(log(&q(50.0, "%")).unwrap().as_scalar().unwrap(), 0.5f64.ln()));
        assert!(log(&q(2.0, "s")).is_err());
    }

    #[test]
    fn test_rounding_keeps_units() {
        let r = round(&q(2.5, "kg")).unwrap();
        assert_eq!(r.as_scalar(), Some(2.0));
        assert_eq!(r.units(), "kg");
        assert_eq!(floor(&q(-1.5, "s")).unwrap().as_scalar(), Some(-2.0));
        assert_eq!(ceil(&q(1.2, "s")).unwrap().as_scalar(), Some(2.0));
        assert_eq!(abs(&q(-3.0, "m")).unwrap().as_scalar(), Some(3.0));
    }

    #[test]
    fn test_linspace() {
        let range = linspace(&q(0.0, "m"), &q(100.0, "cm"), 5).unwrap();
        assert_eq!(range.units(), "m");
        assert_eq!(range.magnitude.value.data(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        let range = linspace(&q(1.0, ""), &q(3.0, "s"), 3).unwrap();
        assert_eq!(range.units(), "s");
        assert_eq!(range.magnitude.value.data(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_logspace() {
        let range = logspace(&q(0.0, ""), &q(2.0, ""), 3).unwrap();
        let data = range.magnitude.value.data();
        assert!(close(data[0], 1.0) && close(data[1], 10.0) && close(data[2], 100.0));
    }

    #[test]
    fn test_call_by_name() {
        assert!(close(call("sqrt", &q(9.0, "")).unwrap().as_scalar().unwrap(), 3.0));
        assert!(call("gamma", &q(1.0, "")).is_err());
    }
}

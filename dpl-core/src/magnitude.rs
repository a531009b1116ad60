//! Numeric values with absolute uncertainty
//!
//! A `Magnitude` pairs a value (scalar or array) with an optional absolute
//! error of the same shape. Arithmetic propagates the error with the usual
//! linearized rules:
//!
//! - sum/difference: `sqrt(ea^2 + eb^2)`
//! - product/quotient: `|ab| * sqrt((ea/a)^2 + (eb/b)^2)`
//! - power: `|a^n| * |n| * ea/|a|`
//!
//! A missing error stays missing; zero error is preserved as zero.

use crate::array::{NdArray, SliceSpec};
use crate::error::{DplError, Result};
use std::fmt;

/// Relative tolerance used when comparing magnitudes
pub const MAGNITUDE_PRECISION: f64 = 1e-7;

/// Numeric value with optional absolute error
#[derive(Debug, Clone, PartialEq)]
pub struct Magnitude {
    pub value: NdArray<f64>,
    pub error: Option<NdArray<f64>>,
}

impl Magnitude {
    // ========== Construction ==========

    pub fn new(value: f64) -> Self {
        Magnitude { value: NdArray::scalar(value), error: None }
    }

    pub fn from_array(value: NdArray<f64>) -> Self {
        Magnitude { value, error: None }
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Magnitude::from_array(NdArray::from_vec(values))
    }

    /// Builder: set an absolute error, broadcast to the value shape
    pub fn with_error(mut self, error: f64) -> Self {
        self.error = Some(NdArray::full(self.value.shape(), error));
        self
    }

    /// Builder: set an absolute error array
    pub fn with_error_array(mut self, error: NdArray<f64>) -> Result<Self> {
        let error = self.value.zip_with(&error, |_, e| *e)?;
        self.error = Some(error);
        Ok(self)
    }

    /// Builder: set error relative to the value, `|value| * r`
    pub fn with_relative_error(mut self, rel: f64) -> Self {
        self.set_relative_error(rel);
        self
    }

    // ========== Accessors ==========

    pub fn is_scalar(&self) -> bool {
        self.value.is_scalar()
    }

    pub fn as_scalar(&self) -> Option<f64> {
        self.value.as_scalar().copied()
    }

    /// Relative error `error / |value|`
    pub fn relative_error(&self) -> Option<NdArray<f64>> {
        let error = self.error.as_ref()?;
        self.value.zip_with(error, |v, e| e / v.abs()).ok()
    }

    /// Rescale the absolute error as `|value| * r`
    pub fn set_relative_error(&mut self, rel: f64) {
        self.error = Some(self.value.map(|v| v.abs() * rel));
    }

    fn error_or_zero(&self) -> NdArray<f64> {
        match &self.error {
            Some(e) => e.clone(),
            None => NdArray::full(self.value.shape(), 0.0),
        }
    }

    // ========== Arithmetic ==========

    pub fn add(&self, other: &Magnitude) -> Result<Magnitude> {
        let value = self.value.zip_with(&other.value, |a, b| a + b)?;
        let error = self.combine_errors(other, |_, _, ea, eb| (ea * ea + eb * eb).sqrt())?;
        Ok(Magnitude { value, error })
    }

    pub fn sub(&self, other: &Magnitude) -> Result<Magnitude> {
        let value = self.value.zip_with(&other.value, |a, b| a - b)?;
        let error = self.combine_errors(other, |_, _, ea, eb| (ea * ea + eb * eb).sqrt())?;
        Ok(Magnitude { value, error })
    }

    pub fn mul(&self, other: &Magnitude) -> Result<Magnitude> {
        let value = self.value.zip_with(&other.value, |a, b| a * b)?;
        let error = self.combine_errors(other, |a, b, ea, eb| {
            ((ea * b).powi(2) + (eb * a).powi(2)).sqrt()
        })?;
        Ok(Magnitude { value, error })
    }

    pub fn div(&self, other: &Magnitude) -> Result<Magnitude> {
        let value = self.value.zip_with(&other.value, |a, b| a / b)?;
        let error = self.combine_errors(other, |a, b, ea, eb| {
            ((ea / b).powi(2) + (a * eb / (b * b)).powi(2)).sqrt()
        })?;
        Ok(Magnitude { value, error })
    }

    pub fn powf(&self, n: f64) -> Magnitude {
        self.apply(|a| a.powf(n), |a| n * a.powf(n - 1.0))
    }

    pub fn neg(&self) -> Magnitude {
        Magnitude { value: self.value.map(|a| -a), error: self.error.clone() }
    }

    pub fn scale(&self, factor: f64) -> Magnitude {
        Magnitude {
            value: self.value.map(|a| a * factor),
            error: self.error.as_ref().map(|e| e.map(|x| x * factor.abs())),
        }
    }

    /// Apply `f` with derivative `df`; error becomes `|df(a)| * ea`
    pub fn apply(&self, f: impl Fn(f64) -> f64, df: impl Fn(f64) -> f64) -> Magnitude {
        let value = self.value.map(|a| f(*a));
        let error = self.error.as_ref().and_then(|e| {
            self.value.zip_with(e, |a, ea| (df(*a) * ea).abs()).ok()
        });
        Magnitude { value, error }
    }

    /// Apply `f` and keep the error unchanged
    pub fn apply_keep_error(&self, f: impl Fn(f64) -> f64) -> Magnitude {
        Magnitude { value: self.value.map(|a| f(*a)), error: self.error.clone() }
    }

    /// Apply `f`; any error is reset to zero
    pub fn apply_exact(&self, f: impl Fn(f64) -> f64) -> Magnitude {
        let value = self.value.map(|a| f(*a));
        let error = self.error.as_ref().map(|_| NdArray::full(value.shape(), 0.0));
        Magnitude { value, error }
    }

    fn combine_errors(
        &self,
        other: &Magnitude,
        f: impl Fn(f64, f64, f64, f64) -> f64,
    ) -> Result<Option<NdArray<f64>>> {
        if self.error.is_none() && other.error.is_none() {
            return Ok(None);
        }
        let ea = self.error_or_zero();
        let eb = other.error_or_zero();
        let pairs_a = self.value.zip_with(&ea, |a, e| (*a, *e))?;
        let pairs_b = other.value.zip_with(&eb, |b, e| (*b, *e))?;
        let error = pairs_a.zip_with(&pairs_b, |(a, ea), (b, eb)| f(*a, *b, *ea, *eb))?;
        Ok(Some(error))
    }

    // ========== Comparison ==========

    /// Element-wise closeness with relative tolerance `rtol`
    pub fn allclose(&self, other: &Magnitude, rtol: f64) -> bool {
        self.value
            .zip_with(&other.value, |a, b| is_close(*a, *b, rtol))
            .map(|r| r.all(|x| *x))
            .unwrap_or(false)
    }

    // ========== Slicing ==========

    pub fn slice(&self, specs: &[SliceSpec]) -> Result<Magnitude> {
        let value = self.value.slice(specs)?;
        let error = match &self.error {
            Some(e) => Some(e.slice(specs)?),
            None => None,
        };
        Ok(Magnitude { value, error })
    }

    /// Magnitudes along the first axis
    pub fn rows(&self) -> Vec<Magnitude> {
        let values = self.value.rows();
        match &self.error {
            Some(e) => values
                .into_iter()
                .zip(e.rows())
                .map(|(value, error)| Magnitude { value, error: Some(error) })
                .collect(),
            None => values.into_iter().map(Magnitude::from_array).collect(),
        }
    }
}

impl From<f64> for Magnitude {
    fn from(value: f64) -> Self {
        Magnitude::new(value)
    }
}

impl From<NdArray<f64>> for Magnitude {
    fn from(value: NdArray<f64>) -> Self {
        Magnitude::from_array(value)
    }
}

/// `|a - b| <= rtol * |b|` with an absolute floor for values near zero
pub fn is_close(a: f64, b: f64, rtol: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= rtol * b.abs().max(a.abs()) + 1e-300
}

/// Scientific notation with a signed two-digit exponent: `1.230e+00`
pub fn format_sci(value: f64, decimals: usize) -> String {
    let s = format!("{:.*e}", decimals, value);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => s,
    }
}

/// Value with its uncertainty digits: `1.2345(12)e+00`
fn format_with_error(value: f64, error: f64) -> String {
    if error == 0.0 || !error.is_finite() || value == 0.0 || !value.is_finite() {
        return format!("{}(0)", format_sci(value, 3));
    }
    let exp_v = value.abs().log10().floor();
    let exp_e = error.log10().floor();
    let mantissa = value * 10f64.powf(-exp_v);
    let ndec = ((exp_v - exp_e).abs() + 1.0) as usize;
    let digits = ((error * 10f64.powf(1.0 - exp_e) * 10.0).round() / 10.0).round() as i64;
    let sign = if exp_v >= 0.0 { '+' } else { '-' };
    format!(
        "{:.*}({:2})e{}{:02}",
        ndec,
        mantissa,
        digits,
        sign,
        exp_v.abs() as i64
    )
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "{}", self.value.map(|v| format_sci(*v, 3))),
            Some(error) => {
                let text = self
                    .value
                    .zip_with(error, |v, e| format_with_error(*v, *e))
                    .map_err(|_| fmt::Error)?;
                write!(f, "{}", text)
            }
        }
    }
}

//! Exact rational numbers used for unit exponents
//!
//! A `Fraction` is always kept in lowest terms with a positive denominator.
//! The textual form is `n` for integral values and `n:d` otherwise, which
//! is also the syntax accepted in unit exponents (`m2:3`).

use num_rational::Rational64;
use num_traits::{checked_pow, CheckedAdd, CheckedMul, CheckedSub, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use thiserror::Error;

/// Separator between numerator and denominator
pub const SYMBOL_FRACTION: char = ':';

/// Error type for fraction operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FractionError {
    #[error("Zero denominator for numerator {0}")]
    ZeroDenominator(i64),

    #[error("Invalid fraction format: {0}")]
    ParseError(String),

    #[error("Fraction accepts only whole numbers: {0}")]
    NonInteger(f64),

    #[error("Fraction arithmetic overflow: {0}")]
    Overflow(String),
}

/// Exact rational number in lowest terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fraction(Rational64);

impl Fraction {
    pub const ZERO: Fraction = Fraction::from_int(0);
    pub const ONE: Fraction = Fraction::from_int(1);

    // ========== Construction ==========

    /// Integral fraction `n:1`
    pub const fn from_int(n: i64) -> Self {
        Fraction(Rational64::new_raw(n, 1))
    }

    /// Fraction `n:2`, reduced when `n` is even
    pub const fn halves(n: i64) -> Self {
        if n % 2 == 0 {
            Fraction(Rational64::new_raw(n / 2, 1))
        } else {
            Fraction(Rational64::new_raw(n, 2))
        }
    }

    /// Create and reduce `num:den`
    pub fn new(num: i64, den: i64) -> Result<Self, FractionError> {
        if den == 0 {
            return Err(FractionError::ZeroDenominator(num));
        }
        Ok(Fraction(Rational64::new(num, den)))
    }

    /// Build from a float that must hold a whole number
    pub fn from_whole(value: f64) -> Result<Self, FractionError> {
        if value.fract() != 0.0 || !value.is_finite() {
            return Err(FractionError::NonInteger(value));
        }
        Ok(Fraction::from_int(value as i64))
    }

    /// Parse "n" or "n:d" (a leading '+' is allowed)
    pub fn from_str(s: &str) -> Result<Self, FractionError> {
        let s = s.trim();
        let parse = |part: &str| -> Result<i64, FractionError> {
            part.trim()
                .trim_start_matches('+')
                .parse::<i64>()
                .map_err(|_| FractionError::ParseError(s.to_string()))
        };
        match s.split_once(SYMBOL_FRACTION) {
            Some((num, den)) => Fraction::new(parse(num)?, parse(den)?),
            None => Ok(Fraction::from_int(parse(s)?)),
        }
    }

    // ========== Accessors ==========

    pub fn num(&self) -> i64 {
        *self.0.numer()
    }

    pub fn den(&self) -> i64 {
        *self.0.denom()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_integral(&self) -> bool {
        self.0.is_integer()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    pub fn abs(&self) -> Self {
        Fraction(self.0.abs())
    }

    // ========== Arithmetic ==========

    /// Division, failing on a zero divisor
    pub fn checked_div(&self, other: impl Into<Fraction>) -> Result<Self, FractionError> {
        let other = other.into();
        if other.is_zero() {
            return Err(FractionError::ZeroDenominator(self.num()));
        }
        num_traits::CheckedDiv::checked_div(&self.0, &other.0)
            .map(Fraction)
            .ok_or_else(|| FractionError::Overflow(format!("{} / {}", self, other)))
    }

    /// Integer power; zero cannot be raised to a negative power
    pub fn pow(&self, exp: i32) -> Result<Self, FractionError> {
        let base = if exp < 0 { self.recip()? } else { *self };
        checked_pow(base.0, exp.unsigned_abs() as usize)
            .map(Fraction)
            .ok_or_else(|| FractionError::Overflow(format!("{}^{}", self, exp)))
    }

    /// Sum that fails instead of overflowing
    pub fn checked_add(&self, other: impl Into<Fraction>) -> Result<Self, FractionError> {
        let other = other.into();
        CheckedAdd::checked_add(&self.0, &other.0)
            .map(Fraction)
            .ok_or_else(|| FractionError::Overflow(format!("{} + {}", self, other)))
    }

    pub fn checked_sub(&self, other: impl Into<Fraction>) -> Result<Self, FractionError> {
        let other = other.into();
        CheckedSub::checked_sub(&self.0, &other.0)
            .map(Fraction)
            .ok_or_else(|| FractionError::Overflow(format!("{} - {}", self, other)))
    }

    pub fn checked_mul(&self, other: impl Into<Fraction>) -> Result<Self, FractionError> {
        let other = other.into();
        CheckedMul::checked_mul(&self.0, &other.0)
            .map(Fraction)
            .ok_or_else(|| FractionError::Overflow(format!("{} * {}", self, other)))
    }

    pub fn checked_neg(&self) -> Result<Self, FractionError> {
        Fraction::ZERO.checked_sub(*self)
    }

    pub fn recip(&self) -> Result<Self, FractionError> {
        Fraction::ONE.checked_div(*self)
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Fraction::ZERO
    }
}

impl From<i64> for Fraction {
    fn from(n: i64) -> Self {
        Fraction::from_int(n)
    }
}

impl From<i32> for Fraction {
    fn from(n: i32) -> Self {
        Fraction::from_int(n as i64)
    }
}

impl TryFrom<(i64, i64)> for Fraction {
    type Error = FractionError;

    fn try_from((num, den): (i64, i64)) -> Result<Self, Self::Error> {
        Fraction::new(num, den)
    }
}

// Operators are meant for table constants; user exponents go through the checked methods

impl<T: Into<Fraction>> Add<T> for Fraction {
    type Output = Fraction;
    fn add(self, other: T) -> Fraction {
        Fraction(self.0 + other.into().0)
    }
}

impl<T: Into<Fraction>> Sub<T> for Fraction {
    type Output = Fraction;
    fn sub(self, other: T) -> Fraction {
        Fraction(self.0 - other.into().0)
    }
}

impl<T: Into<Fraction>> Mul<T> for Fraction {
    type Output = Fraction;
    fn mul(self, other: T) -> Fraction {
        Fraction(self.0 * other.into().0)
    }
}

impl Neg for Fraction {
    type Output = Fraction;
    fn neg(self) -> Fraction {
        Fraction(-self.0)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.num())
        } else {
            write!(f, "{}{}{}", self.num(), SYMBOL_FRACTION, self.den())
        }
    }
}

impl Serialize for Fraction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fraction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fraction::from_str(&s).map_err(serde::de::Error::custom)
    }
}

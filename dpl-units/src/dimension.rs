//! Dimensional analysis types
//!
//! Each physical quantity has dimensions represented as an 8-element vector
//! of rational exponents over the base axes:
//! [length, mass, time, temperature, charge, luminosity, amount, angle]
//! whose base unit symbols are `m g s K C cd mol rad`.

use dpl_core::{DplError, Fraction, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Axis indices
pub const LENGTH: usize = 0;
pub const MASS: usize = 1;
pub const TIME: usize = 2;
pub const TEMPERATURE: usize = 3;
pub const CHARGE: usize = 4;
pub const LUMINOSITY: usize = 5;
pub const AMOUNT: usize = 6;
pub const ANGLE: usize = 7;

/// Base unit symbol of each axis
pub const DIMENSION_SYMBOLS: [&str; 8] = ["m", "g", "s", "K", "C", "cd", "mol", "rad"];

/// Rational exponents of the 8 base axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub exponents: [Fraction; 8],
}

impl Dimensions {
    /// Dimensionless quantity (all exponents zero)
    pub const DIMENSIONLESS: Dimensions = Dimensions::from_ints([0, 0, 0, 0, 0, 0, 0, 0]);

    pub const LENGTH: Dimensions = Dimensions::from_ints([1, 0, 0, 0, 0, 0, 0, 0]);

    pub const MASS: Dimensions = Dimensions::from_ints([0, 1, 0, 0, 0, 0, 0, 0]);

    pub const TIME: Dimensions = Dimensions::from_ints([0, 0, 1, 0, 0, 0, 0, 0]);

    pub const TEMPERATURE: Dimensions = Dimensions::from_ints([0, 0, 0, 1, 0, 0, 0, 0]);

    pub const CHARGE: Dimensions = Dimensions::from_ints([0, 0, 0, 0, 1, 0, 0, 0]);

    pub const LUMINOSITY: Dimensions = Dimensions::from_ints([0, 0, 0, 0, 0, 1, 0, 0]);

    pub const AMOUNT: Dimensions = Dimensions::from_ints([0, 0, 0, 0, 0, 0, 1, 0]);

    pub const ANGLE: Dimensions = Dimensions::from_ints([0, 0, 0, 0, 0, 0, 0, 1]);

    /// Velocity [m s-1]
    pub const VELOCITY: Dimensions = Dimensions::from_ints([1, 0, -1, 0, 0, 0, 0, 0]);

    /// Force [m g s-2]
    pub const FORCE: Dimensions = Dimensions::from_ints([1, 1, -2, 0, 0, 0, 0, 0]);

    /// Energy [m2 g s-2]
    pub const ENERGY: Dimensions = Dimensions::from_ints([2, 1, -2, 0, 0, 0, 0, 0]);

    /// Power [m2 g s-3]
    pub const POWER: Dimensions = Dimensions::from_ints([2, 1, -3, 0, 0, 0, 0, 0]);

    /// Electric current [s-1 C]
    pub const CURRENT: Dimensions = Dimensions::from_ints([0, 0, -1, 0, 1, 0, 0, 0]);

    pub const fn from_ints(values: [i64; 8]) -> Self {
        let mut exponents = [Fraction::ZERO; 8];
        let mut i = 0;
        while i < 8 {
            exponents[i] = Fraction::from_int(values[i]);
            i += 1;
        }
        Dimensions { exponents }
    }

    /// Exponents given in halves, used by Gaussian units (`[3, 1, -2, ..]` is `m3:2 g1:2 s-1`)
    pub const fn from_halves(values: [i64; 8]) -> Self {
        let mut exponents = [Fraction::ZERO; 8];
        let mut i = 0;
        while i < 8 {
            exponents[i] = Fraction::halves(values[i]);
            i += 1;
        }
        Dimensions { exponents }
    }

    pub fn new(exponents: [Fraction; 8]) -> Self {
        Dimensions { exponents }
    }

    /// Build from (numerator, denominator) pairs
    pub fn from_pairs(pairs: [(i64, i64); 8]) -> Result<Self> {
        let mut exponents = [Fraction::ZERO; 8];
        for (slot, (num, den)) in exponents.iter_mut().zip(pairs) {
            *slot = Fraction::new(num, den)?;
        }
        Ok(Dimensions { exponents })
    }

    /// Build from a list of exactly 8 fractions
    pub fn from_list(list: &[Fraction]) -> Result<Self> {
        let exponents: [Fraction; 8] = list.try_into().map_err(|_| {
            DplError::invalid_input("Dimensions require exactly 8 values").with_arg(list.len())
        })?;
        Ok(Dimensions { exponents })
    }

    /// Build from a map keyed by axis symbols; missing axes are zero
    pub fn from_map<'a>(map: impl IntoIterator<Item = (&'a str, Fraction)>) -> Result<Self> {
        let mut exponents = [Fraction::ZERO; 8];
        for (symbol, exp) in map {
            let index = DIMENSION_SYMBOLS
                .iter()
                .position(|s| *s == symbol)
                .ok_or_else(|| DplError::invalid_input("Unknown dimension").with_arg(symbol))?;
            exponents[index] = exp;
        }
        Ok(Dimensions { exponents })
    }

    /// Check if all exponents are zero
    pub fn is_dimensionless(&self) -> bool {
        self.exponents.iter().all(|e| e.is_zero())
    }

    /// Scale every exponent (used for powers)
    pub fn scale(&self, factor: Fraction) -> Dimensions {
        let mut exponents = self.exponents;
        for e in exponents.iter_mut() {
            *e = *e * factor;
        }
        Dimensions { exponents }
    }

    /// Like `scale`, but fails when an exponent leaves the fraction range
    pub fn checked_scale(&self, factor: Fraction) -> Result<Dimensions> {
        let mut exponents = self.exponents;
        for e in exponents.iter_mut() {
            *e = e.checked_mul(factor)?;
        }
        Ok(Dimensions { exponents })
    }

    pub fn checked_add(&self, other: &Dimensions) -> Result<Dimensions> {
        let mut exponents = self.exponents;
        for (e, o) in exponents.iter_mut().zip(other.exponents) {
            *e = e.checked_add(o)?;
        }
        Ok(Dimensions { exponents })
    }

    pub fn to_list(&self) -> Vec<Fraction> {
        self.exponents.to_vec()
    }

    /// Map view keyed by axis symbols, zero axes omitted
    pub fn to_map(&self) -> BTreeMap<&'static str, Fraction> {
        DIMENSION_SYMBOLS
            .iter()
            .zip(self.exponents)
            .filter(|(_, e)| !e.is_zero())
            .map(|(s, e)| (*s, e))
            .collect()
    }

    fn zip_with(&self, other: &Dimensions, f: impl Fn(Fraction, Fraction) -> Fraction) -> Dimensions {
        let mut exponents = [Fraction::ZERO; 8];
        for (i, slot) in exponents.iter_mut().enumerate() {
            *slot = f(self.exponents[i], other.exponents[i]);
        }
        Dimensions { exponents }
    }
}

impl Add for Dimensions {
    type Output = Dimensions;
    fn add(self, other: Dimensions) -> Dimensions {
        self.zip_with(&other, |a, b| a + b)
    }
}

impl Sub for Dimensions {
    type Output = Dimensions;
    fn sub(self, other: Dimensions) -> Dimensions {
        self.zip_with(&other, |a, b| a - b)
    }
}

impl Mul<Fraction> for Dimensions {
    type Output = Dimensions;
    fn mul(self, factor: Fraction) -> Dimensions {
        self.scale(factor)
    }
}

impl Neg for Dimensions {
    type Output = Dimensions;
    fn neg(self) -> Dimensions {
        self.scale(Fraction::from_int(-1))
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = DIMENSION_SYMBOLS
            .iter()
            .zip(self.exponents)
            .filter(|(_, e)| !e.is_zero())
            .map(|(s, e)| {
                if e == Fraction::ONE {
                    s.to_string()
                } else {
                    format!("{}{}", s, e)
                }
            })
            .collect();
        if parts.is_empty() {
            write!(f, "1")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

//! Atoms: the values an expression reduces to
//!
//! Every operation has a default implementation that fails, so an atom
//! type only implements what its solver's operator table can produce.

use crate::operator::Operator;
use dpl_core::{DplError, Result};
use std::fmt;

fn unsupported(op: Operator) -> DplError {
    DplError::parse_error("Operation is not supported by atom").with_arg(op)
}

/// Value type evaluated by an `ExpressionSolver`
pub trait Atom: Sized + Clone + fmt::Debug {
    fn add(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Add))
    }

    fn sub(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Sub))
    }

    fn mul(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Mul))
    }

    fn truediv(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Truediv))
    }

    fn pow(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Pow))
    }

    fn neg(self) -> Result<Self> {
        Err(unsupported(Operator::Sub))
    }

    fn eq(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Eq))
    }

    fn ne(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Ne))
    }

    fn lt(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Lt))
    }

    fn le(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Le))
    }

    fn gt(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Gt))
    }

    fn ge(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Ge))
    }

    fn and(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::And))
    }

    fn or(self, _other: Self) -> Result<Self> {
        Err(unsupported(Operator::Or))
    }

    fn not(self) -> Result<Self> {
        Err(unsupported(Operator::Not))
    }

    /// Apply a function operator to its solved arguments
    fn call(op: Operator, mut args: Vec<Self>) -> Result<Self> {
        match op {
            Operator::Par if args.len() == 1 => Ok(args.remove(0)),
            _ => Err(unsupported(op)),
        }
    }

    /// Dispatch a binary operator
    fn binary(self, op: Operator, other: Self) -> Result<Self> {
        match op {
            Operator::Add => self.add(other),
            Operator::Sub => self.sub(other),
            Operator::Mul => self.mul(other),
            Operator::Truediv => self.truediv(other),
            Operator::Pow => self.pow(other),
            Operator::Eq => self.eq(other),
            Operator::Ne => self.ne(other),
            Operator::Lt => self.lt(other),
            Operator::Le => self.le(other),
            Operator::Gt => self.gt(other),
            Operator::Ge => self.ge(other),
            Operator::And => self.and(other),
            Operator::Or => self.or(other),
            _ => Err(unsupported(op)),
        }
    }
}

/// Plain number or boolean atom
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Number(f64),
    Bool(bool),
}

impl Scalar {
    /// Parse `true`, `false` or a floating point literal
    pub fn parse(text: &str) -> Result<Scalar> {
        match text.trim() {
            "true" | "True" => Ok(Scalar::Bool(true)),
            "false" | "False" => Ok(Scalar::Bool(false)),
            other => other
                .parse::<f64>()
                .map(Scalar::Number)
                .map_err(|_| DplError::invalid_input("Unrepresentable literal").with_arg(other)),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Scalar::Number(n) => Ok(*n),
            Scalar::Bool(_) => Err(DplError::invalid_input("Expected a number").with_arg(self)),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Scalar::Bool(b) => Ok(*b),
            Scalar::Number(_) => Err(DplError::invalid_input("Expected a boolean").with_arg(self)),
        }
    }

    fn numeric(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        Ok(Scalar::Number(f(self.as_f64()?, other.as_f64()?)))
    }

    fn compare(self, other: Self, f: impl Fn(f64, f64) -> bool) -> Result<Self> {
        Ok(Scalar::Bool(f(self.as_f64()?, other.as_f64()?)))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl Atom for Scalar {
    fn add(self, other: Self) -> Result<Self> {
        self.numeric(other, |a, b| a + b)
    }

    fn sub(self, other: Self) -> Result<Self> {
        self.numeric(other, |a, b| a - b)
    }

    fn mul(self, other: Self) -> Result<Self> {
        self.numeric(other, |a, b| a * b)
    }

    fn truediv(self, other: Self) -> Result<Self> {
        self.numeric(other, |a, b| a / b)
    }

    fn pow(self, other: Self) -> Result<Self> {
        self.numeric(other, f64::powf)
    }

    fn neg(self) -> Result<Self> {
        Ok(Scalar::Number(-self.as_f64()?))
    }

    fn eq(self, other: Self) -> Result<Self> {
        Ok(Scalar::Bool(self == other))
    }

    fn ne(self, other: Self) -> Result<Self> {
        Ok(Scalar::Bool(self != other))
    }

    fn lt(self, other: Self) -> Result<Self> {
        self.compare(other, |a, b| a < b)
    }

    fn le(self, other: Self) -> Result<Self> {
        self.compare(other, |a, b| a <= b)
    }

    fn gt(self, other: Self) -> Result<Self> {
        self.compare(other, |a, b| a > b)
    }

    fn ge(self, other: Self) -> Result<Self> {
        self.compare(other, |a, b| a >= b)
    }

    fn and(self, other: Self) -> Result<Self> {
        Ok(Scalar::Bool(self.as_bool()? && other.as_bool()?))
    }

    fn or(self, other: Self) -> Result<Self> {
        Ok(Scalar::Bool(self.as_bool()? || other.as_bool()?))
    }

    fn not(self) -> Result<Self> {
        Ok(Scalar::Bool(!self.as_bool()?))
    }

    fn call(op: Operator, args: Vec<Self>) -> Result<Self> {
        let x = |i: usize| -> Result<f64> {
            args.get(i)
                .ok_or_else(|| DplError::parse_error("Wrong number of arguments").with_arg(op))?
                .as_f64()
        };
        let value = match op {
            Operator::Par => return args.into_iter().next().ok_or_else(|| {
                DplError::parse_error("Wrong number of arguments").with_arg(op)
            }),
            Operator::Exp => x(0)?.exp(),
            Operator::Log => x(0)?.ln(),
            Operator::Log10 => x(0)?.log10(),
            Operator::Logb => x(0)?.ln() / x(1)?.ln(),
            Operator::Sqrt => x(0)?.sqrt(),
            Operator::Powb => x(0)?.powf(x(1)?),
            Operator::Sin => x(0)?.sin(),
            Operator::Cos => x(0)?.cos(),
            Operator::Tan => x(0)?.tan(),
            Operator::Arcsin => x(0)?.asin(),
            Operator::Arccos => x(0)?.acos(),
            Operator::Arctan => x(0)?.atan(),
            Operator::Floor => x(0)?.floor(),
            Operator::Ceil => x(0)?.ceil(),
            Operator::Abs => x(0)?.abs(),
            _ => return Err(DplError::parse_error("Operation is not supported by atom").with_arg(op)),
        };
        Ok(Scalar::Number(value))
    }
}

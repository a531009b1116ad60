//! Logical expressions
//!
//! Atoms are references, `!{?name}` definedness tests and literals
//! (`true`, `false`, quoted strings, numbers with units). A literal
//! without units takes the units of the value it is compared with.

use crate::environment::Environment;
use crate::node::slice_value;
use crate::settings::{keyword, sign, VALUE_PRECISION};
use crate::value::{Payload, Value};
use dpl_core::{is_close, DplError, Result};
use dpl_solver::{solve, Atom, Operator, OperatorTable};
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(!)?\{([^}]*)\}(\[([0-9:,-]+)\])?$").unwrap())
}

fn quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^(?:"(.*)"|'(.*)')$"#).unwrap())
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([-+]?[0-9.]+(?:[eE][-+]?[0-9]+)?)(?:\s+(\S+))?$").unwrap())
}

#[derive(Debug, Clone, PartialEq)]
struct Operand(Value);

impl Operand {
    fn boolean(value: bool) -> Self {
        Operand(Value::bool(value))
    }

    fn as_bool(&self) -> Result<bool> {
        self.0
            .payload
            .as_bool()
            .ok_or_else(|| DplError::invalid_input("Value is not a boolean").with_arg(&self.0))
    }

    /// Numbers of both sides in the units of the left side
    fn numbers(&self, other: &Operand) -> Result<(dpl_core::NdArray<f64>, dpl_core::NdArray<f64>)> {
        let (left, right) = (&self.0, &other.0);
        let right = match (&left.unit, &right.unit) {
            (Some(unit), Some(_)) => right.convert(unit)?,
            _ => right.clone(),
        };
        Ok((left.payload.to_f64()?, right.payload.to_f64()?))
    }

    fn compare(&self, other: &Operand, op: Operator) -> Result<Operand> {
        let result = match (&self.0.payload, &other.0.payload) {
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (left, right) = self.numbers(other)?;
                let test = |a: f64, b: f64| match op {
                    Operator::Eq => is_close(a, b, VALUE_PRECISION),
                    Operator::Ne => !is_close(a, b, VALUE_PRECISION),
                    Operator::Lt => a < b && !is_close(a, b, VALUE_PRECISION),
                    Operator::Gt => a > b && !is_close(a, b, VALUE_PRECISION),
                    Operator::Le => a < b || is_close(a, b, VALUE_PRECISION),
                    Operator::Ge => a > b || is_close(a, b, VALUE_PRECISION),
                    _ => false,
                };
                let results = left.zip_with(&right, |a, b| test(*a, *b))?;
                match op {
                    Operator::Ne => results.any(|r| *r),
                    _ => results.all(|r| *r),
                }
            }
            (Payload::Bool(_), Payload::Bool(_)) | (Payload::Str(_), Payload::Str(_)) => match op {
                Operator::Eq => self.0.payload == other.0.payload,
                Operator::Ne => self.0.payload != other.0.payload,
                _ => {
                    return Err(DplError::invalid_input("Values cannot be ordered")
                        .with_arg(&self.0)
                        .with_arg(&other.0))
                }
            },
            _ => {
                return Err(DplError::invalid_input("Values cannot be compared")
                    .with_arg(&self.0)
                    .with_arg(&other.0))
            }
        };
        Ok(Operand::boolean(result))
    }
}

impl Atom for Operand {
    fn eq(self, other: Self) -> Result<Self> {
        self.compare(&other, Operator::Eq)
    }

    fn ne(self, other: Self) -> Result<Self> {
        self.compare(&other, Operator::Ne)
    }

    fn lt(self, other: Self) -> Result<Self> {
        self.compare(&other, Operator::Lt)
    }

    fn le(self, other: Self) -> Result<Self> {
        self.compare(&other, Operator::Le)
    }

    fn gt(self, other: Self) -> Result<Self> {
        self.compare(&other, Operator::Gt)
    }

    fn ge(self, other: Self) -> Result<Self> {
        self.compare(&other, Operator::Ge)
    }

    fn and(self, other: Self) -> Result<Self> {
        Ok(Operand::boolean(self.as_bool()? && other.as_bool()?))
    }

    fn or(self, other: Self) -> Result<Self> {
        Ok(Operand::boolean(self.as_bool()? || other.as_bool()?))
    }

    fn not(self) -> Result<Self> {
        Ok(Operand::boolean(!self.as_bool()?))
    }
}

/// Operators of logical expressions; `~` negates
pub fn logical_table() -> OperatorTable {
    OperatorTable::new()
        .with_all(&[
            Operator::Par,
            Operator::Eq,
            Operator::Ne,
            Operator::Le,
            Operator::Ge,
            Operator::Lt,
            Operator::Gt,
            Operator::And,
            Operator::Or,
        ])
        .with_symbol(Operator::Not, sign::NEGATE)
}

fn parse_atom(env: &Environment, text: &str) -> Result<Operand> {
    let text = text.trim();
    if let Some(caps) = reference_regex().captures(text) {
        let path = &caps[2];
        if caps.get(1).is_some() {
            let found = env.request_nodes(path, Some(&[0, 1]))?;
            return Ok(Operand::boolean(!found.is_empty()));
        }
        let (_, value) = env.request_value(path)?;
        return Ok(Operand(match caps.get(4) {
            Some(slice) => slice_value(&value, slice.as_str())?,
            None => value,
        }));
    }
    match text {
        keyword::TRUE => return Ok(Operand::boolean(true)),
        keyword::FALSE => return Ok(Operand::boolean(false)),
        _ => {}
    }
    if let Some(caps) = quoted_regex().captures(text) {
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        return Ok(Operand(Value::string(inner)));
    }
    if let Some(caps) = number_regex().captures(text) {
        let number: f64 = caps[1]
            .parse()
            .map_err(|_| DplError::invalid_input("Unrepresentable literal").with_arg(&caps[1]))?;
        return Ok(Operand(Value::float(number, caps.get(2).map(|u| u.as_str()))));
    }
    Ok(Operand(Value::string(text)))
}

/// Evaluates logical expressions against an environment
pub struct LogicalSolver<'a> {
    env: &'a Environment,
}

impl<'a> LogicalSolver<'a> {
    pub fn new(env: &'a Environment) -> Self {
        LogicalSolver { env }
    }

    pub fn solve(&self, expr: &str) -> Result<bool> {
        let _scope = self.env.units.enter()?;
        let env = self.env;
        let result: Operand = solve(expr, |text: &str| parse_atom(env, text), logical_table())?;
        let value = result.as_bool()?;
        trace!(expr, value, "logical expression");
        Ok(value)
    }
}

//! Numerical expressions over quantities
//!
//! Binary operators are written with spaces (` * `, ` / `, ` + `, ` - `)
//! so unit expressions like `km/s` or `kg*m` stay inside their atoms.

use crate::environment::Environment;
use crate::node::slice_value;
use crate::value::Value;
use dpl_core::{DplError, Result};
use dpl_solver::{solve, Atom, Operator, OperatorTable};
use dpl_units::{functions, Quantity};
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(-)?\{([^}]*)\}(\[([0-9:,-]+)\])?$").unwrap())
}

fn literal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\S+)(\s+(\S+))?$").unwrap())
}

#[derive(Debug, Clone)]
struct Operand(Quantity);

impl Atom for Operand {
    fn add(self, other: Self) -> Result<Self> {
        Ok(Operand(self.0.add(&other.0)?))
    }

    fn sub(self, other: Self) -> Result<Self> {
        Ok(Operand(self.0.sub(&other.0)?))
    }

    fn mul(self, other: Self) -> Result<Self> {
        Ok(Operand(self.0.mul(&other.0)?))
    }

    fn truediv(self, other: Self) -> Result<Self> {
        Ok(Operand(self.0.div(&other.0)?))
    }

    fn pow(self, other: Self) -> Result<Self> {
        Ok(Operand(self.0.pow_quantity(&other.0)?))
    }

    fn neg(self) -> Result<Self> {
        Ok(Operand(self.0.neg()))
    }

    fn call(op: Operator, mut args: Vec<Self>) -> Result<Self> {
        let quantity = match (op, args.len()) {
            (Operator::Par, 1) => return Ok(args.remove(0)),
            (Operator::Logb, 2) => {
                let base = functions::log(&args[1].0)?;
                functions::log(&args[0].0)?.div(&base)?
            }
            (Operator::Powb, 2) => args[0].0.pow_quantity(&args[1].0)?,
            (op, 1) => functions::call(&op.to_string(), &args[0].0)?,
            (op, n) => {
                return Err(DplError::parse_error("Wrong number of arguments").with_arg(op).with_arg(n));
            }
        };
        Ok(Operand(quantity))
    }
}

/// Operators of numerical expressions
pub fn numerical_table() -> OperatorTable {
    OperatorTable::new()
        .with_all(&[
            Operator::Par,
            Operator::Exp,
            Operator::Log,
            Operator::Log10,
            Operator::Logb,
            Operator::Sqrt,
            Operator::Powb,
            Operator::Sin,
            Operator::Cos,
            Operator::Tan,
            Operator::Arcsin,
            Operator::Arccos,
            Operator::Arctan,
            Operator::Floor,
            Operator::Ceil,
            Operator::Abs,
            Operator::Pow,
        ])
        .with_symbol(Operator::Mul, " * ")
        .with_symbol(Operator::Truediv, " / ")
        .with_symbol(Operator::Add, " + ")
        .with_symbol(Operator::Sub, " - ")
}

/// Quantity of a reference `{?name}[slice]` or a literal `number units`
fn parse_atom(env: &Environment, text: &str) -> Result<Quantity> {
    let text = text.trim();
    if let Some(caps) = reference_regex().captures(text) {
        let (_, value) = env.request_value(&caps[2])?;
        let value = match caps.get(4) {
            Some(slice) => slice_value(&value, slice.as_str())?,
            None => value,
        };
        let quantity = value.quantity()?;
        return Ok(if caps.get(1).is_some() { quantity.neg() } else { quantity });
    }
    let caps = literal_regex()
        .captures(text)
        .ok_or_else(|| DplError::parse_error("Numerical atom cannot be parsed").with_arg(text))?;
    let number: f64 = caps[1]
        .parse()
        .map_err(|_| DplError::invalid_input("Unrepresentable literal").with_arg(&caps[1]))?;
    Quantity::parse(number, caps.get(3).map_or("", |u| u.as_str()))
}

/// Evaluates numerical expressions against an environment
pub struct NumericalSolver<'a> {
    env: &'a Environment,
}

impl<'a> NumericalSolver<'a> {
    pub fn new(env: &'a Environment) -> Self {
        NumericalSolver { env }
    }

    pub fn solve(&self, expr: &str) -> Result<Quantity> {
        let _scope = self.env.units.enter()?;
        let env = self.env;
        let result: Operand = solve(expr, |text: &str| parse_atom(env, text).map(Operand), numerical_table())?;
        trace!(expr, result = %result.0, "numerical expression");
        Ok(result.0)
    }

    /// Result expressed in `units`, or in its own units
    pub fn solve_value(&self, expr: &str, units: Option<&str>) -> Result<Value> {
        let quantity = self.solve(expr)?;
        let _scope = self.env.units.enter()?;
        Value::from_quantity(&quantity, units)
    }
}

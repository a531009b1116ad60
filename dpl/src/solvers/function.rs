//! Native functions
//!
//! A value written as `(name)` is computed by the function registered under
//! that name. The function sees the typed values of all nodes defined so far.

use crate::environment::Environment;
use crate::lists::FunctionData;
use crate::value::Value;
use dpl_core::{DplError, Result};
use tracing::debug;

pub struct FunctionSolver<'a> {
    env: &'a Environment,
}

impl<'a> FunctionSolver<'a> {
    pub fn new(env: &'a Environment) -> Self {
        FunctionSolver { env }
    }

    /// Values of all defined nodes by name
    pub fn data(&self) -> FunctionData {
        self.env
            .nodes
            .iter()
            .filter_map(|node| node.value.clone().map(|value| (node.name.clone(), value)))
            .collect()
    }

    /// Call the function; a numerical result with units is converted to `units`
    pub fn solve(&self, name: &str, units: Option<&str>) -> Result<Value> {
        let function = self
            .env
            .functions
            .get(name)
            .ok_or_else(|| DplError::unresolved_reference(name).with_note("Function is not defined"))?;
        let result = function(&self.data())?;
        debug!(function = name, result = %result, "native function");
        match (units, &result.unit) {
            (Some(units), Some(_)) if result.payload.is_numeric() => {
                let _scope = self.env.units.enter()?;
                result.convert(units)
            }
            _ => Ok(result),
        }
    }
}

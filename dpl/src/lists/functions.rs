//! Native functions callable as `(name)` values

use crate::value::Value;
use dpl_core::{DplError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Node values visible to a native function, by name
pub type FunctionData = BTreeMap<String, Value>;

pub type NativeFn = Arc<dyn Fn(&FunctionData) -> Result<Value> + Send + Sync>;

#[derive(Clone, Default)]
pub struct FunctionList {
    functions: Vec<(String, NativeFn)>,
}

impl FunctionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, function: NativeFn) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(DplError::symbol_exists(&name).with_note("Function already exists"));
        }
        self.functions.push((name, function));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&NativeFn> {
        self.functions.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl fmt::Debug for FunctionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionList").field("functions", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_call() {
        let mut functions = FunctionList::new();
        functions.add("answer", Arc::new(|_: &FunctionData| Ok(Value::int(42)))).unwrap();
        assert!(functions.add("answer", Arc::new(|_: &FunctionData| Ok(Value::int(0)))).is_err());
        let answer = functions.get("answer").unwrap();
        assert_eq!(answer(&FunctionData::new()).unwrap(), Value::int(42));
        assert_eq!(format!("{:?}", functions), "FunctionList { functions: [\"answer\"] }");
    }
}

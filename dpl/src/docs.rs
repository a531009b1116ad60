//! Documentation of DPL code
//!
//! A documentation parse keeps every arm of every case block and every
//! occurrence of a parameter. Each occurrence is classified as declaration,
//! definition or modification; occurrences that may or may not replace an
//! earlier one (because it was defined in only some arms) count as both.

use crate::environment::Environment;
use crate::lists::Branch;
use crate::node::{Node, NodeKind, SourceRef};
use crate::settings::EnvType;
use crate::value::Payload;
use dpl_core::{format_sci, DplError, Result};
use serde::Serialize;

/// Role of one occurrence of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParType {
    /// Declaration without a value
    Dec,
    /// Definition with a value
    Def,
    /// Declaration or modification
    Dcm,
    /// Definition or modification
    Dfm,
    /// Modification
    Mod,
}

impl ParType {
    fn index(&self) -> usize {
        match self {
            ParType::Dec => 0,
            ParType::Def => 1,
            ParType::Dcm => 2,
            ParType::Dfm => 3,
            ParType::Mod => 4,
        }
    }
}

/// Positions of the reference counters in `ParameterItem::counts`
pub const INJECTIONS: usize = 5;
pub const IMPORTS: usize = 6;

/// Classify a node against the nodes documented before it
pub(crate) fn classify(env: &Environment, node: &Node) -> ParType {
    let name = node.clean_name();
    let definition = node.has_definition();
    let mut maybe = false;
    for target in env.nodes.iter().filter(|t| t.clean_name() == name) {
        let (mine, theirs) = (node.branch.last(), target.branch.last());
        if mine.map(|b| b.branch) == theirs.map(|b| b.branch) && mine.map(|b| b.case) != theirs.map(|b| b.case) {
            continue;
        }
        if let Some(branch) = theirs.and_then(|b| env.branching.get(b.branch)) {
            if !branch.is_complete(&name) {
                maybe = true;
                continue;
            }
        }
        return ParType::Mod;
    }
    match (definition, maybe) {
        (false, false) => ParType::Dec,
        (true, false) => ParType::Def,
        (false, true) => ParType::Dcm,
        (true, true) => ParType::Dfm,
    }
}

// ========== Items ==========

/// Float text of documentation tables
fn format_value(payload: &Payload) -> String {
    match payload {
        Payload::Float(values) if values.is_scalar() => {
            let v = values.as_scalar().copied().unwrap_or_default();
            if v == 0.0 || (1e-3..1e4).contains(&v.abs()) {
                format!("{:.3}", v)
            } else {
                format_sci(v, 3)
            }
        }
        Payload::Str(strings) if strings.is_scalar() => strings.as_scalar().cloned().unwrap_or_default(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeItem {
    pub name: String,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub dtype: String,
    pub source: SourceRef,
    pub ptype: ParType,
    pub injection: bool,
    pub imported: Option<SourceRef>,
    pub options: Vec<String>,
    pub constant: bool,
    pub format: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub branch: Vec<crate::node::BranchRef>,
}

impl NodeItem {
    fn new(name: &str, node: &Node, ptype: ParType) -> Self {
        let value = match (&node.kind, &node.value) {
            (NodeKind::Mod, _) | (_, None) => node.raw_text(),
            (_, Some(value)) => Some(format_value(&value.payload)),
        };
        let unit = node.value.as_ref().and_then(|v| v.unit.clone()).or_else(|| node.units_raw.clone());
        NodeItem {
            name: name.to_string(),
            value,
            unit,
            dtype: node.dtype().map(|d| d.to_string()).unwrap_or_else(|| node.kind.to_string()),
            source: node.source.clone(),
            ptype,
            injection: node.value_ref.is_some(),
            imported: node.isource.clone(),
            options: node.options.iter().map(|o| o.to_string()).collect(),
            constant: node.constant,
            format: node.format.clone(),
            tags: node.tags.clone(),
            description: node.description.clone(),
            condition: node.condition.clone(),
            branch: node.branch.clone(),
        }
    }
}

/// All occurrences of one parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterItem {
    pub name: String,
    /// Occurrences per `ParType`, then injections and imports
    pub counts: [usize; 7],
    pub nodes: Vec<NodeItem>,
}

impl ParameterItem {
    fn add(&mut self, node: &Node) {
        let ptype = node.docs.unwrap_or(ParType::Def);
        self.counts[ptype.index()] += 1;
        if node.value_ref.is_some() {
            self.counts[INJECTIONS] += 1;
        }
        if node.isource.is_some() {
            self.counts[IMPORTS] += 1;
        }
        self.nodes.push(NodeItem::new(&self.name, node, ptype));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedNode {
    pub name: String,
    pub source: SourceRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportItem {
    pub name: String,
    pub reference: Option<String>,
    pub source: SourceRef,
    pub nodes: Vec<ImportedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjectionItem {
    pub name: String,
    pub reference: String,
    pub source: SourceRef,
    pub value: Option<String>,
    pub unit: Option<String>,
    /// Where the injected value was defined
    pub isource: Option<SourceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceItem {
    pub name: String,
    pub path: Option<String>,
    pub parent: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitItem {
    pub name: String,
    pub value: f64,
    pub units: Option<String>,
    pub source: SourceRef,
}

// ========== Documentation ==========

#[derive(Debug, Clone, Serialize)]
pub struct Documentation {
    #[serde(skip)]
    pub env: Environment,
    /// Parameters in order of their first occurrence
    pub parameters: Vec<ParameterItem>,
    pub imports: Vec<ImportItem>,
    pub injections: Vec<InjectionItem>,
    pub sources: Vec<SourceItem>,
    pub units: Vec<UnitItem>,
    pub branches: Vec<Branch>,
}

impl Documentation {
    pub fn new(env: Environment) -> Result<Self> {
        if env.envtype != EnvType::Docs {
            return Err(DplError::invalid_input("Documentation requires a documentation parse"));
        }
        let mut parameters: Vec<ParameterItem> = Vec::new();
        let mut imports = Vec::new();
        let mut injections = Vec::new();
        for node in env.nodes.iter() {
            if node.kind == NodeKind::Import {
                imports.push(ImportItem {
                    name: node.clean_name(),
                    reference: node.value_ref.clone(),
                    source: node.source.clone(),
                    nodes: env
                        .nodes
                        .iter()
                        .filter(|n| n.kind != NodeKind::Import && n.isource.as_ref() == Some(&node.source))
                        .map(|n| ImportedNode { name: n.name.clone(), source: n.source.clone() })
                        .collect(),
                });
                continue;
            }
            let name = node.clean_name();
            match parameters.iter_mut().find(|p| p.name == name) {
                Some(parameter) => parameter.add(node),
                None => {
                    let mut parameter = ParameterItem { name, counts: [0; 7], nodes: Vec::new() };
                    parameter.add(node);
                    parameters.push(parameter);
                }
            }
            if let Some(reference) = &node.value_ref {
                let injection = node.injection.as_ref();
                injections.push(InjectionItem {
                    name: node.clean_name(),
                    reference: reference.clone(),
                    source: node.source.clone(),
                    value: injection.map(|i| i.value.clone()),
                    unit: injection.and_then(|i| i.unit.clone()),
                    isource: injection.map(|i| i.source.clone()),
                });
            }
        }
        let sources = env
            .sources
            .iter()
            .map(|s| SourceItem {
                name: s.name.clone(),
                path: s.path.as_ref().map(|p| p.display().to_string()),
                parent: s.parent.clone(),
                code: s.code.clone(),
            })
            .collect();
        let units = env
            .units
            .iter()
            .map(|u| UnitItem {
                name: u.name.clone(),
                value: u.value,
                units: u.units.clone(),
                source: u.source.clone(),
            })
            .collect();
        let branches = env.branching.branches.clone();
        Ok(Documentation { env, parameters, imports, injections, sources, units, branches })
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterItem> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|err| DplError::invalid_input("Documentation cannot be serialized").with_arg(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Payload::Float(dpl_core::NdArray::scalar(4.0))), "4.000");
        assert_eq!(format_value(&Payload::Float(dpl_core::NdArray::scalar(0.0))), "0.000");
        assert_eq!(format_value(&Payload::Float(dpl_core::NdArray::scalar(2.5e7))), "2.500e+07");
        assert_eq!(format_value(&Payload::Str(dpl_core::NdArray::scalar("a b".to_string()))), "a b");
    }

    #[test]
    fn test_requires_docs_environment() {
        let err = Documentation::new(Environment::new(EnvType::Data)).unwrap_err();
        assert!(err.is(dpl_core::ErrorKind::InvalidInput));
        let docs = Documentation::new(Environment::new(EnvType::Docs)).unwrap();
        assert!(docs.parameters.is_empty());
        assert!(docs.to_json().unwrap()["parameters"].as_array().unwrap().is_empty());
    }
}

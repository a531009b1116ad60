//! Parsed environment
//!
//! Holds everything a parse produces: value nodes, custom units, sources and
//! native functions, plus the state needed while parsing (name hierarchy
//! and case blocks). References such as `{?a.b}` or `{source?a.*}` are
//! resolved through `Environment::request`.

use crate::lists::{BranchingList, EnvSource, EnvUnit, FunctionList, HierarchyList, NodeList, SourceList, UnitList};
use crate::node::{Node, NodeView};
use crate::settings::{sign, EnvType, Format};
use crate::value::{Payload, Value};
use dpl_core::{DplError, Result};
use dpl_units::Quantity;
use serde::Serialize;

/// Result of a request: nodes, or the code of a whole source
#[derive(Debug, Clone, PartialEq)]
pub enum Requested {
    Nodes(Vec<Node>),
    Code(String),
}

/// One entry of `Environment::data`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datum {
    Value(Option<Payload>),
    Tuple(Option<Payload>, String),
    Typed(Option<Value>),
    Quantity(Quantity),
    Node(NodeView),
}

#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub nodes: NodeList,
    pub units: UnitList,
    pub sources: SourceList,
    pub functions: FunctionList,
    pub hierarchy: HierarchyList,
    pub branching: BranchingList,
    /// Node that `{?}` refers to while validating a condition
    pub autoref: Option<String>,
    pub envtype: EnvType,
}

impl Environment {
    pub fn new(envtype: EnvType) -> Self {
        Environment {
            branching: BranchingList::new(envtype == EnvType::Docs),
            envtype,
            ..Default::default()
        }
    }

    // ========== Requests ==========

    fn split(path: &str) -> (&str, Option<&str>) {
        match path.split_once(sign::QUERY) {
            Some((source, query)) => (source.trim(), Some(query.trim())),
            None => (path.trim(), None),
        }
    }

    fn remote(&self, name: &str) -> Result<&EnvSource> {
        self.sources
            .get(name)
            .ok_or_else(|| DplError::unresolved_reference(name).with_note("Source is not defined"))
    }

    /// Resolve `?query`, `source?query` or a plain `source`.
    ///
    /// `count` lists the accepted numbers of matching nodes.
    pub fn request(&self, path: &str, count: Option<&[usize]>, tags: Option<&[String]>) -> Result<Requested> {
        let (source, query) = Environment::split(path);
        let nodes = match (source, query) {
            ("", Some(query)) => {
                let query = match (query, &self.autoref) {
                    ("", Some(autoref)) => autoref.as_str(),
                    ("", None) => {
                        return Err(DplError::unresolved_reference(path)
                            .with_note("Self reference is only valid in conditions"))
                    }
                    (query, _) => query,
                };
                self.nodes.query(query, tags)
            }
            (source, Some(query)) => match &self.remote(source)?.nodes {
                Some(nodes) => nodes.query(query, tags),
                None => {
                    return Err(DplError::unresolved_reference(path).with_note("Source has no nodes"))
                }
            },
            (source, None) => {
                let code = self.remote(source)?.code.clone().ok_or_else(|| {
                    DplError::unresolved_reference(path).with_note("Source has no code")
                })?;
                return Ok(Requested::Code(code));
            }
        };
        if let Some(count) = count {
            if !count.contains(&nodes.len()) {
                return Err(DplError::unresolved_reference(path)
                    .with_arg(nodes.len())
                    .with_note("Unexpected number of referenced nodes"));
            }
        }
        Ok(Requested::Nodes(nodes))
    }

    /// Request nodes; a plain source name is an error
    pub fn request_nodes(&self, path: &str, count: Option<&[usize]>) -> Result<Vec<Node>> {
        match self.request(path, count, None)? {
            Requested::Nodes(nodes) => Ok(nodes),
            Requested::Code(_) => Err(DplError::unresolved_reference(path).with_note("Reference selects no nodes")),
        }
    }

    /// Value of exactly one referenced node
    pub fn request_value(&self, path: &str) -> Result<(Node, Value)> {
        let mut nodes = self.request_nodes(path, Some(&[1]))?;
        let node = nodes.remove(0);
        let value = node
            .value
            .clone()
            .ok_or_else(|| DplError::undefined(&node.name).with_note("Referenced node has no value"))?;
        Ok((node, value))
    }

    /// Units of `source?query`, or of this environment for `?query`
    pub fn request_units(&self, path: &str) -> Result<Vec<EnvUnit>> {
        match Environment::split(path) {
            ("", Some(query)) => Ok(self.units.query(query)),
            (source, Some(query)) => match &self.remote(source)?.units {
                Some(units) => Ok(units.query(query)),
                None => Ok(Vec::new()),
            },
            (_, None) => Err(DplError::unresolved_reference(path).with_note("Unit request needs a query")),
        }
    }

    /// Sources of `source?query`, or of this environment for `?query`
    pub fn request_sources(&self, path: &str) -> Result<Vec<EnvSource>> {
        match Environment::split(path) {
            ("", Some(query)) => Ok(self.sources.query(query)),
            (source, Some(query)) => match &self.remote(source)?.sources {
                Some(sources) => Ok(sources.query(query)),
                None => Ok(Vec::new()),
            },
            (_, None) => Err(DplError::unresolved_reference(path).with_note("Source request needs a query")),
        }
    }

    // ========== Output ==========

    fn selected(&self, query: Option<&str>, tags: Option<&[String]>) -> Vec<Node> {
        self.nodes.query(query.unwrap_or(sign::WILDCARD), tags)
    }

    /// Node values by name in the requested format
    pub fn data(&self, format: Format, query: Option<&str>, tags: Option<&[String]>) -> Result<Vec<(String, Datum)>> {
        let _scope = self.units.enter()?;
        self.selected(query, tags)
            .into_iter()
            .map(|node| {
                let value = node.value.clone();
                let datum = match format {
                    Format::Value => Datum::Value(value.map(|v| v.payload)),
                    Format::Tuple => match value {
                        Some(Value { payload, unit: Some(unit) }) => Datum::Tuple(Some(payload), unit),
                        other => Datum::Value(other.map(|v| v.payload)),
                    },
                    Format::Type => Datum::Typed(value),
                    Format::Quantity => match value {
                        Some(v) if v.payload.is_numeric() => Datum::Quantity(v.quantity()?),
                        other => Datum::Value(other.map(|v| v.payload)),
                    },
                    Format::Node => Datum::Node(node.view()?),
                };
                Ok((node.name, datum))
            })
            .collect()
    }

    /// Consumer views of all nodes
    pub fn views(&self) -> Result<Vec<NodeView>> {
        let _scope = self.units.enter()?;
        self.nodes.iter().map(Node::view).collect()
    }

    /// Data as a JSON object
    pub fn to_json(&self, format: Format, query: Option<&str>, tags: Option<&[String]>) -> Result<serde_json::Value> {
        let _scope = self.units.enter()?;
        let mut map = serde_json::Map::new();
        for (name, datum) in self.data(format, query, tags)? {
            let json = serde_json::to_value(&datum)
                .map_err(|err| DplError::invalid_input("Data cannot be serialized").with_arg(err))?;
            map.insert(name, json);
        }
        Ok(serde_json::Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, SourceRef};
    use crate::value::DataType;
    use dpl_core::ErrorKind;

    fn node(name: &str, value: Value) -> Node {
        let mut node = Node::new(name, SourceRef::new("test", 1));
        node.name = name.to_string();
        node.kind = match value.payload {
            Payload::Int(_) => NodeKind::Value(DataType::INT),
            Payload::Str(_) => NodeKind::Value(DataType::Str),
            _ => NodeKind::Value(DataType::FLOAT),
        };
        node.units_raw = value.unit.clone();
        node.value = Some(value);
        node
    }

    fn env() -> Environment {
        let mut env = Environment::new(EnvType::Data);
        env.nodes.push(node("box.width", Value::float(2.0, Some("cm"))));
        env.nodes.push(node("box.count", Value::int(3)));
        env.nodes.push(node("title", Value::string("Box")));
        env
    }

    #[test]
    fn test_request_local() {
        let env = env();
        let nodes = env.request_nodes("?box.*", None).unwrap();
        assert_eq!(nodes.len(), 2);
        let (node, value) = env.request_value("?box.width").unwrap();
        assert_eq!(node.name, "width");
        assert_eq!(value, Value::float(2.0, Some("cm")));
        let err = env.request_value("?missing").unwrap_err();
        assert!(err.is(ErrorKind::UnresolvedReference));
    }

    #[test]
    fn test_request_autoref() {
        let mut env = env();
        assert!(env.request_nodes("?", None).is_err());
        env.autoref = Some("title".into());
        assert_eq!(env.request_nodes("?", Some(&[1])).unwrap()[0].name, "title");
    }

    #[test]
    fn test_request_remote() {
        let mut env = env();
        let mut remote = EnvSource::new("lib").with_code("a int = 1");
        remote.nodes = Some(env.nodes.clone());
        env.sources.add(remote).unwrap();
        assert_eq!(env.request_nodes("lib?*", None).unwrap().len(), 3);
        assert_eq!(env.request("lib", None, None).unwrap(), Requested::Code("a int = 1".into()));
        assert!(env.request("other?*", None, None).unwrap_err().is(ErrorKind::UnresolvedReference));
    }

    #[test]
    fn test_data_formats() {
        let env = env();
        let data = env.data(Format::Tuple, None, None).unwrap();
        assert_eq!(data[0].0, "box.width");
        assert_eq!(
            serde_json::to_value(&data[0].1).unwrap(),
            serde_json::json!([2.0, "cm"])
        );
        assert_eq!(serde_json::to_value(&data[1].1).unwrap(), serde_json::json!(3));

        let json = env.to_json(Format::Value, Some("box.*"), None).unwrap();
        assert_eq!(json, serde_json::json!({"width": 2.0, "count": 3}));

        let data = env.data(Format::Quantity, Some("box.width"), None).unwrap();
        match &data[0].1 {
            Datum::Quantity(q) => assert_eq!(q.units(), "cm"),
            other => panic!("unexpected {:?}", other),
        }
        let data = env.data(Format::Node, Some("title"), None).unwrap();
        assert!(matches!(&data[0].1, Datum::Node(view) if view.keyword == "str"));
    }
}

//! Parameter nodes
//!
//! Every non-empty line of DPL code becomes one `Node`. Value nodes carry a
//! data type and end up in the environment; the other kinds are directives
//! and properties that act on the environment while it is being built.

use crate::docs::ParType;
use crate::settings::keyword;
use crate::value::{DataType, Payload, RawValue, Value};
use dpl_core::{DplError, ErrorKind, Result, SliceSpec};
use dpl_units::{Dimensions, Quantity};
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

/// Array length constraint of one axis: `(min, max)`
pub type Bound = (Option<usize>, Option<usize>);

// ========== Node kinds ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseKind {
    Case,
    Else,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Blank line or comment
    Empty,
    /// Name without type; parent of deeper indented nodes
    Group,
    /// `{source?query}` or `name {source?query}`
    Import,
    /// `$unit`
    Unit,
    /// `$source`
    Source,
    /// `@case`, `@else`, `@end`
    Case(CaseKind),
    /// `= value` or `!options [...]`
    Options,
    Constant,
    Format,
    Condition,
    Tags,
    Description,
    /// `name = value` without a type
    Mod,
    /// Typed value node
    Value(DataType),
    /// `name table = """..."""`
    Table,
}

impl NodeKind {
    /// Property lines modify the preceding value node
    pub fn is_property(&self) -> bool {
        matches!(
            self,
            NodeKind::Options
                | NodeKind::Constant
                | NodeKind::Format
                | NodeKind::Condition
                | NodeKind::Tags
                | NodeKind::Description
        )
    }

    /// Kinds that take part in the name hierarchy
    pub fn is_registered(&self) -> bool {
        !matches!(self, NodeKind::Empty | NodeKind::Unit | NodeKind::Source) && !self.is_property()
    }

    pub fn dtype(&self) -> Option<DataType> {
        match self {
            NodeKind::Value(dtype) => Some(*dtype),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Empty => write!(f, "empty"),
            NodeKind::Group => write!(f, "group"),
            NodeKind::Import => write!(f, "import"),
            NodeKind::Unit => write!(f, "{}", keyword::UNIT),
            NodeKind::Source => write!(f, "{}", keyword::SOURCE),
            NodeKind::Case(CaseKind::Case) => write!(f, "{}", keyword::CASE),
            NodeKind::Case(CaseKind::Else) => write!(f, "{}", keyword::ELSE),
            NodeKind::Case(CaseKind::End) => write!(f, "{}", keyword::END),
            NodeKind::Options => write!(f, "{}", keyword::OPTIONS),
            NodeKind::Constant => write!(f, "{}", keyword::CONSTANT),
            NodeKind::Format => write!(f, "{}", keyword::FORMAT),
            NodeKind::Condition => write!(f, "{}", keyword::CONDITION),
            NodeKind::Tags => write!(f, "{}", keyword::TAGS),
            NodeKind::Description => write!(f, "{}", keyword::DESCRIPTION),
            NodeKind::Mod => write!(f, "mod"),
            NodeKind::Value(dtype) => write!(f, "{}", dtype.keyword()),
            NodeKind::Table => write!(f, "table"),
        }
    }
}

// ========== Locations ==========

/// Source name and line number of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub name: String,
    pub line: usize,
}

impl SourceRef {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        SourceRef { name: name.into(), line }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.line)
    }
}

/// One enclosing `@case`/`@else` arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BranchRef {
    pub branch: usize,
    pub case: usize,
}

/// Where an injected value came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Injection {
    pub reference: String,
    pub source: SourceRef,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

// ========== Node ==========

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub code: String,
    pub source: SourceRef,
    /// Source of an imported node
    pub isource: Option<SourceRef>,
    pub kind: NodeKind,
    pub indent: usize,
    pub name: String,

    pub value_raw: Option<RawValue>,
    pub value_ref: Option<String>,
    pub value_slice: Option<String>,
    pub value_fn: Option<String>,
    pub value_expr: Option<String>,
    pub units_raw: Option<String>,
    pub dimension: Option<Vec<Bound>>,
    /// Declared without `=`
    pub declared: bool,
    pub value: Option<Value>,

    pub constant: bool,
    pub condition: Option<String>,
    pub format: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub options: Vec<Value>,

    pub branch: Vec<BranchRef>,
    /// False for nodes brought in by an import
    pub primary: bool,
    pub injection: Option<Injection>,
    pub docs: Option<ParType>,
}

impl Node {
    pub fn new(code: impl Into<String>, source: SourceRef) -> Self {
        Node {
            code: code.into(),
            source,
            isource: None,
            kind: NodeKind::Empty,
            indent: 0,
            name: String::new(),
            value_raw: None,
            value_ref: None,
            value_slice: None,
            value_fn: None,
            value_expr: None,
            units_raw: None,
            dimension: None,
            declared: false,
            value: None,
            constant: false,
            condition: None,
            format: None,
            tags: Vec::new(),
            description: None,
            options: Vec::new(),
            branch: Vec::new(),
            primary: true,
            injection: None,
            docs: None,
        }
    }

    pub fn dtype(&self) -> Option<DataType> {
        self.kind.dtype()
    }

    /// Name without the `@k` segments of case arms
    pub fn clean_name(&self) -> String {
        clean_name(&self.name)
    }

    /// Last segment of the dotted name
    pub fn local_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Attach the location of this node to an error
    pub fn located(&self, err: DplError) -> DplError {
        err.at_line(self.source.name.clone(), self.source.line).with_code(self.code.trim())
    }

    /// Any form of value was given
    pub fn has_definition(&self) -> bool {
        self.value.is_some()
            || self.value_raw.is_some()
            || self.value_ref.is_some()
            || self.value_expr.is_some()
            || self.value_fn.is_some()
    }

    /// Raw text of the value as written
    pub fn raw_text(&self) -> Option<String> {
        if let Some(expr) = &self.value_expr {
            return Some(format!("(\"{}\")", expr));
        }
        if let Some(name) = &self.value_fn {
            return Some(format!("({})", name));
        }
        if let Some(reference) = &self.value_ref {
            return Some(format!("{{{}}}", reference));
        }
        self.value_raw.as_ref().map(|raw| raw.to_string())
    }

    // ========== Values ==========

    /// Check units given to a value node
    pub fn check_units(&self) -> Result<()> {
        let (Some(dtype), Some(units)) = (self.dtype(), &self.units_raw) else {
            return Ok(());
        };
        if !dtype.is_numeric() {
            return Err(DplError::invalid_input("Units are not allowed for this node type")
                .with_arg(dtype)
                .with_arg(units));
        }
        Quantity::parse(1.0, units).map(|_| ())
    }

    /// Take over type, units and shape of the node being modified
    pub fn adopt_type(&mut self, target: &Node) {
        self.kind = target.kind;
        self.dimension = target.dimension.clone();
        if self.units_raw.is_none() {
            self.units_raw = target.units_raw.clone();
        }
    }

    /// Cast a raw value to the node type
    pub fn cast(&self, raw: &RawValue) -> Result<Option<Value>> {
        let dtype = self
            .dtype()
            .ok_or_else(|| DplError::invalid_input("Node has no data type").with_arg(&self.kind))?;
        let (payload, unit) = match raw {
            _ if raw.is_none() => return Ok(None),
            RawValue::Text(text) => (Payload::parse(text, dtype)?, self.units_raw.clone()),
            RawValue::Items(items) => {
                let cells = items
                    .iter()
                    .map(|item| match self.dimension.as_ref().map(|d| d.len()) {
                        Some(n) if n > 1 => serde_json::from_str(item).map_err(|err| {
                            DplError::invalid_input("Table cell is not an array")
                                .with_arg(item)
                                .with_note(err.to_string())
                        }),
                        _ => Ok(JsonValue::String(item.clone())),
                    })
                    .collect::<Result<Vec<_>>>()?;
                (Payload::from_json(&JsonValue::Array(cells), dtype)?, self.units_raw.clone())
            }
            RawValue::Computed(value) => {
                let value = match (&value.unit, &self.units_raw) {
                    (Some(from), Some(to)) if from != to && dtype.is_numeric() => value.convert(to)?,
                    _ => value.clone(),
                };
                let unit = self.units_raw.clone().or(value.unit);
                (value.payload.cast(dtype)?, unit)
            }
        };
        payload.check_range(dtype)?;
        self.check_dimension(&payload)?;
        let unit = if dtype.is_numeric() { unit } else { None };
        Ok(Some(Value::new(payload, unit)))
    }

    /// Fail when the payload shape breaks the dimension constraints
    pub fn check_dimension(&self, payload: &Payload) -> Result<()> {
        let shape = payload.shape();
        let Some(bounds) = &self.dimension else {
            if shape.is_empty() {
                return Ok(());
            }
            return Err(DplError::invalid_input("Array value set to scalar node")
                .with_arg(&self.name)
                .with_arg(format!("{:?}", shape)));
        };
        if shape.len() != bounds.len() {
            return Err(DplError::invalid_input("Node value has wrong number of dimensions")
                .with_arg(&self.name)
                .with_arg(format!("{:?}", shape)));
        }
        for (axis, (size, (min, max))) in shape.iter().zip(bounds).enumerate() {
            if min.is_some_and(|m| *size < m) || max.is_some_and(|m| *size > m) {
                return Err(DplError::invalid_input("Node value has invalid dimension")
                    .with_arg(&self.name)
                    .with_arg(axis)
                    .with_arg(size));
            }
        }
        Ok(())
    }

    /// Cast the raw value; computed values may carry units the node adopts
    pub fn set_value(&mut self) -> Result<()> {
        let Some(raw) = &self.value_raw else {
            return Ok(());
        };
        if let (RawValue::Computed(value), None) = (raw, &self.units_raw) {
            if self.dtype().is_some_and(|d| d.is_numeric()) {
                self.units_raw = value.unit.clone();
            }
        }
        self.value = self.cast(raw)?;
        Ok(())
    }

    /// Replace the value of this node by the value of a later node
    pub fn modify_value(&mut self, other: &Node) -> Result<()> {
        if let (Some(mine), Some(theirs)) = (self.dtype(), other.dtype()) {
            if other.kind != NodeKind::Mod && mine.keyword() != theirs.keyword() {
                return Err(DplError::type_change(&self.name, mine.keyword(), theirs.keyword()));
            }
        }
        let Some(value) = &other.value else {
            return Ok(());
        };
        self.value = self.cast(&RawValue::Computed(value.clone()))?;
        Ok(())
    }

    // ========== Properties ==========

    /// Add option values given by an option node
    pub fn set_option(&mut self, option: &Node) -> Result<()> {
        let dtype = match self.dtype() {
            Some(DataType::Bool) | None => {
                return Err(DplError::invalid_constraint(
                    "Options are not allowed for this node type",
                    &self.name,
                )
                .with_arg(&self.kind));
            }
            Some(dtype) => dtype,
        };
        let texts: Vec<String> = match &option.value_raw {
            Some(RawValue::Text(text)) if option.dimension.is_some() => {
                let json: JsonValue = serde_json::from_str(text).map_err(|err| {
                    DplError::invalid_input("Options must be a list")
                        .with_arg(text)
                        .with_note(err.to_string())
                })?;
                match json {
                    JsonValue::Array(items) => items
                        .into_iter()
                        .map(|item| match item {
                            JsonValue::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect(),
                    other => vec![other.to_string()],
                }
            }
            Some(RawValue::Computed(value)) => {
                self.options.push(value.clone());
                return Ok(());
            }
            Some(raw) => vec![raw.to_string()],
            None => Vec::new(),
        };
        let unit = option.units_raw.clone().or_else(|| self.units_raw.clone());
        for text in texts {
            let payload = Payload::parse(&text, dtype)?;
            let mut value = Value::new(payload, if dtype.is_numeric() { unit.clone() } else { None });
            if let (Some(from), Some(to)) = (&value.unit, &self.units_raw) {
                if from != to {
                    value = value.convert(to)?;
                }
            }
            self.options.push(value);
        }
        Ok(())
    }

    pub fn set_format(&mut self, format: String) -> Result<()> {
        if self.dtype() != Some(DataType::Str) {
            return Err(DplError::invalid_constraint("Format can be set only to string nodes", &self.name)
                .with_arg(&self.kind));
        }
        self.format = Some(format);
        Ok(())
    }

    pub fn add_tags(&mut self, tags: &str) -> Result<()> {
        if !matches!(self.kind, NodeKind::Value(_)) {
            return Err(DplError::invalid_constraint("Tags can be set only to value nodes", &self.name)
                .with_arg(&self.kind));
        }
        let json: JsonValue = serde_json::from_str(tags).map_err(|err| {
            DplError::invalid_input("Tags must be a list of strings")
                .with_arg(tags)
                .with_note(err.to_string())
        })?;
        match json {
            JsonValue::Array(items) => {
                for item in items {
                    match item {
                        JsonValue::String(tag) => self.tags.push(tag),
                        other => self.tags.push(other.to_string()),
                    }
                }
            }
            JsonValue::String(tag) => self.tags.push(tag),
            other => {
                return Err(DplError::invalid_input("Tags must be a list of strings").with_arg(other))
            }
        }
        Ok(())
    }

    pub fn add_description(&mut self, text: &str) {
        match &mut self.description {
            Some(description) => {
                description.push('\n');
                description.push_str(text);
            }
            None => self.description = Some(text.to_string()),
        }
    }

    // ========== Validation ==========

    /// Value must equal one of the options
    pub fn validate_options(&self) -> Result<()> {
        let Some(value) = &self.value else {
            return Ok(());
        };
        if self.options.is_empty() {
            return Ok(());
        }
        for option in &self.options {
            if value.equals(option)? {
                return Ok(());
            }
        }
        Err(DplError::option_mismatch(&value.to_string(), &self.name)
            .with_args(self.options.iter().map(|o| o.to_string())))
    }

    /// String values must match the format regex from their start
    pub fn validate_format(&self) -> Result<()> {
        let (Some(format), Some(value)) = (&self.format, &self.value) else {
            return Ok(());
        };
        let Payload::Str(strings) = &value.payload else {
            return Ok(());
        };
        let regex = Regex::new(&format!("^(?:{})", format)).map_err(|err| {
            DplError::invalid_constraint("Format is not a valid regular expression", &self.name)
                .with_arg(format)
                .with_note(err.to_string())
        })?;
        match strings.data().iter().find(|s| !regex.is_match(s)) {
            Some(bad) => Err(DplError::format_mismatch(&self.name, bad, format)),
            None => Ok(()),
        }
    }

    /// Declared nodes must receive a value by the end of the parse
    pub fn validate_defined(&self) -> Result<()> {
        if self.declared && self.value.is_none() && matches!(self.kind, NodeKind::Value(_)) {
            return Err(DplError::new(ErrorKind::Undefined, "Node value must be defined").with_arg(&self.name));
        }
        Ok(())
    }

    // ========== Views ==========

    /// Consumer view of a value node
    pub fn view(&self) -> Result<NodeView> {
        let dimensions = match &self.units_raw {
            Some(units) if self.dtype().is_some_and(|d| d.is_numeric()) => {
                Some(Quantity::parse(1.0, units)?.dimensions()?)
            }
            _ => None,
        };
        Ok(NodeView {
            name: self.name.clone(),
            keyword: self.dtype().map(|d| d.to_string()).unwrap_or_else(|| self.kind.to_string()),
            value: self.value.as_ref().map(|v| v.payload.to_json()),
            unit: self.units_raw.clone(),
            dimensions,
            constant: self.constant,
            tags: self.tags.clone(),
            description: self.description.clone(),
            source: self.isource.clone().unwrap_or_else(|| self.source.clone()),
            primary: self.primary,
            branch: self.branch.clone(),
        })
    }
}

/// Remove `@k` case arm segments from a dotted name
pub fn clean_name(name: &str) -> String {
    name.split('.')
        .filter(|segment| {
            !segment
                .strip_prefix('@')
                .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Parse `[a:b,c]` style dimension constraints
pub fn parse_bounds(text: &str) -> Result<Vec<Bound>> {
    let number = |s: &str| -> Result<Option<usize>> {
        if s.trim().is_empty() {
            return Ok(None);
        }
        s.trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| DplError::parse_error("Invalid array dimension").with_arg(text))
    };
    text.split(',')
        .map(|part| match part.split_once(':') {
            Some((min, max)) => Ok((number(min)?, number(max)?)),
            None => {
                let n = number(part)?;
                Ok((n, n))
            }
        })
        .collect()
}

/// Slice a value by a `[...]` slice text; a single string is sliced by characters
pub fn slice_value(value: &Value, slice: &str) -> Result<Value> {
    let specs = SliceSpec::parse_list(slice)?;
    if let (Payload::Str(strings), [spec]) = (&value.payload, specs.as_slice()) {
        if let Some(text) = strings.as_scalar() {
            let chars: Vec<char> = text.chars().collect();
            let picked: String = spec.indices(chars.len())?.into_iter().map(|i| chars[i]).collect();
            return Ok(Value::string(picked));
        }
    }
    value.slice(&specs)
}

/// What export collaborators see of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub name: String,
    pub keyword: String,
    pub value: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    pub constant: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: SourceRef,
    pub primary: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branch: Vec<BranchRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_core::NdArray;

    fn float_node(name: &str, units: Option<&str>) -> Node {
        let mut node = Node::new(format!("{} float", name), SourceRef::new("test", 1));
        node.name = name.into();
        node.kind = NodeKind::Value(DataType::FLOAT);
        node.units_raw = units.map(str::to_string);
        node
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("box.@12.size"), "box.size");
        assert_eq!(clean_name("@0.@3.x"), "x");
        assert_eq!(clean_name("box.@case"), "box.@case");
        assert_eq!(clean_name("plain"), "plain");
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(parse_bounds("1:,3").unwrap(), vec![(Some(1), None), (Some(3), Some(3))]);
        assert_eq!(parse_bounds(":4").unwrap(), vec![(None, Some(4))]);
        assert!(parse_bounds("a").is_err());
    }

    #[test]
    fn test_cast_checks_dimension() {
        let mut node = float_node("v", Some("km"));
        node.dimension = Some(parse_bounds("2:").unwrap());
        let value = node.cast(&RawValue::Text("[1, 2, 3]".into())).unwrap().unwrap();
        assert_eq!(value.payload.shape(), &[3]);
        assert!(node.cast(&RawValue::Text("[1]".into())).is_err());
        node.dimension = None;
        assert!(node.cast(&RawValue::Text("[1, 2]".into())).is_err());
        assert_eq!(node.cast(&RawValue::Text("none".into())).unwrap(), None);
    }

    #[test]
    fn test_cast_computed_converts_units() {
        let node = float_node("length", Some("cm"));
        let value = node
            .cast(&RawValue::Computed(Value::float(2.0, Some("m"))))
            .unwrap()
            .unwrap();
        assert_eq!(value.unit.as_deref(), Some("cm"));
        assert!((value.payload.to_f64().unwrap().data()[0] - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_modify_type_change() {
        let mut target = float_node("a", None);
        let mut other = Node::new("a int = 3", SourceRef::new("test", 2));
        other.name = "a".into();
        other.kind = NodeKind::Value(DataType::INT);
        other.value = Some(Value::int(3));
        let err = target.modify_value(&other).unwrap_err();
        assert!(err.is(ErrorKind::TypeChange));
    }

    #[test]
    fn test_options_union_and_units() {
        let mut size = float_node("size", Some("cm"));
        let mut centimeters = Node::new("!options [12,13] cm", SourceRef::new("test", 2));
        centimeters.kind = NodeKind::Options;
        centimeters.value_raw = Some(RawValue::Text("[12,13]".into()));
        centimeters.units_raw = Some("cm".into());
        centimeters.dimension = Some(vec![(None, None)]);
        let mut meters = centimeters.clone();
        meters.value_raw = Some(RawValue::Text("[22,23]".into()));
        meters.units_raw = Some("m".into());
        size.set_option(&centimeters).unwrap();
        size.set_option(&meters).unwrap();
        assert_eq!(size.options.len(), 4);

        size.value = Some(Value::float(2300.0, Some("cm")));
        assert!(size.validate_options().is_ok());
        size.value = Some(Value::float(14.0, Some("cm")));
        assert!(size.validate_options().unwrap_err().is(ErrorKind::OptionMismatch));
    }

    #[test]
    fn test_options_not_for_bool() {
        let mut flag = float_node("flag", None);
        flag.kind = NodeKind::Value(DataType::Bool);
        let option = Node::new("= true", SourceRef::new("test", 2));
        assert!(flag.set_option(&option).unwrap_err().is(ErrorKind::InvalidConstraint));
    }

    #[test]
    fn test_format() {
        let mut name = float_node("name", None);
        assert!(name.set_format("[a-z]+".into()).unwrap_err().is(ErrorKind::InvalidConstraint));
        name.kind = NodeKind::Value(DataType::Str);
        name.set_format("[a-z]+".into()).unwrap();
        name.value = Some(Value::string("abc1"));
        assert!(name.validate_format().is_ok());
        name.value = Some(Value::string("1abc"));
        assert!(name.validate_format().unwrap_err().is(ErrorKind::FormatMismatch));
    }

    #[test]
    fn test_tags_and_description() {
        let mut node = float_node("x", None);
        node.add_tags("[\"input\", \"geometry\"]").unwrap();
        node.add_description("first");
        node.add_description("second");
        assert_eq!(node.tags, vec!["input", "geometry"]);
        assert_eq!(node.description.as_deref(), Some("first\nsecond"));
        assert!(node.add_tags("{").is_err());
    }

    #[test]
    fn test_view() {
        let mut node = float_node("speed", Some("km/s"));
        node.value = Some(Value::new(Payload::Float(NdArray::scalar(3.0)), Some("km/s".into())));
        let view = node.view().unwrap();
        assert_eq!(view.keyword, "float64");
        assert_eq!(view.value, Some(serde_json::json!(3.0)));
        assert!(view.dimensions.is_some());
        assert!(view.primary);
    }
}

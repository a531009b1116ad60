//! Parse driver
//!
//! `Dpl` collects code from strings and files, custom units, sources and
//! native functions, then parses everything into an `Environment` or into
//! `Documentation`.
//!
//! ```no_run
//! use dpl::{Dpl, Format};
//!
//! let mut dpl = Dpl::new();
//! dpl.add_string("width float = 2 cm\nheight float = (\"{?width} * 3\") mm")?;
//! let env = dpl.parse()?;
//! println!("{}", env.to_json(Format::Tuple, None, None)?);
//! # Ok::<(), dpl::DplError>(())
//! ```

use crate::docs::Documentation;
use crate::environment::Environment;
use crate::lists::{EnvSource, FunctionData, FunctionList, SourceList};
use crate::node::{Node, SourceRef};
use crate::parser::parse_line;
use crate::process::{code_nodes, Builder};
use crate::settings::{EnvType, FILE_SOURCE, ROOT_SOURCE, STRING_SOURCE};
use crate::value::Value;
use dpl_core::{DplError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

// ========== Options ==========

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Prefix of source names: `{name}_ROOT`, `{name}_FILE1`, ...
    pub name: String,
    /// Directory of relative file and `$source` paths
    pub base_dir: Option<PathBuf>,
    /// Parse documentation instead of data
    pub docs: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            name: "dpl".to_string(),
            base_dir: None,
            docs: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_docs(mut self, docs: bool) -> Self {
        self.docs = docs;
        self
    }
}

/// Result of `Dpl::run`
#[derive(Debug, Clone)]
pub enum Parsed {
    Data(Environment),
    Docs(Documentation),
}

/// Drop blank lines around the code
fn strip_blank_lines(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let start = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.trim().is_empty()).map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}

// ========== Driver ==========

pub struct Dpl {
    options: ParseOptions,
    nodes: Vec<Node>,
    sources: SourceList,
    functions: FunctionList,
    strings: usize,
    files: usize,
}

impl Default for Dpl {
    fn default() -> Self {
        Self::new()
    }
}

impl Dpl {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    pub fn with_options(options: ParseOptions) -> Self {
        let mut root = EnvSource::new(format!("{}_{}", options.name, ROOT_SOURCE));
        root.path = options.base_dir.clone();
        let mut sources = SourceList::new();
        sources.insert(root);
        Dpl {
            options,
            nodes: Vec::new(),
            sources,
            functions: FunctionList::new(),
            strings: 0,
            files: 0,
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    fn root(&self) -> String {
        format!("{}_{}", self.options.name, ROOT_SOURCE)
    }

    fn root_source(&self) -> Option<&EnvSource> {
        self.sources.get(&self.root())
    }

    /// Add DPL code
    pub fn add_string(&mut self, code: &str) -> Result<()> {
        self.strings += 1;
        let name = format!("{}_{}{}", self.options.name, STRING_SOURCE, self.strings);
        let code = strip_blank_lines(code);
        self.nodes.extend(code_nodes(&code, &name)?);
        let mut source = EnvSource::new(&name).with_code(code).with_parent(self.root());
        source.path = self.root_source().and_then(|root| root.path.clone());
        self.sources.add(source)?;
        debug!(source = %name, "string added");
        Ok(())
    }

    /// Add DPL code from a file; relative paths start at the base directory
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = match self.root_source() {
            Some(root) => root.resolve(path.as_ref()),
            None => path.as_ref().to_path_buf(),
        };
        let code = fs::read_to_string(&path).map_err(|err| {
            DplError::invalid_input("File cannot be read")
                .with_arg(path.display())
                .with_note(err.to_string())
        })?;
        self.files += 1;
        let name = format!("{}_{}{}", self.options.name, FILE_SOURCE, self.files);
        let code = strip_blank_lines(&code);
        self.nodes.extend(code_nodes(&code, &name)?);
        let path = fs::canonicalize(&path).unwrap_or(path);
        debug!(source = %name, path = %path.display(), "file added");
        self.sources
            .add(EnvSource::new(&name).with_path(path).with_code(code).with_parent(self.root()))
    }

    /// Same as a `$source name = path` line
    pub fn add_source(&mut self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        let code = format!("$source {} = '{}'", name, path.as_ref().display());
        self.nodes.push(parse_line(&code, SourceRef::new(self.root(), 0))?);
        Ok(())
    }

    /// Same as a `$unit name = value units` line
    pub fn add_unit(&mut self, name: &str, value: f64, units: Option<&str>) -> Result<()> {
        let code = match units {
            Some(units) => format!("$unit {} = {:?} {}", name, value, units),
            None => format!("$unit {} = {:?}", name, value),
        };
        self.nodes.push(parse_line(&code, SourceRef::new(self.root(), 0))?);
        Ok(())
    }

    /// Register a native function for `(name)` values
    pub fn add_function<F>(&mut self, name: &str, function: F) -> Result<()>
    where
        F: Fn(&FunctionData) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.add(name, Arc::new(function))
    }

    fn build(&self, envtype: EnvType) -> Result<Environment> {
        let mut env = Environment::new(envtype);
        env.sources = self.sources.clone();
        env.functions = self.functions.clone();
        debug!(nodes = self.nodes.len(), envtype = ?envtype, "parsing");
        Builder::new(env, self.nodes.clone()).build()
    }

    /// Evaluate all code into a data environment
    pub fn parse(&self) -> Result<Environment> {
        self.build(EnvType::Data)
    }

    /// Document all code; every case arm is kept
    pub fn parse_docs(&self) -> Result<Documentation> {
        Documentation::new(self.build(EnvType::Docs)?)
    }

    /// Parse in the mode selected by the options
    pub fn run(&self) -> Result<Parsed> {
        if self.options.docs {
            self.parse_docs().map(Parsed::Docs)
        } else {
            self.parse().map(Parsed::Data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::ParType;
    use crate::settings::Format;
    use crate::value::Payload;
    use dpl_core::{ErrorKind, NdArray};

    fn parse(code: &str) -> Result<Environment> {
        let mut dpl = Dpl::new();
        dpl.add_string(code)?;
        dpl.parse()
    }

    fn value(env: &Environment, name: &str) -> Value {
        env.nodes.get(name).and_then(|n| n.value.clone()).unwrap()
    }

    fn float(env: &Environment, name: &str) -> f64 {
        value(env, name).payload.to_f64().unwrap().data()[0]
    }

    fn text(env: &Environment, name: &str) -> String {
        match value(env, name).payload {
            Payload::Str(s) => s.as_scalar().cloned().unwrap(),
            other => panic!("not a string: {}", other),
        }
    }

    fn document(code: &str) -> Documentation {
        let mut dpl = Dpl::with_options(ParseOptions::new().with_docs(true));
        dpl.add_string(code).unwrap();
        match dpl.run().unwrap() {
            Parsed::Docs(docs) => docs,
            Parsed::Data(_) => panic!("expected documentation"),
        }
    }

    // ========== Values ==========

    #[test]
    fn test_strip_blank_lines() {
        assert_eq!(strip_blank_lines("\n  \na int = 1\n\nb int = 2\n   \n"), "a int = 1\n\nb int = 2");
        assert_eq!(strip_blank_lines("\n\n"), "");
    }

    #[test]
    fn test_inline_matrix() {
        let env = parse(
            r#"
velocity int[1:,3] = """
[[42,34,35],
 [23,34,64],
 [35,23,23]]
""" km/s
"#,
        )
        .unwrap();
        let velocity = value(&env, "velocity");
        assert_eq!(velocity.unit.as_deref(), Some("km/s"));
        assert_eq!(
            velocity.payload,
            Payload::Int(NdArray::new(vec![3, 3], vec![42, 34, 35, 23, 34, 64, 35, 23, 23]).unwrap())
        );
    }

    #[test]
    fn test_inline_text() {
        let env = parse("text str = \"\"\"\n   triple quotes # ' \"\nblock of text\n\"\"\"").unwrap();
        assert_eq!(text(&env, "text"), "   triple quotes # ' \"\nblock of text");
    }

    #[test]
    fn test_expression_units() {
        let env = parse(
            r#"
a float = 14.24 mm
b int = 220 cm
c float = ("{?a} + {?b} + 10 m") cm
small bool = ("{?c} < 20 m")
"#,
        )
        .unwrap();
        assert!((float(&env, "c") - 1221.424).abs() < 1e-9);
        assert_eq!(value(&env, "c").unit.as_deref(), Some("cm"));
        assert_eq!(value(&env, "small"), Value::bool(true));
    }

    #[test]
    fn test_options() {
        let code = r#"
size float cm
  !options [12,13,14,15,16] cm
  !options [22,23,24,25] m
size = 23 m
"#;
        let env = parse(code).unwrap();
        assert!((float(&env, "size") - 2300.0).abs() < 1e-9);
        assert_eq!(env.nodes.get("size").unwrap().options.len(), 9);

        let err = parse(&code.replace("size = 23 m", "size = 17 cm")).unwrap_err();
        assert!(err.is(ErrorKind::OptionMismatch));

        let env = parse("animal str = 'cat'\n  = dog\n  = cat").unwrap();
        assert_eq!(text(&env, "animal"), "cat");
    }

    #[test]
    fn test_modification_errors() {
        let err = parse("a int = 3\n  !constant\na = 4").unwrap_err();
        assert!(err.is(ErrorKind::ConstantViolation));
        let err = parse("a int = 3\n  !constant\na = 3").unwrap_err();
        assert!(err.is(ErrorKind::ConstantViolation));
        let err = parse("a int = 3\na float = 4").unwrap_err();
        assert!(err.is(ErrorKind::TypeChange));
        let err = parse("a int = 3\nb = 4").unwrap_err();
        assert!(err.is(ErrorKind::Undefined));
        assert_eq!(err.context.as_ref().and_then(|c| c.line), Some(2));
        let env = parse("a int16 = 3\na int64 = 4").unwrap();
        assert_eq!(value(&env, "a"), Value::int(4));
    }

    #[test]
    fn test_format_and_condition() {
        let err = parse("name str = 'abc1'\n  !format \"[0-9]+\"").unwrap_err();
        assert!(err.is(ErrorKind::FormatMismatch));
        assert!(parse("name str = '12ab'\n  !format \"[0-9]+\"").is_ok());
        let err = parse("a int = 3\n  !format \"[0-9]+\"").unwrap_err();
        assert!(err.is(ErrorKind::InvalidConstraint));

        let err = parse("a int = 3\n  !condition (\"{?} > 5\")").unwrap_err();
        assert!(err.is(ErrorKind::ConditionFailed));
        let env = parse("a int = 3\n  !condition (\"{?} > 2\")\n  !tags [\"input\"]\n  !desc \"Count\"").unwrap();
        let node = env.nodes.get("a").unwrap();
        assert_eq!(node.tags, vec!["input"]);
        assert_eq!(node.description.as_deref(), Some("Count"));
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse("a int = 1\n\nx float = 3 - cm").unwrap_err();
        assert!(err.is(ErrorKind::ParseError));
        let context = err.context.unwrap();
        assert_eq!(context.source.as_deref(), Some("dpl_STRING1"));
        assert_eq!(context.line, Some(3));
    }

    // ========== Branching ==========

    #[test]
    fn test_nested_condition() {
        let env = parse(
            r#"
@case false
  flower str = 'rose'
@else
  flower str = 'dandelion'
  @case false
    color str = 'red'
  @case false
    color str = 'blue'
  @else
    @case true
      leaves int = 234
    color str = 'yellow'
tree str = 'maple'
"#,
        )
        .unwrap();
        assert_eq!(env.nodes.keys(), vec!["flower", "leaves", "color", "tree"]);
        assert_eq!(text(&env, "flower"), "dandelion");
        assert_eq!(value(&env, "leaves"), Value::int(234));
        assert_eq!(text(&env, "color"), "yellow");
        assert_eq!(text(&env, "tree"), "maple");
    }

    #[test]
    fn test_modifications_in_arms() {
        let env = parse(
            r#"
star str = 'Sun'

@case false
  star = 'Sirius'
  nebula str = 'Orion'
@else
  star = 'Wega'
  nebula str = 'Crab'

nebula = 'Eagle'
"#,
        )
        .unwrap();
        assert_eq!(text(&env, "star"), "Wega");
        assert_eq!(text(&env, "nebula"), "Eagle");
    }

    #[test]
    fn test_indent_ends_case() {
        let env = parse(
            r#"
climate
  @case true                  # true condition
    warming bool = true
      increase float = 2 Cel

  temperature float = 10.2 Cel   # case ends at lower indent
"#,
        )
        .unwrap();
        assert_eq!(
            env.nodes.keys(),
            vec!["climate.warming", "climate.warming.increase", "climate.temperature"]
        );
    }

    #[test]
    fn test_first_second_third_true() {
        let env = parse("plant\n  @case true\n    leaves int = 1302\n  @case false\n    leaves int = 12304\n  @end").unwrap();
        assert_eq!(value(&env, "plant.leaves"), Value::int(1302));

        let env = parse(
            r#"
plant.@case false           # compact names
    flower str = 'green'
plant.@case true
    flower str = 'yellow'
plant.@else
    flower str = 'red'
"#,
        )
        .unwrap();
        assert_eq!(text(&env, "plant.flower"), "yellow");

        let env = parse(
            "animal\n  @case false\n    cat str = 'lion'\n  @case false\n    cat str = 'tiger'\n  @else\n    cat str = 'gepard'",
        )
        .unwrap();
        assert_eq!(text(&env, "animal.cat"), "gepard");
    }

    #[test]
    fn test_case_expressions() {
        let env = parse(
            r#"
traffic

  # definitions
  limit float = 75 km/s
  urban bool = true

  @case ("{?traffic.limit} <= 50 km/s || {?traffic.urban}")

    road str = 'town'

  @case ("( {?traffic.limit} <= 100 km/s && {?traffic.limit} > 50 km/s )  && ~{?traffic.urban}")

    road str = 'country'

  @else

    road str = 'motorway'

  @end

  cars int = 12  # outside of case
"#,
        )
        .unwrap();
        assert_eq!(
            env.nodes.keys(),
            vec!["traffic.limit", "traffic.urban", "traffic.road", "traffic.cars"]
        );
        assert_eq!(text(&env, "traffic.road"), "town");
    }

    #[test]
    fn test_only_false_case_and_properties() {
        let env = parse("sim\n  gravity bool = false\n\n  @case (\"{?sim.gravity}\")\n    stars int = 30\n  @end").unwrap();
        assert_eq!(env.nodes.keys(), vec!["sim.gravity"]);

        let env = parse(
            r#"
gravity bool = false

@case ("{?gravity}")
  stars int = 30
    !constant
@end

radiation bool = true
  !constant
"#,
        )
        .unwrap();
        assert_eq!(env.nodes.len(), 2);
        assert!(!env.nodes.get("gravity").unwrap().constant);
        assert!(env.nodes.get("radiation").unwrap().constant);
    }

    #[test]
    fn test_invalid_case_structure() {
        assert!(parse("@end").unwrap_err().is(ErrorKind::ParseError));
        assert!(parse("@else\n  car str = 'BMW'").unwrap_err().is(ErrorKind::ParseError));
        assert!(parse("@case true\n  @end").unwrap_err().is(ErrorKind::ParseError));
    }

    #[test]
    fn test_incomplete_branch_needs_default() {
        let code = "@case true\n  a int = 1\n@else\n  b int = 2\n@end";
        let err = parse(code).unwrap_err();
        assert!(err.is(ErrorKind::Undefined));

        let env = parse(&format!("a int = 0\nb int = 0\n{}", code)).unwrap();
        assert_eq!(value(&env, "a"), Value::int(1));
        assert_eq!(value(&env, "b"), Value::int(0));
    }

    // ========== Tables and references ==========

    #[test]
    fn test_inline_table() {
        let env = parse(
            r#"
outputs table = """
time float s
snapshot int
intensity float W/m2

0.234 0 2.34
1.355 1 9.4
2.535 2 3.4
  """
"#,
        )
        .unwrap();
        assert_eq!(env.nodes.keys(), vec!["outputs.time", "outputs.snapshot", "outputs.intensity"]);
        let time = value(&env, "outputs.time");
        assert_eq!(time.unit.as_deref(), Some("s"));
        assert_eq!(time.payload, Payload::Float(NdArray::from_vec(vec![0.234, 1.355, 2.535])));
        assert_eq!(value(&env, "outputs.snapshot").payload, Payload::Int(NdArray::from_vec(vec![0, 1, 2])));

        let env = parse(
            r#"
people table = """
name str
numbers int[3]

"John Smith" [2,3,4]
"Jennyfer Milton" [5,6,7]
"""
"#,
        )
        .unwrap();
        assert_eq!(
            value(&env, "people.name").payload,
            Payload::Str(NdArray::from_vec(vec!["John Smith".to_string(), "Jennyfer Milton".to_string()]))
        );
        assert_eq!(value(&env, "people.numbers").payload.shape(), &[2, 3]);

        let err = parse("t table = \"\"\"\na int\n\n1 2\n\"\"\"").unwrap_err();
        assert!(err.is(ErrorKind::ParseError));
    }

    #[test]
    fn test_imports_and_injections() {
        let env = parse(
            r#"
box
  width float = 2 cm
  height float = 3 cm
cube {?box.*}
w float = {?box.width} mm
first float = {?cube.height}
letters str = "abcdef"
part str = {?letters}[1:3]
"#,
        )
        .unwrap();
        assert!(env.nodes.contains("cube.width"));
        assert!(!env.nodes.get("cube.height").unwrap().primary);
        assert!((float(&env, "w") - 20.0).abs() < 1e-9);
        assert_eq!(value(&env, "first").unit.as_deref(), Some("cm"));
        assert_eq!(text(&env, "part"), "bc");
        let injection = env.nodes.get("w").unwrap().injection.clone().unwrap();
        assert_eq!(injection.reference, "?box.width");

        let err = parse("a float = {?missing}").unwrap_err();
        assert!(err.is(ErrorKind::UnresolvedReference));
    }

    #[test]
    fn test_custom_units() {
        let mut dpl = Dpl::new();
        dpl.add_unit("step", 2.0, Some("cm")).unwrap();
        dpl.add_string("$unit length = 5 [step]\nx float = 3 [length]\ny float = (\"{?x}\") cm").unwrap();
        let env = dpl.parse().unwrap();
        assert_eq!(env.units.len(), 2);
        assert!((float(&env, "y") - 30.0).abs() < 1e-9);
        let err = parse("$unit step = 2 cm\n$unit step = 3 cm").unwrap_err();
        assert!(err.is(ErrorKind::SymbolExists));
    }

    #[test]
    fn test_chained_custom_units() {
        let env = parse("$unit a = 2 cm\n$unit b = 3 [a]\nx float = 1 [b]\ny float = (\"{?x}\") cm").unwrap();
        assert!((float(&env, "y") - 6.0).abs() < 1e-9);
        let env = parse("$unit a = 2 cm\n$unit b = 3 [a]\n$unit c = 0.5 [b]\nz float = 4 [c]\nw float = (\"{?z}\") mm").unwrap();
        assert!((float(&env, "w") - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_units_in_output() {
        let env = parse("$unit a = 2 cm\nx float = 1 [a]\nn int = 4").unwrap();
        for format in [Format::Value, Format::Tuple, Format::Type, Format::Quantity, Format::Node] {
            let json = env.to_json(format, None, None).unwrap();
            assert!(json.get("x").is_some());
        }
        let data = env.data(Format::Quantity, Some("x"), None).unwrap();
        assert_eq!(data.len(), 1);
        assert!(env.views().unwrap().iter().any(|view| view.name == "x"));
    }

    #[test]
    fn test_unit_exponent_overflow() {
        let err = parse("a float = 3 m9223372036854775807*m9223372036854775807").unwrap_err();
        assert!(err.is(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.dpl"), "size float = 3 m\nname str = 'box'\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "plain notes").unwrap();
        let mut dpl = Dpl::with_options(ParseOptions::new().with_base_dir(dir.path()));
        dpl.add_source("notes", "notes.txt").unwrap();
        dpl.add_string(
            r#"
$source settings = settings.dpl
{settings?*}
length float = {settings?size} cm
text str = {notes}
"#,
        )
        .unwrap();
        let env = dpl.parse().unwrap();
        assert_eq!(env.nodes.keys(), vec!["size", "name", "length", "text"]);
        assert!((float(&env, "length") - 300.0).abs() < 1e-9);
        assert_eq!(text(&env, "text"), "plain notes");
        let settings = env.sources.get("settings").unwrap();
        assert_eq!(settings.parent.as_deref(), Some("dpl_STRING1"));
        assert_eq!(settings.nodes.as_ref().map(|n| n.len()), Some(2));

        let mut dpl = Dpl::new();
        dpl.add_string("$source missing = /nonexistent/missing.dpl").unwrap();
        assert!(dpl.parse().unwrap_err().is(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_add_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.dpl"), "\n\ncount int = 4\n").unwrap();
        let mut dpl = Dpl::with_options(ParseOptions::new().with_name("sim").with_base_dir(dir.path()));
        dpl.add_file("main.dpl").unwrap();
        let env = dpl.parse().unwrap();
        let node = env.nodes.get("count").unwrap();
        assert_eq!(node.source, SourceRef::new("sim_FILE1", 1));
        assert!(env.sources.get("sim_ROOT").is_some());
        assert!(dpl.add_file("other.dpl").unwrap_err().is(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_templates_and_functions() {
        let mut dpl = Dpl::new();
        dpl.add_function("double", |data: &FunctionData| {
            let width = data["width"].quantity()?;
            Value::from_quantity(&width.scale(2.0), None)
        })
        .unwrap();
        dpl.add_string(
            r#"
width float = 2 m
name str = "Will"
double float = (double) cm
greeting str = ("Hello {{?name}}, width {{?width}:.1f}!")
"#,
        )
        .unwrap();
        let env = dpl.parse().unwrap();
        assert!((float(&env, "double") - 400.0).abs() < 1e-9);
        assert_eq!(text(&env, "greeting"), "Hello Will, width 2.0!");
        assert!(dpl.add_function("double", |_: &FunctionData| Ok(Value::int(1))).is_err());
    }

    #[test]
    fn test_data_output() {
        let env = parse("box\n  width float = 2 cm\n  count int = 3\n    !tags [\"io\"]").unwrap();
        let json = env.to_json(Format::Tuple, None, None).unwrap();
        assert_eq!(json, serde_json::json!({"box.width": [2.0, "cm"], "box.count": 3}));
        let tags = vec!["io".to_string()];
        let json = env.to_json(Format::Value, None, Some(&tags)).unwrap();
        assert_eq!(json, serde_json::json!({"box.count": 3}));
    }

    // ========== Documentation ==========

    #[test]
    fn test_docs_definition_before_case() {
        let docs = document(
            r#"
a int = 3        # definition
@case false
  a float = 4.0  # modification
@case true
  a str = "4.0"  # modification
@else
  a bool = true  # modification
a = 4            # modification
"#,
        );
        assert_eq!(docs.env.nodes.keys(), vec!["a", "@0.a", "@1.a", "@2.a", "a"]);
        let parameter = docs.parameter("a").unwrap();
        let types: Vec<ParType> = parameter.nodes.iter().map(|n| n.ptype).collect();
        assert_eq!(types, vec![ParType::Def, ParType::Mod, ParType::Mod, ParType::Mod, ParType::Mod]);
        assert_eq!(parameter.counts[1], 1);
        assert_eq!(parameter.counts[4], 4);
        assert_eq!(parameter.nodes[4].value.as_deref(), Some("4"));
        assert_eq!(docs.branches.len(), 1);
    }

    #[test]
    fn test_docs_branch_definition() {
        let docs = document(
            r#"
@case false
  a float = 4.0
@case true
  a str = "4.0"
@else
  a bool = true
a = 4
"#,
        );
        let parameter = docs.parameter("a").unwrap();
        let types: Vec<ParType> = parameter.nodes.iter().map(|n| n.ptype).collect();
        assert_eq!(types, vec![ParType::Def, ParType::Def, ParType::Def, ParType::Mod]);
        assert_eq!(parameter.nodes[0].value.as_deref(), Some("4.000"));
        assert_eq!(parameter.nodes[2].value.as_deref(), Some("true"));
    }

    #[test]
    fn test_docs_incomplete_definition() {
        let docs = document("@case true\n  a float = 4.0\na float = 3");
        let types: Vec<ParType> = docs.parameter("a").unwrap().nodes.iter().map(|n| n.ptype).collect();
        assert_eq!(types, vec![ParType::Def, ParType::Dfm]);

        let docs = document("@case true\n  b float = 4.0\n@else\n  a float = 5.0\na float = 3");
        assert_eq!(docs.env.nodes.keys(), vec!["@0.b", "@1.a", "a"]);
        let types: Vec<ParType> = docs.parameter("a").unwrap().nodes.iter().map(|n| n.ptype).collect();
        assert_eq!(types, vec![ParType::Def, ParType::Dfm]);
    }

    #[test]
    fn test_docs_keep_references() {
        let docs = document(
            r#"
box
  width float = 2 cm
    !description "Box width"
{?box.*}
size float cm
w float = {?box.width} mm
c float = ("{?w} * 2") mm
"#,
        );
        assert_eq!(docs.imports.len(), 1);
        assert_eq!(docs.imports[0].nodes.len(), 1);
        assert_eq!(docs.injections.len(), 1);
        assert_eq!(docs.injections[0].value.as_deref(), Some("2.0"));
        let size = docs.parameter("size").unwrap();
        assert_eq!(size.nodes[0].ptype, ParType::Dec);
        let c = docs.parameter("c").unwrap();
        assert_eq!(c.nodes[0].value.as_deref(), Some("(\"{?w} * 2\")"));
        let width = docs.parameter("box.width").unwrap();
        assert_eq!(width.nodes[0].description.as_deref(), Some("Box width"));
        assert_eq!(width.counts[crate::docs::IMPORTS], 0);
        assert!(docs.to_json().unwrap()["parameters"].is_array());
    }
}

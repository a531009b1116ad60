//! Text templates
//!
//! A reference is written in double braces: `{{?name}}`, `{{source?name}[slice]}`
//! or with a format code `{{?name}:.3f}` (`s`, `d`, `f`, `e`, `b`, optional
//! zero padding, width and precision). Other braces are kept as written.

use crate::environment::Environment;
use crate::node::slice_value;
use crate::value::{format_float, Payload, Value};
use dpl_core::{format_sci, DplError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{([^{}]*)\}(\[([0-9:,-]+)\])?(?::(0)?([0-9]*)(?:\.([0-9]+))?([sdfeb]))?\}").unwrap()
    })
}

/// Format code of a reference
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spec {
    zero: bool,
    width: usize,
    precision: Option<usize>,
    kind: char,
}

impl Spec {
    fn pad(&self, text: String) -> String {
        if text.len() >= self.width {
            return text;
        }
        if !self.zero {
            return format!("{:>width$}", text, width = self.width);
        }
        match text.strip_prefix('-') {
            Some(digits) => format!("-{:0>width$}", digits, width = self.width - 1),
            None => format!("{:0>width$}", text, width = self.width),
        }
    }

    /// Python-like rendering of a scalar
    fn apply(&self, payload: &Payload) -> Result<String> {
        let mismatch = || {
            DplError::invalid_input("Format code does not fit the value")
                .with_arg(self.kind)
                .with_arg(payload)
        };
        let text = match (self.kind, payload) {
            ('s', p) => return Ok(format!("{:<width$}", render(p), width = self.width)),
            ('d', Payload::Int(i)) => i.as_scalar().ok_or_else(mismatch)?.to_string(),
            ('b', Payload::Int(i)) => {
                let i = *i.as_scalar().ok_or_else(mismatch)?;
                if i < 0 {
                    format!("-{:b}", -i)
                } else {
                    format!("{:b}", i)
                }
            }
            ('f' | 'e', p) if p.is_numeric() => {
                let values = p.to_f64()?;
                let v = *values.as_scalar().ok_or_else(mismatch)?;
                let precision = self.precision.unwrap_or(6);
                if self.kind == 'f' {
                    format!("{:.*}", precision, v)
                } else {
                    format_sci(v, precision)
                }
            }
            _ => return Err(mismatch()),
        };
        Ok(self.pad(text))
    }
}

/// Text of a payload as it appears in rendered text
fn render(payload: &Payload) -> String {
    match payload {
        Payload::Bool(b) if b.is_scalar() => match b.as_scalar() {
            Some(true) => "True".into(),
            _ => "False".into(),
        },
        Payload::Float(f) if f.is_scalar() => f.as_scalar().map_or_else(String::new, |v| format_float(*v)),
        Payload::Str(s) if s.is_scalar() => s.as_scalar().cloned().unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Fills references in text templates
pub struct TemplateSolver<'a> {
    env: &'a Environment,
    base: Option<PathBuf>,
}

impl<'a> TemplateSolver<'a> {
    pub fn new(env: &'a Environment) -> Self {
        TemplateSolver { env, base: None }
    }

    /// Resolve relative template paths next to the file of a source
    pub fn with_source(mut self, source: &str) -> Self {
        self.base = self
            .env
            .sources
            .get(source)
            .map(|s| s.resolve(Path::new("")));
        self
    }

    /// Builder: directory of relative template paths
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn solve(&self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in reference_regex().captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            let (_, value) = self.env.request_value(caps[1].trim())?;
            let value: Value = match caps.get(3) {
                Some(slice) => slice_value(&value, slice.as_str())?,
                None => value,
            };
            match caps.get(7).and_then(|k| k.as_str().chars().next()) {
                Some(kind) => {
                    let spec = Spec {
                        zero: caps.get(4).is_some(),
                        width: caps.get(5).and_then(|w| w.as_str().parse().ok()).unwrap_or(0),
                        precision: caps.get(6).and_then(|p| p.as_str().parse().ok()),
                        kind,
                    };
                    out.push_str(&spec.apply(&value.payload)?);
                }
                None => out.push_str(&render(&value.payload)),
            }
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Fill a template file; the result is also written to `file_out` if given
    pub fn template(&self, file_in: impl AsRef<Path>, file_out: Option<&Path>) -> Result<String> {
        let file_in = self.resolve(file_in.as_ref());
        let template = fs::read_to_string(&file_in).map_err(|err| {
            DplError::invalid_input("Template cannot be read")
                .with_arg(file_in.display())
                .with_note(err.to_string())
        })?;
        let text = self.solve(&template)?;
        if let Some(file_out) = file_out {
            let file_out = self.resolve(file_out);
            fs::write(&file_out, &text).map_err(|err| {
                DplError::invalid_input("Template output cannot be written")
                    .with_arg(file_out.display())
                    .with_note(err.to_string())
            })?;
            debug!(path = %file_out.display(), "template written");
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind, SourceRef};
    use crate::settings::EnvType;
    use crate::value::DataType;
    use dpl_core::{ErrorKind, NdArray};

    fn env() -> Environment {
        let mut env = Environment::new(EnvType::Data);
        for (name, value) in [
            ("id", Value::int(345)),
            ("name", Value::string("Will Smith")),
            ("body.weight", Value::float(62.3, Some("kg"))),
            ("body.height", Value::float(177.0, Some("cm"))),
            ("married", Value::bool(true)),
            (
                "widths",
                Value::new(
                    Payload::Float(NdArray::new(vec![2, 3], vec![23.4, 235.4, 34.0, 1e10, 2e23, 5e20]).unwrap()),
                    None,
                ),
            ),
        ] {
            let mut node = Node::new(name, SourceRef::new("test", 1));
            node.name = name.into();
            node.kind = NodeKind::Value(DataType::FLOAT);
            node.value = Some(value);
            env.nodes.push(node);
        }
        env
    }

    #[test]
    fn test_formatting() {
        let env = env();
        let solver = TemplateSolver::new(&env);
        let text = solver
            .solve("ID: {{?id}:05d}\nWeight: {{?body.weight}:.3e}\nHeight: {{?body.height}:.2f}\nMarried: {{?married}}")
            .unwrap();
        assert_eq!(text, "ID: 00345\nWeight: 6.230e+01\nHeight: 177.00\nMarried: True");
        assert_eq!(solver.solve("[{{?id}:5d}]").unwrap(), "[  345]");
        assert_eq!(solver.solve("{{?id}:b}").unwrap(), "101011001");
        assert_eq!(solver.solve("[{{?married}:6s}]").unwrap(), "[True  ]");
    }

    #[test]
    fn test_slices() {
        let env = env();
        let solver = TemplateSolver::new(&env);
        assert_eq!(solver.solve("Surname: {{?name}[5:]}").unwrap(), "Surname: Smith");
        assert_eq!(solver.solve("{{?widths}[1,1]:.2e}").unwrap(), "2.00e+23");
        assert_eq!(solver.solve("{{?widths}[0,0]}").unwrap(), "23.4");
    }

    #[test]
    fn test_errors_and_plain_braces() {
        let env = env();
        let solver = TemplateSolver::new(&env);
        assert_eq!(solver.solve("{\"json\": {1}} {?id}").unwrap(), "{\"json\": {1}} {?id}");
        assert!(solver.solve("{{?missing}}").unwrap_err().is(ErrorKind::UnresolvedReference));
        assert!(solver.solve("{{?body.height}:d}").unwrap_err().is(ErrorKind::InvalidInput));
        assert!(solver.solve("{{?widths}:.2f}").unwrap_err().is(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_template_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in.txt"), "name: {{?name}}\n").unwrap();
        let env = env();
        let solver = TemplateSolver::new(&env).with_base(dir.path());
        let text = solver.template("in.txt", Some(Path::new("out.txt"))).unwrap();
        assert_eq!(text, "name: Will Smith\n");
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), text);
    }
}

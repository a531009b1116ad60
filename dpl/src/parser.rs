//! Line parser
//!
//! Each logical line of DPL code is matched against a sequence of anchored
//! patterns. Every matching pattern consumes the beginning of the line and
//! fills part of the node; a line is parsed once nothing is left over.

use crate::node::{parse_bounds, CaseKind, Node, NodeKind, SourceRef};
use crate::settings::sign;
use crate::value::{DataType, RawValue};
use dpl_core::{DplError, Result};
use regex::Regex;
use std::sync::OnceLock;

// ============ Escapes ============

const ESCAPES: [(&str, &str, &str); 3] = [("\\'", "$@00", "'"), ("\\\"", "$@01", "\""), ("\n", "$@02", "\n")];

fn encode(code: &str) -> String {
    ESCAPES.iter().fold(code.to_string(), |acc, (from, to, _)| acc.replace(from, to))
}

fn decode(text: &str) -> String {
    ESCAPES.iter().fold(text.to_string(), |acc, (_, from, to)| acc.replace(from, to))
}

/// Drop the line breaks next to the quotes of a `"""` block; the closing quotes may be indented
fn strip_block(text: &str) -> String {
    let text = text.strip_prefix('\n').unwrap_or(text);
    match text.rfind('\n') {
        Some(i) if text[i + 1..].trim().is_empty() => text[..i].to_string(),
        _ => text.to_string(),
    }
}

// ============ Compiled regex patterns ============

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($re).unwrap())
        }
    };
}

pattern!(empty_re, r"^\s*(#.*)?$");
pattern!(indent_re, r"^( *)");
pattern!(case_re, r"^(([a-zA-Z0-9_.-]*@case)\s+)");
pattern!(branch_end_re, r"^([a-zA-Z0-9_.-]*@(else|end))");
pattern!(unit_re, r"^([a-zA-Z0-9_.-]*\$unit\s+)");
pattern!(source_re, r"^([a-zA-Z0-9_.-]*\$source\s+)");
pattern!(options_re, r"^(!options\s+)");
pattern!(option_re, r"^(=\s*)");
pattern!(constant_re, r"^(!constant)");
pattern!(format_re, r"^(!format\s*)");
pattern!(tags_re, r"^(!tags\s*)");
pattern!(description_re, r"^(!(description|desc)\s*)");
pattern!(condition_re, r"^(!condition\s*)");
pattern!(name_re, r"^([a-zA-Z0-9_.-]+)");
pattern!(unit_name_re, r"^([a-zA-Z0-9_]+)");
pattern!(group_re, r"^\s*(#.*)?$");
pattern!(type_re, r"^(\s+([a-z0-9]+))");
pattern!(dimension_re, r"^(\[([0-9:,]+)\])");
pattern!(slice_re, r"^(\[([0-9:,-]+)\])");
pattern!(equal_re, r"^(\s*=\s*)");
pattern!(reference_re, r"^(\s*\{([^}]*)\})");
pattern!(function_re, r"^(\(([a-zA-Z0-9_-]*)\))");
pattern!(expression_re, r#"^(\((?:"""(.*?)"""|"(.*?)"|'(.*?)')\))"#);
pattern!(literal_re, r#"^(?:"""(.*?)"""|"(.*?)"|'(.*?)'|([^#\s]+))"#);
pattern!(units_operator_re, r"^\s+[/*+-]+");
pattern!(units_re, r"^(\s+([^\s#=]+))");
pattern!(comment_re, r"^\s*#.*$");

// ============ Parser ============

/// Parse one logical line of code into a node
pub fn parse_line(code: &str, source: SourceRef) -> Result<Node> {
    let mut parser = LineParser { rest: encode(code), node: Node::new(code, source) };
    parser.run().map_err(|err| parser.node.located(err))?;
    Ok(parser.node)
}

/// Merge `"""` blocks spanning several lines; returns `(first line number, code)`
pub fn logical_lines(code: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut block: Option<(usize, String)> = None;
    for (i, line) in code.lines().enumerate() {
        let lineno = i + 1;
        match block.take() {
            Some((start, mut text)) => {
                text.push(sign::NEWLINE);
                text.push_str(line);
                if line.contains("\"\"\"") {
                    lines.push((start, text));
                } else {
                    block = Some((start, text));
                }
            }
            None if line.matches("\"\"\"").count() % 2 == 1 => block = Some((lineno, line.to_string())),
            None => lines.push((lineno, line.to_string())),
        }
    }
    if let Some(open) = block {
        lines.push(open);
    }
    lines
}

struct LineParser {
    rest: String,
    node: Node,
}

impl LineParser {
    /// Consume a match at the start of the rest; returns its capture groups
    fn eat(&mut self, re: &Regex) -> Option<Vec<Option<String>>> {
        let caps = re.captures(&self.rest)?;
        let whole = caps.get(0)?.end();
        let groups = caps.iter().map(|m| m.map(|m| m.as_str().to_string())).collect();
        self.rest = self.rest[whole..].to_string();
        Some(groups)
    }

    fn run(&mut self) -> Result<()> {
        if empty_re().is_match(&self.rest) {
            self.node.kind = NodeKind::Empty;
            return Ok(());
        }
        self.part_indent();
        let directive = self.kwd_import()?
            || self.kwd_unit()?
            || self.kwd_source()?
            || self.kwd_case()?
            || self.kwd_options()?
            || self.kwd_constant()
            || self.kwd_property(format_re(), NodeKind::Format)?
            || self.kwd_property(tags_re(), NodeKind::Tags)?
            || self.kwd_property(description_re(), NodeKind::Description)?
            || self.kwd_property(condition_re(), NodeKind::Condition)?;
        if !directive {
            self.part_name()?;
            if !(self.kwd_group() || self.kwd_import()? || self.kwd_mod()?) {
                self.part_type()?;
                self.part_dimension()?;
                if self.part_equal() {
                    self.part_value()?;
                } else {
                    self.node.declared = true;
                }
                self.part_units()?;
            }
        }
        self.part_comment();
        if !self.rest.trim().is_empty() {
            return Err(DplError::parse_error("Code cannot be parsed").with_arg(decode(&self.rest)));
        }
        Ok(())
    }

    // ========== Directives ==========

    fn kwd_import(&mut self) -> Result<bool> {
        if !reference_re().is_match(&self.rest) {
            return Ok(false);
        }
        self.part_reference()?;
        self.node.kind = NodeKind::Import;
        Ok(true)
    }

    /// `$unit name = value units` or `$unit {source?*}`
    fn kwd_unit(&mut self) -> Result<bool> {
        let Some(groups) = self.eat(unit_re()) else {
            return Ok(false);
        };
        self.node.kind = NodeKind::Unit;
        self.node.name = groups[1].clone().unwrap_or_default().trim().to_string();
        if self.part_reference()? {
            return Ok(true);
        }
        self.part_definition_name()?;
        self.part_value()?;
        self.part_units()?;
        Ok(true)
    }

    /// `$source name = path` or `$source {source?*}`
    fn kwd_source(&mut self) -> Result<bool> {
        let Some(groups) = self.eat(source_re()) else {
            return Ok(false);
        };
        self.node.kind = NodeKind::Source;
        self.node.name = groups[1].clone().unwrap_or_default().trim().to_string();
        if self.part_reference()? {
            return Ok(true);
        }
        self.part_definition_name()?;
        self.part_value()?;
        Ok(true)
    }

    fn part_definition_name(&mut self) -> Result<()> {
        let name = self
            .eat(unit_name_re())
            .and_then(|g| g[1].clone())
            .ok_or_else(|| DplError::parse_error("Directive name cannot be parsed"))?;
        self.node.name = name;
        if !self.part_equal() {
            return Err(DplError::parse_error("Directive requires an equal sign").with_arg(&self.node.name));
        }
        Ok(())
    }

    fn kwd_case(&mut self) -> Result<bool> {
        if let Some(groups) = self.eat(case_re()) {
            self.node.kind = NodeKind::Case(CaseKind::Case);
            self.node.name = groups[2].clone().unwrap_or_default();
            if !self.part_expression() {
                let end = self.rest.find('#').unwrap_or(self.rest.len());
                let condition = decode(self.rest[..end].trim());
                if condition.is_empty() {
                    return Err(DplError::parse_error("Case requires a condition"));
                }
                self.node.value_expr = Some(condition);
                self.rest = self.rest[end..].to_string();
            }
            return Ok(true);
        }
        if let Some(groups) = self.eat(branch_end_re()) {
            let kind = match groups[2].as_deref() {
                Some("else") => CaseKind::Else,
                _ => CaseKind::End,
            };
            self.node.kind = NodeKind::Case(kind);
            self.node.name = groups[1].clone().unwrap_or_default();
            return Ok(true);
        }
        Ok(false)
    }

    fn kwd_options(&mut self) -> Result<bool> {
        if self.eat(options_re()).is_some() {
            self.node.dimension = Some(vec![(None, None)]);
        } else if self.eat(option_re()).is_none() {
            return Ok(false);
        }
        self.node.kind = NodeKind::Options;
        self.part_value()?;
        self.part_units()?;
        Ok(true)
    }

    fn kwd_constant(&mut self) -> bool {
        if self.eat(constant_re()).is_none() {
            return false;
        }
        self.node.kind = NodeKind::Constant;
        true
    }

    fn kwd_property(&mut self, re: &Regex, kind: NodeKind) -> Result<bool> {
        if self.eat(re).is_none() {
            return Ok(false);
        }
        self.node.kind = kind;
        self.part_value()?;
        Ok(true)
    }

    // ========== Named nodes ==========

    fn part_indent(&mut self) {
        if let Some(groups) = self.eat(indent_re()) {
            self.node.indent = groups[1].as_deref().map_or(0, str::len);
        }
    }

    fn part_name(&mut self) -> Result<()> {
        let name = self
            .eat(name_re())
            .and_then(|g| g[1].clone())
            .ok_or_else(|| DplError::parse_error("Node name cannot be parsed"))?;
        if !self.rest.is_empty() && !self.rest.starts_with(char::is_whitespace) && !self.rest.starts_with('=') {
            return Err(DplError::parse_error("Node name must be followed by a space").with_arg(name));
        }
        self.node.name = name;
        Ok(())
    }

    fn kwd_group(&mut self) -> bool {
        if !group_re().is_match(&self.rest) {
            return false;
        }
        self.node.kind = NodeKind::Group;
        true
    }

    fn kwd_mod(&mut self) -> Result<bool> {
        if !self.part_equal() {
            return Ok(false);
        }
        self.node.kind = NodeKind::Mod;
        self.part_value()?;
        self.part_units()?;
        Ok(true)
    }

    fn part_type(&mut self) -> Result<()> {
        let word = self
            .eat(type_re())
            .and_then(|g| g[2].clone())
            .ok_or_else(|| DplError::parse_error("Node type cannot be parsed").with_arg(&self.node.name))?;
        self.node.kind = match word.as_str() {
            "table" => NodeKind::Table,
            other => NodeKind::Value(
                DataType::parse(other)
                    .ok_or_else(|| DplError::parse_error("Node type is not recognized").with_arg(other))?,
            ),
        };
        Ok(())
    }

    fn part_dimension(&mut self) -> Result<()> {
        if let Some(groups) = self.eat(dimension_re()) {
            let text = groups[2].clone().unwrap_or_default();
            self.node.dimension = Some(parse_bounds(&text)?);
        }
        Ok(())
    }

    fn part_equal(&mut self) -> bool {
        self.eat(equal_re()).is_some()
    }

    // ========== Values ==========

    fn part_reference(&mut self) -> Result<bool> {
        let Some(groups) = self.eat(reference_re()) else {
            return Ok(false);
        };
        self.node.value_ref = groups[2].clone().map(|r| decode(r.trim()));
        if let Some(groups) = self.eat(slice_re()) {
            self.node.value_slice = groups[2].clone();
        }
        Ok(true)
    }

    fn part_expression(&mut self) -> bool {
        let Some(groups) = self.eat(expression_re()) else {
            return false;
        };
        let expr = groups[2].clone().or_else(|| groups[3].clone()).or_else(|| groups[4].clone());
        self.node.value_expr = expr.map(|e| decode(&e));
        true
    }

    fn part_value(&mut self) -> Result<()> {
        if self.part_reference()? || self.part_expression() {
            return Ok(());
        }
        if let Some(groups) = self.eat(function_re()) {
            self.node.value_fn = groups[2].clone();
            return Ok(());
        }
        let Some(groups) = self.eat(literal_re()) else {
            return Err(DplError::parse_error("Value cannot be parsed").with_arg(&self.node.name));
        };
        let text = match &groups[1] {
            Some(block) => strip_block(&decode(block)),
            None => decode(&groups[2..5].iter().find_map(|g| g.clone()).unwrap_or_default()),
        };
        self.node.value_raw = Some(RawValue::Text(text));
        Ok(())
    }

    fn part_units(&mut self) -> Result<()> {
        if units_operator_re().is_match(&self.rest) {
            return Err(DplError::parse_error("Units cannot start with an operator")
                .with_arg(decode(self.rest.trim())));
        }
        if let Some(groups) = self.eat(units_re()) {
            self.node.units_raw = groups[2].clone();
        }
        Ok(())
    }

    fn part_comment(&mut self) {
        self.eat(comment_re());
    }
}

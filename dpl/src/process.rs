//! Node processing
//!
//! `Builder` takes the parsed nodes of a source in order and applies them to
//! an environment. Directives add units and sources, imports and tables
//! expand into value nodes that are processed next, case nodes steer the
//! branching, properties constrain the last value node and value nodes are
//! evaluated and stored. Data environments are validated at the end.

use crate::docs;
use crate::environment::{Environment, Requested};
use crate::lists::{EnvSource, EnvUnit};
use crate::node::{slice_value, BranchRef, CaseKind, Injection, Node, NodeKind};
use crate::parser::{logical_lines, parse_line};
use crate::settings::{sign, EnvType};
use crate::solvers::{FunctionSolver, LogicalSolver, NumericalSolver, TemplateSolver};
use crate::value::{DataType, RawValue, Value};
use dpl_core::{DplError, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Parse every logical line of a source
pub(crate) fn code_nodes(code: &str, source: &str) -> Result<Vec<Node>> {
    logical_lines(code)
        .into_iter()
        .map(|(line, text)| parse_line(&text, crate::node::SourceRef::new(source, line)))
        .collect()
}

fn raw_text(node: &Node) -> String {
    node.value_raw.as_ref().map(|raw| raw.to_string()).unwrap_or_default()
}

/// Split a table row on whitespace; quoted cells may contain spaces
fn split_row(line: &str) -> Result<Vec<String>> {
    let mut cells = Vec::new();
    let mut chars = line.trim().chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut cell = String::new();
        if c == '"' || c == '\'' {
            chars.next();
            let mut closed = false;
            for next in chars.by_ref() {
                if next == c {
                    closed = true;
                    break;
                }
                cell.push(next);
            }
            if !closed {
                return Err(DplError::parse_error("Table cell has no closing quote").with_arg(line.trim()));
            }
        } else {
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() {
                    break;
                }
                cell.push(next);
                chars.next();
            }
        }
        cells.push(cell);
    }
    Ok(cells)
}

pub(crate) struct Builder {
    env: Environment,
    queue: VecDeque<Node>,
    /// Value node that properties apply to
    last: Option<String>,
    /// Clean names and branch chains of all declarations
    declarations: Vec<(String, Vec<BranchRef>)>,
}

impl Builder {
    pub fn new(env: Environment, nodes: Vec<Node>) -> Self {
        Builder {
            env,
            queue: nodes.into(),
            last: None,
            declarations: Vec::new(),
        }
    }

    fn docs(&self) -> bool {
        self.env.envtype == EnvType::Docs
    }

    pub fn build(mut self) -> Result<Environment> {
        while let Some(node) = self.queue.pop_front() {
            let source = node.source.clone();
            let code = node.code.trim().to_string();
            self.step(node)
                .map_err(|err| err.at_line(source.name, source.line).with_code(code))?;
        }
        if !self.docs() {
            self.check_branches()?;
            self.validate()?;
        }
        debug!(nodes = self.env.nodes.len(), envtype = ?self.env.envtype, "environment built");
        Ok(self.env)
    }

    fn step(&mut self, mut node: Node) -> Result<()> {
        match node.kind {
            NodeKind::Empty => return Ok(()),
            NodeKind::Case(kind) => return self.case(node, kind),
            _ => self.env.branching.close(node.indent),
        }
        if self.env.branching.false_case() {
            return self.skip(node);
        }
        self.inject(&mut node)?;
        match node.kind {
            NodeKind::Unit => self.unit(&node),
            NodeKind::Source => self.source(&node),
            NodeKind::Import => self.import(node),
            NodeKind::Table => self.table(node),
            NodeKind::Group => {
                self.env.hierarchy.register(&mut node);
                Ok(())
            }
            NodeKind::Mod => self.modification(node),
            NodeKind::Value(_) => self.value(node),
            _ => self.property(&node),
        }
    }

    /// Nodes of unselected arms only keep names and branch records
    fn skip(&mut self, mut node: Node) -> Result<()> {
        if node.kind.is_registered() {
            self.env.hierarchy.register(&mut node);
        }
        if matches!(node.kind, NodeKind::Value(_)) {
            self.env.branching.prepare_node(&mut node, true);
            self.declarations.push((node.clean_name(), node.branch));
        }
        Ok(())
    }

    // ========== Cases ==========

    fn case(&mut self, mut node: Node, kind: CaseKind) -> Result<()> {
        let local = node.name.clone();
        if kind != CaseKind::End {
            self.env.hierarchy.register(&mut node);
        }
        let mut branching = std::mem::take(&mut self.env.branching);
        let env = &self.env;
        let solved = branching.solve_case(&node, |condition| LogicalSolver::new(env).solve(condition));
        self.env.branching = branching;
        if let Some(case) = solved? {
            let prefix = local.rfind(sign::CONDITION).map_or("", |i| &local[..i]);
            self.env.hierarchy.rename_last(format!("{}{}{}", prefix, sign::CONDITION, case));
        }
        Ok(())
    }

    /// Every arm of a block with `@else` must declare a name, or the name needs a definition outside the block
    fn check_branches(&self) -> Result<()> {
        for (id, name) in self.env.branching.incomplete() {
            let Some(branch) = self.env.branching.get(id) else {
                continue;
            };
            if !branch.has_else() {
                continue;
            }
            let default = self
                .declarations
                .iter()
                .any(|(declared, chain)| *declared == name && chain.iter().all(|b| b.branch != id));
            if !default {
                let source = branch.arms.first().map(|arm| arm.source.clone());
                let mut err = DplError::undefined(&name).with_note("Branch is incomplete and node has no default definition");
                if let Some(source) = source {
                    err = err.at_line(source.name, source.line);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    // ========== Values ==========

    /// Replace a `{reference}` value by the referenced value or code
    fn inject(&self, node: &mut Node) -> Result<()> {
        if !matches!(
            node.kind,
            NodeKind::Value(_) | NodeKind::Mod | NodeKind::Options | NodeKind::Table
        ) {
            return Ok(());
        }
        let Some(reference) = node.value_ref.clone() else {
            return Ok(());
        };
        match self.injected(node, &reference) {
            Err(err) if self.docs() => {
                trace!(reference = %reference, %err, "injection skipped");
                Ok(())
            }
            other => other,
        }
    }

    fn injected(&self, node: &mut Node, reference: &str) -> Result<()> {
        match self.env.request(reference, Some(&[1]), None)? {
            Requested::Code(code) => node.value_raw = Some(RawValue::Text(code)),
            Requested::Nodes(mut nodes) => {
                let remote = nodes.remove(0);
                let value = remote
                    .value
                    .clone()
                    .ok_or_else(|| DplError::undefined(&remote.name).with_note("Referenced node has no value"))?;
                let value = match &node.value_slice {
                    Some(slice) => slice_value(&value, slice)?,
                    None => value,
                };
                node.injection = Some(Injection {
                    reference: reference.to_string(),
                    source: remote.isource.clone().unwrap_or(remote.source),
                    value: value.payload.to_string(),
                    unit: value.unit.clone(),
                });
                node.value_raw = Some(RawValue::Computed(value));
            }
        }
        Ok(())
    }

    /// Compute the value of a function or expression node
    fn evaluate(&self, node: &mut Node) -> Result<()> {
        if self.docs() {
            return Ok(());
        }
        let units = node.units_raw.clone();
        let value = if let Some(name) = &node.value_fn {
            FunctionSolver::new(&self.env).solve(name, units.as_deref())?
        } else if let Some(expr) = &node.value_expr {
            match node.dtype() {
                Some(DataType::Bool) => Value::bool(LogicalSolver::new(&self.env).solve(expr)?),
                Some(DataType::Str) => Value::string(
                    TemplateSolver::new(&self.env)
                        .with_source(&node.source.name)
                        .solve(expr)?,
                ),
                Some(_) => NumericalSolver::new(&self.env).solve_value(expr, units.as_deref())?,
                None => {
                    return Err(DplError::invalid_input("Expression needs a node type").with_arg(&node.name));
                }
            }
        } else {
            return Ok(());
        };
        node.value_raw = Some(RawValue::Computed(value));
        Ok(())
    }

    fn value(&mut self, mut node: Node) -> Result<()> {
        self.env.hierarchy.register(&mut node);
        self.env.branching.prepare_node(&mut node, true);
        self.declarations.push((node.clean_name(), node.branch.clone()));
        self.evaluate(&mut node)?;
        {
            let _scope = self.env.units.enter()?;
            node.check_units()?;
            node.set_value()?;
        }
        if self.docs() {
            return self.document(node);
        }
        node.name = node.clean_name();
        self.accept(node)
    }

    fn modification(&mut self, mut node: Node) -> Result<()> {
        self.env.hierarchy.register(&mut node);
        self.env.branching.prepare_node(&mut node, false);
        if self.docs() {
            return self.document(node);
        }
        let name = node.clean_name();
        let target = self
            .env
            .nodes
            .get(&name)
            .ok_or_else(|| DplError::undefined(&name).with_note("Modifying undefined node"))?;
        if target.constant {
            return Err(DplError::constant_violation(&name));
        }
        node.adopt_type(target);
        self.evaluate(&mut node)?;
        {
            let _scope = self.env.units.enter()?;
            node.set_value()?;
        }
        node.name = name;
        self.accept(node)
    }

    /// Store a new node or modify the node of the same name
    fn accept(&mut self, node: Node) -> Result<()> {
        let name = node.name.clone();
        let _scope = self.env.units.enter()?;
        match self.env.nodes.get_mut(&name) {
            Some(target) => {
                if target.constant {
                    return Err(DplError::constant_violation(&name));
                }
                target.modify_value(&node)?;
                debug!(node = %name, "node modified");
            }
            None => {
                debug!(node = %name, kind = %node.kind, "node defined");
                self.env.nodes.push(node);
            }
        }
        self.last = Some(name);
        Ok(())
    }

    /// Documentation keeps every node as written
    fn document(&mut self, mut node: Node) -> Result<()> {
        node.docs = Some(docs::classify(&self.env, &node));
        self.last = Some(node.name.clone());
        self.env.nodes.push(node);
        Ok(())
    }

    // ========== Properties ==========

    fn property(&mut self, node: &Node) -> Result<()> {
        let name = self
            .last
            .clone()
            .ok_or_else(|| DplError::invalid_constraint("Property has no node to apply to", &node.kind.to_string()))?;
        let _scope = self.env.units.enter()?;
        let target = self
            .env
            .nodes
            .get_mut(&name)
            .ok_or_else(|| DplError::invalid_constraint("Property has no node to apply to", &name))?;
        match node.kind {
            NodeKind::Options => target.set_option(node)?,
            NodeKind::Constant => target.constant = true,
            NodeKind::Format => target.set_format(raw_text(node))?,
            NodeKind::Tags => target.add_tags(&raw_text(node))?,
            NodeKind::Description => target.add_description(&raw_text(node)),
            NodeKind::Condition => {
                target.condition = node.value_expr.clone().or_else(|| Some(raw_text(node)));
            }
            _ => {
                return Err(DplError::invalid_input("Node cannot be processed").with_arg(&node.kind));
            }
        }
        trace!(node = %name, property = %node.kind, "property set");
        Ok(())
    }

    // ========== Expansions ==========

    fn import(&mut self, mut node: Node) -> Result<()> {
        let reference = node
            .value_ref
            .clone()
            .ok_or_else(|| DplError::parse_error("Import requires a reference"))?;
        let nodes = match self.env.request_nodes(&reference, None) {
            Ok(nodes) => nodes,
            Err(err) if self.docs() => {
                trace!(reference = %reference, %err, "import skipped");
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        let prefix = if node.name.is_empty() {
            String::new()
        } else {
            format!("{}{}", node.name, sign::SEPARATOR)
        };
        debug!(reference = %reference, count = nodes.len(), "nodes imported");
        for mut imported in nodes.into_iter().rev() {
            imported.value_ref = None;
            imported.value_slice = None;
            imported.value_expr = None;
            imported.value_fn = None;
            if let Some(value) = imported.value.take() {
                imported.value_raw = Some(RawValue::Computed(value));
            }
            imported.branch.clear();
            imported.docs = None;
            imported.primary = false;
            imported.isource = Some(node.source.clone());
            imported.indent = node.indent;
            imported.name = format!("{}{}", prefix, imported.name);
            self.queue.push_front(imported);
        }
        if self.docs() {
            self.env.hierarchy.register(&mut node);
            self.env.nodes.push(node);
        }
        Ok(())
    }

    /// Header lines define typed columns until a blank line; rows follow
    fn table(&mut self, node: Node) -> Result<()> {
        let Some(RawValue::Text(text)) = &node.value_raw else {
            return Err(DplError::parse_error("Table requires a text block").with_arg(&node.name));
        };
        let mut lines = text.lines().skip_while(|line| line.trim().is_empty());
        let mut columns = Vec::new();
        for line in lines.by_ref() {
            if line.trim().is_empty() {
                break;
            }
            let column = parse_line(line.trim(), node.source.clone())?;
            if !matches!(column.kind, NodeKind::Value(_)) || column.has_definition() {
                return Err(DplError::parse_error("Table header must declare typed columns").with_arg(line.trim()));
            }
            columns.push(column);
        }
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
        for line in lines.filter(|line| !line.trim().is_empty()) {
            let row = split_row(line)?;
            if row.len() != columns.len() {
                return Err(DplError::parse_error("Number of table cells does not match the header")
                    .with_arg(columns.len())
                    .with_arg(row.len()));
            }
            for (column, cell) in cells.iter_mut().zip(row) {
                column.push(cell);
            }
        }
        for (mut column, items) in columns.into_iter().zip(cells).rev() {
            let rows = items.len();
            let mut dimension = vec![(Some(rows), Some(rows))];
            dimension.extend(column.dimension.take().unwrap_or_default());
            column.dimension = Some(dimension);
            column.value_raw = Some(RawValue::Items(items));
            column.declared = false;
            column.name = format!("{}{}{}", node.name, sign::SEPARATOR, column.name);
            column.indent = node.indent;
            column.source = node.source.clone();
            self.queue.push_front(column);
        }
        debug!(table = %node.name, "table expanded");
        Ok(())
    }

    // ========== Directives ==========

    fn unit(&mut self, node: &Node) -> Result<()> {
        if let Some(reference) = &node.value_ref {
            for unit in self.env.request_units(reference)? {
                self.env.units.add(unit)?;
            }
            return Ok(());
        }
        let text = raw_text(node);
        let value: f64 = text
            .trim()
            .parse()
            .map_err(|_| DplError::invalid_input("Unit value must be a number").with_arg(&text))?;
        let unit = {
            let _scope = self.env.units.enter()?;
            EnvUnit::new(&node.name, value, node.units_raw.as_deref(), node.source.clone())?
        };
        self.env.units.add(unit)
    }

    fn source(&mut self, node: &Node) -> Result<()> {
        if let Some(reference) = &node.value_ref {
            for source in self.env.request_sources(reference)? {
                self.env.sources.insert(source);
            }
            return Ok(());
        }
        let raw = raw_text(node);
        let path = match self.env.sources.get(&node.source.name) {
            Some(parent) => parent.resolve(Path::new(&raw)),
            None => PathBuf::from(&raw),
        };
        let code = fs::read_to_string(&path).map_err(|err| {
            DplError::invalid_input("Source file cannot be read")
                .with_arg(path.display())
                .with_note(err.to_string())
        })?;
        let mut entry = EnvSource::new(&node.name)
            .with_path(&path)
            .with_code(code.clone())
            .with_parent(&node.source.name);
        if matches!(path.extension().and_then(|e| e.to_str()), Some("dpl" | "dip")) {
            let nested = self.nested(entry.clone(), &code)?;
            entry.nodes = Some(nested.nodes);
            entry.units = Some(nested.units);
            entry.sources = Some(nested.sources);
        }
        debug!(source = %node.name, path = %path.display(), "source added");
        self.env.sources.insert(entry);
        Ok(())
    }

    /// Parse an included DPL file into its own environment
    fn nested(&self, entry: EnvSource, code: &str) -> Result<Environment> {
        let mut env = Environment::new(EnvType::Data);
        env.sources = self.env.sources.clone();
        env.functions = self.env.functions.clone();
        let nodes = code_nodes(code, &entry.name)?;
        env.sources.insert(entry);
        Builder::new(env, nodes).build()
    }

    // ========== Validation ==========

    fn validate(&mut self) -> Result<()> {
        let _scope = self.env.units.enter()?;
        let nodes: Vec<Node> = self.env.nodes.iter().cloned().collect();
        for node in &nodes {
            node.validate_defined()
                .and_then(|_| node.validate_options())
                .and_then(|_| node.validate_format())
                .and_then(|_| self.check_condition(node))
                .map_err(|err| node.located(err))?;
        }
        Ok(())
    }

    fn check_condition(&mut self, node: &Node) -> Result<()> {
        let Some(condition) = &node.condition else {
            return Ok(());
        };
        self.env.autoref = Some(node.name.clone());
        let result = LogicalSolver::new(&self.env).solve(condition);
        self.env.autoref = None;
        if !result? {
            return Err(DplError::condition_failed(&node.name, condition));
        }
        Ok(())
    }
}

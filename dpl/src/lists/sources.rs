//! Sources of DPL code and included files

use super::{NodeList, UnitList};
use crate::settings::sign;
use dpl_core::{DplError, Result};
use std::path::{Path, PathBuf};

/// A root, file, string or `$source` entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvSource {
    pub name: String,
    pub path: Option<PathBuf>,
    pub code: Option<String>,
    /// Source the entry was declared in
    pub parent: Option<String>,
    /// Parsed content of included DPL files
    pub nodes: Option<NodeList>,
    pub units: Option<UnitList>,
    pub sources: Option<SourceList>,
}

impl EnvSource {
    pub fn new(name: impl Into<String>) -> Self {
        EnvSource { name: name.into(), ..Default::default() }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Resolve a path relative to this source: next to a file, inside a directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.path {
            Some(base) if base.is_file() => base.parent().unwrap_or(Path::new(".")).join(path),
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceList {
    sources: Vec<EnvSource>,
}

impl SourceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new source; names are unique
    pub fn add(&mut self, source: EnvSource) -> Result<()> {
        if self.get(&source.name).is_some() {
            return Err(DplError::symbol_exists(&source.name).with_note("Reference source already exists"));
        }
        self.sources.push(source);
        Ok(())
    }

    /// Add or replace a source
    pub fn insert(&mut self, source: EnvSource) {
        match self.sources.iter_mut().find(|s| s.name == source.name) {
            Some(existing) => *existing = source,
            None => self.sources.push(source),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EnvSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvSource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// `*` selects all sources, otherwise an exact name
    pub fn query(&self, query: &str) -> Vec<EnvSource> {
        let query = query.trim();
        self.sources
            .iter()
            .filter(|s| query == sign::WILDCARD || s.name == query)
            .cloned()
            .collect()
    }
}

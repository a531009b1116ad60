//! Dotted names from indentation

use crate::node::Node;
use crate::settings::sign;

/// Stack of `(indent, name)` parents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyList {
    parents: Vec<(usize, String)>,
}

impl HierarchyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix the node name with its parents and make it the newest parent
    pub fn register(&mut self, node: &mut Node) {
        while self.parents.last().is_some_and(|(indent, _)| *indent >= node.indent) {
            self.parents.pop();
        }
        let local = std::mem::take(&mut node.name);
        let mut segments: Vec<&str> = self.parents.iter().map(|(_, name)| name.as_str()).collect();
        if !local.is_empty() {
            segments.push(&local);
        }
        node.name = segments.join(&sign::SEPARATOR.to_string());
        if !local.is_empty() {
            self.parents.push((node.indent, local));
        }
    }

    /// Rename the newest parent
    pub fn rename_last(&mut self, name: impl Into<String>) {
        if let Some((_, last)) = self.parents.last_mut() {
            *last = name.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SourceRef;

    fn node(name: &str, indent: usize) -> Node {
        let mut node = Node::new(name, SourceRef::new("test", 1));
        node.name = name.to_string();
        node.indent = indent;
        node
    }

    #[test]
    fn test_register() {
        let mut hierarchy = HierarchyList::new();
        let names: Vec<String> = [("box", 0), ("width", 2), ("lid", 2), ("depth", 4), ("count", 0)]
            .iter()
            .map(|(name, indent)| {
                let mut n = node(name, *indent);
                hierarchy.register(&mut n);
                n.name
            })
            .collect();
        assert_eq!(names, vec!["box", "box.width", "box.lid", "box.lid.depth", "count"]);
    }

    #[test]
    fn test_rename_last() {
        let mut hierarchy = HierarchyList::new();
        let mut case = node("@case", 0);
        hierarchy.register(&mut case);
        hierarchy.rename_last("@3");
        let mut inner = node("x", 2);
        hierarchy.register(&mut inner);
        assert_eq!(inner.name, "@3.x");
    }

    #[test]
    fn test_unnamed_import() {
        let mut hierarchy = HierarchyList::new();
        let mut group = node("box", 0);
        hierarchy.register(&mut group);
        let mut import = node("", 2);
        hierarchy.register(&mut import);
        assert_eq!(import.name, "box");
        let mut next = node("y", 2);
        hierarchy.register(&mut next);
        assert_eq!(next.name, "box.y");
    }
}

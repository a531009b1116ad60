//! Value nodes of an environment

use super::wildcard_prefix;
use crate::node::Node;
use crate::settings::sign;

/// Nodes in definition order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeList {
    nodes: Vec<Node>,
}

impl NodeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Latest node with the given name
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().rev().find(|n| n.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().rev().find(|n| n.name == name)
    }

    pub fn last_mut(&mut self) -> Option<&mut Node> {
        self.nodes.last_mut()
    }

    /// Nodes below a group, named relative to it
    pub fn subtree(&self, prefix: &str) -> NodeList {
        let prefix = format!("{}{}", prefix, sign::SEPARATOR);
        let nodes = self
            .nodes
            .iter()
            .filter_map(|n| {
                n.name.strip_prefix(&prefix).map(|rest| {
                    let mut node = n.clone();
                    node.name = rest.to_string();
                    node
                })
            })
            .collect();
        NodeList { nodes }
    }

    /// Select nodes by `*`, `a.b.*` or an exact name, optionally filtered by tags.
    ///
    /// Wildcard queries strip the matched prefix from the names; an exact
    /// match is returned under its last name segment.
    pub fn query(&self, query: &str, tags: Option<&[String]>) -> Vec<Node> {
        let query = query.trim();
        let selected: Vec<Node> = if query == sign::WILDCARD {
            self.nodes.clone()
        } else if let Some(prefix) = wildcard_prefix(query) {
            self.subtree(prefix).nodes
        } else {
            self.nodes
                .iter()
                .filter(|n| n.name == query)
                .map(|n| {
                    let mut node = n.clone();
                    node.name = n.local_name().to_string();
                    node
                })
                .collect()
        };
        match tags {
            Some(tags) if !tags.is_empty() => selected
                .into_iter()
                .filter(|n| n.tags.iter().any(|t| tags.contains(t)))
                .collect(),
            _ => selected,
        }
    }
}

impl FromIterator<Node> for NodeList {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        NodeList { nodes: iter.into_iter().collect() }
    }
}

impl IntoIterator for NodeList {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

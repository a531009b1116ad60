//! Case blocks
//!
//! A block opens with `@case`, continues with further `@case` arms and an
//! optional `@else` at the same indent, and closes with `@end` or with the
//! first line that is not indented deeper than the block. Each arm gets a
//! global case number `k`; nodes inside it are named `@k.name` until the
//! names are cleaned.

use crate::node::{BranchRef, CaseKind, Node, NodeKind, SourceRef};
use dpl_core::{DplError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arm {
    pub case: usize,
    pub kind: CaseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Selected arm
    pub value: bool,
    /// Names declared in the arm
    pub names: BTreeSet<String>,
    pub source: SourceRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub id: usize,
    pub indent: usize,
    /// All enclosing arms were selected when the block opened
    pub parent_active: bool,
    /// Some arm was selected
    pub matched: bool,
    pub arms: Vec<Arm>,
}

impl Branch {
    pub fn has_else(&self) -> bool {
        self.arms.iter().any(|a| a.kind == CaseKind::Else)
    }

    /// Names declared in any arm
    pub fn names(&self) -> BTreeSet<String> {
        self.arms.iter().flat_map(|a| a.names.iter().cloned()).collect()
    }

    /// Every arm, including an `@else`, declares the name
    pub fn is_complete(&self, name: &str) -> bool {
        self.has_else() && self.arms.iter().all(|a| a.names.contains(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchingList {
    pub branches: Vec<Branch>,
    open: Vec<usize>,
    cases: usize,
    /// Select every arm, as documentation does
    keep_all: bool,
}

impl BranchingList {
    pub fn new(keep_all: bool) -> Self {
        BranchingList { keep_all, ..Default::default() }
    }

    pub fn get(&self, id: usize) -> Option<&Branch> {
        self.branches.get(id)
    }

    /// Close blocks a line at this indent is not part of
    pub fn close(&mut self, indent: usize) {
        while let Some(id) = self.open.last() {
            if self.branches[*id].indent < indent {
                break;
            }
            debug!(branch = id, "case block closed");
            self.open.pop();
        }
    }

    /// Some enclosing arm is not selected
    pub fn false_case(&self) -> bool {
        self.open
            .iter()
            .any(|id| self.branches[*id].arms.last().is_some_and(|arm| !arm.value))
    }

    /// Enclosing arms, outermost first
    pub fn chain(&self) -> Vec<BranchRef> {
        self.open
            .iter()
            .filter_map(|id| {
                let case = self.branches[*id].arms.last()?.case;
                Some(BranchRef { branch: *id, case })
            })
            .collect()
    }

    /// Record the branch chain of a node; declarations are counted in their arm
    pub fn prepare_node(&mut self, node: &mut Node, declaration: bool) {
        node.branch = self.chain();
        if !declaration {
            return;
        }
        if let Some(arm) = self.open.last().and_then(|id| self.branches[*id].arms.last_mut()) {
            arm.names.insert(node.clean_name());
        }
    }

    /// Open, continue or close a block. Returns the case number of a new arm.
    ///
    /// `evaluate` is called with the arm condition only when the block is
    /// reachable and no earlier arm was selected.
    pub fn solve_case(
        &mut self,
        node: &Node,
        evaluate: impl FnOnce(&str) -> Result<bool>,
    ) -> Result<Option<usize>> {
        let NodeKind::Case(kind) = node.kind else {
            return Err(DplError::invalid_input("Node is not a case").with_arg(&node.name));
        };
        while self.open.last().is_some_and(|id| self.branches[*id].indent > node.indent) {
            self.open.pop();
        }
        let same = self.open.last().copied().filter(|id| self.branches[*id].indent == node.indent);
        let id = match (kind, same) {
            (CaseKind::Case, Some(id)) => id,
            (CaseKind::Case, None) => {
                let id = self.branches.len();
                let parent_active = !self.false_case();
                self.branches.push(Branch {
                    id,
                    indent: node.indent,
                    parent_active,
                    matched: false,
                    arms: Vec::new(),
                });
                self.open.push(id);
                id
            }
            (_, Some(id)) => id,
            (_, None) => {
                return Err(DplError::parse_error("Condition is not part of a case block")
                    .with_arg(&node.name));
            }
        };
        let keep_all = self.keep_all;
        let branch = &mut self.branches[id];
        let (condition, value) = match kind {
            CaseKind::End => {
                self.open.pop();
                debug!(branch = id, "case block ended");
                return Ok(None);
            }
            CaseKind::Else => {
                if branch.has_else() {
                    return Err(DplError::parse_error("Case block has more than one else")
                        .with_arg(&node.name));
                }
                (None, keep_all || (branch.parent_active && !branch.matched))
            }
            CaseKind::Case => {
                if branch.has_else() {
                    return Err(DplError::parse_error("Case arm after else").with_arg(&node.name));
                }
                let condition = node
                    .value_expr
                    .clone()
                    .ok_or_else(|| DplError::parse_error("Case requires a condition"))?;
                let value = if keep_all {
                    true
                } else if branch.parent_active && !branch.matched {
                    evaluate(&condition)?
                } else {
                    false
                };
                (Some(condition), value)
            }
        };
        let case = self.cases;
        self.cases += 1;
        branch.matched |= value;
        branch.arms.push(Arm {
            case,
            kind,
            condition,
            value,
            names: BTreeSet::new(),
            source: node.source.clone(),
        });
        debug!(branch = id, case, selected = value, "case arm");
        Ok(Some(case))
    }

    /// Names declared in some but not all arms of reachable blocks
    pub fn incomplete(&self) -> Vec<(usize, String)> {
        self.branches
            .iter()
            .filter(|b| b.parent_active)
            .flat_map(|b| {
                b.names()
                    .into_iter()
                    .filter(|name| !b.is_complete(name))
                    .map(|name| (b.id, name))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DataType;

    fn case(kind: CaseKind, indent: usize, condition: Option<&str>) -> Node {
        let mut node = Node::new("@case", SourceRef::new("test", 1));
        node.kind = NodeKind::Case(kind);
        node.indent = indent;
        node.value_expr = condition.map(str::to_string);
        node
    }

    fn value(name: &str, indent: usize) -> Node {
        let mut node = Node::new(name, SourceRef::new("test", 1));
        node.name = name.to_string();
        node.kind = NodeKind::Value(DataType::INT);
        node.indent = indent;
        node
    }

    #[test]
    fn test_first_match_wins() {
        let mut branching = BranchingList::new(false);
        let a = branching.solve_case(&case(CaseKind::Case, 0, Some("a")), |_| Ok(false)).unwrap();
        assert_eq!(a, Some(0));
        assert!(branching.false_case());
        branching.solve_case(&case(CaseKind::Case, 0, Some("b")), |_| Ok(true)).unwrap();
        assert!(!branching.false_case());
        let mut calls = 0;
        branching
            .solve_case(&case(CaseKind::Case, 0, Some("c")), |_| {
                calls += 1;
                Ok(true)
            })
            .unwrap();
        assert_eq!(calls, 0);
        assert!(branching.false_case());
        branching.solve_case(&case(CaseKind::Else, 0, None), |_| Ok(true)).unwrap();
        assert!(branching.false_case());
        branching.solve_case(&case(CaseKind::End, 0, None), |_| Ok(true)).unwrap();
        assert!(!branching.false_case());
    }

    #[test]
    fn test_dedent_closes_block() {
        let mut branching = BranchingList::new(false);
        branching.solve_case(&case(CaseKind::Case, 0, Some("a")), |_| Ok(false)).unwrap();
        branching.close(2);
        assert!(branching.false_case());
        branching.close(0);
        assert!(!branching.false_case());
    }

    #[test]
    fn test_nested_chain() {
        let mut branching = BranchingList::new(false);
        branching.solve_case(&case(CaseKind::Case, 0, Some("a")), |_| Ok(true)).unwrap();
        branching.solve_case(&case(CaseKind::Case, 2, Some("b")), |_| Ok(true)).unwrap();
        let mut node = value("x", 4);
        branching.prepare_node(&mut node, true);
        assert_eq!(
            node.branch,
            vec![BranchRef { branch: 0, case: 0 }, BranchRef { branch: 1, case: 1 }]
        );
        // an else of the outer block closes the inner one
        branching.solve_case(&case(CaseKind::Else, 0, None), |_| Ok(true)).unwrap();
        assert_eq!(branching.chain(), vec![BranchRef { branch: 0, case: 2 }]);
    }

    #[test]
    fn test_inactive_parent_skips_evaluation() {
        let mut branching = BranchingList::new(false);
        branching.solve_case(&case(CaseKind::Case, 0, Some("a")), |_| Ok(false)).unwrap();
        let nested = branching
            .solve_case(&case(CaseKind::Case, 2, Some("b")), |_| panic!("not evaluated"))
            .unwrap();
        assert_eq!(nested, Some(1));
        assert!(!branching.get(1).unwrap().parent_active);
    }

    #[test]
    fn test_completeness() {
        let mut branching = BranchingList::new(true);
        branching.solve_case(&case(CaseKind::Case, 0, Some("a")), |_| Ok(true)).unwrap();
        branching.prepare_node(&mut value("x", 2), true);
        branching.prepare_node(&mut value("y", 2), true);
        branching.solve_case(&case(CaseKind::Else, 0, None), |_| Ok(true)).unwrap();
        branching.prepare_node(&mut value("x", 2), true);
        let block = branching.get(0).unwrap();
        assert!(block.is_complete("x"));
        assert!(!block.is_complete("y"));
        assert_eq!(branching.incomplete(), vec![(0, "y".to_string())]);
    }

    #[test]
    fn test_orphan_else() {
        let mut branching = BranchingList::new(false);
        assert!(branching.solve_case(&case(CaseKind::Else, 0, None), |_| Ok(true)).is_err());
    }
}

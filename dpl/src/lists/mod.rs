//! Ordered collections held by an environment

pub mod branching;
pub mod functions;
pub mod hierarchy;
pub mod nodes;
pub mod sources;
pub mod units;

pub use branching::{Arm, Branch, BranchingList};
pub use functions::{FunctionData, FunctionList, NativeFn};
pub use hierarchy::HierarchyList;
pub use nodes::NodeList;
pub use sources::{EnvSource, SourceList};
pub use units::{EnvUnit, UnitList};

/// Split a `prefix.*` query into its prefix
pub(crate) fn wildcard_prefix(query: &str) -> Option<&str> {
    query.strip_suffix(".*")
}

//! Path-addressed tree state.
//!
//! Holds an externally supplied hierarchy (e.g. a file listing) and applies
//! per-node UI attributes such as `collapsed` without touching unrelated
//! branches. Every mutation returns a new [`PathTree`]; only the nodes on the
//! path from the root to the target are rebuilt, all other subtrees are
//! shared with the previous value.

mod node;
mod path;
mod path_tree;

pub use node::{AttrValue, Node};
pub use path::TreePath;
pub use path_tree::{PathTree, VisibleRow};

/// Attribute toggled when a node is expanded or collapsed.
pub const COLLAPSED: &str = "collapsed";

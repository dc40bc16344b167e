//! Persistent tree value with a selection cursor.

use std::sync::Arc;

use tracing::debug;

use super::COLLAPSED;
use super::node::{AttrValue, Node};
use super::path::TreePath;

/// Tree state: top-level nodes under an implicit root plus the selected path.
///
/// Cloning is cheap (one `Arc` per top-level node). Mutating methods take
/// `&self` and return the next value, leaving `self` untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTree {
    roots: Vec<Arc<Node>>,
    selected: Option<TreePath>,
}

/// One row of the depth-first listing produced by [`PathTree::visible`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleRow<'a> {
    pub path: TreePath,
    /// 0 for top-level nodes.
    pub depth: usize,
    pub node: &'a Node,
}

impl PathTree {
    pub fn new(roots: impl IntoIterator<Item = Node>) -> Self {
        Self {
            roots: roots.into_iter().map(Arc::new).collect(),
            selected: None,
        }
    }

    /// Tree with a single top-level node.
    pub fn from_root(root: Node) -> Self {
        Self::new([root])
    }

    pub fn roots(&self) -> &[Arc<Node>] {
        &self.roots
    }

    /// Wholesale replacement from the external source. The selection cursor
    /// is kept even if it no longer resolves.
    #[must_use]
    pub fn replace(&self, roots: impl IntoIterator<Item = Node>) -> Self {
        Self {
            roots: roots.into_iter().map(Arc::new).collect(),
            selected: self.selected.clone(),
        }
    }

    /// Node at `path`; `None` for the root or an unresolved path.
    pub fn node(&self, path: &TreePath) -> Option<&Node> {
        let (head, rest) = path.segments().split_first()?;
        let mut node = find(&self.roots, head)?;
        for segment in rest {
            node = &**node.child(segment)?;
        }
        Some(node)
    }

    pub fn contains(&self, path: &TreePath) -> bool {
        self.node(path).is_some()
    }

    pub fn get_attribute(&self, path: &TreePath, key: &str) -> Option<&AttrValue> {
        self.node(path)?.attr(key)
    }

    /// Truthiness of an attribute; absent counts as `false`.
    pub fn is_set(&self, path: &TreePath, key: &str) -> bool {
        self.get_attribute(path, key)
            .is_some_and(AttrValue::is_truthy)
    }

    pub const fn selected_path(&self) -> Option<&TreePath> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn set_attribute(
        &self,
        path: &TreePath,
        key: &str,
        value: impl Into<AttrValue>,
    ) -> Self {
        let value = value.into();
        self.update_attribute(path, key, |_| Some(value))
    }

    /// Flip an attribute; an absent value counts as `false`.
    ///
    /// The result is always a `Bool` carrying the negated truthiness. Toggling
    /// twice restores a `Bool` exactly, turns an absent value into `false`,
    /// and turns `Int`/`Text` values into the `Bool` of their truthiness.
    #[must_use]
    pub fn toggle_attribute(&self, path: &TreePath, key: &str) -> Self {
        self.update_attribute(path, key, |current| {
            Some(AttrValue::Bool(!current.is_some_and(AttrValue::is_truthy)))
        })
    }

    /// Custom mutation. `f` gets the current value and returns the new one;
    /// returning `None` removes the attribute.
    ///
    /// The empty path and unresolved paths leave the tree unchanged.
    #[must_use]
    pub fn update_attribute<F>(&self, path: &TreePath, key: &str, f: F) -> Self
    where
        F: FnOnce(Option<&AttrValue>) -> Option<AttrValue>,
    {
        if path.is_root() {
            debug!(key, "attribute change on implicit root ignored");
            return self.clone();
        }
        let rewritten = rewrite(&self.roots, path.segments(), |node| {
            let next = f(node.attr(key));
            match next {
                Some(value) => {
                    node.attrs_mut().insert(key.to_string(), value);
                }
                None => {
                    node.attrs_mut().remove(key);
                }
            }
        });
        match rewritten {
            Some(roots) => Self {
                roots,
                selected: self.selected.clone(),
            },
            None => {
                debug!(%path, key, "path did not resolve; tree unchanged");
                self.clone()
            }
        }
    }

    /// Move the selection cursor. Does not touch any node attribute and does
    /// not require the path to resolve.
    #[must_use]
    pub fn select(&self, path: TreePath) -> Self {
        Self {
            roots: self.roots.clone(),
            selected: Some(path),
        }
    }

    #[must_use]
    pub fn clear_selection(&self) -> Self {
        Self {
            roots: self.roots.clone(),
            selected: None,
        }
    }

    /// Click on a row: toggles `collapsed` and selects the path. Unresolved
    /// paths change nothing.
    #[must_use]
    pub fn activate(&self, path: &TreePath) -> Self {
        if !self.contains(path) {
            debug!(%path, "activate on missing path ignored");
            return self.clone();
        }
        self.toggle_attribute(path, COLLAPSED).select(path.clone())
    }

    /// Depth-first listing that skips the children of collapsed nodes.
    pub fn visible(&self) -> Vec<VisibleRow<'_>> {
        let mut rows = Vec::new();
        collect_visible(&self.roots, &TreePath::root(), 0, &mut rows);
        rows
    }
}

fn find<'a>(nodes: &'a [Arc<Node>], name: &str) -> Option<&'a Node> {
    nodes.iter().find(|n| n.name() == name).map(Arc::as_ref)
}

/// Rebuild `nodes` with `apply` run on the node at `segments`.
///
/// Only the nodes along the path are copied; every other `Arc` is reused.
/// Returns `None` when the path does not resolve. Duplicate sibling names
/// resolve to the first match.
fn rewrite<F>(nodes: &[Arc<Node>], segments: &[String], apply: F) -> Option<Vec<Arc<Node>>>
where
    F: FnOnce(&mut Node),
{
    let (head, rest) = segments.split_first()?;
    let idx = nodes.iter().position(|n| n.name() == head)?;
    let target = &nodes[idx];

    let mut replacement = Node::clone(target);
    if rest.is_empty() {
        apply(&mut replacement);
    } else {
        let children = rewrite(target.children()?, rest, apply)?;
        replacement.set_children(children);
    }

    let mut out = nodes.to_vec();
    out[idx] = Arc::new(replacement);
    Some(out)
}

fn collect_visible<'a>(
    nodes: &'a [Arc<Node>],
    parent: &TreePath,
    depth: usize,
    rows: &mut Vec<VisibleRow<'a>>,
) {
    for node in nodes {
        let path = parent.join(node.name());
        let collapsed = node.attr(COLLAPSED).is_some_and(AttrValue::is_truthy);
        let children = node.children();
        rows.push(VisibleRow {
            path: path.clone(),
            depth,
            node,
        });
        if !collapsed && let Some(children) = children {
            collect_visible(children, &path, depth + 1, rows);
        }
    }
}

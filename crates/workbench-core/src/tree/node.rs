//! Tree nodes and their UI attributes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Scalar UI-state attribute stored on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl AttrValue {
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Truthiness used by toggling: `false`, `0` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Text(s) => !s.is_empty(),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// One entry of the hierarchy.
///
/// Deserializes from `{"name": .., "children": [..], ..attrs}`; any key other
/// than `name` and `children` is read as an attribute. `children` absent
/// means the node is a leaf, `[]` is an empty directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<Arc<Node>>>,
    #[serde(flatten)]
    attrs: BTreeMap<String, AttrValue>,
}

impl Node {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn branch(name: impl Into<String>, children: impl IntoIterator<Item = Self>) -> Self {
        Self {
            name: name.into(),
            children: Some(children.into_iter().map(Arc::new).collect()),
            attrs: BTreeMap::new(),
        }
    }

    /// Builder-style attribute for constructing input trees.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Children in order; `None` for a leaf.
    pub fn children(&self) -> Option<&[Arc<Self>]> {
        self.children.as_deref()
    }

    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub const fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    /// First child named `name`. Duplicate sibling names resolve to the
    /// earliest one.
    pub fn child(&self, name: &str) -> Option<&Arc<Self>> {
        self.children.as_ref()?.iter().find(|c| c.name == name)
    }

    pub(super) fn set_children(&mut self, children: Vec<Arc<Self>>) {
        self.children = Some(children);
    }

    pub(super) fn attrs_mut(&mut self) -> &mut BTreeMap<String, AttrValue> {
        &mut self.attrs
    }
}

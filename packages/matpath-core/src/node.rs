use std::cmp::Ordering;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::NodeId;

/// Application payload carried on a record. The tree never interprets it, except when a caller
/// asks to order by one of its keys.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A single attribute value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttrValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    fn rank(&self) -> u8 {
        match self {
            AttrValue::Null => 0,
            AttrValue::Bool(_) => 1,
            AttrValue::Integer(_) | AttrValue::Float(_) => 2,
            AttrValue::Text(_) => 3,
        }
    }

    /// Total "natural" ordering: null < bool < number < text, numbers compared by value.
    pub fn cmp_natural(&self, other: &AttrValue) -> Ordering {
        match (self, other) {
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a.cmp(b),
            (AttrValue::Integer(a), AttrValue::Integer(b)) => a.cmp(b),
            (AttrValue::Integer(a), AttrValue::Float(b)) => (*a as f64).total_cmp(b),
            (AttrValue::Float(a), AttrValue::Integer(b)) => a.total_cmp(&(*b as f64)),
            (AttrValue::Float(a), AttrValue::Float(b)) => a.total_cmp(b),
            (AttrValue::Text(a), AttrValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Integer(value.into())
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// A record as seen by the tree: identity, materialized path, and opaque attributes.
///
/// `id` is `None` until the record store has persisted it. `path` is `None` between the store
/// creating the row and the tree assigning its path. The path is not settable from outside the
/// crate; it only changes through tree mutations (or a store adapter loading a row).
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    id: Option<NodeId>,
    path: Option<String>,
    pub attributes: Attributes,
}

impl Node {
    /// A transient record, not yet known to any store.
    pub fn new(attributes: Attributes) -> Self {
        Self {
            id: None,
            path: None,
            attributes,
        }
    }

    /// Rebuild a persisted record. Intended for store adapters mapping rows back into nodes.
    pub fn from_parts(id: NodeId, path: Option<String>, attributes: Attributes) -> Self {
        Self {
            id: Some(id),
            path,
            attributes,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn is_transient(&self) -> bool {
        self.id.is_none()
    }

    pub fn require_id(&self) -> Result<NodeId> {
        self.id
            .ok_or_else(|| Error::NotFound("node has not been persisted".into()))
    }

    pub fn require_path(&self) -> Result<&str> {
        match (&self.path, self.id) {
            (Some(p), _) => Ok(p),
            (None, Some(id)) => Err(Error::InvalidPath(format!("node {id} has no path"))),
            (None, None) => Err(Error::InvalidPath("transient node has no path".into())),
        }
    }

    /// Two handles refer to the same stored record.
    pub fn same_record(&self, other: &Node) -> bool {
        self.id.is_some() && self.id == other.id
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = Some(path);
    }

    pub(crate) fn replace_path(&mut self, path: Option<String>) {
        self.path = path;
    }
}

/// Convenience for building attribute maps in tests and callers.
pub fn attrs<K, V, I>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttrValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order_ranks_types_and_compares_numbers_by_value() {
        assert_eq!(
            AttrValue::Null.cmp_natural(&AttrValue::Bool(false)),
            Ordering::Less
        );
        assert_eq!(
            AttrValue::Integer(2).cmp_natural(&AttrValue::Float(1.5)),
            Ordering::Greater
        );
        assert_eq!(
            AttrValue::Integer(10).cmp_natural(&AttrValue::Text("1".into())),
            Ordering::Less
        );
    }

    #[test]
    fn require_path_reports_missing_path() {
        let node = Node::from_parts(NodeId(4), None, Attributes::new());
        assert!(matches!(node.require_path(), Err(Error::InvalidPath(_))));
        assert!(Node::default().require_id().is_err());
    }
}

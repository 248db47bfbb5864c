use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::node::{Attributes, Node};
use crate::ordering::{compare_attribute, Column, OrderBy};
use crate::path::{self, SEPARATOR};

/// Row filters the tree needs from a record store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    /// Path has no separator.
    Roots,
    /// Path is exactly `prefix || id`: one segment below `prefix`, which ends in the separator.
    DirectChild(String),
    /// Path matches a `LIKE` pattern made of a literal prefix and a trailing `%`.
    PathLike(String),
    IdIn(Vec<NodeId>),
}

impl Predicate {
    /// Reference semantics, shared by in-memory stores and tests.
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Predicate::Roots => node.path().is_some_and(|p| !p.contains(SEPARATOR)),
            Predicate::DirectChild(prefix) => match (node.path(), node.id()) {
                (Some(p), Some(id)) => p
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest == id.to_string()),
                _ => false,
            },
            Predicate::PathLike(pattern) => node.path().is_some_and(|p| match pattern.strip_suffix('%') {
                Some(prefix) => p.starts_with(prefix),
                None => p == pattern,
            }),
            Predicate::IdIn(ids) => node.id().is_some_and(|id| ids.contains(&id)),
        }
    }
}

/// Bulk path rewrite: for every matching row, `old_prefix` is replaced by `new_prefix`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathRewrite {
    pub old_prefix: String,
    pub new_prefix: String,
}

impl PathRewrite {
    pub fn apply(&self, old_path: &str) -> Result<String> {
        path::rewrite_prefix(old_path, &self.old_prefix, &self.new_prefix)
    }
}

/// Persistent record store the tree runs against.
///
/// Implementations own identity assignment and persistence. Everything here is synchronous;
/// a call either completes or fails.
pub trait RecordStore {
    /// Persist a new row and assign its id. The returned node has no path yet.
    fn create(&mut self, attributes: Attributes) -> Result<Node>;
    fn find_by_id(&self, id: NodeId) -> Result<Option<Node>>;
    fn find_where(&self, predicate: &Predicate, order: Option<&OrderBy>) -> Result<Vec<Node>>;
    fn count_where(&self, predicate: &Predicate) -> Result<u64>;
    /// Persist the current path and attributes of one existing row.
    fn update(&mut self, node: &Node) -> Result<()>;
    /// Rewrite the path of every matching row in one step. Returns the number of rows touched.
    fn bulk_update(&mut self, predicate: &Predicate, rewrite: &PathRewrite) -> Result<u64>;
    fn delete_where(&mut self, predicate: &Predicate) -> Result<u64>;

    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    fn find_by_ids(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_where(&Predicate::IdIn(ids.to_vec()), None)
    }

    /// Run `block` inside a transaction: commit when it returns `Ok`, roll back when it returns
    /// an error or panics. Errors from the block are returned unchanged; a failed commit is
    /// reported as [`Error::Transaction`].
    fn with_transaction<T, F>(&mut self, block: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.begin()?;
        match panic::catch_unwind(AssertUnwindSafe(|| block(&mut *self))) {
            Ok(Ok(value)) => match self.commit() {
                Ok(()) => Ok(value),
                Err(e) => {
                    if let Err(rb) = self.rollback() {
                        tracing::error!(error = %rb, "rollback after failed commit also failed");
                    }
                    Err(Error::Transaction(e.to_string()))
                }
            },
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "rolling back transaction");
                if let Err(rb) = self.rollback() {
                    tracing::error!(error = %rb, "rollback failed");
                }
                Err(e)
            }
            Err(payload) => {
                if let Err(rb) = self.rollback() {
                    tracing::error!(error = %rb, "rollback after panic failed");
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

/// In-memory `RecordStore` for tests and prototyping. Transactions snapshot the row set.
#[derive(Default)]
pub struct MemoryStore {
    rows: BTreeMap<NodeId, Node>,
    last_id: u64,
    savepoints: Vec<BTreeMap<NodeId, Node>>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn in_transaction(&self) -> bool {
        !self.savepoints.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn create(&mut self, attributes: Attributes) -> Result<Node> {
        self.last_id += 1;
        let node = Node::from_parts(NodeId(self.last_id), None, attributes);
        self.rows.insert(NodeId(self.last_id), node.clone());
        Ok(node)
    }

    fn find_by_id(&self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn find_where(&self, predicate: &Predicate, order: Option<&OrderBy>) -> Result<Vec<Node>> {
        let mut found: Vec<Node> = self
            .rows
            .values()
            .filter(|n| predicate.matches(n))
            .cloned()
            .collect();
        if let Some(order) = order {
            // Store-native ordering: paths compare as plain strings, like a SQL column would.
            found.sort_by(|a, b| {
                let ord = match &order.column {
                    Column::Path => a.path().cmp(&b.path()),
                    Column::Id => a.id().cmp(&b.id()),
                    Column::Attribute(name) => {
                        compare_attribute(a.attribute(name), b.attribute(name))
                    }
                };
                order.direction.apply(ord)
            });
        }
        Ok(found)
    }

    fn count_where(&self, predicate: &Predicate) -> Result<u64> {
        Ok(self.rows.values().filter(|n| predicate.matches(n)).count() as u64)
    }

    fn update(&mut self, node: &Node) -> Result<()> {
        let id = node.require_id()?;
        let row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("node {id}")))?;
        *row = node.clone();
        Ok(())
    }

    fn bulk_update(&mut self, predicate: &Predicate, rewrite: &PathRewrite) -> Result<u64> {
        // Compute every new path before touching a row so a bad rewrite leaves nothing half-done.
        let mut rewritten = Vec::new();
        for (id, node) in &self.rows {
            if predicate.matches(node) {
                rewritten.push((*id, rewrite.apply(node.require_path()?)?));
            }
        }
        let count = rewritten.len() as u64;
        for (id, new_path) in rewritten {
            if let Some(row) = self.rows.get_mut(&id) {
                row.set_path(new_path);
            }
        }
        Ok(count)
    }

    fn delete_where(&mut self, predicate: &Predicate) -> Result<u64> {
        let before = self.rows.len();
        self.rows.retain(|_, n| !predicate.matches(n));
        Ok((before - self.rows.len()) as u64)
    }

    fn begin(&mut self) -> Result<()> {
        self.savepoints.push(self.rows.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.savepoints
            .pop()
            .map(|_| ())
            .ok_or_else(|| Error::Transaction("commit without an open transaction".into()))
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self
            .savepoints
            .pop()
            .ok_or_else(|| Error::Transaction("rollback without an open transaction".into()))?;
        self.rows = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::attrs;

    fn stored(store: &mut MemoryStore, path: &str) -> Node {
        let mut node = store.create(Attributes::new()).unwrap();
        node.set_path(path.to_string());
        store.update(&node).unwrap();
        node
    }

    #[test]
    fn direct_child_predicate_matches_one_level_only() {
        let mut store = MemoryStore::default();
        stored(&mut store, "1");
        stored(&mut store, "1.2");
        stored(&mut store, "1.2.3");
        let pred = Predicate::DirectChild("1.".into());
        let found = store.find_where(&pred, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path(), Some("1.2"));
        assert_eq!(store.count_where(&Predicate::Roots).unwrap(), 1);
    }

    #[test]
    fn path_like_respects_separator() {
        let pred = Predicate::PathLike("1.2.%".into());
        let hit = Node::from_parts(NodeId(7), Some("1.2.7".into()), Attributes::new());
        let miss = Node::from_parts(NodeId(22), Some("1.22".into()), Attributes::new());
        assert!(pred.matches(&hit));
        assert!(!pred.matches(&miss));
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let mut store = MemoryStore::default();
        store.create(attrs([("name", "kept")])).unwrap();
        let res: Result<()> = store.with_transaction(|s| {
            s.delete_where(&Predicate::IdIn(vec![NodeId(1)]))?;
            Err(Error::Storage("boom".into()))
        });
        assert!(matches!(res, Err(Error::Storage(_))));
        assert_eq!(store.len(), 1);
        assert!(!store.in_transaction());
    }

    #[test]
    fn transaction_rolls_back_on_panic() {
        let mut store = MemoryStore::default();
        store.create(Attributes::new()).unwrap();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = store.with_transaction(|s| -> Result<()> {
                s.delete_where(&Predicate::IdIn(vec![NodeId(1)]))?;
                panic!("block blew up");
            });
        }));
        assert!(outcome.is_err());
        assert_eq!(store.len(), 1);
        assert!(!store.in_transaction());
    }

    #[test]
    fn update_of_unknown_row_is_not_found() {
        let mut store = MemoryStore::default();
        let ghost = Node::from_parts(NodeId(9), Some("9".into()), Attributes::new());
        assert!(matches!(store.update(&ghost), Err(Error::NotFound(_))));
    }
}

use crate::config::TreeConfig;
use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::node::Node;
use crate::ordering::{self, Column, Direction, OrderBy};
use crate::path;
use crate::traits::{Predicate, RecordStore};
use crate::virtual_tree::VirtualTree;

/// Materialized-path tree over a record store.
///
/// Reads turn a node's path into store predicates and, when ordering by path, re-sort the rows
/// client side with numeric segment comparison. Mutations live in `mutation.rs`.
pub struct MaterializedPathTree<S>
where
    S: RecordStore,
{
    pub(crate) store: S,
    config: TreeConfig,
}

impl<S> MaterializedPathTree<S>
where
    S: RecordStore,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, TreeConfig::default())
    }

    pub fn with_config(store: S, config: TreeConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Resolve a column name (e.g. from a request) against this tree's path column.
    pub fn column(&self, name: &str) -> Column {
        Column::parse(name, &self.config)
    }

    fn fetch_ordered(&self, predicate: &Predicate, order: &OrderBy) -> Result<Vec<Node>> {
        let rows = if order.is_path() {
            let mut rows = self.store.find_where(predicate, None)?;
            ordering::sort_by_path(&mut rows, order.direction)?;
            rows
        } else {
            self.store.find_where(predicate, Some(order))?
        };
        tracing::trace!(?predicate, ?order, rows = rows.len(), "fetched rows");
        Ok(rows)
    }

    /// Every node whose path has no separator.
    pub fn roots(&self, order: &OrderBy) -> Result<Vec<Node>> {
        self.fetch_ordered(&Predicate::Roots, order)
    }

    /// First of [`roots`](Self::roots).
    pub fn root(&self, order: &OrderBy) -> Result<Option<Node>> {
        Ok(self.roots(order)?.into_iter().next())
    }

    pub fn children(&self, node: &Node, order: &OrderBy) -> Result<Vec<Node>> {
        let prefix = path::child_prefix(node.require_path()?)?;
        self.fetch_ordered(&Predicate::DirectChild(prefix), order)
    }

    pub fn descendants(&self, node: &Node, order: &OrderBy) -> Result<Vec<Node>> {
        let pattern = path::descendant_prefix(node.require_path()?)?;
        self.fetch_ordered(&Predicate::PathLike(pattern), order)
    }

    /// `None` for a root. A parent id that is missing from the store is `NotFound`.
    pub fn parent(&self, node: &Node) -> Result<Option<Node>> {
        let ids = path::ancestor_ids_inclusive(node.require_path()?)?;
        if ids.len() < 2 {
            return Ok(None);
        }
        let parent_id = ids[ids.len() - 2];
        self.store
            .find_by_id(parent_id)?
            .map(Some)
            .ok_or_else(|| Error::NotFound(format!("parent {parent_id} of {}", describe(node))))
    }

    /// The node and all its ancestors, fetched in one query and returned root first.
    pub fn self_and_ancestors(&self, node: &Node) -> Result<Vec<Node>> {
        let ids = path::ancestor_ids_inclusive(node.require_path()?)?;
        let mut rows = self.store.find_by_ids(&ids)?;
        rows.sort_by_key(|n| n.id().and_then(|id| ids.iter().position(|x| *x == id)));
        Ok(rows)
    }

    pub fn ancestors(&self, node: &Node) -> Result<Vec<Node>> {
        let mut rows = self.self_and_ancestors(node)?;
        rows.retain(|n| !n.same_record(node));
        Ok(rows)
    }

    /// Children of the node's parent. A root has no siblings concept: `NotFound`.
    pub fn self_and_siblings(&self, node: &Node, order: &OrderBy) -> Result<Vec<Node>> {
        let parent = self
            .parent(node)?
            .ok_or_else(|| Error::NotFound(format!("{} is a root and has no parent", describe(node))))?;
        self.children(&parent, order)
    }

    pub fn siblings(&self, node: &Node, order: &OrderBy) -> Result<Vec<Node>> {
        let mut rows = self.self_and_siblings(node, order)?;
        rows.retain(|n| !n.same_record(node));
        Ok(rows)
    }

    /// The node followed by its descendants.
    pub fn full_set(&self, node: &Node, order: &OrderBy) -> Result<Vec<Node>> {
        let mut rows = vec![node.clone()];
        rows.extend(self.descendants(node, order)?);
        Ok(rows)
    }

    pub fn children_count(&self, node: &Node) -> Result<u64> {
        let prefix = path::child_prefix(node.require_path()?)?;
        self.store.count_where(&Predicate::DirectChild(prefix))
    }

    pub fn level(&self, node: &Node) -> Result<usize> {
        path::level(node.require_path()?)
    }

    pub fn is_root(&self, node: &Node) -> Result<bool> {
        path::is_root(node.require_path()?)
    }

    /// Whether the path ends in the node's own id below at least one ancestor. Every
    /// well-formed non-root row satisfies this; it exists to validate data loaded from elsewhere.
    pub fn is_child(&self, node: &Node) -> Result<bool> {
        path::is_child_of_id(node.require_path()?, node.require_id()?)
    }

    /// The root of the tree the node belongs to (the node itself when it is a root).
    pub fn root_of(&self, node: &Node) -> Result<Node> {
        let ids = path::ancestor_ids_inclusive(node.require_path()?)?;
        if ids.len() == 1 {
            return Ok(node.clone());
        }
        let root_id: NodeId = ids[0];
        self.store
            .find_by_id(root_id)?
            .ok_or_else(|| Error::NotFound(format!("root {root_id} of {}", describe(node))))
    }

    /// Sort any list of nodes by a named column of this tree.
    pub fn sort_list_by(&self, list: &[Node], column: &str, direction: Direction) -> Result<Vec<Node>> {
        ordering::sort_list_by(list, &self.column(column), direction)
    }

    /// Fetch the subtree under `root` once and link it up in memory.
    ///
    /// Descendants whose parent is not reachable from `root` (left behind by a non-cascading
    /// move) are skipped and reported through [`VirtualTree::orphans`].
    pub fn build_tree(&self, root: &Node) -> Result<VirtualTree> {
        let descendants = self.descendants(root, &OrderBy::default())?;
        let mut tree = VirtualTree::new(root.clone())?;
        let top = tree.root();
        for descendant in descendants {
            tree.add_or_orphan(top, descendant)?;
        }
        if !tree.orphans().is_empty() {
            tracing::warn!(
                root = %describe(root),
                orphans = tree.orphans().len(),
                "descendants without a reachable parent were left out of the virtual tree"
            );
        }
        Ok(tree)
    }
}

pub(crate) fn describe(node: &Node) -> String {
    match (node.id(), node.path()) {
        (Some(id), Some(p)) => format!("node {id} ({p})"),
        (Some(id), None) => format!("node {id}"),
        _ => "transient node".to_string(),
    }
}

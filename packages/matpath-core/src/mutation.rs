use crate::error::{Error, Result};
use crate::node::{Attributes, Node};
use crate::path;
use crate::traits::{PathRewrite, Predicate, RecordStore};
use crate::tree::{describe, MaterializedPathTree};

/// Whether a move carries the node's existing descendants along.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cascade {
    /// Rewrite every descendant path in the same transaction as the move.
    Include,
    /// Move the node alone. Its descendants keep their old paths and no longer have a
    /// reachable parent; [`MoveReport::dangling_descendants`] says how many.
    Exclude,
}

/// Outcome of [`MaterializedPathTree::move_to_child_of`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MoveReport {
    pub old_path: Option<String>,
    pub new_path: String,
    pub rewritten_descendants: u64,
    pub dangling_descendants: u64,
}

impl MoveReport {
    pub fn left_dangling(&self) -> bool {
        self.dangling_descendants > 0
    }
}

/// Give a transient node an id; persisted nodes are returned as-is.
fn persisted<S: RecordStore>(store: &mut S, node: &Node) -> Result<Node> {
    if !node.is_transient() {
        return Ok(node.clone());
    }
    let created = store.create(node.attributes.clone())?;
    tracing::debug!(id = ?created.id(), "persisted transient node");
    Ok(created)
}

impl<S> MaterializedPathTree<S>
where
    S: RecordStore,
{
    /// Create a row and make it a root (`path = id`). Both steps share one transaction.
    pub fn create_root(&mut self, attributes: Attributes) -> Result<Node> {
        let node = self.store.with_transaction(|store| {
            let mut node = store.create(attributes)?;
            node.set_path(path::root_path(node.require_id()?));
            store.update(&node)?;
            Ok(node)
        })?;
        tracing::debug!(node = %describe(&node), "created root");
        Ok(node)
    }

    /// Make the node a root. Existing descendants are not touched; callers moving a populated
    /// subtree should use [`move_to_child_of`](Self::move_to_child_of) with cascading instead.
    pub fn save_as_root(&mut self, node: &mut Node) -> Result<()> {
        let rooted = self.store.with_transaction(|store| {
            let mut rooted = persisted(store, node)?;
            rooted.set_path(path::root_path(rooted.require_id()?));
            store.update(&rooted)?;
            Ok(rooted)
        })?;
        tracing::debug!(node = %describe(&rooted), "saved as root");
        *node = rooted;
        Ok(())
    }

    /// Re-parent `node` under `new_parent`.
    ///
    /// Both nodes are refreshed from the store first. Moving a node under itself or one of its
    /// own descendants is rejected with [`Error::Cycle`] before anything is written. With
    /// [`Cascade::Include`] every descendant path is rewritten by a single bulk update; that
    /// update and the node's own save commit or roll back together. A transient `node` is
    /// persisted first; its path only changes once the transaction has committed.
    pub fn move_to_child_of(
        &mut self,
        node: &mut Node,
        new_parent: &mut Node,
        cascade: Cascade,
    ) -> Result<MoveReport> {
        let parent_id = new_parent.require_id()?;
        let fresh_parent = self
            .store
            .find_by_id(parent_id)?
            .ok_or_else(|| Error::NotFound(format!("new parent {parent_id}")))?;
        let parent_path = fresh_parent.require_path()?.to_string();

        if node.is_transient() {
            *node = persisted(&mut self.store, node)?;
        }
        let id = node.require_id()?;
        let stored = self
            .store
            .find_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("node {id}")))?;
        // Keep the caller's attributes; the stored path is authoritative.
        let mut moving = node.clone();
        moving.replace_path(stored.path().map(str::to_string));
        *new_parent = fresh_parent;

        if path::ancestor_ids_inclusive(&parent_path)?.contains(&id) {
            return Err(Error::Cycle {
                node: id,
                new_parent: parent_id,
            });
        }

        let old_path = moving.path().map(str::to_string);
        let new_path = path::compose(&parent_path, id)?;
        moving.set_path(new_path.clone());

        let (rewritten, dangling) = self.store.with_transaction(|store| {
            let mut rewritten = 0;
            let mut dangling = 0;
            if let Some(old) = &old_path {
                let under_old = Predicate::PathLike(path::descendant_prefix(old)?);
                match cascade {
                    Cascade::Include => {
                        let rewrite = PathRewrite {
                            old_prefix: old.clone(),
                            new_prefix: new_path.clone(),
                        };
                        rewritten = store.bulk_update(&under_old, &rewrite)?;
                    }
                    Cascade::Exclude => dangling = store.count_where(&under_old)?,
                }
            }
            store.update(&moving)?;
            Ok((rewritten, dangling))
        })?;

        if dangling > 0 {
            tracing::warn!(
                node = %id,
                old_path = old_path.as_deref().unwrap_or_default(),
                dangling,
                "moved without descendants; their paths still point at the old location"
            );
        }
        tracing::debug!(node = %id, new_path = %new_path, rewritten, "moved node");

        *node = moving;
        Ok(MoveReport {
            old_path,
            new_path,
            rewritten_descendants: rewritten,
            dangling_descendants: dangling,
        })
    }

    /// Delete every row below the node (never a sibling sharing a numeric prefix), then
    /// re-save the node itself. Returns the number of deleted rows.
    pub fn destroy_descendants(&mut self, node: &Node) -> Result<u64> {
        let pattern = path::descendant_prefix(node.require_path()?)?;
        let deleted = self.store.with_transaction(|store| {
            let deleted = store.delete_where(&Predicate::PathLike(pattern))?;
            store.update(node)?;
            Ok(deleted)
        })?;
        tracing::debug!(node = %describe(node), deleted, "destroyed descendants");
        Ok(deleted)
    }
}

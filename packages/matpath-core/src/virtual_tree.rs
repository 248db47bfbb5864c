//! In-memory parent/children view over a flat set of already-fetched nodes.
//!
//! Nodes live in an arena and link to each other by index, so there are no ownership cycles
//! between parents and children. The structure is ephemeral: it is never written back.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::path;
use crate::tree::describe;

/// Index of a node inside one [`VirtualTree`]. Meaningless for any other tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct VirtualNodeId(usize);

#[derive(Clone, Debug)]
struct Slot {
    node: Node,
    // `None` for nodes attached by hand before they had a path.
    level: Option<usize>,
    parent: Option<VirtualNodeId>,
    children: Vec<VirtualNodeId>,
}

#[derive(Clone, Debug)]
pub struct VirtualTree {
    slots: Vec<Slot>,
    orphans: Vec<Node>,
}

impl VirtualTree {
    /// A tree holding only `root`, which must carry a path.
    pub fn new(root: Node) -> Result<Self> {
        let level = path::level(root.require_path()?)?;
        Ok(Self {
            slots: vec![Slot {
                node: root,
                level: Some(level),
                parent: None,
                children: Vec::new(),
            }],
            orphans: Vec::new(),
        })
    }

    /// Build from a root and its descendants in one go. Fails on the first descendant that
    /// cannot be attached.
    pub fn from_descendants<I>(root: Node, descendants: I) -> Result<Self>
    where
        I: IntoIterator<Item = Node>,
    {
        let mut tree = Self::new(root)?;
        let top = tree.root();
        for node in descendants {
            tree.add_to_tree(top, node)?;
        }
        Ok(tree)
    }

    pub fn root(&self) -> VirtualNodeId {
        VirtualNodeId(0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn node(&self, id: VirtualNodeId) -> Option<&Node> {
        self.slots.get(id.0).map(|s| &s.node)
    }

    pub fn parent(&self, id: VirtualNodeId) -> Option<VirtualNodeId> {
        self.slots.get(id.0).and_then(|s| s.parent)
    }

    pub fn children(&self, id: VirtualNodeId) -> &[VirtualNodeId] {
        self.slots
            .get(id.0)
            .map(|s| s.children.as_slice())
            .unwrap_or_default()
    }

    /// Nodes `build_tree` could not attach because no ancestor was reachable.
    pub fn orphans(&self) -> &[Node] {
        &self.orphans
    }

    fn slot(&self, id: VirtualNodeId) -> Result<&Slot> {
        self.slots
            .get(id.0)
            .ok_or_else(|| Error::NotFound(format!("virtual node #{}", id.0)))
    }

    /// Append `element` to `parent`'s child list as-is. No path checks are made; use
    /// [`add_to_tree`](Self::add_to_tree) to place a node by its path.
    pub fn add_child(&mut self, parent: VirtualNodeId, element: Node) -> Result<VirtualNodeId> {
        self.slot(parent)?;
        let level = element.path().map(path::level).transpose()?;
        let id = VirtualNodeId(self.slots.len());
        self.slots.push(Slot {
            node: element,
            level,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.slots[parent.0].children.push(id);
        Ok(id)
    }

    /// Find where `child` belongs among `candidates` and their already-attached descendants.
    ///
    /// Candidates are scanned in order and the first structural match wins: a candidate one
    /// level above `child` whose path prefixes it is the parent; a candidate that prefixes it
    /// from further up is descended into. `None` means no candidate's subtree can hold `child`.
    pub fn find_parent(
        &self,
        candidates: &[VirtualNodeId],
        child: &Node,
    ) -> Result<Option<VirtualNodeId>> {
        let child_path = child.require_path()?;
        let child_level = path::level(child_path)?;
        let mut current = candidates;
        'descend: loop {
            for &candidate in current {
                let slot = self.slot(candidate)?;
                let (Some(candidate_path), Some(level)) = (slot.node.path(), slot.level) else {
                    continue;
                };
                if !path::is_prefix_of(candidate_path, child_path) {
                    continue;
                }
                if level + 1 == child_level {
                    return Ok(Some(candidate));
                }
                current = &slot.children;
                continue 'descend;
            }
            return Ok(None);
        }
    }

    /// Place `element` under `root` according to its path.
    ///
    /// Fails with `NotFound` when no node in `root`'s subtree can be its parent; the element is
    /// never attached to `root` as a fallback.
    pub fn add_to_tree(&mut self, root: VirtualNodeId, element: Node) -> Result<VirtualNodeId> {
        let (root_level, root_path, candidates) = {
            let slot = self.slot(root)?;
            (
                slot.level,
                slot.node.require_path()?.to_string(),
                slot.children.clone(),
            )
        };
        let element_level = path::level(element.require_path()?)?;

        if root_level.map(|l| l + 1) == Some(element_level)
            && path::is_prefix_of(&root_path, element.require_path()?)
        {
            return self.add_child(root, element);
        }
        match self.find_parent(&candidates, &element)? {
            Some(parent) => self.add_child(parent, element),
            None => Err(Error::NotFound(format!(
                "no parent for {} below {root_path}",
                describe(&element)
            ))),
        }
    }

    pub(crate) fn add_or_orphan(&mut self, root: VirtualNodeId, element: Node) -> Result<()> {
        match self.add_to_tree(root, element.clone()) {
            Ok(_) => Ok(()),
            Err(Error::NotFound(reason)) => {
                tracing::debug!(%reason, "orphaned node");
                self.orphans.push(element);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Depth-first, pre-order walk in child order, starting at the root.
    pub fn iter(&self) -> impl Iterator<Item = (VirtualNodeId, &Node)> + '_ {
        let mut stack = vec![self.root()];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let slot = &self.slots[id.0];
            stack.extend(slot.children.iter().rev().copied());
            Some((id, &slot.node))
        })
    }

    /// Depth of `id` below the tree's root (0 for the root).
    pub fn depth(&self, id: VirtualNodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(p) = current {
            depth += 1;
            current = self.parent(p);
        }
        depth
    }
}

#![forbid(unsafe_code)]
//! Core of a materialized-path (path enumeration) tree.
//! Every record stores its full ancestor chain as a dotted id path (`"1.3.5"`), so ancestors,
//! descendants, children and siblings are single predicate queries and whole subtrees move
//! with one bulk rewrite. This crate stays independent of concrete storage engines: anything
//! that can satisfy [`RecordStore`] can back a tree.

pub mod config;
pub mod error;
pub mod ids;
pub mod mutation;
pub mod node;
pub mod ordering;
pub mod path;
pub mod traits;
pub mod tree;
pub mod virtual_tree;

pub use config::{TreeConfig, DEFAULT_PATH_COLUMN, RESERVED_COLUMNS};
pub use error::{Error, Result};
pub use ids::NodeId;
pub use mutation::{Cascade, MoveReport};
pub use node::{attrs, AttrValue, Attributes, Node};
pub use ordering::{
    compare_paths, sort_by_path, sort_list_by, sorted_by_path, Column, Direction, OrderBy,
};
pub use traits::{MemoryStore, PathRewrite, Predicate, RecordStore};
pub use tree::MaterializedPathTree;
pub use virtual_tree::{VirtualNodeId, VirtualTree};

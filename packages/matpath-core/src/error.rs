use thiserror::Error;

use crate::ids::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("cycle: cannot move node {node} under its own descendant {new_parent}")]
    Cycle { node: NodeId, new_parent: NodeId },
    #[error("transaction failed: {0}")]
    Transaction(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

//! SQLite-backed record store for materialized-path trees.
//! Rows live in one `nodes` table: an integer primary key, the path column (named by the
//! tree's [`TreeConfig`](matpath_core::TreeConfig)), and the attributes as a JSON object.
//! Tree mutations map onto SQLite savepoints, so they nest inside a caller's own transaction.

mod storage;
pub use storage::SqliteStore;

use matpath_core::{MaterializedPathTree, Result, TreeConfig};

/// Open (or create) a database file and wrap it in a tree using the same configuration.
pub fn open_tree(path: &str, config: TreeConfig) -> Result<MaterializedPathTree<SqliteStore>> {
    let store = SqliteStore::open(path, &config)?;
    Ok(MaterializedPathTree::with_config(store, config))
}

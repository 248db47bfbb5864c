//! Materialized path codec.
//!
//! A path is one or more positive integer segments joined by `.`, root first, ending with the
//! record's own id: `"1"` is a root, `"1.3.5"` is record 5 under 3 under 1.

use crate::error::{Error, Result};
use crate::ids::NodeId;

pub const SEPARATOR: char = '.';

/// Split a path into its integer segments.
pub fn segments(path: &str) -> Result<Vec<NodeId>> {
    if path.is_empty() {
        return Err(Error::InvalidPath("empty path".into()));
    }
    path.split(SEPARATOR).map(|seg| parse_segment(path, seg)).collect()
}

fn parse_segment(path: &str, seg: &str) -> Result<NodeId> {
    if seg.is_empty() {
        return Err(Error::InvalidPath(format!("`{path}` has an empty segment")));
    }
    // `u64::from_str` accepts a leading `+`; path segments are digits only.
    if !seg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPath(format!(
            "`{path}` has a non-numeric segment `{seg}`"
        )));
    }
    match seg.parse::<u64>() {
        Ok(0) => Err(Error::InvalidPath(format!("`{path}` has a zero segment"))),
        Ok(n) => Ok(NodeId(n)),
        Err(e) => Err(Error::InvalidPath(format!("`{path}`: segment `{seg}`: {e}"))),
    }
}

pub fn level(path: &str) -> Result<usize> {
    Ok(segments(path)?.len() - 1)
}

pub fn is_root(path: &str) -> Result<bool> {
    Ok(segments(path)?.len() == 1)
}

/// Whether `path` ends in `id` below at least one ancestor.
pub fn is_child_of_id(path: &str, id: NodeId) -> Result<bool> {
    let segs = segments(path)?;
    Ok(segs.len() >= 2 && segs.last() == Some(&id))
}

/// Every id on the path, root first, the path's own id last.
pub fn ancestor_ids_inclusive(path: &str) -> Result<Vec<NodeId>> {
    segments(path)
}

pub fn parent_path(path: &str) -> Result<Option<String>> {
    segments(path)?;
    Ok(path.rfind(SEPARATOR).map(|idx| path[..idx].to_string()))
}

/// Prefix shared by the paths of all direct children.
pub fn child_prefix(path: &str) -> Result<String> {
    segments(path)?;
    Ok(format!("{path}{SEPARATOR}"))
}

/// `LIKE`-style pattern matching every descendant at any depth.
///
/// The separator is part of the pattern: `"1.2.%"` must not match `"1.22"`.
pub fn descendant_prefix(path: &str) -> Result<String> {
    Ok(format!("{}%", child_prefix(path)?))
}

/// Replace the leading `old_prefix` of `old_path` with `new_prefix`.
pub fn rewrite_prefix(old_path: &str, old_prefix: &str, new_prefix: &str) -> Result<String> {
    let rest = old_path.strip_prefix(old_prefix).ok_or_else(|| {
        Error::InvalidPath(format!("`{old_path}` does not start with `{old_prefix}`"))
    })?;
    let rewritten = format!("{new_prefix}{rest}");
    segments(&rewritten)?;
    Ok(rewritten)
}

pub fn root_path(id: NodeId) -> String {
    id.to_string()
}

pub fn compose(parent_path: &str, id: NodeId) -> Result<String> {
    segments(parent_path)?;
    Ok(format!("{parent_path}{SEPARATOR}{id}"))
}

/// `ancestor` is a proper, segment-aligned prefix of `path`.
pub fn is_prefix_of(ancestor: &str, path: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path[ancestor.len()..].starts_with(SEPARATOR)
}

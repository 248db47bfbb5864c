use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::TreeConfig;
use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::node::{AttrValue, Node};
use crate::path::segments;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(Error::InvalidConfig(format!("unknown sort direction `{s}`")))
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        })
    }
}

/// What to order by. `Path` is whatever column the tree is configured to keep paths in.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Column {
    #[default]
    Path,
    Id,
    Attribute(String),
}

impl Column {
    /// Resolve a column name against the tree's configuration.
    pub fn parse(name: &str, config: &TreeConfig) -> Column {
        if name == config.path_column() {
            Column::Path
        } else if name == "id" {
            Column::Id
        } else {
            Column::Attribute(name.to_string())
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderBy {
    pub column: Column,
    pub direction: Direction,
}

impl OrderBy {
    pub fn path(direction: Direction) -> Self {
        Self {
            column: Column::Path,
            direction,
        }
    }

    pub fn id(direction: Direction) -> Self {
        Self {
            column: Column::Id,
            direction,
        }
    }

    pub fn attribute(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: Column::Attribute(name.into()),
            direction,
        }
    }

    pub fn is_path(&self) -> bool {
        self.column == Column::Path
    }
}

/// Numeric, segment-wise path comparison.
///
/// The first differing segment decides (flipped for `Desc`). When one path is a prefix of the
/// other the shorter path sorts first in both directions, so an ancestor always precedes its
/// own descendants.
pub fn compare_paths(a: &str, b: &str, direction: Direction) -> Result<Ordering> {
    Ok(compare_segments(&segments(a)?, &segments(b)?, direction))
}

pub(crate) fn compare_segments(a: &[NodeId], b: &[NodeId], direction: Direction) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            ord => return direction.apply(ord),
        }
    }
    a.len().cmp(&b.len())
}

/// Sort nodes in place by their paths. Every node must carry a well-formed path; on error the
/// input is left untouched.
pub fn sort_by_path(nodes: &mut Vec<Node>, direction: Direction) -> Result<()> {
    let keys = nodes
        .iter()
        .map(|n| segments(n.require_path()?))
        .collect::<Result<Vec<_>>>()?;
    let mut keyed: Vec<(Vec<NodeId>, Node)> = keys.into_iter().zip(std::mem::take(nodes)).collect();
    keyed.sort_by(|(a, _), (b, _)| compare_segments(a, b, direction));
    nodes.extend(keyed.into_iter().map(|(_, node)| node));
    Ok(())
}

/// Sorted copy; the input is not modified.
pub fn sorted_by_path(nodes: &[Node], direction: Direction) -> Result<Vec<Node>> {
    let mut out = nodes.to_vec();
    sort_by_path(&mut out, direction)?;
    Ok(out)
}

/// Sort a list by any column. Paths go through [`compare_paths`] semantics; text attributes
/// compare case-insensitively; everything else uses its natural order. Missing attributes
/// behave as null.
pub fn sort_list_by(list: &[Node], column: &Column, direction: Direction) -> Result<Vec<Node>> {
    let mut out = list.to_vec();
    match column {
        Column::Path => sort_by_path(&mut out, direction)?,
        Column::Id => out.sort_by(|a, b| direction.apply(a.id().cmp(&b.id()))),
        Column::Attribute(name) => out.sort_by(|a, b| {
            direction.apply(compare_attribute(a.attribute(name), b.attribute(name)))
        }),
    }
    Ok(out)
}

pub(crate) fn compare_attribute(a: Option<&AttrValue>, b: Option<&AttrValue>) -> Ordering {
    let null = AttrValue::Null;
    let a = a.unwrap_or(&null);
    let b = b.unwrap_or(&null);
    match (a.as_text(), b.as_text()) {
        (Some(x), Some(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        _ => a.cmp_natural(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Attributes;

    fn node(id: u64, path: &str) -> Node {
        Node::from_parts(NodeId(id), Some(path.to_string()), Attributes::new())
    }

    #[test]
    fn numeric_not_lexical() {
        assert_eq!(compare_paths("1.2", "1.10", Direction::Asc).unwrap(), Ordering::Less);
        assert_eq!(compare_paths("1.10", "1.2", Direction::Asc).unwrap(), Ordering::Greater);
        assert_eq!(compare_paths("1.10", "1.2", Direction::Desc).unwrap(), Ordering::Less);
    }

    #[test]
    fn ancestors_first_in_both_directions() {
        assert_eq!(compare_paths("1", "1.2", Direction::Asc).unwrap(), Ordering::Less);
        assert_eq!(compare_paths("1", "1.2", Direction::Desc).unwrap(), Ordering::Less);
        assert_eq!(compare_paths("1.2", "1", Direction::Desc).unwrap(), Ordering::Greater);
        assert_eq!(compare_paths("3.4", "3.4", Direction::Desc).unwrap(), Ordering::Equal);
    }

    #[test]
    fn malformed_paths_surface() {
        assert!(compare_paths("1.x", "1", Direction::Asc).is_err());
        let mut nodes = vec![node(1, "1"), Node::new(Attributes::new())];
        assert!(sort_by_path(&mut nodes, Direction::Asc).is_err());
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn descending_keeps_nesting() {
        let mut nodes = vec![
            node(2, "1.2"),
            node(10, "1.10"),
            node(1, "1"),
            node(5, "1.2.5"),
        ];
        sort_by_path(&mut nodes, Direction::Desc).unwrap();
        let paths: Vec<_> = nodes.iter().map(|n| n.path().unwrap()).collect();
        assert_eq!(paths, vec!["1", "1.10", "1.2", "1.2.5"]);
    }

    #[test]
    fn sorts_text_case_insensitively() {
        let list = vec![
            node(1, "1").with_attribute("name", "bravo"),
            node(2, "2").with_attribute("name", "Alpha"),
            node(3, "3"),
        ];
        let sorted =
            sort_list_by(&list, &Column::Attribute("name".into()), Direction::Asc).unwrap();
        let ids: Vec<_> = sorted.iter().map(|n| n.id().unwrap().0).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let sorted = sort_list_by(&list, &Column::Id, Direction::Desc).unwrap();
        let ids: Vec<_> = sorted.iter().map(|n| n.id().unwrap().0).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn direction_parses() {
        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn column_resolves_against_config() {
        let cfg = TreeConfig::new("lineage").unwrap();
        assert_eq!(Column::parse("lineage", &cfg), Column::Path);
        assert_eq!(Column::parse("id", &cfg), Column::Id);
        assert_eq!(Column::parse("path_string", &cfg), Column::Attribute("path_string".into()));
    }
}

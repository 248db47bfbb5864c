#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PATH_COLUMN: &str = "path_string";

/// Columns every store adapter keeps next to the path column.
pub const RESERVED_COLUMNS: &[&str] = &["id", "attributes"];

/// Per-tree configuration. The path column name is threaded into the tree facade and into store
/// adapters at construction time; there is no global default beyond `DEFAULT_PATH_COLUMN`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawTreeConfig"))]
pub struct TreeConfig {
    path_column: String,
}

impl TreeConfig {
    /// Adapters interpolate the column name into SQL, so only plain identifiers are accepted.
    pub fn new(path_column: impl Into<String>) -> Result<Self> {
        let path_column = path_column.into();
        validate_identifier(&path_column)?;
        if let Some(reserved) = RESERVED_COLUMNS
            .iter()
            .find(|r| path_column.eq_ignore_ascii_case(r))
        {
            return Err(Error::InvalidConfig(format!(
                "path column cannot reuse the reserved `{reserved}` column"
            )));
        }
        Ok(Self { path_column })
    }

    pub fn path_column(&self) -> &str {
        &self.path_column
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            path_column: DEFAULT_PATH_COLUMN.to_string(),
        }
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(default)]
struct RawTreeConfig {
    path_column: String,
}

#[cfg(feature = "serde")]
impl Default for RawTreeConfig {
    fn default() -> Self {
        Self {
            path_column: DEFAULT_PATH_COLUMN.to_string(),
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<RawTreeConfig> for TreeConfig {
    type Error = Error;

    fn try_from(raw: RawTreeConfig) -> Result<Self> {
        TreeConfig::new(raw.path_column)
    }
}

/// ASCII letter or underscore first, then letters, digits, underscores.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::InvalidConfig("identifier must not be empty".into()));
    };
    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::InvalidConfig(format!(
            "`{name}` is not a plain identifier"
        )));
    }
    Ok(())
}

//! Column names and table headers.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a normalized column name, in bytes.
pub const MAX_HEADER_LEN: usize = 127;

/// Prefix reserved for names the engine may use internally.
pub const RESERVED_PREFIX: &str = "__cleanroom";

/// A normalized column name.
///
/// Normalization trims surrounding whitespace and lower-cases the name, so
/// `" Email "` and `"email"` refer to the same column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnHeader(String);

impl ColumnHeader {
    /// Normalizes and validates a raw column name.
    pub fn new(raw: &str) -> Result<Self, Error> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(Error::InvalidHeader {
                header: raw.to_string(),
                reason: "column name is empty".into(),
            });
        }
        if normalized.len() > MAX_HEADER_LEN {
            return Err(Error::InvalidHeader {
                header: raw.to_string(),
                reason: format!(
                    "column name is {} bytes, maximum is {MAX_HEADER_LEN}",
                    normalized.len()
                ),
            });
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name collides with the reserved internal prefix.
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with(RESERVED_PREFIX)
    }
}

impl fmt::Display for ColumnHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ColumnHeader {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl TryFrom<&str> for ColumnHeader {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ColumnHeader> for String {
    fn from(h: ColumnHeader) -> Self {
        h.0
    }
}

/// The ordered column names of one side of a transform.
///
/// Adapters expose the header of the file they read or write; the engine
/// cross-checks it against the configured schema before any row is touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableHeader {
    columns: Vec<ColumnHeader>,
}

impl TableHeader {
    pub fn new(columns: Vec<ColumnHeader>) -> Self {
        Self { columns }
    }

    /// Builds a header from raw names, normalizing each.
    pub fn from_names<I, S>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = names
            .into_iter()
            .map(|n| ColumnHeader::new(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnHeader] {
        &self.columns
    }

    /// Position of the first column with this name.
    pub fn index_of(&self, header: &ColumnHeader) -> Option<usize> {
        self.columns.iter().position(|c| c == header)
    }

    /// Positions of every column with this name, in order.
    pub fn positions_of(&self, header: &ColumnHeader) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| *c == header)
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns the first name that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<&ColumnHeader> {
        self.columns
            .iter()
            .enumerate()
            .find(|(i, c)| self.columns[..*i].contains(c))
            .map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnHeader> {
        self.columns.iter()
    }
}

impl FromIterator<ColumnHeader> for TableHeader {
    fn from_iter<T: IntoIterator<Item = ColumnHeader>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

//! Microtiter plate well identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A well position such as `B07`: a row letter followed by a column label.
///
/// The column is kept verbatim (leading zeros included) because it is
/// written back out exactly as it appeared in the source file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WellId {
    row: char,
    column: String,
}

impl WellId {
    /// Parse a well label. The first character must be an ASCII letter and
    /// at least one column character must follow.
    pub fn parse(label: &str) -> Result<Self, ModelError> {
        let mut chars = label.chars();
        let row = chars.next().ok_or_else(|| ModelError::InvalidWell {
            well: label.to_string(),
            reason: "empty label",
        })?;
        if !row.is_ascii_alphabetic() {
            return Err(ModelError::InvalidWell {
                well: label.to_string(),
                reason: "row must be a letter",
            });
        }
        let column = chars.as_str();
        if column.is_empty() {
            return Err(ModelError::InvalidWell {
                well: label.to_string(),
                reason: "missing column",
            });
        }
        Ok(Self {
            row,
            column: column.to_string(),
        })
    }

    /// Row letter as it appeared in the label.
    pub fn row(&self) -> char {
        self.row
    }

    /// 1-based row number: `A`/`a` → 1, `B`/`b` → 2, ...
    pub fn row_number(&self) -> u32 {
        (self.row.to_ascii_lowercase() as u32) - ('a' as u32) + 1
    }

    /// Column label, verbatim.
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.column)
    }
}

impl FromStr for WellId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WellId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WellId> for String {
    fn from(value: WellId) -> Self {
        value.to_string()
    }
}

/// A well on a specific plate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WellKey {
    pub plate: String,
    pub well: WellId,
}

impl WellKey {
    pub fn new(plate: impl Into<String>, well: WellId) -> Self {
        Self {
            plate: plate.into(),
            well,
        }
    }

    /// File stem used for per-well outputs: `<plate>_<well>`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.plate, self.well)
    }
}

impl fmt::Display for WellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>/<{}>", self.plate, self.well)
    }
}

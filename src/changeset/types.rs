//! Change set types.
//!
//! A [`ChangeSet`] is the only value that crosses from resolution to
//! deployment. Its JSON form (an array of strings) is what the `resolve`
//! command prints and what `deploy --units` reads back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{FnshipError, Result};

/// Name of a deploy unit: one directory under the watched root, and the
/// name of the remote function it is deployed to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitName(String);

impl UnitName {
    /// Creates a unit name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or is not a single path segment.
    pub fn new(name: impl Into<String>) -> std::result::Result<Self, String> {
        let name = name.into();

        if name.is_empty() {
            return Err(String::from("Unit name cannot be empty"));
        }
        if name == "." || name == ".." {
            return Err(format!("Invalid unit name: {name}"));
        }
        if name.contains(['/', '\\']) {
            return Err(format!("Unit name must be a single path segment: {name}"));
        }
        if name.chars().any(char::is_control) {
            return Err(format!("Unit name contains control characters: {name:?}"));
        }

        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UnitName {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UnitName> for String {
    fn from(name: UnitName) -> Self {
        name.0
    }
}

impl AsRef<str> for UnitName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplicated set of changed units, always iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    units: BTreeSet<UnitName>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            units: BTreeSet::new(),
        }
    }

    /// Adds a unit. Returns false if it was already present.
    pub fn insert(&mut self, unit: UnitName) -> bool {
        self.units.insert(unit)
    }

    /// Returns true if the unit is in the set.
    #[must_use]
    pub fn contains(&self, unit: &UnitName) -> bool {
        self.units.contains(unit)
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterates units in name order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitName> {
        self.units.iter()
    }

    /// Unit names as plain strings, in name order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(UnitName::as_str).collect()
    }

    /// Serializes the set as a JSON array of strings.
    ///
    /// # Errors
    ///
    /// Returns an internal error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| FnshipError::internal(format!("Failed to serialize change set: {e}")))
    }

    /// Parses a JSON array of unit names.
    ///
    /// Duplicates collapse; order in the input does not matter.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the input is not an array of valid unit
    /// names. A malformed set means the producing step is broken.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FnshipError::internal(format!("Malformed change set JSON: {e}")))
    }
}

impl FromIterator<UnitName> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = UnitName>>(iter: I) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a UnitName;
    type IntoIter = std::collections::btree_set::Iter<'a, UnitName>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

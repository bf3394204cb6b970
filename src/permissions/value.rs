//! Permission values
//!
//! Each axis is an ordered enumeration. Greater values grant strictly more
//! than lower ones, which is what downgrade checks rely on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One dimension of a scope's permission value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Data access to a database or table
    DataAccess,
    /// Native (SQL) query editing on a database
    NativeQuery,
    /// Access to a collection
    Collection,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::DataAccess => write!(f, "data"),
            Axis::NativeQuery => write!(f, "native"),
            Axis::Collection => write!(f, "collection"),
        }
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "data" | "data_access" | "access" => Ok(Axis::DataAccess),
            "native" | "native_query" | "sql" => Ok(Axis::NativeQuery),
            "collection" | "collections" => Ok(Axis::Collection),
            other => Err(format!("unknown axis: {}", other)),
        }
    }
}

/// Data access levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAccess {
    #[default]
    NoAccess,
    /// Some, but not all, tables of a database are accessible
    Limited,
    Allowed,
}

/// Native query editing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeQuery {
    #[default]
    Disallowed,
    Allowed,
}

/// Collection access levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionAccess {
    #[default]
    NoAccess,
    View,
    Curate,
}

impl fmt::Display for DataAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataAccess::NoAccess => write!(f, "No access"),
            DataAccess::Limited => write!(f, "Limited"),
            DataAccess::Allowed => write!(f, "Allowed"),
        }
    }
}

impl fmt::Display for NativeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeQuery::Disallowed => write!(f, "No access"),
            NativeQuery::Allowed => write!(f, "Allowed"),
        }
    }
}

impl fmt::Display for CollectionAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionAccess::NoAccess => write!(f, "No access"),
            CollectionAccess::View => write!(f, "View"),
            CollectionAccess::Curate => write!(f, "Curate"),
        }
    }
}

/// A value on exactly one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "axis", content = "value", rename_all = "snake_case")]
pub enum PermissionValue {
    Data(DataAccess),
    Native(NativeQuery),
    Collection(CollectionAccess),
}

impl PermissionValue {
    /// The axis this value belongs to
    pub fn axis(&self) -> Axis {
        match self {
            PermissionValue::Data(_) => Axis::DataAccess,
            PermissionValue::Native(_) => Axis::NativeQuery,
            PermissionValue::Collection(_) => Axis::Collection,
        }
    }

    /// Position of the value inside its axis ordering
    pub fn rank(&self) -> u8 {
        match self {
            PermissionValue::Data(v) => *v as u8,
            PermissionValue::Native(v) => *v as u8,
            PermissionValue::Collection(v) => *v as u8,
        }
    }

    /// True if `self` grants less than `previous` on the same axis
    pub fn is_downgrade_from(&self, previous: &PermissionValue) -> bool {
        self.axis() == previous.axis() && self.rank() < previous.rank()
    }

    /// Parse a value for the given axis (CLI and config input)
    pub fn parse(axis: Axis, input: &str) -> Result<Self, String> {
        let normalized = input.trim().to_ascii_lowercase().replace(' ', "_").replace('-', "_");
        let value = match (axis, normalized.as_str()) {
            (Axis::DataAccess, "no_access" | "none") => PermissionValue::Data(DataAccess::NoAccess),
            (Axis::DataAccess, "limited") => PermissionValue::Data(DataAccess::Limited),
            (Axis::DataAccess, "allowed" | "all") => PermissionValue::Data(DataAccess::Allowed),
            (Axis::NativeQuery, "no_access" | "none" | "disallowed") => {
                PermissionValue::Native(NativeQuery::Disallowed)
            }
            (Axis::NativeQuery, "allowed" | "write") => PermissionValue::Native(NativeQuery::Allowed),
            (Axis::Collection, "no_access" | "none") => {
                PermissionValue::Collection(CollectionAccess::NoAccess)
            }
            (Axis::Collection, "view" | "read") => PermissionValue::Collection(CollectionAccess::View),
            (Axis::Collection, "curate" | "write") => {
                PermissionValue::Collection(CollectionAccess::Curate)
            }
            _ => return Err(format!("'{}' is not a valid {} permission", input, axis)),
        };
        Ok(value)
    }
}

impl fmt::Display for PermissionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionValue::Data(v) => v.fmt(f),
            PermissionValue::Native(v) => v.fmt(f),
            PermissionValue::Collection(v) => v.fmt(f),
        }
    }
}

impl From<DataAccess> for PermissionValue {
    fn from(value: DataAccess) -> Self {
        PermissionValue::Data(value)
    }
}

impl From<NativeQuery> for PermissionValue {
    fn from(value: NativeQuery) -> Self {
        PermissionValue::Native(value)
    }
}

impl From<CollectionAccess> for PermissionValue {
    fn from(value: CollectionAccess) -> Self {
        PermissionValue::Collection(value)
    }
}

/// The values a node holds, one slot per axis
///
/// Slots are `None` for axes that do not apply to the node's target kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataAccess>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<NativeQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionAccess>,
}

impl PermissionValues {
    /// Read one axis
    pub fn get(&self, axis: Axis) -> Option<PermissionValue> {
        match axis {
            Axis::DataAccess => self.data.map(PermissionValue::Data),
            Axis::NativeQuery => self.native.map(PermissionValue::Native),
            Axis::Collection => self.collection.map(PermissionValue::Collection),
        }
    }

    /// Write one axis
    pub fn set(&mut self, value: PermissionValue) {
        match value {
            PermissionValue::Data(v) => self.data = Some(v),
            PermissionValue::Native(v) => self.native = Some(v),
            PermissionValue::Collection(v) => self.collection = Some(v),
        }
    }

    /// Axes present in both value sets whose values differ
    pub fn changed_axes(&self, other: &PermissionValues) -> Vec<Axis> {
        [Axis::DataAccess, Axis::NativeQuery, Axis::Collection]
            .into_iter()
            .filter(|axis| self.get(*axis) != other.get(*axis))
            .collect()
    }
}

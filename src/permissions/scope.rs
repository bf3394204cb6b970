//! Scopes and groups
//!
//! A scope addresses one cell of the permission matrix: a group crossed with
//! a target (database, table or collection).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::Axis;

/// Identifier of a user group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user group as listed in the sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub member_count: u32,
    /// Administrators always hold the highest access and cannot be edited
    #[serde(default)]
    pub is_admin: bool,
}

impl Group {
    /// Create a regular group
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: GroupId(id),
            name: name.into(),
            member_count: 0,
            is_admin: false,
        }
    }

    /// Create the administrators group
    pub fn admin(id: u32, name: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(id, name)
        }
    }

    /// Set the member count
    pub fn with_members(mut self, count: u32) -> Self {
        self.member_count = count;
        self
    }

    /// Case-insensitive substring match used by the group search box
    pub fn matches_filter(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty() || self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Path from the hierarchy root to a target, one segment per level
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetPath(pub Vec<String>);

impl TargetPath {
    /// Build a path from segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a `/`-separated path
    pub fn parse(input: &str) -> Self {
        Self::new(input.split('/').filter(|s| !s.is_empty()))
    }

    /// Path with one more segment appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Last segment (the target's own id)
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Key used in serialized graphs
    pub fn key(&self) -> String {
        self.0.join("/")
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A single group x target permission cell
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub group: GroupId,
    pub path: TargetPath,
}

impl Scope {
    pub fn new(group: GroupId, path: TargetPath) -> Self {
        Self { group, path }
    }

    /// Shorthand for `Scope::new(GroupId(group), TargetPath::parse(path))`
    pub fn parse(group: u32, path: &str) -> Self {
        Self::new(GroupId(group), TargetPath::parse(path))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.path)
    }
}

/// What kind of object a target is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Database,
    Table,
    Collection,
}

impl TargetKind {
    /// Check if values on `axis` are meaningful for this kind
    pub fn supports(&self, axis: Axis) -> bool {
        match self {
            TargetKind::Database => matches!(axis, Axis::DataAccess | Axis::NativeQuery),
            TargetKind::Table => matches!(axis, Axis::DataAccess),
            TargetKind::Collection => matches!(axis, Axis::Collection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_filter() {
        let groups = [
            Group::admin(2, "Administrators"),
            Group::new(1, "All Users"),
            Group::new(3, "collection"),
            Group::new(4, "data"),
            Group::new(5, "nosql"),
            Group::new(6, "readonly"),
        ];

        let names: Vec<&str> = groups
            .iter()
            .filter(|g| g.matches_filter("a"))
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(names, vec!["Administrators", "All Users", "data", "readonly"]);

        assert!(groups.iter().all(|g| g.matches_filter("  ")));
    }

    #[test]
    fn test_target_path() {
        let path = TargetPath::parse("1/orders");
        assert_eq!(path.segments(), &["1".to_string(), "orders".to_string()]);
        assert_eq!(path.leaf(), Some("orders"));
        assert_eq!(TargetPath::parse("1").child("orders"), path);
        assert_eq!(path.key(), "1/orders");
    }

    #[test]
    fn test_scope_ordering() {
        let a = Scope::parse(1, "1/a");
        let b = Scope::parse(1, "1/b");
        let c = Scope::parse(2, "1");
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "1:1/a");
    }

    #[test]
    fn test_kind_supports() {
        assert!(TargetKind::Database.supports(Axis::NativeQuery));
        assert!(!TargetKind::Table.supports(Axis::NativeQuery));
        assert!(!TargetKind::Collection.supports(Axis::DataAccess));
    }
}

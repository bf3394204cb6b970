//! Permission matrix model
//!
//! This module holds the data side of the editor:
//! - `PermissionValue` - ordered values on the data, native-query and collection axes
//! - `Scope` - one group x target cell
//! - `PermissionTree` - arena of nodes with parent/child indices
//! - `PermissionGraph` - the serialized form loaded from and saved to a store
//!
//! ## Example
//!
//! ```rust,ignore
//! use permission_matrix::permissions::{PermissionGraph, Scope, Snapshot};
//!
//! let graph: PermissionGraph = serde_json::from_str(&json)?;
//! let tree = graph.to_tree()?;
//!
//! let db = Scope::parse(6, "1");
//! for table in tree.children_of(&db)? {
//!     println!("{:?}", tree.effective_data_access(table, Snapshot::Pending)?);
//! }
//! ```

mod graph;
mod scope;
mod tree;
mod value;

#[cfg(test)]
pub(crate) mod fixtures;

pub use graph::{PermissionGraph, TargetSpec};
pub use scope::{Group, GroupId, Scope, TargetKind, TargetPath};
pub use tree::{NodeId, PermissionNode, PermissionTree, Snapshot};
pub use value::{
    Axis, CollectionAccess, DataAccess, NativeQuery, PermissionValue, PermissionValues,
};

//! Diff summaries
//!
//! A `DiffSummary` is what gets persisted on save: one entry per changed
//! scope and axis, plus the per-group grant summary shown in the save dialog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::EditorResult;
use crate::permissions::{
    Axis, DataAccess, GroupId, NativeQuery, PermissionTree, PermissionValue, Scope, Snapshot,
    TargetKind,
};

/// One changed axis on one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub scope: Scope,
    pub old: PermissionValue,
    pub new: PermissionValue,
}

impl DiffEntry {
    pub fn axis(&self) -> Axis {
        self.new.axis()
    }

    pub fn is_downgrade(&self) -> bool {
        self.new.is_downgrade_from(&self.old)
    }
}

/// What a group gains on one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSummary {
    pub group: GroupId,
    pub group_name: String,
    pub database: Scope,
    pub database_name: String,
    /// Tables whose effective access became `Allowed`
    pub tables_granted: usize,
    /// Native query editing went from disallowed to allowed
    pub native_enabled: bool,
}

impl GrantSummary {
    /// Lines for the save dialog; either line may be absent
    pub fn messages(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.tables_granted > 0 {
            let noun = if self.tables_granted == 1 { "table" } else { "tables" };
            lines.push(format!(
                "{} will be given access to {} {} in {}.",
                self.group_name, self.tables_granted, noun, self.database_name
            ));
        }
        if self.native_enabled {
            lines.push(format!(
                "{} will now be able to write native queries for {}.",
                self.group_name, self.database_name
            ));
        }
        lines
    }
}

/// Everything a save would persist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub changes: Vec<DiffEntry>,
    #[serde(default)]
    pub grants: Vec<GrantSummary>,
}

impl DiffSummary {
    /// Compute the diff over `dirty` scopes of `tree`
    pub fn compute(tree: &PermissionTree, dirty: &BTreeSet<Scope>) -> EditorResult<Self> {
        let mut changes = Vec::new();
        let mut databases = BTreeSet::new();

        for scope in dirty {
            let node = tree.get_node(scope)?;
            for axis in node.original().changed_axes(node.current()) {
                if let (Some(old), Some(new)) = (node.original().get(axis), node.current().get(axis)) {
                    changes.push(DiffEntry {
                        scope: scope.clone(),
                        old,
                        new,
                    });
                }
            }

            match node.kind() {
                TargetKind::Database => {
                    databases.insert(scope.clone());
                }
                TargetKind::Table => {
                    if let Some(parent) = tree.parent_of(scope)? {
                        databases.insert(parent.clone());
                    }
                }
                TargetKind::Collection => {}
            }
        }

        let mut grants = Vec::new();
        for database in &databases {
            if let Some(summary) = grant_summary(tree, database)? {
                grants.push(summary);
            }
        }

        Ok(Self { changes, grants })
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed scope/axis pairs
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// All grant lines for the save dialog, in group/database order
    pub fn messages(&self) -> Vec<String> {
        self.grants.iter().flat_map(|g| g.messages()).collect()
    }
}

fn grant_summary(tree: &PermissionTree, database: &Scope) -> EditorResult<Option<GrantSummary>> {
    let node = tree.get_node(database)?;

    let mut tables_granted = 0;
    for table in tree.children_of(database)? {
        let before = tree.effective_data_access(table, Snapshot::Original)?;
        let after = tree.effective_data_access(table, Snapshot::Pending)?;
        if before != Some(DataAccess::Allowed) && after == Some(DataAccess::Allowed) {
            tables_granted += 1;
        }
    }

    let native_enabled = node.original().native != Some(NativeQuery::Allowed)
        && node.current().native == Some(NativeQuery::Allowed);

    if tables_granted == 0 && !native_enabled {
        return Ok(None);
    }

    let group_name = tree
        .group(database.group)
        .map(|g| g.name.clone())
        .unwrap_or_else(|| database.group.to_string());

    Ok(Some(GrantSummary {
        group: database.group,
        group_name,
        database: database.clone(),
        database_name: node.label().to_string(),
        tables_granted,
        native_enabled,
    }))
}

//! Confirmation policy
//!
//! Decides which transitions need a blocking confirmation and what the
//! dialog says. Requirements are plain data; rendering them is up to the
//! view layer.

use serde::{Deserialize, Serialize};

use crate::permissions::{DataAccess, NativeQuery, PermissionValue, TargetKind};
use crate::session::{DiffSummary, EditorConfig};

/// Why a confirmation is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationKind {
    /// An edit narrows data access or leaves a database partially accessible
    LimitDatabaseAccess,
    /// An edit grants native query editing
    AllowNativeQueries,
    /// Persisting the pending edits
    SavePermissions,
    /// Leaving the page with pending edits
    DiscardChanges,
}

/// A blocking confirmation the view layer has to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequirement {
    pub kind: ConfirmationKind,
    pub title: String,
    pub messages: Vec<String>,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl ConfirmationRequirement {
    fn new(kind: ConfirmationKind, title: &str, confirm_label: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            messages: Vec::new(),
            confirm_label: confirm_label.to_string(),
            cancel_label: "Cancel".to_string(),
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn limit_database_access() -> Self {
        Self::new(
            ConfirmationKind::LimitDatabaseAccess,
            "Change access to this database to limited?",
            "Change",
        )
    }

    pub fn allow_native_queries() -> Self {
        Self::new(
            ConfirmationKind::AllowNativeQueries,
            "Allow native query editing?",
            "Allow",
        )
        .with_message("This will also give this group unrestricted data access to this database.")
    }

    /// Save dialog listing what each group gains
    pub fn save_permissions(diff: &DiffSummary) -> Self {
        let mut requirement = Self::new(
            ConfirmationKind::SavePermissions,
            "Save permissions?",
            "Yes",
        );
        requirement.messages = diff.messages();
        requirement.with_message("Are you sure you want to do this?")
    }

    pub fn discard_changes() -> Self {
        Self::new(
            ConfirmationKind::DiscardChanges,
            "Discard your unsaved changes?",
            "Discard changes",
        )
        .with_message("If you leave this page now, your changes won't be saved.")
    }
}

/// Decision function for confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    confirm_limited_access: bool,
    confirm_native_grants: bool,
    confirm_before_save: bool,
}

impl ConfirmationPolicy {
    /// Policy with every confirmation enabled
    pub fn new() -> Self {
        Self {
            confirm_limited_access: true,
            confirm_native_grants: true,
            confirm_before_save: true,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            confirm_limited_access: config.confirm_limited_access,
            confirm_native_grants: config.confirm_native_grants,
            confirm_before_save: config.confirm_before_save,
        }
    }

    /// Classify a single-scope transition
    ///
    /// Collection edits never need a per-edit confirmation; they are only
    /// confirmed as part of the save.
    pub fn classify(
        &self,
        kind: TargetKind,
        old: PermissionValue,
        new: PermissionValue,
    ) -> Option<ConfirmationRequirement> {
        if old == new || old.axis() != new.axis() || !kind.supports(new.axis()) {
            return None;
        }

        match (old, new) {
            (PermissionValue::Data(old), PermissionValue::Data(new)) => {
                let enters_limited = new == DataAccess::Limited && old != DataAccess::Limited;
                if self.confirm_limited_access && (enters_limited || new < old) {
                    Some(ConfirmationRequirement::limit_database_access())
                } else {
                    None
                }
            }
            (
                PermissionValue::Native(NativeQuery::Disallowed),
                PermissionValue::Native(NativeQuery::Allowed),
            ) if self.confirm_native_grants => Some(ConfirmationRequirement::allow_native_queries()),
            _ => None,
        }
    }

    /// Confirmation before persisting; `None` when nothing is pending
    pub fn save_confirmation(&self, diff: &DiffSummary) -> Option<ConfirmationRequirement> {
        if diff.is_empty() || !self.confirm_before_save {
            return None;
        }
        Some(ConfirmationRequirement::save_permissions(diff))
    }

    /// Confirmation before leaving the page
    pub fn navigation_confirmation(&self, has_unsaved_changes: bool) -> Option<ConfirmationRequirement> {
        has_unsaved_changes.then(ConfirmationRequirement::discard_changes)
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

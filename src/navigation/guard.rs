//! Navigation guard
//!
//! Sits between navigation requests and the session. Moves within one page
//! always go through; moves that unload the page's tree are held back while
//! the session is dirty until the user picks discard or stay.

use serde::{Deserialize, Serialize};

use crate::core::{EditorResult, SessionState};
use crate::permissions::{PermissionGraph, Scope, TargetKind};
use crate::policy::ConfirmationRequirement;
use crate::session::EditSession;

/// Which axis the data page is laid out by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFocus {
    /// Sidebar lists groups, grid lists databases
    Group,
    /// Sidebar lists databases, grid lists groups
    Database,
}

/// A view within the permissions route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    Data(DataFocus),
    Collections,
}

impl View {
    pub fn page(&self) -> Page {
        match self {
            View::Data(_) => Page::Data,
            View::Collections => Page::Collections,
        }
    }
}

impl Default for View {
    fn default() -> Self {
        View::Data(DataFocus::Group)
    }
}

/// A page owns one tree; leaving it unloads the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    Data,
    Collections,
}

impl Page {
    /// Whether targets of `kind` belong on this page
    pub fn shows(&self, kind: TargetKind) -> bool {
        match self {
            Page::Data => matches!(kind, TargetKind::Database | TargetKind::Table),
            Page::Collections => kind == TargetKind::Collection,
        }
    }

    /// The slice of `graph` this page edits
    pub fn filter_graph(&self, graph: PermissionGraph) -> PermissionGraph {
        graph.filtered(|kind| self.shows(kind))
    }
}

/// Something the user asked to navigate to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationRequest {
    /// Pick a sidebar item (group or database name)
    Select(String),
    /// Open a child scope in the grid
    DrillDown(Scope),
    /// Switch to another view
    SwitchView(View),
    /// Leave the permissions route for another location
    Leave(String),
}

/// Result of a navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Proceed,
    /// Held until `resolve`; show the requirement
    Intercepted(ConfirmationRequirement),
}

/// The user's answer to an intercepted navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardChoice {
    Discard,
    Stay,
}

/// Tracks the current view and a held-back navigation
#[derive(Debug, Clone, Default)]
pub struct NavigationGuard {
    view: View,
    selected: Option<String>,
    focus: Option<Scope>,
    pending: Option<NavigationRequest>,
}

impl NavigationGuard {
    pub fn new(view: View) -> Self {
        Self {
            view,
            ..Default::default()
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn focus(&self) -> Option<&Scope> {
        self.focus.as_ref()
    }

    pub fn state(&self, session: &EditSession) -> SessionState {
        session.state()
    }

    /// A navigation is waiting for `resolve`
    pub fn is_intercepting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&NavigationRequest> {
        self.pending.as_ref()
    }

    /// Whether `request` would unload the current page's tree
    pub fn leaves_page(&self, request: &NavigationRequest) -> bool {
        match request {
            NavigationRequest::Select(_) | NavigationRequest::DrillDown(_) => false,
            NavigationRequest::SwitchView(view) => view.page() != self.view.page(),
            NavigationRequest::Leave(_) => true,
        }
    }

    /// Ask to navigate
    ///
    /// A new request while one is held replaces it.
    pub fn request(&mut self, session: &EditSession, request: NavigationRequest) -> NavigationOutcome {
        if self.leaves_page(&request) {
            if let Some(requirement) = session.navigation_confirmation() {
                tracing::debug!(?request, "Navigation intercepted with unsaved changes");
                self.pending = Some(request);
                return NavigationOutcome::Intercepted(requirement);
            }
        }

        self.pending = None;
        self.apply(&request);
        NavigationOutcome::Proceed
    }

    /// Answer a held navigation
    ///
    /// `Discard` reverts the session and returns the completed request;
    /// `Stay` drops it. Returns `None` when nothing was held or on stay.
    pub fn resolve(
        &mut self,
        session: &mut EditSession,
        choice: GuardChoice,
    ) -> EditorResult<Option<NavigationRequest>> {
        let Some(request) = self.pending.take() else {
            return Ok(None);
        };

        match choice {
            GuardChoice::Discard => {
                session.discard()?;
                self.apply(&request);
                Ok(Some(request))
            }
            GuardChoice::Stay => {
                tracing::debug!(?request, "Navigation cancelled");
                Ok(None)
            }
        }
    }

    fn apply(&mut self, request: &NavigationRequest) {
        match request {
            NavigationRequest::Select(item) => {
                self.selected = Some(item.clone());
                self.focus = None;
            }
            NavigationRequest::DrillDown(scope) => {
                self.focus = Some(scope.clone());
            }
            NavigationRequest::SwitchView(view) => {
                if *view != self.view {
                    self.selected = None;
                    self.focus = None;
                }
                self.view = *view;
            }
            NavigationRequest::Leave(_) => {}
        }
    }
}

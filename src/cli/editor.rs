//! Console editor
//!
//! Drives a [`SharedSession`] from terminal commands. Each page gets its own
//! session, loaded from the store when the view moves to that page.

use std::sync::Arc;

use crate::core::{EditorError, EditorResult};
use crate::navigation::{
    DataFocus, GuardChoice, NavigationGuard, NavigationOutcome, NavigationRequest, Page, View,
};
use crate::permissions::{PermissionValue, Scope, TargetPath};
use crate::policy::ConfirmationRequirement;
use crate::session::{CellView, EditRequest, EditorConfig, PermissionStore, SharedSession};

use super::commands::{Command, HELP};
use super::console::Console;

/// What the loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Terminal front end for one permissions route
pub struct ConsoleEditor {
    console: Console,
    store: Arc<dyn PermissionStore>,
    config: EditorConfig,
    session: SharedSession,
    guard: NavigationGuard,
}

impl ConsoleEditor {
    /// Load the page for `view` and open the editor on it
    pub async fn open(
        store: Arc<dyn PermissionStore>,
        config: EditorConfig,
        view: View,
    ) -> EditorResult<Self> {
        let session = load_page(store.as_ref(), &config, view.page()).await?;
        Ok(Self {
            console: Console::new(),
            store,
            config,
            session,
            guard: NavigationGuard::new(view),
        })
    }

    /// Set a custom console
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// Read and execute commands until quit
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.console.print_banner(self.store.name());

        loop {
            let dirty = self.session.read(|s| s.has_unsaved_changes()).await;
            let prompt = if dirty { "permissions*>" } else { "permissions>" };
            let input = self.console.read_input(prompt)?;

            let command = match Command::parse(&input) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    self.console.print_error(&message);
                    continue;
                }
            };

            match self.execute(command).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(err) => self.console.print_error_dialog(&err),
            }
        }

        self.console.print_system("Shutting down...");
        Ok(())
    }

    /// Execute one command
    pub async fn execute(&mut self, command: Command) -> EditorResult<Flow> {
        match command {
            Command::Groups(filter) => {
                let groups = self
                    .session
                    .read(|s| {
                        s.tree()
                            .filter_groups(filter.as_deref().unwrap_or(""))
                            .into_iter()
                            .cloned()
                            .collect::<Vec<_>>()
                    })
                    .await;
                let refs: Vec<_> = groups.iter().collect();
                self.console.print_groups(&refs);
            }
            Command::Show { group, path } => {
                self.navigate(NavigationRequest::Select(group.clone())).await?;
                let scope = match path {
                    Some(path) => {
                        let scope = self.scope_for(&group, &path).await?;
                        self.navigate(NavigationRequest::DrillDown(scope.clone())).await?;
                        Some(scope)
                    }
                    None => None,
                };
                self.show_group(&group, scope.as_ref()).await?;
            }
            Command::Database(path) => {
                if !self
                    .navigate(NavigationRequest::SwitchView(View::Data(DataFocus::Database)))
                    .await?
                {
                    return Ok(Flow::Continue);
                }
                self.navigate(NavigationRequest::Select(path.clone())).await?;
                self.show_database(&path).await?;
            }
            Command::Open { group, path } => {
                let scope = self.scope_for(&group, &path).await?;
                self.navigate(NavigationRequest::DrillDown(scope.clone())).await?;
                self.show_group(&group, Some(&scope)).await?;
            }
            Command::Set {
                group,
                path,
                value,
                propagate,
            } => {
                let scope = self.scope_for(&group, &path).await?;
                let propagate = propagate.unwrap_or(self.config.propagate_collection_edits);
                self.edit(&scope, value, propagate)?;
            }
            Command::View(view) => {
                self.navigate(NavigationRequest::SwitchView(view)).await?;
            }
            Command::Diff => {
                let diff = self.session.read(|s| s.diff()).await?;
                self.console.print_diff(&diff);
            }
            Command::Save => self.save().await?,
            Command::Discard => {
                let reverted = self.session.try_edit(|s| s.discard())?;
                self.console
                    .print_system(&format!("Reverted {} scope(s)", reverted));
            }
            Command::History => {
                let records = self
                    .store
                    .history()
                    .await
                    .map_err(|e| EditorError::LoadFailed(e.to_string()))?;
                self.console.print_history(&records);
            }
            Command::Status => self.print_status().await,
            Command::Leave(location) => {
                if self.navigate(NavigationRequest::Leave(location)).await? {
                    return Ok(Flow::Exit);
                }
            }
            Command::Quit => {
                if self
                    .navigate(NavigationRequest::Leave("exit".to_string()))
                    .await?
                {
                    return Ok(Flow::Exit);
                }
            }
            Command::Help => println!("{}", HELP),
        }
        Ok(Flow::Continue)
    }

    /// Route a request through the guard; `true` once it completed
    async fn navigate(&mut self, request: NavigationRequest) -> EditorResult<bool> {
        let page = self.guard.view().page();
        let guard = &mut self.guard;
        let outcome = self.session.read(|s| guard.request(s, request.clone())).await;

        let completed = match outcome {
            NavigationOutcome::Proceed => Some(request),
            NavigationOutcome::Intercepted(requirement) => {
                let choice = if self.confirm(&requirement)? {
                    GuardChoice::Discard
                } else {
                    GuardChoice::Stay
                };
                let guard = &mut self.guard;
                self.session.try_edit(|s| guard.resolve(s, choice))?
            }
        };

        if completed.is_some() && self.guard.view().page() != page {
            self.session = load_page(self.store.as_ref(), &self.config, self.guard.view().page()).await?;
        }
        Ok(completed.is_some())
    }

    fn edit(
        &mut self,
        scope: &Scope,
        value: PermissionValue,
        propagate: bool,
    ) -> EditorResult<()> {
        let changed = match self
            .session
            .try_edit(|s| s.request_edit(scope, value, propagate))?
        {
            EditRequest::Applied(changed) => changed,
            EditRequest::NeedsConfirmation(pending) => {
                if !self.confirm(&pending.confirmation)? {
                    return Ok(());
                }
                self.session.try_edit(|s| s.confirm_edit(pending))?
            }
        };

        if changed.is_empty() {
            self.console.print_system("Nothing changed");
        } else {
            self.console
                .print_system(&format!("Updated {} scope(s)", changed.len()));
        }
        Ok(())
    }

    async fn save(&mut self) -> EditorResult<()> {
        let (dirty, confirmation) = self
            .session
            .read(|s| (s.has_unsaved_changes(), s.save_confirmation()))
            .await;
        if !dirty {
            self.console.print_system("No changes to save");
            return Ok(());
        }
        if let Some(requirement) = confirmation? {
            if !self.confirm(&requirement)? {
                return Ok(());
            }
        }

        let diff = self.session.commit(self.store.as_ref()).await?;
        self.console
            .print_system(&format!("Saved {} change(s)", diff.len()));
        Ok(())
    }

    fn confirm(&self, requirement: &ConfirmationRequirement) -> EditorResult<bool> {
        Ok(self.console.ask_confirmation(requirement)?)
    }

    async fn scope_for(&self, group: &str, path: &str) -> EditorResult<Scope> {
        self.session
            .read(|s| -> EditorResult<Scope> {
                let group = s.tree().group_by_name(group)?;
                let scope = Scope::new(group.id, TargetPath::parse(path));
                // Fail early on unknown targets
                s.tree().get_node(&scope)?;
                Ok(scope)
            })
            .await
    }

    async fn show_group(&self, group: &str, parent: Option<&Scope>) -> EditorResult<()> {
        let (heading, cells) = self
            .session
            .read(|s| -> EditorResult<(String, Vec<CellView>)> {
                let tree = s.tree();
                let group = tree.group_by_name(group)?;
                let (heading, scopes) = match parent {
                    Some(parent) => (
                        format!("{} / {}", group.name, tree.get_node(parent)?.label()),
                        tree.children_of(parent)?,
                    ),
                    None => (group.name.clone(), tree.roots(group.id)),
                };
                let cells = scopes
                    .into_iter()
                    .map(|scope| s.cell(scope))
                    .collect::<EditorResult<Vec<_>>>()?;
                Ok((heading, cells))
            })
            .await?;
        self.console.print_grid(&heading, &cells);
        Ok(())
    }

    async fn show_database(&self, path: &str) -> EditorResult<()> {
        let (heading, cells) = self
            .session
            .read(|s| -> EditorResult<(String, Vec<CellView>)> {
                let tree = s.tree();
                let path = TargetPath::parse(path);
                let mut heading = path.key();
                let mut cells = Vec::new();
                for group in tree.groups() {
                    let scope = Scope::new(group.id, path.clone());
                    let mut cell = s.cell(&scope)?;
                    heading = cell.label.clone();
                    cell.label = group.name.clone();
                    cells.push(cell);
                }
                Ok((heading, cells))
            })
            .await?;
        self.console.print_grid(&heading, &cells);
        Ok(())
    }

    async fn print_status(&self) {
        let (state, dirty, revision, last_saved) = self
            .session
            .read(|s| {
                (
                    s.state(),
                    s.dirty_scopes().len(),
                    s.revision(),
                    s.last_saved_at(),
                )
            })
            .await;

        self.console.print_system(&format!("View: {:?}", self.guard.view()));
        self.console.print_system(&format!(
            "Revision {} ({} pending scope(s)): {}",
            revision, dirty, state
        ));
        if let Some(at) = last_saved {
            self.console
                .print_system(&format!("Last saved {}", at.format("%Y-%m-%d %H:%M:%S")));
        }
    }
}

async fn load_page(
    store: &dyn PermissionStore,
    config: &EditorConfig,
    page: Page,
) -> EditorResult<SharedSession> {
    SharedSession::load_with(store, config.clone(), |graph| page.filter_graph(graph)).await
}

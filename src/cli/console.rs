use colored::*;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::core::EditorError;
use crate::permissions::{DataAccess, Group, TargetKind};
use crate::policy::ConfirmationRequirement;
use crate::session::{CellView, DiffSummary, RevisionRecord};

/// Console handles all terminal I/O with colored formatting
pub struct Console {
    prompt_color: Color,
    label_color: Color,
    dirty_color: Color,
    // Dialog answers to use before falling back to stdin
    answers: Mutex<VecDeque<bool>>,
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            prompt_color: Color::Cyan,
            label_color: Color::BrightWhite,
            dirty_color: Color::Yellow,
            answers: Mutex::new(VecDeque::new()),
        }
    }

    /// Answer the next confirmation dialogs from `answers` instead of stdin
    pub fn with_answers(self, answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            ..self
        }
    }

    /// Print a welcome banner
    pub fn print_banner(&self, store: &str) {
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", "  Permissions".bright_blue().bold());
        println!("{}", "=".repeat(60).bright_blue());
        println!();
        println!("Editing permissions from {}. Type 'help' for commands.", store);
        println!();
    }

    /// Print a system message
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Print a separator line
    pub fn print_separator(&self) {
        println!("{}", "-".repeat(60).bright_black());
    }

    /// Read a line of input from the user
    pub fn read_input(&self, prompt: &str) -> io::Result<String> {
        print!("{} ", prompt.color(self.prompt_color).bold());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    /// Print the group sidebar
    pub fn print_groups(&self, groups: &[&Group]) {
        if groups.is_empty() {
            println!("{}", "No groups match".bright_black());
            return;
        }
        for group in groups {
            let members = match group.member_count {
                1 => "1 member".to_string(),
                n => format!("{} members", n),
            };
            let name = group.name.color(self.label_color).bold();
            if group.is_admin {
                println!("  {} {} {}", name, members.bright_black(), "(locked)".bright_black());
            } else {
                println!("  {} {}", name, members.bright_black());
            }
        }
    }

    /// Print a grid of cells under a heading
    pub fn print_grid(&self, heading: &str, cells: &[CellView]) {
        println!();
        println!("{}", heading.bright_white().bold());
        self.print_separator();

        if cells.is_empty() {
            println!("{}", "Nothing to show".bright_black());
            return;
        }

        for cell in cells {
            let mut columns = Vec::new();
            match cell.kind {
                TargetKind::Database | TargetKind::Table => {
                    if let Some(access) = cell.effective_data {
                        columns.push(format!("data: {}", paint_access(access)));
                    }
                    if let Some(native) = cell.values.native {
                        columns.push(format!("native: {}", native));
                    }
                }
                TargetKind::Collection => {
                    if let Some(access) = cell.values.collection {
                        columns.push(format!("collection: {}", access));
                    }
                }
            }

            let marker = if cell.is_dirty {
                "*".color(self.dirty_color).bold().to_string()
            } else {
                " ".to_string()
            };
            let label = if cell.editable {
                cell.label.color(self.label_color).to_string()
            } else {
                cell.label.bright_black().to_string()
            };

            println!(
                "{} {:<28} {:<12} {}",
                marker,
                label,
                cell.scope.path.to_string().bright_black(),
                columns.join("  ")
            );
        }
    }

    /// Print pending changes
    pub fn print_diff(&self, diff: &DiffSummary) {
        if diff.is_empty() {
            println!("{}", "No pending changes".bright_black());
            return;
        }
        for change in &diff.changes {
            let arrow = if change.is_downgrade() {
                "->".red()
            } else {
                "->".green()
            };
            println!(
                "  {} {} {} {} {}",
                change.scope.to_string().bright_black(),
                format!("[{}]", change.axis()).color(self.prompt_color),
                change.old,
                arrow,
                change.new
            );
        }
        for line in diff.messages() {
            println!("  {}", line);
        }
    }

    /// Print saved revisions, oldest first
    pub fn print_history(&self, records: &[RevisionRecord]) {
        if records.is_empty() {
            println!("{}", "No saved revisions".bright_black());
            return;
        }
        for record in records {
            println!(
                "  {} {} {}",
                format!("r{}", record.revision).bold(),
                record.saved_at.format("%Y-%m-%d %H:%M:%S").to_string().bright_black(),
                format!("{} change(s)", record.diff.len())
            );
        }
    }

    /// Show a confirmation dialog and read the answer
    ///
    /// Anything other than an explicit yes counts as cancel.
    pub fn ask_confirmation(&self, requirement: &ConfirmationRequirement) -> io::Result<bool> {
        println!();
        println!("{}", "─".repeat(60).yellow());
        println!("{}", requirement.title.yellow().bold());
        for message in &requirement.messages {
            println!("  {}", message);
        }
        println!();
        println!(
            "  [y] {}    [n] {}",
            requirement.confirm_label, requirement.cancel_label
        );
        println!("{}", "─".repeat(60).yellow());

        let scripted = self
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let confirmed = match scripted {
            Some(answer) => answer,
            None => {
                print!("{} ", "Your choice (y/n):".yellow().bold());
                io::stdout().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;
                matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
            }
        };

        if confirmed {
            println!("{}", format!("✓ {}", requirement.confirm_label).green());
        } else {
            println!("{}", format!("✗ {}", requirement.cancel_label).red());
        }
        Ok(confirmed)
    }

    /// Show a blocking error; recoverable errors get a dialog title
    pub fn print_error_dialog(&self, error: &EditorError) {
        match error.dialog_title() {
            Some(title) => {
                println!();
                println!("{}", "─".repeat(60).red());
                println!("{}", title.red().bold());
                if let EditorError::PersistenceRejected { message } = error {
                    println!("  {}", message);
                }
                println!("{}", "─".repeat(60).red());
            }
            None => self.print_error(&error.to_string()),
        }
    }
}

fn paint_access(access: DataAccess) -> ColoredString {
    let label = access.to_string();
    match access {
        DataAccess::Allowed => label.green(),
        DataAccess::Limited => label.yellow(),
        DataAccess::NoAccess => label.red(),
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

//! REPL command parsing

use crate::navigation::{DataFocus, View};
use crate::permissions::{Axis, PermissionValue};

pub const HELP: &str = "\
Commands:
  groups [filter]                       list groups, optionally filtered by name
  show <group> [path]                   show a group's grid (top level or below path)
  db <path>                             show every group for one database
  open <group> <path>                   drill into a scope
  set <group> <path> <axis> <value>     edit a cell (axis: data, native, collection)
      [--propagate | --no-propagate]    copy a collection value to sub-collections
  view data|databases|collections       switch view
  diff                                  show pending changes
  save                                  persist pending changes
  discard                               revert pending changes
  history                               list saved revisions
  status                                show session state
  leave <location>                      leave the permissions page
  help                                  show this help
  quit                                  exit";

/// One parsed REPL line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Groups(Option<String>),
    Show {
        group: String,
        path: Option<String>,
    },
    Database(String),
    Open {
        group: String,
        path: String,
    },
    Set {
        group: String,
        path: String,
        value: PermissionValue,
        /// `None` leaves it to the configured default
        propagate: Option<bool>,
    },
    View(View),
    Diff,
    Save,
    Discard,
    History,
    Status,
    Leave(String),
    Help,
    Quit,
}

impl Command {
    /// Parse a line; `Ok(None)` for blank input
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let tokens = tokenize(line)?;
        let Some((name, args)) = tokens.split_first() else {
            return Ok(None);
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "groups" => Command::Groups(non_empty(args.join(" "))),
            "show" => match args {
                [group] => Command::Show {
                    group: group.clone(),
                    path: None,
                },
                [group, path] => Command::Show {
                    group: group.clone(),
                    path: Some(path.clone()),
                },
                _ => return Err("usage: show <group> [path]".to_string()),
            },
            "db" | "database" => match args {
                [path] => Command::Database(path.clone()),
                _ => return Err("usage: db <path>".to_string()),
            },
            "open" => match args {
                [group, path] => Command::Open {
                    group: group.clone(),
                    path: path.clone(),
                },
                _ => return Err("usage: open <group> <path>".to_string()),
            },
            "set" => parse_set(args)?,
            "view" => match args {
                [view] => Command::View(parse_view(view)?),
                _ => return Err("usage: view data|databases|collections".to_string()),
            },
            "diff" => Command::Diff,
            "save" => Command::Save,
            "discard" => Command::Discard,
            "history" => Command::History,
            "status" => Command::Status,
            "leave" => match args {
                [location] => Command::Leave(location.clone()),
                _ => return Err("usage: leave <location>".to_string()),
            },
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command: {} (try 'help')", other)),
        };
        Ok(Some(command))
    }
}

fn parse_set(args: &[String]) -> Result<Command, String> {
    let mut propagate = None;
    let mut rest = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--propagate" | "-p" => propagate = Some(true),
            "--no-propagate" => propagate = Some(false),
            _ => rest.push(arg.as_str()),
        }
    }

    match rest.as_slice() {
        [group, path, axis, value @ ..] if !value.is_empty() => {
            let axis: Axis = axis.parse()?;
            Ok(Command::Set {
                group: group.to_string(),
                path: path.to_string(),
                value: PermissionValue::parse(axis, &value.join(" "))?,
                propagate,
            })
        }
        _ => Err("usage: set <group> <path> <axis> <value> [--propagate]".to_string()),
    }
}

fn parse_view(input: &str) -> Result<View, String> {
    match input.to_ascii_lowercase().as_str() {
        "data" | "groups" => Ok(View::Data(DataFocus::Group)),
        "databases" | "database" | "db" => Ok(View::Data(DataFocus::Database)),
        "collections" | "collection" => Ok(View::Collections),
        other => Err(format!("unknown view: {}", other)),
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Split on whitespace, keeping double-quoted runs together
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if quoted {
        return Err("unterminated quote".to_string());
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

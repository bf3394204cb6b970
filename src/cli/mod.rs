//! Terminal front end
//!
//! - `Console` - colored output and confirmation dialogs
//! - `Command` - REPL line parsing
//! - `ConsoleEditor` - the loop tying commands to a session, guard and store

mod commands;
mod console;
mod editor;

pub use commands::{Command, HELP};
pub use console::Console;
pub use editor::{ConsoleEditor, Flow};

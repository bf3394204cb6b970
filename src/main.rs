use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};

use permission_matrix::cli::ConsoleEditor;
use permission_matrix::logging;
use permission_matrix::navigation::{DataFocus, View};
use permission_matrix::session::{EditorConfig, FileGraphStore};

const USAGE: &str = "usage: permctl [--config <file>] [--view data|databases|collections] [dir]";

struct Args {
    dir: Option<PathBuf>,
    config: Option<PathBuf>,
    view: View,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        dir: None,
        config: None,
        view: View::default(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                args.config = Some(iter.next().context(USAGE)?.into());
            }
            "--view" => {
                args.view = match iter.next().context(USAGE)?.as_str() {
                    "data" => View::Data(DataFocus::Group),
                    "databases" => View::Data(DataFocus::Database),
                    "collections" => View::Collections,
                    other => bail!("unknown view '{}'\n{}", other, USAGE),
                };
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ if args.dir.is_none() => args.dir = Some(PathBuf::from(&arg)),
            _ => bail!(USAGE),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => EditorConfig::from_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    // Keep the guard so buffered file logs are flushed on exit
    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;

    tracing::info!("=== permctl starting ===");

    let store = match args.dir {
        Some(dir) => FileGraphStore::with_dir(dir),
        None => FileGraphStore::new(),
    };
    tracing::info!(dir = %store.base_dir().display(), "Using file graph store");

    let mut editor = ConsoleEditor::open(Arc::new(store), config, args.view).await?;
    editor.run().await?;

    tracing::info!("=== permctl shutting down ===");

    Ok(())
}

mod backend;
mod cli;
mod console;
mod model;
mod orchestrator;
#[cfg(test)]
mod test_support;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Default diagnostics file: `<local data dir>/temoa-console/temoa-console.log`.
fn default_log_path() -> Option<PathBuf> {
    let dir = dirs::data_local_dir()?.join("temoa-console");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join("temoa-console.log"))
}

/// Diagnostics go to a file so they never interfere with the terminal UI.
fn init_tracing(path: Option<PathBuf>) {
    let Some(path) = path.or_else(default_log_path) else {
        return;
    };
    let Ok(file) = std::fs::File::create(&path) else {
        return;
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("temoa_console=info"));
    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(file))
        .with_env_filter(filter)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.log_file.clone());
    let is_non_tui = args.json || args.text;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "exiting with error");
            Err(e)
        }
    }
}

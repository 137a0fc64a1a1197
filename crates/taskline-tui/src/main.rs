//! Taskline TUI - terminal client with PIN lock and inactivity auto-lock

use std::fs::{self, OpenOptions};
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskline_tui::app::{ClientConfig, StoragePaths};
use taskline_tui::App;

#[derive(Parser, Debug)]
#[command(name = "taskline-tui")]
#[command(about = "Taskline terminal client", version)]
struct Args {
    /// Server base URL (overrides the config file)
    #[arg(short, long)]
    server: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Application entry point with panic handling for terminal restoration
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ClientConfig::load(args.config.as_deref());
    if let Some(server) = args.server {
        config.server_url = server;
    }

    // Set up panic hook to restore terminal on crash
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    // Log to a file; the terminal belongs to the UI
    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive("taskline_tui=info".parse()?)
                .add_directive("taskline_session=info".parse()?),
        )
        .init();

    tracing::info!("Connecting to {}", config.server_url);

    let result = run_app(&config).await;

    if let Err(e) = &result {
        tracing::error!("Application error: {}", e);
    }

    result
}

/// Main application runner
async fn run_app(config: &ClientConfig) -> Result<()> {
    let paths = StoragePaths::resolve()?;
    let storage = paths.open(config.session.keys.clone());
    let mut app = App::new(config, storage)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

//! FlutterGen terminal UI
//!
//! Describe a screen, get back an explanation and a complete Flutter file.
//!
//! Usage:
//!   fluttergen [--provider <PROVIDER>] [--model <MODEL>]

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use fluttergen_core::{Config, Provider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod clipboard;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "fluttergen")]
#[command(version, about = "Generate Flutter screens from plain-language descriptions")]
struct Cli {
    /// Provider to use: gemini, claude, openai or ollama
    #[arg(short, long, env = "FLUTTERGEN_PROVIDER")]
    provider: Option<String>,

    /// Model to request (defaults to the configured or provider default)
    #[arg(short, long, env = "FLUTTERGEN_MODEL")]
    model: Option<String>,
}

/// Log file under the data dir; the terminal belongs to the UI
fn log_path() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::config_dir)
        .context("Could not determine a data directory")?;
    Ok(base.join("fluttergen").join("fluttergen.log"))
}

fn init_logging() -> Result<()> {
    let path = log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {parent:?}"))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {path:?}"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fluttergen=info,fluttergen_core=info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is best effort; the UI still runs without a log file
    if let Err(e) = init_logging() {
        eprintln!("Warning: logging disabled: {e:#}");
    }

    let config = Config::load_or_default();

    let provider = match cli.provider.as_deref() {
        Some(name) => Provider::from_str(name)
            .with_context(|| format!("Unknown provider '{name}' (expected gemini, claude, openai or ollama)"))?,
        None => config.provider(),
    };
    let model = cli.model.unwrap_or_else(|| config.model_for(provider));
    tracing::info!(provider = provider.as_str(), model = %model, "starting fluttergen");

    let mut events = EventHandler::new();
    let mut app = App::new(config, provider, model, events.sender());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;
    }

    tracing::info!("exiting");
    Ok(())
}

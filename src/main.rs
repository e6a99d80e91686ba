//! Wallpaper Extractor - track and extract Wallpaper Engine workshop items
//!
//! Main entry point for the command-line application.
//!
//! # Overview
//!
//! Steam writes every workshop subscription change to `{steam}/logs/workshop_log.txt`.
//! This binary follows that log for Wallpaper Engine (AppID 431960) items and copies
//! their content out of the workshop folder. It initializes:
//! - Logging infrastructure (daily file rotation + console output)
//! - Tokio runtime (watcher polling and blocking copy work)
//! - Configuration loading ([`ConfigManager`])
//! - The [`AppController`] that owns the watcher, registry and copy pipeline
//!
//! # Settings
//!
//! `WallpaperExtractor Data/Settings.yaml` holds `steam_path`, `copy_path` and
//! `copy_mode`; `WPEX_STEAM_PATH`, `WPEX_COPY_PATH` and `WPEX_COPY_MODE` override them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use wallpaper_extractor::app::default_start_time;
use wallpaper_extractor::config::DEFAULT_CONFIG_DIR;
use wallpaper_extractor::logging::{DEFAULT_LOG_DIR, DEFAULT_LOG_PREFIX};
use wallpaper_extractor::{
    APP_NAME, AppController, ConfigManager, CopyMode, CopyStatus, RegistryChange, TrackedItem,
    VERSION,
};

#[derive(Parser)]
#[command(name = "wallpaper-extractor")]
#[command(version)]
#[command(about = "Track Wallpaper Engine workshop subscriptions and extract their content")]
struct Cli {
    /// Directory holding Settings.yaml
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_DIR)]
    config_dir: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Where to read the log and which events to consider
#[derive(clap::Args)]
struct Source {
    /// Steam installation root; saved for later runs
    #[arg(long, value_name = "PATH")]
    steam_path: Option<String>,

    /// Only consider events at or after this time (yyyy-MM-dd HH:mm:ss)
    #[arg(long, value_name = "TIME")]
    since: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the workshop log until Ctrl-C, reporting tracked items as they change
    Watch {
        #[command(flatten)]
        source: Source,
    },

    /// Parse the workshop log once and print the tracked items
    List {
        #[command(flatten)]
        source: Source,
    },

    /// Copy every tracked item to the destination, deleting the source on success
    Copy {
        #[command(flatten)]
        source: Source,

        /// Destination directory; defaults to the saved copy path
        #[arg(long, value_name = "DIR")]
        dest: Option<String>,

        /// `video` copies the first video file, `directory` the whole item folder
        #[arg(long)]
        mode: Option<CopyMode>,
    },

    /// Open an item's workshop content folder
    OpenFolder { id: String },

    /// Open an item's Steam workshop page
    OpenPage { id: String },

    /// Update the saved settings and print them
    Config {
        #[arg(long, value_name = "PATH")]
        steam_path: Option<String>,

        #[arg(long, value_name = "DIR")]
        copy_path: Option<String>,

        #[arg(long)]
        mode: Option<CopyMode>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = wallpaper_extractor::logging::setup_logging_with_console(
        DEFAULT_LOG_DIR,
        DEFAULT_LOG_PREFIX,
        cli.debug,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("wpex-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let config_manager = ConfigManager::new(&cli.config_dir)?;

    let result = match cli.command {
        Command::Config {
            steam_path,
            copy_path,
            mode,
        } => configure(&config_manager, steam_path, copy_path, mode),
        Command::Watch { source } => {
            // Follow mode only reports what happens from now on unless told otherwise
            let since = source.since.clone().unwrap_or_else(default_start_time);
            let app = open_app(config_manager, &runtime, &source, since)?;
            runtime.block_on(watch(&app))
        }
        Command::List { source } => {
            let since = source.since.clone().unwrap_or_default();
            let app = open_app(config_manager, &runtime, &source, since)?;
            list(&app)
        }
        Command::Copy { source, dest, mode } => {
            let since = source.since.clone().unwrap_or_default();
            let app = open_app(config_manager, &runtime, &source, since)?;
            runtime.block_on(copy(&app, dest.as_deref(), mode))
        }
        Command::OpenFolder { id } => {
            let app = AppController::new(config_manager, runtime.handle().clone())?;
            let folder = app.open_workshop_folder(&id)?;
            println!("Opened {}", folder);
            Ok(())
        }
        Command::OpenPage { id } => {
            let app = AppController::new(config_manager, runtime.handle().clone())?;
            let url = app.open_workshop_page(&id)?;
            println!("Opened {}", url);
            Ok(())
        }
    };

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    tracing::info!("Application shutdown complete");

    result
}

fn open_app(
    config_manager: ConfigManager,
    runtime: &tokio::runtime::Runtime,
    source: &Source,
    since: String,
) -> Result<AppController> {
    let app = AppController::with_start_time(config_manager, runtime.handle().clone(), since)?;
    if let Some(steam_path) = source.steam_path.as_deref() {
        app.set_steam_path(steam_path)?;
    }
    Ok(app)
}

fn configure(
    config_manager: &ConfigManager,
    steam_path: Option<String>,
    copy_path: Option<String>,
    mode: Option<CopyMode>,
) -> Result<()> {
    if let Some(path) = steam_path {
        config_manager.save_steam_path(&path)?;
    }
    if let Some(path) = copy_path {
        config_manager.save_copy_path(&path)?;
    }
    if let Some(mode) = mode {
        config_manager.update_settings(|s| s.set_mode(mode))?;
    }

    let settings = config_manager.load_settings()?;
    println!("settings:   {}", config_manager.settings_path());
    println!("steam_path: {}", settings.steam_path().unwrap_or("<not set>"));
    println!(
        "copy_path:  {}",
        settings
            .copy_path_or_default()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "<not set>".to_string())
    );
    println!("copy_mode:  {}", settings.mode());
    Ok(())
}

fn print_items(items: &[TrackedItem]) {
    if items.is_empty() {
        println!("No workshop items tracked");
        return;
    }

    for item in items {
        let subscription = if item.record.subscribed {
            "subscribed"
        } else {
            "unsubscribed"
        };
        match &item.copy_message {
            Some(message) => println!(
                "{:>12}  {}  {:<12}  {}: {}",
                item.id(),
                item.record.timestamp,
                subscription,
                item.copy_status,
                message
            ),
            None => println!(
                "{:>12}  {}  {:<12}  {}",
                item.id(),
                item.record.timestamp,
                subscription,
                item.copy_status
            ),
        }
    }
}

fn list(app: &AppController) -> Result<()> {
    app.scan_once()?;
    print_items(&app.items());
    Ok(())
}

async fn watch(app: &AppController) -> Result<()> {
    let mut changes = app.registry().subscribe();
    println!("{}", app.start_watching()?);
    if let Some(since) = app.start_time() {
        println!("Reporting events since {}", since);
    }

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(RegistryChange::ItemsReconciled { total, added, updated, removed }) => {
                    println!(
                        "{} items tracked ({} added, {} updated, {} removed)",
                        total, added, updated, removed
                    );
                    print_items(&app.items());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Skipped {} registry events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    app.stop_watching();
    Ok(())
}

async fn copy(app: &AppController, dest: Option<&str>, mode: Option<CopyMode>) -> Result<()> {
    app.scan_once()?;
    let mode = mode.unwrap_or_else(|| app.settings().mode());

    let handle = app.start_copy(dest, mode, |_| {})?;
    let wait = handle.wait();
    tokio::pin!(wait);

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome.context("Copy job did not finish")?,
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                if app.cancel_copy() {
                    println!("Cancelling after the current item...");
                }
            }
        }
    };

    for item in app.items() {
        if item.copy_status == CopyStatus::Failed {
            println!(
                "{}: {}",
                item.id(),
                item.copy_message.as_deref().unwrap_or("failed")
            );
        }
    }
    println!("{}", outcome.summary());
    Ok(())
}

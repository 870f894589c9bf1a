use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use testdeck_infrastructure::{ConfigService, TestdeckPaths};
use testdeck_telemetry::{SessionEventLayer, init_tracing};

mod app;
mod commands;
mod render;

#[derive(Parser)]
#[command(name = "testdeck")]
#[command(about = "testdeck - turn natural-language requests into generated tests", long_about = None)]
struct Cli {
    /// Log at debug level (overridden by TESTDECK_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Use this directory instead of ~/.config/testdeck
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the artifact tree of a project
    Tree {
        /// Manifest (.toml) or directory; the built-in sample if omitted
        #[arg(long, value_name = "PATH")]
        project: Option<PathBuf>,

        /// Show collapsed folders' contents too
        #[arg(long)]
        all: bool,
    },
    /// Submit one request and print the resulting log
    Ask {
        /// The request, e.g. "add a login failure test"
        text: String,

        /// Node id to use as selection context
        #[arg(long, value_name = "ID")]
        select: Option<String>,

        #[arg(long, value_name = "PATH")]
        project: Option<PathBuf>,

        /// Write the session as JSON to this file
        #[arg(long, value_name = "FILE")]
        transcript: Option<PathBuf>,
    },
    /// Start an interactive session
    Repl {
        #[arg(long, value_name = "PATH")]
        project: Option<PathBuf>,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config.toml if none exists
    Init,
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.config_dir {
        Some(dir) => TestdeckPaths::with_base(dir),
        None => TestdeckPaths::new(),
    };
    let config_service = ConfigService::with_paths(paths);
    let loaded = config_service.load();

    // Logging comes up before the config is known to be valid.
    let log_settings = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    let (events, feed) = match cli.command {
        Commands::Repl { .. } => {
            let (layer, rx) = SessionEventLayer::channel();
            (Some(layer.with_target_prefix("testdeck")), Some(rx))
        }
        _ => (None, None),
    };
    init_tracing(&log_settings, cli.verbose, events);

    let command = match cli.command {
        Commands::Config { action } => {
            return match action {
                ConfigAction::Init => commands::config::init(&config_service),
                ConfigAction::Show => commands::config::show(&config_service),
                ConfigAction::Path => commands::config::path(&config_service),
            };
        }
        command => command,
    };

    let config = loaded.context("Failed to load configuration")?;
    let app = app::App::new(config)?;

    match command {
        Commands::Tree { project, all } => commands::tree::run(&app, project.as_deref(), all).await,
        Commands::Ask {
            text,
            select,
            project,
            transcript,
        } => {
            commands::ask::run(
                &app,
                &text,
                select.as_deref(),
                project.as_deref(),
                transcript.as_deref(),
            )
            .await
        }
        Commands::Repl { project } => commands::repl::run(&app, project.as_deref(), feed).await,
        // Handled before the configuration is required.
        Commands::Config { .. } => Ok(()),
    }
}

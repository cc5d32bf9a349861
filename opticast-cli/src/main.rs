//! OptiCast CLI: terminal dashboard for AI-assisted expense projections.
//!
//! `opticast` (or `opticast run`) collects the five expense amounts, asks the
//! projection service for next period's figures, renders the dashboard and
//! offers the spreadsheet report for download.

mod commands;
mod display;
mod input;
mod run;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// OptiCast Mining: budget projections for operating expenses
#[derive(Parser, Debug)]
#[command(name = "opticast", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (looked up for .opticast/config.toml)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Subcommand (defaults to `run`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a projection (the default)
    Run(RunArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the projection service API key
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

/// Options of a projection run.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Contractors amount for the prior period
    #[arg(long, value_parser = input::parse_amount)]
    pub contractors: Option<f64>,

    /// Labor amount for the prior period
    #[arg(long, value_parser = input::parse_amount)]
    pub labor: Option<f64>,

    /// Fuel amount for the prior period
    #[arg(long, value_parser = input::parse_amount)]
    pub fuel: Option<f64>,

    /// Power amount for the prior period
    #[arg(long, value_parser = input::parse_amount)]
    pub power: Option<f64>,

    /// Maintenance amount for the prior period
    #[arg(long, value_parser = input::parse_amount)]
    pub maintenance: Option<f64>,

    /// Prompt for each amount
    #[arg(short, long)]
    pub interactive: bool,

    /// API key to use when none is stored or set in the environment
    #[arg(long)]
    pub api_key: Option<String>,

    /// Model to use (overrides service.model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Save the report without asking
    #[arg(long, conflicts_with = "no_export")]
    pub export: bool,

    /// Never save the report
    #[arg(long)]
    pub no_export: bool,

    /// Directory to save the report into (overrides report.output_dir)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Rendering width in columns (overrides ui.width)
    #[arg(long)]
    pub width: Option<usize>,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write the default configuration to .opticast/config.toml
    Init,
    /// Print the effective configuration
    Show,
}

#[derive(clap::Subcommand, Debug)]
enum AuthAction {
    /// Store the API key in the OS credential store
    Login,
    /// Remove the stored API key
    Logout,
    /// Show which API key source would be used
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "opticast", "opticast")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "opticast.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    match cli.command {
        Some(Commands::Config { action }) => {
            commands::handle_config(action, &workspace, cli.config.as_deref())
        }
        Some(Commands::Auth { action }) => {
            commands::handle_auth(action, &workspace, cli.config.as_deref())
        }
        Some(Commands::Run(args)) => {
            run::run(args, &workspace, cli.config.as_deref(), cli.quiet).await
        }
        None => run::run(RunArgs::default(), &workspace, cli.config.as_deref(), cli.quiet).await,
    }
}

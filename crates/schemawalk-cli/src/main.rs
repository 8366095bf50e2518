mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schemawalk_config::{AppConfig, ConfigLoader, LogConfig};
use schemawalk_planner::DirectionPolicy;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Target;

#[derive(Parser, Debug)]
#[command(name = "schemawalk", version, about = "Plan and apply schema migrations")]
struct Cli {
    /// Config file (YAML or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database to migrate
    #[arg(long, global = true, env = "SCHEMAWALK_DATABASE")]
    database: Option<PathBuf>,

    /// Directory holding the reset script and transitions
    #[arg(long, global = true, env = "SCHEMAWALK_CATALOG")]
    catalog: Option<PathBuf>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the version the database is stamped with
    Status,
    /// Print the latest version known to the catalog
    Latest,
    /// Print the transitions between two versions
    Plan {
        #[arg(long)]
        from: u32,
        #[arg(long)]
        to: Target,
        /// upgrade, force-upgrade or downgrade
        #[arg(long)]
        mode: Option<DirectionPolicy>,
    },
    /// Migrate the database to a target version
    Migrate {
        #[arg(long, default_value = "latest")]
        to: Target,
        /// upgrade, force-upgrade or downgrade
        #[arg(long)]
        mode: Option<DirectionPolicy>,
        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_tracing(&config.log);

    match cli.command {
        Command::Status => commands::status(&config),
        Command::Latest => commands::latest(&config),
        Command::Plan { from, to, mode } => commands::plan(&config, from, to, mode),
        Command::Migrate { to, mode, dry_run } => {
            commands::migrate(&config, to, mode, dry_run)
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = ConfigLoader::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }
    if let Some(catalog) = &cli.catalog {
        config.catalog.dir = catalog.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if cli.log_json {
        config.log.json = true;
    }
    Ok(config)
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

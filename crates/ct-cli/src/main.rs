use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ct_cli::commands::{agenda, history, import, parse, status, timer, util};
use ct_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(ct_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = ct_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Parse { file, json }) => {
            // Parsing is pure and needs no database
            let text = util::read_input(file.as_deref())?;
            let parsed = parse::run(&mut stdout, &text, *json)?;
            if !parsed.is_valid() {
                bail!("agenda has {} validation error(s)", parsed.errors.len());
            }
        }
        Some(Commands::Import { file, replace }) => {
            let text = util::read_input(file.as_deref())?;
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let items = import::run(&mut db, &text, *replace)?;
            writeln!(stdout, "Imported {} agenda items", items.len())?;
        }
        Some(Commands::Agenda { json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            agenda::run(&mut stdout, &db, *json)?;
        }
        Some(Commands::Timer(action)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            timer::run(&mut stdout, db, config.timer_config(), action, Local::now())?;
        }
        Some(Commands::History { json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            history::run(&mut stdout, &db, *json)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(
                &mut stdout,
                &db,
                &config.database_path,
                &config.timer_config(),
                Utc::now(),
            )?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

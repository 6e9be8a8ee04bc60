//! `crimemap` - CLI for the crime map dashboard
//!
//! This binary loads the configured data sources and serves the dashboard,
//! or reports on the data and configuration without serving.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crimemap::cli::{Cli, Command, ConfigCommand, ServeCommand, SummaryCommand};
use crimemap::{acquire, init_logging, server, Config, HttpFetcher, Snapshot};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config_path = cli.config;
    match cli.command {
        Command::Serve(cmd) => handle_serve(load_config(config_path)?, &cmd).await,
        Command::Fetch => handle_fetch(&load_config(config_path)?).await,
        Command::Summary(cmd) => handle_summary(&load_config(config_path)?, &cmd).await,
        // Config subcommands report load errors themselves
        Command::Config(cmd) => handle_config(config_path, cmd),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(path).context("Failed to load configuration")
}

async fn load_snapshot(config: &Config) -> anyhow::Result<Snapshot> {
    let fetcher = HttpFetcher::from_config(config).context("Failed to build HTTP client")?;
    Snapshot::load(config, &fetcher)
        .await
        .context("Failed to load dashboard data")
}

async fn handle_serve(mut config: Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    if let Some(bind) = cmd.bind {
        config.dashboard.bind_address = bind;
    }
    if let Some(port) = cmd.port {
        config.dashboard.port = port;
    }

    let snapshot = load_snapshot(&config).await?;
    server::serve(&config, snapshot)
        .await
        .context("Dashboard server failed")
}

async fn handle_fetch(config: &Config) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::from_config(config).context("Failed to build HTTP client")?;
    let dir = config.shapefile_dir();
    let downloaded = acquire::ensure_shapefile(&fetcher, &config.sources.shapefile_url, &dir)
        .await
        .context("Failed to fetch shapefile")?;

    if downloaded {
        println!("Shapefile extracted to {}", dir.display());
    } else {
        println!("Shapefile already present at {}", dir.display());
    }
    Ok(())
}

async fn handle_summary(config: &Config, cmd: &SummaryCommand) -> anyhow::Result<()> {
    let snapshot = load_snapshot(config).await?;
    let summary = snapshot.summary();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let options = &summary.options;
    let first_month = options.months.first().map(ToString::to_string);
    let last_month = options.months.last().map(ToString::to_string);

    println!("crimemap summary");
    println!("----------------");
    println!("Incidents:        {}", summary.incidents);
    println!("ZIP codes:        {}", summary.zip_codes);
    println!("Boundaries:       {}", summary.boundaries);
    println!("Categories:       {}", options.categories.len());
    println!(
        "Months:           {} ({} to {})",
        options.months.len(),
        first_month.unwrap_or_default(),
        last_month.unwrap_or_default()
    );
    println!("Default category: {}", options.default_category);
    println!("Default month:    {}", options.default_month);
    Ok(())
}

fn handle_config(path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = load_config(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Sources]");
                println!("  Incidents URL:      {}", config.sources.incidents_url);
                println!("  Shapefile URL:      {}", config.sources.shapefile_url);
                println!("  Shapefile dir:      {}", config.shapefile_dir().display());
                println!(
                    "  Accept bad certs:   {}",
                    config.sources.accept_invalid_certs
                );
                println!();
                println!("[Cleaning]");
                println!("  Cutoff:             {}", config.cleaning.cutoff);
                println!("  ZIP column:         {}", config.cleaning.zip_column);
                println!("  Category column:    {}", config.cleaning.category_column);
                println!("  Timestamp column:   {}", config.cleaning.timestamp_column);
                println!();
                println!("[Dashboard]");
                println!("  Listen address:     {}", config.bind_addr());
                println!("  Default category:   {}", config.dashboard.default_category);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}

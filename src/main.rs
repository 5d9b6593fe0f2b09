mod config;
mod models;
mod normalize;
mod providers;
mod report;
mod schedule;
mod store;
mod tracker;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use providers::vendo::VendoClient;
use providers::{JourneyProvider, JourneyQuery};
use store::{ObservationSink, ObservationStore};
use tracker::TrackerRunner;

/// Track train ticket prices for one route over time
#[derive(Debug, Parser)]
#[command(name = "railtracker", version)]
struct Cli {
    /// YAML configuration file; built-in defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch current prices for the next target date and store them (default)
    Track,
    /// Fetch and print journeys without storing anything
    Preview,
    /// Print stored observations, oldest first
    History {
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "railtracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            Config::load(path)?
        }
        None => Config::default(),
    };

    match cli.command.unwrap_or(Command::Track) {
        Command::Track => track(config).await,
        Command::Preview => preview(config).await,
        Command::History { limit } => history(config, limit).await,
    }
}

async fn track(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = VendoClient::new(&config.provider, &config.contact)?;
    let store = ObservationStore::open(&config.database).await?;
    let database = config.database.clone();

    let runner = TrackerRunner::new(client, store, config);
    let result = runner.run().await;
    runner.sink().close().await;

    match result {
        Ok(summary) => {
            info!(
                saved = summary.saved_count,
                target_date = %models::format_timestamp(&summary.target_date),
                database = %database.display(),
                "Tracker run finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Tracker run failed");
            Err(e.into())
        }
    }
}

async fn preview(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = VendoClient::new(&config.provider, &config.contact)?;
    let when = config.schedule;
    let target_date = schedule::next_occurrence(&Local::now(), when.weekday, when.time_of_day)?
        .with_timezone(&Utc);

    println!("Checking prices for {}...", models::format_timestamp(&target_date));

    let query = JourneyQuery::from_config(&config, target_date);
    let response = match client.journeys(&query).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Failed to fetch journeys");
            return Err(e.into());
        }
    };

    for (index, journey) in response.journeys.iter().enumerate() {
        for line in report::journey_lines(index, journey) {
            println!("{line}");
        }
    }

    Ok(())
}

async fn history(config: Config, limit: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let store = ObservationStore::open(&config.database).await?;
    store.ensure_schema().await?;

    let total = store.count().await?;
    let observations = store.list(limit).await?;
    store.close().await;

    println!("{} observations stored in {}", total, config.database.display());
    for observation in &observations {
        println!("{}", report::history_line(observation));
    }

    Ok(())
}

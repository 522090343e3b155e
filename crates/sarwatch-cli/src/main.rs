//! Sarwatch CLI: the batch entry points of the pipeline.
//!
//! Configuration comes from the environment (optionally a `.env` file); see
//! `sarwatch_core::Config`.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sarwatch_cli::{build_event, init_tracing, to_pretty_json};
use sarwatch_core::Config;
use sarwatch_db::{collect_all, create_catalog, CatalogStore, CatalogStreams};
use sarwatch_services::{AsfSearchClient, FindNewService, HarvestService, Hyp3Client};
use sarwatch_storage::create_storage;

#[derive(Parser)]
#[command(name = "sarwatch", about = "Satellite event processing pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit processing jobs for granules not yet processed
    FindNew {
        /// Only process this event
        #[arg(long)]
        event_id: Option<String>,
    },
    /// Poll submitted jobs and publish finished products
    Harvest,
    /// List all events
    Events,
    /// Create or replace an event
    AddEvent {
        #[arg(long)]
        event_id: String,
        /// Start of the processing timeframe (RFC 3339; no offset means UTC)
        #[arg(long)]
        start: String,
        /// End of the processing timeframe; open-ended when omitted
        #[arg(long)]
        end: Option<String>,
        /// Area of interest as WKT
        #[arg(long)]
        wkt: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::FindNew { event_id } => {
            config.validate_find_new()?;
            let catalog = create_catalog(&config.catalog).await?;
            let search = AsfSearchClient::new(&config.search)?;
            let jobs = Hyp3Client::connect(&config.hyp3).await?;

            let service = FindNewService::new(
                catalog,
                Arc::new(search),
                Arc::new(jobs),
                config.job_profiles.clone(),
                config.search.max_neighbors,
            );
            let summary = match event_id {
                Some(event_id) => service.run_for_event(&event_id).await?,
                None => service.run().await?,
            };
            println!("{}", to_pretty_json(&summary)?);
        }
        Commands::Harvest => {
            config.validate_harvest()?;
            let catalog = create_catalog(&config.catalog).await?;
            let jobs = Hyp3Client::connect(&config.hyp3).await?;
            let storage = create_storage(&config.storage).await?;

            let service = HarvestService::new(catalog, Arc::new(jobs), storage)?;
            let summary = service.run().await?;
            println!("{}", to_pretty_json(&summary)?);
        }
        Commands::Events => {
            config.validate()?;
            let catalog = create_catalog(&config.catalog).await?;
            let events = collect_all(catalog.events()).await?;
            println!("{}", to_pretty_json(&events)?);
        }
        Commands::AddEvent {
            event_id,
            start,
            end,
            wkt,
        } => {
            config.validate()?;
            let event = build_event(&event_id, &start, end.as_deref(), wkt)?;
            let catalog = create_catalog(&config.catalog).await?;
            catalog.put_event(&event).await?;
            tracing::info!(event_id = %event.event_id, "Event saved");
            println!("{}", to_pretty_json(&event)?);
        }
    }

    Ok(())
}

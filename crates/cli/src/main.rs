//! Guindaste CLI - catalog, region and cart tools for the quoting layer.
//!
//! # Usage
//!
//! ```bash
//! # Load the catalog and list capacities
//! gq-cli catalog load
//!
//! # Cranes offered at 6.5 t
//! gq-cli catalog capacity 6.5
//!
//! # Resolve a vendor's region label
//! gq-cli region normalize "Rio Grande do Sul" --without-ie
//!
//! # Reprice the saved cart for a vendor
//! gq-cli cart reprice --vendor-region "Rio Grande do Sul" --without-ie --step payment
//! ```
//!
//! # Commands
//!
//! - `catalog` - Load the catalog and query its indexes
//! - `region` - Normalize region labels and state codes
//! - `cart` - Inspect and reprice the persisted cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use guindaste_quoting::cart::QuoteStep;
use guindaste_quoting::config::QuotingConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "gq-cli")]
#[command(author, version, about = "Guindaste quoting tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and query the equipment catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Resolve pricing regions
    Region {
        #[command(subcommand)]
        action: RegionAction,
    },
    /// Inspect and reprice the saved cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Load the catalog and summarize its capacities
    Load {
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },
    /// List cranes with a capacity (e.g. 6.5)
    Capacity { value: String },
    /// List cranes with a model key (e.g. "GSI 6.5")
    Model { name: String },
}

#[derive(Subcommand)]
enum RegionAction {
    /// Map a free-form region label to a pricing region
    Normalize {
        label: String,

        /// Customer has no state tax registration
        #[arg(long)]
        without_ie: bool,
    },
    /// Map a two-letter state code to a pricing region
    State { uf: String },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the saved cart
    Show {
        /// Print the stored JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Re-resolve equipment prices for a vendor region
    Reprice {
        /// Vendor region label as stored on the vendor record
        #[arg(long)]
        vendor_region: String,

        /// Customer has no state tax registration
        #[arg(long)]
        without_ie: bool,

        /// Current quote step (name or 1-5)
        #[arg(long, default_value = "payment")]
        step: QuoteStep,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "guindaste_quoting=info,guindaste_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Catalog { action } => {
            let config = QuotingConfig::from_env()?;
            match action {
                CatalogAction::Load { refresh } => commands::catalog::load(&config, refresh).await?,
                CatalogAction::Capacity { value } => {
                    commands::catalog::capacity(&config, &value).await?;
                }
                CatalogAction::Model { name } => commands::catalog::model(&config, &name).await?,
            }
        }
        Commands::Region { action } => match action {
            RegionAction::Normalize { label, without_ie } => {
                commands::region::normalize(&label, !without_ie);
            }
            RegionAction::State { uf } => commands::region::state(&uf),
        },
        Commands::Cart { action } => {
            let config = QuotingConfig::from_env()?;
            match action {
                CartAction::Show { json } => commands::cart::show(&config, json)?,
                CartAction::Reprice {
                    vendor_region,
                    without_ie,
                    step,
                } => {
                    commands::cart::reprice(&config, vendor_region, !without_ie, step).await?;
                }
            }
        }
    }
    Ok(())
}

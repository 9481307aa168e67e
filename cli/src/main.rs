//! Fulfillment operator CLI - webhook retry sweeps and delivery inspection

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use fulfillment::models::PageParams;
use fulfillment::store::{self, Store};
use fulfillment::webhook::{DeliveryStatus, DeliveryStore, Dispatcher, DispatcherConfig};

#[derive(Parser)]
#[command(name = "fulfillment-cli")]
#[command(about = "Operator tools for the fulfillment server")]
#[command(version)]
struct Cli {
    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:fulfillment.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deliver orphaned PENDING records and retry FAILED ones, once
    Sweep {
        /// Attempts after which a failed record is left alone
        #[arg(long, env = "WEBHOOK_MAX_ATTEMPTS", default_value_t = 3)]
        max_attempts: i64,

        /// Per-attempt timeout in seconds
        #[arg(long, env = "WEBHOOK_TIMEOUT_SECS", default_value_t = 10)]
        timeout_secs: u64,

        /// Skip orphaned PENDING records
        #[arg(long)]
        failed_only: bool,
    },

    /// Print an organization's delivery records as JSON lines
    Deliveries {
        /// Organization ID
        #[arg(short, long)]
        org: Uuid,

        /// PENDING, SUCCESS or FAILED
        #[arg(short, long)]
        status: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fulfillment=info,fulfillment_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let pool = store::connect(&cli.database_url, 2).await?;
    let store = Store::new(pool);

    match cli.command {
        Commands::Sweep {
            max_attempts,
            timeout_secs,
            failed_only,
        } => run_sweep(store, max_attempts, timeout_secs, failed_only).await,
        Commands::Deliveries {
            org,
            status,
            page,
            limit,
        } => run_deliveries(store, org, status.as_deref(), page, limit).await,
    }
}

async fn run_sweep(store: Store, max_attempts: i64, timeout_secs: u64, failed_only: bool) -> Result<()> {
    let config = DispatcherConfig {
        timeout: Duration::from_secs(timeout_secs.max(1)),
        max_attempts: max_attempts.max(1),
        deliver_on_enqueue: false,
        ..Default::default()
    };
    let dispatcher = Dispatcher::new(store, config)?;

    let report = if failed_only {
        dispatcher.retry_failed(dispatcher.config().max_attempts).await?
    } else {
        dispatcher.sweep().await?
    };

    println!(
        "attempted={} delivered={} failed={}",
        report.attempted, report.delivered, report.failed
    );
    Ok(())
}

async fn run_deliveries(
    store: Store,
    org: Uuid,
    status: Option<&str>,
    page: u32,
    limit: u32,
) -> Result<()> {
    let status = status
        .map(|s| s.to_uppercase().parse::<DeliveryStatus>())
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let deliveries = DeliveryStore::new(store.pool().clone());
    let result = deliveries
        .list_for_organization(org, status, PageParams::new(page, limit))
        .await?;

    for record in &result.data {
        println!("{}", serde_json::to_string(record)?);
    }
    tracing::info!(
        shown = result.data.len(),
        total = result.pagination.total,
        pages = result.pagination.pages,
        "Listed deliveries"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sweep() {
        let cli = Cli::try_parse_from(["fulfillment-cli", "sweep", "--max-attempts", "5"]).unwrap();
        match cli.command {
            Commands::Sweep {
                max_attempts,
                failed_only,
                ..
            } => {
                assert_eq!(max_attempts, 5);
                assert!(!failed_only);
            }
            _ => panic!("expected sweep"),
        }
    }

    #[test]
    fn test_parse_deliveries() {
        let org = Uuid::new_v4();
        let org_arg = org.to_string();
        let cli = Cli::try_parse_from([
            "fulfillment-cli",
            "deliveries",
            "--org",
            org_arg.as_str(),
            "--status",
            "FAILED",
        ])
        .unwrap();
        match cli.command {
            Commands::Deliveries { org: parsed, status, .. } => {
                assert_eq!(parsed, org);
                assert_eq!(status.as_deref(), Some("FAILED"));
            }
            _ => panic!("expected deliveries"),
        }
    }

    #[test]
    fn test_deliveries_requires_org() {
        assert!(Cli::try_parse_from(["fulfillment-cli", "deliveries"]).is_err());
    }
}

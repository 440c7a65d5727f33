use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use salesboard::config::{Config, DatabaseBackend};
use salesboard::seed::{self, SeedOptions};
use salesboard::storage::{PostgresStorage, SqliteStorage, Storage};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "salesboard-admin")]
#[command(about = "Salesboard data management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic customers, products and sales
    Seed {
        #[arg(long, default_value_t = 50)]
        customers: usize,
        #[arg(long, default_value_t = 30)]
        products: usize,
        #[arg(long, default_value_t = 500)]
        sales: usize,
        /// Delete existing customers, products and sales first
        #[arg(long)]
        clear: bool,
    },
    /// Inspect saved reports
    Reports {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// List saved reports, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Print one report as JSON
    Show {
        /// Report ID
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Postgres => Arc::new(
            PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
    };

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::Seed {
            customers,
            products,
            sales,
            clear,
        } => {
            let options = SeedOptions {
                customers,
                products,
                sales,
                clear,
            };
            let summary = seed::seed(storage.as_ref(), &options).await?;
            println!(
                "✓ Created {} customers, {} products, {} sales",
                summary.customers, summary.products, summary.sales
            );
        }
        Commands::Reports {
            command: ReportCommands::List { limit, offset },
        } => {
            let reports = storage
                .list_reports(limit.clamp(1, 100), offset.max(0))
                .await?;
            if reports.is_empty() {
                println!("No reports found.");
            } else {
                println!(
                    "{:<8} {:<26} {:<12} {:>14} {:>8}",
                    "ID", "Created", "From", "Revenue", "Sales"
                );
                println!("{}", "-".repeat(72));
                for report in reports {
                    println!(
                        "{:<8} {:<26} {:<12} {:>14} {:>8}",
                        report.id,
                        report.created_at.to_rfc3339(),
                        report.date_range.start_date.format("%Y-%m-%d"),
                        report.total_revenue,
                        report.total_sales
                    );
                }
            }
        }
        Commands::Reports {
            command: ReportCommands::Show { id },
        } => match storage.get_report(id).await? {
            Some(report) => {
                let json = serde_json::to_string_pretty(&report)
                    .context("failed to encode report")?;
                println!("{json}");
            }
            None => println!("⚠ Report {} not found", id),
        },
    }

    Ok(())
}

mod api;
mod config;
mod models;
mod pipeline;
mod query;
mod ranking;
mod registry;
mod scraper;
mod storage;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::models::DayKey;
use crate::pipeline::Pipeline;
use crate::query::QueryService;
use crate::registry::Registry;
use crate::scraper::ChartinkScraper;
use crate::storage::SnapshotStore;

#[derive(Parser)]
#[command(name = "screener-snapshots", about = "Daily Chartink screener snapshots", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every screener and store today's snapshot
    Update,

    /// Serve the JSON API and report
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(short, long, env = "SCREENER_BIND")]
        bind: Option<String>,
    },

    /// List stored days and index entries
    Days,

    /// Print a stored table (or all of them)
    Show {
        /// Screener id, or "all"
        #[arg(short, long, default_value = query::ALL_TABLES)]
        screener: String,

        /// YYYY_MM_DD or YYYY-MM-DD (default: latest)
        #[arg(short, long)]
        day: Option<DayKey>,
    },

    /// Print the technical analysis report as HTML
    Report {
        #[arg(short, long)]
        day: Option<DayKey>,
    },

    /// List registered screeners
    Screeners,
}

fn build_pipeline(config: &AppConfig, registry: Arc<Registry>, store: SnapshotStore) -> Result<Pipeline> {
    let source = Arc::new(ChartinkScraper::new(&config.scraper)?);
    Ok(Pipeline::new(registry, source, store, &config.scraper))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "screener_snapshots=info,warn",
        1 => "screener_snapshots=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let registry = Arc::new(Registry::builtin());
    let store = SnapshotStore::open(&config.storage)?;

    match cli.command {
        Command::Update => {
            let _t = utils::Timer::start("Screener update");
            let stats = build_pipeline(&config, registry, store)?.run().await?;
            info!(
                "Done: {} screeners, {} placeholders → {:?}",
                stats.screeners, stats.placeholders, stats.location
            );
        }

        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let pipeline = build_pipeline(&config, registry.clone(), store.clone())?;
            let state = AppState {
                query: QueryService::new(store, registry),
                pipeline: Arc::new(pipeline),
            };
            info!("Using daily snapshots in {:?}", config.storage.daily_dir);
            api::serve(state, &bind).await?;
        }

        Command::Days => {
            let days = store.list_days()?;
            let indexed = store.indexed_days()?;
            if days.is_empty() {
                println!("No snapshots yet, run `screener-snapshots update` first.");
            } else {
                println!("{} stored days:", days.len());
                for d in &days {
                    let mark = if indexed.iter().any(|(i, _)| i == d) { "" } else { "  (not indexed)" };
                    println!("  {}{}", d, mark);
                }
            }
        }

        Command::Show { screener, day } => {
            let svc = QueryService::new(store, registry);
            let tables = svc.get_table(day.as_ref(), &screener)?;
            for (id, rows) in &tables {
                println!("─── {} ({} rows)", id, rows.len());
                for r in rows {
                    println!(
                        "  {:<32} {:>10.2} {:>7.2}% {:>14}  {}",
                        r.stock_name,
                        r.price,
                        r.change,
                        utils::fmt_number(r.volume),
                        r.symbol
                    );
                }
            }
        }

        Command::Report { day } => {
            let svc = QueryService::new(store, registry);
            let doc = svc.get_report(day.as_ref(), chrono::Local::now().date_naive())?;
            println!("{}", doc.content);
        }

        Command::Screeners => {
            for s in registry.info() {
                let state = if s.configured { "configured" } else { "placeholder" };
                println!("  {:<26} {:<12} {}", s.id, state, s.title);
                for line in &s.formula {
                    println!("  {:<26} {:<12}   {}", "", "", line);
                }
            }
        }
    }

    Ok(())
}

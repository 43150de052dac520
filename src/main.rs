use clap::{Parser, Subcommand};
use sentence_invoice::calculator::format_currency;
use sentence_invoice::{Config, Pipeline, TransactionStore, compute};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Turn a sentence describing a sale into a stored record and a PDF invoice
#[derive(Parser)]
#[command(name = "sentence-invoice")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one sentence (all remaining args are joined)
    Process { sentence: Vec<String> },

    /// Read sentences from stdin, one per line
    Repl,

    /// Print a stored transaction with recomputed totals
    Show { id: i64 },

    /// List the most recent stored transactions, newest first
    Recent {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Print stored transaction counts per extraction tier
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // init tracing
    let default_filter = if cli.verbose { "sentence_invoice=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let cfg = Config::load_or_default(cli.config.as_deref())?;
    let db = open_store(&cfg.storage.db_path)?;

    match cli.command {
        Commands::Process { sentence } => {
            let pipeline = Pipeline::new(cfg);
            let sentence = sentence.join(" ");
            match pipeline.submit(&db, &sentence).await? {
                Some(submission) => println!("{}", serde_json::to_string_pretty(&submission)?),
                None => info!("Nothing to process"),
            }
        }
        Commands::Repl => {
            let pipeline = Pipeline::new(cfg);
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(submission) = pipeline.submit(&db, &line).await? {
                    println!("{}", serde_json::to_string_pretty(&submission)?);
                }
            }
        }
        Commands::Show { id } => {
            let stored = db
                .get_transaction(id)?
                .ok_or_else(|| format!("No transaction found with id {id}"))?;
            let totals = compute(&stored.record);
            let json = serde_json::json!({
                "id": stored.id,
                "uid": stored.uid,
                "sentence": stored.sentence,
                "normalized_sentence": stored.normalized_sentence,
                "tier": stored.tier,
                "created_at": stored.created_at,
                "record": stored.record,
                "totals": totals,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Recent { limit } => {
            for stored in db.recent_transactions(limit)? {
                let totals = compute(&stored.record);
                println!(
                    "#{} [{}] {} -> {}",
                    stored.id,
                    stored.tier.map_or("?", |t| t.as_str()),
                    stored.sentence,
                    format_currency(totals.total),
                );
            }
        }
        Commands::Stats => {
            let (total, parsed, salvaged, fallback) = db.get_counts()?;
            info!(total, parsed, salvaged, fallback, "Database statistics");
            println!("total={total} parsed={parsed} salvaged={salvaged} fallback_used={fallback}");
        }
    }

    Ok(())
}

fn open_store(db_path: &str) -> Result<TransactionStore, Box<dyn std::error::Error>> {
    if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(TransactionStore::new(db_path)?)
}

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use searchbox_core::{EngineConfig, ReindexOutcome, SearchEngine};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searchbox-indexer")]
#[command(about = "Scan a folder into an in-memory BM25 index and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IndexArgs {
    /// Folder to index (.md .txt .html)
    folder: PathBuf,
    /// Optional JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// BM25 term-frequency saturation
    #[arg(long)]
    k1: Option<f64>,
    /// BM25 length normalization
    #[arg(long)]
    b: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the folder once and print statistics
    Scan {
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Index the folder once and print ranked hits for a query
    Search {
        #[command(flatten)]
        index: IndexArgs,
        /// Query string
        #[arg(long, short)]
        query: String,
        /// Maximum number of hits
        #[arg(long, default_value_t = 10)]
        limit: i64,
        /// Print snippets as HTML instead of fragment lists
        #[arg(long, default_value_t = false)]
        html: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { index } => {
            let engine = build_engine(&index)?;
            println!("{}", serde_json::to_string_pretty(&engine.stats())?);
            Ok(())
        }
        Commands::Search { index, query, limit, html } => {
            let engine = build_engine(&index)?;
            let limit = engine.config().clamp_limit(Some(limit));
            let results = engine.search(&query, limit);
            if html {
                for hit in &results.hits {
                    println!("{:.4}\t{}\t{}", hit.score, hit.path, hit.snippet.to_html());
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
            Ok(())
        }
    }
}

fn build_engine(args: &IndexArgs) -> Result<SearchEngine> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    config.root = args.folder.clone();
    if let Some(k1) = args.k1 {
        config.bm25.k1 = k1;
    }
    if let Some(b) = args.b {
        config.bm25.b = b;
    }

    let engine = SearchEngine::open(config)?;
    match engine.trigger_reindex()? {
        ReindexOutcome::Completed(report) => {
            tracing::info!(root = %args.folder.display(), added = report.added, skipped = report.skipped, "indexed folder");
        }
        ReindexOutcome::Coalesced => bail!("unexpected concurrent reindex"),
    }
    Ok(engine)
}

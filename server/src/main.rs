use anyhow::Result;
use axum::Router;
use clap::Parser;
use searchbox_core::{EngineConfig, SearchEngine};
use searchbox_server::{build_app, run_reindex, spawn_reindex_loop};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searchbox-server", about = "Local document search with a JSON API")]
struct Args {
    /// Folder to index (.md .txt .html)
    folder: PathBuf,
    /// Optional JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,
    /// Seconds between background reindex cycles
    #[arg(long)]
    interval: Option<u64>,
    /// BM25 term-frequency saturation
    #[arg(long)]
    k1: Option<f64>,
    /// BM25 length normalization
    #[arg(long)]
    b: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    config.root = args.folder.clone();
    if let Some(secs) = args.interval {
        config.reindex_interval_secs = secs;
    }
    if let Some(k1) = args.k1 {
        config.bm25.k1 = k1;
    }
    if let Some(b) = args.b {
        config.bm25.b = b;
    }
    let interval = config.reindex_interval();

    let engine = Arc::new(SearchEngine::open(config)?);
    if let Err(err) = run_reindex(engine.clone()).await {
        tracing::error!(error = %err, "initial index build failed");
    }
    let stats = engine.stats();
    tracing::info!(root = %args.folder.display(), docs = stats.document_count, terms = stats.term_count, "index ready");
    let _reindexer = spawn_reindex_loop(engine.clone(), interval);

    let app: Router = build_app(engine);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

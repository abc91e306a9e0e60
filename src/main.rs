//! Verdict command-line entrypoint.
//!
//! ```text
//! verdict run [request.json]         benchmark models, print the run as JSON
//! verdict latest                     print the latest recorded run
//! verdict history [limit] [model]    print recorded rows, newest first
//! verdict import-tree <nodes.json>   load classification nodes into the database
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use mimalloc::MiMalloc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use verdict::benchmark::{BenchmarkConfig, BenchmarkEngine, HttpCorpusSource};
use verdict::classifier::GenaiBackendFactory;
use verdict::config::Config;
use verdict::history::{RunRecorder, SqliteRunStore};
use verdict::routing::JsonRoutingTable;
use verdict::tree::{ClassificationNode, SqliteTreeStorage, TreeCache};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "usage: verdict <run [request.json] | latest | history [limit] [model] | import-tree <nodes.json>>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    tracing::debug!(config = ?config, "Configuration loaded");

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("run") => run(&config, args.get(1).map(String::as_str)).await,
        Some("latest") => latest(&config).await,
        Some("history") => history(&config, args.get(1), args.get(2)).await,
        Some("import-tree") => match args.get(1) {
            Some(path) => import_tree(&config, Path::new(path)).await,
            None => bail!(USAGE),
        },
        _ => bail!(USAGE),
    }
}

async fn run(config: &Config, request_path: Option<&str>) -> anyhow::Result<()> {
    let request: BenchmarkConfig = match request_path {
        Some(path) => {
            let raw = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read request file {}", path))?;
            serde_json::from_slice(&raw).context("request file is not a valid benchmark request")?
        }
        None => BenchmarkConfig::default(),
    };

    ensure_parent_dir(&config.database_path)?;
    let tree_cache = Arc::new(TreeCache::new(Arc::new(SqliteTreeStorage::open(
        &config.database_path,
    )?)));
    let recorder = RunRecorder::new(Arc::new(SqliteRunStore::open(&config.database_path)?));
    let routing = Arc::new(JsonRoutingTable::load(&config.routing_path).await?);
    let backends = Arc::new(GenaiBackendFactory::new(
        config.api_key.clone(),
        config.rate_limit_rps,
    ));

    let mut engine = BenchmarkEngine::new(routing.clone(), backends, tree_cache)
        .with_routing(routing)
        .with_recorder(recorder)
        .with_model_timeout(config.model_timeout)
        .with_inner_concurrency(config.inner_concurrency)
        .with_min_confidence(config.min_confidence);
    if let Some(url) = &config.dataset_url {
        engine = engine.with_corpus_source(Arc::new(HttpCorpusSource::new(url.clone())?));
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    tracing::info!(
        database = %config.database_path.display(),
        routing = %config.routing_path.display(),
        "Verdict benchmark starting"
    );
    let run = engine.run_with_cancel(&request, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}

async fn latest(config: &Config) -> anyhow::Result<()> {
    let recorder = RunRecorder::new(Arc::new(SqliteRunStore::open(&config.database_path)?));
    let rows = recorder.latest().await?;
    if rows.is_empty() {
        tracing::warn!("No benchmark runs recorded yet");
    }
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

async fn history(
    config: &Config,
    limit: Option<&String>,
    model: Option<&String>,
) -> anyhow::Result<()> {
    let limit = limit.map(|l| parse_history_limit(l)).transpose()?;
    let recorder = RunRecorder::new(Arc::new(SqliteRunStore::open(&config.database_path)?));
    let rows = recorder.history(limit, model.map(String::as_str)).await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

async fn import_tree(config: &Config, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let nodes: Vec<ClassificationNode> =
        serde_json::from_slice(&raw).context("nodes file must be a JSON array of nodes")?;

    ensure_parent_dir(&config.database_path)?;
    let storage = SqliteTreeStorage::open(&config.database_path)?;
    let written = storage.insert_nodes(nodes).await?;

    // Build once so broken hierarchies are reported at import time.
    let tree = TreeCache::new(Arc::new(storage))
        .try_get()
        .await
        .context("imported nodes do not form a usable tree")?;
    tracing::info!(
        written,
        nodes = tree.len(),
        sections = tree.section_count(),
        "Classification tree imported"
    );
    Ok(())
}

fn parse_history_limit(raw: &str) -> anyhow::Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => bail!("history limit must be a positive integer, got 0"),
        Ok(limit) => Ok(limit),
        Err(e) => Err(e).with_context(|| {
            format!("history limit must be a positive integer, got '{}'", raw)
        }),
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

async fn cancel_on_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, cancelling benchmark");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, cancelling benchmark");
        }
    }
    cancel.cancel();
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tweetgraph_common::{load_config, Config, FileConfig};
use tweetgraph_graph::{migrate::migrate, GraphClient, GraphStore, GraphWriter, MemoryGraphStore};
use tweetgraph_ingest::{Ingestor, JsonLinesSource, RunLog};

#[derive(Parser)]
#[command(name = "tweetgraph", about = "Ingest a tweet stream into a property graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a newline-delimited JSON file of feed records
    Ingest {
        input: PathBuf,
        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Ingest into an in-memory graph instead of Neo4j
        #[arg(long)]
        dry_run: bool,
        /// Write a JSON run log under $DATA_DIR/ingest-runs
        #[arg(long)]
        run_log: bool,
    },
    /// Create constraints and indexes, then exit
    Migrate {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tweetgraph=info".parse()?))
        .init();

    match Cli::parse().command {
        Command::Ingest {
            input,
            config,
            dry_run,
            run_log,
        } => {
            let file_config = file_config(config.as_deref())?;
            if dry_run {
                info!("Dry run: ingesting into an in-memory graph");
                let store = MemoryGraphStore::new();
                ingest(&store, &input, &file_config, run_log).await
            } else {
                let client = connect(&file_config).await?;
                let writer = GraphWriter::new(client);
                writer
                    .ensure_schema()
                    .await
                    .context("Failed to bootstrap graph schema")?;
                ingest(&writer, &input, &file_config, run_log).await
            }
        }
        Command::Migrate { config } => {
            let file_config = file_config(config.as_deref())?;
            let client = connect(&file_config).await?;
            migrate(&client).await.context("Migration failed")?;
            info!("Migrations complete");
            Ok(())
        }
    }
}

fn file_config(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(path) => {
            let config = load_config(path)?;
            info!(path = %path.display(), "Loaded config file");
            Ok(config)
        }
        None => Ok(FileConfig::default()),
    }
}

async fn connect(file_config: &FileConfig) -> Result<GraphClient> {
    let config = Config::from_env()?;
    config.log_redacted();

    let client = GraphClient::connect_with(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
        &file_config.graph,
    )
    .await
    .context("Failed to connect to Neo4j")?;
    client.ping().await.context("Neo4j did not answer")?;
    Ok(client)
}

async fn ingest<S: GraphStore + ?Sized>(
    store: &S,
    input: &Path,
    file_config: &FileConfig,
    with_run_log: bool,
) -> Result<()> {
    let mut source = JsonLinesSource::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let mut ingestor = Ingestor::new(store, &file_config.ingest);
    if with_run_log {
        let run_id = uuid::Uuid::new_v4().to_string();
        info!(%run_id, "Recording run log");
        ingestor = ingestor.with_run_log(RunLog::new(run_id, input.display().to_string()));
    }

    info!(input = %input.display(), "Ingest run starting");
    let result = ingestor.run(&mut source).await;

    let (stats, run_log) = ingestor.into_parts();
    if let Some(log) = run_log {
        if let Err(e) = log.save(&stats) {
            warn!(error = %e, "Failed to save run log");
        }
    }

    result?;
    info!("Ingest run complete. {stats}");
    Ok(())
}

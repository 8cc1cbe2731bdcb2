//! Demo binary wiring every crate into two runnable commands: a sync run
//! against a generic REST source, and a search query against whatever a
//! prior sync wrote. Config load and tracing init live only here, following
//! `rootsignal-server`'s `main.rs`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use airweave_archive::ArchiveWriter;
use airweave_chunking::chunker::{Chunker, SemanticChunker};
use airweave_chunking::embedder::{default_chunk_config_for, DeterministicEmbedder, Embedder, HttpEmbedder};
use airweave_common::sync_config::SyncConfig;
use airweave_destinations::{Destination, PgVectorDestination};
use airweave_dispatch::{ArchiveHandler, DestinationHandler, DispatcherBuilder, MetadataHandler};
use airweave_llm::{ChatClient, OpenAiCompatibleClient};
use airweave_metadata::{connect_and_migrate, SyncStore};
use airweave_ratelimit::{PerPodLimiter, SourceLimiter, SourceLimiterScope, SourceRateLimitConfig};
use airweave_search::{SearchDefaults, SearchPipeline, SearchPipelineRequest};
use airweave_sources::{GenericRestConfig, GenericRestSource, RateLimitedHttpClient};
use airweave_storage::local::LocalStorage;
use airweave_storage::StorageBackend;
use airweave_sync::{BatchingConfig, SyncOrchestrator};

mod config;
use config::Config;

#[derive(Parser)]
#[command(name = "airweave", about = "Data ingestion and retrieval pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pending database migrations and exit.
    Migrate,

    /// Run one sync against a generic paginated REST source.
    Sync {
        #[arg(long)]
        source_url: String,
        #[arg(long, default_value = "doc")]
        entity_type: String,
        #[arg(long)]
        organization_id: Option<Uuid>,
        #[arg(long)]
        collection_id: Option<Uuid>,
        #[arg(long, value_enum, default_value = "normal")]
        preset: Preset,
    },

    /// Run a search query against a collection.
    Search {
        #[arg(long)]
        collection_id: Uuid,
        query: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Normal,
    QdrantOnly,
    VespaOnly,
    ArchiveOnly,
    ReplayFromArchive,
}

impl Preset {
    fn into_sync_config(self) -> SyncConfig {
        match self {
            Preset::Normal => SyncConfig::normal(),
            Preset::QdrantOnly => SyncConfig::qdrant_only(),
            Preset::VespaOnly => SyncConfig::vespa_only(),
            Preset::ArchiveOnly => SyncConfig::archive_only(),
            Preset::ReplayFromArchive => SyncConfig::replay_from_archive(),
        }
    }
}

const VECTOR_TABLE: &str = "entity_vectors";

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    // Blocking work (BPE chunking) shares this pool rather than spawning an
    // OS thread per call; size is tunable since a pod with many concurrent
    // syncs needs more headroom than a single local run.
    let blocking_threads: usize = std::env::var("AIRWEAVE_BLOCKING_THREADS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(blocking_threads)
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run())
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    match cli.command {
        Commands::Migrate => cmd_migrate(&config).await,
        Commands::Sync {
            source_url,
            entity_type,
            organization_id,
            collection_id,
            preset,
        } => cmd_sync(&config, source_url, entity_type, organization_id, collection_id, preset).await,
        Commands::Search { collection_id, query } => cmd_search(&config, collection_id, query).await,
    }
}

async fn cmd_migrate(config: &Config) -> Result<()> {
    connect_and_migrate(&config.database_url)
        .await
        .context("failed to connect and migrate")?;
    tracing::info!("migrations complete");
    Ok(())
}

async fn redis_connection(config: &Config) -> Result<redis::aio::ConnectionManager> {
    let client = redis::Client::open(config.redis_url.clone()).context("invalid REDIS_URL")?;
    client
        .get_connection_manager()
        .await
        .context("failed to connect to redis")
}

fn build_embedder(config: &Config, limiter: Arc<PerPodLimiter>) -> Arc<dyn Embedder> {
    match &config.embedding_endpoint {
        Some(endpoint) => Arc::new(HttpEmbedder::new(
            reqwest::Client::new(),
            endpoint.clone(),
            config.embedding_api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_vector_size,
            limiter,
        )),
        None => {
            tracing::warn!("no EMBEDDING_ENDPOINT configured, using deterministic placeholder embedder");
            Arc::new(DeterministicEmbedder::new(config.embedding_vector_size))
        }
    }
}

fn build_chat_client(config: &Config, limiter: Arc<PerPodLimiter>) -> Arc<dyn ChatClient> {
    Arc::new(OpenAiCompatibleClient::new(
        reqwest::Client::new(),
        config.chat_endpoint.clone(),
        config.chat_api_key.clone(),
        config.chat_model.clone(),
        limiter,
    ))
}

async fn cmd_sync(
    config: &Config,
    source_url: String,
    entity_type: String,
    organization_id: Option<Uuid>,
    collection_id: Option<Uuid>,
    preset: Preset,
) -> Result<()> {
    let pool = connect_and_migrate(&config.database_url)
        .await
        .context("failed to connect and migrate")?;
    let redis = redis_connection(config).await?;

    let organization_id = organization_id.unwrap_or_else(Uuid::new_v4);
    let collection_id = collection_id.unwrap_or_else(Uuid::new_v4);
    let source_connection_id = Uuid::new_v4();
    let sync_config = preset.into_sync_config();

    let sync_row = SyncStore::new(&pool)
        .create(organization_id, "cli-demo-sync", source_connection_id, collection_id, &sync_config)
        .await
        .context("failed to create sync row")?;

    let per_pod_limiter = Arc::new(PerPodLimiter::new(
        config.per_pod_limit,
        Duration::from_secs(config.per_pod_window_secs),
        Duration::from_secs(config.per_pod_timeout_secs),
    ));

    let source_limiter = Arc::new(SourceLimiter::new(config.rate_limit_enabled));
    let http = RateLimitedHttpClient::new(
        reqwest::Client::new(),
        redis,
        source_limiter,
        organization_id,
        "generic_rest",
        SourceLimiterScope::Organization,
        SourceRateLimitConfig {
            limit: 100,
            window_secs: 60,
        },
    );

    let source = Arc::new(GenericRestSource::new(GenericRestConfig {
        base_url: source_url,
        entity_type_id: entity_type,
        page_size: 50,
    }));

    let bpe = Arc::new(tiktoken_rs::cl100k_base().expect("cl100k_base encoder is bundled"));
    let chunk_config = default_chunk_config_for(config.embedding_vector_size);
    let chunker: Arc<dyn Chunker> = Arc::new(SemanticChunker::new(bpe, chunk_config));
    let embedder = build_embedder(config, per_pod_limiter.clone());

    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(config.storage_root.clone()));

    let destination: Arc<dyn Destination> = Arc::new(PgVectorDestination::new(pool.clone(), VECTOR_TABLE));
    let destination_handler = Arc::new(DestinationHandler::new("pgvector", destination));
    let archive_handler = Arc::new(ArchiveHandler::new(ArchiveWriter::new(storage.clone())));
    let metadata_handler = Arc::new(MetadataHandler::new(pool.clone()));

    let dispatcher = DispatcherBuilder::new()
        .with_destination_handler(&sync_config.handlers, destination_handler)
        .with_archive_handler(&sync_config.handlers, archive_handler)
        .with_metadata_handler(&sync_config.handlers, metadata_handler)
        .build();

    let batching = match config.worker_count {
        Some(worker_count) => BatchingConfig {
            worker_count,
            ..BatchingConfig::default()
        },
        None => BatchingConfig::from_env(),
    };

    let orchestrator = SyncOrchestrator::new(
        pool,
        source,
        chunker,
        embedder,
        storage,
        dispatcher,
        sync_row.id,
        organization_id,
        collection_id,
        sync_config,
        batching,
    );

    let outcome = orchestrator.run(http, None).await?;
    tracing::info!(?outcome, "sync run finished");
    Ok(())
}

async fn cmd_search(config: &Config, collection_id: Uuid, query: String) -> Result<()> {
    let pool = connect_and_migrate(&config.database_url)
        .await
        .context("failed to connect and migrate")?;

    let per_pod_limiter = Arc::new(PerPodLimiter::new(
        config.per_pod_limit,
        Duration::from_secs(config.per_pod_window_secs),
        Duration::from_secs(config.per_pod_timeout_secs),
    ));

    let chat = build_chat_client(config, per_pod_limiter.clone());
    let embedder = build_embedder(config, per_pod_limiter);
    let destination: Arc<dyn Destination> = Arc::new(PgVectorDestination::new(pool, VECTOR_TABLE));
    let defaults = SearchDefaults::load(&config.search_defaults_path)
        .with_context(|| format!("failed to load {}", config.search_defaults_path))?;
    let bpe = Arc::new(tiktoken_rs::cl100k_base().expect("cl100k_base encoder is bundled"));

    let pipeline = SearchPipeline::new(chat, embedder, destination, defaults, bpe);

    let response = pipeline
        .run(SearchPipelineRequest {
            collection_id,
            query,
            ..Default::default()
        })
        .await
        .context("search failed")?;

    println!("{}", serde_json::to_string_pretty(&SearchResponseView::from(response))?);
    Ok(())
}

#[derive(serde::Serialize)]
struct SearchResponseView {
    hits: usize,
    expanded_queries: Vec<String>,
    answer: Option<String>,
}

impl From<airweave_search::SearchResponse> for SearchResponseView {
    fn from(response: airweave_search::SearchResponse) -> Self {
        Self {
            hits: response.hits.len(),
            expanded_queries: response.expanded_queries,
            answer: response.answer,
        }
    }
}

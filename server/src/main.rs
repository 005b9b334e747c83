//! `hybridrag` binary — thin CLI shell over the [`hybridrag_server`] library
//! crate: clap derive CLI, a tracing-subscriber init with an env-filter
//! default directive, and a ctrl_c/SIGTERM `shutdown_signal` select used
//! for graceful axum shutdown.

use clap::{Parser, Subcommand};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use hybridrag_core::config::get_settings;
use hybridrag_graph::RepoGraphCache;
use hybridrag_ingest::{DeterministicEmbeddingProvider, FastEmbedProvider, IngestionPipeline, IngestionStatusStore};
use hybridrag_retrieval::{HttpLlmClient, LlmClient, NoopLlmClient};
use hybridrag_server::pg_store::PgGraphStore;
use hybridrag_server::routes::router;
use hybridrag_server::state::{default_tokenizer, run_migrations, AppState};
use hybridrag_vectorstore::PgVectorStore;
use sqlx::postgres::PgPoolOptions;

/// Hybrid vector+graph RAG server — repo/document ingestion and retrieval
/// over a Postgres + pgvector backend.
#[derive(Parser)]
#[command(name = "hybridrag", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default when no subcommand is given).
    Serve {
        /// Bind address.
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,

        /// Use an in-process embedding stub instead of FastEmbed, and a
        /// no-op LLM client instead of `LLM_SERVICE_URL` — useful for
        /// local smoke-testing without model downloads or a live LLM.
        #[arg(long)]
        fake_backends: bool,

        /// Scratch directory for repo clones.
        #[arg(long)]
        clone_dir: Option<PathBuf>,
    },
    /// Create/verify the database schema, then exit.
    InitDb,
    /// Check configuration and database connectivity, report, then exit.
    Doctor,
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for Ctrl+C");
        info!("received Ctrl+C, shutting down...");
    }
}

async fn connect_pool(database_url: &str) -> sqlx::PgPool {
    PgPoolOptions::new().max_connections(10).connect(database_url).await.unwrap_or_else(|e| {
        error!(error = %e, "failed to connect to database");
        std::process::exit(1);
    })
}

async fn build_state(fake_backends: bool, clone_dir: PathBuf) -> AppState {
    let settings = get_settings();
    let pool = connect_pool(&settings.database_url).await;

    let graph_store = Arc::new(PgGraphStore::new(pool.clone()));
    let vector_store = Arc::new(PgVectorStore::from_pool(pool.clone()));

    run_migrations(&pool, &graph_store, &vector_store, settings.embedding_dim).await.unwrap_or_else(|e| {
        error!(error = %e, "failed to run schema migrations");
        std::process::exit(1);
    });

    let embedder: Arc<dyn hybridrag_ingest::EmbeddingProvider> = if fake_backends {
        Arc::new(DeterministicEmbeddingProvider { dimensions: settings.embedding_dim })
    } else {
        Arc::new(FastEmbedProvider::new(&settings.embedding_model, settings.embedding_dim).unwrap_or_else(|e| {
            error!(error = %e, "failed to load embedding model");
            std::process::exit(1);
        }))
    };

    let llm: Arc<dyn LlmClient> = if fake_backends {
        Arc::new(NoopLlmClient { fixed_answer: "this is a stub answer; set LLM_SERVICE_URL for a real one".to_string() })
    } else {
        match &settings.llm_service_url {
            Some(url) => Arc::new(HttpLlmClient::new(url.clone())),
            None => Arc::new(NoopLlmClient { fixed_answer: "no LLM_SERVICE_URL configured".to_string() }),
        }
    };

    let vector_store_dyn: Arc<dyn hybridrag_vectorstore::VectorStore> = vector_store.clone();
    let graph_store_dyn: Arc<dyn hybridrag_ingest::GraphStore> = graph_store.clone();
    let pipeline = Arc::new(IngestionPipeline::new(embedder.clone(), vector_store_dyn, graph_store_dyn));

    std::fs::create_dir_all(&clone_dir).ok();

    AppState {
        pool,
        graph_store,
        vector_store,
        embedder,
        llm,
        tokenizer: default_tokenizer(),
        graph_cache: Arc::new(RepoGraphCache::new()),
        ingestion_status: Arc::new(IngestionStatusStore::new()),
        pipeline,
        repo_locks: Arc::new(DashMap::new()),
        clone_dir,
    }
}

async fn serve(bind: String, fake_backends: bool, clone_dir: PathBuf) {
    let state = build_state(fake_backends, clone_dir).await;

    let app = router(state).layer(CorsLayer::permissive()).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind).await.unwrap_or_else(|e| {
        error!(error = %e, bind = %bind, "failed to bind listener");
        std::process::exit(1);
    });
    info!(bind = %bind, "hybridrag server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.unwrap();
}

async fn init_db() {
    let settings = get_settings();
    let pool = connect_pool(&settings.database_url).await;
    let graph_store = PgGraphStore::new(pool.clone());
    let vector_store = PgVectorStore::from_pool(pool.clone());
    run_migrations(&pool, &graph_store, &vector_store, settings.embedding_dim).await.unwrap_or_else(|e| {
        error!(error = %e, "schema migration failed");
        std::process::exit(1);
    });
    info!("schema is up to date");
}

async fn doctor() {
    let settings = get_settings();
    println!("database_url:       {}", settings.database_url);
    println!("embedding_model:     {}", settings.embedding_model);
    println!("embedding_dim:       {}", settings.embedding_dim);
    println!("llm_service_url:     {:?}", settings.llm_service_url);
    println!("default_top_k:       {}", settings.default_top_k);
    println!("max_chunks_per_doc:  {}", settings.max_chunks_per_document);
    println!("max_total_tokens:    {}", settings.max_total_tokens);

    match sqlx::postgres::PgPoolOptions::new().max_connections(1).connect(&settings.database_url).await {
        Ok(_) => println!("database:            reachable"),
        Err(e) => println!("database:            UNREACHABLE ({e})"),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("hybridrag=info".parse().unwrap()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { bind, fake_backends, clone_dir }) => {
            serve(bind, fake_backends, clone_dir.unwrap_or_else(|| std::env::temp_dir().join("hybridrag-repos"))).await;
        }
        Some(Commands::InitDb) => init_db().await,
        Some(Commands::Doctor) => doctor().await,
        None => {
            serve("127.0.0.1:8080".to_string(), false, std::env::temp_dir().join("hybridrag-repos")).await;
        }
    }
}

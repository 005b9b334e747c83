//! Hybrid vector+graph RAG server: ingestion and retrieval HTTP API,
//! Postgres-backed persistence, and the `hybridrag` CLI entrypoint.

pub mod error;
pub mod git;
pub mod ingest_repo;
pub mod pg_store;
pub mod pg_store_ext;
pub mod routes;
pub mod state;

pub use state::AppState;

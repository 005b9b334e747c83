//! Postgres + pgvector backed `VectorStore`: connection pooling, `<=>`
//! cosine distance (`score = 1 - distance`), against a single
//! `vector_chunks` table with a `metadata` jsonb column evaluated by
//! [`matches_filter`].

use crate::store::{MetadataFilter, SearchResult, VectorRecord, VectorStore};
use async_trait::async_trait;
use hybridrag_core::error::{RagError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    pub async fn connect(database_url: &str) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(5).connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `vector_chunks` table and the pgvector extension, if
    /// either is missing. Safe to call on every startup.
    pub async fn ensure_schema(&self, dimensions: usize) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(&self.pool).await.map_err(map_err)?;

        let create_sql = format!(
            "CREATE TABLE IF NOT EXISTS vector_chunks (\
                chunk_id TEXT PRIMARY KEY, \
                embedding vector({dimensions}) NOT NULL, \
                chunk_text TEXT NOT NULL, \
                document_id UUID, \
                ingestion_id UUID NOT NULL, \
                chunk_index INT NOT NULL, \
                chunk_strategy TEXT NOT NULL, \
                provider TEXT NOT NULL, \
                metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb\
            )"
        );
        sqlx::query(&create_sql).execute(&self.pool).await.map_err(map_err)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS vector_chunks_document_id_idx ON vector_chunks (document_id)")
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        debug!(dimensions, "ensured vector_chunks schema");
        Ok(())
    }
}

fn map_err(e: sqlx::Error) -> RagError {
    RagError::VectorStore { backend: "pgvector".to_string(), message: e.to_string() }
}

fn vector_literal(v: &[f32]) -> String {
    format!("[{}]", v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(","))
}

fn row_to_result(row: &sqlx::postgres::PgRow) -> sqlx::Result<SearchResult> {
    let metadata_value: serde_json::Value = row.try_get("metadata")?;
    let metadata: HashMap<String, serde_json::Value> = metadata_value.as_object().cloned().map(|m| m.into_iter().collect()).unwrap_or_default();
    Ok(SearchResult {
        chunk_id: row.try_get("chunk_id")?,
        text: row.try_get("chunk_text")?,
        document_id: row.try_get("document_id")?,
        score: row.try_get::<f64, _>("score")? as f32,
        metadata,
    })
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(map_err)?;
        for record in &records {
            let metadata_json = serde_json::to_value(&record.metadata).unwrap_or_default();
            sqlx::query(
                "INSERT INTO vector_chunks \
                    (chunk_id, embedding, chunk_text, document_id, ingestion_id, chunk_index, chunk_strategy, provider, metadata) \
                 VALUES ($1, $2::vector, $3, $4, $5, $6, $7, $8, $9::jsonb) \
                 ON CONFLICT (chunk_id) DO UPDATE SET \
                    embedding = EXCLUDED.embedding, \
                    chunk_text = EXCLUDED.chunk_text, \
                    document_id = EXCLUDED.document_id, \
                    metadata = EXCLUDED.metadata",
            )
            .bind(&record.chunk_id)
            .bind(vector_literal(&record.vector))
            .bind(&record.chunk_text)
            .bind(record.document_id)
            .bind(record.ingestion_id)
            .bind(record.chunk_index)
            .bind(&record.chunk_strategy)
            .bind(&record.provider)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        }
        tx.commit().await.map_err(map_err)?;

        debug!(count = records.len(), "inserted vector chunks");
        Ok(())
    }

    async fn similarity_search(&self, query_vector: &[f32], k: usize, metadata_filter: Option<&MetadataFilter>) -> Result<Vec<SearchResult>> {
        // pgvector extension lacks native jsonb-predicate pushdown for the
        // `ne`/`in` forms this store needs, so the filter is applied in
        // Rust on an over-fetched candidate set from a single `<=>` ranked
        // query, widened by a fetch multiplier.
        let fetch_limit = (k * 4).max(k + 20) as i64;
        let search_sql = "SELECT chunk_id, chunk_text, document_id, metadata, \
                1 - (embedding <=> $1::vector) AS score \
             FROM vector_chunks \
             ORDER BY embedding <=> $1::vector \
             LIMIT $2";

        let rows = sqlx::query(search_sql)
            .bind(vector_literal(query_vector))
            .bind(fetch_limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;

        let mut results = Vec::new();
        for row in &rows {
            let result = row_to_result(row).map_err(map_err)?;
            if metadata_filter.map(|f| crate::store::matches_filter(&result.metadata, f)).unwrap_or(true) {
                results.push(result);
            }
            if results.len() >= k {
                break;
            }
        }
        Ok(results)
    }

    async fn get_chunks_by_document_id(&self, document_id: Uuid, k: usize) -> Result<Vec<SearchResult>> {
        let rows = sqlx::query(
            "SELECT chunk_id, chunk_text, document_id, metadata, 1.0::float8 AS score \
             FROM vector_chunks WHERE document_id = $1 ORDER BY chunk_index ASC LIMIT $2",
        )
        .bind(document_id)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        rows.iter().map(|r| row_to_result(r).map_err(map_err)).collect()
    }

    async fn delete_by_ingestion_id(&self, ingestion_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM vector_chunks WHERE ingestion_id = $1")
            .bind(ingestion_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }
}

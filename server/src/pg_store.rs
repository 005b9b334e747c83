//! Postgres-backed persistence for the graph side of the system: the
//! `document_nodes`/`document_relationships` tables, the `repos` registry
//! backing `GET /v1/repos`, and the `ingestion_requests` status table.
//! Schema DDL is issued as `CREATE TABLE IF NOT EXISTS` at startup — no
//! migration runner; database migrations are treated as an external
//! collaborator concern here.

use async_trait::async_trait;
use hybridrag_core::artifact::RelationType;
use hybridrag_core::chunk::{DocumentNode, DocumentRelationship, IngestionStatus};
use hybridrag_core::error::{RagError, Result};
use hybridrag_core::retrieval_plan::OutgoingRelationship;
use hybridrag_ingest::GraphStore;
use hybridrag_retrieval::{CanonicalIdResolver, DocumentRelationshipLister};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgGraphStore {
    pool: PgPool,
}

fn map_err(e: sqlx::Error) -> RagError {
    RagError::Graph(e.to_string())
}

impl PgGraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `CREATE TABLE IF NOT EXISTS` for every graph-side table besides
    /// `vector_chunks` (owned by `hybridrag-vectorstore::PgVectorStore`).
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS ingestion_requests (\
                ingestion_id UUID PRIMARY KEY, \
                source_type TEXT NOT NULL, \
                ingestion_metadata JSONB NOT NULL DEFAULT '{}'::jsonb, \
                status TEXT NOT NULL, \
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
                started_at TIMESTAMPTZ, \
                finished_at TIMESTAMPTZ, \
                error TEXT\
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS repos (\
                repo_id UUID PRIMARY KEY, \
                name TEXT NOT NULL, \
                display_name TEXT NOT NULL, \
                source TEXT NOT NULL, \
                status TEXT NOT NULL, \
                ingestion_id UUID, \
                ingested_at TIMESTAMPTZ\
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS document_nodes (\
                document_id UUID PRIMARY KEY, \
                repo_id UUID NOT NULL, \
                canonical_id TEXT NOT NULL, \
                relative_path TEXT NOT NULL, \
                symbol_path TEXT, \
                title TEXT NOT NULL, \
                summary TEXT, \
                source TEXT NOT NULL, \
                ingestion_id UUID NOT NULL, \
                doc_type TEXT NOT NULL, \
                text TEXT, \
                UNIQUE (repo_id, canonical_id)\
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS document_nodes_repo_id_idx ON document_nodes (repo_id)")
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS document_relationships (\
                id UUID PRIMARY KEY, \
                from_document_id UUID NOT NULL REFERENCES document_nodes (document_id) ON DELETE CASCADE, \
                to_document_id UUID NOT NULL REFERENCES document_nodes (document_id) ON DELETE CASCADE, \
                relation_type TEXT NOT NULL, \
                relationship_metadata JSONB NOT NULL DEFAULT '{}'::jsonb, \
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
                UNIQUE (from_document_id, to_document_id, relation_type)\
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(())
    }

    /// Repo-level ingest replacement: delete every DocumentNode for
    /// `repo_id` (cascades to DocumentRelationship and, via the separate
    /// `vector_chunks` FK, to that document's chunks) inside one
    /// transaction, so a re-ingest never leaves stale and fresh nodes mixed.
    pub async fn delete_repo_nodes(&self, repo_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM document_nodes WHERE repo_id = $1").bind(repo_id).execute(&self.pool).await.map_err(map_err)?;
        Ok(())
    }

    pub async fn upsert_repo(&self, repo_id: Uuid, name: &str, display_name: &str, source: &str, status: &str, ingestion_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO repos (repo_id, name, display_name, source, status, ingestion_id, ingested_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) \
             ON CONFLICT (repo_id) DO UPDATE SET \
                name = EXCLUDED.name, display_name = EXCLUDED.display_name, source = EXCLUDED.source, \
                status = EXCLUDED.status, ingestion_id = EXCLUDED.ingestion_id, ingested_at = EXCLUDED.ingested_at",
        )
        .bind(repo_id)
        .bind(name)
        .bind(display_name)
        .bind(source)
        .bind(status)
        .bind(ingestion_id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    pub async fn set_repo_status(&self, repo_id: Uuid, status: &str) -> Result<()> {
        sqlx::query("UPDATE repos SET status = $2 WHERE repo_id = $1").bind(repo_id).bind(status).execute(&self.pool).await.map_err(map_err)?;
        Ok(())
    }

    pub async fn list_repos(&self) -> Result<Vec<RepoSummary>> {
        let rows = sqlx::query(
            "SELECT r.repo_id, r.name, r.display_name, r.status, r.ingestion_id, r.ingested_at, \
                    COUNT(DISTINCT n.relative_path) AS file_count, COUNT(n.document_id) AS node_count \
             FROM repos r LEFT JOIN document_nodes n ON n.repo_id = r.repo_id \
             GROUP BY r.repo_id, r.name, r.display_name, r.status, r.ingestion_id, r.ingested_at \
             ORDER BY r.ingested_at DESC NULLS LAST",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(RepoSummary {
                    id: row.try_get("repo_id").map_err(map_err)?,
                    name: row.try_get("name").map_err(map_err)?,
                    display_name: row.try_get("display_name").map_err(map_err)?,
                    status: row.try_get("status").map_err(map_err)?,
                    ingestion_id: row.try_get("ingestion_id").map_err(map_err)?,
                    ingested_at: row.try_get("ingested_at").map_err(map_err)?,
                    file_count: row.try_get::<i64, _>("file_count").map_err(map_err)? as usize,
                    node_count: row.try_get::<i64, _>("node_count").map_err(map_err)? as usize,
                })
            })
            .collect()
    }

    pub async fn record_ingestion_request(&self, ingestion_id: Uuid, source_type: &str, metadata: serde_json::Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO ingestion_requests (ingestion_id, source_type, ingestion_metadata, status, started_at) \
             VALUES ($1, $2, $3, 'accepted', now()) \
             ON CONFLICT (ingestion_id) DO NOTHING",
        )
        .bind(ingestion_id)
        .bind(source_type)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    pub async fn update_ingestion_status(&self, ingestion_id: Uuid, status: IngestionStatus, error: Option<&str>) -> Result<()> {
        sqlx::query(
            "UPDATE ingestion_requests SET status = $2, error = $3, finished_at = now() WHERE ingestion_id = $1",
        )
        .bind(ingestion_id)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    pub async fn update_node_summary(&self, source: &str, summary: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE document_nodes SET summary = $2 WHERE source = $1").bind(source).bind(summary).execute(&self.pool).await.map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn nodes_for_canonical_ids(&self, repo_id: Uuid, canonical_ids: &[String]) -> Result<Vec<DocumentNode>> {
        if canonical_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, DocumentNodeRow>(
            "SELECT document_id, repo_id, canonical_id, relative_path, symbol_path, title, summary, source, ingestion_id, doc_type, text \
             FROM document_nodes WHERE repo_id = $1 AND canonical_id = ANY($2)",
        )
        .bind(repo_id)
        .bind(canonical_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn graph_export(&self, repo_id: Uuid) -> Result<(Vec<(String, String)>, Vec<(String, String, String)>)> {
        let node_rows = sqlx::query("SELECT canonical_id, relative_path FROM document_nodes WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        let nodes: Vec<(String, String)> = node_rows
            .iter()
            .map(|r| Ok::<_, RagError>((r.try_get("canonical_id").map_err(map_err)?, r.try_get("relative_path").map_err(map_err)?)))
            .collect::<Result<_>>()?;

        let rel_rows = sqlx::query(
            "SELECT a.canonical_id AS from_cid, b.canonical_id AS to_cid, r.relation_type \
             FROM document_relationships r \
             JOIN document_nodes a ON a.document_id = r.from_document_id \
             JOIN document_nodes b ON b.document_id = r.to_document_id \
             WHERE a.repo_id = $1",
        )
        .bind(repo_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        let relationships: Vec<(String, String, String)> = rel_rows
            .iter()
            .map(|r| {
                Ok::<_, RagError>((
                    r.try_get("from_cid").map_err(map_err)?,
                    r.try_get("to_cid").map_err(map_err)?,
                    r.try_get("relation_type").map_err(map_err)?,
                ))
            })
            .collect::<Result<_>>()?;

        Ok((nodes, relationships))
    }

    pub async fn relationships_for_document(&self, document_id: Uuid) -> Result<Vec<(Uuid, RelationType)>> {
        let rows = sqlx::query("SELECT to_document_id, relation_type FROM document_relationships WHERE from_document_id = $1")
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        rows.into_iter()
            .map(|r| {
                let to: Uuid = r.try_get("to_document_id").map_err(map_err)?;
                let rel_type_str: String = r.try_get("relation_type").map_err(map_err)?;
                let rel_type = rel_type_str.parse::<RelationType>().map_err(|_| RagError::Graph(format!("unknown relation_type {rel_type_str}")))?;
                Ok((to, rel_type))
            })
            .collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentNodeRow {
    document_id: Uuid,
    repo_id: Uuid,
    canonical_id: String,
    relative_path: String,
    symbol_path: Option<String>,
    title: String,
    summary: Option<String>,
    source: String,
    ingestion_id: Uuid,
    doc_type: String,
    text: Option<String>,
}

impl From<DocumentNodeRow> for DocumentNode {
    fn from(row: DocumentNodeRow) -> Self {
        DocumentNode {
            document_id: row.document_id,
            repo_id: row.repo_id,
            canonical_id: row.canonical_id,
            relative_path: row.relative_path,
            symbol_path: row.symbol_path,
            title: row.title,
            summary: row.summary,
            source: row.source,
            ingestion_id: row.ingestion_id,
            doc_type: row.doc_type,
            text: row.text,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RepoSummary {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub status: String,
    pub ingestion_id: Option<Uuid>,
    pub ingested_at: Option<chrono::DateTime<chrono::Utc>>,
    pub file_count: usize,
    pub node_count: usize,
}

#[async_trait]
impl GraphStore for PgGraphStore {
    async fn upsert_document_node(&self, node: DocumentNode) -> Result<()> {
        sqlx::query(
            "INSERT INTO document_nodes \
                (document_id, repo_id, canonical_id, relative_path, symbol_path, title, summary, source, ingestion_id, doc_type, text) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (repo_id, canonical_id) DO UPDATE SET \
                relative_path = EXCLUDED.relative_path, symbol_path = EXCLUDED.symbol_path, title = EXCLUDED.title, \
                source = EXCLUDED.source, ingestion_id = EXCLUDED.ingestion_id, doc_type = EXCLUDED.doc_type, text = EXCLUDED.text",
        )
        .bind(node.document_id)
        .bind(node.repo_id)
        .bind(&node.canonical_id)
        .bind(&node.relative_path)
        .bind(&node.symbol_path)
        .bind(&node.title)
        .bind(&node.summary)
        .bind(&node.source)
        .bind(node.ingestion_id)
        .bind(&node.doc_type)
        .bind(&node.text)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn upsert_document_relationship(&self, rel: DocumentRelationship) -> Result<()> {
        sqlx::query(
            "INSERT INTO document_relationships (id, from_document_id, to_document_id, relation_type, relationship_metadata) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (from_document_id, to_document_id, relation_type) DO NOTHING",
        )
        .bind(rel.id)
        .bind(rel.from_document_id)
        .bind(rel.to_document_id)
        .bind(&rel.relation_type)
        .bind(&rel.relationship_metadata)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn find_document_id_by_canonical_id(&self, repo_id: Uuid, canonical_id: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT document_id FROM document_nodes WHERE repo_id = $1 AND canonical_id = $2")
            .bind(repo_id)
            .bind(canonical_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(|r| r.get("document_id")))
    }
}

#[async_trait]
impl CanonicalIdResolver for PgGraphStore {
    async fn resolve(&self, repo_id: Uuid, canonical_id: &str) -> Result<Option<Uuid>> {
        GraphStore::find_document_id_by_canonical_id(self, repo_id, canonical_id).await
    }
}

#[async_trait]
impl DocumentRelationshipLister for PgGraphStore {
    async fn list_outgoing(&self, document_id: Uuid) -> Result<Vec<OutgoingRelationship>> {
        let rows = self.relationships_for_document(document_id).await?;
        Ok(rows.into_iter().map(|(to, rel)| OutgoingRelationship { target_document_id: to.to_string(), relation_type: rel.as_str().to_string() }).collect())
    }
}

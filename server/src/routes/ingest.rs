//! `POST /v1/ingest/file`, `POST /v1/ingest-repo`, their status endpoints,
//! `GET /v1/repos`, and `POST /v1/summary`.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{bad_request, not_found, ApiError, RouteError};
use crate::git::clone_repo;
use crate::ingest_repo::ingest_repo_path;
use crate::state::AppState;
use hybridrag_core::chunk::IngestionStatus;
use hybridrag_core::identity::build_repo_id;
use hybridrag_ingest::spawn_ingestion;

#[derive(Debug, Serialize)]
struct AcceptedResponse {
    ingestion_id: Uuid,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    ingestion_id: Uuid,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Raw text path: multipart `file` + optional `metadata` JSON part with
/// `source_type`/`doc_type`/`title`/`repo_url`.
pub async fn ingest_file(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<AcceptedResponse>, ApiError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut metadata: Value = Value::Null;

    while let Some(field) = multipart.next_field().await.map_err(|e| bad_request(format!("invalid multipart body: {e}")))? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                file_bytes = Some(field.bytes().await.map_err(|e| bad_request(format!("failed to read file part: {e}")))?.to_vec());
            }
            "metadata" => {
                let text = field.text().await.map_err(|e| bad_request(format!("failed to read metadata part: {e}")))?;
                metadata = serde_json::from_str(&text).map_err(|e| bad_request(format!("metadata must be valid JSON: {e}")))?;
            }
            _ => {}
        }
    }

    let Some(bytes) = file_bytes else {
        return Err(bad_request("multipart body must include a `file` part").into());
    };
    let text = String::from_utf8_lossy(&bytes).into_owned();

    let source_type = metadata.get("source_type").and_then(Value::as_str).unwrap_or("file").to_string();
    let doc_type = metadata.get("doc_type").and_then(Value::as_str).unwrap_or(source_type.as_str()).to_string();
    let title = metadata.get("title").and_then(Value::as_str).map(str::to_string).or(file_name).unwrap_or_else(|| "untitled".to_string());
    let repo_url = metadata.get("repo_url").and_then(Value::as_str).unwrap_or("urn:hybridrag:documents").to_string();
    let repo_id = build_repo_id(&repo_url);

    let ingestion_id = Uuid::new_v4();
    state.graph_store.record_ingestion_request(ingestion_id, &source_type, metadata.clone()).await?;

    let source = format!("{source_type}_document_{ingestion_id}");
    let pipeline = state.pipeline.clone();
    let graph_store = state.graph_store.clone();
    let status_store = state.ingestion_status.clone();

    spawn_ingestion(status_store, ingestion_id, async move {
        let result = pipeline.run(repo_id, &source, &title, &title, &source, &doc_type, &text, ingestion_id, None).await;
        match &result {
            Ok(_) => graph_store.update_ingestion_status(ingestion_id, IngestionStatus::Completed, None).await.ok(),
            Err(e) => graph_store.update_ingestion_status(ingestion_id, IngestionStatus::Failed, Some(e.to_string().as_str())).await.ok(),
        };
        result.map(|_| ())
    });

    Ok(Json(AcceptedResponse { ingestion_id, status: "accepted" }))
}

#[derive(Debug, Deserialize)]
pub struct IngestRepoForm {
    git_url: Option<String>,
    local_path: Option<String>,
    #[allow(dead_code)]
    provider: Option<String>,
}

/// Repo path: clone (if `git_url`) or use `local_path` directly, then run
/// the full graph-build + per-artifact ingest.
pub async fn ingest_repo(State(state): State<AppState>, axum::Form(form): axum::Form<IngestRepoForm>) -> Result<Json<AcceptedResponse>, ApiError> {
    let (source, is_git) = match (&form.git_url, &form.local_path) {
        (Some(url), None) => (url.clone(), true),
        (None, Some(path)) => (path.clone(), false),
        _ => return Err(bad_request("exactly one of git_url or local_path is required").into()),
    };

    let repo_id = build_repo_id(&source);
    let display_name = source.rsplit('/').next().unwrap_or(&source).trim_end_matches(".git").to_string();
    let ingestion_id = Uuid::new_v4();

    state.graph_store.record_ingestion_request(ingestion_id, "repo", serde_json::json!({"source": source})).await?;
    state.graph_store.upsert_repo(repo_id, &source, &display_name, &source, "ingesting", ingestion_id).await?;

    let clone_dir = state.clone_dir.clone();
    let graph_store = state.graph_store.clone();
    let pipeline_store = state.graph_store.clone();
    let pipeline = state.pipeline.clone();
    let graph_cache = state.graph_cache.clone();
    let repo_lock = state.repo_lock(repo_id);
    let status_store = state.ingestion_status.clone();
    let source_for_work = source.clone();

    spawn_ingestion(status_store, ingestion_id, async move {
        let _guard = repo_lock.lock().await;

        let root = if is_git { clone_repo(&source_for_work, &clone_dir)? } else { std::path::PathBuf::from(&source_for_work) };

        let result = ingest_repo_path(&root, repo_id, &source_for_work, ingestion_id, &pipeline_store, &pipeline, &graph_cache).await;

        if is_git {
            let _ = std::fs::remove_dir_all(&root);
        }

        match &result {
            Ok(_) => {
                graph_store.update_ingestion_status(ingestion_id, IngestionStatus::Completed, None).await.ok();
                graph_store.set_repo_status(repo_id, "complete").await.ok();
            }
            Err(e) => {
                graph_store.update_ingestion_status(ingestion_id, IngestionStatus::Failed, Some(e.to_string().as_str())).await.ok();
                graph_store.set_repo_status(repo_id, "failed").await.ok();
            }
        }
        result.map(|_| ())
    });

    Ok(Json(AcceptedResponse { ingestion_id, status: "accepted" }))
}

pub async fn get_ingestion_status(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<StatusResponse>, RouteError> {
    let ingestion_id = Uuid::parse_str(&id).map_err(|_| bad_request("id must be a valid UUID"))?;
    let record = state.ingestion_status.get(ingestion_id).ok_or_else(|| not_found("ingestion id not found"))?;
    let status = match record.status {
        IngestionStatus::Accepted => "accepted",
        IngestionStatus::Running => "running",
        IngestionStatus::Completed => "completed",
        IngestionStatus::Failed => "failed",
    };
    Ok(Json(StatusResponse { ingestion_id, status, error: record.error }))
}

#[derive(Debug, Serialize)]
pub struct RepoListResponse {
    repos: Vec<crate::pg_store::RepoSummary>,
}

pub async fn list_repos(State(state): State<AppState>) -> Result<Json<RepoListResponse>, ApiError> {
    let repos = state.graph_store.list_repos().await?;
    Ok(Json(RepoListResponse { repos }))
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    ingestion_id: Uuid,
    summary: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    updated: bool,
}

pub async fn update_summary(State(state): State<AppState>, Json(request): Json<SummaryRequest>) -> Result<Json<SummaryResponse>, ApiError> {
    let source = format!("file_document_{}", request.ingestion_id);
    let updated = state.graph_store.update_node_summary(&source, &request.summary).await?;
    Ok(Json(SummaryResponse { updated }))
}

//! Fire-and-forget background ingestion: each request spawns one detached
//! task tracked by `ingestion_id` in a process-wide status table, with no
//! retry and no queue. A caught error or timeout is recorded as `failed`
//! rather than propagated, since the HTTP request that triggered ingestion
//! has already returned 202.

use hybridrag_core::chunk::IngestionStatus;
use hybridrag_core::config::get_settings;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct IngestionStatusRecord {
    pub status: IngestionStatus,
    pub error: Option<String>,
}

/// Process-wide status table, keyed by `ingestion_id`. One worker per
/// request — no retry, no queueing; a caught panic or error is recorded
/// as `failed` rather than propagated, since the HTTP request that
/// triggered ingestion has already returned 202.
#[derive(Default)]
pub struct IngestionStatusStore {
    statuses: RwLock<HashMap<Uuid, IngestionStatusRecord>>,
}

impl IngestionStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ingestion_id: Uuid, status: IngestionStatus, error: Option<String>) {
        self.statuses.write().unwrap().insert(ingestion_id, IngestionStatusRecord { status, error });
    }

    pub fn get(&self, ingestion_id: Uuid) -> Option<IngestionStatusRecord> {
        self.statuses.read().unwrap().get(&ingestion_id).cloned()
    }
}

/// Spawn `work` as a detached background task, tracking its outcome in
/// `status_store` under `ingestion_id`. `work`'s `Result::Err` is recorded
/// as `failed`, not propagated to the caller — by the time this runs the
/// HTTP layer has already returned 202 Accepted.
pub fn spawn_ingestion<F>(status_store: Arc<IngestionStatusStore>, ingestion_id: Uuid, work: F)
where
    F: Future<Output = hybridrag_core::error::Result<()>> + Send + 'static,
{
    status_store.set(ingestion_id, IngestionStatus::Accepted, None);
    let timeout_secs = get_settings().request_timeout_secs;

    tokio::spawn(async move {
        status_store.set(ingestion_id, IngestionStatus::Running, None);
        let outcome = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), work).await;

        match outcome {
            Ok(Ok(())) => {
                status_store.set(ingestion_id, IngestionStatus::Completed, None);
                info!(%ingestion_id, "ingestion completed");
            }
            Ok(Err(e)) => {
                status_store.set(ingestion_id, IngestionStatus::Failed, Some(e.to_string()));
                error!(%ingestion_id, error = %e, "ingestion failed");
            }
            Err(_) => {
                status_store.set(ingestion_id, IngestionStatus::Failed, Some("ingestion timed out".to_string()));
                error!(%ingestion_id, "ingestion timed out");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_ingestion_records_completed_status_on_success() {
        let store = Arc::new(IngestionStatusStore::new());
        let id = Uuid::new_v4();
        spawn_ingestion(store.clone(), id, async { Ok(()) });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(store.get(id).unwrap().status, IngestionStatus::Completed);
    }

    #[tokio::test]
    async fn spawn_ingestion_records_failed_status_with_message() {
        let store = Arc::new(IngestionStatusStore::new());
        let id = Uuid::new_v4();
        spawn_ingestion(store.clone(), id, async {
            Err(hybridrag_core::error::RagError::Ingest("boom".to_string()))
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let record = store.get(id).unwrap();
        assert_eq!(record.status, IngestionStatus::Failed);
        assert_eq!(record.error.unwrap(), "ingestion error: boom");
    }
}

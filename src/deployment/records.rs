use super::{DeploymentError, DeploymentRecord, DeploymentStatus, StepRef};
use crate::types::RequestSource;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Keyed store of deployment records. Transitions are append-only: a record
/// only ever moves forward along the success path or sideways into `Failed`,
/// and terminal records never move again.
pub struct DeploymentStore {
    records: RwLock<HashMap<Uuid, DeploymentRecord>>,
}

impl DeploymentStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Open a fresh record. A second open for the same request id is the
    /// at-most-one-orchestration guard tripping.
    pub async fn open(
        &self,
        request_id: Uuid,
        actor_id: &str,
        source: RequestSource,
        now: i64,
    ) -> Result<(), DeploymentError> {
        let mut records = self.records.write().await;
        if records.contains_key(&request_id) {
            return Err(DeploymentError::AlreadyInFlight(request_id));
        }
        records.insert(
            request_id,
            DeploymentRecord {
                request_id,
                actor_id: actor_id.to_string(),
                source,
                status: DeploymentStatus::Pending,
                token_id: None,
                lock_id: None,
                last_error: None,
                tx_refs: Vec::new(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Move a record forward, optionally appending the step's transaction
    /// reference.
    pub async fn advance(
        &self,
        request_id: Uuid,
        to: DeploymentStatus,
        step_ref: Option<StepRef>,
        now: i64,
    ) -> Result<(), DeploymentError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&request_id)
            .ok_or(DeploymentError::UnknownRequest(request_id))?;

        if record.status.is_terminal() || to.ordinal() <= record.status.ordinal() {
            return Err(DeploymentError::InvalidTransition {
                from: record.status,
                to,
            });
        }

        record.status = to;
        if let Some(step_ref) = step_ref {
            record.tx_refs.push(step_ref);
        }
        record.updated_at = now;
        Ok(())
    }

    pub async fn set_token_id(
        &self,
        request_id: Uuid,
        token_id: &str,
    ) -> Result<(), DeploymentError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&request_id)
            .ok_or(DeploymentError::UnknownRequest(request_id))?;
        record.token_id = Some(token_id.to_string());
        Ok(())
    }

    pub async fn set_lock_id(
        &self,
        request_id: Uuid,
        lock_id: Uuid,
    ) -> Result<(), DeploymentError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&request_id)
            .ok_or(DeploymentError::UnknownRequest(request_id))?;
        record.lock_id = Some(lock_id);
        Ok(())
    }

    /// Terminate a record as failed, keeping every artifact already recorded.
    pub async fn mark_failed(
        &self,
        request_id: Uuid,
        step: &str,
        reason: &str,
        now: i64,
    ) -> Result<(), DeploymentError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&request_id)
            .ok_or(DeploymentError::UnknownRequest(request_id))?;
        if record.status.is_terminal() {
            return Err(DeploymentError::InvalidTransition {
                from: record.status,
                to: DeploymentStatus::Failed,
            });
        }
        record.status = DeploymentStatus::Failed;
        record.last_error = Some(format!("{}: {}", step, reason));
        record.updated_at = now;
        Ok(())
    }

    pub async fn get(&self, request_id: Uuid) -> Option<DeploymentRecord> {
        self.records.read().await.get(&request_id).cloned()
    }
}

impl Default for DeploymentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn double_open_is_rejected() {
        let store = DeploymentStore::new();
        let id = Uuid::new_v4();
        store.open(id, "alice", RequestSource::Api, 0).await.unwrap();
        let again = store.open(id, "alice", RequestSource::Api, 1).await;
        assert!(matches!(again, Err(DeploymentError::AlreadyInFlight(_))));
    }

    #[tokio::test]
    async fn transitions_only_move_forward() {
        let store = DeploymentStore::new();
        let id = Uuid::new_v4();
        store.open(id, "alice", RequestSource::Api, 0).await.unwrap();

        store
            .advance(id, DeploymentStatus::MetadataReady, None, 1)
            .await
            .unwrap();
        store
            .advance(id, DeploymentStatus::Deployed, None, 2)
            .await
            .unwrap();

        let backwards = store
            .advance(id, DeploymentStatus::MetadataReady, None, 3)
            .await;
        assert!(matches!(
            backwards,
            Err(DeploymentError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn terminal_records_never_move_again() {
        let store = DeploymentStore::new();
        let id = Uuid::new_v4();
        store.open(id, "alice", RequestSource::Api, 0).await.unwrap();
        store.mark_failed(id, "create_token", "boom", 1).await.unwrap();

        let after_failed = store
            .advance(id, DeploymentStatus::Deployed, None, 2)
            .await;
        assert!(matches!(
            after_failed,
            Err(DeploymentError::InvalidTransition { .. })
        ));

        let double_fail = store.mark_failed(id, "create_token", "boom", 3).await;
        assert!(matches!(
            double_fail,
            Err(DeploymentError::InvalidTransition { .. })
        ));
    }
}

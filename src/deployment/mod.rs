pub mod orchestrator;
pub mod records;

pub use orchestrator::DeploymentOrchestrator;
pub use records::DeploymentStore;

use crate::normalizer::ValidationError;
use crate::types::RequestSource;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle of one deployment. Forward-only on the success path; `Failed`
/// is reachable from anywhere and, like `LiquidityLocked`, is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    MetadataReady,
    Deployed,
    Protected,
    FeeConfigured,
    LiquidityProvided,
    LiquidityLocked,
    Failed,
}

impl DeploymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::LiquidityLocked | DeploymentStatus::Failed)
    }

    /// Position on the success path, used to keep transitions append-only.
    pub(crate) fn ordinal(&self) -> u8 {
        match self {
            DeploymentStatus::Pending => 0,
            DeploymentStatus::MetadataReady => 1,
            DeploymentStatus::Deployed => 2,
            DeploymentStatus::Protected => 3,
            DeploymentStatus::FeeConfigured => 4,
            DeploymentStatus::LiquidityProvided => 5,
            DeploymentStatus::LiquidityLocked => 6,
            DeploymentStatus::Failed => 7,
        }
    }
}

/// Transaction reference recorded by one pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRef {
    pub step: String,
    pub tx_ref: String,
}

/// Single source of truth for one request's progress. Owned by the
/// orchestrator; everyone else gets clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub request_id: Uuid,
    pub actor_id: String,
    pub source: RequestSource,
    pub status: DeploymentStatus,
    pub token_id: Option<String>,
    pub lock_id: Option<Uuid>,
    pub last_error: Option<String>,
    pub tx_refs: Vec<StepRef>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("deployment already in flight for request {0}")]
    AlreadyInFlight(Uuid),
    #[error("unknown deployment {0}")]
    UnknownRequest(Uuid),
    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: DeploymentStatus,
        to: DeploymentStatus,
    },
    #[error("step {step} failed: {reason}")]
    StepFailed { step: &'static str, reason: String },
    #[error("step {step} timed out after {timeout_secs}s")]
    StepTimedOut { step: &'static str, timeout_secs: u64 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("ledger events missing expected artifact: {0}")]
    MissingArtifact(&'static str),
}

impl DeploymentError {
    /// Name of the pipeline step this error belongs to, for the record's
    /// failure annotation.
    pub fn step(&self) -> &'static str {
        match self {
            DeploymentError::StepFailed { step, .. }
            | DeploymentError::StepTimedOut { step, .. } => step,
            DeploymentError::Validation(_) => "metadata",
            DeploymentError::MissingArtifact(_) => "ledger_events",
            _ => "orchestration",
        }
    }
}

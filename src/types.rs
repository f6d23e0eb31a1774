use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Channel an inbound launch request arrived on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestSource {
    Social,
    Api,
}

impl RequestSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestSource::Social => "social",
            RequestSource::Api => "api",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "social" | "mention" => Some(RequestSource::Social),
            "api" | "http" => Some(RequestSource::Api),
            _ => None,
        }
    }
}

/// One inbound launch request. Immutable once built, consumed by exactly one
/// orchestration attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub source: RequestSource,
    pub actor_id: String,
    pub raw_text: String,
    pub received_at: i64,
}

/// Structured fields returned by the natural-language parsing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedRequest {
    pub is_request: bool,
    /// Parser confidence, 0-100.
    pub confidence: u8,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub theme: Option<String>,
    pub emoji: Option<String>,
}

/// Canonical token parameters after validation. Symbol is guaranteed to be
/// 2-5 uppercase alphanumerics; uniqueness is the ledger's problem, not ours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenParameters {
    pub name: String,
    pub symbol: String,
    pub theme: String,
    pub emoji: String,
}

/// Complete token-metadata record: canonical parameters merged with generated
/// (or fallback) content and imagery references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub params: TokenParameters,
    pub description: String,
    pub tokenomics: String,
    pub hashtags: Vec<String>,
    pub image_ref: Option<String>,
    pub animated_ref: Option<String>,
}

/// Terminal outcome of one deployment attempt, reported back on whatever
/// channel the request arrived on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub success: bool,
    pub request_id: Uuid,
    pub token_id: Option<String>,
    pub tx_ref: Option<String>,
    pub reason: Option<String>,
}

impl DeploymentResult {
    pub fn rejected(request_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id,
            token_id: None,
            tx_ref: None,
            reason: Some(reason.into()),
        }
    }
}

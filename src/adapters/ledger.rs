use async_trait::async_trait;
use rand::RngCore;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Calls the platform submits to the ledger. Transaction encoding lives on
/// the other side of this boundary.
#[derive(Debug, Clone, Serialize)]
pub enum LedgerCall {
    CreateToken {
        name: String,
        symbol: String,
        total_supply: u128,
        metadata_uri: String,
    },
    InitProtection {
        token_id: String,
        enable_delay_secs: i64,
        cooldown_secs: i64,
        max_buy_percent_bps: u32,
    },
    ConfigureFees {
        token_id: String,
        creator: String,
        protocol_bps: u16,
        creator_bps: u16,
    },
    AddLiquidity {
        token_id: String,
        token_amount: u128,
        quote_amount: u128,
    },
    LockLiquidity {
        token_id: String,
        lock_id: Uuid,
        unlock_time: i64,
    },
}

impl LedgerCall {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerCall::CreateToken { .. } => "create_token",
            LedgerCall::InitProtection { .. } => "init_protection",
            LedgerCall::ConfigureFees { .. } => "configure_fees",
            LedgerCall::AddLiquidity { .. } => "add_liquidity",
            LedgerCall::LockLiquidity { .. } => "lock_liquidity",
        }
    }
}

/// Event emitted by an executed call.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEvent {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl LedgerEvent {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedTx {
    pub tx_ref: String,
    pub events: Vec<LedgerEvent>,
}

impl SubmittedTx {
    /// Attribute of the first event of the given kind, if any.
    pub fn event_attribute(&self, event_kind: &str, key: &str) -> Option<&str> {
        self.events
            .iter()
            .find(|e| e.kind == event_kind)
            .and_then(|e| e.attribute(key))
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Ledger submission boundary. One call in, one transaction reference plus
/// its emitted events out.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn submit(&self, call: LedgerCall) -> Result<SubmittedTx, LedgerError>;
}

/// In-process ledger used for local runs and tests. Executes every call
/// immediately and fabricates realistic-looking hashes; the submitted call
/// log is inspectable.
pub struct InMemoryLedger {
    submitted: RwLock<Vec<(String, LedgerCall)>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            submitted: RwLock::new(Vec::new()),
        }
    }

    pub async fn submitted(&self) -> Vec<(String, LedgerCall)> {
        self.submitted.read().await.clone()
    }

    fn random_hash(bytes: usize) -> String {
        let mut buf = vec![0u8; bytes];
        rand::thread_rng().fill_bytes(&mut buf);
        format!("0x{}", hex::encode(buf))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn submit(&self, call: LedgerCall) -> Result<SubmittedTx, LedgerError> {
        let tx_ref = Self::random_hash(32);
        let events = match &call {
            LedgerCall::CreateToken { symbol, total_supply, .. } => vec![LedgerEvent {
                kind: "token_created".to_string(),
                attributes: vec![
                    ("token_id".to_string(), Self::random_hash(20)),
                    ("symbol".to_string(), symbol.clone()),
                    ("total_supply".to_string(), total_supply.to_string()),
                ],
            }],
            LedgerCall::InitProtection { token_id, .. } => vec![LedgerEvent {
                kind: "protection_initialized".to_string(),
                attributes: vec![("token_id".to_string(), token_id.clone())],
            }],
            LedgerCall::ConfigureFees { token_id, .. } => vec![LedgerEvent {
                kind: "fees_configured".to_string(),
                attributes: vec![("token_id".to_string(), token_id.clone())],
            }],
            LedgerCall::AddLiquidity { token_id, token_amount, quote_amount } => vec![LedgerEvent {
                kind: "lp_minted".to_string(),
                attributes: vec![
                    ("token_id".to_string(), token_id.clone()),
                    ("token_amount".to_string(), token_amount.to_string()),
                    ("quote_amount".to_string(), quote_amount.to_string()),
                    // LP shares track the quote-side deposit in this model.
                    ("lp_amount".to_string(), quote_amount.to_string()),
                ],
            }],
            LedgerCall::LockLiquidity { token_id, lock_id, unlock_time } => vec![LedgerEvent {
                kind: "liquidity_locked".to_string(),
                attributes: vec![
                    ("token_id".to_string(), token_id.clone()),
                    ("lock_id".to_string(), lock_id.to_string()),
                    ("unlock_time".to_string(), unlock_time.to_string()),
                ],
            }],
        };

        debug!("Simulated ledger call {} -> {}", call.kind(), tx_ref);
        self.submitted.write().await.push((tx_ref.clone(), call));
        Ok(SubmittedTx { tx_ref, events })
    }
}

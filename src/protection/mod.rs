pub mod engine;

pub use engine::AntiBotEngine;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtectionError {
    #[error("protection already initialized for token {0}")]
    AlreadyInitialized(String),
    #[error("no protection state for token {0}")]
    UnknownToken(String),
    #[error("caller {caller} is not the protection owner of {token_id}")]
    NotOwner { token_id: String, caller: String },
    #[error("buyer {0} is blacklisted")]
    Blacklisted(String),
    #[error("trading disabled for another {remaining_secs}s")]
    TradingDisabled { remaining_secs: i64 },
    #[error("buy of {amount} exceeds the max of {max_allowed} ({max_bps} bps of supply)")]
    MaxBuyExceeded {
        amount: u128,
        max_allowed: u128,
        max_bps: u32,
    },
    #[error("buyer {buyer} cooling down for another {remaining_secs}s")]
    CooldownActive { buyer: String, remaining_secs: i64 },
    #[error("address {0} is already whitelisted")]
    AlreadyWhitelisted(String),
    #[error("address {0} is not whitelisted")]
    NotWhitelisted(String),
    #[error("address {0} is already blacklisted")]
    AlreadyBlacklisted(String),
    #[error("address {0} is not blacklisted")]
    NotBlacklisted(String),
}

/// Initial guard settings for a freshly deployed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionSettings {
    pub enable_delay_secs: i64,
    pub cooldown_secs: i64,
    pub max_buy_percent_bps: u32,
}

/// Running total per buyer, updated on every passing buy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyRecord {
    pub total_bought: u128,
    pub last_buy_time: i64,
}

/// Guard state for one token. Created once at deployment, mutated only
/// through engine operations, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionConfig {
    pub owner: String,
    pub trading_enabled: bool,
    pub enable_time: i64,
    pub cooldown_secs: i64,
    pub max_buy_percent_bps: u32,
    pub whitelist: HashSet<String>,
    pub blacklist: HashSet<String>,
    pub buy_tracking: HashMap<String, BuyRecord>,
}

/// Read-only view for dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionSnapshot {
    pub token_id: String,
    pub owner: String,
    pub trading_enabled: bool,
    pub enable_time: i64,
    pub cooldown_secs: i64,
    pub max_buy_percent_bps: u32,
    pub whitelisted: usize,
    pub blacklisted: usize,
    pub tracked_buyers: usize,
}

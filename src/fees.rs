use crate::config::FeeConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// The platform's total fee budget: protocol + creator must split exactly
/// this many basis points.
pub const TOTAL_FEE_BPS: u32 = 1_000;

#[derive(Debug, Error)]
pub enum FeeError {
    #[error("token {0} is not registered for fee routing")]
    UnknownToken(String),
    #[error("token {0} is already registered")]
    AlreadyRegistered(String),
    #[error("caller {0} is not the fee admin")]
    NotAdmin(String),
    #[error("caller {caller} is not the creator for token {token_id}")]
    NotCreator { token_id: String, caller: String },
    #[error("no balance available to withdraw")]
    NothingToWithdraw,
    #[error("fee split must total {TOTAL_FEE_BPS} bps, got {0}")]
    InvalidSplit(u32),
    #[error("fee split is unconfigured")]
    SplitUnconfigured,
}

/// Current split. The division base is the sum of the two sides so a
/// partially configured split still routes every unit somewhere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeSplitConfig {
    pub protocol_bps: u16,
    pub creator_bps: u16,
}

/// One collected fee, already divided.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeSplit {
    pub protocol_amount: u128,
    pub creator_amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorAccount {
    pub creator: String,
    pub balance: u128,
    pub total_collected: u128,
}

/// Tracks and splits trading fees between the protocol treasury and each
/// token's creator. Withdrawals drain the whole available balance.
pub struct FeeRouter {
    admin: String,
    split: RwLock<FeeSplitConfig>,
    protocol_balance: RwLock<u128>,
    creator_accounts: RwLock<HashMap<String, CreatorAccount>>,
}

impl FeeRouter {
    pub fn new(config: &FeeConfig) -> Self {
        Self {
            admin: config.admin.clone(),
            split: RwLock::new(FeeSplitConfig {
                protocol_bps: config.protocol_bps,
                creator_bps: config.creator_bps,
            }),
            protocol_balance: RwLock::new(0),
            creator_accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Open a creator account for a freshly deployed token.
    pub async fn register_token(&self, token_id: &str, creator: &str) -> Result<(), FeeError> {
        let mut accounts = self.creator_accounts.write().await;
        if accounts.contains_key(token_id) {
            return Err(FeeError::AlreadyRegistered(token_id.to_string()));
        }
        accounts.insert(
            token_id.to_string(),
            CreatorAccount {
                creator: creator.to_string(),
                balance: 0,
                total_collected: 0,
            },
        );
        Ok(())
    }

    /// Split one collected fee. The creator side truncates; the protocol side
    /// takes the remainder, so the two always sum to the input exactly.
    pub async fn collect(&self, token_id: &str, fee_amount: u128) -> Result<FeeSplit, FeeError> {
        let split = *self.split.read().await;
        let base = split.protocol_bps as u128 + split.creator_bps as u128;
        if base == 0 {
            return Err(FeeError::SplitUnconfigured);
        }

        let creator_amount = fee_amount * split.creator_bps as u128 / base;
        let protocol_amount = fee_amount - creator_amount;

        let mut accounts = self.creator_accounts.write().await;
        let account = accounts
            .get_mut(token_id)
            .ok_or_else(|| FeeError::UnknownToken(token_id.to_string()))?;
        account.balance += creator_amount;
        account.total_collected += creator_amount;
        *self.protocol_balance.write().await += protocol_amount;

        Ok(FeeSplit {
            protocol_amount,
            creator_amount,
        })
    }

    /// Drain a creator's full balance. Only the registered creator may call.
    pub async fn withdraw_creator(&self, token_id: &str, caller: &str) -> Result<u128, FeeError> {
        let mut accounts = self.creator_accounts.write().await;
        let account = accounts
            .get_mut(token_id)
            .ok_or_else(|| FeeError::UnknownToken(token_id.to_string()))?;
        if account.creator != caller {
            return Err(FeeError::NotCreator {
                token_id: token_id.to_string(),
                caller: caller.to_string(),
            });
        }
        if account.balance == 0 {
            return Err(FeeError::NothingToWithdraw);
        }
        let amount = std::mem::take(&mut account.balance);
        info!("Creator {} withdrew {} from {}", caller, amount, token_id);
        Ok(amount)
    }

    /// Drain the protocol balance. Admin only.
    pub async fn withdraw_protocol(&self, caller: &str) -> Result<u128, FeeError> {
        if caller != self.admin {
            return Err(FeeError::NotAdmin(caller.to_string()));
        }
        let mut balance = self.protocol_balance.write().await;
        if *balance == 0 {
            return Err(FeeError::NothingToWithdraw);
        }
        let amount = std::mem::take(&mut *balance);
        info!("Protocol treasury withdrew {}", amount);
        Ok(amount)
    }

    /// Change the split. Admin only, and the two sides must spend the whole
    /// fee budget.
    pub async fn update_split(
        &self,
        caller: &str,
        protocol_bps: u16,
        creator_bps: u16,
    ) -> Result<(), FeeError> {
        if caller != self.admin {
            return Err(FeeError::NotAdmin(caller.to_string()));
        }
        let total = protocol_bps as u32 + creator_bps as u32;
        if total != TOTAL_FEE_BPS {
            return Err(FeeError::InvalidSplit(total));
        }
        *self.split.write().await = FeeSplitConfig {
            protocol_bps,
            creator_bps,
        };
        info!(
            "Fee split updated: protocol {} bps / creator {} bps",
            protocol_bps, creator_bps
        );
        Ok(())
    }

    pub async fn split(&self) -> FeeSplitConfig {
        *self.split.read().await
    }

    pub async fn creator_account(&self, token_id: &str) -> Option<CreatorAccount> {
        self.creator_accounts.read().await.get(token_id).cloned()
    }

    pub async fn protocol_balance(&self) -> u128 {
        *self.protocol_balance.read().await
    }
}

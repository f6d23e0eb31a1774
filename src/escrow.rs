use crate::config::EscrowConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// One escrowed balance. Removed from the store on successful unlock, which
/// is what makes a second unlock impossible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub lock_id: Uuid,
    pub token_type: String,
    pub depositor: String,
    pub amount: u128,
    pub unlock_time: i64,
    pub created_at: i64,
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock duration {duration_secs}s is below the {min_secs}s floor")]
    DurationTooShort { duration_secs: i64, min_secs: i64 },
    #[error("cannot lock a zero amount")]
    ZeroAmount,
    #[error("lock {0} not found")]
    LockNotFound(Uuid),
    #[error("caller {caller} is not the depositor of lock {lock_id}")]
    NotDepositor { lock_id: Uuid, caller: String },
    #[error("lock {lock_id} matures in {remaining_secs}s")]
    StillLocked { lock_id: Uuid, remaining_secs: i64 },
}

/// Time-lock escrow for LP shares. Funds leave only to the original
/// depositor, only at or after maturity, and only once.
pub struct LiquidityLocker {
    config: EscrowConfig,
    locks: RwLock<HashMap<Uuid, Lock>>,
}

impl LiquidityLocker {
    pub fn new(config: EscrowConfig) -> Self {
        Self {
            config,
            locks: RwLock::new(HashMap::new()),
        }
    }

    pub async fn lock(
        &self,
        token_type: &str,
        depositor: &str,
        amount: u128,
        duration_secs: i64,
        now: i64,
    ) -> Result<Uuid, LockError> {
        if duration_secs < self.config.min_lock_duration_secs {
            return Err(LockError::DurationTooShort {
                duration_secs,
                min_secs: self.config.min_lock_duration_secs,
            });
        }
        if amount == 0 {
            return Err(LockError::ZeroAmount);
        }

        let lock_id = Uuid::new_v4();
        let lock = Lock {
            lock_id,
            token_type: token_type.to_string(),
            depositor: depositor.to_string(),
            amount,
            unlock_time: now + duration_secs,
            created_at: now,
        };
        self.locks.write().await.insert(lock_id, lock);

        info!(
            "Locked {} of {} for {} until {}",
            amount,
            token_type,
            depositor,
            now + duration_secs
        );
        Ok(lock_id)
    }

    /// Release a matured lock in full. Partial unlocks are not a thing.
    pub async fn unlock(&self, lock_id: Uuid, caller: &str, now: i64) -> Result<u128, LockError> {
        let mut locks = self.locks.write().await;
        let lock = locks
            .get(&lock_id)
            .ok_or(LockError::LockNotFound(lock_id))?;

        if lock.depositor != caller {
            return Err(LockError::NotDepositor {
                lock_id,
                caller: caller.to_string(),
            });
        }
        if now < lock.unlock_time {
            return Err(LockError::StillLocked {
                lock_id,
                remaining_secs: lock.unlock_time - now,
            });
        }

        // All checks passed: consume the record.
        let lock = locks
            .remove(&lock_id)
            .ok_or(LockError::LockNotFound(lock_id))?;
        info!(
            "Unlocked {} of {} back to {}",
            lock.amount, lock.token_type, lock.depositor
        );
        Ok(lock.amount)
    }

    pub async fn get(&self, lock_id: Uuid) -> Option<Lock> {
        self.locks.read().await.get(&lock_id).cloned()
    }

    pub async fn locks_for(&self, depositor: &str) -> Vec<Lock> {
        self.locks
            .read()
            .await
            .values()
            .filter(|l| l.depositor == depositor)
            .cloned()
            .collect()
    }

    /// Sum of all unreleased locks of a token type. Equals everything ever
    /// locked minus everything ever unlocked.
    pub async fn total_escrowed(&self, token_type: &str) -> u128 {
        self.locks
            .read()
            .await
            .values()
            .filter(|l| l.token_type == token_type)
            .map(|l| l.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    fn locker() -> LiquidityLocker {
        LiquidityLocker::new(EscrowConfig {
            min_lock_duration_secs: 30 * DAY,
        })
    }

    #[tokio::test]
    async fn short_durations_and_zero_amounts_are_rejected() {
        let locker = locker();
        let short = locker.lock("lp:tok", "alice", 1_000, 29 * DAY, 0).await;
        assert!(matches!(short, Err(LockError::DurationTooShort { .. })));

        let zero = locker.lock("lp:tok", "alice", 0, 30 * DAY, 0).await;
        assert!(matches!(zero, Err(LockError::ZeroAmount)));
    }

    #[tokio::test]
    async fn unlock_succeeds_exactly_at_maturity_and_only_once() {
        let locker = locker();
        let t0 = 1_000;
        let lock_id = locker
            .lock("lp:tok", "alice", 1_000, 30 * DAY, t0)
            .await
            .unwrap();
        let unlock_time = t0 + 30 * DAY;

        let early = locker.unlock(lock_id, "alice", unlock_time - 1).await;
        assert!(matches!(
            early,
            Err(LockError::StillLocked { remaining_secs: 1, .. })
        ));

        let amount = locker.unlock(lock_id, "alice", unlock_time).await.unwrap();
        assert_eq!(amount, 1_000);

        // The record was consumed; a replay is a conflict, not a payout.
        let again = locker.unlock(lock_id, "alice", unlock_time + 1).await;
        assert!(matches!(again, Err(LockError::LockNotFound(_))));
    }

    #[tokio::test]
    async fn only_the_depositor_can_unlock() {
        let locker = locker();
        let lock_id = locker
            .lock("lp:tok", "alice", 500, 30 * DAY, 0)
            .await
            .unwrap();
        let theft = locker.unlock(lock_id, "mallory", 40 * DAY).await;
        assert!(matches!(theft, Err(LockError::NotDepositor { .. })));

        // The failed attempt must not have consumed the lock.
        assert_eq!(locker.get(lock_id).await.unwrap().amount, 500);
    }

    #[tokio::test]
    async fn escrow_total_tracks_unreleased_locks() {
        let locker = locker();
        let a = locker
            .lock("lp:tok", "alice", 300, 30 * DAY, 0)
            .await
            .unwrap();
        locker
            .lock("lp:tok", "bob", 700, 60 * DAY, 0)
            .await
            .unwrap();
        locker
            .lock("lp:other", "carol", 999, 30 * DAY, 0)
            .await
            .unwrap();

        assert_eq!(locker.total_escrowed("lp:tok").await, 1_000);

        locker.unlock(a, "alice", 31 * DAY).await.unwrap();
        assert_eq!(locker.total_escrowed("lp:tok").await, 700);
        assert_eq!(locker.locks_for("alice").await.len(), 0);
        assert_eq!(locker.locks_for("bob").await.len(), 1);
    }
}

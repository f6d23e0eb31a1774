use super::{
    BuyRecord, ProtectionConfig, ProtectionError, ProtectionSettings, ProtectionSnapshot,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Per-token anti-bot state machine. Trading starts disabled and flips on
/// exactly once when the enable time is reached; whitelist, blacklist,
/// cooldown and buy-size caps gate everything else.
pub struct AntiBotEngine {
    configs: RwLock<HashMap<String, ProtectionConfig>>,
}

impl AntiBotEngine {
    pub fn new() -> Self {
        Self {
            configs: RwLock::new(HashMap::new()),
        }
    }

    /// Install guards for a new token. The creator is whitelisted up front so
    /// the platform's own liquidity operations pass.
    pub async fn create_protection(
        &self,
        token_id: &str,
        owner: &str,
        settings: &ProtectionSettings,
        now: i64,
    ) -> Result<(), ProtectionError> {
        let mut configs = self.configs.write().await;
        if configs.contains_key(token_id) {
            return Err(ProtectionError::AlreadyInitialized(token_id.to_string()));
        }

        let mut config = ProtectionConfig {
            owner: owner.to_string(),
            trading_enabled: false,
            enable_time: now + settings.enable_delay_secs,
            cooldown_secs: settings.cooldown_secs,
            max_buy_percent_bps: settings.max_buy_percent_bps,
            whitelist: Default::default(),
            blacklist: Default::default(),
            buy_tracking: HashMap::new(),
        };
        config.whitelist.insert(owner.to_string());
        configs.insert(token_id.to_string(), config);

        info!(
            "Protection installed for {} (enable at {}, cooldown {}s, max buy {} bps)",
            token_id,
            now + settings.enable_delay_secs,
            settings.cooldown_secs,
            settings.max_buy_percent_bps
        );
        Ok(())
    }

    /// Gate one buy. `Ok(())` means the buy may proceed and the buyer's
    /// tracking record has been updated; every `Err` carries the policy that
    /// rejected it. Checking can move the token's state forward: the first
    /// call at or past the enable time flips trading on.
    pub async fn check_can_buy(
        &self,
        token_id: &str,
        buyer: &str,
        amount: u128,
        total_supply: u128,
        now: i64,
    ) -> Result<(), ProtectionError> {
        let mut configs = self.configs.write().await;
        let config = configs
            .get_mut(token_id)
            .ok_or_else(|| ProtectionError::UnknownToken(token_id.to_string()))?;

        if config.whitelist.contains(buyer) {
            Self::record_buy(config, buyer, amount, now);
            return Ok(());
        }
        if config.blacklist.contains(buyer) {
            warn!("Blacklisted buyer {} rejected on {}", buyer, token_id);
            return Err(ProtectionError::Blacklisted(buyer.to_string()));
        }

        Self::maybe_enable_trading(token_id, config, now);
        if !config.trading_enabled {
            return Err(ProtectionError::TradingDisabled {
                remaining_secs: config.enable_time - now,
            });
        }

        let max_allowed = total_supply * config.max_buy_percent_bps as u128 / 10_000;
        if amount > max_allowed {
            return Err(ProtectionError::MaxBuyExceeded {
                amount,
                max_allowed,
                max_bps: config.max_buy_percent_bps,
            });
        }

        if let Some(record) = config.buy_tracking.get(buyer) {
            let elapsed = now - record.last_buy_time;
            if elapsed < config.cooldown_secs {
                return Err(ProtectionError::CooldownActive {
                    buyer: buyer.to_string(),
                    remaining_secs: config.cooldown_secs - elapsed,
                });
            }
        }

        Self::record_buy(config, buyer, amount, now);
        Ok(())
    }

    /// The lazy activation transition: disabled -> enabled once the enable
    /// time is reached. Monotonic; there is no reverse transition anywhere.
    fn maybe_enable_trading(token_id: &str, config: &mut ProtectionConfig, now: i64) {
        if !config.trading_enabled && now >= config.enable_time {
            config.trading_enabled = true;
            info!("Trading enabled for {} at {}", token_id, now);
        }
    }

    fn record_buy(config: &mut ProtectionConfig, buyer: &str, amount: u128, now: i64) {
        let record = config
            .buy_tracking
            .entry(buyer.to_string())
            .or_insert(BuyRecord {
                total_bought: 0,
                last_buy_time: now,
            });
        record.total_bought += amount;
        record.last_buy_time = now;
    }

    pub async fn add_to_whitelist(
        &self,
        token_id: &str,
        caller: &str,
        address: &str,
    ) -> Result<(), ProtectionError> {
        let mut configs = self.configs.write().await;
        let config = Self::owned(&mut configs, token_id, caller)?;
        if !config.whitelist.insert(address.to_string()) {
            return Err(ProtectionError::AlreadyWhitelisted(address.to_string()));
        }
        Ok(())
    }

    pub async fn remove_from_whitelist(
        &self,
        token_id: &str,
        caller: &str,
        address: &str,
    ) -> Result<(), ProtectionError> {
        let mut configs = self.configs.write().await;
        let config = Self::owned(&mut configs, token_id, caller)?;
        if !config.whitelist.remove(address) {
            return Err(ProtectionError::NotWhitelisted(address.to_string()));
        }
        Ok(())
    }

    pub async fn add_to_blacklist(
        &self,
        token_id: &str,
        caller: &str,
        address: &str,
    ) -> Result<(), ProtectionError> {
        let mut configs = self.configs.write().await;
        let config = Self::owned(&mut configs, token_id, caller)?;
        if !config.blacklist.insert(address.to_string()) {
            return Err(ProtectionError::AlreadyBlacklisted(address.to_string()));
        }
        Ok(())
    }

    pub async fn remove_from_blacklist(
        &self,
        token_id: &str,
        caller: &str,
        address: &str,
    ) -> Result<(), ProtectionError> {
        let mut configs = self.configs.write().await;
        let config = Self::owned(&mut configs, token_id, caller)?;
        if !config.blacklist.remove(address) {
            return Err(ProtectionError::NotBlacklisted(address.to_string()));
        }
        Ok(())
    }

    /// Live-tune the buy cap and/or cooldown. Applies to subsequent checks
    /// only; past buys are not re-judged.
    pub async fn update_limits(
        &self,
        token_id: &str,
        caller: &str,
        max_buy_percent_bps: Option<u32>,
        cooldown_secs: Option<i64>,
    ) -> Result<(), ProtectionError> {
        let mut configs = self.configs.write().await;
        let config = Self::owned(&mut configs, token_id, caller)?;
        if let Some(bps) = max_buy_percent_bps {
            config.max_buy_percent_bps = bps;
        }
        if let Some(cooldown) = cooldown_secs {
            config.cooldown_secs = cooldown;
        }
        Ok(())
    }

    pub async fn snapshot(&self, token_id: &str) -> Option<ProtectionSnapshot> {
        let configs = self.configs.read().await;
        configs.get(token_id).map(|c| ProtectionSnapshot {
            token_id: token_id.to_string(),
            owner: c.owner.clone(),
            trading_enabled: c.trading_enabled,
            enable_time: c.enable_time,
            cooldown_secs: c.cooldown_secs,
            max_buy_percent_bps: c.max_buy_percent_bps,
            whitelisted: c.whitelist.len(),
            blacklisted: c.blacklist.len(),
            tracked_buyers: c.buy_tracking.len(),
        })
    }

    fn owned<'a>(
        configs: &'a mut HashMap<String, ProtectionConfig>,
        token_id: &str,
        caller: &str,
    ) -> Result<&'a mut ProtectionConfig, ProtectionError> {
        let config = configs
            .get_mut(token_id)
            .ok_or_else(|| ProtectionError::UnknownToken(token_id.to_string()))?;
        if config.owner != caller {
            return Err(ProtectionError::NotOwner {
                token_id: token_id.to_string(),
                caller: caller.to_string(),
            });
        }
        Ok(config)
    }
}

impl Default for AntiBotEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPLY: u128 = 1_000_000;

    fn settings() -> ProtectionSettings {
        ProtectionSettings {
            enable_delay_secs: 300,
            cooldown_secs: 60,
            max_buy_percent_bps: 100, // 1% of supply
        }
    }

    async fn engine_with_token(now: i64) -> AntiBotEngine {
        let engine = AntiBotEngine::new();
        engine
            .create_protection("tok", "creator", &settings(), now)
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn trading_enables_exactly_at_enable_time() {
        let engine = engine_with_token(1_000).await;

        // One second early: still disabled.
        let early = engine
            .check_can_buy("tok", "bob", 1_000, SUPPLY, 1_299)
            .await;
        assert!(matches!(
            early,
            Err(ProtectionError::TradingDisabled { remaining_secs: 1 })
        ));
        assert!(!engine.snapshot("tok").await.unwrap().trading_enabled);

        // Exactly at the boundary: the check itself flips the state.
        engine
            .check_can_buy("tok", "bob", 1_000, SUPPLY, 1_300)
            .await
            .unwrap();
        assert!(engine.snapshot("tok").await.unwrap().trading_enabled);

        // Monotonic: still enabled for later buyers.
        engine
            .check_can_buy("tok", "carol", 1_000, SUPPLY, 1_301)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn whitelisted_buyer_bypasses_every_check() {
        let engine = engine_with_token(1_000).await;
        // Creator is auto-whitelisted and buys before enable time, over the
        // cap, with no cooldown between.
        engine
            .check_can_buy("tok", "creator", SUPPLY / 2, SUPPLY, 1_001)
            .await
            .unwrap();
        engine
            .check_can_buy("tok", "creator", SUPPLY / 2, SUPPLY, 1_002)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn blacklisted_buyer_always_fails() {
        let engine = engine_with_token(1_000).await;
        engine
            .add_to_blacklist("tok", "creator", "sniper")
            .await
            .unwrap();
        let result = engine
            .check_can_buy("tok", "sniper", 1, SUPPLY, 10_000)
            .await;
        assert!(matches!(result, Err(ProtectionError::Blacklisted(_))));
    }

    #[tokio::test]
    async fn buys_over_the_bps_cap_are_rejected() {
        let engine = engine_with_token(0).await;
        let max_allowed = SUPPLY * 100 / 10_000;

        let over = engine
            .check_can_buy("tok", "bob", max_allowed + 1, SUPPLY, 500)
            .await;
        assert!(matches!(
            over,
            Err(ProtectionError::MaxBuyExceeded { .. })
        ));

        engine
            .check_can_buy("tok", "bob", max_allowed, SUPPLY, 500)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cooldown_blocks_until_exactly_elapsed() {
        let engine = engine_with_token(0).await;
        let t0 = 1_000;
        engine
            .check_can_buy("tok", "bob", 100, SUPPLY, t0)
            .await
            .unwrap();

        let too_soon = engine
            .check_can_buy("tok", "bob", 100, SUPPLY, t0 + 59)
            .await;
        assert!(matches!(
            too_soon,
            Err(ProtectionError::CooldownActive { remaining_secs: 1, .. })
        ));

        engine
            .check_can_buy("tok", "bob", 100, SUPPLY, t0 + 60)
            .await
            .unwrap();

        let record_total = {
            let configs = engine.configs.read().await;
            configs.get("tok").unwrap().buy_tracking["bob"].total_bought
        };
        assert_eq!(record_total, 200);
    }

    #[tokio::test]
    async fn list_mutations_are_fail_loud_and_owner_only() {
        let engine = engine_with_token(0).await;

        engine
            .add_to_whitelist("tok", "creator", "friend")
            .await
            .unwrap();
        let dup = engine.add_to_whitelist("tok", "creator", "friend").await;
        assert!(matches!(dup, Err(ProtectionError::AlreadyWhitelisted(_))));

        let absent = engine
            .remove_from_whitelist("tok", "creator", "stranger")
            .await;
        assert!(matches!(absent, Err(ProtectionError::NotWhitelisted(_))));

        let not_owner = engine.add_to_whitelist("tok", "mallory", "mallory").await;
        assert!(matches!(not_owner, Err(ProtectionError::NotOwner { .. })));

        let absent_blacklist = engine
            .remove_from_blacklist("tok", "creator", "nobody")
            .await;
        assert!(matches!(
            absent_blacklist,
            Err(ProtectionError::NotBlacklisted(_))
        ));
    }

    #[tokio::test]
    async fn limit_updates_apply_to_subsequent_checks_only() {
        let engine = engine_with_token(0).await;
        engine
            .check_can_buy("tok", "bob", 100, SUPPLY, 1_000)
            .await
            .unwrap();

        engine
            .update_limits("tok", "creator", Some(1), Some(10))
            .await
            .unwrap();

        // New cap: 0.01% of supply = 100 units; new cooldown: 10s.
        let over = engine
            .check_can_buy("tok", "bob", 101, SUPPLY, 1_010)
            .await;
        assert!(matches!(over, Err(ProtectionError::MaxBuyExceeded { max_allowed: 100, .. })));
        engine
            .check_can_buy("tok", "bob", 100, SUPPLY, 1_010)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn double_initialization_is_a_conflict() {
        let engine = engine_with_token(0).await;
        let again = engine
            .create_protection("tok", "creator", &settings(), 5)
            .await;
        assert!(matches!(
            again,
            Err(ProtectionError::AlreadyInitialized(_))
        ));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let engine = AntiBotEngine::new();
        let result = engine.check_can_buy("ghost", "bob", 1, SUPPLY, 0).await;
        assert!(matches!(result, Err(ProtectionError::UnknownToken(_))));
    }
}

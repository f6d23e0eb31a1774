use super::{DeploymentError, DeploymentStatus, DeploymentStore, StepRef};
use crate::adapters::{LedgerCall, LedgerClient, SubmittedTx};
use crate::config::{DeploymentConfig, NormalizerConfig, ProtectionDefaults};
use crate::escrow::LiquidityLocker;
use crate::fees::FeeRouter;
use crate::metadata::{metadata_uri, MetadataAssembler};
use crate::normalizer::normalize;
use crate::protection::{AntiBotEngine, ProtectionSettings};
use crate::types::{DeploymentRequest, DeploymentResult, ParsedRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};
use uuid::Uuid;

/// Runs one accepted request through the fixed pipeline: metadata, token
/// creation, protection, fee routing, liquidity, lock. Steps are strictly
/// sequential, each remote call is timeout-bounded, and a failing step ends
/// the deployment where it stands — committed artifacts are left in place,
/// never rolled back.
pub struct DeploymentOrchestrator {
    config: DeploymentConfig,
    normalizer: NormalizerConfig,
    protection_defaults: ProtectionDefaults,
    store: Arc<DeploymentStore>,
    assembler: Arc<MetadataAssembler>,
    ledger: Arc<dyn LedgerClient>,
    protection: Arc<AntiBotEngine>,
    locker: Arc<LiquidityLocker>,
    fees: Arc<FeeRouter>,
}

impl DeploymentOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: DeploymentConfig,
        normalizer: NormalizerConfig,
        protection_defaults: ProtectionDefaults,
        store: Arc<DeploymentStore>,
        assembler: Arc<MetadataAssembler>,
        ledger: Arc<dyn LedgerClient>,
        protection: Arc<AntiBotEngine>,
        locker: Arc<LiquidityLocker>,
        fees: Arc<FeeRouter>,
    ) -> Self {
        Self {
            config,
            normalizer,
            protection_defaults,
            store,
            assembler,
            ledger,
            protection,
            locker,
            fees,
        }
    }

    /// Execute one deployment end to end. Always returns a terminal result;
    /// the record in the store carries the step-by-step history.
    pub async fn deploy(
        &self,
        request_id: Uuid,
        request: &DeploymentRequest,
        parsed: &ParsedRequest,
        now: i64,
    ) -> DeploymentResult {
        if let Err(e) = self
            .store
            .open(request_id, &request.actor_id, request.source, now)
            .await
        {
            return DeploymentResult::rejected(request_id, e.to_string());
        }
        info!(
            "Deployment {} accepted for {} via {}",
            request_id,
            request.actor_id,
            request.source.as_str()
        );

        // Step 1: metadata. Validation failures are user-facing rejections,
        // not collaborator trouble, but they terminate the record all the same.
        let params = match normalize(parsed, &self.normalizer) {
            Ok(params) => params,
            Err(e) => return self.abort(request_id, "metadata", &e.to_string(), now).await,
        };
        let metadata = self.assembler.assemble(&params).await;
        if let Err(e) = self
            .store
            .advance(request_id, DeploymentStatus::MetadataReady, None, now)
            .await
        {
            return self.abort(request_id, "metadata", &e.to_string(), now).await;
        }

        // Step 2: token creation. The first irreversible step.
        let tx = match self
            .submit(
                "create_token",
                LedgerCall::CreateToken {
                    name: params.name.clone(),
                    symbol: params.symbol.clone(),
                    total_supply: self.config.total_supply,
                    metadata_uri: metadata_uri(&metadata),
                },
            )
            .await
        {
            Ok(tx) => tx,
            Err(e) => return self.abort(request_id, e.step(), &e.to_string(), now).await,
        };
        let token_id = match tx.event_attribute("token_created", "token_id") {
            Some(token_id) => token_id.to_string(),
            None => {
                let e = DeploymentError::MissingArtifact("token_id");
                return self.abort(request_id, "create_token", &e.to_string(), now).await;
            }
        };
        if let Err(e) = self.store.set_token_id(request_id, &token_id).await {
            return self.abort(request_id, "create_token", &e.to_string(), now).await;
        }
        if let Err(e) = self
            .store
            .advance(
                request_id,
                DeploymentStatus::Deployed,
                Some(StepRef {
                    step: "create_token".to_string(),
                    tx_ref: tx.tx_ref.clone(),
                }),
                now,
            )
            .await
        {
            return self.abort(request_id, "create_token", &e.to_string(), now).await;
        }
        info!("Deployment {} created token {}", request_id, token_id);

        // Step 3: anti-bot guards. Requires the token id, so it cannot move
        // ahead of creation.
        let settings = ProtectionSettings {
            enable_delay_secs: self.protection_defaults.enable_delay_secs,
            cooldown_secs: self.protection_defaults.cooldown_secs,
            max_buy_percent_bps: self.protection_defaults.max_buy_percent_bps,
        };
        let tx = match self
            .submit(
                "setup_protection",
                LedgerCall::InitProtection {
                    token_id: token_id.clone(),
                    enable_delay_secs: settings.enable_delay_secs,
                    cooldown_secs: settings.cooldown_secs,
                    max_buy_percent_bps: settings.max_buy_percent_bps,
                },
            )
            .await
        {
            Ok(tx) => tx,
            Err(e) => return self.abort(request_id, e.step(), &e.to_string(), now).await,
        };
        if let Err(e) = self
            .protection
            .create_protection(&token_id, &request.actor_id, &settings, now)
            .await
        {
            return self
                .abort(request_id, "setup_protection", &e.to_string(), now)
                .await;
        }
        if let Err(e) = self
            .store
            .advance(
                request_id,
                DeploymentStatus::Protected,
                Some(StepRef {
                    step: "setup_protection".to_string(),
                    tx_ref: tx.tx_ref,
                }),
                now,
            )
            .await
        {
            return self
                .abort(request_id, "setup_protection", &e.to_string(), now)
                .await;
        }

        // Step 4: fee routing.
        let split = self.fees.split().await;
        let tx = match self
            .submit(
                "configure_fees",
                LedgerCall::ConfigureFees {
                    token_id: token_id.clone(),
                    creator: request.actor_id.clone(),
                    protocol_bps: split.protocol_bps,
                    creator_bps: split.creator_bps,
                },
            )
            .await
        {
            Ok(tx) => tx,
            Err(e) => return self.abort(request_id, e.step(), &e.to_string(), now).await,
        };
        if let Err(e) = self.fees.register_token(&token_id, &request.actor_id).await {
            return self
                .abort(request_id, "configure_fees", &e.to_string(), now)
                .await;
        }
        if let Err(e) = self
            .store
            .advance(
                request_id,
                DeploymentStatus::FeeConfigured,
                Some(StepRef {
                    step: "configure_fees".to_string(),
                    tx_ref: tx.tx_ref,
                }),
                now,
            )
            .await
        {
            return self
                .abort(request_id, "configure_fees", &e.to_string(), now)
                .await;
        }

        // Step 5: seed the pool. Must precede the lock, which escrows the LP
        // shares this step mints.
        let token_amount =
            self.config.total_supply * self.config.liquidity_supply_bps as u128 / 10_000;
        let tx = match self
            .submit(
                "add_liquidity",
                LedgerCall::AddLiquidity {
                    token_id: token_id.clone(),
                    token_amount,
                    quote_amount: self.config.quote_liquidity,
                },
            )
            .await
        {
            Ok(tx) => tx,
            Err(e) => return self.abort(request_id, e.step(), &e.to_string(), now).await,
        };
        let lp_amount = match tx
            .event_attribute("lp_minted", "lp_amount")
            .and_then(|v| v.parse::<u128>().ok())
        {
            Some(lp_amount) => lp_amount,
            None => {
                let e = DeploymentError::MissingArtifact("lp_amount");
                return self.abort(request_id, "add_liquidity", &e.to_string(), now).await;
            }
        };
        if let Err(e) = self
            .store
            .advance(
                request_id,
                DeploymentStatus::LiquidityProvided,
                Some(StepRef {
                    step: "add_liquidity".to_string(),
                    tx_ref: tx.tx_ref,
                }),
                now,
            )
            .await
        {
            return self
                .abort(request_id, "add_liquidity", &e.to_string(), now)
                .await;
        }

        // Step 6: escrow the LP shares.
        let lock_id = match self
            .locker
            .lock(
                &format!("lp:{}", token_id),
                &request.actor_id,
                lp_amount,
                self.config.liquidity_lock_secs,
                now,
            )
            .await
        {
            Ok(lock_id) => lock_id,
            Err(e) => {
                return self
                    .abort(request_id, "lock_liquidity", &e.to_string(), now)
                    .await
            }
        };
        let tx = match self
            .submit(
                "lock_liquidity",
                LedgerCall::LockLiquidity {
                    token_id: token_id.clone(),
                    lock_id,
                    unlock_time: now + self.config.liquidity_lock_secs,
                },
            )
            .await
        {
            Ok(tx) => tx,
            Err(e) => return self.abort(request_id, e.step(), &e.to_string(), now).await,
        };
        if let Err(e) = self.store.set_lock_id(request_id, lock_id).await {
            return self
                .abort(request_id, "lock_liquidity", &e.to_string(), now)
                .await;
        }
        let final_tx_ref = tx.tx_ref.clone();
        if let Err(e) = self
            .store
            .advance(
                request_id,
                DeploymentStatus::LiquidityLocked,
                Some(StepRef {
                    step: "lock_liquidity".to_string(),
                    tx_ref: tx.tx_ref,
                }),
                now,
            )
            .await
        {
            return self
                .abort(request_id, "lock_liquidity", &e.to_string(), now)
                .await;
        }

        info!(
            "Deployment {} complete: token {} live with locked liquidity",
            request_id, token_id
        );
        DeploymentResult {
            success: true,
            request_id,
            token_id: Some(token_id),
            tx_ref: Some(final_tx_ref),
            reason: None,
        }
    }

    /// Submit one ledger call with the step timeout applied. A call that
    /// never comes back is that step's failure, nothing more.
    async fn submit(
        &self,
        step: &'static str,
        call: LedgerCall,
    ) -> Result<SubmittedTx, DeploymentError> {
        let bound = Duration::from_secs(self.config.step_timeout_secs);
        match timeout(bound, self.ledger.submit(call)).await {
            Err(_) => Err(DeploymentError::StepTimedOut {
                step,
                timeout_secs: self.config.step_timeout_secs,
            }),
            Ok(Err(e)) => Err(DeploymentError::StepFailed {
                step,
                reason: e.to_string(),
            }),
            Ok(Ok(tx)) => Ok(tx),
        }
    }

    /// Terminate the record as failed and build the caller-facing result.
    /// Whatever the earlier steps committed stays committed.
    async fn abort(
        &self,
        request_id: Uuid,
        step: &str,
        reason: &str,
        now: i64,
    ) -> DeploymentResult {
        error!("Deployment {} failed at {}: {}", request_id, step, reason);
        if let Err(e) = self.store.mark_failed(request_id, step, reason, now).await {
            error!("Could not mark {} failed: {}", request_id, e);
        }
        let token_id = self
            .store
            .get(request_id)
            .await
            .and_then(|record| record.token_id);
        DeploymentResult {
            success: false,
            request_id,
            token_id,
            tx_ref: None,
            reason: Some(format!("{}: {}", step, reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryLedger, LedgerError, PlaceholderImageStudio, TemplateContentGenerator,
    };
    use crate::config::EscrowConfig;
    use crate::config::FeeConfig;
    use crate::types::RequestSource;
    use async_trait::async_trait;

    /// Ledger that rejects one call kind and executes everything else.
    struct FlakyLedger {
        inner: InMemoryLedger,
        fail_kind: &'static str,
    }

    #[async_trait]
    impl LedgerClient for FlakyLedger {
        async fn submit(&self, call: LedgerCall) -> Result<SubmittedTx, LedgerError> {
            if call.kind() == self.fail_kind {
                return Err(LedgerError::Execution("pool creation reverted".to_string()));
            }
            self.inner.submit(call).await
        }
    }

    /// Ledger that never answers.
    struct SilentLedger;

    #[async_trait]
    impl LedgerClient for SilentLedger {
        async fn submit(&self, _call: LedgerCall) -> Result<SubmittedTx, LedgerError> {
            std::future::pending().await
        }
    }

    struct Harness {
        orchestrator: DeploymentOrchestrator,
        store: Arc<DeploymentStore>,
        protection: Arc<AntiBotEngine>,
        locker: Arc<LiquidityLocker>,
        fees: Arc<FeeRouter>,
    }

    fn harness(ledger: Arc<dyn LedgerClient>) -> Harness {
        let store = Arc::new(DeploymentStore::new());
        let protection = Arc::new(AntiBotEngine::new());
        let locker = Arc::new(LiquidityLocker::new(EscrowConfig::default()));
        let fees = Arc::new(FeeRouter::new(&FeeConfig::default()));
        let assembler = Arc::new(MetadataAssembler::new(
            Arc::new(TemplateContentGenerator),
            Arc::new(PlaceholderImageStudio),
        ));
        let orchestrator = DeploymentOrchestrator::new(
            DeploymentConfig {
                step_timeout_secs: 1,
                ..DeploymentConfig::default()
            },
            NormalizerConfig::default(),
            ProtectionDefaults::default(),
            store.clone(),
            assembler,
            ledger,
            protection.clone(),
            locker.clone(),
            fees.clone(),
        );
        Harness {
            orchestrator,
            store,
            protection,
            locker,
            fees,
        }
    }

    fn catmoon_request() -> (DeploymentRequest, ParsedRequest) {
        (
            DeploymentRequest {
                source: RequestSource::Social,
                actor_id: "alice".to_string(),
                raw_text: "create a rocket cat token called CatMoon with symbol CMON".to_string(),
                received_at: 1_000,
            },
            ParsedRequest {
                is_request: true,
                confidence: 85,
                name: Some("CatMoon".to_string()),
                symbol: Some("CMON".to_string()),
                theme: Some("rocket cat".to_string()),
                emoji: None,
            },
        )
    }

    #[tokio::test]
    async fn full_pipeline_ends_liquidity_locked() {
        let h = harness(Arc::new(InMemoryLedger::new()));
        let (request, parsed) = catmoon_request();
        let request_id = Uuid::new_v4();

        let result = h
            .orchestrator
            .deploy(request_id, &request, &parsed, 1_000)
            .await;
        assert!(result.success, "{:?}", result.reason);
        let token_id = result.token_id.clone().unwrap();
        assert!(result.tx_ref.is_some());

        let record = h.store.get(request_id).await.unwrap();
        assert_eq!(record.status, DeploymentStatus::LiquidityLocked);
        assert_eq!(record.token_id.as_deref(), Some(token_id.as_str()));
        assert!(record.last_error.is_none());

        // A transaction reference for every ledger step, in pipeline order.
        let steps: Vec<&str> = record.tx_refs.iter().map(|r| r.step.as_str()).collect();
        assert_eq!(
            steps,
            vec![
                "create_token",
                "setup_protection",
                "configure_fees",
                "add_liquidity",
                "lock_liquidity"
            ]
        );
        assert!(record.tx_refs.iter().all(|r| r.tx_ref.starts_with("0x")));

        // Side effects landed in every downstream component.
        let snapshot = h.protection.snapshot(&token_id).await.unwrap();
        assert_eq!(snapshot.owner, "alice");
        assert!(!snapshot.trading_enabled);

        let lock_id = record.lock_id.unwrap();
        let lock = h.locker.get(lock_id).await.unwrap();
        assert_eq!(lock.depositor, "alice");
        assert_eq!(lock.amount, DeploymentConfig::default().quote_liquidity);

        assert_eq!(
            h.fees.creator_account(&token_id).await.unwrap().creator,
            "alice"
        );
    }

    #[tokio::test]
    async fn failed_step_terminates_and_keeps_prior_artifacts() {
        let h = harness(Arc::new(FlakyLedger {
            inner: InMemoryLedger::new(),
            fail_kind: "add_liquidity",
        }));
        let (request, parsed) = catmoon_request();
        let request_id = Uuid::new_v4();

        let result = h
            .orchestrator
            .deploy(request_id, &request, &parsed, 1_000)
            .await;
        assert!(!result.success);
        assert!(result.reason.as_deref().unwrap().contains("add_liquidity"));

        let record = h.store.get(request_id).await.unwrap();
        assert_eq!(record.status, DeploymentStatus::Failed);
        assert!(record.last_error.as_deref().unwrap().contains("add_liquidity"));

        // Everything up to the failing step stayed committed: token id,
        // earlier tx refs, protection config, fee registration.
        let token_id = record.token_id.clone().unwrap();
        assert_eq!(record.tx_refs.len(), 3);
        assert!(h.protection.snapshot(&token_id).await.is_some());
        assert!(h.fees.creator_account(&token_id).await.is_some());

        // But the pipeline never reached the escrow.
        assert_eq!(h.locker.total_escrowed(&format!("lp:{}", token_id)).await, 0);
    }

    #[tokio::test]
    async fn validation_failure_rejects_without_touching_the_ledger() {
        let ledger = Arc::new(InMemoryLedger::new());
        let h = harness(ledger.clone());
        let (request, mut parsed) = catmoon_request();
        parsed.confidence = 40;
        let request_id = Uuid::new_v4();

        let result = h
            .orchestrator
            .deploy(request_id, &request, &parsed, 1_000)
            .await;
        assert!(!result.success);
        assert!(result.reason.as_deref().unwrap().contains("confidence"));

        let record = h.store.get(request_id).await.unwrap();
        assert_eq!(record.status, DeploymentStatus::Failed);
        assert!(record.token_id.is_none());
        assert!(ledger.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_request_id_is_a_conflict() {
        let h = harness(Arc::new(InMemoryLedger::new()));
        let (request, parsed) = catmoon_request();
        let request_id = Uuid::new_v4();

        let first = h
            .orchestrator
            .deploy(request_id, &request, &parsed, 1_000)
            .await;
        assert!(first.success);

        let second = h
            .orchestrator
            .deploy(request_id, &request, &parsed, 1_001)
            .await;
        assert!(!second.success);
        assert!(second.reason.as_deref().unwrap().contains("already in flight"));
    }

    #[tokio::test]
    async fn hung_collaborator_counts_as_step_failure() {
        let h = harness(Arc::new(SilentLedger));
        let (request, parsed) = catmoon_request();
        let request_id = Uuid::new_v4();

        let result = h
            .orchestrator
            .deploy(request_id, &request, &parsed, 1_000)
            .await;
        assert!(!result.success);
        assert!(result.reason.as_deref().unwrap().contains("timed out"));

        let record = h.store.get(request_id).await.unwrap();
        assert_eq!(record.status, DeploymentStatus::Failed);
        assert!(record
            .last_error
            .as_deref()
            .unwrap()
            .starts_with("create_token"));
    }
}

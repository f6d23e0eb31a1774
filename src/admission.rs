use crate::config::AdmissionConfig;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Outcome of an admission check. `Allowed` is returned at most once per
/// `(source, event)` pair for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AdmissionDecision {
    Allowed,
    Duplicate,
    RateLimited { retry_after_secs: i64 },
}

/// Sliding-window counters for one actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateState {
    pub window_start: i64,
    pub request_count: u32,
    pub cooldown_until: Option<i64>,
}

impl RateState {
    fn new(now: i64) -> Self {
        Self {
            window_start: now,
            request_count: 0,
            cooldown_until: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdmissionStats {
    pub allowed: u64,
    pub duplicates: u64,
    pub rate_limited: u64,
    pub tracked_actors: usize,
    pub seen_events: usize,
}

/// Gate in front of the deployment pipeline: per-(source, event) dedup plus a
/// per-actor sliding window with a hard cooldown after the window is blown.
/// Never suspends; the only side effects are on its own stores.
pub struct AdmissionController {
    config: AdmissionConfig,
    /// Event fingerprint -> admission timestamp. Retained for the process
    /// lifetime; upstream feeds window their own event ids.
    seen_events: DashMap<String, i64>,
    rate_states: RwLock<HashMap<String, RateState>>,
    stats: RwLock<AdmissionStats>,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            seen_events: DashMap::new(),
            rate_states: RwLock::new(HashMap::new()),
            stats: RwLock::new(AdmissionStats::default()),
        }
    }

    /// Check whether an inbound event may start a deployment. Duplicates are
    /// answered before any rate accounting so a replayed event neither
    /// consumes window budget nor deploys twice.
    pub async fn admit(
        &self,
        source_id: &str,
        event_id: &str,
        actor_id: &str,
        now: i64,
    ) -> AdmissionDecision {
        let fingerprint = event_fingerprint(source_id, event_id);
        if self.seen_events.contains_key(&fingerprint) {
            self.stats.write().await.duplicates += 1;
            return AdmissionDecision::Duplicate;
        }

        let mut states = self.rate_states.write().await;
        let state = states
            .entry(actor_id.to_string())
            .or_insert_with(|| RateState::new(now));

        if let Some(until) = state.cooldown_until {
            if now < until {
                self.stats.write().await.rate_limited += 1;
                return AdmissionDecision::RateLimited {
                    retry_after_secs: until - now,
                };
            }
            // Cooldown served: the window resets fully, not partially.
            *state = RateState::new(now);
        }

        if now - state.window_start >= self.config.time_window_secs {
            *state = RateState::new(now);
        }

        if state.request_count >= self.config.max_requests {
            state.cooldown_until = Some(now + self.config.cooldown_secs);
            warn!(
                "Actor {} exceeded {} requests per {}s window, cooling down for {}s",
                actor_id, self.config.max_requests, self.config.time_window_secs,
                self.config.cooldown_secs
            );
            self.stats.write().await.rate_limited += 1;
            return AdmissionDecision::RateLimited {
                retry_after_secs: self.config.cooldown_secs,
            };
        }

        // Only an accepted admission marks the event as seen, so a
        // rate-limited attempt can legitimately be retried later. The insert
        // is the authoritative once-only check: if a racing admit got here
        // first, this one is the duplicate.
        if self.seen_events.insert(fingerprint, now).is_some() {
            self.stats.write().await.duplicates += 1;
            return AdmissionDecision::Duplicate;
        }
        state.request_count += 1;
        self.stats.write().await.allowed += 1;
        AdmissionDecision::Allowed
    }

    /// Manually put an actor on cooldown until the given timestamp.
    pub async fn block_actor(&self, actor_id: &str, until: i64, now: i64) {
        let mut states = self.rate_states.write().await;
        let state = states
            .entry(actor_id.to_string())
            .or_insert_with(|| RateState::new(now));
        state.cooldown_until = Some(until);
        info!("Actor {} blocked until {}", actor_id, until);
    }

    /// Lift a manual or earned cooldown early.
    pub async fn unblock_actor(&self, actor_id: &str) {
        let mut states = self.rate_states.write().await;
        if let Some(state) = states.get_mut(actor_id) {
            state.cooldown_until = None;
        }
        info!("Actor {} unblocked", actor_id);
    }

    pub async fn rate_state(&self, actor_id: &str) -> Option<RateState> {
        self.rate_states.read().await.get(actor_id).cloned()
    }

    pub async fn stats(&self) -> AdmissionStats {
        let mut stats = self.stats.read().await.clone();
        stats.tracked_actors = self.rate_states.read().await.len();
        stats.seen_events = self.seen_events.len();
        stats
    }
}

fn event_fingerprint(source_id: &str, event_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(event_id.as_bytes());
    hex::encode(hasher.finalize())
}

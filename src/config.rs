use serde::Deserialize;
use tracing::{info, warn};

/// Top-level configuration for the launch platform. Every section has
/// production defaults so the binary runs with no config file; a JSON file
/// pointed at by `LAUNCHPAD_CONFIG` overrides them.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PlatformConfig {
    pub server: ServerConfig,
    pub admission: AdmissionConfig,
    pub normalizer: NormalizerConfig,
    pub adapters: AdapterConfig,
    pub deployment: DeploymentConfig,
    pub protection: ProtectionDefaults,
    pub escrow: EscrowConfig,
    pub fees: FeeConfig,
}

impl PlatformConfig {
    /// Load from the `LAUNCHPAD_CONFIG` path if set, falling back to defaults
    /// on any read/parse problem rather than refusing to start.
    pub fn load() -> Self {
        let Some(path) = std::env::var_os("LAUNCHPAD_CONFIG") else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => {
                    info!("Loaded platform config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Config file {:?} is invalid ({}), using defaults", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Could not read config file {:?} ({}), using defaults", path, e);
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Requests allowed per actor inside one sliding window.
    pub max_requests: u32,
    pub time_window_secs: i64,
    /// Penalty period after the window limit is exceeded.
    pub cooldown_secs: i64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            time_window_secs: 3_600,
            cooldown_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Minimum parser confidence (0-100) to accept a request.
    pub min_confidence: u8,
    /// Theme used when the parser extracted none.
    pub default_theme: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_confidence: 70,
            default_theme: "internet meme".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AdapterConfig {
    /// Remote NL parsing service; the built-in keyword parser is used when unset.
    pub parser_endpoint: Option<String>,
    /// Remote description/tokenomics generator; templated copy is used when unset.
    pub content_endpoint: Option<String>,
    /// Remote image renderer; placeholder art is used when unset.
    pub imagery_endpoint: Option<String>,
    pub request_timeout_secs: RequestTimeout,
}

/// Newtype so `#[serde(default)]` gives a nonzero timeout.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RequestTimeout(pub u64);

impl Default for RequestTimeout {
    fn default() -> Self {
        RequestTimeout(10)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Upper bound on any single remote step; a step that outlives this fails
    /// the whole deployment.
    pub step_timeout_secs: u64,
    /// Minted supply in base units (1B tokens at 6 decimals).
    pub total_supply: u128,
    /// Share of supply paired into the pool, in basis points.
    pub liquidity_supply_bps: u32,
    /// Quote-side deposit for the initial pool, in base units.
    pub quote_liquidity: u128,
    /// How long the LP position stays escrowed.
    pub liquidity_lock_secs: i64,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 30,
            total_supply: 1_000_000_000_000_000,
            liquidity_supply_bps: 2_000,
            quote_liquidity: 50_000_000_000,
            liquidity_lock_secs: 180 * 24 * 3_600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtectionDefaults {
    /// Delay between token creation and trading enable.
    pub enable_delay_secs: i64,
    /// Per-address gap between buys.
    pub cooldown_secs: i64,
    /// Largest single buy as a share of total supply, in basis points.
    pub max_buy_percent_bps: u32,
}

impl Default for ProtectionDefaults {
    fn default() -> Self {
        Self {
            enable_delay_secs: 300,
            cooldown_secs: 60,
            max_buy_percent_bps: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Platform floor for lock durations (30 days).
    pub min_lock_duration_secs: i64,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            min_lock_duration_secs: 30 * 24 * 3_600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub protocol_bps: u16,
    pub creator_bps: u16,
    /// Principal allowed to update the split and drain the protocol balance.
    pub admin: String,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            protocol_bps: 300,
            creator_bps: 700,
            admin: "treasury".to_string(),
        }
    }
}

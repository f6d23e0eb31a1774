//! Unattended token-launch backend: a natural-language request comes in, a
//! deployed token with guarded trading and time-locked liquidity comes out,
//! exactly once per accepted request.

pub mod adapters;
pub mod admission;
pub mod api;
pub mod config;
pub mod deployment;
pub mod escrow;
pub mod fees;
pub mod metadata;
pub mod normalizer;
pub mod protection;
pub mod types;

pub use admission::{AdmissionController, AdmissionDecision};
pub use config::PlatformConfig;
pub use deployment::{DeploymentOrchestrator, DeploymentStatus, DeploymentStore};
pub use escrow::LiquidityLocker;
pub use fees::FeeRouter;
pub use metadata::MetadataAssembler;
pub use protection::AntiBotEngine;
pub use types::{DeploymentRequest, DeploymentResult, ParsedRequest, TokenMetadata, TokenParameters};

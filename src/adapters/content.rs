use super::CollaboratorError;
use crate::types::TokenParameters;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Copy produced for a token: description, tokenomics blurb and social tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub description: String,
    pub tokenomics: String,
    pub hashtags: Vec<String>,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, params: &TokenParameters) -> Result<GeneratedContent, CollaboratorError>;
}

/// Remote generator speaking JSON over HTTP.
pub struct HttpContentGenerator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpContentGenerator {
    pub fn new(endpoint: String, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint,
        }
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate(&self, params: &TokenParameters) -> Result<GeneratedContent, CollaboratorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "name": params.name,
                "symbol": params.symbol,
                "theme": params.theme,
            }))
            .send()
            .await
            .map_err(CollaboratorError::transport)?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Transport(format!(
                "content generator returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<GeneratedContent>()
            .await
            .map_err(|e| CollaboratorError::Malformed {
                service: "content generator",
                detail: e.to_string(),
            })
    }
}

/// Deterministic templated copy. Doubles as the default generator when no
/// endpoint is configured and as the assembler's fallback when the remote
/// generator fails.
#[derive(Debug, Default)]
pub struct TemplateContentGenerator;

impl TemplateContentGenerator {
    pub fn render(params: &TokenParameters) -> GeneratedContent {
        GeneratedContent {
            description: format!(
                "{} {} ({}) — a {} token born on-chain. Fair launch, locked liquidity, no presale.",
                params.emoji, params.name, params.symbol, params.theme
            ),
            tokenomics: format!(
                "Fixed supply, fully minted at launch. Liquidity paired and time-locked. \
                 Trading fees split between the protocol and the {} creator.",
                params.name
            ),
            hashtags: vec![
                format!("#{}", params.symbol),
                format!("#{}", params.name.replace(' ', "")),
                "#memecoin".to_string(),
            ],
        }
    }
}

#[async_trait]
impl ContentGenerator for TemplateContentGenerator {
    async fn generate(&self, params: &TokenParameters) -> Result<GeneratedContent, CollaboratorError> {
        Ok(Self::render(params))
    }
}

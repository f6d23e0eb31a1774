use super::CollaboratorError;
use crate::types::TokenParameters;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Imagery references for a token. Either ref may be absent; imagery is never
/// allowed to sink a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedImagery {
    pub static_ref: Option<String>,
    pub animated_ref: Option<String>,
}

#[async_trait]
pub trait ImageStudio: Send + Sync {
    async fn render(&self, params: &TokenParameters) -> Result<RenderedImagery, CollaboratorError>;
}

/// Stable reference to the locally bundled placeholder art for a symbol.
pub fn placeholder_ref(symbol: &str) -> String {
    format!("asset://placeholders/{}.svg", symbol.to_lowercase())
}

/// Remote renderer speaking JSON over HTTP.
pub struct HttpImageStudio {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpImageStudio {
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
impl ImageStudio for HttpImageStudio {
    async fn render(&self, params: &TokenParameters) -> Result<RenderedImagery, CollaboratorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "name": params.name,
                "symbol": params.symbol,
                "theme": params.theme,
                "emoji": params.emoji,
            }))
            .send()
            .await
            .map_err(CollaboratorError::transport)?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Transport(format!(
                "image studio returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<RenderedImagery>()
            .await
            .map_err(|e| CollaboratorError::Malformed {
                service: "image studio",
                detail: e.to_string(),
            })
    }
}

/// Local studio that always answers with the bundled placeholder.
#[derive(Debug, Default)]
pub struct PlaceholderImageStudio;

#[async_trait]
impl ImageStudio for PlaceholderImageStudio {
    async fn render(&self, params: &TokenParameters) -> Result<RenderedImagery, CollaboratorError> {
        Ok(RenderedImagery {
            static_ref: Some(placeholder_ref(&params.symbol)),
            animated_ref: None,
        })
    }
}

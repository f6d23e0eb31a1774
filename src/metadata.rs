use crate::adapters::imagery::placeholder_ref;
use crate::adapters::{ContentGenerator, ImageStudio, RenderedImagery, TemplateContentGenerator};
use crate::types::{TokenMetadata, TokenParameters};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

/// Merges canonical token parameters with generated copy and imagery into the
/// complete metadata record. Generator problems degrade to deterministic
/// templates and placeholder art; assembly itself never fails a deployment.
pub struct MetadataAssembler {
    content: Arc<dyn ContentGenerator>,
    imagery: Arc<dyn ImageStudio>,
}

impl MetadataAssembler {
    pub fn new(content: Arc<dyn ContentGenerator>, imagery: Arc<dyn ImageStudio>) -> Self {
        Self { content, imagery }
    }

    pub async fn assemble(&self, params: &TokenParameters) -> TokenMetadata {
        let (content_result, imagery_result) =
            tokio::join!(self.content.generate(params), self.imagery.render(params));

        let content = match content_result {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Content generation for {} failed ({}), using templated copy",
                    params.symbol, e
                );
                TemplateContentGenerator::render(params)
            }
        };

        let imagery = match imagery_result {
            Ok(imagery) => imagery,
            Err(e) => {
                warn!(
                    "Imagery for {} failed ({}), shipping placeholder art",
                    params.symbol, e
                );
                RenderedImagery {
                    static_ref: Some(placeholder_ref(&params.symbol)),
                    animated_ref: None,
                }
            }
        };

        TokenMetadata {
            params: params.clone(),
            description: content.description,
            tokenomics: content.tokenomics,
            hashtags: content.hashtags,
            image_ref: imagery.static_ref,
            animated_ref: imagery.animated_ref,
        }
    }
}

/// Content-addressed URI for an assembled metadata record.
pub fn metadata_uri(metadata: &TokenMetadata) -> String {
    let serialized = serde_json::to_vec(metadata).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&serialized);
    format!("meta://{}", hex::encode(hasher.finalize()))
}

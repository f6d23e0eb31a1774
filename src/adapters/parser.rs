use super::CollaboratorError;
use crate::types::ParsedRequest;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Natural-language parsing service boundary. Implementations turn a raw
/// message into structured launch fields; everything past this trait treats
/// the parser as opaque.
#[async_trait]
pub trait RequestParser: Send + Sync {
    async fn parse(&self, text: &str) -> Result<ParsedRequest, CollaboratorError>;
}

/// Remote parser speaking JSON over HTTP.
pub struct HttpRequestParser {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRequestParser {
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
impl RequestParser for HttpRequestParser {
    async fn parse(&self, text: &str) -> Result<ParsedRequest, CollaboratorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(CollaboratorError::transport)?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Transport(format!(
                "parser returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<ParsedRequest>()
            .await
            .map_err(|e| CollaboratorError::Malformed {
                service: "parser",
                detail: e.to_string(),
            })
    }
}

/// Keyword-driven local parser, used when no remote endpoint is configured.
/// Understands the common phrasings ("create a <theme> token called <Name>
/// with symbol <SYM>") and scores confidence by how much it extracted.
#[derive(Debug, Default)]
pub struct KeywordRequestParser;

#[async_trait]
impl RequestParser for KeywordRequestParser {
    async fn parse(&self, text: &str) -> Result<ParsedRequest, CollaboratorError> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = text.split_whitespace().collect();
        let lower_words: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

        let mentions_token = lower.contains("token") || lower.contains("coin");
        let has_verb = ["create", "launch", "make", "deploy", "mint"]
            .iter()
            .any(|v| lower.contains(v));
        let is_request = mentions_token && has_verb;

        let name = word_after(&words, &lower_words, &["called", "named"]);
        let symbol = word_after(&words, &lower_words, &["symbol", "ticker"])
            .map(|s| s.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_string())
            .filter(|s| !s.is_empty());
        let theme = theme_between(&words, &lower_words);

        let mut confidence: u8 = if is_request { 50 } else { 10 };
        if name.is_some() {
            confidence += 20;
        }
        if symbol.is_some() {
            confidence += 15;
        }
        if theme.is_some() {
            confidence += 5;
        }

        debug!(
            "Keyword parse: request={} name={:?} symbol={:?} confidence={}",
            is_request, name, symbol, confidence
        );

        Ok(ParsedRequest {
            is_request,
            confidence,
            name,
            symbol,
            theme,
            emoji: None,
        })
    }
}

/// First word following any of the marker words, in original casing.
fn word_after(words: &[&str], lower_words: &[String], markers: &[&str]) -> Option<String> {
    for (i, lw) in lower_words.iter().enumerate() {
        if markers.contains(&lw.as_str()) {
            if let Some(next) = words.get(i + 1) {
                let cleaned: String = next
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect();
                if !cleaned.is_empty() {
                    return Some(cleaned);
                }
            }
        }
    }
    None
}

/// Words between the leading article and the "token"/"coin" noun, e.g.
/// "a rocket cat token" -> "rocket cat".
fn theme_between(words: &[&str], lower_words: &[String]) -> Option<String> {
    let noun_idx = lower_words
        .iter()
        .position(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == "token"
            || w.trim_matches(|c: char| !c.is_alphanumeric()) == "coin")?;
    let start = lower_words[..noun_idx]
        .iter()
        .rposition(|w| matches!(w.as_str(), "a" | "an" | "the"))?
        + 1;
    if start >= noun_idx {
        return None;
    }
    Some(words[start..noun_idx].join(" "))
}

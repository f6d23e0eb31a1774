use crate::config::NormalizerConfig;
use crate::types::{ParsedRequest, TokenParameters};
use thiserror::Error;

/// Emoji assigned when the parser extracted none. The pick is keyed off the
/// token name so repeated parses of the same request agree.
const EMOJI_POOL: [&str; 6] = ["🚀", "🐸", "🔥", "🌙", "💎", "🐕"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message is not a token launch request")]
    NotARequest,
    #[error("parser confidence {confidence} below threshold {threshold}")]
    LowConfidence { confidence: u8, threshold: u8 },
    #[error("required field missing: {0}")]
    MissingField(&'static str),
    #[error("symbol_length: symbol must be 2-5 alphanumeric characters, got {0:?}")]
    SymbolLength(String),
}

/// Validate and canonicalize parser output into deployable token parameters.
/// Pure: no I/O, no stores touched.
pub fn normalize(
    parsed: &ParsedRequest,
    config: &NormalizerConfig,
) -> Result<TokenParameters, ValidationError> {
    if !parsed.is_request {
        return Err(ValidationError::NotARequest);
    }
    if parsed.confidence < config.min_confidence {
        return Err(ValidationError::LowConfidence {
            confidence: parsed.confidence,
            threshold: config.min_confidence,
        });
    }

    let raw_name = parsed
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField("name"))?;
    let raw_symbol = parsed
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField("symbol"))?;

    let symbol = clean_symbol(raw_symbol);
    if symbol.len() < 2 || symbol.len() > 5 {
        return Err(ValidationError::SymbolLength(raw_symbol.to_string()));
    }

    let name = clean_name(raw_name);
    if name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }

    let theme = parsed
        .theme
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&config.default_theme)
        .to_string();

    let emoji = parsed
        .emoji
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default_emoji(&name))
        .to_string();

    Ok(TokenParameters {
        name,
        symbol,
        theme,
        emoji,
    })
}

/// Uppercase and strip everything that is not an ASCII alphanumeric.
fn clean_symbol(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Drop punctuation from a display name, keeping letters, digits and single
/// inner spaces.
fn clean_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_was_space = false;
        } else if c.is_whitespace() && !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Deterministic pick from the fixed pool, keyed by the name bytes.
fn default_emoji(name: &str) -> &'static str {
    let sum: usize = name.bytes().map(|b| b as usize).sum();
    EMOJI_POOL[sum % EMOJI_POOL.len()]
}

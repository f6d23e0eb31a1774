pub mod content;
pub mod imagery;
pub mod ledger;
pub mod parser;

pub use content::{ContentGenerator, GeneratedContent, HttpContentGenerator, TemplateContentGenerator};
pub use imagery::{HttpImageStudio, ImageStudio, PlaceholderImageStudio, RenderedImagery};
pub use ledger::{InMemoryLedger, LedgerCall, LedgerClient, LedgerError, LedgerEvent, SubmittedTx};
pub use parser::{HttpRequestParser, KeywordRequestParser, RequestParser};

use thiserror::Error;

/// Failure of an external content/parsing/imagery service. Step-local: the
/// caller decides whether it is fatal (parsing) or degradable (content,
/// imagery).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{service} returned a malformed payload: {detail}")]
    Malformed { service: &'static str, detail: String },
}

impl CollaboratorError {
    pub(crate) fn transport(e: reqwest::Error) -> Self {
        CollaboratorError::Transport(e.to_string())
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a `get` run. All variants are terminal for the process.
#[derive(Debug, Error)]
pub enum GetError {
    /// Bad or missing command-line input. Raised before any request is sent.
    #[error("{0}")]
    Validation(String),

    /// The flag service answered with something other than 200.
    #[error("{context}: {status} - {body}")]
    Upstream {
        context: &'static str,
        status: u16,
        body: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Could not write output: {0}")]
    Output(#[source] std::io::Error),

    #[error("Could not encode output: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Could not write to file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GetError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        GetError::Validation(msg.into())
    }

    /// Status code of an upstream failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GetError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

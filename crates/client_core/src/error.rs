use std::path::PathBuf;

use thiserror::Error;

/// Failure of a Persistence Client call.
///
/// `Display` is exactly the text surfaced to the user, so every variant renders
/// its message and nothing else.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Decode(String),
    /// Rejection that carries no structured message, only a raw value.
    #[error("{0}")]
    Rejected(String),
}

impl PersistenceError {
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            message: format!("Erreur {status}"),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PersistenceError {
    fn from(value: reqwest::Error) -> Self {
        if let Some(status) = value.status() {
            return Self::status(status.as_u16());
        }
        if value.is_decode() {
            return Self::Decode(value.to_string());
        }
        Self::Transport(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write session file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed session file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode session entry: {0}")]
    Encode(#[from] serde_json::Error),
}

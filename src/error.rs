//! Error taxonomy for the RPC layer.
//!
//! Framing and extraction never produce errors of their own: they skip
//! malformed chunks and return absent results. Everything below is raised
//! either by the transport, by a decoder whose *required* navigation step is
//! missing, or by the download pipeline.

use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure (DNS, TLS, connection reset, body read).
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The call-specific timeout elapsed before a response arrived.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The session material is stale: a login page came back instead of data.
    #[error("authentication expired: {0}")]
    AuthenticationExpired(String),

    /// No artifact of the requested kind (and id, if given) has completed yet.
    #[error("{kind} is not ready{}", id.as_deref().map(|i| format!(" (id {i})")).unwrap_or_default())]
    ArtifactNotReady { kind: String, id: Option<String> },

    /// A required positional step was absent or of the wrong shape.
    #[error("unexpected {kind} structure at {path}: {detail}")]
    ArtifactStructureInvalid {
        kind: String,
        path: String,
        detail: String,
    },

    /// An explicit id was requested but is not among the candidates.
    #[error("{kind} {id} not found")]
    ArtifactNotFound { kind: String, id: String },

    /// Streamed transfer failed after the auth check passed.
    #[error("download of {url} failed: {detail}")]
    DownloadFailure { url: String, detail: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn structure(
        kind: impl Into<String>,
        path: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::ArtifactStructureInvalid {
            kind: kind.into(),
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn not_ready(kind: impl Into<String>, id: Option<&str>) -> Self {
        Self::ArtifactNotReady {
            kind: kind.into(),
            id: id.map(str::to_string),
        }
    }

    /// Whether the caller must refresh credentials before retrying.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, Self::AuthenticationExpired(_))
    }

    /// Whether repeating the same call later may succeed without changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::ArtifactNotReady { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    analytics::PublishError,
    catalog::CatalogError,
    common::types::SongId,
    session::SessionError,
    signer::SigningError,
};

/// Failures a control-channel command can end in.
///
/// Everything except [`GatewayError::PublishFailure`] is turned into an
/// `error` response on the channel that issued the command.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("unrecognized command: {0}")]
    InvalidCommand(String),
    #[error("song {0} not found")]
    SongNotFound(SongId),
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("song '{title}' has no audio available")]
    NoAudioAvailable { title: String },
    #[error("could not produce a playable url: {0}")]
    SigningFailure(String),
    #[error("session is tracking song {current}, not {requested}")]
    SongMismatch { current: SongId, requested: SongId },
    #[error("no active session")]
    NoSession,
    #[error("analytics publish failed: {0}")]
    PublishFailure(String),
}

impl GatewayError {
    /// Text sent back in the `message` field of an `error` response.
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidCommand(_) => "unrecognized command".to_string(),
            Self::SongNotFound(id) => format!("could not fetch song {}: not found", id),
            Self::CatalogUnavailable(_) => "could not fetch song: catalog unavailable".to_string(),
            Self::SigningFailure(_) => "could not generate audio url".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<CatalogError> for GatewayError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => Self::SongNotFound(id),
            other => Self::CatalogUnavailable(other.to_string()),
        }
    }
}

impl From<SigningError> for GatewayError {
    fn from(err: SigningError) -> Self {
        Self::SigningFailure(err.to_string())
    }
}

impl From<SessionError> for GatewayError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoSession => Self::NoSession,
            SessionError::SongMismatch { current, requested } => {
                Self::SongMismatch { current, requested }
            }
        }
    }
}

impl From<PublishError> for GatewayError {
    fn from(err: PublishError) -> Self {
        Self::PublishFailure(err.to_string())
    }
}

/// JSON error body returned by the HTTP surface.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    pub status: u16,
    /// HTTP status reason phrase (e.g. "Bad Request").
    pub error: String,
    pub message: String,
    /// The request path that caused the error.
    pub path: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: crate::server::now_ms(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").into(),
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, path)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

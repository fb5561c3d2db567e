use thiserror::Error;

/// Errors raised by the remote service client.
///
/// These are transport and protocol failures. A write the server declines
/// comes back as a [`GeneralResult`](super::GeneralResult) with
/// `status == false` instead.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("API returned error: {code} - {message}")]
    ApiError { code: i64, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl RpcError {
    /// The TestLink error code, if the server sent one.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            RpcError::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the call never produced a usable answer, as opposed to the
    /// server answering with an API error.
    pub fn is_transport(&self) -> bool {
        !matches!(self, RpcError::ApiError { .. })
    }
}

impl From<quick_xml::Error> for RpcError {
    fn from(err: quick_xml::Error) -> Self {
        RpcError::ParseError(err.to_string())
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        RpcError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::ParseError(err.to_string())
    }
}

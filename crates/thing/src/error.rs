use http::StatusCode;
use micro_httpc::{ErrorKind, HttpcError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThingError {
    #[error("http client error: {source}")]
    Httpc {
        #[from]
        source: HttpcError,
    },

    #[error("unexpected response status: {status:?}")]
    UnexpectedStatus { status: Option<StatusCode> },

    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl ThingError {
    pub fn unexpected_status(status: Option<StatusCode>) -> Self {
        Self::UnexpectedStatus { status }
    }

    pub fn invalid_argument<S: ToString>(reason: S) -> Self {
        Self::InvalidArgument { reason: reason.to_string() }
    }

    /// The kind of the underlying client failure, if the request failed in the client.
    pub fn httpc_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Httpc { source } => Some(source.kind()),
            _ => None,
        }
    }
}

use std::io;
use thiserror::Error;

use crate::connection::State;

/// Top level error of every public operation of the client.
///
/// Any error returned from [`HttpsContext::step`](crate::connection::HttpsContext::step)
/// means the cycle failed and the context is back in [`State::Idle`].
#[derive(Debug, Error)]
pub enum HttpcError {
    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: TransportError,
    },

    #[error("request error: {source}")]
    Build {
        #[from]
        source: BuildError,
    },

    #[error("response error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("response too large: {source}")]
    Overflow {
        #[from]
        source: BufferOverflow,
    },

    #[error("a request cycle is in flight, current state: {state:?}")]
    Busy { state: State },

    #[error("no request has been built")]
    NoRequest,
}

/// The failure kinds a caller can act upon without matching on the full error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ResolutionFailure,
    ConnectFailure,
    HandshakeFailure,
    WriteFailure,
    ReadFailure,
    ShutdownFailure,
    BufferOverflow,
    MalformedResponse,
    InvalidRequest,
    InvalidState,
}

impl HttpcError {
    pub fn busy(state: State) -> Self {
        Self::Busy { state }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { source } => source.kind(),
            Self::Build { source: BuildError::Overflow { .. } } | Self::Overflow { .. } => ErrorKind::BufferOverflow,
            Self::Build { .. } => ErrorKind::InvalidRequest,
            Self::Parse { .. } => ErrorKind::MalformedResponse,
            Self::Busy { .. } | Self::NoRequest => ErrorKind::InvalidState,
        }
    }

    /// Returns true if the failure was caused by a transient I/O condition,
    /// so running the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { source } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Errors raised by the transport while opening, using or closing a session.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("can't resolve host {host}: {source}")]
    Resolve { host: String, source: io::Error },

    #[error("can't connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("tls handshake failed: {source}")]
    Handshake { source: io::Error },

    #[error("write failed: {source}")]
    Write { source: io::Error },

    #[error("read failed: {source}")]
    Read { source: io::Error },

    #[error("shutdown failed: {source}")]
    Shutdown { source: io::Error },
}

impl TransportError {
    pub fn resolve<S: ToString, E: Into<io::Error>>(host: S, e: E) -> Self {
        Self::Resolve { host: host.to_string(), source: e.into() }
    }

    pub fn connect<S: ToString, E: Into<io::Error>>(addr: S, e: E) -> Self {
        Self::Connect { addr: addr.to_string(), source: e.into() }
    }

    pub fn handshake<E: Into<io::Error>>(e: E) -> Self {
        Self::Handshake { source: e.into() }
    }

    pub fn write<E: Into<io::Error>>(e: E) -> Self {
        Self::Write { source: e.into() }
    }

    pub fn read<E: Into<io::Error>>(e: E) -> Self {
        Self::Read { source: e.into() }
    }

    pub fn shutdown<E: Into<io::Error>>(e: E) -> Self {
        Self::Shutdown { source: e.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve { .. } => ErrorKind::ResolutionFailure,
            Self::Connect { .. } => ErrorKind::ConnectFailure,
            Self::Handshake { .. } => ErrorKind::HandshakeFailure,
            Self::Write { .. } => ErrorKind::WriteFailure,
            Self::Read { .. } => ErrorKind::ReadFailure,
            Self::Shutdown { .. } => ErrorKind::ShutdownFailure,
        }
    }

    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Resolve { source, .. }
            | Self::Connect { source, .. }
            | Self::Handshake { source }
            | Self::Write { source }
            | Self::Read { source }
            | Self::Shutdown { source } => source,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.io_error().kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut)
    }
}

/// Raised when writing into the shared buffer would exceed its capacity.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
#[error("buffer overflow, {required} bytes required but capacity is {capacity}")]
pub struct BufferOverflow {
    pub required: usize,
    pub capacity: usize,
}

impl BufferOverflow {
    pub fn new(required: usize, capacity: usize) -> Self {
        Self { required, capacity }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("request does not fit: {source}")]
    Overflow {
        #[from]
        source: BufferOverflow,
    },

    #[error("invalid host: {reason}")]
    InvalidHost { reason: String },

    #[error("invalid path: {reason}")]
    InvalidPath { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

impl BuildError {
    pub fn invalid_host<S: ToString>(str: S) -> Self {
        Self::InvalidHost { reason: str.to_string() }
    }

    pub fn invalid_path<S: ToString>(str: S) -> Self {
        Self::InvalidPath { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid status code: {raw:?}")]
    InvalidStatusCode { raw: String },
}

impl ParseError {
    pub fn invalid_status_code(raw: &[u8]) -> Self {
        Self::InvalidStatusCode { raw: String::from_utf8_lossy(raw).into_owned() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_source() {
        let e: HttpcError = TransportError::resolve("nowhere.invalid", io::Error::from(io::ErrorKind::NotFound)).into();
        assert_eq!(e.kind(), ErrorKind::ResolutionFailure);
        assert!(!e.is_retryable());

        let e: HttpcError = BuildError::from(BufferOverflow::new(10, 4)).into();
        assert_eq!(e.kind(), ErrorKind::BufferOverflow);

        let e: HttpcError = BufferOverflow::new(10, 4).into();
        assert_eq!(e.kind(), ErrorKind::BufferOverflow);

        let e: HttpcError = BuildError::invalid_host("empty").into();
        assert_eq!(e.kind(), ErrorKind::InvalidRequest);

        let e: HttpcError = ParseError::invalid_status_code(b"2x0").into();
        assert_eq!(e.kind(), ErrorKind::MalformedResponse);

        assert_eq!(HttpcError::busy(State::Sending).kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn transient_io_is_retryable() {
        assert!(TransportError::read(io::Error::from(io::ErrorKind::TimedOut)).is_retryable());
        assert!(TransportError::write(io::Error::from(io::ErrorKind::WouldBlock)).is_retryable());
        assert!(!TransportError::write(io::Error::from(io::ErrorKind::BrokenPipe)).is_retryable());

        let e: HttpcError = TransportError::read(io::Error::from(io::ErrorKind::Interrupted)).into();
        assert!(e.is_retryable());
    }

    #[test]
    fn display_carries_details() {
        let e = BufferOverflow::new(4097, 4096);
        assert_eq!(e.to_string(), "buffer overflow, 4097 bytes required but capacity is 4096");

        let e = ParseError::invalid_status_code(b"abc");
        assert_eq!(e.to_string(), "invalid status code: \"abc\"");
    }
}

//! The encrypted byte stream a request cycle runs over.
//!
//! The execution state machine only talks to the two traits defined here:
//!
//! - [`Connector`] opens a session to a host, one per cycle
//! - [`Transport`] is that open session, used for chunked writes and reads and
//!   finally shut down
//!
//! [`TlsConnector`] is the production implementation, TCP plus TLS through
//! `tokio-rustls`. Tests substitute scripted or mocked implementations.
//!
//! Dropping a transport releases the socket and the TLS session, whatever
//! happened before, so resource release never depends on a successful shutdown.

use async_trait::async_trait;

use crate::protocol::TransportError;

mod tls;
pub use tls::TlsConnector;
pub use tls::TlsTransport;

/// An open session able to move bytes to and from the peer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Writes the whole `chunk`.
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), TransportError>;

    /// Reads at most `buf.len()` bytes, returning how many were read.
    ///
    /// Zero means the peer has nothing more to send.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Ends the session at the protocol level.
    async fn shutdown(&mut self) -> Result<(), TransportError>;
}

/// Opens sessions to hosts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &str) -> Result<Box<dyn Transport>, TransportError>;
}

#[cfg(test)]
pub(crate) mod testing;

//! TCP plus TLS transport built on `tokio-rustls`.

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tokio_rustls::client::TlsStream;
use tracing::{debug, error, warn};

use crate::config::DriverConfig;
use crate::protocol::TransportError;
use crate::transport::{Connector, Transport};

/// Opens TLS sessions on the configured port of a host.
///
/// Name resolution uses the first address returned for the host. The TLS
/// configuration negotiates any protocol version rustls considers safe and
/// verifies the server against the Mozilla root certificates.
#[derive(Clone)]
pub struct TlsConnector {
    connector: tokio_rustls::TlsConnector,
    port: u16,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
}

impl fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConnector")
            .field("port", &self.port)
            .field("connect_timeout", &self.connect_timeout)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

impl TlsConnector {
    /// Creates a connector verifying servers against the `webpki-roots` certificates.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Handshake`] if the TLS library can't be set up.
    pub fn new(config: &DriverConfig) -> Result<Self, TransportError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        probe_random(&provider);

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let tls_config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| TransportError::handshake(io::Error::other(e)))?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(Self::with_tls_config(config, Arc::new(tls_config)))
    }

    /// Creates a connector from a caller built rustls configuration.
    pub fn with_tls_config(config: &DriverConfig, tls_config: Arc<rustls::ClientConfig>) -> Self {
        Self {
            connector: tokio_rustls::TlsConnector::from(tls_config),
            port: config.port(),
            connect_timeout: config.connect_timeout(),
            io_timeout: config.io_timeout(),
        }
    }

    async fn open(&self, host: &str) -> Result<TlsTransport, TransportError> {
        let server_name = ServerName::try_from(host.to_owned()).map_err(|e| TransportError::resolve(host, io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let addr = bounded(self.connect_timeout, lookup_host((host, self.port)))
            .await
            .map_err(|e| TransportError::resolve(host, e))?
            .next()
            .ok_or_else(|| TransportError::resolve(host, io::Error::new(io::ErrorKind::NotFound, "no address found")))?;
        debug!(host = %host, addr = %addr, "resolved host");

        let stream = bounded(self.connect_timeout, TcpStream::connect(addr)).await.map_err(|e| TransportError::connect(addr, e))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(cause = %e, "can't set nodelay");
        }

        let stream = bounded(self.connect_timeout, self.connector.connect(server_name, stream)).await.map_err(TransportError::handshake)?;
        debug!(host = %host, addr = %addr, "tls session established");

        Ok(TlsTransport { stream, io_timeout: self.io_timeout })
    }
}

#[async_trait]
impl Connector for TlsConnector {
    async fn connect(&self, host: &str) -> Result<Box<dyn Transport>, TransportError> {
        let transport = self.open(host).await?;
        Ok(Box::new(transport))
    }
}

/// An established TLS session over TCP.
pub struct TlsTransport {
    stream: TlsStream<TcpStream>,
    io_timeout: Option<Duration>,
}

impl fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (tcp, _) = self.stream.get_ref();
        f.debug_struct("TlsTransport").field("peer", &tcp.peer_addr().ok()).field("io_timeout", &self.io_timeout).finish()
    }
}

#[async_trait]
impl Transport for TlsTransport {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), TransportError> {
        let stream = &mut self.stream;
        bounded(self.io_timeout, async move {
            stream.write_all(chunk).await?;
            stream.flush().await
        })
        .await
        .map_err(TransportError::write)
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match bounded(self.io_timeout, self.stream.read(buf)).await {
            Ok(n) => Ok(n),
            // servers commonly close right after the response without a close_notify
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!("peer closed the connection without close_notify");
                Ok(0)
            }
            Err(e) => Err(TransportError::read(e)),
        }
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        match bounded(self.io_timeout, self.stream.shutdown()).await {
            Ok(()) => Ok(()),
            Err(e) if is_benign_shutdown(&e) => {
                debug!(cause = %e, "peer already gone while shutting down, ignore it");
                Ok(())
            }
            Err(e) => {
                error!(cause = %e, "failed to shutdown tls session");
                Err(TransportError::shutdown(e))
            }
        }
    }
}

/// Shutdown errors meaning the peer closed first, the session is over either way.
fn is_benign_shutdown(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof
    )
}

/// Checks the provider's random source once, a broken source is reported but not fatal.
fn probe_random(provider: &CryptoProvider) {
    let mut probe = [0u8; 16];
    if let Err(e) = provider.secure_random.fill(&mut probe) {
        warn!(cause = ?e, "secure random source is not ready, handshakes may fail");
    }
}

async fn bounded<T, F>(timeout: Option<Duration>, future: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout {
        Some(duration) => tokio::time::timeout(duration, future).await?,
        None => future.await,
    }
}

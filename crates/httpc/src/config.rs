//! Deployment time parameters of the client.

use std::time::Duration;

/// Bytes moved per send or receive step
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Capacity of the shared request/response buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 4 * 1024;

/// The `https` service port
pub const HTTPS_PORT: u16 = 443;

/// Parameters fixed for the lifetime of a context.
///
/// ```
/// use std::time::Duration;
/// use micro_httpc::DriverConfig;
///
/// let config = DriverConfig::default().with_chunk_size(512).with_io_timeout(Duration::from_secs(5));
/// assert_eq!(config.chunk_size(), 512);
/// assert_eq!(config.port(), 443);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    chunk_size: usize,
    buffer_capacity: usize,
    port: u16,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            port: HTTPS_PORT,
            connect_timeout: None,
            io_timeout: None,
        }
    }
}

impl DriverConfig {
    /// Sets the chunk size, a size of zero is raised to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Bounds name resolution, TCP connect and TLS handshake, each on its own.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Bounds every single read, write and shutdown.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    #[inline]
    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_chunk_size_is_raised() {
        assert_eq!(DriverConfig::default().with_chunk_size(0).chunk_size(), 1);
    }

    #[test]
    fn defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.chunk_size(), 256);
        assert_eq!(config.buffer_capacity(), 4096);
        assert_eq!(config.port(), 443);
        assert_eq!(config.connect_timeout(), None);
        assert_eq!(config.io_timeout(), None);
    }
}

//! Scripted transports replaying a canned response.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::protocol::TransportError;
use crate::transport::{Connector, Transport};

/// What happened on a scripted transport, shared with the test after the transport is boxed.
#[derive(Debug, Default)]
pub(crate) struct TransportLog {
    pub(crate) hosts: Vec<String>,
    pub(crate) writes: Vec<Vec<u8>>,
    pub(crate) reads: Vec<usize>,
    pub(crate) shutdowns: usize,
    pub(crate) dropped: usize,
}

impl TransportLog {
    pub(crate) fn written(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

pub(crate) type SharedLog = Arc<Mutex<TransportLog>>;

/// Replays `response` like a socket with all of it already available.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    response: Vec<u8>,
    pos: usize,
    boundaries: Vec<usize>,
    fail_write_at: Option<usize>,
    fail_read_at: Option<usize>,
    shutdown_error: Option<io::ErrorKind>,
    log: SharedLog,
}

impl ScriptedTransport {
    pub(crate) fn new(response: &[u8], log: &SharedLog) -> Self {
        Self { response: response.to_vec(), pos: 0, boundaries: Vec::new(), fail_write_at: None, fail_read_at: None, shutdown_error: None, log: Arc::clone(log) }
    }

    /// No read crosses `offset`, like a record boundary of a TLS stream.
    pub(crate) fn split_at(mut self, offset: usize) -> Self {
        self.boundaries.push(offset);
        self
    }

    /// The `nth` write, counted from zero, fails.
    pub(crate) fn fail_write_at(mut self, nth: usize) -> Self {
        self.fail_write_at = Some(nth);
        self
    }

    /// The `nth` read, counted from zero, fails.
    pub(crate) fn fail_read_at(mut self, nth: usize) -> Self {
        self.fail_read_at = Some(nth);
        self
    }

    pub(crate) fn fail_shutdown(mut self, kind: io::ErrorKind) -> Self {
        self.shutdown_error = Some(kind);
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), TransportError> {
        let mut log = self.log.lock().unwrap();
        if self.fail_write_at == Some(log.writes.len()) {
            return Err(TransportError::write(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        log.writes.push(chunk.to_vec());
        Ok(())
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut log = self.log.lock().unwrap();
        if self.fail_read_at == Some(log.reads.len()) {
            return Err(TransportError::read(io::Error::from(io::ErrorKind::ConnectionReset)));
        }
        let end = self.boundaries.iter().copied().filter(|&b| b > self.pos).min().unwrap_or(self.response.len());
        let n = buf.len().min(end.min(self.response.len()) - self.pos);
        buf[..n].copy_from_slice(&self.response[self.pos..self.pos + n]);
        self.pos += n;
        log.reads.push(n);
        Ok(n)
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.log.lock().unwrap().shutdowns += 1;
        match self.shutdown_error {
            Some(kind) => Err(TransportError::shutdown(io::Error::from(kind))),
            None => Ok(()),
        }
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.dropped += 1;
        }
    }
}

/// Hands out prepared transports, one per connect.
#[derive(Debug, Default)]
pub(crate) struct ScriptedConnector {
    transports: Mutex<VecDeque<ScriptedTransport>>,
    log: SharedLog,
}

impl ScriptedConnector {
    pub(crate) fn new(log: &SharedLog) -> Self {
        Self { transports: Mutex::default(), log: Arc::clone(log) }
    }

    pub(crate) fn push(self, transport: ScriptedTransport) -> Self {
        self.transports.lock().unwrap().push_back(transport);
        self
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, host: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.log.lock().unwrap().hosts.push(host.to_owned());
        match self.transports.lock().unwrap().pop_front() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(TransportError::connect(host, io::Error::from(io::ErrorKind::ConnectionRefused))),
        }
    }
}

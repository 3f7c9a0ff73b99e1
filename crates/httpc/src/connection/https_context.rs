use std::fmt;
use std::io;

use http::Method;
use tracing::{debug, error, trace, warn};

use crate::codec::{RequestEncoder, parse_response};
use crate::config::DriverConfig;
use crate::connection::State;
use crate::ensure;
use crate::io::{RecvProgress, SendProgress, recv_chunk, send_chunk};
use crate::protocol::{BuildError, HttpcError, Progress, Response, ResponseHead, SharedBuffer, TransportError};
use crate::transport::{Connector, TlsConnector, Transport};

/// The reusable container of one in-flight request cycle.
///
/// A context owns the shared buffer the request is built into and the response is
/// received into, the connector used to open a transport per cycle, and the progress
/// of the current cycle. A caller builds a request, then drives it with
/// [`step`](Self::step) (or [`execute`](Self::execute)) until it is done:
///
/// ```no_run
/// use http::Method;
/// use micro_httpc::connection::HttpsContext;
/// use micro_httpc::protocol::Progress;
/// use micro_httpc::DriverConfig;
///
/// # async fn run() -> Result<(), micro_httpc::protocol::HttpcError> {
/// let mut context = HttpsContext::tls(&DriverConfig::default())?;
///
/// context.build_request_line(Method::GET, "example.com", "v1/item")?;
/// context.add_header("Host", "example.com")?;
/// context.add_header("Connection", "close")?;
/// context.set_body(None)?;
///
/// let head = loop {
///     if let Progress::Done(head) = context.step().await? {
///         break head;
///     }
/// };
/// println!("status: {:?}", head.status());
/// # Ok(())
/// # }
/// ```
///
/// Every mutating operation takes `&mut self`, so a context can only ever be driven
/// by one caller at a time.
pub struct HttpsContext<C> {
    connector: C,
    encoder: RequestEncoder,
    buffer: SharedBuffer,
    chunk_size: usize,
    host: Option<String>,
    method: Method,
    headers_done: bool,
    state: State,
    transport: Option<Box<dyn Transport>>,
    send: SendProgress,
    recv: RecvProgress,
    response: Option<ResponseHead>,
}

impl<C> fmt::Debug for HttpsContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpsContext")
            .field("state", &self.state)
            .field("host", &self.host)
            .field("method", &self.method)
            .field("buffer", &self.buffer)
            .field("chunk_size", &self.chunk_size)
            .field("connected", &self.transport.is_some())
            .field("send", &self.send)
            .field("recv", &self.recv)
            .finish_non_exhaustive()
    }
}

impl HttpsContext<TlsConnector> {
    /// Creates a context opening real TLS sessions, with a buffer of the configured capacity.
    pub fn tls(config: &DriverConfig) -> Result<Self, HttpcError> {
        Ok(Self::new(TlsConnector::new(config)?, config))
    }
}

impl<C: Connector> HttpsContext<C> {
    pub fn new(connector: C, config: &DriverConfig) -> Self {
        Self::with_buffer(connector, SharedBuffer::with_capacity(config.buffer_capacity()), config)
    }

    /// Creates a context working in a buffer supplied by the caller.
    pub fn with_buffer(connector: C, buffer: SharedBuffer, config: &DriverConfig) -> Self {
        Self {
            connector,
            encoder: RequestEncoder::new(),
            buffer,
            chunk_size: config.chunk_size(),
            host: None,
            method: Method::GET,
            headers_done: false,
            state: State::Idle,
            transport: None,
            send: SendProgress::default(),
            recv: RecvProgress::default(),
            response: None,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// The host of the request built last, used to connect.
    #[inline]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[inline]
    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    #[inline]
    pub fn send_progress(&self) -> &SendProgress {
        &self.send
    }

    #[inline]
    pub fn recv_progress(&self) -> &RecvProgress {
        &self.recv
    }

    /// Starts a new request with its request line, dropping whatever the buffer held.
    pub fn build_request_line(&mut self, method: Method, host: &str, path: &str) -> Result<(), HttpcError> {
        self.ensure_idle()?;
        self.response = None;
        self.host = None;
        self.headers_done = false;

        self.encoder.write_request_line(&mut self.buffer, &method, host, path)?;

        self.host = Some(host.to_owned());
        self.method = method;
        Ok(())
    }

    pub fn add_header(&mut self, key: &str, value: &str) -> Result<(), HttpcError> {
        self.ensure_building()?;
        self.encoder.append_header(&mut self.buffer, key, value)?;
        Ok(())
    }

    /// Ends the header section and appends `body`, the request is complete afterwards.
    pub fn set_body(&mut self, body: Option<&[u8]>) -> Result<(), HttpcError> {
        self.ensure_building()?;
        self.encoder.append_body(&mut self.buffer, body)?;
        self.headers_done = true;
        Ok(())
    }

    /// Performs one bounded unit of work of the current cycle.
    ///
    /// # Returns
    ///
    /// - `Ok(Progress::Again)` when the caller has to step again
    /// - `Ok(Progress::Done(head))` when the response has been received and parsed,
    ///   the context is idle again
    ///
    /// # Errors
    ///
    /// Fails with [`HttpcError::NoRequest`] when stepped idle without a complete request.
    /// Any other failure ends the cycle: the transport is released, the progress counters
    /// are cleared and the context is idle again. A request that was not yet
    /// overwritten by response bytes stays in the buffer and can be stepped again.
    pub async fn step(&mut self) -> Result<Progress, HttpcError> {
        trace!(state = ?self.state, "client step");
        match self.do_step().await {
            Ok(progress) => Ok(progress),
            // nothing in flight, keep the last response
            Err(e) if self.state.is_idle() => Err(e),
            Err(e) => {
                error!(state = ?self.state, cause = %e, "request cycle failed");
                self.reset();
                Err(e)
            }
        }
    }

    /// Steps until the cycle is done or has failed.
    pub async fn execute(&mut self) -> Result<ResponseHead, HttpcError> {
        loop {
            if let Progress::Done(head) = self.step().await? {
                return Ok(head);
            }
        }
    }

    /// The response of the last completed cycle, borrowing its body from the buffer.
    pub fn response(&self) -> Option<Response<'_>> {
        self.response.as_ref().map(|head| Response::new(head, self.buffer.filled()))
    }

    /// Abandons an in-flight cycle without shutting the transport down.
    pub fn abort(&mut self) {
        if !self.state.is_idle() {
            warn!(state = ?self.state, "abort request cycle");
            self.reset();
        }
    }

    async fn do_step(&mut self) -> Result<Progress, HttpcError> {
        match self.state {
            State::Idle => {
                ensure!(self.host.is_some() && self.headers_done, HttpcError::NoRequest);
                self.send.reset();
                self.recv = RecvProgress::new(&self.method);
                self.response = None;
                self.transition(State::Connecting);
            }

            State::Connecting => {
                let host = self.host.as_deref().ok_or(HttpcError::NoRequest)?;
                debug!(host = %host, "connecting");
                self.transport = Some(self.connector.connect(host).await?);
                self.buffer.begin_send();
                self.transition(State::Sending);
            }

            State::Sending => {
                let transport = self.transport.as_deref_mut().ok_or_else(|| TransportError::write(not_connected()))?;
                if send_chunk(transport, self.buffer.filled(), &mut self.send, self.chunk_size).await? {
                    self.transition(State::Receiving);
                }
            }

            State::Receiving => {
                let transport = self.transport.as_deref_mut().ok_or_else(|| TransportError::read(not_connected()))?;
                if recv_chunk(transport, &mut self.buffer, &mut self.recv, self.chunk_size).await? {
                    self.transition(State::Closing);
                }
            }

            State::Closing => {
                let shutdown = match self.transport.take() {
                    // the transport is dropped at the end of this arm, whatever shutdown returned
                    Some(mut transport) => transport.shutdown().await,
                    None => Ok(()),
                };
                shutdown?;

                let head = parse_response(self.buffer.filled())?;
                debug!(status = ?head.status(), received = self.recv.received(), "response received");
                self.finish(head.clone());
                return Ok(Progress::Done(head));
            }
        }

        Ok(Progress::Again)
    }

    fn transition(&mut self, next: State) {
        trace!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    fn finish(&mut self, head: ResponseHead) {
        self.transition(State::Idle);
        self.send.reset();
        self.host = None;
        self.headers_done = false;
        self.response = Some(head);
    }

    fn reset(&mut self) {
        self.transport = None;
        self.send.reset();
        self.recv = RecvProgress::new(&self.method);
        self.response = None;
        self.buffer.recover();
        if self.buffer.is_empty() {
            self.host = None;
            self.headers_done = false;
        }
        self.transition(State::Idle);
    }

    fn ensure_idle(&self) -> Result<(), HttpcError> {
        ensure!(self.state.is_idle(), HttpcError::busy(self.state));
        Ok(())
    }

    fn ensure_building(&self) -> Result<(), HttpcError> {
        self.ensure_idle()?;
        ensure!(self.host.is_some(), HttpcError::NoRequest);
        ensure!(!self.headers_done, BuildError::invalid_header("header section already terminated").into());
        Ok(())
    }
}

fn not_connected() -> io::Error {
    io::Error::from(io::ErrorKind::NotConnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{BufferMode, ErrorKind, ParseError};
    use crate::transport::testing::{ScriptedConnector, ScriptedTransport, SharedLog};
    use crate::transport::{MockConnector, MockTransport};
    use http::StatusCode;
    use mockall::Sequence;

    const REQUEST: &[u8] = b"GET https://example.com/v1/item HTTP/1.1\r\n\r\n";
    const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\n\r\n{\"id\":\"42\"}";

    fn build_get<C: Connector>(context: &mut HttpsContext<C>) {
        context.build_request_line(Method::GET, "example.com", "v1/item").unwrap();
        context.set_body(None).unwrap();
    }

    fn scripted(log: &SharedLog, transports: Vec<ScriptedTransport>, config: &DriverConfig) -> HttpsContext<ScriptedConnector> {
        let connector = transports.into_iter().fold(ScriptedConnector::new(log), ScriptedConnector::push);
        HttpsContext::new(connector, config)
    }

    #[tokio::test]
    async fn end_to_end_cycle() {
        let log = SharedLog::default();
        let mut context = scripted(&log, vec![ScriptedTransport::new(RESPONSE, &log)], &DriverConfig::default());

        build_get(&mut context);
        assert_eq!(context.buffer().filled(), REQUEST);

        assert_eq!(context.step().await.unwrap(), Progress::Again);
        assert_eq!(context.state(), State::Connecting);

        assert_eq!(context.step().await.unwrap(), Progress::Again);
        assert_eq!(context.state(), State::Sending);

        assert_eq!(context.step().await.unwrap(), Progress::Again);
        assert_eq!(context.state(), State::Receiving);

        assert_eq!(context.step().await.unwrap(), Progress::Again);
        assert_eq!(context.state(), State::Closing);

        let head = match context.step().await.unwrap() {
            Progress::Done(head) => head,
            Progress::Again => panic!("cycle should be done"),
        };
        assert_eq!(context.state(), State::Idle);
        assert_eq!(head.status(), Some(StatusCode::OK));

        let response = context.response().unwrap();
        assert_eq!(response.status(), Some(StatusCode::OK));
        assert_eq!(response.body(), Some(&b"{\"id\":\"42\"}"[..]));
        assert_eq!(response.raw(), RESPONSE);

        let log = log.lock().unwrap();
        assert_eq!(log.hosts, vec!["example.com".to_owned()]);
        assert_eq!(log.written(), REQUEST);
        assert_eq!(log.shutdowns, 1);
        assert_eq!(log.dropped, 1);
    }

    #[tokio::test]
    async fn sends_in_chunks() {
        let log = SharedLog::default();
        let config = DriverConfig::default().with_chunk_size(8);
        let mut context = scripted(&log, vec![ScriptedTransport::new(RESPONSE, &log)], &config);
        build_get(&mut context);

        context.step().await.unwrap();
        context.step().await.unwrap();

        let mut send_steps = 0;
        while context.state() == State::Sending {
            context.step().await.unwrap();
            send_steps += 1;
        }
        assert_eq!(send_steps, REQUEST.len().div_ceil(8));
        assert_eq!(context.send_progress().sent(), REQUEST.len());
        assert!(context.send_progress().is_last_chunk_sent());

        let head = context.execute().await.unwrap();
        assert_eq!(head.status(), Some(StatusCode::OK));

        let log = log.lock().unwrap();
        assert_eq!(log.writes.len(), send_steps);
        assert_eq!(log.written(), REQUEST);
    }

    #[tokio::test]
    async fn connect_failure_resets_and_next_cycle_runs() {
        let log = SharedLog::default();
        let mut sequence = Sequence::new();
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|host| Err(TransportError::resolve(host, io::Error::from(io::ErrorKind::NotFound))));
        let transport = ScriptedTransport::new(RESPONSE, &log);
        connector.expect_connect().times(1).in_sequence(&mut sequence).return_once(move |_| Ok(Box::new(transport) as Box<dyn Transport>));

        let mut context = HttpsContext::new(connector, &DriverConfig::default());
        build_get(&mut context);

        assert_eq!(context.step().await.unwrap(), Progress::Again);
        let err = context.step().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionFailure);
        assert_eq!(context.state(), State::Idle);
        assert_eq!(context.buffer().filled(), REQUEST);

        // the request survived, the same cycle can run again
        let head = context.execute().await.unwrap();
        assert_eq!(head.status(), Some(StatusCode::OK));
        assert_eq!(log.lock().unwrap().written(), REQUEST);
    }

    #[tokio::test]
    async fn write_failure_resets_state() {
        let mut transport = MockTransport::new();
        transport.expect_write_chunk().times(1).returning(|_| Err(TransportError::write(io::Error::from(io::ErrorKind::BrokenPipe))));
        transport.expect_shutdown().never();

        let mut connector = MockConnector::new();
        connector.expect_connect().times(1).return_once(move |_| Ok(Box::new(transport) as Box<dyn Transport>));

        let mut context = HttpsContext::new(connector, &DriverConfig::default().with_chunk_size(16));
        build_get(&mut context);

        let err = context.execute().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteFailure);
        assert!(!err.is_retryable());
        assert_eq!(context.state(), State::Idle);
        assert_eq!(context.send_progress(), &SendProgress::default());
        assert_eq!(context.buffer().mode(), BufferMode::Building);
    }

    #[tokio::test]
    async fn read_failure_drops_overwritten_request() {
        let log = SharedLog::default();
        let transport = ScriptedTransport::new(&[b'x'; 100], &log).fail_read_at(1);
        let mut context = scripted(&log, vec![transport], &DriverConfig::default().with_chunk_size(16));
        build_get(&mut context);

        let err = context.execute().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadFailure);
        assert_eq!(context.state(), State::Idle);
        assert_eq!(context.recv_progress().received(), 0);
        assert!(context.buffer().is_empty());
        assert_eq!(log.lock().unwrap().dropped, 1);

        assert!(matches!(context.step().await, Err(HttpcError::NoRequest)));
    }

    #[tokio::test]
    async fn shutdown_failure_still_releases_transport() {
        let log = SharedLog::default();
        let transport = ScriptedTransport::new(RESPONSE, &log).fail_shutdown(io::ErrorKind::InvalidData);
        let mut context = scripted(&log, vec![transport], &DriverConfig::default());
        build_get(&mut context);

        let err = context.execute().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShutdownFailure);
        assert_eq!(context.state(), State::Idle);
        assert!(context.response().is_none());

        let log = log.lock().unwrap();
        assert_eq!(log.shutdowns, 1);
        assert_eq!(log.dropped, 1);
    }

    #[tokio::test]
    async fn malformed_status_fails_cycle() {
        let log = SharedLog::default();
        let transport = ScriptedTransport::new(b"HTTP/1.1 OK!\r\n\r\n", &log);
        let mut context = scripted(&log, vec![transport], &DriverConfig::default());
        build_get(&mut context);

        let err = context.execute().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(matches!(err, HttpcError::Parse { source: ParseError::InvalidStatusCode { .. } }));
    }

    #[tokio::test]
    async fn missing_markers_are_tolerated() {
        let log = SharedLog::default();
        let transport = ScriptedTransport::new(b"garbage without any marker", &log);
        let mut context = scripted(&log, vec![transport], &DriverConfig::default());
        build_get(&mut context);

        let head = context.execute().await.unwrap();
        assert_eq!(head.status(), None);
        assert_eq!(head.body_range(), None);
        assert_eq!(context.response().unwrap().body(), None);
    }

    #[tokio::test]
    async fn response_larger_than_buffer_overflows() {
        let log = SharedLog::default();
        let transport = ScriptedTransport::new(&[b'x'; 200], &log);
        let config = DriverConfig::default().with_buffer_capacity(64).with_chunk_size(32);
        let mut context = scripted(&log, vec![transport], &config);
        build_get(&mut context);

        let err = context.execute().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BufferOverflow);
        assert_eq!(context.state(), State::Idle);
    }

    #[tokio::test]
    async fn response_filling_buffer_exactly_completes() {
        let log = SharedLog::default();
        let mut response = b"HTTP/1.1 200 OK\r\n\r\n".to_vec();
        response.resize(64, b'b');
        let config = DriverConfig::default().with_buffer_capacity(64).with_chunk_size(32);
        let mut context = scripted(&log, vec![ScriptedTransport::new(&response, &log)], &config);
        build_get(&mut context);

        let head = context.execute().await.unwrap();
        assert_eq!(head.status(), Some(StatusCode::OK));
        assert_eq!(context.response().unwrap().body(), Some(&response[19..]));
        assert_eq!(context.state(), State::Idle);
        assert_eq!(log.lock().unwrap().reads, vec![32, 32, 0]);
    }

    #[tokio::test]
    async fn body_split_across_reads_is_received_whole() {
        let log = SharedLog::default();
        let head_len = RESPONSE.len() - 11;
        let transport = ScriptedTransport::new(RESPONSE, &log).split_at(head_len).split_at(head_len + 4);
        let mut context = scripted(&log, vec![transport], &DriverConfig::default());
        build_get(&mut context);

        context.execute().await.unwrap();
        assert_eq!(context.response().unwrap().body(), Some(&b"{\"id\":\"42\"}"[..]));
        assert_eq!(log.lock().unwrap().reads, vec![head_len, 4, 7]);
    }

    #[tokio::test]
    async fn request_larger_than_buffer_is_rejected() {
        let log = SharedLog::default();
        let mut context = scripted(&log, vec![], &DriverConfig::default().with_buffer_capacity(64));
        context.build_request_line(Method::POST, "example.com", "v1/item").unwrap();

        let err = context.set_body(Some(&[b'b'; 64])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BufferOverflow);
        assert!(matches!(context.step().await, Err(HttpcError::NoRequest)));
    }

    #[tokio::test]
    async fn builder_is_rejected_while_in_flight() {
        let log = SharedLog::default();
        let mut context = scripted(&log, vec![ScriptedTransport::new(RESPONSE, &log)], &DriverConfig::default());
        build_get(&mut context);
        context.step().await.unwrap();
        context.step().await.unwrap();
        assert_eq!(context.state(), State::Sending);

        assert!(matches!(context.add_header("X", "y"), Err(HttpcError::Busy { state: State::Sending })));
        assert!(matches!(context.build_request_line(Method::GET, "a.com", ""), Err(HttpcError::Busy { .. })));

        context.abort();
        assert_eq!(context.state(), State::Idle);
        assert_eq!(log.lock().unwrap().dropped, 1);
        assert_eq!(context.buffer().filled(), REQUEST);
    }

    #[tokio::test]
    async fn incomplete_request_is_not_executed() {
        let log = SharedLog::default();
        let mut context = scripted(&log, vec![], &DriverConfig::default());

        assert!(matches!(context.step().await, Err(HttpcError::NoRequest)));
        assert!(matches!(context.add_header("Host", "example.com"), Err(HttpcError::NoRequest)));

        context.build_request_line(Method::GET, "example.com", "").unwrap();
        assert!(matches!(context.step().await, Err(HttpcError::NoRequest)));

        context.set_body(None).unwrap();
        assert!(matches!(context.add_header("Late", "header"), Err(HttpcError::Build { .. })));
    }

    #[tokio::test]
    async fn context_is_reused_across_cycles() {
        let log = SharedLog::default();
        let second = b"HTTP/1.1 201 Created\r\nX:Y\r\n\r\n{\"a\":1}";
        let transports = vec![ScriptedTransport::new(RESPONSE, &log), ScriptedTransport::new(second, &log)];
        let mut context = scripted(&log, transports, &DriverConfig::default());

        build_get(&mut context);
        assert_eq!(context.execute().await.unwrap().status(), Some(StatusCode::OK));

        // a finished cycle can't be replayed without building a new request
        assert!(matches!(context.step().await, Err(HttpcError::NoRequest)));
        assert_eq!(context.response().unwrap().status(), Some(StatusCode::OK));

        context.build_request_line(Method::POST, "example.org", "v1/items").unwrap();
        assert!(context.response().is_none());
        context.add_header("Content-Type", "application/json").unwrap();
        context.set_body(Some(b"{}")).unwrap();

        let head = context.execute().await.unwrap();
        assert_eq!(head.status(), Some(StatusCode::CREATED));
        assert_eq!(context.response().unwrap().body(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(context.send_progress().sent(), 0);

        let log = log.lock().unwrap();
        assert_eq!(log.hosts, vec!["example.com".to_owned(), "example.org".to_owned()]);
        assert_eq!(log.dropped, 2);
    }
}

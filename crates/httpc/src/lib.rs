//! A resumable, step driven HTTPS client working in a fixed capacity buffer
//!
//! This crate performs one HTTPS request at a time on behalf of a constrained caller.
//! The request is built in place into a single shared buffer, then the exchange is
//! driven one bounded step at a time: connect, send a chunk, receive a chunk, close.
//! The response lands in the same buffer the request was built in, and its status
//! code and body are extracted without copying.
//!
//! # Example
//!
//! ```no_run
//! use http::Method;
//! use micro_httpc::{DriverConfig, HttpsContext};
//! use tracing::{error, info, Level};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     let mut context = match HttpsContext::tls(&DriverConfig::default()) {
//!         Ok(context) => context,
//!         Err(e) => {
//!             error!(cause = %e, "tls setup failed");
//!             return;
//!         }
//!     };
//!
//!     let built = context
//!         .build_request_line(Method::GET, "example.com", "")
//!         .and_then(|_| context.add_header("Host", "example.com"))
//!         .and_then(|_| context.add_header("Connection", "close"))
//!         .and_then(|_| context.set_body(None));
//!     if let Err(e) = built {
//!         error!(cause = %e, "invalid request");
//!         return;
//!     }
//!
//!     match context.execute().await {
//!         Ok(head) => info!(status = ?head.status(), "request done"),
//!         Err(e) => error!(kind = ?e.kind(), cause = %e, "request failed"),
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: the request cycle state machine, [`HttpsContext`]
//! - [`protocol`]: the shared buffer, response types and errors
//! - [`codec`]: request line/header/body encoding and response parsing
//! - [`io`]: the chunked send and receive primitives a step is made of
//! - [`transport`]: the secure byte stream seam and its TLS implementation
//!
//! # Request cycle
//!
//! ```text
//! Idle -> Connecting -> Sending -> Receiving -> Closing -> Idle
//! ```
//!
//! Each call to [`HttpsContext::step`] moves the cycle at most one stage forward, or
//! one chunk further within the sending and receiving stages. Any failure releases
//! the transport and returns the context to `Idle` without retrying. A request that
//! was only partially sent stays in the buffer, a request overwritten by response
//! bytes is gone.
//!
//! # Limitations
//!
//! - HTTP/1.1 only, one request per connection
//! - the response must fit into the buffer, no streaming of large bodies
//! - chunked transfer encoding is not decoded, the body is returned as received

pub mod codec;
pub mod connection;
pub mod io;
pub mod protocol;
pub mod transport;

mod config;
pub use config::DEFAULT_BUFFER_CAPACITY;
pub use config::DEFAULT_CHUNK_SIZE;
pub use config::DriverConfig;
pub use config::HTTPS_PORT;

pub use connection::HttpsContext;
pub use connection::State;
pub use protocol::ErrorKind;
pub use protocol::HttpcError;
pub use protocol::Progress;
pub use protocol::Response;
pub use protocol::ResponseHead;
pub use transport::TlsConnector;

mod utils;
pub(crate) use utils::ensure;

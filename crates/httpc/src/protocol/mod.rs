//! Core protocol types of the client.
//!
//! - **Buffer** ([`SharedBuffer`]): the fixed capacity region shared by the request
//!   and the response of a cycle, tagged with its current [`BufferMode`]
//! - **Response** ([`ResponseHead`], [`Response`]): status and body position
//!   extracted from a received response
//! - **Progress** ([`Progress`]): the non-failing outcomes of a state machine step
//! - **Errors** ([`HttpcError`] and the specific errors it wraps)

mod buffer;
pub use buffer::BufferMode;
pub use buffer::SharedBuffer;

mod response;
pub use response::Progress;
pub use response::Response;
pub use response::ResponseHead;

mod error;
pub use error::BufferOverflow;
pub use error::BuildError;
pub use error::ErrorKind;
pub use error::HttpcError;
pub use error::ParseError;
pub use error::TransportError;

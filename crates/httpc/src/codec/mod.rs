//! Wire format handling for the client
//!
//! This module turns request parts into bytes and response bytes back into
//! a status code and a body position, always working in place on the
//! [`SharedBuffer`](crate::protocol::SharedBuffer).
//!
//! - Request side:
//!   - [`RequestEncoder`]: writes the request line, headers and body
//! - Response side:
//!   - [`parse_response`]: extracts status code and body from a complete response
//!   - [`ResponseDecoder`]: follows a response across receive chunks

mod request_encoder;
mod response_decoder;

pub use request_encoder::MAX_HOST_LEN;
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
pub use response_decoder::parse_response;

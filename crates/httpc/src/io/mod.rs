//! Bounded transfers between the shared buffer and the transport.
//!
//! Each call of [`send_chunk`] or [`recv_chunk`] moves at most one chunk and
//! returns, which bounds the work done by a single state machine step.

mod chunked;

pub use chunked::RecvProgress;
pub use chunked::SendProgress;
pub use chunked::recv_chunk;
pub use chunked::send_chunk;

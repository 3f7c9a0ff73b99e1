//! Serializes an HTTP/1.1 request into the shared buffer.
//!
//! The request is produced by three calls made in order:
//!
//! 1. [`RequestEncoder::write_request_line`] starts over with
//!    `<method> https://<host>/<path> HTTP/1.1\r\n`
//! 2. [`RequestEncoder::append_header`] adds `<key>:<value>\r\n`, any number of times
//! 3. [`RequestEncoder::append_body`] terminates the header section and adds the payload
//!
//! No `Host` header is added implicitly, the caller supplies every header the
//! server requires. Each fragment is checked against the remaining capacity
//! before anything is written, so a failed call leaves the request as it was.

use http::Method;

use crate::ensure;
use crate::protocol::{BuildError, SharedBuffer};

/// Longest host name accepted in a request line
pub const MAX_HOST_LEN: usize = 255;

/// Encoder writing request fragments into a [`SharedBuffer`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestEncoder;

impl RequestEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Resets the buffer and writes the request line in absolute-URI form.
    ///
    /// `path` is appended after `https://<host>/` as is, so it should not start with a slash.
    pub fn write_request_line(&self, dst: &mut SharedBuffer, method: &Method, host: &str, path: &str) -> Result<(), BuildError> {
        validate_host(host)?;
        ensure!(!path.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()), BuildError::invalid_path(format!("{path:?} contains whitespace")));

        dst.reset();
        dst.append_all(&[method.as_str().as_bytes(), b" https://", host.as_bytes(), b"/", path.as_bytes(), b" HTTP/1.1\r\n"])?;
        Ok(())
    }

    /// Appends one `key:value` header line.
    pub fn append_header(&self, dst: &mut SharedBuffer, key: &str, value: &str) -> Result<(), BuildError> {
        ensure!(!key.is_empty(), BuildError::invalid_header("empty header name"));
        ensure!(
            !key.bytes().any(|b| b == b':' || b.is_ascii_whitespace() || b.is_ascii_control()),
            BuildError::invalid_header(format!("header name {key:?} contains separator"))
        );
        ensure!(!value.bytes().any(|b| b == b'\r' || b == b'\n'), BuildError::invalid_header(format!("value of {key} contains line break")));

        dst.append_all(&[key.as_bytes(), b":", value.as_bytes(), b"\r\n"])?;
        Ok(())
    }

    /// Appends the blank line ending the headers, followed by `body` if there is one.
    pub fn append_body(&self, dst: &mut SharedBuffer, body: Option<&[u8]>) -> Result<(), BuildError> {
        dst.append_all(&[b"\r\n", body.unwrap_or_default()])?;
        Ok(())
    }
}

fn validate_host(host: &str) -> Result<(), BuildError> {
    ensure!(!host.is_empty(), BuildError::invalid_host("empty host"));
    ensure!(host.len() <= MAX_HOST_LEN, BuildError::invalid_host(format!("length {} exceed the limit {MAX_HOST_LEN}", host.len())));
    ensure!(
        !host.bytes().any(|b| b == b'/' || b.is_ascii_whitespace() || b.is_ascii_control()),
        BuildError::invalid_host(format!("{host:?} is not a host name"))
    );
    Ok(())
}

//! Extracts the status code and the body from the raw response bytes.
//!
//! Two pieces work together here:
//!
//! - [`parse_response`] runs once the whole response has been received. It looks
//!   for the `HTTP/1.1 ` marker and reads the three characters after it as the
//!   status code, then takes everything after the first blank line as the body.
//!   Nothing is copied, the result only records positions.
//! - [`ResponseDecoder`] follows the response while it arrives chunk by chunk. It
//!   resumes the blank line search where the previous chunk ended and, once the
//!   head is complete, uses `httparse` to learn how long the body is. This lets
//!   the receive phase stop as soon as a `Content-Length` delimited response is
//!   complete instead of waiting for a short read.

use http::{Method, StatusCode};
use httparse::Status;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, ResponseHead};

/// Marker preceding the status code
const STATUS_MARKER: &[u8] = b"HTTP/1.1 ";

/// Marker ending the header section
const HEAD_END: &[u8] = b"\r\n\r\n";

/// Maximum number of headers inspected by the incremental decoder
const MAX_HEADER_NUM: usize = 64;

/// Parses a completely received response.
///
/// # Returns
///
/// - the status code, or `None` if the bytes contain no `HTTP/1.1 ` marker
/// - the body range, or `None` if the bytes contain no blank line
///
/// # Errors
///
/// Returns [`ParseError::InvalidStatusCode`] when the three characters after the
/// marker are not a valid status code.
pub fn parse_response(src: &[u8]) -> Result<ResponseHead, ParseError> {
    let status = match find(src, STATUS_MARKER, 0) {
        Some(pos) => {
            let start = pos + STATUS_MARKER.len();
            let end = (start + 3).min(src.len());
            Some(parse_status(&src[start..end])?)
        }
        None => None,
    };

    let body = find(src, HEAD_END, 0).map(|pos| pos + HEAD_END.len()..src.len());

    Ok(ResponseHead::new(status, body))
}

fn parse_status(digits: &[u8]) -> Result<StatusCode, ParseError> {
    ensure!(digits.len() == 3 && digits.iter().all(u8::is_ascii_digit), ParseError::invalid_status_code(digits));
    StatusCode::from_bytes(digits).map_err(|_| ParseError::invalid_status_code(digits))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack.get(from..)?.windows(needle.len()).position(|window| window == needle).map(|pos| pos + from)
}

/// Tracks how far a response has been received.
///
/// Feed it the received prefix after every chunk, it reports when the response is
/// known to be complete. Responses whose length can't be told from the head, for
/// example chunked ones or ones without `Content-Length`, are never reported complete
/// and have to be ended by a short read.
#[derive(Debug, Clone)]
pub struct ResponseDecoder {
    expects_body: bool,
    scanned: usize,
    head_end: Option<usize>,
    body_len: Option<usize>,
}

impl ResponseDecoder {
    /// Creates a decoder for the response to a request with `method`.
    pub fn new(method: &Method) -> Self {
        Self { expects_body: method != Method::HEAD, scanned: 0, head_end: None, body_len: None }
    }

    /// Offset of the first body byte, once the head has been received.
    #[inline]
    pub fn head_end(&self) -> Option<usize> {
        self.head_end
    }

    /// The body length announced by the head, if it could be determined.
    #[inline]
    pub fn body_len(&self) -> Option<usize> {
        self.body_len
    }

    /// Inspects the bytes received so far, returns true if the response is complete.
    ///
    /// `received` must be the whole received prefix, each call extending the previous one.
    pub fn decode(&mut self, received: &[u8]) -> bool {
        let head_end = match self.head_end {
            Some(head_end) => head_end,
            None => {
                // the marker may straddle two chunks
                let from = self.scanned.saturating_sub(HEAD_END.len() - 1);
                match find(received, HEAD_END, from) {
                    Some(pos) => {
                        let head_end = pos + HEAD_END.len();
                        self.head_end = Some(head_end);
                        self.body_len = self.inspect_head(&received[..head_end]);
                        trace!(head_end, body_len = ?self.body_len, "response head received");
                        head_end
                    }
                    None => {
                        self.scanned = received.len();
                        return false;
                    }
                }
            }
        };

        match self.body_len {
            Some(body_len) => received.len() >= head_end + body_len,
            None => false,
        }
    }

    fn inspect_head(&self, head: &[u8]) -> Option<usize> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut response = httparse::Response::new(&mut headers);

        match response.parse(head) {
            Ok(Status::Complete(_)) => {}
            Ok(Status::Partial) => return None,
            Err(e) => {
                trace!(cause = %e, "can't parse response head, fall back to short read");
                return None;
            }
        }

        let code = response.code?;
        if !self.expects_body || code == 204 || code == 304 {
            return Some(0);
        }
        if (100..200).contains(&code) {
            // an interim response, the final one follows
            return None;
        }

        let mut content_length = None;
        for header in response.headers.iter() {
            if header.name.eq_ignore_ascii_case("transfer-encoding") {
                return None;
            }
            if header.name.eq_ignore_ascii_case("content-length") {
                content_length = std::str::from_utf8(header.value).ok().and_then(|value| value.trim().parse::<usize>().ok());
            }
        }
        content_length
    }
}

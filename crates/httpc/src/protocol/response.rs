//! Response types handed back to the caller once a cycle is done.

use std::ops::Range;

use http::StatusCode;

/// What was extracted from a completely received response.
///
/// The head does not own any response bytes, the body is recorded as a range into
/// the shared buffer the response was received into.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseHead {
    status: Option<StatusCode>,
    body: Option<Range<usize>>,
}

impl ResponseHead {
    pub fn new(status: Option<StatusCode>, body: Option<Range<usize>>) -> Self {
        Self { status, body }
    }

    /// The status code, absent when no `HTTP/1.1` status line was found.
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The position of the body in the response bytes, absent when no blank line was found.
    #[inline]
    pub fn body_range(&self) -> Option<Range<usize>> {
        self.body.clone()
    }

    /// Resolves the body against the bytes the head was parsed from.
    pub fn body<'a>(&self, response: &'a [u8]) -> Option<&'a [u8]> {
        self.body.as_ref().and_then(|range| response.get(range.clone()))
    }
}

/// A finished response borrowing its body from the shared buffer.
///
/// Only valid until the buffer is reused by the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    status: Option<StatusCode>,
    body: Option<&'a [u8]>,
    raw: &'a [u8],
}

impl<'a> Response<'a> {
    pub fn new(head: &ResponseHead, raw: &'a [u8]) -> Self {
        Self { status: head.status(), body: head.body(raw), raw }
    }

    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[inline]
    pub fn body(&self) -> Option<&'a [u8]> {
        self.body
    }

    /// The whole response as received, status line and headers included.
    #[inline]
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }
}

/// The outcome of one successful step of the execution state machine.
///
/// A failed step is reported as an `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The step did its unit of work, call it again.
    Again,
    /// The cycle is complete.
    Done(ResponseHead),
}

impl Progress {
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, Progress::Done(_))
    }
}

use std::cmp;

use http::Method;
use tracing::trace;

use crate::codec::ResponseDecoder;
use crate::ensure;
use crate::protocol::{BufferMode, BufferOverflow, HttpcError, SharedBuffer, TransportError};
use crate::transport::Transport;

/// How much of the request has been transmitted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SendProgress {
    sent: usize,
    last_chunk: bool,
}

impl SendProgress {
    #[inline]
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Returns true once the chunk carrying the final request byte went out.
    #[inline]
    pub fn is_last_chunk_sent(&self) -> bool {
        self.last_chunk
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Transmits the next chunk of `request`.
///
/// Sends `min(remaining, chunk_size)` bytes from the current offset and marks the
/// last chunk when that covered everything left. Returns whether the last chunk
/// has been sent.
pub async fn send_chunk<T>(transport: &mut T, request: &[u8], progress: &mut SendProgress, chunk_size: usize) -> Result<bool, TransportError>
where
    T: Transport + ?Sized,
{
    let remaining = request.len() - progress.sent;
    let size = cmp::min(remaining, chunk_size);

    transport.write_chunk(&request[progress.sent..progress.sent + size]).await?;

    progress.sent += size;
    if size == remaining {
        progress.last_chunk = true;
    }
    trace!(size, sent = progress.sent, total = request.len(), last_chunk = progress.last_chunk, "sent request chunk");
    Ok(progress.last_chunk)
}

/// How much of the response has been received.
#[derive(Debug, Clone)]
pub struct RecvProgress {
    received: usize,
    decoder: ResponseDecoder,
}

impl Default for RecvProgress {
    fn default() -> Self {
        Self::new(&Method::GET)
    }
}

impl RecvProgress {
    /// Starts tracking the response to a request with `method`.
    pub fn new(method: &Method) -> Self {
        Self { received: 0, decoder: ResponseDecoder::new(method) }
    }

    #[inline]
    pub fn received(&self) -> usize {
        self.received
    }

    #[inline]
    pub fn decoder(&self) -> &ResponseDecoder {
        &self.decoder
    }
}

/// Receives the next chunk into the buffer.
///
/// The first call of a cycle turns the buffer into zeroed response storage. Returns
/// true when the response is complete:
///
/// - the decoder saw the whole `Content-Length` delimited body
/// - the peer has nothing more to send, a zero length read
/// - the read came back shorter than requested and the head announced no body
///   length still waiting to arrive
///
/// A buffer filled to the last byte is only complete once the peer reports the end
/// of the stream, any further byte overflows it.
///
/// # Errors
///
/// Fails with [`HttpcError::Overflow`] when the response does not fit into the buffer,
/// and with [`HttpcError::Transport`] when the read fails.
pub async fn recv_chunk<T>(transport: &mut T, buffer: &mut SharedBuffer, progress: &mut RecvProgress, chunk_size: usize) -> Result<bool, HttpcError>
where
    T: Transport + ?Sized,
{
    if buffer.mode() != BufferMode::Receiving {
        buffer.begin_receive();
    }

    if buffer.remaining() == 0 {
        let mut scratch = [0u8; 1];
        let read = transport.read_chunk(&mut scratch).await?;
        trace!(read, received = progress.received, "checked end of response on a full buffer");
        ensure!(read == 0, BufferOverflow::new(buffer.capacity() + read, buffer.capacity()).into());
        return Ok(true);
    }

    let spare = buffer.spare(chunk_size);
    let requested = spare.len();
    let read = cmp::min(transport.read_chunk(spare).await?, requested);

    buffer.advance(read);
    progress.received += read;

    let decoded = progress.decoder.decode(buffer.filled());
    // a short read only ends the response when no announced body bytes are missing
    let complete = decoded || read == 0 || (read < requested && progress.decoder.body_len().is_none());
    trace!(read, requested, received = progress.received, complete, "received response chunk");
    Ok(complete)
}

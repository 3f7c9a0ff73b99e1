//! The single region of memory a request cycle works in.
//!
//! A [`SharedBuffer`] first collects the serialized request, is then read by the
//! send phase, and is finally overwritten by the response. The [`BufferMode`] tag
//! records which of those roles the bytes currently play, and every write is
//! checked against the capacity fixed at construction.

use bytes::{BufMut, BytesMut};
use std::cmp;

use crate::ensure;
use crate::protocol::BufferOverflow;

/// The role the buffer content currently plays.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferMode {
    /// Request bytes are being appended.
    Building,
    /// Request bytes are being transmitted, the content must not change.
    Sending,
    /// The region holds (part of) the response.
    Receiving,
}

/// A fixed capacity byte buffer shared by the request and the response of one cycle.
#[derive(Debug)]
pub struct SharedBuffer {
    bytes: BytesMut,
    capacity: usize,
    filled: usize,
    mode: BufferMode,
}

impl SharedBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { bytes: BytesMut::with_capacity(capacity), capacity, filled: 0, mode: BufferMode::Building }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    /// Number of valid bytes, request bytes while building or sending, response bytes while receiving.
    #[inline]
    pub fn len(&self) -> usize {
        self.filled
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.filled
    }

    /// The valid bytes of the buffer.
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.bytes[..self.filled]
    }

    /// Drops the content and starts a new request.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.filled = 0;
        self.mode = BufferMode::Building;
    }

    /// Appends `data` to the request under construction.
    ///
    /// Nothing is written when the data would not fit.
    pub fn append(&mut self, data: &[u8]) -> Result<(), BufferOverflow> {
        self.append_all(&[data])
    }

    /// Appends all `parts` or none of them.
    pub fn append_all(&mut self, parts: &[&[u8]]) -> Result<(), BufferOverflow> {
        if self.mode != BufferMode::Building {
            // stale response bytes of a finished cycle
            self.reset();
        }

        let required = self.filled + parts.iter().map(|part| part.len()).sum::<usize>();
        ensure!(required <= self.capacity, BufferOverflow::new(required, self.capacity));

        for part in parts {
            self.bytes.put_slice(part);
        }
        self.filled = required;
        Ok(())
    }

    /// Freezes the request content for transmission.
    pub fn begin_send(&mut self) {
        self.mode = BufferMode::Sending;
    }

    /// Zeroes the whole region and makes it response storage.
    pub fn begin_receive(&mut self) {
        self.bytes.clear();
        self.bytes.resize(self.capacity, 0);
        self.filled = 0;
        self.mode = BufferMode::Receiving;
    }

    /// The writable region after the received bytes, at most `max` bytes long.
    pub fn spare(&mut self, max: usize) -> &mut [u8] {
        debug_assert_eq!(self.mode, BufferMode::Receiving);
        let end = cmp::min(self.filled + max, self.capacity);
        &mut self.bytes[self.filled..end]
    }

    /// Marks `n` bytes of the spare region as received.
    pub fn advance(&mut self, n: usize) {
        self.filled = cmp::min(self.filled + n, self.capacity);
    }

    /// Restores a usable state after a failed cycle.
    ///
    /// A request that was only partially sent is still intact and can be sent again,
    /// a request that was overwritten by response bytes is gone.
    pub fn recover(&mut self) {
        match self.mode {
            BufferMode::Building => {}
            BufferMode::Sending => self.mode = BufferMode::Building,
            BufferMode::Receiving => self.reset(),
        }
    }
}

impl From<BytesMut> for SharedBuffer {
    fn from(mut bytes: BytesMut) -> Self {
        bytes.clear();
        let capacity = bytes.capacity();
        Self { bytes, capacity, filled: 0, mode: BufferMode::Building }
    }
}

/// The phase of the request cycle a context is in.
///
/// A cycle always runs `Idle → Connecting → Sending → Receiving → Closing → Idle`,
/// the only other transition is the reset to `Idle` after a failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum State {
    /// No cycle in flight, requests can be built.
    #[default]
    Idle,
    /// The next step opens the transport.
    Connecting,
    /// Request chunks are being sent.
    Sending,
    /// Response chunks are being received.
    Receiving,
    /// The next step closes the transport and parses the response.
    Closing,
}

impl State {
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }
}

//! Request cycle execution
//!
//! This module holds the execution state machine driving one HTTP
//! request/response cycle over a fresh TLS session.
//!
//! # Components
//!
//! - [`HttpsContext`]: the reusable per request container that
//!   - builds the request into its shared buffer
//!   - advances the cycle one bounded unit of work per [`HttpsContext::step`]
//!   - exposes the parsed response until the buffer is reused
//! - [`State`]: the phases of a cycle

mod https_context;
mod state;

pub use https_context::HttpsContext;
pub use state::State;

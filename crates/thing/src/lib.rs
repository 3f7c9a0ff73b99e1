//! Thing registration and bucket object requests over `micro-httpc`
//!
//! A [`ThingClient`] builds each request of the thing cloud REST API into the
//! fixed buffer of a [`micro_httpc::HttpsContext`] and drives it to completion:
//!
//! - register a thing with [`ThingClient::register_thing`], the returned access
//!   token authorizes the following requests
//! - create, replace, patch, read and delete objects in a [`Bucket`] owned by
//!   the application, a user, a group or a thing ([`Scope`])
//!
//! Request and response share the buffer, so only one request is in flight per
//! client and the body of the last response stays readable until the next one
//! is prepared.

mod bucket;
mod client;
mod config;
mod error;

pub use bucket::Bucket;
pub use bucket::Scope;
pub use client::CreatedObject;
pub use client::RegisteredThing;
pub use client::ThingClient;
pub use config::DEFAULT_APP_HOST;
pub use config::ThingConfig;
pub use error::ThingError;

//! Async HTTP transport for the galleria catalogue API.
//!
//! This crate owns the raw wire mechanics and nothing else:
//!
//! - **[`RestClient`]** — REST+JSON verbs (`GET`/`POST`/`PATCH`/`PUT`/
//!   `DELETE` plus multipart `PATCH`) against an API root, with every
//!   non-2xx response normalized into an [`Error`] carrying the server's
//!   `detail` message.
//! - **[`TransportConfig`]** — timeout and cookie-jar settings for building
//!   the underlying `reqwest::Client` (session auth requires cookies).
//! - **CSRF handling** — the anti-forgery token is injected into every
//!   request and rotated from response headers, so callers never see it.
//!
//! The domain model, caching, and field conversion live in
//! `galleria-core`; this crate deals only in paths and JSON.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{FormField, RestClient};
pub use error::Error;
pub use transport::TransportConfig;

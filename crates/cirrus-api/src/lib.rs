//! # cirrus-api — node REST surface.
//!
//! Explicit request/response schemas for every endpoint the operator tools
//! touch, the [`NodeApi`] seam used by the wallet and monitor crates, and
//! [`NodeClient`], its `reqwest` implementation.
//!
//! # Modules
//!
//! - [`error`] — `ApiError` (transport, status, decode failures)
//! - [`schema`] — wire types
//! - [`traits`] — the `NodeApi` trait
//! - [`client`] — HTTP implementation
//! - `testing` — in-memory fake node (feature `testing`)

pub mod client;
pub mod error;
pub mod schema;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::NodeClient;
pub use error::ApiError;
pub use schema::*;
pub use traits::NodeApi;

//! REST API client module for the Canvass backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! campaign-engagement API: session exchange, campaign messages,
//! points, withdrawals, profile and region data.
//!
//! The API uses bearer token authentication; the token is taken from the
//! current `Session` on every request.

pub mod client;
pub mod error;

pub use client::{credential_header, ApiClient, ClientConfig, DEFAULT_TIMEOUT_SECS};
pub use error::ApiError;

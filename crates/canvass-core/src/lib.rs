//! Canvass core library.
//!
//! Session handling, the authenticated API client, data models and the
//! client-side rules (optimistic engagement, withdrawal limits) shared by
//! every Canvass front end.

pub mod api;
pub mod auth;
pub mod config;
pub mod engagement;
pub mod models;
pub mod points;
pub mod utils;

pub use api::{ApiClient, ApiError, ClientConfig};
pub use auth::{Session, SessionManager, SessionStore};
pub use config::Config;

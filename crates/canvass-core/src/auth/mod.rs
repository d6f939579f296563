//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `Session`: the current token and user record
//! - `SessionStore`: durable storage of the session as `session.json`
//! - `SessionManager`: login, register, logout and restore; the single
//!   writer of the session, publishing every change to subscribers
//!
//! The session is restored once at startup and persisted after every change.

pub mod manager;
pub mod session;

pub use manager::SessionManager;
pub use session::{Session, SessionStore};

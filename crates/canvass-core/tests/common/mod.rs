//! Shared test utilities and mock infrastructure.

#![allow(dead_code)]

pub mod mock_backend;

use canvass_core::{ClientConfig, SessionManager, SessionStore};
use std::path::Path;
use std::time::Duration;

/// Session manager pointed at `base_url`, persisting into `dir`.
pub fn manager(base_url: &str, dir: &Path) -> SessionManager {
    let config = ClientConfig::new(base_url)
        .expect("mock base URL should be valid")
        .with_timeout(Duration::from_secs(5));
    SessionManager::new(&config, SessionStore::new(dir.to_path_buf()))
        .expect("session manager should build")
}

/// A login reply in the shape the backend sends.
pub fn login_reply(token: &str) -> serde_json::Value {
    serde_json::json!({
        "message": "Login successful",
        "token": token,
        "user": {
            "id": 42,
            "name": "Ama Mensah",
            "email": "ama@example.com",
            "phone": "0244123456",
            "region_id": 5,
            "constituency_id": "118",
            "referral_code": "AMA42"
        }
    })
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::UserRecord;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// The current authentication state.
///
/// A token without a user is allowed (some backends only return a token),
/// but a user is never present without a token. The fields are private so
/// the only ways to build one are [`Session::empty`] and
/// [`Session::authenticated`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    token: Option<String>,
    user: Option<UserRecord>,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn authenticated(token: String, user: Option<UserRecord>) -> Self {
        Self {
            token: Some(token),
            user,
        }
    }

    /// Get the bearer token if a session exists
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    // Blank tokens and orphaned users can only come from a hand-edited or
    // truncated file; they are treated as no session.
    fn is_well_formed(&self) -> bool {
        match self.token {
            Some(ref token) => !token.trim().is_empty(),
            None => self.user.is_none(),
        }
    }
}

/// Durable storage for the session: a single JSON file with a fixed name.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Load the persisted session. Returns `Ok(None)` when nothing is stored
    /// or the stored record is empty.
    pub fn load(&self) -> Result<Option<Session>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .context("Failed to read session file")?;
        let session: Session = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;

        if !session.is_well_formed() {
            anyhow::bail!("Session file holds an inconsistent record");
        }
        if !session.is_authenticated() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Save session to disk. An empty session removes the file.
    pub fn save(&self, session: &Session) -> Result<()> {
        if !session.is_authenticated() {
            return self.clear();
        }
        std::fs::create_dir_all(&self.dir)
            .context("Failed to create session directory")?;
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(self.session_path(), contents)
            .context("Failed to write session file")?;
        Ok(())
    }

    /// Remove the persisted session, if any
    pub fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ClientConfig};
use crate::models::{RegistrationForm, UserRecord};

use super::session::{Session, SessionStore};

/// Owns the session and is the only code that changes it.
///
/// Every change is written to the [`SessionStore`] and published on a watch
/// channel. The [`ApiClient`] handed out by [`SessionManager::client`] reads
/// that channel on each request, so credentials follow the session without
/// any further wiring. Other components observe changes with
/// [`SessionManager::subscribe`].
pub struct SessionManager {
    store: SessionStore,
    sender: watch::Sender<Session>,
    client: ApiClient,
}

impl SessionManager {
    /// Create a manager with an empty session. Call [`restore`](Self::restore)
    /// once at startup to pick up a persisted one.
    pub fn new(config: &ClientConfig, store: SessionStore) -> Result<Self, ApiError> {
        let (sender, receiver) = watch::channel(Session::empty());
        let client = ApiClient::new(config, receiver)?;
        Ok(Self { store, sender, client })
    }

    /// Client whose requests carry the current session's credentials
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Snapshot of the current session
    pub fn current(&self) -> Session {
        self.sender.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.sender.borrow().is_authenticated()
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.sender.borrow().user().cloned()
    }

    /// Receiver notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sender.subscribe()
    }

    /// Load the persisted session, if any, and make it current.
    ///
    /// An unreadable or inconsistent file is removed and treated as no
    /// session. Returns whether a session was restored.
    pub fn restore(&self) -> bool {
        match self.store.load() {
            Ok(Some(session)) => {
                debug!(has_user = session.user().is_some(), "Restored persisted session");
                self.sender.send_replace(session);
                true
            }
            Ok(None) => {
                debug!("No persisted session found");
                false
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session file");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to remove unreadable session file");
                }
                false
            }
        }
    }

    /// Log in. Returns `false` on any failure; the reason is logged.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.try_login(email, password).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Login failed");
                false
            }
        }
    }

    /// Log in, returning the error for callers that classify it.
    pub async fn try_login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let session = self.client.login(email, password).await?;
        self.replace(session.clone());
        info!("Login successful");
        Ok(session)
    }

    /// Register a new account. Same contract as [`login`](Self::login).
    pub async fn register(&self, form: &RegistrationForm) -> bool {
        match self.try_register(form).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Registration failed");
                false
            }
        }
    }

    pub async fn try_register(&self, form: &RegistrationForm) -> Result<Session, ApiError> {
        let session = self.client.register(form).await?;
        self.replace(session.clone());
        info!("Registration successful");
        Ok(session)
    }

    /// Clear the session locally and tell the server in the background.
    ///
    /// The local session is gone when this returns. The server notification
    /// runs on a spawned task; awaiting the handle is optional and its
    /// outcome never affects local state. Must be called within a tokio
    /// runtime.
    pub fn logout(&self) -> JoinHandle<()> {
        let previous = self.sender.send_replace(Session::empty());
        self.persist(&Session::empty());
        info!("Logged out");

        let client = self.client.clone();
        tokio::spawn(async move {
            let Some(token) = previous.token() else {
                return;
            };
            if let Err(e) = client.notify_logout(token).await {
                warn!(error = %e, "Server logout notification failed");
            }
        })
    }

    /// Drop the session without contacting the server, e.g. after a 401.
    pub fn invalidate(&self) {
        if self.is_authenticated() {
            info!("Session invalidated");
        }
        self.sender.send_replace(Session::empty());
        self.persist(&Session::empty());
    }

    /// Update the stored user after a profile change, keeping the token.
    pub fn update_user(&self, user: UserRecord) {
        let current = self.current();
        let Some(token) = current.token() else {
            debug!("Ignoring user update without a session");
            return;
        };
        self.replace(Session::authenticated(token.to_string(), Some(user)));
    }

    fn replace(&self, session: Session) {
        self.persist(&session);
        self.sender.send_replace(session);
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(session) {
            warn!(error = %e, "Failed to persist session");
        }
    }
}

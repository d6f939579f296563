//! Optimistic like/share handling for campaign posts.
//!
//! Each post carries one [`EngagementState`] per action. The counter moves as
//! soon as the user acts (`begin`), then either the server confirms it
//! (`confirm`) or the change is undone (`rollback`). Only one request per
//! action may be in flight at a time.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{CampaignMessage, EngagementReceipt};
use crate::points::{cash_value, format_cedis};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementAction {
    Like,
    Share,
}

impl fmt::Display for EngagementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngagementAction::Like => write!(f, "like"),
            EngagementAction::Share => write!(f, "share"),
        }
    }
}

/// Counter and flag as displayed for one action on one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub count: u64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Request in flight; holds the values to restore on failure.
    Pending { previous: Snapshot },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    #[error("a {0} request is already in progress")]
    AlreadyPending(EngagementAction),
    #[error("no {0} request is in progress")]
    NotPending(EngagementAction),
}

/// Optimistic state machine for a single action on a single post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementState {
    action: EngagementAction,
    current: Snapshot,
    phase: Phase,
}

impl EngagementState {
    pub fn new(action: EngagementAction, count: u64, active: bool) -> Self {
        Self {
            action,
            current: Snapshot { count, active },
            phase: Phase::Idle,
        }
    }

    pub fn like_for(message: &CampaignMessage) -> Self {
        Self::new(EngagementAction::Like, message.likes_count, message.is_liked)
    }

    pub fn share_for(message: &CampaignMessage) -> Self {
        Self::new(EngagementAction::Share, message.shares_count, message.is_shared)
    }

    pub fn action(&self) -> EngagementAction {
        self.action
    }

    pub fn count(&self) -> u64 {
        self.current.count
    }

    pub fn is_active(&self) -> bool {
        self.current.active
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending { .. })
    }

    /// Idle -> Pending. Applies the local change immediately.
    ///
    /// A like toggles: +1 when not liked, -1 when already liked.
    /// A share always adds one.
    pub fn begin(&mut self) -> Result<Snapshot, TransitionError> {
        if self.is_pending() {
            return Err(TransitionError::AlreadyPending(self.action));
        }
        let previous = self.current;
        self.current = match self.action {
            EngagementAction::Like if previous.active => Snapshot {
                count: previous.count.saturating_sub(1),
                active: false,
            },
            EngagementAction::Like | EngagementAction::Share => Snapshot {
                count: previous.count.saturating_add(1),
                active: true,
            },
        };
        self.phase = Phase::Pending { previous };
        Ok(self.current)
    }

    /// Pending -> Idle after the server accepted the action. A counter in
    /// the receipt replaces the optimistic one.
    pub fn confirm(&mut self, receipt: &EngagementReceipt) -> Result<Snapshot, TransitionError> {
        if !self.is_pending() {
            return Err(TransitionError::NotPending(self.action));
        }
        let confirmed = match self.action {
            EngagementAction::Like => receipt.likes_count,
            EngagementAction::Share => receipt.shares_count,
        };
        if let Some(count) = confirmed {
            self.current.count = count;
        }
        self.phase = Phase::Idle;
        Ok(self.current)
    }

    /// Pending -> Idle after a failure. Restores the pre-action values.
    pub fn rollback(&mut self) -> Result<Snapshot, TransitionError> {
        match self.phase {
            Phase::Pending { previous } => {
                self.current = previous;
                self.phase = Phase::Idle;
                Ok(self.current)
            }
            Phase::Idle => Err(TransitionError::NotPending(self.action)),
        }
    }
}

/// Result of a confirmed like or share, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementOutcome {
    pub snapshot: Snapshot,
    pub points_awarded: Option<f64>,
    pub message: Option<String>,
}

impl EngagementOutcome {
    /// Notice shown after success, e.g. "You earned 5 points (₵0.10)".
    pub fn notice(&self) -> Option<String> {
        match (self.points_awarded, &self.message) {
            (Some(points), _) if points > 0.0 => Some(format!(
                "You earned {} points ({})",
                points,
                format_cedis(cash_value(points))
            )),
            (_, Some(message)) if !message.trim().is_empty() => Some(message.clone()),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum EngagementError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("campaign message has no id")]
    MissingId,

    /// The server call failed; the state has already been rolled back.
    #[error("{action} failed: {source}")]
    Rejected {
        action: EngagementAction,
        #[source]
        source: ApiError,
    },
}

/// Run one full optimistic cycle for `state` against the API.
///
/// `on_optimistic` is called right after the local change, before the
/// request goes out, so a UI can render the new count immediately.
pub async fn run_engagement<F>(
    client: &ApiClient,
    post_id: &str,
    state: &mut EngagementState,
    on_optimistic: F,
) -> Result<EngagementOutcome, EngagementError>
where
    F: FnOnce(Snapshot),
{
    let optimistic = state.begin()?;
    on_optimistic(optimistic);
    debug!(post_id, action = %state.action(), count = optimistic.count, "Optimistic update applied");

    let result = match state.action() {
        EngagementAction::Like => client.like_campaign(post_id).await,
        EngagementAction::Share => client.share_campaign(post_id).await,
    };

    match result {
        Ok(receipt) => {
            let snapshot = state.confirm(&receipt)?;
            Ok(EngagementOutcome {
                snapshot,
                points_awarded: receipt.points_awarded,
                message: receipt.message,
            })
        }
        Err(source) => {
            let restored = state.rollback()?;
            warn!(post_id, action = %state.action(), error = %source, count = restored.count, "Rolled back optimistic update");
            Err(EngagementError::Rejected {
                action: state.action(),
                source,
            })
        }
    }
}

/// Like or unlike `message`, writing the final count and flag back into it.
pub async fn run_like<F>(
    client: &ApiClient,
    message: &mut CampaignMessage,
    on_optimistic: F,
) -> Result<EngagementOutcome, EngagementError>
where
    F: FnOnce(Snapshot),
{
    run_on_message(client, message, EngagementAction::Like, on_optimistic).await
}

/// Share `message`, writing the final count and flag back into it.
pub async fn run_share<F>(
    client: &ApiClient,
    message: &mut CampaignMessage,
    on_optimistic: F,
) -> Result<EngagementOutcome, EngagementError>
where
    F: FnOnce(Snapshot),
{
    run_on_message(client, message, EngagementAction::Share, on_optimistic).await
}

async fn run_on_message<F>(
    client: &ApiClient,
    message: &mut CampaignMessage,
    action: EngagementAction,
    on_optimistic: F,
) -> Result<EngagementOutcome, EngagementError>
where
    F: FnOnce(Snapshot),
{
    let id = message.id.clone().ok_or(EngagementError::MissingId)?;
    let mut state = match action {
        EngagementAction::Like => EngagementState::like_for(message),
        EngagementAction::Share => EngagementState::share_for(message),
    };

    let result = run_engagement(client, &id, &mut state, on_optimistic).await;

    match action {
        EngagementAction::Like => {
            message.likes_count = state.count();
            message.is_liked = state.is_active();
        }
        EngagementAction::Share => {
            message.shares_count = state.count();
            message.is_shared = state.is_active();
        }
    }
    result
}

//! Send attempt state machine
//!
//! `Built -> AwaitingSignature -> Signed -> Reassembled -> Submitted`, with
//! `Aborted` reachable from any non-terminal state. States are never
//! re-entered; a retry is a new attempt.

use adapay_core::{Error, ErrorCategory, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Send attempt state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SendState {
    /// Draft built, not yet shown to the signer
    Built,
    /// Unsigned transaction handed to the signer
    AwaitingSignature,
    /// Witness set received
    Signed,
    /// Witness set and metadata combined and verified
    Reassembled,
    /// Accepted by the relay
    Submitted,
    /// Stopped with an error
    Aborted,
}

impl SendState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, SendState::Submitted | SendState::Aborted)
    }

    /// Whether `next` directly follows this state
    pub fn can_transition_to(&self, next: SendState) -> bool {
        use SendState::*;
        matches!(
            (self, next),
            (Built, AwaitingSignature)
                | (AwaitingSignature, Signed)
                | (Signed, Reassembled)
                | (Reassembled, Submitted)
                | (Built | AwaitingSignature | Signed | Reassembled, Aborted)
        )
    }
}

impl fmt::Display for SendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendState::Built => write!(f, "Built"),
            SendState::AwaitingSignature => write!(f, "AwaitingSignature"),
            SendState::Signed => write!(f, "Signed"),
            SendState::Reassembled => write!(f, "Reassembled"),
            SendState::Submitted => write!(f, "Submitted"),
            SendState::Aborted => write!(f, "Aborted"),
        }
    }
}

/// A recorded transition
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    /// State entered
    pub state: SendState,
    /// When it was entered
    pub at: DateTime<Utc>,
}

/// Why an attempt aborted
#[derive(Debug, Clone, Serialize)]
pub struct AbortReason {
    /// Error category
    pub category: String,
    /// Error text
    pub message: String,
}

/// Trace of one send attempt
#[derive(Debug, Clone, Serialize)]
pub struct SendAttempt {
    id: Uuid,
    started_at: DateTime<Utc>,
    history: Vec<StateTransition>,
    abort_reason: Option<AbortReason>,
}

impl SendAttempt {
    /// Start a new attempt
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            history: Vec::new(),
            abort_reason: None,
        }
    }

    /// Attempt id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the attempt started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Current state; `None` until a draft is built
    pub fn state(&self) -> Option<SendState> {
        self.history.last().map(|t| t.state)
    }

    /// Transitions in order
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// States visited in order
    pub fn states(&self) -> Vec<SendState> {
        self.history.iter().map(|t| t.state).collect()
    }

    /// Abort details, if aborted
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        self.abort_reason.as_ref()
    }

    /// Whether the attempt has finished
    pub fn is_terminal(&self) -> bool {
        self.state().is_some_and(|s| s.is_terminal())
    }

    /// Move to `next`, rejecting anything but the next forward step
    pub fn advance(&mut self, next: SendState) -> Result<()> {
        let allowed = match self.state() {
            None => next == SendState::Built,
            Some(current) => next != SendState::Aborted && current.can_transition_to(next),
        };
        if !allowed {
            return Err(Error::InvalidStateTransition {
                from: self
                    .state()
                    .map_or_else(|| "Start".to_string(), |s| s.to_string()),
                to: next.to_string(),
            });
        }

        tracing::info!("Send attempt {}: {}", self.id, next);
        self.history.push(StateTransition {
            state: next,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Abort with `error`; no-op once terminal
    pub fn abort(&mut self, error: &Error) {
        if self.is_terminal() {
            return;
        }

        let category: ErrorCategory = error.category();
        if error.is_user_error() {
            tracing::info!("Send attempt {} aborted ({}): {}", self.id, category, error);
        } else {
            tracing::warn!("Send attempt {} aborted ({}): {}", self.id, category, error);
        }

        self.abort_reason = Some(AbortReason {
            category: category.to_string(),
            message: error.to_string(),
        });
        self.history.push(StateTransition {
            state: SendState::Aborted,
            at: Utc::now(),
        });
    }
}

impl Default for SendAttempt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let mut attempt = SendAttempt::new();
        for state in [
            SendState::Built,
            SendState::AwaitingSignature,
            SendState::Signed,
            SendState::Reassembled,
            SendState::Submitted,
        ] {
            attempt.advance(state).unwrap();
        }
        assert!(attempt.is_terminal());
        assert_eq!(attempt.history().len(), 5);
    }

    #[test]
    fn test_no_skipping_or_reentry() {
        let mut attempt = SendAttempt::new();
        assert!(attempt.advance(SendState::Signed).is_err());
        attempt.advance(SendState::Built).unwrap();
        assert!(attempt.advance(SendState::Built).is_err());
        assert!(attempt.advance(SendState::Signed).is_err());
        attempt.advance(SendState::AwaitingSignature).unwrap();
        assert!(matches!(
            attempt.advance(SendState::Built),
            Err(Error::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_abort_from_any_non_terminal_state() {
        let mut attempt = SendAttempt::new();
        attempt.abort(&Error::Address("bad".to_string()));
        assert_eq!(attempt.state(), Some(SendState::Aborted));
        assert_eq!(attempt.abort_reason().unwrap().category, "Address");

        let mut attempt = SendAttempt::new();
        attempt.advance(SendState::Built).unwrap();
        attempt.advance(SendState::AwaitingSignature).unwrap();
        attempt.abort(&Error::UserRejected("declined".to_string()));
        assert_eq!(
            attempt.states(),
            vec![SendState::Built, SendState::AwaitingSignature, SendState::Aborted]
        );
        assert!(attempt.advance(SendState::Signed).is_err());
    }

    #[test]
    fn test_abort_after_submit_is_ignored() {
        let mut attempt = SendAttempt::new();
        for state in [
            SendState::Built,
            SendState::AwaitingSignature,
            SendState::Signed,
            SendState::Reassembled,
            SendState::Submitted,
        ] {
            attempt.advance(state).unwrap();
        }
        attempt.abort(&Error::Submission("late".to_string()));
        assert_eq!(attempt.state(), Some(SendState::Submitted));
        assert!(attempt.abort_reason().is_none());
    }

    #[test]
    fn test_attempt_ids_are_unique() {
        assert_ne!(SendAttempt::new().id(), SendAttempt::new().id());
    }
}

//! Call state machine implementation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Server-assigned call identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current state of a call.
#[derive(Debug, Clone, Serialize, Default)]
pub enum CallState {
    /// No call started yet, or the last start attempt failed.
    #[default]
    Idle,
    /// Start requested, waiting for the signaling connection.
    AwaitingConnect { requested_at: DateTime<Utc> },
    /// `call_start` sent, waiting for accept or reject.
    Offering { offer_sent_at: DateTime<Utc> },
    /// Call accepted by the server.
    Active {
        call_id: CallId,
        accepted_at: DateTime<Utc>,
    },
    /// `call_terminate` sent, waiting for `call_terminated`.
    Terminating {
        call_id: CallId,
        accepted_at: DateTime<Utc>,
        requested_at: DateTime<Utc>,
    },
    /// Call ended or the coordinator was closed.
    Closed {
        closed_at: DateTime<Utc>,
        term_code: Option<i32>,
        duration_secs: Option<i64>,
    },
}

impl CallState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Starting or waiting for the server's answer.
    pub fn is_starting(&self) -> bool {
        matches!(self, Self::AwaitingConnect { .. } | Self::Offering { .. })
    }

    pub fn call_id(&self) -> Option<&CallId> {
        match self {
            Self::Active { call_id, .. } | Self::Terminating { call_id, .. } => Some(call_id),
            _ => None,
        }
    }
}

/// State transitions for calls.
#[derive(Debug, Clone)]
pub enum CallTransition {
    StartRequested,
    Connected,
    Accepted { call_id: CallId },
    StartFailed,
    TerminateRequested,
    Terminated { term_code: i32 },
    Closed,
}

impl CallState {
    /// Apply a state transition. Returns error if transition is invalid.
    pub fn apply(&mut self, transition: CallTransition) -> Result<(), InvalidTransition> {
        let new_state = match (&*self, transition) {
            (Self::Idle, CallTransition::StartRequested) => Self::AwaitingConnect {
                requested_at: Utc::now(),
            },
            (Self::AwaitingConnect { .. }, CallTransition::Connected) => Self::Offering {
                offer_sent_at: Utc::now(),
            },
            (Self::Offering { .. }, CallTransition::Accepted { call_id }) => Self::Active {
                call_id,
                accepted_at: Utc::now(),
            },
            (Self::AwaitingConnect { .. } | Self::Offering { .. }, CallTransition::StartFailed) => {
                Self::Idle
            }
            (
                Self::Active {
                    call_id,
                    accepted_at,
                },
                CallTransition::TerminateRequested,
            ) => Self::Terminating {
                call_id: call_id.clone(),
                accepted_at: *accepted_at,
                requested_at: Utc::now(),
            },
            // A retry after a timed out terminate.
            (Self::Terminating { .. }, CallTransition::TerminateRequested) => self.clone(),
            (
                Self::Active { accepted_at, .. } | Self::Terminating { accepted_at, .. },
                CallTransition::Terminated { term_code },
            ) => {
                let closed_at = Utc::now();
                Self::Closed {
                    closed_at,
                    term_code: Some(term_code),
                    duration_secs: Some(closed_at.signed_duration_since(*accepted_at).num_seconds()),
                }
            }
            (Self::Closed { .. }, CallTransition::Closed) => self.clone(),
            (Self::Active { accepted_at, .. } | Self::Terminating { accepted_at, .. }, CallTransition::Closed) => {
                let closed_at = Utc::now();
                Self::Closed {
                    closed_at,
                    term_code: None,
                    duration_secs: Some(closed_at.signed_duration_since(*accepted_at).num_seconds()),
                }
            }
            (_, CallTransition::Closed) => Self::Closed {
                closed_at: Utc::now(),
                term_code: None,
                duration_secs: None,
            },
            (current, transition) => {
                return Err(InvalidTransition {
                    current_state: format!("{:?}", current),
                    attempted: format!("{:?}", transition),
                });
            }
        };
        *self = new_state;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InvalidTransition {
    pub current_state: String,
    pub attempted: String,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid transition {} in state {}",
            self.attempted, self.current_state
        )
    }
}

impl std::error::Error for InvalidTransition {}

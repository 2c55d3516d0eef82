//! # Complaint Lifecycle
//!
//! ```text
//!   Pending ──▶ InProgress ──▶ Resolved
//!      ▲            │              │
//!      └────────────┴──────────────┘   (re-open)
//! ```
//!
//! `Pending → Resolved` is not an edge: work has to be picked up before it
//! can be closed. A resolved complaint may be re-opened when the defect
//! recurs.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::vocabulary::{Recorded, Status};

/// Status every new complaint starts in.
pub const INITIAL_STATUS: Status = Status::Pending;

impl Status {
    /// Whether `self → next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Pending, Status::InProgress)
                | (Status::InProgress, Status::Resolved)
                | (Status::InProgress, Status::Pending)
                | (Status::Resolved, Status::Pending)
        )
    }

    /// Targets reachable in one step.
    pub fn next_states(self) -> Vec<Status> {
        [Status::Pending, Status::InProgress, Status::Resolved]
            .into_iter()
            .filter(|s| self.can_transition_to(*s))
            .collect()
    }
}

/// How strictly `update_status` enforces the lifecycle graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Only lifecycle edges are accepted.
    #[default]
    Strict,
    /// Any canonical target is accepted; off-graph jumps are reported as
    /// anomalous so they can be logged for review.
    Permissive,
}

/// Outcome of a transition check that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionVerdict {
    /// An edge of the lifecycle graph.
    Regular,
    /// Accepted, but worth flagging.
    Anomalous(String),
}

impl TransitionPolicy {
    pub fn check(self, current: &Recorded<Status>, next: Status) -> Result<TransitionVerdict> {
        let from = match current {
            Recorded::Canonical(from) => *from,
            // Legacy records are repaired by hand: any canonical target goes.
            Recorded::Unrecognized(raw) => {
                return Ok(TransitionVerdict::Anomalous(format!(
                    "repairing unrecognized status '{raw}' to {next}"
                )));
            }
        };

        if from.can_transition_to(next) {
            return Ok(TransitionVerdict::Regular);
        }

        match self {
            TransitionPolicy::Strict => Err(DomainError::InvalidState {
                from: from.to_string(),
                to: next,
            }),
            TransitionPolicy::Permissive => Ok(TransitionVerdict::Anomalous(format!(
                "off-lifecycle jump {from} -> {next}"
            ))),
        }
    }
}

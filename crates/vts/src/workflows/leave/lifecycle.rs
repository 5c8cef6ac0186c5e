use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::LeaveStatus;

/// State changes a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Submit,
    Approve,
    Reject,
    Withdraw,
    Cancel,
}

/// Who is allowed to trigger an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActingParty {
    Owner,
    Manager,
}

impl TransitionAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Withdraw => "withdraw",
            Self::Cancel => "cancel",
        }
    }

    pub fn acting_party(&self) -> ActingParty {
        match self {
            Self::Approve | Self::Reject => ActingParty::Manager,
            Self::Submit | Self::Withdraw | Self::Cancel => ActingParty::Owner,
        }
    }

    pub fn requires_explanation(&self) -> bool {
        matches!(self, Self::Reject)
    }

    /// Actions that hand the booked hours back to the ledger. Rejection is
    /// not one of them.
    pub fn releases_hours(&self) -> bool {
        matches!(self, Self::Withdraw | Self::Cancel)
    }

    pub(crate) fn notice_template(&self) -> Option<&'static str> {
        match self {
            Self::Submit => None,
            Self::Approve => Some("leave_approved"),
            Self::Reject => Some("leave_rejected"),
            Self::Withdraw => Some("leave_withdrawn"),
            Self::Cancel => Some("leave_cancelled"),
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for TransitionAction {
    type Err = UnknownAction;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "submit" => Ok(Self::Submit),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "withdraw" => Ok(Self::Withdraw),
            "cancel" => Ok(Self::Cancel),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} a request that is {from}")]
pub struct TransitionError {
    pub from: LeaveStatus,
    pub action: TransitionAction,
}

impl LeaveStatus {
    /// The status reached by applying `action`, if the move is allowed.
    pub fn apply(self, action: TransitionAction) -> Result<LeaveStatus, TransitionError> {
        use LeaveStatus::*;
        use TransitionAction::*;

        match (self, action) {
            (Created, Submit) => Ok(Submitted),
            (Submitted, Approve) => Ok(Approved),
            (Submitted, Reject) => Ok(Rejected),
            (Submitted, Withdraw) => Ok(Withdrawn),
            (Approved, Cancel) => Ok(Cancelled),
            (from, action) => Err(TransitionError { from, action }),
        }
    }
}

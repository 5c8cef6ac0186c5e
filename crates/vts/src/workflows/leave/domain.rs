use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::calendar::{self, DayRange, InvalidRangeError};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier wrapper for employees (also used for managers and HR staff).
    EmployeeId
);
string_id!(LocationId);
string_id!(CategoryId);
string_id!(
    /// Identifier wrapper for persisted leave requests.
    RequestId
);
string_id!(RestrictionId);

/// Organizational role; drives grants and who may act on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Manager,
    HrClerk,
    Admin,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::HrClerk => "hr_clerk",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub location: Option<LocationId>,
    /// Direct managers only; the relation is never walked transitively.
    #[serde(default)]
    pub managers: BTreeSet<EmployeeId>,
}

impl Employee {
    pub fn is_managed_by(&self, manager: &EmployeeId) -> bool {
        self.managers.contains(manager)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Template describing how many hours a role starts with for a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub role: Role,
    pub category: CategoryId,
    pub allocated_hours: f64,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

impl Grant {
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.expiration_date.map_or(true, |expires| day <= expires)
    }
}

/// Per-employee, per-category hours ledger snapshotted from a [`Grant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub employee: EmployeeId,
    pub category: CategoryId,
    pub allocated_hours: f64,
    pub remaining_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Created,
    Submitted,
    Approved,
    Rejected,
    Withdrawn,
    Cancelled,
    Completed,
}

impl LeaveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LeaveStatus::Created => "created",
            LeaveStatus::Submitted => "submitted",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Withdrawn => "withdrawn",
            LeaveStatus::Cancelled => "cancelled",
            LeaveStatus::Completed => "completed",
        }
    }

    /// Statuses that keep the requested days booked for overlap detection.
    pub fn holds_dates(&self) -> bool {
        matches!(
            self,
            LeaveStatus::Submitted | LeaveStatus::Approved | LeaveStatus::Completed
        )
    }

    /// Statuses that count as "away" for coworker coverage.
    pub const ON_LEAVE: [LeaveStatus; 2] = [LeaveStatus::Submitted, LeaveStatus::Approved];
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Employee-supplied fields for a new or edited request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveDraft {
    pub employee: EmployeeId,
    pub category: CategoryId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hours_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: RequestId,
    pub employee: EmployeeId,
    pub category: CategoryId,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hours_per_day: f64,
    pub status: LeaveStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl LeaveRequest {
    pub fn from_draft(id: RequestId, draft: LeaveDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            employee: draft.employee,
            category: draft.category,
            title: draft.title,
            description: draft.description,
            start_date: draft.start_date,
            end_date: draft.end_date,
            hours_per_day: draft.hours_per_day,
            status: LeaveStatus::Created,
            created_at,
            submitted_at: None,
            decided_at: None,
            explanation: None,
        }
    }

    /// Overwrite the editable fields, keeping identity, status and timestamps.
    pub fn apply_draft(&mut self, draft: LeaveDraft) {
        self.category = draft.category;
        self.title = draft.title;
        self.description = draft.description;
        self.start_date = draft.start_date;
        self.end_date = draft.end_date;
        self.hours_per_day = draft.hours_per_day;
    }

    pub fn days(&self) -> Result<DayRange, InvalidRangeError> {
        calendar::days_in_range(self.start_date, self.end_date)
    }

    pub fn day_count(&self) -> i64 {
        calendar::day_count(self.start_date, self.end_date)
    }

    /// Inclusive-inclusive overlap with another span.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }
}

/// Explicit caller context passed to every service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: EmployeeId,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(actor: EmployeeId, now: DateTime<Utc>) -> Self {
        Self { actor, now }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

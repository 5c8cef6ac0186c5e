use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    CategoryId, Employee, EmployeeId, Grant, LeaveBalance, LeaveRequest, LeaveStatus, LocationId,
    RequestId, Role,
};
use super::ledger::LedgerError;
use super::restrictions::{Restriction, RestrictionKind};

/// Error enumeration for storage failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Persisted leave requests plus the atomic units that mutate them.
pub trait RequestStore: Send + Sync {
    fn fetch(&self, id: &RequestId) -> Result<Option<LeaveRequest>, RepositoryError>;

    fn requests_for(&self, employee: &EmployeeId) -> Result<Vec<LeaveRequest>, RepositoryError>;

    /// Distinct employees at `location` with a request covering `date` in one of `statuses`.
    fn requests_overlapping(
        &self,
        location: &LocationId,
        date: NaiveDate,
        statuses: &[LeaveStatus],
    ) -> Result<BTreeSet<EmployeeId>, RepositoryError>;

    /// Persist a submitted request and debit its hours as one unit.
    fn commit_submission(&self, commit: SubmissionCommit) -> Result<LeaveRequest, CommitError>;

    /// Move a request between statuses, optionally restoring its hours, as one unit.
    fn commit_transition(&self, commit: TransitionCommit) -> Result<LeaveRequest, CommitError>;
}

pub trait GrantStore: Send + Sync {
    fn grant_for(&self, role: Role, category: &CategoryId)
        -> Result<Option<Grant>, RepositoryError>;
}

pub trait RestrictionStore: Send + Sync {
    /// Restrictions of one kind whose category set contains `category`, in insertion order.
    fn restrictions_of_type(
        &self,
        kind: RestrictionKind,
        category: &CategoryId,
    ) -> Result<Vec<Restriction>, RepositoryError>;

    fn all_restrictions(&self) -> Result<Vec<Restriction>, RepositoryError>;

    fn insert_restriction(&self, restriction: Restriction) -> Result<Restriction, RepositoryError>;
}

pub trait EmployeeDirectory: Send + Sync {
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;

    fn employees_at(&self, location: &LocationId) -> Result<Vec<Employee>, RepositoryError>;

    /// Employees listing `manager` among their direct managers.
    fn subordinates_of(&self, manager: &EmployeeId) -> Result<Vec<Employee>, RepositoryError>;
}

pub trait BalanceStore: Send + Sync {
    fn balance(
        &self,
        employee: &EmployeeId,
        category: &CategoryId,
    ) -> Result<Option<LeaveBalance>, RepositoryError>;

    fn balances_for(&self, employee: &EmployeeId) -> Result<Vec<LeaveBalance>, RepositoryError>;

    /// Insert unless a row already exists; returns whichever row is stored.
    fn insert_balance_if_absent(
        &self,
        balance: LeaveBalance,
    ) -> Result<LeaveBalance, RepositoryError>;
}

/// Everything the leave service needs from persistence.
pub trait LeaveStore:
    RequestStore + GrantStore + RestrictionStore + EmployeeDirectory + BalanceStore
{
}

impl<T> LeaveStore for T where
    T: RequestStore + GrantStore + RestrictionStore + EmployeeDirectory + BalanceStore
{
}

/// Read-only view used by coworker coverage checks.
pub trait CoverageSource {
    fn staff_at(&self, location: &LocationId) -> Result<Vec<EmployeeId>, RepositoryError>;

    fn absent_on(
        &self,
        location: &LocationId,
        date: NaiveDate,
    ) -> Result<BTreeSet<EmployeeId>, RepositoryError>;
}

impl<T> CoverageSource for T
where
    T: EmployeeDirectory + RequestStore + ?Sized,
{
    fn staff_at(&self, location: &LocationId) -> Result<Vec<EmployeeId>, RepositoryError> {
        Ok(EmployeeDirectory::employees_at(self, location)?
            .into_iter()
            .map(|employee| employee.id)
            .collect())
    }

    fn absent_on(
        &self,
        location: &LocationId,
        date: NaiveDate,
    ) -> Result<BTreeSet<EmployeeId>, RepositoryError> {
        RequestStore::requests_overlapping(self, location, date, &LeaveStatus::ON_LEAVE)
    }
}

/// Atomic submission unit. When `replaces` is set the stored request is
/// overwritten and its previously debited hours are credited back first.
#[derive(Debug, Clone)]
pub struct SubmissionCommit {
    pub request: LeaveRequest,
    pub hours: f64,
    pub replaces: Option<RequestId>,
}

#[derive(Debug, Clone)]
pub struct TransitionCommit {
    pub id: RequestId,
    pub expected: LeaveStatus,
    pub next: LeaveStatus,
    pub at: DateTime<Utc>,
    pub explanation: Option<String>,
    pub restore_hours: bool,
}

/// Failures raised inside an atomic commit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommitError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("request overlaps existing request(s) {}", join_ids(.0))]
    Overlap(Vec<RequestId>),
    #[error("request is {found}, expected {expected}")]
    StaleStatus {
        expected: LeaveStatus,
        found: LeaveStatus,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub(crate) fn join_ids(ids: &[RequestId]) -> String {
    ids.iter()
        .map(RequestId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outbound notice about a request decision; delivery is left to the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveNotice {
    pub template: String,
    pub request_id: RequestId,
    pub recipient: EmployeeId,
    pub details: BTreeMap<String, String>,
}

pub trait NoticePublisher: Send + Sync {
    fn publish(&self, notice: LeaveNotice) -> Result<(), NoticeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("notice transport unavailable: {0}")]
    Transport(String),
}

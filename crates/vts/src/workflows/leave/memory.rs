use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Category, CategoryId, Employee, EmployeeId, Grant, LeaveBalance, LeaveRequest, LeaveStatus,
    Location, LocationId, RequestId, Role,
};
use super::ledger::requested_hours;
use super::repository::{
    BalanceStore, CommitError, EmployeeDirectory, GrantStore, LeaveNotice, NoticeError,
    NoticePublisher, RepositoryError, RequestStore, RestrictionStore, SubmissionCommit,
    TransitionCommit,
};
use super::restrictions::{Restriction, RestrictionKind};

/// Organization fixture used to hydrate an in-memory store (e.g. from a JSON seed file).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationSeed {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub grants: Vec<Grant>,
    #[serde(default)]
    pub restrictions: Vec<Restriction>,
}

#[derive(Debug, Default)]
struct MemoryState {
    locations: BTreeMap<LocationId, Location>,
    categories: BTreeMap<CategoryId, Category>,
    employees: BTreeMap<EmployeeId, Employee>,
    grants: Vec<Grant>,
    restrictions: Vec<Restriction>,
    requests: BTreeMap<RequestId, LeaveRequest>,
    balances: BTreeMap<(EmployeeId, CategoryId), LeaveBalance>,
}

/// Store backed by a single mutex; every trait method is one critical section,
/// so the commit methods are atomic with respect to each other.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLeaveStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryLeaveStore {
    pub fn from_seed(seed: OrganizationSeed) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap_or_else(|err| err.into_inner());
            for location in seed.locations {
                state.locations.insert(location.id.clone(), location);
            }
            for category in seed.categories {
                state.categories.insert(category.id.clone(), category);
            }
            for employee in seed.employees {
                state.employees.insert(employee.id.clone(), employee);
            }
            state.grants = seed.grants;
            state.restrictions = seed.restrictions;
        }
        store
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("leave store lock poisoned".to_string()))
    }

    pub fn put_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        self.state()?.employees.insert(employee.id.clone(), employee);
        Ok(())
    }

    pub fn put_location(&self, location: Location) -> Result<(), RepositoryError> {
        self.state()?.locations.insert(location.id.clone(), location);
        Ok(())
    }

    pub fn put_category(&self, category: Category) -> Result<(), RepositoryError> {
        self.state()?.categories.insert(category.id.clone(), category);
        Ok(())
    }

    pub fn put_grant(&self, grant: Grant) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state
            .grants
            .retain(|existing| !(existing.role == grant.role && existing.category == grant.category));
        state.grants.push(grant);
        Ok(())
    }

    pub fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        Ok(self.state()?.categories.values().cloned().collect())
    }

    pub fn locations(&self) -> Result<Vec<Location>, RepositoryError> {
        Ok(self.state()?.locations.values().cloned().collect())
    }

    /// Store a request as-is, bypassing validation and the ledger.
    pub fn put_request(&self, request: LeaveRequest) -> Result<(), RepositoryError> {
        self.state()?.requests.insert(request.id.clone(), request);
        Ok(())
    }
}

impl RequestStore for InMemoryLeaveStore {
    fn fetch(&self, id: &RequestId) -> Result<Option<LeaveRequest>, RepositoryError> {
        Ok(self.state()?.requests.get(id).cloned())
    }

    fn requests_for(&self, employee: &EmployeeId) -> Result<Vec<LeaveRequest>, RepositoryError> {
        Ok(self
            .state()?
            .requests
            .values()
            .filter(|request| request.employee == *employee)
            .cloned()
            .collect())
    }

    fn requests_overlapping(
        &self,
        location: &LocationId,
        date: NaiveDate,
        statuses: &[LeaveStatus],
    ) -> Result<BTreeSet<EmployeeId>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .requests
            .values()
            .filter(|request| statuses.contains(&request.status))
            .filter(|request| request.overlaps(date, date))
            .filter(|request| {
                state
                    .employees
                    .get(&request.employee)
                    .and_then(|employee| employee.location.as_ref())
                    == Some(location)
            })
            .map(|request| request.employee.clone())
            .collect())
    }

    fn commit_submission(&self, commit: SubmissionCommit) -> Result<LeaveRequest, CommitError> {
        let mut state = self.state()?;
        let SubmissionCommit {
            request,
            hours,
            replaces,
        } = commit;

        let previous = match &replaces {
            Some(id) => {
                let existing = state
                    .requests
                    .get(id)
                    .cloned()
                    .ok_or(RepositoryError::NotFound)?;
                if existing.status != LeaveStatus::Submitted {
                    return Err(CommitError::StaleStatus {
                        expected: LeaveStatus::Submitted,
                        found: existing.status,
                    });
                }
                Some(existing)
            }
            None => None,
        };

        // Re-run the overlap check under the lock so racing submissions cannot
        // both pass against a stale snapshot.
        let overlapping: Vec<RequestId> = state
            .requests
            .values()
            .filter(|existing| existing.employee == request.employee)
            .filter(|existing| existing.id != request.id)
            .filter(|existing| existing.status.holds_dates())
            .filter(|existing| existing.overlaps(request.start_date, request.end_date))
            .map(|existing| existing.id.clone())
            .collect();
        if !overlapping.is_empty() {
            return Err(CommitError::Overlap(overlapping));
        }

        let mut staged: BTreeMap<(EmployeeId, CategoryId), LeaveBalance> = BTreeMap::new();
        if let Some(previous) = &previous {
            let key = (previous.employee.clone(), previous.category.clone());
            let mut balance = state
                .balances
                .get(&key)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;
            balance.credit(requested_hours(previous));
            staged.insert(key, balance);
        }

        let key = (request.employee.clone(), request.category.clone());
        let mut balance = match staged.remove(&key) {
            Some(balance) => balance,
            None => state
                .balances
                .get(&key)
                .cloned()
                .ok_or(RepositoryError::NotFound)?,
        };
        balance.debit(hours)?;
        staged.insert(key, balance);

        state.balances.extend(staged);
        state.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn commit_transition(&self, commit: TransitionCommit) -> Result<LeaveRequest, CommitError> {
        let mut state = self.state()?;
        let request = state
            .requests
            .get(&commit.id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        if request.status != commit.expected {
            return Err(CommitError::StaleStatus {
                expected: commit.expected,
                found: request.status,
            });
        }

        if commit.restore_hours {
            let key = (request.employee.clone(), request.category.clone());
            if let Some(balance) = state.balances.get_mut(&key) {
                balance.credit(requested_hours(&request));
            }
        }

        let mut updated = request;
        updated.status = commit.next;
        updated.decided_at = Some(commit.at);
        if commit.explanation.is_some() {
            updated.explanation = commit.explanation;
        }
        state.requests.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }
}

impl GrantStore for InMemoryLeaveStore {
    fn grant_for(
        &self,
        role: Role,
        category: &CategoryId,
    ) -> Result<Option<Grant>, RepositoryError> {
        Ok(self
            .state()?
            .grants
            .iter()
            .find(|grant| grant.role == role && grant.category == *category)
            .cloned())
    }
}

impl RestrictionStore for InMemoryLeaveStore {
    fn restrictions_of_type(
        &self,
        kind: RestrictionKind,
        category: &CategoryId,
    ) -> Result<Vec<Restriction>, RepositoryError> {
        Ok(self
            .state()?
            .restrictions
            .iter()
            .filter(|restriction| restriction.kind == kind)
            .filter(|restriction| restriction.categories.contains(category))
            .cloned()
            .collect())
    }

    fn all_restrictions(&self) -> Result<Vec<Restriction>, RepositoryError> {
        Ok(self.state()?.restrictions.clone())
    }

    fn insert_restriction(&self, restriction: Restriction) -> Result<Restriction, RepositoryError> {
        let mut state = self.state()?;
        if state
            .restrictions
            .iter()
            .any(|existing| existing.id == restriction.id)
        {
            return Err(RepositoryError::Conflict);
        }
        state.restrictions.push(restriction.clone());
        Ok(restriction)
    }
}

impl EmployeeDirectory for InMemoryLeaveStore {
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.state()?.employees.get(id).cloned())
    }

    fn employees_at(&self, location: &LocationId) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self
            .state()?
            .employees
            .values()
            .filter(|employee| employee.location.as_ref() == Some(location))
            .cloned()
            .collect())
    }

    fn subordinates_of(&self, manager: &EmployeeId) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self
            .state()?
            .employees
            .values()
            .filter(|employee| employee.is_managed_by(manager))
            .cloned()
            .collect())
    }
}

impl BalanceStore for InMemoryLeaveStore {
    fn balance(
        &self,
        employee: &EmployeeId,
        category: &CategoryId,
    ) -> Result<Option<LeaveBalance>, RepositoryError> {
        Ok(self
            .state()?
            .balances
            .get(&(employee.clone(), category.clone()))
            .cloned())
    }

    fn balances_for(&self, employee: &EmployeeId) -> Result<Vec<LeaveBalance>, RepositoryError> {
        Ok(self
            .state()?
            .balances
            .values()
            .filter(|balance| balance.employee == *employee)
            .cloned()
            .collect())
    }

    fn insert_balance_if_absent(
        &self,
        balance: LeaveBalance,
    ) -> Result<LeaveBalance, RepositoryError> {
        let mut state = self.state()?;
        let key = (balance.employee.clone(), balance.category.clone());
        Ok(state.balances.entry(key).or_insert(balance).clone())
    }
}

/// Publisher that keeps notices in memory for inspection.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNoticeOutbox {
    notices: Arc<Mutex<Vec<LeaveNotice>>>,
}

impl InMemoryNoticeOutbox {
    pub fn notices(&self) -> Vec<LeaveNotice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }
}

impl NoticePublisher for InMemoryNoticeOutbox {
    fn publish(&self, notice: LeaveNotice) -> Result<(), NoticeError> {
        self.notices
            .lock()
            .map_err(|_| NoticeError::Transport("outbox lock poisoned".to_string()))?
            .push(notice);
        Ok(())
    }
}

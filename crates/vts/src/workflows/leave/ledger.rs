use chrono::NaiveDate;
use tracing::debug;

use super::domain::{CategoryId, Employee, LeaveBalance, LeaveRequest, Role};
use super::repository::{BalanceStore, GrantStore, RepositoryError};

/// Error raised by ledger lookups and mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("no grant configured for role {role} and category {category}")]
    NoGrantConfigured { role: Role, category: CategoryId },
    #[error("insufficient leave balance: requested {requested} hours, {remaining} remaining")]
    InsufficientBalance { requested: f64, remaining: f64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LeaveBalance {
    pub fn from_grant(employee: &Employee, category: &CategoryId, allocated_hours: f64) -> Self {
        Self {
            employee: employee.id.clone(),
            category: category.clone(),
            allocated_hours,
            remaining_hours: allocated_hours,
        }
    }

    pub fn can_cover(&self, hours: f64) -> bool {
        hours <= self.remaining_hours
    }

    /// Take `hours` out of the balance; leaves it untouched on failure.
    pub fn debit(&mut self, hours: f64) -> Result<(), LedgerError> {
        if !self.can_cover(hours) {
            return Err(LedgerError::InsufficientBalance {
                requested: hours,
                remaining: self.remaining_hours,
            });
        }
        self.remaining_hours -= hours;
        Ok(())
    }

    /// Return `hours` to the balance, never past the allocation.
    pub fn credit(&mut self, hours: f64) {
        self.remaining_hours = (self.remaining_hours + hours).min(self.allocated_hours);
    }
}

/// Hours a request consumes: inclusive day count times hours per day.
pub fn requested_hours(request: &LeaveRequest) -> f64 {
    request.day_count().max(0) as f64 * request.hours_per_day
}

/// Lazily materializes balances from grant templates.
pub struct LeaveLedger<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> LeaveLedger<'a, S>
where
    S: GrantStore + BalanceStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Existing balance, or a fresh snapshot of the active grant. Without a
    /// grant nothing is written.
    pub fn get_or_create_balance(
        &self,
        employee: &Employee,
        category: &CategoryId,
        today: NaiveDate,
    ) -> Result<LeaveBalance, LedgerError> {
        if let Some(balance) = self.store.balance(&employee.id, category)? {
            return Ok(balance);
        }

        let grant = self
            .store
            .grant_for(employee.role, category)?
            .filter(|grant| grant.is_active_on(today))
            .ok_or_else(|| LedgerError::NoGrantConfigured {
                role: employee.role,
                category: category.clone(),
            })?;

        debug!(
            employee = %employee.id,
            %category,
            hours = grant.allocated_hours,
            "opening leave balance from grant"
        );
        let balance = LeaveBalance::from_grant(employee, category, grant.allocated_hours);
        Ok(self.store.insert_balance_if_absent(balance)?)
    }
}

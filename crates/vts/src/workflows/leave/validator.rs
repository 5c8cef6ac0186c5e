use tracing::debug;

use super::domain::{Employee, LeaveRequest, RequestId};
use super::repository::{
    join_ids, EmployeeDirectory, RepositoryError, RequestStore, RestrictionStore,
};
use super::restrictions::RestrictionKind;
use super::validation::ValidationResult;

/// Runs the range, overlap, and restriction checks for a candidate request.
/// Every check contributes to a single result; nothing short-circuits.
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator {
    scope_by_location: bool,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RequestValidator {
    pub fn new(scope_by_location: bool) -> Self {
        Self { scope_by_location }
    }

    pub fn validate<S>(
        &self,
        request: &LeaveRequest,
        requester: &Employee,
        store: &S,
    ) -> Result<ValidationResult, RepositoryError>
    where
        S: RequestStore + RestrictionStore + EmployeeDirectory,
    {
        let mut result = ValidationResult::new();

        check_range(request, &mut result);

        let overlapping = overlapping_requests(request, store)?;
        if !overlapping.is_empty() {
            result.add_error(format!(
                "Request overlaps existing request(s) {}.",
                join_ids(&overlapping)
            ));
        }

        for kind in RestrictionKind::ordered() {
            for restriction in store.restrictions_of_type(kind, &request.category)? {
                if !restriction.applies_to(
                    &request.category,
                    requester.location.as_ref(),
                    self.scope_by_location,
                ) {
                    continue;
                }
                restriction.evaluate(request, requester, store, &mut result)?;
            }
        }

        debug!(
            request = %request.id,
            employee = %request.employee,
            violations = result.len(),
            "validated leave request"
        );
        Ok(result)
    }
}

fn check_range(request: &LeaveRequest, result: &mut ValidationResult) {
    if request.end_date < request.start_date {
        result.add_error("End date must be on or after the start date.");
    }
    if !(request.hours_per_day.is_finite() && request.hours_per_day > 0.0) {
        result.add_error("Hours per day must be greater than zero.");
    }
}

/// Ids of this employee's date-holding requests that intersect the candidate,
/// excluding the candidate itself.
pub(crate) fn overlapping_requests<S>(
    request: &LeaveRequest,
    store: &S,
) -> Result<Vec<RequestId>, RepositoryError>
where
    S: RequestStore + ?Sized,
{
    Ok(store
        .requests_for(&request.employee)?
        .into_iter()
        .filter(|existing| existing.id != request.id)
        .filter(|existing| existing.status.holds_dates())
        .filter(|existing| existing.overlaps(request.start_date, request.end_date))
        .map(|existing| existing.id)
        .collect())
}

use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::super::calendar::{self, weekday_of};
use super::super::domain::{Employee, LeaveRequest};
use super::super::repository::{CoverageSource, RepositoryError};
use super::super::validation::ValidationResult;

pub(crate) fn date_exclusion(
    request: &LeaveRequest,
    excluded_dates: &BTreeSet<NaiveDate>,
    result: &mut ValidationResult,
) {
    let Ok(days) = request.days() else {
        return;
    };
    for day in days.iter().filter(|day| excluded_dates.contains(day)) {
        result.add_error(format!("Date {day} is excluded."));
    }
}

pub(crate) fn adjacent_day(
    request: &LeaveRequest,
    holidays: &[NaiveDate],
    result: &mut ValidationResult,
) {
    for holiday in holidays {
        let day_before = calendar::shift(*holiday, -1);
        let day_after = calendar::shift(*holiday, 1);
        if day_before == Some(request.start_date) || day_after == Some(request.end_date) {
            result.add_error(format!("Request is adjacent to holiday on {holiday}."));
        }
    }
}

pub(crate) fn consecutive_day(
    request: &LeaveRequest,
    max_consecutive_days: u64,
    result: &mut ValidationResult,
) {
    let days = u64::try_from(request.day_count()).unwrap_or(0);
    if days > max_consecutive_days {
        result.add_error(format!(
            "Request exceeds maximum consecutive days ({max_consecutive_days})."
        ));
    }
}

pub(crate) fn coworker_coverage(
    request: &LeaveRequest,
    requester: &Employee,
    min_count: u64,
    coverage: &dyn CoverageSource,
    result: &mut ValidationResult,
) -> Result<(), RepositoryError> {
    // Nobody shares a location with an unassigned employee.
    let Some(location) = requester.location.as_ref() else {
        return Ok(());
    };
    let Ok(days) = request.days() else {
        return Ok(());
    };

    let coworkers = coverage
        .staff_at(location)?
        .into_iter()
        .filter(|id| *id != requester.id)
        .count();

    for day in days {
        let away = coverage
            .absent_on(location, day)?
            .into_iter()
            .filter(|id| *id != requester.id)
            .count();
        let scheduled = coworkers.saturating_sub(away) as u64;
        if scheduled < min_count {
            result.add_error(format!(
                "Not enough coworkers scheduled on {day} ({scheduled} of {min_count} required)."
            ));
        }
    }
    Ok(())
}

pub(crate) fn day_of_week(
    request: &LeaveRequest,
    allowed_days: &BTreeSet<u8>,
    result: &mut ValidationResult,
) {
    let Ok(days) = request.days() else {
        return;
    };
    for day in days {
        let weekday = weekday_of(day);
        if !allowed_days.contains(&weekday) {
            result.add_error(format!(
                "Day {day} (weekday {weekday}) is not allowed for leave."
            ));
        }
    }
}

pub(crate) fn period_limit(
    request: &LeaveRequest,
    max_hours: f64,
    period: &str,
    result: &mut ValidationResult,
) {
    let total_hours = request.hours_per_day * request.day_count() as f64;
    if total_hours > max_hours {
        result.add_error(format!(
            "Total requested hours ({total_hours}) exceed the limit of {max_hours} for the {period}."
        ));
    }
}

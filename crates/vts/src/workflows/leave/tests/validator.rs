use std::collections::BTreeSet;

use serde_json::json;

use super::common::*;
use crate::workflows::leave::domain::{Employee, EmployeeId, LeaveStatus, LocationId};
use crate::workflows::leave::memory::InMemoryLeaveStore;
use crate::workflows::leave::repository::{EmployeeDirectory, RestrictionStore};
use crate::workflows::leave::restrictions::RestrictionKind;
use crate::workflows::leave::validator::RequestValidator;
use crate::workflows::leave::CategoryId;

fn lookup(store: &InMemoryLeaveStore, id: &str) -> Employee {
    store
        .employee(&EmployeeId::new(id))
        .expect("lookup succeeds")
        .expect("employee exists")
}

#[test]
fn clean_request_passes() {
    let store = seeded_store();
    let request = leave_request(
        "req-new",
        "ava",
        date(2025, 3, 3),
        date(2025, 3, 7),
        LeaveStatus::Created,
    );

    let result = RequestValidator::default()
        .validate(&request, &lookup(&store, "ava"), &store)
        .expect("validation runs");

    assert!(result.is_valid(), "unexpected errors: {result}");
}

#[test]
fn inverted_range_fails_alongside_restriction_errors() {
    let store = seeded_store();
    store
        .insert_restriction(restriction(
            RestrictionKind::DateExclusion,
            "year end",
            json!({ "excluded_dates": ["2025-03-05"] }),
        ))
        .expect("restriction stored");

    let mut request = leave_request(
        "req-new",
        "ava",
        date(2025, 3, 7),
        date(2025, 3, 3),
        LeaveStatus::Created,
    );
    request.hours_per_day = 0.0;

    let result = RequestValidator::default()
        .validate(&request, &lookup(&store, "ava"), &store)
        .expect("validation runs");

    assert_eq!(
        result.messages(),
        [
            "End date must be on or after the start date.",
            "Hours per day must be greater than zero.",
        ]
    );
}

#[test]
fn overlap_counts_only_date_holding_requests() {
    let store = seeded_store();
    for (id, status) in [
        ("req-submitted", LeaveStatus::Submitted),
        ("req-approved", LeaveStatus::Approved),
        ("req-withdrawn", LeaveStatus::Withdrawn),
        ("req-rejected", LeaveStatus::Rejected),
    ] {
        store
            .put_request(leave_request(
                id,
                "ava",
                date(2025, 3, 5),
                date(2025, 3, 10),
                status,
            ))
            .expect("stored");
    }
    // Another employee's leave on the same days is irrelevant.
    store
        .put_request(leave_request(
            "req-ben",
            "ben",
            date(2025, 3, 3),
            date(2025, 3, 7),
            LeaveStatus::Approved,
        ))
        .expect("stored");

    let request = leave_request(
        "req-new",
        "ava",
        date(2025, 3, 3),
        date(2025, 3, 5),
        LeaveStatus::Created,
    );
    let result = RequestValidator::default()
        .validate(&request, &lookup(&store, "ava"), &store)
        .expect("validation runs");

    assert_eq!(
        result.messages(),
        ["Request overlaps existing request(s) req-approved, req-submitted."]
    );
}

#[test]
fn edited_request_does_not_overlap_itself() {
    let store = seeded_store();
    let existing = leave_request(
        "req-edit",
        "ava",
        date(2025, 3, 3),
        date(2025, 3, 7),
        LeaveStatus::Submitted,
    );
    store.put_request(existing.clone()).expect("stored");

    let mut edited = existing;
    edited.end_date = date(2025, 3, 5);
    let result = RequestValidator::default()
        .validate(&edited, &lookup(&store, "ava"), &store)
        .expect("validation runs");

    assert!(result.is_valid(), "unexpected errors: {result}");
}

#[test]
fn restriction_errors_accumulate_in_evaluation_order() {
    let store = seeded_store();
    store
        .insert_restriction(restriction(
            RestrictionKind::PeriodLimit,
            "weekly cap",
            json!({ "max_hours": 16, "period": "week" }),
        ))
        .expect("restriction stored");
    store
        .insert_restriction(restriction(
            RestrictionKind::DateExclusion,
            "inventory",
            json!({ "excluded_dates": ["2025-03-04"] }),
        ))
        .expect("restriction stored");
    store
        .insert_restriction(restriction(
            RestrictionKind::ConsecutiveDay,
            "short breaks",
            json!({ "max_consecutive_days": 2 }),
        ))
        .expect("restriction stored");

    let request = leave_request(
        "req-new",
        "ava",
        date(2025, 3, 3),
        date(2025, 3, 5),
        LeaveStatus::Created,
    );
    let result = RequestValidator::default()
        .validate(&request, &lookup(&store, "ava"), &store)
        .expect("validation runs");

    assert_eq!(
        result.messages(),
        [
            "Date 2025-03-04 is excluded.",
            "Request exceeds maximum consecutive days (2).",
            "Total requested hours (24) exceed the limit of 16 for the week.",
        ]
    );
}

#[test]
fn restrictions_for_other_categories_are_ignored() {
    let store = seeded_store();
    let mut sick_only = restriction(
        RestrictionKind::ConsecutiveDay,
        "sick cap",
        json!({ "max_consecutive_days": 1 }),
    );
    sick_only.categories = BTreeSet::from([CategoryId::new(SICK)]);
    store.insert_restriction(sick_only).expect("restriction stored");

    let request = leave_request(
        "req-new",
        "ava",
        date(2025, 3, 3),
        date(2025, 3, 5),
        LeaveStatus::Created,
    );
    let result = RequestValidator::default()
        .validate(&request, &lookup(&store, "ava"), &store)
        .expect("validation runs");

    assert!(result.is_valid());
}

#[test]
fn location_scoped_restriction_follows_the_scoping_switch() {
    let store = seeded_store();
    let mut depot_only = restriction(
        RestrictionKind::ConsecutiveDay,
        "depot cap",
        json!({ "max_consecutive_days": 1 }),
    );
    depot_only.locations = BTreeSet::from([LocationId::new(DEPOT)]);
    store.insert_restriction(depot_only).expect("restriction stored");

    let request = leave_request(
        "req-new",
        "ava",
        date(2025, 3, 3),
        date(2025, 3, 5),
        LeaveStatus::Created,
    );
    let ava = lookup(&store, "ava");

    let scoped = RequestValidator::new(true)
        .validate(&request, &ava, &store)
        .expect("validation runs");
    assert!(scoped.is_valid());

    let unscoped = RequestValidator::new(false)
        .validate(&request, &ava, &store)
        .expect("validation runs");
    assert_eq!(
        unscoped.messages(),
        ["Request exceeds maximum consecutive days (1)."]
    );
}

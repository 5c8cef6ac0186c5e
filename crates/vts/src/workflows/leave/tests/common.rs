use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use crate::workflows::leave::domain::{
    Category, CategoryId, Employee, EmployeeId, Grant, LeaveDraft, LeaveRequest, LeaveStatus,
    Location, LocationId, RequestContext, RequestId, RestrictionId, Role,
};
use crate::workflows::leave::memory::{InMemoryLeaveStore, InMemoryNoticeOutbox};
use crate::workflows::leave::policy::LeavePolicy;
use crate::workflows::leave::restrictions::{Restriction, RestrictionKind};
use crate::workflows::leave::service::LeaveService;

pub(super) const HQ: &str = "hq";
pub(super) const DEPOT: &str = "depot";
pub(super) const VACATION: &str = "vacation";
pub(super) const SICK: &str = "sick";

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn ctx(actor: &str) -> RequestContext {
    RequestContext::new(EmployeeId::new(actor), now())
}

pub(super) fn employee(id: &str, role: Role, location: Option<&str>, managers: &[&str]) -> Employee {
    Employee {
        id: EmployeeId::new(id),
        name: id.to_uppercase(),
        email: Some(format!("{id}@example.com")),
        role,
        location: location.map(LocationId::new),
        managers: managers.iter().map(|id| EmployeeId::new(*id)).collect(),
    }
}

/// Two locations, a manager with three reports at HQ, an HR clerk, and a
/// second manager at the depot. Vacation grants 80 hours to employees.
pub(super) fn seeded_store() -> InMemoryLeaveStore {
    let store = InMemoryLeaveStore::default();
    for (id, name) in [(HQ, "Headquarters"), (DEPOT, "Depot")] {
        store
            .put_location(Location {
                id: LocationId::new(id),
                name: name.to_string(),
                address: None,
            })
            .expect("location stored");
    }
    for (id, name) in [(VACATION, "Vacation"), (SICK, "Sick")] {
        store
            .put_category(Category {
                id: CategoryId::new(id),
                name: name.to_string(),
                description: String::new(),
            })
            .expect("category stored");
    }

    let people = [
        employee("mona", Role::Manager, Some(HQ), &[]),
        employee("ava", Role::Employee, Some(HQ), &["mona"]),
        employee("ben", Role::Employee, Some(HQ), &["mona"]),
        employee("cy", Role::Employee, Some(HQ), &["mona"]),
        employee("hana", Role::HrClerk, Some(HQ), &[]),
        employee("otto", Role::Manager, Some(DEPOT), &[]),
        employee("dee", Role::Employee, Some(DEPOT), &["otto"]),
    ];
    for person in people {
        store.put_employee(person).expect("employee stored");
    }

    store
        .put_grant(Grant {
            role: Role::Employee,
            category: CategoryId::new(VACATION),
            allocated_hours: 80.0,
            expiration_date: None,
        })
        .expect("grant stored");
    store
        .put_grant(Grant {
            role: Role::Manager,
            category: CategoryId::new(VACATION),
            allocated_hours: 120.0,
            expiration_date: None,
        })
        .expect("grant stored");
    store
}

pub(super) fn draft(employee: &str, start: NaiveDate, end: NaiveDate) -> LeaveDraft {
    LeaveDraft {
        employee: EmployeeId::new(employee),
        category: CategoryId::new(VACATION),
        title: "Time away".to_string(),
        description: String::new(),
        start_date: start,
        end_date: end,
        hours_per_day: 8.0,
    }
}

pub(super) fn leave_request(
    id: &str,
    employee: &str,
    start: NaiveDate,
    end: NaiveDate,
    status: LeaveStatus,
) -> LeaveRequest {
    let mut request = LeaveRequest::from_draft(RequestId::new(id), draft(employee, start, end), now());
    request.status = status;
    request
}

pub(super) fn restriction(kind: RestrictionKind, name: &str, parameters: Value) -> Restriction {
    Restriction {
        id: RestrictionId::new(format!("rst-{name}")),
        kind,
        name: name.to_string(),
        description: String::new(),
        categories: BTreeSet::from([CategoryId::new(VACATION)]),
        locations: BTreeSet::new(),
        parameters: parameters.as_object().cloned().unwrap_or_default(),
    }
}

pub(super) fn build_service() -> (
    LeaveService<InMemoryLeaveStore, InMemoryNoticeOutbox>,
    Arc<InMemoryLeaveStore>,
    Arc<InMemoryNoticeOutbox>,
) {
    build_service_with_policy(LeavePolicy::default())
}

pub(super) fn build_service_with_policy(
    policy: LeavePolicy,
) -> (
    LeaveService<InMemoryLeaveStore, InMemoryNoticeOutbox>,
    Arc<InMemoryLeaveStore>,
    Arc<InMemoryNoticeOutbox>,
) {
    let store = Arc::new(seeded_store());
    let notices = Arc::new(InMemoryNoticeOutbox::default());
    let service = LeaveService::new(store.clone(), notices.clone(), policy);
    (service, store, notices)
}

pub(super) fn draft_json(employee: &str, start: &str, end: &str) -> Value {
    json!({
        "employee": employee,
        "category": VACATION,
        "title": "Ski trip",
        "start_date": start,
        "end_date": end,
        "hours_per_day": 8.0,
    })
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

//! Integration scenarios for the leave request workflow.
//!
//! Scenarios run against the public service facade and HTTP router over an
//! organization hydrated from a JSON seed, the same way the server boots.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use vts::workflows::leave::{
        CategoryId, EmployeeId, InMemoryLeaveStore, InMemoryNoticeOutbox, LeaveDraft,
        LeaveNotice, LeavePolicy, LeaveService, NoticeError, NoticePublisher, OrganizationSeed,
        RequestContext,
    };

    pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    pub(super) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 8, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    pub(super) fn ctx(actor: &str) -> RequestContext {
        RequestContext::new(EmployeeId::new(actor), now())
    }

    pub(super) fn seed() -> OrganizationSeed {
        serde_json::from_value(json!({
            "locations": [
                { "id": "store-12", "name": "Store 12" },
                { "id": "store-40", "name": "Store 40" }
            ],
            "categories": [
                { "id": "vacation", "name": "Vacation" },
                { "id": "personal", "name": "Personal" }
            ],
            "employees": [
                { "id": "lee", "name": "Lee", "role": "manager", "location": "store-12" },
                { "id": "ana", "name": "Ana", "role": "employee", "location": "store-12", "managers": ["lee"] },
                { "id": "bo", "name": "Bo", "role": "employee", "location": "store-12", "managers": ["lee"] },
                { "id": "cruz", "name": "Cruz", "role": "employee", "location": "store-12", "managers": ["lee"] },
                { "id": "dana", "name": "Dana", "role": "hr_clerk", "location": "store-40" }
            ],
            "grants": [
                { "role": "employee", "category": "vacation", "allocated_hours": 40.0 },
                { "role": "manager", "category": "vacation", "allocated_hours": 80.0 },
                { "role": "employee", "category": "personal", "allocated_hours": 8.0, "expiration_date": "2025-03-31" }
            ],
            "restrictions": [
                {
                    "id": "rst-coverage",
                    "kind": "coworker_coverage",
                    "name": "Floor coverage",
                    "categories": ["vacation"],
                    "locations": ["store-12"],
                    "parameters": { "min_count": 3 }
                },
                {
                    "id": "rst-weekdays",
                    "kind": "day_of_week",
                    "name": "Weekdays only",
                    "categories": ["vacation"],
                    "parameters": { "allowed_days": [0, 1, 2, 3, 4] }
                }
            ]
        }))
        .expect("seed parses")
    }

    pub(super) fn draft(employee: &str, start: NaiveDate, end: NaiveDate) -> LeaveDraft {
        LeaveDraft {
            employee: EmployeeId::new(employee),
            category: CategoryId::new("vacation"),
            title: "Away".to_string(),
            description: String::new(),
            start_date: start,
            end_date: end,
            hours_per_day: 8.0,
        }
    }

    pub(super) fn build_service() -> (
        LeaveService<InMemoryLeaveStore, InMemoryNoticeOutbox>,
        Arc<InMemoryLeaveStore>,
        Arc<InMemoryNoticeOutbox>,
    ) {
        let store = Arc::new(InMemoryLeaveStore::from_seed(seed()));
        let notices = Arc::new(InMemoryNoticeOutbox::default());
        let service = LeaveService::new(store.clone(), notices.clone(), LeavePolicy::default());
        (service, store, notices)
    }

    /// Publisher whose transport is always down.
    #[derive(Default, Clone)]
    pub(super) struct OfflineNotices;

    impl NoticePublisher for OfflineNotices {
        fn publish(&self, _notice: LeaveNotice) -> Result<(), NoticeError> {
            Err(NoticeError::Transport("smtp relay offline".to_string()))
        }
    }
}

mod lifecycle {
    use std::sync::Arc;

    use super::common::*;
    use vts::workflows::leave::repository::{BalanceStore, RequestStore};
    use vts::workflows::leave::{
        CategoryId, EmployeeId, InMemoryLeaveStore, LeavePolicy, LeaveService,
        LeaveServiceError, LeaveStatus, TransitionAction,
    };

    fn remaining(store: &InMemoryLeaveStore, employee: &str) -> f64 {
        store
            .balance(&EmployeeId::new(employee), &CategoryId::new("vacation"))
            .expect("lookup")
            .map(|balance| balance.remaining_hours)
            .unwrap_or(f64::NAN)
    }

    #[test]
    fn submit_approve_cancel_round_trip_restores_hours() {
        let (service, store, notices) = build_service();

        // Monday to Wednesday, 24 of 40 hours.
        let request = service
            .submit(draft("ana", date(2025, 6, 2), date(2025, 6, 4)), &ctx("ana"))
            .expect("submitted");
        assert_eq!(remaining(&store, "ana"), 16.0);

        service
            .transition(&request.id, TransitionAction::Approve, &ctx("lee"), None)
            .expect("approved");
        let cancelled = service
            .transition(&request.id, TransitionAction::Cancel, &ctx("ana"), None)
            .expect("cancelled");

        assert_eq!(cancelled.status, LeaveStatus::Cancelled);
        assert_eq!(remaining(&store, "ana"), 40.0);
        let templates: Vec<String> = notices
            .notices()
            .into_iter()
            .map(|notice| notice.template)
            .collect();
        assert_eq!(templates, ["leave_approved", "leave_cancelled"]);
    }

    #[test]
    fn weekend_days_and_short_staffing_are_both_reported() {
        let (service, store, _) = build_service();
        service
            .submit(draft("bo", date(2025, 6, 6), date(2025, 6, 6)), &ctx("bo"))
            .expect("bo submitted");

        // Friday through Sunday; bo is already off on Friday.
        match service.submit(draft("ana", date(2025, 6, 6), date(2025, 6, 8)), &ctx("ana")) {
            Err(LeaveServiceError::Validation(result)) => {
                assert_eq!(
                    result.messages(),
                    [
                        "Not enough coworkers scheduled on 2025-06-06 (2 of 3 required).",
                        "Day 2025-06-07 (weekday 5) is not allowed for leave.",
                        "Day 2025-06-08 (weekday 6) is not allowed for leave.",
                    ]
                );
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert!(store
            .requests_for(&EmployeeId::new("ana"))
            .expect("listed")
            .is_empty());
    }

    #[test]
    fn expired_grants_block_submission() {
        let (service, _, _) = build_service();
        let mut personal = draft("ana", date(2025, 6, 2), date(2025, 6, 2));
        personal.category = CategoryId::new("personal");

        match service.submit(personal, &ctx("ana")) {
            Err(LeaveServiceError::NoGrantConfigured { category, .. }) => {
                assert_eq!(category, CategoryId::new("personal"))
            }
            other => panic!("expected missing grant, got {other:?}"),
        }
    }

    #[test]
    fn notice_failures_do_not_undo_decisions() {
        let store = Arc::new(InMemoryLeaveStore::from_seed(seed()));
        let service = LeaveService::new(
            store.clone(),
            Arc::new(OfflineNotices),
            LeavePolicy::default(),
        );
        let request = service
            .submit(draft("cruz", date(2025, 6, 2), date(2025, 6, 2)), &ctx("cruz"))
            .expect("submitted");

        let approved = service
            .transition(&request.id, TransitionAction::Approve, &ctx("lee"), None)
            .expect("approval stands");

        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(
            store
                .fetch(&request.id)
                .expect("lookup")
                .map(|request| request.status),
            Some(LeaveStatus::Approved)
        );
    }
}

mod http {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::common::*;
    use vts::workflows::leave::{leave_router, ACTOR_HEADER};

    async fn send(
        router: &axum::Router,
        method: &str,
        uri: &str,
        actor: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(ACTOR_HEADER, actor)
            .header(header::CONTENT_TYPE, "application/json")
            .body(match body {
                Some(body) => Body::from(serde_json::to_vec(&body).expect("encode")),
                None => Body::empty(),
            })
            .expect("request");
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router dispatch");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json")
        };
        (status, payload)
    }

    #[tokio::test]
    async fn employee_and_manager_journey_over_http() {
        let (service, _, _) = build_service();
        let router = leave_router(Arc::new(service));

        let (status, created) = send(
            &router,
            "POST",
            "/api/v1/leave/requests",
            "ana",
            Some(json!({
                "employee": "ana",
                "category": "vacation",
                "title": "Family visit",
                "start_date": "2099-06-01",
                "end_date": "2099-06-02",
                "hours_per_day": 8.0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().expect("id").to_string();

        let (status, edited) = send(
            &router,
            "PUT",
            &format!("/api/v1/leave/requests/{id}"),
            "ana",
            Some(json!({
                "employee": "ana",
                "category": "vacation",
                "title": "Family visit",
                "start_date": "2099-06-01",
                "end_date": "2099-06-01",
                "hours_per_day": 8.0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["end_date"], "2099-06-01");

        let (status, balances) = send(&router, "GET", "/api/v1/leave/balances", "ana", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(balances[0]["remaining_hours"], 32.0);

        let (status, dashboard) =
            send(&router, "GET", "/api/v1/leave/dashboard", "lee", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["pending_for_you"][0]["id"], id.as_str());

        let (status, approved) = send(
            &router,
            "POST",
            &format!("/api/v1/leave/requests/{id}/approve"),
            "lee",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "approved");

        let (status, _) = send(
            &router,
            "PUT",
            &format!("/api/v1/leave/requests/{id}"),
            "ana",
            Some(json!({
                "employee": "ana",
                "category": "vacation",
                "title": "Too late",
                "start_date": "2099-06-01",
                "end_date": "2099-06-01",
                "hours_per_day": 8.0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn hr_clerk_configures_restrictions_over_http() {
        let (service, _, _) = build_service();
        let router = leave_router(Arc::new(service));

        let (status, body) = send(
            &router,
            "POST",
            "/api/v1/leave/restrictions",
            "dana",
            Some(json!({
                "kind": "AdjacentDayRestriction",
                "name": "Holiday buffer",
                "categories": ["vacation"],
                "parameters": { "holidays": ["2099-07-04"] }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["kind"], "adjacent_day");

        let (status, body) = send(
            &router,
            "POST",
            "/api/v1/leave/requests",
            "bo",
            Some(json!({
                "employee": "bo",
                "category": "vacation",
                "title": "Long weekend",
                "start_date": "2099-07-03",
                "end_date": "2099-07-03",
                "hours_per_day": 8.0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"],
            json!(["Request is adjacent to holiday on 2099-07-04."])
        );
    }
}

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{EmployeeId, LeaveDraft, RequestContext, RequestId};
use super::lifecycle::TransitionAction;
use super::repository::{LeaveStore, NoticePublisher, RepositoryError};
use super::restrictions::RestrictionDraft;
use super::service::{LeaveService, LeaveServiceError};

/// Header naming the acting employee; authentication happens upstream.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Router builder exposing the leave service over HTTP.
pub fn leave_router<S, N>(service: Arc<LeaveService<S, N>>) -> Router
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    Router::new()
        .route("/api/v1/leave/requests", post(submit_handler::<S, N>))
        .route(
            "/api/v1/leave/requests/:request_id",
            get(get_handler::<S, N>).put(edit_handler::<S, N>),
        )
        .route(
            "/api/v1/leave/requests/:request_id/:action",
            post(transition_handler::<S, N>),
        )
        .route("/api/v1/leave/dashboard", get(dashboard_handler::<S, N>))
        .route("/api/v1/leave/balances", get(balances_handler::<S, N>))
        .route(
            "/api/v1/leave/restrictions",
            get(list_restrictions_handler::<S, N>).post(create_restriction_handler::<S, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TransitionBody {
    #[serde(default)]
    pub(crate) explanation: Option<String>,
}

type Service<S, N> = Arc<LeaveService<S, N>>;

pub(crate) async fn submit_handler<S, N>(
    State(service): State<Service<S, N>>,
    headers: HeaderMap,
    Json(draft): Json<LeaveDraft>,
) -> Response
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.submit(draft, &ctx) {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<S, N>(
    State(service): State<Service<S, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.get(&RequestId(request_id), &ctx) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn edit_handler<S, N>(
    State(service): State<Service<S, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    Json(draft): Json<LeaveDraft>,
) -> Response
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.edit(&RequestId(request_id), draft, &ctx) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<S, N>(
    State(service): State<Service<S, N>>,
    headers: HeaderMap,
    Path((request_id, action)): Path<(String, String)>,
    body: Bytes,
) -> Response
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let action: TransitionAction = match action.parse() {
        Ok(action) => action,
        Err(err) => return json_error(StatusCode::NOT_FOUND, err.to_string()),
    };
    let body: TransitionBody = if body.is_empty() {
        TransitionBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(body) => body,
            Err(err) => return json_error(StatusCode::BAD_REQUEST, err.to_string()),
        }
    };

    match service.transition(&RequestId(request_id), action, &ctx, body.explanation) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn dashboard_handler<S, N>(
    State(service): State<Service<S, N>>,
    headers: HeaderMap,
) -> Response
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.dashboard(&ctx) {
        Ok(dashboard) => (StatusCode::OK, Json(dashboard)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn balances_handler<S, N>(
    State(service): State<Service<S, N>>,
    headers: HeaderMap,
) -> Response
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.balances(&ctx) {
        Ok(balances) => (StatusCode::OK, Json(balances)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_restrictions_handler<S, N>(
    State(service): State<Service<S, N>>,
    headers: HeaderMap,
) -> Response
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.list_restrictions(&ctx) {
        Ok(restrictions) => (StatusCode::OK, Json(restrictions)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_restriction_handler<S, N>(
    State(service): State<Service<S, N>>,
    headers: HeaderMap,
    Json(draft): Json<RestrictionDraft>,
) -> Response
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.create_restriction(draft, &ctx) {
        Ok(restriction) => (StatusCode::CREATED, Json(restriction)).into_response(),
        Err(err) => error_response(err),
    }
}

fn request_context(headers: &HeaderMap) -> Result<RequestContext, Response> {
    let actor = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            json_error(
                StatusCode::UNAUTHORIZED,
                format!("missing {ACTOR_HEADER} header"),
            )
        })?;
    Ok(RequestContext::new(EmployeeId::new(actor), Utc::now()))
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn error_response(err: LeaveServiceError) -> Response {
    let status = match &err {
        LeaveServiceError::Validation(result) => {
            let payload = json!({
                "error": "request failed validation",
                "errors": result.messages(),
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
        LeaveServiceError::InsufficientBalance { .. } => StatusCode::CONFLICT,
        LeaveServiceError::NoGrantConfigured { .. } | LeaveServiceError::Configuration(_) => {
            StatusCode::BAD_REQUEST
        }
        LeaveServiceError::Permission(_) => StatusCode::FORBIDDEN,
        LeaveServiceError::InvalidTransition(_) | LeaveServiceError::NotEditable(_) => {
            StatusCode::CONFLICT
        }
        LeaveServiceError::MissingExplanation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LeaveServiceError::UnknownEmployee(_) => StatusCode::UNAUTHORIZED,
        LeaveServiceError::NotFound(_) | LeaveServiceError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        LeaveServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        LeaveServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.to_string())
}

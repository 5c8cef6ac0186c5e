use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    CategoryId, Employee, EmployeeId, LeaveBalance, LeaveDraft, LeaveRequest, LeaveStatus,
    RequestContext, RequestId, RestrictionId, Role,
};
use super::ledger::{requested_hours, LedgerError, LeaveLedger};
use super::lifecycle::{ActingParty, TransitionAction, TransitionError};
use super::policy::LeavePolicy;
use super::repository::{
    join_ids, CommitError, LeaveNotice, LeaveStore, NoticePublisher, RepositoryError,
    SubmissionCommit, TransitionCommit,
};
use super::restrictions::{Restriction, RestrictionDraft};
use super::validation::ValidationResult;
use super::validator::RequestValidator;

const DASHBOARD_LOOKBACK_DAYS: i64 = 180;
const DASHBOARD_LOOKAHEAD_DAYS: i64 = 18 * 30;

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static RESTRICTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("req-{id:06}"))
}

fn next_restriction_id() -> RestrictionId {
    let id = RESTRICTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RestrictionId(format!("rst-{id:06}"))
}

/// Error raised by the leave service.
#[derive(Debug, thiserror::Error)]
pub enum LeaveServiceError {
    #[error("request failed validation: {0}")]
    Validation(ValidationResult),
    #[error("insufficient leave balance: requested {requested} hours, {remaining} remaining")]
    InsufficientBalance { requested: f64, remaining: f64 },
    #[error("no grant configured for role {role} and category {category}")]
    NoGrantConfigured { role: Role, category: CategoryId },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error("an explanation is required to {0} a request")]
    MissingExplanation(TransitionAction),
    #[error("only submitted requests can be edited (request is {0})")]
    NotEditable(LeaveStatus),
    #[error("unknown employee {0}")]
    UnknownEmployee(EmployeeId),
    #[error("leave request {0} not found")]
    NotFound(RequestId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<LedgerError> for LeaveServiceError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NoGrantConfigured { role, category } => {
                Self::NoGrantConfigured { role, category }
            }
            LedgerError::InsufficientBalance {
                requested,
                remaining,
            } => Self::InsufficientBalance {
                requested,
                remaining,
            },
            LedgerError::Repository(err) => Self::Repository(err),
        }
    }
}

/// Home-page style summary for one employee.
#[derive(Debug, Clone, Serialize)]
pub struct LeaveDashboard {
    pub employee: EmployeeId,
    pub today: NaiveDate,
    pub my_requests: Vec<LeaveRequest>,
    pub pending_for_manager: Vec<LeaveRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_for_you: Option<Vec<LeaveRequest>>,
    pub balances: Vec<LeaveBalance>,
}

/// Service composing the validator, ledger, and lifecycle over a store.
pub struct LeaveService<S, N> {
    store: Arc<S>,
    notices: Arc<N>,
    policy: LeavePolicy,
    validator: RequestValidator,
}

impl<S, N> LeaveService<S, N>
where
    S: LeaveStore + 'static,
    N: NoticePublisher + 'static,
{
    pub fn new(store: Arc<S>, notices: Arc<N>, policy: LeavePolicy) -> Self {
        Self {
            store,
            notices,
            policy,
            validator: RequestValidator::new(policy.scope_restrictions_by_location),
        }
    }

    /// Validate a draft, then persist it as submitted and debit its hours in one step.
    pub fn submit(
        &self,
        draft: LeaveDraft,
        ctx: &RequestContext,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let requester = self.actor(ctx)?;
        if draft.employee != requester.id {
            return Err(LeaveServiceError::Permission(
                "employees may only submit their own requests".to_string(),
            ));
        }

        let mut request = LeaveRequest::from_draft(next_request_id(), draft, ctx.now);
        self.ensure_valid(&request, &requester)?;

        let balance = LeaveLedger::new(self.store.as_ref()).get_or_create_balance(
            &requester,
            &request.category,
            ctx.today(),
        )?;
        let hours = requested_hours(&request);
        if !balance.can_cover(hours) {
            return Err(LeaveServiceError::InsufficientBalance {
                requested: hours,
                remaining: balance.remaining_hours,
            });
        }

        request.status = request.status.apply(TransitionAction::Submit)?;
        request.submitted_at = Some(ctx.now);

        let stored = self
            .store
            .commit_submission(SubmissionCommit {
                request,
                hours,
                replaces: None,
            })
            .map_err(|err| commit_failure(err, TransitionAction::Submit))?;

        info!(
            request = %stored.id,
            employee = %stored.employee,
            category = %stored.category,
            hours,
            "leave request submitted"
        );
        Ok(stored)
    }

    /// Replace the details of a still-submitted request, moving the hours with it.
    pub fn edit(
        &self,
        id: &RequestId,
        draft: LeaveDraft,
        ctx: &RequestContext,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let requester = self.actor(ctx)?;
        let existing = self.fetch(id)?;
        if existing.employee != requester.id || draft.employee != requester.id {
            return Err(LeaveServiceError::Permission(
                "only the requesting employee may edit this request".to_string(),
            ));
        }
        if existing.status != LeaveStatus::Submitted {
            return Err(LeaveServiceError::NotEditable(existing.status));
        }

        let mut updated = existing.clone();
        updated.apply_draft(draft);
        self.ensure_valid(&updated, &requester)?;

        let balance = LeaveLedger::new(self.store.as_ref()).get_or_create_balance(
            &requester,
            &updated.category,
            ctx.today(),
        )?;
        let hours = requested_hours(&updated);
        let mut available = balance.remaining_hours;
        if existing.category == updated.category {
            available = (available + requested_hours(&existing)).min(balance.allocated_hours);
        }
        if hours > available {
            return Err(LeaveServiceError::InsufficientBalance {
                requested: hours,
                remaining: available,
            });
        }

        let stored = self
            .store
            .commit_submission(SubmissionCommit {
                request: updated,
                hours,
                replaces: Some(id.clone()),
            })
            .map_err(|err| match err {
                CommitError::StaleStatus { found, .. } => LeaveServiceError::NotEditable(found),
                other => commit_failure(other, TransitionAction::Submit),
            })?;

        info!(request = %stored.id, hours, "leave request edited");
        Ok(stored)
    }

    /// Apply a lifecycle action on behalf of the context's actor.
    pub fn transition(
        &self,
        id: &RequestId,
        action: TransitionAction,
        ctx: &RequestContext,
        explanation: Option<String>,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let actor = self.actor(ctx)?;
        let request = self.fetch(id)?;

        if action == TransitionAction::Submit {
            // Submission carries validation and ledger work; it only goes through `submit`.
            return Err(TransitionError {
                from: request.status,
                action,
            }
            .into());
        }

        let owner = self.authorize(&actor, &request, action)?;
        let next = request.status.apply(action)?;

        let explanation = explanation
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if action.requires_explanation() && explanation.is_none() {
            return Err(LeaveServiceError::MissingExplanation(action));
        }

        let updated = self
            .store
            .commit_transition(TransitionCommit {
                id: request.id.clone(),
                expected: request.status,
                next,
                at: ctx.now,
                explanation,
                restore_hours: action.releases_hours() && self.policy.restore_hours_on_release,
            })
            .map_err(|err| commit_failure(err, action))?;

        info!(
            request = %updated.id,
            actor = %actor.id,
            %action,
            from = %request.status,
            to = %updated.status,
            "leave request transitioned"
        );
        self.announce(&updated, &owner, action);
        Ok(updated)
    }

    /// Read a request the actor is allowed to see.
    pub fn get(
        &self,
        id: &RequestId,
        ctx: &RequestContext,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let actor = self.actor(ctx)?;
        let request = self.fetch(id)?;
        if request.employee == actor.id || matches!(actor.role, Role::HrClerk | Role::Admin) {
            return Ok(request);
        }
        if actor.role == Role::Manager {
            let owner = self.employee(&request.employee)?;
            if !self.policy.require_direct_manager || owner.is_managed_by(&actor.id) {
                return Ok(request);
            }
        }
        Err(LeaveServiceError::Permission(format!(
            "{} may not view request {}",
            actor.id, request.id
        )))
    }

    pub fn balances(&self, ctx: &RequestContext) -> Result<Vec<LeaveBalance>, LeaveServiceError> {
        let actor = self.actor(ctx)?;
        Ok(self.store.balances_for(&actor.id)?)
    }

    pub fn dashboard(&self, ctx: &RequestContext) -> Result<LeaveDashboard, LeaveServiceError> {
        let actor = self.actor(ctx)?;
        let today = ctx.today();
        let window_start = today - Duration::days(DASHBOARD_LOOKBACK_DAYS);
        let window_end = today + Duration::days(DASHBOARD_LOOKAHEAD_DAYS);

        let own = self.store.requests_for(&actor.id)?;
        let my_requests = own
            .iter()
            .filter(|request| request.start_date >= window_start && request.end_date <= window_end)
            .cloned()
            .collect();
        let pending_for_manager = own
            .into_iter()
            .filter(|request| request.status == LeaveStatus::Submitted)
            .collect();

        let pending_for_you = if actor.role == Role::Manager {
            let mut pending = Vec::new();
            for subordinate in self.store.subordinates_of(&actor.id)? {
                pending.extend(
                    self.store
                        .requests_for(&subordinate.id)?
                        .into_iter()
                        .filter(|request| request.status == LeaveStatus::Submitted),
                );
            }
            Some(pending)
        } else {
            None
        };

        Ok(LeaveDashboard {
            balances: self.store.balances_for(&actor.id)?,
            employee: actor.id,
            today,
            my_requests,
            pending_for_manager,
            pending_for_you,
        })
    }

    pub fn list_restrictions(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<Restriction>, LeaveServiceError> {
        let actor = self.actor(ctx)?;
        require_hr(&actor)?;
        Ok(self.store.all_restrictions()?)
    }

    /// Register a new restriction; parameters are checked before anything is stored.
    pub fn create_restriction(
        &self,
        draft: RestrictionDraft,
        ctx: &RequestContext,
    ) -> Result<Restriction, LeaveServiceError> {
        let actor = self.actor(ctx)?;
        require_hr(&actor)?;

        let restriction = draft
            .into_restriction(next_restriction_id())
            .map_err(|err| LeaveServiceError::Configuration(err.to_string()))?;
        let stored = self.store.insert_restriction(restriction)?;

        info!(
            restriction = %stored.id,
            kind = %stored.kind,
            name = %stored.name,
            actor = %actor.id,
            "restriction created"
        );
        Ok(stored)
    }

    fn ensure_valid(
        &self,
        request: &LeaveRequest,
        requester: &Employee,
    ) -> Result<(), LeaveServiceError> {
        let result = self
            .validator
            .validate(request, requester, self.store.as_ref())?;
        if result.is_valid() {
            return Ok(());
        }
        debug!(
            request = %request.id,
            employee = %request.employee,
            errors = %result,
            "leave request rejected by validation"
        );
        Err(LeaveServiceError::Validation(result))
    }

    /// Returns the request owner once the actor is cleared for `action`.
    fn authorize(
        &self,
        actor: &Employee,
        request: &LeaveRequest,
        action: TransitionAction,
    ) -> Result<Employee, LeaveServiceError> {
        match action.acting_party() {
            ActingParty::Owner => {
                if actor.id != request.employee {
                    return Err(LeaveServiceError::Permission(format!(
                        "only the requesting employee may {action} this request"
                    )));
                }
                Ok(actor.clone())
            }
            ActingParty::Manager => {
                if actor.role != Role::Manager {
                    return Err(LeaveServiceError::Permission(format!(
                        "only managers may {action} requests"
                    )));
                }
                if actor.id == request.employee {
                    return Err(LeaveServiceError::Permission(
                        "managers cannot decide their own requests".to_string(),
                    ));
                }
                let owner = self.employee(&request.employee)?;
                if self.policy.require_direct_manager && !owner.is_managed_by(&actor.id) {
                    return Err(LeaveServiceError::Permission(format!(
                        "{} is not a manager of {}",
                        actor.id, owner.id
                    )));
                }
                Ok(owner)
            }
        }
    }

    fn announce(&self, request: &LeaveRequest, owner: &Employee, action: TransitionAction) {
        let Some(template) = action.notice_template() else {
            return;
        };

        let recipients: Vec<EmployeeId> = match action.acting_party() {
            ActingParty::Manager => vec![request.employee.clone()],
            ActingParty::Owner => owner.managers.iter().cloned().collect(),
        };

        let mut details = BTreeMap::new();
        details.insert("title".to_string(), request.title.clone());
        details.insert("status".to_string(), request.status.label().to_string());
        details.insert("start_date".to_string(), request.start_date.to_string());
        details.insert("end_date".to_string(), request.end_date.to_string());
        if let Some(explanation) = &request.explanation {
            details.insert("explanation".to_string(), explanation.clone());
        }

        for recipient in recipients {
            let notice = LeaveNotice {
                template: template.to_string(),
                request_id: request.id.clone(),
                recipient,
                details: details.clone(),
            };
            if let Err(err) = self.notices.publish(notice) {
                warn!(request = %request.id, error = %err, "failed to publish leave notice");
            }
        }
    }

    fn actor(&self, ctx: &RequestContext) -> Result<Employee, LeaveServiceError> {
        self.employee(&ctx.actor)
    }

    fn employee(&self, id: &EmployeeId) -> Result<Employee, LeaveServiceError> {
        self.store
            .employee(id)?
            .ok_or_else(|| LeaveServiceError::UnknownEmployee(id.clone()))
    }

    fn fetch(&self, id: &RequestId) -> Result<LeaveRequest, LeaveServiceError> {
        self.store
            .fetch(id)?
            .ok_or_else(|| LeaveServiceError::NotFound(id.clone()))
    }
}

fn require_hr(actor: &Employee) -> Result<(), LeaveServiceError> {
    if actor.role == Role::HrClerk {
        Ok(())
    } else {
        Err(LeaveServiceError::Permission(
            "only HR clerks may manage restrictions".to_string(),
        ))
    }
}

fn commit_failure(err: CommitError, action: TransitionAction) -> LeaveServiceError {
    match err {
        CommitError::Ledger(err) => err.into(),
        CommitError::Overlap(ids) => {
            let mut result = ValidationResult::new();
            result.add_error(format!(
                "Request overlaps existing request(s) {}.",
                join_ids(&ids)
            ));
            LeaveServiceError::Validation(result)
        }
        CommitError::StaleStatus { found, .. } => {
            TransitionError { from: found, action }.into()
        }
        CommitError::Repository(err) => err.into(),
    }
}

//! Leave requests, the restriction engine that screens them, and the hour
//! balances debited and credited as requests move through their lifecycle.

pub mod calendar;
pub mod domain;
pub mod ledger;
pub mod lifecycle;
pub mod memory;
pub mod policy;
pub mod repository;
pub mod restrictions;
pub mod router;
pub mod service;
pub mod validation;
pub mod validator;

#[cfg(test)]
mod tests;

pub use calendar::{days_in_range, weekday_of, DayRange, InvalidRangeError};
pub use domain::{
    Category, CategoryId, Employee, EmployeeId, Grant, LeaveBalance, LeaveDraft, LeaveRequest,
    LeaveStatus, Location, LocationId, RequestContext, RequestId, RestrictionId, Role,
};
pub use ledger::{requested_hours, LedgerError, LeaveLedger};
pub use lifecycle::{TransitionAction, TransitionError};
pub use memory::{InMemoryLeaveStore, InMemoryNoticeOutbox, OrganizationSeed};
pub use policy::LeavePolicy;
pub use repository::{LeaveNotice, LeaveStore, NoticeError, NoticePublisher, RepositoryError};
pub use restrictions::{Restriction, RestrictionDraft, RestrictionKind};
pub use router::{leave_router, ACTOR_HEADER};
pub use service::{LeaveDashboard, LeaveService, LeaveServiceError};
pub use validation::ValidationResult;
pub use validator::RequestValidator;

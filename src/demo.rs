use crate::infra::{load_store, parse_date, LoggingNoticePublisher};
use chrono::{Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use vts::error::AppError;
use vts::workflows::leave::{
    CategoryId, EmployeeId, InMemoryLeaveStore, LeaveDraft, LeavePolicy, LeaveRequest,
    LeaveService, LeaveServiceError, RequestContext, TransitionAction,
};

type DemoService = LeaveService<InMemoryLeaveStore, LoggingNoticePublisher>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// JSON organization seed; defaults to the bundled sample organization.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Date the demo treats as today (defaults to today).
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Keep hours spent when requests are withdrawn or cancelled.
    #[arg(long)]
    pub(crate) keep_released_hours: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        seed,
        today,
        keep_released_hours,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let policy = LeavePolicy {
        restore_hours_on_release: !keep_released_hours,
        ..LeavePolicy::default()
    };
    let store = Arc::new(load_store(seed.as_deref())?);
    let service = LeaveService::new(store, Arc::new(LoggingNoticePublisher), policy);
    let session = DemoSession { service, today };

    // First Monday at least two weeks out.
    let mut start = today + Duration::days(14);
    while start.weekday().num_days_from_monday() != 0 {
        start += Duration::days(1);
    }
    let end = start + Duration::days(4);

    println!("Leave tracking demo (today {today})");
    println!("Requested week: {start} -> {end}\n");

    let alex = session.submit("alex", start, end);
    let sam = session.submit("sam", start, end);
    let jordan = session.submit("jordan", start, end);
    session.submit("morgan", start, end);
    session.submit("alex", end, end + Duration::days(2));

    println!("\nManager decisions");
    if let Some(alex) = &alex {
        session.transition("morgan", alex, TransitionAction::Approve, None);
    }
    if let Some(sam) = &sam {
        session.transition("morgan", sam, TransitionAction::Reject, None);
        session.transition(
            "morgan",
            sam,
            TransitionAction::Reject,
            Some("Quarterly audit that week"),
        );
    }

    println!("\nEmployee follow-ups");
    if let Some(jordan) = &jordan {
        session.balance("jordan");
        session.transition("jordan", jordan, TransitionAction::Withdraw, None);
        session.balance("jordan");
    }
    if let Some(alex) = &alex {
        session.transition("alex", alex, TransitionAction::Cancel, Some("Trip postponed"));
        session.balance("alex");
    }

    println!("\nManager dashboard");
    let dashboard = session.service.dashboard(&session.ctx("morgan"))?;
    println!(
        "- morgan: {} own request(s), {} awaiting their decision",
        dashboard.my_requests.len(),
        dashboard.pending_for_you.map_or(0, |pending| pending.len())
    );

    Ok(())
}

struct DemoSession {
    service: DemoService,
    today: NaiveDate,
}

impl DemoSession {
    fn ctx(&self, actor: &str) -> RequestContext {
        let now = self
            .today
            .and_hms_opt(9, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or_else(Utc::now);
        RequestContext::new(EmployeeId::new(actor), now)
    }

    fn submit(&self, employee: &str, start: NaiveDate, end: NaiveDate) -> Option<LeaveRequest> {
        let draft = LeaveDraft {
            employee: EmployeeId::new(employee),
            category: CategoryId::new("vacation"),
            title: format!("{employee} time away"),
            description: String::new(),
            start_date: start,
            end_date: end,
            hours_per_day: 8.0,
        };
        match self.service.submit(draft, &self.ctx(employee)) {
            Ok(request) => {
                println!(
                    "- {employee} submitted {} ({} -> {}), status {}",
                    request.id, request.start_date, request.end_date, request.status
                );
                Some(request)
            }
            Err(err) => {
                report_failure(employee, "submit", &err);
                None
            }
        }
    }

    fn transition(
        &self,
        actor: &str,
        request: &LeaveRequest,
        action: TransitionAction,
        explanation: Option<&str>,
    ) {
        match self.service.transition(
            &request.id,
            action,
            &self.ctx(actor),
            explanation.map(str::to_string),
        ) {
            Ok(updated) => println!(
                "- {actor} {action} {} -> {}{}",
                updated.id,
                updated.status,
                updated
                    .explanation
                    .as_deref()
                    .map(|text| format!(" ({text})"))
                    .unwrap_or_default()
            ),
            Err(err) => report_failure(actor, action.label(), &err),
        }
    }

    fn balance(&self, employee: &str) {
        match self.service.balances(&self.ctx(employee)) {
            Ok(balances) => {
                for balance in balances {
                    println!(
                        "  {employee} {}: {}/{} hours remaining",
                        balance.category, balance.remaining_hours, balance.allocated_hours
                    );
                }
            }
            Err(err) => report_failure(employee, "read balances", &err),
        }
    }
}

fn report_failure(actor: &str, action: &str, err: &LeaveServiceError) {
    match err {
        LeaveServiceError::Validation(result) => {
            println!("- {actor} could not {action}:");
            for message in result.messages() {
                println!("    * {message}");
            }
        }
        other => println!("- {actor} could not {action}: {other}"),
    }
}

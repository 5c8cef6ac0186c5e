use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use vts::error::AppError;
use vts::workflows::leave::{
    InMemoryLeaveStore, LeaveNotice, LeaveServiceError, NoticeError, NoticePublisher,
    OrganizationSeed,
};

const SAMPLE_ORGANIZATION: &str = include_str!("../seed/organization.json");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Publisher that hands notices to the log; mail delivery lives elsewhere.
#[derive(Debug, Default, Clone)]
pub(crate) struct LoggingNoticePublisher;

impl NoticePublisher for LoggingNoticePublisher {
    fn publish(&self, notice: LeaveNotice) -> Result<(), NoticeError> {
        info!(
            template = %notice.template,
            request = %notice.request_id,
            recipient = %notice.recipient,
            "leave notice queued"
        );
        Ok(())
    }
}

pub(crate) fn sample_organization() -> Result<OrganizationSeed, AppError> {
    Ok(serde_json::from_str(SAMPLE_ORGANIZATION)?)
}

/// Hydrate a store from `path`, falling back to the bundled sample organization.
pub(crate) fn load_store(path: Option<&Path>) -> Result<InMemoryLeaveStore, AppError> {
    let seed = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        }
        None => sample_organization()?,
    };
    let store = InMemoryLeaveStore::from_seed(seed);
    let locations = store.locations().map_err(LeaveServiceError::from)?;
    let categories = store.categories().map_err(LeaveServiceError::from)?;
    info!(
        locations = locations.len(),
        categories = categories.len(),
        seed = ?path,
        "organization loaded"
    );
    Ok(store)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

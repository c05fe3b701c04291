use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use onroute_policy::error::AppError;
use onroute_policy::policy::{PermitDateFormat, Policy};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Read and check a policy definition file.
pub(crate) fn load_policy(path: &Path, date_format: PermitDateFormat) -> Result<Policy, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let policy = Policy::from_json(&raw)?.with_date_format(date_format);

    info!(
        path = %path.display(),
        version = %policy.version(),
        permit_types = policy.permit_types().len(),
        "loaded policy definition"
    );

    Ok(policy)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

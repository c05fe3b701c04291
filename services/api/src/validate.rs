use crate::infra::{load_policy, parse_date};
use chrono::NaiveDate;
use clap::Args;
use onroute_policy::config::AppConfig;
use onroute_policy::error::AppError;
use onroute_policy::policy::{FixedClock, ValidationResult};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Policy definition file (defaults to POLICY_DEFINITION_PATH)
    #[arg(long)]
    pub(crate) policy: Option<PathBuf>,
    /// Permit application JSON file; `null` validates an empty application
    #[arg(long)]
    pub(crate) application: PathBuf,
    /// Validation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let policy_path = args
        .policy
        .unwrap_or_else(|| config.policy.definition_path.clone());

    let mut policy = load_policy(&policy_path, config.policy.permit_date_format())?;
    if let Some(today) = args.today {
        policy = policy.with_clock(FixedClock(today));
    }

    let application = read_application(&args.application)?;
    let result = policy.validate_document(&application).await;

    println!("{}", render_result(&result)?);
    eprintln!("{}", summary_line(&result));
    Ok(())
}

fn read_application(path: &Path) -> Result<Value, AppError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(AppError::InvalidApplication)
}

fn render_result(result: &ValidationResult) -> Result<String, AppError> {
    serde_json::to_string_pretty(result).map_err(AppError::Output)
}

fn summary_line(result: &ValidationResult) -> String {
    let verdict = if result.is_valid() { "valid" } else { "invalid" };
    format!(
        "{verdict}: {} violation(s), {} requirement(s), {} warning(s), {} information",
        result.violations.len(),
        result.requirements.len(),
        result.warnings.len(),
        result.information.len()
    )
}

use std::fmt::{self, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate};

/// Format string that chrono cannot render as a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid permit date format")]
pub struct InvalidDateFormat(pub String);

/// Format used for every permit date, shared by fact transformation and the
/// `dateLessThan` operator so both sides agree on how dates are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitDateFormat(String);

impl PermitDateFormat {
    pub const DEFAULT: &'static str = "%Y-%m-%d";

    /// Accepts only formats that render a bare date; time and offset
    /// specifiers are rejected along with malformed ones.
    pub fn new(format: impl Into<String>) -> Result<Self, InvalidDateFormat> {
        let format = format.into();
        if is_valid_date_format(&format) {
            Ok(Self(format))
        } else {
            Err(InvalidDateFormat(format))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), &self.0).ok()
    }

    pub fn format(&self, date: NaiveDate) -> String {
        date.format(&self.0).to_string()
    }
}

impl Default for PermitDateFormat {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl TryFrom<&str> for PermitDateFormat {
    type Error = InvalidDateFormat;

    fn try_from(format: &str) -> Result<Self, Self::Error> {
        Self::new(format)
    }
}

pub fn is_valid_date_format(format: &str) -> bool {
    if format.trim().is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return false;
    }

    let Some(sample) = NaiveDate::from_ymd_opt(2000, 1, 1) else {
        return false;
    };
    let mut rendered = String::new();
    write!(rendered, "{}", sample.format(format)).is_ok()
}

impl fmt::Display for PermitDateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the reference date used for "not in the past" checks.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Reads the local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Pins validation to a known date; used by tests and replayed validations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

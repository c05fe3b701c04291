use std::collections::BTreeMap;

use chrono::{Days, Months, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};

use super::application::PermitApplication;
use super::dates::PermitDateFormat;

pub const VALIDATION_DATE_FACT: &str = "validationDate";
pub const DAYS_IN_PERMIT_YEAR_FACT: &str = "daysInPermitYear";
pub const EXPIRY_DATE_FACT: &str = "expiryDate";
pub const ALLOWED_VEHICLES_FACT: &str = "allowedVehicles";
pub const GLOBAL_WEIGHT_DEFAULTS_FACT: &str = "globalWeightDefaults";
pub const GLOBAL_SIZE_DEFAULTS_FACT: &str = "globalSizeDefaults";

/// Flat, name-addressed facts consumed by rule conditions.
///
/// Nested application fields are keyed by their dotted path
/// (`permitData.vehicleDetails.vin`); intermediate objects are kept under
/// their own key so conditions can still select into them with a `path`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactMap(BTreeMap<String, Value>);

impl FactMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Look up a fact and apply an optional path selector.
    ///
    /// Returns `None` only when the fact itself is unknown; a path that
    /// selects nothing yields `Value::Null`.
    pub fn resolve(&self, name: &str, path: Option<&str>) -> Option<Value> {
        let value = self.0.get(name)?;
        match path {
            Some(path) => Some(select_path(value, path).cloned().unwrap_or(Value::Null)),
            None => Some(value.clone()),
        }
    }
}

/// Select into a JSON value with a `$.a.b[0]` style path.
pub fn select_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);

    let mut current = value;
    for segment in trimmed.split('.').filter(|segment| !segment.is_empty()) {
        let (key, indices) = match segment.find('[') {
            Some(position) => segment.split_at(position),
            None => (segment, ""),
        };

        if !key.is_empty() {
            current = current.get(key)?;
        }

        for index in indices
            .split(|c: char| c == '[' || c == ']')
            .filter(|index| !index.is_empty())
        {
            let index: usize = index.trim().parse().ok()?;
            current = current.get(index)?;
        }
    }

    Some(current)
}

/// Truthiness in the sense rule authors expect from JSON documents.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_f64()
            .map(|n| n != 0.0 && !n.is_nan())
            .unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Build the fact map for an application.
///
/// A missing application is treated as an empty one: every expected key is
/// still present, holding `null`.
pub fn transform_permit_facts(
    application: Option<&PermitApplication>,
    validation_date: NaiveDate,
    format: &PermitDateFormat,
) -> FactMap {
    let document = application
        .and_then(|application| serde_json::to_value(application).ok())
        .unwrap_or(Value::Null);
    transform_permit_document(&document, validation_date, format)
}

/// Build the fact map from an application exactly as submitted.
///
/// The document is laid over an empty application so every expected key
/// exists. Values of the wrong type are kept as-is for the rules to judge;
/// a non-object where a section is expected leaves that section empty.
pub fn transform_permit_document(
    document: &Value,
    validation_date: NaiveDate,
    format: &PermitDateFormat,
) -> FactMap {
    let mut merged = serde_json::to_value(PermitApplication::default())
        .unwrap_or_else(|_| Value::Object(Map::new()));
    overlay(&mut merged, document);

    let mut facts = FactMap::new();
    flatten_into(&mut facts, "", &merged);

    let start_date = merged
        .pointer("/permitData/startDate")
        .and_then(Value::as_str)
        .and_then(|raw| format.parse(raw));
    let duration = merged
        .pointer("/permitData/permitDuration")
        .and_then(Value::as_i64);

    facts.insert(VALIDATION_DATE_FACT, format.format(validation_date));
    facts.insert(
        DAYS_IN_PERMIT_YEAR_FACT,
        start_date
            .and_then(days_in_permit_year)
            .map(Value::from)
            .unwrap_or(Value::Null),
    );
    facts.insert(
        EXPIRY_DATE_FACT,
        start_date
            .zip(duration)
            .and_then(|(start, duration)| expiry_date(start, duration))
            .map(|date| Value::from(format.format(date)))
            .unwrap_or(Value::Null),
    );

    facts
}

fn overlay(base: &mut Value, document: &Value) {
    match base {
        Value::Object(slots) => {
            let Value::Object(fields) = document else {
                return;
            };
            for (key, value) in fields {
                match slots.get_mut(key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        slots.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        slot => {
            if !document.is_null() {
                *slot = document.clone();
            }
        }
    }
}

fn flatten_into(facts: &mut FactMap, prefix: &str, value: &Value) {
    let Value::Object(fields) = value else {
        return;
    };

    for (key, child) in fields {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        flatten_into(facts, &name, child);
        facts.insert(name, child.clone());
    }
}

/// Days between `start` and the same calendar date one year later.
pub fn days_in_permit_year(start: NaiveDate) -> Option<i64> {
    let end = start.checked_add_months(Months::new(12))?;
    Some((end - start).num_days())
}

/// Last day covered by a permit of `duration` days starting on `start`.
pub fn expiry_date(start: NaiveDate, duration: i64) -> Option<NaiveDate> {
    if duration < 1 {
        return None;
    }
    start.checked_add_days(Days::new((duration - 1) as u64))
}

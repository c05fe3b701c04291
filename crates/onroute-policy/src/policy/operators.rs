use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::dates::PermitDateFormat;

/// Named binary predicate usable from a rule condition.
///
/// `accepts` guards the fact side of the comparison; when it rejects the
/// input the condition is simply not satisfied.
#[async_trait]
pub trait Operator: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, _fact: &Value) -> bool {
        true
    }

    async fn evaluate(&self, fact: &Value, value: &Value) -> bool;
}

/// Operator backed by plain synchronous functions.
pub struct FnOperator {
    name: &'static str,
    accepts: fn(&Value) -> bool,
    compare: fn(&Value, &Value) -> bool,
}

impl FnOperator {
    pub const fn new(
        name: &'static str,
        accepts: fn(&Value) -> bool,
        compare: fn(&Value, &Value) -> bool,
    ) -> Self {
        Self {
            name,
            accepts,
            compare,
        }
    }
}

#[async_trait]
impl Operator for FnOperator {
    fn name(&self) -> &str {
        self.name
    }

    fn accepts(&self, fact: &Value) -> bool {
        (self.accepts)(fact)
    }

    async fn evaluate(&self, fact: &Value, value: &Value) -> bool {
        (self.compare)(fact, value)
    }
}

/// `dateLessThan`: both sides parsed with the shared permit date format.
pub struct DateLessThan {
    format: PermitDateFormat,
}

impl DateLessThan {
    pub const NAME: &'static str = "dateLessThan";

    pub fn new(format: PermitDateFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl Operator for DateLessThan {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn accepts(&self, fact: &Value) -> bool {
        fact.as_str().and_then(|raw| self.format.parse(raw)).is_some()
    }

    async fn evaluate(&self, fact: &Value, value: &Value) -> bool {
        let left = fact.as_str().and_then(|raw| self.format.parse(raw));
        let right = value.as_str().and_then(|raw| self.format.parse(raw));
        match (left, right) {
            (Some(left), Some(right)) => left < right,
            _ => false,
        }
    }
}

/// `regex`: matches string facts against a pattern, compiling each distinct
/// pattern once per operator instance. Invalid patterns never match.
#[derive(Default)]
pub struct RegexMatch {
    patterns: Mutex<HashMap<String, Option<Regex>>>,
}

impl RegexMatch {
    pub const NAME: &'static str = "regex";

    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct patterns seen so far, valid or not.
    pub fn cached_patterns(&self) -> usize {
        self.patterns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn compiled(&self, pattern: &str) -> Option<Regex> {
        let mut patterns = self.patterns.lock().unwrap_or_else(PoisonError::into_inner);
        patterns
            .entry(pattern.to_string())
            .or_insert_with(|| compile_pattern(pattern))
            .clone()
    }
}

#[async_trait]
impl Operator for RegexMatch {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn accepts(&self, fact: &Value) -> bool {
        fact.is_string()
    }

    async fn evaluate(&self, fact: &Value, value: &Value) -> bool {
        let (Some(text), Some(pattern)) = (fact.as_str(), value.as_str()) else {
            return false;
        };
        self.compiled(pattern)
            .map(|regex| regex.is_match(text))
            .unwrap_or(false)
    }
}

/// Registry of operators available to one engine instance.
#[derive(Clone, Default)]
pub struct OperatorSet {
    operators: BTreeMap<String, Arc<dyn Operator>>,
}

impl OperatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in comparison family plus the permit-specific operators.
    pub fn standard(format: &PermitDateFormat) -> Self {
        builtin_operators()
            .into_iter()
            .chain(custom_operators(format))
            .fold(Self::new(), Self::with)
    }

    pub fn with(mut self, operator: Arc<dyn Operator>) -> Self {
        self.register(operator);
        self
    }

    /// Add an operator, returning any previous registration under that name.
    pub fn register(&mut self, operator: Arc<dyn Operator>) -> Option<Arc<dyn Operator>> {
        self.operators.insert(operator.name().to_string(), operator)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Operator>> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(String::as_str)
    }
}

impl fmt::Debug for OperatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Comparison operators every rule-set can rely on.
pub fn builtin_operators() -> Vec<Arc<dyn Operator>> {
    vec![
        operator("equal", any_value, values_equal),
        operator("notEqual", any_value, |a, b| !values_equal(a, b)),
        operator("lessThan", is_number, |a, b| {
            compare_numbers(a, b, |a, b| a < b)
        }),
        operator("lessThanInclusive", is_number, |a, b| {
            compare_numbers(a, b, |a, b| a <= b)
        }),
        operator("greaterThan", is_number, |a, b| {
            compare_numbers(a, b, |a, b| a > b)
        }),
        operator("greaterThanInclusive", is_number, |a, b| {
            compare_numbers(a, b, |a, b| a >= b)
        }),
        operator("in", any_value, |a, b| {
            b.as_array()
                .map(|items| items.iter().any(|item| values_equal(a, item)))
                .unwrap_or(false)
        }),
        operator("notIn", any_value, |a, b| {
            b.as_array()
                .map(|items| !items.iter().any(|item| values_equal(a, item)))
                .unwrap_or(false)
        }),
        operator("contains", Value::is_array, array_contains),
        operator("doesNotContain", Value::is_array, |a, b| !array_contains(a, b)),
    ]
}

/// Permit-specific operators. Built fresh for every engine so no state is
/// shared between policies.
pub fn custom_operators(format: &PermitDateFormat) -> Vec<Arc<dyn Operator>> {
    vec![
        operator("stringMinimumLength", Value::is_string, string_minimum_length),
        Arc::new(DateLessThan::new(format.clone())) as Arc<dyn Operator>,
        Arc::new(RegexMatch::new()) as Arc<dyn Operator>,
    ]
}

pub fn string_minimum_length(fact: &Value, value: &Value) -> bool {
    let (Some(text), Some(minimum)) = (fact.as_str(), value.as_f64()) else {
        return false;
    };
    text.trim().chars().count() as f64 >= minimum
}

pub fn regex_matches(fact: &Value, value: &Value) -> bool {
    let (Some(text), Some(pattern)) = (fact.as_str(), value.as_str()) else {
        return false;
    };

    compile_pattern(pattern)
        .map(|regex| regex.is_match(text))
        .unwrap_or(false)
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(error) => {
            warn!(%pattern, %error, "regex operator received an invalid pattern");
            None
        }
    }
}

fn operator(
    name: &'static str,
    accepts: fn(&Value) -> bool,
    compare: fn(&Value, &Value) -> bool,
) -> Arc<dyn Operator> {
    Arc::new(FnOperator::new(name, accepts, compare))
}

fn any_value(_: &Value) -> bool {
    true
}

fn is_number(value: &Value) -> bool {
    value.is_number()
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(left), Some(right)) if a.is_number() && b.is_number() => left == right,
        _ => a == b,
    }
}

fn compare_numbers(a: &Value, b: &Value, compare: fn(f64, f64) -> bool) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(left), Some(right)) => compare(left, right),
        _ => false,
    }
}

fn array_contains(haystack: &Value, needle: &Value) -> bool {
    haystack
        .as_array()
        .map(|items| items.iter().any(|item| values_equal(item, needle)))
        .unwrap_or(false)
}

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::application::PermitApplication;
use super::dates::{Clock, InvalidDateFormat, PermitDateFormat, SystemClock};
use super::definition::{IdentifiedObject, PermitTypeDefinition, PolicyDefinition};
use super::engine::{RuleEngine, RuleEvaluator};
use super::facts::{
    transform_permit_document, FactMap, ALLOWED_VEHICLES_FACT, GLOBAL_SIZE_DEFAULTS_FACT,
    GLOBAL_WEIGHT_DEFAULTS_FACT,
};
use super::helpers::{
    extract_identified_objects, filter_id_map, find_duplicate_id, intersect_id_maps, to_id_map,
    IdMap,
};
use super::operators::OperatorSet;
use super::result::{EventKind, ValidationResult};
use super::rules::Rule;

pub const INVALID_PERMIT_TYPE_CODE: &str = "invalid-permit-type";

/// Configuration defects detected while building a [`Policy`].
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("policy definition must be a JSON object")]
    NotAnObject,
    #[error("policy definition is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("rule {location} is malformed: {source}")]
    InvalidRule {
        location: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    InvalidDateFormat(#[from] InvalidDateFormat),
    #[error("permit type '{0}' is defined more than once")]
    DuplicatePermitType(String),
    #[error("vehicle type '{0}' is defined more than once")]
    DuplicateVehicleType(String),
    #[error("permit type '{permit_type}' allows unknown vehicle type '{vehicle}'")]
    UnknownAllowedVehicle { permit_type: String, vehicle: String },
}

/// Power units and trailers a permit type may be issued for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermittableVehicles {
    pub power_units: IdMap,
    pub trailers: IdMap,
}

/// Validates permit applications against one immutable policy definition.
#[derive(Clone)]
pub struct Policy {
    definition: Arc<PolicyDefinition>,
    evaluator: Arc<dyn RuleEvaluator>,
    clock: Arc<dyn Clock>,
    date_format: PermitDateFormat,
    /// False once a caller supplies its own evaluator.
    standard_engine: bool,
}

impl Policy {
    pub fn new(definition: PolicyDefinition) -> Result<Self, PolicyError> {
        check_definition(&definition)?;

        let date_format = PermitDateFormat::default();
        let engine = RuleEngine::new(OperatorSet::standard(&date_format));
        warn_unregistered_operators(&definition, engine.operators());

        Ok(Self {
            definition: Arc::new(definition),
            evaluator: Arc::new(engine),
            clock: Arc::new(SystemClock),
            date_format,
            standard_engine: true,
        })
    }

    pub fn from_value(value: Value) -> Result<Self, PolicyError> {
        if !value.is_object() {
            return Err(PolicyError::NotAnObject);
        }
        if let Some(error) = find_malformed_rule(&value) {
            return Err(error);
        }
        let definition: PolicyDefinition = serde_json::from_value(value)?;
        Self::new(definition)
    }

    pub fn from_json(raw: &str) -> Result<Self, PolicyError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl RuleEvaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self.standard_engine = false;
        self
    }

    /// Switch the permit date format. The standard rule engine is rebuilt so
    /// `dateLessThan` reads dates the same way the fact transformer does; a
    /// caller-supplied evaluator is kept as is.
    pub fn with_date_format(mut self, date_format: PermitDateFormat) -> Self {
        if self.standard_engine {
            self.evaluator = Arc::new(RuleEngine::new(OperatorSet::standard(&date_format)));
        }
        self.date_format = date_format;
        self
    }

    pub fn policy_definition(&self) -> &PolicyDefinition {
        &self.definition
    }

    pub fn version(&self) -> &str {
        &self.definition.version
    }

    pub fn date_format(&self) -> &PermitDateFormat {
        &self.date_format
    }

    pub fn permit_type(&self, id: &str) -> Option<&PermitTypeDefinition> {
        self.definition.permit_type(id)
    }

    /// Facts the rule engine sees for `application`.
    pub fn build_facts(&self, application: Option<&PermitApplication>) -> FactMap {
        self.build_document_facts(&application_document(application))
    }

    /// Facts for an application document as submitted, before any typing.
    pub fn build_document_facts(&self, document: &Value) -> FactMap {
        let permit_type = permit_type_id(document).and_then(|id| self.definition.permit_type(id));

        let mut facts = transform_permit_document(document, self.clock.today(), &self.date_format);
        let allowed_vehicles = permit_type
            .map(|permit_type| permit_type.allowed_vehicles.clone())
            .unwrap_or_default();
        facts.insert(ALLOWED_VEHICLES_FACT, allowed_vehicles);
        facts.insert(
            GLOBAL_WEIGHT_DEFAULTS_FACT,
            self.definition.global_weight_defaults.clone(),
        );
        facts.insert(
            GLOBAL_SIZE_DEFAULTS_FACT,
            self.definition.global_size_defaults.clone(),
        );
        facts
    }

    /// Run common rules plus the rules of the application's permit type.
    ///
    /// An unknown permit type is reported as a single violation; common rules
    /// still run against the application.
    pub async fn validate(&self, application: Option<&PermitApplication>) -> ValidationResult {
        self.validate_document(&application_document(application))
            .await
    }

    /// Validate an application document without requiring it to match
    /// [`PermitApplication`]. Missing, null or mistyped fields reach the
    /// rules as facts and come back as violations.
    pub async fn validate_document(&self, document: &Value) -> ValidationResult {
        let permit_type_id = permit_type_id(document);
        let permit_type = permit_type_id.and_then(|id| self.definition.permit_type(id));
        let facts = self.build_document_facts(document);

        let mut rule_sets: Vec<&[Rule]> = vec![self.definition.common_rules.as_slice()];
        if let Some(permit_type) = permit_type {
            rule_sets.push(&permit_type.rules);
        }

        let run = self.evaluator.evaluate(&facts, &rule_sets).await;

        let mut result = ValidationResult::default();
        if permit_type.is_none() {
            result.push(
                EventKind::Violation,
                json!({
                    "code": INVALID_PERMIT_TYPE_CODE,
                    "message": format!(
                        "Permit type '{}' is not valid",
                        permit_type_id.unwrap_or_default()
                    ),
                }),
            );
        }
        for event in &run.events {
            result.record(event);
        }

        debug!(
            policy_version = %self.definition.version,
            permit_type = permit_type_id.unwrap_or_default(),
            violations = result.violations.len(),
            requirements = result.requirements.len(),
            warnings = result.warnings.len(),
            information = result.information.len(),
            failed_rules = run.failures.len(),
            "validated permit application"
        );

        result
    }

    pub fn permit_types(&self) -> IdMap {
        self.definition
            .permit_types
            .iter()
            .map(|permit_type| (permit_type.id.clone(), permit_type.name.clone()))
            .collect()
    }

    pub fn power_unit_types(&self) -> IdMap {
        to_id_map(&self.definition.vehicle_types.power_unit_types)
    }

    pub fn trailer_types(&self) -> IdMap {
        to_id_map(&self.definition.vehicle_types.trailer_types)
    }

    pub fn commodities(&self) -> IdMap {
        to_id_map(&self.definition.commodities)
    }

    /// Catalog entries for the vehicles a permit type allows.
    pub fn allowed_vehicle_types(&self, permit_type_id: &str) -> Vec<IdentifiedObject> {
        let Some(permit_type) = self.definition.permit_type(permit_type_id) else {
            return Vec::new();
        };
        let catalog: Vec<IdentifiedObject> =
            self.definition.vehicle_types.iter().cloned().collect();
        extract_identified_objects(&catalog, &permit_type.allowed_vehicles)
    }

    pub fn permittable_vehicle_types(&self, permit_type_id: &str) -> Option<PermittableVehicles> {
        let permit_type = self.definition.permit_type(permit_type_id)?;
        let allowed = filter_id_map(
            &to_id_map(self.definition.vehicle_types.iter()),
            &permit_type.allowed_vehicles,
        );

        Some(PermittableVehicles {
            power_units: intersect_id_maps(&self.power_unit_types(), &allowed),
            trailers: intersect_id_maps(&self.trailer_types(), &allowed),
        })
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("version", &self.definition.version)
            .field("permit_types", &self.definition.permit_types.len())
            .field("common_rules", &self.definition.common_rules.len())
            .field("date_format", &self.date_format.as_str())
            .finish()
    }
}

fn application_document(application: Option<&PermitApplication>) -> Value {
    application
        .and_then(|application| serde_json::to_value(application).ok())
        .unwrap_or(Value::Null)
}

fn permit_type_id(document: &Value) -> Option<&str> {
    document.get("permitType").and_then(Value::as_str)
}

/// Parse each raw rule on its own so a broken one can be named.
fn find_malformed_rule(value: &Value) -> Option<PolicyError> {
    let common = value
        .get("commonRules")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(index, rule)| (format!("commonRules[{index}]"), rule));

    let specific = value
        .get("permitTypes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .flat_map(|permit_type| {
            let id = permit_type
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            permit_type
                .get("rules")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .enumerate()
                .map(move |(index, rule)| (format!("permitTypes[{id}].rules[{index}]"), rule))
        });

    common.chain(specific).find_map(|(location, rule)| {
        let source = Rule::deserialize(rule).err()?;
        let location = match rule.get("name").and_then(Value::as_str) {
            Some(name) => format!("{location} '{name}'"),
            None => location,
        };
        Some(PolicyError::InvalidRule { location, source })
    })
}

fn check_definition(definition: &PolicyDefinition) -> Result<(), PolicyError> {
    let permit_type_ids = definition
        .permit_types
        .iter()
        .map(|permit_type| permit_type.id.as_str());
    if let Some(id) = find_duplicate_id(permit_type_ids) {
        return Err(PolicyError::DuplicatePermitType(id.to_string()));
    }

    let vehicle_ids = definition
        .vehicle_types
        .iter()
        .map(|vehicle| vehicle.id.as_str());
    if let Some(id) = find_duplicate_id(vehicle_ids) {
        return Err(PolicyError::DuplicateVehicleType(id.to_string()));
    }

    let known: BTreeSet<&str> = definition
        .vehicle_types
        .iter()
        .map(|vehicle| vehicle.id.as_str())
        .collect();
    for permit_type in &definition.permit_types {
        if let Some(vehicle) = permit_type
            .allowed_vehicles
            .iter()
            .find(|vehicle| !known.contains(vehicle.as_str()))
        {
            return Err(PolicyError::UnknownAllowedVehicle {
                permit_type: permit_type.id.clone(),
                vehicle: vehicle.clone(),
            });
        }
    }

    Ok(())
}

fn warn_unregistered_operators(definition: &PolicyDefinition, operators: &OperatorSet) {
    let rules = definition.common_rules.iter().chain(
        definition
            .permit_types
            .iter()
            .flat_map(|permit_type| permit_type.rules.iter()),
    );

    for rule in rules {
        for comparison in rule.conditions.comparisons() {
            if !operators.contains(&comparison.operator) {
                warn!(
                    rule = %rule.label(),
                    operator = %comparison.operator,
                    "rule references an unregistered operator and will never fire"
                );
            }
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::{json, Value};

use super::common::*;
use crate::policy::{
    EngineRun, EventKind, FactMap, FixedClock, IdentifiedObject, InvalidDateFormat,
    PermitApplication, PermitDateFormat, Policy, PolicyDefinition, PolicyError, Rule,
    RuleEvaluator, INVALID_PERMIT_TYPE_CODE,
};

#[test]
fn keeps_the_definition_it_was_built_from() {
    let definition = tros_only_definition();
    let policy = Policy::new(definition.clone()).expect("policy builds");

    assert_eq!(policy.policy_definition(), &definition);
    assert_eq!(policy.version(), "2025.06.01.001");
}

#[tokio::test]
async fn valid_application_has_no_violations() {
    let policy = tros_only_policy();

    let result = policy.validate(Some(&valid_application())).await;

    assert!(result.is_valid(), "unexpected violations: {:?}", result.violations);
    assert!(result.requirements.is_empty());
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn start_date_in_the_past_is_the_only_violation() {
    let policy = tros_only_policy();
    let application: PermitApplication =
        serde_json::from_value(application_json(today() - Duration::days(1)))
            .expect("application parses");

    let result = policy.validate(Some(&application)).await;

    assert_eq!(
        result.messages(EventKind::Violation),
        vec!["Permit start date cannot be in the past"]
    );
}

#[tokio::test]
async fn unknown_permit_type_is_reported_once() {
    let policy = tros_only_policy();
    let mut application = valid_application();
    application.permit_type = Some("__INVALID".to_string());

    let result = policy.validate(Some(&application)).await;

    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0]["code"], json!(INVALID_PERMIT_TYPE_CODE));
    assert_eq!(
        result.violations[0]["message"],
        json!("Permit type '__INVALID' is not valid")
    );
}

#[tokio::test]
async fn unknown_vehicle_subtype_is_not_permittable() {
    let policy = tros_only_policy();
    let mut application = valid_application();
    application.permit_data.vehicle_details.vehicle_sub_type = Some("__INVALID".to_string());

    let result = policy.validate(Some(&application)).await;

    assert_eq!(
        result.messages(EventKind::Violation),
        vec!["Vehicle type not permittable for this permit type"]
    );
}

#[tokio::test]
async fn empty_allowed_vehicles_rejects_every_subtype() {
    let mut definition = tros_only_definition();
    definition.permit_types[0].allowed_vehicles.clear();
    let policy = Policy::new(definition)
        .expect("policy builds")
        .with_clock(FixedClock(today()));

    for sub_type in ["TRKTRAC", "SEMITRL", "JEEPSRG", "__INVALID"] {
        let mut application = valid_application();
        application.permit_data.vehicle_details.vehicle_sub_type = Some(sub_type.to_string());

        let result = policy.validate(Some(&application)).await;

        assert!(
            !result.violations.is_empty(),
            "{sub_type} should not be permittable"
        );
    }
}

#[tokio::test]
async fn full_year_duration_is_accepted() {
    let policy = tros_only_policy();

    let mut application = valid_application();
    application.permit_data.permit_duration = Some(365);
    assert!(policy.validate(Some(&application)).await.is_valid());

    application.permit_data.permit_duration = Some(45);
    let result = policy.validate(Some(&application)).await;
    assert_eq!(
        result.messages(EventKind::Violation),
        vec!["Duration must be in 30 day increments or a full calendar year"]
    );
}

fn bucket_rules() -> Value {
    json!([
        {
            "name": "client-number",
            "conditions": { "not": {
                "fact": "permitData.clientNumber",
                "operator": "stringMinimumLength",
                "value": 1
            } },
            "event": { "type": "violation", "params": { "message": "Client number is required" } }
        },
        {
            "name": "commodity-details",
            "conditions": { "fact": "permitData.commodities", "operator": "equal", "value": [] },
            "event": { "type": "requirement", "params": { "message": "Commodity details required" } }
        },
        {
            "name": "long-duration",
            "conditions": { "fact": "permitData.permitDuration", "operator": "greaterThanInclusive", "value": 30 },
            "event": { "type": "warning", "params": { "message": "Check duration against route" } }
        },
        {
            "name": "policy-version",
            "conditions": { "all": [] },
            "event": { "type": "information", "params": { "message": "Validated against current policy" } }
        },
        {
            "name": "no-message",
            "conditions": { "all": [] },
            "event": { "type": "information", "params": { "code": "audit-trail" } }
        },
        {
            "name": "no-params",
            "conditions": { "all": [] },
            "event": { "type": "information" }
        },
        {
            "name": "unrecognized",
            "conditions": { "all": [] },
            "event": { "type": "escalation", "params": { "message": "Escalate to officer" } }
        }
    ])
}

fn bucket_policy() -> Policy {
    let mut definition = tros_only_definition();
    let rules: Vec<Rule> = serde_json::from_value(bucket_rules()).expect("rules parse");
    definition.permit_types[0].rules.extend(rules);
    Policy::new(definition)
        .expect("policy builds")
        .with_clock(FixedClock(today()))
}

#[tokio::test]
async fn events_are_classified_into_buckets() {
    let policy = bucket_policy();
    let mut application = valid_application();
    application.permit_data.client_number = None;

    let result = policy.validate(Some(&application)).await;

    assert_eq!(
        result.messages(EventKind::Violation),
        vec!["Client number is required", "Escalate to officer"]
    );
    assert_eq!(
        result.messages(EventKind::Requirement),
        vec!["Commodity details required"]
    );
    assert_eq!(
        result.messages(EventKind::Warning),
        vec!["Check duration against route"]
    );
    assert_eq!(result.information.len(), 3);
    assert_eq!(
        result.messages(EventKind::Information),
        vec!["Validated against current policy"]
    );
    assert_eq!(result.information[1], json!({ "code": "audit-trail" }));
    assert_eq!(result.information[2], json!({ "type": "information" }));
}

#[tokio::test]
async fn missing_application_still_runs_common_rules() {
    let policy = tros_only_policy();

    let result = policy.validate(None).await;

    let messages = result.messages(EventKind::Violation);
    assert!(messages.contains(&"Company name is required"));
    assert!(messages.contains(&"Contact email is invalid"));
    assert!(messages.contains(&"Permit type '' is not valid"));
}

#[tokio::test]
async fn repeated_validation_is_identical() {
    let policy = bucket_policy();
    let application = valid_application();

    let first = policy.validate(Some(&application)).await;
    let second = policy.validate(Some(&application)).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn concurrent_validations_do_not_interfere() {
    let policy = Arc::new(tros_only_policy());
    let valid = valid_application();
    let mut stale = valid_application();
    stale.permit_data.start_date = Some(iso(today() - Duration::days(3)));

    let (a, b, c) = tokio::join!(
        policy.validate(Some(&valid)),
        policy.validate(Some(&stale)),
        policy.validate(Some(&valid)),
    );

    assert!(a.is_valid());
    assert_eq!(b.violations.len(), 1);
    assert_eq!(a, c);

    let shared = Arc::clone(&policy);
    let handle = tokio::spawn(async move { shared.validate(None).await });
    let from_task = handle.await.expect("task joins");
    assert!(!from_task.is_valid());
}

#[tokio::test]
async fn alternate_date_format_applies_to_facts_and_operators() {
    let format = PermitDateFormat::new("%d/%m/%Y").expect("valid format");
    let policy = tros_only_policy().with_date_format(format.clone());
    let mut application = valid_application();
    application.permit_data.start_date = Some(format.format(today()));

    assert!(policy.validate(Some(&application)).await.is_valid());

    application.permit_data.start_date = Some(format.format(today() - Duration::days(1)));
    assert_eq!(policy.validate(Some(&application)).await.violations.len(), 1);
}

struct Silent;

#[async_trait]
impl RuleEvaluator for Silent {
    async fn evaluate(&self, _facts: &FactMap, _rule_sets: &[&[Rule]]) -> EngineRun {
        EngineRun::default()
    }
}

#[tokio::test]
async fn evaluator_can_be_swapped() {
    let policy = tros_only_policy().with_evaluator(Silent);

    let result = policy.validate(None).await;

    // only the facade's own permit type check remains
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0]["code"], json!(INVALID_PERMIT_TYPE_CODE));
}

#[test]
fn build_facts_carries_policy_context() {
    let policy = tros_only_policy();

    let facts = policy.build_facts(Some(&valid_application()));

    assert_eq!(
        facts.get("allowedVehicles"),
        Some(&json!(["TRKTRAC", "REGTRCK", "SEMITRL"]))
    );
    assert_eq!(facts.get("globalSizeDefaults").map(|v| &v["width"]), Some(&json!(2.6)));

    let orphan = policy.build_facts(None);
    assert_eq!(orphan.get("allowedVehicles"), Some(&json!([])));
}

#[test]
fn catalog_queries_reflect_definition() {
    let policy = tros_only_policy();

    assert_eq!(policy.permit_types().get("TROS").map(String::as_str), Some("Oversize: Term"));
    assert_eq!(policy.power_unit_types().len(), 3);
    assert_eq!(policy.trailer_types().len(), 2);
    assert_eq!(policy.commodities().get("EMPTYXX").map(String::as_str), Some("None"));

    let allowed: Vec<_> = policy
        .allowed_vehicle_types("TROS")
        .into_iter()
        .map(|vehicle| vehicle.id)
        .collect();
    assert_eq!(allowed, vec!["TRKTRAC", "REGTRCK", "SEMITRL"]);
    assert!(policy.allowed_vehicle_types("NOPE").is_empty());

    let permittable = policy
        .permittable_vehicle_types("TROS")
        .expect("permit type exists");
    assert_eq!(
        permittable.power_units.keys().collect::<Vec<_>>(),
        vec!["REGTRCK", "TRKTRAC"]
    );
    assert_eq!(permittable.trailers.keys().collect::<Vec<_>>(), vec!["SEMITRL"]);
    assert!(policy.permittable_vehicle_types("NOPE").is_none());
}

#[test]
fn rejects_duplicate_permit_types() {
    let mut definition = tros_only_definition();
    let duplicate = definition.permit_types[0].clone();
    definition.permit_types.push(duplicate);

    match Policy::new(definition) {
        Err(PolicyError::DuplicatePermitType(id)) => assert_eq!(id, "TROS"),
        other => panic!("expected duplicate permit type, got {other:?}"),
    }
}

#[test]
fn rejects_duplicate_vehicle_types() {
    let mut definition = tros_only_definition();
    definition
        .vehicle_types
        .trailer_types
        .push(IdentifiedObject::new("TRKTRAC", "Shadow Tractor"));

    match Policy::new(definition) {
        Err(PolicyError::DuplicateVehicleType(id)) => assert_eq!(id, "TRKTRAC"),
        other => panic!("expected duplicate vehicle type, got {other:?}"),
    }
}

#[test]
fn rejects_allowed_vehicles_outside_catalog() {
    let mut definition = tros_only_definition();
    definition.permit_types[0]
        .allowed_vehicles
        .push("HOVERCR".to_string());

    match Policy::new(definition) {
        Err(PolicyError::UnknownAllowedVehicle {
            permit_type,
            vehicle,
        }) => {
            assert_eq!(permit_type, "TROS");
            assert_eq!(vehicle, "HOVERCR");
        }
        other => panic!("expected unknown allowed vehicle, got {other:?}"),
    }
}

#[test]
fn parses_definitions_from_json() {
    let raw = serde_json::to_string(&tros_only_definition()).expect("serializes");
    let policy = Policy::from_json(&raw).expect("policy builds");
    assert_eq!(policy.permit_types().len(), 1);

    match Policy::from_json("[]") {
        Err(PolicyError::NotAnObject) => {}
        other => panic!("expected not-an-object, got {other:?}"),
    }
    match Policy::from_json("{ \"permitTypes\": 4 }") {
        Err(PolicyError::Malformed(_)) => {}
        other => panic!("expected malformed definition, got {other:?}"),
    }
}

#[test]
fn minimal_definition_is_well_formed() {
    let definition: PolicyDefinition =
        serde_json::from_value(json!({ "version": "0.0.1" })).expect("parses");
    let policy = Policy::new(definition).expect("policy builds");
    assert!(policy.permit_types().is_empty());

    match serde_json::from_value::<PolicyDefinition>(json!({})) {
        Err(_) => {}
        Ok(definition) => panic!("expected missing version to fail, got {definition:?}"),
    }
}

#[tokio::test]
async fn null_permit_data_is_reported_as_violations() {
    let policy = tros_only_policy();

    let result = policy
        .validate_document(&json!({ "permitType": "TROS", "permitData": null }))
        .await;

    let messages = result.messages(EventKind::Violation);
    assert!(messages.contains(&"Company name is required"));
    assert!(messages.contains(&"Vehicle plate is required"));
    assert!(messages.contains(&"Vehicle type not permittable for this permit type"));
    assert!(result
        .violations
        .iter()
        .all(|violation| violation["code"] != json!(INVALID_PERMIT_TYPE_CODE)));
}

#[tokio::test]
async fn mistyped_fields_reach_the_rules() {
    let policy = tros_only_policy();

    let mut document = application_json(today());
    document["permitData"]["companyName"] = json!(123);
    let result = policy.validate_document(&document).await;
    assert_eq!(
        result.messages(EventKind::Violation),
        vec!["Company name is required"]
    );

    let mut document = application_json(today());
    document["permitData"]["permitDuration"] = json!("30");
    let result = policy.validate_document(&document).await;
    assert_eq!(
        result.messages(EventKind::Violation),
        vec!["Duration must be in 30 day increments or a full calendar year"]
    );

    let mut document = application_json(today());
    document["permitData"]["vehicleDetails"] = json!("TRKTRAC");
    let result = policy.validate_document(&document).await;
    assert!(result
        .messages(EventKind::Violation)
        .contains(&"Vehicle Identification Number (vin) must be 6 alphanumeric characters"));
}

#[tokio::test]
async fn typed_and_raw_validation_agree() {
    let policy = tros_only_policy();

    let typed = policy.validate(Some(&valid_application())).await;
    let raw = policy.validate_document(&application_json(today())).await;

    assert_eq!(typed, raw);
    assert_eq!(
        policy.validate(None).await,
        policy.validate_document(&Value::Null).await
    );
}

fn policy_with_format(format: &str) -> Result<Policy, PolicyError> {
    Ok(tros_only_policy().with_date_format(PermitDateFormat::new(format)?))
}

#[tokio::test]
async fn unusable_date_formats_fail_before_validation() {
    match policy_with_format("%Q") {
        Err(PolicyError::InvalidDateFormat(InvalidDateFormat(format))) => assert_eq!(format, "%Q"),
        other => panic!("expected invalid date format, got {other:?}"),
    }
    assert!(policy_with_format("%Y-%m-%dT%H:%M").is_err());

    let policy = policy_with_format("%d/%m/%Y").expect("usable format");
    assert!(!policy.validate(None).await.is_valid());
}

#[tokio::test]
async fn date_format_keeps_custom_evaluator() {
    let format = PermitDateFormat::new("%d/%m/%Y").expect("valid format");
    let policy = tros_only_policy()
        .with_evaluator(Silent)
        .with_date_format(format);

    let mut application = valid_application();
    application.permit_data.company_name = None;
    let result = policy.validate(Some(&application)).await;

    assert!(result.is_valid(), "custom evaluator was replaced: {:?}", result.violations);
    assert_eq!(policy.date_format().as_str(), "%d/%m/%Y");
}

#[test]
fn malformed_rules_are_located() {
    let mut raw = serde_json::to_value(tros_only_definition()).expect("serializes");
    raw["commonRules"][1]["conditions"] = json!({ "all": "oops" });

    match Policy::from_value(raw) {
        Err(PolicyError::InvalidRule { location, .. }) => {
            assert_eq!(location, "commonRules[1] 'contact-email-format'")
        }
        other => panic!("expected invalid rule, got {other:?}"),
    }

    let mut raw = serde_json::to_value(tros_only_definition()).expect("serializes");
    raw["permitTypes"][0]["rules"][1]["conditions"] = json!({ "not": 5 });
    raw["permitTypes"][0]["rules"][1]
        .as_object_mut()
        .expect("rule object")
        .remove("name");

    match Policy::from_value(raw) {
        Err(error @ PolicyError::InvalidRule { .. }) => {
            assert!(error.to_string().starts_with("rule permitTypes[TROS].rules[1] is malformed"))
        }
        other => panic!("expected invalid rule, got {other:?}"),
    }
}

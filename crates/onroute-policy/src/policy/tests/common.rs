use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};

use crate::policy::{FixedClock, PermitApplication, Policy, PolicyDefinition};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 16).expect("valid date")
}

pub(super) fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(super) fn vehicle_types() -> Value {
    json!({
        "powerUnitTypes": [
            { "id": "TRKTRAC", "name": "Truck Tractors" },
            { "id": "REGTRCK", "name": "Trucks" },
            { "id": "PICKRTT", "name": "Picker Truck Tractors" }
        ],
        "trailerTypes": [
            { "id": "SEMITRL", "name": "Semi-Trailers" },
            { "id": "JEEPSRG", "name": "Jeeps" }
        ]
    })
}

pub(super) fn common_rules() -> Value {
    json!([
        {
            "name": "company-name-required",
            "conditions": { "not": {
                "fact": "permitData.companyName",
                "operator": "stringMinimumLength",
                "value": 1
            } },
            "event": { "type": "violation", "params": {
                "message": "Company name is required",
                "code": "field-validation-error",
                "fieldReference": "permitData.companyName"
            } }
        },
        {
            "name": "contact-email-format",
            "conditions": { "not": {
                "fact": "permitData.contactDetails.email",
                "operator": "regex",
                "value": "^\\S+@\\S+\\.\\S+$"
            } },
            "event": { "type": "violation", "params": {
                "message": "Contact email is invalid",
                "code": "field-validation-error",
                "fieldReference": "permitData.contactDetails.email"
            } }
        },
        {
            "name": "start-date-not-in-past",
            "conditions": { "all": [ {
                "fact": "permitData.startDate",
                "operator": "dateLessThan",
                "value": { "fact": "validationDate" }
            } ] },
            "event": { "type": "violation", "params": {
                "message": "Permit start date cannot be in the past",
                "code": "field-validation-error",
                "fieldReference": "permitData.startDate"
            } }
        },
        {
            "name": "vin-format",
            "conditions": { "not": {
                "fact": "permitData.vehicleDetails.vin",
                "operator": "regex",
                "value": "^[a-zA-Z0-9]{6}$"
            } },
            "event": { "type": "violation", "params": {
                "message": "Vehicle Identification Number (vin) must be 6 alphanumeric characters",
                "code": "field-validation-error",
                "fieldReference": "permitData.vehicleDetails.vin"
            } }
        },
        {
            "name": "plate-required",
            "conditions": { "not": {
                "fact": "permitData.vehicleDetails.plate",
                "operator": "stringMinimumLength",
                "value": 1
            } },
            "event": { "type": "violation", "params": {
                "message": "Vehicle plate is required",
                "code": "field-validation-error",
                "fieldReference": "permitData.vehicleDetails.plate"
            } }
        }
    ])
}

pub(super) fn vehicle_type_rule() -> Value {
    json!({
        "name": "vehicle-type-permittable",
        "conditions": { "not": {
            "fact": "permitData.vehicleDetails.vehicleSubType",
            "operator": "in",
            "value": { "fact": "allowedVehicles" }
        } },
        "event": { "type": "violation", "params": {
            "message": "Vehicle type not permittable for this permit type",
            "code": "field-validation-error",
            "fieldReference": "permitData.vehicleDetails.vehicleSubType"
        } }
    })
}

pub(super) fn duration_rule() -> Value {
    json!({
        "name": "tros-duration",
        "conditions": { "all": [
            {
                "fact": "permitData.permitDuration",
                "operator": "notIn",
                "value": [30, 60, 90, 120, 150, 180, 210, 240, 270, 300, 330]
            },
            {
                "fact": "permitData.permitDuration",
                "operator": "notEqual",
                "value": { "fact": "daysInPermitYear" }
            }
        ] },
        "event": { "type": "violation", "params": {
            "message": "Duration must be in 30 day increments or a full calendar year",
            "code": "field-validation-error",
            "fieldReference": "permitData.permitDuration"
        } }
    })
}

pub(super) fn tros_only_definition() -> PolicyDefinition {
    serde_json::from_value(json!({
        "version": "2025.06.01.001",
        "geographicRegions": [ { "id": "LMN", "name": "Lower Mainland" } ],
        "commonRules": common_rules(),
        "permitTypes": [ {
            "id": "TROS",
            "name": "Oversize: Term",
            "routingRequired": false,
            "weightDimensionRequired": false,
            "sizeDimensionRequired": false,
            "commodityRequired": false,
            "allowedVehicles": ["TRKTRAC", "REGTRCK", "SEMITRL"],
            "rules": [duration_rule(), vehicle_type_rule()]
        } ],
        "globalWeightDefaults": { "powerUnits": [], "trailers": [] },
        "globalSizeDefaults": { "width": 2.6, "height": 4.15, "length": 31 },
        "vehicleCategories": {
            "powerUnitCategories": [ { "id": "powerunit", "name": "Power Unit" } ],
            "trailerCategories": [ { "id": "trailer", "name": "Trailer" } ]
        },
        "vehicleTypes": vehicle_types(),
        "commodities": [ { "id": "EMPTYXX", "name": "None" } ]
    }))
    .expect("tros-only definition parses")
}

pub(super) fn tros_only_policy() -> Policy {
    Policy::new(tros_only_definition())
        .expect("tros-only policy builds")
        .with_clock(FixedClock(today()))
}

pub(super) fn application_json(start_date: NaiveDate) -> Value {
    json!({
        "permitType": "TROS",
        "permitData": {
            "companyName": "Parisian LLC Trucking",
            "clientNumber": "B3-000005-722",
            "contactDetails": {
                "firstName": "Lonny",
                "lastName": "Parisian",
                "phone1": "(250) 555-0182",
                "email": "lonny.parisian@example.com"
            },
            "vehicleDetails": {
                "vin": "1ZVFT8",
                "plate": "A1B2C3",
                "make": "Kenworth",
                "year": 2021,
                "countryCode": "CA",
                "provinceCode": "BC",
                "vehicleType": "powerUnit",
                "vehicleSubType": "TRKTRAC",
                "saveVehicle": false
            },
            "startDate": iso(start_date),
            "permitDuration": 30,
            "expiryDate": iso(start_date + Duration::days(29)),
            "commodities": [],
            "mailingAddress": {
                "addressLine1": "2670 Kamloops Ave",
                "city": "Victoria",
                "provinceCode": "BC",
                "countryCode": "CA",
                "postalCode": "V8W 9T5"
            }
        }
    })
}

pub(super) fn valid_application() -> PermitApplication {
    serde_json::from_value(application_json(today())).expect("application parses")
}

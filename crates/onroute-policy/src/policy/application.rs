use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Permit application document supplied by the surrounding permit service.
///
/// Every field is optional so partially completed applications can still be
/// validated; absent fields surface to rules as `null` facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitApplication {
    #[serde(default)]
    pub permit_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permit_data: PermitData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitData {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub client_number: Option<String>,
    #[serde(default)]
    pub doing_business_as: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact_details: ContactDetails,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vehicle_details: VehicleDetails,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub permit_duration: Option<i64>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub commodities: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mailing_address: MailingAddress,
    /// Fields not modelled above, kept so rules can still reference them.
    #[serde(flatten)]
    pub additional: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone1: Option<String>,
    #[serde(default)]
    pub phone1_extension: Option<String>,
    #[serde(default)]
    pub phone2: Option<String>,
    #[serde(default)]
    pub phone2_extension: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub additional_email: Option<String>,
    #[serde(default)]
    pub fax: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetails {
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub unit_number: Option<String>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub province_code: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub vehicle_sub_type: Option<String>,
    #[serde(default)]
    pub save_vehicle: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingAddress {
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Explicit `null` sections read as empty ones.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::Rule;

/// Catalog entry shared by vehicle types, categories, and commodities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedObject {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl IdentifiedObject {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTypes {
    #[serde(default)]
    pub power_unit_types: Vec<IdentifiedObject>,
    #[serde(default)]
    pub trailer_types: Vec<IdentifiedObject>,
}

impl VehicleTypes {
    /// Power units followed by trailers, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &IdentifiedObject> {
        self.power_unit_types.iter().chain(self.trailer_types.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleCategories {
    #[serde(default)]
    pub power_unit_categories: Vec<IdentifiedObject>,
    #[serde(default)]
    pub trailer_categories: Vec<IdentifiedObject>,
}

/// Permit category with its own vehicle allow-list and rule subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitTypeDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub routing_required: bool,
    #[serde(default)]
    pub weight_dimension_required: bool,
    #[serde(default)]
    pub size_dimension_required: bool,
    #[serde(default)]
    pub commodity_required: bool,
    /// Vehicle type ids permitted for this permit type; empty means none.
    #[serde(default)]
    pub allowed_vehicles: Vec<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Versioned rule-set and catalogs a [`super::Policy`] is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDefinition {
    pub version: String,
    #[serde(default)]
    pub geographic_regions: Vec<Value>,
    #[serde(default)]
    pub common_rules: Vec<Rule>,
    #[serde(default)]
    pub permit_types: Vec<PermitTypeDefinition>,
    #[serde(default)]
    pub global_weight_defaults: Value,
    #[serde(default)]
    pub global_size_defaults: Value,
    #[serde(default)]
    pub vehicle_categories: VehicleCategories,
    #[serde(default)]
    pub vehicle_types: VehicleTypes,
    #[serde(default)]
    pub commodities: Vec<IdentifiedObject>,
}

impl PolicyDefinition {
    pub fn permit_type(&self, id: &str) -> Option<&PermitTypeDefinition> {
        self.permit_types
            .iter()
            .find(|permit_type| permit_type.id == id)
    }
}

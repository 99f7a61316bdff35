//! Routing and authorization configuration consumed by the router runtime.
//!
//! These artifacts are wire types: field names and shapes are stable and
//! serialized with `serde` for the downstream query planner.

use apollo_compiler::Name;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Deserialize;
use serde::Serialize;

use crate::events::EventConfiguration;
use crate::subscription_filter::SubscriptionFilterCondition;

/// One `@key`, `@provides`, or `@requires` selection attached to a type or
/// field, with its normalized field-set string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredFieldsConfiguration {
    /// Empty for `@key` configurations.
    pub field_name: String,
    pub selection_set: String,
    /// True for a `@key(resolvable: false)` selection.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub disable_entity_resolver: bool,
}

/// Per-type routing configuration for one subgraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationData {
    pub type_name: String,
    pub field_names: IndexSet<String>,
    pub is_root_node: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub keys: Vec<RequiredFieldsConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub provides: Vec<RequiredFieldsConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub requires: Vec<RequiredFieldsConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub events: Vec<EventConfiguration>,
    #[serde(skip_serializing_if = "IndexSet::is_empty", default)]
    pub external_field_names: IndexSet<String>,
    /// For an entity interface or `@interfaceObject`: the concrete types the
    /// interface stands in for.
    #[serde(skip_serializing_if = "IndexSet::is_empty", default)]
    pub entity_interface_concrete_type_names: IndexSet<String>,
}

impl ConfigurationData {
    pub(crate) fn new(type_name: &Name) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }
}

/// Per-field routing/authorization entry of the composed graph. Only fields
/// with arguments, authorization requirements, or a subscription filter
/// produce an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfiguration {
    pub type_name: String,
    pub field_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub argument_names: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub requires_authentication: bool,
    /// OR-list of AND-scope-sets: any one inner set grants access.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required_scopes: Vec<Vec<String>>,
    /// Compatibility duplicate of `required_scopes` in the same OR-of-AND
    /// form, kept for routers that read the newer key.
    #[serde(
        rename = "requiredScopesByOR",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    pub required_scopes_by_or: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_filter_condition: Option<SubscriptionFilterCondition>,
}

/// The per-subgraph artifact handed to a downstream query planner: the
/// subgraph's own normalized schema plus its routing configuration.
#[derive(Debug, Clone)]
pub struct SubgraphConfig {
    pub name: String,
    pub url: String,
    pub schema: Schema,
    pub configuration_data_by_type_name: IndexMap<String, ConfigurationData>,
}

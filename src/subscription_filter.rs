//! `@openfed__subscriptionFilter` condition validation.
//!
//! The directive's `condition` argument is a small boolean-algebra input
//! object (`AND`/`OR`/`NOT`/`IN`). The validator walks it with the same
//! parameterized machinery as the field-set walker, enforcing the nesting
//! and list-length bounds and resolving `IN.fieldPath` against the
//! Subscription field's return type in the directive's origin subgraph.

use apollo_compiler::Name;
use apollo_compiler::ast::Value;
use apollo_compiler::Node;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::catalog::MAX_SUBSCRIPTION_FILTER_DEPTH;
use crate::model::TypeData;

const MIN_CONDITION_LIST_LENGTH: usize = 1;
const MAX_CONDITION_LIST_LENGTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubscriptionFilterCondition {
    #[serde(rename = "and")]
    And(Vec<SubscriptionFilterCondition>),
    #[serde(rename = "or")]
    Or(Vec<SubscriptionFilterCondition>),
    #[serde(rename = "not")]
    Not(Box<SubscriptionFilterCondition>),
    #[serde(rename = "in")]
    In(SubscriptionFieldCondition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFieldCondition {
    pub field_path: Vec<String>,
    pub values: Vec<serde_json::Value>,
}

pub(crate) struct SubscriptionFilterValidator<'a> {
    type_data_by_name: &'a IndexMap<Name, TypeData>,
    subgraph_name: &'a str,
    /// Named return type of the Subscription root field the filter is on.
    response_type_name: &'a Name,
    error_messages: Vec<String>,
}

impl<'a> SubscriptionFilterValidator<'a> {
    pub(crate) fn new(
        type_data_by_name: &'a IndexMap<Name, TypeData>,
        subgraph_name: &'a str,
        response_type_name: &'a Name,
    ) -> Self {
        Self {
            type_data_by_name,
            subgraph_name,
            response_type_name,
            error_messages: Vec::new(),
        }
    }

    /// Validates the `condition` argument value, returning the normalized
    /// condition tree or the ordered sub-error list.
    pub(crate) fn validate(
        mut self,
        condition: &Node<Value>,
    ) -> Result<SubscriptionFilterCondition, Vec<String>> {
        let result = self.validate_condition(condition, "condition", 0);
        match result {
            Some(condition) if self.error_messages.is_empty() => Ok(condition),
            _ => Err(self.error_messages),
        }
    }

    fn validate_condition(
        &mut self,
        value: &Node<Value>,
        input_path: &str,
        depth: usize,
    ) -> Option<SubscriptionFilterCondition> {
        if depth >= MAX_SUBSCRIPTION_FILTER_DEPTH {
            self.error_messages.push(format!(
                " The input path \"{input_path}\" exceeds the maximum depth of {MAX_SUBSCRIPTION_FILTER_DEPTH} for any one filter condition."
            ));
            return None;
        }
        let Some(object_fields) = value.as_object() else {
            self.error_messages.push(format!(
                " Expected the value of input path \"{input_path}\" to be type \"openfed__SubscriptionFilterCondition\" but received \"{}\".",
                value_kind_string(value)
            ));
            return None;
        };
        if object_fields.len() != 1 {
            self.error_messages.push(format!(
                " Each \"openfed__SubscriptionFilterCondition\" input object must define exactly one of the following input value fields: \"AND\", \"IN\", \"NOT\", or \"OR\".\n However, input path \"{input_path}\" defines {} fields.",
                object_fields.len()
            ));
            return None;
        }
        let (field_name, field_value) = &object_fields[0];
        match field_name.as_str() {
            "AND" => self
                .validate_condition_list(field_value, &format!("{input_path}.AND"), depth)
                .map(SubscriptionFilterCondition::And),
            "OR" => self
                .validate_condition_list(field_value, &format!("{input_path}.OR"), depth)
                .map(SubscriptionFilterCondition::Or),
            "NOT" => self
                .validate_condition(field_value, &format!("{input_path}.NOT"), depth + 1)
                .map(|c| SubscriptionFilterCondition::Not(Box::new(c))),
            "IN" => self
                .validate_field_condition(field_value, &format!("{input_path}.IN"))
                .map(SubscriptionFilterCondition::In),
            unexpected => {
                self.error_messages.push(format!(
                    " Each \"openfed__SubscriptionFilterCondition\" input object must define exactly one of the following input value fields: \"AND\", \"IN\", \"NOT\", or \"OR\".\n However, input path \"{input_path}\" defines the invalid input value field \"{unexpected}\".",
                ));
                None
            }
        }
    }

    fn validate_condition_list(
        &mut self,
        value: &Node<Value>,
        input_path: &str,
        depth: usize,
    ) -> Option<Vec<SubscriptionFilterCondition>> {
        let Some(items) = value.as_list() else {
            self.error_messages.push(format!(
                " Expected the value of input path \"{input_path}\" to be a list of conditions but received \"{}\".",
                value_kind_string(value)
            ));
            return None;
        };
        if items.len() < MIN_CONDITION_LIST_LENGTH || items.len() > MAX_CONDITION_LIST_LENGTH {
            self.error_messages.push(format!(
                " An AND or OR input field defined on an \"openfed__SubscriptionFilterCondition\" should define a list of {MIN_CONDITION_LIST_LENGTH}–{MAX_CONDITION_LIST_LENGTH} nested conditions.\n However, the list defined on input path \"{input_path}\" has a length of {}.",
                items.len()
            ));
            return None;
        }
        let mut conditions = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            conditions
                .push(self.validate_condition(item, &format!("{input_path}[{index}]"), depth + 1)?);
        }
        Some(conditions)
    }

    fn validate_field_condition(
        &mut self,
        value: &Node<Value>,
        input_path: &str,
    ) -> Option<SubscriptionFieldCondition> {
        let Some(object_fields) = value.as_object() else {
            self.error_messages.push(format!(
                " Expected the value of input path \"{input_path}\" to be type \"openfed__SubscriptionFieldCondition\" but received \"{}\".",
                value_kind_string(value)
            ));
            return None;
        };
        let mut field_path = None;
        let mut values = None;
        for (field_name, field_value) in object_fields {
            match field_name.as_str() {
                "fieldPath" => {
                    field_path = self.validate_field_path(
                        field_value,
                        &format!("{input_path}.fieldPath"),
                    );
                }
                "values" => {
                    values =
                        self.validate_values(field_value, &format!("{input_path}.values"));
                }
                unexpected => {
                    self.error_messages.push(format!(
                        " The input value field \"{unexpected}\" defined on input path \"{input_path}\" is not part of an \"openfed__SubscriptionFieldCondition\"."
                    ));
                }
            }
        }
        if field_path.is_none() || values.is_none() {
            self.error_messages.push(format!(
                " An \"openfed__SubscriptionFieldCondition\" input object defined on input path \"{input_path}\" must define both \"fieldPath\" and \"values\"."
            ));
            return None;
        }
        Some(SubscriptionFieldCondition {
            field_path: field_path.unwrap(),
            values: values.unwrap(),
        })
    }

    fn validate_field_path(
        &mut self,
        value: &Node<Value>,
        input_path: &str,
    ) -> Option<Vec<String>> {
        let Some(raw_path) = value.as_str() else {
            self.error_messages.push(format!(
                " Expected the input path \"{input_path}\" to be type \"String!\" but received \"{}\".",
                value_kind_string(value)
            ));
            return None;
        };
        if raw_path.is_empty()
            || raw_path
                .split('.')
                .any(|segment| segment.is_empty() || !is_valid_graphql_name(segment))
        {
            self.error_messages.push(format!(
                " Input path \"{input_path}\" defines the value \"{raw_path}\", which is not a period (.) delimited field path."
            ));
            return None;
        }
        let segments: Vec<String> = raw_path.split('.').map(str::to_owned).collect();
        let mut parent_type_name = self.response_type_name.clone();
        for (index, segment) in segments.iter().enumerate() {
            let partial_path = segments[..=index].join(".");
            let Some(parent_data) = self.type_data_by_name.get(&parent_type_name) else {
                self.error_messages.push(format!(
                    " Input path \"{input_path}\" defines the value \"{raw_path}\".\n However, \"{partial_path}\" is invalid because the type \"{parent_type_name}\" is not defined in subgraph \"{}\".",
                    self.subgraph_name
                ));
                return None;
            };
            let Some(field_data) = parent_data
                .fields()
                .and_then(|fields| fields.get(segment.as_str()))
            else {
                self.error_messages.push(format!(
                    " Input path \"{input_path}\" defines the value \"{raw_path}\".\n However, the path \"{partial_path}\" is invalid because no field named \"{segment}\" exists on type \"{parent_type_name}\".",
                ));
                return None;
            };
            if field_data.is_inaccessible {
                self.error_messages.push(format!(
                    " Input path \"{input_path}\" defines the value \"{raw_path}\".\n  The path segment \"{partial_path}\" is invalid because it refers to \"{}\", which is declared \"@inaccessible\".",
                    field_data.coords()
                ));
                return None;
            }
            let named_type = field_data.ty.inner_named_type().clone();
            let is_leaf = crate::catalog::is_base_scalar(&named_type)
                || self
                    .type_data_by_name
                    .get(&named_type)
                    .is_some_and(|data| data.is_leaf());
            if index + 1 == segments.len() {
                if !is_leaf {
                    self.error_messages.push(format!(
                        " Input path \"{input_path}\" defines the value \"{raw_path}\".\n However, the final field \"{segment}\" returns \"{named_type}\", which is not a leaf type; therefore, it requires further selections.",
                    ));
                    return None;
                }
            } else if is_leaf {
                self.error_messages.push(format!(
                    " Input path \"{input_path}\" defines the value \"{raw_path}\".\n However, \"{partial_path}\" returns the leaf type \"{named_type}\" and cannot be selected into.",
                ));
                return None;
            } else {
                parent_type_name = named_type;
            }
        }
        Some(segments)
    }

    fn validate_values(
        &mut self,
        value: &Node<Value>,
        input_path: &str,
    ) -> Option<Vec<serde_json::Value>> {
        let Some(items) = value.as_list() else {
            self.error_messages.push(format!(
                " Expected the input path \"{input_path}\" to be a list of values but received \"{}\".",
                value_kind_string(value)
            ));
            return None;
        };
        if items.is_empty() {
            self.error_messages.push(format!(
                " An \"openfed__SubscriptionFieldCondition\" input object must define a \"values\" input value field with a list of at least one valid value kind (boolean, enum, float, int, null, or string).\n However, the list defined on input path \"{input_path}\" is empty."
            ));
            return None;
        }
        let mut values = Vec::with_capacity(items.len());
        let mut invalid_indices = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match scalar_json_value(item) {
                Some(json) => values.push(json),
                None => invalid_indices.push(index.to_string()),
            }
        }
        if !invalid_indices.is_empty() {
            self.error_messages.push(format!(
                " An \"openfed__SubscriptionFieldCondition\" input object must define a \"values\" input value field with a list of at least one valid value kind (boolean, enum, float, int, null, or string).\n However, the following {} defined on input path \"{input_path}\" {} not a valid value: {}",
                if invalid_indices.len() > 1 { "indices" } else { "index" },
                if invalid_indices.len() > 1 { "are" } else { "is" },
                invalid_indices.join(", ")
            ));
            return None;
        }
        Some(values)
    }
}

fn scalar_json_value(value: &Node<Value>) -> Option<serde_json::Value> {
    match value.as_ref() {
        Value::Null => Some(serde_json::Value::Null),
        Value::Boolean(b) => Some(serde_json::Value::Bool(*b)),
        Value::Enum(name) => Some(serde_json::Value::String(name.to_string())),
        Value::String(s) => Some(serde_json::Value::String(s.clone())),
        Value::Int(int_value) => int_value
            .try_to_i32()
            .ok()
            .map(|n| serde_json::Value::Number(n.into())),
        Value::Float(float_value) => float_value
            .try_to_f64()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number),
        _ => None,
    }
}

pub(crate) fn value_kind_string(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Enum(_) => "enum",
        Value::Variable(_) => "variable",
        Value::String(_) => "string",
        Value::Float(_) => "float",
        Value::Int(_) => "int",
        Value::Boolean(_) => "boolean",
        Value::List(_) => "list",
        Value::Object(_) => "object",
    }
}

fn is_valid_graphql_name(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

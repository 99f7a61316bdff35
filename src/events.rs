//! Event-driven federation (`@edfs__*`) configuration.
//!
//! Each event directive on a root field is argument-validated during
//! normalization and recorded as an [`EventConfiguration`] in the owning
//! type's configuration data, for consumption by the router runtime.

use apollo_compiler::Name;
use apollo_compiler::ast::Value;
use apollo_compiler::Node;
use serde::Deserialize;
use serde::Serialize;

use crate::catalog;
use crate::model::FieldData;
use crate::model::OperationKind;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum EventProvider {
    Kafka,
    Nats,
    Redis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum EventKind {
    Publish,
    Request,
    Subscribe,
}

impl EventKind {
    /// The root operation type an event directive of this kind may appear on.
    pub(crate) fn valid_operation_kind(&self) -> OperationKind {
        match self {
            EventKind::Publish => OperationKind::Mutation,
            EventKind::Request => OperationKind::Query,
            EventKind::Subscribe => OperationKind::Subscription,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatsStreamConfiguration {
    pub consumer_name: String,
    pub stream_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_inactive_threshold: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConfiguration {
    pub field_name: String,
    #[serde(rename = "type")]
    pub event_kind: EventKind,
    pub provider_id: String,
    pub provider_type: EventProvider,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub subjects: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub channels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_configuration: Option<NatsStreamConfiguration>,
}

pub(crate) fn event_directive_metadata(directive_name: &Name) -> Option<(EventProvider, EventKind)> {
    match directive_name.as_str() {
        n if n == catalog::EDFS_KAFKA_PUBLISH.as_str() => {
            Some((EventProvider::Kafka, EventKind::Publish))
        }
        n if n == catalog::EDFS_KAFKA_SUBSCRIBE.as_str() => {
            Some((EventProvider::Kafka, EventKind::Subscribe))
        }
        n if n == catalog::EDFS_NATS_PUBLISH.as_str() => {
            Some((EventProvider::Nats, EventKind::Publish))
        }
        n if n == catalog::EDFS_NATS_REQUEST.as_str() => {
            Some((EventProvider::Nats, EventKind::Request))
        }
        n if n == catalog::EDFS_NATS_SUBSCRIBE.as_str() => {
            Some((EventProvider::Nats, EventKind::Subscribe))
        }
        n if n == catalog::EDFS_REDIS_PUBLISH.as_str() => {
            Some((EventProvider::Redis, EventKind::Publish))
        }
        n if n == catalog::EDFS_REDIS_SUBSCRIBE.as_str() => {
            Some((EventProvider::Redis, EventKind::Subscribe))
        }
        _ => None,
    }
}

/// Validates one subject/topic/channel template, checking that every
/// `{{ args.name }}` reference names a declared argument of the field.
pub(crate) fn validate_event_subject(
    subject: &str,
    argument_name: &str,
    field_data: &FieldData,
    error_messages: &mut Vec<String>,
) {
    if subject.is_empty() {
        error_messages.push(format!(
            " The value provided to the \"{argument_name}\" argument must be a non-empty string."
        ));
        return;
    }
    let mut rest = subject;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start..].find("}}") else {
            error_messages.push(format!(
                " The template \"{subject}\" provided to the \"{argument_name}\" argument is missing a closing \"}}}}\"."
            ));
            return;
        };
        let reference = rest[start + 2..start + end].trim();
        match reference.strip_prefix("args.") {
            Some(referenced_argument) if !referenced_argument.is_empty() => {
                if !field_data.arguments.contains_key(referenced_argument) {
                    error_messages.push(format!(
                        " The template \"{subject}\" provided to the \"{argument_name}\" argument references the field argument \"{referenced_argument}\", which is not defined on \"{}\".",
                        field_data.coords()
                    ));
                }
            }
            _ => {
                error_messages.push(format!(
                    " The template \"{subject}\" provided to the \"{argument_name}\" argument must only reference field arguments through \"{{{{ args.<name> }}}}\"."
                ));
            }
        }
        rest = &rest[start + end + 2..];
    }
}

/// Validates an `edfs__NatsStreamConfiguration` input object value.
pub(crate) fn parse_stream_configuration(
    value: &Node<Value>,
    error_messages: &mut Vec<String>,
) -> Option<NatsStreamConfiguration> {
    let Value::Object(object_fields) = value.as_ref() else {
        error_messages.push(format!(
            " The value provided to the \"streamConfiguration\" argument must be a \"{}\" input object.",
            catalog::EDFS_NATS_STREAM_CONFIGURATION
        ));
        return None;
    };
    let mut consumer_name = None;
    let mut stream_name = None;
    let mut consumer_inactive_threshold = None;
    for (field_name, field_value) in object_fields {
        match field_name.as_str() {
            "consumerName" => {
                consumer_name = non_empty_string(field_value, "consumerName", error_messages);
            }
            "streamName" => {
                stream_name = non_empty_string(field_value, "streamName", error_messages);
            }
            "consumerInactiveThreshold" => match field_value.as_ref() {
                Value::Int(int_value) => match int_value.try_to_i32() {
                    Ok(threshold) => consumer_inactive_threshold = Some(threshold),
                    Err(_) => error_messages.push(
                        " The \"consumerInactiveThreshold\" input value must be a valid \"Int\"."
                            .to_owned(),
                    ),
                },
                _ => error_messages.push(
                    " The \"consumerInactiveThreshold\" input value must be a valid \"Int\"."
                        .to_owned(),
                ),
            },
            unexpected => error_messages.push(format!(
                " The input value field \"{unexpected}\" is not defined on \"{}\".",
                catalog::EDFS_NATS_STREAM_CONFIGURATION
            )),
        }
    }
    match (consumer_name, stream_name) {
        (Some(consumer_name), Some(stream_name)) => Some(NatsStreamConfiguration {
            consumer_name,
            stream_name,
            consumer_inactive_threshold,
        }),
        _ => {
            error_messages.push(format!(
                " The \"{}\" input object must define both \"consumerName\" and \"streamName\" as non-empty strings.",
                catalog::EDFS_NATS_STREAM_CONFIGURATION
            ));
            None
        }
    }
}

fn non_empty_string(
    value: &Node<Value>,
    input_field_name: &str,
    error_messages: &mut Vec<String>,
) -> Option<String> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Some(s.to_owned()),
        _ => {
            error_messages.push(format!(
                " The \"{input_field_name}\" input value must be a non-empty string."
            ));
            None
        }
    }
}

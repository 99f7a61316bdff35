//! Static catalog of the directives accepted on subgraph SDL.
//!
//! Directive occurrence validation is table-driven: each occurrence is checked
//! once against its [`DirectiveSpec`] (location legality, repeatability,
//! required/optional arguments, argument-value types) instead of per-directive
//! branching. Directives whose arguments carry embedded grammars (field sets,
//! subscription-filter conditions, stream configurations) are additionally
//! routed to their dedicated validators by the normalizer.

use std::sync::LazyLock;

use apollo_compiler::Name;
use apollo_compiler::ast::DirectiveDefinition;
use apollo_compiler::ast::DirectiveLocation;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use apollo_compiler::name;
use apollo_compiler::ty;
use apollo_compiler::Node;
use indexmap::IndexMap;
use indexmap::IndexSet;

/// Upper bound on OR-combined scope sets produced by `@requiresScopes` merges.
pub(crate) const MAX_OR_SCOPES: usize = 16;

/// Upper bound on wrapping layers of a type reference. Guards the iterative
/// type walks against malicious or cyclic inputs.
pub(crate) const MAXIMUM_TYPE_NESTING: usize = 30;

/// Upper bound on the nesting of any one subscription-filter condition.
pub(crate) const MAX_SUBSCRIPTION_FILTER_DEPTH: usize = 3;

pub(crate) const KEY: Name = name!("key");
pub(crate) const EXTERNAL: Name = name!("external");
pub(crate) const PROVIDES: Name = name!("provides");
pub(crate) const REQUIRES: Name = name!("requires");
pub(crate) const SHAREABLE: Name = name!("shareable");
pub(crate) const OVERRIDE: Name = name!("override");
pub(crate) const TAG: Name = name!("tag");
pub(crate) const INACCESSIBLE: Name = name!("inaccessible");
pub(crate) const AUTHENTICATED: Name = name!("authenticated");
pub(crate) const REQUIRES_SCOPES: Name = name!("requiresScopes");
pub(crate) const INTERFACE_OBJECT: Name = name!("interfaceObject");
pub(crate) const EXTENDS: Name = name!("extends");
pub(crate) const DEPRECATED: Name = name!("deprecated");
pub(crate) const SPECIFIED_BY: Name = name!("specifiedBy");
pub(crate) const SUBSCRIPTION_FILTER: Name = name!("openfed__subscriptionFilter");
pub(crate) const EDFS_KAFKA_PUBLISH: Name = name!("edfs__kafkaPublish");
pub(crate) const EDFS_KAFKA_SUBSCRIBE: Name = name!("edfs__kafkaSubscribe");
pub(crate) const EDFS_NATS_PUBLISH: Name = name!("edfs__natsPublish");
pub(crate) const EDFS_NATS_REQUEST: Name = name!("edfs__natsRequest");
pub(crate) const EDFS_NATS_SUBSCRIBE: Name = name!("edfs__natsSubscribe");
pub(crate) const EDFS_REDIS_PUBLISH: Name = name!("edfs__redisPublish");
pub(crate) const EDFS_REDIS_SUBSCRIBE: Name = name!("edfs__redisSubscribe");

pub(crate) const QUERY: Name = name!("Query");
pub(crate) const MUTATION: Name = name!("Mutation");
pub(crate) const SUBSCRIPTION: Name = name!("Subscription");

/// The expected result type of every event-driven publish field.
pub(crate) const EDFS_PUBLISH_RESULT: Name = name!("edfs__PublishResult");
pub(crate) const EDFS_NATS_STREAM_CONFIGURATION: Name = name!("edfs__NatsStreamConfiguration");

/// A single argument accepted by a catalogued directive.
#[derive(Debug, Clone)]
pub(crate) struct ArgumentSpec {
    pub(crate) name: Name,
    pub(crate) ty: Type,
    pub(crate) default_value: Option<Value>,
}

impl ArgumentSpec {
    fn new(name: Name, ty: Type) -> Self {
        Self {
            name,
            ty,
            default_value: None,
        }
    }

    fn with_default(name: Name, ty: Type, default_value: Value) -> Self {
        Self {
            name,
            ty,
            default_value: Some(default_value),
        }
    }

    /// An argument is required when it is non-null and carries no default.
    pub(crate) fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

/// The definition of one built-in directive: where it may appear, what
/// arguments it takes, and whether it may be repeated on one location.
#[derive(Debug, Clone)]
pub(crate) struct DirectiveSpec {
    pub(crate) name: Name,
    pub(crate) locations: &'static [DirectiveLocation],
    pub(crate) arguments: Vec<ArgumentSpec>,
    pub(crate) repeatable: bool,
    /// Whether using the directive marks the subgraph as a version-two subgraph.
    pub(crate) is_version_two: bool,
}

impl DirectiveSpec {
    pub(crate) fn argument(&self, name: &str) -> Option<&ArgumentSpec> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// Builds the AST definition injected into normalized subgraph schemas.
    pub(crate) fn definition(&self) -> DirectiveDefinition {
        DirectiveDefinition {
            description: None,
            name: self.name.clone(),
            arguments: self
                .arguments
                .iter()
                .map(|arg| {
                    Node::new(InputValueDefinition {
                        description: None,
                        name: arg.name.clone(),
                        ty: Node::new(arg.ty.clone()),
                        default_value: arg.default_value.clone().map(Node::new),
                        directives: Default::default(),
                    })
                })
                .collect(),
            repeatable: self.repeatable,
            locations: self.locations.to_vec(),
        }
    }
}

const COMPOSITE_LOCATIONS: &[DirectiveLocation] =
    &[DirectiveLocation::Object, DirectiveLocation::Interface];

const FIELD_DEFINITION: &[DirectiveLocation] = &[DirectiveLocation::FieldDefinition];

const SHAREABLE_LOCATIONS: &[DirectiveLocation] =
    &[DirectiveLocation::FieldDefinition, DirectiveLocation::Object];

const EXTERNAL_LOCATIONS: &[DirectiveLocation] =
    &[DirectiveLocation::FieldDefinition, DirectiveLocation::Object];

const TAG_LOCATIONS: &[DirectiveLocation] = &[
    DirectiveLocation::ArgumentDefinition,
    DirectiveLocation::Enum,
    DirectiveLocation::EnumValue,
    DirectiveLocation::FieldDefinition,
    DirectiveLocation::InputFieldDefinition,
    DirectiveLocation::InputObject,
    DirectiveLocation::Interface,
    DirectiveLocation::Object,
    DirectiveLocation::Scalar,
    DirectiveLocation::Union,
];

const INACCESSIBLE_LOCATIONS: &[DirectiveLocation] = &[
    DirectiveLocation::ArgumentDefinition,
    DirectiveLocation::Enum,
    DirectiveLocation::EnumValue,
    DirectiveLocation::FieldDefinition,
    DirectiveLocation::InputFieldDefinition,
    DirectiveLocation::InputObject,
    DirectiveLocation::Interface,
    DirectiveLocation::Object,
    DirectiveLocation::Scalar,
    DirectiveLocation::Union,
];

const AUTHORIZATION_LOCATIONS: &[DirectiveLocation] = &[
    DirectiveLocation::Enum,
    DirectiveLocation::FieldDefinition,
    DirectiveLocation::Interface,
    DirectiveLocation::Object,
    DirectiveLocation::Scalar,
];

const EXTENDS_LOCATIONS: &[DirectiveLocation] =
    &[DirectiveLocation::Object, DirectiveLocation::Interface];

const DEPRECATED_LOCATIONS: &[DirectiveLocation] = &[
    DirectiveLocation::ArgumentDefinition,
    DirectiveLocation::EnumValue,
    DirectiveLocation::FieldDefinition,
    DirectiveLocation::InputFieldDefinition,
];

fn directive_specs() -> Vec<DirectiveSpec> {
    vec![
        DirectiveSpec {
            name: KEY,
            locations: COMPOSITE_LOCATIONS,
            arguments: vec![
                ArgumentSpec::new(name!("fields"), ty!(openfed__FieldSet!)),
                ArgumentSpec::with_default(name!("resolvable"), ty!(Boolean), Value::Boolean(true)),
            ],
            repeatable: true,
            is_version_two: false,
        },
        DirectiveSpec {
            name: EXTERNAL,
            locations: EXTERNAL_LOCATIONS,
            arguments: vec![],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: PROVIDES,
            locations: FIELD_DEFINITION,
            arguments: vec![ArgumentSpec::new(name!("fields"), ty!(openfed__FieldSet!))],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: REQUIRES,
            locations: FIELD_DEFINITION,
            arguments: vec![ArgumentSpec::new(name!("fields"), ty!(openfed__FieldSet!))],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: EXTENDS,
            locations: EXTENDS_LOCATIONS,
            arguments: vec![],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: SHAREABLE,
            locations: SHAREABLE_LOCATIONS,
            arguments: vec![],
            repeatable: true,
            is_version_two: true,
        },
        DirectiveSpec {
            name: OVERRIDE,
            locations: FIELD_DEFINITION,
            arguments: vec![ArgumentSpec::new(name!("from"), ty!(String!))],
            repeatable: false,
            is_version_two: true,
        },
        DirectiveSpec {
            name: TAG,
            locations: TAG_LOCATIONS,
            arguments: vec![ArgumentSpec::new(name!("name"), ty!(String!))],
            repeatable: true,
            is_version_two: false,
        },
        DirectiveSpec {
            name: INACCESSIBLE,
            locations: INACCESSIBLE_LOCATIONS,
            arguments: vec![],
            repeatable: false,
            is_version_two: true,
        },
        DirectiveSpec {
            name: AUTHENTICATED,
            locations: AUTHORIZATION_LOCATIONS,
            arguments: vec![],
            repeatable: false,
            is_version_two: true,
        },
        DirectiveSpec {
            name: REQUIRES_SCOPES,
            locations: AUTHORIZATION_LOCATIONS,
            arguments: vec![ArgumentSpec::new(
                name!("scopes"),
                ty!([[openfed__Scope!]!]!),
            )],
            repeatable: false,
            is_version_two: true,
        },
        DirectiveSpec {
            name: INTERFACE_OBJECT,
            locations: &[DirectiveLocation::Object],
            arguments: vec![],
            repeatable: false,
            is_version_two: true,
        },
        DirectiveSpec {
            name: DEPRECATED,
            locations: DEPRECATED_LOCATIONS,
            arguments: vec![ArgumentSpec::with_default(
                name!("reason"),
                ty!(String),
                Value::String("No longer supported".to_owned()),
            )],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: SPECIFIED_BY,
            locations: &[DirectiveLocation::Scalar],
            arguments: vec![ArgumentSpec::new(name!("url"), ty!(String!))],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: SUBSCRIPTION_FILTER,
            locations: FIELD_DEFINITION,
            arguments: vec![ArgumentSpec::new(
                name!("condition"),
                ty!(openfed__SubscriptionFilterCondition!),
            )],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: EDFS_KAFKA_PUBLISH,
            locations: FIELD_DEFINITION,
            arguments: vec![
                ArgumentSpec::new(name!("topic"), ty!(String!)),
                ArgumentSpec::with_default(
                    name!("providerId"),
                    ty!(String!),
                    Value::String("default".to_owned()),
                ),
            ],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: EDFS_KAFKA_SUBSCRIBE,
            locations: FIELD_DEFINITION,
            arguments: vec![
                ArgumentSpec::new(name!("topics"), ty!([String!]!)),
                ArgumentSpec::with_default(
                    name!("providerId"),
                    ty!(String!),
                    Value::String("default".to_owned()),
                ),
            ],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: EDFS_NATS_PUBLISH,
            locations: FIELD_DEFINITION,
            arguments: vec![
                ArgumentSpec::new(name!("subject"), ty!(String!)),
                ArgumentSpec::with_default(
                    name!("providerId"),
                    ty!(String!),
                    Value::String("default".to_owned()),
                ),
            ],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: EDFS_NATS_REQUEST,
            locations: FIELD_DEFINITION,
            arguments: vec![
                ArgumentSpec::new(name!("subject"), ty!(String!)),
                ArgumentSpec::with_default(
                    name!("providerId"),
                    ty!(String!),
                    Value::String("default".to_owned()),
                ),
            ],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: EDFS_NATS_SUBSCRIBE,
            locations: FIELD_DEFINITION,
            arguments: vec![
                ArgumentSpec::new(name!("subjects"), ty!([String!]!)),
                ArgumentSpec::with_default(
                    name!("providerId"),
                    ty!(String!),
                    Value::String("default".to_owned()),
                ),
                ArgumentSpec::new(
                    name!("streamConfiguration"),
                    ty!(edfs__NatsStreamConfiguration),
                ),
            ],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: EDFS_REDIS_PUBLISH,
            locations: FIELD_DEFINITION,
            arguments: vec![
                ArgumentSpec::new(name!("channel"), ty!(String!)),
                ArgumentSpec::with_default(
                    name!("providerId"),
                    ty!(String!),
                    Value::String("default".to_owned()),
                ),
            ],
            repeatable: false,
            is_version_two: false,
        },
        DirectiveSpec {
            name: EDFS_REDIS_SUBSCRIBE,
            locations: FIELD_DEFINITION,
            arguments: vec![
                ArgumentSpec::new(name!("channels"), ty!([String!]!)),
                ArgumentSpec::with_default(
                    name!("providerId"),
                    ty!(String!),
                    Value::String("default".to_owned()),
                ),
            ],
            repeatable: false,
            is_version_two: false,
        },
    ]
}

/// The directive catalog, keyed by directive name in declaration order.
pub(crate) static DIRECTIVE_CATALOG: LazyLock<IndexMap<Name, DirectiveSpec>> =
    LazyLock::new(|| {
        directive_specs()
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect()
    });

/// Directives whose presence marks a subgraph as version two.
pub(crate) static V2_DIRECTIVE_NAMES: LazyLock<IndexSet<Name>> = LazyLock::new(|| {
    DIRECTIVE_CATALOG
        .values()
        .filter(|spec| spec.is_version_two)
        .map(|spec| spec.name.clone())
        .collect()
});

/// The event-driven federation directives.
pub(crate) static EVENT_DIRECTIVE_NAMES: LazyLock<IndexSet<Name>> = LazyLock::new(|| {
    IndexSet::from_iter([
        EDFS_KAFKA_PUBLISH,
        EDFS_KAFKA_SUBSCRIBE,
        EDFS_NATS_PUBLISH,
        EDFS_NATS_REQUEST,
        EDFS_NATS_SUBSCRIBE,
        EDFS_REDIS_PUBLISH,
        EDFS_REDIS_SUBSCRIBE,
    ])
});

pub(crate) fn is_base_scalar(name: &str) -> bool {
    matches!(name, "Int" | "Float" | "String" | "Boolean" | "ID")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_directive_is_repeatable_on_composite_types() {
        let spec = DIRECTIVE_CATALOG.get(&KEY).unwrap();
        assert!(spec.repeatable);
        assert!(spec.locations.contains(&DirectiveLocation::Object));
        assert!(spec.locations.contains(&DirectiveLocation::Interface));
        assert!(!spec.locations.contains(&DirectiveLocation::FieldDefinition));
    }

    #[test]
    fn key_resolvable_argument_defaults_to_true() {
        let spec = DIRECTIVE_CATALOG.get(&KEY).unwrap();
        let resolvable = spec.argument("resolvable").unwrap();
        assert!(!resolvable.is_required());
        assert_eq!(resolvable.default_value, Some(Value::Boolean(true)));
        assert!(spec.argument("fields").unwrap().is_required());
    }

    #[test]
    fn version_two_directives_are_flagged() {
        for name in ["shareable", "override", "inaccessible", "interfaceObject"] {
            assert!(V2_DIRECTIVE_NAMES.contains(name), "{name} should be v2");
        }
        assert!(!V2_DIRECTIVE_NAMES.contains("key"));
        assert!(!V2_DIRECTIVE_NAMES.contains("external"));
    }

    #[test]
    fn subscription_filter_is_only_valid_on_field_definitions() {
        let spec = DIRECTIVE_CATALOG.get(&SUBSCRIPTION_FILTER).unwrap();
        assert_eq!(spec.locations, FIELD_DEFINITION);
        assert!(!spec.repeatable);
    }
}

//! Per-subgraph normalization.
//!
//! One walk over a parsed subgraph document builds the intermediate type
//! model, validates every directive occurrence against the catalog, extracts
//! entity keys, authorization and event data, and produces the per-type
//! routing configuration skeleton. All problems except unparsable SDL are
//! collected; the caller decides whether to proceed.

pub(crate) mod batch;
pub(crate) mod directives;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::ast::DirectiveLocation;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ExtendedType;
use indexmap::IndexMap;
use indexmap::IndexSet;
use tracing::debug;

use crate::authorization::AuthorizationData;
use crate::catalog;
use crate::catalog::DIRECTIVE_CATALOG;
use crate::catalog::MAXIMUM_TYPE_NESTING;
use crate::catalog::MAX_OR_SCOPES;
use crate::error::CompositionError;
use crate::error::CompositionWarning;
use crate::events;
use crate::events::EventConfiguration;
use crate::events::EventKind;
use crate::field_set;
use crate::field_set::FieldSetKind;
use crate::field_set::FieldSetWalker;
use crate::model::DirectiveMap;
use crate::model::EntityData;
use crate::model::EntityInterfaceData;
use crate::model::EnumData;
use crate::model::EnumValueData;
use crate::model::ExtensionKind;
use crate::model::FieldData;
use crate::model::InputObjectData;
use crate::model::InputValueData;
use crate::model::InputValueKind;
use crate::model::InterfaceData;
use crate::model::KeyFieldSet;
use crate::model::ObjectData;
use crate::model::OperationKind;
use crate::model::ScalarData;
use crate::model::TypeData;
use crate::model::UnionData;
use crate::model::field_coords;
use crate::resolvability::ResolvabilityGraph;
use crate::router_config::ConfigurationData;
use crate::router_config::RequiredFieldsConfiguration;
use crate::subgraph::Subgraph;
use directives::extract_directives;

/// A `@openfed__subscriptionFilter` occurrence awaiting federation-time
/// validation against the origin subgraph's (possibly merged) model.
#[derive(Debug, Clone)]
pub(crate) struct PendingSubscriptionFilter {
    pub(crate) field_coords: String,
    pub(crate) response_type_name: Name,
    pub(crate) condition: Node<Value>,
}

#[derive(Debug)]
pub(crate) struct NormalizedSubgraph {
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) is_version_two: bool,
    pub(crate) type_data_by_name: IndexMap<Name, TypeData>,
    pub(crate) entity_data_by_type_name: IndexMap<Name, EntityData>,
    pub(crate) entity_interface_data_by_type_name: IndexMap<Name, EntityInterfaceData>,
    pub(crate) authorization_data_by_type_name: IndexMap<Name, AuthorizationData>,
    pub(crate) configuration_data_by_type_name: IndexMap<String, ConfigurationData>,
    pub(crate) key_field_coords_by_type_name: IndexMap<Name, IndexSet<String>>,
    pub(crate) pending_subscription_filters: Vec<PendingSubscriptionFilter>,
    /// Field coordinates referenced by this subgraph's `@provides`/`@requires`.
    pub(crate) conditional_field_coords: IndexSet<String>,
    pub(crate) root_type_names: IndexSet<Name>,
    pub(crate) schema: Schema,
}

#[derive(Debug, Default)]
pub(crate) struct NormalizationResult {
    pub(crate) subgraph: Option<NormalizedSubgraph>,
    pub(crate) errors: Vec<CompositionError>,
    pub(crate) warnings: Vec<CompositionWarning>,
}

/// Normalizes one subgraph, inserting its nodes and edges into the shared
/// resolvability graph.
pub(crate) fn normalize_subgraph(
    subgraph: &Subgraph,
    graph: &mut ResolvabilityGraph,
) -> NormalizationResult {
    debug!(subgraph = subgraph.name.as_str(), "normalizing subgraph");
    let schema = match Schema::builder()
        .adopt_orphan_extensions()
        .parse(subgraph.schema.as_str(), subgraph.name.as_str())
        .build()
    {
        Ok(schema) => schema,
        Err(with_errors) => {
            return NormalizationResult {
                subgraph: None,
                errors: vec![CompositionError::SubgraphSdlParseFailure {
                    message: with_errors.errors.to_string(),
                }],
                warnings: Vec::new(),
            };
        }
    };
    graph.set_subgraph(&subgraph.name);
    let mut normalizer = Normalizer::new(&subgraph.name, &schema);
    normalizer.normalize(graph);
    let Normalizer {
        errors,
        warnings,
        is_version_two,
        type_data_by_name,
        entity_data_by_type_name,
        entity_interface_data_by_type_name,
        authorization_data_by_type_name,
        configuration_data_by_type_name,
        key_field_coords_by_type_name,
        pending_subscription_filters,
        root_type_name_by_kind,
        conditional_field_coords,
        ..
    } = normalizer;
    let normalized_schema = new_normalized_schema(&schema);
    NormalizationResult {
        subgraph: Some(NormalizedSubgraph {
            name: subgraph.name.clone(),
            url: subgraph.url.clone(),
            is_version_two,
            type_data_by_name,
            entity_data_by_type_name,
            entity_interface_data_by_type_name,
            authorization_data_by_type_name,
            configuration_data_by_type_name,
            key_field_coords_by_type_name,
            pending_subscription_filters,
            conditional_field_coords,
            root_type_names: root_type_name_by_kind
                .keys()
                .map(|kind| kind.canonical_type_name())
                .collect(),
            schema: normalized_schema,
        }),
        errors,
        warnings,
    }
}

/// The normalized subgraph schema handed to the downstream planner: the
/// parsed document with every referenced catalog directive definition
/// injected, so the schema is self-contained.
fn new_normalized_schema(schema: &Schema) -> Schema {
    let mut normalized = schema.clone();
    for spec in DIRECTIVE_CATALOG.values() {
        normalized
            .directive_definitions
            .entry(spec.name.clone())
            .or_insert_with(|| Node::new(spec.definition()));
    }
    normalized
}

struct Normalizer<'a> {
    subgraph_name: &'a str,
    schema: &'a Schema,
    custom_definitions: IndexMap<Name, Node<ast::DirectiveDefinition>>,
    /// Custom root-operation type name to its canonical replacement.
    renamed_root_types: IndexMap<Name, Name>,
    root_type_name_by_kind: IndexMap<OperationKind, Name>,
    is_version_two: bool,
    errors: Vec<CompositionError>,
    warnings: Vec<CompositionWarning>,
    type_data_by_name: IndexMap<Name, TypeData>,
    entity_data_by_type_name: IndexMap<Name, EntityData>,
    entity_interface_data_by_type_name: IndexMap<Name, EntityInterfaceData>,
    authorization_data_by_type_name: IndexMap<Name, AuthorizationData>,
    configuration_data_by_type_name: IndexMap<String, ConfigurationData>,
    key_field_coords_by_type_name: IndexMap<Name, IndexSet<String>>,
    pending_subscription_filters: Vec<PendingSubscriptionFilter>,
    referenced_type_names: IndexSet<Name>,
    /// Field coordinates referenced by some local `@provides`/`@requires`.
    conditional_field_coords: IndexSet<String>,
}

/// Regardless of whether the user redefined these directives, they are
/// considered built-in for composition.
const BUILT_IN_DIRECTIVES: [&str; 6] = [
    "skip",
    "include",
    "deprecated",
    "specifiedBy",
    "defer",
    "stream",
];

impl<'a> Normalizer<'a> {
    fn new(subgraph_name: &'a str, schema: &'a Schema) -> Self {
        let custom_definitions: IndexMap<Name, Node<ast::DirectiveDefinition>> = schema
            .directive_definitions
            .iter()
            .filter(|(name, _)| {
                !BUILT_IN_DIRECTIVES.contains(&name.as_str())
                    && !DIRECTIVE_CATALOG.contains_key(*name)
            })
            .map(|(name, definition)| (name.clone(), definition.clone()))
            .collect();
        Self {
            subgraph_name,
            schema,
            custom_definitions,
            renamed_root_types: IndexMap::new(),
            root_type_name_by_kind: IndexMap::new(),
            is_version_two: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            type_data_by_name: IndexMap::new(),
            entity_data_by_type_name: IndexMap::new(),
            entity_interface_data_by_type_name: IndexMap::new(),
            authorization_data_by_type_name: IndexMap::new(),
            configuration_data_by_type_name: IndexMap::new(),
            key_field_coords_by_type_name: IndexMap::new(),
            pending_subscription_filters: Vec::new(),
            referenced_type_names: IndexSet::new(),
            conditional_field_coords: IndexSet::new(),
        }
    }

    fn normalize(&mut self, graph: &mut ResolvabilityGraph) {
        self.detect_version();
        self.collect_root_types();
        self.build_type_model();
        self.validate_implements();
        self.initialize_configuration_data();
        self.process_keys();
        self.process_conditional_field_sets();
        self.validate_external_usage();
        self.process_events();
        self.process_subscription_filters();
        self.process_authorization();
        self.check_referenced_types();
        self.check_child_definitions();
        self.populate_graph(graph);
    }

    fn detect_version(&mut self) {
        let uses_v2 = self
            .schema
            .schema_definition
            .directives
            .iter()
            .any(|d| d.name == "link")
            || self.schema.types.values().any(|extended_type| {
                extended_type
                    .directives()
                    .iter()
                    .any(|d| catalog::V2_DIRECTIVE_NAMES.contains(&d.name))
                    || type_fields(extended_type).is_some_and(|fields| {
                        fields.values().any(|field| {
                            field
                                .directives
                                .iter()
                                .any(|d| catalog::V2_DIRECTIVE_NAMES.contains(&d.name))
                        })
                    })
            });
        self.is_version_two = uses_v2;
    }

    fn collect_root_types(&mut self) {
        let schema = self.schema;
        let definition = &schema.schema_definition;
        let entries = [
            (OperationKind::Query, definition.query.as_ref()),
            (OperationKind::Mutation, definition.mutation.as_ref()),
            (OperationKind::Subscription, definition.subscription.as_ref()),
        ];
        for (kind, component) in entries {
            let Some(component) = component else { continue };
            let custom_name = component.name.clone();
            let canonical = kind.canonical_type_name();
            match schema.types.get(&custom_name) {
                Some(ExtendedType::Object(_)) => {}
                Some(other) => {
                    self.errors.push(CompositionError::InvalidOperationTypeDefinition {
                        operation_type: operation_kind_str(kind),
                        type_name: custom_name.to_string(),
                        actual_kind: extended_kind_string(other),
                    });
                    continue;
                }
                None => {
                    self.errors.push(CompositionError::UndefinedType {
                        type_name: custom_name.to_string(),
                    });
                    continue;
                }
            }
            if custom_name != canonical {
                self.renamed_root_types.insert(custom_name, canonical.clone());
            }
            self.root_type_name_by_kind.insert(kind, canonical);
        }
    }

    fn canonical_name(&self, name: &Name) -> Name {
        self.renamed_root_types.get(name).cloned().unwrap_or_else(|| name.clone())
    }

    fn canonical_type(&self, ty: &Type) -> Type {
        match ty {
            Type::Named(name) => Type::Named(self.canonical_name(name)),
            Type::NonNullNamed(name) => Type::NonNullNamed(self.canonical_name(name)),
            Type::List(inner) => Type::List(Box::new(self.canonical_type(inner))),
            Type::NonNullList(inner) => Type::NonNullList(Box::new(self.canonical_type(inner))),
        }
    }

    fn build_type_model(&mut self) {
        let schema = self.schema;
        for (name, extended_type) in &schema.types {
            if extended_type.is_built_in() {
                continue;
            }
            let canonical = self.canonical_name(name);
            match extended_type {
                ExtendedType::Scalar(scalar) => self.upsert_scalar(&canonical, extended_type, scalar),
                ExtendedType::Object(object) => self.upsert_object(&canonical, extended_type, object),
                ExtendedType::Interface(interface) => {
                    self.upsert_interface(&canonical, extended_type, interface)
                }
                ExtendedType::Union(union_type) => {
                    self.upsert_union(&canonical, extended_type, union_type)
                }
                ExtendedType::Enum(enum_type) => self.upsert_enum(&canonical, extended_type, enum_type),
                ExtendedType::InputObject(input_object) => {
                    self.upsert_input_object(&canonical, extended_type, input_object)
                }
            }
        }
    }

    fn extract_type_directives(
        &mut self,
        extended_type: &ExtendedType,
        location: DirectiveLocation,
        coords: &str,
    ) -> DirectiveMap {
        extract_directives(
            extended_type.directives().iter().map(|c| &c.node),
            location,
            coords,
            &self.custom_definitions,
            &mut self.errors,
        )
    }

    fn new_extension_kind(extended_type: &ExtendedType, directive_map: &DirectiveMap) -> ExtensionKind {
        if directive_map.contains_key("extends") {
            return ExtensionKind::LegacyExtends;
        }
        if has_extension_elements(extended_type) && !has_non_extension_elements(extended_type) {
            return ExtensionKind::Extension;
        }
        ExtensionKind::None
    }

    fn upsert_scalar(
        &mut self,
        name: &Name,
        extended_type: &ExtendedType,
        scalar: &Node<apollo_compiler::schema::ScalarType>,
    ) {
        let directives =
            self.extract_type_directives(extended_type, DirectiveLocation::Scalar, name.as_str());
        let data = ScalarData {
            name: name.clone(),
            description: scalar.description.clone(),
            is_inaccessible: directives.contains_key("inaccessible"),
            extension_kind: Self::new_extension_kind(extended_type, &directives),
            directives,
            subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
        };
        self.type_data_by_name.insert(name.clone(), TypeData::Scalar(data));
    }

    fn upsert_object(
        &mut self,
        name: &Name,
        extended_type: &ExtendedType,
        object: &Node<apollo_compiler::schema::ObjectType>,
    ) {
        let directives =
            self.extract_type_directives(extended_type, DirectiveLocation::Object, name.as_str());
        let fields = self.upsert_fields(name, &object.fields, &directives);
        let implements: IndexSet<Name> = object
            .implements_interfaces
            .iter()
            .map(|component| self.canonical_name(&component.name))
            .collect();
        self.referenced_type_names.extend(implements.iter().cloned());
        let is_root_type = self
            .root_type_name_by_kind
            .values()
            .any(|root_name| root_name == name);
        let data = ObjectData {
            name: name.clone(),
            description: object.description.clone(),
            is_inaccessible: directives.contains_key("inaccessible"),
            extension_kind: Self::new_extension_kind(extended_type, &directives),
            fields,
            implements,
            is_entity: directives.contains_key("key"),
            is_root_type,
            interface_object_subgraph_names: if directives.contains_key("interfaceObject") {
                IndexSet::from_iter([self.subgraph_name.to_owned()])
            } else {
                IndexSet::new()
            },
            shareable_subgraph_names: if directives.contains_key("shareable") {
                IndexSet::from_iter([self.subgraph_name.to_owned()])
            } else {
                IndexSet::new()
            },
            directives,
            subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
        };
        self.type_data_by_name.insert(name.clone(), TypeData::Object(data));
    }

    fn upsert_interface(
        &mut self,
        name: &Name,
        extended_type: &ExtendedType,
        interface: &Node<apollo_compiler::schema::InterfaceType>,
    ) {
        let directives =
            self.extract_type_directives(extended_type, DirectiveLocation::Interface, name.as_str());
        let fields = self.upsert_fields(name, &interface.fields, &directives);
        let external_field_names: Vec<String> = fields
            .values()
            .filter(|field| field.is_external_in(self.subgraph_name))
            .map(|field| field.name.to_string())
            .collect();
        if !external_field_names.is_empty() {
            self.errors.push(CompositionError::ExternalInterfaceFields {
                type_name: name.to_string(),
                field_names: external_field_names,
            });
        }
        let implements: IndexSet<Name> = interface
            .implements_interfaces
            .iter()
            .map(|component| self.canonical_name(&component.name))
            .collect();
        self.referenced_type_names.extend(implements.iter().cloned());
        let data = InterfaceData {
            name: name.clone(),
            description: interface.description.clone(),
            is_inaccessible: directives.contains_key("inaccessible"),
            extension_kind: Self::new_extension_kind(extended_type, &directives),
            fields,
            implements,
            is_entity: directives.contains_key("key"),
            directives,
            subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
        };
        self.type_data_by_name
            .insert(name.clone(), TypeData::Interface(data));
    }

    fn upsert_fields(
        &mut self,
        parent_name: &Name,
        fields: &apollo_compiler::collections::IndexMap<Name, Component<ast::FieldDefinition>>,
        parent_directives: &DirectiveMap,
    ) -> IndexMap<Name, FieldData> {
        let parent_external = parent_directives.contains_key("external");
        let parent_shareable = parent_directives.contains_key("shareable");
        let mut field_data_by_name = IndexMap::new();
        for (field_name, field) in fields {
            let coords = field_coords(parent_name, field_name);
            let directives = extract_directives(
                field.directives.iter(),
                DirectiveLocation::FieldDefinition,
                &coords,
                &self.custom_definitions,
                &mut self.errors,
            );
            let ty = self.canonical_type(&field.ty);
            if type_nesting_depth(&ty) > MAXIMUM_TYPE_NESTING {
                self.errors.push(CompositionError::MaximumTypeNestingExceeded {
                    path: coords.clone(),
                    maximum: MAXIMUM_TYPE_NESTING,
                });
            }
            self.referenced_type_names.insert(ty.inner_named_type().clone());
            let mut override_source_by_subgraph_name = IndexMap::new();
            if let Some(override_directive) =
                directives.get("override").and_then(|list| list.first())
            {
                if let Some(from) = override_directive
                    .specified_argument_by_name("from")
                    .and_then(|value| value.as_str())
                {
                    if from == self.subgraph_name {
                        self.errors
                            .push(CompositionError::EquivalentSourceAndTargetOverride {
                                subgraph_name: from.to_owned(),
                                field_coords: coords.clone(),
                            });
                    } else {
                        override_source_by_subgraph_name
                            .insert(self.subgraph_name.to_owned(), from.to_owned());
                    }
                }
            }
            let arguments = self.upsert_arguments(parent_name, field_name, &field.arguments);
            let is_external = parent_external || directives.contains_key("external");
            let is_shareable = parent_shareable || directives.contains_key("shareable");
            field_data_by_name.insert(
                field_name.clone(),
                FieldData {
                    name: field_name.clone(),
                    parent_type_name: parent_name.clone(),
                    ty,
                    description: field.description.clone(),
                    is_inaccessible: directives.contains_key("inaccessible"),
                    directives,
                    arguments,
                    subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
                    external_subgraph_names: if is_external {
                        IndexSet::from_iter([self.subgraph_name.to_owned()])
                    } else {
                        IndexSet::new()
                    },
                    shareable_subgraph_names: if is_shareable {
                        IndexSet::from_iter([self.subgraph_name.to_owned()])
                    } else {
                        IndexSet::new()
                    },
                    override_source_by_subgraph_name,
                },
            );
        }
        field_data_by_name
    }

    fn upsert_arguments(
        &mut self,
        parent_name: &Name,
        field_name: &Name,
        arguments: &[Node<ast::InputValueDefinition>],
    ) -> IndexMap<Name, InputValueData> {
        let mut argument_data_by_name = IndexMap::new();
        for argument in arguments {
            let coords = crate::model::argument_coords(parent_name, field_name, &argument.name);
            let directives = extract_directives(
                argument.directives.iter(),
                DirectiveLocation::ArgumentDefinition,
                &coords,
                &self.custom_definitions,
                &mut self.errors,
            );
            let ty = self.canonical_type(&argument.ty);
            self.referenced_type_names.insert(ty.inner_named_type().clone());
            let is_required = ty.is_non_null() && argument.default_value.is_none();
            argument_data_by_name.insert(
                argument.name.clone(),
                InputValueData {
                    name: argument.name.clone(),
                    kind: InputValueKind::Argument,
                    ty,
                    description: argument.description.clone(),
                    is_inaccessible: directives.contains_key("inaccessible"),
                    directives,
                    default_value: argument.default_value.clone(),
                    subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
                    required_subgraph_names: if is_required {
                        IndexSet::from_iter([self.subgraph_name.to_owned()])
                    } else {
                        IndexSet::new()
                    },
                },
            );
        }
        argument_data_by_name
    }

    fn upsert_union(
        &mut self,
        name: &Name,
        extended_type: &ExtendedType,
        union_type: &Node<apollo_compiler::schema::UnionType>,
    ) {
        let directives =
            self.extract_type_directives(extended_type, DirectiveLocation::Union, name.as_str());
        let members: IndexSet<Name> = union_type
            .members
            .iter()
            .map(|component| self.canonical_name(&component.name))
            .collect();
        self.referenced_type_names.extend(members.iter().cloned());
        let data = UnionData {
            name: name.clone(),
            description: union_type.description.clone(),
            is_inaccessible: directives.contains_key("inaccessible"),
            extension_kind: Self::new_extension_kind(extended_type, &directives),
            members,
            directives,
            subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
        };
        self.type_data_by_name.insert(name.clone(), TypeData::Union(data));
    }

    fn upsert_enum(
        &mut self,
        name: &Name,
        extended_type: &ExtendedType,
        enum_type: &Node<apollo_compiler::schema::EnumType>,
    ) {
        let directives =
            self.extract_type_directives(extended_type, DirectiveLocation::Enum, name.as_str());
        let mut values = IndexMap::new();
        for (value_name, value) in &enum_type.values {
            let coords = format!("{name}.{value_name}");
            let value_directives = extract_directives(
                value.directives.iter(),
                DirectiveLocation::EnumValue,
                &coords,
                &self.custom_definitions,
                &mut self.errors,
            );
            values.insert(
                value_name.clone(),
                EnumValueData {
                    name: value_name.clone(),
                    description: value.description.clone(),
                    is_inaccessible: value_directives.contains_key("inaccessible"),
                    directives: value_directives,
                    subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
                },
            );
        }
        let data = EnumData {
            name: name.clone(),
            description: enum_type.description.clone(),
            is_inaccessible: directives.contains_key("inaccessible"),
            extension_kind: Self::new_extension_kind(extended_type, &directives),
            values,
            directives,
            subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
        };
        self.type_data_by_name.insert(name.clone(), TypeData::Enum(data));
    }

    fn upsert_input_object(
        &mut self,
        name: &Name,
        extended_type: &ExtendedType,
        input_object: &Node<apollo_compiler::schema::InputObjectType>,
    ) {
        let directives =
            self.extract_type_directives(extended_type, DirectiveLocation::InputObject, name.as_str());
        let mut fields = IndexMap::new();
        for (field_name, field) in &input_object.fields {
            let coords = field_coords(name, field_name);
            let field_directives = extract_directives(
                field.directives.iter(),
                DirectiveLocation::InputFieldDefinition,
                &coords,
                &self.custom_definitions,
                &mut self.errors,
            );
            let ty = self.canonical_type(&field.ty);
            self.referenced_type_names.insert(ty.inner_named_type().clone());
            let is_required = ty.is_non_null() && field.default_value.is_none();
            fields.insert(
                field_name.clone(),
                InputValueData {
                    name: field_name.clone(),
                    kind: InputValueKind::InputField,
                    ty,
                    description: field.description.clone(),
                    is_inaccessible: field_directives.contains_key("inaccessible"),
                    directives: field_directives,
                    default_value: field.default_value.clone(),
                    subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
                    required_subgraph_names: if is_required {
                        IndexSet::from_iter([self.subgraph_name.to_owned()])
                    } else {
                        IndexSet::new()
                    },
                },
            );
        }
        let data = InputObjectData {
            name: name.clone(),
            description: input_object.description.clone(),
            is_inaccessible: directives.contains_key("inaccessible"),
            extension_kind: Self::new_extension_kind(extended_type, &directives),
            fields,
            directives,
            subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
        };
        self.type_data_by_name
            .insert(name.clone(), TypeData::InputObject(data));
    }

    fn validate_implements(&mut self) {
        let mut errors = Vec::new();
        for type_data in self.type_data_by_name.values() {
            let (type_name, kind, implements) = match type_data {
                TypeData::Object(data) => (&data.name, type_data.kind_string(), &data.implements),
                TypeData::Interface(data) => (&data.name, type_data.kind_string(), &data.implements),
                TypeData::Union(data) => {
                    let invalid_members: Vec<String> = data
                        .members
                        .iter()
                        .filter(|member| {
                            !matches!(
                                self.type_data_by_name.get(*member),
                                Some(TypeData::Object(_)) | None
                            )
                        })
                        .map(Name::to_string)
                        .collect();
                    if !invalid_members.is_empty() {
                        errors.push(CompositionError::InvalidUnionMemberType {
                            type_name: data.name.to_string(),
                            invalid_members,
                        });
                    }
                    continue;
                }
                _ => continue,
            };
            for implemented_name in implements {
                if implemented_name == type_name {
                    errors.push(CompositionError::SelfImplementation {
                        type_name: type_name.to_string(),
                    });
                    continue;
                }
                match self.type_data_by_name.get(implemented_name) {
                    None | Some(TypeData::Interface(_)) => {}
                    Some(other) => errors.push(CompositionError::InvalidImplementedType {
                        kind,
                        type_name: type_name.to_string(),
                        implemented_type_name: implemented_name.to_string(),
                        implemented_kind: other.kind_string(),
                    }),
                }
            }
        }
        self.errors.extend(errors);
    }

    fn initialize_configuration_data(&mut self) {
        for type_data in self.type_data_by_name.values() {
            let Some(fields) = type_data.fields() else { continue };
            let mut configuration = ConfigurationData::new(type_data.name());
            configuration.is_root_node = matches!(type_data, TypeData::Object(data) if data.is_root_type);
            for field_data in fields.values() {
                configuration.field_names.insert(field_data.name.to_string());
                if field_data.is_external_in(self.subgraph_name) {
                    configuration
                        .external_field_names
                        .insert(field_data.name.to_string());
                }
            }
            self.configuration_data_by_type_name
                .insert(type_data.name().to_string(), configuration);
        }
    }

    fn process_keys(&mut self) {
        struct PendingKey {
            type_name: Name,
            kind: &'static str,
            raw: String,
            is_unresolvable: bool,
        }
        let mut pending = Vec::new();
        for type_data in self.type_data_by_name.values() {
            let kind = type_data.kind_string();
            let Some(key_directives) = type_data.directives().get("key") else {
                continue;
            };
            for directive in key_directives {
                let Some(raw) = directive
                    .specified_argument_by_name("fields")
                    .and_then(|value| value.as_str())
                else {
                    // Reported by directive validation.
                    continue;
                };
                let is_unresolvable = directive
                    .specified_argument_by_name("resolvable")
                    .is_some_and(|value| matches!(value.as_ref(), Value::Boolean(false)));
                pending.push(PendingKey {
                    type_name: type_data.name().clone(),
                    kind,
                    raw: raw.to_owned(),
                    is_unresolvable,
                });
            }
        }
        for key in pending {
            let walker = FieldSetWalker::new(
                &self.type_data_by_name,
                self.subgraph_name,
                &self.key_field_coords_by_type_name,
            );
            match walker.validate_key(&key.type_name, &key.raw) {
                Ok(normalized) => {
                    if let Ok(selections) = field_set::parse_field_set(&key.raw) {
                        let mut coords = IndexSet::new();
                        field_set::collect_key_field_coords(
                            &self.type_data_by_name,
                            &key.type_name,
                            &selections,
                            &mut coords,
                        );
                        self.key_field_coords_by_type_name
                            .entry(key.type_name.clone())
                            .or_default()
                            .extend(coords);
                    }
                    self.entity_data_by_type_name
                        .entry(key.type_name.clone())
                        .or_default()
                        .add_keys(
                            self.subgraph_name,
                            vec![KeyFieldSet {
                                raw: key.raw.clone(),
                                normalized: normalized.clone(),
                                is_unresolvable: key.is_unresolvable,
                            }],
                        );
                    if let Some(configuration) = self
                        .configuration_data_by_type_name
                        .get_mut(key.type_name.as_str())
                    {
                        configuration.keys.push(RequiredFieldsConfiguration {
                            field_name: String::new(),
                            selection_set: normalized,
                            disable_entity_resolver: key.is_unresolvable,
                        });
                    }
                }
                Err(error_messages) => self.errors.push(CompositionError::InvalidKeyDirective {
                    kind: key.kind,
                    type_name: key.type_name.to_string(),
                    error_messages,
                }),
            }
        }
        // Entity interface bookkeeping once all keys are known.
        let mut entity_interface_names = Vec::new();
        for type_data in self.type_data_by_name.values() {
            match type_data {
                TypeData::Interface(data) if data.is_entity => {
                    entity_interface_names.push(data.name.clone());
                }
                TypeData::Object(data)
                    if data.is_entity
                        && data
                            .interface_object_subgraph_names
                            .contains(self.subgraph_name) =>
                {
                    let entry = self
                        .entity_interface_data_by_type_name
                        .entry(data.name.clone())
                        .or_default();
                    entry.subgraph_names.insert(self.subgraph_name.to_owned());
                    entry
                        .interface_object_subgraph_names
                        .insert(self.subgraph_name.to_owned());
                    entry
                        .interface_object_field_names
                        .extend(data.fields.keys().cloned());
                }
                _ => {}
            }
        }
        for interface_name in entity_interface_names {
            let concrete_type_names: IndexSet<Name> = self
                .type_data_by_name
                .values()
                .filter_map(|type_data| match type_data {
                    TypeData::Object(data) if data.implements.contains(&interface_name) => {
                        Some(data.name.clone())
                    }
                    _ => None,
                })
                .collect();
            let interface_field_names: IndexSet<Name> = self
                .type_data_by_name
                .get(&interface_name)
                .and_then(|data| data.fields())
                .map(|fields| fields.keys().cloned().collect())
                .unwrap_or_default();
            let entry = self
                .entity_interface_data_by_type_name
                .entry(interface_name.clone())
                .or_default();
            entry.subgraph_names.insert(self.subgraph_name.to_owned());
            entry.concrete_type_names.extend(concrete_type_names);
            entry.interface_field_names.extend(interface_field_names);
        }
    }

    fn process_conditional_field_sets(&mut self) {
        struct PendingFieldSet {
            directive_name: &'static str,
            kind: FieldSetKind,
            field_coords: String,
            field_name: Name,
            parent_type_name: Name,
            root_type_name: Name,
            raw: String,
            parent_is_entity: bool,
        }
        let mut pending = Vec::new();
        for type_data in self.type_data_by_name.values() {
            let Some(fields) = type_data.fields() else { continue };
            let parent_is_entity = match type_data {
                TypeData::Object(data) => data.is_entity,
                TypeData::Interface(data) => data.is_entity,
                _ => false,
            };
            for field_data in fields.values() {
                for (directive_name, kind) in
                    [("provides", FieldSetKind::Provides), ("requires", FieldSetKind::Requires)]
                {
                    let Some(directive) = field_data
                        .directives
                        .get(directive_name)
                        .and_then(|list| list.first())
                    else {
                        continue;
                    };
                    let Some(raw) = directive
                        .specified_argument_by_name("fields")
                        .and_then(|value| value.as_str())
                    else {
                        continue;
                    };
                    let root_type_name = match kind {
                        FieldSetKind::Provides => field_data.ty.inner_named_type().clone(),
                        _ => field_data.parent_type_name.clone(),
                    };
                    pending.push(PendingFieldSet {
                        directive_name: if kind == FieldSetKind::Provides {
                            "provides"
                        } else {
                            "requires"
                        },
                        kind,
                        field_coords: field_data.coords(),
                        field_name: field_data.name.clone(),
                        parent_type_name: field_data.parent_type_name.clone(),
                        root_type_name,
                        raw: raw.to_owned(),
                        parent_is_entity,
                    });
                }
            }
        }
        for pending_set in pending {
            if pending_set.kind == FieldSetKind::Provides {
                let returns_composite = self
                    .type_data_by_name
                    .get(&pending_set.root_type_name)
                    .is_some_and(|data| data.is_composite());
                if !returns_composite {
                    self.errors
                        .push(CompositionError::InvalidProvidesOrRequiresDirectives {
                            directive_name: "provides",
                            error_messages: vec![format!(
                                " The field \"{}\" returns \"{}\", which is not a composite type; \"@provides\" can only be declared on fields returning an Object, Interface, or Union.",
                                pending_set.field_coords, pending_set.root_type_name
                            )],
                        });
                    continue;
                }
            } else if !pending_set.parent_is_entity {
                self.warnings.push(
                    CompositionWarning::RequiresOnNonEntityField {
                        field_coords: pending_set.field_coords.clone(),
                    }
                    .in_subgraph(self.subgraph_name),
                );
            }
            let walker = FieldSetWalker::new(
                &self.type_data_by_name,
                self.subgraph_name,
                &self.key_field_coords_by_type_name,
            );
            match walker.validate_conditional(&pending_set.root_type_name, &pending_set.raw, pending_set.kind)
            {
                Ok(result) => {
                    for conditional_field in &result.conditional_fields {
                        self.conditional_field_coords
                            .insert(conditional_field.coords.clone());
                        if conditional_field.is_external {
                            if conditional_field.is_unconditionally_provided {
                                self.warnings.push(
                                    CompositionWarning::FieldAlreadyProvided {
                                        field_coords: conditional_field.coords.clone(),
                                        subgraph_name: self.subgraph_name.to_owned(),
                                        providing_field_coords: pending_set.field_coords.clone(),
                                    }
                                    .in_subgraph(self.subgraph_name),
                                );
                            }
                        } else if self.is_version_two {
                            self.errors.push(CompositionError::NonExternalConditionalField {
                                field_coords: pending_set.field_coords.clone(),
                                subgraph_name: self.subgraph_name.to_owned(),
                                conditional_field_coords: conditional_field.coords.clone(),
                                directive_name: pending_set.directive_name,
                            });
                        } else {
                            self.warnings.push(
                                CompositionWarning::NonExternalConditionalField {
                                    field_coords: pending_set.field_coords.clone(),
                                    conditional_field_coords: conditional_field.coords.clone(),
                                    directive_name: pending_set.directive_name,
                                }
                                .in_subgraph(self.subgraph_name),
                            );
                        }
                    }
                    let configuration_entry = RequiredFieldsConfiguration {
                        field_name: pending_set.field_name.to_string(),
                        selection_set: result.normalized,
                        disable_entity_resolver: false,
                    };
                    if let Some(configuration) = self
                        .configuration_data_by_type_name
                        .get_mut(pending_set.parent_type_name.as_str())
                    {
                        match pending_set.kind {
                            FieldSetKind::Provides => configuration.provides.push(configuration_entry),
                            _ => configuration.requires.push(configuration_entry),
                        }
                    }
                }
                Err(error_messages) => {
                    self.errors
                        .push(CompositionError::InvalidProvidesOrRequiresDirectives {
                            directive_name: pending_set.directive_name,
                            error_messages,
                        });
                }
            }
        }
    }

    /// In a version-two subgraph, `@external` is only meaningful on entity
    /// fields (key members) or fields referenced by a conditional field set.
    fn validate_external_usage(&mut self) {
        if !self.is_version_two {
            return;
        }
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for type_data in self.type_data_by_name.values() {
            let TypeData::Object(object_data) = type_data else { continue };
            let key_coords = self.key_field_coords_by_type_name.get(&object_data.name);
            for field_data in object_data.fields.values() {
                if !field_data.is_external_in(self.subgraph_name) {
                    continue;
                }
                let coords = field_data.coords();
                let is_key_member = key_coords.is_some_and(|coords_set| coords_set.contains(&coords));
                if is_key_member {
                    if object_data.extension_kind == ExtensionKind::None {
                        warnings.push(
                            CompositionWarning::RedundantExternal { field_coords: coords }
                                .in_subgraph(self.subgraph_name),
                        );
                    }
                    continue;
                }
                if !self.conditional_field_coords.contains(&coords) && !object_data.is_entity {
                    errors.push(CompositionError::InvalidExternalDirective { field_coords: coords });
                }
            }
        }
        self.errors.extend(errors);
        self.warnings.extend(warnings);
    }

    fn process_events(&mut self) {
        struct PendingEvent {
            directive_name: Name,
            parent_type_name: Name,
            field_name: Name,
            field_coords: String,
            directive: Node<ast::Directive>,
            event_directive_count: usize,
        }
        let mut pending = Vec::new();
        for type_data in self.type_data_by_name.values() {
            let Some(fields) = type_data.fields() else { continue };
            for field_data in fields.values() {
                let event_directive_names: Vec<&Name> = field_data
                    .directives
                    .keys()
                    .filter(|name| catalog::EVENT_DIRECTIVE_NAMES.contains(*name))
                    .collect();
                for directive_name in &event_directive_names {
                    let directive = field_data.directives[*directive_name][0].clone();
                    pending.push(PendingEvent {
                        directive_name: (*directive_name).clone(),
                        parent_type_name: field_data.parent_type_name.clone(),
                        field_name: field_data.name.clone(),
                        field_coords: field_data.coords(),
                        directive,
                        event_directive_count: event_directive_names.len(),
                    });
                }
            }
        }
        if pending.is_empty() {
            return;
        }
        let mut uses_publish_result = false;
        let mut uses_stream_configuration = false;
        for event in pending {
            let Some((provider, kind)) = events::event_directive_metadata(&event.directive_name)
            else {
                continue;
            };
            let mut error_messages = Vec::new();
            if event.event_directive_count > 1 {
                error_messages.push(
                    " A field must define at most one event-driven directive.".to_owned(),
                );
            }
            let valid_root = self
                .root_type_name_by_kind
                .get(&kind.valid_operation_kind())
                .is_some_and(|root_name| *root_name == event.parent_type_name);
            if !valid_root {
                error_messages.push(format!(
                    " The directive must only be defined on a {} root field.",
                    kind.valid_operation_kind()
                ));
            }
            let field_data = self
                .type_data_by_name
                .get(&event.parent_type_name)
                .and_then(|data| data.fields())
                .and_then(|fields| fields.get(&event.field_name))
                .cloned();
            let Some(field_data) = field_data else {
                // The pending list was built from this very model.
                self.errors.push(crate::internal_error!(
                    "Expected field data for \"{}\" to exist.",
                    event.field_coords
                ));
                continue;
            };
            if matches!(kind, EventKind::Publish) {
                uses_publish_result = true;
                let expected = Type::NonNullNamed(catalog::EDFS_PUBLISH_RESULT);
                if field_data.ty != expected {
                    error_messages.push(format!(
                        " A publish field must return \"{expected}\", but \"{}\" returns \"{}\".",
                        event.field_coords, field_data.ty
                    ));
                }
            }
            let mut subjects = Vec::new();
            let mut provider_id = "default".to_owned();
            let mut stream_configuration = None;
            for argument in &event.directive.arguments {
                match argument.name.as_str() {
                    "topic" | "subject" | "channel" => {
                        if let Some(value) = argument.value.as_str() {
                            events::validate_event_subject(
                                value,
                                &argument.name,
                                &field_data,
                                &mut error_messages,
                            );
                            subjects.push(value.to_owned());
                        }
                    }
                    "topics" | "subjects" | "channels" => {
                        if let Some(items) = argument.value.as_list() {
                            for item in items {
                                if let Some(value) = item.as_str() {
                                    events::validate_event_subject(
                                        value,
                                        &argument.name,
                                        &field_data,
                                        &mut error_messages,
                                    );
                                    subjects.push(value.to_owned());
                                }
                            }
                        }
                    }
                    "providerId" => match argument.value.as_str() {
                        Some(value) if !value.is_empty() => provider_id = value.to_owned(),
                        _ => error_messages.push(
                            " If explicitly defined, the \"providerId\" argument must be a string with a minimum length of one."
                                .to_owned(),
                        ),
                    },
                    "streamConfiguration" => {
                        uses_stream_configuration = true;
                        stream_configuration =
                            events::parse_stream_configuration(&argument.value, &mut error_messages);
                    }
                    _ => {}
                }
            }
            if !error_messages.is_empty() {
                self.errors.push(CompositionError::InvalidEventDirective {
                    directive_name: event.directive_name.to_string(),
                    field_coords: event.field_coords.clone(),
                    error_messages,
                });
                continue;
            }
            let mut configuration = EventConfiguration {
                field_name: event.field_name.to_string(),
                event_kind: kind,
                provider_id,
                provider_type: provider,
                topics: Vec::new(),
                subjects: Vec::new(),
                channels: Vec::new(),
                stream_configuration,
            };
            match provider {
                events::EventProvider::Kafka => configuration.topics = subjects,
                events::EventProvider::Nats => configuration.subjects = subjects,
                events::EventProvider::Redis => configuration.channels = subjects,
            }
            if let Some(configuration_data) = self
                .configuration_data_by_type_name
                .get_mut(event.parent_type_name.as_str())
            {
                configuration_data.events.push(configuration);
            }
        }
        if uses_publish_result {
            self.ensure_publish_result_type();
        }
        if uses_stream_configuration {
            self.referenced_type_names
                .swap_remove(&catalog::EDFS_NATS_STREAM_CONFIGURATION);
        }
    }

    /// Injects the well-known `edfs__PublishResult` object when publish
    /// directives are in use and the document does not define it itself.
    fn ensure_publish_result_type(&mut self) {
        if self.type_data_by_name.contains_key(&catalog::EDFS_PUBLISH_RESULT) {
            return;
        }
        let success = FieldData {
            name: apollo_compiler::name!("success"),
            parent_type_name: catalog::EDFS_PUBLISH_RESULT,
            ty: Type::NonNullNamed(apollo_compiler::name!("Boolean")),
            description: None,
            directives: IndexMap::new(),
            arguments: IndexMap::new(),
            subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
            external_subgraph_names: IndexSet::new(),
            shareable_subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
            override_source_by_subgraph_name: IndexMap::new(),
            is_inaccessible: false,
        };
        self.type_data_by_name.insert(
            catalog::EDFS_PUBLISH_RESULT,
            TypeData::Object(ObjectData {
                name: catalog::EDFS_PUBLISH_RESULT,
                description: None,
                directives: IndexMap::new(),
                subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
                extension_kind: ExtensionKind::None,
                is_inaccessible: false,
                fields: IndexMap::from_iter([(apollo_compiler::name!("success"), success)]),
                implements: IndexSet::new(),
                is_entity: false,
                is_root_type: false,
                interface_object_subgraph_names: IndexSet::new(),
                shareable_subgraph_names: IndexSet::from_iter([self.subgraph_name.to_owned()]),
            }),
        );
    }

    fn process_subscription_filters(&mut self) {
        let subscription_root = self
            .root_type_name_by_kind
            .get(&OperationKind::Subscription)
            .cloned();
        let mut pending = Vec::new();
        for type_data in self.type_data_by_name.values() {
            let Some(fields) = type_data.fields() else { continue };
            for field_data in fields.values() {
                let Some(directive) = field_data
                    .directives
                    .get(catalog::SUBSCRIPTION_FILTER.as_str())
                    .and_then(|list| list.first())
                else {
                    continue;
                };
                let is_subscription_root_field = subscription_root
                    .as_ref()
                    .is_some_and(|root| *root == field_data.parent_type_name);
                if !is_subscription_root_field {
                    self.errors
                        .push(CompositionError::InvalidSubscriptionFilterLocation {
                            path: field_data.coords(),
                        });
                    continue;
                }
                let Some(condition) = directive.specified_argument_by_name("condition") else {
                    continue;
                };
                pending.push(PendingSubscriptionFilter {
                    field_coords: field_data.coords(),
                    response_type_name: field_data.ty.inner_named_type().clone(),
                    condition: condition.clone(),
                });
            }
        }
        self.pending_subscription_filters = pending;
    }

    fn process_authorization(&mut self) {
        struct PendingAuthorization {
            type_name: Name,
            field_name: Option<Name>,
            coords: String,
            requires_authentication: bool,
            scopes: Option<crate::authorization::OrScopes>,
        }
        let mut pending = Vec::new();
        let mut collect = |type_name: &Name, field_name: Option<&Name>, coords: String, directives: &DirectiveMap| {
            let requires_authentication = directives.contains_key("authenticated");
            let scopes = directives
                .get("requiresScopes")
                .and_then(|list| list.first())
                .and_then(|directive| directive.specified_argument_by_name("scopes"))
                .map(parse_scopes_argument);
            if requires_authentication || scopes.is_some() {
                pending.push(PendingAuthorization {
                    type_name: type_name.clone(),
                    field_name: field_name.cloned(),
                    coords,
                    requires_authentication,
                    scopes,
                });
            }
        };
        for type_data in self.type_data_by_name.values() {
            match type_data {
                TypeData::Scalar(_) | TypeData::Enum(_) => collect(
                    type_data.name(),
                    None,
                    type_data.name().to_string(),
                    type_data.directives(),
                ),
                TypeData::Object(_) | TypeData::Interface(_) => {
                    collect(
                        type_data.name(),
                        None,
                        type_data.name().to_string(),
                        type_data.directives(),
                    );
                    for field_data in type_data.fields().into_iter().flatten().map(|(_, f)| f) {
                        collect(
                            type_data.name(),
                            Some(&field_data.name),
                            field_data.coords(),
                            &field_data.directives,
                        );
                    }
                }
                _ => {}
            }
        }
        for authorization in pending {
            if let Some(scopes) = &authorization.scopes {
                if scopes.len() > MAX_OR_SCOPES {
                    self.errors.push(CompositionError::OrScopesLimitExceeded {
                        maximum: MAX_OR_SCOPES,
                        directive_coords: vec![authorization.coords.clone()],
                    });
                    continue;
                }
            }
            let data = self
                .authorization_data_by_type_name
                .entry(authorization.type_name.clone())
                .or_insert_with(|| AuthorizationData::new(authorization.type_name.clone()));
            match data.target_for(authorization.field_name.as_ref()) {
                either::Either::Left(type_target) => {
                    type_target.requires_authentication |= authorization.requires_authentication;
                    if let Some(scopes) = authorization.scopes {
                        type_target.required_scopes = scopes;
                    }
                }
                either::Either::Right(field_target) => {
                    field_target.requires_authentication |= authorization.requires_authentication;
                    if let Some(scopes) = authorization.scopes {
                        field_target.required_scopes = scopes;
                    }
                }
            }
        }
    }

    fn check_referenced_types(&mut self) {
        let mut errors = Vec::new();
        for referenced in &self.referenced_type_names {
            if catalog::is_base_scalar(referenced) {
                continue;
            }
            if !self.type_data_by_name.contains_key(referenced) {
                errors.push(CompositionError::UndefinedType {
                    type_name: referenced.to_string(),
                });
            }
        }
        self.errors.extend(errors);
    }

    fn check_child_definitions(&mut self) {
        let mut errors = Vec::new();
        for type_data in self.type_data_by_name.values() {
            match type_data {
                TypeData::Object(data) if data.fields.is_empty() => {
                    errors.push(CompositionError::NoFieldDefinitions {
                        kind: "Object",
                        type_name: data.name.to_string(),
                    });
                }
                TypeData::Interface(data) if data.fields.is_empty() => {
                    errors.push(CompositionError::NoFieldDefinitions {
                        kind: "Interface",
                        type_name: data.name.to_string(),
                    });
                }
                TypeData::InputObject(data) if data.fields.is_empty() => {
                    errors.push(CompositionError::NoInputValueDefinitions {
                        type_name: data.name.to_string(),
                    });
                }
                TypeData::Enum(data) if data.values.is_empty() => {
                    errors.push(CompositionError::NoDefinedEnumValues {
                        type_name: data.name.to_string(),
                    });
                }
                TypeData::Union(data) if data.members.is_empty() => {
                    errors.push(CompositionError::NoDefinedUnionMembers {
                        type_name: data.name.to_string(),
                    });
                }
                _ => {}
            }
        }
        self.errors.extend(errors);
    }

    fn populate_graph(&mut self, graph: &mut ResolvabilityGraph) {
        for type_data in self.type_data_by_name.values() {
            match type_data {
                TypeData::Object(data) => {
                    graph.ensure_node(&data.name);
                    if data.is_root_type {
                        for (kind, root_name) in &self.root_type_name_by_kind {
                            if *root_name == data.name {
                                graph.set_root(&data.name, *kind);
                            }
                        }
                    }
                    for implemented in &data.implements {
                        graph.add_abstract_member_edge(implemented, &data.name);
                    }
                    self.add_field_edges(graph, &data.name, &data.fields);
                }
                TypeData::Interface(data) => {
                    graph.ensure_node(&data.name);
                    self.add_field_edges(graph, &data.name, &data.fields);
                }
                TypeData::Union(data) => {
                    graph.ensure_node(&data.name);
                    for member in &data.members {
                        graph.add_abstract_member_edge(&data.name, member);
                    }
                }
                _ => {}
            }
        }
        for (type_name, entity_data) in &self.entity_data_by_type_name {
            if let Some(keys) = entity_data.keys_by_subgraph_name.get(self.subgraph_name) {
                for key in keys {
                    graph.add_satisfied_key(type_name, key.normalized.clone());
                }
            }
        }
    }

    fn add_field_edges(
        &self,
        graph: &mut ResolvabilityGraph,
        parent_name: &Name,
        fields: &IndexMap<Name, FieldData>,
    ) {
        let key_coords = self.key_field_coords_by_type_name.get(parent_name);
        for field_data in fields.values() {
            if field_data.is_external_in(self.subgraph_name) {
                let coords = field_data.coords();
                let is_provided = key_coords.is_some_and(|coords_set| coords_set.contains(&coords))
                    || self.conditional_field_coords.contains(&coords);
                if !is_provided {
                    continue;
                }
            }
            let named_type = field_data.ty.inner_named_type();
            if self
                .type_data_by_name
                .get(named_type)
                .is_some_and(|data| data.is_composite())
            {
                graph.add_field_edge(parent_name, &field_data.name, named_type);
            }
        }
    }
}

fn parse_scopes_argument(value: &Node<Value>) -> crate::authorization::OrScopes {
    let Some(or_list) = value.as_list() else {
        return Vec::new();
    };
    or_list
        .iter()
        .filter_map(|and_list| {
            and_list.as_list().map(|scopes| {
                scopes
                    .iter()
                    .filter_map(|scope| scope.as_str().map(str::to_owned))
                    .collect::<IndexSet<String>>()
            })
        })
        .filter(|and_scopes: &IndexSet<String>| !and_scopes.is_empty())
        .collect()
}

fn operation_kind_str(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Query => "query",
        OperationKind::Mutation => "mutation",
        OperationKind::Subscription => "subscription",
    }
}

fn extended_kind_string(extended_type: &ExtendedType) -> &'static str {
    match extended_type {
        ExtendedType::Scalar(_) => "Scalar",
        ExtendedType::Object(_) => "Object",
        ExtendedType::Interface(_) => "Interface",
        ExtendedType::Union(_) => "Union",
        ExtendedType::Enum(_) => "Enum",
        ExtendedType::InputObject(_) => "Input Object",
    }
}

fn type_fields(
    extended_type: &ExtendedType,
) -> Option<&apollo_compiler::collections::IndexMap<Name, Component<ast::FieldDefinition>>> {
    match extended_type {
        ExtendedType::Object(object) => Some(&object.fields),
        ExtendedType::Interface(interface) => Some(&interface.fields),
        _ => None,
    }
}

/// The number of wrapping layers of a type reference, walked iteratively.
fn type_nesting_depth(ty: &Type) -> usize {
    let mut depth = 0;
    let mut current = ty;
    loop {
        match current {
            Type::Named(_) | Type::NonNullNamed(_) => return depth,
            Type::List(inner) | Type::NonNullList(inner) => {
                depth += 1;
                if depth > MAXIMUM_TYPE_NESTING {
                    return depth;
                }
                current = inner;
            }
        }
    }
}

fn has_extension_elements(extended_type: &ExtendedType) -> bool {
    match extended_type {
        ExtendedType::Scalar(scalar) => !scalar.extensions().is_empty(),
        ExtendedType::Object(object) => !object.extensions().is_empty(),
        ExtendedType::Interface(interface) => !interface.extensions().is_empty(),
        ExtendedType::Union(union_type) => !union_type.extensions().is_empty(),
        ExtendedType::Enum(enum_type) => !enum_type.extensions().is_empty(),
        ExtendedType::InputObject(input_object) => !input_object.extensions().is_empty(),
    }
}

fn has_non_extension_elements(extended_type: &ExtendedType) -> bool {
    extended_type
        .directives()
        .iter()
        .any(|d| d.origin.extension_id().is_none())
        || match extended_type {
            ExtendedType::Scalar(_) => false,
            ExtendedType::Object(t) => {
                t.implements_interfaces
                    .iter()
                    .any(|itf| itf.origin.extension_id().is_none())
                    || t.fields.values().any(|f| f.origin.extension_id().is_none())
            }
            ExtendedType::Interface(t) => {
                t.implements_interfaces
                    .iter()
                    .any(|itf| itf.origin.extension_id().is_none())
                    || t.fields.values().any(|f| f.origin.extension_id().is_none())
            }
            ExtendedType::Union(t) => t.members.iter().any(|m| m.origin.extension_id().is_none()),
            ExtendedType::Enum(t) => t.values.values().any(|v| v.origin.extension_id().is_none()),
            ExtendedType::InputObject(t) => {
                t.fields.values().any(|f| f.origin.extension_id().is_none())
            }
        }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(sdl: &str) -> NormalizationResult {
        let subgraph = Subgraph::new("subgraph-a", "https://subgraph-a", sdl);
        let mut graph = ResolvabilityGraph::new();
        normalize_subgraph(&subgraph, &mut graph)
    }

    #[test]
    fn normalizes_a_plain_subgraph_without_errors() {
        let result = normalize(
            r#"
            type Query {
              user: User
            }

            type User {
              id: ID!
              name: String
            }
        "#,
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let normalized = result.subgraph.unwrap();
        assert!(!normalized.is_version_two);
        assert!(normalized.type_data_by_name.contains_key("User"));
        let configuration = &normalized.configuration_data_by_type_name["Query"];
        assert!(configuration.is_root_node);
        assert!(configuration.field_names.contains("user"));
    }

    #[test]
    fn extracts_entity_keys_into_entity_and_configuration_data() {
        let result = normalize(
            r#"
            type Query {
              user: User
            }

            type User @key(fields: "id") @key(fields: "id name", resolvable: false) {
              id: ID!
              name: String!
            }
        "#,
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let normalized = result.subgraph.unwrap();
        let entity = &normalized.entity_data_by_type_name["User"];
        assert_eq!(
            entity.normalized_key_field_sets,
            IndexSet::<String>::from_iter(["id".to_owned(), "id name".to_owned()])
        );
        let configuration = &normalized.configuration_data_by_type_name["User"];
        assert_eq!(configuration.keys.len(), 2);
        assert!(configuration.keys[1].disable_entity_resolver);
        assert_eq!(
            normalized.key_field_coords_by_type_name["User"],
            IndexSet::<String>::from_iter(["User.id".to_owned(), "User.name".to_owned()])
        );
    }

    #[test]
    fn shareable_marks_the_subgraph_as_version_two() {
        let result = normalize(
            r#"
            type Query {
              position: Position @shareable
            }

            type Position {
              x: Int! @shareable
              y: Int! @shareable
            }
        "#,
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let normalized = result.subgraph.unwrap();
        assert!(normalized.is_version_two);
        let TypeData::Object(position) = &normalized.type_data_by_name["Position"] else {
            panic!("expected an object");
        };
        assert!(
            position.fields["x"]
                .shareable_subgraph_names
                .contains("subgraph-a")
        );
    }

    #[test]
    fn custom_root_type_names_are_canonicalized() {
        let result = normalize(
            r#"
            schema {
              query: RootQuery
            }

            type RootQuery {
              user: User
            }

            type User {
              id: ID!
            }
        "#,
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let normalized = result.subgraph.unwrap();
        assert!(normalized.type_data_by_name.contains_key("Query"));
        assert!(!normalized.type_data_by_name.contains_key("RootQuery"));
        assert!(normalized.configuration_data_by_type_name["Query"].is_root_node);
    }

    #[test]
    fn undefined_referenced_types_are_reported() {
        let result = normalize(
            r#"
            type Query {
              user: User
            }
        "#,
        );
        assert!(
            result
                .errors
                .iter()
                .any(|e| matches!(e, CompositionError::UndefinedType { type_name } if type_name == "User")),
            "{:?}",
            result.errors
        );
    }

    #[test]
    fn subscription_filter_outside_subscription_root_is_an_error() {
        let result = normalize(
            r#"
            type Query {
              user: User @openfed__subscriptionFilter(condition: { IN: { fieldPath: "id", values: ["1"] } })
            }

            type User {
              id: ID!
            }
        "#,
        );
        assert!(
            result.errors.iter().any(|e| matches!(
                e,
                CompositionError::InvalidSubscriptionFilterLocation { path } if path == "Query.user"
            )),
            "{:?}",
            result.errors
        );
    }

    #[test]
    fn requires_scopes_are_recorded_per_field() {
        let result = normalize(
            r#"
            type Query {
              me: User @requiresScopes(scopes: [["read:users", "read:profiles"], ["admin"]])
            }

            type User {
              id: ID!
            }
        "#,
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let normalized = result.subgraph.unwrap();
        let authorization = &normalized.authorization_data_by_type_name["Query"];
        let field_auth = &authorization.field_auth_by_field_name["me"];
        assert_eq!(field_auth.required_scopes.len(), 2);
        assert_eq!(field_auth.required_scopes[0].len(), 2);
        assert!(field_auth.required_scopes[1].contains("admin"));
    }

    #[test]
    fn external_interface_fields_are_rejected() {
        let result = normalize(
            r#"
            type Query {
              node: Node
            }

            interface Node {
              id: ID! @external
            }
        "#,
        );
        assert!(
            result.errors.iter().any(|e| matches!(
                e,
                CompositionError::ExternalInterfaceFields { type_name, .. } if type_name == "Node"
            )),
            "{:?}",
            result.errors
        );
    }

    #[test]
    fn kafka_publish_configuration_is_extracted() {
        let result = normalize(
            r#"
            type Query {
              dummy: String
            }

            type Mutation {
              publishUserEvent(id: ID!): edfs__PublishResult! @edfs__kafkaPublish(topic: "users.{{ args.id }}")
            }
        "#,
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let normalized = result.subgraph.unwrap();
        let configuration = &normalized.configuration_data_by_type_name["Mutation"];
        assert_eq!(configuration.events.len(), 1);
        let event = &configuration.events[0];
        assert_eq!(event.provider_id, "default");
        assert_eq!(event.topics, vec!["users.{{ args.id }}".to_owned()]);
        assert_eq!(event.event_kind, EventKind::Publish);
        assert!(normalized.type_data_by_name.contains_key("edfs__PublishResult"));
    }

    #[test]
    fn publish_fields_must_return_the_publish_result_type() {
        let result = normalize(
            r#"
            type Query {
              dummy: String
            }

            type Mutation {
              publishUserEvent(id: ID!): Boolean! @edfs__kafkaPublish(topic: "users")
            }
        "#,
        );
        assert!(
            result.errors.iter().any(|e| {
                matches!(e, CompositionError::InvalidEventDirective { field_coords, .. }
                    if field_coords == "Mutation.publishUserEvent")
            }),
            "{:?}",
            result.errors
        );
    }

    #[test]
    fn version_two_external_requires_a_reason_to_exist() {
        let result = normalize(
            r#"
            type Query {
              user: User
            }

            type User @shareable {
              id: ID! @external
            }
        "#,
        );
        assert!(
            result.errors.iter().any(|e| matches!(
                e,
                CompositionError::InvalidExternalDirective { field_coords } if field_coords == "User.id"
            )),
            "{:?}",
            result.errors
        );
    }
}

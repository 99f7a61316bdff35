//! Cross-subgraph federation: merges every normalized subgraph into one
//! composed model, propagates accessibility/tag/authorization data, proves
//! resolvability, and emits the final schemas and router configuration.

pub(crate) mod accessibility;
pub(crate) mod contracts;
pub(crate) mod emit;
pub(crate) mod type_merge;

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use itertools::Itertools;
use tracing::debug;

use crate::authorization::AuthorizationData;
use crate::authorization::OrScopes;
use crate::authorization::merge_requirements_by_and;
use crate::authorization::merge_scopes_by_or;
use crate::catalog::MAX_OR_SCOPES;
use crate::error::CompositionError;
use crate::error::CompositionWarning;
use crate::model::EnumUsage;
use crate::model::ExtensionKind;
use crate::model::TypeData;
use crate::normalize::NormalizedSubgraph;
use crate::normalize::batch::BatchNormalizationResult;
use crate::router_config::FieldConfiguration;
use crate::router_config::SubgraphConfig;
use crate::subscription_filter::SubscriptionFilterCondition;
use crate::subscription_filter::SubscriptionFilterValidator;
use crate::FederationFailure;
use crate::FederationOptions;
use type_merge::MergeContext;

/// Everything a successful federation produces, including the merged model
/// and tag tree the contract filter re-assembles from.
#[derive(Debug)]
pub(crate) struct FederationArtifacts {
    pub(crate) router_schema: apollo_compiler::Schema,
    pub(crate) client_schema: apollo_compiler::Schema,
    pub(crate) field_configurations: Vec<FieldConfiguration>,
    pub(crate) subgraph_configs_by_name: IndexMap<String, SubgraphConfig>,
    pub(crate) warnings: Vec<CompositionWarning>,
    pub(crate) merged_type_data_by_name: IndexMap<Name, TypeData>,
    pub(crate) tags_by_coordinate: accessibility::TagsByCoordinate,
    pub(crate) authorization_data_by_type_name: IndexMap<Name, AuthorizationData>,
    pub(crate) subscription_filter_by_field_coords: IndexMap<String, SubscriptionFilterCondition>,
}

pub(crate) fn federate(
    mut batch: BatchNormalizationResult,
    options: &FederationOptions,
) -> Result<FederationArtifacts, FederationFailure> {
    let had_normalization_errors = !batch.errors.is_empty();
    let mut federator = Federator {
        errors: std::mem::take(&mut batch.errors),
        warnings: std::mem::take(&mut batch.warnings),
        merged_type_data_by_name: IndexMap::new(),
        enum_usage_by_type_name: IndexMap::new(),
        authorization_data_by_type_name: IndexMap::new(),
        subscription_filter_by_field_coords: IndexMap::new(),
        key_field_coords_by_type_name: IndexMap::new(),
        interface_object_propagated_coords: IndexSet::new(),
    };
    federator.collect_enum_usages(&batch.subgraphs);
    federator.collect_key_field_coords(&batch.subgraphs);
    federator.merge_subgraphs(&batch.subgraphs);
    federator.check_orphan_extensions();
    federator.finalize_enums();
    federator.finalize_input_objects();
    federator.finalize_arguments();
    federator.propagate_entity_interface_fields(&batch);
    federator.check_external_fields(&batch.subgraphs);
    federator.check_field_shareability();
    federator.check_interface_implementations();
    federator.merge_authorization_data(&batch.subgraphs);
    federator.validate_subscription_filters(&batch.subgraphs);
    accessibility::propagate_inaccessibility(
        &mut federator.merged_type_data_by_name,
        &mut federator.errors,
    );
    if batch.subgraphs.len() > 1
        && !had_normalization_errors
        && federator.errors.is_empty()
        && !options.disable_resolvability_validation
    {
        batch
            .graph
            .finalize_entity_jumps(&batch.entity_data_by_type_name);
        let root_type_names: IndexSet<Name> = federator
            .merged_type_data_by_name
            .values()
            .filter(|data| matches!(data, TypeData::Object(object) if object.is_root_type))
            .map(|data| data.name().clone())
            .collect();
        let resolvability_errors = batch.graph.validate(
            &federator.merged_type_data_by_name,
            &root_type_names,
            &federator.interface_object_propagated_coords,
        );
        federator.errors.extend(resolvability_errors);
    }
    let field_configurations = build_field_configurations(
        &federator.merged_type_data_by_name,
        &federator.authorization_data_by_type_name,
        &federator.subscription_filter_by_field_coords,
        &mut federator.errors,
    );
    if !federator.errors.is_empty() {
        return Err(FederationFailure {
            errors: federator.errors,
            warnings: federator.warnings,
        });
    }
    debug!(
        types = federator.merged_type_data_by_name.len(),
        "federation succeeded"
    );
    let tags_by_coordinate = accessibility::collect_tags(&federator.merged_type_data_by_name);
    let router_schema = emit::new_schema(
        &federator.merged_type_data_by_name,
        emit::SchemaFlavor::Router,
    );
    let client_schema = emit::new_schema(
        &federator.merged_type_data_by_name,
        emit::SchemaFlavor::Client,
    );
    let subgraph_configs_by_name = federator.new_subgraph_configs(&batch);
    Ok(FederationArtifacts {
        router_schema,
        client_schema,
        field_configurations,
        subgraph_configs_by_name,
        warnings: federator.warnings,
        merged_type_data_by_name: federator.merged_type_data_by_name,
        tags_by_coordinate,
        authorization_data_by_type_name: federator.authorization_data_by_type_name,
        subscription_filter_by_field_coords: federator.subscription_filter_by_field_coords,
    })
}

struct Federator {
    errors: Vec<CompositionError>,
    warnings: Vec<CompositionWarning>,
    merged_type_data_by_name: IndexMap<Name, TypeData>,
    enum_usage_by_type_name: IndexMap<Name, EnumUsage>,
    authorization_data_by_type_name: IndexMap<Name, AuthorizationData>,
    subscription_filter_by_field_coords: IndexMap<String, SubscriptionFilterCondition>,
    /// Union of every subgraph's key member coordinates per entity type.
    key_field_coords_by_type_name: IndexMap<Name, IndexSet<String>>,
    /// Concrete-type field coordinates added by interface-object
    /// propagation, exempt from the per-field resolvability proof.
    interface_object_propagated_coords: IndexSet<String>,
}

impl Federator {
    /// An enum's merge strategy depends on whether its name ever appears in
    /// an input position, an output position, or both, across all subgraphs.
    fn collect_enum_usages(&mut self, subgraphs: &[NormalizedSubgraph]) {
        let enum_type_names: IndexSet<Name> = subgraphs
            .iter()
            .flat_map(|subgraph| subgraph.type_data_by_name.values())
            .filter(|data| matches!(data, TypeData::Enum(_)))
            .map(|data| data.name().clone())
            .collect();
        for subgraph in subgraphs {
            for type_data in subgraph.type_data_by_name.values() {
                match type_data {
                    TypeData::Object(_) | TypeData::Interface(_) => {
                        for field in type_data.fields().into_iter().flatten().map(|(_, f)| f) {
                            let named = field.ty.inner_named_type();
                            if enum_type_names.contains(named) {
                                self.enum_usage_by_type_name
                                    .entry(named.clone())
                                    .or_default()
                                    .output = true;
                            }
                            for argument in field.arguments.values() {
                                let named = argument.ty.inner_named_type();
                                if enum_type_names.contains(named) {
                                    self.enum_usage_by_type_name
                                        .entry(named.clone())
                                        .or_default()
                                        .input = true;
                                }
                            }
                        }
                    }
                    TypeData::InputObject(data) => {
                        for field in data.fields.values() {
                            let named = field.ty.inner_named_type();
                            if enum_type_names.contains(named) {
                                self.enum_usage_by_type_name
                                    .entry(named.clone())
                                    .or_default()
                                    .input = true;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn collect_key_field_coords(&mut self, subgraphs: &[NormalizedSubgraph]) {
        for subgraph in subgraphs {
            for (type_name, coords) in &subgraph.key_field_coords_by_type_name {
                self.key_field_coords_by_type_name
                    .entry(type_name.clone())
                    .or_default()
                    .extend(coords.iter().cloned());
            }
        }
    }

    fn merge_subgraphs(&mut self, subgraphs: &[NormalizedSubgraph]) {
        for subgraph in subgraphs {
            for (type_name, type_data) in &subgraph.type_data_by_name {
                match self.merged_type_data_by_name.get_mut(type_name) {
                    None => {
                        self.merged_type_data_by_name
                            .insert(type_name.clone(), type_data.clone());
                    }
                    Some(target) => {
                        let mut ctx = MergeContext {
                            errors: &mut self.errors,
                            warnings: &mut self.warnings,
                        };
                        type_merge::merge_type_data(target, type_data, &mut ctx);
                    }
                }
            }
        }
    }

    /// A type seen only as an extension, in every subgraph, has no base
    /// definition to attach to. Entities are exempt: the V1 convention models
    /// them as extensions everywhere.
    fn check_orphan_extensions(&mut self) {
        let mut errors = Vec::new();
        for type_data in self.merged_type_data_by_name.values() {
            if type_data.extension_kind() == ExtensionKind::None {
                continue;
            }
            let is_entity = match type_data {
                TypeData::Object(data) => data.is_entity,
                TypeData::Interface(data) => data.is_entity,
                _ => false,
            };
            if !is_entity {
                errors.push(CompositionError::NoBaseDefinitionForExtension {
                    kind: type_data.kind_string(),
                    type_name: type_data.name().to_string(),
                });
            }
        }
        self.errors.extend(errors);
    }

    fn finalize_enums(&mut self) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for type_data in self.merged_type_data_by_name.values_mut() {
            let TypeData::Enum(enum_data) = type_data else { continue };
            let mode = self
                .enum_usage_by_type_name
                .get(&enum_data.name)
                .copied()
                .unwrap_or_default()
                .merge_mode();
            let mut ctx = MergeContext {
                errors: &mut errors,
                warnings: &mut warnings,
            };
            type_merge::finalize_enum_values(enum_data, mode, &mut ctx);
        }
        self.errors.extend(errors);
        self.warnings.extend(warnings);
    }

    /// Input-object fields are intersected: a field missing from some
    /// defining subgraphs is dropped, unless it is required somewhere.
    fn finalize_input_objects(&mut self) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for type_data in self.merged_type_data_by_name.values_mut() {
            let TypeData::InputObject(input_data) = type_data else { continue };
            let defining_subgraphs = input_data.subgraph_names.clone();
            let type_name = input_data.name.clone();
            input_data.fields.retain(|field_name, field| {
                let missing: Vec<String> = defining_subgraphs
                    .difference(&field.subgraph_names)
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    return true;
                }
                let coords = crate::model::field_coords(&type_name, field_name);
                if field.is_required() {
                    errors.push(CompositionError::InvalidRequiredInputValue {
                        kind: "Input field",
                        coords,
                        required_subgraph_names: field
                            .required_subgraph_names
                            .iter()
                            .cloned()
                            .collect(),
                        missing_subgraph_names: missing,
                    });
                    return true;
                }
                warnings.push(CompositionWarning::InconsistentInputField {
                    field_coords: coords,
                    missing_subgraph_names: missing,
                });
                false
            });
        }
        self.errors.extend(errors);
        self.warnings.extend(warnings);
    }

    /// Field arguments are intersected with the same required-value rule.
    fn finalize_arguments(&mut self) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for type_data in self.merged_type_data_by_name.values_mut() {
            let Some(fields) = type_data.fields_mut() else { continue };
            for field in fields.values_mut() {
                let field_subgraphs = field.subgraph_names.clone();
                let parent = field.parent_type_name.clone();
                let field_name = field.name.clone();
                field.arguments.retain(|argument_name, argument| {
                    let missing: Vec<String> = field_subgraphs
                        .difference(&argument.subgraph_names)
                        .cloned()
                        .collect();
                    if missing.is_empty() {
                        return true;
                    }
                    let coords =
                        crate::model::argument_coords(&parent, &field_name, argument_name);
                    if argument.is_required() {
                        errors.push(CompositionError::InvalidRequiredInputValue {
                            kind: "argument",
                            coords,
                            required_subgraph_names: argument
                                .required_subgraph_names
                                .iter()
                                .cloned()
                                .collect(),
                            missing_subgraph_names: missing,
                        });
                        return true;
                    }
                    warnings.push(CompositionWarning::InconsistentArgument {
                        argument_coords: coords,
                        missing_subgraph_names: missing,
                    });
                    false
                });
            }
        }
        self.errors.extend(errors);
        self.warnings.extend(warnings);
    }

    /// Fields a subgraph models through `@interfaceObject` become fields of
    /// every concrete type of the entity interface.
    fn propagate_entity_interface_fields(&mut self, batch: &BatchNormalizationResult) {
        for (interface_name, entity_interface) in &batch.entity_interface_data_by_type_name {
            let propagated_field_names: Vec<Name> = entity_interface
                .interface_object_field_names
                .difference(&entity_interface.interface_field_names)
                .cloned()
                .collect();
            if propagated_field_names.is_empty() {
                continue;
            }
            let interface_fields: Vec<crate::model::FieldData> =
                match self.merged_type_data_by_name.get(interface_name) {
                    Some(data) => data
                        .fields()
                        .map(|fields| {
                            fields
                                .values()
                                .filter(|field| propagated_field_names.contains(&field.name))
                                .cloned()
                                .collect()
                        })
                        .unwrap_or_default(),
                    None => continue,
                };
            for concrete_type_name in &entity_interface.concrete_type_names {
                let Some(concrete) = self.merged_type_data_by_name.get_mut(concrete_type_name)
                else {
                    continue;
                };
                let Some(fields) = concrete.fields_mut() else { continue };
                for interface_field in &interface_fields {
                    if fields.contains_key(&interface_field.name) {
                        continue;
                    }
                    let mut propagated = interface_field.clone();
                    propagated.parent_type_name = concrete_type_name.clone();
                    // Propagated fields are resolved through the interface
                    // object, never independently, so they are exempt from
                    // shareability checks and the per-field reachability
                    // proof.
                    propagated.shareable_subgraph_names = propagated.subgraph_names.clone();
                    self.interface_object_propagated_coords
                        .insert(propagated.coords());
                    fields.insert(propagated.name.clone(), propagated);
                }
            }
        }
    }

    /// A field declared `@external` in every subgraph that defines it can
    /// never be resolved, unless some `@provides`/`@requires` selection
    /// conditionally fetches it.
    fn check_external_fields(&mut self, subgraphs: &[NormalizedSubgraph]) {
        let conditional_coords: IndexSet<&String> = subgraphs
            .iter()
            .flat_map(|subgraph| subgraph.conditional_field_coords.iter())
            .collect();
        let mut errors = Vec::new();
        for type_data in self.merged_type_data_by_name.values() {
            let TypeData::Object(object_data) = type_data else { continue };
            let key_coords = self.key_field_coords_by_type_name.get(&object_data.name);
            let all_external_field_names: Vec<String> = object_data
                .fields
                .values()
                .filter(|field| {
                    !field.subgraph_names.is_empty()
                        && field.external_subgraph_names == field.subgraph_names
                        && !conditional_coords.contains(&field.coords())
                        && !key_coords.is_some_and(|coords| coords.contains(&field.coords()))
                })
                .map(|field| field.name.to_string())
                .collect();
            if !all_external_field_names.is_empty() {
                errors.push(CompositionError::AllExternalFieldInstances {
                    type_name: object_data.name.to_string(),
                    field_names: all_external_field_names,
                });
            }
        }
        self.errors.extend(errors);
    }

    fn check_field_shareability(&mut self) {
        let mut errors = Vec::new();
        for type_data in self.merged_type_data_by_name.values() {
            let TypeData::Object(object_data) = type_data else { continue };
            if object_data.is_root_type {
                continue;
            }
            let key_coords = self.key_field_coords_by_type_name.get(&object_data.name);
            let mut error_messages = Vec::new();
            for field in object_data.fields.values() {
                let resolvable = field.resolvable_subgraph_names();
                if resolvable.len() < 2 {
                    continue;
                }
                if key_coords.is_some_and(|coords| coords.contains(&field.coords())) {
                    continue;
                }
                let shareable: Vec<&String> = resolvable
                    .iter()
                    .filter(|name| {
                        field.is_shareable_in(name)
                            || object_data.shareable_subgraph_names.contains(*name)
                    })
                    .collect();
                if shareable.len() == resolvable.len() {
                    continue;
                }
                if shareable.is_empty() {
                    error_messages.push(format!(
                        "\n The field \"{}\" is defined in the following subgraphs: \"{}\".\n However, it is not declared \"@shareable\" in any of them.",
                        field.name,
                        resolvable.iter().join("\", \"")
                    ));
                } else {
                    let non_shareable: Vec<&String> = resolvable
                        .iter()
                        .filter(|name| !shareable.contains(name))
                        .collect();
                    error_messages.push(format!(
                        "\n The field \"{}\" is defined and declared \"@shareable\" in the following subgraph{}: \"{}\".\n However, it is not declared \"@shareable\" in the following subgraph{}: \"{}\".",
                        field.name,
                        if shareable.len() > 1 { "s" } else { "" },
                        shareable.iter().join("\", \""),
                        if non_shareable.len() > 1 { "s" } else { "" },
                        non_shareable.iter().join("\", \"")
                    ));
                }
            }
            if !error_messages.is_empty() {
                errors.push(CompositionError::InvalidFieldShareability {
                    type_name: object_data.name.to_string(),
                    error_messages,
                });
            }
        }
        self.errors.extend(errors);
    }

    /// Interface conformance is deferred to this second pass because an
    /// interface may be defined in a later subgraph than its implementors.
    fn check_interface_implementations(&mut self) {
        let mut errors = Vec::new();
        for type_data in self.merged_type_data_by_name.values() {
            let (type_name, kind, fields, implements) = match type_data {
                TypeData::Object(data) => {
                    (&data.name, "Object", &data.fields, &data.implements)
                }
                TypeData::Interface(data) => {
                    (&data.name, "Interface", &data.fields, &data.implements)
                }
                _ => continue,
            };
            let mut error_messages = Vec::new();
            for interface_name in implements {
                let Some(TypeData::Interface(interface_data)) =
                    self.merged_type_data_by_name.get(interface_name)
                else {
                    continue;
                };
                for interface_field in interface_data.fields.values() {
                    let Some(implemented_field) = fields.get(&interface_field.name) else {
                        error_messages.push(format!(
                            " The field \"{}.{}\" is required by the Interface \"{interface_name}\" but is not implemented.",
                            interface_name, interface_field.name
                        ));
                        continue;
                    };
                    if !self.is_covariant(&implemented_field.ty, &interface_field.ty) {
                        error_messages.push(format!(
                            " The field \"{}\" must return a type compatible with \"{}\" as required by the Interface \"{interface_name}\", but returns \"{}\".",
                            implemented_field.coords(),
                            interface_field.ty,
                            implemented_field.ty
                        ));
                    }
                    for interface_argument in interface_field.arguments.values() {
                        match implemented_field.arguments.get(&interface_argument.name) {
                            None => error_messages.push(format!(
                                " The field \"{}\" must define the argument \"{}\" as required by the Interface \"{interface_name}\".",
                                implemented_field.coords(),
                                interface_argument.name
                            )),
                            Some(implemented_argument)
                                if implemented_argument.ty != interface_argument.ty =>
                            {
                                error_messages.push(format!(
                                    " The argument \"{}\" of field \"{}\" must be type \"{}\" as required by the Interface \"{interface_name}\", but is type \"{}\".",
                                    interface_argument.name,
                                    implemented_field.coords(),
                                    interface_argument.ty,
                                    implemented_argument.ty
                                ));
                            }
                            Some(_) => {}
                        }
                    }
                    for implemented_argument in implemented_field.arguments.values() {
                        if !interface_field
                            .arguments
                            .contains_key(&implemented_argument.name)
                            && implemented_argument.is_required()
                        {
                            error_messages.push(format!(
                                " The additional argument \"{}\" of field \"{}\" must not be required, because the Interface \"{interface_name}\" does not define it.",
                                implemented_argument.name,
                                implemented_field.coords()
                            ));
                        }
                    }
                    if !interface_field.is_inaccessible && implemented_field.is_inaccessible {
                        error_messages.push(format!(
                            " The field \"{}\" must be accessible because the Interface field \"{}.{}\" is accessible.",
                            implemented_field.coords(),
                            interface_name,
                            interface_field.name
                        ));
                    }
                }
            }
            if !error_messages.is_empty() {
                errors.push(CompositionError::InvalidInterfaceImplementation {
                    kind,
                    type_name: type_name.to_string(),
                    error_messages,
                });
            }
        }
        self.errors.extend(errors);
    }

    /// Covariant return-type conformance against the merged model.
    fn is_covariant(&self, implemented: &apollo_compiler::ast::Type, required: &apollo_compiler::ast::Type) -> bool {
        use apollo_compiler::ast::Type;
        match (implemented, required) {
            (Type::NonNullNamed(a), Type::NonNullNamed(b))
            | (Type::NonNullNamed(a), Type::Named(b))
            | (Type::Named(a), Type::Named(b)) => self.is_assignable_named(a, b),
            (Type::NonNullList(a), Type::NonNullList(b))
            | (Type::NonNullList(a), Type::List(b))
            | (Type::List(a), Type::List(b)) => self.is_covariant(a, b),
            _ => false,
        }
    }

    fn is_assignable_named(&self, sub: &Name, sup: &Name) -> bool {
        if sub == sup {
            return true;
        }
        match self.merged_type_data_by_name.get(sub) {
            Some(TypeData::Object(data)) if data.implements.contains(sup) => return true,
            Some(TypeData::Interface(data)) if data.implements.contains(sup) => return true,
            _ => {}
        }
        matches!(
            self.merged_type_data_by_name.get(sup),
            Some(TypeData::Union(union_data)) if union_data.members.contains(sub)
        )
    }

    /// Same-coordinate requirements from different subgraphs combine by OR.
    fn merge_authorization_data(&mut self, subgraphs: &[NormalizedSubgraph]) {
        for subgraph in subgraphs {
            for (type_name, incoming) in &subgraph.authorization_data_by_type_name {
                let target = self
                    .authorization_data_by_type_name
                    .entry(type_name.clone())
                    .or_insert_with(|| AuthorizationData::new(type_name.clone()));
                target.requires_authentication |= incoming.requires_authentication;
                target.has_parent_level_authorization |= incoming.has_parent_level_authorization;
                if !merge_scopes_by_or(&incoming.required_scopes, &mut target.required_scopes) {
                    self.errors.push(CompositionError::OrScopesLimitExceeded {
                        maximum: MAX_OR_SCOPES,
                        directive_coords: vec![type_name.to_string()],
                    });
                }
                for (field_name, incoming_field) in &incoming.field_auth_by_field_name {
                    let target_field = target
                        .field_auth_by_field_name
                        .entry(field_name.clone())
                        .or_insert_with(|| {
                            crate::authorization::FieldAuthorizationData::new(field_name.clone())
                        });
                    target_field.requires_authentication |= incoming_field.requires_authentication;
                    if !merge_scopes_by_or(
                        &incoming_field.required_scopes,
                        &mut target_field.required_scopes,
                    ) {
                        self.errors.push(CompositionError::OrScopesLimitExceeded {
                            maximum: MAX_OR_SCOPES,
                            directive_coords: vec![crate::model::field_coords(
                                type_name, field_name,
                            )],
                        });
                    }
                }
            }
        }
    }

    fn validate_subscription_filters(&mut self, subgraphs: &[NormalizedSubgraph]) {
        for subgraph in subgraphs {
            for pending in &subgraph.pending_subscription_filters {
                let validator = SubscriptionFilterValidator::new(
                    &subgraph.type_data_by_name,
                    &subgraph.name,
                    &pending.response_type_name,
                );
                match validator.validate(&pending.condition) {
                    Ok(condition) => {
                        self.subscription_filter_by_field_coords
                            .insert(pending.field_coords.clone(), condition);
                    }
                    Err(error_messages) => {
                        self.errors
                            .push(CompositionError::InvalidSubscriptionFilterDirective {
                                field_coords: pending.field_coords.clone(),
                                error_messages,
                            });
                    }
                }
            }
        }
    }

    fn new_subgraph_configs(
        &self,
        batch: &BatchNormalizationResult,
    ) -> IndexMap<String, SubgraphConfig> {
        // Effective overrides remove the field from the source subgraph's
        // routing configuration.
        let mut overridden: Vec<(String, Name, Name)> = Vec::new();
        for type_data in self.merged_type_data_by_name.values() {
            for field in type_data.fields().into_iter().flatten().map(|(_, f)| f) {
                for source_subgraph in field.override_source_by_subgraph_name.values() {
                    overridden.push((
                        source_subgraph.clone(),
                        field.parent_type_name.clone(),
                        field.name.clone(),
                    ));
                }
            }
        }
        let mut configs = IndexMap::new();
        for subgraph in &batch.subgraphs {
            let mut configuration_data = subgraph.configuration_data_by_type_name.clone();
            for (source_subgraph, type_name, field_name) in &overridden {
                if *source_subgraph == subgraph.name {
                    if let Some(configuration) = configuration_data.get_mut(type_name.as_str()) {
                        configuration.field_names.shift_remove(field_name.as_str());
                    }
                }
            }
            for (interface_name, entity_interface) in &batch.entity_interface_data_by_type_name {
                if entity_interface
                    .interface_object_subgraph_names
                    .contains(&subgraph.name)
                    || entity_interface.subgraph_names.contains(&subgraph.name)
                {
                    if let Some(configuration) =
                        configuration_data.get_mut(interface_name.as_str())
                    {
                        configuration.entity_interface_concrete_type_names = entity_interface
                            .concrete_type_names
                            .iter()
                            .map(Name::to_string)
                            .collect();
                    }
                }
            }
            configs.insert(
                subgraph.name.clone(),
                SubgraphConfig {
                    name: subgraph.name.clone(),
                    url: subgraph.url.clone(),
                    schema: subgraph.schema.clone(),
                    configuration_data_by_type_name: configuration_data,
                },
            );
        }
        configs
    }
}

/// Effective field requirements: the field's own, AND its parent type's, AND
/// its named return type's, AND any implemented interface field's.
fn field_authorization(
    authorization_data_by_type_name: &IndexMap<Name, AuthorizationData>,
    type_name: &Name,
    field: &crate::model::FieldData,
    implements: &IndexSet<Name>,
) -> Result<(bool, OrScopes), ()> {
    let mut requires_authentication = false;
    let mut required_scopes = OrScopes::new();
    let mut apply = |incoming_auth: &bool, incoming_scopes: &OrScopes| -> Result<(), ()> {
        if merge_requirements_by_and(
            *incoming_auth,
            incoming_scopes,
            &mut requires_authentication,
            &mut required_scopes,
        ) {
            Ok(())
        } else {
            Err(())
        }
    };
    if let Some(type_auth) = authorization_data_by_type_name.get(type_name) {
        if type_auth.has_parent_level_authorization {
            apply(&type_auth.requires_authentication, &type_auth.required_scopes)?;
        }
        if let Some(field_auth) = type_auth.field_auth_by_field_name.get(&field.name) {
            apply(
                &field_auth.requires_authentication,
                &field_auth.required_scopes,
            )?;
        }
    }
    if let Some(return_auth) = authorization_data_by_type_name.get(field.ty.inner_named_type()) {
        if return_auth.has_parent_level_authorization {
            apply(
                &return_auth.requires_authentication,
                &return_auth.required_scopes,
            )?;
        }
    }
    for interface_name in implements {
        if let Some(interface_auth) = authorization_data_by_type_name.get(interface_name) {
            if let Some(field_auth) = interface_auth.field_auth_by_field_name.get(&field.name) {
                apply(
                    &field_auth.requires_authentication,
                    &field_auth.required_scopes,
                )?;
            }
        }
    }
    Ok((requires_authentication, required_scopes))
}

/// Builds the per-field routing/authorization entries of the composed graph.
/// Shared by base federation and contract re-assembly.
pub(crate) fn build_field_configurations(
    merged_type_data_by_name: &IndexMap<Name, TypeData>,
    authorization_data_by_type_name: &IndexMap<Name, AuthorizationData>,
    subscription_filter_by_field_coords: &IndexMap<String, SubscriptionFilterCondition>,
    errors: &mut Vec<CompositionError>,
) -> Vec<FieldConfiguration> {
    let mut configurations = Vec::new();
    let mut overflow_coords = Vec::new();
    for type_data in merged_type_data_by_name.values() {
        let implements = match type_data {
            TypeData::Object(data) => &data.implements,
            TypeData::Interface(data) => &data.implements,
            _ => continue,
        };
        let type_name = type_data.name();
        for field in type_data.fields().into_iter().flatten().map(|(_, f)| f) {
            let (requires_authentication, required_scopes) = match field_authorization(
                authorization_data_by_type_name,
                type_name,
                field,
                implements,
            ) {
                Ok(requirements) => requirements,
                Err(()) => {
                    overflow_coords.push(field.coords());
                    continue;
                }
            };
            let subscription_filter_condition = subscription_filter_by_field_coords
                .get(&field.coords())
                .cloned();
            let argument_names: Vec<String> = field.arguments.keys().map(Name::to_string).collect();
            if argument_names.is_empty()
                && !requires_authentication
                && required_scopes.is_empty()
                && subscription_filter_condition.is_none()
            {
                continue;
            }
            let scopes: Vec<Vec<String>> = required_scopes
                .iter()
                .map(|and_scopes| and_scopes.iter().cloned().collect())
                .collect();
            configurations.push(FieldConfiguration {
                type_name: type_name.to_string(),
                field_name: field.name.to_string(),
                argument_names,
                requires_authentication,
                required_scopes: scopes.clone(),
                required_scopes_by_or: scopes,
                subscription_filter_condition,
            });
        }
    }
    if !overflow_coords.is_empty() {
        errors.push(CompositionError::OrScopesLimitExceeded {
            maximum: MAX_OR_SCOPES,
            directive_coords: overflow_coords,
        });
    }
    configurations
}

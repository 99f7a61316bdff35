//! Contract filtering: derives a named schema subset from an already
//! composed result by filtering elements through `@tag` include/exclude
//! sets, then re-running only the final assembly.
//!
//! Filtered elements are removed from a structural clone of the merged
//! model, with removal propagated both downward (children of a removed
//! type) and upward (a parent whose children are all removed, and fields
//! referencing a removed type). The base result is never touched, and the
//! resolvability proof is shared rather than recomputed.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::FederationFailure;
use crate::error::CompositionError;
use crate::federate::FederationArtifacts;
use crate::federate::accessibility;
use crate::federate::build_field_configurations;
use crate::federate::emit;
use crate::model::TypeData;

/// Tag names selecting what a contract removes or keeps. The two modes are
/// mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractTagOptions {
    /// Elements carrying any of these tags are removed.
    Exclude(IndexSet<String>),
    /// Tagged elements carrying none of these tags are removed.
    Include(IndexSet<String>),
}

impl ContractTagOptions {
    fn filters_out(&self, element_tags: &IndexSet<String>) -> bool {
        match self {
            ContractTagOptions::Exclude(excluded) => {
                element_tags.iter().any(|tag| excluded.contains(tag))
            }
            ContractTagOptions::Include(included) => {
                !element_tags.iter().any(|tag| included.contains(tag))
            }
        }
    }
}

/// Computes one contract from a completed federation result. The merge is
/// not re-run: the base model is structurally cloned, filtered elements are
/// removed, and only the final AST/configuration assembly is repeated.
pub(crate) fn new_contract_artifacts(
    base: &FederationArtifacts,
    options: &ContractTagOptions,
) -> Result<FederationArtifacts, FederationFailure> {
    let mut merged_type_data_by_name = clone_merged_model(&base.merged_type_data_by_name);
    for (coordinate, tags) in &base.tags_by_coordinate {
        if options.filters_out(tags) {
            remove_coordinate(&mut merged_type_data_by_name, coordinate);
        }
    }
    remove_orphaned_elements(&mut merged_type_data_by_name);
    let mut errors: Vec<CompositionError> = Vec::new();
    accessibility::propagate_inaccessibility(&mut merged_type_data_by_name, &mut errors);
    let field_configurations = build_field_configurations(
        &merged_type_data_by_name,
        &base.authorization_data_by_type_name,
        &base.subscription_filter_by_field_coords,
        &mut errors,
    );
    if !errors.is_empty() {
        return Err(FederationFailure {
            errors,
            warnings: Vec::new(),
        });
    }
    let router_schema = emit::new_schema(&merged_type_data_by_name, emit::SchemaFlavor::Router);
    let client_schema = emit::new_schema(&merged_type_data_by_name, emit::SchemaFlavor::Client);
    Ok(FederationArtifacts {
        router_schema,
        client_schema,
        field_configurations,
        subgraph_configs_by_name: base.subgraph_configs_by_name.clone(),
        warnings: Vec::new(),
        tags_by_coordinate: accessibility::collect_tags(&merged_type_data_by_name),
        merged_type_data_by_name,
        authorization_data_by_type_name: base.authorization_data_by_type_name.clone(),
        subscription_filter_by_field_coords: base.subscription_filter_by_field_coords.clone(),
    })
}

/// An explicit structural clone of the merged model: each owned collection
/// is copied entry by entry, so contract branches never alias base state.
fn clone_merged_model(
    merged_type_data_by_name: &IndexMap<Name, TypeData>,
) -> IndexMap<Name, TypeData> {
    let mut cloned = IndexMap::with_capacity(merged_type_data_by_name.len());
    for (type_name, type_data) in merged_type_data_by_name {
        cloned.insert(type_name.clone(), type_data.clone());
    }
    cloned
}

/// Coordinates follow the tag tree's shape: `Type`, `Type.child`, or
/// `Type.field(arg: ...)`.
fn remove_coordinate(type_data_by_name: &mut IndexMap<Name, TypeData>, coordinate: &str) {
    if let Some((field_part, argument_part)) = coordinate.split_once('(') {
        let Some((type_name, field_name)) = field_part.split_once('.') else {
            return;
        };
        let Some(argument_name) = argument_part.split(':').next() else {
            return;
        };
        if let Some(fields) = type_data_by_name
            .get_mut(type_name)
            .and_then(TypeData::fields_mut)
        {
            if let Some(field) = fields.get_mut(field_name) {
                field.arguments.shift_remove(argument_name.trim());
            }
        }
        return;
    }
    match coordinate.split_once('.') {
        None => {
            type_data_by_name.shift_remove(coordinate);
        }
        Some((type_name, child_name)) => {
            let Some(type_data) = type_data_by_name.get_mut(type_name) else {
                return;
            };
            match type_data {
                TypeData::Object(data) => {
                    data.fields.shift_remove(child_name);
                }
                TypeData::Interface(data) => {
                    data.fields.shift_remove(child_name);
                }
                TypeData::Enum(data) => {
                    data.values.shift_remove(child_name);
                }
                TypeData::InputObject(data) => {
                    data.fields.shift_remove(child_name);
                }
                _ => {}
            }
        }
    }
}

/// Removal propagates to a fixpoint: fields and arguments referencing a
/// removed type are removed, union members and implemented interfaces are
/// pruned, and a parent left with no children is removed entirely.
fn remove_orphaned_elements(type_data_by_name: &mut IndexMap<Name, TypeData>) {
    loop {
        let defined: IndexSet<Name> = type_data_by_name.keys().cloned().collect();
        let is_defined = |name: &Name| crate::catalog::is_base_scalar(name) || defined.contains(name);
        for type_data in type_data_by_name.values_mut() {
            match type_data {
                TypeData::Object(data) => {
                    data.fields
                        .retain(|_, field| is_defined(field.ty.inner_named_type()));
                    for field in data.fields.values_mut() {
                        field
                            .arguments
                            .retain(|_, argument| is_defined(argument.ty.inner_named_type()));
                    }
                    data.implements.retain(|interface| defined.contains(interface));
                }
                TypeData::Interface(data) => {
                    data.fields
                        .retain(|_, field| is_defined(field.ty.inner_named_type()));
                    for field in data.fields.values_mut() {
                        field
                            .arguments
                            .retain(|_, argument| is_defined(argument.ty.inner_named_type()));
                    }
                    data.implements.retain(|interface| defined.contains(interface));
                }
                TypeData::Union(data) => {
                    data.members.retain(|member| defined.contains(member));
                }
                TypeData::InputObject(data) => {
                    data.fields
                        .retain(|_, field| is_defined(field.ty.inner_named_type()));
                }
                _ => {}
            }
        }
        let empty_type_names: Vec<Name> = type_data_by_name
            .values()
            .filter(|type_data| match type_data {
                TypeData::Object(data) => data.fields.is_empty(),
                TypeData::Interface(data) => data.fields.is_empty(),
                TypeData::Union(data) => data.members.is_empty(),
                TypeData::Enum(data) => data.values.is_empty(),
                TypeData::InputObject(data) => data.fields.is_empty(),
                TypeData::Scalar(_) => false,
            })
            .map(|type_data| type_data.name().clone())
            .collect();
        if empty_type_names.is_empty() {
            return;
        }
        for type_name in empty_type_names {
            type_data_by_name.shift_remove(&type_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;

    #[test]
    fn exclude_mode_filters_tagged_elements() {
        let options = ContractTagOptions::Exclude(IndexSet::from_iter(["internal".to_owned()]));
        assert!(options.filters_out(&IndexSet::from_iter(["internal".to_owned()])));
        assert!(!options.filters_out(&IndexSet::from_iter(["public".to_owned()])));
    }

    #[test]
    fn include_mode_keeps_only_matching_tagged_elements() {
        let options = ContractTagOptions::Include(IndexSet::from_iter(["public".to_owned()]));
        assert!(!options.filters_out(&IndexSet::from_iter(["public".to_owned()])));
        assert!(options.filters_out(&IndexSet::from_iter(["internal".to_owned()])));
    }

    #[test]
    fn removing_every_field_removes_the_type_and_its_references() {
        use apollo_compiler::ast::Type;
        use crate::model::FieldData;
        use crate::model::ObjectData;

        let object = |name: Name, fields: Vec<(Name, Type)>| {
            TypeData::Object(ObjectData {
                name: name.clone(),
                description: None,
                directives: Default::default(),
                subgraph_names: Default::default(),
                extension_kind: Default::default(),
                is_inaccessible: false,
                fields: fields
                    .into_iter()
                    .map(|(field_name, ty)| {
                        (
                            field_name.clone(),
                            FieldData {
                                name: field_name,
                                parent_type_name: name.clone(),
                                ty,
                                description: None,
                                directives: Default::default(),
                                arguments: Default::default(),
                                subgraph_names: Default::default(),
                                external_subgraph_names: Default::default(),
                                shareable_subgraph_names: Default::default(),
                                override_source_by_subgraph_name: Default::default(),
                                is_inaccessible: false,
                            },
                        )
                    })
                    .collect(),
                implements: Default::default(),
                is_entity: false,
                is_root_type: false,
                interface_object_subgraph_names: Default::default(),
                shareable_subgraph_names: Default::default(),
            })
        };
        let mut model = IndexMap::new();
        model.insert(
            name!("Query"),
            object(
                name!("Query"),
                vec![
                    (name!("ok"), Type::Named(name!("String"))),
                    (name!("metrics"), Type::Named(name!("Metrics"))),
                ],
            ),
        );
        model.insert(
            name!("Metrics"),
            object(name!("Metrics"), vec![(name!("count"), Type::Named(name!("Int")))]),
        );
        remove_coordinate(&mut model, "Metrics.count");
        remove_orphaned_elements(&mut model);
        assert!(!model.contains_key("Metrics"));
        let TypeData::Object(query) = &model["Query"] else {
            panic!("expected Query object");
        };
        assert!(!query.fields.contains_key("metrics"));
        assert!(query.fields.contains_key("ok"));
    }
}

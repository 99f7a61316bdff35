//! `@inaccessible` propagation and reference validation, plus the `@tag`
//! coordinate tree consumed by the contract filter.
//!
//! Inaccessibility is monotonic downward: an inaccessible parent makes every
//! child inaccessible. An object or interface whose fields all become
//! inaccessible is itself omitted from the client schema, which propagates
//! further upward until a fixpoint. After propagation, no accessible
//! coordinate may reference a wholly inaccessible type.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::catalog;
use crate::error::CompositionError;
use crate::model::TypeData;

/// Tag names per coordinate: `Type`, `Type.field`, `Type.field(arg:)`, and
/// `Type.VALUE` for enum values.
pub(crate) type TagsByCoordinate = IndexMap<String, IndexSet<String>>;

pub(crate) fn propagate_inaccessibility(
    type_data_by_name: &mut IndexMap<Name, TypeData>,
    errors: &mut Vec<CompositionError>,
) {
    mark_children_of_inaccessible_types(type_data_by_name);
    mark_empty_parents_inaccessible(type_data_by_name);
    check_required_input_values(type_data_by_name, errors);
    check_inaccessible_references(type_data_by_name, errors);
    check_enum_and_input_children(type_data_by_name, errors);
    check_query_root(type_data_by_name, errors);
}

fn mark_children_of_inaccessible_types(type_data_by_name: &mut IndexMap<Name, TypeData>) {
    for type_data in type_data_by_name.values_mut() {
        if !type_data.is_inaccessible() {
            continue;
        }
        match type_data {
            TypeData::Object(data) => {
                for field in data.fields.values_mut() {
                    field.is_inaccessible = true;
                    for argument in field.arguments.values_mut() {
                        argument.is_inaccessible = true;
                    }
                }
            }
            TypeData::Interface(data) => {
                for field in data.fields.values_mut() {
                    field.is_inaccessible = true;
                    for argument in field.arguments.values_mut() {
                        argument.is_inaccessible = true;
                    }
                }
            }
            TypeData::Enum(data) => {
                for value in data.values.values_mut() {
                    value.is_inaccessible = true;
                }
            }
            TypeData::InputObject(data) => {
                for field in data.fields.values_mut() {
                    field.is_inaccessible = true;
                }
            }
            _ => {}
        }
    }
}

/// An object or interface with no accessible field left, and a union with no
/// accessible member left, is itself inaccessible. Runs to a fixpoint since
/// each newly marked type can empty a union or a parent further up.
fn mark_empty_parents_inaccessible(type_data_by_name: &mut IndexMap<Name, TypeData>) {
    loop {
        let mut newly_inaccessible: Vec<Name> = Vec::new();
        let inaccessible_type_names: IndexSet<Name> = type_data_by_name
            .values()
            .filter(|data| data.is_inaccessible())
            .map(|data| data.name().clone())
            .collect();
        for type_data in type_data_by_name.values() {
            if type_data.is_inaccessible() {
                continue;
            }
            let is_now_empty = match type_data {
                TypeData::Object(data) => data
                    .fields
                    .values()
                    .all(|field| field.is_inaccessible),
                TypeData::Interface(data) => data
                    .fields
                    .values()
                    .all(|field| field.is_inaccessible),
                TypeData::Union(data) => data
                    .members
                    .iter()
                    .all(|member| inaccessible_type_names.contains(member)),
                _ => false,
            };
            if is_now_empty {
                newly_inaccessible.push(type_data.name().clone());
            }
        }
        if newly_inaccessible.is_empty() {
            return;
        }
        for type_name in newly_inaccessible {
            if let Some(type_data) = type_data_by_name.get_mut(&type_name) {
                type_data.set_inaccessible();
            }
        }
        // The children of freshly marked parents follow.
        mark_children_of_inaccessible_types(type_data_by_name);
    }
}

fn check_required_input_values(
    type_data_by_name: &IndexMap<Name, TypeData>,
    errors: &mut Vec<CompositionError>,
) {
    for type_data in type_data_by_name.values() {
        if type_data.is_inaccessible() {
            continue;
        }
        match type_data {
            TypeData::Object(_) | TypeData::Interface(_) => {
                for field in type_data.fields().into_iter().flatten().map(|(_, f)| f) {
                    if field.is_inaccessible {
                        continue;
                    }
                    for argument in field.arguments.values() {
                        if argument.is_inaccessible && argument.is_required() {
                            errors.push(CompositionError::InaccessibleRequiredInputValue {
                                kind: argument.kind.kind_string(),
                                coords: format!("{}({}: ...)", field.coords(), argument.name),
                                parent_coords: field.coords(),
                            });
                        }
                    }
                }
            }
            TypeData::InputObject(data) => {
                for field in data.fields.values() {
                    if field.is_inaccessible && field.is_required() {
                        errors.push(CompositionError::InaccessibleRequiredInputValue {
                            kind: field.kind.kind_string(),
                            coords: crate::model::field_coords(&data.name, &field.name),
                            parent_coords: data.name.to_string(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
}

fn check_inaccessible_references(
    type_data_by_name: &IndexMap<Name, TypeData>,
    errors: &mut Vec<CompositionError>,
) {
    let mut referencing_coords_by_type_name: IndexMap<Name, Vec<String>> = IndexMap::new();
    let mut record = |referenced: &Name, coords: String| {
        referencing_coords_by_type_name
            .entry(referenced.clone())
            .or_default()
            .push(coords);
    };
    for type_data in type_data_by_name.values() {
        if type_data.is_inaccessible() {
            continue;
        }
        match type_data {
            TypeData::Object(_) | TypeData::Interface(_) => {
                for field in type_data.fields().into_iter().flatten().map(|(_, f)| f) {
                    if field.is_inaccessible {
                        continue;
                    }
                    record(field.ty.inner_named_type(), field.coords());
                    for argument in field.arguments.values() {
                        if argument.is_inaccessible {
                            continue;
                        }
                        record(
                            argument.ty.inner_named_type(),
                            format!("{}({}: ...)", field.coords(), argument.name),
                        );
                    }
                }
            }
            TypeData::InputObject(data) => {
                for field in data.fields.values() {
                    if field.is_inaccessible {
                        continue;
                    }
                    record(
                        field.ty.inner_named_type(),
                        crate::model::field_coords(&data.name, &field.name),
                    );
                }
            }
            _ => {}
        }
    }
    for (referenced_type_name, coordinates) in referencing_coords_by_type_name {
        let Some(referenced) = type_data_by_name.get(&referenced_type_name) else {
            continue;
        };
        if referenced.is_inaccessible() {
            errors.push(CompositionError::InvalidReferencesOfInaccessibleType {
                kind: referenced.kind_string(),
                type_name: referenced_type_name.to_string(),
                coordinates,
            });
        }
    }
}

/// Enums and input objects do not become implicitly inaccessible: an
/// accessible one whose children are all inaccessible is an error.
fn check_enum_and_input_children(
    type_data_by_name: &IndexMap<Name, TypeData>,
    errors: &mut Vec<CompositionError>,
) {
    for type_data in type_data_by_name.values() {
        if type_data.is_inaccessible() {
            continue;
        }
        match type_data {
            TypeData::Enum(data) => {
                if !data.values.is_empty() && data.values.values().all(|value| value.is_inaccessible)
                {
                    errors.push(CompositionError::AllChildDefinitionsAreInaccessible {
                        kind: "Enum",
                        type_name: data.name.to_string(),
                    });
                }
            }
            TypeData::InputObject(data) => {
                if !data.fields.is_empty() && data.fields.values().all(|field| field.is_inaccessible)
                {
                    errors.push(CompositionError::AllChildDefinitionsAreInaccessible {
                        kind: "Input Object",
                        type_name: data.name.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
}

fn check_query_root(
    type_data_by_name: &IndexMap<Name, TypeData>,
    errors: &mut Vec<CompositionError>,
) {
    match type_data_by_name.get(&catalog::QUERY) {
        None => errors.push(CompositionError::NoQueryRootType),
        Some(query) if query.is_inaccessible() => {
            errors.push(CompositionError::NoQueryRootType);
        }
        Some(_) => {}
    }
}

/// Collects every `@tag` application into a coordinate-keyed tree used only
/// by the contract filter.
pub(crate) fn collect_tags(type_data_by_name: &IndexMap<Name, TypeData>) -> TagsByCoordinate {
    let mut tags_by_coordinate: TagsByCoordinate = IndexMap::new();
    let mut record = |coordinate: String, directives: &crate::model::DirectiveMap| {
        let Some(occurrences) = directives.get("tag") else {
            return;
        };
        let names: IndexSet<String> = occurrences
            .iter()
            .filter_map(|directive| {
                directive
                    .specified_argument_by_name("name")
                    .and_then(|value| value.as_str())
                    .map(str::to_owned)
            })
            .collect();
        if !names.is_empty() {
            tags_by_coordinate
                .entry(coordinate)
                .or_default()
                .extend(names);
        }
    };
    for type_data in type_data_by_name.values() {
        let type_name = type_data.name();
        record(type_name.to_string(), type_data.directives());
        match type_data {
            TypeData::Object(_) | TypeData::Interface(_) => {
                for field in type_data.fields().into_iter().flatten().map(|(_, f)| f) {
                    record(field.coords(), &field.directives);
                    for argument in field.arguments.values() {
                        record(
                            format!("{}({}: ...)", field.coords(), argument.name),
                            &argument.directives,
                        );
                    }
                }
            }
            TypeData::Enum(data) => {
                for value in data.values.values() {
                    record(format!("{type_name}.{}", value.name), &value.directives);
                }
            }
            TypeData::InputObject(data) => {
                for field in data.fields.values() {
                    record(
                        crate::model::field_coords(type_name, &field.name),
                        &field.directives,
                    );
                }
            }
            _ => {}
        }
    }
    tags_by_coordinate
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ast::Type;
    use apollo_compiler::name;

    use super::*;
    use crate::model::FieldData;
    use crate::model::ObjectData;

    fn object_with_fields(name: Name, fields: Vec<(Name, bool)>) -> TypeData {
        TypeData::Object(ObjectData {
            name: name.clone(),
            description: None,
            directives: Default::default(),
            subgraph_names: Default::default(),
            extension_kind: Default::default(),
            is_inaccessible: false,
            fields: fields
                .into_iter()
                .map(|(field_name, is_inaccessible)| {
                    (
                        field_name.clone(),
                        FieldData {
                            name: field_name,
                            parent_type_name: name.clone(),
                            ty: Type::Named(name!("String")),
                            description: None,
                            directives: Default::default(),
                            arguments: Default::default(),
                            subgraph_names: Default::default(),
                            external_subgraph_names: Default::default(),
                            shareable_subgraph_names: Default::default(),
                            override_source_by_subgraph_name: Default::default(),
                            is_inaccessible,
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
    }

    #[test]
    fn a_type_with_only_inaccessible_fields_becomes_inaccessible() {
        let mut model = IndexMap::new();
        model.insert(
            name!("Query"),
            object_with_fields(name!("Query"), vec![(name!("ok"), false)]),
        );
        model.insert(
            name!("Hidden"),
            object_with_fields(name!("Hidden"), vec![(name!("a"), true), (name!("b"), true)]),
        );
        let mut errors = Vec::new();
        propagate_inaccessibility(&mut model, &mut errors);
        assert!(model["Hidden"].is_inaccessible());
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn an_inaccessible_query_root_fails_composition() {
        let mut model = IndexMap::new();
        model.insert(
            name!("Query"),
            object_with_fields(name!("Query"), vec![(name!("a"), true)]),
        );
        let mut errors = Vec::new();
        propagate_inaccessibility(&mut model, &mut errors);
        assert!(
            errors.contains(&CompositionError::NoQueryRootType),
            "{errors:?}"
        );
    }

    #[test]
    fn accessible_references_to_inaccessible_types_are_errors() {
        let mut model = IndexMap::new();
        let mut query = object_with_fields(name!("Query"), vec![(name!("secret"), false)]);
        if let TypeData::Object(data) = &mut query {
            data.fields.get_mut("secret").unwrap().ty = Type::Named(name!("Secret"));
            data.fields.insert(
                name!("ok"),
                FieldData {
                    name: name!("ok"),
                    parent_type_name: name!("Query"),
                    ty: Type::Named(name!("String")),
                    description: None,
                    directives: Default::default(),
                    arguments: Default::default(),
                    subgraph_names: Default::default(),
                    external_subgraph_names: Default::default(),
                    shareable_subgraph_names: Default::default(),
                    override_source_by_subgraph_name: Default::default(),
                    is_inaccessible: false,
                },
            );
        }
        model.insert(name!("Query"), query);
        let mut secret = object_with_fields(name!("Secret"), vec![(name!("value"), false)]);
        secret.set_inaccessible();
        model.insert(name!("Secret"), secret);
        let mut errors = Vec::new();
        propagate_inaccessibility(&mut model, &mut errors);
        assert!(
            errors.iter().any(|e| matches!(
                e,
                CompositionError::InvalidReferencesOfInaccessibleType { type_name, coordinates, .. }
                    if type_name == "Secret" && coordinates.contains(&"Query.secret".to_owned())
            )),
            "{errors:?}"
        );
    }
}

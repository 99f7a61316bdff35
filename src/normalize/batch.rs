//! Batch normalization: runs the per-subgraph normalizer over every input,
//! cross-checks subgraph names, `@override` targets and entity-interface
//! consistency, and incrementally builds the shared resolvability graph.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use tracing::debug;

use crate::error::CompositionError;
use crate::error::CompositionWarning;
use crate::model::EntityData;
use crate::model::EntityInterfaceData;
use crate::normalize::NormalizedSubgraph;
use crate::normalize::normalize_subgraph;
use crate::resolvability::ResolvabilityGraph;
use crate::subgraph::Subgraph;

#[derive(Debug, Default)]
pub(crate) struct BatchNormalizationResult {
    pub(crate) subgraphs: Vec<NormalizedSubgraph>,
    pub(crate) entity_data_by_type_name: IndexMap<Name, EntityData>,
    pub(crate) entity_interface_data_by_type_name: IndexMap<Name, EntityInterfaceData>,
    pub(crate) graph: ResolvabilityGraph,
    pub(crate) errors: Vec<CompositionError>,
    pub(crate) warnings: Vec<CompositionWarning>,
}

pub(crate) fn normalize_subgraphs(subgraphs: &[Subgraph]) -> BatchNormalizationResult {
    let mut result = BatchNormalizationResult::default();
    if subgraphs.is_empty() {
        result.errors.push(CompositionError::MinimumSubgraphRequirement);
        return result;
    }
    let mut seen_names: IndexSet<&str> = IndexSet::new();
    let mut duplicate_names: IndexSet<String> = IndexSet::new();
    for subgraph in subgraphs {
        if subgraph.name.is_empty() || !seen_names.insert(subgraph.name.as_str()) {
            duplicate_names.insert(subgraph.name.clone());
        }
    }
    if !duplicate_names.is_empty() {
        result.errors.push(CompositionError::InvalidSubgraphNames {
            duplicate_names: duplicate_names.into_iter().collect(),
        });
        return result;
    }
    for subgraph in subgraphs {
        let normalization = normalize_subgraph(subgraph, &mut result.graph);
        result.errors.extend(
            normalization
                .errors
                .into_iter()
                .map(|error| error.in_subgraph(&subgraph.name)),
        );
        result.warnings.extend(normalization.warnings);
        if let Some(normalized) = normalization.subgraph {
            for (type_name, entity_data) in &normalized.entity_data_by_type_name {
                let merged = result
                    .entity_data_by_type_name
                    .entry(type_name.clone())
                    .or_default();
                for (subgraph_name, keys) in &entity_data.keys_by_subgraph_name {
                    merged.add_keys(subgraph_name, keys.clone());
                }
            }
            for (type_name, entity_interface) in &normalized.entity_interface_data_by_type_name {
                let merged = result
                    .entity_interface_data_by_type_name
                    .entry(type_name.clone())
                    .or_default();
                merged
                    .subgraph_names
                    .extend(entity_interface.subgraph_names.iter().cloned());
                merged.interface_object_subgraph_names.extend(
                    entity_interface
                        .interface_object_subgraph_names
                        .iter()
                        .cloned(),
                );
                merged
                    .concrete_type_names
                    .extend(entity_interface.concrete_type_names.iter().cloned());
                merged
                    .interface_field_names
                    .extend(entity_interface.interface_field_names.iter().cloned());
                merged
                    .interface_object_field_names
                    .extend(entity_interface.interface_object_field_names.iter().cloned());
            }
            result.subgraphs.push(normalized);
        }
    }
    debug!(
        subgraphs = result.subgraphs.len(),
        entities = result.entity_data_by_type_name.len(),
        "batch normalization complete"
    );
    validate_override_targets(&mut result);
    validate_entity_interfaces(&mut result);
    result
}

/// `@override` targets must exist, must not collide on one field coordinate,
/// and an `@interfaceObject` must correspond to an entity interface defined
/// as an actual interface in another subgraph.
fn validate_override_targets(result: &mut BatchNormalizationResult) {
    let subgraph_names: IndexSet<&str> = result
        .subgraphs
        .iter()
        .map(|subgraph| subgraph.name.as_str())
        .collect();
    let mut overriding_subgraphs_by_coords: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for subgraph in &result.subgraphs {
        for type_data in subgraph.type_data_by_name.values() {
            let Some(fields) = type_data.fields() else { continue };
            for field_data in fields.values() {
                for (declaring_subgraph, target_subgraph) in
                    &field_data.override_source_by_subgraph_name
                {
                    if !subgraph_names.contains(target_subgraph.as_str()) {
                        result.warnings.push(CompositionWarning::InvalidOverrideTarget {
                            field_coords: field_data.coords(),
                            target_subgraph_name: target_subgraph.clone(),
                        });
                    }
                    overriding_subgraphs_by_coords
                        .entry(field_data.coords())
                        .or_default()
                        .insert(declaring_subgraph.clone());
                }
            }
        }
    }
    for (coords, overriding_subgraphs) in overriding_subgraphs_by_coords {
        if overriding_subgraphs.len() > 1 {
            result.errors.push(CompositionError::DuplicateOverriddenField {
                field_coords: coords,
                subgraph_names: overriding_subgraphs.into_iter().collect(),
            });
        }
    }
}

fn validate_entity_interfaces(result: &mut BatchNormalizationResult) {
    let mut errors = Vec::new();
    for (type_name, entity_interface) in &result.entity_interface_data_by_type_name {
        let interface_subgraph_count = entity_interface
            .subgraph_names
            .difference(&entity_interface.interface_object_subgraph_names)
            .count();
        if interface_subgraph_count == 0 {
            // Declared @interfaceObject somewhere, but no subgraph defines
            // the entity interface itself.
            errors.push(CompositionError::UndefinedEntityInterfaceImplementations {
                interface_name: type_name.to_string(),
                concrete_type_names: entity_interface
                    .concrete_type_names
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
            });
        }
    }
    result.errors.extend(errors);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_subgraph_names_abort_normalization() {
        let subgraphs = vec![
            Subgraph::new("a", "https://a", "type Query { x: Int }"),
            Subgraph::new("a", "https://a2", "type Query { y: Int }"),
        ];
        let result = normalize_subgraphs(&subgraphs);
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            &result.errors[0],
            CompositionError::InvalidSubgraphNames { duplicate_names } if duplicate_names == &vec!["a".to_owned()]
        ));
        assert!(result.subgraphs.is_empty());
    }

    #[test]
    fn an_empty_subgraph_list_is_an_error() {
        let result = normalize_subgraphs(&[]);
        assert_eq!(
            result.errors,
            vec![CompositionError::MinimumSubgraphRequirement]
        );
    }

    #[test]
    fn override_targets_that_do_not_exist_are_warnings() {
        let subgraphs = vec![Subgraph::new(
            "a",
            "https://a",
            r#"
            type Query {
              user: User
            }

            type User @key(fields: "id") {
              id: ID!
              name: String @override(from: "missing")
            }
        "#,
        )];
        let result = normalize_subgraphs(&subgraphs);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(
            result.warnings.iter().any(|w| matches!(
                w,
                CompositionWarning::InvalidOverrideTarget { target_subgraph_name, .. }
                    if target_subgraph_name == "missing"
            )),
            "{:?}",
            result.warnings
        );
    }

    #[test]
    fn overriding_one_field_from_two_subgraphs_is_an_error() {
        let user_sdl = r#"
            type Query {
              user: User
            }

            type User @key(fields: "id") {
              id: ID!
              name: String @override(from: "base")
            }
        "#;
        let subgraphs = vec![
            Subgraph::new("base", "https://base", r#"
                type User @key(fields: "id") {
                  id: ID!
                  name: String
                }
            "#),
            Subgraph::new("a", "https://a", user_sdl),
            Subgraph::new("b", "https://b", user_sdl),
        ];
        let result = normalize_subgraphs(&subgraphs);
        assert!(
            result.errors.iter().any(|e| matches!(
                e,
                CompositionError::DuplicateOverriddenField { field_coords, subgraph_names }
                    if field_coords == "User.name" && subgraph_names.len() == 2
            )),
            "{:?}",
            result.errors
        );
    }

    #[test]
    fn interface_object_without_an_entity_interface_definition_is_an_error() {
        let subgraphs = vec![Subgraph::new(
            "a",
            "https://a",
            r#"
            type Query {
              media: Media
            }

            type Media @key(fields: "id") @interfaceObject {
              id: ID!
              reviews: [String!]!
            }
        "#,
        )];
        let result = normalize_subgraphs(&subgraphs);
        assert!(
            result.errors.iter().any(|e| matches!(
                e,
                CompositionError::UndefinedEntityInterfaceImplementations { interface_name, .. }
                    if interface_name == "Media"
            )),
            "{:?}",
            result.errors
        );
    }
}

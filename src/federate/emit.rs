//! Final AST assembly: turns the merged type model into the router schema
//! (the full internal schema) and the client schema (the public schema with
//! every inaccessible element removed).

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::EnumType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InputObjectType;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::schema::ScalarType;
use apollo_compiler::schema::UnionType;
use indexmap::IndexMap;

use crate::catalog;
use crate::model::DirectiveMap;
use crate::model::FieldData;
use crate::model::InputValueData;
use crate::model::TypeData;

#[derive(Debug, Clone, Copy)]
pub(crate) enum SchemaFlavor {
    /// Full internal schema: keeps inaccessible elements and `@tag`.
    Router,
    /// Public schema: inaccessible elements and `@tag` are stripped.
    Client,
}

impl SchemaFlavor {
    fn keeps_inaccessible(&self) -> bool {
        matches!(self, SchemaFlavor::Router)
    }

    fn keeps_tags(&self) -> bool {
        matches!(self, SchemaFlavor::Router)
    }
}

pub(crate) fn new_schema(
    type_data_by_name: &IndexMap<Name, TypeData>,
    flavor: SchemaFlavor,
) -> Schema {
    let mut schema = Schema::new();
    if flavor.keeps_tags() {
        if let Some(tag_spec) = catalog::DIRECTIVE_CATALOG.get(&catalog::TAG) {
            schema
                .directive_definitions
                .insert(catalog::TAG, Node::new(tag_spec.definition()));
        }
    }
    for type_data in type_data_by_name.values() {
        if type_data.is_inaccessible() && !flavor.keeps_inaccessible() {
            continue;
        }
        let extended_type = match type_data {
            TypeData::Scalar(data) => ExtendedType::Scalar(Node::new(ScalarType {
                description: data.description.clone(),
                name: data.name.clone(),
                directives: emit_type_directives(&data.directives, flavor),
            })),
            TypeData::Object(data) => ExtendedType::Object(Node::new(ObjectType {
                description: data.description.clone(),
                name: data.name.clone(),
                implements_interfaces: data
                    .implements
                    .iter()
                    .filter(|interface_name| {
                        flavor.keeps_inaccessible()
                            || type_data_by_name
                                .get(*interface_name)
                                .is_some_and(|data| !data.is_inaccessible())
                    })
                    .map(|interface_name| ComponentName::from(interface_name.clone()))
                    .collect(),
                directives: emit_type_directives(&data.directives, flavor),
                fields: emit_fields(&data.fields, flavor),
            })),
            TypeData::Interface(data) => ExtendedType::Interface(Node::new(InterfaceType {
                description: data.description.clone(),
                name: data.name.clone(),
                implements_interfaces: data
                    .implements
                    .iter()
                    .filter(|interface_name| {
                        flavor.keeps_inaccessible()
                            || type_data_by_name
                                .get(*interface_name)
                                .is_some_and(|data| !data.is_inaccessible())
                    })
                    .map(|interface_name| ComponentName::from(interface_name.clone()))
                    .collect(),
                directives: emit_type_directives(&data.directives, flavor),
                fields: emit_fields(&data.fields, flavor),
            })),
            TypeData::Union(data) => ExtendedType::Union(Node::new(UnionType {
                description: data.description.clone(),
                name: data.name.clone(),
                directives: emit_type_directives(&data.directives, flavor),
                members: data
                    .members
                    .iter()
                    .filter(|member_name| {
                        flavor.keeps_inaccessible()
                            || type_data_by_name
                                .get(*member_name)
                                .is_some_and(|data| !data.is_inaccessible())
                    })
                    .map(|member_name| ComponentName::from(member_name.clone()))
                    .collect(),
            })),
            TypeData::Enum(data) => ExtendedType::Enum(Node::new(EnumType {
                description: data.description.clone(),
                name: data.name.clone(),
                directives: emit_type_directives(&data.directives, flavor),
                values: data
                    .values
                    .values()
                    .filter(|value| flavor.keeps_inaccessible() || !value.is_inaccessible)
                    .map(|value| {
                        (
                            value.name.clone(),
                            Component::new(ast::EnumValueDefinition {
                                description: value.description.clone(),
                                value: value.name.clone(),
                                directives: emit_ast_directives(&value.directives, flavor),
                            }),
                        )
                    })
                    .collect(),
            })),
            TypeData::InputObject(data) => ExtendedType::InputObject(Node::new(InputObjectType {
                description: data.description.clone(),
                name: data.name.clone(),
                directives: emit_type_directives(&data.directives, flavor),
                fields: data
                    .fields
                    .values()
                    .filter(|field| flavor.keeps_inaccessible() || !field.is_inaccessible)
                    .map(|field| {
                        (
                            field.name.clone(),
                            Component::new(emit_input_value(field, flavor)),
                        )
                    })
                    .collect(),
            })),
        };
        schema.types.insert(type_data.name().clone(), extended_type);
    }
    let definition = schema.schema_definition.make_mut();
    for (root_name, slot) in [
        (catalog::QUERY, RootSlot::Query),
        (catalog::MUTATION, RootSlot::Mutation),
        (catalog::SUBSCRIPTION, RootSlot::Subscription),
    ] {
        if schema.types.contains_key(&root_name) {
            let component = ComponentName::from(root_name);
            match slot {
                RootSlot::Query => definition.query = Some(component),
                RootSlot::Mutation => definition.mutation = Some(component),
                RootSlot::Subscription => definition.subscription = Some(component),
            }
        }
    }
    schema
}

enum RootSlot {
    Query,
    Mutation,
    Subscription,
}

fn emit_fields(
    fields: &IndexMap<Name, FieldData>,
    flavor: SchemaFlavor,
) -> apollo_compiler::collections::IndexMap<Name, Component<ast::FieldDefinition>> {
    fields
        .values()
        .filter(|field| flavor.keeps_inaccessible() || !field.is_inaccessible)
        .map(|field| {
            (
                field.name.clone(),
                Component::new(ast::FieldDefinition {
                    description: field.description.clone(),
                    name: field.name.clone(),
                    arguments: field
                        .arguments
                        .values()
                        .filter(|argument| flavor.keeps_inaccessible() || !argument.is_inaccessible)
                        .map(|argument| Node::new(emit_input_value(argument, flavor)))
                        .collect(),
                    ty: field.ty.clone(),
                    directives: emit_ast_directives(&field.directives, flavor),
                }),
            )
        })
        .collect()
}

fn emit_input_value(input_value: &InputValueData, flavor: SchemaFlavor) -> ast::InputValueDefinition {
    ast::InputValueDefinition {
        description: input_value.description.clone(),
        name: input_value.name.clone(),
        ty: Node::new(input_value.ty.clone()),
        default_value: input_value.default_value.clone(),
        directives: emit_ast_directives(&input_value.directives, flavor),
    }
}

/// Only client-meaningful directives survive into the composed schemas:
/// `@deprecated` always, `@tag` on the router flavor. Federation-internal
/// directives were consumed during composition.
fn emitted_directive_names(flavor: SchemaFlavor) -> &'static [&'static str] {
    match flavor {
        SchemaFlavor::Router => &["deprecated", "tag"],
        SchemaFlavor::Client => &["deprecated"],
    }
}

fn emit_type_directives(
    directives: &DirectiveMap,
    flavor: SchemaFlavor,
) -> apollo_compiler::schema::DirectiveList {
    let mut list = apollo_compiler::schema::DirectiveList::default();
    for name in emitted_directive_names(flavor) {
        if let Some(occurrences) = directives.get(*name) {
            list.extend(
                occurrences
                    .iter()
                    .map(|occurrence| Component::new(occurrence.as_ref().clone())),
            );
        }
    }
    list
}

fn emit_ast_directives(directives: &DirectiveMap, flavor: SchemaFlavor) -> ast::DirectiveList {
    let mut list = ast::DirectiveList::default();
    for name in emitted_directive_names(flavor) {
        if let Some(occurrences) = directives.get(*name) {
            for occurrence in occurrences {
                list.push(occurrence.clone());
            }
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ast::Type;
    use apollo_compiler::name;
    use indexmap::IndexSet;

    use super::*;
    use crate::model::ObjectData;

    fn model_with_hidden_field() -> IndexMap<Name, TypeData> {
        let mut fields = IndexMap::new();
        for (field_name, is_inaccessible) in [(name!("id"), false), (name!("internal"), true)] {
            fields.insert(
                field_name.clone(),
                FieldData {
                    name: field_name,
                    parent_type_name: name!("Query"),
                    ty: Type::Named(name!("String")),
                    description: None,
                    directives: Default::default(),
                    arguments: Default::default(),
                    subgraph_names: IndexSet::from_iter(["a".to_owned()]),
                    external_subgraph_names: Default::default(),
                    shareable_subgraph_names: Default::default(),
                    override_source_by_subgraph_name: Default::default(),
                    is_inaccessible,
                },
            );
        }
        IndexMap::from_iter([(
            name!("Query"),
            TypeData::Object(ObjectData {
                name: name!("Query"),
                description: None,
                directives: Default::default(),
                subgraph_names: IndexSet::from_iter(["a".to_owned()]),
                extension_kind: Default::default(),
                is_inaccessible: false,
                fields,
                implements: Default::default(),
                is_entity: false,
                is_root_type: true,
                interface_object_subgraph_names: Default::default(),
                shareable_subgraph_names: Default::default(),
            }),
        )])
    }

    #[test]
    fn the_router_schema_keeps_inaccessible_fields() {
        let schema = new_schema(&model_with_hidden_field(), SchemaFlavor::Router);
        let ExtendedType::Object(query) = schema.types.get("Query").unwrap() else {
            panic!("expected Query object");
        };
        assert!(query.fields.contains_key("internal"));
        assert!(schema.schema_definition.query.is_some());
    }

    #[test]
    fn the_client_schema_omits_inaccessible_fields() {
        let schema = new_schema(&model_with_hidden_field(), SchemaFlavor::Client);
        let ExtendedType::Object(query) = schema.types.get("Query").unwrap() else {
            panic!("expected Query object");
        };
        assert!(!query.fields.contains_key("internal"));
        assert!(query.fields.contains_key("id"));
    }
}

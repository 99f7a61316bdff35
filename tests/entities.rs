use crate::test_helpers::*;

#[test]
fn entity_fields_are_routed_to_their_defining_subgraph_via_the_key() {
    let result = compose(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query {
                  user: User
                }

                type User @key(fields: "id") {
                  id: ID!
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type User @key(fields: "id") {
                  id: ID!
                  name: String
                }
            "#,
        },
    ]);
    let success = assert_composition_success(result);
    let user = object_type(&success.router_schema, "User");
    assert!(user.fields.contains_key("name"));

    let config_b = &success.subgraph_configs_by_name["b"].configuration_data_by_type_name["User"];
    assert!(config_b.field_names.contains("name"));
    assert_eq!(config_b.keys.len(), 1);
    assert_eq!(config_b.keys[0].selection_set, "id");

    let config_a = &success.subgraph_configs_by_name["a"].configuration_data_by_type_name["User"];
    assert!(!config_a.field_names.contains("name"));
    assert_eq!(config_a.keys[0].selection_set, "id");
}

#[test]
fn compound_and_nested_keys_are_normalized() {
    let result = compose(&[ServiceDefinition {
        name: "orders",
        type_defs: r#"
            type Query {
              order: Order
            }

            type Order @key(fields: "id   organization {  id }") {
              id: ID!
              organization: Organization!
            }

            type Organization {
              id: ID!
            }
        "#,
    }]);
    let success = assert_composition_success(result);
    let config =
        &success.subgraph_configs_by_name["orders"].configuration_data_by_type_name["Order"];
    assert_eq!(config.keys[0].selection_set, "id organization { id }");
}

#[test]
fn unresolvable_keys_disable_the_entity_resolver() {
    let result = compose(&[ServiceDefinition {
        name: "users",
        type_defs: r#"
            type Query {
              user: User
            }

            type User @key(fields: "id", resolvable: false) {
              id: ID!
            }
        "#,
    }]);
    let success = assert_composition_success(result);
    let config =
        &success.subgraph_configs_by_name["users"].configuration_data_by_type_name["User"];
    assert!(config.keys[0].disable_entity_resolver);
}

#[test]
fn overridden_fields_are_removed_from_the_source_subgraph_configuration() {
    let result = compose(&[
        ServiceDefinition {
            name: "old",
            type_defs: r#"
                type Query {
                  user: User
                }

                type User @key(fields: "id") {
                  id: ID!
                  name: String
                }
            "#,
        },
        ServiceDefinition {
            name: "new",
            type_defs: r#"
                type User @key(fields: "id") {
                  id: ID!
                  name: String @override(from: "old")
                }
            "#,
        },
    ]);
    let success = assert_composition_success(result);
    let config_old =
        &success.subgraph_configs_by_name["old"].configuration_data_by_type_name["User"];
    assert!(!config_old.field_names.contains("name"));
    let config_new =
        &success.subgraph_configs_by_name["new"].configuration_data_by_type_name["User"];
    assert!(config_new.field_names.contains("name"));
}

#[test]
fn overriding_a_field_from_two_subgraphs_is_an_error() {
    let override_sdl = r#"
        type User @key(fields: "id") {
          id: ID!
          name: String @override(from: "old")
        }
    "#;
    let result = compose(&[
        ServiceDefinition {
            name: "old",
            type_defs: r#"
                type Query {
                  user: User
                }

                type User @key(fields: "id") {
                  id: ID!
                  name: String
                }
            "#,
        },
        ServiceDefinition {
            name: "new-a",
            type_defs: override_sdl,
        },
        ServiceDefinition {
            name: "new-b",
            type_defs: override_sdl,
        },
    ]);
    assert_error_contains(
        &result,
        "The field \"User.name\" is overridden in multiple subgraphs",
    );
}

#[test]
fn overriding_from_the_declaring_subgraph_is_an_error() {
    let result = compose(&[ServiceDefinition {
        name: "users",
        type_defs: r#"
            type Query {
              user: User
            }

            type User @key(fields: "id") {
              id: ID!
              name: String @override(from: "users")
            }
        "#,
    }]);
    assert_error_contains(&result, "the source and target subgraph \"users\" are equivalent");
}

#[test]
fn entity_interfaces_may_be_modeled_as_interface_objects() {
    let result = compose(&[
        ServiceDefinition {
            name: "content",
            type_defs: r#"
                type Query {
                  media: [Media!]!
                }

                interface Media @key(fields: "id") {
                  id: ID!
                  title: String
                }

                type Book implements Media @key(fields: "id") {
                  id: ID!
                  title: String
                }
            "#,
        },
        ServiceDefinition {
            name: "reviews",
            type_defs: r#"
                type Media @key(fields: "id") @interfaceObject {
                  id: ID!
                  reviewCount: Int!
                }
            "#,
        },
    ]);
    let success = assert_composition_success(result);
    // The composed kind stays Interface, and the interface-object field is
    // propagated to the concrete type.
    assert!(matches!(
        success.router_schema.types.get("Media"),
        Some(apollo_compiler::schema::ExtendedType::Interface(_))
    ));
    let book = object_type(&success.router_schema, "Book");
    assert!(book.fields.contains_key("reviewCount"));
    let config = &success.subgraph_configs_by_name["reviews"].configuration_data_by_type_name
        ["Media"];
    assert!(config
        .entity_interface_concrete_type_names
        .contains("Book"));
}

use crate::test_helpers::*;

#[test]
fn inaccessible_fields_are_removed_from_the_client_schema_only() {
    let result = compose(&[ServiceDefinition {
        name: "users",
        type_defs: r#"
            type Query {
              user: User
            }

            type User @key(fields: "id") {
              id: ID!
              internalScore: Int @inaccessible
            }
        "#,
    }]);
    let success = assert_composition_success(result);
    let router_user = object_type(&success.router_schema, "User");
    assert!(router_user.fields.contains_key("internalScore"));
    let client_user = object_type(&success.client_schema, "User");
    assert!(!client_user.fields.contains_key("internalScore"));
}

#[test]
fn a_type_whose_fields_are_all_inaccessible_is_omitted_from_the_client_schema() {
    let result = compose(&[ServiceDefinition {
        name: "users",
        type_defs: r#"
            type Query {
              user: User
              audit: AuditRecord @inaccessible
            }

            type User {
              id: ID!
            }

            type AuditRecord {
              actor: String @inaccessible
              action: String @inaccessible
            }
        "#,
    }]);
    let success = assert_composition_success(result);
    assert!(success.router_schema.types.contains_key("AuditRecord"));
    assert!(!success.client_schema.types.contains_key("AuditRecord"));
    let client_query = object_type(&success.client_schema, "Query");
    assert!(!client_query.fields.contains_key("audit"));
}

#[test]
fn a_fully_inaccessible_query_root_fails_composition() {
    let result = compose(&[ServiceDefinition {
        name: "users",
        type_defs: r#"
            type Query {
              probe: String @inaccessible
            }
        "#,
    }]);
    assert_error_contains(&result, "The federated graph does not define a query root type.");
}

#[test]
fn accessible_references_to_inaccessible_types_are_errors() {
    let result = compose(&[ServiceDefinition {
        name: "users",
        type_defs: r#"
            type Query {
              user: User
              secret: Secret
            }

            type User {
              id: ID!
            }

            type Secret @inaccessible {
              value: String
            }
        "#,
    }]);
    assert_error_contains(&result, "The Object \"Secret\" is declared \"@inaccessible\"");
    assert_error_contains(&result, "\"Query.secret\"");
}

#[test]
fn inaccessibility_merges_across_subgraphs() {
    let result = compose(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query {
                  user: User
                }

                type User @key(fields: "id") {
                  id: ID!
                  email: String
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type User @key(fields: "id") {
                  id: ID!
                  email: String @inaccessible @external
                  obfuscatedEmail: String @requires(fields: "email")
                }
            "#,
        },
    ]);
    let success = assert_composition_success(result);
    let client_user = object_type(&success.client_schema, "User");
    assert!(!client_user.fields.contains_key("email"));
    assert!(client_user.fields.contains_key("obfuscatedEmail"));
}

#[test]
fn an_inaccessible_required_argument_of_an_accessible_field_is_an_error() {
    let result = compose(&[ServiceDefinition {
        name: "users",
        type_defs: r#"
            type Query {
              user(id: ID! @inaccessible): String
            }
        "#,
    }]);
    assert_error_contains(&result, "The required argument \"Query.user(id: ...)\"");
}

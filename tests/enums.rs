use crate::test_helpers::*;

#[test]
fn input_only_enums_merge_by_intersection() {
    let result = compose(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query {
                  byColor(color: Color): [String!]!
                }

                enum Color {
                  RED
                  BLUE
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query {
                  firstByColor(color: Color): String
                }

                enum Color {
                  RED
                }
            "#,
        },
    ]);
    let success = assert_composition_success(result);
    assert_eq!(enum_value_names(&success.router_schema, "Color"), vec!["RED"]);
}

#[test]
fn output_only_enums_merge_by_union() {
    let result = compose(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query {
                  favorite: Color
                }

                enum Color {
                  RED
                  BLUE
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query {
                  leastFavorite: Color
                }

                enum Color {
                  GREEN
                }
            "#,
        },
    ]);
    let success = assert_composition_success(result);
    assert_eq!(
        enum_value_names(&success.router_schema, "Color"),
        vec!["RED", "BLUE", "GREEN"]
    );
}

#[test]
fn enums_used_as_both_input_and_output_must_be_consistent() {
    let result = compose(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query {
                  byColor(color: Color): Color
                }

                enum Color {
                  RED
                  BLUE
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query {
                  favorite: Color
                }

                enum Color {
                  RED
                }
            "#,
        },
    ]);
    assert_error_contains(
        &result,
        "Enum \"Color\" was used as both an input and output but was inconsistently defined",
    );
}

#[test]
fn consistent_enums_used_in_both_positions_compose() {
    let shared = r#"
        enum Color {
          RED
          BLUE
        }
    "#;
    let result = compose(&[
        ServiceDefinition {
            name: "a",
            type_defs: format!(
                r#"
                type Query {{
                  byColor(color: Color): Color
                }}
                {shared}
            "#
            )
            .leak(),
        },
        ServiceDefinition {
            name: "b",
            type_defs: format!(
                r#"
                type Query {{
                  favorite: Color
                }}
                {shared}
            "#
            )
            .leak(),
        },
    ]);
    let success = assert_composition_success(result);
    assert_eq!(
        enum_value_names(&success.router_schema, "Color"),
        vec!["RED", "BLUE"]
    );
}

use federation_composition::SubscriptionFilterCondition;

use crate::test_helpers::*;

#[test]
fn a_valid_filter_condition_reaches_the_field_configuration() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              health: Boolean!
            }

            type Subscription {
              userUpdated: UserUpdate! @openfed__subscriptionFilter(condition: { IN: { fieldPath: "region", values: ["eu", "us"] } })
            }

            type UserUpdate {
              id: ID!
              region: String
            }
        "#,
    }]);
    let success = assert_composition_success(result);
    let configuration = success
        .field_configurations
        .iter()
        .find(|c| c.type_name == "Subscription" && c.field_name == "userUpdated")
        .expect("expected a field configuration for Subscription.userUpdated");
    let Some(SubscriptionFilterCondition::In(condition)) =
        &configuration.subscription_filter_condition
    else {
        panic!(
            "expected an IN condition, got {:?}",
            configuration.subscription_filter_condition
        );
    };
    assert_eq!(condition.field_path, vec!["region"]);
    assert_eq!(condition.values.len(), 2);
}

#[test]
fn nested_and_conditions_compose() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              health: Boolean!
            }

            type Subscription {
              userUpdated: UserUpdate! @openfed__subscriptionFilter(condition: { AND: [{ IN: { fieldPath: "region", values: ["eu"] } }, { NOT: { IN: { fieldPath: "id", values: ["1"] } } }] })
            }

            type UserUpdate {
              id: ID!
              region: String
            }
        "#,
    }]);
    let success = assert_composition_success(result);
    let configuration = success
        .field_configurations
        .iter()
        .find(|c| c.field_name == "userUpdated")
        .unwrap();
    let Some(SubscriptionFilterCondition::And(conditions)) =
        &configuration.subscription_filter_condition
    else {
        panic!("expected an AND condition");
    };
    assert_eq!(conditions.len(), 2);
}

#[test]
fn subscription_filters_on_query_fields_are_location_errors() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              user: User @openfed__subscriptionFilter(condition: { IN: { fieldPath: "id", values: ["1"] } })
            }

            type User {
              id: ID!
            }
        "#,
    }]);
    assert_error_contains(
        &result,
        "must only be defined on a subscription root field, but it was defined on the path \"Query.user\"",
    );
}

#[test]
fn unknown_filter_field_paths_are_errors() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              health: Boolean!
            }

            type Subscription {
              userUpdated: UserUpdate! @openfed__subscriptionFilter(condition: { IN: { fieldPath: "zone", values: ["eu"] } })
            }

            type UserUpdate {
              id: ID!
              region: String
            }
        "#,
    }]);
    assert_error_contains(&result, "no field named \"zone\" exists on type \"UserUpdate\"");
}

#[test]
fn filter_conditions_deeper_than_the_maximum_are_errors() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              health: Boolean!
            }

            type Subscription {
              userUpdated: UserUpdate! @openfed__subscriptionFilter(condition: { NOT: { NOT: { NOT: { IN: { fieldPath: "region", values: ["eu"] } } } } })
            }

            type UserUpdate {
              id: ID!
              region: String
            }
        "#,
    }]);
    assert_error_contains(&result, "exceeds the maximum depth of 3");
}

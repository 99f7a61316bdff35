use federation_composition::EventKind;
use federation_composition::EventProvider;

use crate::test_helpers::*;

#[test]
fn kafka_publish_fields_produce_event_configuration() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              health: Boolean!
            }

            type Mutation {
              publishUserUpdate(id: ID!): edfs__PublishResult! @edfs__kafkaPublish(topic: "user.updates.{{ args.id }}", providerId: "primary")
            }
        "#,
    }]);
    let success = assert_composition_success(result);
    let config =
        &success.subgraph_configs_by_name["events"].configuration_data_by_type_name["Mutation"];
    assert_eq!(config.events.len(), 1);
    let event = &config.events[0];
    assert_eq!(event.event_kind, EventKind::Publish);
    assert_eq!(event.provider_type, EventProvider::Kafka);
    assert_eq!(event.provider_id, "primary");
    assert_eq!(event.topics, vec!["user.updates.{{ args.id }}".to_owned()]);
}

#[test]
fn nats_subscriptions_accept_a_stream_configuration() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              health: Boolean!
            }

            type Subscription {
              userUpdated(id: ID!): UserUpdate! @edfs__natsSubscribe(subjects: ["user.updated.{{ args.id }}"], streamConfiguration: { consumerName: "router", streamName: "users" })
            }

            type UserUpdate {
              id: ID!
              region: String
            }
        "#,
    }]);
    let success = assert_composition_success(result);
    let config =
        &success.subgraph_configs_by_name["events"].configuration_data_by_type_name["Subscription"];
    let event = &config.events[0];
    assert_eq!(event.event_kind, EventKind::Subscribe);
    assert_eq!(event.provider_type, EventProvider::Nats);
    let stream = event.stream_configuration.as_ref().unwrap();
    assert_eq!(stream.consumer_name, "router");
    assert_eq!(stream.stream_name, "users");
    assert_eq!(stream.consumer_inactive_threshold, None);
}

#[test]
fn publish_directives_belong_on_mutation_root_fields() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              wrongPlace: edfs__PublishResult! @edfs__kafkaPublish(topic: "users")
            }
        "#,
    }]);
    assert_error_contains(&result, "must only be defined on a mutation root field");
}

#[test]
fn publish_fields_must_return_the_publish_result() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              health: Boolean!
            }

            type Mutation {
              publishUserUpdate: Boolean! @edfs__redisPublish(channel: "users")
            }
        "#,
    }]);
    assert_error_contains(&result, "A publish field must return \"edfs__PublishResult!\"");
}

#[test]
fn subject_templates_must_reference_declared_arguments() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              health: Boolean!
            }

            type Mutation {
              publishUserUpdate(id: ID!): edfs__PublishResult! @edfs__natsPublish(subject: "user.{{ args.userId }}")
            }
        "#,
    }]);
    assert_error_contains(&result, "references the field argument \"userId\"");
}

#[test]
fn an_incomplete_stream_configuration_is_an_error() {
    let result = compose(&[ServiceDefinition {
        name: "events",
        type_defs: r#"
            type Query {
              health: Boolean!
            }

            type Subscription {
              userUpdated: UserUpdate! @edfs__natsSubscribe(subjects: ["user.updated"], streamConfiguration: { consumerName: "router" })
            }

            type UserUpdate {
              id: ID!
            }
        "#,
    }]);
    assert_error_contains(
        &result,
        "must define both \"consumerName\" and \"streamName\"",
    );
}

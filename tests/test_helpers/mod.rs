use apollo_compiler::Schema;
use apollo_compiler::schema::ExtendedType;
use federation_composition::FederationFailure;
use federation_composition::FederationOptions;
use federation_composition::FederationSuccess;
use federation_composition::Subgraph;
use federation_composition::federate_subgraphs;

#[derive(Debug, Clone, Copy)]
pub struct ServiceDefinition {
    pub name: &'static str,
    pub type_defs: &'static str,
}

pub fn compose(services: &[ServiceDefinition]) -> Result<FederationSuccess, FederationFailure> {
    compose_with_options(services, FederationOptions::default())
}

pub fn compose_with_options(
    services: &[ServiceDefinition],
    options: FederationOptions,
) -> Result<FederationSuccess, FederationFailure> {
    let subgraphs = services
        .iter()
        .map(|service| {
            Subgraph::new(
                service.name,
                &format!("https://{}", service.name),
                service.type_defs,
            )
        })
        .collect();
    federate_subgraphs(subgraphs, options)
}

#[track_caller]
pub fn assert_composition_success(
    result: Result<FederationSuccess, FederationFailure>,
) -> FederationSuccess {
    match result {
        Ok(success) => success,
        Err(failure) => panic!("expected composition to succeed, but got:\n{:#?}", failure.errors),
    }
}

#[track_caller]
pub fn assert_error_contains(result: &Result<FederationSuccess, FederationFailure>, needle: &str) {
    let Err(failure) = result else {
        panic!("expected composition to fail with an error containing {needle:?}");
    };
    assert!(
        failure
            .errors
            .iter()
            .any(|error| error.to_string().contains(needle)),
        "no error contained {needle:?}; errors were:\n{:#?}",
        failure.errors
    );
}

pub fn object_type<'a>(schema: &'a Schema, name: &str) -> &'a apollo_compiler::schema::ObjectType {
    match schema.types.get(name) {
        Some(ExtendedType::Object(object)) => object,
        other => panic!("expected {name} to be an object type, but found {other:?}"),
    }
}

pub fn enum_value_names(schema: &Schema, name: &str) -> Vec<String> {
    match schema.types.get(name) {
        Some(ExtendedType::Enum(enum_type)) => {
            enum_type.values.keys().map(|v| v.to_string()).collect()
        }
        other => panic!("expected {name} to be an enum type, but found {other:?}"),
    }
}

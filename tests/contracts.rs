use federation_composition::ContractTagOptions;
use federation_composition::FederationOptions;
use federation_composition::Subgraph;
use federation_composition::federate_subgraphs_with_contracts;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::test_helpers::*;

fn users_subgraph() -> Subgraph {
    Subgraph::new(
        "users",
        "https://users",
        r#"
        type Query {
          users: [User!]!
          internalMetric: Int @tag(name: "internal")
        }

        type User @key(fields: "id") {
          id: ID!
          name: String @tag(name: "public")
          ssn: String @tag(name: "internal")
        }
    "#,
    )
}

#[test]
fn excluding_a_tag_removes_tagged_elements_from_the_contract_only() {
    let contracts = IndexMap::from_iter([(
        "public".to_owned(),
        ContractTagOptions::Exclude(IndexSet::from_iter(["internal".to_owned()])),
    )]);
    let result = federate_subgraphs_with_contracts(
        vec![users_subgraph()],
        FederationOptions::default(),
        contracts,
    )
    .expect("expected composition to succeed");

    // The base result is unaffected.
    let base_query = object_type(&result.base.router_schema, "Query");
    assert!(base_query.fields.contains_key("internalMetric"));
    let base_user = object_type(&result.base.client_schema, "User");
    assert!(base_user.fields.contains_key("ssn"));

    let contract = result.contracts_by_name["public"]
        .as_ref()
        .expect("expected the contract to succeed");
    for schema in [&contract.router_schema, &contract.client_schema] {
        let query = object_type(schema, "Query");
        assert!(!query.fields.contains_key("internalMetric"));
        assert!(query.fields.contains_key("users"));
        let user = object_type(schema, "User");
        assert!(!user.fields.contains_key("ssn"));
        assert!(user.fields.contains_key("name"));
    }
}

#[test]
fn include_mode_keeps_only_elements_tagged_with_an_included_tag() {
    let contracts = IndexMap::from_iter([(
        "public".to_owned(),
        ContractTagOptions::Include(IndexSet::from_iter(["public".to_owned()])),
    )]);
    let result = federate_subgraphs_with_contracts(
        vec![users_subgraph()],
        FederationOptions::default(),
        contracts,
    )
    .expect("expected composition to succeed");
    let contract = result.contracts_by_name["public"]
        .as_ref()
        .expect("expected the contract to succeed");
    let user = object_type(&contract.router_schema, "User");
    assert!(user.fields.contains_key("name"));
    assert!(!user.fields.contains_key("ssn"));
    // Untagged elements are kept.
    assert!(user.fields.contains_key("id"));
    let query = object_type(&contract.router_schema, "Query");
    assert!(!query.fields.contains_key("internalMetric"));
}

#[test]
fn a_contract_that_filters_every_query_root_field_fails() {
    let subgraph = Subgraph::new(
        "users",
        "https://users",
        r#"
        type Query {
          internalMetric: Int @tag(name: "internal")
        }
    "#,
    );
    let contracts = IndexMap::from_iter([(
        "public".to_owned(),
        ContractTagOptions::Exclude(IndexSet::from_iter(["internal".to_owned()])),
    )]);
    let result =
        federate_subgraphs_with_contracts(vec![subgraph], FederationOptions::default(), contracts)
            .expect("expected the base composition to succeed");
    let contract_failure = result.contracts_by_name["public"]
        .as_ref()
        .expect_err("expected the contract to fail");
    assert!(
        contract_failure
            .errors
            .iter()
            .any(|e| e.to_string().contains("does not define a query root type")),
        "{:?}",
        contract_failure.errors
    );
}

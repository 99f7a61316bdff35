//! ## Usage
//!
//! This crate composes independently authored GraphQL subgraph schemas,
//! each annotated with federation directives, into one federated graph: a
//! router-facing schema, a public client-facing schema, and per-field
//! routing/authorization configuration for the router runtime.
//!
//! Composition is a pure, synchronous computation: it either returns the
//! full set of artifacts or the complete, ordered error report — never
//! partial output.
//!
//! ```no_run
//! use federation_composition::{FederationOptions, Subgraph, federate_subgraphs};
//!
//! let subgraphs = vec![
//!     Subgraph::new("users", "https://users.internal", "type Query { me: ID }"),
//! ];
//! match federate_subgraphs(subgraphs, FederationOptions::default()) {
//!     Ok(success) => println!("{}", success.client_schema),
//!     Err(failure) => {
//!         for error in &failure.errors {
//!             eprintln!("{error}");
//!         }
//!     }
//! }
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

mod authorization;
mod catalog;
pub mod error;
mod events;
mod federate;
mod field_set;
mod model;
mod normalize;
mod resolvability;
mod router_config;
mod subgraph;
mod subscription_filter;

use apollo_compiler::Schema;
use indexmap::IndexMap;
use tracing::debug;

pub use crate::error::CompositionError;
pub use crate::error::CompositionErrors;
pub use crate::error::CompositionWarning;
pub use crate::events::EventConfiguration;
pub use crate::events::EventKind;
pub use crate::events::EventProvider;
pub use crate::events::NatsStreamConfiguration;
pub use crate::federate::contracts::ContractTagOptions;
pub use crate::router_config::ConfigurationData;
pub use crate::router_config::FieldConfiguration;
pub use crate::router_config::RequiredFieldsConfiguration;
pub use crate::router_config::SubgraphConfig;
pub use crate::subgraph::Subgraph;
pub use crate::subscription_filter::SubscriptionFieldCondition;
pub use crate::subscription_filter::SubscriptionFilterCondition;

/// Options controlling one composition run.
#[derive(Debug, Clone, Default)]
pub struct FederationOptions {
    /// Skips the resolvability proof. Intended for diagnostics only: the
    /// composed graph may reference fields no subgraph sequence can fetch.
    pub disable_resolvability_validation: bool,
}

/// The artifacts of a successful composition.
#[derive(Debug)]
pub struct FederationSuccess {
    /// The full internal schema used for routing.
    pub router_schema: Schema,
    /// The public schema: every `@inaccessible`-reachable element removed.
    pub client_schema: Schema,
    /// Per-field routing/authorization entries for the router runtime.
    pub field_configurations: Vec<FieldConfiguration>,
    /// Per-subgraph normalized schema and configuration for a downstream
    /// query planner.
    pub subgraph_configs_by_name: IndexMap<String, SubgraphConfig>,
    pub warnings: Vec<CompositionWarning>,
}

/// The complete, ordered diagnostic report of a failed composition.
#[derive(Debug)]
pub struct FederationFailure {
    pub errors: Vec<CompositionError>,
    pub warnings: Vec<CompositionWarning>,
}

/// A base composition plus one filtered result per requested contract.
#[derive(Debug)]
pub struct FederationSuccessWithContracts {
    pub base: FederationSuccess,
    pub contracts_by_name: IndexMap<String, Result<FederationSuccess, FederationFailure>>,
}

/// Composes the given subgraphs into one federated graph.
pub fn federate_subgraphs(
    subgraphs: Vec<Subgraph>,
    options: FederationOptions,
) -> Result<FederationSuccess, FederationFailure> {
    debug!(subgraphs = subgraphs.len(), "starting federation");
    let batch = normalize::batch::normalize_subgraphs(&subgraphs);
    federate::federate(batch, &options).map(FederationSuccess::from)
}

/// Composes the given subgraphs, then derives one additional contract per
/// entry in `tag_options_by_contract_name` from the already-composed result.
/// Contracts share the base resolvability proof; only the final assembly is
/// re-run per contract.
pub fn federate_subgraphs_with_contracts(
    subgraphs: Vec<Subgraph>,
    options: FederationOptions,
    tag_options_by_contract_name: IndexMap<String, ContractTagOptions>,
) -> Result<FederationSuccessWithContracts, FederationFailure> {
    let batch = normalize::batch::normalize_subgraphs(&subgraphs);
    let artifacts = federate::federate(batch, &options)?;
    let mut contracts_by_name = IndexMap::new();
    for (contract_name, tag_options) in tag_options_by_contract_name {
        debug!(contract = contract_name.as_str(), "computing contract");
        let contract = federate::contracts::new_contract_artifacts(&artifacts, &tag_options)
            .map(FederationSuccess::from);
        contracts_by_name.insert(contract_name, contract);
    }
    Ok(FederationSuccessWithContracts {
        base: FederationSuccess::from(artifacts),
        contracts_by_name,
    })
}

impl From<federate::FederationArtifacts> for FederationSuccess {
    fn from(artifacts: federate::FederationArtifacts) -> Self {
        Self {
            router_schema: artifacts.router_schema,
            client_schema: artifacts.client_schema,
            field_configurations: artifacts.field_configurations,
            subgraph_configs_by_name: artifacts.subgraph_configs_by_name,
            warnings: artifacts.warnings,
        }
    }
}

const _: () = {
    const fn assert_thread_safe<T: Sync + Send>() {}

    assert_thread_safe::<Subgraph>();
    assert_thread_safe::<FederationSuccess>();
    assert_thread_safe::<FederationFailure>();
};

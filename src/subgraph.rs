//! The composition engine's input: one independently authored subgraph.

/// One subgraph to be federated: a unique, non-empty name, the routing URL,
/// and the type-system document as SDL. Parsing and validation happen during
/// normalization so that all diagnostics are collected in one report.
#[derive(Debug, Clone)]
pub struct Subgraph {
    pub name: String,
    pub url: String,
    pub schema: String,
}

impl Subgraph {
    pub fn new(name: &str, url: &str, schema: &str) -> Self {
        Self {
            name: name.to_owned(),
            url: url.to_owned(),
            schema: schema.to_owned(),
        }
    }
}

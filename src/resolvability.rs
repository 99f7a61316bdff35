//! The resolvability graph: a proof that every field of the composed schema
//! is fetchable by some sequence of subgraph calls and entity jumps.
//!
//! Nodes are `(subgraph, composite type)` pairs; edges are field traversals,
//! abstract-member downcasts, and entity jumps. The graph is built
//! incrementally while each subgraph is normalized, entity-jump edges are
//! registered during federation once every key is known, and validation is a
//! reachability computation from the root operation nodes.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::VecDeque;

use crate::error::CompositionError;
use crate::model::EntityData;
use crate::model::OperationKind;
use crate::model::TypeData;
use crate::model::field_coords;

#[derive(Debug, Clone)]
pub(crate) struct GraphNode {
    pub(crate) subgraph_name: String,
    pub(crate) type_name: Name,
    pub(crate) root_kind: Option<OperationKind>,
    /// Normalized key field-sets this node can satisfy with local fields,
    /// enabling entity jumps out of this subgraph.
    pub(crate) satisfied_key_field_sets: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GraphEdge {
    /// Traversing a field of the head node's type.
    Field { field_name: Name },
    /// Downcasting an abstract type to one of its members.
    AbstractMember,
    /// Jumping to another subgraph through a resolvable entity key.
    EntityJump { key_field_set: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    subgraph_name: String,
    type_name: Name,
}

#[derive(Debug, Default)]
pub(crate) struct ResolvabilityGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    node_index_by_key: IndexMap<NodeKey, NodeIndex>,
    current_subgraph_name: String,
}

impl ResolvabilityGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// All nodes/edges added until the next call belong to this subgraph.
    pub(crate) fn set_subgraph(&mut self, subgraph_name: &str) {
        self.current_subgraph_name = subgraph_name.to_owned();
    }

    pub(crate) fn ensure_node(&mut self, type_name: &Name) -> NodeIndex {
        let key = NodeKey {
            subgraph_name: self.current_subgraph_name.clone(),
            type_name: type_name.clone(),
        };
        if let Some(index) = self.node_index_by_key.get(&key) {
            return *index;
        }
        let index = self.graph.add_node(GraphNode {
            subgraph_name: key.subgraph_name.clone(),
            type_name: key.type_name.clone(),
            root_kind: None,
            satisfied_key_field_sets: IndexSet::new(),
        });
        self.node_index_by_key.insert(key, index);
        index
    }

    pub(crate) fn set_root(&mut self, type_name: &Name, kind: OperationKind) {
        let index = self.ensure_node(type_name);
        self.graph[index].root_kind = Some(kind);
    }

    /// A field of `parent_type_name` returning the composite `target_type_name`.
    pub(crate) fn add_field_edge(
        &mut self,
        parent_type_name: &Name,
        field_name: &Name,
        target_type_name: &Name,
    ) {
        let head = self.ensure_node(parent_type_name);
        let tail = self.ensure_node(target_type_name);
        self.graph.add_edge(
            head,
            tail,
            GraphEdge::Field {
                field_name: field_name.clone(),
            },
        );
    }

    pub(crate) fn add_abstract_member_edge(
        &mut self,
        abstract_type_name: &Name,
        member_type_name: &Name,
    ) {
        let head = self.ensure_node(abstract_type_name);
        let tail = self.ensure_node(member_type_name);
        self.graph.add_edge(head, tail, GraphEdge::AbstractMember);
    }

    /// Records that the current subgraph's node for `type_name` can satisfy
    /// the given normalized key field-set with locally available fields.
    pub(crate) fn add_satisfied_key(&mut self, type_name: &Name, normalized_key_field_set: String) {
        let index = self.ensure_node(type_name);
        self.graph[index]
            .satisfied_key_field_sets
            .insert(normalized_key_field_set);
    }

    /// Registers entity-jump edges: once any subgraph can satisfy a key that
    /// another subgraph declares resolvable, the entity's fields in the
    /// latter become reachable from the former.
    pub(crate) fn finalize_entity_jumps(&mut self, entity_data_by_type_name: &IndexMap<Name, EntityData>) {
        for (type_name, entity_data) in entity_data_by_type_name {
            for normalized_key in &entity_data.normalized_key_field_sets {
                let target_subgraph_names = entity_data.resolvable_subgraphs_for_key(normalized_key);
                for source_subgraph_name in &entity_data.subgraph_names {
                    let source_key = NodeKey {
                        subgraph_name: source_subgraph_name.clone(),
                        type_name: type_name.clone(),
                    };
                    let Some(&source_index) = self.node_index_by_key.get(&source_key) else {
                        continue;
                    };
                    if !self.graph[source_index]
                        .satisfied_key_field_sets
                        .contains(normalized_key)
                    {
                        continue;
                    }
                    for target_subgraph_name in &target_subgraph_names {
                        // A subgraph does not jump to itself.
                        if target_subgraph_name == source_subgraph_name {
                            continue;
                        }
                        let target_key = NodeKey {
                            subgraph_name: target_subgraph_name.clone(),
                            type_name: type_name.clone(),
                        };
                        let Some(&target_index) = self.node_index_by_key.get(&target_key) else {
                            continue;
                        };
                        self.graph.add_edge(
                            source_index,
                            target_index,
                            GraphEdge::EntityJump {
                                key_field_set: normalized_key.clone(),
                            },
                        );
                    }
                }
            }
        }
    }

    /// Proves that every field of the composed schema is fetchable. Returns
    /// the ordered list of unresolvable-field errors; empty means the proof
    /// succeeded.
    pub(crate) fn validate(
        &self,
        merged_type_data_by_name: &IndexMap<Name, TypeData>,
        root_type_names: &IndexSet<Name>,
        exempt_field_coords: &IndexSet<String>,
    ) -> Vec<CompositionError> {
        let mut errors = Vec::new();
        let (reachable, predecessors) = self.reachable_from_roots();
        for type_data in merged_type_data_by_name.values() {
            let Some(fields) = type_data.fields() else {
                continue;
            };
            let type_name = type_data.name();
            let is_root = root_type_names.contains(type_name);
            for field_data in fields.values() {
                // Fields an entity interface stands in for (interface
                // objects) are proven through the interface itself.
                if exempt_field_coords.contains(&field_data.coords()) {
                    continue;
                }
                let resolving_subgraph_names = field_data.resolvable_subgraph_names();
                if resolving_subgraph_names.is_empty() {
                    // Every instance external: reported by the normalizer.
                    continue;
                }
                // Root nodes are always enterable.
                if is_root {
                    continue;
                }
                let is_resolvable = resolving_subgraph_names.iter().any(|subgraph_name| {
                    let key = NodeKey {
                        subgraph_name: subgraph_name.clone(),
                        type_name: type_name.clone(),
                    };
                    self.node_index_by_key
                        .get(&key)
                        .is_some_and(|index| reachable.contains(index))
                });
                if is_resolvable {
                    continue;
                }
                errors.push(self.new_unresolvable_field_error(
                    type_name,
                    &field_data.name,
                    &resolving_subgraph_names,
                    &reachable,
                    &predecessors,
                ));
            }
        }
        errors
    }

    fn reachable_from_roots(
        &self,
    ) -> (
        IndexSet<NodeIndex>,
        IndexMap<NodeIndex, (NodeIndex, String)>,
    ) {
        let mut reachable = IndexSet::new();
        let mut predecessors: IndexMap<NodeIndex, (NodeIndex, String)> = IndexMap::new();
        let mut queue = VecDeque::new();
        for index in self.graph.node_indices() {
            if self.graph[index].root_kind.is_some() && reachable.insert(index) {
                queue.push_back(index);
            }
        }
        while let Some(head) = queue.pop_front() {
            for edge in self.graph.edges(head) {
                let tail = edge.target();
                if reachable.insert(tail) {
                    let label = match edge.weight() {
                        GraphEdge::Field { field_name } => field_name.to_string(),
                        GraphEdge::AbstractMember => {
                            format!("... on {}", self.graph[tail].type_name)
                        }
                        GraphEdge::EntityJump { key_field_set } => {
                            format!(
                                "{{ {key_field_set} }} in subgraph \"{}\"",
                                self.graph[tail].subgraph_name
                            )
                        }
                    };
                    predecessors.insert(tail, (head, label));
                    queue.push_back(tail);
                }
            }
        }
        (reachable, predecessors)
    }

    fn new_unresolvable_field_error(
        &self,
        type_name: &Name,
        field_name: &Name,
        resolving_subgraph_names: &IndexSet<String>,
        reachable: &IndexSet<NodeIndex>,
        predecessors: &IndexMap<NodeIndex, (NodeIndex, String)>,
    ) -> CompositionError {
        // Render the path through some reachable sibling node of the same
        // type; if none exists, the type itself is unreachable everywhere.
        let reachable_sibling = self
            .node_index_by_key
            .iter()
            .filter(|(key, _)| key.type_name == *type_name)
            .map(|(_, index)| *index)
            .find(|index| reachable.contains(index));
        let path = match reachable_sibling {
            Some(index) => {
                let mut segments = vec![field_name.to_string()];
                let mut current = index;
                while let Some((head, label)) = predecessors.get(&current) {
                    segments.push(label.clone());
                    current = *head;
                }
                segments.push(self.graph[current].type_name.to_string().to_lowercase());
                segments.reverse();
                segments.join(".")
            }
            None => format!("{}.{}", type_name.to_string().to_lowercase(), field_name),
        };
        let mut reasons = Vec::new();
        for subgraph_name in resolving_subgraph_names {
            reasons.push(format!(
                "The field \"{}\" is defined in subgraph \"{subgraph_name}\", but no reachable subgraph can satisfy a key field set that \"{subgraph_name}\" declares resolvable for the type \"{type_name}\".",
                field_coords(type_name, field_name)
            ));
        }
        for (key, index) in &self.node_index_by_key {
            if key.type_name == *type_name && reachable.contains(index) {
                reasons.push(format!(
                    "The type \"{type_name}\" is reachable in subgraph \"{}\", which does not define the field \"{field_name}\".",
                    key.subgraph_name
                ));
            }
        }
        CompositionError::UnresolvableField {
            field_coords: field_coords(type_name, field_name),
            path,
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;

    fn keyed_entity_graph(satisfies_in_a: bool) -> ResolvabilityGraph {
        let mut graph = ResolvabilityGraph::new();
        graph.set_subgraph("a");
        graph.set_root(&name!("Query"), OperationKind::Query);
        graph.add_field_edge(&name!("Query"), &name!("user"), &name!("User"));
        if satisfies_in_a {
            graph.add_satisfied_key(&name!("User"), "id".to_owned());
        }
        graph.set_subgraph("b");
        graph.ensure_node(&name!("User"));
        graph.add_satisfied_key(&name!("User"), "id".to_owned());
        graph
    }

    fn user_entity_data() -> IndexMap<Name, EntityData> {
        use crate::model::KeyFieldSet;
        let mut entity = EntityData::default();
        for subgraph in ["a", "b"] {
            entity.add_keys(
                subgraph,
                vec![KeyFieldSet {
                    raw: "id".to_owned(),
                    normalized: "id".to_owned(),
                    is_unresolvable: false,
                }],
            );
        }
        IndexMap::from_iter([(name!("User"), entity)])
    }

    #[test]
    fn entity_jump_connects_key_satisfying_subgraphs() {
        let mut graph = keyed_entity_graph(true);
        graph.finalize_entity_jumps(&user_entity_data());
        let (reachable, _) = graph.reachable_from_roots();
        let b_user = NodeKey {
            subgraph_name: "b".to_owned(),
            type_name: name!("User"),
        };
        let index = graph.node_index_by_key.get(&b_user).copied().unwrap();
        assert!(reachable.contains(&index));
    }

    #[test]
    fn no_jump_without_a_locally_satisfied_key() {
        let mut graph = keyed_entity_graph(false);
        graph.finalize_entity_jumps(&user_entity_data());
        let (reachable, _) = graph.reachable_from_roots();
        let b_user = NodeKey {
            subgraph_name: "b".to_owned(),
            type_name: name!("User"),
        };
        let index = graph.node_index_by_key.get(&b_user).copied().unwrap();
        assert!(!reachable.contains(&index));
    }
}

//! Intermediate type model shared by normalization and federation.
//!
//! Each GraphQL kind is a dedicated struct under the closed [`TypeData`]
//! union. The model is built once per subgraph during normalization; during
//! federation the first occurrence of a type name is copied as the working
//! target and subsequent occurrences are merged into that copy in place.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use indexmap::IndexMap;
use indexmap::IndexSet;

/// Applied directives per element, keyed by directive name. Repeatable
/// directives keep every occurrence in declaration order.
pub(crate) type DirectiveMap = IndexMap<Name, Vec<Node<ast::Directive>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ExtensionKind {
    #[default]
    None,
    Extension,
    LegacyExtends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub(crate) enum OperationKind {
    #[strum(serialize = "query")]
    Query,
    #[strum(serialize = "mutation")]
    Mutation,
    #[strum(serialize = "subscription")]
    Subscription,
}

impl OperationKind {
    pub(crate) fn canonical_type_name(&self) -> Name {
        match self {
            OperationKind::Query => crate::catalog::QUERY,
            OperationKind::Mutation => crate::catalog::MUTATION,
            OperationKind::Subscription => crate::catalog::SUBSCRIPTION,
        }
    }
}

#[derive(Debug, Clone, derive_more::From)]
pub(crate) enum TypeData {
    Scalar(ScalarData),
    Object(ObjectData),
    Interface(InterfaceData),
    Union(UnionData),
    Enum(EnumData),
    InputObject(InputObjectData),
}

#[derive(Debug, Clone)]
pub(crate) struct ScalarData {
    pub(crate) name: Name,
    pub(crate) description: Option<Node<str>>,
    pub(crate) directives: DirectiveMap,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) extension_kind: ExtensionKind,
    pub(crate) is_inaccessible: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectData {
    pub(crate) name: Name,
    pub(crate) description: Option<Node<str>>,
    pub(crate) directives: DirectiveMap,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) extension_kind: ExtensionKind,
    pub(crate) is_inaccessible: bool,
    pub(crate) fields: IndexMap<Name, FieldData>,
    pub(crate) implements: IndexSet<Name>,
    pub(crate) is_entity: bool,
    pub(crate) is_root_type: bool,
    /// Subgraphs in which the type is declared `@interfaceObject`.
    pub(crate) interface_object_subgraph_names: IndexSet<String>,
    /// Subgraphs in which the whole type is declared `@shareable`.
    pub(crate) shareable_subgraph_names: IndexSet<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct InterfaceData {
    pub(crate) name: Name,
    pub(crate) description: Option<Node<str>>,
    pub(crate) directives: DirectiveMap,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) extension_kind: ExtensionKind,
    pub(crate) is_inaccessible: bool,
    pub(crate) fields: IndexMap<Name, FieldData>,
    pub(crate) implements: IndexSet<Name>,
    /// An interface with at least one `@key` is an entity interface.
    pub(crate) is_entity: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct UnionData {
    pub(crate) name: Name,
    pub(crate) description: Option<Node<str>>,
    pub(crate) directives: DirectiveMap,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) extension_kind: ExtensionKind,
    pub(crate) is_inaccessible: bool,
    pub(crate) members: IndexSet<Name>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnumData {
    pub(crate) name: Name,
    pub(crate) description: Option<Node<str>>,
    pub(crate) directives: DirectiveMap,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) extension_kind: ExtensionKind,
    pub(crate) is_inaccessible: bool,
    pub(crate) values: IndexMap<Name, EnumValueData>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnumValueData {
    pub(crate) name: Name,
    pub(crate) description: Option<Node<str>>,
    pub(crate) directives: DirectiveMap,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct InputObjectData {
    pub(crate) name: Name,
    pub(crate) description: Option<Node<str>>,
    pub(crate) directives: DirectiveMap,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) extension_kind: ExtensionKind,
    pub(crate) is_inaccessible: bool,
    pub(crate) fields: IndexMap<Name, InputValueData>,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldData {
    pub(crate) name: Name,
    pub(crate) parent_type_name: Name,
    pub(crate) ty: Type,
    pub(crate) description: Option<Node<str>>,
    pub(crate) directives: DirectiveMap,
    pub(crate) arguments: IndexMap<Name, InputValueData>,
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) external_subgraph_names: IndexSet<String>,
    pub(crate) shareable_subgraph_names: IndexSet<String>,
    /// Declaring subgraph name to the `@override(from:)` source subgraph.
    pub(crate) override_source_by_subgraph_name: IndexMap<String, String>,
    pub(crate) is_inaccessible: bool,
}

impl FieldData {
    pub(crate) fn coords(&self) -> String {
        format!("{}.{}", self.parent_type_name, self.name)
    }

    pub(crate) fn is_external_in(&self, subgraph_name: &str) -> bool {
        self.external_subgraph_names.contains(subgraph_name)
    }

    pub(crate) fn is_shareable_in(&self, subgraph_name: &str) -> bool {
        self.shareable_subgraph_names.contains(subgraph_name)
    }

    /// Subgraphs that can actually resolve the field: declared, not external,
    /// and not the source of an effective override.
    pub(crate) fn resolvable_subgraph_names(&self) -> IndexSet<String> {
        let overridden: IndexSet<&String> = self.override_source_by_subgraph_name.values().collect();
        self.subgraph_names
            .iter()
            .filter(|name| {
                !self.external_subgraph_names.contains(*name) && !overridden.contains(name)
            })
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputValueKind {
    Argument,
    InputField,
}

impl InputValueKind {
    pub(crate) fn kind_string(&self) -> &'static str {
        match self {
            InputValueKind::Argument => "argument",
            InputValueKind::InputField => "Input field",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InputValueData {
    pub(crate) name: Name,
    pub(crate) kind: InputValueKind,
    pub(crate) ty: Type,
    pub(crate) description: Option<Node<str>>,
    pub(crate) directives: DirectiveMap,
    pub(crate) default_value: Option<Node<Value>>,
    pub(crate) subgraph_names: IndexSet<String>,
    /// Subgraphs in which the value is non-null with no default.
    pub(crate) required_subgraph_names: IndexSet<String>,
    pub(crate) is_inaccessible: bool,
}

impl InputValueData {
    pub(crate) fn is_required(&self) -> bool {
        !self.required_subgraph_names.is_empty()
    }
}

impl TypeData {
    pub(crate) fn name(&self) -> &Name {
        match self {
            TypeData::Scalar(d) => &d.name,
            TypeData::Object(d) => &d.name,
            TypeData::Interface(d) => &d.name,
            TypeData::Union(d) => &d.name,
            TypeData::Enum(d) => &d.name,
            TypeData::InputObject(d) => &d.name,
        }
    }

    pub(crate) fn kind_string(&self) -> &'static str {
        match self {
            TypeData::Scalar(_) => "Scalar",
            TypeData::Object(_) => "Object",
            TypeData::Interface(_) => "Interface",
            TypeData::Union(_) => "Union",
            TypeData::Enum(_) => "Enum",
            TypeData::InputObject(_) => "Input Object",
        }
    }

    pub(crate) fn directives(&self) -> &DirectiveMap {
        match self {
            TypeData::Scalar(d) => &d.directives,
            TypeData::Object(d) => &d.directives,
            TypeData::Interface(d) => &d.directives,
            TypeData::Union(d) => &d.directives,
            TypeData::Enum(d) => &d.directives,
            TypeData::InputObject(d) => &d.directives,
        }
    }

    pub(crate) fn is_inaccessible(&self) -> bool {
        match self {
            TypeData::Scalar(d) => d.is_inaccessible,
            TypeData::Object(d) => d.is_inaccessible,
            TypeData::Interface(d) => d.is_inaccessible,
            TypeData::Union(d) => d.is_inaccessible,
            TypeData::Enum(d) => d.is_inaccessible,
            TypeData::InputObject(d) => d.is_inaccessible,
        }
    }

    pub(crate) fn set_inaccessible(&mut self) {
        match self {
            TypeData::Scalar(d) => d.is_inaccessible = true,
            TypeData::Object(d) => d.is_inaccessible = true,
            TypeData::Interface(d) => d.is_inaccessible = true,
            TypeData::Union(d) => d.is_inaccessible = true,
            TypeData::Enum(d) => d.is_inaccessible = true,
            TypeData::InputObject(d) => d.is_inaccessible = true,
        }
    }

    pub(crate) fn extension_kind(&self) -> ExtensionKind {
        match self {
            TypeData::Scalar(d) => d.extension_kind,
            TypeData::Object(d) => d.extension_kind,
            TypeData::Interface(d) => d.extension_kind,
            TypeData::Union(d) => d.extension_kind,
            TypeData::Enum(d) => d.extension_kind,
            TypeData::InputObject(d) => d.extension_kind,
        }
    }

    /// Fields of an object or interface; `None` for other kinds.
    pub(crate) fn fields(&self) -> Option<&IndexMap<Name, FieldData>> {
        match self {
            TypeData::Object(d) => Some(&d.fields),
            TypeData::Interface(d) => Some(&d.fields),
            _ => None,
        }
    }

    pub(crate) fn fields_mut(&mut self) -> Option<&mut IndexMap<Name, FieldData>> {
        match self {
            TypeData::Object(d) => Some(&mut d.fields),
            TypeData::Interface(d) => Some(&mut d.fields),
            _ => None,
        }
    }

    pub(crate) fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeData::Object(_) | TypeData::Interface(_) | TypeData::Union(_)
        )
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, TypeData::Scalar(_) | TypeData::Enum(_))
    }
}

/// One `@key` selection declared by a subgraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyFieldSet {
    pub(crate) raw: String,
    pub(crate) normalized: String,
    pub(crate) is_unresolvable: bool,
}

/// Cross-subgraph key data for one entity type.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntityData {
    pub(crate) subgraph_names: IndexSet<String>,
    pub(crate) keys_by_subgraph_name: IndexMap<String, Vec<KeyFieldSet>>,
    /// Union of every normalized key field-set string across subgraphs.
    pub(crate) normalized_key_field_sets: IndexSet<String>,
}

impl EntityData {
    pub(crate) fn add_keys(&mut self, subgraph_name: &str, keys: Vec<KeyFieldSet>) {
        self.subgraph_names.insert(subgraph_name.to_owned());
        let existing = self
            .keys_by_subgraph_name
            .entry(subgraph_name.to_owned())
            .or_default();
        for key in keys {
            self.normalized_key_field_sets.insert(key.normalized.clone());
            // A repeated identical key declaration is a harmless duplicate.
            if !existing.iter().any(|existing_key| existing_key.raw == key.raw) {
                existing.push(key);
            }
        }
    }

    /// Subgraphs that declare the given normalized key as resolvable.
    pub(crate) fn resolvable_subgraphs_for_key(&self, normalized: &str) -> IndexSet<String> {
        self.keys_by_subgraph_name
            .iter()
            .filter(|(_, keys)| {
                keys.iter()
                    .any(|k| k.normalized == normalized && !k.is_unresolvable)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Cross-subgraph record for an entity interface or `@interfaceObject` type.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntityInterfaceData {
    pub(crate) subgraph_names: IndexSet<String>,
    /// Subgraphs in which the type is declared `@interfaceObject`.
    pub(crate) interface_object_subgraph_names: IndexSet<String>,
    pub(crate) concrete_type_names: IndexSet<Name>,
    pub(crate) interface_field_names: IndexSet<Name>,
    pub(crate) interface_object_field_names: IndexSet<Name>,
}

/// Where an enum name has been referenced across every subgraph, which
/// decides its merge strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EnumUsage {
    pub(crate) input: bool,
    pub(crate) output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnumMergeMode {
    /// Input and output: every subgraph must define the exact same values.
    Consistent,
    /// Input only: keep values common to all subgraphs.
    Intersection,
    /// Output only (or unused): keep values from any subgraph.
    Union,
}

impl EnumUsage {
    pub(crate) fn merge_mode(&self) -> EnumMergeMode {
        match (self.input, self.output) {
            (true, true) => EnumMergeMode::Consistent,
            (true, false) => EnumMergeMode::Intersection,
            _ => EnumMergeMode::Union,
        }
    }
}

pub(crate) fn field_coords(type_name: &Name, field_name: &Name) -> String {
    format!("{type_name}.{field_name}")
}

pub(crate) fn argument_coords(type_name: &Name, field_name: &Name, argument_name: &Name) -> String {
    format!("{type_name}.{field_name}({argument_name}: ...)")
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;

    fn field(subgraphs: &[&str]) -> FieldData {
        FieldData {
            name: name!("id"),
            parent_type_name: name!("User"),
            ty: Type::Named(name!("ID")),
            description: None,
            directives: Default::default(),
            arguments: Default::default(),
            subgraph_names: subgraphs.iter().map(|s| s.to_string()).collect(),
            external_subgraph_names: Default::default(),
            shareable_subgraph_names: Default::default(),
            override_source_by_subgraph_name: Default::default(),
            is_inaccessible: false,
        }
    }

    #[test]
    fn resolvable_subgraphs_exclude_external_and_overridden_sources() {
        let mut data = field(&["a", "b", "c"]);
        data.external_subgraph_names.insert("b".to_owned());
        // "c" overrides the field from "a"
        data.override_source_by_subgraph_name
            .insert("c".to_owned(), "a".to_owned());
        let resolvable = data.resolvable_subgraph_names();
        assert_eq!(resolvable.len(), 1);
        assert!(resolvable.contains("c"));
    }

    #[test]
    fn enum_usage_selects_the_merge_mode() {
        let both = EnumUsage {
            input: true,
            output: true,
        };
        assert_eq!(both.merge_mode(), EnumMergeMode::Consistent);
        let input_only = EnumUsage {
            input: true,
            output: false,
        };
        assert_eq!(input_only.merge_mode(), EnumMergeMode::Intersection);
        let output_only = EnumUsage {
            input: false,
            output: true,
        };
        assert_eq!(output_only.merge_mode(), EnumMergeMode::Union);
    }

    #[test]
    fn entity_data_unions_normalized_keys() {
        let mut entity = EntityData::default();
        entity.add_keys(
            "a",
            vec![KeyFieldSet {
                raw: "id".to_owned(),
                normalized: "id".to_owned(),
                is_unresolvable: false,
            }],
        );
        entity.add_keys(
            "b",
            vec![
                KeyFieldSet {
                    raw: " id ".to_owned(),
                    normalized: "id".to_owned(),
                    is_unresolvable: false,
                },
                KeyFieldSet {
                    raw: "sku upc".to_owned(),
                    normalized: "sku upc".to_owned(),
                    is_unresolvable: true,
                },
            ],
        );
        assert_eq!(entity.normalized_key_field_sets.len(), 2);
        let resolvers = entity.resolvable_subgraphs_for_key("id");
        assert!(resolvers.contains("a") && resolvers.contains("b"));
        assert!(entity.resolvable_subgraphs_for_key("sku upc").is_empty());
    }
}

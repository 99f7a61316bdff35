//! Field-set parsing and validation.
//!
//! `@key`, `@provides`, and `@requires` embed a selection-set string in a
//! directive argument. Only a small subset of selection syntax is legal there
//! (fields and inline fragments; no arguments, aliases, nor named fragments),
//! so the string is re-parsed with a dedicated recursive-descent parser
//! rather than the general-purpose GraphQL parser, then walked against the
//! in-progress type model.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::catalog::MAXIMUM_TYPE_NESTING;
use crate::model::TypeData;
use crate::model::field_coords;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selection {
    Field {
        name: String,
        has_arguments: bool,
        selection_set: Option<Vec<Selection>>,
    },
    InlineFragment {
        type_condition: String,
        selection_set: Vec<Selection>,
    },
}

/// Parses a raw field-set string. The outer braces are implied, but a
/// brace-wrapped string is tolerated.
pub(crate) fn parse_field_set(input: &str) -> Result<Vec<Selection>, String> {
    let trimmed = input.trim();
    let input = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(trimmed);
    let mut parser = FieldSetParser::new(input);
    let selections = parser.parse_selections()?;
    parser.skip_ignored();
    if !parser.is_at_end() {
        return Err(format!(
            "unexpected character \"{}\" at offset {}",
            parser.current_char(),
            parser.offset
        ));
    }
    if selections.is_empty() {
        return Err("the field set defines no selections".to_owned());
    }
    Ok(selections)
}

struct FieldSetParser<'a> {
    input: &'a str,
    chars: Vec<char>,
    offset: usize,
}

impl<'a> FieldSetParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            offset: 0,
        }
    }

    fn is_at_end(&self) -> bool {
        self.offset >= self.chars.len()
    }

    fn current_char(&self) -> char {
        self.chars.get(self.offset).copied().unwrap_or('\0')
    }

    fn skip_ignored(&mut self) {
        while !self.is_at_end() {
            let c = self.current_char();
            if c.is_whitespace() || c == ',' {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    fn parse_name(&mut self) -> Option<String> {
        let start = self.offset;
        let first = self.current_char();
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        self.offset += 1;
        while !self.is_at_end() {
            let c = self.current_char();
            if c.is_ascii_alphanumeric() || c == '_' {
                self.offset += 1;
            } else {
                break;
            }
        }
        Some(self.chars[start..self.offset].iter().collect())
    }

    fn parse_selections(&mut self) -> Result<Vec<Selection>, String> {
        let mut selections = Vec::new();
        loop {
            self.skip_ignored();
            if self.is_at_end() || self.current_char() == '}' {
                return Ok(selections);
            }
            if self.input[self.byte_offset()..].starts_with("...") {
                self.offset += 3;
                selections.push(self.parse_inline_fragment()?);
                continue;
            }
            let Some(name) = self.parse_name() else {
                return Err(format!(
                    "unexpected character \"{}\" at offset {}",
                    self.current_char(),
                    self.offset
                ));
            };
            self.skip_ignored();
            if self.current_char() == ':' {
                return Err(format!("aliases are not supported, but one is defined on field \"{name}\""));
            }
            let has_arguments = if self.current_char() == '(' {
                self.skip_argument_list()?;
                self.skip_ignored();
                true
            } else {
                false
            };
            let selection_set = if self.current_char() == '{' {
                self.offset += 1;
                let nested = self.parse_selections()?;
                self.skip_ignored();
                if self.current_char() != '}' {
                    return Err(format!("expected \"}}\" to close the selection set of field \"{name}\""));
                }
                self.offset += 1;
                if nested.is_empty() {
                    return Err(format!("the selection set of field \"{name}\" is empty"));
                }
                Some(nested)
            } else {
                None
            };
            selections.push(Selection::Field {
                name,
                has_arguments,
                selection_set,
            });
        }
    }

    fn parse_inline_fragment(&mut self) -> Result<Selection, String> {
        self.skip_ignored();
        let keyword = self.parse_name();
        if keyword.as_deref() != Some("on") {
            return Err("an inline fragment must define a type condition".to_owned());
        }
        self.skip_ignored();
        let Some(type_condition) = self.parse_name() else {
            return Err("an inline fragment must define a type condition".to_owned());
        };
        self.skip_ignored();
        if self.current_char() != '{' {
            return Err(format!(
                "the inline fragment on type \"{type_condition}\" must define a selection set"
            ));
        }
        self.offset += 1;
        let selection_set = self.parse_selections()?;
        self.skip_ignored();
        if self.current_char() != '}' {
            return Err(format!(
                "expected \"}}\" to close the inline fragment on type \"{type_condition}\""
            ));
        }
        self.offset += 1;
        if selection_set.is_empty() {
            return Err(format!(
                "the selection set of the inline fragment on type \"{type_condition}\" is empty"
            ));
        }
        Ok(Selection::InlineFragment {
            type_condition,
            selection_set,
        })
    }

    // Arguments are illegal in a field set; the list is consumed so the walk
    // can report the offending field coordinates instead of a parse failure.
    fn skip_argument_list(&mut self) -> Result<(), String> {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.current_char() {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.offset += 1;
                        return Ok(());
                    }
                }
                _ => {}
            }
            self.offset += 1;
        }
        Err("expected \")\" to close an argument list".to_owned())
    }

    fn byte_offset(&self) -> usize {
        self.chars[..self.offset].iter().map(|c| c.len_utf8()).sum()
    }
}

/// Renders selections back to a canonical single-spaced field-set string.
pub(crate) fn render_field_set(selections: &[Selection]) -> String {
    let mut parts = Vec::with_capacity(selections.len());
    for selection in selections {
        match selection {
            Selection::Field {
                name,
                selection_set,
                ..
            } => match selection_set {
                Some(nested) => parts.push(format!("{name} {{ {} }}", render_field_set(nested))),
                None => parts.push(name.clone()),
            },
            Selection::InlineFragment {
                type_condition,
                selection_set,
            } => parts.push(format!(
                "... on {type_condition} {{ {} }}",
                render_field_set(selection_set)
            )),
        }
    }
    parts.join(" ")
}

/// A leaf or intermediate field visited by a conditional (provides/requires)
/// field-set walk, with its external status in the walking subgraph.
#[derive(Debug, Clone)]
pub(crate) struct ConditionalField {
    pub(crate) coords: String,
    pub(crate) is_external: bool,
    /// True when the field is a key field of its parent entity in this
    /// subgraph, so it is provided without any conditional selection.
    pub(crate) is_unconditionally_provided: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ConditionalFieldSetValidationResult {
    pub(crate) normalized: String,
    pub(crate) conditional_fields: Vec<ConditionalField>,
}

pub(crate) struct FieldSetWalker<'a> {
    type_data_by_name: &'a IndexMap<Name, TypeData>,
    subgraph_name: &'a str,
    /// Normalized key field-set member coordinates per entity type, used to
    /// classify fields as unconditionally provided.
    key_field_coords_by_type_name: &'a IndexMap<Name, IndexSet<String>>,
    errors: Vec<String>,
    conditional_fields: Vec<ConditionalField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldSetKind {
    Key,
    Provides,
    Requires,
}

impl<'a> FieldSetWalker<'a> {
    pub(crate) fn new(
        type_data_by_name: &'a IndexMap<Name, TypeData>,
        subgraph_name: &'a str,
        key_field_coords_by_type_name: &'a IndexMap<Name, IndexSet<String>>,
    ) -> Self {
        Self {
            type_data_by_name,
            subgraph_name,
            key_field_coords_by_type_name,
            errors: Vec::new(),
            conditional_fields: Vec::new(),
        }
    }

    /// Validates a `@key` field set against its entity parent. On success the
    /// normalized (canonically spaced) field-set string is returned; on
    /// failure the ordered sub-error list.
    pub(crate) fn validate_key(
        mut self,
        parent_type_name: &Name,
        raw: &str,
    ) -> Result<String, Vec<String>> {
        let selections = match parse_field_set(raw) {
            Ok(selections) => selections,
            Err(message) => {
                return Err(vec![format!(
                    " The field set \"{raw}\" is unparsable: {message}."
                )]);
            }
        };
        self.walk(parent_type_name, &selections, FieldSetKind::Key, raw, 0);
        if self.errors.is_empty() {
            Ok(render_field_set(&selections))
        } else {
            Err(self.errors)
        }
    }

    /// Validates a `@provides`/`@requires` field set rooted at
    /// `parent_type_name`, collecting the external status of every visited
    /// field for the caller's V1/V2 leniency decision.
    pub(crate) fn validate_conditional(
        mut self,
        parent_type_name: &Name,
        raw: &str,
        kind: FieldSetKind,
    ) -> Result<ConditionalFieldSetValidationResult, Vec<String>> {
        let selections = match parse_field_set(raw) {
            Ok(selections) => selections,
            Err(message) => {
                return Err(vec![format!(
                    " The field set \"{raw}\" is unparsable: {message}."
                )]);
            }
        };
        self.walk(parent_type_name, &selections, kind, raw, 0);
        if self.errors.is_empty() {
            Ok(ConditionalFieldSetValidationResult {
                normalized: render_field_set(&selections),
                conditional_fields: self.conditional_fields,
            })
        } else {
            Err(self.errors)
        }
    }

    fn walk(
        &mut self,
        parent_type_name: &Name,
        selections: &[Selection],
        kind: FieldSetKind,
        raw: &str,
        depth: usize,
    ) {
        if depth > MAXIMUM_TYPE_NESTING {
            self.errors.push(format!(
                " The field set \"{raw}\" exceeds the maximum depth of {MAXIMUM_TYPE_NESTING}."
            ));
            return;
        }
        let Some(parent_data) = self.type_data_by_name.get(parent_type_name) else {
            self.errors.push(format!(
                " The type \"{parent_type_name}\" is referenced in the field set \"{raw}\" but is not defined in the schema."
            ));
            return;
        };
        let mut seen_field_names: IndexSet<&str> = IndexSet::new();
        for selection in selections {
            match selection {
                Selection::InlineFragment {
                    type_condition,
                    selection_set,
                } => {
                    if kind == FieldSetKind::Key {
                        self.errors.push(format!(
                            " The field set \"{raw}\" is invalid: inline fragments are not supported within a \"@key\" field set."
                        ));
                        continue;
                    }
                    self.walk_inline_fragment(
                        parent_data,
                        type_condition,
                        selection_set,
                        kind,
                        raw,
                        depth,
                    );
                }
                Selection::Field {
                    name,
                    has_arguments,
                    selection_set,
                } => {
                    if matches!(parent_data, TypeData::Union(_)) {
                        self.errors.push(format!(
                            " The Union \"{parent_type_name}\" must be selected through an inline fragment on one of its members, but the field \"{name}\" is selected directly."
                        ));
                        continue;
                    }
                    if !seen_field_names.insert(name.as_str()) {
                        self.errors.push(format!(
                            " The field \"{}\" is selected more than once at the same depth of the field set \"{raw}\".",
                            field_coords_str(parent_type_name, name)
                        ));
                        continue;
                    }
                    self.walk_field(
                        parent_data,
                        name,
                        *has_arguments,
                        selection_set.as_deref(),
                        kind,
                        raw,
                        depth,
                    );
                }
            }
        }
    }

    fn walk_inline_fragment(
        &mut self,
        parent_data: &TypeData,
        type_condition: &str,
        selection_set: &[Selection],
        kind: FieldSetKind,
        raw: &str,
        depth: usize,
    ) {
        let Some(condition_data) = self.type_data_by_name.get(type_condition) else {
            self.errors.push(format!(
                " The inline fragment type condition \"{type_condition}\" in the field set \"{raw}\" is not a defined type."
            ));
            return;
        };
        if !condition_data.is_composite() {
            self.errors.push(format!(
                " The inline fragment type condition \"{type_condition}\" in the field set \"{raw}\" must be an Object, Interface, or Union, but is type {}.",
                condition_data.kind_string()
            ));
            return;
        }
        let is_valid_condition = match parent_data {
            TypeData::Object(object_data) => object_data.name == *condition_data.name(),
            TypeData::Interface(interface_data) => {
                interface_data.name == *condition_data.name()
                    || match condition_data {
                        TypeData::Object(o) => o.implements.contains(&interface_data.name),
                        TypeData::Interface(i) => i.implements.contains(&interface_data.name),
                        _ => false,
                    }
            }
            TypeData::Union(union_data) => {
                union_data.members.contains(condition_data.name())
            }
            _ => false,
        };
        if !is_valid_condition {
            self.errors.push(format!(
                " The inline fragment type condition \"{type_condition}\" in the field set \"{raw}\" is not a possible type of \"{}\".",
                parent_data.name()
            ));
            return;
        }
        let condition_name = condition_data.name().clone();
        self.walk(&condition_name, selection_set, kind, raw, depth + 1);
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_field(
        &mut self,
        parent_data: &TypeData,
        field_name: &str,
        has_arguments: bool,
        selection_set: Option<&[Selection]>,
        kind: FieldSetKind,
        raw: &str,
        depth: usize,
    ) {
        let parent_type_name = parent_data.name();
        let Some(field_data) = parent_data.fields().and_then(|fields| fields.get(field_name))
        else {
            self.errors.push(format!(
                " The field \"{}\" does not exist on the type \"{parent_type_name}\".",
                field_coords_str(parent_type_name, field_name)
            ));
            return;
        };
        let coords = field_data.coords();
        if has_arguments || !field_data.arguments.is_empty() {
            self.errors.push(format!(
                " The field \"{coords}\" must not define arguments to compose part of a field set."
            ));
            return;
        }
        if kind != FieldSetKind::Key {
            let is_external = field_data.is_external_in(self.subgraph_name);
            let is_unconditionally_provided = self
                .key_field_coords_by_type_name
                .get(parent_type_name)
                .is_some_and(|key_coords| key_coords.contains(&coords));
            self.conditional_fields.push(ConditionalField {
                coords: coords.clone(),
                is_external,
                is_unconditionally_provided,
            });
        }
        let named_type = field_data.ty.inner_named_type().clone();
        let Some(named_type_data) = self.type_data_by_name.get(&named_type) else {
            // Base scalars have no model entry; anything else is undefined.
            if crate::catalog::is_base_scalar(&named_type) {
                if selection_set.is_some() {
                    self.errors.push(format!(
                        " The field \"{coords}\" returns the leaf type \"{named_type}\" and cannot define a selection set."
                    ));
                }
                return;
            }
            self.errors.push(format!(
                " The type \"{named_type}\" returned by field \"{coords}\" is not defined in the schema."
            ));
            return;
        };
        if named_type_data.is_leaf() {
            if selection_set.is_some() {
                self.errors.push(format!(
                    " The field \"{coords}\" returns the leaf type \"{named_type}\" and cannot define a selection set."
                ));
            }
            return;
        }
        if kind == FieldSetKind::Key && !matches!(named_type_data, TypeData::Object(_)) {
            self.errors.push(format!(
                " The field \"{coords}\" returns the abstract type \"{named_type}\"; a \"@key\" field set must only select concrete fields."
            ));
            return;
        }
        let Some(selection_set) = selection_set else {
            self.errors.push(format!(
                " The field \"{coords}\" returns the composite type \"{named_type}\" and must define a selection set."
            ));
            return;
        };
        self.walk(&named_type, selection_set, kind, raw, depth + 1);
    }
}

fn field_coords_str(type_name: &Name, field_name: &str) -> String {
    format!("{type_name}.{field_name}")
}

/// Collects the top-level (and nested) field coordinates of an already
/// validated key field set, used to mark key fields as provided.
pub(crate) fn collect_key_field_coords(
    type_data_by_name: &IndexMap<Name, TypeData>,
    parent_type_name: &Name,
    selections: &[Selection],
    out: &mut IndexSet<String>,
) {
    let Some(parent_data) = type_data_by_name.get(parent_type_name) else {
        return;
    };
    for selection in selections {
        if let Selection::Field {
            name,
            selection_set,
            ..
        } = selection
        {
            let Some(field_data) = parent_data.fields().and_then(|fields| fields.get(name.as_str()))
            else {
                continue;
            };
            out.insert(field_coords(parent_type_name, &field_data.name));
            if let Some(nested) = selection_set {
                let named_type = field_data.ty.inner_named_type().clone();
                collect_key_field_coords(type_data_by_name, &named_type, nested, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ast::Type;
    use apollo_compiler::name;

    use super::*;
    use crate::model::FieldData;
    use crate::model::ObjectData;
    use crate::model::ScalarData;

    fn object(name: Name, fields: Vec<FieldData>) -> TypeData {
        TypeData::Object(ObjectData {
            name,
            description: None,
            directives: Default::default(),
            subgraph_names: IndexSet::from_iter(["subgraph-a".to_owned()]),
            extension_kind: Default::default(),
            is_inaccessible: false,
            fields: fields.into_iter().map(|f| (f.name.clone(), f)).collect(),
            implements: Default::default(),
            is_entity: false,
            is_root_type: false,
            interface_object_subgraph_names: Default::default(),
            shareable_subgraph_names: Default::default(),
        })
    }

    fn field(parent: Name, name: Name, ty: Type) -> FieldData {
        FieldData {
            name,
            parent_type_name: parent,
            ty,
            description: None,
            directives: Default::default(),
            arguments: Default::default(),
            subgraph_names: IndexSet::from_iter(["subgraph-a".to_owned()]),
            external_subgraph_names: Default::default(),
            shareable_subgraph_names: Default::default(),
            override_source_by_subgraph_name: Default::default(),
            is_inaccessible: false,
        }
    }

    fn user_model() -> IndexMap<Name, TypeData> {
        let mut types = IndexMap::new();
        types.insert(
            name!("User"),
            object(
                name!("User"),
                vec![
                    field(name!("User"), name!("id"), Type::NonNullNamed(name!("ID"))),
                    field(
                        name!("User"),
                        name!("organization"),
                        Type::Named(name!("Organization")),
                    ),
                ],
            ),
        );
        types.insert(
            name!("Organization"),
            object(
                name!("Organization"),
                vec![field(
                    name!("Organization"),
                    name!("id"),
                    Type::NonNullNamed(name!("ID")),
                )],
            ),
        );
        types.insert(
            name!("CustomScalar"),
            TypeData::Scalar(ScalarData {
                name: name!("CustomScalar"),
                description: None,
                directives: Default::default(),
                subgraph_names: Default::default(),
                extension_kind: Default::default(),
                is_inaccessible: false,
            }),
        );
        types
    }

    fn walker<'a>(
        types: &'a IndexMap<Name, TypeData>,
        key_coords: &'a IndexMap<Name, IndexSet<String>>,
    ) -> FieldSetWalker<'a> {
        FieldSetWalker::new(types, "subgraph-a", key_coords)
    }

    #[test]
    fn parses_nested_selections_with_optional_commas() {
        let selections = parse_field_set("id, organization { id }").unwrap();
        assert_eq!(selections.len(), 2);
        assert_eq!(render_field_set(&selections), "id organization { id }");
    }

    #[test]
    fn rejects_aliases() {
        let error = parse_field_set("renamed: id").unwrap_err();
        assert!(error.contains("aliases are not supported"), "{error}");
    }

    #[test]
    fn validates_a_nested_key_field_set() {
        let types = user_model();
        let key_coords = IndexMap::new();
        let normalized = walker(&types, &key_coords)
            .validate_key(&name!("User"), "id   organization {  id }")
            .unwrap();
        assert_eq!(normalized, "id organization { id }");
    }

    #[test]
    fn key_rejects_unknown_fields() {
        let types = user_model();
        let key_coords = IndexMap::new();
        let errors = walker(&types, &key_coords)
            .validate_key(&name!("User"), "uuid")
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("The field \"User.uuid\" does not exist"));
    }

    #[test]
    fn key_rejects_fields_with_arguments() {
        let mut types = user_model();
        let TypeData::Object(user) = types.get_mut("User").unwrap() else {
            unreachable!();
        };
        let mut arg_field = field(name!("User"), name!("filtered"), Type::Named(name!("ID")));
        arg_field.arguments.insert(
            name!("limit"),
            crate::model::InputValueData {
                name: name!("limit"),
                kind: crate::model::InputValueKind::Argument,
                ty: Type::Named(name!("Int")),
                description: None,
                directives: Default::default(),
                default_value: None,
                subgraph_names: Default::default(),
                required_subgraph_names: Default::default(),
                is_inaccessible: false,
            },
        );
        user.fields.insert(name!("filtered"), arg_field);
        let key_coords = IndexMap::new();
        let errors = walker(&types, &key_coords)
            .validate_key(&name!("User"), "filtered")
            .unwrap_err();
        assert!(errors[0].contains("must not define arguments"));
    }

    #[test]
    fn key_rejects_composite_fields_without_selection_sets() {
        let types = user_model();
        let key_coords = IndexMap::new();
        let errors = walker(&types, &key_coords)
            .validate_key(&name!("User"), "organization")
            .unwrap_err();
        assert!(errors[0].contains("must define a selection set"));
    }

    #[test]
    fn key_rejects_duplicate_fields_at_one_depth() {
        let types = user_model();
        let key_coords = IndexMap::new();
        let errors = walker(&types, &key_coords)
            .validate_key(&name!("User"), "id id")
            .unwrap_err();
        assert!(errors[0].contains("selected more than once"));
    }

    #[test]
    fn key_rejects_inline_fragments() {
        let types = user_model();
        let key_coords = IndexMap::new();
        let errors = walker(&types, &key_coords)
            .validate_key(&name!("User"), "... on User { id }")
            .unwrap_err();
        assert!(errors[0].contains("inline fragments are not supported"));
    }

    #[test]
    fn conditional_walk_records_external_status() {
        let mut types = user_model();
        let TypeData::Object(user) = types.get_mut("User").unwrap() else {
            unreachable!();
        };
        user.fields
            .get_mut("id")
            .unwrap()
            .external_subgraph_names
            .insert("subgraph-a".to_owned());
        let mut key_coords: IndexMap<Name, IndexSet<String>> = IndexMap::new();
        key_coords.insert(name!("User"), IndexSet::from_iter(["User.id".to_owned()]));
        let result = walker(&types, &key_coords)
            .validate_conditional(&name!("User"), "id", FieldSetKind::Requires)
            .unwrap();
        assert_eq!(result.normalized, "id");
        assert_eq!(result.conditional_fields.len(), 1);
        assert!(result.conditional_fields[0].is_external);
        assert!(result.conditional_fields[0].is_unconditionally_provided);
    }
}

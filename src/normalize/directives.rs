//! Directive occurrence validation against the catalog.
//!
//! Every directive application is checked once: the location must be legal,
//! non-repeatable directives must not repeat, required arguments must be
//! present, no unexpected arguments may appear, and argument values must
//! type-check against the declared argument type. Problems are collected as
//! sub-error messages and reported as one `InvalidDirective` error per
//! occurrence, in the order the occurrences appear.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::DirectiveLocation;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::catalog;
use crate::catalog::ArgumentSpec;
use crate::catalog::DIRECTIVE_CATALOG;
use crate::error::CompositionError;
use crate::model::DirectiveMap;

pub(crate) fn location_string(location: DirectiveLocation) -> &'static str {
    match location {
        DirectiveLocation::Schema => "SCHEMA",
        DirectiveLocation::Scalar => "SCALAR",
        DirectiveLocation::Object => "OBJECT",
        DirectiveLocation::FieldDefinition => "FIELD_DEFINITION",
        DirectiveLocation::ArgumentDefinition => "ARGUMENT_DEFINITION",
        DirectiveLocation::Interface => "INTERFACE",
        DirectiveLocation::Union => "UNION",
        DirectiveLocation::Enum => "ENUM",
        DirectiveLocation::EnumValue => "ENUM_VALUE",
        DirectiveLocation::InputObject => "INPUT_OBJECT",
        DirectiveLocation::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
        _ => "EXECUTABLE",
    }
}

/// Validates and collects the directives applied to one schema element.
/// Custom directives (defined in the subgraph document itself) are validated
/// against their own definitions; unknown names are errors.
pub(crate) fn extract_directives<'a>(
    directives: impl Iterator<Item = &'a Node<ast::Directive>>,
    location: DirectiveLocation,
    directive_coords: &str,
    custom_definitions: &IndexMap<Name, Node<ast::DirectiveDefinition>>,
    errors: &mut Vec<CompositionError>,
) -> DirectiveMap {
    let mut directive_map: DirectiveMap = IndexMap::new();
    for directive in directives {
        directive_map
            .entry(directive.name.clone())
            .or_default()
            .push(directive.clone());
    }
    for (directive_name, occurrences) in &directive_map {
        if let Some(spec) = DIRECTIVE_CATALOG.get(directive_name) {
            if !spec.repeatable && occurrences.len() > 1 {
                errors.push(CompositionError::InvalidDirective {
                    directive_name: directive_name.to_string(),
                    directive_coords: directive_coords.to_owned(),
                    error_messages: vec![format!(
                        " The definition for the directive \"@{directive_name}\" does not define it as repeatable, but it is declared more than once on these coordinates."
                    )],
                });
            }
            for occurrence in occurrences {
                let mut error_messages = Vec::new();
                if !spec.locations.contains(&location) {
                    error_messages.push(format!(
                        " The definition for \"@{directive_name}\" does not define \"{}\" as a valid location.",
                        location_string(location)
                    ));
                }
                validate_arguments(occurrence, &spec.arguments, &mut error_messages);
                if !error_messages.is_empty() {
                    errors.push(CompositionError::InvalidDirective {
                        directive_name: directive_name.to_string(),
                        directive_coords: directive_coords.to_owned(),
                        error_messages,
                    });
                }
            }
        } else if let Some(definition) = custom_definitions.get(directive_name) {
            if !definition.repeatable && occurrences.len() > 1 {
                errors.push(CompositionError::InvalidDirective {
                    directive_name: directive_name.to_string(),
                    directive_coords: directive_coords.to_owned(),
                    error_messages: vec![format!(
                        " The definition for the directive \"@{directive_name}\" does not define it as repeatable, but it is declared more than once on these coordinates."
                    )],
                });
            }
            for occurrence in occurrences {
                let mut error_messages = Vec::new();
                if !definition.locations.contains(&location) {
                    error_messages.push(format!(
                        " The definition for \"@{directive_name}\" does not define \"{}\" as a valid location.",
                        location_string(location)
                    ));
                }
                validate_custom_arguments(occurrence, definition, &mut error_messages);
                if !error_messages.is_empty() {
                    errors.push(CompositionError::InvalidDirective {
                        directive_name: directive_name.to_string(),
                        directive_coords: directive_coords.to_owned(),
                        error_messages,
                    });
                }
            }
        } else {
            errors.push(CompositionError::UndefinedDirective {
                directive_name: directive_name.to_string(),
                directive_coords: directive_coords.to_owned(),
            });
        }
    }
    directive_map
}

fn validate_arguments(
    directive: &ast::Directive,
    argument_specs: &[ArgumentSpec],
    error_messages: &mut Vec<String>,
) {
    let mut seen: IndexSet<&Name> = IndexSet::new();
    let mut duplicated: IndexSet<String> = IndexSet::new();
    for argument in &directive.arguments {
        if !seen.insert(&argument.name) {
            duplicated.insert(argument.name.to_string());
            continue;
        }
        let Some(spec) = argument_specs.iter().find(|spec| spec.name == argument.name) else {
            error_messages.push(format!(
                " The argument \"{}\" is not defined on the directive.",
                argument.name
            ));
            continue;
        };
        if !value_matches_type(&argument.value, &spec.ty) {
            error_messages.push(format!(
                " The value \"{}\" provided to argument \"{}\" is not a valid \"{}\" type.",
                argument.value, argument.name, spec.ty
            ));
        }
    }
    if !duplicated.is_empty() {
        error_messages.push(format!(
            " The following argument{} defined more than once: {}",
            if duplicated.len() > 1 { "s are" } else { " is" },
            crate::error::quoted_names_list(&duplicated)
        ));
    }
    let undefined_required: Vec<&ArgumentSpec> = argument_specs
        .iter()
        .filter(|spec| spec.is_required() && !seen.contains(&spec.name))
        .collect();
    if !undefined_required.is_empty() {
        error_messages.push(format!(
            " The following required argument{} not defined: {}",
            if undefined_required.len() > 1 { "s are" } else { " is" },
            crate::error::quoted_names_list(undefined_required.iter().map(|s| s.name.as_str()))
        ));
    }
}

fn validate_custom_arguments(
    directive: &ast::Directive,
    definition: &ast::DirectiveDefinition,
    error_messages: &mut Vec<String>,
) {
    let mut seen: IndexSet<&Name> = IndexSet::new();
    for argument in &directive.arguments {
        if !seen.insert(&argument.name) {
            error_messages.push(format!(
                " The following argument is defined more than once: \"{}\"",
                argument.name
            ));
            continue;
        }
        if !definition
            .arguments
            .iter()
            .any(|input_value| input_value.name == argument.name)
        {
            error_messages.push(format!(
                " The argument \"{}\" is not defined on the directive.",
                argument.name
            ));
        }
    }
    for input_value in &definition.arguments {
        let is_required = input_value.is_required() && input_value.default_value.is_none();
        if is_required && !seen.contains(&input_value.name) {
            error_messages.push(format!(
                " The following required argument is not defined: \"{}\"",
                input_value.name
            ));
        }
    }
}

/// Shallow value/type conformance for catalogued directive arguments.
/// Input-object-shaped arguments (stream configurations, filter conditions)
/// are accepted as objects here and validated in depth by their dedicated
/// validators.
pub(crate) fn value_matches_type(value: &Value, ty: &Type) -> bool {
    match ty {
        Type::NonNullNamed(name) => !matches!(value, Value::Null) && named_value_matches(value, name),
        Type::Named(name) => {
            matches!(value, Value::Null) || named_value_matches(value, name)
        }
        Type::NonNullList(inner) => match value {
            Value::Null => false,
            Value::List(items) => items.iter().all(|item| value_matches_type(item, inner)),
            // A single value coerces to a list of one.
            other => value_matches_type(other, inner),
        },
        Type::List(inner) => match value {
            Value::Null => true,
            Value::List(items) => items.iter().all(|item| value_matches_type(item, inner)),
            other => value_matches_type(other, inner),
        },
    }
}

fn named_value_matches(value: &Value, type_name: &Name) -> bool {
    match type_name.as_str() {
        "String" | "ID" => matches!(value, Value::String(_)),
        "Boolean" => matches!(value, Value::Boolean(_)),
        "Int" => matches!(value, Value::Int(_)),
        "Float" => matches!(value, Value::Float(_) | Value::Int(_)),
        // Embedded-grammar scalars: a string whose content is validated by
        // the dedicated field-set/scope validators.
        "openfed__FieldSet" | "openfed__Scope" => matches!(value, Value::String(_)),
        n if n == catalog::EDFS_NATS_STREAM_CONFIGURATION.as_str() => {
            matches!(value, Value::Object(_))
        }
        "openfed__SubscriptionFilterCondition" => matches!(value, Value::Object(_)),
        // Custom scalar or enum from the subgraph document: accepted here.
        _ => !matches!(value, Value::Variable(_)),
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::Schema;

    use super::*;

    fn directives_of(sdl: &str, type_name: &str) -> Vec<Node<ast::Directive>> {
        let schema = Schema::parse(sdl, "test.graphql").unwrap_or_else(|e| e.partial);
        schema
            .types
            .get(type_name)
            .unwrap()
            .directives()
            .iter()
            .map(|component| component.node.clone())
            .collect()
    }

    #[test]
    fn accepts_a_valid_key_application() {
        let directives = directives_of(
            r#"type User @key(fields: "id") { id: ID! } type Query { a: Int }"#,
            "User",
        );
        let mut errors = Vec::new();
        let map = extract_directives(
            directives.iter(),
            DirectiveLocation::Object,
            "User",
            &IndexMap::new(),
            &mut errors,
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(map.get("key").map(Vec::len), Some(1));
    }

    #[test]
    fn rejects_a_key_without_its_required_fields_argument() {
        let directives = directives_of(
            r#"type User @key(resolvable: false) { id: ID! } type Query { a: Int }"#,
            "User",
        );
        let mut errors = Vec::new();
        extract_directives(
            directives.iter(),
            DirectiveLocation::Object,
            "User",
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert!(
            errors[0]
                .to_string()
                .contains("The following required argument is not defined: \"fields\""),
            "{}",
            errors[0]
        );
    }

    #[test]
    fn rejects_an_unknown_location() {
        let directives = directives_of(
            r#"scalar When @override(from: "somewhere") type Query { a: Int }"#,
            "When",
        );
        let mut errors = Vec::new();
        extract_directives(
            directives.iter(),
            DirectiveLocation::Scalar,
            "When",
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert!(
            errors[0]
                .to_string()
                .contains("does not define \"SCALAR\" as a valid location"),
            "{}",
            errors[0]
        );
    }

    #[test]
    fn rejects_mistyped_argument_values() {
        let directives = directives_of(
            r#"type User @key(fields: 5) { id: ID! } type Query { a: Int }"#,
            "User",
        );
        let mut errors = Vec::new();
        extract_directives(
            directives.iter(),
            DirectiveLocation::Object,
            "User",
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert!(
            errors[0]
                .to_string()
                .contains("is not a valid \"openfed__FieldSet!\" type"),
            "{}",
            errors[0]
        );
    }

    #[test]
    fn rejects_repeating_a_non_repeatable_directive() {
        let directives = directives_of(
            r#"type User @interfaceObject @interfaceObject @key(fields: "id") { id: ID! } type Query { a: Int }"#,
            "User",
        );
        let mut errors = Vec::new();
        extract_directives(
            directives.iter(),
            DirectiveLocation::Object,
            "User",
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert!(
            errors[0]
                .to_string()
                .contains("does not define it as repeatable"),
            "{}",
            errors[0]
        );
    }

    #[test]
    fn unknown_directives_without_definitions_are_errors() {
        let directives = directives_of(
            r#"type User @mystery { id: ID! } type Query { a: Int }"#,
            "User",
        );
        let mut errors = Vec::new();
        extract_directives(
            directives.iter(),
            DirectiveLocation::Object,
            "User",
            &IndexMap::new(),
            &mut errors,
        );
        assert_eq!(
            errors[0],
            CompositionError::UndefinedDirective {
                directive_name: "mystery".to_owned(),
                directive_coords: "User".to_owned(),
            }
        );
    }
}

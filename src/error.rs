use std::fmt::Display;
use std::fmt::Formatter;

use itertools::Itertools;

/// Returns an internal `CompositionError` with the given formatted message.
///
/// Internal errors are defects: they indicate a broken invariant in the
/// composition engine itself, never a problem with the user's subgraphs.
#[macro_export]
macro_rules! internal_error {
    ( $( $arg:tt )+ ) => {
        $crate::error::CompositionError::Internal { message: format!( $( $arg )+ ) }
    }
}

/// Returns `Err` with an internal `CompositionError` from the enclosing function.
#[macro_export]
macro_rules! bail {
    ( $( $arg:tt )+ ) => {
        return Err($crate::internal_error!( $( $arg )+ ).into())
    }
}

pub(crate) fn quoted_names_list<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> String {
    format!(
        "\"{}\"",
        names.into_iter().map(|n| n.as_ref().to_owned()).join("\", \"")
    )
}

fn plural(count: usize) -> &'static str {
    if count > 1 { "s" } else { "" }
}

fn reasons(count: usize) -> &'static str {
    if count > 1 { "reasons:" } else { "reason:" }
}

/// A single composition diagnostic that blocks the production of a federated
/// graph. Variants are grouped by the phase that raises them: input
/// validation, subgraph normalization, federation (merge), accessibility,
/// and resolvability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    // Input errors
    #[error("At least one subgraph is required for federation.")]
    MinimumSubgraphRequirement,
    #[error(
        "Subgraphs to be federated must each have a unique, non-empty name.\n The following subgraph names are not unique:\n  {}",
        quoted_names_list(.duplicate_names)
    )]
    InvalidSubgraphNames { duplicate_names: Vec<String> },
    #[error("[{subgraph_name}] {error}")]
    Subgraph {
        subgraph_name: String,
        error: Box<CompositionError>,
    },
    // Syntax errors
    #[error("The subgraph SDL could not be parsed: {message}")]
    SubgraphSdlParseFailure { message: String },
    // Normalization errors
    #[error(
        "Expected the response type \"{type_name}\" for operation \"{operation_type}\" to be type Object but received \"{actual_kind}\"."
    )]
    InvalidOperationTypeDefinition {
        operation_type: &'static str,
        type_name: String,
        actual_kind: &'static str,
    },
    #[error(" The type \"{type_name}\" was referenced in the schema, but it was never defined.")]
    UndefinedType { type_name: String },
    #[error(
        "The directive \"@{directive_name}\" declared on coordinates \"{directive_coords}\" is not defined in the schema."
    )]
    UndefinedDirective {
        directive_name: String,
        directive_coords: String,
    },
    #[error(
        "The directive \"@{directive_name}\" declared on coordinates \"{directive_coords}\" is invalid for the following {}\n{}",
        reasons(.error_messages.len()),
        .error_messages.join("\n")
    )]
    InvalidDirective {
        directive_name: String,
        directive_coords: String,
        error_messages: Vec<String>,
    },
    #[error(
        "The {kind} \"{type_name}\" is an extension, but no base {kind} definition of \"{type_name}\" is defined in any subgraph."
    )]
    NoBaseDefinitionForExtension { kind: &'static str, type_name: String },
    #[error("The {kind} \"{type_name}\" must define at least one field definition.")]
    NoFieldDefinitions { kind: &'static str, type_name: String },
    #[error("The Input Object \"{type_name}\" must define at least one Input field definition.")]
    NoInputValueDefinitions { type_name: String },
    #[error("The Union \"{type_name}\" must define at least one Union member.")]
    NoDefinedUnionMembers { type_name: String },
    #[error("The Enum \"{type_name}\" must define at least one Enum value.")]
    NoDefinedEnumValues { type_name: String },
    #[error("The type \"{type_name}\" cannot implement itself.")]
    SelfImplementation { type_name: String },
    #[error(
        "The {kind} \"{type_name}\" can only implement Interfaces, but \"{implemented_type_name}\" is type {implemented_kind}."
    )]
    InvalidImplementedType {
        kind: &'static str,
        type_name: String,
        implemented_type_name: String,
        implemented_kind: &'static str,
    },
    #[error(
        "The Interface \"{type_name}\" is invalid because the following field definition{} declared \"@external\":\n {}\nInterface field definitions must never be declared \"@external\".",
        if .field_names.len() > 1 { "s are" } else { " is" },
        quoted_names_list(.field_names)
    )]
    ExternalInterfaceFields { type_name: String, field_names: Vec<String> },
    #[error(
        "The field \"{field_coords}\" is invalid because the \"@external\" directive must only be declared on field definitions of entities or fields referenced by a \"@provides\" or \"@requires\" field set."
    )]
    InvalidExternalDirective { field_coords: String },
    #[error(
        "All instances of the field{} {} on type \"{type_name}\" are declared \"@external\", so the field{} can never be resolved.",
        plural(.field_names.len()),
        quoted_names_list(.field_names),
        plural(.field_names.len())
    )]
    AllExternalFieldInstances { type_name: String, field_names: Vec<String> },
    #[error(
        "A \"@key\" directive declared on the {kind} \"{type_name}\" is invalid for the following {}\n{}",
        reasons(.error_messages.len()),
        .error_messages.join("\n")
    )]
    InvalidKeyDirective {
        kind: &'static str,
        type_name: String,
        error_messages: Vec<String>,
    },
    #[error(
        "A \"@{directive_name}\" directive is invalid for the following {}\n{}",
        reasons(.error_messages.len()),
        .error_messages.join("\n")
    )]
    InvalidProvidesOrRequiresDirectives {
        directive_name: &'static str,
        error_messages: Vec<String>,
    },
    #[error(
        "The field \"{field_coords}\" in subgraph \"{subgraph_name}\" includes the conditional field \"{conditional_field_coords}\" in a \"@{directive_name}\" field set, but \"{conditional_field_coords}\" is not declared \"@external\"."
    )]
    NonExternalConditionalField {
        field_coords: String,
        subgraph_name: String,
        conditional_field_coords: String,
        directive_name: &'static str,
    },
    #[error(
        "The \"@openfed__subscriptionFilter\" directive must only be defined on a subscription root field, but it was defined on the path \"{path}\"."
    )]
    InvalidSubscriptionFilterLocation { path: String },
    #[error(
        "The \"@openfed__subscriptionFilter\" directive defined on path \"{field_coords}\" is invalid for the following {}\n{}",
        reasons(.error_messages.len()),
        .error_messages.join("\n")
    )]
    InvalidSubscriptionFilterDirective {
        field_coords: String,
        error_messages: Vec<String>,
    },
    #[error(
        "The \"@{directive_name}\" directive declared on path \"{field_coords}\" is invalid for the following {}\n{}",
        reasons(.error_messages.len()),
        .error_messages.join("\n")
    )]
    InvalidEventDirective {
        directive_name: String,
        field_coords: String,
        error_messages: Vec<String>,
    },
    #[error(
        " The type defined at path \"{path}\" has more than {maximum} layers of nesting, or there is a cyclical error."
    )]
    MaximumTypeNestingExceeded { path: String, maximum: usize },
    #[error(
        "The field coordinates {} attempt to apply more than {maximum} combined \"OR\" scopes. If you require more, please contact support.",
        quoted_names_list(.directive_coords)
    )]
    OrScopesLimitExceeded {
        maximum: usize,
        directive_coords: Vec<String>,
    },
    // Merge errors
    #[error(
        "Expected the type \"{type_name}\" to be kind {expected_kind} but received \"{actual_kind}\"."
    )]
    IncompatibleParentKindMerge {
        type_name: String,
        expected_kind: &'static str,
        actual_kind: &'static str,
    },
    #[error(
        "Incompatible types when merging two instances of {kind} \"{coords}\":\n Expected type \"{expected_type}\" but received \"{actual_type}\"."
    )]
    IncompatibleMergedTypes {
        kind: &'static str,
        coords: String,
        expected_type: String,
        actual_type: String,
    },
    #[error(
        "Enum \"{type_name}\" was used as both an input and output but was inconsistently defined across inclusive subgraphs."
    )]
    IncompatibleSharedEnum { type_name: String },
    #[error(
        "Expected the {kind} defined on path \"{coords}\" to define the default value \"{expected_default_value}\".\nHowever, the default value \"{actual_default_value}\" is also defined.\nIf an instance defines a default value, that default value must be consistently defined across all subgraphs."
    )]
    IncompatibleInputValueDefaultValues {
        kind: &'static str,
        coords: String,
        expected_default_value: String,
        actual_default_value: String,
    },
    #[error(
        "The {kind} \"{coords}\" is required in the following subgraph{}: {}\nHowever, it is not defined in the following subgraph{}: {}\nIf an instance of the {kind} is required, it must be defined with the same name in every subgraph that defines its parent.",
        plural(.required_subgraph_names.len()),
        quoted_names_list(.required_subgraph_names),
        plural(.missing_subgraph_names.len()),
        quoted_names_list(.missing_subgraph_names)
    )]
    InvalidRequiredInputValue {
        kind: &'static str,
        coords: String,
        required_subgraph_names: Vec<String>,
        missing_subgraph_names: Vec<String>,
    },
    #[error(
        "The Object \"{type_name}\" defines the same fields in multiple subgraphs without the \"@shareable\" directive:{}",
        .error_messages.join("\n")
    )]
    InvalidFieldShareability {
        type_name: String,
        error_messages: Vec<String>,
    },
    #[error(
        "The field \"{field_coords}\" is overridden in multiple subgraphs: {}\nAn instance of a field must only be overridden by at most one \"@override\" directive.",
        quoted_names_list(.subgraph_names)
    )]
    DuplicateOverriddenField {
        field_coords: String,
        subgraph_names: Vec<String>,
    },
    #[error(
        "The \"@override\" directive declared on \"{field_coords}\" is invalid because the source and target subgraph \"{subgraph_name}\" are equivalent."
    )]
    EquivalentSourceAndTargetOverride {
        subgraph_name: String,
        field_coords: String,
    },
    #[error(
        "The {kind} \"{type_name}\" is invalid for the following {}\n{}",
        reasons(.error_messages.len()),
        .error_messages.join("\n")
    )]
    InvalidInterfaceImplementation {
        kind: &'static str,
        type_name: String,
        error_messages: Vec<String>,
    },
    #[error(
        "The Union \"{type_name}\" is invalid because the following member{} not type Object:\n {}",
        if .invalid_members.len() > 1 { "s are" } else { " is" },
        quoted_names_list(.invalid_members)
    )]
    InvalidUnionMemberType {
        type_name: String,
        invalid_members: Vec<String>,
    },
    #[error(
        "The entity Interface \"{interface_name}\" is declared \"@interfaceObject\", but no subgraph defines the entity Interface itself. Concrete type{}: {}",
        plural(.concrete_type_names.len().max(1)),
        quoted_names_list(.concrete_type_names)
    )]
    UndefinedEntityInterfaceImplementations {
        interface_name: String,
        concrete_type_names: Vec<String>,
    },
    // Accessibility errors
    #[error("The federated graph does not define a query root type.")]
    NoQueryRootType,
    #[error(
        "The {kind} \"{type_name}\" is declared \"@inaccessible\"; however, it is still referenced on the following accessible coordinates:\n {}\nAn inaccessible type must only be referenced on coordinates that are also inaccessible.",
        quoted_names_list(.coordinates)
    )]
    InvalidReferencesOfInaccessibleType {
        kind: &'static str,
        type_name: String,
        coordinates: Vec<String>,
    },
    #[error(
        "The {kind} \"{type_name}\" is accessible, but all of its child definitions are declared \"@inaccessible\".\nAt least one child definition must be accessible, or the {kind} itself must also be declared \"@inaccessible\"."
    )]
    AllChildDefinitionsAreInaccessible { kind: &'static str, type_name: String },
    #[error(
        "The required {kind} \"{coords}\" is declared \"@inaccessible\", but its parent \"{parent_coords}\" is accessible.\nA required input value of an accessible parent must itself be accessible."
    )]
    InaccessibleRequiredInputValue {
        kind: &'static str,
        coords: String,
        parent_coords: String,
    },
    // Resolvability errors
    #[error(
        "The field \"{field_coords}\" is unresolvable at the following path:\n{path}\nThis is because:\n - {}",
        .reasons.join("\n - ")
    )]
    UnresolvableField {
        field_coords: String,
        path: String,
        reasons: Vec<String>,
    },
    // Defects
    #[error("Fatal: {message}")]
    Internal { message: String },
}

impl CompositionError {
    /// Wraps a normalization error with the name of the subgraph it occurred in.
    pub(crate) fn in_subgraph(self, subgraph_name: &str) -> Self {
        Self::Subgraph {
            subgraph_name: subgraph_name.to_owned(),
            error: Box::new(self),
        }
    }
}

/// An ordered collection of composition errors, accumulated across phases so
/// the caller receives the complete report rather than the first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionErrors {
    pub errors: Vec<CompositionError>,
}

impl CompositionErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn push(&mut self, error: CompositionError) {
        self.errors.push(error);
    }
}

impl Display for CompositionErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "The following errors occurred:")?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl From<CompositionError> for CompositionErrors {
    fn from(error: CompositionError) -> Self {
        Self { errors: vec![error] }
    }
}

impl From<Vec<CompositionError>> for CompositionErrors {
    fn from(errors: Vec<CompositionError>) -> Self {
        Self { errors }
    }
}

impl IntoIterator for CompositionErrors {
    type Item = CompositionError;
    type IntoIter = std::vec::IntoIter<CompositionError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// A non-fatal composition finding. Warnings never block composition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionWarning {
    #[error("[{subgraph_name}] {warning}")]
    Subgraph {
        subgraph_name: String,
        warning: Box<CompositionWarning>,
    },
    #[error(
        "The \"@override\" directive declared on \"{field_coords}\" targets the subgraph \"{target_subgraph_name}\", which does not exist. The directive has no effect."
    )]
    InvalidOverrideTarget {
        field_coords: String,
        target_subgraph_name: String,
    },
    #[error(
        "The \"@external\" directive declared on \"{field_coords}\" is redundant: key field definitions of a base type are always provided by their own subgraph."
    )]
    RedundantExternal { field_coords: String },
    #[error(
        "The field \"{field_coords}\" is already provided by subgraph \"{subgraph_name}\"; the \"@provides\" declaration on \"{providing_field_coords}\" is unnecessary."
    )]
    FieldAlreadyProvided {
        field_coords: String,
        subgraph_name: String,
        providing_field_coords: String,
    },
    #[error(
        "The field \"{field_coords}\" includes the conditional field \"{conditional_field_coords}\" in a \"@{directive_name}\" field set, but \"{conditional_field_coords}\" is not declared \"@external\". This is supported for version-one subgraphs, but consider declaring the field \"@external\"."
    )]
    NonExternalConditionalField {
        field_coords: String,
        conditional_field_coords: String,
        directive_name: &'static str,
    },
    #[error(
        "The \"@requires\" directive declared on \"{field_coords}\" has no effect because its parent type is not an entity in this subgraph."
    )]
    RequiresOnNonEntityField { field_coords: String },
    #[error(
        "The argument \"{argument_coords}\" is not defined in the following subgraph{}: {}\nBecause the argument is optional everywhere it is defined, it has been removed from the federated graph.",
        if .missing_subgraph_names.len() > 1 { "s" } else { "" },
        quoted_names_list(.missing_subgraph_names)
    )]
    InconsistentArgument {
        argument_coords: String,
        missing_subgraph_names: Vec<String>,
    },
    #[error(
        "The Input field \"{field_coords}\" is not defined in the following subgraph{}: {}\nBecause the Input field is optional everywhere it is defined, it has been removed from the federated graph.",
        if .missing_subgraph_names.len() > 1 { "s" } else { "" },
        quoted_names_list(.missing_subgraph_names)
    )]
    InconsistentInputField {
        field_coords: String,
        missing_subgraph_names: Vec<String>,
    },
}

impl CompositionWarning {
    pub(crate) fn in_subgraph(self, subgraph_name: &str) -> Self {
        Self::Subgraph {
            subgraph_name: subgraph_name.to_owned(),
            warning: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_errors_display_each_on_their_own_line() {
        let mut errors = CompositionErrors::default();
        errors.push(CompositionError::UndefinedType {
            type_name: "User".to_owned(),
        });
        errors.push(CompositionError::NoQueryRootType);
        assert_eq!(
            errors.to_string(),
            "The following errors occurred:\n  -  The type \"User\" was referenced in the schema, but it was never defined.\n  - The federated graph does not define a query root type."
        );
        assert_eq!(errors.len(), 2);
        assert!(!errors.is_empty());
    }

    #[test]
    fn subgraph_errors_are_prefixed_with_the_subgraph_name() {
        let error = CompositionError::UndefinedType {
            type_name: "User".to_owned(),
        }
        .in_subgraph("products");
        assert_eq!(
            error.to_string(),
            "[products]  The type \"User\" was referenced in the schema, but it was never defined."
        );
    }

    #[test]
    fn incompatible_merged_types_names_the_field_coordinate() {
        let error = CompositionError::IncompatibleMergedTypes {
            kind: "field",
            coords: "User.age".to_owned(),
            expected_type: "String".to_owned(),
            actual_type: "Int".to_owned(),
        };
        assert_eq!(
            error.to_string(),
            "Incompatible types when merging two instances of field \"User.age\":\n Expected type \"String\" but received \"Int\"."
        );
    }

    #[test]
    fn directive_error_sub_messages_are_listed_in_order() {
        let error = CompositionError::InvalidDirective {
            directive_name: "key".to_owned(),
            directive_coords: "User".to_owned(),
            error_messages: vec![
                " first sub-error".to_owned(),
                " second sub-error".to_owned(),
            ],
        };
        let rendered = error.to_string();
        assert!(rendered.contains("for the following reasons:\n first sub-error\n second sub-error"));
    }
}

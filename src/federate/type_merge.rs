//! Cross-subgraph type merging.
//!
//! The first subgraph's definition of a type name becomes the working target;
//! each later definition is merged into it in place. Return types are merged
//! by walking both reference trees in lock step with single-divergence
//! tracking: across any pair of definitions, at most one side may diverge
//! toward stricter (non-null) typing before the other also diverges.

use apollo_compiler::ast::Type;

use crate::catalog::MAXIMUM_TYPE_NESTING;
use crate::error::CompositionError;
use crate::error::CompositionWarning;
use crate::model::EnumMergeMode;
use crate::model::InputValueData;
use crate::model::TypeData;
use crate::model::field_coords;

/// Which side of a merged pair wins when non-null wrapping diverges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DivergencePreference {
    /// Output positions: the non-null side wins.
    MostRestrictive,
    /// Input positions: the nullable side wins.
    LeastRestrictive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeMergeFailure {
    Incompatible,
    DepthExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Target,
    Incoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    List { non_null: bool },
}

/// Merges two type references level by level. `Err(Incompatible)` means the
/// references disagree on shape or name, or diverged toward strictness on
/// both sides.
pub(crate) fn merge_type_references(
    target: &Type,
    incoming: &Type,
    preference: DivergencePreference,
) -> Result<Type, TypeMergeFailure> {
    let mut wrappers: Vec<Wrapper> = Vec::new();
    let mut diverged: Option<Side> = None;
    let mut diverge = |diverged: &mut Option<Side>, side: Side| -> Result<(), TypeMergeFailure> {
        match diverged {
            Some(existing) if *existing != side => Err(TypeMergeFailure::Incompatible),
            _ => {
                *diverged = Some(side);
                Ok(())
            }
        }
    };
    let mut current_target = target;
    let mut current_incoming = incoming;
    for _ in 0..=MAXIMUM_TYPE_NESTING {
        let (named, non_null) = match (current_target, current_incoming) {
            (Type::NonNullNamed(a), Type::NonNullNamed(b)) if a == b => (a, true),
            (Type::Named(a), Type::Named(b)) if a == b => (a, false),
            (Type::NonNullNamed(a), Type::Named(b)) if a == b => {
                diverge(&mut diverged, Side::Target)?;
                (a, preference == DivergencePreference::MostRestrictive)
            }
            (Type::Named(a), Type::NonNullNamed(b)) if a == b => {
                diverge(&mut diverged, Side::Incoming)?;
                (a, preference == DivergencePreference::MostRestrictive)
            }
            (Type::NonNullList(a), Type::NonNullList(b)) => {
                wrappers.push(Wrapper::List { non_null: true });
                current_target = a;
                current_incoming = b;
                continue;
            }
            (Type::List(a), Type::List(b)) => {
                wrappers.push(Wrapper::List { non_null: false });
                current_target = a;
                current_incoming = b;
                continue;
            }
            (Type::NonNullList(a), Type::List(b)) => {
                diverge(&mut diverged, Side::Target)?;
                wrappers.push(Wrapper::List {
                    non_null: preference == DivergencePreference::MostRestrictive,
                });
                current_target = a;
                current_incoming = b;
                continue;
            }
            (Type::List(a), Type::NonNullList(b)) => {
                diverge(&mut diverged, Side::Incoming)?;
                wrappers.push(Wrapper::List {
                    non_null: preference == DivergencePreference::MostRestrictive,
                });
                current_target = a;
                current_incoming = b;
                continue;
            }
            _ => return Err(TypeMergeFailure::Incompatible),
        };
        let mut merged = if non_null {
            Type::NonNullNamed(named.clone())
        } else {
            Type::Named(named.clone())
        };
        for wrapper in wrappers.iter().rev() {
            let Wrapper::List { non_null } = wrapper;
            merged = if *non_null {
                Type::NonNullList(Box::new(merged))
            } else {
                Type::List(Box::new(merged))
            };
        }
        return Ok(merged);
    }
    Err(TypeMergeFailure::DepthExceeded)
}

pub(crate) struct MergeContext<'a> {
    pub(crate) errors: &'a mut Vec<CompositionError>,
    pub(crate) warnings: &'a mut Vec<CompositionWarning>,
}

impl MergeContext<'_> {
    fn push_incompatible_types(
        &mut self,
        kind: &'static str,
        coords: String,
        expected: &Type,
        actual: &Type,
    ) {
        self.errors.push(CompositionError::IncompatibleMergedTypes {
            kind,
            coords,
            expected_type: expected.to_string(),
            actual_type: actual.to_string(),
        });
    }
}

/// Merges one incoming subgraph definition into the working target. The
/// composed kinds must match, with one exception: an entity interface may be
/// modeled as an `@interfaceObject` object type in other subgraphs, which
/// re-tags the working target as an interface.
pub(crate) fn merge_type_data(target: &mut TypeData, incoming: &TypeData, ctx: &mut MergeContext<'_>) {
    // The interface-object exception: normalize both orders to Interface.
    if let (TypeData::Object(object_data), TypeData::Interface(_)) = (&*target, incoming) {
        if !object_data.interface_object_subgraph_names.is_empty() {
            let retagged = TypeData::Interface(new_interface_from_interface_object(object_data));
            *target = retagged;
        }
    }
    match (target, incoming) {
        (TypeData::Scalar(target_data), TypeData::Scalar(incoming_data)) => {
            target_data
                .subgraph_names
                .extend(incoming_data.subgraph_names.iter().cloned());
            merge_description(&mut target_data.description, &incoming_data.description);
            merge_directive_maps(&mut target_data.directives, &incoming_data.directives);
            target_data.is_inaccessible |= incoming_data.is_inaccessible;
            if incoming_data.extension_kind == crate::model::ExtensionKind::None {
                target_data.extension_kind = crate::model::ExtensionKind::None;
            }
        }
        (TypeData::Union(target_data), TypeData::Union(incoming_data)) => {
            target_data
                .subgraph_names
                .extend(incoming_data.subgraph_names.iter().cloned());
            merge_description(&mut target_data.description, &incoming_data.description);
            merge_directive_maps(&mut target_data.directives, &incoming_data.directives);
            target_data.is_inaccessible |= incoming_data.is_inaccessible;
            target_data.members.extend(incoming_data.members.iter().cloned());
            if incoming_data.extension_kind == crate::model::ExtensionKind::None {
                target_data.extension_kind = crate::model::ExtensionKind::None;
            }
        }
        (TypeData::Enum(target_data), TypeData::Enum(incoming_data)) => {
            target_data
                .subgraph_names
                .extend(incoming_data.subgraph_names.iter().cloned());
            merge_description(&mut target_data.description, &incoming_data.description);
            merge_directive_maps(&mut target_data.directives, &incoming_data.directives);
            target_data.is_inaccessible |= incoming_data.is_inaccessible;
            if incoming_data.extension_kind == crate::model::ExtensionKind::None {
                target_data.extension_kind = crate::model::ExtensionKind::None;
            }
            for (value_name, incoming_value) in &incoming_data.values {
                match target_data.values.get_mut(value_name) {
                    Some(target_value) => {
                        target_value
                            .subgraph_names
                            .extend(incoming_value.subgraph_names.iter().cloned());
                        merge_description(&mut target_value.description, &incoming_value.description);
                        merge_directive_maps(&mut target_value.directives, &incoming_value.directives);
                        target_value.is_inaccessible |= incoming_value.is_inaccessible;
                    }
                    None => {
                        target_data
                            .values
                            .insert(value_name.clone(), incoming_value.clone());
                    }
                }
            }
        }
        (TypeData::InputObject(target_data), TypeData::InputObject(incoming_data)) => {
            target_data
                .subgraph_names
                .extend(incoming_data.subgraph_names.iter().cloned());
            merge_description(&mut target_data.description, &incoming_data.description);
            merge_directive_maps(&mut target_data.directives, &incoming_data.directives);
            target_data.is_inaccessible |= incoming_data.is_inaccessible;
            if incoming_data.extension_kind == crate::model::ExtensionKind::None {
                target_data.extension_kind = crate::model::ExtensionKind::None;
            }
            let parent_name = target_data.name.clone();
            for (field_name, incoming_field) in &incoming_data.fields {
                match target_data.fields.get_mut(field_name) {
                    Some(target_field) => merge_input_value(
                        target_field,
                        incoming_field,
                        field_coords(&parent_name, field_name),
                        ctx,
                    ),
                    None => {
                        target_data
                            .fields
                            .insert(field_name.clone(), incoming_field.clone());
                    }
                }
            }
        }
        (TypeData::Object(target_data), TypeData::Object(incoming_data)) => {
            target_data
                .subgraph_names
                .extend(incoming_data.subgraph_names.iter().cloned());
            merge_description(&mut target_data.description, &incoming_data.description);
            merge_directive_maps(&mut target_data.directives, &incoming_data.directives);
            target_data.is_inaccessible |= incoming_data.is_inaccessible;
            target_data.is_entity |= incoming_data.is_entity;
            target_data.is_root_type |= incoming_data.is_root_type;
            target_data
                .implements
                .extend(incoming_data.implements.iter().cloned());
            target_data
                .shareable_subgraph_names
                .extend(incoming_data.shareable_subgraph_names.iter().cloned());
            target_data.interface_object_subgraph_names.extend(
                incoming_data
                    .interface_object_subgraph_names
                    .iter()
                    .cloned(),
            );
            if incoming_data.extension_kind == crate::model::ExtensionKind::None {
                target_data.extension_kind = crate::model::ExtensionKind::None;
            }
            merge_fields(&mut target_data.fields, &incoming_data.fields, ctx);
        }
        (TypeData::Interface(target_data), TypeData::Interface(incoming_data)) => {
            target_data
                .subgraph_names
                .extend(incoming_data.subgraph_names.iter().cloned());
            merge_description(&mut target_data.description, &incoming_data.description);
            merge_directive_maps(&mut target_data.directives, &incoming_data.directives);
            target_data.is_inaccessible |= incoming_data.is_inaccessible;
            target_data.is_entity |= incoming_data.is_entity;
            target_data
                .implements
                .extend(incoming_data.implements.iter().cloned());
            if incoming_data.extension_kind == crate::model::ExtensionKind::None {
                target_data.extension_kind = crate::model::ExtensionKind::None;
            }
            merge_fields(&mut target_data.fields, &incoming_data.fields, ctx);
        }
        // The inverse interface-object order: the target is the entity
        // interface and the incoming definition models it as an object.
        (TypeData::Interface(target_data), TypeData::Object(incoming_data))
            if !incoming_data.interface_object_subgraph_names.is_empty() =>
        {
            target_data
                .subgraph_names
                .extend(incoming_data.subgraph_names.iter().cloned());
            merge_description(&mut target_data.description, &incoming_data.description);
            merge_directive_maps(&mut target_data.directives, &incoming_data.directives);
            target_data.is_inaccessible |= incoming_data.is_inaccessible;
            target_data.is_entity |= incoming_data.is_entity;
            merge_fields(&mut target_data.fields, &incoming_data.fields, ctx);
        }
        (target, incoming) => {
            ctx.errors.push(CompositionError::IncompatibleParentKindMerge {
                type_name: incoming.name().to_string(),
                expected_kind: target.kind_string(),
                actual_kind: incoming.kind_string(),
            });
        }
    }
}

fn new_interface_from_interface_object(object_data: &crate::model::ObjectData) -> crate::model::InterfaceData {
    crate::model::InterfaceData {
        name: object_data.name.clone(),
        description: object_data.description.clone(),
        directives: object_data.directives.clone(),
        subgraph_names: object_data.subgraph_names.clone(),
        extension_kind: object_data.extension_kind,
        is_inaccessible: object_data.is_inaccessible,
        fields: object_data.fields.clone(),
        implements: object_data.implements.clone(),
        is_entity: object_data.is_entity,
    }
}

fn merge_fields(
    target_fields: &mut indexmap::IndexMap<apollo_compiler::Name, crate::model::FieldData>,
    incoming_fields: &indexmap::IndexMap<apollo_compiler::Name, crate::model::FieldData>,
    ctx: &mut MergeContext<'_>,
) {
    for (field_name, incoming_field) in incoming_fields {
        let Some(target_field) = target_fields.get_mut(field_name) else {
            target_fields.insert(field_name.clone(), incoming_field.clone());
            continue;
        };
        let coords = target_field.coords();
        match merge_type_references(
            &target_field.ty,
            &incoming_field.ty,
            DivergencePreference::MostRestrictive,
        ) {
            Ok(merged) => target_field.ty = merged,
            Err(TypeMergeFailure::Incompatible) => {
                ctx.push_incompatible_types("field", coords.clone(), &target_field.ty, &incoming_field.ty);
            }
            Err(TypeMergeFailure::DepthExceeded) => {
                ctx.errors.push(CompositionError::MaximumTypeNestingExceeded {
                    path: coords.clone(),
                    maximum: MAXIMUM_TYPE_NESTING,
                });
            }
        }
        target_field
            .subgraph_names
            .extend(incoming_field.subgraph_names.iter().cloned());
        target_field
            .external_subgraph_names
            .extend(incoming_field.external_subgraph_names.iter().cloned());
        target_field
            .shareable_subgraph_names
            .extend(incoming_field.shareable_subgraph_names.iter().cloned());
        for (declaring, source) in &incoming_field.override_source_by_subgraph_name {
            target_field
                .override_source_by_subgraph_name
                .insert(declaring.clone(), source.clone());
        }
        target_field.is_inaccessible |= incoming_field.is_inaccessible;
        merge_description(&mut target_field.description, &incoming_field.description);
        merge_directive_maps(&mut target_field.directives, &incoming_field.directives);
        let parent_name = target_field.parent_type_name.clone();
        let field_name = target_field.name.clone();
        for (argument_name, incoming_argument) in &incoming_field.arguments {
            match target_field.arguments.get_mut(argument_name) {
                Some(target_argument) => {
                    let argument_coords =
                        crate::model::argument_coords(&parent_name, &field_name, argument_name);
                    // Argument types must match exactly across subgraphs.
                    if target_argument.ty != incoming_argument.ty {
                        ctx.push_incompatible_types(
                            "field argument",
                            argument_coords.clone(),
                            &target_argument.ty,
                            &incoming_argument.ty,
                        );
                    }
                    merge_input_value_metadata(target_argument, incoming_argument, argument_coords, ctx);
                }
                None => {
                    target_field
                        .arguments
                        .insert(argument_name.clone(), incoming_argument.clone());
                }
            }
        }
    }
}

fn merge_input_value(
    target: &mut InputValueData,
    incoming: &InputValueData,
    coords: String,
    ctx: &mut MergeContext<'_>,
) {
    match merge_type_references(&target.ty, &incoming.ty, DivergencePreference::LeastRestrictive) {
        Ok(merged) => target.ty = merged,
        Err(TypeMergeFailure::Incompatible) => {
            ctx.push_incompatible_types("Input field", coords.clone(), &target.ty, &incoming.ty);
        }
        Err(TypeMergeFailure::DepthExceeded) => {
            ctx.errors.push(CompositionError::MaximumTypeNestingExceeded {
                path: coords.clone(),
                maximum: MAXIMUM_TYPE_NESTING,
            });
        }
    }
    merge_input_value_metadata(target, incoming, coords, ctx);
}

fn merge_input_value_metadata(
    target: &mut InputValueData,
    incoming: &InputValueData,
    coords: String,
    ctx: &mut MergeContext<'_>,
) {
    target
        .subgraph_names
        .extend(incoming.subgraph_names.iter().cloned());
    target
        .required_subgraph_names
        .extend(incoming.required_subgraph_names.iter().cloned());
    target.is_inaccessible |= incoming.is_inaccessible;
    merge_description(&mut target.description, &incoming.description);
    merge_directive_maps(&mut target.directives, &incoming.directives);
    match (&target.default_value, &incoming.default_value) {
        (Some(expected), Some(actual)) if expected.as_ref() != actual.as_ref() => {
            ctx.errors
                .push(CompositionError::IncompatibleInputValueDefaultValues {
                    kind: target.kind.kind_string(),
                    coords,
                    expected_default_value: expected.to_string(),
                    actual_default_value: actual.to_string(),
                });
        }
        (None, Some(_)) => target.default_value = incoming.default_value.clone(),
        _ => {}
    }
}

pub(crate) fn merge_description(
    target: &mut Option<apollo_compiler::Node<str>>,
    incoming: &Option<apollo_compiler::Node<str>>,
) {
    if target.is_none() {
        target.clone_from(incoming);
    }
}

pub(crate) fn merge_directive_maps(
    target: &mut crate::model::DirectiveMap,
    incoming: &crate::model::DirectiveMap,
) {
    for (directive_name, occurrences) in incoming {
        let entry = target.entry(directive_name.clone()).or_default();
        for occurrence in occurrences {
            // Non-repeatable directives keep the first occurrence only; the
            // normalizer has already validated per-location repetition.
            let is_repeatable = crate::catalog::DIRECTIVE_CATALOG
                .get(directive_name)
                .map(|spec| spec.repeatable)
                .unwrap_or(true);
            if is_repeatable || entry.is_empty() {
                entry.push(occurrence.clone());
            }
        }
    }
}

/// Applies the usage-dependent merge strategy to a merged enum's values.
pub(crate) fn finalize_enum_values(
    enum_data: &mut crate::model::EnumData,
    mode: EnumMergeMode,
    ctx: &mut MergeContext<'_>,
) {
    let defining_subgraphs = enum_data.subgraph_names.clone();
    match mode {
        EnumMergeMode::Union => {}
        EnumMergeMode::Intersection => {
            enum_data
                .values
                .retain(|_, value| value.subgraph_names == defining_subgraphs);
        }
        EnumMergeMode::Consistent => {
            let inconsistent = enum_data
                .values
                .values()
                .any(|value| value.subgraph_names != defining_subgraphs);
            if inconsistent {
                ctx.errors.push(CompositionError::IncompatibleSharedEnum {
                    type_name: enum_data.name.to_string(),
                });
            }
        }
    }
    if enum_data.values.is_empty() {
        ctx.errors.push(CompositionError::NoDefinedEnumValues {
            type_name: enum_data.name.to_string(),
        });
    }
}

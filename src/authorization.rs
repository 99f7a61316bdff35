//! Authorization data extracted from `@authenticated` and `@requiresScopes`.
//!
//! A requirement is an OR-list of AND-sets of scopes: the caller must satisfy
//! every scope of at least one AND-set. Merging two requirements by AND takes
//! the cross product of their OR-lists, capped at [`MAX_OR_SCOPES`] branches;
//! merging by OR appends, under the same cap.

use apollo_compiler::Name;
use either::Either;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::catalog::MAX_OR_SCOPES;

pub(crate) type OrScopes = Vec<IndexSet<String>>;

#[derive(Debug, Clone)]
pub(crate) struct AuthorizationData {
    pub(crate) type_name: Name,
    pub(crate) requires_authentication: bool,
    pub(crate) required_scopes: OrScopes,
    /// True when the type itself (not just fields) carries authorization.
    pub(crate) has_parent_level_authorization: bool,
    pub(crate) field_auth_by_field_name: IndexMap<Name, FieldAuthorizationData>,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldAuthorizationData {
    pub(crate) field_name: Name,
    pub(crate) requires_authentication: bool,
    pub(crate) required_scopes: OrScopes,
}

impl FieldAuthorizationData {
    pub(crate) fn new(field_name: Name) -> Self {
        Self {
            field_name,
            requires_authentication: false,
            required_scopes: OrScopes::new(),
        }
    }
}

impl AuthorizationData {
    pub(crate) fn new(type_name: Name) -> Self {
        Self {
            type_name,
            requires_authentication: false,
            required_scopes: OrScopes::new(),
            has_parent_level_authorization: false,
            field_auth_by_field_name: IndexMap::new(),
        }
    }

    /// The element a directive occurrence updates: the type itself for
    /// type-level locations, or a per-field record for field definitions.
    pub(crate) fn target_for(
        &mut self,
        field_name: Option<&Name>,
    ) -> Either<&mut AuthorizationData, &mut FieldAuthorizationData> {
        match field_name {
            Some(field_name) => Either::Right(
                self.field_auth_by_field_name
                    .entry(field_name.clone())
                    .or_insert_with(|| FieldAuthorizationData::new(field_name.clone())),
            ),
            None => {
                self.has_parent_level_authorization = true;
                Either::Left(self)
            }
        }
    }
}

/// Combines `source` into `target` such that both requirements must hold.
/// Returns false when the resulting OR-list would exceed [`MAX_OR_SCOPES`];
/// the caller reports the limit error and leaves `target` unchanged.
pub(crate) fn merge_scopes_by_and(source: &OrScopes, target: &mut OrScopes) -> bool {
    if source.is_empty() {
        return true;
    }
    if target.is_empty() {
        if source.len() > MAX_OR_SCOPES {
            return false;
        }
        target.extend(source.iter().cloned());
        return true;
    }
    if source.len() * target.len() > MAX_OR_SCOPES {
        return false;
    }
    let mut merged: OrScopes = Vec::with_capacity(source.len() * target.len());
    for existing_and_scopes in target.iter() {
        for incoming_and_scopes in source {
            let mut and_scopes = existing_and_scopes.clone();
            and_scopes.extend(incoming_and_scopes.iter().cloned());
            merged.push(and_scopes);
        }
    }
    *target = merged;
    true
}

/// Combines `source` into `target` such that either requirement suffices.
/// Duplicate AND-sets collapse. Returns false when the cap is exceeded.
pub(crate) fn merge_scopes_by_or(source: &OrScopes, target: &mut OrScopes) -> bool {
    for and_scopes in source {
        if !target.contains(and_scopes) {
            if target.len() >= MAX_OR_SCOPES {
                return false;
            }
            target.push(and_scopes.clone());
        }
    }
    true
}

/// AND-merges one requirement pair (authentication flag and scopes).
pub(crate) fn merge_requirements_by_and(
    source_requires_authentication: bool,
    source_scopes: &OrScopes,
    target_requires_authentication: &mut bool,
    target_scopes: &mut OrScopes,
) -> bool {
    *target_requires_authentication |= source_requires_authentication;
    merge_scopes_by_and(source_scopes, target_scopes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn and_scopes(scopes: &[&str]) -> IndexSet<String> {
        scopes.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn and_merge_takes_the_cross_product() {
        let source = vec![and_scopes(&["read:a"]), and_scopes(&["read:b"])];
        let mut target = vec![and_scopes(&["admin"]), and_scopes(&["support"])];
        assert!(merge_scopes_by_and(&source, &mut target));
        assert_eq!(target.len(), 4);
        assert_eq!(target[0], and_scopes(&["admin", "read:a"]));
        assert_eq!(target[3], and_scopes(&["support", "read:b"]));
    }

    #[test]
    fn and_merge_into_empty_target_copies_the_source() {
        let source = vec![and_scopes(&["read:a", "read:b"])];
        let mut target = OrScopes::new();
        assert!(merge_scopes_by_and(&source, &mut target));
        assert_eq!(target, source);
    }

    #[test]
    fn and_merge_fails_beyond_the_or_branch_cap() {
        let source: OrScopes = (0..5).map(|i| and_scopes(&[&format!("s{i}")])).collect();
        let mut target: OrScopes = (0..4).map(|i| and_scopes(&[&format!("t{i}")])).collect();
        let before = target.clone();
        assert!(!merge_scopes_by_and(&source, &mut target));
        assert_eq!(target, before, "a failed merge must not modify the target");
    }

    #[test]
    fn or_merge_deduplicates_and_sets() {
        let source = vec![and_scopes(&["read:a"]), and_scopes(&["read:b"])];
        let mut target = vec![and_scopes(&["read:a"])];
        assert!(merge_scopes_by_or(&source, &mut target));
        assert_eq!(target.len(), 2);
    }
}

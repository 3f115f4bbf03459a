//! Process-wide member and term caches.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::schema::{Member, Resource};
use crate::term::{BindingRule, Term};

/// Key for a cached term: declaring type, textual key, binding rule.
pub(crate) type TermKey = (TypeId, String, BindingRule);

/// Cache service for member tables and resolved terms.
///
/// Both maps are populate-once, read-many: entries are pure functions of
/// their keys, so a race where two requests compute the same entry is
/// safe and last-write-wins. The cache is constructed by the host and
/// injected wherever resolution happens; there is no process-global
/// instance.
#[derive(Debug, Default)]
pub struct TypeCache {
    members: RwLock<HashMap<TypeId, Arc<Vec<Member>>>>,
    terms: RwLock<HashMap<TermKey, Arc<Term>>>,
}

impl TypeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the member table for `T`, discovering and caching it on
    /// first use. Special members are ordered last.
    pub fn members<T: Resource>(&self) -> Arc<Vec<Member>> {
        let type_id = TypeId::of::<T>();
        if let Some(found) = self.members.read().get(&type_id) {
            return Arc::clone(found);
        }

        let mut discovered = T::members();
        // Stable: declaration order is preserved within each group.
        discovered.sort_by_key(|m| m.special);
        debug!(resource = T::NAME, count = discovered.len(), "discovered members");

        let table = Arc::new(discovered);
        self.members
            .write()
            .insert(type_id, Arc::clone(&table));
        table
    }

    /// Looks up a cached term.
    pub(crate) fn term(&self, key: &TermKey) -> Option<Arc<Term>> {
        self.terms.read().get(key).map(Arc::clone)
    }

    /// Stores a resolved term.
    pub(crate) fn store_term(&self, key: TermKey, term: Arc<Term>) {
        self.terms.write().insert(key, term);
    }

    /// Number of cached terms, for diagnostics.
    pub fn term_count(&self) -> usize {
        self.terms.read().len()
    }
}

/// Outcome of a case-insensitive member lookup.
#[derive(Debug)]
pub(crate) enum MemberLookup<'a> {
    /// Exactly one match (exact-case match wins over a single
    /// case-insensitive one).
    Found(&'a Member),
    /// No member matched.
    Unknown,
    /// Several case-insensitive matches and no exact-case match.
    Ambiguous(Vec<String>),
}

/// Finds a member by name, case-insensitively, with exact-case priority.
pub(crate) fn find_member<'a>(members: &'a [Member], name: &str) -> MemberLookup<'a> {
    if let Some(exact) = members.iter().find(|m| m.name == name) {
        return MemberLookup::Found(exact);
    }

    let mut matches = members
        .iter()
        .filter(|m| m.name.eq_ignore_ascii_case(name));

    match (matches.next(), matches.next()) {
        (None, _) => MemberLookup::Unknown,
        (Some(single), None) => MemberLookup::Found(single),
        (Some(first), Some(second)) => {
            let mut candidates = vec![first.name.clone(), second.name.clone()];
            candidates.extend(
                members
                    .iter()
                    .filter(|m| m.name.eq_ignore_ascii_case(name))
                    .skip(2)
                    .map(|m| m.name.clone()),
            );
            MemberLookup::Ambiguous(candidates)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueKind;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Widget {
        name: String,
        size: i64,
    }

    impl Resource for Widget {
        const NAME: &'static str = "Widget";

        fn members() -> Vec<Member> {
            vec![
                Member::special("objectid", ValueKind::String),
                Member::new("Name", ValueKind::String),
                Member::new("Size", ValueKind::Int),
            ]
        }
    }

    #[test]
    fn members_cached_once() {
        let cache = TypeCache::new();
        let first = cache.members::<Widget>();
        let second = cache.members::<Widget>();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn special_members_sort_last() {
        let cache = TypeCache::new();
        let members = cache.members::<Widget>();
        assert_eq!(members[0].name, "Name");
        assert_eq!(members[1].name, "Size");
        assert_eq!(members[2].name, "objectid");
        assert!(members[2].special);
    }

    #[test]
    fn lookup_case_insensitive() {
        let members = vec![
            Member::new("Name", ValueKind::String),
            Member::new("Size", ValueKind::Int),
        ];
        match find_member(&members, "name") {
            MemberLookup::Found(m) => assert_eq!(m.name, "Name"),
            other => panic!("unexpected lookup result: {other:?}"),
        }
    }

    #[test]
    fn lookup_exact_case_wins_over_collision() {
        let members = vec![
            Member::new("name", ValueKind::String),
            Member::new("Name", ValueKind::String),
        ];
        match find_member(&members, "Name") {
            MemberLookup::Found(m) => assert_eq!(m.name, "Name"),
            other => panic!("unexpected lookup result: {other:?}"),
        }
    }

    #[test]
    fn lookup_ambiguous_without_exact_match() {
        let members = vec![
            Member::new("name", ValueKind::String),
            Member::new("NAME", ValueKind::String),
        ];
        match find_member(&members, "NaMe") {
            MemberLookup::Ambiguous(candidates) => {
                assert_eq!(candidates, vec!["name".to_string(), "NAME".to_string()]);
            }
            other => panic!("unexpected lookup result: {other:?}"),
        }
    }

    #[test]
    fn lookup_unknown() {
        let members = vec![Member::new("Name", ValueKind::String)];
        assert!(matches!(
            find_member(&members, "Missing"),
            MemberLookup::Unknown
        ));
    }
}

//! Resolution of textual keys into terms.

use std::any::TypeId;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Error, Result};
use crate::schema::{find_member, Member, MemberLookup, Resource, TypeCache};
use crate::term::{Property, Term};

/// How static and dynamic resolution combine for each path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingRule {
    /// Every segment must resolve against compiled metadata; an unknown
    /// member is a hard error.
    StaticOnly,
    /// Attempt static resolution first; an unknown member falls back to
    /// a dynamic step. Ambiguity is an error under every rule.
    StaticWithDynamicFallback,
    /// Resolve dynamically; the case-insensitive runtime lookup defers
    /// to the declared member naturally when the shapes agree.
    DynamicWithStaticFallback,
}

/// Resolves dot-separated key strings into cached terms.
///
/// Resolution is a pure function of (declaring type, key string, binding
/// rule), so results are cached process-wide in the injected
/// [`TypeCache`]; concurrent population of the same entry is benign.
#[derive(Debug, Clone, Copy)]
pub struct TermResolver<'a> {
    cache: &'a TypeCache,
}

impl<'a> TermResolver<'a> {
    /// Creates a resolver over the given cache.
    pub fn new(cache: &'a TypeCache) -> Self {
        TermResolver { cache }
    }

    /// Resolves `key` against the members of `T`.
    ///
    /// `dynamic_domain` lists member names known to be dynamic for this
    /// request; matching segments are forced dynamic regardless of the
    /// binding rule. Once a segment resolves dynamically, every
    /// subsequent segment is dynamic as well, since the path has left
    /// statically known structure.
    pub fn resolve<T: Resource>(
        &self,
        key: &str,
        rule: BindingRule,
        dynamic_domain: &[String],
    ) -> Result<Arc<Term>> {
        let cache_key = (TypeId::of::<T>(), key.to_string(), rule);
        if dynamic_domain.is_empty() {
            if let Some(cached) = self.cache.term(&cache_key) {
                return Ok(cached);
            }
        }

        let members = self.cache.members::<T>();
        let term = Arc::new(self.build::<T>(key, rule, dynamic_domain, &members)?);
        trace!(resource = T::NAME, key, "resolved term");
        // A domain-forced term is request-scoped: the domain is not part
        // of the cache key, so it must not be stored.
        if dynamic_domain.is_empty() {
            self.cache.store_term(cache_key, Arc::clone(&term));
        }
        Ok(term)
    }

    fn build<T: Resource>(
        &self,
        key: &str,
        rule: BindingRule,
        dynamic_domain: &[String],
        members: &[Member],
    ) -> Result<Term> {
        let mut properties = Vec::new();
        // Member table of the current step's declared type; `None` once
        // the path has left statically known structure.
        let mut scope: Option<Vec<Member>> = Some(members.to_vec());

        for segment in key.split('.') {
            if segment.trim().is_empty() {
                return Err(Error::syntax(format!(
                    "empty path segment in key '{key}'"
                )));
            }

            let forced_dynamic = dynamic_domain
                .iter()
                .any(|d| d.eq_ignore_ascii_case(segment));

            let property = match (&scope, rule, forced_dynamic) {
                (_, _, true) | (_, BindingRule::DynamicWithStaticFallback, _) => {
                    Property::dynamic(segment)
                }
                // Past the last statically known step: only-static means
                // leaving known structure is a hard error, the fallback
                // rules continue dynamically.
                (None, BindingRule::StaticOnly, _) => {
                    return Err(Error::UnknownMember {
                        member: segment.to_string(),
                        resource: T::NAME.to_string(),
                    })
                }
                (None, _, _) => Property::dynamic(segment),
                (Some(current), _, false) => match find_member(current, segment) {
                    MemberLookup::Found(member) if member.special => {
                        Property::Special(member.clone())
                    }
                    MemberLookup::Found(member) => Property::Static(member.clone()),
                    MemberLookup::Ambiguous(candidates) => {
                        return Err(Error::AmbiguousMember {
                            member: segment.to_string(),
                            resource: T::NAME.to_string(),
                            candidates,
                        })
                    }
                    MemberLookup::Unknown => match rule {
                        BindingRule::StaticOnly => {
                            return Err(Error::UnknownMember {
                                member: segment.to_string(),
                                resource: T::NAME.to_string(),
                            })
                        }
                        _ => Property::dynamic(segment),
                    },
                },
            };

            scope = match &property {
                Property::Static(member) => member.nested.map(|nested| nested()),
                _ => None,
            };
            properties.push(property);
        }

        Ok(Term::new(properties))
    }
}

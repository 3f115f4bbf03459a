//! Dot-path member references.
//!
//! A [`Term`] is an ordered, immutable chain of [`Property`] steps,
//! resolved once per (declaring type, key string, binding rule) and
//! cached by the [`TypeCache`](crate::schema::TypeCache). Evaluation is
//! copy-on-write: discovered casings flow out through return values and
//! [`Term::make_dynamic`] returns a widened copy, so cached instances
//! are never mutated.

mod property;
mod resolver;

pub use property::Property;
pub use resolver::{BindingRule, TermResolver};

use serde_json::Value;

use crate::schema::ValueKind;

/// A resolved member-access path.
#[derive(Debug, Clone)]
pub struct Term {
    properties: Vec<Property>,
}

impl Term {
    pub(crate) fn new(properties: Vec<Property>) -> Self {
        Term { properties }
    }

    /// The properties of the chain, in path order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// The last step of the chain, which carries the bound type when the
    /// chain is static.
    pub fn last(&self) -> &Property {
        // A term always has at least one property; empty keys are a
        // syntax error at resolution time.
        &self.properties[self.properties.len() - 1]
    }

    /// Dot-joined member names.
    pub fn key(&self) -> String {
        self.join(Property::name)
    }

    /// Dot-joined store-native query names.
    pub fn db_key(&self) -> String {
        self.join(Property::db_name)
    }

    /// Whether every step was resolved against compiled metadata.
    pub fn is_static(&self) -> bool {
        self.properties.iter().all(Property::is_static)
    }

    /// Whether a backing store can translate predicates on this path.
    pub fn is_queryable(&self) -> bool {
        self.properties.iter().all(Property::queryable)
    }

    /// The declared kind of the final step, when statically known.
    pub fn kind(&self) -> Option<ValueKind> {
        self.last().member().map(|m| m.kind)
    }

    /// Returns a copy of this term with every step widened to dynamic.
    ///
    /// Used when a statically resolved term is evaluated against an
    /// object that turns out to be a schema-less container. The cached
    /// original is left untouched so other requests that legitimately
    /// use the typed path are unaffected.
    #[must_use]
    pub fn make_dynamic(&self) -> Term {
        Term {
            properties: self.properties.iter().map(Property::to_dynamic).collect(),
        }
    }

    /// Walks the chain against a runtime value.
    ///
    /// Returns the value at the end of the path together with the actual
    /// key in its discovered casing. When the walk misses, a multi-step
    /// chain falls back to looking up its full dotted key as one flat
    /// member, since projections flatten nested paths into literal
    /// dotted keys. Otherwise short-circuits to `None`; the remaining
    /// segments keep their given names in the returned key.
    pub fn evaluate(&self, target: &Value) -> (Option<Value>, String) {
        let mut current = target.clone();
        let mut actual = Vec::with_capacity(self.properties.len());

        for (index, property) in self.properties.iter().enumerate() {
            match property.get(&current) {
                Some((value, key)) => {
                    actual.push(key);
                    current = value;
                }
                None => {
                    if self.properties.len() > 1 {
                        if let Some(found) = property::lookup_member(target, &self.key()) {
                            return (Some(found.0), found.1);
                        }
                    }
                    actual.extend(
                        self.properties[index..]
                            .iter()
                            .map(|p| p.name().to_string()),
                    );
                    return (None, actual.join("."));
                }
            }
        }

        (Some(current), actual.join("."))
    }

    fn join(&self, part: impl Fn(&Property) -> &str) -> String {
        self.properties
            .iter()
            .map(|p| part(p))
            .collect::<Vec<_>>()
            .join(".")
    }
}

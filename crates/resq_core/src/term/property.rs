//! Single steps of a member-access path.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::Member;

/// One step of a member-access path.
///
/// The variant is selected once, at term-resolution time. `Static` binds
/// to a discovered [`Member`] with known casing and kind; `Dynamic` holds
/// the user-supplied name and resolves lazily against whatever shape the
/// runtime value has; `Special` is a synthetic member with a fixed getter
/// and no setter.
#[derive(Debug, Clone)]
pub enum Property {
    /// Compiled member with declared casing, kind and queryability.
    Static(Member),
    /// Runtime-resolved member, named from user input.
    Dynamic {
        /// The name as given in the request; the true casing is
        /// discovered at evaluation time and returned, never written
        /// back (copy-on-write, see [`Term`](crate::term::Term)).
        name: String,
    },
    /// Synthetic, always-present member (identity accessors and such).
    Special(Member),
}

impl Property {
    /// Creates a dynamic property from a bare name. Never fails: an
    /// absent member simply evaluates to `None`.
    pub fn dynamic(name: impl Into<String>) -> Self {
        Property::Dynamic { name: name.into() }
    }

    /// The property name as currently known.
    pub fn name(&self) -> &str {
        match self {
            Property::Static(m) | Property::Special(m) => &m.name,
            Property::Dynamic { name } => name,
        }
    }

    /// The name used in store-native query translation.
    pub fn db_name(&self) -> &str {
        match self {
            Property::Static(m) | Property::Special(m) => &m.db_name,
            Property::Dynamic { name } => name,
        }
    }

    /// Whether this step was resolved against compiled metadata.
    pub fn is_static(&self) -> bool {
        matches!(self, Property::Static(_) | Property::Special(_))
    }

    /// Whether a backing store can translate predicates on this step.
    pub fn queryable(&self) -> bool {
        match self {
            Property::Static(m) | Property::Special(m) => m.queryable,
            Property::Dynamic { .. } => false,
        }
    }

    /// The statically declared member, if any.
    pub fn member(&self) -> Option<&Member> {
        match self {
            Property::Static(m) | Property::Special(m) => Some(m),
            Property::Dynamic { .. } => None,
        }
    }

    /// Reads this property from a runtime value.
    ///
    /// Returns the value together with the actual member name in its
    /// discovered casing, or `None` when the member is absent from the
    /// target. Dynamic steps dispatch on the target's runtime shape:
    /// map-like values are searched case-insensitively, arrays accept a
    /// numeric index, anything else misses.
    pub fn get(&self, target: &Value) -> Option<(Value, String)> {
        match self {
            Property::Static(m) | Property::Special(m) => {
                if !m.readable {
                    return None;
                }
                lookup_member(target, &m.name)
            }
            Property::Dynamic { name } => match target {
                Value::Object(_) => lookup_member(target, name),
                Value::Array(items) => {
                    let index: usize = name.parse().ok()?;
                    items.get(index).map(|v| (v.clone(), name.clone()))
                }
                _ => None,
            },
        }
    }

    /// Writes this property into a runtime value.
    ///
    /// Static steps write under their declared casing; dynamic steps
    /// correct to an existing key's casing when one matches
    /// case-insensitively, otherwise insert under the given name.
    pub fn set(&self, target: &mut Value, value: Value) -> Result<()> {
        let name = match self {
            Property::Static(m) => {
                if !m.writable {
                    return Err(Error::ReadOnlyMember {
                        member: m.name.clone(),
                    });
                }
                m.name.clone()
            }
            Property::Special(m) => {
                return Err(Error::ReadOnlyMember {
                    member: m.name.clone(),
                })
            }
            Property::Dynamic { name } => match target.as_object() {
                Some(map) => map
                    .keys()
                    .find(|k| k.eq_ignore_ascii_case(name))
                    .cloned()
                    .unwrap_or_else(|| name.clone()),
                None => name.clone(),
            },
        };

        match target.as_object_mut() {
            Some(map) => {
                map.insert(name, value);
                Ok(())
            }
            None => Err(Error::syntax(format!(
                "cannot write member '{name}' into a non-object value"
            ))),
        }
    }

    /// Widens this step to a dynamic one, keeping the current name.
    pub fn to_dynamic(&self) -> Property {
        Property::dynamic(self.name())
    }
}

/// Case-insensitive object member lookup with exact-case priority.
pub(crate) fn lookup_member(target: &Value, name: &str) -> Option<(Value, String)> {
    let map = target.as_object()?;
    if let Some(found) = map.get(name) {
        return Some((found.clone(), name.to_string()));
    }
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(k, v)| (v.clone(), k.clone()))
}

//! Member metadata for resource types.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// The declared kind of a member's value.
///
/// Kinds gate which operators a condition may use: ordering operators are
/// rejected for kinds without a meaningful order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// UTF-8 text.
    String,
    /// Ordered list of values.
    Array,
    /// Nested object.
    Object,
    /// Unknown or mixed; all operators permitted, coercion is best-effort.
    Any,
}

impl ValueKind {
    /// Whether values of this kind have a total order usable by `<`, `>`,
    /// `<=` and `>=`.
    pub fn orderable(self) -> bool {
        matches!(
            self,
            ValueKind::Int | ValueKind::Float | ValueKind::String | ValueKind::Any
        )
    }

    /// Display name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Any => "any",
        }
    }
}

/// One addressable member of a resource type.
///
/// Members are discovered once per type and cached; see
/// [`TypeCache`](crate::schema::TypeCache). Special members (identity
/// accessors and the like) sort last and are read-only.
#[derive(Debug, Clone)]
pub struct Member {
    /// Declared name, in its true casing.
    pub name: String,
    /// Name used when translating to a store-native query. Defaults to
    /// `name` when the store needs no alias.
    pub db_name: String,
    /// Declared value kind.
    pub kind: ValueKind,
    /// Whether the member can be read.
    pub readable: bool,
    /// Whether the member can be written.
    pub writable: bool,
    /// Whether a backing store can translate predicates on this member.
    pub queryable: bool,
    /// Whether this is a special (synthetic, always-present) member.
    pub special: bool,
    /// Member table of the nested type, for members whose kind is
    /// [`ValueKind::Object`] with statically known structure. Paths that
    /// step through a member without one leave known structure and
    /// continue dynamically.
    pub nested: Option<fn() -> Vec<Member>>,
}

impl Member {
    /// Creates a readable, writable, queryable member of the given kind.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        let name = name.into();
        Member {
            db_name: name.clone(),
            name,
            kind,
            readable: true,
            writable: true,
            queryable: true,
            special: false,
            nested: None,
        }
    }

    /// Sets the store-native query name.
    #[must_use]
    pub fn db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    /// Marks the member as not translatable to a store-native predicate.
    #[must_use]
    pub fn not_queryable(mut self) -> Self {
        self.queryable = false;
        self
    }

    /// Marks the member read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Attaches the member table of the nested type, enabling static
    /// resolution of paths that step through this member.
    #[must_use]
    pub fn nested(mut self, members: fn() -> Vec<Member>) -> Self {
        self.nested = Some(members);
        self
    }

    /// Creates a special member: always readable, never writable, sorted
    /// after the ordinary members.
    pub fn special(name: impl Into<String>, kind: ValueKind) -> Self {
        let name = name.into();
        Member {
            db_name: name.clone(),
            name,
            kind,
            readable: true,
            writable: false,
            queryable: false,
            special: true,
            nested: None,
        }
    }
}

/// A resource type that can be served through the pipeline.
///
/// Implementors describe their addressable members and may veto bad
/// entities through [`validate`](Resource::validate) before they are
/// inserted or updated.
pub trait Resource: Serialize + DeserializeOwned + Send + 'static {
    /// Resource name used in diagnostics and error messages.
    const NAME: &'static str;

    /// Enumerates the addressable members of this type, ordinary members
    /// first, special members last.
    fn members() -> Vec<Member>;

    /// Validation hook invoked before insert and update.
    ///
    /// The default accepts everything.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

//! Member discovery and type caching.
//!
//! Resource types describe their addressable members through the
//! [`Resource`] trait; the [`TypeCache`] memoizes member tables and
//! resolved terms per declaring type.

mod cache;
mod member;

pub use cache::TypeCache;
pub(crate) use cache::{find_member, MemberLookup};
pub use member::{Member, Resource, ValueKind};

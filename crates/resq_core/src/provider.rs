//! The contract a backing store implements to serve a resource.

use crate::error::Result;
use crate::request::Request;
use crate::schema::Resource;

/// The delegate set a storage backend supplies per entity type.
///
/// The orchestrator treats these as opaque: any failure raised here is
/// caught at the orchestrator boundary and re-raised as a single
/// operation-scoped error naming the method and resource.
///
/// Conditions come in two tiers. A provider that translates predicates
/// natively applies the request's
/// [`translatable_conditions`](Request::translatable_conditions) and
/// reports that through [`applies_conditions`](ResourceProvider::applies_conditions);
/// the orchestrator then applies only the post-filter remainder
/// in-memory. A provider may instead apply nothing and leave all
/// filtering to the orchestrator.
pub trait ResourceProvider<T: Resource> {
    /// Selects candidate entities for a request as a lazily consumed
    /// sequence.
    fn select<'a>(&'a self, request: &'a Request<T>)
        -> Result<Box<dyn Iterator<Item = T> + 'a>>;

    /// Inserts the given entities, returning how many were inserted.
    fn insert(&self, request: &Request<T>, entities: Vec<T>) -> Result<u64>;

    /// Updates the given entities, returning how many were updated.
    fn update(&self, request: &Request<T>, entities: Vec<T>) -> Result<u64>;

    /// Deletes the given entities, returning how many were deleted.
    fn delete(&self, request: &Request<T>, entities: Vec<T>) -> Result<u64>;

    /// Native count capability. `Ok(None)` means the provider cannot
    /// count natively and the orchestrator falls back to
    /// select+filter+count.
    fn count(&self, request: &Request<T>) -> Result<Option<u64>> {
        let _ = request;
        Ok(None)
    }

    /// Whether [`select`](ResourceProvider::select) already applied the
    /// translatable condition subset. When `false`, the orchestrator
    /// applies every condition in-memory.
    fn applies_conditions(&self) -> bool {
        false
    }
}

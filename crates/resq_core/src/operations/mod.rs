//! The entity operation orchestrator.
//!
//! One request is one method invocation. The orchestrator sequences the
//! provider's delegates, applies the post-filter condition tier, the
//! processors and the filter chain, and normalizes provider failures
//! into operation-scoped aborts.

mod safe_post;

pub use safe_post::Change;

use std::marker::PhantomData;

use serde_json::Value;
use tracing::debug;

use crate::condition::{self, Condition};
use crate::error::{Error, Result};
use crate::filter::{FilterContext, ValueStream};
use crate::process;
use crate::provider::ResourceProvider;
use crate::request::{Method, Request};
use crate::schema::{Resource, TypeCache};
use crate::serialize::CanonicalSerializer;

/// The result of evaluating a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Selected (and filtered, possibly projected) entities.
    Entities(Vec<Value>),
    /// A count of matching entities.
    Count(u64),
    /// Number of inserted entities.
    Inserted(u64),
    /// Update/insert counts from a PUT, PATCH or safe post.
    Changed(Change),
    /// Number of deleted entities.
    Deleted(u64),
}

/// Orchestrates entity operations against one provider.
///
/// Request-scoped and side-effect-free apart from reads through the
/// injected [`TypeCache`].
pub struct Operations<'a, T: Resource, P: ResourceProvider<T>> {
    provider: &'a P,
    cache: &'a TypeCache,
    serializer: &'a dyn CanonicalSerializer,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Resource, P: ResourceProvider<T>> Operations<'a, T, P> {
    /// Creates an orchestrator over a provider and its collaborators.
    pub fn new(
        provider: &'a P,
        cache: &'a TypeCache,
        serializer: &'a dyn CanonicalSerializer,
    ) -> Self {
        Operations {
            provider,
            cache,
            serializer,
            _marker: PhantomData,
        }
    }

    /// Evaluates a request according to its method.
    pub fn evaluate(&self, request: &'a Request<T>) -> Result<Outcome> {
        debug!(resource = T::NAME, method = %request.method(), "evaluating request");
        match request.method() {
            Method::Get => Ok(Outcome::Entities(self.select(request)?.collect())),
            Method::Post if !request.safe_post_keys().is_empty() => {
                Ok(Outcome::Changed(self.safe_post(request)?))
            }
            Method::Post => Ok(Outcome::Inserted(self.insert(request)?)),
            Method::Put | Method::Patch => Ok(Outcome::Changed(self.update(request)?)),
            Method::Delete => Ok(Outcome::Deleted(self.delete(request)?)),
            Method::Report | Method::Head => Ok(Outcome::Count(self.count(request)?)),
        }
    }

    /// The select path: provider select, post-filter tier, optional
    /// projection, filter chain.
    ///
    /// The path is chosen upfront from whether processors are present,
    /// never by probing: with processors, entities are projected first
    /// and post-filters see the projected shape (request validation
    /// guarantees their members survive); without, the cheaper
    /// select+filter path runs.
    pub fn select(&self, request: &'a Request<T>) -> Result<ValueStream<'a>> {
        request.validate()?;
        let entities = self
            .provider
            .select(request)
            .map_err(|e| e.abort(Method::Get, T::NAME))?;

        // Conditions the provider did not translate split into two
        // phases: translatable ones evaluate against the entity's
        // original shape, post-filter ones against the projected shape.
        let (pre, post) = if self.provider.applies_conditions() {
            (Vec::new(), request.post_filter_conditions())
        } else {
            condition::partition(request.conditions())
        };

        let mut seq: ValueStream<'a> = Box::new(entities.map(|entity| entity_value(&entity)));
        if !pre.is_empty() {
            seq = Box::new(seq.filter(move |value| pre.iter().all(|c| c.holds_for(value))));
        }
        let processors = &request.meta().processors;
        if !processors.is_empty() {
            seq = Box::new(seq.map(move |value| process::apply_all(processors, value)));
        }
        seq = Box::new(seq.filter(move |value| post.iter().all(|c| c.holds_for(value))));

        let cx = FilterContext {
            serializer: self.serializer,
        };
        Ok(request.meta().apply_filters(seq, cx))
    }

    /// The count path: the provider's native count when it is
    /// trustworthy, otherwise select+filter+count.
    pub fn count(&self, request: &'a Request<T>) -> Result<u64> {
        request.validate()?;
        let natively_filtered =
            request.conditions().is_empty() || self.provider.applies_conditions();
        if natively_filtered
            && request.post_filter_conditions().is_empty()
            && !request.meta().affects_count()
        {
            if let Some(native) = self
                .provider
                .count(request)
                .map_err(|e| e.abort(Method::Report, T::NAME))?
            {
                return Ok(native);
            }
        }
        Ok(self.select(request)?.count() as u64)
    }

    /// The insert path: entities from the request body, validated one
    /// by one, then handed to the provider.
    pub fn insert(&self, request: &'a Request<T>) -> Result<u64> {
        request.validate()?;
        let entities = self.entities_from_body(request)?;
        self.provider
            .insert(request, entities)
            .map_err(|e| e.abort(Method::Post, T::NAME))
    }

    /// The update path, with PUT and PATCH semantics.
    ///
    /// PUT: zero matches insert, a single match with an empty body is a
    /// zero-count no-op, otherwise populate and update. PATCH requires
    /// at least one match. Without the unsafe meta-condition a
    /// multi-entity match fails closed.
    pub fn update(&self, request: &'a Request<T>) -> Result<Change> {
        request.validate()?;
        let method = request.method();
        let matched = self.matched_entities(request, method)?;

        match (method, matched.len()) {
            (Method::Put, 0) => {
                return Ok(Change {
                    updated: 0,
                    inserted: self.insert(request)?,
                })
            }
            (Method::Patch, 0) => {
                return Err(Error::NoMatch {
                    resource: T::NAME.to_string(),
                })
            }
            (_, n) if n > 1 && !request.meta().unsafe_enabled => {
                return Err(Error::AmbiguousMatch {
                    resource: T::NAME.to_string(),
                    count: n,
                })
            }
            _ => {}
        }

        let body = match request.body() {
            Some(body) if body.as_object().is_some_and(|o| !o.is_empty()) => body,
            _ if method == Method::Put && matched.len() == 1 => {
                // No updater and nothing to merge: a successful no-op.
                return Ok(Change {
                    updated: 0,
                    inserted: 0,
                });
            }
            Some(body) => body,
            None => {
                return Err(Error::MethodNotAllowed {
                    method,
                    message: "a request body is required".to_string(),
                })
            }
        };

        let populated = matched
            .into_iter()
            .map(|entity| self.populate(entity, body))
            .collect::<Result<Vec<T>>>()?;

        let updated = self
            .provider
            .update(request, populated)
            .map_err(|e| e.abort(method, T::NAME))?;
        Ok(Change {
            updated,
            inserted: 0,
        })
    }

    /// The delete path. Without the unsafe meta-condition a multi-entity
    /// match fails closed.
    pub fn delete(&self, request: &'a Request<T>) -> Result<u64> {
        request.validate()?;
        let matched = self.matched_entities(request, Method::Delete)?;
        match matched.len() {
            0 => Ok(0),
            n if n > 1 && !request.meta().unsafe_enabled => Err(Error::AmbiguousMatch {
                resource: T::NAME.to_string(),
                count: n,
            }),
            _ => self
                .provider
                .delete(request, matched)
                .map_err(|e| e.abort(Method::Delete, T::NAME)),
        }
    }

    /// The condition tier this orchestrator applies in-memory: the
    /// post-filter subset, or everything when the provider translates
    /// nothing.
    fn in_memory_conditions(&self, request: &Request<T>) -> Vec<Condition<T>> {
        if self.provider.applies_conditions() {
            request.post_filter_conditions()
        } else {
            request.conditions().to_vec()
        }
    }

    /// Selects and fully filters the typed source entities of a
    /// mutation.
    pub(crate) fn matched_entities(
        &self,
        request: &Request<T>,
        method: Method,
    ) -> Result<Vec<T>> {
        let in_memory = self.in_memory_conditions(request);
        let entities = self
            .provider
            .select(request)
            .map_err(|e| e.abort(method, T::NAME))?;
        Ok(entities
            .filter(|entity| {
                let value = entity_value(entity);
                in_memory.iter().all(|c| c.holds_for(&value))
            })
            .collect())
    }

    /// Produces the typed entities of a request body, enforcing the
    /// governed input cardinality and the validation hook.
    pub(crate) fn entities_from_body(&self, request: &Request<T>) -> Result<Vec<T>> {
        let body = request.body().ok_or_else(|| Error::MethodNotAllowed {
            method: request.method(),
            message: "a request body is required".to_string(),
        })?;
        let documents = documents_of(body, request)?;
        documents
            .into_iter()
            .map(|doc| self.deserialize_valid(doc))
            .collect()
    }

    /// Deserializes one document and runs it through the validation
    /// hook.
    pub(crate) fn deserialize_valid(&self, document: Value) -> Result<T> {
        let entity: T = serde_json::from_value(document).map_err(|e| {
            Error::syntax(format!(
                "request body does not fit resource '{}': {e}",
                T::NAME
            ))
        })?;
        entity.validate().map_err(|reason| Error::FailedValidation {
            resource: T::NAME.to_string(),
            reason,
        })?;
        Ok(entity)
    }

    /// Merges a body document into an existing entity and re-validates.
    pub(crate) fn populate(&self, entity: T, body: &Value) -> Result<T> {
        let mut value = entity_value(&entity);
        merge(&mut value, body);
        self.deserialize_valid(value)
    }
}

/// Splits a request body into its entity documents, enforcing the
/// request's input cardinality limit before any deserialization.
pub(crate) fn documents_of<T: Resource>(
    body: &Value,
    request: &Request<T>,
) -> Result<Vec<Value>> {
    let documents = match body {
        Value::Array(items) => items.clone(),
        Value::Object(_) => vec![body.clone()],
        other => {
            return Err(Error::syntax(format!(
                "request body must be an object or an array of objects, got {other}"
            )))
        }
    };
    if let Some(limit) = request.input_limit() {
        if documents.len() > limit {
            return Err(Error::InvalidInputCount {
                count: documents.len(),
                limit,
                resource: T::NAME.to_string(),
            });
        }
    }
    Ok(documents)
}

/// The canonical value form of an entity. Serialization of a resource
/// type is infallible for well-formed data; a failure degrades to null
/// rather than panicking.
pub(crate) fn entity_value<T: Resource>(entity: &T) -> Value {
    serde_json::to_value(entity).unwrap_or(Value::Null)
}

/// Deep-merges `patch` into `target`: nested objects merge recursively,
/// everything else is replaced.
pub(crate) fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                let slot = target_map
                    .keys()
                    .find(|k| k.eq_ignore_ascii_case(key))
                    .cloned()
                    .unwrap_or_else(|| key.clone());
                match target_map.get_mut(&slot) {
                    Some(existing) if existing.is_object() && patch_value.is_object() => {
                        merge(existing, patch_value)
                    }
                    _ => {
                        target_map.insert(slot, patch_value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_is_deep_for_objects() {
        let mut target = json!({ "a": { "x": 1, "y": 2 }, "b": 3 });
        merge(&mut target, &json!({ "a": { "y": 9 }, "c": 4 }));
        assert_eq!(target, json!({ "a": { "x": 1, "y": 9 }, "b": 3, "c": 4 }));
    }

    #[test]
    fn merge_corrects_key_casing() {
        let mut target = json!({ "Name": "Alice" });
        merge(&mut target, &json!({ "name": "Bob" }));
        assert_eq!(target, json!({ "Name": "Bob" }));
    }

    #[test]
    fn merge_replaces_scalars() {
        let mut target = json!({ "a": [1, 2] });
        merge(&mut target, &json!({ "a": "replaced" }));
        assert_eq!(target, json!({ "a": "replaced" }));
    }
}

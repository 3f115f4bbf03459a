//! The safe post (upsert-by-key) path.

use serde_json::Value;
use tracing::debug;

use crate::condition::{Condition, Operator};
use crate::error::{Error, Result};
use crate::operations::{documents_of, Operations};
use crate::provider::ResourceProvider;
use crate::request::{Method, Request};
use crate::schema::Resource;
use crate::term::{BindingRule, TermResolver};

/// Update and insert counts reported by a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Change {
    /// Entities updated in place.
    pub updated: u64,
    /// Entities newly inserted.
    pub inserted: u64,
}

impl<'a, T: Resource, P: ResourceProvider<T>> Operations<'a, T, P> {
    /// Upserts a batch of documents by the request's configured key
    /// fields.
    ///
    /// Every document is classified first: a lookup condition set is
    /// built from the key fields with each value taken from the
    /// document, and an inner select runs against it. Zero matches
    /// queue an insert, exactly one queues an in-place update, more
    /// than one fails the entire batch — a multi-match means the
    /// declared key set does not uniquely identify a document, which is
    /// a configuration error that must not silently resolve. Only after
    /// the whole batch classifies cleanly do the updates run, then the
    /// inserts.
    pub fn safe_post(&self, request: &'a Request<T>) -> Result<Change> {
        request.validate()?;
        let keys = request.safe_post_keys();
        if keys.is_empty() {
            return Err(Error::syntax("safe post requires at least one key field"));
        }
        let body = request.body().ok_or_else(|| Error::MethodNotAllowed {
            method: Method::Post,
            message: "a request body is required".to_string(),
        })?;
        let documents = documents_of(body, request)?;

        let resolver = TermResolver::new(self.cache);
        let mut inserts: Vec<Value> = Vec::new();
        let mut updates: Vec<(Value, T)> = Vec::new();

        for document in documents {
            let mut conditions = Vec::with_capacity(keys.len());
            for key in keys {
                let term =
                    resolver.resolve::<T>(key, BindingRule::StaticWithDynamicFallback, &[])?;
                let (value, _) = term.evaluate(&document);
                conditions.push(Condition::new(
                    term,
                    Operator::Equal,
                    value.unwrap_or(Value::Null),
                )?);
            }

            let lookup = Request::<T>::new(Method::Get).with_conditions(conditions);
            let matched = self.matched_entities(&lookup, Method::Post)?;
            match matched.len() {
                0 => inserts.push(document),
                1 => {
                    if let Some(existing) = matched.into_iter().next() {
                        updates.push((document, existing));
                    }
                }
                count => {
                    return Err(Error::AmbiguousMatch {
                        resource: T::NAME.to_string(),
                        count,
                    })
                }
            }
        }

        debug!(
            resource = T::NAME,
            updates = updates.len(),
            inserts = inserts.len(),
            "safe post batch classified"
        );

        let mut change = Change::default();
        if !updates.is_empty() {
            let populated = updates
                .into_iter()
                .map(|(document, existing)| self.populate(existing, &document))
                .collect::<Result<Vec<T>>>()?;
            change.updated = self
                .provider
                .update(request, populated)
                .map_err(|e| e.abort(Method::Post, T::NAME))?;
        }
        if !inserts.is_empty() {
            let entities = inserts
                .into_iter()
                .map(|document| self.deserialize_valid(document))
                .collect::<Result<Vec<T>>>()?;
            change.inserted = self
                .provider
                .insert(request, entities)
                .map_err(|e| e.abort(Method::Post, T::NAME))?;
        }
        Ok(change)
    }
}

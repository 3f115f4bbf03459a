//! Typed requests against a resource.

use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;

use crate::condition::{self, parse_conditions, Condition};
use crate::error::Result;
use crate::filter::MetaConditions;
use crate::process;
use crate::schema::{Resource, TypeCache};
use crate::term::BindingRule;

/// The requested entity operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Select matching entities.
    Get,
    /// Insert entities from the request body (safe post when key fields
    /// are configured).
    Post,
    /// Update matching entities, inserting when nothing matches.
    Put,
    /// Update matching entities; requires at least one match.
    Patch,
    /// Delete matching entities.
    Delete,
    /// Count matching entities.
    Report,
    /// Select and count, discarding the entities.
    Head,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Report => "REPORT",
            Method::Head => "HEAD",
        };
        f.write_str(name)
    }
}

/// One request against a resource: conditions, meta-conditions and an
/// optional body, evaluated by
/// [`Operations`](crate::operations::Operations).
#[derive(Debug, Clone)]
pub struct Request<T: Resource> {
    method: Method,
    conditions: Vec<Condition<T>>,
    meta: MetaConditions,
    body: Option<Value>,
    safe_post_keys: Vec<String>,
    input_limit: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> Request<T> {
    /// Creates an empty request for the given method.
    pub fn new(method: Method) -> Self {
        Request {
            method,
            conditions: Vec::new(),
            meta: MetaConditions::default(),
            body: None,
            safe_post_keys: Vec::new(),
            input_limit: None,
            _marker: PhantomData,
        }
    }

    /// Parses condition and meta-condition text into a request.
    pub fn parse(
        method: Method,
        conditions: &str,
        meta: &str,
        cache: &TypeCache,
    ) -> Result<Self> {
        let request = Request::new(method)
            .with_conditions(parse_conditions::<T>(
                conditions,
                cache,
                BindingRule::StaticWithDynamicFallback,
                &[],
            )?)
            .with_meta(MetaConditions::parse::<T>(meta, cache)?);
        request.validate()?;
        Ok(request)
    }

    /// Replaces the conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Vec<Condition<T>>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Replaces the meta-conditions.
    #[must_use]
    pub fn with_meta(mut self, meta: MetaConditions) -> Self {
        self.meta = meta;
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Configures the key fields that identify documents for safe post.
    #[must_use]
    pub fn with_safe_post_keys(mut self, keys: Vec<String>) -> Self {
        self.safe_post_keys = keys;
        self
    }

    /// Caps how many entities one request body may carry.
    #[must_use]
    pub fn with_input_limit(mut self, limit: usize) -> Self {
        self.input_limit = Some(limit);
        self
    }

    /// The requested method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The parsed conditions (AND semantics).
    pub fn conditions(&self) -> &[Condition<T>] {
        &self.conditions
    }

    /// The meta-conditions.
    pub fn meta(&self) -> &MetaConditions {
        &self.meta
    }

    /// The request body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Key fields for safe post.
    pub fn safe_post_keys(&self) -> &[String] {
        &self.safe_post_keys
    }

    /// Governed maximum input cardinality, if any.
    pub fn input_limit(&self) -> Option<usize> {
        self.input_limit
    }

    /// The storage-translatable condition subset, for providers that
    /// translate predicates natively.
    pub fn translatable_conditions(&self) -> Vec<Condition<T>> {
        condition::partition(&self.conditions).0
    }

    /// The condition subset the orchestrator applies in-memory.
    pub fn post_filter_conditions(&self) -> Vec<Condition<T>> {
        condition::partition(&self.conditions).1
    }

    /// Validates cross-cutting request constraints: every post-filter
    /// condition must survive the configured projection.
    pub fn validate(&self) -> Result<()> {
        let post_keys: Vec<String> = self
            .post_filter_conditions()
            .iter()
            .map(|c| c.term().key())
            .collect();
        process::validate_post_filters(&self.meta.processors, &post_keys, T::NAME)
    }
}

//! Typed predicates parsed from request input.
//!
//! A [`Condition`] is a (term, operator, value) triple. Conditions
//! partition into a storage-translatable subset (queryable term, not
//! marked skip) handed to the provider, and a post-filter subset the
//! orchestrator always applies in-memory after the provider returns.
//! The partition is recomputed per request; it is a correctness
//! requirement, not an optimization, since backing stores are not
//! required to support arbitrary predicates.

mod operator;
mod parser;

pub use operator::Operator;
pub use parser::{parse_conditions, parse_value_literal};

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::Resource;
use crate::term::Term;

/// A single predicate against a resource member.
#[derive(Debug)]
pub struct Condition<T: Resource> {
    term: Arc<Term>,
    operator: Operator,
    value: Value,
    skip: bool,
    _marker: PhantomData<fn() -> T>,
}

// Manual impl: a condition is cloneable regardless of whether the
// resource type is, since `T` only appears under `PhantomData`.
impl<T: Resource> Clone for Condition<T> {
    fn clone(&self) -> Self {
        Condition {
            term: Arc::clone(&self.term),
            operator: self.operator,
            value: self.value.clone(),
            skip: self.skip,
            _marker: PhantomData,
        }
    }
}

impl<T: Resource> Condition<T> {
    /// Creates a condition, validating the operator against the bound
    /// property's kind and against the null literal.
    pub fn new(term: Arc<Term>, operator: Operator, value: Value) -> Result<Self> {
        if value.is_null() && !operator.is_equality() {
            return Err(Error::NullComparison {
                operator: operator.to_string(),
            });
        }
        if let Some(kind) = term.kind() {
            if !operator.permitted_for(kind) {
                return Err(Error::InvalidOperator {
                    condition: format!("{}{}{}", term.key(), operator, value),
                    allowed: Operator::allowed_for(kind),
                });
            }
        }
        Ok(Condition {
            term,
            operator,
            value,
            skip: false,
            _marker: PhantomData,
        })
    }

    /// The member-access path this condition binds to.
    pub fn term(&self) -> &Arc<Term> {
        &self.term
    }

    /// The comparison operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The comparison value. Null means an is-null / is-not-null test.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether this is an `=` or `!=` condition, eligible for
    /// point-lookup optimizations.
    pub fn is_equality(&self) -> bool {
        self.operator.is_equality()
    }

    /// Marks the condition as excluded from storage-native translation.
    /// It stays structurally present and is applied in-memory.
    #[must_use]
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Whether the condition is marked skip.
    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Whether a backing store may translate this condition natively.
    pub fn translatable(&self) -> bool {
        self.term.is_queryable() && !self.skip
    }

    /// Evaluates the condition against an entity value.
    ///
    /// An absent member satisfies `!=` and is-null tests and nothing
    /// else. Ordering comparisons between values of different shapes
    /// are false rather than an error.
    pub fn holds_for(&self, target: &Value) -> bool {
        let (evaluated, _) = self.term.evaluate(target);

        if self.value.is_null() {
            let absent = evaluated.as_ref().is_none_or(Value::is_null);
            return match self.operator {
                Operator::Equal => absent,
                Operator::NotEqual => !absent,
                // Rejected at construction.
                _ => false,
            };
        }

        match evaluated {
            None => self.operator == Operator::NotEqual,
            Some(Value::Null) => self.operator == Operator::NotEqual,
            Some(actual) => match self.operator {
                Operator::Equal => values_equal(&actual, &self.value),
                Operator::NotEqual => !values_equal(&actual, &self.value),
                Operator::Less => matches_order(&actual, &self.value, Ordering::is_lt),
                Operator::Greater => matches_order(&actual, &self.value, Ordering::is_gt),
                Operator::LessOrEqual => matches_order(&actual, &self.value, Ordering::is_le),
                Operator::GreaterOrEqual => matches_order(&actual, &self.value, Ordering::is_ge),
            },
        }
    }
}

/// Splits conditions into the storage-translatable subset and the
/// post-filter remainder, preserving order within each.
pub fn partition<T: Resource>(
    conditions: &[Condition<T>],
) -> (Vec<Condition<T>>, Vec<Condition<T>>) {
    conditions
        .iter()
        .cloned()
        .partition(Condition::translatable)
}

/// Structural equality with numeric widening: integers and floats
/// representing the same number are equal.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx == fy,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Total order over comparable value pairs: numbers numerically,
/// strings lexicographically, booleans false-before-true. Mixed shapes
/// are incomparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn matches_order(a: &Value, b: &Value, test: impl Fn(Ordering) -> bool) -> bool {
    compare_values(a, b).is_some_and(test)
}

//! Stable ordering by a term's value.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;

use crate::condition::compare_values;
use crate::filter::{FilterContext, SequenceFilter, ValueStream};
use crate::term::Term;

/// Stable sort keyed by a term's evaluated value.
///
/// Elements whose key evaluation fails sort with an absent key before
/// everything else rather than aborting the sort; incomparable key
/// pairs keep their original relative order. Memory: O(N) buffering.
#[derive(Debug, Clone)]
pub struct OrderBy {
    term: Arc<Term>,
    descending: bool,
}

impl OrderBy {
    /// Ascending order by the given term.
    pub fn ascending(term: Arc<Term>) -> Self {
        OrderBy {
            term,
            descending: false,
        }
    }

    /// Descending order by the given term.
    pub fn descending(term: Arc<Term>) -> Self {
        OrderBy {
            term,
            descending: true,
        }
    }

    /// The sort key.
    pub fn term(&self) -> &Arc<Term> {
        &self.term
    }

    /// Whether the order is descending.
    pub fn is_descending(&self) -> bool {
        self.descending
    }

    fn compare(&self, a: &Option<Value>, b: &Option<Value>) -> Ordering {
        let ordering = match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl SequenceFilter for OrderBy {
    fn apply<'a>(&'a self, seq: ValueStream<'a>, _cx: FilterContext<'a>) -> ValueStream<'a> {
        let mut keyed: Vec<(Option<Value>, Value)> =
            seq.map(|value| (self.term.evaluate(&value).0, value)).collect();
        keyed.sort_by(|(a, _), (b, _)| self.compare(a, b));
        Box::new(keyed.into_iter().map(|(_, value)| value))
    }
}

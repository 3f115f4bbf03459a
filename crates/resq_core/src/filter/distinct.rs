//! De-duplication by canonical serialized form.

use std::collections::HashSet;

use crate::filter::{FilterContext, SequenceFilter, ValueStream};

/// De-duplicates a sequence by structural equality of each element's
/// canonical serialized form, keeping the first occurrence in place.
///
/// Memory: O(distinct result size) for the dedup set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Distinct;

impl SequenceFilter for Distinct {
    fn apply<'a>(&'a self, seq: ValueStream<'a>, cx: FilterContext<'a>) -> ValueStream<'a> {
        let mut seen = HashSet::new();
        Box::new(seq.filter(move |value| seen.insert(cx.serializer.canonical(value))))
    }
}

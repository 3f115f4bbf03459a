//! Capping the sequence length.

use crate::filter::{FilterContext, SequenceFilter, ValueStream};

/// Caps a sequence to at most this many elements.
///
/// [`Limit::NONE`] is the no-limit sentinel and passes every element
/// through unchanged. Memory: O(1) streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub i64);

impl Limit {
    /// Sentinel meaning "no limit".
    pub const NONE: i64 = -1;
}

impl Default for Limit {
    fn default() -> Self {
        Limit(Limit::NONE)
    }
}

impl SequenceFilter for Limit {
    fn apply<'a>(&'a self, seq: ValueStream<'a>, _cx: FilterContext<'a>) -> ValueStream<'a> {
        match self.0 {
            Limit::NONE => seq,
            n => Box::new(seq.take(n.max(0) as usize)),
        }
    }
}

//! Skipping leading (or keeping trailing) elements.

use std::collections::VecDeque;

use serde_json::Value;

use crate::filter::{FilterContext, SequenceFilter, ValueStream};

/// Skips elements off the front of a sequence.
///
/// Zero is the identity. A positive value skips that many leading
/// elements in O(1) memory. A negative value `-N` yields the last `N`
/// elements in original order through a bounded sliding queue — one
/// pass, O(N) memory, never a full materialization. `i64::MAX` and
/// `i64::MIN` are guard values that yield nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset(pub i64);

impl SequenceFilter for Offset {
    fn apply<'a>(&'a self, seq: ValueStream<'a>, _cx: FilterContext<'a>) -> ValueStream<'a> {
        match self.0 {
            0 => seq,
            i64::MAX | i64::MIN => Box::new(std::iter::empty()),
            n if n > 0 => Box::new(seq.skip(n as usize)),
            n => Box::new(Tail {
                source: Some(seq),
                keep: n.unsigned_abs() as usize,
                buffer: VecDeque::new(),
            }),
        }
    }
}

/// Lazy last-N adapter: drains its source into a bounded queue on the
/// first `next` call, then yields the queue.
struct Tail<'a> {
    source: Option<ValueStream<'a>>,
    keep: usize,
    buffer: VecDeque<Value>,
}

impl Iterator for Tail<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        if let Some(source) = self.source.take() {
            for item in source {
                if self.buffer.len() == self.keep {
                    self.buffer.pop_front();
                }
                self.buffer.push_back(item);
            }
        }
        self.buffer.pop_front()
    }
}

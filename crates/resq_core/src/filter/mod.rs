//! Meta-conditions and the filter chain.
//!
//! The chain applies in a fixed order, each stage optional:
//! Distinct → Search → OrderBy → Offset → Limit. Distinct runs before
//! ordering and paging so duplicates never count toward a limit; Search
//! narrows before ordering so discarded rows are never sorted; Offset
//! runs before Limit so skip-then-take composes as a sliding window.

mod distinct;
mod limit;
mod offset;
mod order_by;
mod search;

pub use distinct::Distinct;
pub use limit::Limit;
pub use offset::Offset;
pub use order_by::OrderBy;
pub use search::Search;

use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};
use crate::process::Processor;
use crate::schema::{Resource, TypeCache};
use crate::serialize::CanonicalSerializer;
use crate::term::{BindingRule, TermResolver};

/// A lazily evaluated sequence of entity values.
pub type ValueStream<'a> = Box<dyn Iterator<Item = Value> + 'a>;

/// Shared collaborators available to every filter stage.
#[derive(Clone, Copy)]
pub struct FilterContext<'a> {
    /// Canonical serializer used by Distinct and whole-object Search.
    pub serializer: &'a dyn CanonicalSerializer,
}

/// The common contract of every filter stage: transform one lazily
/// evaluated sequence into another.
pub trait SequenceFilter {
    /// Applies this stage to a sequence.
    fn apply<'a>(&'a self, seq: ValueStream<'a>, cx: FilterContext<'a>) -> ValueStream<'a>;
}

/// Request-level directives controlling result shaping.
#[derive(Debug, Clone, Default)]
pub struct MetaConditions {
    /// Opts into bulk mutation: update/delete may touch several
    /// entities. Without it, a multi-entity match fails closed.
    pub unsafe_enabled: bool,
    /// De-duplicate by canonical serialized form.
    pub distinct: bool,
    /// Substring search, whole-object or scoped to one term
    /// (`search_key=key:pattern`).
    pub search: Option<Search>,
    /// Stable sort by a term's value.
    pub order_by: Option<OrderBy>,
    /// Skip leading elements (negative: keep trailing).
    pub offset: Offset,
    /// Cap the sequence length.
    pub limit: Limit,
    /// Result-shaping processors (projection).
    pub processors: Vec<Processor>,
}

impl MetaConditions {
    /// Parses `key=value&...` meta-condition text. Keys are
    /// case-insensitive; an unknown key is a syntax error.
    pub fn parse<T: Resource>(input: &str, cache: &TypeCache) -> Result<MetaConditions> {
        let mut meta = MetaConditions::default();
        let input = input.trim();
        if input.is_empty() {
            return Ok(meta);
        }

        let resolver = TermResolver::new(cache);
        let resolve = |key: &str| {
            resolver.resolve::<T>(key, BindingRule::StaticWithDynamicFallback, &[])
        };

        for token in input.split('&') {
            let (key, value) = token.split_once('=').ok_or_else(|| {
                Error::syntax(format!("malformed meta-condition '{token}', expected key=value"))
            })?;

            match key.trim().to_ascii_lowercase().as_str() {
                "unsafe" => meta.unsafe_enabled = parse_flag(key, value)?,
                "distinct" => meta.distinct = parse_flag(key, value)?,
                "search" => meta.search = Some(Search::new(value)),
                "search_case" => meta.search = Some(Search::case_sensitive(value)),
                "search_key" => {
                    let (term_key, pattern) = value.split_once(':').ok_or_else(|| {
                        Error::syntax(format!(
                            "malformed search_key '{value}', expected key:pattern"
                        ))
                    })?;
                    meta.search =
                        Some(Search::new(pattern).scoped(resolve(term_key.trim())?));
                }
                "order_asc" => meta.order_by = Some(OrderBy::ascending(resolve(value)?)),
                "order_desc" => meta.order_by = Some(OrderBy::descending(resolve(value)?)),
                "offset" => meta.offset = Offset(parse_int(key, value)?),
                "limit" => {
                    let limit = parse_int(key, value)?;
                    if limit < Limit::NONE {
                        return Err(Error::syntax(format!(
                            "limit must be non-negative or {} for no limit, got {limit}",
                            Limit::NONE
                        )));
                    }
                    meta.limit = Limit(limit);
                }
                "select" => meta.processors.push(Processor::parse_select(
                    value, &resolve,
                )?),
                "add" => meta.processors.push(Processor::parse_add(value, &resolve)?),
                "rename" => meta
                    .processors
                    .push(Processor::parse_rename(value, &resolve)?),
                unknown => {
                    return Err(Error::syntax(format!(
                        "unknown meta-condition '{unknown}'"
                    )))
                }
            }
        }

        Ok(meta)
    }

    /// Whether any configured stage can change the cardinality of the
    /// result, which disqualifies a provider's native count.
    pub fn affects_count(&self) -> bool {
        self.distinct
            || self.search.is_some()
            || self.offset.0 != 0
            || self.limit.0 != Limit::NONE
            || !self.processors.is_empty()
    }

    /// Applies the filter chain in its fixed order.
    pub fn apply_filters<'a>(
        &'a self,
        mut seq: ValueStream<'a>,
        cx: FilterContext<'a>,
    ) -> ValueStream<'a> {
        trace!(
            distinct = self.distinct,
            search = self.search.is_some(),
            order_by = self.order_by.is_some(),
            offset = self.offset.0,
            limit = self.limit.0,
            "applying filter chain"
        );
        if self.distinct {
            seq = Distinct.apply(seq, cx);
        }
        if let Some(search) = &self.search {
            seq = search.apply(seq, cx);
        }
        if let Some(order_by) = &self.order_by {
            seq = order_by.apply(seq, cx);
        }
        seq = self.offset.apply(seq, cx);
        self.limit.apply(seq, cx)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(Error::syntax(format!(
            "expected true or false for '{key}', got '{other}'"
        ))),
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value.trim().parse().map_err(|_| {
        Error::syntax(format!("expected an integer for '{key}', got '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Member, ValueKind};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Person {
        name: String,
        age: i64,
    }

    impl Resource for Person {
        const NAME: &'static str = "Person";

        fn members() -> Vec<Member> {
            vec![
                Member::new("Name", ValueKind::String),
                Member::new("Age", ValueKind::Int),
            ]
        }
    }

    fn parse(input: &str) -> Result<MetaConditions> {
        let cache = TypeCache::new();
        MetaConditions::parse::<Person>(input, &cache)
    }

    #[test]
    fn parses_full_meta_string() {
        let meta = parse("unsafe=true&distinct=true&order_desc=age&offset=2&limit=10").unwrap();
        assert!(meta.unsafe_enabled);
        assert!(meta.distinct);
        assert_eq!(meta.offset.0, 2);
        assert_eq!(meta.limit.0, 10);
        let order_by = meta.order_by.unwrap();
        assert_eq!(order_by.term().key(), "Age");
        assert!(order_by.is_descending());
    }

    #[test]
    fn search_key_scopes_to_one_term() {
        let serializer = crate::serialize::JsonCanonicalizer;
        let cx = FilterContext {
            serializer: &serializer,
        };
        let meta = parse("search_key=name:ann").unwrap();
        let result: Vec<Value> = meta
            .search
            .unwrap()
            .apply(Box::new(people().into_iter()), cx)
            .collect();
        // "ann" appears only in the Name of the two Ann rows; a
        // whole-object search would also have to scan ages.
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|v| v["Name"] == "Ann"));
    }

    #[test]
    fn search_key_without_pattern_is_syntax_error() {
        assert!(matches!(parse("search_key=name"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn unknown_key_is_syntax_error() {
        assert!(matches!(parse("frobnicate=1"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn limit_below_sentinel_rejected() {
        assert!(matches!(parse("limit=-2"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn empty_input_is_default() {
        let meta = parse("").unwrap();
        assert!(!meta.affects_count());
        assert!(!meta.unsafe_enabled);
    }

    #[test]
    fn count_affected_by_limit() {
        assert!(parse("limit=3").unwrap().affects_count());
        assert!(parse("search=x").unwrap().affects_count());
        assert!(!parse("order_asc=age").unwrap().affects_count());
    }

    fn people() -> Vec<Value> {
        vec![
            json!({ "Name": "Ann", "Age": 35 }),
            json!({ "Name": "Bob", "Age": 25 }),
            json!({ "Name": "Ann", "Age": 35 }),
            json!({ "Name": "Cal", "Age": 45 }),
            json!({ "Name": "Dee", "Age": 30 }),
        ]
    }

    fn run(meta: &MetaConditions, input: Vec<Value>) -> Vec<Value> {
        let serializer = crate::serialize::JsonCanonicalizer;
        let cx = FilterContext {
            serializer: &serializer,
        };
        meta.apply_filters(Box::new(input.into_iter()), cx).collect()
    }

    #[test]
    fn chain_applies_in_fixed_order() {
        let meta = parse("distinct=true&order_asc=age&offset=1&limit=2").unwrap();
        let result = run(&meta, people());
        // Distinct drops the duplicate Ann, order sorts by age
        // (25, 30, 35, 45), offset skips 25, limit keeps 30 and 35.
        assert_eq!(
            result,
            vec![
                json!({ "Name": "Dee", "Age": 30 }),
                json!({ "Name": "Ann", "Age": 35 }),
            ]
        );
    }

    #[test]
    fn reordering_limit_before_offset_would_differ() {
        // Guards the Offset-before-Limit contract: the chain yields a
        // sliding window, not a bounded-then-skipped window.
        let meta = parse("offset=3&limit=2").unwrap();
        let result = run(&meta, people());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["Name"], "Cal");
        // Limit-then-offset would have capped the sequence to the first
        // two rows and then skipped past both, yielding nothing.
    }
}

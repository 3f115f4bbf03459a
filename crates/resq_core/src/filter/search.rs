//! Substring search over entities.

use std::sync::Arc;

use serde_json::Value;

use crate::filter::{FilterContext, SequenceFilter, ValueStream};
use crate::term::Term;

/// Keeps elements whose canonical serialized form (or one term's
/// resolved value, when a selector is set) contains a pattern.
#[derive(Debug, Clone)]
pub struct Search {
    pattern: String,
    case_sensitive: bool,
    selector: Option<Arc<Term>>,
}

impl Search {
    /// Case-insensitive whole-object search.
    pub fn new(pattern: impl Into<String>) -> Self {
        Search {
            pattern: pattern.into(),
            case_sensitive: false,
            selector: None,
        }
    }

    /// Case-sensitive whole-object search.
    pub fn case_sensitive(pattern: impl Into<String>) -> Self {
        Search {
            pattern: pattern.into(),
            case_sensitive: true,
            selector: None,
        }
    }

    /// Restricts the search to one term's resolved value.
    #[must_use]
    pub fn scoped(mut self, term: Arc<Term>) -> Self {
        self.selector = Some(term);
        self
    }

    fn haystack(&self, value: &Value, cx: FilterContext<'_>) -> String {
        match &self.selector {
            Some(term) => match term.evaluate(value).0 {
                Some(Value::String(text)) => text,
                Some(other) => cx.serializer.canonical(&other),
                None => String::new(),
            },
            None => cx.serializer.canonical(value),
        }
    }
}

impl SequenceFilter for Search {
    fn apply<'a>(&'a self, seq: ValueStream<'a>, cx: FilterContext<'a>) -> ValueStream<'a> {
        if self.pattern.is_empty() {
            return seq;
        }
        Box::new(seq.filter(move |value| {
            let haystack = self.haystack(value, cx);
            if self.case_sensitive {
                haystack.contains(&self.pattern)
            } else {
                haystack
                    .to_lowercase()
                    .contains(&self.pattern.to_lowercase())
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::JsonCanonicalizer;
    use crate::term::Property;
    use serde_json::json;

    fn apply(search: &Search, input: Vec<Value>) -> Vec<Value> {
        let serializer = JsonCanonicalizer;
        let cx = FilterContext {
            serializer: &serializer,
        };
        search.apply(Box::new(input.into_iter()), cx).collect()
    }

    #[test]
    fn whole_object_case_insensitive() {
        let result = apply(
            &Search::new("ALICE"),
            vec![json!({ "Name": "Alice" }), json!({ "Name": "Bob" })],
        );
        assert_eq!(result, vec![json!({ "Name": "Alice" })]);
    }

    #[test]
    fn case_sensitive_misses_wrong_case() {
        let result = apply(
            &Search::case_sensitive("ALICE"),
            vec![json!({ "Name": "Alice" })],
        );
        assert!(result.is_empty());
    }

    #[test]
    fn scoped_search_ignores_other_members() {
        let term = Arc::new(Term::new(vec![Property::dynamic("Name")]));
        let result = apply(
            &Search::new("bob").scoped(term),
            vec![
                json!({ "Name": "Alice", "Bio": "likes bob" }),
                json!({ "Name": "Bobby" }),
            ],
        );
        assert_eq!(result, vec![json!({ "Name": "Bobby" })]);
    }

    #[test]
    fn empty_pattern_passes_everything() {
        let input = vec![json!(1), json!(2)];
        assert_eq!(apply(&Search::new(""), input.clone()), input);
    }
}

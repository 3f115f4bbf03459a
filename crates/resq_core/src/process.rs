//! Result-shaping processors.
//!
//! Processors reshape entity values before post-filtering and the
//! filter chain: `Select` keeps only the listed members, `Add` appends
//! computed term values, `Rename` renames output keys. When any
//! processor is configured, post-filter conditions are evaluated
//! against the projected shape, so a condition whose member does not
//! survive projection is rejected at request construction.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::term::Term;

/// One result-shaping operation.
#[derive(Debug, Clone)]
pub enum Processor {
    /// Keep only the listed terms' values, keyed by their actual keys.
    Select(Vec<Arc<Term>>),
    /// Add each term's evaluated value under its actual key.
    Add(Vec<Arc<Term>>),
    /// Rename output keys: (source term, new name) pairs.
    Rename(Vec<(Arc<Term>, String)>),
}

impl Processor {
    /// Parses a comma-separated key list into a `Select` processor.
    pub fn parse_select(
        input: &str,
        resolve: &dyn Fn(&str) -> Result<Arc<Term>>,
    ) -> Result<Processor> {
        Ok(Processor::Select(parse_terms(input, resolve)?))
    }

    /// Parses a comma-separated key list into an `Add` processor.
    pub fn parse_add(
        input: &str,
        resolve: &dyn Fn(&str) -> Result<Arc<Term>>,
    ) -> Result<Processor> {
        Ok(Processor::Add(parse_terms(input, resolve)?))
    }

    /// Parses comma-separated `old->new` pairs into a `Rename`
    /// processor.
    pub fn parse_rename(
        input: &str,
        resolve: &dyn Fn(&str) -> Result<Arc<Term>>,
    ) -> Result<Processor> {
        let mut pairs = Vec::new();
        for token in input.split(',') {
            let (from, to) = token.split_once("->").ok_or_else(|| {
                Error::syntax(format!("malformed rename '{token}', expected old->new"))
            })?;
            let to = to.trim();
            if to.is_empty() {
                return Err(Error::syntax(format!("empty rename target in '{token}'")));
            }
            pairs.push((resolve(from.trim())?, to.to_string()));
        }
        Ok(Processor::Rename(pairs))
    }

    /// Applies this processor to one entity value. Non-object values
    /// pass through unchanged.
    pub fn apply(&self, value: Value) -> Value {
        let mut map = match value {
            Value::Object(map) => map,
            other => return other,
        };
        match self {
            Processor::Select(terms) => {
                let source = Value::Object(map);
                let mut out = Map::new();
                for term in terms {
                    let (evaluated, actual_key) = term.evaluate(&source);
                    out.insert(actual_key, evaluated.unwrap_or(Value::Null));
                }
                Value::Object(out)
            }
            Processor::Add(terms) => {
                for term in terms {
                    let (evaluated, actual_key) = term.evaluate(&Value::Object(map.clone()));
                    map.insert(actual_key, evaluated.unwrap_or(Value::Null));
                }
                Value::Object(map)
            }
            Processor::Rename(pairs) => {
                for (term, new_name) in pairs {
                    let source = term.key();
                    let actual = map
                        .keys()
                        .find(|k| k.eq_ignore_ascii_case(&source))
                        .cloned();
                    if let Some(actual) = actual {
                        if let Some(moved) = map.remove(&actual) {
                            map.insert(new_name.clone(), moved);
                        }
                    }
                }
                Value::Object(map)
            }
        }
    }
}

/// Applies a processor list in order.
pub fn apply_all(processors: &[Processor], value: Value) -> Value {
    processors
        .iter()
        .fold(value, |acc, processor| processor.apply(acc))
}

/// Whether a member survives the given processor list, i.e. whether a
/// post-filter condition on it can be evaluated against the projected
/// output.
///
/// Survival requires the condition's full key to match an output key,
/// not merely share a first segment: `Select` flattens nested terms
/// into literal dotted keys, so `select=Meta.kind` keeps `Meta.kind`
/// addressable but neither `Meta` nor `Meta.other`.
pub fn survives(processors: &[Processor], member_key: &str) -> bool {
    let mut present = true;

    for processor in processors {
        match processor {
            Processor::Select(terms) => {
                present = terms.iter().any(|t| covers(&t.key(), member_key));
            }
            Processor::Add(terms) => {
                if terms.iter().any(|t| covers(&t.key(), member_key)) {
                    present = true;
                }
            }
            Processor::Rename(pairs) => {
                for (term, new_name) in pairs {
                    if covers(&term.key(), member_key) {
                        present = false;
                    }
                    if covers(new_name, member_key) {
                        present = true;
                    }
                }
            }
        }
    }

    present
}

/// Rejects post-filter conditions whose members projection removes.
pub fn validate_post_filters(
    processors: &[Processor],
    post_filter_keys: &[String],
    resource: &str,
) -> Result<()> {
    if processors.is_empty() {
        return Ok(());
    }
    for key in post_filter_keys {
        if !survives(processors, key) {
            return Err(Error::PostFilterUnresolvable {
                member: key.clone(),
                resource: resource.to_string(),
            });
        }
    }
    Ok(())
}

fn parse_terms(
    input: &str,
    resolve: &dyn Fn(&str) -> Result<Arc<Term>>,
) -> Result<Vec<Arc<Term>>> {
    input.split(',').map(|key| resolve(key.trim())).collect()
}

/// Whether an output key makes `member_key` addressable: either the
/// keys are equal, or the output key is a whole-segment prefix of the
/// member's path (keeping an object keeps everything beneath it).
/// Case-insensitive, like member lookup everywhere else.
fn covers(output_key: &str, member_key: &str) -> bool {
    if output_key.eq_ignore_ascii_case(member_key) {
        return true;
    }
    member_key.len() > output_key.len()
        && member_key.as_bytes()[output_key.len()] == b'.'
        && member_key[..output_key.len()].eq_ignore_ascii_case(output_key)
}

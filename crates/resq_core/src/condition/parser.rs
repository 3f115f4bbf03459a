//! Condition parsing from URI text.

use serde_json::Value;

use crate::condition::{Condition, Operator};
use crate::error::{Error, Result};
use crate::schema::{Resource, TypeCache, ValueKind};
use crate::term::{BindingRule, TermResolver};

/// Parses `&`-joined `key<op>value` tokens into conditions with AND
/// semantics.
///
/// Term keys resolve against `T`'s members under the given binding
/// rule; value literals are coerced to the bound property's declared
/// kind when the term is static, best-effort otherwise. An empty input
/// yields no conditions.
pub fn parse_conditions<T: Resource>(
    input: &str,
    cache: &TypeCache,
    rule: BindingRule,
    dynamic_domain: &[String],
) -> Result<Vec<Condition<T>>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let resolver = TermResolver::new(cache);
    let mut conditions = Vec::new();

    for token in input.split('&') {
        let (key, operator, literal) = tokenize(token)?;
        let term = resolver.resolve::<T>(key, rule, dynamic_domain)?;
        let value = parse_value_literal(literal, term.kind(), &term.key())?;
        conditions.push(Condition::new(term, operator, value)?);
    }

    Ok(conditions)
}

/// Splits one condition token into (key, operator, value literal).
fn tokenize(token: &str) -> Result<(&str, Operator, &str)> {
    let bytes = token.as_bytes();
    let split = bytes
        .iter()
        .position(|b| matches!(b, b'=' | b'<' | b'>' | b'!'))
        .ok_or_else(|| Error::InvalidOperator {
            condition: token.to_string(),
            allowed: Operator::allowed_for(ValueKind::Any),
        })?;

    let op_len = match bytes[split] {
        b'!' | b'<' | b'>' if bytes.get(split + 1) == Some(&b'=') => 2,
        _ => 1,
    };

    let op_token = &token[split..split + op_len];
    let operator = Operator::from_token(op_token).ok_or_else(|| Error::InvalidOperator {
        condition: token.to_string(),
        allowed: Operator::allowed_for(ValueKind::Any),
    })?;

    let key = token[..split].trim();
    if key.is_empty() {
        return Err(Error::syntax(format!("missing key in condition '{token}'")));
    }

    Ok((key, operator, token[split + op_len..].trim()))
}

/// Parses a value literal, coercing it to `kind` when one is declared.
///
/// The literal `null` is the absence sentinel regardless of kind.
pub fn parse_value_literal(
    literal: &str,
    kind: Option<ValueKind>,
    member: &str,
) -> Result<Value> {
    if literal.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }

    let fail = || Error::InvalidValueLiteral {
        literal: literal.to_string(),
        expected: kind.unwrap_or(ValueKind::Any).name().to_string(),
        member: member.to_string(),
    };

    match kind {
        Some(ValueKind::Bool) => parse_bool(literal).ok_or_else(fail),
        Some(ValueKind::Int) => literal
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| fail()),
        Some(ValueKind::Float) => literal
            .parse::<f64>()
            .ok()
            .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
            .ok_or_else(fail),
        Some(ValueKind::String) => Ok(Value::String(unquote(literal).to_string())),
        Some(ValueKind::Array) | Some(ValueKind::Object) => {
            serde_json::from_str(literal).map_err(|_| fail())
        }
        Some(ValueKind::Any) | None => Ok(best_effort(literal)),
    }
}

fn parse_bool(literal: &str) -> Option<Value> {
    if literal.eq_ignore_ascii_case("true") {
        Some(Value::Bool(true))
    } else if literal.eq_ignore_ascii_case("false") {
        Some(Value::Bool(false))
    } else {
        None
    }
}

/// Untyped literal parsing: booleans, integers and floats first, a
/// quoted literal always means string, anything else is a bare string.
fn best_effort(literal: &str) -> Value {
    if literal.len() >= 2 && literal.starts_with('"') && literal.ends_with('"') {
        return Value::String(unquote(literal).to_string());
    }
    if let Some(b) = parse_bool(literal) {
        return b;
    }
    if let Ok(i) = literal.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = literal.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(literal.to_string())
}

fn unquote(literal: &str) -> &str {
    if literal.len() >= 2 && literal.starts_with('"') && literal.ends_with('"') {
        &literal[1..literal.len() - 1]
    } else {
        literal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Member;
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

    fn parse(input: &str) -> Result<Vec<Condition<Person>>> {
        let cache = TypeCache::new();
        parse_conditions::<Person>(
            input,
            &cache,
            BindingRule::StaticWithDynamicFallback,
            &[],
        )
    }

    #[test]
    fn parses_and_joined_conditions() {
        let conditions = parse("Age>30&Name=John").unwrap();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].term().key(), "Age");
        assert_eq!(conditions[0].operator(), Operator::Greater);
        assert_eq!(conditions[0].value(), &json!(30));
        assert_eq!(conditions[1].term().key(), "Name");
        assert_eq!(conditions[1].value(), &json!("John"));
    }

    #[test]
    fn two_char_operators() {
        let conditions = parse("age<=40&age>=20&name!=John").unwrap();
        assert_eq!(conditions[0].operator(), Operator::LessOrEqual);
        assert_eq!(conditions[1].operator(), Operator::GreaterOrEqual);
        assert_eq!(conditions[2].operator(), Operator::NotEqual);
    }

    #[test]
    fn unknown_operator_names_condition_and_allowed_set() {
        let err = parse("Age~30").unwrap_err();
        match err {
            Error::InvalidOperator { condition, allowed } => {
                assert_eq!(condition, "Age~30");
                assert!(allowed.contains(">="));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_key_is_syntax_error() {
        assert!(matches!(parse("=John"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn int_literal_coerced_by_declared_kind() {
        let err = parse("Age=abc").unwrap_err();
        assert!(matches!(err, Error::InvalidValueLiteral { .. }));
    }

    #[test]
    fn null_literal_passes_for_equality() {
        let conditions = parse("Name=null").unwrap();
        assert!(conditions[0].value().is_null());
    }

    #[test]
    fn null_literal_with_ordering_rejected() {
        let err = parse("Age>null").unwrap_err();
        assert!(matches!(err, Error::NullComparison { .. }));
    }

    #[test]
    fn quoted_string_preserved_verbatim() {
        let conditions = parse(r#"Name="30""#).unwrap();
        assert_eq!(conditions[0].value(), &json!("30"));
    }

    #[test]
    fn dynamic_member_literal_is_best_effort() {
        let conditions = parse("score=4.5").unwrap();
        assert_eq!(conditions[0].value(), &json!(4.5));
    }

    #[test]
    fn empty_input_yields_no_conditions() {
        assert!(parse("").unwrap().is_empty());
    }
}

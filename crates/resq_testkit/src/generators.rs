//! Property-based test generators using proptest.

use proptest::prelude::*;
use serde_json::Value;

use crate::fixtures::Person;

/// Strategy for short member-like names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{1,8}").expect("invalid regex")
}

/// Strategy for random people with small ids and ages.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (0..1000i64, name_strategy(), 0..120i64).prop_map(|(id, name, age)| Person::new(id, &name, age))
}

/// Strategy for sequences of scalar JSON values, used to exercise the
/// filter chain laws.
pub fn scalar_sequence_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
        ],
        0..32,
    )
}

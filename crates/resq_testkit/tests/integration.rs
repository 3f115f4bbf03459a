//! End-to-end scenarios through the full pipeline: parsing, the
//! orchestrator, the memory provider and the filter chain.

use serde_json::{json, Value};

use resq_core::{
    Error, JsonCanonicalizer, Method, Operations, Outcome, Request, TypeCache,
};
use resq_testkit::{people, Document, MemoryProvider, Person};

fn person_store() -> MemoryProvider<Person> {
    MemoryProvider::with_rows(Person::key, people())
}

fn get(conditions: &str, meta: &str) -> Request<Person> {
    let cache = TypeCache::new();
    Request::parse(Method::Get, conditions, meta, &cache).unwrap()
}

fn request(method: Method, conditions: &str, meta: &str) -> Request<Person> {
    let cache = TypeCache::new();
    Request::parse(method, conditions, meta, &cache).unwrap()
}

fn evaluate(provider: &MemoryProvider<Person>, req: &Request<Person>) -> Result<Outcome, Error> {
    let cache = TypeCache::new();
    let serializer = JsonCanonicalizer;
    Operations::new(provider, &cache, &serializer).evaluate(req)
}

fn names(outcome: &Outcome) -> Vec<String> {
    match outcome {
        Outcome::Entities(values) => values
            .iter()
            .map(|v| v["Name"].as_str().unwrap_or_default().to_string())
            .collect(),
        other => panic!("expected entities, got {other:?}"),
    }
}

#[test]
fn select_with_conditions_and_limit() {
    let provider = person_store();

    let req = get("Age>30&Name=John", "");
    let outcome = evaluate(&provider, &req).unwrap();
    match &outcome {
        Outcome::Entities(values) => {
            assert_eq!(values.len(), 2);
            assert_eq!(values[0]["Id"], json!(1));
            assert_eq!(values[1]["Id"], json!(2));
        }
        other => panic!("expected entities, got {other:?}"),
    }

    let limited = get("Age>30&Name=John", "limit=1");
    let outcome = evaluate(&provider, &limited).unwrap();
    match outcome {
        Outcome::Entities(values) => {
            assert_eq!(values.len(), 1);
            assert_eq!(values[0]["Id"], json!(1));
        }
        other => panic!("expected entities, got {other:?}"),
    }
}

#[test]
fn apply_none_provider_gets_the_same_results() {
    let provider = MemoryProvider::with_rows(Person::key, people()).apply_none();
    let outcome = evaluate(&provider, &get("Age>30&Name=John", "")).unwrap();
    assert_eq!(names(&outcome), vec!["John", "John"]);
}

#[test]
fn null_condition_selects_absent_members() {
    let provider = person_store();

    let missing = evaluate(&provider, &get("Email=null", "")).unwrap();
    assert_eq!(names(&missing), vec!["John", "John", "Alice"]);

    let present = evaluate(&provider, &get("Email!=null", "")).unwrap();
    assert_eq!(names(&present), vec!["John", "Jane"]);
}

#[test]
fn case_insensitive_keys_and_dynamic_fallback() {
    let provider = person_store();
    let outcome = evaluate(&provider, &get("aGe>30&nAmE=John", "")).unwrap();
    assert_eq!(names(&outcome).len(), 2);
}

#[test]
fn order_and_offset_compose_as_a_sliding_window() {
    let provider = person_store();
    let req = get("", "order_desc=Age&offset=1&limit=2");
    let outcome = evaluate(&provider, &req).unwrap();
    // Ages sorted descending: 45, 40, 35, 31, 25. Skip one, take two.
    match outcome {
        Outcome::Entities(values) => {
            assert_eq!(values[0]["Age"], json!(40));
            assert_eq!(values[1]["Age"], json!(35));
        }
        other => panic!("expected entities, got {other:?}"),
    }
}

#[test]
fn negative_offset_keeps_the_tail() {
    let provider = person_store();
    let outcome = evaluate(&provider, &get("", "order_asc=Id&offset=-2")).unwrap();
    match outcome {
        Outcome::Entities(values) => {
            assert_eq!(values.len(), 2);
            assert_eq!(values[0]["Id"], json!(4));
            assert_eq!(values[1]["Id"], json!(5));
        }
        other => panic!("expected entities, got {other:?}"),
    }
}

#[test]
fn search_narrows_by_canonical_form() {
    let provider = person_store();
    let outcome = evaluate(&provider, &get("", "search=example.com")).unwrap();
    assert_eq!(names(&outcome), vec!["John", "Jane"]);
}

#[test]
fn projection_selects_members() {
    let provider = person_store();
    let outcome = evaluate(&provider, &get("Age>40", "select=Name,Age")).unwrap();
    match outcome {
        Outcome::Entities(values) => {
            assert_eq!(values, vec![json!({ "Age": 45, "Name": "John" })]);
        }
        other => panic!("expected entities, got {other:?}"),
    }
}

#[test]
fn post_filter_on_projected_away_member_is_rejected_upfront() {
    let cache = TypeCache::new();
    let err =
        Request::<Person>::parse(Method::Get, "nickname=JJ", "select=Name", &cache).unwrap_err();
    assert!(matches!(err, Error::PostFilterUnresolvable { .. }));
}

#[test]
fn flattened_projection_keeps_nested_condition_addressable() {
    let docs = vec![
        Document::of(&[("id", json!(1)), ("Meta", json!({ "kind": "post" }))]),
        Document::of(&[("id", json!(2)), ("Meta", json!({ "kind": "page" }))]),
    ];
    let provider = MemoryProvider::with_rows(Document::key, docs);
    let cache = TypeCache::new();
    let req =
        Request::<Document>::parse(Method::Get, "Meta.kind=post", "select=Meta.kind", &cache)
            .unwrap();
    let serializer = JsonCanonicalizer;
    let outcome = Operations::new(&provider, &cache, &serializer)
        .evaluate(&req)
        .unwrap();
    match outcome {
        Outcome::Entities(values) => {
            assert_eq!(values, vec![json!({ "Meta.kind": "post" })]);
        }
        other => panic!("expected entities, got {other:?}"),
    }
}

#[test]
fn projection_narrower_than_a_nested_condition_is_rejected() {
    let cache = TypeCache::new();
    let err = Request::<Document>::parse(Method::Get, "Meta=x", "select=Meta.kind", &cache)
        .unwrap_err();
    assert!(matches!(err, Error::PostFilterUnresolvable { .. }));
}

#[test]
fn search_scoped_to_a_member_ignores_the_rest() {
    let provider = person_store();
    // "john" appears in three Names but in only one Email; the scoped
    // search must match the single row with that email.
    let outcome = evaluate(&provider, &get("", "search_key=Email:john")).unwrap();
    match outcome {
        Outcome::Entities(values) => {
            assert_eq!(values.len(), 1);
            assert_eq!(values[0]["Id"], json!(1));
        }
        other => panic!("expected entities, got {other:?}"),
    }
}

#[test]
fn update_without_unsafe_fails_closed() {
    let provider = person_store();
    let req = request(Method::Patch, "Name=John&Age>30", "").with_body(json!({ "Age": 50 }));
    let err = evaluate(&provider, &req).unwrap_err();
    match err {
        Error::AmbiguousMatch { count, .. } => assert_eq!(count, 2),
        other => panic!("unexpected error: {other}"),
    }
    // Fails closed: nothing was mutated.
    assert_eq!(provider.rows(), people());
}

#[test]
fn update_with_unsafe_mutates_every_match() {
    let provider = person_store();
    let req = request(Method::Patch, "Name=John&Age>30", "unsafe=true")
        .with_body(json!({ "Age": 50 }));
    match evaluate(&provider, &req).unwrap() {
        Outcome::Changed(change) => assert_eq!(change.updated, 2),
        other => panic!("expected change, got {other:?}"),
    }
    let aged: Vec<i64> = provider
        .rows()
        .iter()
        .filter(|p| p.age == 50)
        .map(|p| p.id)
        .collect();
    assert_eq!(aged, vec![1, 2]);
}

#[test]
fn patch_requires_a_match() {
    let provider = person_store();
    let req = request(Method::Patch, "Name=Nobody", "").with_body(json!({ "Age": 50 }));
    assert!(matches!(
        evaluate(&provider, &req),
        Err(Error::NoMatch { .. })
    ));
}

#[test]
fn put_inserts_on_zero_matches() {
    let provider = person_store();
    let req = request(Method::Put, "Name=Zoe", "")
        .with_body(json!({ "Id": 9, "Name": "Zoe", "Age": 22 }));
    match evaluate(&provider, &req).unwrap() {
        Outcome::Changed(change) => {
            assert_eq!(change.inserted, 1);
            assert_eq!(change.updated, 0);
        }
        other => panic!("expected change, got {other:?}"),
    }
    assert_eq!(provider.len(), 6);
}

#[test]
fn put_with_single_match_and_no_body_is_a_noop() {
    let provider = person_store();
    let req = request(Method::Put, "Name=Jane", "");
    match evaluate(&provider, &req).unwrap() {
        Outcome::Changed(change) => {
            assert_eq!(change.updated, 0);
            assert_eq!(change.inserted, 0);
        }
        other => panic!("expected change, got {other:?}"),
    }
    assert_eq!(provider.rows(), people());
}

#[test]
fn delete_without_unsafe_fails_closed() {
    let provider = person_store();
    let err = evaluate(&provider, &request(Method::Delete, "Name=John", "")).unwrap_err();
    assert!(matches!(err, Error::AmbiguousMatch { count: 3, .. }));
    assert_eq!(provider.len(), 5);
}

#[test]
fn delete_with_unsafe_removes_every_match() {
    let provider = person_store();
    let req = request(Method::Delete, "Name=John", "unsafe=true");
    match evaluate(&provider, &req).unwrap() {
        Outcome::Deleted(count) => assert_eq!(count, 3),
        other => panic!("expected deleted, got {other:?}"),
    }
    assert_eq!(provider.len(), 2);
}

#[test]
fn delete_single_match_needs_no_unsafe() {
    let provider = person_store();
    let req = request(Method::Delete, "Name=Alice", "");
    match evaluate(&provider, &req).unwrap() {
        Outcome::Deleted(count) => assert_eq!(count, 1),
        other => panic!("expected deleted, got {other:?}"),
    }
}

#[test]
fn validation_hook_rejects_bad_entities() {
    let provider = person_store();
    let req = Request::new(Method::Post).with_body(json!({ "Id": 9, "Name": " ", "Age": 20 }));
    let err = evaluate(&provider, &req).unwrap_err();
    assert!(matches!(err, Error::FailedValidation { .. }));
    assert_eq!(provider.len(), 5);
}

#[test]
fn input_limit_enforced_before_deserialization() {
    let provider = person_store();
    let req = Request::new(Method::Post)
        .with_body(json!([
            { "Id": 9, "Name": "A", "Age": 1 },
            { "Id": 10, "Name": "B", "Age": 2 },
        ]))
        .with_input_limit(1);
    let err = evaluate(&provider, &req).unwrap_err();
    assert!(matches!(err, Error::InvalidInputCount { count: 2, limit: 1, .. }));
}

#[test]
fn report_uses_native_count_when_trustworthy() {
    let provider = MemoryProvider::with_rows(Person::key, people()).with_native_count();
    match evaluate(&provider, &request(Method::Report, "Age>30", "")).unwrap() {
        Outcome::Count(count) => assert_eq!(count, 4),
        other => panic!("expected count, got {other:?}"),
    }
}

#[test]
fn report_falls_back_to_select_and_filter() {
    // No native count capability at all.
    let provider = person_store();
    match evaluate(&provider, &request(Method::Report, "Age>30", "")).unwrap() {
        Outcome::Count(count) => assert_eq!(count, 4),
        other => panic!("expected count, got {other:?}"),
    }

    // Native count exists but a limit changes cardinality, so the
    // fallback must run.
    let provider = MemoryProvider::with_rows(Person::key, people()).with_native_count();
    match evaluate(&provider, &request(Method::Report, "Age>30", "limit=2")).unwrap() {
        Outcome::Count(count) => assert_eq!(count, 2),
        other => panic!("expected count, got {other:?}"),
    }
}

#[test]
fn head_counts_without_returning_entities() {
    let provider = person_store();
    match evaluate(&provider, &request(Method::Head, "Name=John", "")).unwrap() {
        Outcome::Count(count) => assert_eq!(count, 3),
        other => panic!("expected count, got {other:?}"),
    }
}

#[test]
fn provider_failures_are_wrapped_as_aborts() {
    let provider = person_store();
    provider.fail_next(Error::provider("connection reset"));
    let err = evaluate(&provider, &get("", "")).unwrap_err();
    match err {
        Error::Aborted {
            method, resource, ..
        } => {
            assert_eq!(method, Method::Get);
            assert_eq!(resource, "Person");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn infinite_loop_sentinel_propagates_unwrapped() {
    let provider = person_store();
    provider.fail_next(Error::InfiniteLoop {
        resource: "Person".to_string(),
    });
    let err = evaluate(&provider, &get("", "")).unwrap_err();
    assert!(matches!(err, Error::InfiniteLoop { .. }));
}

#[test]
fn safe_post_classifies_then_mutates() {
    let provider = person_store();
    let req = Request::new(Method::Post)
        .with_safe_post_keys(vec!["Name".to_string()])
        .with_body(json!([
            { "Id": 9, "Name": "Zoe", "Age": 20 },
            { "Name": "Jane", "Age": 41 },
        ]));
    match evaluate(&provider, &req).unwrap() {
        Outcome::Changed(change) => {
            assert_eq!(change.inserted, 1);
            assert_eq!(change.updated, 1);
        }
        other => panic!("expected change, got {other:?}"),
    }
    let rows = provider.rows();
    assert_eq!(rows.len(), 6);
    let jane = rows.iter().find(|p| p.name == "Jane").unwrap();
    assert_eq!(jane.age, 41);
    assert_eq!(jane.email.as_deref(), Some("jane@example.com"));
}

#[test]
fn safe_post_ambiguity_fails_the_whole_batch() {
    let provider = person_store();
    let req = Request::new(Method::Post)
        .with_safe_post_keys(vec!["Name".to_string()])
        .with_body(json!([
            { "Id": 9, "Name": "Zoe", "Age": 20 },
            { "Name": "Jane", "Age": 41 },
            { "Name": "John", "Age": 99 },
        ]));
    let err = evaluate(&provider, &req).unwrap_err();
    match err {
        Error::AmbiguousMatch { count, resource } => {
            assert_eq!(count, 3);
            assert_eq!(resource, "Person");
        }
        other => panic!("unexpected error: {other}"),
    }
    // Classification happens before any mutation: zero changes.
    assert_eq!(provider.rows(), people());
}

#[test]
fn safe_post_with_compound_keys_disambiguates() {
    let provider = person_store();
    let req = Request::new(Method::Post)
        .with_safe_post_keys(vec!["Name".to_string(), "Age".to_string()])
        .with_body(json!([{ "Name": "John", "Age": 45, "Email": "j45@example.com" }]));
    match evaluate(&provider, &req).unwrap() {
        Outcome::Changed(change) => assert_eq!(change.updated, 1),
        other => panic!("expected change, got {other:?}"),
    }
    let rows = provider.rows();
    let updated = rows.iter().find(|p| p.id == 2).unwrap();
    assert_eq!(updated.email.as_deref(), Some("j45@example.com"));
}

#[test]
fn schema_less_documents_filter_dynamically() {
    let docs = vec![
        Document::of(&[("id", json!(1)), ("Type", json!("post")), ("Likes", json!(14))]),
        Document::of(&[("id", json!(2)), ("Type", json!("post")), ("Likes", json!(3))]),
        Document::of(&[("id", json!(3)), ("Type", json!("page")), ("Likes", json!(99))]),
    ];
    let provider = MemoryProvider::with_rows(Document::key, docs);

    let cache = TypeCache::new();
    let req = Request::<Document>::parse(Method::Get, "type=post&likes>10", "", &cache).unwrap();
    let serializer = JsonCanonicalizer;
    let outcome = Operations::new(&provider, &cache, &serializer)
        .evaluate(&req)
        .unwrap();
    match outcome {
        Outcome::Entities(values) => {
            assert_eq!(values.len(), 1);
            assert_eq!(values[0]["id"], json!(1));
        }
        other => panic!("expected entities, got {other:?}"),
    }
}

#[test]
fn distinct_dedups_schema_less_documents() {
    let docs = vec![
        Document::of(&[("Tag", json!("a"))]),
        Document::of(&[("Tag", json!("b"))]),
        Document::of(&[("Tag", json!("a"))]),
    ];
    let provider = MemoryProvider::with_rows(Document::key, docs);
    let cache = TypeCache::new();
    let req = Request::<Document>::parse(Method::Get, "", "distinct=true", &cache).unwrap();
    let serializer = JsonCanonicalizer;
    let outcome = Operations::new(&provider, &cache, &serializer)
        .evaluate(&req)
        .unwrap();
    match outcome {
        Outcome::Entities(values) => assert_eq!(values.len(), 2),
        other => panic!("expected entities, got {other:?}"),
    }
}

#[test]
fn select_is_lazy_until_collected() {
    let provider = person_store();
    let cache = TypeCache::new();
    let serializer = JsonCanonicalizer;
    let ops = Operations::new(&provider, &cache, &serializer);
    let req = get("", "limit=2");
    let mut stream = ops.select(&req).unwrap();
    assert!(stream.next().is_some());
    assert!(stream.next().is_some());
    assert!(stream.next().is_none());
}

#[test]
fn outcome_values_are_plain_json() {
    let provider = person_store();
    let outcome = evaluate(&provider, &get("Name=Alice", "")).unwrap();
    match outcome {
        Outcome::Entities(values) => {
            let expected: Value =
                json!({ "Age": 31, "Email": null, "Id": 5, "Name": "Alice" });
            assert_eq!(values[0], expected);
        }
        other => panic!("expected entities, got {other:?}"),
    }
}

//! Shared resource fixtures.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use resq_core::{Member, Resource, ValueKind};

/// A statically typed test resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Stable identity.
    #[serde(rename = "Id")]
    pub id: i64,
    /// Full name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Age in years.
    #[serde(rename = "Age")]
    pub age: i64,
    /// Optional email address.
    #[serde(rename = "Email")]
    pub email: Option<String>,
}

impl Person {
    /// Creates a person without an email.
    pub fn new(id: i64, name: &str, age: i64) -> Self {
        Person {
            id,
            name: name.to_string(),
            age,
            email: None,
        }
    }

    /// Creates a person with an email.
    pub fn with_email(id: i64, name: &str, age: i64, email: &str) -> Self {
        Person {
            id,
            name: name.to_string(),
            age,
            email: Some(email.to_string()),
        }
    }

    /// The identity extractor used by the memory provider.
    pub fn key(person: &Person) -> Value {
        Value::from(person.id)
    }
}

impl Resource for Person {
    const NAME: &'static str = "Person";

    fn members() -> Vec<Member> {
        vec![
            Member::new("Id", ValueKind::Int),
            Member::new("Name", ValueKind::String),
            Member::new("Age", ValueKind::Int),
            Member::new("Email", ValueKind::String),
        ]
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.age < 0 {
            return Err("age must not be negative".to_string());
        }
        Ok(())
    }
}

/// The standard five-person fixture: two match `Age>30&Name=John`.
pub fn people() -> Vec<Person> {
    vec![
        Person::with_email(1, "John", 35, "john@example.com"),
        Person::new(2, "John", 45),
        Person::new(3, "John", 25),
        Person::with_email(4, "Jane", 40, "jane@example.com"),
        Person::new(5, "Alice", 31),
    ]
}

/// A schema-less test resource: a bare map with no declared members,
/// so every term against it resolves dynamically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    /// The document's fields.
    pub fields: Map<String, Value>,
}

impl Document {
    /// Builds a document from key/value pairs.
    pub fn of(pairs: &[(&str, Value)]) -> Self {
        Document {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    /// Identity extractor: documents are identified by their `id`
    /// field.
    pub fn key(document: &Document) -> Value {
        document.fields.get("id").cloned().unwrap_or(Value::Null)
    }
}

impl Resource for Document {
    const NAME: &'static str = "Document";

    fn members() -> Vec<Member> {
        Vec::new()
    }
}

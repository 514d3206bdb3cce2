//! The validation seam between the invocation pipeline and whatever
//! validation library describes input/output shapes.
//!
//! The pipeline never depends on a concrete validator. It only needs one
//! capability: "parse this value into its validated form, or report issues".
//! That capability is the [`Schema`] trait; external validators plug in by
//! implementing it.
//!
//! Three implementations ship with the crate:
//!
//! - [`Passthrough`]: accepts any value unchanged (the "no schema" default)
//! - [`TypedSchema`]: validates by deserializing into a `serde` type
//! - [`ObjectSchema`]: a minimal named-field shape, enough for routing
//!   path/query parameters into an action input and for per-field error
//!   reporting

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A single validation problem reported by a [`Schema`].
///
/// `path` locates the offending field (`["user", "email"]` for
/// `user.email`); an empty path means the issue applies to the value as a
/// whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Path segments from the root of the validated value to the field.
    pub path: Vec<String>,
    /// Human-readable description of the problem.
    pub message: String,
}

impl Issue {
    /// Issue scoped to a single top-level field.
    #[must_use]
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: vec![name.into()],
            message: message.into(),
        }
    }

    /// Issue applying to the whole value (empty path).
    #[must_use]
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    /// The path joined with `.`, or the empty string for form-level issues.
    #[must_use]
    pub fn joined_path(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.joined_path(), self.message)
        }
    }
}

/// An opaque validation capability: parse a value or report issues.
///
/// The returned value may differ from the input (validators can coerce,
/// strip, or fill defaults); the pipeline always continues with the parsed
/// value, never the raw one.
pub trait Schema: Send + Sync {
    /// Validate `value`, returning its parsed form.
    ///
    /// # Errors
    ///
    /// Returns the full list of validation issues; implementations should
    /// report every problem they can find, not only the first.
    fn parse(&self, value: &Value) -> Result<Value, Vec<Issue>>;
}

/// Schema that accepts any value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Schema for Passthrough {
    fn parse(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        Ok(value.clone())
    }
}

/// Schema backed by a `serde` type: the value is valid iff it deserializes
/// into `T`. A deserialize failure becomes a single form-level issue.
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    /// Create a schema validating against `T`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedSchema<{}>", std::any::type_name::<T>())
    }
}

impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Serialize + Send + Sync,
{
    fn parse(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        let typed: T = serde_json::from_value(value.clone())
            .map_err(|e| vec![Issue::form(e.to_string())])?;
        serde_json::to_value(typed).map_err(|e| vec![Issue::form(e.to_string())])
    }
}

/// Expected type of an [`ObjectSchema`] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string.
    String,
    /// JSON number; string inputs that parse as numbers are coerced.
    Number,
    /// JSON boolean; `"true"` / `"false"` strings are coerced.
    Boolean,
    /// Any JSON value.
    Any,
}

impl FieldKind {
    const fn expected(self) -> &'static str {
        match self {
            Self::String => "expected a string",
            Self::Number => "expected a number",
            Self::Boolean => "expected a boolean",
            Self::Any => "expected a value",
        }
    }
}

#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    kind: FieldKind,
    required: bool,
}

/// A minimal named-field object shape.
///
/// Validates that the value is a JSON object, that required fields are
/// present, and that each declared field matches its [`FieldKind`]. String
/// inputs are coerced into numbers and booleans where the kind asks for one,
/// since path and query parameters always arrive as strings. Undeclared
/// fields pass through unchanged.
///
/// This is deliberately not a validation library; richer shapes plug in via
/// the [`Schema`] trait.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<FieldSpec>,
}

impl ObjectSchema {
    /// Empty object schema; accepts any JSON object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Add an optional field.
    #[must_use]
    pub fn optional_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    fn check_field(kind: FieldKind, value: &Value) -> Result<Value, &'static str> {
        match kind {
            FieldKind::Any => Ok(value.clone()),
            FieldKind::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(kind.expected()),
            },
            FieldKind::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => serde_json::from_str::<serde_json::Number>(s.trim())
                    .map(Value::Number)
                    .map_err(|_| kind.expected()),
                _ => Err(kind.expected()),
            },
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => match s.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(kind.expected()),
                },
                _ => Err(kind.expected()),
            },
        }
    }
}

impl Schema for ObjectSchema {
    fn parse(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        let Value::Object(input) = value else {
            return Err(vec![Issue::form("expected an object")]);
        };

        let mut issues = Vec::new();
        let mut output = input.clone();

        for spec in &self.fields {
            match input.get(&spec.name) {
                Some(found) => match Self::check_field(spec.kind, found) {
                    Ok(parsed) => {
                        output.insert(spec.name.clone(), parsed);
                    },
                    Err(msg) => issues.push(Issue::field(&spec.name, msg)),
                },
                None if spec.required => {
                    issues.push(Issue::field(&spec.name, "required field is missing"));
                },
                None => {},
            }
        }

        if issues.is_empty() {
            Ok(Value::Object(output))
        } else {
            Err(issues)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[test]
    fn passthrough_returns_value_unchanged() {
        let value = json!({"a": 1, "b": [true, null]});
        assert_eq!(Passthrough.parse(&value).unwrap(), value);
    }

    #[test]
    fn typed_schema_accepts_matching_value() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Post {
            id: u64,
            title: String,
        }

        let schema = TypedSchema::<Post>::new();
        let parsed = schema.parse(&json!({"id": 7, "title": "hello"})).unwrap();
        assert_eq!(parsed, json!({"id": 7, "title": "hello"}));
    }

    #[test]
    fn typed_schema_reports_form_issue() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Post {
            id: u64,
        }

        let schema = TypedSchema::<Post>::new();
        let issues = schema.parse(&json!({"id": "seven"})).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].path.is_empty());
    }

    #[test]
    fn object_schema_flags_missing_required_field() {
        let schema = ObjectSchema::new().field("id", FieldKind::String);
        let issues = schema.parse(&json!({})).unwrap_err();
        assert_eq!(issues[0].joined_path(), "id");
        assert_eq!(issues[0].message, "required field is missing");
    }

    #[test]
    fn object_schema_coerces_string_number() {
        let schema = ObjectSchema::new().field("page", FieldKind::Number);
        let parsed = schema.parse(&json!({"page": "42"})).unwrap();
        assert_eq!(parsed, json!({"page": 42}));
    }

    #[test]
    fn object_schema_coerces_string_boolean() {
        let schema = ObjectSchema::new().field("draft", FieldKind::Boolean);
        let parsed = schema.parse(&json!({"draft": "true"})).unwrap();
        assert_eq!(parsed, json!({"draft": true}));
    }

    #[test]
    fn object_schema_rejects_bad_coercion() {
        let schema = ObjectSchema::new().field("page", FieldKind::Number);
        let issues = schema.parse(&json!({"page": "forty-two"})).unwrap_err();
        assert_eq!(issues[0].joined_path(), "page");
    }

    #[test]
    fn object_schema_preserves_undeclared_fields() {
        let schema = ObjectSchema::new().field("id", FieldKind::String);
        let parsed = schema.parse(&json!({"id": "x", "extra": 9})).unwrap();
        assert_eq!(parsed, json!({"id": "x", "extra": 9}));
    }

    #[test]
    fn object_schema_rejects_non_object() {
        let schema = ObjectSchema::new();
        let issues = schema.parse(&json!([1, 2])).unwrap_err();
        assert!(issues[0].path.is_empty());
        assert_eq!(issues[0].message, "expected an object");
    }

    #[test]
    fn object_schema_collects_every_issue() {
        let schema = ObjectSchema::new()
            .field("id", FieldKind::String)
            .field("page", FieldKind::Number);
        let issues = schema.parse(&json!({"page": false})).unwrap_err();
        assert_eq!(issues.len(), 2);
    }
}

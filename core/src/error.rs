//! The normalized error model for action invocations.
//!
//! Every failure in the pipeline (a handler returning an error, a callback
//! failing, a validation rejection, a timeout) is funneled through one
//! normalization point and surfaces as an [`ActionError`] carrying a code
//! from the closed [`ErrorCode`] enumeration. Nothing else ever crosses the
//! invocation boundary.
//!
//! Handlers and procedure steps fail with a [`Failure`], which captures the
//! dynamic shapes a fallible body can produce (a bare message, a JSON
//! payload, an already-tagged error, or a source error chain) without
//! committing the caller to a code up front.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::Issue;

/// Closed enumeration of invocation error codes.
///
/// Serialized on the wire in `SCREAMING_SNAKE_CASE` (e.g.
/// `INPUT_PARSE_ERROR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The raw input failed the action's input shape. Never retried.
    InputParseError,
    /// The handler's result failed the action's output shape. Never retried.
    OutputParseError,
    /// Generic handler/business failure; the default for untagged failures.
    Error,
    /// Caller is not authenticated.
    NotAuthorized,
    /// The invocation exceeded its configured timeout. Never retried.
    Timeout,
    /// Unclassified server-side fault.
    InternalServerError,
    /// Caller is authenticated but not allowed.
    Forbidden,
    /// The referenced entity does not exist.
    NotFound,
    /// The request conflicts with current state.
    Conflict,
    /// A precondition of the request was not met.
    PreconditionFailed,
    /// The request payload exceeds accepted limits.
    PayloadTooLarge,
    /// The HTTP method (or content type) is not supported for this route.
    MethodNotSupported,
    /// The request was well-formed but semantically unprocessable.
    UnprocessableContent,
    /// Caller exceeded a rate limit.
    TooManyRequests,
    /// The client closed the connection before a response was produced.
    ClientClosedRequest,
    /// The caller's balance cannot cover the operation.
    InsufficientCredits,
    /// Payment is required to perform the operation.
    PaymentRequired,
}

impl ErrorCode {
    /// Every declared code, in declaration order. Supports totality checks
    /// over the closed set.
    pub const ALL: [Self; 17] = [
        Self::InputParseError,
        Self::OutputParseError,
        Self::Error,
        Self::NotAuthorized,
        Self::Timeout,
        Self::InternalServerError,
        Self::Forbidden,
        Self::NotFound,
        Self::Conflict,
        Self::PreconditionFailed,
        Self::PayloadTooLarge,
        Self::MethodNotSupported,
        Self::UnprocessableContent,
        Self::TooManyRequests,
        Self::ClientClosedRequest,
        Self::InsufficientCredits,
        Self::PaymentRequired,
    ];

    /// The wire representation of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputParseError => "INPUT_PARSE_ERROR",
            Self::OutputParseError => "OUTPUT_PARSE_ERROR",
            Self::Error => "ERROR",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::Timeout => "TIMEOUT",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            Self::UnprocessableContent => "UNPROCESSABLE_CONTENT",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::ClientClosedRequest => "CLIENT_CLOSED_REQUEST",
            Self::InsufficientCredits => "INSUFFICIENT_CREDITS",
            Self::PaymentRequired => "PAYMENT_REQUIRED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure value produced by a handler, procedure step, or callback.
///
/// This is the "thrown value" seam: bodies fail with whatever shape is
/// natural (`Err("nope".into())`, `Err(json!({...}).into())`, an explicit
/// [`ActionError`], or any `anyhow::Error`) and the engine normalizes it via
/// [`ActionError::from_failure`].
#[derive(Debug)]
pub enum Failure {
    /// A bare message. Normalizes to code [`ErrorCode::Error`] with the
    /// message as both `message` and `data`.
    Message(String),
    /// An arbitrary JSON payload. Normalizes to code [`ErrorCode::Error`]
    /// with the payload as `data`.
    Value(Value),
    /// An already-tagged error; passes through normalization unchanged.
    Error(ActionError),
    /// An error chain; the chain's display becomes the message.
    Source(anyhow::Error),
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<Value> for Failure {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ActionError> for Failure {
    fn from(error: ActionError) -> Self {
        Self::Error(error)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(source: anyhow::Error) -> Self {
        Self::Source(source)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(m) => f.write_str(m),
            Self::Value(v) => write!(f, "{v}"),
            Self::Error(e) => write!(f, "{e}"),
            Self::Source(e) => write!(f, "{e}"),
        }
    }
}

/// The normalized, tagged invocation error.
///
/// Carries the closed [`ErrorCode`], a human-readable message, the original
/// failure payload in `data`, and, for validation failures only, the
/// per-field and whole-object issue buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionError {
    /// The tagged code; drives HTTP status mapping and retry taxonomy.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// The original failure payload; `Value::Null` when there is none.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    /// Validation messages keyed by dotted field path. Present only for
    /// `INPUT_PARSE_ERROR` / `OUTPUT_PARSE_ERROR`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, Vec<String>>>,
    /// Validation messages applying to the value as a whole. Present only
    /// for `INPUT_PARSE_ERROR` / `OUTPUT_PARSE_ERROR`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_errors: Option<Vec<String>>,
}

impl ActionError {
    /// Error with an explicit code and message, no payload.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Value::Null,
            field_errors: None,
            form_errors: None,
        }
    }

    /// Error from an explicit `(code, data)` pair.
    ///
    /// When `data` is a plain string and no message was supplied, the string
    /// doubles as the message; otherwise the code's wire string is used.
    #[must_use]
    pub fn with_data(code: ErrorCode, data: Value) -> Self {
        let message = match &data {
            Value::String(s) => s.clone(),
            _ => code.as_str().to_owned(),
        };
        Self {
            code,
            message,
            data,
            field_errors: None,
            form_errors: None,
        }
    }

    /// The single normalization point: collapse any [`Failure`] into a
    /// tagged error.
    ///
    /// Case analysis, in order: already-tagged errors pass through; bare
    /// strings become code `ERROR` with the string as message and data;
    /// error chains become code `ERROR` with the chain display as message;
    /// anything else becomes code `ERROR` with the value as `data`.
    #[must_use]
    pub fn from_failure(failure: Failure) -> Self {
        match failure {
            Failure::Error(error) => error,
            Failure::Message(message) => Self::with_data(ErrorCode::Error, Value::String(message)),
            Failure::Source(source) => {
                let message = source.to_string();
                Self::with_data(ErrorCode::Error, Value::String(message))
            },
            Failure::Value(value) => Self::with_data(ErrorCode::Error, value),
        }
    }

    /// Input validation failure from the validator's issue list.
    #[must_use]
    pub fn input_parse(issues: Vec<Issue>) -> Self {
        Self::validation(ErrorCode::InputParseError, issues)
    }

    /// Output validation failure from the validator's issue list.
    #[must_use]
    pub fn output_parse(issues: Vec<Issue>) -> Self {
        Self::validation(ErrorCode::OutputParseError, issues)
    }

    fn validation(code: ErrorCode, issues: Vec<Issue>) -> Self {
        let mut field_errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut form_errors: Vec<String> = Vec::new();
        for issue in &issues {
            if issue.path.is_empty() {
                form_errors.push(issue.message.clone());
            } else {
                field_errors
                    .entry(issue.joined_path())
                    .or_default()
                    .push(issue.message.clone());
            }
        }
        let message = issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        let data = serde_json::to_value(&issues).unwrap_or(Value::Null);
        Self {
            code,
            message,
            data,
            field_errors: Some(field_errors),
            form_errors: Some(form_errors),
        }
    }

    /// `NOT_AUTHORIZED` error.
    #[must_use]
    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotAuthorized, message)
    }

    /// `FORBIDDEN` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// `NOT_FOUND` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// `CONFLICT` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// `INTERNAL_SERVER_ERROR` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// `TIMEOUT` error for an invocation that exceeded `elapsed`.
    #[must_use]
    pub fn timeout(elapsed: Duration) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("invocation timed out after {}ms", elapsed.as_millis()),
        )
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ActionError {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_string_failure_normalizes_to_error_code() {
        let err = ActionError::from_failure("bad".into());
        assert_eq!(err.code, ErrorCode::Error);
        assert_eq!(err.message, "bad");
        assert_eq!(err.data, json!("bad"));
    }

    #[test]
    fn tagged_error_passes_through_unchanged() {
        let original = ActionError::not_found("missing post");
        let err = ActionError::from_failure(original.clone().into());
        assert_eq!(err, original);
    }

    #[test]
    fn value_failure_keeps_payload_as_data() {
        let err = ActionError::from_failure(json!({"reason": "quota"}).into());
        assert_eq!(err.code, ErrorCode::Error);
        assert_eq!(err.data, json!({"reason": "quota"}));
        assert_eq!(err.message, "ERROR");
    }

    #[test]
    fn source_failure_inherits_message() {
        let err = ActionError::from_failure(anyhow::anyhow!("db unavailable").into());
        assert_eq!(err.code, ErrorCode::Error);
        assert_eq!(err.message, "db unavailable");
    }

    #[test]
    fn input_parse_buckets_field_and_form_issues() {
        let err = ActionError::input_parse(vec![
            Issue::field("email", "not an email"),
            Issue {
                path: vec!["user".into(), "age".into()],
                message: "too young".into(),
            },
            Issue::form("unknown keys present"),
        ]);

        assert_eq!(err.code, ErrorCode::InputParseError);
        let fields = err.field_errors.unwrap();
        assert_eq!(fields["email"], vec!["not an email"]);
        assert_eq!(fields["user.age"], vec!["too young"]);
        assert!(!fields.contains_key("name"));
        assert_eq!(err.form_errors.unwrap(), vec!["unknown keys present"]);
    }

    #[test]
    fn display_shows_code_and_message() {
        let err = ActionError::forbidden("no access");
        assert_eq!(err.to_string(), "[FORBIDDEN] no access");
    }

    #[test]
    fn codes_serialize_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::InputParseError).unwrap();
        assert_eq!(json, "\"INPUT_PARSE_ERROR\"");
        for code in ErrorCode::ALL {
            let round: ErrorCode =
                serde_json::from_str(&serde_json::to_string(&code).unwrap()).unwrap();
            assert_eq!(round, code);
        }
    }

    #[test]
    fn error_serializes_with_camel_case_buckets() {
        let err = ActionError::input_parse(vec![Issue::field("id", "required field is missing")]);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "INPUT_PARSE_ERROR");
        assert_eq!(value["fieldErrors"]["id"][0], "required field is missing");
        assert!(value["formErrors"].as_array().unwrap().is_empty());
    }
}

//! The two-sided outcome contract returned by every invocation.

use serde::Serialize;
use serde_json::Value;

use crate::error::ActionError;

/// The `(data, error)` outcome of an invocation.
///
/// Exactly one of the two sides is populated, never both and never neither.
/// The constructors are crate-internal so the exclusivity invariant holds by
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResult {
    data: Option<Value>,
    error: Option<ActionError>,
}

impl InvocationResult {
    pub(crate) fn success(data: Value) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub(crate) fn failure(error: ActionError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    /// True when the invocation produced data.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.data.is_some()
    }

    /// True when the invocation produced an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The success payload, when present.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// The normalized error, when present.
    #[must_use]
    pub const fn error(&self) -> Option<&ActionError> {
        self.error.as_ref()
    }

    /// Consume into the two-element shape.
    #[must_use]
    pub fn into_parts(self) -> (Option<Value>, Option<ActionError>) {
        (self.data, self.error)
    }

    /// Bridge into a standard `Result`.
    ///
    /// # Errors
    ///
    /// Returns the invocation's [`ActionError`] when the error side is
    /// populated.
    pub fn into_result(self) -> Result<Value, ActionError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            // Unreachable by construction; surface as a tagged fault rather
            // than panicking.
            (None, None) => Err(ActionError::internal("invocation produced no outcome")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_populates_exactly_one_side() {
        let result = InvocationResult::success(json!({"ok": true}));
        assert!(result.is_success());
        assert!(!result.is_error());
        let (data, error) = result.into_parts();
        assert!(data.is_some());
        assert!(error.is_none());
    }

    #[test]
    fn failure_populates_exactly_one_side() {
        let result = InvocationResult::failure(ActionError::not_found("nope"));
        assert!(result.is_error());
        assert!(!result.is_success());
        let (data, error) = result.into_parts();
        assert!(data.is_none());
        assert!(error.is_some());
    }

    #[test]
    fn into_result_bridges_both_sides() {
        assert_eq!(
            InvocationResult::success(json!(1)).into_result().unwrap(),
            json!(1)
        );
        let err = InvocationResult::failure(ActionError::forbidden("no"))
            .into_result()
            .unwrap_err();
        assert_eq!(err.message, "no");
    }
}

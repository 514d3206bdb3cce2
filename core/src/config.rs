//! Invocation configuration: lifecycle callbacks, retry policy, timeout,
//! and the merge rules that combine procedure-level and action-level
//! fragments into one effective configuration.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ActionError, Failure};
use crate::schema::Schema;

/// Boxed future type used by every stored async closure in the pipeline.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Callback invoked with the raw input before validation.
pub type StartHook = Arc<dyn Fn(Value) -> BoxFuture<Result<(), Failure>> + Send + Sync>;

/// Callback invoked with the validated input after a successful invocation.
pub type SuccessHook = Arc<dyn Fn(Value) -> BoxFuture<Result<(), Failure>> + Send + Sync>;

/// Callback invoked with the normalized error on a terminal failure.
pub type ErrorHook = Arc<dyn Fn(ActionError) -> BoxFuture<Result<(), Failure>> + Send + Sync>;

/// Callback invoked once per invocation, after success or failure.
pub type CompleteHook = Arc<dyn Fn(CompletionInfo) -> BoxFuture<Result<(), Failure>> + Send + Sync>;

/// Terminal status of an invocation, as seen by `on_complete` callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    /// The invocation produced data.
    Success,
    /// The invocation produced an error.
    Error,
}

/// Payload handed to `on_complete` callbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionInfo {
    /// Terminal status of the invocation.
    pub status: InvocationStatus,
    /// Convenience flag; true iff `status` is success.
    pub is_success: bool,
    /// Convenience flag; true iff `status` is error.
    pub is_error: bool,
    /// The validated input; present only on success.
    pub args: Option<Value>,
}

impl CompletionInfo {
    pub(crate) fn success(args: Value) -> Self {
        Self {
            status: InvocationStatus::Success,
            is_success: true,
            is_error: false,
            args: Some(args),
        }
    }

    pub(crate) const fn error() -> Self {
        Self {
            status: InvocationStatus::Error,
            is_success: false,
            is_error: true,
            args: None,
        }
    }
}

/// Delay between retry attempts.
#[derive(Clone)]
pub enum RetryDelay {
    /// The same wait before every re-attempt.
    Fixed(Duration),
    /// Computed per attempt from the attempt number (1-based) and the error
    /// that failed it.
    Computed(Arc<dyn Fn(u32, &ActionError) -> Duration + Send + Sync>),
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::Fixed(Duration::ZERO)
    }
}

impl fmt::Debug for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Self::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

/// Retry policy for the handler/context-chain portion of an invocation.
///
/// `max_attempts` counts every execution, so `max_attempts = 3` means one
/// initial attempt plus at most two retries. Input parsing, output parsing,
/// and timeouts are never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts (minimum 1).
    pub max_attempts: u32,
    /// Wait between attempts.
    pub delay: RetryDelay,
}

impl RetryPolicy {
    /// Policy with `max_attempts` attempts and no delay between them.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: RetryDelay::default(),
        }
    }

    /// Use a fixed delay between attempts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = RetryDelay::Fixed(delay);
        self
    }

    /// Compute the delay per attempt from `(attempt, error)`.
    #[must_use]
    pub fn with_delay_fn<F>(mut self, delay: F) -> Self
    where
        F: Fn(u32, &ActionError) -> Duration + Send + Sync + 'static,
    {
        self.delay = RetryDelay::Computed(Arc::new(delay));
        self
    }

    /// The wait before the attempt following failed attempt `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &ActionError) -> Duration {
        match &self.delay {
            RetryDelay::Fixed(d) => *d,
            RetryDelay::Computed(f) => f(attempt, error),
        }
    }
}

/// The ordered callback sets for every lifecycle point.
///
/// Callbacks accumulate in execution order: merging appends, so
/// procedure-level callbacks always run before action-level ones for the
/// same lifecycle point.
#[derive(Clone, Default)]
pub struct Callbacks {
    /// Run with the raw input before validation.
    pub on_start: Vec<StartHook>,
    /// Run with the validated input after success.
    pub on_success: Vec<SuccessHook>,
    /// Run with the normalized error on terminal failure.
    pub on_error: Vec<ErrorHook>,
    /// Run last, on both paths.
    pub on_complete: Vec<CompleteHook>,
    /// Run when input validation rejects the raw input.
    pub on_input_parse_error: Vec<ErrorHook>,
}

impl Callbacks {
    fn append(&mut self, later: &Self) {
        self.on_start.extend(later.on_start.iter().cloned());
        self.on_success.extend(later.on_success.iter().cloned());
        self.on_error.extend(later.on_error.iter().cloned());
        self.on_complete.extend(later.on_complete.iter().cloned());
        self.on_input_parse_error
            .extend(later.on_input_parse_error.iter().cloned());
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_start", &self.on_start.len())
            .field("on_success", &self.on_success.len())
            .field("on_error", &self.on_error.len())
            .field("on_complete", &self.on_complete.len())
            .field("on_input_parse_error", &self.on_input_parse_error.len())
            .finish()
    }
}

/// One immutable configuration fragment.
///
/// Fragments are built incrementally by procedure/action chaining and merged
/// with [`ActionConfig::merged_with`]: later fragments override earlier ones
/// per field, except callbacks, which concatenate in chain order, and
/// retry/timeout, which are replaced wholesale (nearest wins, never merged
/// field-by-field).
#[derive(Clone, Default)]
pub struct ActionConfig {
    /// Transform applied to the raw input before the action's input shape.
    pub input_transform: Option<Arc<dyn Schema>>,
    /// Transform applied to the handler result before the output shape.
    pub output_transform: Option<Arc<dyn Schema>>,
    /// Lifecycle callbacks, in execution order.
    pub callbacks: Callbacks,
    /// Retry policy for the handler/context chain.
    pub retry: Option<RetryPolicy>,
    /// Deadline for the context chain + handler, spanning all attempts.
    pub timeout: Option<Duration>,
}

impl ActionConfig {
    /// Merge `later` over this fragment, producing the effective config.
    #[must_use]
    pub fn merged_with(&self, later: &Self) -> Self {
        let mut callbacks = self.callbacks.clone();
        callbacks.append(&later.callbacks);
        Self {
            input_transform: later
                .input_transform
                .clone()
                .or_else(|| self.input_transform.clone()),
            output_transform: later
                .output_transform
                .clone()
                .or_else(|| self.output_transform.clone()),
            callbacks,
            retry: later.retry.clone().or_else(|| self.retry.clone()),
            timeout: later.timeout.or(self.timeout),
        }
    }
}

impl fmt::Debug for ActionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionConfig")
            .field("input_transform", &self.input_transform.is_some())
            .field("output_transform", &self.output_transform.is_some())
            .field("callbacks", &self.callbacks)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_retry_wholesale() {
        let base = ActionConfig {
            retry: Some(RetryPolicy::new(5).with_delay(Duration::from_millis(100))),
            ..ActionConfig::default()
        };
        let later = ActionConfig {
            retry: Some(RetryPolicy::new(2)),
            ..ActionConfig::default()
        };

        let merged = base.merged_with(&later);
        let retry = merged.retry.unwrap();
        assert_eq!(retry.max_attempts, 2);
        // Wholesale replacement: the later policy's zero delay wins, the
        // earlier 100ms delay is not carried over.
        assert_eq!(
            retry.delay_for(1, &ActionError::internal("x")),
            Duration::ZERO
        );
    }

    #[test]
    fn merge_keeps_base_retry_when_later_is_unset() {
        let base = ActionConfig {
            retry: Some(RetryPolicy::new(4)),
            timeout: Some(Duration::from_secs(1)),
            ..ActionConfig::default()
        };
        let merged = base.merged_with(&ActionConfig::default());
        assert_eq!(merged.retry.unwrap().max_attempts, 4);
        assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn merge_concatenates_callbacks_in_chain_order() {
        let mut base = ActionConfig::default();
        base.callbacks
            .on_start
            .push(Arc::new(|_| Box::pin(async { Ok(()) })));

        let mut later = ActionConfig::default();
        later
            .callbacks
            .on_start
            .push(Arc::new(|_| Box::pin(async { Ok(()) })));
        later
            .callbacks
            .on_complete
            .push(Arc::new(|_| Box::pin(async { Ok(()) })));

        let merged = base.merged_with(&later);
        assert_eq!(merged.callbacks.on_start.len(), 2);
        assert_eq!(merged.callbacks.on_complete.len(), 1);
    }

    #[test]
    fn computed_delay_sees_attempt_and_error() {
        let policy = RetryPolicy::new(3)
            .with_delay_fn(|attempt, _err| Duration::from_millis(u64::from(attempt) * 10));
        let err = ActionError::internal("boom");
        assert_eq!(policy.delay_for(1, &err), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2, &err), Duration::from_millis(20));
    }

    #[test]
    fn completion_info_flags_are_consistent() {
        let ok = CompletionInfo::success(serde_json::json!({"id": 1}));
        assert!(ok.is_success && !ok.is_error);
        assert!(ok.args.is_some());

        let failed = CompletionInfo::error();
        assert!(failed.is_error && !failed.is_success);
        assert!(failed.args.is_none());
    }
}

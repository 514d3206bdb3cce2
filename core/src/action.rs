//! Action definitions and the invocation engine.
//!
//! An [`Action`] is the compiled, invocable unit: a resolved procedure chain,
//! an effective configuration, input/output shapes, and the final handler.
//! It is built once via [`ActionBuilder`], is immutable afterwards, and is
//! safe to invoke concurrently; invocations share nothing but the action
//! itself.
//!
//! [`Action::invoke`] never panics and never propagates an error past its
//! boundary: every failure path is normalized into an
//! [`ActionError`](crate::ActionError) and returned through the
//! [`InvocationResult`] contract.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::{ActionConfig, BoxFuture, CompletionInfo, RetryPolicy};
use crate::error::{ActionError, ErrorCode, Failure};
use crate::procedure::{Procedure, StepFn};
use crate::response_meta::ResponseMetaHandle;
use crate::result::InvocationResult;
use crate::schema::{Passthrough, Schema};

/// The final handler: `(validated_input, ctx, meta) -> output`.
pub type HandlerFn =
    Arc<dyn Fn(Value, Value, InvocationMeta) -> BoxFuture<Result<Value, Failure>> + Send + Sync>;

/// Per-invocation metadata available to the handler.
#[derive(Clone, Default)]
pub struct InvocationMeta {
    /// The action's name, when one was set at build time.
    pub action_name: Option<Arc<str>>,
    /// Side channel for shaping the HTTP response on success.
    pub response: ResponseMetaHandle,
}

impl fmt::Debug for InvocationMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationMeta")
            .field("action_name", &self.action_name)
            .finish_non_exhaustive()
    }
}

/// Per-call options for [`Action::invoke_with`].
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Response metadata handle to thread into the handler; the caller keeps
    /// a clone and reads it back after success. A fresh handle is created
    /// when unset.
    pub response: Option<ResponseMetaHandle>,
}

/// Builder for [`Action`].
///
/// Action-level configuration set here overrides procedure-level
/// configuration per field (callbacks accumulate instead, running after the
/// procedure's).
pub struct ActionBuilder {
    name: Option<Arc<str>>,
    procedure: Procedure,
    config: ActionConfig,
    input: Option<Arc<dyn Schema>>,
    output: Option<Arc<dyn Schema>>,
}

impl ActionBuilder {
    /// Builder with no procedure chain.
    #[must_use]
    pub fn new() -> Self {
        Self::from_procedure(Procedure::new())
    }

    /// Builder chained off an existing procedure.
    #[must_use]
    pub fn from_procedure(procedure: Procedure) -> Self {
        Self {
            name: None,
            procedure,
            config: ActionConfig::default(),
            input: None,
            output: None,
        }
    }

    /// Name used in log events and invocation metadata.
    #[must_use]
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The action's input shape. Defaults to [`Passthrough`].
    #[must_use]
    pub fn input<S: Schema + 'static>(mut self, schema: S) -> Self {
        self.input = Some(Arc::new(schema));
        self
    }

    /// The action's output shape. Defaults to [`Passthrough`].
    #[must_use]
    pub fn output<S: Schema + 'static>(mut self, schema: S) -> Self {
        self.output = Some(Arc::new(schema));
        self
    }

    /// Action-level retry policy; replaces any procedure-level policy
    /// wholesale.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = Some(policy);
        self
    }

    /// Action-level timeout; replaces any procedure-level timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Action-level `on_start` callback (runs after procedure-level ones).
    #[must_use]
    pub fn on_start<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        self.config
            .callbacks
            .on_start
            .push(Arc::new(move |input| Box::pin(hook(input))));
        self
    }

    /// Action-level `on_success` callback.
    #[must_use]
    pub fn on_success<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        self.config
            .callbacks
            .on_success
            .push(Arc::new(move |input| Box::pin(hook(input))));
        self
    }

    /// Action-level `on_error` callback.
    #[must_use]
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        self.config
            .callbacks
            .on_error
            .push(Arc::new(move |error| Box::pin(hook(error))));
        self
    }

    /// Action-level `on_complete` callback.
    #[must_use]
    pub fn on_complete<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(CompletionInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        self.config
            .callbacks
            .on_complete
            .push(Arc::new(move |info| Box::pin(hook(info))));
        self
    }

    /// Action-level `on_input_parse_error` callback.
    #[must_use]
    pub fn on_input_parse_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        self.config
            .callbacks
            .on_input_parse_error
            .push(Arc::new(move |error| Box::pin(hook(error))));
        self
    }

    /// Finalize with the action's handler, compiling the [`Action`].
    #[must_use]
    pub fn handler<F, Fut>(self, handler: F) -> Action
    where
        F: Fn(Value, Value, InvocationMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Failure>> + Send + 'static,
    {
        let (steps, procedure_config) = self.procedure.resolve();
        let config = procedure_config.merged_with(&self.config);
        Action {
            name: self.name,
            steps,
            config,
            input: self.input.unwrap_or_else(|| Arc::new(Passthrough)),
            output: self.output.unwrap_or_else(|| Arc::new(Passthrough)),
            handler: Arc::new(move |input, ctx, meta| Box::pin(handler(input, ctx, meta))),
        }
    }
}

impl Default for ActionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled, invocable action.
#[derive(Clone)]
pub struct Action {
    name: Option<Arc<str>>,
    steps: Vec<StepFn>,
    config: ActionConfig,
    input: Arc<dyn Schema>,
    output: Arc<dyn Schema>,
    handler: HandlerFn,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Action {
    /// Start building an action.
    #[must_use]
    pub fn builder() -> ActionBuilder {
        ActionBuilder::new()
    }

    /// The action's name, when set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Invoke against a raw input value.
    pub async fn invoke(&self, raw_input: Value) -> InvocationResult {
        self.invoke_with(raw_input, InvokeOptions::default()).await
    }

    /// Invoke with per-call options.
    ///
    /// Runs the full lifecycle: `on_start` → input validation → context
    /// chain + handler under retry and timeout → output validation →
    /// success/error callbacks → `on_complete`. Exactly one of the result's
    /// sides is populated.
    pub async fn invoke_with(&self, raw_input: Value, options: InvokeOptions) -> InvocationResult {
        let meta = InvocationMeta {
            action_name: self.name.clone(),
            response: options.response.unwrap_or_default(),
        };

        // 1. on_start, procedure order then action order. A failure here is
        // the invocation's error; it is never retried.
        for hook in &self.config.callbacks.on_start {
            if let Err(failure) = hook(raw_input.clone()).await {
                let error = ActionError::from_failure(failure);
                tracing::debug!(action = self.log_name(), error = %error, "on_start callback failed");
                return self.fail(error).await;
            }
        }

        // 2. Input validation; never retried, and on failure only the
        // on_input_parse_error and on_complete callbacks run.
        let input = match self.parse_input(&raw_input) {
            Ok(input) => input,
            Err(error) => {
                for hook in &self.config.callbacks.on_input_parse_error {
                    if let Err(failure) = hook(error.clone()).await {
                        tracing::warn!(
                            action = self.log_name(),
                            error = %failure,
                            "on_input_parse_error callback failed"
                        );
                    }
                }
                self.run_complete(CompletionInfo::error()).await;
                return InvocationResult::failure(error);
            },
        };

        // 3 + 4. Context chain and handler under retry, the whole retry loop
        // raced against a single timer. A timeout is terminal regardless of
        // remaining attempts, and retry delays count against the timer.
        let outcome = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.run_attempts(&input, &meta)).await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(
                        action = self.log_name(),
                        timeout_ms = limit.as_millis(),
                        "invocation timed out"
                    );
                    Err(ActionError::timeout(limit))
                },
            },
            None => self.run_attempts(&input, &meta).await,
        };

        let raw_output = match outcome {
            Ok(output) => output,
            Err(error) => return self.fail(error).await,
        };

        // 5. Output validation; a failure here is a handler bug, not retried.
        let data = match self.parse_output(&raw_output) {
            Ok(data) => data,
            Err(error) => return self.fail(error).await,
        };

        // 6 + 7. Success callbacks, then on_complete with the validated args.
        for hook in &self.config.callbacks.on_success {
            if let Err(failure) = hook(input.clone()).await {
                tracing::warn!(
                    action = self.log_name(),
                    error = %failure,
                    "on_success callback failed"
                );
            }
        }
        self.run_complete(CompletionInfo::success(input)).await;

        InvocationResult::success(data)
    }

    /// Run the context chain and handler, retrying per the effective policy.
    async fn run_attempts(
        &self,
        input: &Value,
        meta: &InvocationMeta,
    ) -> Result<Value, ActionError> {
        let max_attempts = self
            .config
            .retry
            .as_ref()
            .map_or(1, |policy| policy.max_attempts.max(1));
        let mut attempt: u32 = 1;

        loop {
            match self.run_chain(input, meta).await {
                Ok(output) => {
                    if attempt > 1 {
                        tracing::info!(
                            action = self.log_name(),
                            attempt,
                            "invocation succeeded after retry"
                        );
                    }
                    return Ok(output);
                },
                Err(failure) => {
                    let error = ActionError::from_failure(failure);
                    if attempt >= max_attempts {
                        if max_attempts > 1 {
                            tracing::warn!(
                                action = self.log_name(),
                                attempt,
                                error = %error,
                                "invocation failed after max attempts"
                            );
                        }
                        return Err(error);
                    }
                    let delay = self
                        .config
                        .retry
                        .as_ref()
                        .map_or(Duration::ZERO, |policy| policy.delay_for(attempt, &error));
                    tracing::warn!(
                        action = self.log_name(),
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
            }
        }
    }

    /// One attempt: fold the context chain, then call the handler.
    ///
    /// The chain re-runs from the start on every attempt; no context is
    /// cached across attempts.
    async fn run_chain(&self, input: &Value, meta: &InvocationMeta) -> Result<Value, Failure> {
        let mut ctx = Value::Null;
        for step in &self.steps {
            ctx = step(input.clone(), ctx).await?;
        }
        (self.handler)(input.clone(), ctx, meta.clone()).await
    }

    fn parse_input(&self, raw: &Value) -> Result<Value, ActionError> {
        let transformed = match &self.config.input_transform {
            Some(transform) => transform.parse(raw).map_err(ActionError::input_parse)?,
            None => raw.clone(),
        };
        self.input
            .parse(&transformed)
            .map_err(ActionError::input_parse)
    }

    fn parse_output(&self, raw: &Value) -> Result<Value, ActionError> {
        let transformed = match &self.config.output_transform {
            Some(transform) => transform.parse(raw).map_err(ActionError::output_parse)?,
            None => raw.clone(),
        };
        self.output
            .parse(&transformed)
            .map_err(ActionError::output_parse)
    }

    /// Terminal error path: on_error callbacks, then on_complete.
    async fn fail(&self, error: ActionError) -> InvocationResult {
        for hook in &self.config.callbacks.on_error {
            if let Err(failure) = hook(error.clone()).await {
                tracing::warn!(
                    action = self.log_name(),
                    error = %failure,
                    "on_error callback failed"
                );
            }
        }
        self.run_complete(CompletionInfo::error()).await;
        InvocationResult::failure(error)
    }

    async fn run_complete(&self, info: CompletionInfo) {
        for hook in &self.config.callbacks.on_complete {
            if let Err(failure) = hook(info.clone()).await {
                tracing::warn!(
                    action = self.log_name(),
                    error = %failure,
                    "on_complete callback failed"
                );
            }
        }
    }

    fn log_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

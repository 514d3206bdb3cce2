//! Composable, reusable configuration chains shared by multiple actions.
//!
//! A [`Procedure`] is an ordered list of context-producing steps plus an
//! accumulated [`ActionConfig`]. Every chaining call consumes the procedure
//! and returns a richer one; cloning before chaining branches the chain, and
//! because steps and callbacks are held behind `Arc`s the branches share no
//! mutable state, so configuring one branch can never leak into another.
//!
//! Context threads linearly: each step receives the validated input and the
//! previous step's context, and its return value becomes the context for the
//! next step (and ultimately for the action handler). There is no context
//! inheritance hierarchy; resolution is a plain fold over the step list.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::{ActionConfig, BoxFuture, CompletionInfo, RetryPolicy};
use crate::error::{ActionError, Failure};
use crate::schema::Schema;

/// A context-producing step: `(validated_input, ctx) -> new ctx`.
pub type StepFn = Arc<dyn Fn(Value, Value) -> BoxFuture<Result<Value, Failure>> + Send + Sync>;

/// A reusable, chainable configuration and context fragment.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use typed_actions_core::Procedure;
///
/// let authed = Procedure::new()
///     .add_step(|_input: Value, _ctx: Value| async move {
///         // Look up the caller; the returned value becomes `ctx`.
///         Ok(json!({"user_id": "u_1"}))
///     });
///
/// // Branch the chain: both actions share the auth step, neither can
/// // observe configuration added to the other.
/// let for_reads = authed.clone();
/// let for_writes = authed.retry(typed_actions_core::RetryPolicy::new(3));
/// # let _ = (for_reads, for_writes);
/// ```
#[derive(Clone, Default)]
pub struct Procedure {
    steps: Vec<StepFn>,
    config: ActionConfig,
}

impl Procedure {
    /// Empty procedure: no steps, no configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a context-producing step.
    ///
    /// The step receives `(validated_input, ctx)` and its return value
    /// replaces `ctx` for the next step and the final handler.
    #[must_use]
    pub fn add_step<F, Fut>(mut self, step: F) -> Self
    where
        F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Failure>> + Send + 'static,
    {
        self.steps
            .push(Arc::new(move |input, ctx| Box::pin(step(input, ctx))));
        self
    }

    /// Append an `on_start` callback (runs with the raw input).
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

    /// Append an `on_success` callback (runs with the validated input).
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

    /// Append an `on_error` callback (runs with the normalized error).
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

    /// Append an `on_complete` callback (runs last on both paths).
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

    /// Append an `on_input_parse_error` callback.
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

    /// Set the retry policy. A policy set later in the chain (or at the
    /// action level) replaces this one wholesale.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = Some(policy);
        self
    }

    /// Set the invocation timeout. A timeout set later in the chain (or at
    /// the action level) replaces this one.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set a transform applied to the raw input before the action's input
    /// shape.
    #[must_use]
    pub fn input_transform<S: Schema + 'static>(mut self, schema: S) -> Self {
        self.config.input_transform = Some(Arc::new(schema));
        self
    }

    /// Set a transform applied to the handler result before the action's
    /// output shape.
    #[must_use]
    pub fn output_transform<S: Schema + 'static>(mut self, schema: S) -> Self {
        self.config.output_transform = Some(Arc::new(schema));
        self
    }

    /// Merge a prebuilt configuration fragment over the accumulated one.
    #[must_use]
    pub fn merge_config(mut self, fragment: &ActionConfig) -> Self {
        self.config = self.config.merged_with(fragment);
        self
    }

    /// Chain another procedure after this one: its steps run after this
    /// procedure's steps and its configuration merges over this one's.
    #[must_use]
    pub fn extend(mut self, other: Self) -> Self {
        self.steps.extend(other.steps);
        self.config = self.config.merged_with(&other.config);
        self
    }

    /// Number of context steps in the chain.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Resolve into the ordered step list and accumulated configuration.
    ///
    /// Fragments are merged eagerly as the chain is built, so resolution is
    /// a constant-time handover.
    pub(crate) fn resolve(self) -> (Vec<StepFn>, ActionConfig) {
        (self.steps, self.config)
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("steps", &self.steps.len())
            .field("config", &self.config)
            .finish()
    }
}

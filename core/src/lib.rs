//! # Typed Actions Core
//!
//! Core types and the invocation engine for typed, validated remote
//! procedures ("actions") that can be invoked in-process or exposed over
//! HTTP by the companion `typed-actions-web` crate.
//!
//! ## Core Concepts
//!
//! - **Action**: a compiled, invocable unit with an input/output shape, a
//!   handler, and a resolved configuration
//! - **Procedure**: a reusable, chainable configuration/context fragment
//!   shared by multiple actions
//! - **InvocationResult**: the `(data, error)` outcome contract with exactly
//!   one side populated
//! - **ActionError**: the normalized, tagged error every failure collapses
//!   into
//! - **Schema**: the opaque seam to whatever validation library describes
//!   input/output shapes
//!
//! ## Execution Guarantees
//!
//! - Callbacks run in chain order: procedure-level before action-level
//! - Input parsing is never retried; it is a caller bug, not a transient
//!   fault
//! - The context chain re-runs from the start on every retry attempt
//! - Timeout pre-empts retry: a timed-out invocation fails immediately with
//!   `TIMEOUT` no matter how many attempts remain
//! - Nothing escapes the engine unnormalized: `invoke` never panics and
//!   never returns anything but the result contract
//!
//! ## Example
//!
//! ```
//! use serde_json::{json, Value};
//! use typed_actions_core::{ActionBuilder, Procedure, RetryPolicy};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let authed = Procedure::new().add_step(|_input: Value, _ctx: Value| async move {
//!     Ok(json!({"user_id": "u_1"}))
//! });
//!
//! let greet = ActionBuilder::from_procedure(authed)
//!     .name("greet")
//!     .retry(RetryPolicy::new(2))
//!     .handler(|input, ctx, _meta| async move {
//!         let who = input["name"].as_str().unwrap_or("world");
//!         let by = ctx["user_id"].as_str().unwrap_or("anonymous");
//!         Ok(json!({ "greeting": format!("hello {who}"), "by": by }))
//!     });
//!
//! let result = greet.invoke(json!({"name": "ada"})).await;
//! assert_eq!(result.data().unwrap()["greeting"], "hello ada");
//! # }
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod procedure;
pub mod response_meta;
pub mod result;
pub mod schema;

pub use action::{Action, ActionBuilder, HandlerFn, InvocationMeta, InvokeOptions};
pub use config::{
    ActionConfig, BoxFuture, Callbacks, CompleteHook, CompletionInfo, ErrorHook, InvocationStatus,
    RetryDelay, RetryPolicy, StartHook, SuccessHook,
};
pub use error::{ActionError, ErrorCode, Failure};
pub use procedure::{Procedure, StepFn};
pub use response_meta::{ResponseMeta, ResponseMetaHandle};
pub use result::InvocationResult;
pub use schema::{FieldKind, Issue, ObjectSchema, Passthrough, Schema, TypedSchema};

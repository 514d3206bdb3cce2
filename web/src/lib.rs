//! HTTP routing layer for typed actions.
//!
//! Exposes [`typed_actions_core`] actions as REST-style endpoints: routes
//! bind an HTTP method and a path template such as `/posts/{id}` to an
//! action, and the [`Router`] turns incoming requests into action
//! invocations and invocation outcomes into JSON responses.
//!
//! The router is transport-free. It consumes [`ApiRequest`] and produces
//! [`ApiResponse`], both built on the `http` crate's types, so any server
//! stack can embed it with a thin adapter.
//!
//! # Examples
//!
//! ```
//! use http::Method;
//! use serde_json::json;
//! use typed_actions_core::{ActionBuilder, FieldKind, ObjectSchema};
//! use typed_actions_web::{ApiRequest, Router};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), typed_actions_web::RouterError> {
//! let get_post = ActionBuilder::new()
//!     .name("get_post")
//!     .input(ObjectSchema::new().field("id", FieldKind::String))
//!     .handler(|input, _ctx, _meta| async move { Ok(json!({ "post": input["id"] })) });
//!
//! let router = Router::new().route(Method::GET, "/posts/{id}", get_post)?;
//!
//! let response = router.handle(ApiRequest::new(Method::GET, "/posts/42")).await;
//! assert_eq!(response.status, http::StatusCode::OK);
//! assert_eq!(response.body, json!({ "post": "42" }));
//! # Ok(())
//! # }
//! ```

pub mod request;
pub mod route;
pub mod router;
pub mod status;

pub use request::{ApiRequest, ApiResponse};
pub use route::{PathTemplate, Route, RouteInfo, RouteMeta, TemplateError};
pub use router::{ResolveError, Router, RouterError};
pub use status::status_for;

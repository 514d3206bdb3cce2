//! The router: an ordered route table plus the request-handling pipeline.
//!
//! Routing is structural and first-registered-wins: the table is scanned in
//! registration order and the first route whose template matches the path
//! and whose method matches the request handles it. A path that matches some
//! route but never with the right method is a 405, a path that matches
//! nothing is a 404.
//!
//! For a matched route the router assembles the action's raw input from
//! three sources with fixed precedence (query string, then JSON body, then
//! path parameters, later sources winning on key collisions), invokes the
//! action, and renders the invocation outcome as an [`ApiResponse`] using
//! the fixed code-to-status table in [`status_for`].

use std::sync::Arc;

use http::{HeaderName, HeaderValue, Method, StatusCode};
use serde_json::{Map, Value};
use tracing::Instrument;
use typed_actions_core::{
    Action, ActionError, ErrorCode, InvocationResult, InvokeOptions, Issue, ResponseMetaHandle,
};
use uuid::Uuid;

use crate::request::{ApiRequest, ApiResponse};
use crate::route::{PathTemplate, Route, RouteInfo, RouteMeta, TemplateError};
use crate::status::status_for;

/// Errors detected while registering routes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// A `(method, normalized template)` pair registered twice.
    #[error("duplicate route {method} {path}")]
    DuplicateRoute {
        /// The duplicated method.
        method: Method,
        /// The duplicated normalized template.
        path: String,
    },
    /// The path template failed to parse.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Why no route handled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// No template matched the path.
    NotFound,
    /// A template matched the path but never with the request's method, or
    /// the request body's content type is not accepted by the route.
    MethodNotSupported,
}

type ErrorShaper = Arc<dyn Fn(&ActionError) -> ApiResponse + Send + Sync>;

/// An ordered collection of routes with shared response-shaping defaults.
#[derive(Clone)]
pub struct Router {
    routes: Vec<Route>,
    default_content_types: Vec<String>,
    error_shaper: Option<ErrorShaper>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("default_content_types", &self.default_content_types)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// An empty router accepting `application/json` bodies.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            default_content_types: vec!["application/json".to_owned()],
            error_shaper: None,
        }
    }

    /// Replace the router-wide accepted content types for body-carrying
    /// requests. Routes can still override per-route via
    /// [`RouteMeta::content_type`].
    #[must_use]
    pub fn content_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.default_content_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the default error rendering with a custom shaper.
    ///
    /// The shaper produces the entire response (status, headers, and body)
    /// for every invocation error; the fixed status table is bypassed.
    #[must_use]
    pub fn error_shaper<F>(mut self, shaper: F) -> Self
    where
        F: Fn(&ActionError) -> ApiResponse + Send + Sync + 'static,
    {
        self.error_shaper = Some(Arc::new(shaper));
        self
    }

    /// Register a route with empty metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`RouterError`] for an invalid template or a duplicate
    /// `(method, template)` pair.
    pub fn route(self, method: Method, template: &str, action: Action) -> Result<Self, RouterError> {
        self.route_with(method, template, action, RouteMeta::new())
    }

    /// Register a route with metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`RouterError`] for an invalid template or a duplicate
    /// `(method, template)` pair.
    pub fn route_with(
        self,
        method: Method,
        template: &str,
        action: Action,
        meta: RouteMeta,
    ) -> Result<Self, RouterError> {
        self.route_with_arc(method, template, Arc::new(action), meta)
    }

    /// Mount every route of `other` under `prefix`.
    ///
    /// Each mounted route is re-registered with the joined template, so the
    /// combined table still rejects duplicates and keeps registration order
    /// (this router's routes first, then `other`'s).
    ///
    /// # Errors
    ///
    /// Returns a [`RouterError`] when a joined template is invalid or
    /// collides with an existing route.
    pub fn extend(mut self, prefix: &str, other: Self) -> Result<Self, RouterError> {
        for route in other.routes {
            let joined = format!("{}/{}", prefix.trim_end_matches('/'), route.template.as_str());
            self = self.route_with_arc(route.method, &joined, route.action, route.meta)?;
        }
        Ok(self)
    }

    fn route_with_arc(
        mut self,
        method: Method,
        template: &str,
        action: Arc<Action>,
        meta: RouteMeta,
    ) -> Result<Self, RouterError> {
        let template = PathTemplate::parse(template)?;
        if self
            .routes
            .iter()
            .any(|route| route.method == method && route.template.as_str() == template.as_str())
        {
            return Err(RouterError::DuplicateRoute {
                method,
                path: template.as_str().to_owned(),
            });
        }
        self.routes.push(Route {
            method,
            template,
            action,
            meta,
        });
        Ok(self)
    }

    /// The registered routes, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Serializable views of every route, for documentation consumers.
    #[must_use]
    pub fn route_infos(&self) -> Vec<RouteInfo> {
        self.routes.iter().map(RouteInfo::from).collect()
    }

    /// Find the first route matching `(method, path)` structurally.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NotFound`] when no template matches the path,
    /// [`ResolveError::MethodNotSupported`] when one does but never with
    /// this method.
    pub fn resolve(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(&Route, std::collections::BTreeMap<String, String>), ResolveError> {
        let mut path_matched = false;
        for route in &self.routes {
            if let Some(params) = route.template.match_path(path) {
                if route.method == *method {
                    return Ok((route, params));
                }
                path_matched = true;
            }
        }
        if path_matched {
            Err(ResolveError::MethodNotSupported)
        } else {
            Err(ResolveError::NotFound)
        }
    }

    /// Handle one request end to end.
    ///
    /// This never fails: routing misses, rejected bodies, and invocation
    /// errors all come back as shaped error responses.
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            %request_id,
            method = %request.method(),
            path = request.path(),
        );

        async move {
            let response = self.dispatch(&request).await;
            tracing::info!(status = response.status.as_u16(), "request handled");
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: &ApiRequest) -> ApiResponse {
        let (route, path_params) = match self.resolve(request.method(), request.path()) {
            Ok(found) => found,
            Err(ResolveError::NotFound) => {
                return self.error_response(&ActionError::not_found("no matching route"));
            },
            Err(ResolveError::MethodNotSupported) => {
                return self.error_response(&ActionError::new(
                    ErrorCode::MethodNotSupported,
                    "method not supported for this path",
                ));
            },
        };

        // Body-carrying methods must declare an accepted content type.
        let method = request.method();
        if (method == Method::POST || method == Method::PUT || method == Method::PATCH)
            && request.body().is_some()
            && !self.content_type_accepted(route, request)
        {
            return self.error_response(&ActionError::new(
                ErrorCode::MethodNotSupported,
                "unsupported content type for this route",
            ));
        }

        let input = match assemble_input(request, path_params) {
            Ok(input) => input,
            Err(error) => return self.error_response(&error),
        };

        let handle = ResponseMetaHandle::new();
        let options = InvokeOptions {
            response: Some(handle.clone()),
        };
        let result = route.action.invoke_with(input, options).await;
        self.render(result, &handle)
    }

    fn content_type_accepted(&self, route: &Route, request: &ApiRequest) -> bool {
        let accepted = route
            .meta
            .content_types
            .as_deref()
            .unwrap_or(&self.default_content_types);
        request
            .media_type()
            .is_some_and(|media| accepted.iter().any(|ct| ct.eq_ignore_ascii_case(&media)))
    }

    fn render(&self, result: InvocationResult, handle: &ResponseMetaHandle) -> ApiResponse {
        match result.into_parts() {
            (Some(data), None) => {
                let snap = handle.snapshot();
                let status = snap
                    .status
                    .and_then(|code| StatusCode::from_u16(code).ok())
                    .unwrap_or(StatusCode::OK);
                let mut response = ApiResponse::json(status, data);
                for (name, value) in snap.headers {
                    match (
                        HeaderName::from_bytes(name.as_bytes()),
                        HeaderValue::from_str(&value),
                    ) {
                        (Ok(name), Ok(value)) => {
                            response.headers.append(name, value);
                        },
                        _ => {
                            tracing::warn!(header = %name, "skipping invalid response header");
                        },
                    }
                }
                response
            },
            (_, Some(error)) => self.error_response(&error),
            (None, None) => {
                self.error_response(&ActionError::internal("invocation produced no outcome"))
            },
        }
    }

    /// Shape one invocation error as a response, honoring the custom shaper
    /// when one is installed.
    #[must_use]
    pub fn error_response(&self, error: &ActionError) -> ApiResponse {
        if let Some(shaper) = &self.error_shaper {
            return shaper(error);
        }
        let body = serde_json::to_value(error)
            .unwrap_or_else(|_| Value::String(error.message.clone()));
        ApiResponse::json(status_for(error.code), body)
    }
}

/// Build the action's raw input object from the request.
///
/// Precedence on key collisions: query string, then JSON body, then path
/// parameters, later sources winning.
fn assemble_input(
    request: &ApiRequest,
    path_params: std::collections::BTreeMap<String, String>,
) -> Result<Value, ActionError> {
    let mut input = Map::new();

    if let Some(query) = request.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            input.insert(key.into_owned(), Value::String(value.into_owned()));
        }
    }

    // GET inputs come from the query string and path alone; the other
    // methods may also carry body fields.
    let method = request.method();
    if method == Method::POST
        || method == Method::PUT
        || method == Method::PATCH
        || method == Method::DELETE
    {
        if let Some(body) = request.body() {
            if !body.is_empty() {
                let parsed: Value = serde_json::from_slice(body).map_err(|err| {
                    ActionError::input_parse(vec![Issue::form(format!(
                        "request body is not valid JSON: {err}"
                    ))])
                })?;
                match parsed {
                    Value::Object(fields) => {
                        for (key, value) in fields {
                            input.insert(key, value);
                        }
                    },
                    Value::Null => {},
                    _ => {
                        return Err(ActionError::input_parse(vec![Issue::form(
                            "request body must be a JSON object",
                        )]));
                    },
                }
            }
        }
    }

    for (key, value) in path_params {
        input.insert(key, Value::String(value));
    }

    Ok(Value::Object(input))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;
    use typed_actions_core::ActionBuilder;

    use super::*;

    fn echo() -> Action {
        ActionBuilder::new()
            .name("echo")
            .handler(|input, _ctx, _meta| async move { Ok(input) })
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let result = Router::new()
            .route(Method::GET, "/posts/{id}", echo())
            .unwrap()
            // Normalization makes these the same template.
            .route(Method::GET, "posts/{id}/", echo());

        assert!(matches!(
            result,
            Err(RouterError::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn same_template_different_methods_coexist() {
        let router = Router::new()
            .route(Method::GET, "/posts/{id}", echo())
            .unwrap()
            .route(Method::DELETE, "/posts/{id}", echo())
            .unwrap();
        assert_eq!(router.routes().len(), 2);
    }

    #[test]
    fn resolve_distinguishes_404_from_405() {
        let router = Router::new()
            .route(Method::GET, "/posts/{id}", echo())
            .unwrap();

        assert!(router.resolve(&Method::GET, "/posts/1").is_ok());
        assert_eq!(
            router.resolve(&Method::POST, "/posts/1").unwrap_err(),
            ResolveError::MethodNotSupported
        );
        assert_eq!(
            router.resolve(&Method::GET, "/missing").unwrap_err(),
            ResolveError::NotFound
        );
    }

    #[test]
    fn first_registered_route_wins() {
        let literal = ActionBuilder::new()
            .name("literal")
            .handler(|_i, _c, _m| async move { Ok(json!("literal")) });
        let router = Router::new()
            .route(Method::GET, "/posts/latest", literal)
            .unwrap()
            .route(Method::GET, "/posts/{id}", echo())
            .unwrap();

        let (route, params) = router.resolve(&Method::GET, "/posts/latest").unwrap();
        assert_eq!(route.action().name(), Some("literal"));
        assert!(params.is_empty());

        let (route, params) = router.resolve(&Method::GET, "/posts/42").unwrap();
        assert_eq!(route.action().name(), Some("echo"));
        assert_eq!(params["id"], "42");
    }

    #[test]
    fn extend_joins_prefix_and_rejects_collisions() {
        let api = Router::new()
            .route(Method::GET, "/posts/{id}", echo())
            .unwrap();
        let root = Router::new().extend("/v1", api.clone()).unwrap();

        assert_eq!(root.routes()[0].template().as_str(), "/v1/posts/{id}");
        assert!(matches!(
            root.extend("/v1", api),
            Err(RouterError::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn route_infos_reflect_registration() {
        let router = Router::new()
            .route_with(
                Method::GET,
                "/posts/{id}",
                echo(),
                RouteMeta::new().summary("Fetch one post").tag("posts"),
            )
            .unwrap();

        let infos = router.route_infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].method, "GET");
        assert_eq!(infos[0].path, "/posts/{id}");
        assert_eq!(infos[0].summary.as_deref(), Some("Fetch one post"));
        assert_eq!(infos[0].tags, vec!["posts"]);
    }

    #[tokio::test]
    async fn input_precedence_query_body_path() {
        let router = Router::new()
            .route(Method::POST, "/items/{id}", echo())
            .unwrap();

        // `id` appears in all three sources; the path wins. `q` only in the
        // query, `b` only in the body.
        let request = ApiRequest::new(Method::POST, "/items/from-path")
            .with_query("id=from-query&q=1")
            .with_json_body(&json!({"id": "from-body", "b": 2}));

        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.body,
            json!({"id": "from-path", "q": "1", "b": 2})
        );
    }

    #[tokio::test]
    async fn get_requests_ignore_any_body() {
        let router = Router::new()
            .route(Method::GET, "/items", echo())
            .unwrap();

        let request = ApiRequest::new(Method::GET, "/items")
            .with_query("a=1")
            .with_body("{not json at all");

        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, json!({"a": "1"}));
    }

    #[tokio::test]
    async fn malformed_json_body_is_a_400_before_the_action_runs() {
        let invoked = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = std::sync::Arc::clone(&invoked);
        let action = ActionBuilder::new().handler(move |_i, _c, _m| {
            let seen = std::sync::Arc::clone(&seen);
            async move {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(json!(null))
            }
        });
        let router = Router::new().route(Method::POST, "/items", action).unwrap();

        let request = ApiRequest::new(Method::POST, "/items")
            .with_header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .with_body("{broken");

        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["code"], json!("INPUT_PARSE_ERROR"));
        assert_eq!(invoked.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_object_json_body_is_rejected() {
        let router = Router::new().route(Method::POST, "/items", echo()).unwrap();
        let request = ApiRequest::new(Method::POST, "/items").with_json_body(&json!([1, 2]));

        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn content_type_gate_applies_to_body_methods() {
        let router = Router::new().route(Method::POST, "/items", echo()).unwrap();

        let request = ApiRequest::new(Method::POST, "/items")
            .with_header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain"),
            )
            .with_body(r#"{"a": 1}"#);

        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.body["code"], json!("METHOD_NOT_SUPPORTED"));
    }

    #[tokio::test]
    async fn per_route_content_type_overrides_the_default() {
        let router = Router::new()
            .route_with(
                Method::POST,
                "/items",
                echo(),
                RouteMeta::new().content_type("text/plain"),
            )
            .unwrap();

        let request = ApiRequest::new(Method::POST, "/items")
            .with_header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain"),
            )
            .with_body(r#"{"a": 1}"#);

        assert_eq!(router.handle(request).await.status, StatusCode::OK);
    }
}

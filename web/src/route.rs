//! Path templates and registered routes.
//!
//! A path template is a `/`-separated sequence of literal segments and
//! `{name}` placeholders; a placeholder matches exactly one non-empty
//! segment and binds it to the input field `name`. Template problems are
//! configuration bugs and surface at registration time, never per request.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use http::Method;
use serde::Serialize;
use typed_actions_core::Action;

/// Errors detected while parsing a path template at registration time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A `{}` placeholder with no name.
    #[error("empty placeholder in template `{template}`")]
    EmptyPlaceholder {
        /// The offending template.
        template: String,
    },
    /// A segment with stray `{` / `}` that is not a whole placeholder.
    #[error("malformed segment `{segment}` in template `{template}`")]
    MalformedSegment {
        /// The offending template.
        template: String,
        /// The segment that failed to parse.
        segment: String,
    },
    /// The same placeholder name used twice.
    #[error("duplicate placeholder `{{{name}}}` in template `{template}`")]
    DuplicatePlaceholder {
        /// The offending template.
        template: String,
        /// The repeated placeholder name.
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    normalized: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template such as `/posts/{id}/comments`.
    ///
    /// Leading/trailing slashes and empty segments are ignored, so
    /// `/posts/{id}` and `posts/{id}/` are the same template.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for empty placeholders, stray braces, or
    /// duplicate placeholder names.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut names = BTreeSet::new();

        for part in raw.split('/').filter(|part| !part.is_empty()) {
            if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if name.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder {
                        template: raw.to_owned(),
                    });
                }
                if name.contains(['{', '}']) {
                    return Err(TemplateError::MalformedSegment {
                        template: raw.to_owned(),
                        segment: part.to_owned(),
                    });
                }
                if !names.insert(name.to_owned()) {
                    return Err(TemplateError::DuplicatePlaceholder {
                        template: raw.to_owned(),
                        name: name.to_owned(),
                    });
                }
                segments.push(Segment::Param(name.to_owned()));
            } else if part.contains(['{', '}']) {
                return Err(TemplateError::MalformedSegment {
                    template: raw.to_owned(),
                    segment: part.to_owned(),
                });
            } else {
                segments.push(Segment::Literal(part.to_owned()));
            }
        }

        let normalized = {
            let mut out = String::new();
            for segment in &segments {
                out.push('/');
                match segment {
                    Segment::Literal(lit) => out.push_str(lit),
                    Segment::Param(name) => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    },
                }
            }
            if out.is_empty() {
                out.push('/');
            }
            out
        };

        Ok(Self {
            normalized,
            segments,
        })
    }

    /// The normalized template string (`/posts/{id}`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Structurally match a concrete path, binding placeholder segments.
    ///
    /// Returns `None` when the path does not match; placeholders match
    /// exactly one non-empty segment each.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                },
                Segment::Param(name) => {
                    params.insert(name.clone(), (*part).to_owned());
                },
            }
        }
        Some(params)
    }

    /// Names of the template's placeholders, in path order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// Route metadata: documentation fields plus an optional per-route
/// content-type override.
#[derive(Debug, Clone, Default)]
pub struct RouteMeta {
    /// Short summary for documentation consumers.
    pub summary: Option<String>,
    /// Longer description for documentation consumers.
    pub description: Option<String>,
    /// Grouping tags for documentation consumers.
    pub tags: Vec<String>,
    /// Accepted request content types; the router default applies when
    /// unset.
    pub content_types: Option<Vec<String>>,
}

impl RouteMeta {
    /// Empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a grouping tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add an accepted content type, overriding the router default.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_types
            .get_or_insert_with(Vec::new)
            .push(content_type.into());
        self
    }
}

/// A registered `(method, path template) -> action` binding.
#[derive(Clone)]
pub struct Route {
    pub(crate) method: Method,
    pub(crate) template: PathTemplate,
    pub(crate) action: Arc<Action>,
    pub(crate) meta: RouteMeta,
}

impl Route {
    /// The route's HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The route's path template.
    #[must_use]
    pub const fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// The bound action.
    #[must_use]
    pub fn action(&self) -> &Arc<Action> {
        &self.action
    }

    /// The route's metadata.
    #[must_use]
    pub const fn meta(&self) -> &RouteMeta {
        &self.meta
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template.as_str())
            .field("action", &self.action.name())
            .finish_non_exhaustive()
    }
}

/// Serializable view of one route for documentation consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    /// HTTP method.
    pub method: String,
    /// Normalized path template.
    pub path: String,
    /// Action name, when set.
    pub action: Option<String>,
    /// Documentation summary.
    pub summary: Option<String>,
    /// Documentation description.
    pub description: Option<String>,
    /// Grouping tags.
    pub tags: Vec<String>,
}

impl From<&Route> for RouteInfo {
    fn from(route: &Route) -> Self {
        Self {
            method: route.method.to_string(),
            path: route.template.as_str().to_owned(),
            action: route.action.name().map(ToOwned::to_owned),
            summary: route.meta.summary.clone(),
            description: route.meta.description.clone(),
            tags: route.meta.tags.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_slashes() {
        let a = PathTemplate::parse("/posts/{id}").unwrap();
        let b = PathTemplate::parse("posts/{id}/").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "/posts/{id}");
    }

    #[test]
    fn placeholder_matches_exactly_one_segment() {
        let template = PathTemplate::parse("/posts/{id}").unwrap();

        let params = template.match_path("/posts/42").unwrap();
        assert_eq!(params["id"], "42");

        assert!(template.match_path("/posts").is_none());
        assert!(template.match_path("/posts/42/comments").is_none());
        // A placeholder never matches an empty segment.
        assert!(template.match_path("/posts//").is_none());
    }

    #[test]
    fn literals_must_match_exactly() {
        let template = PathTemplate::parse("/posts/{id}/comments").unwrap();
        assert!(template.match_path("/posts/42/comments").is_some());
        assert!(template.match_path("/posts/42/likes").is_none());
    }

    #[test]
    fn multiple_placeholders_bind_independently() {
        let template = PathTemplate::parse("/users/{user}/posts/{post}").unwrap();
        let params = template.match_path("/users/u1/posts/p9").unwrap();
        assert_eq!(params["user"], "u1");
        assert_eq!(params["post"], "p9");
        assert_eq!(template.param_names().collect::<Vec<_>>(), ["user", "post"]);
    }

    #[test]
    fn empty_placeholder_is_rejected() {
        assert_eq!(
            PathTemplate::parse("/posts/{}"),
            Err(TemplateError::EmptyPlaceholder {
                template: "/posts/{}".into()
            })
        );
    }

    #[test]
    fn stray_braces_are_rejected() {
        assert!(matches!(
            PathTemplate::parse("/posts/{id"),
            Err(TemplateError::MalformedSegment { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/posts/i}d"),
            Err(TemplateError::MalformedSegment { .. })
        ));
    }

    #[test]
    fn duplicate_placeholders_are_rejected() {
        assert_eq!(
            PathTemplate::parse("/{id}/x/{id}"),
            Err(TemplateError::DuplicatePlaceholder {
                template: "/{id}/x/{id}".into(),
                name: "id".into()
            })
        );
    }

    #[test]
    fn root_template_matches_root_path() {
        let template = PathTemplate::parse("/").unwrap();
        assert_eq!(template.as_str(), "/");
        assert!(template.match_path("/").is_some());
        assert!(template.match_path("/x").is_none());
    }
}

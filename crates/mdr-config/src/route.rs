//! Per-location markdown settings.
//!
//! Every configuration level (`[markdown]` at the top, then each `[[location]]`)
//! carries a [`RouteSettings`] whose fields are three-state: unset, `true` or
//! `false`. [`RouteTable`] resolves each location once at load time by walking from
//! the location itself through its enclosing locations up to the top level, taking
//! the first value that is explicitly set, and falling back to the defaults.

use std::sync::Arc;

use serde::Deserialize;

/// Body produced for an enabled route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Serve the markdown source unchanged, as plain text.
    #[default]
    Raw,
    /// Render the markdown source to HTML.
    #[serde(alias = "rendered")]
    Html,
}

/// Component serving an enabled route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Output filter rewriting what the static file responder produces.
    #[default]
    Filter,
    /// Content handler used instead of the static file responder.
    Handler,
}

/// Markdown settings of a single configuration level.
///
/// `None` means "inherit from the enclosing level".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    /// Enable markdown processing.
    pub enabled: Option<bool>,
    /// Use UTF-8 suffixed content types.
    pub utf8: Option<bool>,
    /// Raw or rendered output.
    pub output: Option<OutputMode>,
    /// Filter or handler.
    pub engine: Option<Engine>,
}

impl RouteSettings {
    /// Fill every unset field from `parent`.
    #[must_use]
    pub fn inherit(self, parent: &Self) -> Self {
        Self {
            enabled: self.enabled.or(parent.enabled),
            utf8: self.utf8.or(parent.utf8),
            output: self.output.or(parent.output),
            engine: self.engine.or(parent.engine),
        }
    }

    /// Apply defaults to the fields that are still unset.
    #[must_use]
    pub fn resolve(&self) -> RouteConfig {
        RouteConfig {
            enabled: self.enabled.unwrap_or(false),
            use_utf8: self.utf8.unwrap_or(false),
            output_mode: self.output.unwrap_or_default(),
            engine: self.engine.unwrap_or_default(),
        }
    }
}

/// Resolved, read-only markdown configuration of a route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteConfig {
    /// Markdown processing is active for the route.
    pub enabled: bool,
    /// Content types carry a `charset="UTF-8"` parameter.
    pub use_utf8: bool,
    /// Raw or rendered output.
    pub output_mode: OutputMode,
    /// Component serving the route.
    pub engine: Engine,
}

impl RouteConfig {
    /// The output filter participates in responses on this route.
    #[must_use]
    pub fn filter_enabled(&self) -> bool {
        self.enabled && self.engine == Engine::Filter
    }

    /// The content handler replaces the static responder on this route.
    #[must_use]
    pub fn handler_enabled(&self) -> bool {
        self.enabled && self.engine == Engine::Handler
    }
}

/// A `[[location]]` entry.
#[derive(Clone, Debug, Deserialize)]
pub struct LocationConfig {
    /// URL path prefix, e.g. `/docs`.
    pub path: String,
    /// Settings set at this level.
    #[serde(flatten)]
    pub settings: RouteSettings,
}

/// A location with its resolved configuration.
#[derive(Clone, Debug)]
pub struct Route {
    /// URL path prefix the route matches.
    pub prefix: String,
    /// Configuration shared by every request on the route.
    pub config: Arc<RouteConfig>,
}

/// Resolved routes, matched by longest prefix.
#[derive(Clone, Debug)]
pub struct RouteTable {
    /// Sorted by prefix length, longest first.
    routes: Vec<Route>,
    /// Top-level settings, used when no location matches.
    fallback: Route,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(&RouteSettings::default(), &[])
    }
}

impl RouteTable {
    /// Resolve every location against its enclosing locations and `top`.
    #[must_use]
    pub fn new(top: &RouteSettings, locations: &[LocationConfig]) -> Self {
        let mut routes: Vec<Route> = locations
            .iter()
            .map(|location| {
                let mut ancestors: Vec<&LocationConfig> = locations
                    .iter()
                    .filter(|other| prefix_matches(&other.path, &location.path))
                    .collect();
                ancestors.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

                let settings = ancestors
                    .iter()
                    .fold(RouteSettings::default(), |acc, level| {
                        acc.inherit(&level.settings)
                    })
                    .inherit(top);

                Route {
                    prefix: location.path.clone(),
                    config: Arc::new(settings.resolve()),
                }
            })
            .collect();
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Self {
            routes,
            fallback: Route {
                prefix: "/".to_owned(),
                config: Arc::new(top.resolve()),
            },
        }
    }

    /// Find the route serving `path`.
    #[must_use]
    pub fn lookup(&self, path: &str) -> &Route {
        self.routes
            .iter()
            .find(|route| prefix_matches(&route.prefix, path))
            .unwrap_or(&self.fallback)
    }

    /// Iterate over configured locations, longest prefix first.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}

/// Whether `prefix` covers `path` on a segment boundary.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    let Some(rest) = path.strip_prefix(prefix) else {
        return false;
    };
    rest.is_empty() || prefix.ends_with('/') || rest.starts_with('/')
}

//! Route matcher
//!
//! Classifies a logical request path (relative to the API base URL, e.g.
//! `feed/user/bob/`) into the authentication method and scope context that
//! protect it. Patterns are tried in order and the first match wins, so the
//! specific entries must stay above the `feed/` catch-all.

use std::sync::LazyLock;

use regex::Regex;

use super::scope::ScopeContext;
use crate::error::{FeedError, Result};

static STANDARD_ROUTES: LazyLock<RouteTable> =
    LazyLock::new(|| RouteTable::standard().unwrap());

/// How an outgoing request is authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticationMethod {
    /// Whole-request HMAC signature keyed by API key and secret
    Application,
    /// Scoped JWT carrying resource, action and feed id claims
    Feed,
}

/// One entry of the route table
#[derive(Debug, Clone)]
pub struct Route {
    pattern: Regex,
    pub auth: AuthenticationMethod,
    pub context: ScopeContext,
}

impl Route {
    fn new(pattern: &str, auth: AuthenticationMethod, context: ScopeContext) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| FeedError::Config(format!("Invalid route pattern {pattern}: {e}")))?;
        Ok(Self {
            pattern,
            auth,
            context,
        })
    }

    /// Source pattern of this route
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

/// Ordered, immutable route table
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a table from `(pattern, method, context)` rows, keeping their order
    pub fn new<'a, I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, AuthenticationMethod, ScopeContext)>,
    {
        let routes = rows
            .into_iter()
            .map(|(pattern, auth, context)| Route::new(pattern, auth, context))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { routes })
    }

    /// The feed service route table
    ///
    /// `follow_many/` and `feed/add_to_many/` appear twice. The application
    /// authentication rows come first and win; the feed authentication rows
    /// are never reached by `match_path` but stay visible via `candidates`.
    pub fn standard() -> Result<Self> {
        use AuthenticationMethod::{Application, Feed};

        Self::new([
            ("^follow_many/$", Application, ScopeContext::NoContext),
            ("^feed/add_to_many/$", Application, ScopeContext::NoContext),
            ("^activities/$", Feed, ScopeContext::Activities),
            ("^feed/.+/.+/followers/$", Feed, ScopeContext::Follower),
            ("^feed/.+/.+/follows/$", Feed, ScopeContext::Follower),
            ("^feed/.+/.+/following/.+/$", Feed, ScopeContext::Follower),
            ("^feed/add_to_many/$", Feed, ScopeContext::NoContext),
            ("^follow_many/$", Feed, ScopeContext::NoContext),
            ("^feed/", Feed, ScopeContext::Feed),
        ])
    }

    /// The standard table, compiled once per process and shared by every
    /// client
    pub fn shared() -> &'static RouteTable {
        &STANDARD_ROUTES
    }

    /// First route matching `path`
    ///
    /// # Errors
    /// `FeedError::NoMatchingRoute` when no pattern matches. Every client
    /// operation has an entry, so this indicates a bug in the caller.
    pub fn match_path(&self, path: &str) -> Result<&Route> {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .ok_or_else(|| FeedError::NoMatchingRoute(path.to_string()))
    }

    /// Every route matching `path`, in table order
    ///
    /// More than one entry means later rows are shadowed for this path.
    pub fn candidates<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Route> + 'a {
        self.routes.iter().filter(move |route| route.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

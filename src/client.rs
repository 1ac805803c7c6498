//! Feed service client
//!
//! Builds the outgoing request (URL, standard query parameters, headers,
//! body), authenticates it through the route table, sends it, and turns
//! non-2xx responses into `FeedError::Api`.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, DATE};
use serde::Serialize;

use crate::activity::Activity;
use crate::auth::{Authenticators, RouteTable, Signer, http_date_now};
use crate::config::ClientConfig;
use crate::error::{ApiError, FeedError, Result};
use crate::feed::{
    AggregatedFeed, Feed, FeedHandle, FeedId, FeedKind, FlatFeed, NotificationFeed,
};

/// Caller-supplied query parameters
pub type Params = BTreeMap<String, String>;

/// Value of the `X-Stream-Client` header
pub const CLIENT_NAME: &str = concat!("stream-feeds-rust-", env!("CARGO_PKG_VERSION"));

const API_KEY_HEADER: &str = "x-api-key";
const CLIENT_HEADER: &str = "x-stream-client";

static LOGICAL_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-.:/]*$").unwrap());

/// Client for the feed service
///
/// Cheap to clone; clones share the HTTP connection pool, signer and route
/// table.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: url::Url,
    config: ClientConfig,
    signer: Signer,
    routes: &'static RouteTable,
    authenticators: Authenticators,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("signer", &self.inner.signer)
            .finish()
    }
}

/// One edge for `follow_many`: `source` starts following `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowRelation {
    pub source: FeedId,
    pub target: FeedId,
}

impl FollowRelation {
    pub fn new(source: &Feed, target: &Feed) -> Self {
        Self {
            source: source.id(),
            target: target.id(),
        }
    }
}

#[derive(Serialize)]
struct AddToManyPayload<'a> {
    activity: &'a Activity,
    feeds: &'a [FeedId],
}

impl Client {
    /// Create a client
    ///
    /// # Errors
    /// - `Config` if the API key is missing, neither secret nor token is
    ///   set, or the location is malformed
    /// - `Transport` if the HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let secret = config.secret()?;
        let base_url = config.base_url()?;

        let http = reqwest::Client::builder()
            .user_agent(CLIENT_NAME)
            .timeout(config.timeout())
            .build()?;

        let signer = Signer::new(config.api_key.clone(), secret.expose());

        tracing::debug!(
            base_url = %base_url,
            auth = ?secret,
            "Feed client initialized"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                config,
                signer,
                routes: RouteTable::shared(),
                authenticators: Authenticators::standard(),
            }),
        })
    }

    /// Create a client from `ClientConfig::load`
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::load()?)
    }

    pub fn base_url(&self) -> &url::Url {
        &self.inner.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn signer(&self) -> &Signer {
        &self.inner.signer
    }

    pub fn routes(&self) -> &'static RouteTable {
        self.inner.routes
    }

    /// Flat feed `slug:user_id`, signed with this client's secret
    pub fn flat_feed(&self, slug: &str, user_id: &str) -> Result<FlatFeed> {
        self.feed(slug, user_id)
    }

    pub fn aggregated_feed(&self, slug: &str, user_id: &str) -> Result<AggregatedFeed> {
        self.feed(slug, user_id)
    }

    pub fn notification_feed(&self, slug: &str, user_id: &str) -> Result<NotificationFeed> {
        self.feed(slug, user_id)
    }

    /// Feed handle of any kind
    pub fn feed<K: FeedKind>(&self, slug: &str, user_id: &str) -> Result<FeedHandle<K>> {
        let mut feed = Feed::new(slug, user_id)?;
        feed.sign(&self.inner.signer)?;
        Ok(FeedHandle::new(self.clone(), feed))
    }

    /// Resolve `path` against the base URL and add the standard parameters
    pub fn absolute_url(&self, path: &str) -> Result<url::Url> {
        self.url_for(path, &Params::new())
    }

    /// `path` must be relative and free of `.`/`..` segments, so the URL
    /// requested is the path the route table classifies
    fn url_for(&self, path: &str, params: &Params) -> Result<url::Url> {
        let dot_segment = path.split('/').any(|segment| segment == "." || segment == "..");
        if !LOGICAL_PATH_RE.is_match(path) || path.starts_with('/') || dot_segment {
            return Err(FeedError::Validation(format!("invalid request path {path:?}")));
        }

        let mut url = self.inner.base_url.join(path)?;

        let mut query = Params::new();
        query.insert("api_key".to_string(), self.inner.config.api_key.clone());
        query.insert(
            "location".to_string(),
            self.inner.config.location_param().to_string(),
        );
        query.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

        url.query_pairs_mut().clear().extend_pairs(query.iter());
        Ok(url)
    }

    /// Build and authenticate a request without sending it
    ///
    /// # Steps
    /// 1. Resolve `path`, add standard and caller parameters
    /// 2. Attach base headers and the body (never for GET)
    /// 3. Match `path` against the route table
    /// 4. Sign with the matched authentication method
    pub fn build_request(
        &self,
        feed: Option<&Feed>,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        params: &Params,
    ) -> Result<reqwest::Request> {
        let url = self.url_for(path, params)?;

        let mut builder = self
            .inner
            .http
            .request(method.clone(), url)
            .header(CLIENT_HEADER, CLIENT_NAME)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, self.inner.config.api_key.as_str())
            .header(DATE, http_date_now());

        if method != Method::GET {
            if let Some(body) = body {
                builder = builder.body(body);
            }
        }

        let mut request = builder.build()?;

        let route = self.inner.routes.match_path(path)?;
        tracing::debug!(
            method = %method,
            path = %path,
            auth = ?route.auth,
            context = ?route.context,
            "Authenticating request"
        );

        self.inner.authenticators.authenticate(
            route.auth,
            &self.inner.signer,
            &mut request,
            route.context,
            feed,
        )?;

        Ok(request)
    }

    /// Send a request and return the raw body of a 2xx response
    ///
    /// # Errors
    /// - `Api` with the decoded envelope for non-2xx responses
    /// - `Json` if a non-2xx body is not an error envelope
    /// - `Transport` for network failures
    pub async fn request(
        &self,
        feed: Option<&Feed>,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        params: &Params,
    ) -> Result<Vec<u8>> {
        let request = self.build_request(feed, method.clone(), path, body, params)?;

        let response = self.inner.http.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;

        tracing::debug!(method = %method, path = %path, status = %status, "Response received");

        if status.is_success() {
            return Ok(body.to_vec());
        }

        let error: ApiError = serde_json::from_slice(&body)?;
        tracing::debug!(
            method = %method,
            path = %path,
            status = %status,
            exception = %error.exception,
            "Feed service rejected request"
        );
        Err(FeedError::Api(error))
    }

    pub(crate) async fn get(&self, feed: Option<&Feed>, path: &str, params: &Params) -> Result<Vec<u8>> {
        self.request(feed, Method::GET, path, None, params).await
    }

    pub(crate) async fn post<T: Serialize + ?Sized>(
        &self,
        feed: Option<&Feed>,
        path: &str,
        payload: &T,
        params: &Params,
    ) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(payload)?;
        self.request(feed, Method::POST, path, Some(body), params).await
    }

    pub(crate) async fn delete(&self, feed: Option<&Feed>, path: &str, params: &Params) -> Result<()> {
        self.request(feed, Method::DELETE, path, None, params).await?;
        Ok(())
    }

    /// Add one activity to many feeds in a single request
    ///
    /// `to` targets are signed before sending.
    pub async fn add_activity_to_many(&self, activity: &Activity, feeds: &[FeedId]) -> Result<()> {
        let mut activity = activity.clone();
        activity.sign_to(&self.inner.signer)?;

        let payload = AddToManyPayload {
            activity: &activity,
            feeds,
        };
        self.post(None, "feed/add_to_many/", &payload, &Params::new())
            .await?;
        Ok(())
    }

    /// Create many follow relations, copying the service's default history
    pub async fn follow_many(&self, relations: &[FollowRelation]) -> Result<()> {
        self.post(None, "follow_many/", relations, &Params::new())
            .await?;
        Ok(())
    }

    /// Create many follow relations, copying at most `copy_limit` activities
    pub async fn follow_many_with_copy_limit(
        &self,
        relations: &[FollowRelation],
        copy_limit: u32,
    ) -> Result<()> {
        let params = Params::from([("activity_copy_limit".to_string(), copy_limit.to_string())]);
        self.post(None, "follow_many/", relations, &params).await?;
        Ok(())
    }
}

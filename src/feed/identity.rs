//! Feed identity and input validation

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::Signer;
use crate::error::{FeedError, Result};

static FEED_SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());
static USER_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());
static FOREIGN_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]{8}-[a-z0-9]{4}-[1-5][a-z0-9]{3}-[a-z0-9]{4}-[a-z0-9]{12}$").unwrap()
});

/// Canonical `slug:user_id` form of a feed
///
/// Values decoded from the service are kept verbatim, so a `FeedId` is not
/// guaranteed to contain a colon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(String);

impl FeedId {
    pub fn new(slug: &str, user_id: &str) -> Self {
        Self(format!("{}:{}", slug, user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `slug:user_id` → `sluguser_id`, the message signed for feed tokens
    pub fn without_colon(&self) -> String {
        self.0.replace(':', "")
    }

    /// Split into `(slug, user_id)` at the first colon
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once(':')
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FeedId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for FeedId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A feed addressed by `(slug, user_id)`, optionally carrying its token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    slug: String,
    user_id: String,
    token: Option<String>,
}

impl Feed {
    /// Validate and build an unsigned feed
    ///
    /// # Errors
    /// `FeedError::Validation` if the slug is not `\w+` or the user id is
    /// not `[\w-]+`.
    pub fn new(slug: &str, user_id: &str) -> Result<Self> {
        Ok(Self {
            slug: validate_feed_slug(slug)?.to_string(),
            user_id: validate_user_id(user_id)?.to_string(),
            token: None,
        })
    }

    /// Parse `slug:user_id`
    pub fn parse(feed_id: &str) -> Result<Self> {
        let (slug, user_id) = feed_id
            .split_once(':')
            .ok_or_else(|| FeedError::Validation(format!("invalid feed id {feed_id:?}")))?;
        Self::new(slug, user_id)
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// `slug:user_id`
    pub fn id(&self) -> FeedId {
        FeedId::new(&self.slug, &self.user_id)
    }

    /// `slug` + `user_id` with nothing in between
    pub fn id_without_colon(&self) -> String {
        format!("{}{}", self.slug, self.user_id)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// `"<id without colon> <token>"`, or the bare id when unsigned
    pub fn signature(&self) -> String {
        match &self.token {
            Some(token) => format!("{} {}", self.id_without_colon(), token),
            None => self.id_without_colon(),
        }
    }

    /// Compute and store this feed's token
    pub fn sign(&mut self, signer: &Signer) -> Result<()> {
        self.token = Some(self.generate_token(signer)?);
        Ok(())
    }

    /// Compute this feed's token without storing it
    pub fn generate_token(&self, signer: &Signer) -> Result<String> {
        signer.sign_feed(&self.id_without_colon())
    }

    /// Base path of this feed's endpoints: `feed/{slug}/{user_id}/`
    pub(crate) fn endpoint(&self) -> String {
        format!("feed/{}/{}/", self.slug, self.user_id)
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slug, self.user_id)
    }
}

pub fn validate_feed_slug(feed_slug: &str) -> Result<&str> {
    if !FEED_SLUG_RE.is_match(feed_slug) {
        return Err(FeedError::Validation("invalid feedSlug".to_string()));
    }
    Ok(feed_slug)
}

/// Same rule as feed slugs: word characters only
pub fn validate_feed_id(feed_id: &str) -> Result<&str> {
    if !FEED_SLUG_RE.is_match(feed_id) {
        return Err(FeedError::Validation("invalid feedID".to_string()));
    }
    Ok(feed_id)
}

pub fn validate_user_id(user_id: &str) -> Result<&str> {
    if !USER_ID_RE.is_match(user_id) {
        return Err(FeedError::Validation("invalid userID".to_string()));
    }
    Ok(user_id)
}

/// Activity ids are single path segments: no `/`, `.` or `:`
pub fn validate_activity_id(activity_id: &str) -> Result<&str> {
    if activity_id.is_empty() {
        return Err(FeedError::Validation("activity id required".to_string()));
    }
    if activity_id.contains(['/', '.', ':']) {
        return Err(FeedError::Validation(format!("invalid activity id {activity_id:?}")));
    }
    Ok(activity_id)
}

/// Foreign ids used for removal must be lowercase UUIDs
pub fn validate_foreign_id(foreign_id: &str) -> Result<&str> {
    if foreign_id.is_empty() {
        return Err(FeedError::Validation("no ForeignID".to_string()));
    }
    if !FOREIGN_ID_RE.is_match(foreign_id) {
        return Err(FeedError::Validation("invalid ForeignID".to_string()));
    }
    Ok(foreign_id)
}

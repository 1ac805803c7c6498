//! Scope model
//!
//! The two axes a scoped token grants: what may be done (`ScopeAction`)
//! and on which resource family (`ScopeContext`).

use crate::error::{FeedError, Result};

/// Action allowed by a scoped token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeAction {
    /// GET, OPTIONS, HEAD
    Read,
    /// POST, PUT, PATCH
    Write,
    /// DELETE
    Delete,
    /// Every HTTP verb
    All,
}

impl ScopeAction {
    /// Wire name used in the `action` claim
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeAction::Read => "read",
            ScopeAction::Write => "write",
            ScopeAction::Delete => "delete",
            ScopeAction::All => "*",
        }
    }
}

/// Resource family a route addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeContext {
    NoContext,
    /// Activities endpoint
    Activities,
    /// Feed endpoint
    Feed,
    /// Following and followers endpoints
    Follower,
    /// Feed target updates
    FeedTargets,
    /// Any resource
    All,
}

impl ScopeContext {
    /// Wire name used in the `resource` claim
    ///
    /// `NoContext` yields an empty string, meaning "no resource claim".
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeContext::NoContext => "",
            ScopeContext::Activities => "activities",
            ScopeContext::Feed => "feed",
            ScopeContext::Follower => "follower",
            ScopeContext::FeedTargets => "feed_targets",
            ScopeContext::All => "*",
        }
    }
}

/// Map an HTTP verb to the scope action it requires
///
/// The lookup is exact and case-sensitive. There is no fallback action.
///
/// # Errors
/// `FeedError::UnsupportedVerb` for anything outside
/// GET, OPTIONS, HEAD, POST, PUT, PATCH, DELETE.
pub fn action_for_verb(verb: &str) -> Result<ScopeAction> {
    match verb {
        "GET" | "OPTIONS" | "HEAD" => Ok(ScopeAction::Read),
        "POST" | "PUT" | "PATCH" => Ok(ScopeAction::Write),
        "DELETE" => Ok(ScopeAction::Delete),
        other => Err(FeedError::UnsupportedVerb(other.to_string())),
    }
}

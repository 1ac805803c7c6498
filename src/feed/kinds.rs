//! Feed kinds and their read responses
//!
//! All feeds share one identity and one set of write operations; the kind
//! only decides how an `activities` read is decoded.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::activity::Activity;

/// Marker for a feed kind, selecting its page decoder
pub trait FeedKind: Send + Sync + 'static {
    /// Decoded response of an `activities` read
    type Page: DeserializeOwned + Send;

    const NAME: &'static str;
}

/// Activities in reverse chronological order
#[derive(Debug, Clone, Copy)]
pub struct Flat;

/// Activities grouped by the feed's aggregation format
#[derive(Debug, Clone, Copy)]
pub struct Aggregated;

/// Aggregated groups with read/seen state
#[derive(Debug, Clone, Copy)]
pub struct Notification;

impl FeedKind for Flat {
    type Page = FlatFeedPage;
    const NAME: &'static str = "flat";
}

impl FeedKind for Aggregated {
    type Page = AggregatedFeedPage;
    const NAME: &'static str = "aggregated";
}

impl FeedKind for Notification {
    type Page = NotificationFeedPage;
    const NAME: &'static str = "notification";
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlatFeedPage {
    #[serde(default)]
    pub duration: String,
    /// Path of the next page, empty on the last one
    #[serde(default)]
    pub next: String,
    #[serde(default, rename = "results")]
    pub activities: Vec<Activity>,
}

/// One aggregation group
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivityGroup {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub activity_count: u64,
    #[serde(default)]
    pub actor_count: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub verb: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AggregatedFeedPage {
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub next: String,
    #[serde(default)]
    pub results: Vec<ActivityGroup>,
}

/// Aggregation group of a notification feed
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationGroup {
    #[serde(flatten)]
    pub group: ActivityGroup,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_seen: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationFeedPage {
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub next: String,
    #[serde(default)]
    pub results: Vec<NotificationGroup>,
    #[serde(default)]
    pub unread: u64,
    #[serde(default)]
    pub unseen: u64,
}

//! Feeds
//!
//! - `identity`: `Feed`, `FeedId` and input validation
//! - `kinds`: flat, aggregated and notification markers with their pages
//! - `handle`: operations on one feed
//! - `read_options`: pagination for reads

mod handle;
mod identity;
mod kinds;
mod read_options;

pub use handle::{DEFAULT_ACTIVITY_COPY_LIMIT, FeedHandle};
pub use identity::{
    Feed, FeedId, validate_activity_id, validate_feed_id, validate_feed_slug, validate_foreign_id,
    validate_user_id,
};
pub use kinds::{
    ActivityGroup, Aggregated, AggregatedFeedPage, FeedKind, Flat, FlatFeedPage, Notification,
    NotificationFeedPage, NotificationGroup,
};
pub use read_options::FeedReadOptions;

pub type FlatFeed = FeedHandle<Flat>;
pub type AggregatedFeed = FeedHandle<Aggregated>;
pub type NotificationFeed = FeedHandle<Notification>;

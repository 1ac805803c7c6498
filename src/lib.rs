//! stream-feeds - A client for the Stream activity feed service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Feed Handles                            │
//! │  - Flat / Aggregated / Notification                          │
//! │  - Activities, follows, read/seen state                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Client                               │
//! │  - URL + standard query parameters                           │
//! │  - Route table → authenticator                               │
//! │  - Error envelope decoding                                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Auth                                │
//! │  - Feed tokens (HMAC-SHA1)                                   │
//! │  - HTTP Signatures (HMAC-SHA256)                             │
//! │  - Scoped JWT (HS256)                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `client`: Request pipeline and client-level bulk operations
//! - `feed`: Feed identity, kinds and per-feed operations
//! - `activity`: Activity model and its JSON form
//! - `auth`: Signing, scopes, routes and authenticators
//! - `config`: Configuration management
//! - `error`: Error types
//!
//! # Example
//!
//! ```no_run
//! use stream_feeds::{Activity, Client, ClientConfig, FeedReadOptions};
//!
//! # async fn run() -> stream_feeds::Result<()> {
//! let client = Client::new(ClientConfig::new("key", "secret").with_location("us-east"))?;
//! let feed = client.flat_feed("user", "bob")?;
//!
//! feed.add_activity(&Activity::new("bob", "like", "cake")).await?;
//! let page = feed.activities(&FeedReadOptions::new().limit(10)).await?;
//! println!("{} activities", page.activities.len());
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;

pub use activity::Activity;
pub use client::{Client, FollowRelation, Params};
pub use config::ClientConfig;
pub use error::{ApiError, FeedError, Result};
pub use feed::{
    AggregatedFeed, Feed, FeedHandle, FeedId, FeedReadOptions, FlatFeed, NotificationFeed,
};

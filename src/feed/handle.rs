//! Operations on a single feed

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::identity::{Feed, FeedId, validate_activity_id, validate_foreign_id};
use super::kinds::{FeedKind, Notification};
use super::read_options::FeedReadOptions;
use crate::activity::Activity;
use crate::client::{Client, Params};
use crate::error::{FeedError, Result};

/// History copied into the follower when a follow does not say otherwise
pub const DEFAULT_ACTIVITY_COPY_LIMIT: u32 = 300;

/// A signed feed bound to a client
///
/// `K` selects how `activities` decodes its response.
pub struct FeedHandle<K: FeedKind> {
    client: Client,
    feed: Feed,
    kind: PhantomData<K>,
}

impl<K: FeedKind> Clone for FeedHandle<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            feed: self.feed.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: FeedKind> std::fmt::Debug for FeedHandle<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("kind", &K::NAME)
            .field("feed", &self.feed.id())
            .finish()
    }
}

#[derive(Serialize)]
struct ActivitiesPayload<'a> {
    activities: &'a [Activity],
}

#[derive(Deserialize)]
struct ActivitiesResponse {
    #[serde(default)]
    activities: Vec<Activity>,
}

#[derive(Serialize)]
struct FollowPayload<'a> {
    target: &'a FeedId,
    activity_copy_limit: u32,
}

/// One row of a `followers/` or `follows/` listing
#[derive(Debug, Default, Deserialize)]
struct FollowEdge {
    #[serde(default)]
    feed_id: String,
    #[serde(default)]
    target_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct FollowEdges {
    #[serde(default)]
    results: Vec<FollowEdge>,
}

impl<K: FeedKind> FeedHandle<K> {
    pub(crate) fn new(client: Client, feed: Feed) -> Self {
        Self {
            client,
            feed,
            kind: PhantomData,
        }
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn id(&self) -> FeedId {
        self.feed.id()
    }

    pub fn slug(&self) -> &str {
        self.feed.slug()
    }

    pub fn user_id(&self) -> &str {
        self.feed.user_id()
    }

    pub fn token(&self) -> Option<&str> {
        self.feed.token()
    }

    /// Read-only token for this feed, to hand out to a browser client
    pub fn read_only_token(&self) -> Result<String> {
        self.client.signer().generate_scoped_token(
            crate::auth::ScopeContext::Feed,
            crate::auth::ScopeAction::Read,
            &self.feed.id_without_colon(),
        )
    }

    /// Add one activity, returning it as stored by the service
    ///
    /// `to` targets are signed before sending.
    pub async fn add_activity(&self, activity: &Activity) -> Result<Activity> {
        let mut activity = activity.clone();
        activity.sign_to(self.client.signer())?;

        let body = self
            .client
            .post(Some(&self.feed), &self.feed.endpoint(), &activity, &Params::new())
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Add several activities in one request
    pub async fn add_activities(&self, activities: &[Activity]) -> Result<Vec<Activity>> {
        let signed = activities
            .iter()
            .map(|activity| {
                let mut activity = activity.clone();
                activity.sign_to(self.client.signer())?;
                Ok(activity)
            })
            .collect::<Result<Vec<_>>>()?;

        let payload = ActivitiesPayload {
            activities: &signed,
        };
        let body = self
            .client
            .post(Some(&self.feed), &self.feed.endpoint(), &payload, &Params::new())
            .await?;
        let response: ActivitiesResponse = serde_json::from_slice(&body)?;
        Ok(response.activities)
    }

    /// Remove an activity by its service-assigned id
    ///
    /// # Errors
    /// `Validation` if `activity_id` is empty or not a single path segment,
    /// before any request is made.
    pub async fn remove_activity(&self, activity_id: &str) -> Result<()> {
        let activity_id = validate_activity_id(activity_id)?;
        let path = format!("{}{}/", self.feed.endpoint(), activity_id);
        self.client.delete(Some(&self.feed), &path, &Params::new()).await
    }

    /// Remove an activity by its `foreign_id`
    ///
    /// # Errors
    /// `Validation` if `foreign_id` is empty or not a UUID, before any
    /// request is made.
    pub async fn remove_activity_by_foreign_id(&self, foreign_id: &str) -> Result<()> {
        let foreign_id = validate_foreign_id(foreign_id)?;
        let path = format!("{}{}/", self.feed.endpoint(), foreign_id);
        let params = Params::from([("foreign_id".to_string(), "1".to_string())]);
        self.client.delete(Some(&self.feed), &path, &params).await
    }

    /// Replace stored activities, matched by `foreign_id` and `time`
    ///
    /// # Errors
    /// `Validation`, before any request is made, if the list is empty or an
    /// activity lacks `foreign_id` or `time`.
    pub async fn update_activities(&self, activities: &[Activity]) -> Result<()> {
        if activities.is_empty() {
            return Err(FeedError::Validation("activities must not be empty".to_string()));
        }
        for activity in activities {
            if activity.foreign_id.as_deref().is_none_or(str::is_empty) {
                return Err(FeedError::Validation("activity foreign_id required".to_string()));
            }
            if activity.time.is_none() {
                return Err(FeedError::Validation("activity time required".to_string()));
            }
        }

        // Activities are addressed globally, so the token is not bound to this feed
        let payload = ActivitiesPayload { activities };
        self.client
            .post(None, "activities/", &payload, &Params::new())
            .await?;
        Ok(())
    }

    /// Follow `target`, copying the default amount of history
    pub async fn follow(&self, target: &Feed) -> Result<()> {
        self.follow_with_copy_limit(target, DEFAULT_ACTIVITY_COPY_LIMIT)
            .await
    }

    /// Follow `target`, copying at most `copy_limit` of its activities
    pub async fn follow_with_copy_limit(&self, target: &Feed, copy_limit: u32) -> Result<()> {
        let target = target.id();
        let payload = FollowPayload {
            target: &target,
            activity_copy_limit: copy_limit,
        };
        let path = format!("{}following/", self.feed.endpoint());
        self.client
            .post(Some(&self.feed), &path, &payload, &Params::new())
            .await?;
        Ok(())
    }

    /// Stop following `target` and drop its activities from this feed
    pub async fn unfollow(&self, target: &Feed) -> Result<()> {
        self.unfollow_with_params(target, Params::new()).await
    }

    /// Stop following `target` but keep activities already copied
    pub async fn unfollow_keeping_history(&self, target: &Feed) -> Result<()> {
        let params = Params::from([("keep_history".to_string(), "1".to_string())]);
        self.unfollow_with_params(target, params).await
    }

    async fn unfollow_with_params(&self, target: &Feed, params: Params) -> Result<()> {
        let path = format!("{}following/{}/", self.feed.endpoint(), target.id());
        self.client.delete(Some(&self.feed), &path, &params).await
    }

    /// Feeds following this one
    pub async fn followers(&self, limit: u32, offset: u32) -> Result<Vec<Feed>> {
        let path = format!("{}followers/", self.feed.endpoint());
        let edges = self.follow_edges(&path, limit, offset).await?;
        Ok(parse_edges(edges.results.iter().map(|edge| edge.feed_id.as_str())))
    }

    /// Feeds this one follows
    pub async fn following(&self, limit: u32, offset: u32) -> Result<Vec<Feed>> {
        let path = format!("{}follows/", self.feed.endpoint());
        let edges = self.follow_edges(&path, limit, offset).await?;
        Ok(parse_edges(edges.results.iter().map(|edge| edge.target_id.as_str())))
    }

    async fn follow_edges(&self, path: &str, limit: u32, offset: u32) -> Result<FollowEdges> {
        let params = FeedReadOptions::new().limit(limit).offset(offset).params();
        let body = self.client.get(Some(&self.feed), path, &params).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Read a page of activities
    pub async fn activities(&self, options: &FeedReadOptions) -> Result<K::Page> {
        let body = self
            .client
            .get(Some(&self.feed), &self.feed.endpoint(), &options.params())
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl FeedHandle<Notification> {
    /// Read the latest page and mark the given activity groups as read
    pub async fn mark_activities_as_read(
        &self,
        activity_ids: &[&str],
    ) -> Result<<Notification as FeedKind>::Page> {
        let params = Params::from([("mark_read".to_string(), activity_ids.join(","))]);
        let body = self
            .client
            .get(Some(&self.feed), &self.feed.endpoint(), &params)
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Read up to `limit` groups and mark them all as seen
    pub async fn mark_activities_as_seen_with_limit(
        &self,
        limit: u32,
    ) -> Result<<Notification as FeedKind>::Page> {
        let params = Params::from([
            ("mark_seen".to_string(), "true".to_string()),
            ("limit".to_string(), limit.to_string()),
        ]);
        let body = self
            .client
            .get(Some(&self.feed), &self.feed.endpoint(), &params)
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Parse `slug:user_id` listings, skipping malformed rows
fn parse_edges<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<Feed> {
    ids.filter_map(|id| match Feed::parse(id) {
        Ok(feed) => Some(feed),
        Err(e) => {
            tracing::debug!(feed_id = %id, error = %e, "Skipping malformed follow row");
            None
        }
    })
    .collect()
}

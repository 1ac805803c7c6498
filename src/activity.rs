//! Activity payloads
//!
//! An activity is encoded as a flat JSON object. Known fields map onto
//! struct fields; any other top-level key is carried in `metadata`.
//!
//! ```text
//! {"actor": "user:1", "verb": "tweet", "object": "tweet:1", "origin": "",
//!  "time": "2016-09-22T21:44:58.821577", "foreign_id": "...", "mood": "happy"}
//! ```

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::auth::Signer;
use crate::error::Result;
use crate::feed::FeedId;

/// Wire format of `time`: microseconds, no zone
pub const ACTIVITY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// A single event posted to one or more feeds
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Activity {
    /// Assigned by the service
    pub id: Option<String>,
    pub actor: String,
    pub verb: String,
    pub object: String,
    pub target: Option<String>,
    /// Feed the activity was copied from
    pub origin: Option<FeedId>,
    /// Encoded as the current UTC time when unset
    pub time: Option<NaiveDateTime>,
    pub foreign_id: Option<String>,
    /// Arbitrary JSON stored under `data`
    pub data: Option<Value>,
    /// Extra top-level fields
    pub metadata: BTreeMap<String, String>,
    /// Additional feeds to fan the activity out to
    pub to: Vec<FeedId>,
    /// Ranking score, only present on ranked reads
    pub score: Option<f64>,
    signed_to: Vec<String>,
}

impl Activity {
    pub fn new(actor: impl Into<String>, verb: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            verb: verb.into(),
            object: object.into(),
            ..Default::default()
        }
    }

    pub fn with_foreign_id(mut self, foreign_id: impl Into<String>) -> Self {
        self.foreign_id = Some(foreign_id.into());
        self
    }

    pub fn with_time(mut self, time: NaiveDateTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_to(mut self, to: impl IntoIterator<Item = FeedId>) -> Self {
        self.to = to.into_iter().collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sign every `to` target as `"<feed id> <token>"`
    ///
    /// The service only accepts `to` entries that carry a token for the
    /// target feed.
    pub fn sign_to(&mut self, signer: &Signer) -> Result<()> {
        self.signed_to = self
            .to
            .iter()
            .map(|feed_id| {
                let token = signer.generate_token(&feed_id.without_colon())?;
                Ok(format!("{} {}", feed_id, token))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    /// `to` entries as they will be sent
    pub fn signed_to(&self) -> &[String] {
        &self.signed_to
    }

    fn to_json_map(&self) -> Map<String, Value> {
        let mut payload = Map::new();

        for (key, value) in &self.metadata {
            payload.insert(key.clone(), Value::String(value.clone()));
        }

        payload.insert("actor".into(), Value::String(self.actor.clone()));
        payload.insert("verb".into(), Value::String(self.verb.clone()));
        payload.insert("object".into(), Value::String(self.object.clone()));
        payload.insert(
            "origin".into(),
            Value::String(
                self.origin
                    .as_ref()
                    .map(|origin| origin.to_string())
                    .unwrap_or_default(),
            ),
        );

        if let Some(id) = &self.id {
            payload.insert("id".into(), Value::String(id.clone()));
        }
        if let Some(target) = &self.target {
            payload.insert("target".into(), Value::String(target.clone()));
        }
        if let Some(data) = &self.data {
            payload.insert("data".into(), data.clone());
        }
        if let Some(foreign_id) = &self.foreign_id {
            payload.insert("foreign_id".into(), Value::String(foreign_id.clone()));
        }

        let time = self.time.unwrap_or_else(|| Utc::now().naive_utc());
        payload.insert(
            "time".into(),
            Value::String(time.format(ACTIVITY_TIME_FORMAT).to_string()),
        );

        if !self.signed_to.is_empty() {
            payload.insert("to".into(), serde_json::json!(self.signed_to));
        } else if !self.to.is_empty() {
            payload.insert("to".into(), serde_json::json!(self.to));
        }

        payload
    }

    fn from_json_map(raw: Map<String, Value>) -> Self {
        let mut activity = Activity::default();

        for (key, value) in raw {
            if value.is_null() {
                continue;
            }

            match key.to_lowercase().as_str() {
                "id" => activity.id = value.as_str().map(str::to_string),
                "actor" => activity.actor = string_value(&value),
                "verb" => activity.verb = string_value(&value),
                "object" => activity.object = string_value(&value),
                "foreign_id" => activity.foreign_id = value.as_str().map(str::to_string),
                "target" => activity.target = value.as_str().map(str::to_string),
                "origin" => {
                    activity.origin = value
                        .as_str()
                        .filter(|origin| !origin.is_empty())
                        .map(FeedId::from)
                }
                "time" => activity.time = value.as_str().and_then(parse_activity_time),
                "data" => activity.data = Some(value),
                "score" => activity.score = value.as_f64(),
                "to" => {
                    if let Some(list) = value.as_array() {
                        activity.to = list
                            .iter()
                            .filter_map(Value::as_str)
                            .map(FeedId::from)
                            .collect();
                    }
                }
                _ => {
                    let value = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    activity.metadata.insert(key, value);
                }
            }
        }

        activity
    }
}

fn string_value(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

/// Parse an activity timestamp
///
/// Accepts the wire format with any number of fractional digits, and
/// RFC 3339 timestamps (converted to UTC). Anything else yields `None`.
pub fn parse_activity_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|time| time.naive_utc())
        })
}

impl Serialize for Activity {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Activity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Object(raw) => Ok(Activity::from_json_map(raw)),
            other => Err(D::Error::custom(format!(
                "expected activity object, got {other}"
            ))),
        }
    }
}

//! Pagination and ranking options for feed reads

use std::collections::BTreeMap;

/// Query parameters of an `activities` read
///
/// Only the options that were set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReadOptions {
    limit: Option<u32>,
    offset: Option<u32>,
    id_gte: Option<String>,
    id_gt: Option<String>,
    id_lte: Option<String>,
    id_lt: Option<String>,
    ranking: Option<String>,
}

impl FeedReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn id_gte(mut self, id: impl Into<String>) -> Self {
        self.id_gte = Some(id.into());
        self
    }

    pub fn id_gt(mut self, id: impl Into<String>) -> Self {
        self.id_gt = Some(id.into());
        self
    }

    pub fn id_lte(mut self, id: impl Into<String>) -> Self {
        self.id_lte = Some(id.into());
        self
    }

    pub fn id_lt(mut self, id: impl Into<String>) -> Self {
        self.id_lt = Some(id.into());
        self
    }

    /// Ranking method configured for a ranked flat feed
    pub fn ranking(mut self, ranking: impl Into<String>) -> Self {
        self.ranking = Some(ranking.into());
        self
    }

    pub fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();

        if let Some(limit) = self.limit {
            params.insert("limit".to_string(), limit.to_string());
        }
        if let Some(offset) = self.offset {
            params.insert("offset".to_string(), offset.to_string());
        }

        let ids = [
            ("id_gte", &self.id_gte),
            ("id_gt", &self.id_gt),
            ("id_lte", &self.id_lte),
            ("id_lt", &self.id_lt),
            ("ranking", &self.ranking),
        ];
        for (name, value) in ids {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                params.insert(name.to_string(), value.to_string());
            }
        }

        params
    }
}

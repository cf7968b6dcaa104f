//! AniList GraphQL client.

use super::types::{AnimeSummary, MediaTitle};
use super::{decode, Transport};
use crate::cache::{CacheStats, SearchCache};
use crate::error::{Catalog, CatalogError, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const ANIME_QUERY: &str = r#"
query ($id: Int) {
    Media (id: $id, type: ANIME) {
        id
        title {
            romaji
            english
            native
        }
        coverImage {
            large
            medium
            color
        }
        status
        startDate {
            year
            month
            day
        }
        description
        episodes
        duration
    }
}
"#;

const SEARCH_QUERY: &str = r#"
query ($title: String) {
    Page {
        media (search: $title, type: ANIME) {
            id
            title {
                english
                romaji
            }
            description
            startDate {
                year
            }
            status
            coverImage {
                large
                medium
            }
            averageScore
        }
    }
}
"#;

/// AniList client with its own search cache
pub struct AniListClient {
    transport: Arc<dyn Transport>,
    endpoint: String,
    cache: SearchCache<Vec<Value>>,
}

impl AniListClient {
    pub const DEFAULT_ENDPOINT: &'static str = "https://graphql.anilist.co";

    /// Create a new client; searches are cached per title
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        cache_capacity: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            cache: SearchCache::new(cache_capacity, cache_ttl),
        }
    }

    async fn query(&self, document: &str, variables: Value) -> Result<Option<Value>> {
        let body = json!({ "query": document, "variables": variables });
        let response = self.transport.post_json(&self.endpoint, &body).await?;
        decode(Catalog::AniList, &self.endpoint, response)
    }

    /// Fetch one anime by AniList ID
    pub async fn get_anime(&self, anime_id: i64) -> Result<Option<Value>> {
        debug!(anime_id = anime_id, "Fetching anime");
        self.query(ANIME_QUERY, json!({ "id": anime_id })).await
    }

    /// Search anime by title, returning `data.Page.media`
    ///
    /// Results for an identical title are served from the cache while fresh.
    /// Failed searches are not cached.
    pub async fn search_anime(&self, title: &str) -> Result<Option<Arc<Vec<Value>>>> {
        if let Some(cached) = self.cache.get(title) {
            return Ok(Some(cached));
        }

        info!(title = %title, "Searching anime");
        let Some(body) = self.query(SEARCH_QUERY, json!({ "title": title })).await? else {
            return Ok(None);
        };

        let media = match body.pointer("/data/Page/media") {
            Some(Value::Array(items)) => items.clone(),
            _ => {
                return Err(CatalogError::invalid(
                    Catalog::AniList,
                    "search response has no data.Page.media list",
                ))
            }
        };

        debug!(title = %title, results = media.len(), "Search complete");
        Ok(Some(self.cache.insert(title, media)))
    }

    /// Search and trim every result down to an [`AnimeSummary`]
    pub async fn search_anime_clean(&self, title: &str) -> Result<Option<Vec<AnimeSummary>>> {
        Ok(self
            .search_anime(title)
            .await?
            .map(|media| media.iter().map(clean_anime_data).collect()))
    }

    /// Statistics of the search cache
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Reduce a raw search entry to id, title, description and cover
pub fn clean_anime_data(raw: &Value) -> AnimeSummary {
    let title = raw
        .get("title")
        .cloned()
        .and_then(|t| serde_json::from_value::<MediaTitle>(t).ok())
        .unwrap_or_default();

    AnimeSummary {
        id: raw.get("id").and_then(Value::as_i64),
        title: title.preferred().unwrap_or("N/A").to_string(),
        description: raw
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string(),
        cover_image: raw
            .pointer("/coverImage/large")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

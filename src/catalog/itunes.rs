//! iTunes Search API client.
//!
//! Two endpoints, no auth:
//!   - `/search?media=podcast&term=…`           → podcasts
//!   - `/lookup?id=…&entity=podcastEpisode`     → episode list
//!   - `/search?entity=podcastEpisode&term=…`   → broad episode search
//!
//! The API's field names vary by record kind (`collectionName` for
//! podcasts, `trackName` for episodes, two artwork sizes); everything is
//! normalized here at the boundary into the crate's fixed shapes.

use super::{CatalogClient, CatalogEpisode, CatalogEpisodeHit, CatalogPodcast};
use crate::config::ResolverConfig;
use crate::error::CatalogError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const SEARCH_ENDPOINT: &str = "https://itunes.apple.com/search";
const LOOKUP_ENDPOINT: &str = "https://itunes.apple.com/lookup";

/// How many episodes to pull per lookup. Large on purpose — keyword
/// matching needs the full recent list.
const EPISODE_LOOKUP_LIMIT: usize = 100;

pub struct ItunesClient {
    http: reqwest::Client,
    search_limit: usize,
}

// ── Wire shapes ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawRecord>,
}

/// One result record. The API mixes podcast and episode records in
/// lookup responses, discriminated by `wrapperType` / `kind`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(default)]
    wrapper_type: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    collection_id: Option<u64>,
    #[serde(default)]
    track_id: Option<u64>,
    #[serde(default)]
    collection_name: Option<String>,
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    feed_url: Option<String>,
    #[serde(default)]
    artwork_url_600: Option<String>,
    #[serde(default)]
    artwork_url_100: Option<String>,
    #[serde(default)]
    track_time_millis: Option<u64>,
}

impl RawRecord {
    fn is_podcast(&self) -> bool {
        self.wrapper_type.as_deref() == Some("track") && self.kind.as_deref() == Some("podcast")
            || self.wrapper_type.as_deref() == Some("collection")
    }

    fn is_episode(&self) -> bool {
        self.kind.as_deref() == Some("podcast-episode")
            || self.wrapper_type.as_deref() == Some("podcastEpisode")
    }

    fn artwork(&self) -> Option<String> {
        self.artwork_url_600
            .clone()
            .or_else(|| self.artwork_url_100.clone())
    }

    fn into_podcast(self) -> Option<CatalogPodcast> {
        let id = self.collection_id.or(self.track_id)?;
        let artwork = self.artwork();
        let title = self.collection_name.or(self.track_name)?;
        Some(CatalogPodcast {
            id,
            title,
            artist_name: self.artist_name.unwrap_or_default(),
            feed_url: self.feed_url,
            artwork_url: artwork,
            match_confidence: 0.0,
        })
    }

    fn into_episode(self) -> Option<CatalogEpisode> {
        let id = self.track_id?;
        let artwork = self.artwork();
        let title = self.track_name?;
        Some(CatalogEpisode {
            id,
            title,
            duration_ms: self.track_time_millis,
            artwork_url: artwork,
            match_confidence: 0.0,
        })
    }
}

impl ItunesClient {
    pub fn new(timeout: Duration, search_limit: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { http, search_limit }
    }

    /// Build a client carrying the shared resolver timeout and search
    /// limit.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.request_timeout, config.search_limit)
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<SearchResponse, CatalogError> {
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        // iTunes serves JSON with a text/javascript content type, so
        // parse from the raw body rather than response.json().
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CatalogClient for ItunesClient {
    async fn search_podcasts(&self, term: &str) -> Result<Vec<CatalogPodcast>, CatalogError> {
        let parsed = self
            .get(
                SEARCH_ENDPOINT,
                &[
                    ("media", "podcast".to_string()),
                    ("term", term.to_string()),
                    ("limit", self.search_limit.to_string()),
                ],
            )
            .await?;

        let podcasts: Vec<CatalogPodcast> = parsed
            .results
            .into_iter()
            .filter(RawRecord::is_podcast)
            .filter_map(RawRecord::into_podcast)
            .collect();
        log::debug!("[CATALOG] search {:?} -> {} podcasts", term, podcasts.len());
        Ok(podcasts)
    }

    async fn lookup_episodes(&self, podcast_id: u64) -> Result<Vec<CatalogEpisode>, CatalogError> {
        let parsed = self
            .get(
                LOOKUP_ENDPOINT,
                &[
                    ("id", podcast_id.to_string()),
                    ("entity", "podcastEpisode".to_string()),
                    ("limit", EPISODE_LOOKUP_LIMIT.to_string()),
                ],
            )
            .await?;

        // The first record echoes the podcast itself; keep episodes only.
        let episodes: Vec<CatalogEpisode> = parsed
            .results
            .into_iter()
            .filter(RawRecord::is_episode)
            .filter_map(RawRecord::into_episode)
            .collect();
        log::debug!("[CATALOG] lookup {} -> {} episodes", podcast_id, episodes.len());
        Ok(episodes)
    }

    async fn search_episodes(&self, term: &str) -> Result<Vec<CatalogEpisodeHit>, CatalogError> {
        let parsed = self
            .get(
                SEARCH_ENDPOINT,
                &[
                    ("media", "podcast".to_string()),
                    ("entity", "podcastEpisode".to_string()),
                    ("term", term.to_string()),
                    ("limit", self.search_limit.to_string()),
                ],
            )
            .await?;

        let hits: Vec<CatalogEpisodeHit> = parsed
            .results
            .into_iter()
            .filter(|r| r.is_episode())
            .filter_map(|r| {
                let podcast_id = r.collection_id?;
                let podcast_title = r.collection_name.clone()?;
                let episode = r.into_episode()?;
                Some(CatalogEpisodeHit { episode, podcast_id, podcast_title })
            })
            .collect();
        log::debug!("[CATALOG] episode search {:?} -> {} hits", term, hits.len());
        Ok(hits)
    }
}

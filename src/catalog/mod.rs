//! Catalog domain — the external podcast directory.
//!
//! The client trait returns records already normalized into the fixed
//! shapes below, so downstream scoring never branches on the catalog's
//! duck-typed field variants (`collectionName` vs `trackName`,
//! `artworkUrl600` vs `artworkUrl100`).

pub mod itunes;

pub use itunes::ItunesClient;

use crate::error::CatalogError;
use async_trait::async_trait;

/// A podcast returned by catalog search, annotated with the similarity
/// score against the query that produced it. Owned by one resolution
/// call; never cached beyond it.
#[derive(Debug, Clone)]
pub struct CatalogPodcast {
    pub id: u64,
    pub title: String,
    pub artist_name: String,
    pub feed_url: Option<String>,
    pub artwork_url: Option<String>,
    pub match_confidence: f64,
}

/// An episode from a podcast's episode list.
#[derive(Debug, Clone)]
pub struct CatalogEpisode {
    pub id: u64,
    pub title: String,
    pub duration_ms: Option<u64>,
    pub artwork_url: Option<String>,
    pub match_confidence: f64,
}

/// A broad episode-search hit, carrying its parent podcast's title.
#[derive(Debug, Clone)]
pub struct CatalogEpisodeHit {
    pub episode: CatalogEpisode,
    pub podcast_id: u64,
    pub podcast_title: String,
}

/// Query layer over the podcast directory. No matching logic — request
/// and response shaping only.
///
/// Empty result sets are `Ok(vec![])`, never errors.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Search podcasts by free-text term.
    async fn search_podcasts(&self, term: &str) -> Result<Vec<CatalogPodcast>, CatalogError>;

    /// Fetch the episode list for a podcast id.
    async fn lookup_episodes(&self, podcast_id: u64) -> Result<Vec<CatalogEpisode>, CatalogError>;

    /// Search episodes directly, with no podcast constraint.
    async fn search_episodes(&self, term: &str) -> Result<Vec<CatalogEpisodeHit>, CatalogError>;
}

//! Catalog resolution — multi-phase search and validation.
//!
//! Phases run through one loop, in a fixed order, each returning the
//! best result it could produce. The loop stops at the first result
//! with combined confidence ≥ `CONFIDENT_RESOLUTION`:
//!
//!   1. spatial-pair validation (both orientations)
//!   2. individual candidate + nearest-neighbor episode guess
//!   3. exact-then-cleaned podcast search
//!   4. keyword matching over cached episode lists
//!   5. broad episode search with no podcast constraint
//!
//! Later phases are strictly cheaper to skip when an earlier one
//! succeeds, so catalog calls stay sequential within one resolution.
//! A `CatalogError` inside a phase is a miss for that phase, never a
//! fatal error. "All phases exhausted" is the `not_found()` sentinel,
//! not an exception.

use crate::catalog::{CatalogClient, CatalogEpisode, CatalogPodcast};
use crate::config::{
    self, combined_confidence, BROAD_SEARCH_DISCOUNT, CONFIDENT_RESOLUTION,
    EPISODE_ACCEPT_LOOSE, EPISODE_ACCEPT_PAIR, EXACT_SEARCH_ACCEPT,
    KEYWORD_MIN_COVERAGE, PODCAST_ACCEPT,
};
use crate::error::OcrError;
use crate::ocr::{extract_candidates, extract_timestamp, OcrProvider, TextCandidate};
use crate::pairing::{propose_pairs, SpatialPair};
use crate::similarity::similarity;
use std::collections::HashMap;
use std::sync::Arc;

/// Terminal output of one resolution. `method` names the phase that
/// produced the match — diagnostic only, never scored.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub podcast_title: String,
    pub episode_title: String,
    pub confidence: f64,
    pub method: String,
    pub validated: bool,
}

impl ResolutionResult {
    /// The explicit "not found" sentinel. Always preferred over a
    /// low-confidence guess.
    pub fn not_found() -> Self {
        Self {
            podcast_title: String::new(),
            episode_title: String::new(),
            confidence: 0.0,
            method: "none".to_string(),
            validated: false,
        }
    }

    fn matched(
        podcast: &CatalogPodcast,
        episode_title: &str,
        confidence: f64,
        method: &str,
    ) -> Self {
        Self {
            podcast_title: podcast.title.clone(),
            episode_title: episode_title.to_string(),
            confidence,
            method: method.to_string(),
            validated: confidence >= CONFIDENT_RESOLUTION,
        }
    }
}

/// Per-resolution episode-list cache, keyed by podcast id.
///
/// Scoped to one `resolve()` call and cleared before it returns, on
/// every path — stale episode lists must never leak across screenshots.
/// Passed explicitly; never process-wide.
#[derive(Debug, Default)]
pub struct EpisodeCache {
    entries: HashMap<u64, Vec<CatalogEpisode>>,
}

impl EpisodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, podcast_id: u64) -> Option<&[CatalogEpisode]> {
        self.entries.get(&podcast_id).map(|v| v.as_slice())
    }

    fn insert(&mut self, podcast_id: u64, episodes: Vec<CatalogEpisode>) {
        self.entries.insert(podcast_id, episodes);
    }
}

/// Ordered phase list. One loop in `resolve_with_cache` drives these;
/// the first confident result wins.
#[derive(Debug, Clone, Copy)]
enum Phase {
    SpatialPairs,
    IndividualCandidates,
    CleanedPodcastSearch,
    KeywordEpisodes,
    BroadEpisodeSearch,
}

const PHASES: [Phase; 5] = [
    Phase::SpatialPairs,
    Phase::IndividualCandidates,
    Phase::CleanedPodcastSearch,
    Phase::KeywordEpisodes,
    Phase::BroadEpisodeSearch,
];

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::SpatialPairs => "spatial_pair",
            Phase::IndividualCandidates => "individual_candidate",
            Phase::CleanedPodcastSearch => "cleaned_search",
            Phase::KeywordEpisodes => "keyword",
            Phase::BroadEpisodeSearch => "broad_episode_search",
        }
    }
}

pub struct Resolver {
    catalog: Arc<dyn CatalogClient>,
}

impl Resolver {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }

    /// Resolve one screenshot's candidates to a (podcast, episode) pair.
    pub async fn resolve(
        &self,
        candidates: &[TextCandidate],
        pairs: &[SpatialPair],
    ) -> ResolutionResult {
        let mut cache = EpisodeCache::new();
        self.resolve_with_cache(candidates, pairs, &mut cache).await
    }

    /// `resolve` with an injected cache, for callers that want to
    /// observe cache discipline. The cache is cleared before returning
    /// regardless of outcome.
    pub async fn resolve_with_cache(
        &self,
        candidates: &[TextCandidate],
        pairs: &[SpatialPair],
        cache: &mut EpisodeCache,
    ) -> ResolutionResult {
        let mut best_attempt = ResolutionResult::not_found();

        for phase in PHASES {
            let result = match phase {
                Phase::SpatialPairs => self.phase_spatial_pairs(pairs, cache).await,
                Phase::IndividualCandidates => {
                    self.phase_individual_candidates(candidates, cache).await
                }
                Phase::CleanedPodcastSearch => {
                    self.phase_cleaned_search(candidates, cache).await
                }
                Phase::KeywordEpisodes => self.phase_keyword_episodes(candidates, cache).await,
                Phase::BroadEpisodeSearch => self.phase_broad_search(candidates).await,
            };

            if let Some(result) = result {
                if result.confidence >= CONFIDENT_RESOLUTION {
                    log::info!(
                        "[RESOLVE] {} resolved {:?} / {:?} at {:.2}",
                        phase.name(),
                        result.podcast_title,
                        result.episode_title,
                        result.confidence
                    );
                    cache.clear();
                    return result;
                }
                if result.confidence > best_attempt.confidence {
                    best_attempt = result;
                }
            }
        }

        cache.clear();
        log::info!(
            "[RESOLVE] no confident match (best attempt {:.2} via {}) — reporting not found",
            best_attempt.confidence,
            best_attempt.method
        );
        ResolutionResult::not_found()
    }

    // ── Shared validation steps ────────────────────────────────────

    /// Search the catalog for `text` and accept the best match above the
    /// podcast similarity bar. Catalog failures are phase misses.
    async fn validate_podcast(&self, text: &str) -> Option<CatalogPodcast> {
        let results = match self.catalog.search_podcasts(text).await {
            Ok(results) => results,
            Err(e) => {
                log::warn!("[RESOLVE] podcast search failed for {:?}: {}", text, e);
                return None;
            }
        };

        let mut best: Option<CatalogPodcast> = None;
        for mut podcast in results {
            podcast.match_confidence = similarity(text, &podcast.title);
            if best
                .as_ref()
                .map(|b| podcast.match_confidence > b.match_confidence)
                .unwrap_or(true)
            {
                best = Some(podcast);
            }
        }
        best.filter(|p| p.match_confidence > PODCAST_ACCEPT)
    }

    /// Fetch a podcast's episode list through the per-resolution cache.
    async fn episode_list(
        &self,
        podcast_id: u64,
        cache: &mut EpisodeCache,
    ) -> Option<Vec<CatalogEpisode>> {
        if let Some(episodes) = cache.get(podcast_id) {
            return Some(episodes.to_vec());
        }
        match self.catalog.lookup_episodes(podcast_id).await {
            Ok(episodes) => {
                cache.insert(podcast_id, episodes.clone());
                Some(episodes)
            }
            Err(e) => {
                log::warn!("[RESOLVE] episode lookup failed for {}: {}", podcast_id, e);
                None
            }
        }
    }

    /// Best episode of `podcast_id` matching `text` above `threshold`.
    async fn validate_episode(
        &self,
        podcast_id: u64,
        text: &str,
        threshold: f64,
        cache: &mut EpisodeCache,
    ) -> Option<CatalogEpisode> {
        let episodes = self.episode_list(podcast_id, cache).await?;
        let mut best: Option<CatalogEpisode> = None;
        for mut episode in episodes {
            episode.match_confidence = similarity(text, &episode.title);
            if best
                .as_ref()
                .map(|b| episode.match_confidence > b.match_confidence)
                .unwrap_or(true)
            {
                best = Some(episode);
            }
        }
        best.filter(|e| e.match_confidence > threshold)
    }

    // ── Phases ─────────────────────────────────────────────────────

    /// Phase 1: validate ranked spatial pairs, trying bottom-as-podcast
    /// first (players usually stack episode above show), then reversed.
    async fn phase_spatial_pairs(
        &self,
        pairs: &[SpatialPair],
        cache: &mut EpisodeCache,
    ) -> Option<ResolutionResult> {
        let mut best: Option<ResolutionResult> = None;

        for pair in pairs {
            for (podcast_cand, episode_cand) in
                [(&pair.bottom, &pair.top), (&pair.top, &pair.bottom)]
            {
                let Some(podcast) = self.validate_podcast(&podcast_cand.text).await else {
                    continue;
                };
                let Some(episode) = self
                    .validate_episode(
                        podcast.id,
                        &episode_cand.text,
                        EPISODE_ACCEPT_PAIR,
                        cache,
                    )
                    .await
                else {
                    continue;
                };

                let confidence =
                    combined_confidence(podcast.match_confidence, episode.match_confidence);
                let result =
                    ResolutionResult::matched(&podcast, &episode.title, confidence, "spatial_pair");
                if confidence >= CONFIDENT_RESOLUTION {
                    return Some(result);
                }
                if best.as_ref().map(|b| confidence > b.confidence).unwrap_or(true) {
                    best = Some(result);
                }
            }
        }
        best
    }

    /// Phase 2: each candidate alone as a podcast query, with its
    /// closest vertical neighbor as the episode guess.
    async fn phase_individual_candidates(
        &self,
        candidates: &[TextCandidate],
        cache: &mut EpisodeCache,
    ) -> Option<ResolutionResult> {
        let mut best: Option<ResolutionResult> = None;

        for (i, cand) in candidates.iter().enumerate() {
            let Some(podcast) = self.validate_podcast(&cand.text).await else {
                continue;
            };

            let Some(neighbor) = nearest_neighbor(candidates, i) else {
                continue;
            };
            let Some(episode) = self
                .validate_episode(podcast.id, &neighbor.text, EPISODE_ACCEPT_LOOSE, cache)
                .await
            else {
                continue;
            };

            let confidence =
                combined_confidence(podcast.match_confidence, episode.match_confidence);
            let result = ResolutionResult::matched(
                &podcast,
                &episode.title,
                confidence,
                "individual_candidate",
            );
            if confidence >= CONFIDENT_RESOLUTION {
                return Some(result);
            }
            if best.as_ref().map(|b| confidence > b.confidence).unwrap_or(true) {
                best = Some(result);
            }
        }
        best
    }

    /// Phase 3: re-search with cleaned query variants — truncated
    /// fragments stripped, punctuation removed, first/last words
    /// dropped. Recovers titles OCR cut at either end.
    async fn phase_cleaned_search(
        &self,
        candidates: &[TextCandidate],
        cache: &mut EpisodeCache,
    ) -> Option<ResolutionResult> {
        for (i, cand) in candidates.iter().enumerate() {
            for variant in cleaned_variants(&cand.text) {
                let results = match self.catalog.search_podcasts(&variant).await {
                    Ok(results) => results,
                    Err(e) => {
                        log::warn!("[RESOLVE] cleaned search failed for {:?}: {}", variant, e);
                        continue;
                    }
                };
                let Some((podcast, sim)) = results
                    .into_iter()
                    .map(|p| {
                        let sim = similarity(&variant, &p.title);
                        (p, sim)
                    })
                    .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                else {
                    continue;
                };
                if sim < EXACT_SEARCH_ACCEPT {
                    continue;
                }
                let mut podcast = podcast;
                podcast.match_confidence = sim;

                let Some(neighbor) = nearest_neighbor(candidates, i) else {
                    continue;
                };
                let Some(episode) = self
                    .validate_episode(podcast.id, &neighbor.text, EPISODE_ACCEPT_LOOSE, cache)
                    .await
                else {
                    continue;
                };

                let confidence =
                    combined_confidence(podcast.match_confidence, episode.match_confidence);
                if confidence >= CONFIDENT_RESOLUTION {
                    return Some(ResolutionResult::matched(
                        &podcast,
                        &episode.title,
                        confidence,
                        "cleaned_search",
                    ));
                }
            }
        }
        None
    }

    /// Phase 4: keyword coverage of episode titles. For every
    /// high-confidence podcast hit, score its episode list against the
    /// keywords of every other candidate.
    async fn phase_keyword_episodes(
        &self,
        candidates: &[TextCandidate],
        cache: &mut EpisodeCache,
    ) -> Option<ResolutionResult> {
        for (i, podcast_cand) in candidates.iter().enumerate() {
            let results = match self.catalog.search_podcasts(&podcast_cand.text).await {
                Ok(results) => results,
                Err(e) => {
                    log::warn!(
                        "[RESOLVE] keyword-phase search failed for {:?}: {}",
                        podcast_cand.text,
                        e
                    );
                    continue;
                }
            };

            for mut podcast in results {
                podcast.match_confidence = similarity(&podcast_cand.text, &podcast.title);
                if podcast.match_confidence < EXACT_SEARCH_ACCEPT {
                    continue;
                }
                let Some(episodes) = self.episode_list(podcast.id, cache).await else {
                    continue;
                };

                for (j, episode_cand) in candidates.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let keywords = extract_keywords(&episode_cand.text);
                    if keywords.is_empty() {
                        continue;
                    }
                    let best = episodes
                        .iter()
                        .map(|e| (e, keyword_coverage(&keywords, &e.title)))
                        .max_by(|a, b| {
                            a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
                        });
                    let Some((episode, coverage)) = best else { continue };
                    if coverage < KEYWORD_MIN_COVERAGE {
                        continue;
                    }

                    let confidence =
                        combined_confidence(podcast.match_confidence, coverage);
                    if confidence >= CONFIDENT_RESOLUTION {
                        return Some(ResolutionResult::matched(
                            &podcast,
                            &episode.title,
                            confidence,
                            "keyword",
                        ));
                    }
                }
            }
        }
        None
    }

    /// Phase 5: last resort — episode search with no podcast
    /// constraint, at a confidence discount.
    async fn phase_broad_search(
        &self,
        candidates: &[TextCandidate],
    ) -> Option<ResolutionResult> {
        for cand in candidates {
            let hits = match self.catalog.search_episodes(&cand.text).await {
                Ok(hits) => hits,
                Err(e) => {
                    log::warn!("[RESOLVE] broad search failed for {:?}: {}", cand.text, e);
                    continue;
                }
            };

            let best = hits
                .into_iter()
                .map(|h| {
                    let sim = similarity(&cand.text, &h.episode.title);
                    (h, sim)
                })
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            let Some((hit, sim)) = best else { continue };

            let confidence = sim * BROAD_SEARCH_DISCOUNT;
            if confidence >= CONFIDENT_RESOLUTION {
                return Some(ResolutionResult {
                    podcast_title: hit.podcast_title,
                    episode_title: hit.episode.title,
                    confidence,
                    method: "broad_episode_search".to_string(),
                    validated: true,
                });
            }
        }
        None
    }
}

/// The candidate vertically closest to `candidates[i]`, excluding itself.
fn nearest_neighbor(candidates: &[TextCandidate], i: usize) -> Option<&TextCandidate> {
    let this = &candidates[i];
    candidates
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .min_by(|(_, a), (_, b)| {
            let da = (a.center_y - this.center_y).abs();
            let db = (b.center_y - this.center_y).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(_, c)| c)
}

/// Stopwords excluded from keyword extraction. Short function words
/// carry no matching signal.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "on", "at", "for", "with",
    "from", "by", "is", "are", "was", "be", "we", "you", "it", "this", "that",
    "do", "does", "how", "what", "why",
];

/// Normalized keywords of an episode-candidate text: lowercased,
/// stopword-filtered, at least two characters.
fn extract_keywords(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect::<String>()
        })
        .filter(|w| w.len() >= 2 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Fraction of keywords found in an episode title. Exact substring
/// counts 1.0; a word-prefix partial counts 0.5.
fn keyword_coverage(keywords: &[String], title: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let lower = title.to_lowercase();
    let title_words: Vec<&str> = lower.split_whitespace().collect();
    let mut total = 0.0;
    for kw in keywords {
        if lower.contains(kw.as_str()) {
            total += 1.0;
        } else if title_words
            .iter()
            .any(|tw| tw.len() >= 2 && (tw.starts_with(kw.as_str()) || kw.starts_with(tw)))
        {
            total += 0.5;
        }
    }
    total / keywords.len() as f64
}

/// Cleanup variants for the fuzzy podcast phase. Ordered from least to
/// most aggressive; duplicates and empties removed.
fn cleaned_variants(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let mut variants = Vec::new();

    // Trailing 1–3 letter fragment stripped.
    if words.len() >= 2 {
        if let Some(last) = words.last() {
            if last.chars().count() <= 3 && last.chars().all(|c| c.is_alphabetic()) {
                variants.push(words[..words.len() - 1].join(" "));
            }
        }
    }

    // Punctuation stripped.
    let depunct: String = trimmed
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    variants.push(depunct);

    // First / last / both edge words dropped — recovers titles OCR
    // truncated at either end.
    if words.len() >= 3 {
        variants.push(words[1..].join(" "));
        variants.push(words[..words.len() - 1].join(" "));
        variants.push(words[1..words.len() - 1].join(" "));
    }

    variants.retain(|v| !v.is_empty() && v != trimmed);
    // Equal variants need not be adjacent (fragment stripping and
    // dropping the last word often coincide), so dedup against the
    // whole list to avoid repeat catalog searches.
    let mut unique: Vec<String> = Vec::with_capacity(variants.len());
    for v in variants {
        if !unique.contains(&v) {
            unique.push(v);
        }
    }
    unique
}

/// Combined output of one screenshot identification.
#[derive(Debug, Clone)]
pub struct ScreenshotIdentification {
    pub resolution: ResolutionResult,
    pub timestamp: Option<String>,
}

/// Full pipeline for one screenshot: OCR → candidates → pairs →
/// resolution, plus the independent timestamp extraction.
///
/// This is the seam the server layer calls. OCR failure is fatal for
/// the screenshot; catalog trouble degrades to "not found".
pub async fn identify(
    ocr: &dyn OcrProvider,
    catalog: Arc<dyn CatalogClient>,
    image_bytes: &[u8],
    config: &config::ResolverConfig,
) -> Result<ScreenshotIdentification, OcrError> {
    let text = ocr.detect_text(image_bytes).await?;
    let candidates = extract_candidates(&text, config);
    let pairs = propose_pairs(&candidates);

    let resolver = Resolver::new(catalog);
    let resolution = resolver.resolve(&candidates, &pairs).await;
    let timestamp = extract_timestamp(&text);

    Ok(ScreenshotIdentification { resolution, timestamp })
}

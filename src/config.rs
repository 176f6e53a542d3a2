//! Tuning constants and resolver configuration.
//!
//! The thresholds below are empirically tuned against real player
//! screenshots, not derived from a model. Treat them as calibration
//! values pending a labeled test corpus — do not fold them into a
//! unified formula.

use std::time::Duration;

// ── Geometry ───────────────────────────────────────────────────────

/// Word boxes whose top-left Y coordinates differ by less than this are
/// considered part of the same text line.
pub const LINE_Y_TOLERANCE: f64 = 10.0;

/// Maximum vertical gap (px) between two candidates that can still form
/// a (podcast, episode) spatial pair.
pub const MAX_PAIR_DISTANCE: f64 = 100.0;

/// Two candidates more similar than this are almost certainly the same
/// logical field duplicated by OCR, never a podcast/episode pair.
pub const PAIR_DUPLICATE_SIMILARITY: f64 = 0.8;

/// Horizontal bounding-box overlap above which two lines are treated as
/// one text block split by OCR.
pub const PAIR_MAX_OVERLAP: f64 = 0.7;

/// Bounding boxes larger than this (px²) are album art or oversized
/// clock text, never a title line.
pub const OVERSIZED_BOX_AREA: f64 = 20_000.0;

/// Time patterns rendered in a box larger than this are the system
/// clock, not a player progress timestamp.
pub const CLOCK_BOX_AREA: f64 = 4_000.0;

/// Primary vertical band where player metadata renders, as fractions of
/// the image's Y extent. Widened progressively when too few candidates
/// survive.
pub const PRIMARY_BAND: (f64, f64) = (0.50, 0.875);
pub const SECONDARY_BAND: (f64, f64) = (0.20, 0.50);
pub const LENIENT_BAND: (f64, f64) = (0.15, 0.95);

// ── Candidate filtering ────────────────────────────────────────────

/// Accepted candidate text length range (chars).
pub const MIN_CANDIDATE_LEN: usize = 4;
pub const MAX_CANDIDATE_LEN: usize = 100;

/// A lone word shorter than this is UI chrome, not a title.
pub const MIN_SINGLE_WORD_LEN: usize = 6;

/// ALL-CAPS runs shorter than this are rejected as UI chrome; longer
/// ones may plausibly be a podcast name.
pub const MIN_ALL_CAPS_LEN: usize = 12;

/// Multiplier applied to candidates that look truncated (ellipsis,
/// lowercase start, trailing word fragment). Penalized, not dropped —
/// truncated text still drives fuzzy matching downstream.
pub const TRUNCATION_PENALTY: f64 = 0.7;

// ── Resolution thresholds ──────────────────────────────────────────

/// Minimum catalog similarity to accept a podcast match.
pub const PODCAST_ACCEPT: f64 = 0.7;

/// Minimum episode similarity inside a validated spatial pair. Lower
/// than the podcast bar because episode titles truncate far more
/// aggressively on-screen.
pub const EPISODE_ACCEPT_PAIR: f64 = 0.3;

/// Minimum episode similarity for the looser individual-candidate phase.
pub const EPISODE_ACCEPT_LOOSE: f64 = 0.2;

/// A combined confidence at or above this short-circuits the phase loop
/// and marks the result validated.
pub const CONFIDENT_RESOLUTION: f64 = 0.5;

/// Exact-search similarity below this triggers the cleanup-and-research
/// pass in the fuzzy podcast phase.
pub const EXACT_SEARCH_ACCEPT: f64 = 0.85;

/// Minimum keyword coverage for the keyword-fallback episode match.
pub const KEYWORD_MIN_COVERAGE: f64 = 0.35;

/// Confidence discount applied to broad episode-search hits, which skip
/// podcast validation entirely.
pub const BROAD_SEARCH_DISCOUNT: f64 = 0.8;

/// Weights combining podcast and episode similarity into one confidence.
/// The podcast side dominates — a wrong show is worse than a wrong
/// episode of the right show.
pub const PODCAST_WEIGHT: f64 = 0.6;
pub const EPISODE_WEIGHT: f64 = 0.4;

/// Combined confidence for one (podcast, episode) validation attempt.
pub fn combined_confidence(podcast: f64, episode: f64) -> f64 {
    PODCAST_WEIGHT * podcast + EPISODE_WEIGHT * episode
}

// ── Runtime configuration ──────────────────────────────────────────

/// Per-resolution knobs. One instance is shared read-only across
/// concurrent resolutions; everything mutable stays inside one
/// `resolve()` call.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// How many scored candidates survive for catalog lookup.
    pub max_candidates: usize,
    /// Timeout applied to every OCR and catalog network call. A timeout
    /// is a phase miss, not a fatal error.
    pub request_timeout: Duration,
    /// Maximum catalog search results examined per query.
    pub search_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_candidates: 8,
            request_timeout: Duration::from_secs(15),
            search_limit: 10,
        }
    }
}

//! Integration tests for the resolution pipeline.
//!
//! Everything runs against a call-counting mock catalog, so the tests
//! can assert phase short-circuiting and cache discipline, not just
//! final results.

use async_trait::async_trait;
use podsnap_core::catalog::CatalogEpisodeHit;
use podsnap_core::ocr::{OcrProvider, OcrText, Vertex, WordBox};
use podsnap_core::pairing::propose_pairs;
use podsnap_core::{
    CatalogClient, CatalogEpisode, CatalogError, CatalogPodcast, EpisodeCache, OcrError,
    Resolver, ResolverConfig, TextCandidate,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── Mock catalog ───────────────────────────────────────────────────

#[derive(Default)]
struct MockCatalog {
    podcasts: Vec<CatalogPodcast>,
    episodes: HashMap<u64, Vec<CatalogEpisode>>,
    fail: bool,
    search_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    episode_search_calls: AtomicUsize,
}

fn podcast(id: u64, title: &str, artist: &str) -> CatalogPodcast {
    CatalogPodcast {
        id,
        title: title.to_string(),
        artist_name: artist.to_string(),
        feed_url: None,
        artwork_url: None,
        match_confidence: 0.0,
    }
}

fn episode(id: u64, title: &str) -> CatalogEpisode {
    CatalogEpisode {
        id,
        title: title.to_string(),
        duration_ms: None,
        artwork_url: None,
        match_confidence: 0.0,
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn search_podcasts(&self, _term: &str) -> Result<Vec<CatalogPodcast>, CatalogError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CatalogError::Status(500));
        }
        Ok(self.podcasts.clone())
    }

    async fn lookup_episodes(&self, podcast_id: u64) -> Result<Vec<CatalogEpisode>, CatalogError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CatalogError::Status(500));
        }
        Ok(self.episodes.get(&podcast_id).cloned().unwrap_or_default())
    }

    async fn search_episodes(&self, _term: &str) -> Result<Vec<CatalogEpisodeHit>, CatalogError> {
        self.episode_search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CatalogError::Status(500));
        }
        Ok(Vec::new())
    }
}

// ── Fixtures ───────────────────────────────────────────────────────

fn candidate(text: &str, center_y: f64, score: f64) -> TextCandidate {
    TextCandidate {
        text: text.to_string(),
        center_x: 180.0,
        center_y,
        min_x: 40.0,
        max_x: 40.0 + text.len() as f64 * 9.0,
        box_area: text.len() as f64 * 9.0 * 22.0,
        word_count: text.split_whitespace().count(),
        score,
    }
}

/// The Hidden Brain screenshot: episode title stacked above the show
/// name, as Apple Podcasts renders it.
fn hidden_brain_fixture() -> (Vec<TextCandidate>, Arc<MockCatalog>) {
    let candidates = vec![
        candidate("Why We Do the Things We Do w", 600.0, 48.0),
        candidate("Hidden Brain", 660.0, 40.0),
    ];
    let mut episodes = HashMap::new();
    episodes.insert(
        101,
        vec![
            episode(1, "Innovation 2.0: Make Me Care"),
            episode(2, "Why We Do The Things We Do (Part 1)"),
            episode(3, "The Moments that Make Us"),
        ],
    );
    let catalog = Arc::new(MockCatalog {
        podcasts: vec![podcast(101, "Hidden Brain", "Hidden Brain Media")],
        episodes,
        ..Default::default()
    });
    (candidates, catalog)
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_hidden_brain_resolves_from_spatial_pair() {
    init_logging();
    let (candidates, catalog) = hidden_brain_fixture();
    let pairs = propose_pairs(&candidates);
    assert!(!pairs.is_empty(), "fixture should produce a spatial pair");

    let resolver = Resolver::new(catalog.clone());
    let result = resolver.resolve(&candidates, &pairs).await;

    assert!(result.validated);
    assert!(result.confidence >= 0.5);
    assert_eq!(result.podcast_title, "Hidden Brain");
    assert_eq!(result.episode_title, "Why We Do The Things We Do (Part 1)");
    assert_eq!(result.method, "spatial_pair");
}

#[tokio::test]
async fn confident_first_phase_short_circuits_later_phases() {
    init_logging();
    let (candidates, catalog) = hidden_brain_fixture();
    let pairs = propose_pairs(&candidates);

    let resolver = Resolver::new(catalog.clone());
    let result = resolver.resolve(&candidates, &pairs).await;
    assert!(result.validated);

    // One podcast search and one episode lookup — the first pair
    // orientation hit, so phases 2–5 never ran.
    assert_eq!(catalog.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(catalog.lookup_calls.load(Ordering::SeqCst), 1);
    assert_eq!(catalog.episode_search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_catalog_returns_not_found_sentinel() {
    init_logging();
    let candidates = vec![
        candidate("Some Unknown Show Name", 600.0, 30.0),
        candidate("An Episode Nobody Has", 660.0, 28.0),
    ];
    let pairs = propose_pairs(&candidates);
    let catalog = Arc::new(MockCatalog::default());

    let resolver = Resolver::new(catalog.clone());
    let result = resolver.resolve(&candidates, &pairs).await;

    assert!(!result.validated);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.method, "none");
    // Every phase ran and queried the catalog before giving up.
    assert!(catalog.search_calls.load(Ordering::SeqCst) > 0);
    assert!(catalog.episode_search_calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn catalog_failures_degrade_to_not_found_not_errors() {
    init_logging();
    let candidates = vec![
        candidate("Some Unknown Show Name", 600.0, 30.0),
        candidate("An Episode Nobody Has", 660.0, 28.0),
    ];
    let pairs = propose_pairs(&candidates);
    let catalog = Arc::new(MockCatalog {
        fail: true,
        ..Default::default()
    });

    let resolver = Resolver::new(catalog);
    let result = resolver.resolve(&candidates, &pairs).await;
    assert!(!result.validated);
    assert_eq!(result.confidence, 0.0);
}

#[tokio::test]
async fn injected_cache_is_cleared_after_every_resolution() {
    init_logging();
    let (candidates, catalog) = hidden_brain_fixture();
    let pairs = propose_pairs(&candidates);
    let resolver = Resolver::new(catalog);
    let mut cache = EpisodeCache::new();

    let first = resolver
        .resolve_with_cache(&candidates, &pairs, &mut cache)
        .await;
    assert!(first.validated);
    assert!(cache.is_empty(), "cache must be cleared after call 1");

    let second = resolver
        .resolve_with_cache(&candidates, &pairs, &mut cache)
        .await;
    assert!(second.validated);
    assert!(cache.is_empty(), "cache must be cleared after call 2");
}

#[tokio::test]
async fn keyword_phase_recovers_heavily_truncated_episode() {
    init_logging();
    // OCR glued the episode words into a run of function-word junk:
    // direct similarity collapses, but the distinctive keywords survive
    // stopword filtering untouched.
    let candidates = vec![
        candidate("to of in on at by the and innovation care", 600.0, 48.0),
        candidate("Hidden Brain", 660.0, 40.0),
    ];
    let mut episodes = HashMap::new();
    episodes.insert(
        101,
        vec![
            episode(1, "Innovation 2.0: Make Me Care"),
            episode(2, "The Moments that Make Us"),
        ],
    );
    let catalog = Arc::new(MockCatalog {
        podcasts: vec![podcast(101, "Hidden Brain", "Hidden Brain Media")],
        episodes,
        ..Default::default()
    });

    let resolver = Resolver::new(catalog);
    let result = resolver.resolve(&candidates, &propose_pairs(&candidates)).await;

    assert!(result.validated);
    assert_eq!(result.podcast_title, "Hidden Brain");
    assert_eq!(result.episode_title, "Innovation 2.0: Make Me Care");
    assert_eq!(result.method, "keyword");
}

// ── Full pipeline through identify() ───────────────────────────────

struct MockOcr {
    text: OcrText,
}

#[async_trait]
impl OcrProvider for MockOcr {
    async fn detect_text(&self, _image_bytes: &[u8]) -> Result<OcrText, OcrError> {
        Ok(OcrText {
            full_text: self.text.full_text.clone(),
            word_boxes: self.text.word_boxes.clone(),
        })
    }
}

fn word(text: &str, x: f64, y: f64, w: f64, h: f64) -> WordBox {
    WordBox {
        text: text.to_string(),
        vertices: [
            Vertex { x, y },
            Vertex { x: x + w, y },
            Vertex { x: x + w, y: y + h },
            Vertex { x, y: y + h },
        ],
    }
}

#[tokio::test]
async fn identify_extracts_titles_and_timestamp_from_word_boxes() {
    init_logging();
    // A synthetic Apple Podcasts screenshot: status bar clock, episode
    // title, show name, progress and remaining time, scrubber row.
    let words = vec![
        word("9:41", 20.0, 10.0, 40.0, 18.0),
        word("Why", 40.0, 600.0, 48.0, 22.0),
        word("We", 95.0, 601.0, 34.0, 22.0),
        word("Do", 136.0, 600.0, 32.0, 22.0),
        word("the", 175.0, 602.0, 36.0, 22.0),
        word("Things", 218.0, 600.0, 70.0, 22.0),
        word("We", 295.0, 601.0, 34.0, 22.0),
        word("Do", 336.0, 600.0, 32.0, 22.0),
        word("w", 375.0, 600.0, 14.0, 22.0),
        word("Hidden", 40.0, 655.0, 72.0, 20.0),
        word("Brain", 120.0, 656.0, 58.0, 20.0),
        word("11:03", 30.0, 780.0, 44.0, 15.0),
        word("-46:57", 330.0, 810.0, 50.0, 15.0),
        word("anchor", 0.0, 1000.0, 10.0, 10.0),
    ];
    let full_text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let ocr = MockOcr {
        text: OcrText { full_text, word_boxes: words },
    };

    let (_, catalog) = hidden_brain_fixture();
    let config = ResolverConfig::default();

    let outcome = podsnap_core::identify(&ocr, catalog, b"png bytes", &config)
        .await
        .expect("identify should succeed");

    assert!(outcome.resolution.validated);
    assert_eq!(outcome.resolution.podcast_title, "Hidden Brain");
    assert_eq!(outcome.timestamp.as_deref(), Some("11:03"));
}

#[tokio::test]
async fn identify_propagates_ocr_failure() {
    struct FailingOcr;

    #[async_trait]
    impl OcrProvider for FailingOcr {
        async fn detect_text(&self, _image_bytes: &[u8]) -> Result<OcrText, OcrError> {
            Err(OcrError::NoText)
        }
    }

    let catalog: Arc<MockCatalog> = Arc::new(MockCatalog::default());
    let result =
        podsnap_core::identify(&FailingOcr, catalog, b"blank", &ResolverConfig::default()).await;
    assert!(matches!(result, Err(OcrError::NoText)));
}

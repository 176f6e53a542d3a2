//! podsnap-core — identify (podcast, episode, timestamp) from a
//! screenshot of a podcast player.
//!
//! The hard problem is identity resolution from noisy OCR output: word
//! boxes arrive unordered, mixed with system UI noise, and titles
//! truncate mid-word. The pipeline:
//!
//!   image bytes → [`ocr::OcrProvider`] → word boxes
//!              → [`ocr::extract_candidates`] → scored candidates
//!              → [`pairing::propose_pairs`] → (podcast, episode) pairs
//!              → [`resolver::Resolver`] → [`resolver::ResolutionResult`]
//!
//! [`ocr::extract_timestamp`] runs independently on the same OCR output.
//! [`resolver::identify`] wires the whole thing together for callers.
//!
//! No business logic lives here — only module declarations and
//! re-exports. HTTP/CLI framing, upload handling, and transcript
//! post-processing belong to the layers above this crate.

pub mod catalog;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pairing;
pub mod resolver;
pub mod similarity;

pub use catalog::{
    CatalogClient, CatalogEpisode, CatalogEpisodeHit, CatalogPodcast, ItunesClient,
};
pub use config::ResolverConfig;
pub use error::{CatalogError, OcrError};
pub use ocr::{OcrProvider, OcrText, TextCandidate, VisionClient, Vertex, WordBox};
pub use pairing::SpatialPair;
pub use resolver::{
    identify, EpisodeCache, ResolutionResult, Resolver, ScreenshotIdentification,
};
pub use similarity::similarity;

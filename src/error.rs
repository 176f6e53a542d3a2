//! Error taxonomy for the resolution pipeline.
//!
//! Two failure families, deliberately asymmetric:
//!   - `OcrError` is fatal for the screenshot being processed — without
//!     text there is nothing to resolve.
//!   - `CatalogError` is phase-local — a failed catalog call makes one
//!     resolution phase a miss, and the resolver moves on to the next.
//!
//! "No match found" is never an error anywhere in this crate. It is the
//! `ResolutionResult::not_found()` sentinel.

use thiserror::Error;

/// Failure while extracting text from the screenshot.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The provider ran successfully but found no text at all.
    /// Distinct from a hard failure — callers may want to tell the user
    /// "not a screenshot of a player" rather than "service down".
    #[error("no text detected in image")]
    NoText,

    /// The provider rejected the request (quota, auth, invalid image).
    #[error("OCR provider error: {0}")]
    Provider(String),

    /// Transport-level failure talking to the OCR provider.
    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// No API key configured for the OCR provider.
    #[error("GOOGLE_VISION_API_KEY is not set")]
    MissingApiKey,
}

/// Failure while querying the podcast catalog.
///
/// An empty result set is NOT a `CatalogError` — search and lookup return
/// `Ok(vec![])` when nothing matches.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level failure (DNS, TLS, timeout).
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx status from the catalog service.
    #[error("catalog returned HTTP {0}")]
    Status(u16),

    /// Response body did not match the expected shape.
    #[error("catalog response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

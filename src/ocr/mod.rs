//! OCR domain — provider contract, word-box geometry, candidate and
//! timestamp extraction.
//!
//! External code should only use the types and functions exported here.

pub mod candidates;
pub mod timestamp;
pub mod vision;

pub use candidates::{extract_candidates, TextCandidate};
pub use timestamp::extract_timestamp;
pub use vision::VisionClient;

use crate::error::OcrError;
use async_trait::async_trait;

/// One corner of a word's bounding quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// A single recognized word with its bounding box, as reported by the
/// OCR provider. Vertices run clockwise from the top-left corner.
#[derive(Debug, Clone)]
pub struct WordBox {
    pub text: String,
    pub vertices: [Vertex; 4],
}

impl WordBox {
    /// Y coordinate of the top-left corner — the line-grouping key.
    pub fn top_y(&self) -> f64 {
        self.vertices[0].y.min(self.vertices[1].y)
    }

    pub fn min_x(&self) -> f64 {
        self.vertices.iter().map(|v| v.x).fold(f64::INFINITY, f64::min)
    }

    pub fn max_x(&self) -> f64 {
        self.vertices.iter().map(|v| v.x).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_y(&self) -> f64 {
        self.vertices.iter().map(|v| v.y).fold(f64::INFINITY, f64::min)
    }

    pub fn max_y(&self) -> f64 {
        self.vertices.iter().map(|v| v.y).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Axis-aligned bounding-box area.
    pub fn area(&self) -> f64 {
        (self.max_x() - self.min_x()) * (self.max_y() - self.min_y())
    }
}

/// Full OCR output for one screenshot.
#[derive(Debug, Clone)]
pub struct OcrText {
    /// Provider's own concatenation of everything it read.
    pub full_text: String,
    /// Per-word geometry, unordered.
    pub word_boxes: Vec<WordBox>,
}

/// Text-detection provider. One implementation talks to Google Cloud
/// Vision; tests supply canned word boxes.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Extract text and word geometry from raw image bytes.
    ///
    /// Must distinguish "image had no text" (`OcrError::NoText`) from a
    /// provider failure (`OcrError::Provider` / `OcrError::Http`).
    async fn detect_text(&self, image_bytes: &[u8]) -> Result<OcrText, OcrError>;
}

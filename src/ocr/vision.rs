//! Google Cloud Vision text detection client.
//!
//! One POST to `images:annotate` with a base64 payload and the
//! `TEXT_DETECTION` feature. The first annotation in the response is the
//! provider's full-text concatenation; every following annotation is a
//! single word with its bounding quadrilateral.
//!
//! API key comes from `GOOGLE_VISION_API_KEY` (query param, same scheme
//! as other Google APIs).

use super::{OcrProvider, OcrText, Vertex, WordBox};
use crate::config::ResolverConfig;
use crate::error::OcrError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use std::time::Duration;

const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Google Cloud Vision OCR provider.
pub struct VisionClient {
    http: reqwest::Client,
    api_key: String,
}

// ── Wire shapes ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextAnnotation {
    #[serde(default)]
    description: String,
    bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Deserialize)]
struct BoundingPoly {
    #[serde(default)]
    vertices: Vec<Vertex>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl VisionClient {
    /// Build a client reading the API key from `GOOGLE_VISION_API_KEY`.
    pub fn from_env(timeout: Duration) -> Result<Self, OcrError> {
        let api_key = match std::env::var("GOOGLE_VISION_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => return Err(OcrError::MissingApiKey),
        };
        Ok(Self::new(api_key, timeout))
    }

    /// `from_env` with the shared resolver request timeout.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, OcrError> {
        Self::from_env(config.request_timeout)
    }

    pub fn new(api_key: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { http, api_key }
    }
}

#[async_trait]
impl OcrProvider for VisionClient {
    async fn detect_text(&self, image_bytes: &[u8]) -> Result<OcrText, OcrError> {
        let start = std::time::Instant::now();
        let url = format!("{}?key={}", VISION_ENDPOINT, self.api_key);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "requests": [{
                    "image": { "content": BASE64.encode(image_bytes) },
                    "features": [{ "type": "TEXT_DETECTION" }]
                }]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("[OCR] Vision API returned {}: {}", status, body);
            return Err(OcrError::Provider(format!("HTTP {}", status)));
        }

        let parsed: AnnotateResponse = response.json().await?;
        let image = parsed
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| OcrError::Provider("empty annotate response".into()))?;

        if let Some(err) = image.error {
            return Err(OcrError::Provider(err.message));
        }

        let mut annotations = image.text_annotations.into_iter();
        let full_text = match annotations.next() {
            Some(first) => first.description,
            None => return Err(OcrError::NoText),
        };

        let word_boxes: Vec<WordBox> = annotations
            .filter_map(|a| {
                let poly = a.bounding_poly?;
                if poly.vertices.len() != 4 {
                    return None;
                }
                Some(WordBox {
                    text: a.description,
                    vertices: [
                        poly.vertices[0],
                        poly.vertices[1],
                        poly.vertices[2],
                        poly.vertices[3],
                    ],
                })
            })
            .collect();

        log::info!(
            "[OCR] {} chars, {} word boxes in {}ms",
            full_text.len(),
            word_boxes.len(),
            start.elapsed().as_millis()
        );

        if full_text.trim().is_empty() && word_boxes.is_empty() {
            return Err(OcrError::NoText);
        }

        Ok(OcrText { full_text, word_boxes })
    }
}

//! Spatial pairing — proposing (podcast, episode) pairs from vertically
//! adjacent candidates.
//!
//! Player UIs render the episode title and podcast name as a stacked
//! block, so two candidates close together vertically are the best
//! resolution hypothesis. Pairs are rejected when the two lines are
//! near-identical (OCR duplicated one field) or overlap horizontally so
//! much they are probably one split text block.

use crate::config::{MAX_PAIR_DISTANCE, PAIR_DUPLICATE_SIMILARITY, PAIR_MAX_OVERLAP};
use crate::ocr::TextCandidate;
use crate::similarity::similarity;

/// Two candidates hypothesized to be a (podcast, episode) pair.
/// Ephemeral — exists only to drive resolution attempts.
#[derive(Debug, Clone)]
pub struct SpatialPair {
    pub top: TextCandidate,
    pub bottom: TextCandidate,
    pub vertical_distance: f64,
    pub text_similarity: f64,
    pub horizontal_overlap: f64,
}

impl SpatialPair {
    fn rank_score(&self) -> f64 {
        self.top.score.max(self.bottom.score)
    }
}

/// Horizontal intersection-over-union of the two bounding boxes.
///
/// IoU, not overlap-of-the-narrower: stacked left-aligned titles (the
/// normal player layout) share a left edge but differ in width, while a
/// wrapped text block split by OCR has nearly identical extents.
fn horizontal_overlap(a: &TextCandidate, b: &TextCandidate) -> f64 {
    let intersection = (a.max_x.min(b.max_x) - a.min_x.max(b.min_x)).max(0.0);
    let union = a.max_x.max(b.max_x) - a.min_x.min(b.min_x);
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Propose ranked spatial pairs from scored candidates.
///
/// Sort order: higher-scored member first, then pairs higher on screen
/// (title blocks start near the content top), then closer pairs, then
/// more-distinct text.
pub fn propose_pairs(candidates: &[TextCandidate]) -> Vec<SpatialPair> {
    let mut pairs = Vec::new();

    for top in candidates {
        for bottom in candidates {
            if top.center_y >= bottom.center_y {
                continue;
            }
            let distance = bottom.center_y - top.center_y;
            if distance > MAX_PAIR_DISTANCE {
                continue;
            }
            let sim = similarity(&top.text, &bottom.text);
            if sim > PAIR_DUPLICATE_SIMILARITY {
                continue;
            }
            let overlap = horizontal_overlap(top, bottom);
            if overlap > PAIR_MAX_OVERLAP {
                continue;
            }
            pairs.push(SpatialPair {
                top: top.clone(),
                bottom: bottom.clone(),
                vertical_distance: distance,
                text_similarity: sim,
                horizontal_overlap: overlap,
            });
        }
    }

    pairs.sort_by(|a, b| {
        b.rank_score()
            .partial_cmp(&a.rank_score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.top
                    .center_y
                    .partial_cmp(&b.top.center_y)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                a.vertical_distance
                    .partial_cmp(&b.vertical_distance)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                a.text_similarity
                    .partial_cmp(&b.text_similarity)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    log::debug!("[PAIRING] {} candidates -> {} pairs", candidates.len(), pairs.len());
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, center_y: f64, min_x: f64, max_x: f64, score: f64) -> TextCandidate {
        TextCandidate {
            text: text.to_string(),
            center_x: (min_x + max_x) / 2.0,
            center_y,
            min_x,
            max_x,
            box_area: (max_x - min_x) * 20.0,
            word_count: text.split_whitespace().count(),
            score,
        }
    }

    #[test]
    fn stacked_title_block_forms_a_pair() {
        let cands = vec![
            candidate("Why We Do the Things We Do", 600.0, 40.0, 320.0, 50.0),
            candidate("Hidden Brain", 650.0, 40.0, 160.0, 40.0),
        ];
        let pairs = propose_pairs(&cands);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].top.text, "Why We Do the Things We Do");
        assert_eq!(pairs[0].bottom.text, "Hidden Brain");
    }

    #[test]
    fn distant_candidates_never_pair() {
        let cands = vec![
            candidate("Hidden Brain", 200.0, 40.0, 160.0, 40.0),
            candidate("Something Else Entirely", 600.0, 40.0, 300.0, 40.0),
        ];
        assert!(propose_pairs(&cands).is_empty());
    }

    #[test]
    fn near_duplicate_lines_never_pair() {
        // OCR read the same field twice with a tiny difference.
        let cands = vec![
            candidate("Hidden Brain", 600.0, 40.0, 160.0, 40.0),
            candidate("Hidden Brain.", 640.0, 400.0, 560.0, 40.0),
        ];
        assert!(propose_pairs(&cands).is_empty());
    }

    #[test]
    fn heavily_overlapping_blocks_never_pair() {
        // One wrapped text block split into two OCR lines.
        let cands = vec![
            candidate("The Secret History of the", 600.0, 40.0, 300.0, 40.0),
            candidate("Modern World and Beyond", 618.0, 42.0, 298.0, 40.0),
        ];
        assert!(propose_pairs(&cands).is_empty());
    }

    #[test]
    fn higher_scored_pairs_rank_first() {
        let cands = vec![
            candidate("Low Score Line Here", 400.0, 40.0, 200.0, 5.0),
            candidate("Other Low Score Text", 460.0, 300.0, 500.0, 6.0),
            candidate("Why We Do the Things We Do", 600.0, 40.0, 320.0, 50.0),
            candidate("Hidden Brain", 660.0, 400.0, 520.0, 40.0),
        ];
        let pairs = propose_pairs(&cands);
        assert!(pairs.len() >= 2);
        assert_eq!(pairs[0].top.text, "Why We Do the Things We Do");
    }
}

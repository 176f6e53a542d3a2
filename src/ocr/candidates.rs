//! OCR candidate extraction.
//!
//! Turns raw word boxes into scored, filtered line candidates:
//!   1. group words into lines by top-left Y (±10px), X-sorted
//!   2. restrict to the vertical band where player metadata renders,
//!      widening progressively if too little survives
//!   3. reject structural noise (numbers, times, UI chrome) plus a small
//!      literal system-phrase denylist
//!   4. score survivors and keep the top N
//!
//! Filtering is deliberately language-agnostic: the rules are structural
//! (digit density, box size, casing) except for `SYSTEM_PHRASES`, which
//! is the one explicitly language-specific table.

use super::{OcrText, WordBox};
use crate::config::{
    self, LENIENT_BAND, LINE_Y_TOLERANCE, MAX_CANDIDATE_LEN, MIN_ALL_CAPS_LEN,
    MIN_CANDIDATE_LEN, MIN_SINGLE_WORD_LEN, OVERSIZED_BOX_AREA, PRIMARY_BAND,
    SECONDARY_BAND, TRUNCATION_PENALTY,
};
use regex::Regex;
use std::sync::OnceLock;

/// A filtered, scored line of OCR text — a plausible podcast or episode
/// title fragment. Immutable once scored; lives only for one
/// screenshot's processing.
#[derive(Debug, Clone)]
pub struct TextCandidate {
    pub text: String,
    pub center_x: f64,
    pub center_y: f64,
    pub min_x: f64,
    pub max_x: f64,
    pub box_area: f64,
    pub word_count: usize,
    pub score: f64,
}

/// One reconstructed text line with merged geometry.
#[derive(Debug, Clone)]
pub(crate) struct TextLine {
    pub text: String,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl TextLine {
    pub fn center_x(&self) -> f64 {
        (self.min_x + self.max_x) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    pub fn area(&self) -> f64 {
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }
}

/// Literal system-UI phrases to reject, lowercased. Language-specific by
/// design — extend this table rather than adding keyword checks to the
/// structural rules.
const SYSTEM_PHRASES: &[&str] = &[
    "battery",
    "batterie",
    "charging",
    "charged",
    "low power mode",
    "do not disturb",
    "screen mirroring",
    "notification",
    "scheduled for",
    "sleep mode",
    "o'clock",
    "oclock",
    "uhr",
];

fn numeric_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\d\s.,:%/\-]+$").unwrap())
}

fn time_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^-?\d{1,2}:\d{2}(:\d{2})?(\s*[ap]\.?\s?m\.?)?$").unwrap()
    })
}

/// Group word boxes into reading-order text lines.
///
/// Words whose top-left Y coordinates are within `LINE_Y_TOLERANCE`
/// share a line; within a line, words sort by X.
pub(crate) fn group_lines(boxes: &[WordBox]) -> Vec<TextLine> {
    let mut indices: Vec<usize> = (0..boxes.len()).collect();
    indices.sort_by(|&a, &b| {
        boxes[a]
            .top_y()
            .partial_cmp(&boxes[b].top_y())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in indices {
        match groups.last_mut() {
            Some(group)
                if (boxes[i].top_y() - boxes[group[0]].top_y()).abs()
                    < LINE_Y_TOLERANCE =>
            {
                group.push(i)
            }
            _ => groups.push(vec![i]),
        }
    }

    groups
        .into_iter()
        .map(|mut group| {
            group.sort_by(|&a, &b| {
                boxes[a]
                    .min_x()
                    .partial_cmp(&boxes[b].min_x())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let text = group
                .iter()
                .map(|&i| boxes[i].text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            let min_x = group.iter().map(|&i| boxes[i].min_x()).fold(f64::INFINITY, f64::min);
            let max_x = group.iter().map(|&i| boxes[i].max_x()).fold(f64::NEG_INFINITY, f64::max);
            let min_y = group.iter().map(|&i| boxes[i].min_y()).fold(f64::INFINITY, f64::min);
            let max_y = group.iter().map(|&i| boxes[i].max_y()).fold(f64::NEG_INFINITY, f64::max);
            TextLine { text, min_x, max_x, min_y, max_y }
        })
        .filter(|l| !l.text.is_empty())
        .collect()
}

/// Restrict lines to the vertical band where player metadata renders.
///
/// Tries the primary band first, then widens, always preferring the
/// narrowest band that yields at least `min_survivors` lines passing
/// `keep`. Oversized boxes are dropped in every pass.
pub(crate) fn band_filtered<'a, F>(
    lines: &'a [TextLine],
    min_survivors: usize,
    keep: F,
) -> Vec<&'a TextLine>
where
    F: Fn(&TextLine) -> bool,
{
    if lines.is_empty() {
        return Vec::new();
    }
    let top = lines.iter().map(|l| l.min_y).fold(f64::INFINITY, f64::min);
    let bottom = lines.iter().map(|l| l.max_y).fold(f64::NEG_INFINITY, f64::max);
    let height = (bottom - top).max(1.0);

    let mut widest: Vec<&TextLine> = Vec::new();
    for (lo, hi) in [PRIMARY_BAND, SECONDARY_BAND, LENIENT_BAND] {
        let band_top = top + lo * height;
        let band_bottom = top + hi * height;
        let survivors: Vec<&TextLine> = lines
            .iter()
            .filter(|l| {
                let cy = l.center_y();
                cy >= band_top && cy <= band_bottom && l.area() < OVERSIZED_BOX_AREA && keep(*l)
            })
            .collect();
        if survivors.len() >= min_survivors {
            return survivors;
        }
        widest = survivors;
    }
    widest
}

/// Structural validity check for a candidate line.
pub(crate) fn is_valid_candidate(text: &str) -> bool {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if !(MIN_CANDIDATE_LEN..=MAX_CANDIDATE_LEN).contains(&len) {
        return false;
    }

    // Pure numbers, times, dates, percentages.
    if numeric_only_re().is_match(trimmed) || time_like_re().is_match(trimmed) {
        return false;
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();

    // A lone short word is a button label, not a title.
    if words.len() == 1 && len < MIN_SINGLE_WORD_LEN {
        return false;
    }

    // Short ALL-CAPS runs are UI chrome ("LIVE", "NOW PLAYING") unless
    // long enough to plausibly be a podcast name.
    let alphabetic: Vec<char> = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    if !alphabetic.is_empty()
        && alphabetic.iter().all(|c| c.is_uppercase())
        && len < MIN_ALL_CAPS_LEN
    {
        return false;
    }

    let lower = trimmed.to_lowercase();
    if SYSTEM_PHRASES.iter().any(|p| lower.contains(p)) {
        return false;
    }

    true
}

/// Heuristic title-likelihood score for a line.
///
/// Larger boxes render titles; moderate length and word count look like
/// episode names; truncation is penalized but kept, since truncated text
/// still drives fuzzy matching downstream.
pub(crate) fn score_candidate(line: &TextLine) -> f64 {
    let text = line.text.trim();
    let len = text.chars().count();
    let words: Vec<&str> = text.split_whitespace().collect();

    let mut score = (line.area() / 100.0).min(30.0);

    if (15..=50).contains(&len) {
        score += 10.0;
    }
    if (3..=8).contains(&words.len()) {
        score += 8.0;
    }

    let lower = text.to_lowercase();
    if lower.contains("episode") || lower.contains(" with ") || text.ends_with('?') {
        score += 6.0;
    }

    // Proper-noun casing: at least half the words start uppercase.
    let capitalized = words
        .iter()
        .filter(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
        .count();
    if !words.is_empty() && capitalized * 2 >= words.len() {
        score += 5.0;
    }

    if looks_truncated(text, &words) {
        score *= TRUNCATION_PENALTY;
    }

    score
}

/// Ellipsis, lowercase start, or a trailing 1–3 letter fragment all
/// suggest OCR cut the title mid-word.
fn looks_truncated(text: &str, words: &[&str]) -> bool {
    if text.ends_with('…') || text.ends_with("...") {
        return true;
    }
    if text
        .chars()
        .find(|c| c.is_alphabetic())
        .map(|c| c.is_lowercase())
        .unwrap_or(false)
    {
        return true;
    }
    if words.len() >= 2 {
        if let Some(last) = words.last() {
            let n = last.chars().count();
            if (1..=3).contains(&n) && last.chars().all(|c| c.is_alphabetic()) {
                return true;
            }
        }
    }
    false
}

/// Extract the top-N scored candidates from one screenshot's OCR output.
pub fn extract_candidates(
    ocr: &OcrText,
    config: &config::ResolverConfig,
) -> Vec<TextCandidate> {
    let lines = group_lines(&ocr.word_boxes);
    let surviving = band_filtered(&lines, 2, |l| is_valid_candidate(&l.text));

    let mut candidates: Vec<TextCandidate> = surviving
        .into_iter()
        .map(|line| TextCandidate {
            text: line.text.clone(),
            center_x: line.center_x(),
            center_y: line.center_y(),
            min_x: line.min_x,
            max_x: line.max_x,
            box_area: line.area(),
            word_count: line.text.split_whitespace().count(),
            score: score_candidate(line),
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(config.max_candidates);

    log::debug!(
        "[CANDIDATES] {} lines -> {} candidates",
        lines.len(),
        candidates.len()
    );
    for c in &candidates {
        log::debug!("[CANDIDATES]   {:.1} {:?}", c.score, c.text);
    }

    candidates
}

//! Player progress-timestamp extraction.
//!
//! Finds the elapsed-time display (`MM:SS` or `H:MM:SS`) among OCR
//! lines while rejecting the system clock. Clock rejection is a strict
//! two-part check: nearby clock-context text alone is not enough to
//! discard a match — the match itself must also look like an am/pm
//! clock literal, or render in a clock-sized box. Otherwise a
//! legitimate "11:03" progress time sitting near system text would be
//! lost.

use super::candidates::{band_filtered, group_lines, TextLine};
use super::OcrText;
use crate::config::CLOCK_BOX_AREA;
use regex::Regex;
use std::sync::OnceLock;

/// Clock-context phrases checked within ±30 chars of a time match.
/// Language-specific by design, like the candidate denylist.
const CLOCK_CONTEXT: &[&str] = &[
    "scheduled",
    "alarm",
    "o'clock",
    "oclock",
    "morning",
    "afternoon",
    "evening",
    "tonight",
    "uhr",
    "heures",
];

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,2}:\d{2}(:\d{2})?").unwrap())
}

fn ampm_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // An am/pm marker directly after the digits, e.g. "3:47 p.m." / "11:03AM".
    RE.get_or_init(|| Regex::new(r"(?i)^\s*[ap]\.?\s?m\b\.?").unwrap())
}

/// Extract the progress timestamp from one screenshot's OCR output.
///
/// Returns the matched time string, or `None` when every time pattern
/// on screen is a clock, a remaining-time display, or absent.
pub fn extract_timestamp(ocr: &OcrText) -> Option<String> {
    let lines = group_lines(&ocr.word_boxes);

    // Same band discipline as candidate extraction: progress times live
    // in the content band, near the scrubber.
    let banded = band_filtered(&lines, 1, |l| time_re().is_match(&l.text));

    let mut best: Option<(f64, String)> = None;
    for line in banded {
        for m in find_times(line) {
            // Prefer the lowest surviving match — closest to the
            // scrubber, which sits below the title block.
            let keep = match &best {
                Some((y, _)) => line.center_y() > *y,
                None => true,
            };
            if keep {
                best = Some((line.center_y(), m));
            }
        }
    }
    if let Some((_, time)) = best {
        log::debug!("[TIMESTAMP] matched in content band: {}", time);
        return Some(time);
    }

    // Fallback: first time pattern anywhere in the raw text, still
    // subject to the clock-context check.
    for m in time_re().find_iter(&ocr.full_text) {
        if is_negative(&ocr.full_text, m.start()) {
            continue;
        }
        if is_clock_literal(&ocr.full_text, m.start(), m.end()) {
            continue;
        }
        log::debug!("[TIMESTAMP] matched in raw text: {}", m.as_str());
        return Some(m.as_str().to_string());
    }

    None
}

/// All acceptable time matches within one line.
fn find_times(line: &TextLine) -> Vec<String> {
    let mut out = Vec::new();
    for m in time_re().find_iter(&line.text) {
        if is_negative(&line.text, m.start()) {
            continue;
        }
        // Clock-sized box → system clock, regardless of context.
        if line.area() > CLOCK_BOX_AREA {
            continue;
        }
        if is_clock_literal(&line.text, m.start(), m.end()) {
            continue;
        }
        out.push(m.as_str().to_string());
    }
    out
}

/// Remaining-time displays render as "-23:45"; they are not elapsed time.
fn is_negative(text: &str, match_start: usize) -> bool {
    text[..match_start]
        .chars()
        .rev()
        .find(|c| !c.is_whitespace())
        .map(|c| c == '-' || c == '−')
        .unwrap_or(false)
}

/// Strict two-part clock check: the surrounding ±30 chars must contain a
/// clock-context phrase AND the match itself must carry an am/pm marker.
fn is_clock_literal(text: &str, start: usize, end: usize) -> bool {
    let is_ampm = ampm_re().is_match(&text[end..]);
    if !is_ampm {
        return false;
    }
    let ctx_start = start.saturating_sub(30);
    let ctx_end = (end + 30).min(text.len());
    // Snap to char boundaries for slicing.
    let ctx_start = (0..=ctx_start).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    let ctx_end = (ctx_end..=text.len()).find(|&i| text.is_char_boundary(i)).unwrap_or(text.len());
    let context = text[ctx_start..ctx_end].to_lowercase();
    CLOCK_CONTEXT.iter().any(|p| context.contains(p)) || is_ampm_alone(&context)
}

/// A bare am/pm literal with no player chrome around it is the control
/// center clock even without a context phrase.
fn is_ampm_alone(context: &str) -> bool {
    context.trim().split_whitespace().count() <= 3
}

//! Title similarity scoring.
//!
//! One pure function, `similarity(a, b)`, used by every other component
//! to compare OCR text against catalog titles. Rules are tried in
//! priority order and the first match wins, so each band has a floor
//! that later, less-specific rules can never undercut:
//!
//!   1. exact (after normalization)            → 1.0
//!   2. substring containment, either way      → 0.8 + 0.2·coverage
//!   3. consecutive-phrase match               → 0.96 + 0.04·coverage
//!   4. word-level exact + partial matching    → open-ended fallback
//!
//! The containment band exists because OCR loves to truncate titles; a
//! fully-contained truncation scores very high but never beats a true
//! exact match. The phrase rule catches mid-title truncation when
//! punctuation differences defeat plain substring search.
//!
//! All rules are defined over `shorter`/`longer`, not `a`/`b`, so the
//! function is symmetric in its arguments.

/// Weight of a partial (prefix or near-miss) word match relative to an
/// exact word match.
const PARTIAL_WORD_WEIGHT: f64 = 0.6;

/// Boost added when a comparison has both exact and partial word
/// matches — OCR text that got most but not all words right.
const MIXED_MATCH_BOOST: f64 = 0.12;

/// Levenshtein similarity at which two words are treated as the same
/// word with an OCR character error.
const WORD_LEVENSHTEIN_ACCEPT: f64 = 0.8;

/// Normalized similarity between two title strings, in [0, 1].
///
/// Symmetric, deterministic, and 0 for any empty input.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    if longer.contains(shorter.as_str()) {
        let coverage = shorter.chars().count() as f64 / longer.chars().count() as f64;
        return 0.8 + 0.2 * coverage;
    }

    let short_words: Vec<&str> = shorter.split_whitespace().collect();
    let long_words: Vec<&str> = longer.split_whitespace().collect();

    if let Some(score) = phrase_match(&short_words, &long_words) {
        return score;
    }

    word_level_score(&short_words, &long_words)
}

/// Lowercase, trim, collapse every non-alphanumeric run to one space.
/// Unicode punctuation (em-dashes, ellipses, typographic quotes) is a
/// separator like any other — episode titles use it freely.
fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for ch in s.trim().chars() {
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Consecutive-phrase rule: every word of the shorter string must match
/// a contiguous run of words in the longer string, exactly or as a
/// prefix/suffix (truncated edge words). Scores 0.96–1.0 by word
/// coverage.
fn phrase_match(short_words: &[&str], long_words: &[&str]) -> Option<f64> {
    if short_words.is_empty() || short_words.len() > long_words.len() {
        return None;
    }
    let n = short_words.len();
    for window in long_words.windows(n) {
        let all = short_words.iter().zip(window.iter()).all(|(s, l)| {
            s == l || (s.len() >= 2 && (l.starts_with(*s) || l.ends_with(*s)))
        });
        if all {
            let coverage = n as f64 / long_words.len() as f64;
            return Some(0.96 + 0.04 * coverage);
        }
    }
    None
}

/// Word-level fallback: exact matches count 1.0, partial matches 0.6,
/// divided by the larger word count. Partial means one word is a prefix
/// of the other (both ≥2 chars) or the pair is within one OCR character
/// error by normalized Levenshtein distance.
fn word_level_score(short_words: &[&str], long_words: &[&str]) -> f64 {
    let mut used = vec![false; long_words.len()];
    let mut exact = 0usize;
    let mut partial = 0usize;

    for sw in short_words {
        if let Some(i) = long_words
            .iter()
            .enumerate()
            .position(|(i, lw)| !used[i] && lw == sw)
        {
            used[i] = true;
            exact += 1;
            continue;
        }
        if let Some(i) = long_words.iter().enumerate().position(|(i, lw)| {
            !used[i] && words_partially_match(sw, lw)
        }) {
            used[i] = true;
            partial += 1;
        }
    }

    let denom = short_words.len().max(long_words.len()) as f64;
    let mut score = (exact as f64 + PARTIAL_WORD_WEIGHT * partial as f64) / denom;
    if exact > 0 && partial > 0 {
        score += MIXED_MATCH_BOOST;
    }
    score.clamp(0.0, 1.0)
}

fn words_partially_match(a: &str, b: &str) -> bool {
    if a.len() >= 2 && b.len() >= 2 && (a.starts_with(b) || b.starts_with(a)) {
        return true;
    }
    a.len() >= 4
        && b.len() >= 4
        && strsim::normalized_levenshtein(a, b) >= WORD_LEVENSHTEIN_ACCEPT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("Hidden Brain", "Hidden Brain"), 1.0);
        assert_eq!(similarity("The Daily", "the daily"), 1.0);
    }

    #[test]
    fn punctuation_is_ignored_for_exact_match() {
        assert_eq!(similarity("Serial: Season One", "serial season one"), 1.0);
    }

    #[test]
    fn unicode_punctuation_separates_words() {
        // Em-dash and typographic quotes must not glue words together.
        assert_eq!(similarity("Part—One", "Part One"), 1.0);
        assert_eq!(similarity("It’s Complicated", "It's Complicated"), 1.0);
        let s = similarity("The End—Finally", "The End, Finally");
        assert_eq!(s, 1.0, "got {}", s);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(similarity("", "Hidden Brain"), 0.0);
        assert_eq!(similarity("Hidden Brain", ""), 0.0);
        assert_eq!(similarity("   ", "x"), 0.0);
    }

    #[test]
    fn containment_scores_at_least_point_eight() {
        let s = similarity("Hidden Br", "Hidden Brain");
        assert!(s >= 0.8, "got {}", s);
        assert!(s < 1.0, "got {}", s);
    }

    #[test]
    fn containment_is_symmetric() {
        let forward = similarity("Radiolab Presents", "Radiolab");
        let backward = similarity("Radiolab", "Radiolab Presents");
        assert_eq!(forward, backward);
    }

    #[test]
    fn longer_containment_scores_higher() {
        // Bigger coverage of the catalog title → higher confidence.
        let short = similarity("Hidden", "Hidden Brain Media");
        let long = similarity("Hidden Brain", "Hidden Brain Media");
        assert!(long > short, "{} vs {}", long, short);
    }

    #[test]
    fn phrase_match_handles_midword_truncation() {
        // "Dai" is not a substring match for "Daily Show" as a whole,
        // but the contiguous word run with a prefix edge word is.
        let s = similarity("The Dai Show", "The Daily Show");
        assert!(s >= 0.96, "got {}", s);
    }

    #[test]
    fn word_level_rewards_mostly_right_ocr() {
        let s = similarity(
            "Why We Do the Things We Do w",
            "Why We Do The Things We Do (Part 1)",
        );
        assert!(s > 0.6, "got {}", s);
        assert!(s < 0.96, "got {}", s);
    }

    #[test]
    fn word_level_is_symmetric() {
        let a = "science of happiness";
        let b = "the happiness science hour";
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn unrelated_titles_score_low() {
        let s = similarity("Hidden Brain", "Planet Money");
        assert!(s < 0.3, "got {}", s);
    }

    #[test]
    fn single_ocr_character_error_counts_as_partial() {
        // "Radiolab" misread as "Radio1ab" — levenshtein catches it.
        let s = similarity("Radio1ab Presents", "Radiolab Presents");
        assert!(s > 0.7, "got {}", s);
    }
}

//! Fuzzy text matching over noisy OCR output
//!
//! Report headers come back from OCR with misread characters in both the
//! labels and the values. Fields are located by fuzzy-matching the label
//! against each line and capturing what follows, instead of trusting exact
//! regex anchors.

use regex::Regex;

use crate::types::EXTRACTION_FAILURE;

/// Similarity score above which the matched line is consumed, so later
/// fields do not re-match it
pub const CONSUME_THRESHOLD: u32 = 85;

/// Maximum edit distance when locating a label inside a line
pub const NEAR_MATCH_MAX_DIST: usize = 2;

/// Best-window similarity between two strings, 0-100
///
/// Slides the shorter string across the longer one and returns the best
/// normalized-Levenshtein window score. Mirrors partial-ratio scoring
/// from the fuzzywuzzy family.
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_chars: Vec<char> = short.chars().collect();
    let long_chars: Vec<char> = long.chars().collect();
    if short_chars.is_empty() {
        return if long_chars.is_empty() { 100 } else { 0 };
    }

    let window = short_chars.len();
    let mut best = 0.0f64;
    for start in 0..=long_chars.len().saturating_sub(window) {
        let slice: String = long_chars[start..start + window].iter().collect();
        let score = strsim::normalized_levenshtein(short, &slice);
        if score > best {
            best = score;
        }
    }
    (best * 100.0).round() as u32
}

/// Partial ratio over whitespace-tokenized, sorted inputs
///
/// Insensitive to token order, which OCR line merging scrambles.
pub fn partial_token_sort_ratio(a: &str, b: &str) -> u32 {
    partial_ratio(&sort_tokens(a), &sort_tokens(b))
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Picks the candidate line scoring highest under `scorer`
pub fn extract_one<'a>(
    query: &str,
    candidates: &'a [String],
    scorer: impl Fn(&str, &str) -> u32,
) -> Option<(&'a str, u32)> {
    candidates
        .iter()
        .map(|c| (c.as_str(), scorer(query, c)))
        .max_by_key(|(_, score)| *score)
}

/// A fuzzy substring match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearMatch {
    /// Char offset of the match start
    pub start: usize,
    /// Char offset one past the match end
    pub end: usize,
    /// Edit distance of the matched span
    pub dist: usize,
}

/// Finds the substring of `hay` closest to `needle` within `max_dist` edits
///
/// Window lengths within `max_dist` of the needle length are scanned; the
/// lowest-distance span wins, with ties broken toward the longer span so
/// the whole label is consumed.
pub fn find_near_match(needle: &str, hay: &str, max_dist: usize) -> Option<NearMatch> {
    let needle_chars: Vec<char> = needle.chars().collect();
    let hay_chars: Vec<char> = hay.chars().collect();
    if needle_chars.is_empty() {
        return None;
    }

    let n = needle_chars.len();
    let min_len = n.saturating_sub(max_dist).max(1);
    let max_len = (n + max_dist).min(hay_chars.len());

    let mut best: Option<NearMatch> = None;
    for len in min_len..=max_len {
        for start in 0..=hay_chars.len() - len {
            let slice: String = hay_chars[start..start + len].iter().collect();
            let dist = strsim::levenshtein(needle, &slice);
            if dist > max_dist {
                continue;
            }
            let candidate = NearMatch {
                start,
                end: start + len,
                dist,
            };
            if best.map_or(true, |b| dist < b.dist || (dist == b.dist && candidate.end > b.end)) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// Extracts the text following `label` from the best-matching line
///
/// Lines shorter than the label are ignored. When the best line scores at
/// least [`CONSUME_THRESHOLD`] it is removed from `lines` so subsequent
/// fields skip it. Returns [`EXTRACTION_FAILURE`] when nothing matches.
pub fn fuzzy_regex(label: &str, lines: &mut Vec<String>) -> String {
    let candidates: Vec<String> = lines
        .iter()
        .filter(|l| l.chars().count() >= label.chars().count())
        .cloned()
        .collect();
    if candidates.is_empty() {
        return EXTRACTION_FAILURE.to_string();
    }

    let (line, score) = match extract_one(label, &candidates, partial_ratio) {
        Some(m) => (m.0.to_string(), m.1),
        None => return EXTRACTION_FAILURE.to_string(),
    };
    if score >= CONSUME_THRESHOLD {
        if let Some(pos) = lines.iter().position(|l| *l == line) {
            lines.remove(pos);
        }
    } else {
        log::debug!("weak label match for {:?}: score {}", label, score);
    }

    let near = match find_near_match(label, &line, NEAR_MATCH_MAX_DIST) {
        Some(m) => m,
        None => return EXTRACTION_FAILURE.to_string(),
    };

    // Capture everything after the matched label span
    let matched: String = line
        .chars()
        .skip(near.start)
        .take(near.end - near.start)
        .collect();
    let pattern = format!("{}\\s*(.*)", regex::escape(&matched));
    match Regex::new(&pattern).ok().and_then(|re| {
        re.captures(&line)
            .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
    }) {
        Some(v) => v,
        None => EXTRACTION_FAILURE.to_string(),
    }
}

/// Maximum edit distance for a word-anchored label prefix
///
/// Tighter than [`NEAR_MATCH_MAX_DIST`]: short labels like "MD" would
/// otherwise match inside "PSD".
const PREFIX_MAX_DIST: usize = 1;

/// Finds `needle` at a word boundary of `hay` within `max_dist` edits
fn find_word_start_match(needle: &str, hay: &str, max_dist: usize) -> Option<NearMatch> {
    let needle_chars: Vec<char> = needle.chars().collect();
    let hay_chars: Vec<char> = hay.chars().collect();
    if needle_chars.is_empty() {
        return None;
    }
    let n = needle_chars.len();
    let min_len = n.saturating_sub(max_dist).max(1);
    let max_len = n + max_dist;

    let mut best: Option<NearMatch> = None;
    for start in 0..hay_chars.len() {
        if start > 0 && !hay_chars[start - 1].is_whitespace() {
            continue;
        }
        for len in min_len..=max_len.min(hay_chars.len() - start) {
            let slice: String = hay_chars[start..start + len].iter().collect();
            let dist = strsim::levenshtein(needle, &slice);
            if dist > max_dist {
                continue;
            }
            let candidate = NearMatch {
                start,
                end: start + len,
                dist,
            };
            if best.map_or(true, |b| dist < b.dist || (dist == b.dist && candidate.end > b.end)) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// Extracts the text between a label prefix and its unit suffix
///
/// The first line carrying one of `prefixes` at a word boundary is used
/// and consumed; the span between the prefix and the following `suffix`
/// near-match is returned. Used for fields printed mid-sentence, e.g.
/// "MD -5.61 dB P < 1%".
pub fn fuzzy_regex_middle_field(
    prefixes: &[&str],
    suffix: &str,
    lines: &mut Vec<String>,
) -> String {
    // Short unit suffixes tolerate fewer edits, or they match anything
    let suffix_dist = NEAR_MATCH_MAX_DIST.min(suffix.chars().count().saturating_sub(1));
    for idx in 0..lines.len() {
        let line = lines[idx].clone();
        for prefix in prefixes {
            let Some(p) = find_word_start_match(prefix, &line, PREFIX_MAX_DIST) else {
                continue;
            };
            let rest: String = line.chars().skip(p.end).collect();
            let Some(s) = find_near_match(suffix, &rest, suffix_dist) else {
                continue;
            };
            let middle: String = rest.chars().take(s.start).collect();
            lines.remove(idx);
            return middle.trim().to_string();
        }
    }
    EXTRACTION_FAILURE.to_string()
}

// String cleaners. All pass extraction failures through untouched.

/// Removes every space
pub fn remove_spaces(s: &str) -> String {
    if s == EXTRACTION_FAILURE {
        return s.to_string();
    }
    s.replace(' ', "")
}

/// Collapses commas/semicolons and repeated periods to a single period
pub fn clean_punctuation_to_period(s: &str) -> String {
    if s == EXTRACTION_FAILURE {
        return s.to_string();
    }
    let replaced = s.replace([',', ';'], ".");
    let parts: Vec<&str> = replaced.split('.').filter(|p| !p.is_empty()).collect();
    parts.join(".")
}

/// Strips everything but digits and the characters in `keep`
pub fn remove_non_numeric(s: &str, keep: &[char]) -> String {
    if s == EXTRACTION_FAILURE {
        return s.to_string();
    }
    s.chars()
        .filter(|c| c.is_ascii_digit() || keep.contains(c))
        .collect()
}

/// Inserts a decimal point before the last two digits when missing
///
/// The analyzer prints dB indices with two decimals; OCR frequently drops
/// the point.
pub fn add_decimal_if_absent(s: &str) -> String {
    if s == EXTRACTION_FAILURE {
        return s.to_string();
    }
    if s.contains('.') {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < 2 {
        return s.to_string();
    }
    let split = chars.len() - 2;
    let head: String = chars[..split].iter().collect();
    let tail: String = chars[split..].iter().collect();
    format!("{}.{}", head, tail)
}

/// Condenses misread minus prefixes (`=`, `--`) into a single minus
pub fn clean_minus_sign(s: &str) -> String {
    if s == EXTRACTION_FAILURE {
        return s.to_string();
    }
    let s = s.replace('=', "-");
    let trimmed = s.trim_start_matches('-');
    if trimmed.len() < s.len() {
        format!("-{}", trimmed)
    } else {
        s
    }
}

/// Replaces letter O with digit zero (a routine OCR confusion in numbers)
pub fn letter_o_to_zero(s: &str) -> String {
    if s == EXTRACTION_FAILURE {
        return s.to_string();
    }
    s.replace(['O', 'o'], "0")
}

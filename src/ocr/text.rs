//! Normalization and interpretation of recognized cell text.

use std::sync::OnceLock;

use regex::Regex;
use strsim::jaro_winkler;
use unicode_normalization::UnicodeNormalization;

use crate::core::model::Marker;

const STAR_GLYPHS: [char; 2] = ['★', '☆'];
const ASTERISK_GLYPHS: [char; 3] = ['*', '✱', '✳'];

const MONTH_NAMES: [&str; 12] = [
    "JANUARY",
    "FEBRUARY",
    "MARCH",
    "APRIL",
    "MAY",
    "JUNE",
    "JULY",
    "AUGUST",
    "SEPTEMBER",
    "OCTOBER",
    "NOVEMBER",
    "DECEMBER",
];

fn day_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[^0-9])([0-9]{1,2})(?:[^0-9]|$)").expect("valid regex"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[^0-9])((?:19|20)[0-9]{2})(?:[^0-9]|$)").expect("valid regex"))
}

/// NFKC, uppercase, no whitespace.
pub fn normalize(raw: &str) -> String {
    raw.nfkc()
        .flat_map(char::to_uppercase)
        .filter(|c| !c.is_whitespace())
        .collect()
}

pub fn has_star_glyph(text: &str) -> bool {
    text.chars().any(|c| STAR_GLYPHS.contains(&c))
}

pub fn has_asterisk_glyph(text: &str) -> bool {
    text.chars().any(|c| ASTERISK_GLYPHS.contains(&c))
}

pub fn marker_text(normalized: &str) -> String {
    normalized.chars().filter(|c| c.is_ascii_alphabetic()).collect()
}

/// Exact match first, then prefix match; longer codes win.
pub fn classify_marker(letters: &str) -> Option<Marker> {
    if letters.is_empty() {
        return None;
    }
    Marker::VOCABULARY
        .iter()
        .find(|marker| marker.code() == letters)
        .or_else(|| {
            Marker::VOCABULARY
                .iter()
                .find(|marker| letters.starts_with(marker.code()))
        })
        .copied()
}

/// First standalone 1–2 digit number in `1..=31`.
pub fn extract_day_number(text: &str) -> Option<u32> {
    day_number_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .find(|n| (1..=31).contains(n))
}

/// Month and year named in a page header. Month names are matched fuzzily so
/// that a dropped or misread letter still resolves.
pub fn parse_month_year(header: &str) -> (Option<u32>, Option<i32>) {
    let upper = header.nfkc().collect::<String>().to_uppercase();

    let year = year_re()
        .captures(&upper)
        .and_then(|caps| caps.get(1)?.as_str().parse::<i32>().ok());

    let month = upper
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|token| token.len() >= 3)
        .find_map(match_month);

    (month, year)
}

/// Distinct month names spelled out in full anywhere in `text`.
pub fn count_month_names(text: &str) -> usize {
    let upper = text.nfkc().collect::<String>().to_uppercase();
    MONTH_NAMES.iter().filter(|name| upper.contains(*name)).count()
}

fn match_month(token: &str) -> Option<u32> {
    if let Some(idx) = MONTH_NAMES.iter().position(|name| *name == token) {
        return Some(idx as u32 + 1);
    }
    // abbreviations such as "SEPT"
    if let Some(idx) = MONTH_NAMES.iter().position(|name| name.starts_with(token)) {
        return Some(idx as u32 + 1);
    }
    MONTH_NAMES
        .iter()
        .enumerate()
        .map(|(idx, name)| (idx, jaro_winkler(name, token)))
        .filter(|(_, score)| *score >= 0.9)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(idx, _)| idx as u32 + 1)
}

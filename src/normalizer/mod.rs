//! Title normalizer.
//!
//! Turns one free-text posting title into artist, album, format tokens, an
//! optional price and genre tags. Every stage works on the output of the
//! previous one, except the genre scan which always reads the original title.
//! Parsing never fails: anything that cannot be recognised degrades to the
//! `Unknown Artist` / `Unknown Album` sentinels or to empty fields.

mod keywords;

pub use keywords::{DESCRIPTOR_KEYWORDS, FORMAT_KEYWORDS, GENRE_KEYWORDS};

use crate::release::{UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use keywords::contains_any;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref STATUS_PREFIX: Regex = Regex::new(
        r"(?i)^\[?\s*(pre-?order|preorder|new release|restock|reissue|restocked?|available now)\s*:?\s*\]?\s*"
    )
    .unwrap();
    static ref PREORDER_PREFIX: Regex = Regex::new(r"(?i)^(pre\s*-?\s*order\s*:?\s*)").unwrap();
    static ref SIGNED_NOTE: Regex = Regex::new(r"(?i)\s*\(signed\)").unwrap();
    static ref AUTOGRAPHED_NOTE: Regex = Regex::new(r"(?i)\s*\(autographed?\)").unwrap();
    static ref SIGNED_JACKET: Regex = Regex::new(r"(?i)\s*signed\s+jacket").unwrap();
    static ref WITH_SIGNED: Regex = Regex::new(r"(?i)\s*w/\s*signed\s+").unwrap();
    static ref STORE_EXCLUSIVE: Regex =
        Regex::new(r"(?i)\s*\((target|uo|indie|walmart) exclusive\)").unwrap();
    static ref TRAILING_VINYL: Regex = Regex::new(r"(?i)\s+vinyl\s*$").unwrap();

    static ref BRACKETED: Regex = Regex::new(r"\[([^\]]+)\]").unwrap();
    static ref PARENTHESISED: Regex = Regex::new(r"\(([^)]+)\)").unwrap();

    static ref PRICE: Regex = Regex::new(r"(?i)\$\s*(\d+\.?\d*)|(\d+\.?\d*)\s*USD").unwrap();
    static ref DOLLAR_AMOUNT: Regex = Regex::new(r"\$\s*\d+\.?\d*").unwrap();
    static ref USD_AMOUNT: Regex = Regex::new(r"(?i)\d+\.?\d*\s*USD").unwrap();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref DASH: Regex = Regex::new(r"\s*[-–—]\s*").unwrap();
    static ref ARTIST_ALBUM: Regex = Regex::new(r"^([^-]+?)\s*-\s*(.+?)$").unwrap();

    static ref LEADING_THE: Regex = Regex::new(r"(?i)^\s*the\s+").unwrap();
    static ref BRACKET_CHARS: Regex = Regex::new(r"[\[\](){}]").unwrap();
    static ref LEADING_DASHES: Regex = Regex::new(r"^[-–—\s]+").unwrap();
    static ref TRAILING_DASHES: Regex = Regex::new(r"[-–—\s]+$").unwrap();
}

/// Result of normalizing one title.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTitle {
    pub artist: String,
    pub album: String,
    /// Detected format tokens in order of appearance. Empty when nothing matched.
    pub formats: Vec<String>,
    pub price: Option<f64>,
    pub genres: BTreeSet<String>,
}

pub fn parse_title(title: &str) -> ParsedTitle {
    let cleaned = strip_noise(title);
    let (cleaned, mut formats) = extract_bracketed_formats(&cleaned);
    let (cleaned, descriptors) = extract_descriptors(&cleaned);
    formats.extend(descriptors);
    let (cleaned, price) = extract_price(&cleaned);
    let cleaned = normalize_separators(&cleaned);
    let (artist, album) = split_artist_album(&cleaned);

    ParsedTitle {
        artist,
        album,
        formats,
        price,
        genres: scan_genres(title),
    }
}

pub(crate) fn strip_noise(title: &str) -> String {
    let cleaned = STATUS_PREFIX.replace(title, "");
    let cleaned = PREORDER_PREFIX.replace(&cleaned, "");
    let cleaned = SIGNED_NOTE.replace_all(&cleaned, "");
    let cleaned = AUTOGRAPHED_NOTE.replace_all(&cleaned, "");
    let cleaned = SIGNED_JACKET.replace_all(&cleaned, "");
    let cleaned = WITH_SIGNED.replace_all(&cleaned, " ");
    let cleaned = STORE_EXCLUSIVE.replace_all(&cleaned, "");
    let cleaned = TRAILING_VINYL.replace(&cleaned, "");
    cleaned.trim().to_string()
}

/// Removes every group matched by `pattern` whose inner text satisfies `is_token`,
/// returning the remaining text and the removed inner texts.
fn extract_groups(text: &str, pattern: &Regex, is_token: impl Fn(&str) -> bool) -> (String, Vec<String>) {
    let groups: Vec<(String, String)> = pattern
        .captures_iter(text)
        .map(|caps| (caps[0].to_string(), caps[1].to_string()))
        .collect();

    let mut cleaned = text.to_string();
    let mut tokens = Vec::new();
    for (whole, inner) in groups {
        if is_token(&inner) {
            cleaned = cleaned.replacen(&whole, "", 1).trim().to_string();
            tokens.push(inner);
        }
    }
    (cleaned, tokens)
}

pub(crate) fn extract_bracketed_formats(text: &str) -> (String, Vec<String>) {
    extract_groups(text, &BRACKETED, |inner| contains_any(inner, FORMAT_KEYWORDS))
}

pub(crate) fn extract_descriptors(text: &str) -> (String, Vec<String>) {
    extract_groups(text, &PARENTHESISED, |inner| {
        contains_any(inner, DESCRIPTOR_KEYWORDS)
    })
}

/// First `$N` or `N USD` amount becomes the price; all amounts are removed.
/// A title without a parsable amount keeps its text untouched.
pub(crate) fn extract_price(text: &str) -> (String, Option<f64>) {
    let Some(caps) = PRICE.captures(text) else {
        return (text.to_string(), None);
    };
    let price = caps
        .get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|p| p.is_finite());

    let cleaned = DOLLAR_AMOUNT.replace_all(text, "");
    let cleaned = USD_AMOUNT.replace_all(&cleaned, "");
    (cleaned.trim().to_string(), price)
}

pub(crate) fn normalize_separators(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    DASH.replace_all(&collapsed, " - ").trim().to_string()
}

/// Splits on the first ` - `. Without a dash, three or more words put the
/// first two in the artist; fewer words leave the artist unknown.
pub(crate) fn split_artist_album(text: &str) -> (String, String) {
    let (artist, album) = match ARTIST_ALBUM.captures(text) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => {
            let words: Vec<&str> = text.split_whitespace().collect();
            if words.len() >= 3 {
                (words[..2].join(" "), words[2..].join(" "))
            } else {
                (UNKNOWN_ARTIST.to_string(), words.join(" "))
            }
        }
    };

    let artist = clean_artist(&artist);
    let album = clean_album(&album);
    (
        non_empty_or(artist, UNKNOWN_ARTIST),
        non_empty_or(album, UNKNOWN_ALBUM),
    )
}

pub(crate) fn clean_artist(name: &str) -> String {
    let name = LEADING_THE.replace(name, "The ");
    let name = BRACKET_CHARS.replace_all(&name, "");
    WHITESPACE.replace_all(&name, " ").trim().to_string()
}

pub(crate) fn clean_album(name: &str) -> String {
    let name = BRACKET_CHARS.replace_all(name, "");
    let name = WHITESPACE.replace_all(&name, " ");
    let name = LEADING_DASHES.replace(&name, "");
    let name = TRAILING_DASHES.replace(&name, "");
    name.trim().to_string()
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

pub(crate) fn scan_genres(title: &str) -> BTreeSet<String> {
    let lower = title.to_lowercase();
    GENRE_KEYWORDS
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .map(|(_, genre)| genre.to_string())
        .collect()
}

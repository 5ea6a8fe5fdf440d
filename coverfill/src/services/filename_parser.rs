//! Filename heuristic
//!
//! Derives a best-guess (artist, title) from a file name when the tags do
//! not carry them. Never fails: the worst case is an empty guess.
//!
//! Rules, applied to the file stem:
//! 1. `_` becomes a space, whitespace collapses
//! 2. bracketed noise such as `(Official Video)` or `[HQ]` is dropped
//! 3. a leading track number (`3. `, `01 `) is dropped; a dashed one
//!    (`07 - `) only when zero-padded or another separator follows, so
//!    `311 - Amber` keeps its artist
//! 4. the first spaced dash (`-`, `–`, `—`) splits artist from title
//! 5. an unsplit name that is only a generic stem (`track07`, `Track 7`,
//!    digits) has no title; a title after a separator is always kept

use crate::models::ParsedFilenameGuess;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static BRACKET_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*[\(\[][^\)\]]*\b(official|video|audio|lyrics?|hq|hd|remaster(ed)?|explicit|visualizer)\b[^\)\]]*[\)\]]",
    )
    .unwrap()
});

static DOTTED_TRACK_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}\s*[.)]\s*").unwrap());

static DASHED_TRACK_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})\s*[-–—]\s*").unwrap());

static PADDED_TRACK_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0\d\s+").unwrap());

static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[-–—]\s+").unwrap());

static GENERIC_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(audio\s*)?(track|piste|titel|untitled)?\s*#?\d*$").unwrap()
});

/// Parse a best-guess (artist, title) from a path's file name
pub fn parse_filename(path: &Path) -> ParsedFilenameGuess {
    let stem = match path.file_stem() {
        Some(stem) => stem.to_string_lossy().replace('_', " "),
        None => return ParsedFilenameGuess::default(),
    };

    let text = WHITESPACE.replace_all(stem.trim(), " ").to_string();
    let text = BRACKET_NOISE.replace_all(&text, "").trim().to_string();

    let text = strip_track_number(&text);

    let (artist, title) = match SEPARATOR.find(text) {
        Some(m) => (
            clean_part(&text[..m.start()]),
            clean_part(&text[m.end()..]),
        ),
        None => (
            None,
            clean_part(text).filter(|t| !GENERIC_TITLE.is_match(t)),
        ),
    };

    let guess = ParsedFilenameGuess { artist, title };
    tracing::trace!(path = %path.display(), guess = ?guess, "Parsed filename");
    guess
}

/// Drop a leading track number, leaving `text` alone when nothing would
/// remain or the number looks like part of the artist
fn strip_track_number(text: &str) -> &str {
    let rest = if let Some(m) = DOTTED_TRACK_NUMBER.find(text) {
        // `10.000 Maniacs` is not track 10
        Some(&text[m.end()..]).filter(|rest| !rest.starts_with(|c: char| c.is_ascii_digit()))
    } else if let Some(caps) = DASHED_TRACK_NUMBER.captures(text) {
        let rest = &text[caps[0].len()..];
        let padded = caps[1].len() > 1 && caps[1].starts_with('0');
        Some(rest).filter(|rest| padded || SEPARATOR.is_match(rest))
    } else {
        PADDED_TRACK_NUMBER.find(text).map(|m| &text[m.end()..])
    };

    match rest.map(str::trim) {
        Some(rest) if !rest.is_empty() => rest,
        _ => text,
    }
}

/// Trim whitespace and stray punctuation; `None` when nothing is left
fn clean_part(part: &str) -> Option<String> {
    let cleaned = part
        .trim()
        .trim_matches(|c: char| matches!(c, '-' | '–' | '—' | '"' | '\'' | '.' | ','))
        .trim();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

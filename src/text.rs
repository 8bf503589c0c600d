//! Find ISBNs in free-form OCR output.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::models::{Isbn13, IsbnCandidate, IsbnKind};

// Bookland prefix, then registration group / registrant / publication
// groups of up to 5, 7 and 7 digits, then the check digit. Any separator
// is a single hyphen or whitespace character.
static ISBN13_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"97[89][-\s]?[0-9]{1,5}[-\s]?[0-9]{1,7}[-\s]?[0-9]{1,7}[-\s]?[0-9]")
        .expect("static regex")
});

static ISBN10_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:ISBN[:\s]*)?([0-9]{1,5}[-\s]?[0-9]{1,7}[-\s]?[0-9]{1,7}[-\s]?[0-9X])")
        .expect("static regex")
});

fn normalize(raw: &str, kind: IsbnKind) -> String {
    match kind {
        IsbnKind::Isbn13 => raw.chars().filter(char::is_ascii_digit).collect(),
        IsbnKind::Isbn10 => raw
            .chars()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| c.is_ascii_digit() || *c == 'X')
            .collect(),
    }
}

fn expected_len(kind: IsbnKind) -> usize {
    match kind {
        IsbnKind::Isbn13 => 13,
        IsbnKind::Isbn10 => 10,
    }
}

fn shaped_candidates(text: &str, kind: IsbnKind) -> Vec<IsbnCandidate> {
    let raws: Vec<&str> = match kind {
        IsbnKind::Isbn13 => ISBN13_RE.find_iter(text).map(|m| m.as_str()).collect(),
        IsbnKind::Isbn10 => ISBN10_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect(),
    };

    raws.into_iter()
        .map(|raw| IsbnCandidate {
            raw_text: raw.to_string(),
            normalized_digits: normalize(raw, kind),
            kind,
        })
        .filter(|c| c.normalized_digits.len() == expected_len(kind))
        .collect()
}

/// Every ISBN-shaped run in `text`, in scan order: all ISBN-13 shapes
/// first, then all ISBN-10 shapes. Checksums are not applied.
pub fn find_candidates(text: &str) -> Vec<IsbnCandidate> {
    let mut candidates = shaped_candidates(text, IsbnKind::Isbn13);
    candidates.extend(shaped_candidates(text, IsbnKind::Isbn10));
    candidates
}

fn first_valid(candidates: Vec<IsbnCandidate>) -> Option<Isbn13> {
    for candidate in candidates {
        match candidate.to_isbn13() {
            Some(isbn) => {
                debug!(raw = %candidate.raw_text, isbn = %isbn, kind = ?candidate.kind, "Accepted ISBN candidate");
                return Some(isbn);
            }
            None => {
                trace!(raw = %candidate.raw_text, kind = ?candidate.kind, "Rejected ISBN candidate");
            }
        }
    }
    None
}

/// Return the first checksum-valid ISBN-13 in `text`, left to right.
pub fn extract_isbn13_from_text(text: &str) -> Option<Isbn13> {
    first_valid(shaped_candidates(text, IsbnKind::Isbn13))
}

/// Return the first checksum-valid ISBN-10 in `text`, converted to ISBN-13.
pub fn extract_isbn10_from_text(text: &str) -> Option<Isbn13> {
    first_valid(shaped_candidates(text, IsbnKind::Isbn10))
}

/// Find an ISBN in OCR text. ISBN-13 shapes win over ISBN-10 shapes
/// regardless of position; the first candidate that passes its checksum is
/// returned.
pub fn extract_isbn_from_text(text: &str) -> Option<Isbn13> {
    extract_isbn13_from_text(text).or_else(|| extract_isbn10_from_text(text))
}

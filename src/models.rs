use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::checksum;
use crate::error::ScanError;

/// A validated ISBN-13.
///
/// Always 13 ASCII digits with a Bookland prefix (`978` or `979`) and a
/// correct check digit. The only way to get one is through [`Isbn13::parse`],
/// [`FromStr`] or [`checksum::isbn10_to_isbn13`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Isbn13(String);

impl Isbn13 {
    /// Validate `digits` and wrap it. Returns `None` if any part of the
    /// invariant does not hold.
    pub fn parse(digits: &str) -> Option<Self> {
        if has_bookland_prefix(digits) && checksum::is_valid_isbn13(digits) {
            Some(Self(digits.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Isbn13 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Isbn13 {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Isbn13 {
    type Err = ScanError;

    /// Accepts an ISBN-13 or ISBN-10, with or without hyphens and spaces.
    /// ISBN-10 input is converted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | ' '))
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let parsed = match compact.len() {
            13 => Isbn13::parse(&compact),
            10 if checksum::is_valid_isbn10(&compact) => checksum::isbn10_to_isbn13(&compact),
            _ => None,
        };

        parsed.ok_or_else(|| ScanError::InvalidIsbn(s.to_string()))
    }
}

/// `true` if `code` starts with one of the Bookland prefixes.
pub fn has_bookland_prefix(code: &str) -> bool {
    code.starts_with("978") || code.starts_with("979")
}

/// Which ISBN shape a text candidate was matched as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IsbnKind {
    Isbn10,
    Isbn13,
}

/// An ISBN-shaped run of text, before checksum validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsbnCandidate {
    /// The matched text, separators included.
    pub raw_text: String,
    /// Digits (and a trailing `X` for ISBN-10) with separators stripped.
    pub normalized_digits: String,
    pub kind: IsbnKind,
}

impl IsbnCandidate {
    /// Whether the normalized digits have the right length and check digit.
    pub fn is_valid(&self) -> bool {
        match self.kind {
            IsbnKind::Isbn13 => checksum::is_valid_isbn13(&self.normalized_digits),
            IsbnKind::Isbn10 => checksum::is_valid_isbn10(&self.normalized_digits),
        }
    }

    /// The ISBN-13 this candidate stands for, if it validates.
    pub fn to_isbn13(&self) -> Option<Isbn13> {
        if !self.is_valid() {
            return None;
        }
        match self.kind {
            IsbnKind::Isbn13 => Isbn13::parse(&self.normalized_digits),
            IsbnKind::Isbn10 => checksum::isbn10_to_isbn13(&self.normalized_digits),
        }
    }
}

/// 1D symbologies a [`BarcodeDecoder`](crate::detection::barcode::BarcodeDecoder)
/// may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Symbology {
    Ean13,
    Ean8,
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbology::Ean13 => f.write_str("EAN-13"),
            Symbology::Ean8 => f.write_str("EAN-8"),
        }
    }
}

/// One payload read by a barcode decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBarcode {
    pub payload: String,
    pub symbology: Symbology,
}

/// Outcome of a successful extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "isbn", rename_all = "snake_case")]
pub enum ExtractionResult {
    Found(Isbn13),
    NotFound,
}

impl ExtractionResult {
    pub fn isbn(&self) -> Option<&Isbn13> {
        match self {
            ExtractionResult::Found(isbn) => Some(isbn),
            ExtractionResult::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ExtractionResult::Found(_))
    }
}

impl From<Option<Isbn13>> for ExtractionResult {
    fn from(value: Option<Isbn13>) -> Self {
        value.map_or(ExtractionResult::NotFound, ExtractionResult::Found)
    }
}

/// Rectangle in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Bounding box of one connected edge component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub label: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
}

impl Contour {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Area of the bounding box, not the pixel count
    pub fn box_area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn aspect_ratio(&self) -> f32 {
        let w = self.width() as f32;
        let h = self.height() as f32;
        if h == 0.0 {
            return 0.0;
        }
        w / h
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            x: self.min_x,
            y: self.min_y,
            width: self.width(),
            height: self.height(),
        }
    }
}

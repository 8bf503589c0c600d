//! ISBN check digit arithmetic.

use crate::models::Isbn13;

/// ISBN-13 / EAN-13 check digit for the first 12 digits.
///
/// `body` must be 12 ASCII digits.
fn isbn13_check_digit(body: &[u8]) -> u8 {
    let sum: u32 = body
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let digit = (b - b'0') as u32;
            if i % 2 == 0 { digit } else { digit * 3 }
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Validate an ISBN-13 check digit. Anything but exactly 13 ASCII digits is
/// invalid.
pub fn is_valid_isbn13(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    if bytes.len() != 13 || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    isbn13_check_digit(&bytes[..12]) == bytes[12] - b'0'
}

/// Validate an ISBN-10 check digit. The final character may be `X` (ten).
pub fn is_valid_isbn10(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    if bytes.len() != 10 {
        return false;
    }

    let mut sum = 0u32;
    for (i, &b) in bytes.iter().enumerate() {
        let value = match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'X' if i == 9 => 10,
            _ => return false,
        };
        sum += value * (10 - i as u32);
    }

    sum % 11 == 0
}

/// Convert an ISBN-10 to its ISBN-13 form: `978`, the first nine digits,
/// and a freshly computed check digit.
///
/// The ISBN-10's own check digit is not verified here; call
/// [`is_valid_isbn10`] first. Returns `None` if the first nine characters
/// are not digits or the length is wrong.
pub fn isbn10_to_isbn13(digits10: &str) -> Option<Isbn13> {
    let bytes = digits10.as_bytes();
    if bytes.len() != 10 || !bytes[..9].iter().all(u8::is_ascii_digit) {
        return None;
    }

    let mut body = Vec::with_capacity(13);
    body.extend_from_slice(b"978");
    body.extend_from_slice(&bytes[..9]);
    let check = isbn13_check_digit(&body);
    body.push(b'0' + check);

    let code = String::from_utf8(body).ok()?;
    Isbn13::parse(&code)
}

/// EAN check digit test for any length (EAN-8, EAN-13).
///
/// Weights alternate 3, 1 from the rightmost data digit.
pub fn is_valid_ean(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    if bytes.len() < 2 || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }

    let (data, check) = bytes.split_at(bytes.len() - 1);
    let sum: u32 = data
        .iter()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = (b - b'0') as u32;
            if i % 2 == 0 { digit * 3 } else { digit }
        })
        .sum();

    ((10 - sum % 10) % 10) as u8 == check[0] - b'0'
}

//! Scan-line EAN-13 / EAN-8 reader and the matching module encoder.
//!
//! Rows of the image are binarized at their own mid-gray level and turned
//! into run lengths. A symbol is accepted when its guard patterns line up,
//! every digit matches a code pattern closely enough, and the check digit
//! holds. Each row is also read right-to-left so upside-down covers decode.

use image::{DynamicImage, GrayImage, Luma};
use tracing::trace;

use crate::checksum::is_valid_ean;
use crate::detection::barcode::BarcodeDecoder;
use crate::models::{DecodedBarcode, Symbology};

/// Widths of the L-code for each digit, starting with a space.
/// The R-code has the same widths starting with a bar; the G-code is the
/// L-code reversed.
const L_PATTERNS: [[u32; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// L/G parity of the six left-hand EAN-13 digits (G = 1, leftmost digit in
/// the high bit), indexed by the implied first digit.
const FIRST_DIGIT_PARITY: [u8; 10] = [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

const GUARD: [u32; 3] = [1, 1, 1];
const MIDDLE_GUARD: [u32; 5] = [1, 1, 1, 1, 1];

const EAN13_RUNS: usize = 59;
const EAN13_MODULES: f32 = 95.0;
const EAN8_RUNS: usize = 43;
const EAN8_MODULES: f32 = 67.0;

const MAX_AVG_VARIANCE: f32 = 0.48;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;
/// Light space required on each side of a symbol, in modules.
const MIN_QUIET_MODULES: f32 = 2.0;
/// Rows with less spread than this between darkest and lightest pixel are skipped.
const MIN_ROW_CONTRAST: u8 = 40;

/// Reads EAN-13 and EAN-8 symbols along evenly spaced horizontal lines.
#[derive(Debug, Clone)]
pub struct ScanlineDecoder {
    /// Number of rows sampled per image.
    pub scan_lines: u32,
}

impl ScanlineDecoder {
    pub fn new() -> Self {
        Self { scan_lines: 48 }
    }

    pub fn with_scan_lines(mut self, scan_lines: u32) -> Self {
        self.scan_lines = scan_lines.max(1);
        self
    }

    fn sample_rows(&self, height: u32) -> Vec<u32> {
        let lines = self.scan_lines.max(1) as u64;
        let mut rows: Vec<u32> = (0..lines)
            .map(|k| (((2 * k + 1) * height as u64) / (2 * lines)) as u32)
            .collect();
        rows.dedup();
        rows
    }

    /// Decode every symbol found in a grayscale image, in row order.
    pub fn decode_gray(&self, gray: &GrayImage, symbologies: &[Symbology]) -> Vec<DecodedBarcode> {
        let (width, height) = gray.dimensions();
        let mut found: Vec<DecodedBarcode> = Vec::new();
        if width == 0 || height == 0 {
            return found;
        }

        for y in self.sample_rows(height) {
            let start = (y * width) as usize;
            let mut row = gray.as_raw()[start..start + width as usize].to_vec();

            for _direction in 0..2 {
                for barcode in decode_row(&row, symbologies) {
                    if !found.iter().any(|b| b.payload == barcode.payload) {
                        trace!(row = y, payload = %barcode.payload, symbology = %barcode.symbology, "Decoded symbol");
                        found.push(barcode);
                    }
                }
                row.reverse();
            }
        }

        found
    }
}

impl Default for ScanlineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BarcodeDecoder for ScanlineDecoder {
    fn decode(&self, image: &DynamicImage, symbologies: Option<&[Symbology]>) -> Vec<DecodedBarcode> {
        let symbologies = symbologies.unwrap_or(&[Symbology::Ean13, Symbology::Ean8]);
        self.decode_gray(&image.to_luma8(), symbologies)
    }

    fn name(&self) -> &str {
        "scan-line EAN"
    }
}

/// Binarize a row at its mid-gray level and return run lengths, plus whether
/// the first run is dark.
fn row_runs(row: &[u8]) -> Option<(bool, Vec<u32>)> {
    let min = *row.iter().min()?;
    let max = *row.iter().max()?;
    if max - min < MIN_ROW_CONTRAST {
        return None;
    }
    let threshold = ((min as u16 + max as u16) / 2) as u8;

    let mut runs = Vec::new();
    let first_dark = row[0] < threshold;
    let mut current = first_dark;
    let mut length = 0u32;
    for &value in row {
        let dark = value < threshold;
        if dark == current {
            length += 1;
        } else {
            runs.push(length);
            current = dark;
            length = 1;
        }
    }
    runs.push(length);

    Some((first_dark, runs))
}

/// Average per-pixel deviation of `runs` from `pattern` scaled to the same
/// total width. `f32::INFINITY` if any single run is too far off.
fn pattern_variance(runs: &[u32], pattern: &[u32]) -> f32 {
    let total: u32 = runs.iter().sum();
    let modules: u32 = pattern.iter().sum();
    if total < modules {
        return f32::INFINITY;
    }

    let unit = total as f32 / modules as f32;
    let max_individual = unit * MAX_INDIVIDUAL_VARIANCE;
    let mut variance = 0.0;
    for (&run, &expected) in runs.iter().zip(pattern) {
        let diff = (run as f32 - expected as f32 * unit).abs();
        if diff > max_individual {
            return f32::INFINITY;
        }
        variance += diff;
    }
    variance / total as f32
}

fn reversed(pattern: &[u32; 4]) -> [u32; 4] {
    [pattern[3], pattern[2], pattern[1], pattern[0]]
}

/// Best matching digit for four runs, and whether it matched the G-code.
fn decode_digit(runs: &[u32], allow_g: bool) -> Option<(u8, bool)> {
    let mut best: Option<(u8, bool)> = None;
    let mut best_variance = MAX_AVG_VARIANCE;

    for (digit, pattern) in L_PATTERNS.iter().enumerate() {
        let variance = pattern_variance(runs, pattern);
        if variance < best_variance {
            best_variance = variance;
            best = Some((digit as u8, false));
        }
        if allow_g {
            let variance = pattern_variance(runs, &reversed(pattern));
            if variance < best_variance {
                best_variance = variance;
                best = Some((digit as u8, true));
            }
        }
    }

    best
}

fn guards_match(symbol: &[u32], module: f32, guards: &[(usize, &[u32])]) -> bool {
    guards.iter().all(|&(offset, pattern)| {
        let runs = &symbol[offset..offset + pattern.len()];
        let width: u32 = runs.iter().sum();
        let unit = width as f32 / pattern.len() as f32;
        pattern_variance(runs, pattern) < MAX_AVG_VARIANCE
            && unit > module * 0.5
            && unit < module * 1.5
    })
}

fn quiet_zones(runs: &[u32], start: usize, len: usize, module: f32) -> bool {
    if start == 0 || start + len >= runs.len() {
        return false;
    }
    let min_quiet = module * MIN_QUIET_MODULES;
    runs[start - 1] as f32 >= min_quiet && runs[start + len] as f32 >= min_quiet
}

fn digits_to_string(digits: &[u8]) -> String {
    digits.iter().map(|d| (b'0' + d) as char).collect()
}

fn decode_ean13_at(runs: &[u32], start: usize) -> Option<String> {
    let symbol = runs.get(start..start + EAN13_RUNS)?;
    let total: u32 = symbol.iter().sum();
    let module = total as f32 / EAN13_MODULES;

    if !quiet_zones(runs, start, EAN13_RUNS, module)
        || !guards_match(symbol, module, &[(0, &GUARD), (27, &MIDDLE_GUARD), (56, &GUARD)])
    {
        return None;
    }

    let mut digits = Vec::with_capacity(13);
    digits.push(0);
    let mut parity = 0u8;
    for k in 0..6 {
        let offset = 3 + 4 * k;
        let (digit, is_g) = decode_digit(&symbol[offset..offset + 4], true)?;
        parity = (parity << 1) | is_g as u8;
        digits.push(digit);
    }
    digits[0] = FIRST_DIGIT_PARITY.iter().position(|&p| p == parity)? as u8;

    for k in 0..6 {
        let offset = 32 + 4 * k;
        let (digit, _) = decode_digit(&symbol[offset..offset + 4], false)?;
        digits.push(digit);
    }

    let code = digits_to_string(&digits);
    is_valid_ean(&code).then_some(code)
}

fn decode_ean8_at(runs: &[u32], start: usize) -> Option<String> {
    let symbol = runs.get(start..start + EAN8_RUNS)?;
    let total: u32 = symbol.iter().sum();
    let module = total as f32 / EAN8_MODULES;

    if !quiet_zones(runs, start, EAN8_RUNS, module)
        || !guards_match(symbol, module, &[(0, &GUARD), (19, &MIDDLE_GUARD), (40, &GUARD)])
    {
        return None;
    }

    let mut digits = Vec::with_capacity(8);
    for offset in [3, 7, 11, 15, 24, 28, 32, 36] {
        let (digit, _) = decode_digit(&symbol[offset..offset + 4], false)?;
        digits.push(digit);
    }

    let code = digits_to_string(&digits);
    is_valid_ean(&code).then_some(code)
}

fn decode_row(row: &[u8], symbologies: &[Symbology]) -> Vec<DecodedBarcode> {
    let mut found = Vec::new();
    let Some((first_dark, runs)) = row_runs(row) else {
        return found;
    };

    let want_ean13 = symbologies.contains(&Symbology::Ean13);
    let want_ean8 = symbologies.contains(&Symbology::Ean8);

    // symbols start on a bar; bars sit at every other run
    let mut start = if first_dark { 2 } else { 1 };
    while start < runs.len() {
        if want_ean13 {
            if let Some(payload) = decode_ean13_at(&runs, start) {
                found.push(DecodedBarcode { payload, symbology: Symbology::Ean13 });
                start += EAN13_RUNS + 1;
                continue;
            }
        }
        if want_ean8 {
            if let Some(payload) = decode_ean8_at(&runs, start) {
                found.push(DecodedBarcode { payload, symbology: Symbology::Ean8 });
                start += EAN8_RUNS + 1;
                continue;
            }
        }
        start += 2;
    }

    found
}

fn push_widths(modules: &mut Vec<bool>, widths: &[u32], starts_dark: bool) {
    let mut dark = starts_dark;
    for &width in widths {
        modules.extend(std::iter::repeat_n(dark, width as usize));
        dark = !dark;
    }
}

fn parse_digits(code: &str, len: usize) -> Option<Vec<usize>> {
    if code.len() != len || !is_valid_ean(code) {
        return None;
    }
    Some(code.bytes().map(|b| (b - b'0') as usize).collect())
}

/// Module sequence (`true` = bar) for an EAN-13 code with a valid check
/// digit. 95 modules, no quiet zone.
pub fn encode_ean13(code: &str) -> Option<Vec<bool>> {
    let digits = parse_digits(code, 13)?;
    let parity = FIRST_DIGIT_PARITY[digits[0]];

    let mut modules = Vec::with_capacity(95);
    push_widths(&mut modules, &GUARD, true);
    for (k, &digit) in digits[1..7].iter().enumerate() {
        let is_g = parity & (1 << (5 - k)) != 0;
        let widths = if is_g { reversed(&L_PATTERNS[digit]) } else { L_PATTERNS[digit] };
        push_widths(&mut modules, &widths, false);
    }
    push_widths(&mut modules, &MIDDLE_GUARD, false);
    for &digit in &digits[7..] {
        push_widths(&mut modules, &L_PATTERNS[digit], true);
    }
    push_widths(&mut modules, &GUARD, true);
    Some(modules)
}

/// Module sequence for an EAN-8 code with a valid check digit. 67 modules.
pub fn encode_ean8(code: &str) -> Option<Vec<bool>> {
    let digits = parse_digits(code, 8)?;

    let mut modules = Vec::with_capacity(67);
    push_widths(&mut modules, &GUARD, true);
    for &digit in &digits[..4] {
        push_widths(&mut modules, &L_PATTERNS[digit], false);
    }
    push_widths(&mut modules, &MIDDLE_GUARD, false);
    for &digit in &digits[4..] {
        push_widths(&mut modules, &L_PATTERNS[digit], true);
    }
    push_widths(&mut modules, &GUARD, true);
    Some(modules)
}

/// Draw modules as black bars on white, with `quiet_modules` of white on
/// each side and `margin` white rows above and below.
pub fn render_modules(
    modules: &[bool],
    module_px: u32,
    bar_height: u32,
    quiet_modules: u32,
    margin: u32,
) -> GrayImage {
    let module_px = module_px.max(1);
    let width = (modules.len() as u32 + 2 * quiet_modules) * module_px;
    let height = bar_height + 2 * margin;
    let mut img = GrayImage::from_pixel(width, height, Luma([255u8]));

    for (i, &bar) in modules.iter().enumerate() {
        if !bar {
            continue;
        }
        let x0 = (quiet_modules + i as u32) * module_px;
        for x in x0..x0 + module_px {
            for y in margin..margin + bar_height {
                img.put_pixel(x, y, Luma([0u8]));
            }
        }
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[Symbology] = &[Symbology::Ean13, Symbology::Ean8];

    fn ean13_image(code: &str, module_px: u32) -> DynamicImage {
        let modules = encode_ean13(code).unwrap();
        DynamicImage::ImageLuma8(render_modules(&modules, module_px, 60, 11, 10))
    }

    #[test]
    fn encoder_produces_expected_module_counts() {
        assert_eq!(encode_ean13("9780306406157").unwrap().len(), 95);
        assert_eq!(encode_ean8("96385074").unwrap().len(), 67);
        assert!(encode_ean13("9780306406158").is_none());
        assert!(encode_ean8("9638507").is_none());
    }

    #[test]
    fn encoder_starts_with_guard_and_first_l_digit() {
        let modules = encode_ean13("9780306406157").unwrap();
        let bits: String = modules[..10].iter().map(|&b| if b { '1' } else { '0' }).collect();
        // guard 101, then '7' as L-code 0111011
        assert_eq!(bits, "1010111011");
    }

    #[test]
    fn decodes_rendered_ean13() {
        let decoder = ScanlineDecoder::new();
        for code in ["9780306406157", "9789354352805", "5901234123457", "0012345678905"] {
            let found = decoder.decode(&ean13_image(code, 3), None);
            assert_eq!(found.len(), 1, "{code}");
            assert_eq!(found[0].payload, code);
            assert_eq!(found[0].symbology, Symbology::Ean13);
        }
    }

    #[test]
    fn decodes_with_one_pixel_modules() {
        let found = ScanlineDecoder::new().decode(&ean13_image("9780306406157", 1), Some(&[Symbology::Ean13]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, "9780306406157");
    }

    #[test]
    fn decodes_upside_down() {
        let img = ean13_image("9780306406157", 2).rotate180();
        let found = ScanlineDecoder::new().decode(&img, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, "9780306406157");
    }

    #[test]
    fn decodes_ean8_unless_restricted() {
        let modules = encode_ean8("96385074").unwrap();
        let img = DynamicImage::ImageLuma8(render_modules(&modules, 3, 50, 9, 5));
        let decoder = ScanlineDecoder::new();

        let found = decoder.decode(&img, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, "96385074");
        assert_eq!(found[0].symbology, Symbology::Ean8);

        assert!(decoder.decode(&img, Some(&[Symbology::Ean13])).is_empty());
    }

    #[test]
    fn blank_and_noise_rows_decode_nothing() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(300, 100, Luma([255])));
        assert!(ScanlineDecoder::new().decode(&blank, None).is_empty());

        let stripes = GrayImage::from_fn(300, 100, |x, _| Luma([if (x / 4) % 2 == 0 { 0 } else { 255 }]));
        assert!(ScanlineDecoder::new().decode(&DynamicImage::ImageLuma8(stripes), None).is_empty());
    }

    #[test]
    fn missing_quiet_zone_is_rejected() {
        let modules = encode_ean13("9780306406157").unwrap();
        let img = render_modules(&modules, 2, 40, 0, 0);
        assert!(ScanlineDecoder::new().decode_gray(&img, ALL).is_empty());
    }

    #[test]
    fn digit_patterns_are_distinct() {
        for (d, pattern) in L_PATTERNS.iter().enumerate() {
            assert_eq!(pattern.iter().sum::<u32>(), 7);
            assert_eq!(decode_digit(pattern, true), Some((d as u8, false)));
            assert_eq!(decode_digit(&reversed(pattern), true), Some((d as u8, true)));
        }
    }

    #[test]
    fn row_runs_alternate() {
        let (first_dark, runs) = row_runs(&[255, 255, 0, 0, 0, 255, 0]).unwrap();
        assert!(!first_dark);
        assert_eq!(runs, vec![2, 3, 1, 1]);
        assert!(row_runs(&[200, 210, 220]).is_none());
    }
}

mod common;

use common::*;
use std::thread;

fn pipeline_with(ocr: &CannedOcr) -> Pipeline {
    build_standard_pipeline(
        Box::new(ScanlineDecoder::new()),
        Some(Box::new(ocr.clone())),
        ScanConfig::default(),
    )
}

#[test]
fn barcode_alone_finds_isbn_without_ocr() {
    let ocr = CannedOcr::new("978-93-54352-80-5");
    let pipeline = pipeline_with(&ocr);

    let result = pipeline.run(&cover_with_barcode("9780306406157")).unwrap();

    assert_eq!(result.isbn().map(Isbn13::as_str), Some("9780306406157"));
    assert_eq!(ocr.call_count(), 0, "OCR must not run when the barcode decodes");
}

#[test]
fn ocr_text_is_used_when_no_barcode_decodes() {
    let ocr = CannedOcr::new("978 0 306 40615 7");
    let pipeline = pipeline_with(&ocr);

    let result = pipeline.run(&blank_cover()).unwrap();

    assert_eq!(result, ExtractionResult::Found("9780306406157".parse().unwrap()));
    assert_eq!(ocr.call_count(), 1);
}

#[test]
fn isbn10_in_ocr_text_is_converted() {
    let ocr = CannedOcr::new("ISBN 0-306-40615-2\nPrinted in Great Britain");
    let result = pipeline_with(&ocr).run(&blank_cover()).unwrap();
    assert_eq!(result.isbn().map(Isbn13::as_str), Some("9780306406157"));
}

#[test]
fn blank_image_is_not_found() {
    let ocr = CannedOcr::new("");
    let result = pipeline_with(&ocr).run(&blank_cover()).unwrap();
    assert_eq!(result, ExtractionResult::NotFound);
    assert_eq!(ocr.call_count(), 1);
}

#[test]
fn blank_image_without_ocr_is_not_found() {
    let pipeline = build_standard_pipeline(Box::new(ScanlineDecoder::new()), None, ScanConfig::default());
    assert_eq!(pipeline.run(&blank_cover()).unwrap(), ExtractionResult::NotFound);
}

#[test]
fn non_book_barcode_falls_back_to_ocr() {
    let ocr = CannedOcr::new("ISBN 978-93-54352-80-5");
    let pipeline = pipeline_with(&ocr);

    let result = pipeline.run(&cover_with_barcode("5901234123457")).unwrap();

    assert_eq!(result.isbn().map(Isbn13::as_str), Some("9789354352805"));
    assert_eq!(ocr.call_count(), 1);
}

#[test]
fn ocr_misread_is_not_a_false_positive() {
    let ocr = CannedOcr::new("ISBN 978-0-306-40615-8");
    let result = pipeline_with(&ocr).run(&blank_cover()).unwrap();
    assert_eq!(result, ExtractionResult::NotFound);
}

#[test]
fn extract_from_png_file() {
    let file = save_temp_png(&cover_with_barcode("9789354352805"));
    let ocr = CannedOcr::new("");

    let result = pipeline_with(&ocr).extract_from_path(file.path()).unwrap();

    assert_eq!(result.isbn().map(Isbn13::as_str), Some("9789354352805"));
}

#[test]
fn extract_from_encoded_bytes() {
    let file = save_temp_png(&cover_with_barcode("9780306406157"));
    let bytes = std::fs::read(file.path()).unwrap();
    let ocr = CannedOcr::new("");

    let result = pipeline_with(&ocr).extract_from_bytes(&bytes).unwrap();
    assert!(result.is_found());
}

#[test]
fn unreadable_image_is_a_load_error_not_not_found() {
    let ocr = CannedOcr::new("978 0 306 40615 7");
    let pipeline = pipeline_with(&ocr);

    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("cover.png");
    std::fs::write(&bogus, b"this is not a png").unwrap();

    let err = pipeline.extract_from_path(&bogus).unwrap_err();
    assert!(err.is_load_error(), "unexpected error: {err}");
    assert!(matches!(err, ScanError::Open { .. }));
    assert_eq!(ocr.call_count(), 0);

    let err = pipeline.extract_from_bytes(&[0u8; 16]).unwrap_err();
    assert!(matches!(err, ScanError::Load(_)));
}

#[test]
fn ocr_on_crop_still_finds_text() {
    let ocr = CannedOcr::new("978 0 306 40615 7");
    let pipeline = build_standard_pipeline(
        Box::new(ScanlineDecoder::new()),
        Some(Box::new(ocr.clone())),
        ScanConfig::default().with_ocr_target(OcrTarget::Crop),
    );
    assert!(pipeline.run(&blank_cover()).unwrap().is_found());
}

#[test]
fn one_pipeline_serves_parallel_calls() {
    let ocr = CannedOcr::new("");
    let pipeline = pipeline_with(&ocr);
    let codes = ["9780306406157", "9789354352805", "9791032305690"];

    thread::scope(|scope| {
        let handles: Vec<_> = codes
            .iter()
            .map(|code| {
                let pipeline = &pipeline;
                scope.spawn(move || pipeline.run(&cover_with_barcode(code)).unwrap())
            })
            .collect();

        for (handle, code) in handles.into_iter().zip(codes) {
            let result = handle.join().unwrap();
            assert_eq!(result.isbn().map(Isbn13::as_str), Some(code));
        }
    });
}

#[test]
fn debug_mode_writes_intermediate_images() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("debug");
    let ocr = CannedOcr::new("");
    let pipeline = pipeline_with(&ocr).with_debug(out.clone()).unwrap();

    pipeline.run(&blank_cover()).unwrap();

    for stage_file in [
        "00_input/01.png",
        "barcode_cascade/raw.png",
        "barcode_cascade/grayscale.png",
        "barcode_cascade/threshold.png",
        "ocr_fallback/crop.png",
        "ocr_fallback/ocr_input.png",
    ] {
        assert!(out.join(stage_file).exists(), "missing {stage_file}");
    }
}

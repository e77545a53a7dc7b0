use std::path::PathBuf;

use plateocr::{PlateOCRBuilder, ScanOptions};

// Needs the real model artifacts, which are not checked in. Fetch a plate
// detection and recognition export into tests/data/models and run with
// `cargo test -- --ignored`.
#[test]
#[ignore = "requires ONNX model artifacts under tests/data/models"]
fn engine_reads_plates_from_fixture_image() {
    let _ = env_logger::builder().is_test(true).try_init();

    let image = image::open("tests/data/car.jpg").expect("Failed to load test image");
    let cache = PathBuf::from(std::env!("CARGO_TARGET_TMPDIR")).join(".engine_cache");
    std::fs::create_dir_all(&cache).expect("Failed to create cache dir");

    let engine = PlateOCRBuilder::new()
        .det_model("tests/data/models/plate_det.onnx")
        .rec_model(
            "tests/data/models/plate_rec.onnx",
            "tests/data/models/plate_keys.txt",
        )
        .with_engine_cache_path(cache)
        .build()
        .expect("Failed to build engine");

    let scans = engine
        .read_plates(&image, ScanOptions::default())
        .expect("Failed to scan image");

    assert!(!scans.is_empty());
    log::debug!("{scans:#?}");
    assert!(scans
        .iter()
        .any(|scan| scan.reading.text.chars().any(|c| c.is_ascii_alphanumeric())));
}

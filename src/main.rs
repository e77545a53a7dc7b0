use std::path::PathBuf;

use plateocr::{PlateOCRBuilder, ScanOptions};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn main() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let input_dir = PathBuf::from(args.next().unwrap_or_else(|| "images".into()));
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "batch_results".into()));

    let engine = PlateOCRBuilder::new()
        .det_model("models/plate_det.onnx")
        .rec_model("models/plate_rec.onnx", "models/plate_keys.txt")
        .build()
        .expect("Failed to build engine");

    let entries = engine
        .process_directory(&input_dir, &output_dir, ScanOptions::default())
        .expect("Batch processing failed");

    println!("Processed {} images", entries.len());
    for entry in &entries {
        println!("{}: {} plates", entry.filename, entry.detected_plates);
        for plate in &entry.plates {
            println!(
                "  - '{}' (confidence: {:.2})",
                plate.recognized_text, plate.ocr_confidence
            );
        }
    }
}

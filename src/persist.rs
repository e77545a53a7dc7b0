//! JSON and file-system persistence of pipeline results.
//!
//! One timestamped directory per processed image holds the cropped plates
//! and a `results.json` record; a directory run additionally writes a
//! `batch_summary.json` across all images.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::OcrError, PlateReading};

/// Persisted record for one processed source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    pub input_image: String,
    pub timestamp: String,
    pub detected_plates: usize,
    pub plates: Vec<PlateReading>,
}

/// Condensed per-plate line of the batch summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPlate {
    pub recognized_text: String,
    pub detection_confidence: f32,
    pub ocr_confidence: f32,
}

/// One image's entry in the batch summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub filename: String,
    pub detected_plates: usize,
    pub plates: Vec<SummaryPlate>,
}

impl BatchEntry {
    pub fn from_report(filename: impl Into<String>, report: &ImageReport) -> Self {
        BatchEntry {
            filename: filename.into(),
            detected_plates: report.detected_plates,
            plates: report
                .plates
                .iter()
                .map(|plate| SummaryPlate {
                    recognized_text: plate.recognized_text.clone(),
                    detection_confidence: plate.detection_confidence,
                    ocr_confidence: plate.ocr_confidence,
                })
                .collect(),
        }
    }
}

pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Creates `base/<prefix>_<timestamp>` and returns it.
pub fn create_result_dir(base: &Path, prefix: &str) -> Result<PathBuf, OcrError> {
    let dir = base.join(format!("{prefix}_{}", timestamp()));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Writes one cropped plate as `plate_<id>_<confidence>.png` under `dir`.
pub fn save_crop(
    crop: &DynamicImage,
    dir: &Path,
    plate_id: usize,
    confidence: f32,
) -> Result<PathBuf, OcrError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("plate_{plate_id}_{confidence:.2}.png"));
    crop.save(&path).map_err(OcrError::ImageSave)?;
    debug!(path = %path.display(), "saved plate crop");
    Ok(path)
}

/// Writes `results.json` for one image into `dir`.
pub fn write_report(report: &ImageReport, dir: &Path) -> Result<PathBuf, OcrError> {
    let path = dir.join("results.json");
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    debug!(path = %path.display(), "wrote image report");
    Ok(path)
}

/// Writes `batch_summary.json` across a directory run into `dir`.
pub fn write_batch_summary(entries: &[BatchEntry], dir: &Path) -> Result<PathBuf, OcrError> {
    let path = dir.join("batch_summary.json");
    fs::write(&path, serde_json::to_string_pretty(entries)?)?;
    debug!(path = %path.display(), entries = entries.len(), "wrote batch summary");
    Ok(path)
}

use std::path::PathBuf;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned detection box in source image pixels.
///
/// Invariant: `x1 < x2` and `y1 < y2` inside the image. A box that violates
/// this crops to zero area and the plate is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub confidence: f32,
}

impl PlateBox {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }
}

/// One raw recognition result from the OCR engine, before normalization.
#[derive(Debug, Clone)]
pub struct TextFragment {
    pub text: String,
    pub confidence: f32,
}

/// A fragment whose text survived canonicalization.
///
/// `text` holds the canonical uppercase alphanumeric form, `original_text`
/// the raw engine output it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub confidence: f32,
    pub original_text: String,
}

/// A candidate with its heuristic ranking score attached.
///
/// The score is unbounded and only meaningful within one reconciliation
/// call; it is never persisted and never reported as a confidence.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub text: String,
    pub confidence: f32,
    pub score: f32,
    pub original_text: String,
}

/// The single reading chosen for a plate crop.
///
/// `confidence` is the winning candidate's OCR confidence, not its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestReading {
    pub text: String,
    pub confidence: f32,
}

impl BestReading {
    /// The terminal result for an unreadable plate or an empty candidate pool.
    pub fn empty() -> Self {
        BestReading {
            text: String::new(),
            confidence: 0.0,
        }
    }
}

/// In-memory outcome for one detection: the box, its crop, and the
/// reconciled reading.
#[derive(Debug, Clone)]
pub struct PlateScan {
    pub bbox: PlateBox,
    pub crop: DynamicImage,
    pub reading: BestReading,
}

/// Serialized per-plate record, one entry of an image report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateReading {
    pub plate_id: usize,
    pub detection_confidence: f32,
    pub bbox: (u32, u32, u32, u32),
    pub recognized_text: String,
    pub ocr_confidence: f32,
    pub cropped_image_path: Option<PathBuf>,
}

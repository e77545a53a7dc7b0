//! Plate localization over a pretrained single-class detection model.
//!
//! The model is an opaque ONNX artifact with the usual YOLO-style export
//! surface: a square RGB input and a `(1, N, 6)` prediction tensor of
//! `(cx, cy, w, h, objectness, class)` rows in input-pixel coordinates.
//! Nothing here trains or tunes; this module only feeds the model and
//! decodes its output into [`PlateBox`] values.

use std::path::PathBuf;

use image::{imageops::FilterType, DynamicImage};
use ndarray::{ArrayView2, Axis};
use ort::{inputs, Session};
use tracing::instrument;

use crate::util::{build_session, to_unit_tensor};
use crate::{error::OcrError, ExecutionProvider, PlateBox};

/// Side length of the detection model's square input.
const INPUT_SIZE: u32 = 640;

pub struct PlateDetector {
    session: Session,
}

impl PlateDetector {
    #[instrument(level = "debug", skip(execution_providers, cache_path))]
    pub fn init(
        path: PathBuf,
        num_threads: usize,
        execution_providers: &[ExecutionProvider],
        cache_path: Option<PathBuf>,
    ) -> Result<Self, OcrError> {
        let session = build_session(&path, num_threads, execution_providers, cache_path)?;
        log::debug!("detector inputs: {:?}", session.inputs);
        log::debug!("detector outputs: {:?}", session.outputs);
        Ok(Self { session })
    }

    /// Runs detection and returns plate boxes in source-image pixels,
    /// confidence-filtered and de-duplicated with greedy IoU suppression.
    #[instrument(skip(self, image), level = "debug")]
    pub fn detect_plates(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<PlateBox>, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::invalid_input("empty source image"));
        }

        let resized = image.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let tensor = to_unit_tensor(&resized).insert_axis(Axis(0));

        let outputs = self.session.run(inputs!["images" => tensor]?)?;
        let pred = outputs
            .first_key_value()
            .ok_or_else(|| OcrError::invalid_input("detection model produced no outputs"))?
            .1
            .try_extract_tensor::<f32>()?;

        if pred.ndim() != 3 || pred.len_of(Axis(2)) < 6 {
            return Err(OcrError::invalid_input(format!(
                "unexpected detection output shape {:?}",
                pred.shape()
            )));
        }

        let rows = pred.len_of(Axis(1));
        let cols = pred.len_of(Axis(2));
        let pred = pred.to_owned().remove_axis(Axis(0));
        let pred = pred.to_shape((rows, cols))?;

        let scale_x = image.width() as f32 / INPUT_SIZE as f32;
        let scale_y = image.height() as f32 / INPUT_SIZE as f32;
        let raw = parse_predictions(
            pred.view(),
            (scale_x, scale_y),
            (image.width(), image.height()),
            confidence_threshold,
        );

        Ok(non_max_suppression(raw, iou_threshold))
    }
}

/// Decodes prediction rows into image-space boxes, dropping rows below the
/// confidence threshold. Row confidence is objectness times class score.
fn parse_predictions(
    pred: ArrayView2<f32>,
    (scale_x, scale_y): (f32, f32),
    (image_width, image_height): (u32, u32),
    confidence_threshold: f32,
) -> Vec<PlateBox> {
    pred.outer_iter()
        .filter_map(|row| {
            let confidence = row[4] * row[5];
            if confidence < confidence_threshold {
                return None;
            }
            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            let x1 = ((cx - w / 2.0) * scale_x).max(0.0) as u32;
            let y1 = ((cy - h / 2.0) * scale_y).max(0.0) as u32;
            let x2 = (((cx + w / 2.0) * scale_x) as u32).min(image_width);
            let y2 = (((cy + h / 2.0) * scale_y) as u32).min(image_height);
            Some(PlateBox {
                x1,
                y1,
                x2,
                y2,
                confidence,
            })
        })
        .collect()
}

/// Greedy non-maximum suppression: keep the highest-confidence box, drop
/// everything overlapping it past the IoU threshold, repeat.
fn non_max_suppression(mut boxes: Vec<PlateBox>, iou_threshold: f32) -> Vec<PlateBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<PlateBox> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| iou(kept, &candidate) < iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &PlateBox, b: &PlateBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = if x2 > x1 && y2 > y1 {
        ((x2 - x1) * (y2 - y1)) as f32
    } else {
        0.0
    };

    let area_a = (a.width() * a.height()) as f32;
    let area_b = (b.width() * b.height()) as f32;
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

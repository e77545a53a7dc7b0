//! License plate localization and reading.
//!
//! Two pretrained ONNX models carry the intelligence: a detector locates
//! plates, a recognizer reads crops. The code here is coordination: crop
//! extraction, binarization before a second recognition pass, text
//! canonicalization, and a scoring heuristic that reconciles the two
//! passes into one reading per plate.

use std::path::{Path, PathBuf};

use detector::PlateDetector;
use image::DynamicImage;
use reader::TextReader;
use tracing::instrument;

pub mod detector;
mod error;
pub mod normalize;
pub mod persist;
pub mod preprocess;
pub mod reader;
pub mod reconcile;
mod result;
pub mod score;
mod util;

pub use error::OcrError;
pub use result::*;

pub use ort as runtime;

pub struct PlateOCRBuilder {
    threads: usize,
    det_path: Option<PathBuf>,
    rec_paths: Option<(PathBuf, PathBuf)>,
    cache_path: Option<PathBuf>,
    execution_providers: Vec<ExecutionProvider>,
}

impl PlateOCRBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn det_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.det_path = Some(path.into());
        self
    }

    pub fn rec_model(
        mut self,
        model_path: impl Into<PathBuf>,
        keys_path: impl Into<PathBuf>,
    ) -> Self {
        self.rec_paths = Some((model_path.into(), keys_path.into()));
        self
    }

    pub fn with_engine_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_execution_providers(
        mut self,
        providers: impl IntoIterator<Item = ExecutionProvider>,
    ) -> Self {
        self.execution_providers = providers.into_iter().collect();
        self
    }

    /// Loads both model artifacts. This is the expensive step; it runs once
    /// per process and the resulting engine has no teardown.
    #[instrument(skip(self))]
    pub fn build(mut self) -> Result<PlateOCR, OcrError> {
        let det_path = self
            .det_path
            .take()
            .unwrap_or_else(|| "models/plate_det.onnx".into());
        let (rec_path, keys_path) = self.rec_paths.take().unwrap_or_else(|| {
            (
                "models/plate_rec.onnx".into(),
                "models/plate_keys.txt".into(),
            )
        });

        let detector = PlateDetector::init(
            det_path,
            self.threads,
            &self.execution_providers,
            self.cache_path.clone(),
        )?;
        let reader = TextReader::init(
            rec_path,
            keys_path,
            self.threads,
            &self.execution_providers,
            self.cache_path.clone(),
        )?;

        Ok(PlateOCR { detector, reader })
    }
}

impl Default for PlateOCRBuilder {
    fn default() -> Self {
        Self {
            threads: 4,
            det_path: None,
            rec_paths: None,
            cache_path: None,
            execution_providers: DEFAULT_PROVIDERS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Minimum detection confidence for a plate box.
    pub confidence_threshold: f32,
    /// IoU threshold for suppressing overlapping detections.
    pub iou_threshold: f32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.05,
            iou_threshold: 0.4,
        }
    }
}

pub struct PlateOCR {
    detector: PlateDetector,
    reader: TextReader,
}

impl PlateOCR {
    /// Locates every plate in the image and reads each one.
    ///
    /// A detection whose box crops to zero area is skipped; a crop the
    /// recognizer cannot read yields the empty reading, not an error.
    #[instrument(skip(self, image))]
    pub fn read_plates(
        &self,
        image: &DynamicImage,
        options: ScanOptions,
    ) -> Result<Vec<PlateScan>, OcrError> {
        let boxes = self.detector.detect_plates(
            image,
            options.confidence_threshold,
            options.iou_threshold,
        )?;
        tracing::debug!(count = boxes.len(), "plates detected");

        let mut scans = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            let Some(crop) = util::crop_box(image, &bbox) else {
                continue;
            };
            let reading = self.read_crop(&crop)?;
            scans.push(PlateScan {
                bbox,
                crop,
                reading,
            });
        }
        Ok(scans)
    }

    /// Runs recognition on the raw crop and on its binarized variant, then
    /// reconciles the two candidate pools into one reading.
    #[instrument(skip(self, crop))]
    pub fn read_crop(&self, crop: &DynamicImage) -> Result<BestReading, OcrError> {
        let processed = DynamicImage::ImageLuma8(preprocess::binarize_plate(crop));

        let original_fragments = self.reader.read_text(crop)?;
        let processed_fragments = self.reader.read_text(&processed)?;

        let original = normalize::normalize_fragments(&original_fragments);
        let processed = normalize::normalize_fragments(&processed_fragments);

        Ok(reconcile::select_best(&original, &processed))
    }

    /// Processes one source image and, when `save_intermediates` is set,
    /// persists crops and a `results.json` under a timestamped directory
    /// inside `output_dir`.
    pub fn process_image(
        &self,
        path: &Path,
        output_dir: &Path,
        save_intermediates: bool,
        options: ScanOptions,
    ) -> Result<persist::ImageReport, OcrError> {
        let image = image::open(path).map_err(OcrError::ImageLoad)?;
        let scans = self.read_plates(&image, options)?;

        let result_dir = if save_intermediates {
            Some(persist::create_result_dir(output_dir, "result")?)
        } else {
            None
        };

        let mut plates = Vec::with_capacity(scans.len());
        for (plate_id, scan) in scans.iter().enumerate() {
            let cropped_image_path = match &result_dir {
                Some(dir) => Some(persist::save_crop(
                    &scan.crop,
                    &dir.join("detected_plates"),
                    plate_id,
                    scan.bbox.confidence,
                )?),
                None => None,
            };
            tracing::info!(
                plate_id,
                text = %scan.reading.text,
                confidence = scan.reading.confidence,
                "plate read"
            );
            plates.push(PlateReading {
                plate_id,
                detection_confidence: scan.bbox.confidence,
                bbox: (scan.bbox.x1, scan.bbox.y1, scan.bbox.x2, scan.bbox.y2),
                recognized_text: scan.reading.text.clone(),
                ocr_confidence: scan.reading.confidence,
                cropped_image_path,
            });
        }

        let report = persist::ImageReport {
            input_image: path.display().to_string(),
            timestamp: persist::timestamp(),
            detected_plates: plates.len(),
            plates,
        };
        if let Some(dir) = &result_dir {
            persist::write_report(&report, dir)?;
        }
        Ok(report)
    }

    /// Processes every image file in `input_dir` sequentially and writes a
    /// batch summary.
    ///
    /// Images are isolated from each other: one failure is logged and
    /// skipped, never aborting the siblings or the summary write.
    #[instrument(skip(self))]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        options: ScanOptions,
    ) -> Result<Vec<persist::BatchEntry>, OcrError> {
        let batch_dir = persist::create_result_dir(output_dir, "batch")?;

        let mut paths: Vec<PathBuf> = std::fs::read_dir(input_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_image_file(path))
            .collect();
        paths.sort();

        let mut entries = Vec::new();
        for path in paths {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::info!(file = %filename, "processing image");
            match self.process_image(&path, &batch_dir, true, options) {
                Ok(report) => entries.push(persist::BatchEntry::from_report(filename, &report)),
                Err(error) => {
                    tracing::warn!(file = %filename, error = %error, "failed to process image");
                }
            }
        }

        persist::write_batch_summary(&entries, &batch_dir)?;
        Ok(entries)
    }
}

fn is_image_file(path: &Path) -> bool {
    const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff"];
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Default,
    #[cfg(feature = "tensorrt")]
    TensorRT,
    #[cfg(feature = "coreml")]
    CoreML,
    #[cfg(feature = "cuda")]
    Cuda,
    #[cfg(feature = "directml")]
    DirectML,
}

const DEFAULT_PROVIDERS: &[ExecutionProvider] = &[
    #[cfg(feature = "tensorrt")]
    ExecutionProvider::TensorRT,
    #[cfg(feature = "coreml")]
    ExecutionProvider::CoreML,
    #[cfg(feature = "directml")]
    ExecutionProvider::DirectML,
    #[cfg(feature = "cuda")]
    ExecutionProvider::Cuda,
    ExecutionProvider::Default,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_file_filter_accepts_known_extensions_case_insensitively() {
        assert!(is_image_file(Path::new("cars/front.jpg")));
        assert!(is_image_file(Path::new("cars/FRONT.JPEG")));
        assert!(is_image_file(Path::new("cars/side.PNG")));
        assert!(is_image_file(Path::new("scan.tiff")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("archive.jpg.zip")));
        assert!(!is_image_file(Path::new("no_extension")));
    }

    #[test]
    fn scan_options_defaults() {
        let options = ScanOptions::default();
        assert_eq!(options.confidence_threshold, 0.05);
        assert_eq!(options.iou_threshold, 0.4);
    }
}

//! Text recognition over a pretrained CTC recognition model.
//!
//! Like the detector, the model is consumed as an opaque artifact: a
//! fixed-height RGB input and a `(1, T, K)` per-timestep character
//! distribution, decoded greedily against the charset file loaded at init.

use std::path::PathBuf;

use float_ord::FloatOrd;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{ArrayView2, Axis};
use ort::{inputs, Session};
use tracing::instrument;

use crate::util::{build_session, subtract_mean_normalize};
use crate::{error::OcrError, ExecutionProvider, TextFragment};

const DEST_HEIGHT: u32 = 48;

const MEAN_VALUES: [f32; 3] = [0.5, 0.5, 0.5];
const NORM_VALUES: [f32; 3] = [2.0, 2.0, 2.0];

pub struct TextReader {
    session: Session,
    keys: Vec<String>,
}

impl TextReader {
    #[instrument(level = "debug", skip(execution_providers, cache_path))]
    pub fn init(
        model_path: PathBuf,
        keys_path: PathBuf,
        num_threads: usize,
        execution_providers: &[ExecutionProvider],
        cache_path: Option<PathBuf>,
    ) -> Result<Self, OcrError> {
        let session = build_session(&model_path, num_threads, execution_providers, cache_path)?;

        let keys = std::fs::read_to_string(&keys_path)?;
        let keys = keys.lines().map(|line| line.to_string());
        // Index 0 is the CTC blank; the model emits a trailing space class.
        let keys = ["#".to_string()]
            .into_iter()
            .chain(keys)
            .chain([" ".to_string()])
            .collect::<Vec<_>>();

        log::debug!("reader inputs: {:?}", session.inputs);
        log::debug!("reader outputs: {:?}", session.outputs);

        Ok(Self { session, keys })
    }

    /// Recognizes text in one plate crop variant.
    ///
    /// Returns at most one fragment per call; an empty vec means the model
    /// decoded nothing, which is a valid outcome for an unreadable plate.
    #[instrument(level = "debug", skip(self, image))]
    pub fn read_text(&self, image: &DynamicImage) -> Result<Vec<TextFragment>, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let scale = DEST_HEIGHT as f32 / image.height() as f32;
        let dest_width = ((image.width() as f32 * scale) as u32)
            .clamp(1, u32::from(u16::MAX));
        let image = image.resize_exact(dest_width, DEST_HEIGHT, FilterType::Nearest);

        let tensor_values =
            subtract_mean_normalize(&image, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => tensor_values]?)?;
        let output_tensor = outputs
            .first_key_value()
            .ok_or_else(|| OcrError::invalid_input("recognition model produced no outputs"))?
            .1
            .try_extract_tensor::<f32>()?;

        let timesteps = output_tensor.len_of(Axis(1));
        let output = output_tensor.to_owned().remove_axis(Axis(0));
        let output = output.to_shape((timesteps, self.keys.len()))?;

        Ok(decode_ctc(&self.keys, output.view()).into_iter().collect())
    }
}

/// Greedy CTC decode: argmax per timestep, collapsing blanks (index 0) and
/// immediate repeats. The fragment confidence is the mean probability of
/// the emitted characters; `None` when nothing is emitted.
fn decode_ctc(keys: &[String], data: ArrayView2<f32>) -> Option<TextFragment> {
    let mut text = String::new();
    let mut scores = Vec::new();
    let mut prev_index = 0;

    for row in data.outer_iter() {
        let (index, score) = row
            .indexed_iter()
            .max_by_key(|(_, value)| FloatOrd(**value))
            .map(|(i, value)| (i, *value))?;

        if index > 0 && index != prev_index && index < keys.len() {
            text.push_str(&keys[index]);
            scores.push(score);
        }
        prev_index = index;
    }

    if text.is_empty() {
        return None;
    }

    let confidence = scores.iter().sum::<f32>() / scores.len() as f32;
    Some(TextFragment { text, confidence })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn keys() -> Vec<String> {
        ["#", "0", "1", "2", "A", "B", " "]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn one_hot(rows: &[(usize, f32)], vocab: usize) -> Array2<f32> {
        let mut data = Array2::from_elem((rows.len(), vocab), 0.01);
        for (t, (index, score)) in rows.iter().enumerate() {
            data[[t, *index]] = *score;
        }
        data
    }

    #[test]
    fn decodes_characters_in_order() {
        let keys = keys();
        // blank, A, B, 1, blank
        let data = one_hot(&[(0, 0.9), (4, 0.8), (5, 0.6), (2, 0.9), (0, 0.9)], keys.len());
        let fragment = decode_ctc(&keys, data.view()).unwrap();
        assert_eq!(fragment.text, "AB1");
        assert!((fragment.confidence - (0.8 + 0.6 + 0.9) / 3.0).abs() < 1e-6);
    }

    #[test]
    fn collapses_repeats_unless_separated_by_blank() {
        let keys = keys();
        // A A blank A -> "AA"
        let data = one_hot(&[(4, 0.9), (4, 0.9), (0, 0.9), (4, 0.9)], keys.len());
        let fragment = decode_ctc(&keys, data.view()).unwrap();
        assert_eq!(fragment.text, "AA");
    }

    #[test]
    fn all_blank_output_decodes_to_nothing() {
        let keys = keys();
        let data = one_hot(&[(0, 0.9), (0, 0.9), (0, 0.9)], keys.len());
        assert!(decode_ctc(&keys, data.view()).is_none());
    }
}

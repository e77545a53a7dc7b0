//! Heuristic ranking of normalized candidates.
//!
//! The score starts from the OCR confidence and applies additive,
//! confidence-independent adjustments for plate-like text shapes. It is not
//! a validated plate grammar; jurisdictions differ and false positives are
//! expected. Scores rank candidates within one reconciliation call only.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Candidate, ScoredCandidate};

/// Pure alphanumeric string of plausible plate length.
static ALNUM_PLATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{5,8}$").unwrap());

/// Letter block, digit block, optional trailing letter.
static BLOCK_PLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,3}[0-9]{2,4}[A-Z]?$").unwrap());

const ALNUM_BONUS: f32 = 0.2;
const BLOCK_BONUS: f32 = 0.3;
const LENGTH_PENALTY: f32 = 0.1;

/// Scores a candidate. All rules apply independently; the two format
/// bonuses are cumulative, and the result is neither clamped nor bounded.
pub fn score_candidate(candidate: &Candidate) -> ScoredCandidate {
    let text = candidate.text.as_str();
    let mut score = candidate.confidence;

    if ALNUM_PLATE.is_match(text) {
        score += ALNUM_BONUS;
    }
    if BLOCK_PLATE.is_match(text) {
        score += BLOCK_BONUS;
    }
    let len = text.chars().count();
    if len < 4 || len > 10 {
        score -= LENGTH_PENALTY;
    }

    ScoredCandidate {
        text: candidate.text.clone(),
        confidence: candidate.confidence,
        score,
        original_text: candidate.original_text.clone(),
    }
}

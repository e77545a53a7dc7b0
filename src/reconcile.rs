//! Selection of the single best reading across the two OCR variants.

use crate::score::score_candidate;
use crate::{BestReading, Candidate, ScoredCandidate};

/// Scores the concatenated candidate pool, original variant first.
///
/// Pool order matters: [`select_best`] breaks score ties by first
/// occurrence, so candidates from the original image win ties against the
/// preprocessed variant.
pub fn score_pool(original: &[Candidate], processed: &[Candidate]) -> Vec<ScoredCandidate> {
    original
        .iter()
        .chain(processed.iter())
        .map(score_candidate)
        .collect()
}

/// Picks the single best reading from both OCR variants.
///
/// A linear max-scan keeps the first candidate achieving the maximum score;
/// a later candidate with an equal score never displaces the incumbent. An
/// empty pool is a valid terminal outcome and yields the empty reading. The
/// returned confidence is the winner's OCR confidence, not its score.
pub fn select_best(original: &[Candidate], processed: &[Candidate]) -> BestReading {
    let mut best: Option<ScoredCandidate> = None;
    for scored in score_pool(original, processed) {
        match &best {
            Some(incumbent) if scored.score <= incumbent.score => {}
            _ => best = Some(scored),
        }
    }

    match best {
        Some(winner) => BestReading {
            text: winner.text,
            confidence: winner.confidence,
        },
        None => BestReading::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, confidence: f32) -> Candidate {
        Candidate {
            text: text.into(),
            confidence,
            original_text: text.into(),
        }
    }

    #[test]
    fn empty_pools_yield_empty_reading() {
        let best = select_best(&[], &[]);
        assert_eq!(best, BestReading::empty());
        assert_eq!(best.text, "");
        assert_eq!(best.confidence, 0.0);
    }

    #[test]
    fn highest_score_wins_and_keeps_its_own_confidence() {
        let original = vec![candidate("ABC123", 0.5), candidate("AB1234", 0.6)];
        let processed = vec![candidate("XYZ999", 0.95)];

        let best = select_best(&original, &processed);
        assert_eq!(best.text, "XYZ999");
        // OCR confidence, never the heuristic score.
        assert_eq!(best.confidence, 0.95);
    }

    #[test]
    fn winner_can_come_from_either_variant() {
        let original = vec![candidate("AB", 0.2)];
        let processed = vec![candidate("CD5678", 0.3)];
        assert_eq!(select_best(&original, &processed).text, "CD5678");

        let original = vec![candidate("CD5678", 0.3)];
        let processed = vec![candidate("AB", 0.2)];
        assert_eq!(select_best(&original, &processed).text, "CD5678");
    }

    #[test]
    fn ties_resolve_to_first_occurrence_in_pool_order() {
        // Same text and confidence in both variants: identical scores.
        let mut first = candidate("AB1234", 0.5);
        first.original_text = "from original".into();
        let mut second = candidate("AB1234", 0.5);
        second.original_text = "from processed".into();

        let pool = score_pool(&[first.clone()], &[second.clone()]);
        assert_eq!(pool[0].score, pool[1].score);
        assert_eq!(pool[0].original_text, "from original");

        let best = select_best(&[first], &[second]);
        assert_eq!(best.text, "AB1234");
        assert_eq!(best.confidence, 0.5);
    }

    #[test]
    fn equal_score_within_one_variant_keeps_earlier_candidate() {
        // Different texts, same score shape: the scan must not replace the
        // incumbent on equality.
        let original = vec![candidate("AB1234", 0.5), candidate("CD5678", 0.5)];
        let best = select_best(&original, &[]);
        assert_eq!(best.text, "AB1234");
    }

    #[test]
    fn scoring_does_not_blend_confidences() {
        let original = vec![candidate("AB1234", 0.7)];
        let processed = vec![candidate("AB124", 0.6)];
        let best = select_best(&original, &processed);
        assert_eq!(best.text, "AB1234");
        assert_eq!(best.confidence, 0.7);
    }
}

//! Canonicalization of raw OCR text for scoring and comparison.

use crate::{Candidate, TextFragment};

/// Character confusion pairs (letter, digit) common in plate OCR output.
///
/// Documents the ambiguity only: [`canonical_text`] applies no substitution.
/// Turning these into a real correction pass changes recognized readings and
/// every scoring outcome downstream, so it must not happen silently.
pub const HOMOGLYPH_PAIRS: &[(char, char)] =
    &[('O', '0'), ('I', '1'), ('S', '5'), ('B', '8')];

/// Maps raw OCR text to canonical form: uppercased, stripped of everything
/// that is not an ASCII letter, digit, or whitespace, with whitespace runs
/// collapsed to single spaces and the ends trimmed.
///
/// Idempotent: normalizing an already-canonical string returns it unchanged.
pub fn canonical_text(raw: &str) -> String {
    let kept: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalizes one OCR variant's fragments, dropping any whose text is
/// empty after cleaning.
pub fn normalize_fragments(fragments: &[TextFragment]) -> Vec<Candidate> {
    fragments
        .iter()
        .filter_map(|fragment| {
            let text = canonical_text(&fragment.text);
            if text.is_empty() {
                None
            } else {
                Some(Candidate {
                    text,
                    confidence: fragment.confidence,
                    original_text: fragment.text.clone(),
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercases_and_strips_punctuation() {
        assert_eq!(canonical_text("ab-12.c!"), "AB12C");
    }

    #[test]
    fn collapses_and_trims_whitespace() {
        assert_eq!(canonical_text("  AB \t 12 \n 34  "), "AB 12 34");
    }

    #[test]
    fn drops_non_ascii_letters() {
        // Cyrillic З looks like a digit 3 to OCR but is not ASCII.
        assert_eq!(canonical_text("AB12З4"), "AB124");
    }

    #[test]
    fn idempotent() {
        let inputs = ["ab-12.c!", "  AB \t 12 ", "AB1234", "", "©®™"];
        for input in inputs {
            let once = canonical_text(input);
            assert_eq!(canonical_text(&once), once);
        }
    }

    #[test]
    fn output_charset_is_uppercase_alnum_and_single_spaces() {
        let out = canonical_text("a b\t\tc1 -- 2\u{00e9}");
        assert!(out
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == ' '));
        assert!(!out.starts_with(' '));
        assert!(!out.ends_with(' '));
        assert!(!out.contains("  "));
    }

    #[test]
    fn homoglyphs_pass_through_unchanged() {
        // The confusion table exists but no substitution is applied.
        assert_eq!(canonical_text("OISB"), "OISB");
        assert!(HOMOGLYPH_PAIRS.iter().any(|(c, _)| *c == 'O'));
    }

    #[test]
    fn empty_fragments_are_dropped() {
        let fragments = vec![
            TextFragment {
                text: "..!".into(),
                confidence: 0.9,
            },
            TextFragment {
                text: "ab123".into(),
                confidence: 0.4,
            },
        ];
        let candidates = normalize_fragments(&fragments);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "AB123");
        assert_eq!(candidates[0].original_text, "ab123");
        assert_eq!(candidates[0].confidence, 0.4);
    }
}

//! Post-transliteration correction rules.
//!
//! Each rule is a literal replace-all applied to the output of the previous
//! rule, in list order.

use tipitaka_shared::Correction;

/// Apply `corrections` in order. Rules with an empty `from` are skipped.
pub fn apply_corrections(text: &str, corrections: &[Correction]) -> String {
    corrections
        .iter()
        .filter(|c| !c.from.is_empty())
        .fold(text.to_string(), |acc, c| acc.replace(&c.from, &c.to))
}

//! Eligibility gate: only posts carrying the melted-gold marker are relayed.

use std::sync::LazyLock;

use regex::Regex;

/// "ابشده خرد" written with either plain alef or alef-madda, words separated
/// by any amount of whitespace or zero-width non-joiners (including none).
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\x{0627}\x{0622}]بشده[\s\x{200C}]*خرد").expect("marker pattern is valid")
});

/// Whether a message's raw text qualifies for relay.
pub fn is_eligible(text: &str) -> bool {
    !text.is_empty() && MARKER.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_alef_variant_is_eligible() {
        assert!(is_eligible("📢 ابشده خرد امروز"));
    }

    #[test]
    fn alef_madda_variant_is_eligible() {
        assert!(is_eligible("قیمت آبشده خرد"));
    }

    #[test]
    fn collapsed_and_wide_spacing_is_eligible() {
        assert!(is_eligible("ابشدهخرد"));
        assert!(is_eligible("ابشده   \n خرد"));
        assert!(is_eligible("آبشده\u{200C}خرد"));
    }

    #[test]
    fn missing_marker_is_not_eligible() {
        assert!(!is_eligible("سکه امامی خرید : ۵۰۰"));
        assert!(!is_eligible("ابشده"));
        assert!(!is_eligible("خرد ابشده"));
    }

    #[test]
    fn empty_text_is_not_eligible() {
        assert!(!is_eligible(""));
        assert!(!is_eligible("   "));
    }
}

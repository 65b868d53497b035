//! Section-anchored amount adjustment.
//!
//! A price post is split into sections ("هر مثقال", "هر گرم", ...), each with
//! a "خرید : <amount>" line. A [`DeductionRule`] names one section by its
//! keyword variants and subtracts a fixed amount from the first buy figure
//! found after the earliest keyword occurrence.
//!
//! Keyword variants compile into a [`KeywordSet`] whose words may be separated
//! by any run of whitespace or ZWNJ. The amount pattern lives behind
//! [`SectionAdjuster`] so callers never touch the matching strategy.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::pipeline::numerals::{digits_to_source_script, format_thousands, normalize_to_ascii};

/// The "buy" label preceding the figure that gets adjusted.
pub const BUY_LABEL: &str = "خرید";

/// Deduction applied to the per-mithqal (whole-unit) buy price.
pub const WHOLE_UNIT_DEDUCTION: u64 = 460_000;

/// Deduction applied to the per-gram buy price.
pub const PER_WEIGHT_DEDUCTION: u64 = 100_000;

/// Gap allowed between the words of a keyword: spaces, NBSP, tabs, line
/// breaks or ZWNJ, possibly none at all.
const WORD_GAP: &str = r"[\s\x{200C}]*";

static BUY_ADJUSTER: LazyLock<SectionAdjuster> =
    LazyLock::new(|| SectionAdjuster::new(BUY_LABEL).expect("buy label pattern is valid"));

/// Compiled alternation of section keyword variants.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    pattern: Option<Regex>,
}

impl KeywordSet {
    /// Variants that are empty or all whitespace are ignored.
    pub fn new<I, S>(variants: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let alternatives: Vec<String> = variants
            .into_iter()
            .map(|v| {
                let variant: String = v.into();
                keyword_pattern(&variant)
            })
            .filter(|p| !p.is_empty())
            .collect();

        let pattern = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&alternatives.join("|"))?)
        };

        Ok(Self { pattern })
    }

    /// Earliest byte offset at which any variant occurs.
    pub fn find(&self, normalized: &str) -> Option<usize> {
        self.pattern
            .as_ref()?
            .find(normalized)
            .map(|m| m.start())
    }
}

/// `"هر مثقال"` → `هر[\s\x{200C}]*مثقال`.
fn keyword_pattern(variant: &str) -> String {
    let words: Vec<String> = variant
        .split(|c: char| c.is_whitespace() || c == '\u{200C}')
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    if words.is_empty() {
        return String::new();
    }
    format!("(?:{})", words.join(WORD_GAP))
}

/// A section keyword set paired with the amount to deduct from its buy figure.
#[derive(Debug, Clone)]
pub struct DeductionRule {
    /// Short name for logging ("whole_unit", "per_weight").
    pub name: &'static str,
    /// Alternative spellings of the section keyword.
    pub keywords: KeywordSet,
    /// Amount subtracted from the buy figure.
    pub deduction: u64,
}

impl DeductionRule {
    pub fn new<I, S>(
        name: &'static str,
        keywords: I,
        deduction: u64,
    ) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            name,
            keywords: KeywordSet::new(keywords)?,
            deduction,
        })
    }

    /// "هر مثقال" section, minus 460,000.
    pub fn whole_unit() -> Result<Self, regex::Error> {
        Self::new("whole_unit", ["هر مثقال"], WHOLE_UNIT_DEDUCTION)
    }

    /// "هر گرم" section, minus 100,000.
    pub fn per_weight() -> Result<Self, regex::Error> {
        Self::new("per_weight", ["هر گرم"], PER_WEIGHT_DEDUCTION)
    }
}

/// A located buy figure inside the normalized text of one adjustment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMatch {
    /// Byte offset of the earliest keyword occurrence.
    pub keyword_offset: usize,
    /// The matched label token.
    pub label: String,
    /// The matched digit run, group separators included.
    pub amount_text: String,
    /// Parsed value of `amount_text`.
    pub value: u64,
    /// Byte span of the whole "label : amount" match.
    pub span: Range<usize>,
}

/// Finds and rewrites "label : amount" figures anchored to a section keyword.
#[derive(Debug, Clone)]
pub struct SectionAdjuster {
    label: String,
    amount_pattern: Regex,
}

impl SectionAdjuster {
    /// Build an adjuster for `label`, optionally followed by a colon, then a
    /// run of ASCII digits grouped by `,`, `.` or `٫` (never trailing).
    pub fn new(label: &str) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"{}\s*:?\s*([0-9](?:[0-9,.\x{{066B}}]*[0-9])?)",
            regex::escape(label)
        );
        Ok(Self {
            label: label.to_string(),
            amount_pattern: Regex::new(&pattern)?,
        })
    }

    /// Locate the first buy figure after the earliest keyword occurrence.
    pub fn find_section(&self, normalized: &str, keywords: &KeywordSet) -> Option<SectionMatch> {
        let keyword_offset = keywords.find(normalized)?;
        let caps = self.amount_pattern.captures(&normalized[keyword_offset..])?;
        let whole = caps.get(0)?;
        let amount = caps.get(1)?;

        let digits: String = amount.as_str().chars().filter(char::is_ascii_digit).collect();
        let value = digits.parse::<u64>().ok()?;

        Some(SectionMatch {
            keyword_offset,
            label: self.label.clone(),
            amount_text: amount.as_str().to_string(),
            value,
            span: keyword_offset + whole.start()..keyword_offset + whole.end(),
        })
    }

    /// Apply `rule` to `text`. See [`SectionAdjuster::adjust_in`].
    pub fn adjust(&self, text: &str, rule: &DeductionRule) -> String {
        self.adjust_in(text, &rule.keywords, rule.deduction)
    }

    /// Like [`SectionAdjuster::adjust_in`], compiling `keywords` first. Text
    /// is returned unchanged if they cannot be compiled.
    pub fn adjust_with<S: AsRef<str>>(&self, text: &str, keywords: &[S], deduction: u64) -> String {
        match KeywordSet::new(keywords.iter().map(|k| k.as_ref().to_string())) {
            Ok(keywords) => self.adjust_in(text, &keywords, deduction),
            Err(e) => {
                warn!(error = %e, "Keyword pattern rejected, leaving text unchanged");
                text.to_string()
            }
        }
    }

    /// Subtract `deduction` (floored at zero) from the first buy figure of the
    /// section named by `keywords`, then render all digits in Persian script.
    ///
    /// When the section or its figure is absent the original text is returned
    /// untouched, not the normalized copy.
    pub fn adjust_in(&self, text: &str, keywords: &KeywordSet, deduction: u64) -> String {
        let normalized = normalize_to_ascii(text);

        let Some(section) = self.find_section(&normalized, keywords) else {
            return text.to_string();
        };

        let new_value = section.value.saturating_sub(deduction);
        debug!(
            old = section.value,
            new = new_value,
            deduction,
            "Adjusting section amount"
        );

        let replacement = format!("{} : {}", section.label, format_thousands(new_value));
        let mut out = String::with_capacity(normalized.len() + replacement.len());
        out.push_str(&normalized[..section.span.start]);
        out.push_str(&replacement);
        out.push_str(&normalized[section.span.end..]);

        digits_to_source_script(&out)
    }
}

/// Adjust the buy figure of one section using the default "خرید" label.
pub fn adjust_section<S: AsRef<str>>(text: &str, keyword_variants: &[S], deduction: u64) -> String {
    BUY_ADJUSTER.adjust_with(text, keyword_variants, deduction)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MITHQAL: &[&str] = &["هر مثقال", "هرمثقال"];
    const GRAM: &[&str] = &["هر گرم", "هرگرم"];

    #[test]
    fn deducts_from_first_buy_after_keyword() {
        let text = "هر مثقال\nخرید : ۵۰۰٬۰۰۰\nفروش : ۶۰۰٬۰۰۰";
        let out = adjust_section(text, MITHQAL, 460_000);
        assert_eq!(out, "هر مثقال\nخرید : ۴۰,۰۰۰\nفروش : ۶۰۰,۰۰۰");
    }

    #[test]
    fn clamps_at_zero() {
        let text = "هر گرم خرید: ۵۰,۰۰۰";
        let out = adjust_section(text, GRAM, 100_000);
        assert_eq!(out, "هر گرم خرید : ۰");
    }

    #[test]
    fn missing_keyword_returns_original_text() {
        let text = "سکه امامی خرید : ٥٬٠٠٠";
        assert_eq!(adjust_section(text, MITHQAL, 460_000), text);
    }

    #[test]
    fn missing_amount_returns_original_text() {
        let text = "هر مثقال فعلا تماس بگیرید ٬ ۱";
        assert_eq!(adjust_section(text, MITHQAL, 460_000), text);
    }

    #[test]
    fn buy_label_before_keyword_is_ignored() {
        let text = "خرید : ۹۰۰ سپس هر مثقال خرید : ۵,۰۰۰,۰۰۰";
        let out = adjust_section(text, MITHQAL, 460_000);
        assert_eq!(out, "خرید : ۹۰۰ سپس هر مثقال خرید : ۴,۵۴۰,۰۰۰");
    }

    #[test]
    fn earliest_keyword_variant_wins() {
        let text = "هرمثقال خرید : ۱,۰۰۰ ... هر مثقال خرید : ۲,۰۰۰";
        let out = adjust_section(text, MITHQAL, 1);
        assert_eq!(out, "هرمثقال خرید : ۹۹۹ ... هر مثقال خرید : ۲,۰۰۰");
    }

    #[test]
    fn full_width_colon_and_eastern_arabic_digits() {
        let text = "هر مثقال خرید\u{FF1A}٥٬٠٠٠٬٠٠٠";
        let out = adjust_section(text, MITHQAL, 460_000);
        assert_eq!(out, "هر مثقال خرید : ۴,۵۴۰,۰۰۰");
    }

    #[test]
    fn label_without_colon_is_matched() {
        let text = "هر گرم خرید ۱,۰۰۰,۰۰۰ تومان";
        let out = adjust_section(text, GRAM, 100_000);
        assert_eq!(out, "هر گرم خرید : ۹۰۰,۰۰۰ تومان");
    }

    #[test]
    fn trailing_comma_is_not_part_of_amount() {
        let text = "هر گرم خرید : ۱,۰۰۰,۰۰۰، فروش : ۱,۱۰۰,۰۰۰";
        let out = adjust_section(text, GRAM, 100_000);
        assert_eq!(out, "هر گرم خرید : ۹۰۰,۰۰۰, فروش : ۱,۱۰۰,۰۰۰");
    }

    #[test]
    fn zero_deduction_is_idempotent() {
        let text = "هر مثقال خرید:۵۰۰۰۰۰ تومان";
        let once = adjust_section(text, MITHQAL, 0);
        assert_eq!(once, "هر مثقال خرید : ۵۰۰,۰۰۰ تومان");
        assert_eq!(adjust_section(&once, MITHQAL, 0), once);
    }

    #[test]
    fn rules_compose_in_order() {
        let text = "هر مثقال\nخرید : ۵,۰۰۰,۰۰۰\nهر گرم\nخرید : ۱,۰۰۰,۰۰۰\nکد ۱۲۳";
        let whole = DeductionRule::whole_unit().unwrap();
        let weight = DeductionRule::per_weight().unwrap();
        let adjuster = SectionAdjuster::new(BUY_LABEL).unwrap();

        let out = adjuster.adjust(&adjuster.adjust(text, &whole), &weight);
        assert_eq!(
            out,
            "هر مثقال\nخرید : ۴,۵۴۰,۰۰۰\nهر گرم\nخرید : ۹۰۰,۰۰۰\nکد ۱۲۳"
        );
    }

    #[test]
    fn find_section_reports_span_and_value() {
        let adjuster = SectionAdjuster::new(BUY_LABEL).unwrap();
        let normalized = normalize_to_ascii("xx هر گرم خرید : ۱,۲۰۰ yy");
        let keywords = KeywordSet::new(GRAM.iter().copied()).unwrap();
        let section = adjuster.find_section(&normalized, &keywords).unwrap();

        assert_eq!(section.keyword_offset, 3);
        assert_eq!(section.label, BUY_LABEL);
        assert_eq!(section.amount_text, "1,200");
        assert_eq!(section.value, 1200);
        assert_eq!(&normalized[section.span.clone()], "خرید : 1,200");
    }

    #[test]
    fn empty_keyword_variants_never_match() {
        assert_eq!(KeywordSet::new(["", " \u{200C}"]).unwrap().find("خرید : ۱"), None);
        let none: [&str; 0] = [];
        assert_eq!(KeywordSet::new(none).unwrap().find("خرید : ۱"), None);
    }

    #[test]
    fn keyword_words_tolerate_any_gap() {
        let rule = DeductionRule::whole_unit().unwrap();
        let adjuster = SectionAdjuster::new(BUY_LABEL).unwrap();
        for gap in ["  ", "\u{00A0}", "\t", "\n", "\u{200C}", "", " \u{200C} "] {
            let text = format!("هر{gap}مثقال خرید : ۵,۰۰۰,۰۰۰");
            let expected = format!("هر{gap}مثقال خرید : ۴,۵۴۰,۰۰۰");
            assert_eq!(adjuster.adjust(&text, &rule), expected, "gap {gap:?}");
        }
    }

    #[test]
    fn double_space_keyword_via_adjust_section() {
        let out = adjust_section("هر  مثقال خرید : ۵,۰۰۰,۰۰۰", &["هر مثقال"], 460_000);
        assert_eq!(out, "هر  مثقال خرید : ۴,۵۴۰,۰۰۰");
    }

    #[test]
    fn keyword_set_reports_earliest_offset() {
        let keywords = KeywordSet::new(["هر گرم", "هر مثقال"]).unwrap();
        assert_eq!(keywords.find("ab هر\tمثقال هر گرم"), Some(3));
        assert_eq!(keywords.find("هرگز"), None);
    }

    #[test]
    fn dot_grouped_amount_is_read_whole() {
        let out = adjust_section("هر مثقال خرید : ۵.۰۰۰.۰۰۰", MITHQAL, 460_000);
        assert_eq!(out, "هر مثقال خرید : ۴,۵۴۰,۰۰۰");
    }

    #[test]
    fn arabic_decimal_separator_groups_amount() {
        let out = adjust_section("هر گرم خرید : ۱٫۰۰۰٫۰۰۰ تومان", GRAM, 100_000);
        assert_eq!(out, "هر گرم خرید : ۹۰۰,۰۰۰ تومان");
    }

    #[test]
    fn sentence_period_after_amount_is_kept() {
        let out = adjust_section("هر گرم خرید : ۱,۰۰۰,۰۰۰.", GRAM, 100_000);
        assert_eq!(out, "هر گرم خرید : ۹۰۰,۰۰۰.");
    }

    #[test]
    fn custom_label() {
        let adjuster = SectionAdjuster::new("فروش").unwrap();
        let out = adjuster.adjust_with("هر گرم خرید : ۱۰ فروش : ۲۰", GRAM, 5);
        assert_eq!(out, "هر گرم خرید : ۱۰ فروش : ۱۵");
    }
}

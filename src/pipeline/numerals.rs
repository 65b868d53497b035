//! Numeral normalization between Persian/Eastern-Arabic and ASCII digits.
//!
//! Source posts mix Persian digits (U+06F0..U+06F9), Eastern-Arabic digits
//! (U+0660..U+0669), ASCII digits and a handful of locale punctuation marks.
//! Everything downstream works on the ASCII form and renders back to Persian
//! digits at the very end.

/// Map a single character to its canonical ASCII form.
fn canonical_char(c: char) -> char {
    match c {
        '\u{06F0}'..='\u{06F9}' => ascii_digit(c as u32 - 0x06F0),
        '\u{0660}'..='\u{0669}' => ascii_digit(c as u32 - 0x0660),
        // Arabic thousands separator, Arabic/Persian comma
        '\u{066C}' | '\u{060C}' => ',',
        // Right single quotation mark
        '\u{2019}' => '\'',
        // Full-width colon
        '\u{FF1A}' => ':',
        other => other,
    }
}

fn ascii_digit(offset: u32) -> char {
    char::from_digit(offset, 10).unwrap_or('0')
}

/// Convert every Persian/Eastern-Arabic digit to ASCII and canonicalize
/// locale punctuation. Total and idempotent.
pub fn normalize_to_ascii(text: &str) -> String {
    text.chars().map(canonical_char).collect()
}

/// Render ASCII digits as Persian digit glyphs. Other characters pass through.
pub fn digits_to_source_script(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '0'..='9' => char::from_u32(0x06F0 + (c as u32 - '0' as u32)).unwrap_or(c),
            other => other,
        })
        .collect()
}

/// Strip every non-digit (after normalization) and parse what remains.
///
/// Returns `None` when no digit remains or the value does not fit in a `u64`.
pub fn extract_integer(text: &str) -> Option<u64> {
    let digits: String = normalize_to_ascii(text)
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Format an integer with ASCII comma thousands separators: `4540000` → `4,540,000`.
pub fn format_thousands(value: u64) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persian_digits_become_ascii() {
        assert_eq!(normalize_to_ascii("۰۱۲۳۴۵۶۷۸۹"), "0123456789");
    }

    #[test]
    fn eastern_arabic_digits_become_ascii() {
        assert_eq!(normalize_to_ascii("٠١٢٣٤٥٦٧٨٩"), "0123456789");
    }

    #[test]
    fn locale_punctuation_is_canonicalized() {
        assert_eq!(normalize_to_ascii("۱۲٬۳۴۵"), "12,345");
        assert_eq!(normalize_to_ascii("الف، ب"), "الف, ب");
        assert_eq!(normalize_to_ascii("it\u{2019}s"), "it's");
        assert_eq!(normalize_to_ascii("خرید\u{FF1A} ۵"), "خرید: 5");
    }

    #[test]
    fn other_characters_pass_through() {
        let text = "قیمت طلا امروز - gold price @ 18k";
        assert_eq!(normalize_to_ascii(text), text);
    }

    #[test]
    fn normalize_is_idempotent() {
        let text = "هر مثقال خرید : ۵٬۰۰۰٬۰۰۰ و ٣٤٥ \u{2019} \u{FF1A}";
        let once = normalize_to_ascii(text);
        assert_eq!(normalize_to_ascii(&once), once);
    }

    #[test]
    fn ascii_digits_render_as_persian() {
        assert_eq!(digits_to_source_script("4,540,000"), "۴,۵۴۰,۰۰۰");
        assert_eq!(digits_to_source_script("no digits"), "no digits");
    }

    #[test]
    fn source_script_rendering_is_stable_on_second_pass() {
        let once = digits_to_source_script("price 900,000");
        assert_eq!(digits_to_source_script(&once), once);
    }

    #[test]
    fn extract_integer_recovers_magnitude() {
        assert_eq!(extract_integer("۱۲٬۳۴۵"), Some(12345));
        assert_eq!(extract_integer("٥,٠٠٠,٠٠٠"), Some(5_000_000));
        assert_eq!(extract_integer("۱2٣"), Some(123));
    }

    #[test]
    fn extract_integer_absent_without_digits() {
        assert_eq!(extract_integer(""), None);
        assert_eq!(extract_integer("بدون عدد"), None);
        assert_eq!(extract_integer(",,,"), None);
    }

    #[test]
    fn extract_integer_absent_on_overflow() {
        assert_eq!(extract_integer(&"9".repeat(40)), None);
    }

    #[test]
    fn thousands_formatting() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(40_000), "40,000");
        assert_eq!(format_thousands(4_540_000), "4,540,000");
    }
}

//! Rewrites references to the source channel into the destination handle.

use regex::Regex;

/// Normalize a configured channel name into its `@handle` form.
pub fn canonical_handle(name: &str) -> String {
    let bare = name.trim().trim_start_matches('@');
    format!("@{bare}")
}

/// Swaps every surface form of one channel reference for another handle.
///
/// Recognized forms, longest first: `https://t.me/x`, `http://t.me/x`,
/// `t.me/x`, `@x`. Matches are literal, ASCII case-insensitive and
/// non-overlapping, so a URL is always replaced whole. Digits in the handle
/// match in ASCII, Persian or Eastern-Arabic script, since adjusted posts
/// have already been rendered in Persian digits.
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    pattern: Regex,
    destination: String,
}

impl LinkRewriter {
    pub fn new(source_ref: &str, dest_handle: &str) -> Result<Self, regex::Error> {
        let source = handle_pattern(source_ref.trim().trim_start_matches('@'));
        let forms = [
            format!("https://t\\.me/{source}"),
            format!("http://t\\.me/{source}"),
            format!("t\\.me/{source}"),
            format!("@{source}"),
        ];
        let pattern = Regex::new(&format!("(?i){}", forms.join("|")))?;

        Ok(Self {
            pattern,
            destination: canonical_handle(dest_handle),
        })
    }

    /// The `@handle` every reference is rewritten to.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn rewrite(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, regex::NoExpand(&self.destination))
            .into_owned()
    }
}

/// Escape `handle` for a regex, letting each ASCII digit also match its
/// Persian and Eastern-Arabic forms: `gold24` → `gold[2۲٢][4۴٤]`.
fn handle_pattern(handle: &str) -> String {
    handle
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => {
                let persian = char::from_u32(0x06F0 + d).unwrap_or(c);
                let arabic = char::from_u32(0x0660 + d).unwrap_or(c);
                format!("[{c}{persian}{arabic}]")
            }
            _ => regex::escape(c.encode_utf8(&mut [0; 4])),
        })
        .collect()
}

/// One-shot rewrite of `source_ref` references into `dest_handle`.
///
/// Text is returned unchanged if the rewriter cannot be built.
pub fn rewrite_links(text: &str, source_ref: &str, dest_handle: &str) -> String {
    match LinkRewriter::new(source_ref, dest_handle) {
        Ok(rewriter) => rewriter.rewrite(text),
        Err(e) => {
            tracing::warn!(error = %e, "Link rewriter pattern rejected, leaving text unchanged");
            text.to_string()
        }
    }
}

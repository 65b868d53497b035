//! Text transformation pipeline.
//!
//! Every inbound post flows through:
//! 1. `eligibility::is_eligible` — drop posts without the marker phrase
//! 2. `adjust::SectionAdjuster` — whole-unit rule, then per-weight rule
//! 3. `links::LinkRewriter` — source channel references → destination handle
//!
//! All stages are pure functions of the text; nothing is shared across messages.

pub mod adjust;
pub mod eligibility;
pub mod links;
pub mod numerals;
pub mod processor;

pub use adjust::{DeductionRule, KeywordSet, SectionAdjuster, SectionMatch, adjust_section};
pub use eligibility::is_eligible;
pub use links::{LinkRewriter, canonical_handle, rewrite_links};
pub use numerals::{digits_to_source_script, extract_integer, normalize_to_ascii};
pub use processor::MessageTransformer;

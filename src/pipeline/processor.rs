//! Per-message transformation: eligibility → section adjustments → links.

use tracing::debug;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::pipeline::adjust::{BUY_LABEL, DeductionRule, SectionAdjuster};
use crate::pipeline::eligibility::is_eligible;
use crate::pipeline::links::LinkRewriter;

/// Stateless text pipeline applied to every inbound post.
#[derive(Debug, Clone)]
pub struct MessageTransformer {
    adjuster: SectionAdjuster,
    rules: Vec<DeductionRule>,
    links: LinkRewriter,
}

impl MessageTransformer {
    /// Rules are applied in the given order, each on the output of the last.
    pub fn new(rules: Vec<DeductionRule>, links: LinkRewriter) -> Result<Self> {
        Ok(Self {
            adjuster: SectionAdjuster::new(BUY_LABEL)?,
            rules,
            links,
        })
    }

    /// Whole-unit rule, then per-weight rule, then the configured link swap.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let links = LinkRewriter::new(&config.source_channel, &config.dest_channel)?;
        Self::new(
            vec![DeductionRule::whole_unit()?, DeductionRule::per_weight()?],
            links,
        )
    }

    /// Transform `text`, or `None` if it lacks the eligibility marker.
    pub fn transform(&self, text: &str) -> Option<String> {
        if !is_eligible(text) {
            return None;
        }

        let mut out = text.to_string();
        for rule in &self.rules {
            out = self.adjuster.adjust(&out, rule);
            debug!(rule = rule.name, "Applied deduction rule");
        }

        Some(self.links.rewrite(&out))
    }
}

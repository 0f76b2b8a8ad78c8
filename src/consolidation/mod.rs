pub mod dedup;
pub mod grouping;
pub mod normal_form;
pub mod scoring;

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::info;

use crate::adapters::AdapterRegistry;
use crate::config::{parser, CoalesceConfig};
use crate::errors::CoalesceError;
use crate::history::ReportedStore;
use crate::models::{ConsolidationOutput, Finding, Kind};
use crate::templating::{build_message_template, MessageRewriter};

pub use grouping::TargetGrouper;

/// The consolidation engine: one synchronous batch pass over an
/// already-materialized finding collection. Built once at startup (template
/// composition and grouping lists included) and re-invoked wholesale per
/// reporting cycle.
pub struct ConsolidationEngine {
    registry: AdapterRegistry,
    config: CoalesceConfig,
    grouper: TargetGrouper,
    rewriter: MessageRewriter,
    template: String,
}

impl ConsolidationEngine {
    pub fn new(registry: AdapterRegistry, config: CoalesceConfig) -> Result<Self, CoalesceError> {
        parser::validate(&config)?;
        let grouper = TargetGrouper::from_config(&config.grouping)?;
        let rewriter = MessageRewriter::from_config(&config.templates.rewrites)?;
        let template = build_message_template(&registry, &config.templates)?;
        Ok(ConsolidationEngine {
            registry,
            config,
            grouper,
            rewriter,
            template,
        })
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Union of every registered kind; consumed by staleness monitors.
    pub fn all_kinds(&self) -> Vec<Kind> {
        self.registry.all_kinds()
    }

    /// The notification template composed at startup.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Runs the full consolidation pipeline: sequencing, startup validation,
    /// post-processing, deduplication, reminder marking, description
    /// rewriting and grouping.
    pub fn consolidate(
        &self,
        mut findings: Vec<Finding>,
        reported: &dyn ReportedStore,
    ) -> Result<ConsolidationOutput, CoalesceError> {
        let total = findings.len();
        ensure_sequenced(&mut findings);
        self.registry.validate_findings(&findings)?;

        dedup::post_process(&self.registry, &self.config.deduplication, &mut findings)?;
        let mut survivors =
            dedup::deduplicate(&self.registry, &self.config.deduplication, findings)?;
        dedup::mark_subsequent_reminders(reported, &mut survivors);
        self.rewrite_descriptions(&mut survivors);

        let mut num_findings_per_kind: BTreeMap<Kind, usize> = BTreeMap::new();
        for finding in &survivors {
            *num_findings_per_kind.entry(finding.kind.clone()).or_default() += 1;
        }

        let groups = self.grouper.group(survivors);
        info!(
            input = total,
            surviving = num_findings_per_kind.values().sum::<usize>(),
            groups = groups.len(),
            "Consolidation finished"
        );

        Ok(ConsolidationOutput {
            groups,
            num_findings_per_kind,
            template: self.template.clone(),
        })
    }

    fn rewrite_descriptions(&self, findings: &mut [Finding]) {
        if self.rewriter.is_empty() {
            return;
        }
        for finding in findings.iter_mut() {
            if let Some(Value::String(description)) = finding.extra_data.get("description") {
                let rewritten = self.rewriter.rewrite(description);
                finding
                    .extra_data
                    .insert("description".to_string(), Value::String(rewritten));
            }
        }
    }
}

/// Guarantees unique ingestion sequence numbers, the basis of deterministic
/// tie-breaking. Input that already carries unique numbers (e.g. a re-run
/// over a stored, possibly reordered stream) keeps them; otherwise numbers
/// are assigned in input order before any reordering happens.
pub fn ensure_sequenced(findings: &mut [Finding]) {
    let mut seen = HashSet::new();
    let unique = findings.iter().all(|finding| seen.insert(finding.seq));
    if !unique {
        for (index, finding) in findings.iter_mut().enumerate() {
            finding.seq = index as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Kind;

    #[test]
    fn test_ensure_sequenced_assigns_in_input_order() {
        let mut findings = vec![
            Finding::new("a.com", "https://a.com/x", Kind::new("k")),
            Finding::new("a.com", "https://a.com/y", Kind::new("k")),
        ];
        ensure_sequenced(&mut findings);
        assert_eq!(findings[0].seq, 0);
        assert_eq!(findings[1].seq, 1);
    }

    #[test]
    fn test_ensure_sequenced_keeps_existing_unique_numbers() {
        let mut findings = vec![
            Finding::new("a.com", "https://a.com/x", Kind::new("k")),
            Finding::new("a.com", "https://a.com/y", Kind::new("k")),
        ];
        findings[0].seq = 7;
        findings[1].seq = 3;
        ensure_sequenced(&mut findings);
        assert_eq!(findings[0].seq, 7);
        assert_eq!(findings[1].seq, 3);
    }
}

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::DedupConfig;
use crate::consolidation::normal_form::NormalForm;
use crate::consolidation::scoring::Score;
use crate::errors::CoalesceError;
use crate::models::{Finding, Kind, Severity};

use super::{default_normal_form_rule, default_scoring_rule, Adapter, Locale, NormalFormFn, ScoreFn};

/// Process-wide adapter table, built once at startup and read-only
/// afterwards, so it can be shared freely across workers.
///
/// Registration validates the adapter's contract up front: duplicate kind
/// declarations, rules for undeclared kinds and missing severities all fail
/// here, never in the middle of a consolidation run.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
    kind_owners: HashMap<Kind, &'static str>,
    severities: HashMap<Kind, Severity>,
    normal_form_rules: HashMap<Kind, NormalFormFn>,
    scoring_rules: HashMap<Kind, ScoreFn>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> Result<(), CoalesceError> {
        let name = adapter.name();
        let kinds = adapter.declared_kinds();

        for kind in &kinds {
            if let Some(first) = self.kind_owners.get(kind) {
                return Err(CoalesceError::DuplicateKind {
                    kind: kind.clone(),
                    first,
                    second: name,
                });
            }
        }

        let severities = adapter.severities();
        for kind in &kinds {
            if !severities.contains_key(kind) {
                return Err(CoalesceError::MissingSeverity {
                    adapter: name,
                    kind: kind.clone(),
                });
            }
        }

        for (kind, rule) in adapter.normal_form_rules() {
            if !kinds.contains(&kind) {
                return Err(CoalesceError::RuleForUndeclaredKind {
                    adapter: name,
                    kind,
                });
            }
            self.normal_form_rules.insert(kind, rule);
        }
        for (kind, rule) in adapter.scoring_rules() {
            if !kinds.contains(&kind) {
                return Err(CoalesceError::RuleForUndeclaredKind {
                    adapter: name,
                    kind,
                });
            }
            self.scoring_rules.insert(kind, rule);
        }

        for kind in kinds {
            self.severities.insert(kind.clone(), severities[&kind]);
            self.kind_owners.insert(kind, name);
        }

        debug!(adapter = name, "Registered adapter");
        self.adapters.push(adapter);
        Ok(())
    }

    pub fn adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }

    /// Union of every registered kind, sorted. Consumed by staleness
    /// monitors that alert when a known kind has not fired in a while.
    pub fn all_kinds(&self) -> Vec<Kind> {
        self.kind_owners
            .keys()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_registered(&self, kind: &Kind) -> bool {
        self.kind_owners.contains_key(kind)
    }

    /// Startup validation: every kind appearing in the data must have a
    /// declaring adapter. Surfaced before the run, not per finding.
    pub fn validate_findings(&self, findings: &[Finding]) -> Result<(), CoalesceError> {
        for finding in findings {
            if !self.is_registered(&finding.kind) {
                return Err(CoalesceError::UnregisteredKind(finding.kind.clone()));
            }
        }
        Ok(())
    }

    /// The normal form of a finding: the kind's custom rule when one was
    /// registered, otherwise the generic URL/domain default.
    pub fn normal_form(
        &self,
        finding: &Finding,
        dedup: &DedupConfig,
    ) -> Result<NormalForm, CoalesceError> {
        match self.normal_form_rules.get(&finding.kind) {
            Some(rule) => rule(finding, dedup),
            None => default_normal_form_rule(finding, dedup),
        }
    }

    /// The score of a finding, with the same fallback structure as
    /// [`Self::normal_form`].
    pub fn score(&self, finding: &Finding) -> Result<Score, CoalesceError> {
        match self.scoring_rules.get(&finding.kind) {
            Some(rule) => rule(finding),
            None => default_scoring_rule(finding),
        }
    }

    pub fn severity(&self, kind: &Kind) -> Option<Severity> {
        self.severities.get(kind).copied()
    }

    /// Runs every adapter's extraction over one raw scanner result.
    pub fn extract_all(&self, task_result: &Value, locale: Locale) -> Vec<Finding> {
        let mut findings = Vec::new();
        for adapter in &self.adapters {
            findings.extend(adapter.extract(task_result, locale));
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct TestAdapter {
        name: &'static str,
        kinds: Vec<&'static str>,
        rule_kinds: Vec<&'static str>,
        severity_kinds: Option<Vec<&'static str>>,
    }

    impl TestAdapter {
        fn simple(name: &'static str, kinds: Vec<&'static str>) -> Self {
            TestAdapter {
                name,
                kinds,
                rule_kinds: Vec::new(),
                severity_kinds: None,
            }
        }
    }

    impl Adapter for TestAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn declared_kinds(&self) -> Vec<Kind> {
            self.kinds.iter().map(|k| Kind::new(*k)).collect()
        }

        fn severities(&self) -> HashMap<Kind, Severity> {
            let covered = self.severity_kinds.as_ref().unwrap_or(&self.kinds);
            covered
                .iter()
                .map(|k| (Kind::new(*k), Severity::Medium))
                .collect()
        }

        fn scoring_rules(&self) -> HashMap<Kind, ScoreFn> {
            self.rule_kinds
                .iter()
                .map(|k| {
                    let rule: ScoreFn = Arc::new(|_: &Finding| Ok(vec![7]));
                    (Kind::new(*k), rule)
                })
                .collect()
        }
    }

    #[test]
    fn test_register_and_all_kinds() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(TestAdapter::simple("b", vec!["kind_b"])))
            .unwrap();
        registry
            .register(Arc::new(TestAdapter::simple("a", vec!["kind_a"])))
            .unwrap();

        assert_eq!(
            registry.all_kinds(),
            vec![Kind::new("kind_a"), Kind::new("kind_b")]
        );
    }

    #[test]
    fn test_duplicate_kind_is_config_error() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(TestAdapter::simple("first", vec!["kind_x"])))
            .unwrap();
        let result = registry.register(Arc::new(TestAdapter::simple("second", vec!["kind_x"])));
        assert!(matches!(result, Err(CoalesceError::DuplicateKind { .. })));
    }

    #[test]
    fn test_rule_for_undeclared_kind_is_config_error() {
        let mut registry = AdapterRegistry::new();
        let result = registry.register(Arc::new(TestAdapter {
            name: "bad",
            kinds: vec!["kind_a"],
            rule_kinds: vec!["kind_other"],
            severity_kinds: None,
        }));
        assert!(matches!(
            result,
            Err(CoalesceError::RuleForUndeclaredKind { .. })
        ));
    }

    #[test]
    fn test_missing_severity_is_config_error() {
        let mut registry = AdapterRegistry::new();
        let result = registry.register(Arc::new(TestAdapter {
            name: "bad",
            kinds: vec!["kind_a", "kind_b"],
            rule_kinds: Vec::new(),
            severity_kinds: Some(vec!["kind_a"]),
        }));
        assert!(matches!(result, Err(CoalesceError::MissingSeverity { .. })));
    }

    #[test]
    fn test_unregistered_kind_in_data() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(TestAdapter::simple("a", vec!["kind_a"])))
            .unwrap();

        let known = Finding::new("example.com", "https://example.com/x", Kind::new("kind_a"));
        let unknown = Finding::new("example.com", "https://example.com/x", Kind::new("mystery"));
        assert!(registry.validate_findings(&[known.clone()]).is_ok());
        assert!(matches!(
            registry.validate_findings(&[known, unknown]),
            Err(CoalesceError::UnregisteredKind(_))
        ));
    }

    #[test]
    fn test_rule_dispatch_falls_back_to_default() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(TestAdapter {
                name: "a",
                kinds: vec!["custom", "plain"],
                rule_kinds: vec!["custom"],
                severity_kinds: None,
            }))
            .unwrap();

        let custom = Finding::new("example.com", "http://example.com/x", Kind::new("custom"));
        let plain = Finding::new("example.com", "http://example.com/x", Kind::new("plain"));
        assert_eq!(registry.score(&custom).unwrap(), vec![7]);
        assert_eq!(registry.score(&plain).unwrap(), vec![0]);
    }
}

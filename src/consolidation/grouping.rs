use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::net::IpAddr;

use serde_json::Value;
use tracing::info;

use crate::config::GroupingConfig;
use crate::errors::CoalesceError;
use crate::models::{Finding, TargetGroup};
use crate::utils::domains::is_subdomain;

/// Extra-data key set when a finding is re-attributed to a parent domain, so
/// rendered text can explain why the notification concerns a domain above
/// the one originally submitted.
pub const ATTRIBUTED_TO_PARENT_DOMAIN: &str = "attributed_to_parent_domain";

/// Assigns each surviving finding to the top-level target whose notification
/// batch it joins.
pub struct TargetGrouper {
    separate_institutions: HashSet<String>,
}

impl TargetGrouper {
    pub fn from_config(config: &GroupingConfig) -> Result<Self, CoalesceError> {
        let mut institutions: HashSet<String> =
            config.separate_institutions.iter().cloned().collect();

        if let Some(path) = &config.separate_institutions_file {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CoalesceError::Config(format!(
                    "Cannot read separate institutions from {}: {}",
                    path.display(),
                    e
                ))
            })?;
            for line in content.lines() {
                let line = line.trim();
                if !line.is_empty() {
                    institutions.insert(line.to_string());
                }
            }
        }

        if !institutions.is_empty() {
            info!(
                count = institutions.len(),
                "Loaded domains that will receive separate reports"
            );
        }
        Ok(TargetGrouper {
            separate_institutions: institutions,
        })
    }

    /// Applies the top-level-target overrides to one finding.
    ///
    /// Override 1: sometimes subdomain.example.com is managed by an
    /// institution separate from example.com; findings under such a domain
    /// are batched under it instead of the originally requested target.
    ///
    /// Override 2: an issue found on a domain strictly above the originally
    /// scanned one (e.g. a transferable parent zone) is re-attributed to that
    /// parent domain and flagged, so the notification can explain it.
    pub fn assign(&self, finding: &mut Finding) {
        if let Some(domain) = finding
            .last_seen_domain
            .clone()
            .or_else(|| finding.owning_domain())
        {
            let labels: Vec<&str> = domain.split('.').collect();
            for start in 0..labels.len() {
                let candidate = labels[start..].join(".");
                if self.separate_institutions.contains(&candidate)
                    && is_subdomain(&candidate, &finding.top_level_target, true)
                {
                    info!(
                        original = %finding.top_level_target,
                        separate = %candidate,
                        "Batching finding under separately administered domain"
                    );
                    finding.top_level_target = candidate;
                    break;
                }
            }
        }

        if finding.target_is_domain()
            && is_subdomain(&finding.top_level_target, &finding.target, false)
        {
            finding.top_level_target = finding.target.clone();
            finding
                .extra_data
                .insert(ATTRIBUTED_TO_PARENT_DOMAIN.to_string(), Value::Bool(true));
        }
    }

    /// Applies the overrides and partitions findings into per-target groups.
    /// Findings within a group are sorted by (kind, target).
    pub fn group(&self, mut findings: Vec<Finding>) -> BTreeMap<String, TargetGroup> {
        for finding in &mut findings {
            self.assign(finding);
        }

        let mut by_target: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
        for finding in findings {
            by_target
                .entry(finding.top_level_target.clone())
                .or_default()
                .push(finding);
        }

        let mut groups = BTreeMap::new();
        for (top_level_target, mut findings) in by_target {
            findings.sort_by(|a, b| {
                (&a.kind, &a.target).cmp(&(&b.kind, &b.target))
            });
            let contains_kinds: BTreeSet<_> =
                findings.iter().map(|finding| finding.kind.clone()).collect();
            let num_suspicious = findings.iter().filter(|f| f.is_suspicious).count();

            groups.insert(
                top_level_target.clone(),
                TargetGroup {
                    top_level_target_is_ip_address: top_level_target.parse::<IpAddr>().is_ok(),
                    top_level_target,
                    contains_kinds: contains_kinds.into_iter().collect(),
                    num_suspicious,
                    findings,
                },
            );
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Kind;

    fn grouper(separate: &[&str]) -> TargetGrouper {
        TargetGrouper {
            separate_institutions: separate.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn finding(top_level_target: &str, target: &str) -> Finding {
        Finding::new(top_level_target, target, Kind::new("exposed_sql_dump"))
    }

    #[test]
    fn test_default_grouping_keeps_provenance_target() {
        let mut f = finding("example.com", "https://sub.example.com/x");
        grouper(&[]).assign(&mut f);
        assert_eq!(f.top_level_target, "example.com");
    }

    #[test]
    fn test_separate_institution_override() {
        let mut f = finding("example.com", "https://deep.agency.example.com/x")
            .with_last_seen_domain("deep.agency.example.com");
        grouper(&["agency.example.com"]).assign(&mut f);
        assert_eq!(f.top_level_target, "agency.example.com");
    }

    #[test]
    fn test_separate_institution_outside_tree_is_ignored() {
        // The configured domain is not under the scanned target; grouping
        // must not escape the original tree.
        let mut f = finding("other.com", "https://x.agency.example.com/x")
            .with_last_seen_domain("x.agency.example.com");
        grouper(&["agency.example.com"]).assign(&mut f);
        assert_eq!(f.top_level_target, "other.com");
    }

    #[test]
    fn test_parent_domain_attribution() {
        let mut f = finding("sub.example.com", "example.com");
        f.kind = Kind::new("zone_transfer_possible");
        grouper(&[]).assign(&mut f);
        assert_eq!(f.top_level_target, "example.com");
        assert_eq!(
            f.extra_data.get(ATTRIBUTED_TO_PARENT_DOMAIN),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_same_domain_is_not_parent_attribution() {
        let mut f = finding("example.com", "example.com");
        grouper(&[]).assign(&mut f);
        assert_eq!(f.top_level_target, "example.com");
        assert!(f.extra_data.get(ATTRIBUTED_TO_PARENT_DOMAIN).is_none());
    }

    #[test]
    fn test_group_partitions_and_sorts() {
        let mut suspicious = finding("a.com", "https://a.com/z.sql");
        suspicious.is_suspicious = true;
        let groups = grouper(&[]).group(vec![
            finding("b.com", "https://b.com/x.sql"),
            suspicious,
            finding("a.com", "https://a.com/a.sql"),
        ]);

        assert_eq!(groups.len(), 2);
        let a = &groups["a.com"];
        assert_eq!(a.findings.len(), 2);
        assert_eq!(a.findings[0].target, "https://a.com/a.sql");
        assert_eq!(a.num_suspicious, 1);
        assert_eq!(a.contains_kinds, vec![Kind::new("exposed_sql_dump")]);
        assert!(!a.top_level_target_is_ip_address);
    }

    #[test]
    fn test_ip_top_level_target_flag() {
        let groups = grouper(&[]).group(vec![finding("1.2.3.4", "https://1.2.3.4/x.sql")]);
        assert!(groups["1.2.3.4"].top_level_target_is_ip_address);
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::finding::{Finding, Kind};

/// All surviving findings for one top-level target, i.e. the content of one
/// outbound notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetGroup {
    pub top_level_target: String,
    pub top_level_target_is_ip_address: bool,
    /// Sorted set of kinds present in this group.
    pub contains_kinds: Vec<Kind>,
    pub num_suspicious: usize,
    /// Findings sorted by (kind, target).
    pub findings: Vec<Finding>,
}

/// Result of one consolidation run: deduplicated findings grouped per
/// top-level target, plus the composed notification template, handed together
/// to an external renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationOutput {
    pub groups: BTreeMap<String, TargetGroup>,
    pub num_findings_per_kind: BTreeMap<Kind, usize>,
    pub template: String,
}

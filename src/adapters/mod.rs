pub mod exposed_resources;
pub mod registry;
pub mod zone_transfer;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DedupConfig;
use crate::consolidation::normal_form::{domain_normal_form, url_normal_form, NormalForm};
use crate::consolidation::scoring::{domain_score, url_score, Score};
use crate::errors::CoalesceError;
use crate::models::{Finding, Kind, Severity, TargetClass};

pub use crate::templating::Fragment;
pub use registry::AdapterRegistry;

/// Message locale passed to adapter extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en_US")]
    EnUs,
    #[serde(rename = "pl_PL")]
    PlPl,
}

/// A normal-form rule converts a finding into the canonical key used for
/// deduplication, so that equivalent representations of one issue collide.
pub type NormalFormFn =
    Arc<dyn Fn(&Finding, &DedupConfig) -> Result<NormalForm, CoalesceError> + Send + Sync>;

/// A scoring rule ranks findings sharing a normal form; the highest score is
/// the one that gets reported.
pub type ScoreFn = Arc<dyn Fn(&Finding) -> Result<Score, CoalesceError> + Send + Sync>;

/// An adapter turns one scanner's raw output into typed findings and declares
/// the kind-specific consolidation rules for the kinds it produces.
///
/// Adapters register once at startup; a kind without an explicit rule falls
/// back to the generic URL/domain default, and a kind referenced by data but
/// declared by no adapter is a configuration error.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Kinds this adapter produces. The union over all adapters is the
    /// authoritative kind set.
    fn declared_kinds(&self) -> Vec<Kind>;

    /// Severity of each declared kind, attached to findings during
    /// post-processing. Every declared kind must be covered.
    fn severities(&self) -> HashMap<Kind, Severity>;

    /// Extracts findings from one raw scanner result. Results produced by
    /// other scanners must be ignored, not errored on.
    fn extract(&self, task_result: &Value, locale: Locale) -> Vec<Finding> {
        let _ = (task_result, locale);
        Vec::new()
    }

    /// Template fragments rendering this adapter's kinds.
    fn template_fragments(&self) -> Vec<Fragment> {
        Vec::new()
    }

    /// Kind-specific normal-form rules; kinds not present fall back to
    /// [`default_normal_form_rule`].
    fn normal_form_rules(&self) -> HashMap<Kind, NormalFormFn> {
        HashMap::new()
    }

    /// Kind-specific scoring rules; kinds not present fall back to
    /// [`default_scoring_rule`].
    fn scoring_rules(&self) -> HashMap<Kind, ScoreFn> {
        HashMap::new()
    }
}

/// The generic normal form: the kind plus the URL or domain normal form of
/// the target.
pub fn default_normal_form_rule(
    finding: &Finding,
    dedup: &DedupConfig,
) -> Result<NormalForm, CoalesceError> {
    let target = match finding.target_class()? {
        TargetClass::Url => url_normal_form(&finding.target, &dedup.common_http_ports)?,
        TargetClass::Domain => domain_normal_form(&finding.target)?,
    };
    Ok(NormalForm::new([
        ("kind", finding.kind.as_str()),
        ("target", &target),
    ]))
}

/// The generic score: the default URL or domain score as a single-element
/// vector.
pub fn default_scoring_rule(finding: &Finding) -> Result<Score, CoalesceError> {
    let score = match finding.target_class()? {
        TargetClass::Url => url_score(&finding.target)?,
        TargetClass::Domain => domain_score(&finding.target)?,
    };
    Ok(vec![score])
}

/// Registry with all adapters shipped in this crate.
pub fn builtin_registry() -> Result<AdapterRegistry, CoalesceError> {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(exposed_resources::ExposedResourcesAdapter))?;
    registry.register(Arc::new(zone_transfer::ZoneTransferAdapter))?;
    Ok(registry)
}

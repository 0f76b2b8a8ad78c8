use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::adapters::AdapterRegistry;
use crate::config::DedupConfig;
use crate::consolidation::normal_form::NormalForm;
use crate::consolidation::scoring::Score;
use crate::errors::CoalesceError;
use crate::history::ReportedStore;
use crate::models::{Finding, Kind};

type BucketKey = (Kind, NormalForm);

/// Attaches normal form and severity to every finding. Runs before
/// deduplication; after this step a finding is ready to compete for its
/// equivalence class.
pub fn post_process(
    registry: &AdapterRegistry,
    dedup: &DedupConfig,
    findings: &mut [Finding],
) -> Result<(), CoalesceError> {
    for finding in findings.iter_mut() {
        finding.normal_form = Some(registry.normal_form(finding, dedup)?);
        finding.severity = registry.severity(&finding.kind);
    }
    Ok(())
}

struct Entrant {
    finding: Finding,
    score: Score,
}

/// Collapses the finding stream to one best representative per
/// `(kind, normal form)` partition, then removes IP-addressed findings that
/// are the same vulnerability as a surviving domain-addressed one.
///
/// Selection within a partition keeps the highest score; exact ties keep the
/// finding with the lowest ingestion sequence number, so the surviving set
/// does not depend on input order or on map iteration order.
pub fn deduplicate(
    registry: &AdapterRegistry,
    dedup: &DedupConfig,
    findings: Vec<Finding>,
) -> Result<Vec<Finding>, CoalesceError> {
    let total = findings.len();
    let mut buckets: HashMap<BucketKey, Entrant> = HashMap::with_capacity(total);

    for mut finding in findings {
        // Findings that skipped post_process get their form computed here
        // and attached, so the later passes (cross-representation check,
        // reminder marking) see it too.
        let normal_form = match &finding.normal_form {
            Some(form) => form.clone(),
            None => {
                let form = registry.normal_form(&finding, dedup)?;
                finding.normal_form = Some(form.clone());
                form
            }
        };
        let score = registry.score(&finding)?;
        match buckets.entry((finding.kind.clone(), normal_form)) {
            Entry::Vacant(entry) => {
                entry.insert(Entrant { finding, score });
            }
            Entry::Occupied(mut entry) => {
                let best = entry.get();
                if score > best.score
                    || (score == best.score && finding.seq < best.finding.seq)
                {
                    entry.insert(Entrant { finding, score });
                }
            }
        }
    }

    let mut survivors: Vec<Finding> = buckets.into_values().map(|e| e.finding).collect();
    survivors.sort_by_key(|finding| finding.seq);

    let survivors = drop_ip_versions(registry, dedup, survivors)?;
    debug!(input = total, surviving = survivors.len(), "Deduplication finished");
    Ok(survivors)
}

/// Cross-representation pass: an IP-addressed finding whose
/// `(kind, normal form)` matches the IP-converted variant of a surviving
/// domain-addressed finding is the same vulnerability reached twice, so the
/// domain-based one wins.
fn drop_ip_versions(
    registry: &AdapterRegistry,
    dedup: &DedupConfig,
    survivors: Vec<Finding>,
) -> Result<Vec<Finding>, CoalesceError> {
    let mut alternative_forms: HashSet<BucketKey> = HashSet::new();
    for finding in &survivors {
        if let Some(alternative) = finding.alternative_with_ip_address() {
            let form = registry.normal_form(&alternative, dedup)?;
            alternative_forms.insert((alternative.kind, form));
        }
    }

    let mut kept = Vec::with_capacity(survivors.len());
    for finding in survivors {
        if finding.target_is_ip_address() {
            if let Some(form) = &finding.normal_form {
                if alternative_forms.contains(&(finding.kind.clone(), form.clone())) {
                    debug!(target = %finding.target, kind = %finding.kind,
                        "Dropping IP-addressed duplicate of a domain-addressed finding");
                    continue;
                }
            }
        }
        kept.push(finding);
    }
    Ok(kept)
}

/// Marks survivors that an external store has already seen as subsequent
/// reminders instead of re-emitting them as new. A pass-through to the
/// external already-reported lookup; ageing policy lives with the store.
pub fn mark_subsequent_reminders(store: &dyn ReportedStore, findings: &mut [Finding]) {
    for finding in findings.iter_mut() {
        if let Some(form) = &finding.normal_form {
            if store.was_reported(form) {
                finding.is_subsequent_reminder = true;
            }
        }
    }
}

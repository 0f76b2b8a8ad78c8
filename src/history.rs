use std::collections::HashSet;

use crate::consolidation::normal_form::NormalForm;

/// Lookup of issues that were already sent out in earlier reporting cycles,
/// keyed by normal form. The backing storage (and its ageing policy) is
/// external; the engine only asks whether a finding was seen before, to mark
/// it as a subsequent reminder instead of a new report.
pub trait ReportedStore: Send + Sync {
    fn was_reported(&self, normal_form: &NormalForm) -> bool;
}

/// Store for deployments without reporting history: nothing was ever sent.
pub struct NoPriorReports;

impl ReportedStore for NoPriorReports {
    fn was_reported(&self, _normal_form: &NormalForm) -> bool {
        false
    }
}

/// In-memory store over pre-materialized normal-form keys.
#[derive(Default)]
pub struct InMemoryReportedStore {
    keys: HashSet<String>,
}

impl InMemoryReportedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        InMemoryReportedStore {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, normal_form: &NormalForm) {
        self.keys.insert(normal_form.key());
    }
}

impl ReportedStore for InMemoryReportedStore {
    fn was_reported(&self, normal_form: &NormalForm) -> bool {
        self.keys.contains(&normal_form.key())
    }
}

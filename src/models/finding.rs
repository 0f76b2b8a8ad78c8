use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::consolidation::normal_form::NormalForm;
use crate::errors::CoalesceError;
use crate::utils::domains::is_domain;

use super::severity::Severity;

/// Category of a finding (e.g. "exposed_sql_dump", "zone_transfer_possible").
///
/// Kinds form an open registry: the authoritative set is the union of every
/// adapter's declared kinds, and a kind appearing in data without a declaring
/// adapter is a configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(String);

impl Kind {
    pub fn new(name: impl Into<String>) -> Self {
        Kind(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Kind {
    fn from(name: &str) -> Self {
        Kind(name.to_string())
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of a finding's target. Exactly one of the two holds for a
/// well-formed finding; anything else is an upstream adapter bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClass {
    Url,
    Domain,
}

/// One issue instance on one target representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// The target that was originally requested to be scanned. It may differ
    /// from `target` - scanning example.com may surface a vulnerability on
    /// https://subdomain.example.com/phpmyadmin/.
    pub top_level_target: String,

    /// The actual location of the issue: an absolute URL or a bare domain,
    /// never both.
    pub target: String,

    pub kind: Kind,

    /// Kind-specific additional data.
    #[serde(default)]
    pub extra_data: BTreeMap<String, Value>,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default = "new_finding_id")]
    pub id: String,

    /// IP of the target host, populated at most once by the enrichment step.
    /// `None` means "not applicable or resolution failed" - callers cannot
    /// distinguish the two.
    #[serde(default)]
    pub target_ip: Option<IpAddr>,

    /// Whether this issue was already reported in an earlier cycle.
    #[serde(default)]
    pub is_subsequent_reminder: bool,

    /// Whether the producing adapter considers this finding low-confidence.
    #[serde(default)]
    pub is_suspicious: bool,

    /// The last domain observed while scanning before this finding was made
    /// (e.g. the domain that resolved to the IP the issue was found on).
    #[serde(default)]
    pub last_seen_domain: Option<String>,

    /// Module/run provenance of the raw result this finding came from.
    #[serde(default)]
    pub origin: Option<String>,

    /// Assigned during post-processing from the adapter's severity table.
    #[serde(default)]
    pub severity: Option<Severity>,

    /// Assigned during post-processing; the key findings are deduplicated by.
    #[serde(default)]
    pub normal_form: Option<NormalForm>,

    /// Ingestion sequence number, the explicit tie-break for exact score
    /// ties. Assigned before any reordering.
    #[serde(default)]
    pub seq: u64,
}

fn new_finding_id() -> String {
    Uuid::new_v4().to_string()
}

impl Finding {
    pub fn new(top_level_target: impl Into<String>, target: impl Into<String>, kind: Kind) -> Self {
        Finding {
            top_level_target: top_level_target.into(),
            target: target.into(),
            kind,
            extra_data: BTreeMap::new(),
            timestamp: None,
            id: new_finding_id(),
            target_ip: None,
            is_subsequent_reminder: false,
            is_suspicious: false,
            last_seen_domain: None,
            origin: None,
            severity: None,
            normal_form: None,
            seq: 0,
        }
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra_data.insert(key.to_string(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_last_seen_domain(mut self, domain: impl Into<String>) -> Self {
        self.last_seen_domain = Some(domain.into());
        self
    }

    fn parsed_url(&self) -> Option<Url> {
        let url = Url::parse(&self.target).ok()?;
        url.host_str()?;
        Some(url)
    }

    pub fn target_is_url(&self) -> bool {
        self.parsed_url().is_some()
    }

    pub fn target_is_domain(&self) -> bool {
        !self.target_is_url() && is_domain(&self.target)
    }

    /// Classifies the target as URL or bare domain. A target that is neither
    /// is a contract violation: the upstream adapter produced garbage, and
    /// the whole run is aborted rather than silently bucketing the finding.
    pub fn target_class(&self) -> Result<TargetClass, CoalesceError> {
        if self.target_is_url() {
            Ok(TargetClass::Url)
        } else if self.target_is_domain() {
            Ok(TargetClass::Domain)
        } else {
            Err(CoalesceError::MalformedTarget {
                target: self.target.clone(),
                reason: "neither an absolute URL nor a bare domain".to_string(),
            })
        }
    }

    /// Whether the target host (URL host or the bare target itself) is an IP
    /// address literal.
    pub fn target_is_ip_address(&self) -> bool {
        match self.parsed_url() {
            Some(url) => match url.host() {
                Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_)) => true,
                _ => false,
            },
            None => self.target.parse::<IpAddr>().is_ok(),
        }
    }

    /// If the target is a URL on a hostname (not an IP) with a known
    /// `target_ip`, returns a copy of this finding with the hostname replaced
    /// by the IP, keeping any explicit port.
    ///
    /// Such an alternative issue does not necessarily exist - plenty of
    /// vulnerabilities are reachable only by domain. The copy exists purely so
    /// the deduplicator can detect that an IP-addressed finding is the same
    /// vulnerability reached twice.
    pub fn alternative_with_ip_address(&self) -> Option<Finding> {
        if self.target_is_ip_address() {
            return None;
        }
        let ip = self.target_ip?;
        let mut url = self.parsed_url()?;
        url.set_ip_host(ip).ok()?;

        let mut alternative = self.clone();
        alternative.target = url.to_string();
        alternative.normal_form = None;
        Some(alternative)
    }

    /// The domain this finding concerns, if any: the bare target, the URL
    /// hostname, or - when the host is an IP - the last domain observed while
    /// scanning, falling back to the top-level target.
    pub fn owning_domain(&self) -> Option<String> {
        let host = match self.parsed_url() {
            Some(url) => url.host_str().map(str::to_string),
            None => Some(self.target.clone()),
        }?;

        if host.parse::<IpAddr>().is_err() && is_domain(&host) {
            return Some(host);
        }
        if let Some(last) = &self.last_seen_domain {
            return Some(last.clone());
        }
        if self.top_level_target.parse::<IpAddr>().is_err() && is_domain(&self.top_level_target) {
            return Some(self.top_level_target.clone());
        }
        None
    }
}

/// Structural equality: two findings describe the same issue instance when
/// their top-level target, target, kind and extra data coincide, regardless
/// of id, timestamps or post-processing state.
impl PartialEq for Finding {
    fn eq(&self, other: &Self) -> bool {
        self.top_level_target == other.top_level_target
            && self.target == other.target
            && self.kind == other.kind
            && self.extra_data == other.extra_data
    }
}

impl Eq for Finding {}

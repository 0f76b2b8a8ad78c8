use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;

use thiserror::Error;
use tracing::debug;

use crate::models::Finding;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Resolution of {0} failed")]
    Failed(String),
}

/// Hostname resolution as consumed by the engine. Actual DNS happens outside
/// (timeout-bound and cancellable there); by the time findings reach
/// consolidation the answers are already materialized.
pub trait Resolver: Send + Sync {
    fn resolve(&self, hostname: &str) -> Result<BTreeSet<IpAddr>, ResolveError>;
}

/// Resolver over a pre-materialized hostname-to-addresses map. Hostnames
/// absent from the map count as resolution failures.
#[derive(Default)]
pub struct StaticResolver {
    entries: HashMap<String, BTreeSet<IpAddr>>,
}

impl StaticResolver {
    pub fn new(entries: HashMap<String, BTreeSet<IpAddr>>) -> Self {
        StaticResolver { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl Resolver for StaticResolver {
    fn resolve(&self, hostname: &str) -> Result<BTreeSet<IpAddr>, ResolveError> {
        self.entries
            .get(hostname)
            .cloned()
            .ok_or_else(|| ResolveError::Failed(hostname.to_string()))
    }
}

/// Populates `target_ip` for URL findings that do not have one yet.
///
/// Domain findings are skipped: domain-level issues (zone transfers, mail
/// configuration) have no sensible IP version. A failed resolution leaves
/// `target_ip` as `None`, which only narrows the cross-representation check
/// for that one finding - it never aborts the run.
pub fn enrich_target_ips(findings: &mut [Finding], resolver: &dyn Resolver) {
    for finding in findings.iter_mut() {
        if finding.target_ip.is_some() || !finding.target_is_url() {
            continue;
        }
        let Ok(url) = url::Url::parse(&finding.target) else {
            continue;
        };
        finding.target_ip = match url.host() {
            Some(url::Host::Ipv4(address)) => Some(IpAddr::V4(address)),
            Some(url::Host::Ipv6(address)) => Some(IpAddr::V6(address)),
            Some(url::Host::Domain(domain)) => match resolver.resolve(domain) {
                Ok(addresses) => addresses.into_iter().next(),
                Err(error) => {
                    debug!(%error, "Leaving target_ip unset");
                    None
                }
            },
            None => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Kind;

    fn resolver() -> StaticResolver {
        StaticResolver::new(HashMap::from([(
            "example.com".to_string(),
            BTreeSet::from(["1.2.3.4".parse().unwrap()]),
        )]))
    }

    fn finding(target: &str) -> Finding {
        Finding::new("example.com", target, Kind::new("exposed_sql_dump"))
    }

    #[test]
    fn test_enrichment_resolves_url_hosts() {
        let mut findings = vec![finding("https://example.com/x")];
        enrich_target_ips(&mut findings, &resolver());
        assert_eq!(findings[0].target_ip, Some("1.2.3.4".parse().unwrap()));
    }

    #[test]
    fn test_enrichment_uses_literal_ip_hosts() {
        let mut findings = vec![finding("https://5.6.7.8/x")];
        enrich_target_ips(&mut findings, &resolver());
        assert_eq!(findings[0].target_ip, Some("5.6.7.8".parse().unwrap()));
    }

    #[test]
    fn test_failed_resolution_is_absorbed() {
        let mut findings = vec![finding("https://unknown.example.org/x")];
        enrich_target_ips(&mut findings, &resolver());
        assert_eq!(findings[0].target_ip, None);
    }

    #[test]
    fn test_domain_findings_are_skipped() {
        let mut findings = vec![finding("example.com")];
        enrich_target_ips(&mut findings, &resolver());
        assert_eq!(findings[0].target_ip, None);
    }

    #[test]
    fn test_enrichment_runs_at_most_once() {
        let preset: IpAddr = "9.9.9.9".parse().unwrap();
        let mut findings = vec![finding("https://example.com/x")];
        findings[0].target_ip = Some(preset);
        enrich_target_ips(&mut findings, &resolver());
        assert_eq!(findings[0].target_ip, Some(preset));
    }
}

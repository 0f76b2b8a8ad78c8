use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::consolidation::normal_form::{domain_normal_form, NormalForm};
use crate::models::{Finding, Kind, Severity};
use crate::templating::Fragment;

use super::{Adapter, Locale, NormalFormFn, ScoreFn};

pub const ZONE_TRANSFER_POSSIBLE: &str = "zone_transfer_possible";

/// Transfers of tiny zones are not worth a notification.
const ZONE_SIZE_REPORTING_THRESHOLD: u64 = 2;

#[derive(Debug, Deserialize)]
struct DnsScannerResult {
    topmost_transferable_zone_name: String,
    zone_transfer_nameserver: String,
    #[serde(default)]
    zone_size: u64,
}

/// Adapter for the DNS scanner's zone transfer check.
///
/// Zone transfer findings get a custom normal form: the same zone may be
/// transferable from several nameservers, and each misconfigured nameserver
/// is a separate issue, so the nameserver is a discriminating key. Scoring is
/// a constant - all representations of one (zone, nameserver) pair are
/// equally good.
pub struct ZoneTransferAdapter;

impl Adapter for ZoneTransferAdapter {
    fn name(&self) -> &'static str {
        "zone_transfer"
    }

    fn declared_kinds(&self) -> Vec<Kind> {
        vec![Kind::new(ZONE_TRANSFER_POSSIBLE)]
    }

    fn severities(&self) -> HashMap<Kind, Severity> {
        HashMap::from([(Kind::new(ZONE_TRANSFER_POSSIBLE), Severity::Medium)])
    }

    fn extract(&self, task_result: &Value, _locale: Locale) -> Vec<Finding> {
        if task_result.get("origin").and_then(Value::as_str) != Some("dns_scanner") {
            return Vec::new();
        }
        let Some(top_level_target) = task_result.get("top_level_target").and_then(Value::as_str)
        else {
            return Vec::new();
        };
        let result: DnsScannerResult = match task_result
            .get("result")
            .cloned()
            .map(serde_json::from_value)
        {
            Some(Ok(result)) => result,
            _ => return Vec::new(),
        };
        if result.zone_size < ZONE_SIZE_REPORTING_THRESHOLD {
            return Vec::new();
        }

        let mut finding = Finding::new(
            top_level_target,
            result.topmost_transferable_zone_name,
            Kind::new(ZONE_TRANSFER_POSSIBLE),
        )
        .with_origin("dns_scanner")
        .with_extra("nameserver", result.zone_transfer_nameserver)
        .with_extra("zone_size", result.zone_size);

        finding.timestamp = task_result
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<DateTime<Utc>>().ok());
        vec![finding]
    }

    fn template_fragments(&self) -> Vec<Fragment> {
        vec![Fragment::new(
            include_str!("templates/template_zone_transfer_possible.tpl"),
            5,
        )]
    }

    fn normal_form_rules(&self) -> HashMap<Kind, NormalFormFn> {
        let rule: NormalFormFn = std::sync::Arc::new(|finding, _dedup| {
            let nameserver = finding
                .extra_data
                .get("nameserver")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(NormalForm::new([
                ("kind", finding.kind.as_str()),
                ("target", &domain_normal_form(&finding.target)?),
                ("nameserver", nameserver),
            ]))
        });
        HashMap::from([(Kind::new(ZONE_TRANSFER_POSSIBLE), rule)])
    }

    fn scoring_rules(&self) -> HashMap<Kind, ScoreFn> {
        let rule: ScoreFn = std::sync::Arc::new(|_finding| Ok(vec![0]));
        HashMap::from([(Kind::new(ZONE_TRANSFER_POSSIBLE), rule)])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapters::AdapterRegistry;
    use crate::config::DedupConfig;

    fn raw(zone: &str, nameserver: &str, zone_size: u64) -> Value {
        json!({
            "origin": "dns_scanner",
            "top_level_target": "sub.example.com",
            "result": {
                "topmost_transferable_zone_name": zone,
                "zone_transfer_nameserver": nameserver,
                "zone_size": zone_size,
            },
        })
    }

    #[test]
    fn test_extract() {
        let findings =
            ZoneTransferAdapter.extract(&raw("example.com", "ns1.example.com", 50), Locale::EnUs);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].target, "example.com");
        assert_eq!(
            findings[0].extra_data.get("nameserver"),
            Some(&json!("ns1.example.com"))
        );
    }

    #[test]
    fn test_small_zones_are_skipped() {
        assert!(ZoneTransferAdapter
            .extract(&raw("example.com", "ns1.example.com", 1), Locale::EnUs)
            .is_empty());
    }

    #[test]
    fn test_nameserver_discriminates_normal_forms() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(std::sync::Arc::new(ZoneTransferAdapter))
            .unwrap();
        let dedup = DedupConfig::default();

        let on_ns1 = &ZoneTransferAdapter.extract(&raw("example.com", "ns1.example.com", 50), Locale::EnUs)[0];
        let on_ns2 = &ZoneTransferAdapter.extract(&raw("example.com", "ns2.example.com", 50), Locale::EnUs)[0];
        let on_ns1_www = &ZoneTransferAdapter.extract(&raw("www.example.com", "ns1.example.com", 50), Locale::EnUs)[0];

        let form_ns1 = registry.normal_form(on_ns1, &dedup).unwrap();
        let form_ns2 = registry.normal_form(on_ns2, &dedup).unwrap();
        let form_ns1_www = registry.normal_form(on_ns1_www, &dedup).unwrap();

        assert_ne!(form_ns1, form_ns2);
        assert_eq!(form_ns1, form_ns1_www);
    }
}

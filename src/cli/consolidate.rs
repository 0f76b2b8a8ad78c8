use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::path::Path;

use indicatif::ProgressBar;
use serde_json::Value;
use tracing::info;

use coalesce::adapters::builtin_registry;
use coalesce::history::InMemoryReportedStore;
use coalesce::models::Finding;
use coalesce::resolve::{enrich_target_ips, StaticResolver};
use coalesce::{CoalesceError, ConsolidationEngine};

use super::ConsolidateArgs;

pub fn handle_consolidate(args: ConsolidateArgs) -> Result<(), CoalesceError> {
    let config = super::load_config(args.config.as_deref())?;
    let locale = super::parse_locale(&args.locale)?;
    let engine = ConsolidationEngine::new(builtin_registry()?, config)?;

    let content = std::fs::read_to_string(&args.findings)?;
    let mut findings: Vec<Finding> = if args.raw {
        let raw_results: Vec<Value> = serde_json::from_str(&content)?;
        let progress = ProgressBar::new(raw_results.len() as u64);
        let mut findings = Vec::new();
        for task_result in &raw_results {
            findings.extend(engine.registry().extract_all(task_result, locale));
            progress.inc(1);
        }
        progress.finish_and_clear();
        findings
    } else {
        serde_json::from_str(&content)?
    };
    info!(count = findings.len(), "Loaded findings");

    let resolver = match &args.resolved_ips {
        Some(path) => {
            let entries: HashMap<String, BTreeSet<IpAddr>> =
                serde_json::from_str(&std::fs::read_to_string(path)?)?;
            StaticResolver::new(entries)
        }
        None => StaticResolver::empty(),
    };
    enrich_target_ips(&mut findings, &resolver);

    let store = match &args.already_reported {
        Some(path) => {
            let keys: Vec<String> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            InMemoryReportedStore::from_keys(keys)
        }
        None => InMemoryReportedStore::new(),
    };

    let output = engine.consolidate(findings, &store)?;

    std::fs::create_dir_all(&args.output)?;
    let output_dir = Path::new(&args.output);
    let messages = serde_json::json!({
        "groups": output.groups,
        "num_findings_per_kind": output.num_findings_per_kind,
    });
    std::fs::write(
        output_dir.join("messages.json"),
        serde_json::to_string_pretty(&messages)?,
    )?;
    std::fs::write(output_dir.join("template.tpl"), engine.template())?;

    for (top_level_target, group) in &output.groups {
        println!(
            "{}: {} finding(s), kinds: {}",
            top_level_target,
            group.findings.len(),
            group
                .contains_kinds
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    info!(output = %output_dir.display(), "Consolidation results written");
    Ok(())
}

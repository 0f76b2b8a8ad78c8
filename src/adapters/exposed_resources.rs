use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::models::{Finding, Kind, Severity};
use crate::templating::Fragment;

use super::{Adapter, Locale};

pub const EXPOSED_PASSWORD_FILE: &str = "exposed_password_file";
pub const EXPOSED_SQL_DUMP: &str = "exposed_sql_dump";
pub const EXPOSED_ARCHIVE: &str = "exposed_archive";
pub const EXPOSED_CONFIGURATION_FILE: &str = "exposed_configuration_file";
pub const EXPOSED_LOG_FILE: &str = "exposed_log_file";

/// URL found by the path-guessing scanner, together with the beginning of the
/// response body.
#[derive(Debug, Clone, Deserialize)]
pub struct FoundUrl {
    pub url: String,
    #[serde(default)]
    pub content_prefix: String,
}

#[derive(Debug, Deserialize)]
struct BruterResult {
    #[serde(default)]
    found_urls: Vec<FoundUrl>,
}

/// Adapter for the path-guessing scanner: classifies found URLs into exposed
/// resource kinds.
pub struct ExposedResourcesAdapter;

type Matcher = fn(&FoundUrl) -> bool;

/// The ordering is important - the first matching classifier wins, so more
/// specific checks must come before generic ones.
const CLASSIFIERS: &[(&str, Matcher)] = &[
    (EXPOSED_PASSWORD_FILE, is_password_file),
    (EXPOSED_SQL_DUMP, is_sql_dump),
    (EXPOSED_ARCHIVE, is_exposed_archive),
    (EXPOSED_CONFIGURATION_FILE, is_configuration_file),
    (EXPOSED_LOG_FILE, is_log_file),
];

fn url_path_lowercase(found_url: &FoundUrl) -> String {
    match url::Url::parse(&found_url.url) {
        Ok(url) => url.path().to_lowercase(),
        Err(_) => found_url.url.to_lowercase(),
    }
}

fn is_password_file(found_url: &FoundUrl) -> bool {
    let path = url_path_lowercase(found_url);
    path.ends_with(".htpasswd") || path.ends_with("/passwd") || path.ends_with(".pgpass")
}

fn is_sql_dump(found_url: &FoundUrl) -> bool {
    let path = url_path_lowercase(found_url);
    path.ends_with(".sql")
        || path.ends_with(".sql.gz")
        || found_url.content_prefix.contains("INSERT INTO")
        || found_url.content_prefix.contains("CREATE TABLE")
}

fn is_exposed_archive(found_url: &FoundUrl) -> bool {
    let path = url_path_lowercase(found_url);
    [".zip", ".tar.gz", ".tgz", ".tar", ".rar", ".7z"]
        .iter()
        .any(|extension| path.ends_with(extension))
}

fn is_configuration_file(found_url: &FoundUrl) -> bool {
    let path = url_path_lowercase(found_url);
    path.ends_with(".env")
        || path.ends_with(".ini")
        || path.ends_with("config.php.bak")
        || path.ends_with("wp-config.php.bak")
}

fn is_log_file(found_url: &FoundUrl) -> bool {
    let path = url_path_lowercase(found_url);
    path.ends_with(".log") || path.ends_with("error_log")
}

impl Adapter for ExposedResourcesAdapter {
    fn name(&self) -> &'static str {
        "exposed_resources"
    }

    fn declared_kinds(&self) -> Vec<Kind> {
        CLASSIFIERS.iter().map(|(kind, _)| Kind::new(*kind)).collect()
    }

    fn severities(&self) -> HashMap<Kind, Severity> {
        HashMap::from([
            (Kind::new(EXPOSED_PASSWORD_FILE), Severity::High),
            (Kind::new(EXPOSED_SQL_DUMP), Severity::High),
            (Kind::new(EXPOSED_ARCHIVE), Severity::High),
            (Kind::new(EXPOSED_CONFIGURATION_FILE), Severity::High),
            (Kind::new(EXPOSED_LOG_FILE), Severity::Medium),
        ])
    }

    fn extract(&self, task_result: &Value, _locale: Locale) -> Vec<Finding> {
        if task_result.get("origin").and_then(Value::as_str) != Some("bruter") {
            return Vec::new();
        }
        let Some(top_level_target) = task_result.get("top_level_target").and_then(Value::as_str)
        else {
            warn!("Raw bruter result without top_level_target, skipping");
            return Vec::new();
        };
        let result: BruterResult = match task_result
            .get("result")
            .cloned()
            .map(serde_json::from_value)
        {
            Some(Ok(result)) => result,
            _ => return Vec::new(),
        };

        let timestamp = task_result
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<DateTime<Utc>>().ok());
        let last_seen_domain = task_result.get("last_seen_domain").and_then(Value::as_str);

        let mut findings = Vec::new();
        for found_url in &result.found_urls {
            let Some((kind, _)) = CLASSIFIERS
                .iter()
                .find(|(_, matcher)| matcher(found_url))
            else {
                continue;
            };

            let mut finding =
                Finding::new(top_level_target, found_url.url.clone(), Kind::new(*kind))
                    .with_origin("bruter");
            finding.timestamp = timestamp;
            finding.last_seen_domain = last_seen_domain.map(str::to_string);
            findings.push(finding);
        }
        findings
    }

    fn template_fragments(&self) -> Vec<Fragment> {
        vec![
            Fragment::new(
                include_str!("templates/template_exposed_password_file.tpl"),
                10,
            ),
            Fragment::new(include_str!("templates/template_exposed_sql_dump.tpl"), 10),
            Fragment::new(include_str!("templates/template_exposed_archive.tpl"), 7),
            Fragment::new(
                include_str!("templates/template_exposed_configuration_file.tpl"),
                7,
            ),
            Fragment::new(include_str!("templates/template_exposed_log_file.tpl"), 5),
        ]
    }
}

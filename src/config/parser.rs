use std::path::Path;

use regex::Regex;

use crate::errors::CoalesceError;

use super::types::CoalesceConfig;

pub fn parse_config(path: &Path) -> Result<CoalesceConfig, CoalesceError> {
    if !path.exists() {
        return Err(CoalesceError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(path)?;
    if metadata.len() > 1_048_576 {
        return Err(CoalesceError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: CoalesceConfig = serde_yaml::from_str(&content)?;

    validate(&config)?;

    Ok(config)
}

/// Semantic validation beyond what serde enforces structurally.
pub fn validate(config: &CoalesceConfig) -> Result<(), CoalesceError> {
    if config.deduplication.common_http_ports.is_empty() {
        return Err(CoalesceError::Config(
            "deduplication.common_http_ports must not be empty".into(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for institution in &config.grouping.separate_institutions {
        if !seen.insert(institution.as_str()) {
            return Err(CoalesceError::Config(format!(
                "Duplicate separate institution: {}",
                institution
            )));
        }
    }

    for rule in &config.templates.rewrites {
        Regex::new(&rule.pattern).map_err(|e| {
            CoalesceError::Config(format!("Invalid rewrite pattern {:?}: {}", rule.pattern, e))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_config_full() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "deduplication:\n  common_http_ports: [80, 443, 8080]\ngrouping:\n  separate_institutions:\n    - sub.example.com\ntemplates:\n  rewrites:\n    - pattern: \"internal\"\n      replacement: \"redacted\"\n"
        )
        .unwrap();

        let config = parse_config(file.path()).unwrap();
        assert_eq!(config.deduplication.common_http_ports, vec![80, 443, 8080]);
        assert_eq!(
            config.grouping.separate_institutions,
            vec!["sub.example.com".to_string()]
        );
        assert_eq!(config.templates.rewrites.len(), 1);
    }

    #[test]
    fn test_parse_config_missing_file() {
        let result = parse_config(Path::new("/nonexistent/coalesce.yml"));
        assert!(matches!(result, Err(CoalesceError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_institutions() {
        let mut config = CoalesceConfig::default();
        config.grouping.separate_institutions =
            vec!["a.example.com".into(), "a.example.com".into()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_rewrite_pattern() {
        let mut config = CoalesceConfig::default();
        config.templates.rewrites.push(super::super::types::RewriteRuleConfig {
            pattern: "(unclosed".into(),
            replacement: "x".into(),
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_defaults() {
        let config: CoalesceConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.deduplication.common_http_ports, vec![80, 443]);
        assert!(config.grouping.separate_institutions.is_empty());
        assert!(config.templates.directory.is_none());
    }
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CoalesceConfig {
    #[serde(default)]
    pub deduplication: DedupConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DedupConfig {
    /// Ports considered interchangeable between http and https when building
    /// URL normal forms.
    #[serde(default = "default_common_http_ports")]
    pub common_http_ports: Vec<u16>,
}

fn default_common_http_ports() -> Vec<u16> {
    vec![80, 443]
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            common_http_ports: default_common_http_ports(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GroupingConfig {
    /// Domains administered independently of their parent. Findings under one
    /// of these are batched separately instead of joining the parent's
    /// notification.
    #[serde(default)]
    pub separate_institutions: Vec<String>,

    /// Optional newline-delimited file with additional separate institutions,
    /// merged with the inline list at startup.
    #[serde(default)]
    pub separate_institutions_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TemplateConfig {
    /// Directory holding header.tpl and footer.tpl. When unset, embedded
    /// defaults are used.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Optional extra template fragment prepended before the header. A
    /// missing file leaves the section empty, it is never an error.
    #[serde(default)]
    pub custom_definitions: Option<PathBuf>,

    /// Ordered first-match-wins description rewrite rules.
    #[serde(default)]
    pub rewrites: Vec<RewriteRuleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RewriteRuleConfig {
    pub pattern: String,
    pub replacement: String,
}

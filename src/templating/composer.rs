use crate::adapters::registry::AdapterRegistry;
use crate::config::TemplateConfig;
use crate::errors::CoalesceError;

const DEFAULT_HEADER: &str = include_str!("templates/header.tpl");
const DEFAULT_FOOTER: &str = include_str!("templates/footer.tpl");

/// Builds the full notification template from the fragments of every
/// registered adapter.
///
/// Fragments are ordered by priority descending; ties keep adapter
/// registration order, so one adapter's fragments stay contiguous, and the
/// stable sort preserves each adapter's own declaration order. The result is
/// wrapped with a fixed header and footer, optionally preceded by an external
/// custom-definitions fragment.
pub fn build_message_template(
    registry: &AdapterRegistry,
    config: &TemplateConfig,
) -> Result<String, CoalesceError> {
    let mut entries: Vec<(i64, usize, String)> = Vec::new();
    for (adapter_index, adapter) in registry.adapters().iter().enumerate() {
        for fragment in adapter.template_fragments() {
            entries.push((fragment.priority, adapter_index, fragment.content));
        }
    }
    entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut body = String::new();
    for (_, _, content) in entries {
        body.push_str(&content);
    }

    let (header, footer) = match &config.directory {
        Some(directory) => {
            let header = std::fs::read_to_string(directory.join("header.tpl")).map_err(|e| {
                CoalesceError::Template(format!(
                    "Cannot read header from {}: {}",
                    directory.display(),
                    e
                ))
            })?;
            let footer = std::fs::read_to_string(directory.join("footer.tpl")).map_err(|e| {
                CoalesceError::Template(format!(
                    "Cannot read footer from {}: {}",
                    directory.display(),
                    e
                ))
            })?;
            (header, footer)
        }
        None => (DEFAULT_HEADER.to_string(), DEFAULT_FOOTER.to_string()),
    };

    // The custom definitions source is feature-toggled and may be provided by
    // a different deployment; if absent the section is simply empty.
    let custom_definitions = match &config.custom_definitions {
        Some(path) if path.exists() => std::fs::read_to_string(path)?,
        _ => String::new(),
    };

    Ok(format!("{}{}{}{}", custom_definitions, header, body, footer))
}

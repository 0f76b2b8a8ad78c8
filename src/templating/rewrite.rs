use regex::Regex;

use crate::config::RewriteRuleConfig;
use crate::errors::CoalesceError;

/// Ordered table of (pattern, replacement) pairs applied to finding
/// descriptions. The first matching rule wins, so the table must stay an
/// explicit sequence - match priority is order-dependent.
pub struct MessageRewriter {
    rules: Vec<(Regex, String)>,
}

impl MessageRewriter {
    pub fn from_config(rules: &[RewriteRuleConfig]) -> Result<Self, CoalesceError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let pattern = Regex::new(&rule.pattern).map_err(|e| {
                CoalesceError::Config(format!("Invalid rewrite pattern {:?}: {}", rule.pattern, e))
            })?;
            compiled.push((pattern, rule.replacement.clone()));
        }
        Ok(MessageRewriter { rules: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies the first rule whose pattern matches; later rules are not
    /// consulted. A message matching no rule is returned unchanged.
    pub fn rewrite(&self, message: &str) -> String {
        for (pattern, replacement) in &self.rules {
            if pattern.is_match(message) {
                return pattern.replace_all(message, replacement.as_str()).into_owned();
            }
        }
        message.to_string()
    }
}

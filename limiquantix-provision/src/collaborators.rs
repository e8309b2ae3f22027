//! Contracts of the services the configuration layer consumes.
//!
//! Template storage, substitution values and host inventory belong to other
//! parts of the provisioning system. They are reached through these traits.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::task::ProvisionTask;
use crate::types::{CustomizationTemplate, Host};

/// Looks up customization templates.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Fetch a template by id; `NotFound` when it does not exist.
    async fn resolve_template(&self, template_id: u64) -> Result<CustomizationTemplate>;
}

/// Produces the values substituted into a template for a task.
#[async_trait]
pub trait SubstitutionProvider: Send + Sync {
    async fn prepare_substitution_options(
        &self,
        task: &ProvisionTask,
    ) -> Result<HashMap<String, String>>;
}

/// Looks up hosts by inventory id.
#[async_trait]
pub trait HostRepository: Send + Sync {
    /// Fetch a host; `NotFound` when it does not exist.
    async fn find_host(&self, host_id: u64) -> Result<Host>;
}

/// Turns a template and substitution values into the final script text.
pub trait ScriptRenderer: Send + Sync {
    fn render(&self, template: &CustomizationTemplate, values: &HashMap<String, String>) -> String;
}

/// Renders `#name#` tokens from the substitution values.
///
/// Tokens without a value, and lone `#` characters such as shell comments or
/// `#cloud-config`, are kept verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl PlaceholderRenderer {
    fn is_token(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    }
}

impl ScriptRenderer for PlaceholderRenderer {
    fn render(&self, template: &CustomizationTemplate, values: &HashMap<String, String>) -> String {
        let script = template.script.as_str();
        let mut out = String::with_capacity(script.len());
        let mut rest = script;

        while let Some(start) = rest.find('#') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            let replaced = after.find('#').and_then(|end| {
                let name = &after[..end];
                if Self::is_token(name) {
                    values.get(name).map(|value| (value, end))
                } else {
                    None
                }
            });

            match replaced {
                Some((value, end)) => {
                    out.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('#');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TemplateKind;

    fn render(script: &str, values: &[(&str, &str)]) -> String {
        let template = CustomizationTemplate::new(1, "t", TemplateKind::CloudInit, script);
        let values = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PlaceholderRenderer.render(&template, &values)
    }

    #[test]
    fn test_substitutes_known_tokens() {
        assert_eq!(
            render("#cloud-config\nhostname: #hostname#\n", &[("hostname", "web01")]),
            "#cloud-config\nhostname: web01\n"
        );
    }

    #[test]
    fn test_leaves_plain_hashes() {
        assert_eq!(render("#some_script", &[("key", "value")]), "#some_script");
        assert_eq!(render("# comment #unknown# end", &[]), "# comment #unknown# end");
    }

    #[test]
    fn test_adjacent_tokens() {
        assert_eq!(render("#a##b#", &[("a", "1"), ("b", "2")]), "12");
    }
}

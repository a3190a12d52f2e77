//! Label templating.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Variable references: `$name`, `${name}` and `[[name]]`.
static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\w+)|\$\{(\w+)\}|\[\[(\w+)\]\]").expect("Invalid template variable regex")
});

/// Substitutes variables into label templates.
pub trait TemplateEngine: Send + Sync {
    fn replace(&self, text: &str, vars: &HashMap<String, String>) -> String;
}

/// Dashboard-style variable substitution; unknown variables are left untouched.
#[derive(Debug, Clone, Default)]
pub struct VariableTemplates {
    /// Variables available to every template, overridden by per-call ones.
    globals: HashMap<String, String>,
}

impl VariableTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }
}

impl TemplateEngine for VariableTemplates {
    fn replace(&self, text: &str, vars: &HashMap<String, String>) -> String {
        VARIABLE_REGEX
            .replace_all(text, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                vars.get(name)
                    .or_else(|| self.globals.get(name))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

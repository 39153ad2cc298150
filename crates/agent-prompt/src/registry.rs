//! Named template registry
//!
//! Registering a template under a name that is already taken replaces the
//! old one, which is how user overrides shadow built-in report and task
//! templates.

use crate::{Language, PromptError, PromptTemplate, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

type Templates = HashMap<String, Arc<dyn PromptTemplate>>;

/// Thread-safe `name -> template` map rendering in a default language
pub struct PromptRegistry {
    templates: RwLock<Templates>,
    language: Language,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::with_language(Language::English)
    }

    pub fn with_language(language: Language) -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            language,
        }
    }

    pub fn default_language(&self) -> Language {
        self.language
    }

    pub fn register<T: PromptTemplate + 'static>(&self, template: T) {
        let name = template.name().to_string();
        let mut templates = self
            .templates
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if templates.insert(name.clone(), Arc::new(template)).is_some() {
            debug!(template = %name, "Replaced registered template");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PromptTemplate>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Render `name` in the default language, falling back per
    /// [`PromptTemplate::render_with_fallback`]
    pub fn render(&self, name: &str, vars: &serde_json::Value) -> Result<String> {
        self.render_with_lang(name, &self.language, vars)
    }

    pub fn render_with_lang(
        &self,
        name: &str,
        lang: &Language,
        vars: &serde_json::Value,
    ) -> Result<String> {
        self.get(name)
            .ok_or_else(|| PromptError::NotRegistered(name.to_string()))?
            .render_with_fallback(lang, vars)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Templates> {
        self.templates
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry")
            .field("language", &self.language)
            .field("templates", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JinjaTemplate;
    use serde_json::json;

    #[test]
    fn test_register_and_render() {
        let registry = PromptRegistry::new();
        assert!(registry.is_empty());

        registry.register(JinjaTemplate::new("header", "# {{ symbol }}").unwrap());

        assert!(registry.contains("header"));
        assert_eq!(
            registry.render("header", &json!({ "symbol": "VNM" })).unwrap(),
            "# VNM"
        );
    }

    #[test]
    fn test_default_language_with_fallback() {
        let registry = PromptRegistry::with_language(Language::Vietnamese);
        registry.register(
            JinjaTemplate::bilingual("news", "News for {{ s }}", "Tin tức {{ s }}").unwrap(),
        );
        registry.register(JinjaTemplate::new("footer", "Generated").unwrap());

        let vars = json!({ "s": "HPG" });
        assert_eq!(registry.render("news", &vars).unwrap(), "Tin tức HPG");
        assert_eq!(registry.render("footer", &vars).unwrap(), "Generated");
        assert_eq!(
            registry
                .render_with_lang("news", &Language::English, &vars)
                .unwrap(),
            "News for HPG"
        );
    }

    #[test]
    fn test_render_not_registered() {
        let registry = PromptRegistry::new();
        assert!(matches!(
            registry.render("missing", &json!({})),
            Err(PromptError::NotRegistered(_))
        ));
    }

    #[test]
    fn test_override_replaces() {
        let registry = PromptRegistry::new();
        registry.register(JinjaTemplate::new("report", "built-in").unwrap());
        registry.register(JinjaTemplate::new("news", "built-in news").unwrap());
        registry.register(JinjaTemplate::new("report", "custom").unwrap());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.render("report", &json!({})).unwrap(), "custom");
        assert_eq!(registry.names(), vec!["news", "report"]);
    }
}

//! MiniJinja-based template implementation

use crate::{Language, PromptError, PromptTemplate, Result};
use minijinja::{Environment, UndefinedBehavior};
use std::collections::HashMap;

/// Environment shared by parse validation and rendering
fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    env.add_filter("or_dash", |s: Option<String>| match s {
        Some(s) if !s.trim().is_empty() => s,
        _ => "-".to_string(),
    });
    env
}

/// A template backed by MiniJinja
///
/// Standard Jinja2 syntax applies (`{{ var }}`, `{% if %}`, `{% for %}`).
/// Missing variables render as empty strings, and the `or_dash` filter turns
/// an empty value into `-`.
///
/// ```
/// use agent_prompt::{JinjaTemplate, Language, PromptTemplate};
/// use serde_json::json;
///
/// let template = JinjaTemplate::bilingual(
///     "title",
///     "Analysis of {{ symbol }}",
///     "Phân tích {{ symbol }}",
/// ).unwrap();
///
/// let vi = template.render(&Language::Vietnamese, &json!({ "symbol": "REE" })).unwrap();
/// assert_eq!(vi, "Phân tích REE");
/// ```
pub struct JinjaTemplate {
    name: String,
    templates: HashMap<Language, String>,
}

impl JinjaTemplate {
    pub fn builder(name: impl Into<String>) -> JinjaTemplateBuilder {
        JinjaTemplateBuilder::new(name)
    }

    /// Single English body
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Result<Self> {
        Self::builder(name).english(template).build()
    }

    /// English and Vietnamese bodies
    pub fn bilingual(
        name: impl Into<String>,
        english: impl Into<String>,
        vietnamese: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(name)
            .english(english)
            .vietnamese(vietnamese)
            .build()
    }
}

impl PromptTemplate for JinjaTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn languages(&self) -> Vec<Language> {
        self.templates.keys().copied().collect()
    }

    fn render(&self, lang: &Language, vars: &serde_json::Value) -> Result<String> {
        let source = self
            .templates
            .get(lang)
            .ok_or_else(|| PromptError::MissingVariant {
                name: self.name.clone(),
                language: *lang,
            })?;

        let value = minijinja::Value::from_serialize(vars);
        environment()
            .render_str(source, value)
            .map_err(|source| PromptError::Render {
                name: self.name.clone(),
                source,
            })
    }

    fn raw_template(&self, lang: &Language) -> Option<&str> {
        self.templates.get(lang).map(String::as_str)
    }
}

impl std::fmt::Debug for JinjaTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaTemplate")
            .field("name", &self.name)
            .field("languages", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`JinjaTemplate`]; `build` parses every body up front
pub struct JinjaTemplateBuilder {
    name: String,
    templates: HashMap<Language, String>,
}

impl JinjaTemplateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: HashMap::new(),
        }
    }

    /// Add a body for a specific language
    pub fn template(mut self, lang: Language, content: impl Into<String>) -> Self {
        self.templates.insert(lang, content.into());
        self
    }

    pub fn english(self, content: impl Into<String>) -> Self {
        self.template(Language::English, content)
    }

    pub fn vietnamese(self, content: impl Into<String>) -> Self {
        self.template(Language::Vietnamese, content)
    }

    pub fn build(self) -> Result<JinjaTemplate> {
        if self.templates.is_empty() {
            return Err(PromptError::Empty(self.name));
        }

        let env = environment();
        for (&language, content) in &self.templates {
            env.template_from_str(content)
                .map_err(|source| PromptError::Parse {
                    name: self.name.clone(),
                    language,
                    source,
                })?;
        }

        Ok(JinjaTemplate {
            name: self.name,
            templates: self.templates,
        })
    }
}

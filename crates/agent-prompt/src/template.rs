//! Core prompt template trait

use crate::{Language, PromptError, Result};

/// A named template with one body per language
///
/// Dyn-compatible: variables travel as `serde_json::Value`.
pub trait PromptTemplate: Send + Sync {
    fn name(&self) -> &str;

    /// Languages this template has a body for
    fn languages(&self) -> Vec<Language>;

    fn supports_language(&self, lang: &Language) -> bool {
        self.languages().contains(lang)
    }

    /// Render the body for `lang`; fails if that language is missing
    fn render(&self, lang: &Language, vars: &serde_json::Value) -> Result<String>;

    /// Render `lang`, falling back to English, then to any available body
    fn render_with_fallback(&self, lang: &Language, vars: &serde_json::Value) -> Result<String> {
        if self.supports_language(lang) {
            return self.render(lang, vars);
        }

        if self.supports_language(&Language::English) {
            return self.render(&Language::English, vars);
        }

        let fallback = self
            .languages()
            .into_iter()
            .next()
            .ok_or_else(|| PromptError::Empty(self.name().to_string()))?;

        self.render(&fallback, vars)
    }

    /// Raw body for a language
    fn raw_template(&self, lang: &Language) -> Option<&str>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Fixed-text template keyed by language
    struct Static(Vec<(Language, &'static str)>);

    impl PromptTemplate for Static {
        fn name(&self) -> &str {
            "static"
        }

        fn languages(&self) -> Vec<Language> {
            self.0.iter().map(|(lang, _)| *lang).collect()
        }

        fn render(&self, lang: &Language, _vars: &serde_json::Value) -> Result<String> {
            self.raw_template(lang)
                .map(str::to_string)
                .ok_or_else(|| PromptError::MissingVariant {
                    name: "static".to_string(),
                    language: *lang,
                })
        }

        fn raw_template(&self, lang: &Language) -> Option<&str> {
            self.0.iter().find(|(l, _)| l == lang).map(|(_, body)| *body)
        }
    }

    #[test]
    fn test_requested_language_wins() {
        let template = Static(vec![
            (Language::English, "Report"),
            (Language::Vietnamese, "Báo cáo"),
        ]);

        let out = template
            .render_with_fallback(&Language::Vietnamese, &json!({}))
            .unwrap();
        assert_eq!(out, "Báo cáo");
    }

    #[test]
    fn test_fallback_to_english() {
        let template = Static(vec![(Language::English, "Report")]);

        let out = template
            .render_with_fallback(&Language::Vietnamese, &json!({}))
            .unwrap();
        assert_eq!(out, "Report");
    }

    #[test]
    fn test_fallback_to_first_available() {
        let template = Static(vec![(Language::Vietnamese, "Báo cáo")]);

        let out = template
            .render_with_fallback(&Language::English, &json!({}))
            .unwrap();
        assert_eq!(out, "Báo cáo");
    }

    #[test]
    fn test_fallback_without_bodies_fails() {
        let template = Static(vec![]);
        assert!(matches!(
            template.render_with_fallback(&Language::English, &json!({})),
            Err(PromptError::Empty(_))
        ));
    }
}

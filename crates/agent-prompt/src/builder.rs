//! Fluent prompt builder
//!
//! Used for prompts assembled from structured parts (agent profiles, search
//! snippets) rather than from a template file.

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    parts: Vec<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.parts.push(content.into());
        self
    }

    pub fn newline(self) -> Self {
        self.text("\n")
    }

    pub fn blank_line(self) -> Self {
        self.text("\n\n")
    }

    /// `## title` on its own line
    pub fn section(self, title: impl Into<String>) -> Self {
        self.text(format!("\n## {}\n", title.into()))
    }

    pub fn when(self, condition: bool, content: impl Into<String>) -> Self {
        if condition { self.text(content) } else { self }
    }

    pub fn bullet(self, content: impl Into<String>) -> Self {
        self.text(format!("- {}\n", content.into()))
    }

    pub fn bullets<I, S>(self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        items.into_iter().fold(self, |b, item| b.bullet(item))
    }

    /// `**key**: value` line
    pub fn field(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.text(format!("**{}**: {}\n", key.into(), value.into()))
    }

    pub fn build(self) -> String {
        self.parts.concat()
    }

    pub fn build_trimmed(self) -> String {
        self.build().trim().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl From<PromptBuilder> for String {
    fn from(builder: PromptBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_prompt() {
        let prompt = PromptBuilder::new()
            .text("You are Senior Financial Analyst.")
            .blank_line()
            .field("Goal", "Assess liquidity")
            .section("Background")
            .text("Ten years covering HOSE listings.")
            .build_trimmed();

        assert!(prompt.starts_with("You are Senior Financial Analyst.\n\n**Goal**: Assess liquidity"));
        assert!(prompt.contains("## Background\nTen years"));
    }

    #[test]
    fn test_bullets_and_when() {
        let prompt = PromptBuilder::new()
            .bullets(["Current ratio", "Quick ratio"])
            .when(false, "hidden")
            .when(true, "shown")
            .build();
        assert_eq!(prompt, "- Current ratio\n- Quick ratio\nshown");
    }

    #[test]
    fn test_empty_and_into_string() {
        let builder = PromptBuilder::new();
        assert!(builder.is_empty());
        let s: String = builder.newline().into();
        assert_eq!(s, "\n");
    }
}

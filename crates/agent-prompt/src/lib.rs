//! Prompt and report template management
//!
//! - [`JinjaTemplate`]: MiniJinja templates with English/Vietnamese bodies
//! - [`PromptRegistry`]: thread-safe name -> template map with a default language
//! - [`FileLoader`]: load overrides from a directory of `.j2` files
//! - [`PromptBuilder`]: fluent construction of structured prompts
//!
//! ```
//! use agent_prompt::{JinjaTemplate, Language, PromptRegistry};
//! use serde_json::json;
//!
//! let registry = PromptRegistry::with_language(Language::Vietnamese);
//! registry.register(JinjaTemplate::bilingual(
//!     "task",
//!     "Analyze {{ symbol }}",
//!     "Phân tích {{ symbol }}",
//! ).unwrap());
//!
//! let prompt = registry.render("task", &json!({ "symbol": "FPT" })).unwrap();
//! assert_eq!(prompt, "Phân tích FPT");
//! ```

mod builder;
mod error;
mod jinja;
mod language;
mod loader;
mod registry;
mod template;

pub use builder::PromptBuilder;
pub use error::{PromptError, Result};
pub use jinja::{JinjaTemplate, JinjaTemplateBuilder};
pub use language::Language;
pub use loader::FileLoader;
pub use registry::PromptRegistry;
pub use template::PromptTemplate;

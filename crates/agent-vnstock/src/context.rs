//! Per-run analysis context
//!
//! Built once after fetching and normalization, then shared read-only (behind
//! an `Arc`) by the agent tasks and the report assembler.

use crate::api::{CompanyInfo, SearchResult};
use crate::config::AnalysisType;
use crate::statement::{NormalizedStatement, StatementKind, markdown_table};
use agent_prompt::PromptBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Periods per table handed to the analyst agent
const PROMPT_PERIODS: usize = 5;

/// Web search findings gathered for the news task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketIntelligence {
    pub queries: Vec<String>,
    /// De-duplicated by URL, in query order
    pub results: Vec<SearchResult>,
}

impl MarketIntelligence {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Numbered snippet list for the news task prompt
    pub fn to_prompt(&self) -> String {
        if self.results.is_empty() {
            return "No search results were found.".to_string();
        }

        self.results
            .iter()
            .enumerate()
            .fold(PromptBuilder::new(), |builder, (i, result)| {
                let builder = builder
                    .text(format!("{}. {}\n", i + 1, result.title))
                    .text(format!("   URL: {}\n", result.url));
                let builder = match &result.age {
                    Some(age) => builder.text(format!("   Published: {age}\n")),
                    None => builder,
                };
                builder.when(
                    !result.description.is_empty(),
                    format!("   {}\n", result.description),
                )
            })
            .build_trimmed()
    }
}

/// Everything known about one symbol for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ContextRepr")]
pub struct AnalysisContext {
    symbol: String,
    company: CompanyInfo,
    statements: HashMap<StatementKind, NormalizedStatement>,
    intelligence: MarketIntelligence,
}

impl AnalysisContext {
    /// Kinds missing from `statements` are recorded as empty
    pub fn new(
        symbol: impl Into<String>,
        company: CompanyInfo,
        mut statements: HashMap<StatementKind, NormalizedStatement>,
        intelligence: MarketIntelligence,
    ) -> Self {
        for kind in StatementKind::ALL {
            statements
                .entry(kind)
                .or_insert_with(|| NormalizedStatement::empty(kind));
        }

        Self {
            symbol: symbol.into(),
            company,
            statements,
            intelligence,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn company(&self) -> &CompanyInfo {
        &self.company
    }

    pub fn intelligence(&self) -> &MarketIntelligence {
        &self.intelligence
    }

    pub fn statement(&self, kind: StatementKind) -> Option<&NormalizedStatement> {
        self.statements.get(&kind)
    }

    /// Statements in report order
    pub fn statements(&self) -> impl Iterator<Item = &NormalizedStatement> {
        StatementKind::ALL
            .iter()
            .filter_map(|kind| self.statement(*kind))
    }

    /// Markdown tables of the recent periods, as data for the analyst agent
    pub fn data_context(&self) -> String {
        self.statements()
            .fold(PromptBuilder::new(), |builder, statement| {
                builder
                    .section(statement.kind().title())
                    .text(markdown_table(statement, Some(PROMPT_PERIODS)))
                    .newline()
            })
            .build_trimmed()
    }

    /// Variables available to crew task templates
    pub fn template_vars(&self) -> serde_json::Value {
        serde_json::json!({
            "stock_symbol": self.symbol,
            "company_name": self.company.name,
            "industry": self.company.industry,
            "data_context": self.data_context(),
            "search_results": self.intelligence.to_prompt(),
        })
    }

    /// Agent context seeded with the run metadata
    pub fn agent_context(&self, run_id: &str, analysis_type: AnalysisType) -> agent_core::Context {
        agent_core::Context::new()
            .with_run_id(run_id)
            .with_symbol(&self.symbol)
            .with_company(&self.company.name, &self.company.industry)
            .with_analysis_type(analysis_type.as_str())
    }
}

#[derive(Deserialize)]
struct ContextRepr {
    symbol: String,
    company: CompanyInfo,
    #[serde(default)]
    statements: HashMap<StatementKind, NormalizedStatement>,
    #[serde(default)]
    intelligence: MarketIntelligence,
}

impl From<ContextRepr> for AnalysisContext {
    fn from(repr: ContextRepr) -> Self {
        Self::new(repr.symbol, repr.company, repr.statements, repr.intelligence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::{ColumnNormalizer, RawStatement, flatten};

    fn ratios() -> NormalizedStatement {
        let raw = RawStatement::new(StatementKind::Ratios, vec!["2023".into()])
            .with_column("Thanh khoản", "Current Ratio", vec![Some(1.8)])
            .unwrap();
        flatten(&raw, &ColumnNormalizer::builtin().unwrap()).unwrap()
    }

    fn context() -> AnalysisContext {
        let intelligence = MarketIntelligence {
            queries: vec!["REE news Vietnam".into()],
            results: vec![SearchResult {
                title: "REE expands wind power".into(),
                url: "https://example.vn/ree-wind".into(),
                description: "New 50MW project".into(),
                age: Some("1 month ago".into()),
            }],
        };
        AnalysisContext::new(
            "REE",
            CompanyInfo {
                symbol: "REE".into(),
                name: "Refrigeration Electrical Engineering".into(),
                industry: "Industrials".into(),
            },
            HashMap::from([(StatementKind::Ratios, ratios())]),
            intelligence,
        )
    }

    #[test]
    fn test_missing_statements_are_empty() {
        let ctx = context();
        assert_eq!(ctx.statements().count(), 5);
        assert!(ctx.statement(StatementKind::CashFlow).unwrap().is_empty());
        assert!(!ctx.statement(StatementKind::Ratios).unwrap().is_empty());
    }

    #[test]
    fn test_deserialized_context_fills_missing_kinds() {
        let mut saved = serde_json::to_value(context()).unwrap();
        saved["statements"]
            .as_object_mut()
            .unwrap()
            .retain(|kind, _| kind == "ratios");

        let ctx: AnalysisContext = serde_json::from_value(saved).unwrap();
        assert_eq!(ctx.statements().count(), 5);
        assert!(ctx.statement(StatementKind::Dividends).unwrap().is_empty());
        assert!(ctx.data_context().contains("Liquidity_Current_Ratio"));
    }

    #[test]
    fn test_template_vars() {
        let vars = context().template_vars();
        assert_eq!(vars["stock_symbol"], "REE");
        assert_eq!(vars["industry"], "Industrials");

        let data = vars["data_context"].as_str().unwrap();
        assert!(data.contains("## Financial Ratios"));
        assert!(data.contains("Liquidity_Current_Ratio"));
        assert!(data.contains("## Cash Flow\nNo data"));

        let search = vars["search_results"].as_str().unwrap();
        assert!(search.starts_with("1. REE expands wind power"));
        assert!(search.contains("Published: 1 month ago"));
    }

    #[test]
    fn test_empty_intelligence_prompt() {
        assert_eq!(
            MarketIntelligence::default().to_prompt(),
            "No search results were found."
        );
    }

    #[test]
    fn test_agent_context() {
        let ctx = context().agent_context("run-1", AnalysisType::Liquidity);
        assert_eq!(ctx.symbol(), Some("REE"));
        assert_eq!(ctx.industry(), Some("Industrials"));
        assert_eq!(ctx.analysis_type(), Some("liquidity"));
        assert_eq!(ctx.run_id(), Some("run-1"));
    }
}

//! Run context handed to every agent
//!
//! Carries the metadata of one analysis run (ticker, company, analysis type)
//! and the outputs of tasks that finished earlier in the same run, in the
//! order they finished.

use serde::{Deserialize, Serialize};

/// Output of one finished task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedTask {
    pub task: String,
    pub output: String,
}

/// Context passed to agents during execution
///
/// ```
/// use agent_core::Context;
///
/// let mut ctx = Context::new()
///     .with_symbol("REE")
///     .with_company("Refrigeration Electrical Engineering", "Industrial Goods");
/// ctx.record_output("financial_analysis", "Current ratio 1.8");
///
/// assert_eq!(ctx.symbol(), Some("REE"));
/// assert_eq!(ctx.task_output("financial_analysis"), Some("Current ratio 1.8"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    run_id: Option<String>,
    symbol: Option<String>,
    company_name: Option<String>,
    industry: Option<String>,
    analysis_type: Option<String>,
    outputs: Vec<FinishedTask>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Company name and industry; an empty industry is stored as unknown
    pub fn with_company(mut self, name: impl Into<String>, industry: impl Into<String>) -> Self {
        let industry = industry.into();
        self.company_name = Some(name.into());
        self.industry = (!industry.trim().is_empty()).then_some(industry);
        self
    }

    pub fn with_analysis_type(mut self, analysis_type: impl Into<String>) -> Self {
        self.analysis_type = Some(analysis_type.into());
        self
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    pub fn industry(&self) -> Option<&str> {
        self.industry.as_deref()
    }

    pub fn analysis_type(&self) -> Option<&str> {
        self.analysis_type.as_deref()
    }

    /// Record the output of a finished task
    ///
    /// A task recorded twice keeps its first position with the newer output.
    pub fn record_output(&mut self, task: impl Into<String>, output: impl Into<String>) {
        let task = task.into();
        let output = output.into();
        match self.outputs.iter_mut().find(|o| o.task == task) {
            Some(existing) => existing.output = output,
            None => self.outputs.push(FinishedTask { task, output }),
        }
    }

    pub fn task_output(&self, task: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.task == task)
            .map(|o| o.output.as_str())
    }

    /// `(task, output)` pairs in the order the tasks finished
    pub fn task_outputs(&self) -> Vec<(&str, &str)> {
        self.outputs
            .iter()
            .map(|o| (o.task.as_str(), o.output.as_str()))
            .collect()
    }

    pub fn has_outputs(&self) -> bool {
        !self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_metadata() {
        let ctx = Context::new()
            .with_run_id("run-1")
            .with_symbol("REE")
            .with_company("REE Corp", "Utilities")
            .with_analysis_type("liquidity");

        assert_eq!(ctx.run_id(), Some("run-1"));
        assert_eq!(ctx.symbol(), Some("REE"));
        assert_eq!(ctx.company_name(), Some("REE Corp"));
        assert_eq!(ctx.industry(), Some("Utilities"));
        assert_eq!(ctx.analysis_type(), Some("liquidity"));
    }

    #[test]
    fn test_blank_industry_is_unknown() {
        let ctx = Context::new().with_company("REE", "  ");
        assert_eq!(ctx.company_name(), Some("REE"));
        assert_eq!(ctx.industry(), None);
    }

    #[test]
    fn test_task_outputs_keep_finish_order() {
        let mut ctx = Context::new();
        assert!(!ctx.has_outputs());

        ctx.record_output("news_research", "headlines");
        ctx.record_output("financial_analysis", "ratios look fine");
        ctx.record_output("news_research", "revised headlines");

        assert_eq!(ctx.task_output("news_research"), Some("revised headlines"));
        assert_eq!(ctx.task_output("missing"), None);
        assert_eq!(
            ctx.task_outputs(),
            vec![
                ("news_research", "revised headlines"),
                ("financial_analysis", "ratios look fine")
            ]
        );
    }

    #[test]
    fn test_error_transience() {
        let timeout = crate::Error::Timeout {
            agent: "analyst".into(),
            seconds: 30,
        };
        assert!(timeout.is_transient());
        assert!(!crate::Error::Rejected("401".into()).is_transient());
    }
}

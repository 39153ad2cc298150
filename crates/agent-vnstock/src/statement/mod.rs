//! Financial statements and their normalization
//!
//! A [`RawStatement`] is what a data source returns: periods as rows and
//! columns labelled by a vendor `(Category, Metric)` pair. [`flatten`] turns
//! it into a [`NormalizedStatement`] whose columns carry flat English keys
//! such as `Liquidity_Current_Ratio`, while remembering the vendor label each
//! column came from so [`expand`] can rebuild the original.

mod flattener;
mod labels;
mod normalizer;
mod render;

pub use flattener::{expand, flatten};
pub use labels::{CanonicalLabel, LabelTable, Unit, sanitize};
pub use normalizer::ColumnNormalizer;
pub use render::{NO_DATA, markdown_table, snapshot_table};

use crate::error::{AnalystError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// The statements fetched for every run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Ratios,
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    Dividends,
}

impl StatementKind {
    /// Every kind, in report appendix order
    pub const ALL: [StatementKind; 5] = [
        Self::Ratios,
        Self::IncomeStatement,
        Self::BalanceSheet,
        Self::CashFlow,
        Self::Dividends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ratios => "ratios",
            Self::IncomeStatement => "income_statement",
            Self::BalanceSheet => "balance_sheet",
            Self::CashFlow => "cash_flow",
            Self::Dividends => "dividends",
        }
    }

    /// Heading used in reports
    pub fn title(&self) -> &'static str {
        match self {
            Self::Ratios => "Financial Ratios",
            Self::IncomeStatement => "Income Statement",
            Self::BalanceSheet => "Balance Sheet",
            Self::CashFlow => "Cash Flow",
            Self::Dividends => "Dividends",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ratios" | "ratio" => Ok(Self::Ratios),
            "income_statement" | "income" => Ok(Self::IncomeStatement),
            "balance_sheet" | "balance" => Ok(Self::BalanceSheet),
            "cash_flow" | "cashflow" => Ok(Self::CashFlow),
            "dividends" | "dividend" => Ok(Self::Dividends),
            other => Err(format!("unknown statement kind '{other}'")),
        }
    }
}

/// A vendor `(Category, Metric)` column label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnLabel {
    pub category: String,
    pub metric: String,
}

impl ColumnLabel {
    pub fn new(category: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            metric: metric.into(),
        }
    }

    /// Copy with surrounding whitespace removed from both parts
    pub fn trimmed(&self) -> Self {
        Self::new(self.category.trim(), self.metric.trim())
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.category, self.metric)
    }
}

/// One vendor column: a label and one value per period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    pub label: ColumnLabel,
    pub values: Vec<Option<f64>>,
}

/// Statement as returned by a data source
///
/// Rows are periods in source order (usually most recent first). Every
/// column holds exactly one value per period; `None` marks a missing value.
/// Deserialized statements go through the same checks as
/// [`push_column`](Self::push_column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StatementRepr<RawColumn>")]
pub struct RawStatement {
    kind: StatementKind,
    periods: Vec<String>,
    columns: Vec<RawColumn>,
}

impl RawStatement {
    pub fn new(kind: StatementKind, periods: Vec<String>) -> Self {
        Self {
            kind,
            periods,
            columns: Vec::new(),
        }
    }

    /// Append a column; its length must match the period count and its label
    /// must not repeat an earlier column
    pub fn push_column(&mut self, label: ColumnLabel, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.periods.len() {
            return Err(AnalystError::MalformedStatement(format!(
                "column {label} has {} values for {} periods",
                values.len(),
                self.periods.len()
            )));
        }
        if self.columns.iter().any(|c| c.label == label) {
            return Err(AnalystError::MalformedStatement(format!(
                "column {label} appears twice"
            )));
        }
        self.columns.push(RawColumn { label, values });
        Ok(())
    }

    /// Builder-style [`push_column`](Self::push_column)
    pub fn with_column(
        mut self,
        category: impl Into<String>,
        metric: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<Self> {
        self.push_column(ColumnLabel::new(category, metric), values)?;
        Ok(self)
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty() || self.columns.is_empty()
    }
}

/// A flattened column and where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedColumn {
    /// Flat key, e.g. `Liquidity_Current_Ratio`
    pub key: String,
    pub canonical: CanonicalLabel,
    /// Vendor label the column was normalized from
    pub source: ColumnLabel,
    pub values: Vec<Option<f64>>,
}

/// Statement with flat, unique English column keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StatementRepr<NormalizedColumn>")]
pub struct NormalizedStatement {
    kind: StatementKind,
    periods: Vec<String>,
    columns: Vec<NormalizedColumn>,
}

impl NormalizedStatement {
    pub(crate) fn from_parts(
        kind: StatementKind,
        periods: Vec<String>,
        columns: Vec<NormalizedColumn>,
    ) -> Self {
        debug_assert!({
            let mut seen = HashSet::new();
            columns.iter().all(|c| seen.insert(c.key.as_str()))
        });
        Self {
            kind,
            periods,
            columns,
        }
    }

    /// Statement with no rows, used when a source has nothing to report
    pub fn empty(kind: StatementKind) -> Self {
        Self::from_parts(kind, Vec::new(), Vec::new())
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    pub fn columns(&self) -> &[NormalizedColumn] {
        &self.columns
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.key.as_str())
    }

    pub fn column(&self, key: &str) -> Option<&NormalizedColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Value of `key` in `period`; `None` when absent or missing
    pub fn value(&self, key: &str, period: &str) -> Option<f64> {
        let row = self.periods.iter().position(|p| p == period)?;
        self.column(key).and_then(|c| c.values.get(row).copied().flatten())
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty() || self.columns.is_empty()
    }

    /// Same data labelled by canonical `(category, metric)` pairs instead of
    /// vendor labels
    pub fn canonical_view(&self) -> RawStatement {
        RawStatement {
            kind: self.kind,
            periods: self.periods.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| RawColumn {
                    label: c.canonical.label(),
                    values: c.values.clone(),
                })
                .collect(),
        }
    }
}

/// Unchecked wire form of both statement types
#[derive(Deserialize)]
struct StatementRepr<C> {
    kind: StatementKind,
    periods: Vec<String>,
    columns: Vec<C>,
}

impl TryFrom<StatementRepr<RawColumn>> for RawStatement {
    type Error = AnalystError;

    fn try_from(repr: StatementRepr<RawColumn>) -> Result<Self> {
        let mut raw = RawStatement::new(repr.kind, repr.periods);
        for column in repr.columns {
            raw.push_column(column.label, column.values)?;
        }
        Ok(raw)
    }
}

impl TryFrom<StatementRepr<NormalizedColumn>> for NormalizedStatement {
    type Error = AnalystError;

    fn try_from(repr: StatementRepr<NormalizedColumn>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(repr.columns.len());
        for column in &repr.columns {
            if column.values.len() != repr.periods.len() {
                return Err(AnalystError::MalformedStatement(format!(
                    "column {} has {} values for {} periods",
                    column.key,
                    column.values.len(),
                    repr.periods.len()
                )));
            }
            if !seen.insert(column.key.as_str()) {
                return Err(AnalystError::MalformedStatement(format!(
                    "key {} appears twice",
                    column.key
                )));
            }
        }
        Ok(Self::from_parts(repr.kind, repr.periods, repr.columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_column_checks_shape() {
        let mut raw = RawStatement::new(StatementKind::Ratios, vec!["2023".into(), "2022".into()]);
        assert!(raw
            .push_column(ColumnLabel::new("Thanh khoản", "Current Ratio"), vec![Some(1.8)])
            .is_err());

        raw.push_column(
            ColumnLabel::new("Thanh khoản", "Current Ratio"),
            vec![Some(1.8), None],
        )
        .unwrap();
        let dup = raw.push_column(
            ColumnLabel::new("Thanh khoản", "Current Ratio"),
            vec![Some(1.0), Some(2.0)],
        );
        assert!(matches!(dup, Err(AnalystError::MalformedStatement(_))));
        assert_eq!(raw.columns().len(), 1);
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let short = serde_json::json!({
            "kind": "ratios",
            "periods": ["2023", "2022"],
            "columns": [{
                "label": {"category": "Thanh khoản", "metric": "Current Ratio"},
                "values": [1.8]
            }]
        });
        let err = serde_json::from_value::<RawStatement>(short).unwrap_err();
        assert!(err.to_string().contains("1 values for 2 periods"));

        let ok = RawStatement::new(StatementKind::Ratios, vec!["2023".into()])
            .with_column("Thanh khoản", "Current Ratio", vec![Some(1.8)])
            .unwrap();
        let back: RawStatement =
            serde_json::from_value(serde_json::to_value(&ok).unwrap()).unwrap();
        assert_eq!(back, ok);
    }

    #[test]
    fn test_deserialize_normalized_checks_keys() {
        let column = serde_json::json!({
            "key": "Liquidity_Current_Ratio",
            "canonical": {"category": "Liquidity", "metric": "Current", "unit": "ratio"},
            "source": {"category": "Thanh khoản", "metric": "Current Ratio"},
            "values": [1.8]
        });
        let twice = serde_json::json!({
            "kind": "ratios",
            "periods": ["2023"],
            "columns": [column.clone(), column.clone()]
        });
        assert!(serde_json::from_value::<NormalizedStatement>(twice).is_err());

        let short = serde_json::json!({
            "kind": "ratios",
            "periods": ["2023", "2022"],
            "columns": [column]
        });
        assert!(serde_json::from_value::<NormalizedStatement>(short).is_err());
    }

    #[test]
    fn test_statement_kind_parse() {
        assert_eq!("cash-flow".parse::<StatementKind>(), Ok(StatementKind::CashFlow));
        assert_eq!("Income".parse::<StatementKind>(), Ok(StatementKind::IncomeStatement));
        assert_eq!(StatementKind::BalanceSheet.to_string(), "balance_sheet");
        assert!("prices".parse::<StatementKind>().is_err());
    }

    #[test]
    fn test_label_display_and_trim() {
        let label = ColumnLabel::new(" Thanh khoản ", "Quick Ratio\t");
        assert_eq!(label.trimmed(), ColumnLabel::new("Thanh khoản", "Quick Ratio"));
        assert_eq!(label.trimmed().to_string(), "(Thanh khoản, Quick Ratio)");
    }
}

//! Vendor label table
//!
//! The table is a YAML document listing canonical categories with their
//! vendor aliases and, per category, canonical metrics with aliases and a
//! unit. Every `(category alias, metric alias)` combination maps to one
//! canonical column; a table where one vendor pair reaches two different
//! canonical columns is rejected when loaded.
//!
//! ```yaml
//! categories:
//!   - canonical: Liquidity
//!     statement: ratios
//!     aliases: ["Thanh khoản", "Chỉ tiêu thanh khoản"]
//!     metrics:
//!       - canonical: Current
//!         unit: ratio
//!         aliases: ["Current Ratio", "Chỉ số thanh toán hiện thời"]
//! ```

use super::{ColumnLabel, StatementKind};
use crate::error::{AnalystError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Unit tag appended to a flat key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    None,
    Ratio,
    Pct,
    Vnd,
    BillionVnd,
    Million,
    /// Day counts; the metric name already says so
    Days,
}

impl Unit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::None | Self::Days => "",
            Self::Ratio => "_Ratio",
            Self::Pct => "_Pct",
            Self::Vnd => "_VND",
            Self::BillionVnd => "_Billion_VND",
            Self::Million => "_Million",
        }
    }
}

/// Canonical `(category, metric, unit)` triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalLabel {
    pub category: String,
    pub metric: String,
    #[serde(default)]
    pub unit: Unit,
}

impl CanonicalLabel {
    pub fn new(category: impl Into<String>, metric: impl Into<String>, unit: Unit) -> Self {
        Self {
            category: category.into(),
            metric: metric.into(),
            unit,
        }
    }

    /// `Category_Metric` plus the unit suffix, sanitized
    pub fn flat_key(&self) -> String {
        format!(
            "{}_{}{}",
            sanitize(&self.category),
            sanitize(&self.metric),
            self.unit.suffix()
        )
    }

    /// The canonical pair as a column label
    pub fn label(&self) -> ColumnLabel {
        ColumnLabel::new(&self.category, &self.metric)
    }
}

/// Make a canonical name safe for a flat key
///
/// Spaces and hyphens become `_`, `/` becomes `_to_`, `%` becomes `Pct`,
/// parentheses and dots are dropped. Runs of `_` collapse to one.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        match ch {
            ' ' | '-' | '\t' => out.push('_'),
            '/' => out.push_str("_to_"),
            '%' => out.push_str("Pct"),
            '(' | ')' | '.' => {}
            c => out.push(c),
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    for ch in out.chars() {
        if ch == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed.trim_matches('_').to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    categories: Vec<CategoryDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryDef {
    canonical: String,
    statement: StatementKind,
    #[serde(default)]
    aliases: Vec<String>,
    metrics: Vec<MetricDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetricDef {
    canonical: String,
    #[serde(default)]
    unit: Unit,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Debug, Clone)]
struct Entry {
    canonical: CanonicalLabel,
    kind: StatementKind,
}

/// Lookup from trimmed vendor label pairs to canonical columns
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    entries: HashMap<ColumnLabel, Entry>,
    /// Trimmed category spellings to the statement they belong to
    categories: HashMap<String, StatementKind>,
}

const BUILTIN_TABLE: &str = include_str!("../../data/labels.yaml");

impl LabelTable {
    /// The table embedded in the binary
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_TABLE)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalystError::invalid("label table", format!("{}: {e}", path.display()))
        })?;
        let table = Self::from_yaml_str(&text)?;
        debug!(path = %path.display(), entries = table.len(), "Loaded label table");
        Ok(table)
    }

    /// Parse a YAML table; canonical names count as aliases of themselves
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: TableFile = serde_yaml::from_str(text)?;
        let mut table = Self::default();

        for category in file.categories {
            let category_names = with_canonical(&category.canonical, &category.aliases);
            for cat in &category_names {
                table.insert_category(cat, category.statement)?;
            }
            for metric in &category.metrics {
                let canonical =
                    CanonicalLabel::new(category.canonical.trim(), metric.canonical.trim(), metric.unit);
                let metric_names = with_canonical(&metric.canonical, &metric.aliases);
                for cat in &category_names {
                    for name in &metric_names {
                        table.insert(ColumnLabel::new(*cat, *name), canonical.clone(), category.statement)?;
                    }
                }
            }
        }

        Ok(table)
    }

    /// Table mapping each canonical pair to itself
    pub fn from_canonical<I>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = (CanonicalLabel, StatementKind)>,
    {
        let mut table = Self::default();
        for (canonical, kind) in labels {
            table.insert_category(&canonical.category, kind)?;
            table.insert(canonical.label(), canonical, kind)?;
        }
        Ok(table)
    }

    fn insert(
        &mut self,
        label: ColumnLabel,
        canonical: CanonicalLabel,
        kind: StatementKind,
    ) -> Result<()> {
        let label = label.trimmed();
        if let Some(existing) = self.entries.get(&label) {
            if existing.canonical != canonical {
                return Err(AnalystError::invalid(
                    "label table",
                    format!(
                        "{label} maps to both {} and {}",
                        existing.canonical.flat_key(),
                        canonical.flat_key()
                    ),
                ));
            }
            return Ok(());
        }
        self.entries.insert(label, Entry { canonical, kind });
        Ok(())
    }

    fn insert_category(&mut self, name: &str, kind: StatementKind) -> Result<()> {
        let name = name.trim();
        match self.categories.get(name) {
            Some(existing) if *existing != kind => Err(AnalystError::invalid(
                "label table",
                format!("category '{name}' listed under both {existing} and {kind}"),
            )),
            Some(_) => Ok(()),
            None => {
                self.categories.insert(name.to_string(), kind);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, label: &ColumnLabel) -> Option<&CanonicalLabel> {
        self.entries.get(&label.trimmed()).map(|e| &e.canonical)
    }

    /// Statement a vendor label belongs to
    pub fn statement_of(&self, label: &ColumnLabel) -> Option<StatementKind> {
        self.entries.get(&label.trimmed()).map(|e| e.kind)
    }

    /// Statement a vendor category spelling belongs to, whatever the metric
    pub fn statement_of_category(&self, category: &str) -> Option<StatementKind> {
        self.categories.get(category.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn with_canonical<'a>(canonical: &'a str, aliases: &'a [String]) -> Vec<&'a str> {
    let mut names = vec![canonical.trim()];
    for alias in aliases {
        let alias = alias.trim();
        if !names.contains(&alias) {
            names.push(alias);
        }
    }
    names
}

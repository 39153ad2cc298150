//! Markdown rendering of normalized statements

use super::NormalizedStatement;
use comfy_table::Table;
use comfy_table::presets::ASCII_MARKDOWN;

pub const NO_DATA: &str = "No data";

/// Statement as a markdown table: one row per key, one column per period
///
/// `max_periods` keeps only the first (most recent) periods.
pub fn markdown_table(statement: &NormalizedStatement, max_periods: Option<usize>) -> String {
    if statement.is_empty() {
        return NO_DATA.to_string();
    }

    let shown = max_periods
        .unwrap_or(usize::MAX)
        .min(statement.periods().len());

    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN);

    let mut header = Vec::with_capacity(shown + 1);
    header.push("Metric".to_string());
    header.extend(statement.periods().iter().take(shown).cloned());
    table.set_header(header);

    for column in statement.columns() {
        let mut row = Vec::with_capacity(shown + 1);
        row.push(column.key.clone());
        row.extend((0..shown).map(|i| format_value(column.values.get(i).copied().flatten())));
        table.add_row(row);
    }

    table.to_string()
}

/// Most recent period of `statement` as a two-column table
pub fn snapshot_table(statement: &NormalizedStatement) -> String {
    let Some(latest) = statement.periods().first() else {
        return NO_DATA.to_string();
    };
    if statement.columns().is_empty() {
        return NO_DATA.to_string();
    }

    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN);
    table.set_header(vec!["Metric".to_string(), latest.clone()]);
    for column in statement.columns() {
        table.add_row(vec![
            column.key.clone(),
            format_value(column.values.first().copied().flatten()),
        ]);
    }
    table.to_string()
}

/// Two decimals for ratios, grouped integers for money amounts, `-` when missing
fn format_value(value: Option<f64>) -> String {
    let Some(v) = value else {
        return "-".to_string();
    };
    if !v.is_finite() {
        return "-".to_string();
    }
    if v.abs() < 1_000_000.0 {
        return format!("{v:.2}");
    }

    let digits = format!("{:.0}", v.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if v < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

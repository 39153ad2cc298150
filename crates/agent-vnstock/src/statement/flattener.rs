//! Flatten two-level statement columns into single keys, and back

use super::{ColumnLabel, ColumnNormalizer, NormalizedColumn, NormalizedStatement, RawStatement};
use crate::error::{AnalystError, Result};
use std::collections::HashMap;

/// Normalize every column of `raw` into a flat key
///
/// Columns keep their first-seen order and their values untouched. Fails on
/// the first unmapped label, on a column whose length differs from the period
/// count, or when two source columns produce the same key; nothing partial is
/// returned.
pub fn flatten(raw: &RawStatement, normalizer: &ColumnNormalizer) -> Result<NormalizedStatement> {
    let mut seen: HashMap<String, ColumnLabel> = HashMap::with_capacity(raw.columns().len());
    let mut columns = Vec::with_capacity(raw.columns().len());

    for column in raw.columns() {
        if column.values.len() != raw.periods().len() {
            return Err(AnalystError::MalformedStatement(format!(
                "column {} has {} values for {} periods",
                column.label,
                column.values.len(),
                raw.periods().len()
            )));
        }
        let canonical = normalizer.normalize(&column.label)?;
        let key = canonical.flat_key();

        if let Some(first) = seen.get(&key) {
            return Err(AnalystError::NormalizationCollision {
                key,
                first: first.clone(),
                second: column.label.clone(),
            });
        }
        seen.insert(key.clone(), column.label.clone());

        columns.push(NormalizedColumn {
            key,
            canonical,
            source: column.label.clone(),
            values: column.values.clone(),
        });
    }

    Ok(NormalizedStatement::from_parts(
        raw.kind(),
        raw.periods().to_vec(),
        columns,
    ))
}

/// Rebuild the vendor-labelled statement a normalized one came from
///
/// Fails when two columns share a vendor label, which only happens for
/// statements not produced by [`flatten`].
pub fn expand(normalized: &NormalizedStatement) -> Result<RawStatement> {
    let mut raw = RawStatement::new(normalized.kind(), normalized.periods().to_vec());
    for column in normalized.columns() {
        raw.push_column(column.source.clone(), column.values.clone())?;
    }
    Ok(raw)
}

//! Column normalizer: vendor label pair to canonical column

use super::{CanonicalLabel, ColumnLabel, LabelTable, NormalizedStatement};
use crate::error::{AnalystError, Result};
use std::path::Path;
use std::sync::Arc;

/// Maps vendor `(Category, Metric)` labels to canonical columns
///
/// Cheap to clone; the table is shared.
#[derive(Debug, Clone)]
pub struct ColumnNormalizer {
    table: Arc<LabelTable>,
}

impl ColumnNormalizer {
    pub fn new(table: LabelTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Normalizer over the embedded label table
    pub fn builtin() -> Result<Self> {
        LabelTable::builtin().map(Self::new)
    }

    /// Embedded table, or the file at `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => LabelTable::from_path(path).map(Self::new),
            None => Self::builtin(),
        }
    }

    /// Normalizer whose table maps every canonical pair of `statement` to
    /// itself
    pub fn identity_for(statement: &NormalizedStatement) -> Result<Self> {
        let kind = statement.kind();
        LabelTable::from_canonical(
            statement
                .columns()
                .iter()
                .map(|c| (c.canonical.clone(), kind)),
        )
        .map(Self::new)
    }

    /// Canonical column for `label`; unknown labels are an error
    pub fn normalize(&self, label: &ColumnLabel) -> Result<CanonicalLabel> {
        self.table
            .lookup(label)
            .cloned()
            .ok_or_else(|| AnalystError::UnmappedLabel {
                label: label.clone(),
            })
    }

    pub fn knows(&self, label: &ColumnLabel) -> bool {
        self.table.lookup(label).is_some()
    }

    pub fn table(&self) -> &LabelTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Unit;

    #[test]
    fn test_normalize_vietnamese_label() {
        let normalizer = ColumnNormalizer::builtin().unwrap();
        let canonical = normalizer
            .normalize(&ColumnLabel::new("Chỉ tiêu định giá", "P/E"))
            .unwrap();
        assert_eq!(canonical, CanonicalLabel::new("Valuation", "PE", Unit::Ratio));
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let normalizer = ColumnNormalizer::builtin().unwrap();
        let err = normalizer
            .normalize(&ColumnLabel::new("Thanh khoản", "Altman Z"))
            .unwrap_err();
        match err {
            AnalystError::UnmappedLabel { label } => {
                assert_eq!(label, ColumnLabel::new("Thanh khoản", "Altman Z"));
            }
            other => panic!("Expected UnmappedLabel, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.yaml");
        std::fs::write(
            &path,
            "categories:\n  - canonical: Liquidity\n    statement: ratios\n    aliases: [Likviditet]\n    metrics:\n      - canonical: Current\n        unit: ratio\n        aliases: [Current Ratio]\n",
        )
        .unwrap();

        let normalizer = ColumnNormalizer::load(Some(&path)).unwrap();
        assert!(normalizer.knows(&ColumnLabel::new("Likviditet", "Current Ratio")));
        assert!(!normalizer.knows(&ColumnLabel::new("Thanh khoản", "Current Ratio")));

        let missing = ColumnNormalizer::load(Some(&dir.path().join("absent.yaml")));
        assert!(matches!(missing, Err(AnalystError::InvalidDefinition { .. })));
    }
}

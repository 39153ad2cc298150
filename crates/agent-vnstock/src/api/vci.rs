//! Vietcap (VCI) GraphQL client
//!
//! Financial data comes from two GraphQL operations:
//!
//! - `ListFinancialRatio`: the field catalog. Each entry names a field code
//!   (`fieldName`) and its category/metric labels in Vietnamese (`type`,
//!   `name`) and English (`en_Type`, `en_Name`).
//! - `CompanyFinancialRatio`: one row per reporting period holding the
//!   requested field codes.
//!
//! A statement is built by picking the catalog entries whose labels the label
//! table maps to that statement, requesting only those fields, and labelling
//! each column with the vendor pair in the configured language.

use super::{CompanyInfo, SharedRateLimiter, browser_client, per_minute_limiter, send_json};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::{AnalystConfig, ReportPeriod};
use crate::error::{AnalystError, Result};
use crate::statement::{ColumnLabel, ColumnNormalizer, RawStatement, StatementKind};
use agent_prompt::Language;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::{debug, instrument};

const GRAPHQL_URL: &str = "https://trading.vietcap.com.vn/data-mt/graphql";
const LISTING_URL: &str = "https://trading.vietcap.com.vn/api/price/symbols/getAll";
const REFERER: &str = "https://trading.vietcap.com.vn/";
const ORIGIN: &str = "https://trading.vietcap.com.vn";
const REQUESTS_PER_MINUTE: u32 = 30;

const CATALOG_QUERY: &str = "query Query { ListFinancialRatio { id type name unit isDefault fieldName en_Type en_Name tagName comTypeCode order __typename } }";

const COMPANY_QUERY: &str = "query Query($ticker: String!, $lang: String!) { CompanyListingInfo(ticker: $ticker) { id icbName3 enIcbName3 companyProfile __typename } }";

/// Field catalog entry
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CatalogEntry {
    #[serde(rename = "fieldName")]
    field_name: String,
    #[serde(rename = "type", default)]
    category_vi: Option<String>,
    #[serde(rename = "name", default)]
    metric_vi: Option<String>,
    #[serde(rename = "en_Type", default)]
    category_en: Option<String>,
    #[serde(rename = "en_Name", default)]
    metric_en: Option<String>,
}

impl CatalogEntry {
    /// Label pair in `language`; English falls back to Vietnamese when the
    /// catalog has no translation
    fn label(&self, language: &Language) -> Option<ColumnLabel> {
        let vi = || Some(ColumnLabel::new(self.category_vi.clone()?, self.metric_vi.clone()?));
        match language {
            Language::Vietnamese => vi(),
            Language::English => match (&self.category_en, &self.metric_en) {
                (Some(category), Some(metric)) => Some(ColumnLabel::new(category, metric)),
                _ => vi(),
            },
        }
    }
}

/// VCI client for statements and company listings
pub struct VciClient {
    client: Client,
    rate_limiter: SharedRateLimiter,
    cache: ResponseCache,
    normalizer: ColumnNormalizer,
    language: Language,
    period: ReportPeriod,
    api_key: Option<String>,
}

impl VciClient {
    /// Client requesting only fields `normalizer` can map
    pub fn new(config: &AnalystConfig, normalizer: ColumnNormalizer) -> Result<Self> {
        Ok(Self {
            client: browser_client(REFERER, ORIGIN, config.request_timeout)?,
            rate_limiter: per_minute_limiter(REQUESTS_PER_MINUTE),
            cache: ResponseCache::default(),
            normalizer,
            language: config.language,
            period: config.period,
            api_key: config.vnstock_api_key.clone(),
        })
    }

    async fn graphql(&self, query: &str, variables: Value) -> std::result::Result<Value, String> {
        let payload = json!({ "query": query, "variables": variables });
        let body = send_json("vci", &self.rate_limiter, || {
            let request = self.client.post(GRAPHQL_URL).json(&payload);
            match &self.api_key {
                Some(key) => request.bearer_auth(key),
                None => request,
            }
        })
        .await?;

        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            return Err(format!("GraphQL errors: {errors}"));
        }
        body.get("data")
            .cloned()
            .filter(|d| !d.is_null())
            .ok_or_else(|| "response has no data".to_string())
    }

    async fn catalog(&self) -> std::result::Result<Vec<CatalogEntry>, String> {
        let key = CacheKey::new("vci", "ListFinancialRatio", json!({}));
        let data = self
            .cache
            .get_or_fetch(key, || self.graphql(CATALOG_QUERY, json!({})))
            .await?;
        parse_catalog(&data)
    }

    /// One statement of the configured period
    #[instrument(skip(self), fields(period = %self.period))]
    pub async fn statement(&self, symbol: &str, kind: StatementKind) -> Result<RawStatement> {
        let unavailable = |reason: String| AnalystError::unavailable(symbol, kind, reason);

        let catalog = self.catalog().await.map_err(unavailable)?;
        let selected = select_fields(&catalog, &self.normalizer, &self.language, kind);
        if selected.is_empty() {
            return Err(unavailable(format!("no catalog field maps to {kind}")));
        }
        debug!(fields = selected.len(), "Selected catalog fields");

        let fields: Vec<&str> = selected.iter().map(|(field, _)| field.as_str()).collect();
        let data = self
            .graphql(
                &statement_query(&fields),
                json!({
                    "ticker": symbol.to_uppercase(),
                    "period": match self.period {
                        ReportPeriod::Year => "Y",
                        ReportPeriod::Quarter => "Q",
                    },
                }),
            )
            .await
            .map_err(unavailable)?;

        let rows = data
            .pointer("/CompanyFinancialRatio/ratio")
            .and_then(Value::as_array)
            .filter(|rows| !rows.is_empty())
            .ok_or_else(|| unavailable("empty response".to_string()))?;

        build_statement(kind, self.period, rows, &selected)
    }

    /// Company name from the symbol listing, industry from the listing info
    #[instrument(skip(self))]
    pub async fn company(&self, symbol: &str) -> Result<CompanyInfo> {
        let symbol = symbol.to_uppercase();
        let unavailable = |reason: String| AnalystError::unavailable(&symbol, "company", reason);

        let listing_key = CacheKey::new("vci", "symbols/getAll", json!({}));
        let listing = self
            .cache
            .get_or_fetch(listing_key, || {
                send_json("vci", &self.rate_limiter, || self.client.get(LISTING_URL))
            })
            .await
            .map_err(unavailable)?;

        let info = self
            .graphql(
                COMPANY_QUERY,
                json!({ "ticker": symbol, "lang": self.language.code() }),
            )
            .await
            .map_err(unavailable)?;

        company_from_parts(&symbol, &listing, &info, &self.language)
            .ok_or_else(|| unavailable("symbol not found in listing".to_string()))
    }
}

fn parse_catalog(data: &Value) -> std::result::Result<Vec<CatalogEntry>, String> {
    let entries = data
        .get("ListFinancialRatio")
        .cloned()
        .ok_or_else(|| "catalog missing ListFinancialRatio".to_string())?;
    serde_json::from_value(entries).map_err(|e| format!("unreadable catalog: {e}"))
}

/// Catalog fields whose category belongs to `kind`, as `(field code, label)`
///
/// Selection goes by category only, so a metric missing from the label table
/// is still fetched and then rejected by normalization.
fn select_fields(
    catalog: &[CatalogEntry],
    normalizer: &ColumnNormalizer,
    language: &Language,
    kind: StatementKind,
) -> Vec<(String, ColumnLabel)> {
    let mut seen_fields = HashSet::new();
    let mut seen_labels = HashSet::new();
    let mut selected = Vec::new();

    for entry in catalog {
        let Some(label) = entry.label(language) else {
            continue;
        };
        match normalizer.table().statement_of_category(&label.category) {
            Some(owner) if owner == kind => {}
            Some(_) => continue,
            None => {
                debug!(field = %entry.field_name, %label, "Skipping catalog entry in unknown category");
                continue;
            }
        }
        if !seen_fields.insert(entry.field_name.clone()) || !seen_labels.insert(label.trimmed()) {
            debug!(field = %entry.field_name, %label, "Skipping repeated catalog entry");
            continue;
        }
        selected.push((entry.field_name.clone(), label));
    }
    selected
}

fn statement_query(fields: &[&str]) -> String {
    format!(
        "query Query($ticker: String!, $period: String!) {{ CompanyFinancialRatio(ticker: $ticker, period: $period) {{ ratio {{ ticker yearReport lengthReport {} __typename }} period __typename }} }}",
        fields.join(" ")
    )
}

/// Period label: `2023` for yearly rows, `2023-Q3` for quarterly ones
fn period_label(period: ReportPeriod, year: i64, length: i64) -> String {
    match period {
        ReportPeriod::Year => year.to_string(),
        ReportPeriod::Quarter => format!("{year}-Q{length}"),
    }
}

fn build_statement(
    kind: StatementKind,
    period: ReportPeriod,
    rows: &[Value],
    selected: &[(String, ColumnLabel)],
) -> Result<RawStatement> {
    let mut rows: Vec<&Value> = rows.iter().collect();
    let sort_key = |row: &Value| {
        (
            row.get("yearReport").and_then(Value::as_i64).unwrap_or_default(),
            row.get("lengthReport").and_then(Value::as_i64).unwrap_or_default(),
        )
    };
    rows.sort_by_key(|row| std::cmp::Reverse(sort_key(*row)));

    let periods = rows
        .iter()
        .map(|row| {
            let (year, length) = sort_key(*row);
            period_label(period, year, length)
        })
        .collect();

    let mut statement = RawStatement::new(kind, periods);
    for (field, label) in selected {
        let values = rows
            .iter()
            .map(|row| row.get(field).and_then(Value::as_f64))
            .collect();
        statement.push_column(label.clone(), values)?;
    }
    Ok(statement)
}

fn company_from_parts(
    symbol: &str,
    listing: &Value,
    info: &Value,
    language: &Language,
) -> Option<CompanyInfo> {
    let entry = listing
        .as_array()?
        .iter()
        .find(|e| e.get("symbol").and_then(Value::as_str) == Some(symbol))?;

    let text = |value: &Value, keys: &[&str]| -> String {
        keys.iter()
            .find_map(|k| value.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string()
    };

    let (name_keys, industry_keys): (&[&str], &[&str]) = match language {
        Language::Vietnamese => (&["organName", "enOrganName"], &["icbName3", "enIcbName3"]),
        Language::English => (&["enOrganName", "organName"], &["enIcbName3", "icbName3"]),
    };

    let name = text(entry, name_keys);
    let industry = info
        .get("CompanyListingInfo")
        .map(|listing| text(listing, industry_keys))
        .unwrap_or_default();

    Some(CompanyInfo {
        symbol: symbol.to_string(),
        name: if name.is_empty() { symbol.to_string() } else { name },
        industry,
    })
}

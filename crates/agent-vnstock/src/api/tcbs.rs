//! TCBS client for dividend payment history

use super::{SharedRateLimiter, browser_client, per_minute_limiter, send_json};
use crate::error::{AnalystError, Result};
use crate::statement::{ColumnLabel, RawStatement, StatementKind};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://apipubaws.tcbs.com.vn";
const REFERER: &str = "https://www.tcbs.com.vn/";
const ORIGIN: &str = "https://www.tcbs.com.vn";
const REQUESTS_PER_MINUTE: u32 = 30;
const PAGE_SIZE: &str = "20";

/// Vendor category used for dividend columns
const CATEGORY: &str = "dividends";

#[derive(Debug, Deserialize)]
struct DividendHistory {
    #[serde(rename = "listDividendPaymentHis", default)]
    payments: Vec<DividendPayment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DividendPayment {
    exercise_date: String,
    #[serde(default)]
    cash_year: Option<f64>,
    #[serde(default)]
    cash_dividend_percentage: Option<f64>,
}

/// TCBS public analysis API client
pub struct TcbsClient {
    client: Client,
    rate_limiter: SharedRateLimiter,
}

impl TcbsClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: browser_client(REFERER, ORIGIN, timeout)?,
            rate_limiter: per_minute_limiter(REQUESTS_PER_MINUTE),
        })
    }

    /// Cash dividend history indexed by exercise date
    ///
    /// A company that never paid a dividend yields an empty statement.
    #[instrument(skip(self))]
    pub async fn dividends(&self, symbol: &str) -> Result<RawStatement> {
        let url = format!(
            "{BASE_URL}/tcanalysis/v1/company/{}/dividend-payment-histories",
            symbol.to_uppercase()
        );

        let body = send_json("tcbs", &self.rate_limiter, || {
            self.client
                .get(&url)
                .query(&[("page", "0"), ("size", PAGE_SIZE)])
        })
        .await
        .map_err(|reason| AnalystError::unavailable(symbol, StatementKind::Dividends, reason))?;

        let history: DividendHistory = serde_json::from_value(body).map_err(|e| {
            AnalystError::unavailable(symbol, StatementKind::Dividends, format!("unreadable response: {e}"))
        })?;
        debug!(payments = history.payments.len(), "Fetched dividend history");

        dividend_statement(history.payments)
    }
}

fn dividend_statement(payments: Vec<DividendPayment>) -> Result<RawStatement> {
    let periods = payments.iter().map(|p| p.exercise_date.clone()).collect();
    let (years, percentages) = payments
        .iter()
        .map(|p| (p.cash_year, p.cash_dividend_percentage))
        .unzip();

    let mut statement = RawStatement::new(StatementKind::Dividends, periods);
    statement.push_column(ColumnLabel::new(CATEGORY, "cashYear"), years)?;
    statement.push_column(ColumnLabel::new(CATEGORY, "cashDividendPercentage"), percentages)?;
    Ok(statement)
}

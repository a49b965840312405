//! Thin client for the data-fetching backend: ledger download and
//! price-history queries. Request/response only, no retry, no backoff;
//! callers log failures and keep whatever they already had.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::info;

use crate::ledger;
use crate::types::TransactionRecord;

pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct DailyClose {
    pub datetime: String,
    pub close: f64,
}

/// Daily closes for the requested window plus the option legs that overlap
/// it.
#[derive(Debug)]
pub struct StockWindowData {
    pub closes: Vec<DailyClose>,
    pub option_legs: Vec<TransactionRecord>,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// POST credentials + date range, get ledger rows back.
    pub async fn fetch_ledger(
        &self,
        username: &str,
        password: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<TransactionRecord>> {
        let resp = self
            .http
            .post(format!("{}/api/fetch-data", self.base_url))
            .json(&json!({
                "username": username,
                "password": password,
                "startDate": start_date,
                "endDate": end_date,
            }))
            .send()
            .await
            .context("fetch-data request failed")?;
        let body = resp.text().await.context("fetch-data body unreadable")?;
        let records = ledger::parse_remote_payload(&body)?;
        info!("Fetched {} ledger rows from backend", records.len());
        Ok(records)
    }

    /// POST ticker + window, get the daily-close series and overlapping
    /// option legs.
    pub async fn fetch_stock_data(
        &self,
        username: &str,
        password: &str,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<StockWindowData> {
        let resp = self
            .http
            .post(format!("{}/api/stock-data", self.base_url))
            .json(&json!({
                "username": username,
                "password": password,
                "ticker": ticker,
                "startDate": start.format("%Y-%m-%d").to_string(),
                "endDate": end.format("%Y-%m-%d").to_string(),
            }))
            .send()
            .await
            .context("stock-data request failed")?;
        let v: Value = resp.json().await.context("stock-data response is not JSON")?;

        let closes = v
            .get("stockData")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|it| {
                        let datetime = it
                            .get("Datetime")
                            .or_else(|| it.get("datetime"))
                            .and_then(Value::as_str)?
                            .to_string();
                        let close = it
                            .get("Close")
                            .or_else(|| it.get("close"))
                            .and_then(Value::as_f64)?;
                        Some(DailyClose { datetime, close })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let option_legs = v
            .get("optionData")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(ledger::record_from_value).collect())
            .unwrap_or_default();

        Ok(StockWindowData {
            closes,
            option_legs,
        })
    }
}

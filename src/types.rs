//! Core domain types for ledger records, decoded contracts and positions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Transaction code column of the ledger. Codes outside the known set are
/// carried through untouched so downstream filters can still see them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransCode {
    BTO,
    STC,
    OEXP,
    Buy,
    Sell,
    Other(String),
}

impl TransCode {
    pub fn parse(s: &str) -> Option<TransCode> {
        let t = s.trim();
        if t.is_empty() {
            return None;
        }
        Some(match t {
            "BTO" => TransCode::BTO,
            "STC" => TransCode::STC,
            "OEXP" => TransCode::OEXP,
            "Buy" | "buy" => TransCode::Buy,
            "Sell" | "sell" => TransCode::Sell,
            other => TransCode::Other(other.to_string()),
        })
    }
}

/// Currency cell as it arrives from the ledger: the file path always yields
/// text (possibly parenthesized accounting negatives), the remote path may
/// yield plain numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

/// One row of the ledger, the only source of truth for aggregation.
/// Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub activity_date: Option<NaiveDate>,
    /// Activity date exactly as printed in the ledger; series labels use it.
    pub activity_date_raw: String,
    pub process_date: Option<NaiveDate>,
    pub settle_date: Option<NaiveDate>,
    pub instrument: String,
    pub description: String,
    pub trans_code: Option<TransCode>,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub amount: Option<RawAmount>,
}

/// Contract identity pulled out of a free-text description. Tokens are kept
/// as matched (case included) because the contract key is built from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedDescription {
    pub instrument: String,
    pub expiry: String,
    pub option_type: String,
    pub strike: String,
}

impl DecodedDescription {
    /// `instrument_expiry_type_strike`, the identity legs aggregate under.
    pub fn contract_key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.instrument, self.expiry, self.option_type, self.strike
        )
    }
}

/// One aggregated contract. Created on the first leg seen for its key,
/// mutated by every later leg sharing it; lives for a single pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub instrument: String,
    pub expiry: String,
    #[serde(rename = "type")]
    pub option_type: String,
    pub strike: String,
    pub buy_quantity: f64,
    pub sell_quantity: f64,
    pub buy_amount: f64,
    pub sell_amount: f64,
    pub pl: f64,
    pub revenue: f64,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

impl Position {
    pub fn open(decoded: &DecodedDescription) -> Self {
        Self {
            instrument: decoded.instrument.clone(),
            expiry: decoded.expiry.clone(),
            option_type: decoded.option_type.clone(),
            strike: decoded.strike.clone(),
            buy_quantity: 0.0,
            sell_quantity: 0.0,
            buy_amount: 0.0,
            sell_amount: 0.0,
            pl: 0.0,
            revenue: 0.0,
            open_date: None,
            close_date: None,
            expiry_date: None,
        }
    }
}

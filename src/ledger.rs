//! Ledger ingestion. The delimited-file and remote-JSON paths both converge
//! on `Vec<TransactionRecord>`; the shared currency normalization rule lives
//! here too.

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::fs;
use tracing::warn;

use crate::types::{RawAmount, TransCode, TransactionRecord};
use crate::utils::parse_ledger_date;

/// Cross-cutting currency rule: textual values keep only digits, `.` and
/// `-`, then parse; parenthesized accounting negatives flip the sign.
/// Numbers pass through untouched. Every consumer of an amount goes through
/// here.
pub fn normalize_amount(raw: &RawAmount) -> f64 {
    match raw {
        RawAmount::Number(n) => *n,
        RawAmount::Text(s) => {
            let digits = Regex::new(r"[^0-9.\-]").unwrap().replace_all(s, "");
            let value: f64 = digits.parse().unwrap_or(0.0);
            if s.trim_start().starts_with('(') {
                -value
            } else {
                value
            }
        }
    }
}

pub fn load_csv_file(path: &str) -> Result<Vec<TransactionRecord>> {
    let text = fs::read_to_string(path).with_context(|| format!("read ledger file {path}"))?;
    parse_csv(&text)
}

/// Parse a delimited ledger blob into one record per line after the header.
/// Quoted fields may contain the delimiter; a header with no matching value
/// becomes an empty string. No row is dropped here; filtering is the
/// aggregator's job.
pub fn parse_csv(text: &str) -> Result<Vec<TransactionRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("ledger has no header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut out = Vec::new();
    for row in reader.records() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("Unreadable ledger line: {e}");
                continue;
            }
        };
        let field = |name: &str| -> String {
            headers
                .iter()
                .position(|h| h.as_str() == name)
                .and_then(|i| row.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        // The currency column sheds quote and group characters before any
        // numeric use; sign markers stay.
        let amount_text = field("Amount").replace('"', "").replace(',', "");
        let activity_raw = field("Activity Date");

        out.push(TransactionRecord {
            activity_date: parse_ledger_date(&activity_raw),
            activity_date_raw: activity_raw,
            process_date: parse_ledger_date(&field("Process Date")),
            settle_date: parse_ledger_date(&field("Settle Date")),
            instrument: field("Instrument"),
            description: field("Description"),
            trans_code: TransCode::parse(&field("Trans Code")),
            quantity: parse_optional_number(&field("Quantity")),
            price: parse_optional_number(&field("Price")),
            amount: if amount_text.is_empty() {
                None
            } else {
                Some(RawAmount::Text(amount_text))
            },
        });
    }
    Ok(out)
}

fn parse_optional_number(s: &str) -> Option<f64> {
    let t = s.trim().trim_start_matches('$');
    if t.is_empty() {
        return None;
    }
    t.parse().ok()
}

/// Parse the remote ledger payload. The backend sometimes wraps the row
/// array in a JSON string and uses the literal token `NaN` for missing
/// numerics; those are rewritten to `null` before structural parsing.
pub fn parse_remote_payload(body: &str) -> Result<Vec<TransactionRecord>> {
    let cleaned = body.replace("NaN", "null");
    let value: Value = serde_json::from_str(&cleaned).context("ledger payload is not JSON")?;
    let value = match value {
        Value::String(inner) => {
            serde_json::from_str(&inner).context("string-wrapped ledger payload is not JSON")?
        }
        v => v,
    };
    let rows = value
        .as_array()
        .context("ledger payload is not an array")?;
    Ok(rows.iter().map(record_from_value).collect())
}

/// Build a record from one loosely-typed JSON row, probing a couple of key
/// aliases per column.
pub(crate) fn record_from_value(v: &Value) -> TransactionRecord {
    let text = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|k| v.get(*k))
            .map(|x| match x {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => String::new(),
            })
            .unwrap_or_default()
    };
    let number = |keys: &[&str]| -> Option<f64> {
        keys.iter().find_map(|k| v.get(*k)).and_then(|x| match x {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_start_matches('$').parse().ok(),
            _ => None,
        })
    };
    // pandas serializes datetime columns as epoch milliseconds.
    let date = |keys: &[&str]| -> (Option<chrono::NaiveDate>, String) {
        for k in keys {
            match v.get(*k) {
                Some(Value::String(s)) => return (parse_ledger_date(s), s.trim().to_string()),
                Some(Value::Number(n)) => {
                    let parsed = n
                        .as_i64()
                        .and_then(chrono::DateTime::from_timestamp_millis)
                        .map(|dt| dt.date_naive());
                    let raw = parsed
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| n.to_string());
                    return (parsed, raw);
                }
                _ => {}
            }
        }
        (None, String::new())
    };

    let (activity_date, activity_date_raw) = date(&["Activity Date", "activityDate"]);
    let (process_date, _) = date(&["Process Date", "processDate"]);
    let (settle_date, _) = date(&["Settle Date", "settleDate"]);
    let amount = v
        .get("Amount")
        .or_else(|| v.get("amount"))
        .and_then(|x| match x {
            Value::Number(n) => n.as_f64().map(RawAmount::Number),
            Value::String(s) => Some(RawAmount::Text(s.replace('"', "").replace(',', ""))),
            _ => None,
        });

    TransactionRecord {
        activity_date,
        activity_date_raw,
        process_date,
        settle_date,
        instrument: text(&["Instrument", "instrument"]),
        description: text(&["Description", "description"]),
        trans_code: TransCode::parse(&text(&["Trans Code", "transCode"])),
        quantity: number(&["Quantity", "quantity"]),
        price: number(&["Price", "price"]),
        amount,
    }
}

/// The user-adjustable active range. Indices clamp to the record count and
/// to each other so a stale window never panics.
pub fn active_slice(
    records: &[TransactionRecord],
    start: Option<usize>,
    end: Option<usize>,
) -> &[TransactionRecord] {
    let end = end.unwrap_or(records.len()).min(records.len());
    let start = start.unwrap_or(0).min(end);
    &records[start..end]
}

//! Position aggregation: fold a record slice into per-contract positions
//! with realized P/L. A fresh map is built on every pass and no state
//! survives between runs, so re-running over the same slice is always
//! bit-identical.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

use crate::ledger::normalize_amount;
use crate::parser::parse_description;
use crate::types::{Position, TransCode, TransactionRecord};

/// Why a record was excluded from aggregation. Skips are deterministic and
/// silent: logged, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing instrument")]
    MissingInstrument,
    #[error("missing description")]
    MissingDescription,
    #[error("missing trans code")]
    MissingTransCode,
    #[error("amount missing or zero")]
    ZeroAmount,
    #[error("missing quantity")]
    MissingQuantity,
    #[error("description did not decode to a contract")]
    UndecodableDescription,
}

/// Per-record fold result.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Applied { key: String },
    Rejected { reason: RejectReason },
}

#[derive(Debug)]
pub struct AggregationOutcome {
    /// Contract key -> position. A `BTreeMap` keeps every derived view
    /// deterministic across runs.
    pub positions: BTreeMap<String, Position>,
    /// One outcome per input record, in input order.
    pub outcomes: Vec<RecordOutcome>,
}

/// Fold the slice into positions. One bad record never poisons the map;
/// it is skipped with a reason and the fold moves on.
pub fn aggregate(records: &[TransactionRecord]) -> AggregationOutcome {
    let mut positions = BTreeMap::new();
    let mut outcomes = Vec::with_capacity(records.len());
    for record in records {
        let outcome = apply(&mut positions, record);
        if let RecordOutcome::Rejected { reason } = &outcome {
            warn!(
                "Skipping ledger row ({reason}): {} {}",
                record.instrument, record.description
            );
        }
        outcomes.push(outcome);
    }
    AggregationOutcome {
        positions,
        outcomes,
    }
}

fn apply(positions: &mut BTreeMap<String, Position>, record: &TransactionRecord) -> RecordOutcome {
    if record.instrument.is_empty() {
        return rejected(RejectReason::MissingInstrument);
    }
    if record.description.is_empty() {
        return rejected(RejectReason::MissingDescription);
    }
    let Some(code) = &record.trans_code else {
        return rejected(RejectReason::MissingTransCode);
    };
    let amount = match &record.amount {
        Some(raw) => normalize_amount(raw),
        None => 0.0,
    };
    if amount == 0.0 {
        return rejected(RejectReason::ZeroAmount);
    }
    let Some(quantity) = record.quantity else {
        return rejected(RejectReason::MissingQuantity);
    };
    let Some(decoded) = parse_description(&record.description) else {
        return rejected(RejectReason::UndecodableDescription);
    };

    let key = decoded.contract_key();
    let pos = positions
        .entry(key.clone())
        .or_insert_with(|| Position::open(&decoded));

    // Leg accumulators carry the premium magnitude; whether a buy was
    // printed as `($500.00)` or `-500` is an encoding detail, and P/L is
    // closing proceeds minus opening cost either way.
    let premium = amount.abs();

    match code {
        TransCode::BTO => {
            pos.buy_quantity += quantity;
            pos.buy_amount += premium;
            pos.open_date = match (pos.open_date, record.activity_date) {
                (Some(open), Some(d)) => Some(open.min(d)),
                (None, d) => d,
                (open, None) => open,
            };
        }
        TransCode::STC => {
            pos.sell_quantity += quantity;
            pos.sell_amount += premium;
            pos.revenue = pos.sell_amount;
            pos.close_date = match (pos.close_date, record.activity_date) {
                (Some(close), Some(d)) => Some(close.max(d)),
                (None, d) => d,
                (close, None) => close,
            };
        }
        _ => {}
    }

    // Expiration closes the whole position at zero proceeds. The branch is
    // unconditional; if several expiration-like rows share the key, the
    // last one wins. Substring matching on "exp" can false-positive on
    // tickers containing it; that behavior is intentional and tested.
    let expired = *code == TransCode::OEXP || record.description.to_lowercase().contains("exp");
    if expired {
        pos.sell_amount = 0.0;
        pos.sell_quantity = pos.buy_quantity;
        pos.pl = -pos.buy_amount;
        pos.revenue = 0.0;
        pos.expiry_date = record.process_date;
    }

    // Corrupt accumulators must not leak into a P/L figure.
    if pos.sell_amount.is_nan() || pos.buy_amount.is_nan() {
        pos.pl = 0.0;
    } else {
        pos.pl = pos.sell_amount - pos.buy_amount;
    }

    // When a position closes in profit, surface the type that drove the
    // gain. Under clean data the type is constant per key anyway; this
    // guards ledgers that duplicate a key across two recorded types.
    if pos.pl > 0.0 {
        pos.option_type = decoded.option_type.clone();
    }

    RecordOutcome::Applied { key }
}

fn rejected(reason: RejectReason) -> RecordOutcome {
    RecordOutcome::Rejected { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawAmount;
    use crate::utils::parse_ledger_date;
    use chrono::NaiveDate;

    fn rec(code: &str, desc: &str, qty: f64, amount: &str, activity: &str) -> TransactionRecord {
        TransactionRecord {
            activity_date: parse_ledger_date(activity),
            activity_date_raw: activity.to_string(),
            process_date: parse_ledger_date(activity),
            settle_date: None,
            instrument: desc.split_whitespace().next().unwrap_or("").to_string(),
            description: desc.to_string(),
            trans_code: TransCode::parse(code),
            quantity: Some(qty),
            price: None,
            amount: if amount.is_empty() {
                None
            } else {
                Some(RawAmount::Text(amount.to_string()))
            },
        }
    }

    fn only_position(outcome: &AggregationOutcome) -> &Position {
        assert_eq!(outcome.positions.len(), 1, "expected exactly one position");
        outcome.positions.values().next().unwrap()
    }

    const CALL_150: &str = "AAPL 01/19/2024 Call $150.00";

    #[test]
    fn buy_then_sell_realizes_pl() {
        let records = vec![
            rec("BTO", CALL_150, 1.0, "($500.00)", "1/2/2024"),
            rec("STC", CALL_150, 1.0, "$650.00", "1/10/2024"),
        ];
        let out = aggregate(&records);
        let p = only_position(&out);
        assert_eq!(p.pl, 150.0);
        assert_eq!(p.revenue, 650.0);
        assert_eq!(p.buy_quantity, 1.0);
        assert_eq!(p.sell_quantity, 1.0);
        assert_eq!(
            p.open_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        );
        assert_eq!(
            p.close_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
        );
    }

    #[test]
    fn pl_is_order_independent() {
        let forward = vec![
            rec("BTO", CALL_150, 1.0, "($500.00)", "1/2/2024"),
            rec("STC", CALL_150, 1.0, "$650.00", "1/10/2024"),
        ];
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();
        let a = aggregate(&forward);
        let b = aggregate(&reversed);
        assert_eq!(only_position(&a).pl, only_position(&b).pl);
        assert_eq!(only_position(&a).open_date, only_position(&b).open_date);
        assert_eq!(only_position(&a).close_date, only_position(&b).close_date);
    }

    #[test]
    fn expiration_zeroes_proceeds() {
        let records = vec![
            rec("BTO", CALL_150, 1.0, "($300.00)", "1/2/2024"),
            rec("OEXP", CALL_150, 1.0, "$1.00", "1/19/2024"),
        ];
        let out = aggregate(&records);
        let p = only_position(&out);
        assert_eq!(p.pl, -300.0);
        assert_eq!(p.revenue, 0.0);
        assert_eq!(p.sell_quantity, p.buy_quantity);
        assert_eq!(
            p.expiry_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 19).unwrap())
        );
    }

    #[test]
    fn exp_substring_in_description_counts_as_expiration() {
        // The match is a plain substring check, so a ticker like EXPE
        // trips it even on a buy. Deliberate, if surprising.
        let records = vec![rec(
            "BTO",
            "EXPE 01/19/2024 Call $95.00",
            1.0,
            "($95.00)",
            "1/2/2024",
        )];
        let out = aggregate(&records);
        let p = only_position(&out);
        assert_eq!(p.pl, -95.0);
        assert_eq!(p.revenue, 0.0);
        assert!(p.expiry_date.is_some());
    }

    #[test]
    fn later_close_recomputes_after_expiration() {
        // A sell that lands after an expiration-like row reopens the
        // normal P/L arithmetic for the key.
        let records = vec![
            rec("BTO", CALL_150, 1.0, "($500.00)", "1/2/2024"),
            rec("OEXP", CALL_150, 1.0, "$1.00", "1/19/2024"),
            rec("STC", CALL_150, 1.0, "$650.00", "1/20/2024"),
        ];
        let out = aggregate(&records);
        let p = only_position(&out);
        assert_eq!(p.pl, 150.0);
        assert_eq!(p.revenue, 650.0);
    }

    #[test]
    fn zero_amount_rows_are_rejected() {
        // Even an otherwise-valid leg is dropped on a zero amount; real
        // OEXP rows often print $0.00 and fall out here.
        let records = vec![
            rec("BTO", CALL_150, 1.0, "$0.00", "1/2/2024"),
            rec("STC", CALL_150, 1.0, "", "1/10/2024"),
        ];
        let out = aggregate(&records);
        assert!(out.positions.is_empty());
        assert_eq!(
            out.outcomes,
            vec![
                RecordOutcome::Rejected {
                    reason: RejectReason::ZeroAmount
                },
                RecordOutcome::Rejected {
                    reason: RejectReason::ZeroAmount
                },
            ]
        );
    }

    #[test]
    fn missing_fields_are_rejected_with_reasons() {
        let mut no_code = rec("", CALL_150, 1.0, "$10.00", "1/2/2024");
        no_code.trans_code = None;
        let mut no_qty = rec("BTO", CALL_150, 1.0, "$10.00", "1/2/2024");
        no_qty.quantity = None;
        let undecodable = rec("BTO", "AAPL something else", 1.0, "$10.00", "1/2/2024");
        let mut no_instrument = rec("BTO", CALL_150, 1.0, "$10.00", "1/2/2024");
        no_instrument.instrument = String::new();

        let out = aggregate(&[no_code, no_qty, undecodable, no_instrument]);
        assert!(out.positions.is_empty());
        let reasons: Vec<_> = out
            .outcomes
            .iter()
            .map(|o| match o {
                RecordOutcome::Rejected { reason } => reason.clone(),
                other => panic!("expected rejection, got {other:?}"),
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::MissingTransCode,
                RejectReason::MissingQuantity,
                RejectReason::UndecodableDescription,
                RejectReason::MissingInstrument,
            ]
        );
    }

    #[test]
    fn unknown_codes_do_not_move_quantities() {
        let records = vec![
            rec("BTO", CALL_150, 1.0, "($500.00)", "1/2/2024"),
            rec("ACH", CALL_150, 3.0, "$999.00", "1/5/2024"),
        ];
        let out = aggregate(&records);
        let p = only_position(&out);
        assert_eq!(p.buy_quantity, 1.0);
        assert_eq!(p.sell_quantity, 0.0);
        assert_eq!(p.buy_amount, 500.0);
        // The row still resolved to the key, it just carried no leg.
        assert_eq!(
            out.outcomes[1],
            RecordOutcome::Applied {
                key: "AAPL_01/19/2024_Call_150.00".to_string()
            }
        );
    }

    #[test]
    fn profitable_close_overwrites_type() {
        // The closing leg's recorded type token is what a profitable
        // position reports.
        let records = vec![
            rec("BTO", "AAPL 01/19/2024 Call $150.00", 1.0, "($100.00)", "1/2/2024"),
            rec("STC", "AAPL 01/19/2024 Call $150.00", 1.0, "$400.00", "1/9/2024"),
        ];
        let out = aggregate(&records);
        let p = only_position(&out);
        assert!(p.pl > 0.0);
        assert_eq!(p.option_type, "Call");
    }

    #[test]
    fn negative_encodings_agree() {
        // Parenthesized, leading-minus and plain-number buys all cost the
        // same; P/L must not depend on the encoding.
        let sell = rec("STC", CALL_150, 1.0, "$650.00", "1/10/2024");
        let paren = rec("BTO", CALL_150, 1.0, "($500.00)", "1/2/2024");
        let minus = rec("BTO", CALL_150, 1.0, "-$500.00", "1/2/2024");
        let mut numeric = rec("BTO", CALL_150, 1.0, "", "1/2/2024");
        numeric.amount = Some(RawAmount::Number(-500.0));

        let a = aggregate(&[paren, sell.clone()]);
        let b = aggregate(&[minus, sell.clone()]);
        let c = aggregate(&[numeric, sell]);
        assert_eq!(only_position(&a).pl, 150.0);
        assert_eq!(only_position(&a), only_position(&b));
        assert_eq!(only_position(&a), only_position(&c));
    }

    #[test]
    fn rerunning_the_fold_is_idempotent() {
        let records = vec![
            rec("BTO", CALL_150, 1.0, "($500.00)", "1/2/2024"),
            rec("STC", CALL_150, 1.0, "$650.00", "1/10/2024"),
            rec("BTO", "TSLA 2024-09-20 Put 200.00", 2.0, "($800.00)", "2/1/2024"),
        ];
        let a = aggregate(&records);
        let b = aggregate(&records);
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.outcomes, b.outcomes);
    }
}

//! Derived statistics over an aggregated record slice. Everything here is a
//! pure function of the slice: the host calls [`recompute`] whenever the
//! active range changes and swaps the whole result.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::ledger::normalize_amount;
use crate::positions;
use crate::types::{Position, TransactionRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentPl {
    pub instrument: String,
    pub pl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentRevenue {
    pub instrument: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeBreakdown {
    /// Sum of absolute P/L across positions of this type.
    pub pl: f64,
    /// 1 when the representative position's P/L is non-negative, else -1.
    /// The representative is the last position of the type in key order.
    pub sign: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionAmount {
    /// `<activity date> - <instrument>`, the chart's bar label; selections
    /// are parsed back out of it.
    pub label: String,
    pub date: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub pl: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsResult {
    pub aggregated_pl: f64,
    pub total_profit: f64,
    pub total_loss: f64,
    pub total_trades: usize,
    /// NaN when the slice produced no positions; callers must guard before
    /// formatting it as a percentage.
    pub win_rate: f64,
    pub pl_by_instrument: Vec<InstrumentPl>,
    pub revenue_by_instrument: Vec<InstrumentRevenue>,
    pub pl_by_type: BTreeMap<String, TypeBreakdown>,
    pub top_profitable: Vec<Position>,
    pub top_losing: Vec<Position>,
    pub avg_profitable_holding_days: f64,
    pub avg_unprofitable_holding_days: f64,
    pub transactions: Vec<TransactionAmount>,
    pub cumulative_pl: Vec<TimeSeriesPoint>,
    pub positions: Vec<Position>,
}

/// Run the full pipeline over one slice. Two calls with the same slice
/// produce bit-identical results.
pub fn recompute(records: &[TransactionRecord]) -> AnalyticsResult {
    let outcome = positions::aggregate(records);
    let positions: Vec<Position> = outcome.positions.into_values().collect();

    let aggregated_pl: f64 = positions.iter().map(|p| p.pl).sum();
    let total_profit: f64 = positions.iter().filter(|p| p.pl > 0.0).map(|p| p.pl).sum();
    let total_loss: f64 = positions.iter().filter(|p| p.pl < 0.0).map(|p| -p.pl).sum();
    let wins = positions.iter().filter(|p| p.pl > 0.0).count();
    let win_rate = wins as f64 / positions.len() as f64 * 100.0;

    let mut pl_by: BTreeMap<String, f64> = BTreeMap::new();
    let mut revenue_by: BTreeMap<String, f64> = BTreeMap::new();
    for p in &positions {
        *pl_by.entry(p.instrument.clone()).or_default() += p.pl;
        *revenue_by.entry(p.instrument.clone()).or_default() += p.revenue;
    }
    let pl_by_instrument = pl_by
        .into_iter()
        .filter(|(_, pl)| *pl != 0.0)
        .map(|(instrument, pl)| InstrumentPl { instrument, pl })
        .collect();
    let revenue_by_instrument = revenue_by
        .into_iter()
        .filter(|(_, revenue)| *revenue != 0.0)
        .map(|(instrument, revenue)| InstrumentRevenue {
            instrument,
            revenue,
        })
        .collect();

    let mut pl_by_type: BTreeMap<String, TypeBreakdown> = BTreeMap::new();
    for p in &positions {
        let entry = pl_by_type
            .entry(p.option_type.clone())
            .or_insert(TypeBreakdown { pl: 0.0, sign: 1 });
        entry.pl += p.pl.abs();
        entry.sign = if p.pl >= 0.0 { 1 } else { -1 };
    }

    let mut top_profitable: Vec<Position> =
        positions.iter().filter(|p| p.pl > 0.0).cloned().collect();
    top_profitable.sort_by(|a, b| b.pl.partial_cmp(&a.pl).unwrap_or(Ordering::Equal));
    top_profitable.truncate(5);

    let mut top_losing: Vec<Position> =
        positions.iter().filter(|p| p.pl < 0.0).cloned().collect();
    top_losing.sort_by(|a, b| a.pl.partial_cmp(&b.pl).unwrap_or(Ordering::Equal));
    top_losing.truncate(5);

    let (avg_profitable_holding_days, avg_unprofitable_holding_days) =
        holding_period_means(&positions);

    let transactions = records
        .iter()
        .map(|r| {
            let amount = r.amount.as_ref().map(normalize_amount).unwrap_or(0.0);
            TransactionAmount {
                label: format!("{} - {}", r.activity_date_raw, r.instrument),
                date: r.activity_date_raw.clone(),
                amount,
            }
        })
        .filter(|t| t.amount != 0.0)
        .collect();

    AnalyticsResult {
        aggregated_pl,
        total_profit,
        total_loss,
        total_trades: positions.len(),
        win_rate,
        pl_by_instrument,
        revenue_by_instrument,
        pl_by_type,
        top_profitable,
        top_losing,
        avg_profitable_holding_days,
        avg_unprofitable_holding_days,
        transactions,
        cumulative_pl: cumulative_series(records),
        positions,
    }
}

/// Prefix-summed cash flow over the raw slice, sorted by activity date.
/// This deliberately includes records the aggregator rejected: it is the
/// cash-flow view, not the matched-position view.
fn cumulative_series(records: &[TransactionRecord]) -> Vec<TimeSeriesPoint> {
    let mut by_date: Vec<&TransactionRecord> = records.iter().collect();
    by_date.sort_by_key(|r| r.activity_date);
    let mut running = 0.0;
    by_date
        .into_iter()
        .map(|r| {
            running += r.amount.as_ref().map(normalize_amount).unwrap_or(0.0);
            TimeSeriesPoint {
                date: r.activity_date_raw.clone(),
                pl: running,
            }
        })
        .collect()
}

/// Mean holding period in whole days for the profitable and unprofitable
/// groups. A position needs an open date and a positive interval to the
/// expiry date (preferred) or close date; empty groups average to 0.
fn holding_period_means(positions: &[Position]) -> (f64, f64) {
    let mut profitable = Vec::new();
    let mut unprofitable = Vec::new();
    for p in positions {
        let Some(open) = p.open_date else { continue };
        let Some(end) = p.expiry_date.or(p.close_date) else {
            continue;
        };
        let days = (end - open).num_days();
        if days <= 0 {
            continue;
        }
        if p.pl > 0.0 {
            profitable.push(days as f64);
        } else {
            unprofitable.push(days as f64);
        }
    }
    (mean(&profitable), mean(&unprofitable))
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

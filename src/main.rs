//! Entry point. Wires ledger source -> aggregation -> analytics report.

mod analytics;
mod config;
mod fetch;
mod ledger;
mod notes;
mod parser;
mod positions;
mod types;
mod utils;
mod window;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let cfg = config::AppConfig::load(&cfg_path)
        .with_context(|| format!("load config {cfg_path}"))?;

    // Notes are read once at startup and written back only on change.
    let notes_path = cfg.notes.path.clone().or_else(notes::default_notes_path);
    if let Some(path) = &notes_path {
        let mut store = notes::NotesStore::load(path);
        if !store.notes.is_empty() {
            info!("Loaded {} bytes of trading notes", store.notes.len());
        }
        if let Some(text) = &cfg.notes.set {
            match store.update(text, path) {
                Ok(true) => info!("Notes updated"),
                Ok(false) => {}
                Err(e) => error!("Notes save failed: {:#}", e),
            }
        }
    }

    let records = match &cfg.source.csv_path {
        Some(path) => ledger::load_csv_file(path)?,
        None => {
            let base = cfg
                .source
                .backend_url
                .as_deref()
                .context("source needs csv_path or backend_url")?;
            let username = std::env::var("LEDGER_USERNAME").context("LEDGER_USERNAME not set")?;
            let password = std::env::var("LEDGER_PASSWORD").context("LEDGER_PASSWORD not set")?;
            let client = fetch::BackendClient::new(base);
            match client
                .fetch_ledger(&username, &password, &cfg.source.start_date, &cfg.source.end_date)
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    // Collaborator failures degrade, they don't crash.
                    error!("Ledger fetch failed: {:#}", e);
                    return Ok(());
                }
            }
        }
    };
    info!("Loaded {} ledger rows", records.len());

    let slice = ledger::active_slice(&records, cfg.slice.start, cfg.slice.end);
    if slice.len() != records.len() {
        info!("Active slice: {} of {} rows", slice.len(), records.len());
    }
    let result = analytics::recompute(slice);

    if result.win_rate.is_nan() {
        info!("No positions in the active slice");
    } else {
        info!(
            "Aggregated P/L ${:.2} over {} contracts, win rate {:.2}%",
            result.aggregated_pl, result.total_trades, result.win_rate
        );
        info!(
            "Avg holding: {:.1}d profitable / {:.1}d unprofitable",
            result.avg_profitable_holding_days, result.avg_unprofitable_holding_days
        );
    }

    let json = serde_json::to_string_pretty(&result)?;
    std::fs::write(&cfg.report.path, json)
        .with_context(|| format!("write report {}", cfg.report.path))?;
    info!("Report written to {}", cfg.report.path);

    // Follow-up price query for a selected transaction bar, when configured.
    if let Some(label) = &cfg.chart.selected_label {
        let Some((date_text, ticker)) = window::selection_from_label(label) else {
            error!("Selected label is not '<date> - <ticker>': {label}");
            return Ok(());
        };
        let Some(date) = utils::parse_ledger_date(&date_text) else {
            error!("Selected label has no parseable date: {label}");
            return Ok(());
        };
        let (start, end) = window::price_window(date, cfg.chart.date_spacing_days);
        let Some(base) = cfg.source.backend_url.as_deref() else {
            info!("No backend_url configured; skipping price window {start}..{end}");
            return Ok(());
        };
        let username = std::env::var("LEDGER_USERNAME").unwrap_or_default();
        let password = std::env::var("LEDGER_PASSWORD").unwrap_or_default();
        let client = fetch::BackendClient::new(base);
        match client
            .fetch_stock_data(&username, &password, &ticker, start, end)
            .await
        {
            Ok(data) => {
                info!(
                    "{}: {} closes, {} option legs in {}..{}",
                    ticker,
                    data.closes.len(),
                    data.option_legs.len(),
                    start,
                    end
                );
                if let Some(last) = data.closes.last() {
                    info!("{} last close {:.2} on {}", ticker, last.close, last.datetime);
                }
            }
            Err(e) => error!("Stock data fetch failed: {:#}", e),
        }
    }

    Ok(())
}

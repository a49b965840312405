//! Load and validate runtime configuration.

use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Deserialize, Clone)]
pub struct SourceCfg {
    /// Local delimited ledger; takes precedence over the remote path.
    pub csv_path: Option<String>,
    pub backend_url: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SliceCfg {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartCfg {
    pub date_spacing_days: i64,
    /// `<date> - <ticker>` bar label to run the price follow-up for.
    pub selected_label: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotesCfg {
    pub path: Option<String>,
    /// Replace the stored note text with this value (written only when it
    /// actually differs).
    pub set: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportCfg {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub source: SourceCfg,
    #[serde(default)]
    pub slice: SliceCfg,
    pub chart: ChartCfg,
    pub notes: NotesCfg,
    pub report: ReportCfg,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: Self = serde_yaml::from_str(&s)?;
        Ok(cfg)
    }
}

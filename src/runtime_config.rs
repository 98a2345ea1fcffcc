// =============================================================================
// Runtime Configuration — scanner settings with atomic save
// =============================================================================
//
// Every tunable for the scanner lives here so that it can be reconfigured at
// runtime through the API without a restart.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields never
// breaks loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where the config lives on disk, relative to the working directory.
pub const CONFIG_PATH: &str = "runtime_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "^NSEI".to_string()
}

fn default_lookback_days() -> usize {
    25
}

fn default_scan_interval_secs() -> u64 {
    300
}

fn default_table_rows() -> usize {
    20
}

fn default_true() -> bool {
    true
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the scanner.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Index symbol to scan (Yahoo chart notation).
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// How many of the most recent daily bars the scan evaluates.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: usize,

    /// Seconds between automatic rescans. The scan loop clamps this to a
    /// 10-second floor to keep a typo from hammering the upstream feed.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Rows shown by the rendered results table.
    #[serde(default = "default_table_rows")]
    pub table_rows: usize,

    /// Alert recipients (forwarded to the delivery relay).
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Whether a fresh trigger on the newest day sends an alert.
    #[serde(default = "default_true")]
    pub enable_alerts: bool,

    /// HTTP relay endpoint for alert delivery; log-only when unset.
    #[serde(default)]
    pub alert_webhook_url: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            lookback_days: default_lookback_days(),
            scan_interval_secs: default_scan_interval_secs(),
            table_rows: default_table_rows(),
            recipients: Vec::new(),
            enable_alerts: true,
            alert_webhook_url: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            lookback_days = config.lookback_days,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}

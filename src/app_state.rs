// =============================================================================
// Central Application State — Fibonacci Scanner
// =============================================================================
//
// The single source of truth for the service. The scan loop writes here, the
// REST API reads here, and the signal calculator touches none of it — results
// arrive as a fully built list that replaces the previous one wholesale.
//
// Thread safety:
//   - Atomic counters/flags for lock-free version tracking and the scan
//     re-entry guard.
//   - parking_lot::RwLock for mutable shared data.
// =============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::YahooClient;
use crate::notify::AlertRouter;
use crate::report::ScanSummary;
use crate::runtime_config::RuntimeConfig;
use crate::signal::SignalResult;

// =============================================================================
// Error Record
// =============================================================================

/// The most recent scan failure, surfaced through the API.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Aggregate view served by `GET /api/v1/state`.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub symbol: String,
    pub scan_running: bool,
    pub last_scan_at: Option<String>,
    pub last_error: Option<ErrorRecord>,
    pub summary: ScanSummary,
}

// =============================================================================
// AppState
// =============================================================================

pub struct AppState {
    /// Hot-reloadable scanner settings.
    pub runtime_config: RwLock<RuntimeConfig>,

    /// Latest scan results, oldest first. Replaced wholesale on every scan.
    results: RwLock<Vec<SignalResult>>,

    /// Daily-bars client shared by the scan loop and the on-demand endpoint.
    pub market: YahooClient,

    /// Alert delivery backend; rebuilt when the relay URL changes.
    alerts: RwLock<AlertRouter>,

    last_scan_at: RwLock<Option<String>>,
    last_error: RwLock<Option<ErrorRecord>>,

    /// Newest day already alerted on, so rescans do not repeat themselves.
    last_alert_date: RwLock<Option<chrono::NaiveDate>>,

    /// Re-entry guard: one scan at a time.
    scan_running: AtomicBool,

    /// Monotonic version bumped on every externally visible change.
    state_version: AtomicU64,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        let alerts = AlertRouter::from_webhook_url(config.alert_webhook_url.as_deref());
        Self {
            runtime_config: RwLock::new(config),
            results: RwLock::new(Vec::new()),
            market: YahooClient::new(),
            alerts: RwLock::new(alerts),
            last_scan_at: RwLock::new(None),
            last_error: RwLock::new(None),
            last_alert_date: RwLock::new(None),
            scan_running: AtomicBool::new(false),
            state_version: AtomicU64::new(0),
        }
    }

    // -------------------------------------------------------------------------
    // Versioning
    // -------------------------------------------------------------------------

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Scan guard
    // -------------------------------------------------------------------------

    /// Claim the scan slot; `false` when a scan is already running.
    pub fn try_begin_scan(&self) -> bool {
        self.scan_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_scan(&self) {
        self.scan_running.store(false, Ordering::SeqCst);
    }

    pub fn scan_running(&self) -> bool {
        self.scan_running.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Results
    // -------------------------------------------------------------------------

    /// Replace the results list with a freshly computed one.
    pub fn set_results(&self, results: Vec<SignalResult>) {
        *self.results.write() = results;
        *self.last_scan_at.write() = Some(Utc::now().to_rfc3339());
        *self.last_error.write() = None;
        self.increment_version();
    }

    pub fn results_snapshot(&self) -> Vec<SignalResult> {
        self.results.read().clone()
    }

    // -------------------------------------------------------------------------
    // Errors
    // -------------------------------------------------------------------------

    /// Record a scan failure without discarding the previous results.
    pub fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(ErrorRecord {
            message: message.into(),
            at: Utc::now().to_rfc3339(),
        });
        self.increment_version();
    }

    // -------------------------------------------------------------------------
    // Alerts & config
    // -------------------------------------------------------------------------

    pub fn alert_router(&self) -> AlertRouter {
        self.alerts.read().clone()
    }

    pub fn already_alerted(&self, date: chrono::NaiveDate) -> bool {
        *self.last_alert_date.read() == Some(date)
    }

    pub fn mark_alerted(&self, date: chrono::NaiveDate) {
        *self.last_alert_date.write() = Some(date);
    }

    /// Swap in a new runtime config and rebuild the alert router to match.
    pub fn update_config(&self, config: RuntimeConfig) {
        *self.alerts.write() = AlertRouter::from_webhook_url(config.alert_webhook_url.as_deref());
        *self.runtime_config.write() = config;
        self.increment_version();
    }

    // -------------------------------------------------------------------------
    // Snapshot
    // -------------------------------------------------------------------------

    pub fn build_snapshot(&self) -> StateSnapshot {
        let results = self.results.read();
        StateSnapshot {
            state_version: self.current_state_version(),
            symbol: self.runtime_config.read().symbol.clone(),
            scan_running: self.scan_running(),
            last_scan_at: self.last_scan_at.read().clone(),
            last_error: self.last_error.read().clone(),
            summary: ScanSummary::from_results(&results),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::DailyBar;
    use crate::signal;
    use chrono::NaiveDate;

    fn sample_results() -> Vec<SignalResult> {
        let bars = vec![
            DailyBar::new(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(), 150.0, 200.0, 100.0, 180.0),
            DailyBar::new(NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(), 150.0, 160.0, 140.0, 155.0),
        ];
        signal::scan(&bars)
    }

    #[test]
    fn version_bumps_on_results_and_errors() {
        let state = AppState::new(RuntimeConfig::default());
        assert_eq!(state.current_state_version(), 0);

        state.set_results(sample_results());
        assert_eq!(state.current_state_version(), 1);

        state.record_error("fetch failed");
        assert_eq!(state.current_state_version(), 2);
    }

    #[test]
    fn scan_guard_blocks_reentry() {
        let state = AppState::new(RuntimeConfig::default());
        assert!(state.try_begin_scan());
        assert!(!state.try_begin_scan());
        state.end_scan();
        assert!(state.try_begin_scan());
    }

    #[test]
    fn set_results_clears_previous_error() {
        let state = AppState::new(RuntimeConfig::default());
        state.record_error("boom");
        state.set_results(sample_results());

        let snapshot = state.build_snapshot();
        assert!(snapshot.last_error.is_none());
        assert!(snapshot.last_scan_at.is_some());
        assert_eq!(snapshot.summary.total_days, 1);
        assert_eq!(snapshot.summary.trigger_count, 1);
    }

    #[test]
    fn record_error_keeps_stale_results() {
        let state = AppState::new(RuntimeConfig::default());
        state.set_results(sample_results());
        state.record_error("rate limited");

        assert_eq!(state.results_snapshot().len(), 1);
        let snapshot = state.build_snapshot();
        assert_eq!(snapshot.last_error.unwrap().message, "rate limited");
    }

    #[test]
    fn alert_dedup_tracks_only_the_latest_date() {
        let state = AppState::new(RuntimeConfig::default());
        let d1 = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();

        assert!(!state.already_alerted(d1));
        state.mark_alerted(d1);
        assert!(state.already_alerted(d1));
        assert!(!state.already_alerted(d2));
    }

    #[test]
    fn update_config_swaps_alert_backend() {
        let state = AppState::new(RuntimeConfig::default());
        assert!(matches!(state.alert_router(), AlertRouter::Log(_)));

        let mut cfg = RuntimeConfig::default();
        cfg.alert_webhook_url = Some("https://relay.example/send".into());
        state.update_config(cfg);

        assert!(matches!(state.alert_router(), AlertRouter::Webhook(_)));
        assert_eq!(state.current_state_version(), 1);
    }
}

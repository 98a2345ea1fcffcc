// =============================================================================
// Scanner service — fetch, evaluate, store, alert
// =============================================================================
//
// The loop around the pure signal core. Each cycle:
//
//   1. Fetch the configured lookback window of daily bars.
//   2. Run the gap-and-accept evaluation (oldest first).
//   3. Replace the shared results list.
//   4. If the newest evaluated day triggered, alerts are enabled, and that
//      day has not been alerted on yet, render and deliver a live alert.
//
// Failures at any step are recorded in state and logged; nothing escapes the
// loop. The re-entry guard mirrors the one-at-a-time rule for scans.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::notify::AlertSink;
use crate::report::{self, ScanSummary};
use crate::signal::{self, SignalResult};

/// What a completed scan produced, for logging and the API response.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanOutcome {
    pub bars_fetched: usize,
    pub days_evaluated: usize,
    pub trigger_count: usize,
    pub alert_sent: bool,
}

/// The newest evaluated day, when it triggered.
fn latest_trigger(results: &[SignalResult]) -> Option<&SignalResult> {
    results.last().filter(|r| r.triggered)
}

/// Run one full scan cycle. Returns an error only for fetch/shape failures;
/// the caller decides whether to record or bubble it.
async fn scan_cycle(state: &Arc<AppState>) -> Result<ScanOutcome> {
    let (symbol, lookback_days) = {
        let cfg = state.runtime_config.read();
        (cfg.symbol.clone(), cfg.lookback_days)
    };

    let bars = state
        .market
        .get_daily_bars(&symbol, lookback_days)
        .await
        .with_context(|| format!("failed to fetch daily bars for {symbol}"))?;

    if bars.len() < 2 {
        warn!(symbol = %symbol, count = bars.len(), "not enough history to evaluate");
    }
    let incomplete = bars.iter().filter(|b| !b.is_complete()).count();
    if incomplete > 0 {
        warn!(symbol = %symbol, incomplete, "feed delivered bars with missing prices");
    }

    let results = signal::scan(&bars);
    let summary = ScanSummary::from_results(&results);
    info!(
        symbol = %symbol,
        bars = bars.len(),
        days = summary.total_days,
        triggers = summary.trigger_count,
        hit_rate_pct = summary.hit_rate_pct,
        "scan complete"
    );

    let mut alert_sent = false;
    if let Some(latest) = latest_trigger(&results) {
        let (enable_alerts, recipients) = {
            let cfg = state.runtime_config.read();
            (cfg.enable_alerts, cfg.recipients.clone())
        };

        if enable_alerts && !state.already_alerted(latest.date) {
            let subject = format!("FIBONACCI TRIGGER: {symbol} {}", latest.date);
            let body = report::render_trigger_body(latest, &symbol);
            alert_sent = state
                .alert_router()
                .deliver(&recipients, &subject, &body)
                .await;
            if alert_sent {
                state.mark_alerted(latest.date);
            } else {
                warn!(symbol = %symbol, date = %latest.date, "trigger alert was not delivered");
            }
        }
    }

    let outcome = ScanOutcome {
        bars_fetched: bars.len(),
        days_evaluated: results.len(),
        trigger_count: summary.trigger_count,
        alert_sent,
    };

    state.set_results(results);
    Ok(outcome)
}

/// Run a scan unless one is already in flight.
///
/// `None` means the re-entry guard rejected the request. Fetch failures are
/// recorded in state and returned as an outcome-free error.
pub async fn run_scan_once(state: &Arc<AppState>) -> Option<Result<ScanOutcome>> {
    if !state.try_begin_scan() {
        warn!("scan already running — request ignored");
        return None;
    }

    let result = scan_cycle(state).await;
    state.end_scan();

    if let Err(e) = &result {
        state.record_error(format!("{e:#}"));
    }

    Some(result)
}

/// Periodic rescan loop; never returns.
pub async fn run_scan_loop(state: Arc<AppState>) {
    loop {
        let interval_secs = state.runtime_config.read().scan_interval_secs.max(10);

        match run_scan_once(&state).await {
            Some(Ok(outcome)) => {
                info!(
                    bars = outcome.bars_fetched,
                    triggers = outcome.trigger_count,
                    alert_sent = outcome.alert_sent,
                    "scheduled scan finished"
                );
            }
            Some(Err(e)) => {
                warn!(error = %e, "scheduled scan failed — will retry next cycle");
            }
            None => {}
        }

        tokio::time::sleep(tokio::time::Duration::from_secs(interval_secs)).await;
    }
}

/// Deliver a full-scan report covering the current results list.
/// Backs the dashboard's "send report" action; `false` when there is
/// nothing to report.
pub async fn send_report_alert(state: &Arc<AppState>) -> bool {
    let results = state.results_snapshot();
    if results.is_empty() {
        warn!("report requested but no scan results available");
        return false;
    }

    let (symbol, recipients) = {
        let cfg = state.runtime_config.read();
        (cfg.symbol.clone(), cfg.recipients.clone())
    };

    let summary = ScanSummary::from_results(&results);
    let subject = format!("FIBONACCI SCAN REPORT: {symbol}");
    let body = report::render_report_body(&summary, &symbol);

    state.alert_router().deliver(&recipients, &subject, &body).await
}

/// Deliver a test alert with sample levels, bypassing the trigger logic.
/// Backs the dashboard's "test email" action.
pub async fn send_test_alert(state: &Arc<AppState>) -> bool {
    let (symbol, recipients) = {
        let cfg = state.runtime_config.read();
        (cfg.symbol.clone(), cfg.recipients.clone())
    };

    let subject = format!("FIBONACCI TEST ALERT: {symbol}");
    let body = format!(
        "{symbol} TEST ALERT\n\
         Entry (fib 50%): 25850.00\n\
         Stop: 25750.00\n\
         Target: 25950.00\n"
    );

    state.alert_router().deliver(&recipients, &subject, &body).await
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::DailyBar;
    use chrono::NaiveDate;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> DailyBar {
        DailyBar::new(NaiveDate::from_ymd_opt(2024, 6, day).unwrap(), open, high, low, close)
    }

    #[test]
    fn latest_trigger_requires_the_newest_day() {
        // Day 4 triggers, day 5 gaps down — no alert candidate.
        let bars = vec![
            bar(3, 150.0, 200.0, 100.0, 180.0),
            bar(4, 150.0, 160.0, 140.0, 155.0),
            bar(5, 130.0, 135.0, 125.0, 132.0),
        ];
        let results = signal::scan(&bars);
        assert!(results[0].triggered);
        assert!(latest_trigger(&results).is_none());
    }

    #[test]
    fn latest_trigger_found_when_newest_day_fires() {
        let bars = vec![
            bar(3, 150.0, 200.0, 100.0, 180.0),
            bar(4, 150.0, 160.0, 140.0, 155.0),
        ];
        let results = signal::scan(&bars);
        let latest = latest_trigger(&results).unwrap();
        assert_eq!(latest.date, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
    }

    #[test]
    fn latest_trigger_empty_results() {
        assert!(latest_trigger(&[]).is_none());
    }
}

// =============================================================================
// Reporting — scan summary, results table, alert body
// =============================================================================
//
// All rounding and formatting lives here; the signal layer hands over raw
// floats and this module decides how they read. Presentation owns the results
// list it is given and never feeds anything back into the calculator.
// =============================================================================

use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::signal::SignalResult;

/// IST (+05:30) — the exchange timezone stamped on generated reports.
const IST_OFFSET_SECS: i32 = 19_800;

// =============================================================================
// ScanSummary
// =============================================================================

/// One reduction over a scan's result list: trigger tally, hit rate, covered
/// period, and the triggered entries themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub total_days: usize,
    pub trigger_count: usize,
    /// Percentage of evaluated days that triggered; 0 when nothing was
    /// evaluated.
    pub hit_rate_pct: f64,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub triggered: Vec<SignalResult>,
}

impl ScanSummary {
    /// Summarise a result list (oldest first).
    pub fn from_results(results: &[SignalResult]) -> Self {
        let triggered: Vec<SignalResult> =
            results.iter().filter(|r| r.triggered).cloned().collect();
        let total_days = results.len();
        let hit_rate_pct = if total_days > 0 {
            triggered.len() as f64 / total_days as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_days,
            trigger_count: triggered.len(),
            hit_rate_pct,
            period_start: results.first().map(|r| r.date),
            period_end: results.last().map(|r| r.date),
            triggered,
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

fn verdict(triggered: bool) -> &'static str {
    if triggered {
        "TRIGGER"
    } else {
        "NO TRADE"
    }
}

/// Render the most recent `max_rows` results as a fixed-width text table,
/// oldest of the shown rows first.
///
/// Degenerate days show dashes in the level columns instead of the zero
/// placeholders the calculator emits.
pub fn render_table(results: &[SignalResult], max_rows: usize) -> String {
    let start = results.len().saturating_sub(max_rows);
    let shown = &results[start..];

    let mut out = String::new();
    out.push_str(&format!(
        "{:<12} {:>10} {:>10} {:>10} {:>5} {:>7} {:>9} {:>10} {:>10} {:>10}\n",
        "date", "open", "prior_low", "prior_high", "gap", "accept", "verdict", "entry", "stop", "target"
    ));

    for r in shown {
        let (entry, stop, target) = if r.range_size > 0.0 {
            (
                format!("{:.2}", r.entry_price),
                format!("{:.2}", r.stop_loss),
                format!("{:.2}", r.target_price),
            )
        } else {
            ("-".to_string(), "-".to_string(), "-".to_string())
        };

        out.push_str(&format!(
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>5} {:>7} {:>9} {:>10} {:>10} {:>10}\n",
            r.date.to_string(),
            r.todays_open,
            r.prior_low,
            r.prior_high,
            yes_no(r.gap_up),
            yes_no(r.acceptance),
            verdict(r.triggered),
            entry,
            stop,
            target,
        ));
    }

    out
}

/// Render the alert body for a full-scan report: generation time, covered
/// period, trigger ratio, and the last few triggered entries.
pub fn render_report_body(summary: &ScanSummary, symbol: &str) -> String {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).expect("valid fixed offset");
    let now = Utc::now().with_timezone(&ist);

    let period = match (summary.period_start, summary.period_end) {
        (Some(start), Some(end)) => format!("{start} -> {end}"),
        _ => "no evaluated days".to_string(),
    };

    let mut body = format!(
        "{symbol} FIBONACCI SCAN REPORT\n\
         Generated: {} IST\n\
         Period: {period}\n\
         Triggers: {} / {} days\n\
         Hit rate: {:.1}%\n",
        now.format("%Y-%m-%d %H:%M"),
        summary.trigger_count,
        summary.total_days,
        summary.hit_rate_pct,
    );

    // Most recent five triggers, oldest of them first.
    let tail_start = summary.triggered.len().saturating_sub(5);
    for t in &summary.triggered[tail_start..] {
        body.push_str(&format!(
            "* {} | entry {:.2} | stop {:.2} | target {:.2}\n",
            t.date, t.entry_price, t.stop_loss, t.target_price
        ));
    }

    body
}

/// Render the alert body for a single live trigger.
pub fn render_trigger_body(result: &SignalResult, symbol: &str) -> String {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).expect("valid fixed offset");
    let now = Utc::now().with_timezone(&ist);

    format!(
        "{symbol} LIVE TRIGGER {}\n\
         Sent: {} IST\n\
         Entry (fib 50%): {:.2}\n\
         Stop: {:.2}\n\
         Target: {:.2}\n",
        result.date,
        now.format("%Y-%m-%d %H:%M"),
        result.entry_price,
        result.stop_loss,
        result.target_price,
    )
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::DailyBar;
    use crate::signal::{evaluate_pair, scan};
    use chrono::NaiveDate;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> DailyBar {
        DailyBar::new(NaiveDate::from_ymd_opt(2024, 6, day).unwrap(), open, high, low, close)
    }

    fn triggered_result(day: u32) -> SignalResult {
        let prior = bar(day - 1, 150.0, 200.0, 100.0, 180.0);
        let current = bar(day, 150.0, 160.0, 140.0, 155.0);
        let r = evaluate_pair(&prior, &current).unwrap();
        assert!(r.triggered);
        r
    }

    fn degenerate_result(day: u32) -> SignalResult {
        let prior = bar(day - 1, 105.0, 110.0, 100.0, 108.0);
        let current = bar(day, 95.0, 99.0, 92.0, 97.0);
        let r = evaluate_pair(&prior, &current).unwrap();
        assert!(!r.triggered);
        r
    }

    #[test]
    fn summary_of_empty_results() {
        let summary = ScanSummary::from_results(&[]);
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.trigger_count, 0);
        assert_eq!(summary.hit_rate_pct, 0.0);
        assert!(summary.period_start.is_none());
        assert!(summary.triggered.is_empty());
    }

    #[test]
    fn summary_hit_rate_and_period() {
        let results = vec![
            triggered_result(4),
            degenerate_result(5),
            triggered_result(6),
            degenerate_result(7),
        ];
        let summary = ScanSummary::from_results(&results);
        assert_eq!(summary.total_days, 4);
        assert_eq!(summary.trigger_count, 2);
        assert!((summary.hit_rate_pct - 50.0).abs() < 1e-9);
        assert_eq!(summary.period_start.unwrap().to_string(), "2024-06-04");
        assert_eq!(summary.period_end.unwrap().to_string(), "2024-06-07");
    }

    #[test]
    fn table_keeps_only_the_most_recent_rows() {
        let bars: Vec<DailyBar> = (3..13)
            .map(|d| bar(d, 100.0 + d as f64, 115.0 + d as f64, 95.0 + d as f64, 105.0))
            .collect();
        let results = scan(&bars);
        assert_eq!(results.len(), 9);

        let table = render_table(&results, 3);
        // Header plus exactly three data rows.
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("2024-06-12"));
        assert!(!table.contains("2024-06-04"));
    }

    #[test]
    fn empty_results_render_header_only_table() {
        let table = render_table(&[], 10);
        assert_eq!(table.lines().count(), 1);
        assert!(table.starts_with("date"));
        assert!(table.contains("verdict"));
    }

    #[test]
    fn table_dashes_out_degenerate_levels() {
        let table = render_table(&[degenerate_result(5)], 10);
        assert!(table.contains("NO TRADE"));
        let row = table.lines().nth(1).unwrap();
        let cols: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(&cols[cols.len() - 3..], &["-", "-", "-"]);
    }

    #[test]
    fn table_shows_trigger_levels() {
        let table = render_table(&[triggered_result(4)], 10);
        assert!(table.contains("TRIGGER"));
        assert!(table.contains("125.00"));
        assert!(table.contains("100.00"));
        assert!(table.contains("169.10"));
    }

    #[test]
    fn report_body_lists_recent_triggers() {
        let results = vec![triggered_result(4), triggered_result(5)];
        let summary = ScanSummary::from_results(&results);
        let body = render_report_body(&summary, "^NSEI");
        assert!(body.contains("^NSEI FIBONACCI SCAN REPORT"));
        assert!(body.contains("Triggers: 2 / 2 days"));
        assert!(body.contains("Hit rate: 100.0%"));
        assert!(body.contains("2024-06-04"));
        assert!(body.contains("entry 125.00"));
    }

    #[test]
    fn report_body_caps_trigger_list_at_five() {
        let results: Vec<SignalResult> = (4..14).map(triggered_result).collect();
        let summary = ScanSummary::from_results(&results);
        let body = render_report_body(&summary, "^NSEI");
        let bullet_lines = body.lines().filter(|l| l.starts_with('*')).count();
        assert_eq!(bullet_lines, 5);
        // The newest trigger is present, the oldest is not.
        assert!(body.contains("2024-06-13"));
        assert!(!body.contains("* 2024-06-04"));
    }

    #[test]
    fn trigger_body_carries_levels() {
        let body = render_trigger_body(&triggered_result(4), "^NSEI");
        assert!(body.contains("LIVE TRIGGER 2024-06-04"));
        assert!(body.contains("Entry (fib 50%): 125.00"));
        assert!(body.contains("Stop: 100.00"));
        assert!(body.contains("Target: 169.10"));
    }
}

// =============================================================================
// Fibonacci gap-and-accept signal
// =============================================================================
//
// Per-day evaluation of today's open against yesterday's low/high range:
//
//   range   = open_t - low_{t-1}
//   fib_50  = low_{t-1} + 0.500 * range
//   fib_618 = low_{t-1} + 0.618 * range
//
// Gap-up:     open_t > low_{t-1}
// Acceptance: both retracement levels fall inside [low_{t-1}, high_{t-1}]
// Trigger:    gap-up AND acceptance (with a strictly positive range)
//
// On a trigger the hypothetical long is entered at fib_50, stopped at the
// prior low, with a first target at open_t + 0.382 * range.
//
// Every day is evaluated independently against exactly one predecessor; there
// is no carried state and no rounding (formatting belongs to the rendering
// layer).
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;

use crate::market_data::DailyBar;

/// Retracement ratio for the entry level.
pub const FIB_RETRACE_50: f64 = 0.5;
/// Retracement ratio for the confirmation level.
pub const FIB_RETRACE_618: f64 = 0.618;
/// Extension ratio for the first target above today's open.
pub const FIB_TARGET_382: f64 = 0.382;

/// One evaluated trading day.
///
/// A pure projection of two consecutive bars (prior day, current day);
/// created fresh on every scan and never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    /// The evaluated (later) day.
    pub date: NaiveDate,

    // Inputs copied through for display.
    pub todays_open: f64,
    pub prior_low: f64,
    pub prior_high: f64,

    /// `todays_open - prior_low`; may be <= 0.
    pub range_size: f64,
    /// Today's open exceeds the prior day's low.
    pub gap_up: bool,
    /// Both retracement levels sit inside `[prior_low, prior_high]`.
    pub acceptance: bool,
    /// Gap-up and acceptance both hold on a positive range.
    pub triggered: bool,

    // Derived price levels; zeroed when the range is degenerate.
    pub fib_50: f64,
    pub fib_618: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target_price: f64,
}

/// Evaluate one `(prior, current)` day pair.
///
/// Returns `None` when any price the formula reads is missing (non-finite),
/// so that a bad upstream row drops exactly one day instead of poisoning the
/// whole scan. A non-positive range is not an error: it yields a defined
/// non-trigger result with zeroed price levels.
pub fn evaluate_pair(prior: &DailyBar, current: &DailyBar) -> Option<SignalResult> {
    let todays_open = current.open;
    let prior_low = prior.low;
    let prior_high = prior.high;

    if !todays_open.is_finite() || !prior_low.is_finite() || !prior_high.is_finite() {
        return None;
    }

    let range_size = todays_open - prior_low;

    if range_size <= 0.0 {
        return Some(SignalResult {
            date: current.date,
            todays_open,
            prior_low,
            prior_high,
            range_size,
            gap_up: false,
            acceptance: false,
            triggered: false,
            fib_50: 0.0,
            fib_618: 0.0,
            entry_price: 0.0,
            stop_loss: 0.0,
            target_price: 0.0,
        });
    }

    let fib_50 = prior_low + FIB_RETRACE_50 * range_size;
    let fib_618 = prior_low + FIB_RETRACE_618 * range_size;

    let acceptance = prior_low <= fib_618
        && fib_618 <= prior_high
        && prior_low <= fib_50
        && fib_50 <= prior_high;
    let gap_up = todays_open > prior_low;
    let triggered = gap_up && acceptance;

    Some(SignalResult {
        date: current.date,
        todays_open,
        prior_low,
        prior_high,
        range_size,
        gap_up,
        acceptance,
        triggered,
        fib_50,
        fib_618,
        entry_price: fib_50,
        stop_loss: prior_low,
        target_price: todays_open + FIB_TARGET_382 * range_size,
    })
}

/// Evaluate a chronologically ordered slice of bars (oldest first).
///
/// Emits one result per day with a predecessor, oldest first. Pairs with
/// missing prices are skipped; fewer than two bars yields an empty list.
pub fn scan(bars: &[DailyBar]) -> Vec<SignalResult> {
    if bars.len() < 2 {
        return Vec::new();
    }

    let mut results = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        if let Some(result) = evaluate_pair(&pair[0], &pair[1]) {
            results.push(result);
        }
    }
    results
}

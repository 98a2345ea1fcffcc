// =============================================================================
// Daily OHLC bar
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day's observed prices for the scanned index.
///
/// The upstream feed does not enforce `low <= open,close <= high` and may
/// deliver missing fields; missing prices are carried as `f64::NAN` so that
/// downstream consumers can apply their own skip policy instead of the feed
/// silently inventing rows. A bar is immutable once recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl DailyBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
        }
    }

    /// True when every price field is a finite number.
    pub fn is_complete(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
    }
}

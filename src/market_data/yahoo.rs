// =============================================================================
// Yahoo Finance chart client — daily OHLC history over REST
// =============================================================================
//
// Fetches daily bars from the public v8 chart endpoint:
//
//   GET /v8/finance/chart/{symbol}?range={range}&interval=1d
//
// The response carries parallel arrays: one `timestamp[]` of epoch seconds
// (session start, exchange local time) and one quote block with
// `open[] / high[] / low[] / close[]`. Any of the price slots may be JSON
// null; those map to NaN on the bar rather than dropping the row, so the
// signal layer's missing-data policy stays in charge.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use tracing::{debug, instrument, warn};

use crate::market_data::DailyBar;

/// Exchange UTC offset used when the response omits `meta.gmtoffset`
/// (NSE runs on IST, +05:30).
const DEFAULT_GMT_OFFSET_SECS: i32 = 19_800;

/// REST client for Yahoo Finance daily chart data.
#[derive(Debug, Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            // Yahoo rejects requests without a browser-ish user agent.
            .user_agent("Mozilla/5.0 (compatible; fibscan/1.0)")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            client,
        }
    }

    /// GET daily bars for `symbol` covering roughly the last `lookback_days`
    /// trading days, oldest first.
    ///
    /// The requested range is padded generously (calendar days vs trading
    /// days, plus holidays) and the result trimmed to the most recent
    /// `lookback_days` bars.
    #[instrument(skip(self), name = "yahoo::get_daily_bars")]
    pub async fn get_daily_bars(&self, symbol: &str, lookback_days: usize) -> Result<Vec<DailyBar>> {
        let range = range_for_lookback(lookback_days);
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url, symbol, range
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse chart response as JSON")?;

        if !status.is_success() {
            anyhow::bail!("Yahoo chart endpoint returned {}: {}", status, body);
        }

        let mut bars = parse_chart_response(&body)?;

        if bars.len() > lookback_days {
            let excess = bars.len() - lookback_days;
            bars.drain(..excess);
        }

        debug!(symbol, count = bars.len(), "daily bars fetched");
        Ok(bars)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a trading-day lookback onto the coarse range buckets the chart
/// endpoint accepts.
fn range_for_lookback(lookback_days: usize) -> &'static str {
    match lookback_days {
        0..=18 => "1mo",
        19..=40 => "3mo",
        41..=120 => "6mo",
        _ => "1y",
    }
}

/// Parse a v8 chart response body into daily bars, oldest first.
///
/// Fails on structural problems (missing arrays, upstream error object);
/// individual null prices become NaN fields on an otherwise valid bar.
pub fn parse_chart_response(body: &serde_json::Value) -> Result<Vec<DailyBar>> {
    if let Some(err) = body.pointer("/chart/error") {
        if !err.is_null() {
            anyhow::bail!("Yahoo chart error object: {err}");
        }
    }

    let result = body
        .pointer("/chart/result/0")
        .context("chart response missing result[0]")?;

    let gmt_offset = result
        .pointer("/meta/gmtoffset")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .unwrap_or(DEFAULT_GMT_OFFSET_SECS);
    let tz = FixedOffset::east_opt(gmt_offset)
        .context("chart meta carried an out-of-range gmtoffset")?;

    let timestamps = result
        .pointer("/timestamp")
        .and_then(|v| v.as_array())
        .context("chart response missing timestamp array")?;

    let quote = result
        .pointer("/indicators/quote/0")
        .context("chart response missing indicators.quote[0]")?;

    let opens = price_array(quote, "open")?;
    let highs = price_array(quote, "high")?;
    let lows = price_array(quote, "low")?;
    let closes = price_array(quote, "close")?;

    let mut bars = Vec::with_capacity(timestamps.len());

    for (i, ts) in timestamps.iter().enumerate() {
        let Some(epoch) = ts.as_i64() else {
            warn!(index = i, "skipping row with non-integer timestamp");
            continue;
        };
        let Some(utc) = DateTime::from_timestamp(epoch, 0) else {
            warn!(index = i, epoch, "skipping row with out-of-range timestamp");
            continue;
        };
        let date = utc.with_timezone(&tz).date_naive();

        bars.push(DailyBar::new(
            date,
            price_at(opens, i),
            price_at(highs, i),
            price_at(lows, i),
            price_at(closes, i),
        ));
    }

    Ok(bars)
}

fn price_array<'a>(quote: &'a serde_json::Value, field: &str) -> Result<&'a Vec<serde_json::Value>> {
    quote
        .get(field)
        .and_then(|v| v.as_array())
        .with_context(|| format!("chart quote block missing '{field}' array"))
}

/// Price slot for row `i`; JSON null (or a short array) becomes NaN.
fn price_at(arr: &[serde_json::Value], i: usize) -> f64 {
    arr.get(i).and_then(|v| v.as_f64()).unwrap_or(f64::NAN)
}

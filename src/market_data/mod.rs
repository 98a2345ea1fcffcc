pub mod bar;
pub mod yahoo;

// Re-export the bar type for convenient access (e.g. `use crate::market_data::DailyBar`).
pub use bar::DailyBar;
pub use yahoo::YahooClient;

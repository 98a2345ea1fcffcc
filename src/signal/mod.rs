// =============================================================================
// Signal Module
// =============================================================================
//
// The scanning core: a pure, stateless evaluation of daily bars into
// gap-and-accept results. Everything downstream (summary, table, alerts) is
// a reduction over the result list.

pub mod fib_gap;

pub use fib_gap::{evaluate_pair, scan, SignalResult};

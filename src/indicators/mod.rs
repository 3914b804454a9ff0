// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the core technical indicators.
// Every function returns an array the same length as its input, left-padded
// with `None` for indices before the window is full; a non-finite computed
// value is also reported as `None`, never propagated. A zero or inconsistent
// period is an `InvalidParameter` error, but an input shorter than the window
// is not — every index is simply absent.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, BollingerSeries};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdSeries};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

/// Most recent present value of an indicator series.
pub fn last_value(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

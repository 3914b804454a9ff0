// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   macd      = EMA(prices, fast) - EMA(prices, slow)
//   signal    = EMA(macd, signal_period), seeded over the dense macd region
//   histogram = macd - signal
//
// The histogram identity holds exactly at every index where both the macd
// line and the signal line are present.
// =============================================================================

use crate::error::{EngineError, EngineResult};
use crate::indicators::ema::calculate_ema;

/// The three MACD output series, each the same length as the input.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Compute MACD line, signal line and histogram for `prices`.
///
/// # Edge cases
/// - any zero period, or `fast >= slow` => `InvalidParameter`
/// - too little history => the affected indices are `None`
/// - non-finite intermediates follow the EMA poisoning rule
pub fn calculate_macd(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> EngineResult<MacdSeries> {
    if fast == 0 || slow == 0 || signal_period == 0 {
        return Err(EngineError::InvalidParameter(
            "MACD periods must be positive".to_string(),
        ));
    }
    if fast >= slow {
        return Err(EngineError::InvalidParameter(format!(
            "MACD fast period ({fast}) must be less than slow period ({slow})"
        )));
    }

    let ema_fast = calculate_ema(prices, fast)?;
    let ema_slow = calculate_ema(prices, slow)?;

    let mut macd: Vec<Option<f64>> = vec![None; prices.len()];
    for i in 0..prices.len() {
        if let (Some(f), Some(s)) = (ema_fast[i], ema_slow[i]) {
            let diff = f - s;
            if diff.is_finite() {
                macd[i] = Some(diff);
            }
        }
    }

    // The macd line is contiguous from its first present index (the EMA
    // poisoning rule only ever truncates a tail), so the signal line is an
    // EMA over that dense region, re-aligned to the input indices.
    let mut signal: Vec<Option<f64>> = vec![None; prices.len()];
    if let Some(start) = macd.iter().position(Option::is_some) {
        let dense: Vec<f64> = macd[start..]
            .iter()
            .take_while(|v| v.is_some())
            .flatten()
            .copied()
            .collect();
        let dense_signal = calculate_ema(&dense, signal_period)?;
        for (j, v) in dense_signal.into_iter().enumerate() {
            signal[start + j] = v;
        }
    }

    let mut histogram: Vec<Option<f64>> = vec![None; prices.len()];
    for i in 0..prices.len() {
        if let (Some(m), Some(s)) = (macd[i], signal[i]) {
            let h = m - s;
            if h.is_finite() {
                histogram[i] = Some(h);
            }
        }
    }

    Ok(MacdSeries {
        macd,
        signal,
        histogram,
    })
}

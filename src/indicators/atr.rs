// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR at index `period`  = simple average of the first `period` TR values
//   ATR_t                  = (ATR_{t-1} * (period - 1) + TR_t) / period
// =============================================================================

use crate::error::{EngineError, EngineResult};

/// Compute the ATR series from parallel high/low/close arrays.
///
/// The result has the same length as the inputs; the first TR needs a
/// previous close, so the seed lands at index `period` and everything before
/// it is `None`.
///
/// # Edge cases
/// - `period == 0` => `InvalidParameter`
/// - mismatched input lengths => `InvalidParameter`
/// - `high.len() < period + 1` => every index `None`
/// - a non-finite TR poisons the smoothing state; that index and every later
///   one stay `None`
pub fn calculate_atr(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
) -> EngineResult<Vec<Option<f64>>> {
    if period == 0 {
        return Err(EngineError::InvalidParameter(
            "ATR period must be positive".to_string(),
        ));
    }
    if high.len() != low.len() || low.len() != close.len() {
        return Err(EngineError::InvalidParameter(format!(
            "ATR input lengths differ: high={}, low={}, close={}",
            high.len(),
            low.len(),
            close.len()
        )));
    }

    let len = high.len();
    let mut out = vec![None; len];
    if len < period + 1 {
        return Ok(out);
    }

    // --- Step 1: True Range for each bar after the first ---------------------
    let mut tr_values: Vec<f64> = Vec::with_capacity(len - 1);
    for i in 1..len {
        // f64::max ignores NaN operands, so check the inputs explicitly.
        if !high[i].is_finite() || !low[i].is_finite() || !close[i - 1].is_finite() {
            tr_values.push(f64::NAN);
            continue;
        }
        let hl = high[i] - low[i];
        let hc = (high[i] - close[i - 1]).abs();
        let lc = (low[i] - close[i - 1]).abs();
        tr_values.push(hl.max(hc).max(lc));
    }

    // --- Step 2: Seed with the simple average of the first `period` TRs ------
    let seed: f64 = tr_values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Ok(out);
    }
    out[period] = Some(seed);

    // --- Step 3: Wilder's smoothing for the remaining TRs --------------------
    let period_f = period as f64;
    let mut atr = seed;
    for (i, &tr) in tr_values.iter().enumerate().skip(period) {
        if !tr.is_finite() {
            break;
        }
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            break;
        }
        // tr_values[i] describes the bar at index i + 1.
        out[i + 1] = Some(atr);
    }

    Ok(out)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// Build parallel OHLC arrays from (high, low, close) triples.
    fn split(bars: &[(f64, f64, f64)]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            bars.iter().map(|b| b.0).collect(),
            bars.iter().map(|b| b.1).collect(),
            bars.iter().map(|b| b.2).collect(),
        )
    }

    #[test]
    fn atr_period_zero_is_invalid() {
        let (h, l, c) = split(&[(105.0, 95.0, 100.0); 20]);
        assert!(calculate_atr(&h, &l, &c, 0).is_err());
    }

    #[test]
    fn atr_mismatched_lengths_are_invalid() {
        assert!(calculate_atr(&[1.0, 2.0], &[1.0], &[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn atr_insufficient_data_is_all_absent() {
        // Need period + 1 = 15 bars for period=14, only have 10.
        let (h, l, c) = split(&[(105.0, 95.0, 100.0); 10]);
        let out = calculate_atr(&h, &l, &c, 14).unwrap();
        assert_eq!(out.len(), 10);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn atr_seed_lands_at_index_period() {
        let bars: Vec<(f64, f64, f64)> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                (base + 5.0, base - 5.0, base)
            })
            .collect();
        let (h, l, c) = split(&bars);
        let out = calculate_atr(&h, &l, &c, 14).unwrap();
        assert!(out[13].is_none());
        assert!(out[14].is_some());
    }

    #[test]
    fn atr_constant_range_converges_to_it() {
        // All bars span 10 with a slight drift; TR stays near 10.
        let bars: Vec<(f64, f64, f64)> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                (base + 5.0, base - 5.0, base)
            })
            .collect();
        let (h, l, c) = split(&bars);
        let atr = calculate_atr(&h, &l, &c, 14).unwrap()[29].unwrap();
        assert!((atr - 10.0).abs() < 1.0, "expected ATR near 10.0, got {atr}");
    }

    #[test]
    fn atr_true_range_uses_prev_close() {
        // Gap scenario: |H - prevClose| dominates H - L.
        let bars = [
            (105.0, 95.0, 95.0),   // close at the low
            (115.0, 108.0, 112.0), // gap up: |115-95| = 20 > 115-108 = 7
            (118.0, 110.0, 115.0),
            (120.0, 113.0, 118.0),
        ];
        let (h, l, c) = split(&bars);
        let atr = calculate_atr(&h, &l, &c, 3).unwrap()[3].unwrap();
        assert!(atr > 7.0, "ATR should reflect the gap, got {atr}");
    }

    #[test]
    fn atr_values_are_positive_and_finite() {
        let bars: Vec<(f64, f64, f64)> = (0..50)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.5).sin() * 10.0;
                (base + 2.0, base - 2.0, base + 0.5)
            })
            .collect();
        let (h, l, c) = split(&bars);
        let out = calculate_atr(&h, &l, &c, 14).unwrap();
        for v in out.iter().flatten() {
            assert!(*v > 0.0 && v.is_finite());
        }
    }

    #[test]
    fn atr_nan_poisons_the_tail() {
        let mut bars: Vec<(f64, f64, f64)> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                (base + 5.0, base - 5.0, base)
            })
            .collect();
        bars[20].0 = f64::NAN;
        let (h, l, c) = split(&bars);
        let out = calculate_atr(&h, &l, &c, 5).unwrap();
        assert!(out[19].is_some());
        assert!(out[20].is_none());
        assert!(out[25].is_none());
        assert!(out[29].is_none());
    }
}

// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Seed average gain / average loss with the simple average of the
//          first `period` gains / losses; the first RSI lands at index
//          `period`.
// Step 3 — Apply Wilder's exponential smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS), clamped to [0, 100]
//          avg_loss == 0  =>  RSI = 100
// =============================================================================

use crate::error::{EngineError, EngineResult};

/// Compute the full RSI series for the given `prices` and `period`.
///
/// The result has the same length as `prices`; indices before `period` are
/// `None` (the first `period` deltas are consumed to seed the averages).
///
/// # Edge cases
/// - `period == 0` => `InvalidParameter`
/// - `prices.len() < period + 1` => every index `None`
/// - If average loss is zero (no down moves), RSI is 100.
/// - A non-finite delta poisons the smoothing state; that index and every
///   later one stay `None`.
pub fn calculate_rsi(prices: &[f64], period: usize) -> EngineResult<Vec<Option<f64>>> {
    if period == 0 {
        return Err(EngineError::InvalidParameter(
            "RSI period must be positive".to_string(),
        ));
    }

    let mut out = vec![None; prices.len()];
    if prices.len() < period + 1 {
        return Ok(out);
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    // --- Seed averages with the simple average of the first `period` deltas --
    let (sum_gain, sum_loss) = deltas[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l + d.abs())
            }
        });

    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return Ok(out);
    }

    out[period] = rsi_from_averages(avg_gain, avg_loss);
    if out[period].is_none() {
        return Ok(out);
    }

    // --- Wilder's smoothing for subsequent values ----------------------------
    for (i, &delta) in deltas.iter().enumerate().skip(period) {
        if !delta.is_finite() {
            break;
        }
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            // The delta at index i prices the close at index i + 1.
            Some(rsi) => out[i + 1] = Some(rsi),
            None => break,
        }
    }

    Ok(out)
}

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// Returns `None` when either average is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }

    let rsi = if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi.clamp(0.0, 100.0))
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_period_zero_is_invalid() {
        assert!(calculate_rsi(&[1.0, 2.0, 3.0], 0).is_err());
    }

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).unwrap().is_empty());
    }

    #[test]
    fn rsi_insufficient_data_is_all_absent() {
        // Need period+1 closes (period deltas). 14 closes => 13 deltas < 14.
        let prices: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        let out = calculate_rsi(&prices, 14).unwrap();
        assert_eq!(out.len(), 14);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn rsi_first_value_lands_at_index_period() {
        let prices: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let out = calculate_rsi(&prices, 14).unwrap();
        assert!(out[13].is_none());
        assert!(out[14].is_some());
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let prices: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let out = calculate_rsi(&prices, 14).unwrap();
        for v in out.iter().flatten() {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let prices: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let out = calculate_rsi(&prices, 14).unwrap();
        assert!(out[14].is_some());
        for v in out.iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_range_check() {
        let prices = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let out = calculate_rsi(&prices, 14).unwrap();
        assert!(out.iter().flatten().count() > 0);
        for v in out.iter().flatten() {
            assert!((0.0..=100.0).contains(v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_flat_series_follows_zero_loss_rule() {
        // No losses at all => avg_loss == 0 => 100.
        let prices = vec![100.0; 30];
        let out = calculate_rsi(&prices, 14).unwrap();
        assert!((out[14].unwrap() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_nan_poisons_the_tail() {
        let mut prices: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        prices[20] = f64::NAN;
        let out = calculate_rsi(&prices, 14).unwrap();
        assert!(out[14].is_some());
        // The NaN delta lands between closes 19 and 21; everything from the
        // first poisoned smoothing step onwards is absent.
        assert!(out[20].is_none());
        assert!(out[25].is_none());
        assert!(out[29].is_none());
    }
}

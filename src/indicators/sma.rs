// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of the trailing `period` values, computed with a rolling
// sum. A non-finite value inside the window marks that window's output
// absent without poisoning later windows.

use crate::error::{EngineError, EngineResult};

/// Compute the SMA series for `prices` and look-back `period`.
///
/// The result has the same length as `prices`; indices before `period - 1`
/// are `None`.
///
/// # Edge cases
/// - `period == 0` => `InvalidParameter`
/// - `prices.len() < period` => every index `None`
/// - a window containing a non-finite price => `None` at that index only
pub fn calculate_sma(prices: &[f64], period: usize) -> EngineResult<Vec<Option<f64>>> {
    if period == 0 {
        return Err(EngineError::InvalidParameter(
            "SMA period must be positive".to_string(),
        ));
    }

    let mut out = vec![None; prices.len()];
    if prices.len() < period {
        return Ok(out);
    }

    let mut sum = 0.0;
    let mut non_finite_in_window = 0usize;

    for (i, &price) in prices.iter().enumerate() {
        if price.is_finite() {
            sum += price;
        } else {
            non_finite_in_window += 1;
        }

        if i >= period {
            let leaving = prices[i - period];
            if leaving.is_finite() {
                sum -= leaving;
            } else {
                non_finite_in_window -= 1;
            }
        }

        if i + 1 >= period && non_finite_in_window == 0 {
            let mean = sum / period as f64;
            if mean.is_finite() {
                out[i] = Some(mean);
            }
        }
    }

    Ok(out)
}

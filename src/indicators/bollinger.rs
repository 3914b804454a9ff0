// =============================================================================
// Bollinger Bands
// =============================================================================
//
// A middle band (SMA), an upper band (SMA + k*σ), and a lower band
// (SMA - k*σ), where σ is the population standard deviation over the same
// window as the SMA.

use crate::error::{EngineError, EngineResult};

/// Bollinger band series, each the same length as the input.
#[derive(Debug, Clone)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands for the given prices.
///
/// # Edge cases
/// - `period == 0`, or a non-finite/non-positive `k` => `InvalidParameter`
/// - `prices.len() < period` => every index `None`
/// - a window containing a non-finite price => `None` at that index only
pub fn calculate_bollinger(
    prices: &[f64],
    period: usize,
    k: f64,
) -> EngineResult<BollingerSeries> {
    if period == 0 {
        return Err(EngineError::InvalidParameter(
            "Bollinger period must be positive".to_string(),
        ));
    }
    if !k.is_finite() || k <= 0.0 {
        return Err(EngineError::InvalidParameter(
            "Bollinger band multiplier must be positive".to_string(),
        ));
    }

    let len = prices.len();
    let mut upper = vec![None; len];
    let mut middle = vec![None; len];
    let mut lower = vec![None; len];

    if len >= period {
        for i in (period - 1)..len {
            let window = &prices[i + 1 - period..=i];
            if window.iter().any(|v| !v.is_finite()) {
                continue;
            }

            let mean = window.iter().sum::<f64>() / period as f64;
            let variance =
                window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
            let std_dev = variance.sqrt();

            let up = mean + k * std_dev;
            let lo = mean - k * std_dev;
            if mean.is_finite() && up.is_finite() && lo.is_finite() {
                middle[i] = Some(mean);
                upper[i] = Some(up);
                lower[i] = Some(lo);
            }
        }
    }

    Ok(BollingerSeries {
        upper,
        middle,
        lower,
    })
}

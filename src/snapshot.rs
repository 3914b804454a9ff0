// =============================================================================
// Snapshot Builder — complete technical state for one timeframe
// =============================================================================
//
// Pipeline:
//   1. Compute all indicators (SMA, EMA, RSI, MACD, Bollinger, ATR)
//   2. Detect support/resistance levels
//   3. Classify each indicator into a per-indicator signal
//   4. Run the weighted vote for the overall signal
//   5. Classify the trend direction
//
// The snapshot is plain data: built once, never mutated, serialisable.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisParams;
use crate::error::{EngineError, EngineResult};
use crate::indicators::{
    calculate_atr, calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi,
    calculate_sma, last_value,
};
use crate::levels::{LevelDetector, SupportResistanceLevel};
use crate::series::PriceSeries;
use crate::signals::{weighted_vote, SignalInput};
use crate::types::{IndicatorValue, OverallSignal, Signal, TrendDirection};

// Vote weights across the four indicator families.
const WEIGHT_MACD: f64 = 0.30;
const WEIGHT_SMA_CROSS: f64 = 0.25;
const WEIGHT_RSI: f64 = 0.25;
const WEIGHT_BOLLINGER: f64 = 0.20;

/// One timeframe's complete derived state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub symbol: String,
    pub timeframe: String,
    pub moving_averages: Vec<IndicatorValue>,
    pub oscillators: Vec<IndicatorValue>,
    pub bands: Vec<IndicatorValue>,
    pub atr: IndicatorValue,
    pub support_levels: Vec<SupportResistanceLevel>,
    pub resistance_levels: Vec<SupportResistanceLevel>,
    pub trend_direction: TrendDirection,
    pub overall_signal: OverallSignal,
    pub last_close: f64,
    pub data_points: usize,
    pub generated_at: DateTime<Utc>,
}

/// Builds [`TechnicalSnapshot`]s from validated parameters.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    params: AnalysisParams,
    level_detector: LevelDetector,
}

impl SnapshotBuilder {
    pub fn new(params: AnalysisParams) -> EngineResult<Self> {
        params.validate()?;
        let level_detector = LevelDetector::from_params(&params)?;
        Ok(Self {
            params,
            level_detector,
        })
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Compute the full snapshot for one symbol/timeframe.
    ///
    /// # Errors
    /// - [`EngineError::NoData`] when the series is empty.
    /// - [`EngineError::InsufficientData`] when fewer bars are available than
    ///   the longest configured moving-average window requires.
    pub fn build(
        &self,
        symbol: &str,
        timeframe: &str,
        series: &PriceSeries,
    ) -> EngineResult<TechnicalSnapshot> {
        let Some(last_bar) = series.last() else {
            debug!(symbol, timeframe, "snapshot rejected: empty series");
            return Err(EngineError::NoData);
        };

        let required = self.params.min_bars();
        if series.len() < required {
            debug!(
                symbol,
                timeframe,
                available = series.len(),
                required,
                "snapshot rejected: insufficient data"
            );
            return Err(EngineError::InsufficientData {
                window: self.params.longest_window(),
                required,
                available: series.len(),
            });
        }

        let p = &self.params;
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let last_close = last_bar.close;

        // ── 1. Indicator arrays ──────────────────────────────────────────
        let sma_short = calculate_sma(&closes, p.sma_short)?;
        let sma_long = calculate_sma(&closes, p.sma_long)?;
        let ema_fast = calculate_ema(&closes, p.ema_fast)?;
        let ema_slow = calculate_ema(&closes, p.ema_slow)?;
        let rsi = calculate_rsi(&closes, p.rsi_period)?;
        let macd = calculate_macd(&closes, p.ema_fast, p.ema_slow, p.macd_signal)?;
        let bands = calculate_bollinger(&closes, p.bollinger_period, p.bollinger_k)?;
        let atr = calculate_atr(&highs, &lows, &closes, p.atr_period)?;

        let sma_short_v = last_value(&sma_short);
        let sma_long_v = last_value(&sma_long);
        let ema_fast_v = last_value(&ema_fast);
        let ema_slow_v = last_value(&ema_slow);
        let rsi_v = last_value(&rsi);
        let macd_v = last_value(&macd.macd);
        let macd_signal_v = last_value(&macd.signal);
        let macd_histogram_v = last_value(&macd.histogram);
        let bb_upper_v = last_value(&bands.upper);
        let bb_middle_v = last_value(&bands.middle);
        let bb_lower_v = last_value(&bands.lower);
        let atr_v = last_value(&atr);

        // ── 2. Per-indicator signals ─────────────────────────────────────
        let rsi_signal = classify_rsi(rsi_v);
        let macd_cross_signal = classify_pair(macd_v, macd_signal_v);
        let sma_cross_signal = classify_pair(sma_short_v, sma_long_v);
        let band_signal = classify_band_position(last_close, bb_upper_v, bb_lower_v);

        // ── 3. Weighted vote ─────────────────────────────────────────────
        let mut votes = Vec::with_capacity(4);
        if macd_v.is_some() && macd_signal_v.is_some() {
            votes.push(SignalInput::new("macd", WEIGHT_MACD, macd_cross_signal));
        }
        if sma_short_v.is_some() && sma_long_v.is_some() {
            votes.push(SignalInput::new(
                "sma_cross",
                WEIGHT_SMA_CROSS,
                sma_cross_signal,
            ));
        }
        if rsi_v.is_some() {
            votes.push(SignalInput::new("rsi", WEIGHT_RSI, rsi_signal));
        }
        if bb_upper_v.is_some() && bb_lower_v.is_some() {
            votes.push(SignalInput::new("bollinger", WEIGHT_BOLLINGER, band_signal));
        }
        let vote = weighted_vote(&votes);

        // ── 4. Trend classification ──────────────────────────────────────
        let trend_direction = classify_trend(
            last_close,
            sma_short_v,
            sma_long_v,
            macd_v,
            macd_signal_v,
            rsi_v,
        );

        // ── 5. Levels ────────────────────────────────────────────────────
        let levels = self.level_detector.detect(series);

        debug!(
            symbol,
            timeframe,
            trend = %trend_direction,
            overall = %vote.overall,
            score = vote.weighted_score,
            data_points = series.len(),
            "snapshot built"
        );

        Ok(TechnicalSnapshot {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            moving_averages: vec![
                IndicatorValue::new("sma", sma_short_v, sma_cross_signal, Some(p.sma_short)),
                IndicatorValue::new("sma", sma_long_v, Signal::Neutral, Some(p.sma_long)),
                IndicatorValue::new("ema", ema_fast_v, Signal::Neutral, Some(p.ema_fast)),
                IndicatorValue::new("ema", ema_slow_v, Signal::Neutral, Some(p.ema_slow)),
            ],
            oscillators: vec![
                IndicatorValue::new("rsi", rsi_v, rsi_signal, Some(p.rsi_period)),
                IndicatorValue::new("macd", macd_v, macd_cross_signal, None),
                IndicatorValue::new("macd_signal", macd_signal_v, Signal::Neutral, Some(p.macd_signal)),
                IndicatorValue::new("macd_histogram", macd_histogram_v, Signal::Neutral, None),
            ],
            bands: vec![
                IndicatorValue::new("bb_upper", bb_upper_v, band_signal, Some(p.bollinger_period)),
                IndicatorValue::new("bb_middle", bb_middle_v, band_signal, Some(p.bollinger_period)),
                IndicatorValue::new("bb_lower", bb_lower_v, band_signal, Some(p.bollinger_period)),
            ],
            atr: IndicatorValue::new("atr", atr_v, Signal::Neutral, Some(p.atr_period)),
            support_levels: levels.support,
            resistance_levels: levels.resistance,
            trend_direction,
            overall_signal: vote.overall,
            last_close,
            data_points: series.len(),
            generated_at: Utc::now(),
        })
    }
}

/// RSI bands: oversold buys, overbought sells.
fn classify_rsi(rsi: Option<f64>) -> Signal {
    match rsi {
        Some(r) if r <= 20.0 => Signal::StrongBuy,
        Some(r) if r <= 30.0 => Signal::Buy,
        Some(r) if r >= 80.0 => Signal::StrongSell,
        Some(r) if r >= 70.0 => Signal::Sell,
        _ => Signal::Neutral,
    }
}

/// Fast-line versus slow-line cross, shared by MACD and the SMA pair.
fn classify_pair(fast: Option<f64>, slow: Option<f64>) -> Signal {
    match (fast, slow) {
        (Some(f), Some(s)) if f > s => Signal::Buy,
        (Some(f), Some(s)) if f < s => Signal::Sell,
        _ => Signal::Neutral,
    }
}

/// Close relative to the Bollinger envelope (mean-reversion read).
fn classify_band_position(close: f64, upper: Option<f64>, lower: Option<f64>) -> Signal {
    match (upper, lower) {
        (Some(u), _) if close > u => Signal::Sell,
        (_, Some(l)) if close < l => Signal::Buy,
        _ => Signal::Neutral,
    }
}

/// Trend rule: price above both moving averages with momentum confirmation
/// is bullish; the symmetric opposite is bearish; anything else is sideways.
/// `Unknown` when the rule cannot be evaluated at all.
fn classify_trend(
    last_close: f64,
    sma_short: Option<f64>,
    sma_long: Option<f64>,
    macd: Option<f64>,
    macd_signal: Option<f64>,
    rsi: Option<f64>,
) -> TrendDirection {
    let (Some(short), Some(long)) = (sma_short, sma_long) else {
        return TrendDirection::Unknown;
    };

    // Momentum confirmation: MACD against its signal line, with RSI as the
    // alternative witness when one of them is unavailable.
    let (bullish_momentum, bearish_momentum) = match (macd, macd_signal, rsi) {
        (Some(m), Some(s), Some(r)) => (m > s || r > 50.0, m < s || r < 50.0),
        (Some(m), Some(s), None) => (m > s, m < s),
        (None, _, Some(r)) | (_, None, Some(r)) => (r > 50.0, r < 50.0),
        _ => return TrendDirection::Unknown,
    };

    if last_close > short && last_close > long && bullish_momentum {
        TrendDirection::Bullish
    } else if last_close < short && last_close < long && bearish_momentum {
        TrendDirection::Bearish
    } else {
        TrendDirection::Sideways
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;
    use chrono::TimeZone;

    fn series_from(values: &[f64]) -> PriceSeries {
        let bars = values
            .iter()
            .enumerate()
            .map(|(i, &v)| PriceBar {
                timestamp: Utc
                    .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                    .unwrap()
                    + chrono::Duration::days(i as i64),
                open: v,
                high: v + 0.5,
                low: (v - 0.5).max(0.0),
                close: v,
                volume: 1_000.0,
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new(AnalysisParams::default()).unwrap()
    }

    #[test]
    fn empty_series_is_no_data() {
        let err = builder().build("BTCUSDT", "1d", &PriceSeries::empty());
        assert!(matches!(err, Err(EngineError::NoData)));
    }

    #[test]
    fn short_series_is_insufficient_and_names_the_window() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let err = builder().build("BTCUSDT", "1d", &series_from(&values));
        match err {
            Err(EngineError::InsufficientData {
                window,
                required,
                available,
            }) => {
                assert_eq!(window, "SMA(50)");
                assert_eq!(required, 50);
                assert_eq!(available, 30);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn invalid_params_rejected_at_construction() {
        let mut p = AnalysisParams::default();
        p.sma_short = 0;
        assert!(SnapshotBuilder::new(p).is_err());
    }

    #[test]
    fn rising_series_is_bullish() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let snap = builder().build("BTCUSDT", "1d", &series_from(&values)).unwrap();
        assert_eq!(snap.trend_direction, TrendDirection::Bullish);
        assert_eq!(snap.data_points, 60);
        assert_eq!(snap.last_close, 159.0);
        assert_eq!(snap.symbol, "BTCUSDT");
        assert_eq!(snap.timeframe, "1d");
    }

    #[test]
    fn falling_series_is_bearish() {
        let values: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let snap = builder().build("ETHUSDT", "4h", &series_from(&values)).unwrap();
        assert_eq!(snap.trend_direction, TrendDirection::Bearish);
    }

    #[test]
    fn flat_series_is_sideways() {
        let values = vec![100.0; 60];
        let snap = builder().build("BTCUSDT", "1d", &series_from(&values)).unwrap();
        assert_eq!(snap.trend_direction, TrendDirection::Sideways);
    }

    #[test]
    fn flat_series_vote_follows_the_pegged_rsi() {
        // A flat series has zero average loss, so RSI sits at 100 and votes
        // StrongSell (-0.5 weighted) while every other voter is neutral.
        let values = vec![100.0; 60];
        let snap = builder().build("BTCUSDT", "1d", &series_from(&values)).unwrap();
        assert_eq!(snap.overall_signal, OverallSignal::WeakSell);
    }

    #[test]
    fn trend_unknown_when_momentum_is_unavailable() {
        // RSI window larger than the series and a MACD signal line that
        // cannot fill leave the momentum rule unevaluable.
        let mut p = AnalysisParams::default();
        p.rsi_period = 80;
        p.macd_signal = 40; // needs 26 + 40 - 1 = 65 bars
        let builder = SnapshotBuilder::new(p).unwrap();

        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let snap = builder.build("BTCUSDT", "1d", &series_from(&values)).unwrap();
        assert_eq!(snap.trend_direction, TrendDirection::Unknown);
    }

    #[test]
    fn moving_averages_carry_values_and_periods() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let snap = builder().build("BTCUSDT", "1d", &series_from(&values)).unwrap();

        assert_eq!(snap.moving_averages.len(), 4);
        let sma20 = &snap.moving_averages[0];
        assert_eq!(sma20.period, Some(20));
        // Trailing 20 values of 140..=159 average to 149.5.
        assert!((sma20.value.unwrap() - 149.5).abs() < 1e-9);
        assert_eq!(sma20.signal, Signal::Buy); // short above long

        let atr = &snap.atr;
        assert_eq!(atr.period, Some(14));
        assert!(atr.value.unwrap() > 0.0);
    }

    #[test]
    fn oscillators_are_internally_consistent() {
        let values: Vec<f64> = (0..80)
            .map(|i| 100.0 + (i as f64 * 0.4).sin() * 8.0 + i as f64 * 0.05)
            .collect();
        let snap = builder().build("BTCUSDT", "1d", &series_from(&values)).unwrap();

        let get = |name: &str| {
            snap.oscillators
                .iter()
                .find(|iv| iv.name == name)
                .and_then(|iv| iv.value)
        };
        let (macd, signal, histogram) = (get("macd"), get("macd_signal"), get("macd_histogram"));
        let (m, s, h) = (macd.unwrap(), signal.unwrap(), histogram.unwrap());
        assert_eq!(h, m - s);

        let rsi = get("rsi").unwrap();
        assert!((0.0..=100.0).contains(&rsi));
    }

    #[test]
    fn snapshot_levels_respect_touch_minimum() {
        // Repeated bounces off ~100 and rejections at ~110, padded long
        // enough to satisfy the 50-bar minimum.
        let mut values = Vec::new();
        for _ in 0..4 {
            values.extend_from_slice(&[
                104.0, 102.0, 100.0, 102.0, 104.0, 106.0, 108.0, 110.0, 108.0, 106.0, 104.5,
                102.5, 100.4, 102.0, 104.0, 106.0,
            ]);
        }
        let snap = builder().build("BTCUSDT", "1d", &series_from(&values)).unwrap();
        assert!(!snap.support_levels.is_empty());
        for level in snap.support_levels.iter().chain(&snap.resistance_levels) {
            assert!(level.touches >= 2);
            assert!((1..=10).contains(&level.strength));
            assert!(level.level > 0.0);
        }
    }
}

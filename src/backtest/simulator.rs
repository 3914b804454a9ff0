// =============================================================================
// Strategy Simulator — replay a strategy against a fixed price series
// =============================================================================
//
// Two strategy families share the same discipline: a fixed notional per
// trade and at most one open position per symbol.
//
//   Recommendation-based: replay external {date, recommendation, confidence}
//   records, pricing entries and exits at the nearest bar within a tolerance
//   window. Records below the confidence floor are ignored entirely.
//
//   Technical: walk the bars once and trade the crossovers of a named
//   moving-average rule computed by the indicator library.
//
// Empty inputs are deliberate policy, not an error: they produce a result
// with zero trades and zero return.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backtest::performance::{BacktestResult, PerformanceCalculator};
use crate::backtest::trade::{OpenTrade, Trade};
use crate::config::{AnalysisParams, BacktestParams};
use crate::error::{EngineError, EngineResult};
use crate::indicators::{calculate_ema, calculate_sma};
use crate::series::PriceSeries;
use crate::types::{Recommendation, TradeSide};

/// One externally supplied recommendation, as stored by the persistence
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub date: DateTime<Utc>,
    pub recommendation: Recommendation,
    pub confidence: f64,
}

/// The named crossover rules the technical family understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverRule {
    /// Short SMA crossing the long SMA.
    SmaCross,
    /// Fast EMA crossing the slow EMA.
    EmaCross,
}

impl CrossoverRule {
    /// Parse a caller-supplied strategy name.
    pub fn parse(name: &str) -> EngineResult<Self> {
        match name {
            "sma_cross" => Ok(Self::SmaCross),
            "ema_cross" => Ok(Self::EmaCross),
            other => Err(EngineError::InvalidParameter(format!(
                "unknown strategy '{other}' (expected sma_cross or ema_cross)"
            ))),
        }
    }
}

/// Replays strategies over price series and hands the trades to the
/// performance calculator.
#[derive(Debug, Clone)]
pub struct StrategySimulator {
    analysis: AnalysisParams,
    params: BacktestParams,
}

impl StrategySimulator {
    pub fn new(analysis: AnalysisParams, params: BacktestParams) -> EngineResult<Self> {
        analysis.validate()?;
        params.validate()?;
        Ok(Self { analysis, params })
    }

    // -------------------------------------------------------------------------
    // Recommendation-based strategy
    // -------------------------------------------------------------------------

    /// Replay a chronological recommendation history against the series.
    ///
    /// Buys open a position (when none is open) at the close of the nearest
    /// bar within the tolerance window; sells close it the same way. A
    /// recommendation with no bar within tolerance is skipped. A position
    /// still open at the end stays in the trade list as `Trade::Open`.
    pub fn run_recommendations(
        &self,
        symbol: &str,
        series: &PriceSeries,
        history: &[AnalysisRecord],
    ) -> BacktestResult {
        let strategy_name = "recommendation";

        if series.is_empty() || history.is_empty() {
            debug!(
                symbol,
                bars = series.len(),
                records = history.len(),
                "recommendation backtest on empty input: zero-trade result"
            );
            return PerformanceCalculator::summarize(symbol, strategy_name, vec![], series);
        }

        let tolerance = Duration::days(self.params.price_tolerance_days);
        let mut trades: Vec<Trade> = Vec::new();
        let mut open: Option<OpenTrade> = None;

        for record in history {
            if record.confidence < self.params.min_confidence {
                debug!(
                    symbol,
                    date = %record.date,
                    confidence = record.confidence,
                    floor = self.params.min_confidence,
                    "recommendation below confidence floor ignored"
                );
                continue;
            }

            match record.recommendation {
                Recommendation::Buy if open.is_none() => {
                    match series.nearest_bar(record.date, tolerance) {
                        Some(bar) => {
                            open = Some(OpenTrade::open(
                                symbol,
                                TradeSide::Buy,
                                bar.timestamp,
                                bar.close,
                                self.params.position_size,
                                &format!("buy (confidence {:.0})", record.confidence),
                            ));
                        }
                        None => {
                            debug!(
                                symbol,
                                date = %record.date,
                                "buy skipped: no bar within price tolerance"
                            );
                        }
                    }
                }
                Recommendation::Sell if open.is_some() => {
                    match series.nearest_bar(record.date, tolerance) {
                        Some(bar) => {
                            if let Some(position) = open.take() {
                                trades
                                    .push(Trade::Closed(position.close(bar.timestamp, bar.close)));
                            }
                        }
                        None => {
                            // The position stays open; only this exit is lost.
                            debug!(
                                symbol,
                                date = %record.date,
                                "sell skipped: no bar within price tolerance"
                            );
                        }
                    }
                }
                // A buy while a position is open, a sell without one, and
                // every hold are no-ops.
                Recommendation::Buy | Recommendation::Sell | Recommendation::Hold => {}
            }
        }

        if let Some(trade) = open {
            trades.push(Trade::Open(trade));
        }

        PerformanceCalculator::summarize(symbol, strategy_name, trades, series)
    }

    // -------------------------------------------------------------------------
    // Technical strategy
    // -------------------------------------------------------------------------

    /// Replay a named crossover rule bar-by-bar.
    ///
    /// A cross of the short series above the long one opens a position at
    /// that bar's close; a cross below closes it. Crossovers are evaluated
    /// only where both series are present on both sides of the bar.
    ///
    /// # Errors
    /// `InvalidParameter` for an unrecognised strategy name.
    pub fn run_technical(
        &self,
        symbol: &str,
        series: &PriceSeries,
        strategy_name: &str,
    ) -> EngineResult<BacktestResult> {
        let rule = CrossoverRule::parse(strategy_name)?;

        if series.is_empty() {
            debug!(symbol, strategy = strategy_name, "technical backtest on empty series");
            return Ok(PerformanceCalculator::summarize(
                symbol,
                strategy_name,
                vec![],
                series,
            ));
        }

        let closes = series.closes();
        let (short, long, signal_label) = match rule {
            CrossoverRule::SmaCross => (
                calculate_sma(&closes, self.analysis.sma_short)?,
                calculate_sma(&closes, self.analysis.sma_long)?,
                format!(
                    "sma_cross({}/{})",
                    self.analysis.sma_short, self.analysis.sma_long
                ),
            ),
            CrossoverRule::EmaCross => (
                calculate_ema(&closes, self.analysis.ema_fast)?,
                calculate_ema(&closes, self.analysis.ema_slow)?,
                format!(
                    "ema_cross({}/{})",
                    self.analysis.ema_fast, self.analysis.ema_slow
                ),
            ),
        };

        let bars = series.bars();
        let mut trades: Vec<Trade> = Vec::new();
        let mut open: Option<OpenTrade> = None;

        for i in 1..bars.len() {
            let (Some(s_prev), Some(l_prev), Some(s_now), Some(l_now)) =
                (short[i - 1], long[i - 1], short[i], long[i])
            else {
                continue;
            };

            let crossed_up = s_prev <= l_prev && s_now > l_now;
            let crossed_down = s_prev >= l_prev && s_now < l_now;

            if crossed_up && open.is_none() {
                open = Some(OpenTrade::open(
                    symbol,
                    TradeSide::Buy,
                    bars[i].timestamp,
                    bars[i].close,
                    self.params.position_size,
                    &signal_label,
                ));
            } else if crossed_down {
                if let Some(trade) = open.take() {
                    trades.push(Trade::Closed(trade.close(bars[i].timestamp, bars[i].close)));
                }
            }
        }

        if let Some(trade) = open {
            trades.push(Trade::Open(trade));
        }

        Ok(PerformanceCalculator::summarize(
            symbol,
            strategy_name,
            trades,
            series,
        ))
    }
}

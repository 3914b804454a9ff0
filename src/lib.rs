// =============================================================================
// Borealis — technical analysis & strategy backtesting engine
// =============================================================================

//! Turns raw OHLCV price series into derived indicator snapshots, clustered
//! support/resistance levels, multi-timeframe consensus views, and
//! deterministic strategy backtests.
//!
//! The engine is a pure, synchronous computation layer: no I/O, no shared
//! mutable state, no suspension points. Callers fetch the bars, choose the
//! fan-out strategy across symbols and timeframes, and serialise the plain
//! data structures this crate returns.
//!
//! # Quick tour
//!
//! ```rust,ignore
//! use borealis::{AnalysisParams, SnapshotBuilder, PriceSeries};
//!
//! let builder = SnapshotBuilder::new(AnalysisParams::default())?;
//! let snapshot = builder.build("BTCUSDT", "1d", &series)?;
//! println!("{} {}", snapshot.trend_direction, snapshot.overall_signal);
//! ```

// ── Module declarations ──────────────────────────────────────────────────────
pub mod backtest;
pub mod config;
pub mod error;
pub mod indicators;
pub mod levels;
pub mod logging;
pub mod multi_timeframe;
pub mod series;
pub mod signals;
pub mod snapshot;
pub mod types;

pub use backtest::{
    AnalysisRecord, BacktestResult, ClosedTrade, CrossoverRule, OpenTrade, PerformanceCalculator,
    StrategySimulator, Trade,
};
pub use config::{AnalysisParams, BacktestParams, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use levels::{DetectedLevels, LevelDetector, LevelKind, SupportResistanceLevel};
pub use multi_timeframe::{KeyLevels, MultiTimeframeAggregator, MultiTimeframeResult};
pub use series::{PriceBar, PriceSeries};
pub use snapshot::{SnapshotBuilder, TechnicalSnapshot};
pub use types::{
    IndicatorValue, OverallSignal, Recommendation, Signal, TradeSide, TrendDirection,
};

// =============================================================================
// Engine errors
// =============================================================================
//
// Every failure the engine can surface to a caller. The backtest simulator's
// "empty input => zero-trade result" rule is deliberate policy and does not
// pass through here; non-finite intermediate values become absent indicator
// outputs, never errors.

use thiserror::Error;

/// Errors surfaced by the analysis and backtesting engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The price series was empty.
    #[error("no price data available")]
    NoData,

    /// Not enough bars to fill the longest configured indicator window.
    #[error("insufficient data for {window}: need {required} bars, got {available}")]
    InsufficientData {
        /// The window that could not be filled, e.g. `SMA(50)`.
        window: String,
        required: usize,
        available: usize,
    },

    /// A caller-supplied parameter was out of range or unrecognised.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;

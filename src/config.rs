// =============================================================================
// Engine configuration — analysis and backtest tunables with atomic save
// =============================================================================
//
// Every tunable parameter of the engine lives here. Persistence uses an
// atomic tmp + rename pattern to prevent corruption on crash. All fields
// carry `#[serde(default)]` so that adding new fields never breaks loading an
// older config file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_sma_short() -> usize {
    20
}

fn default_sma_long() -> usize {
    50
}

fn default_ema_fast() -> usize {
    12
}

fn default_ema_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_rsi_period() -> usize {
    14
}

fn default_bollinger_period() -> usize {
    20
}

fn default_bollinger_k() -> f64 {
    2.0
}

fn default_atr_period() -> usize {
    14
}

fn default_pivot_window() -> usize {
    2
}

fn default_level_tolerance_pct() -> f64 {
    2.0
}

fn default_min_touches() -> usize {
    2
}

fn default_position_size() -> f64 {
    10_000.0
}

fn default_min_confidence() -> f64 {
    60.0
}

fn default_price_tolerance_days() -> i64 {
    7
}

// =============================================================================
// AnalysisParams
// =============================================================================

/// Indicator and level-detector periods used by the snapshot builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Short simple-moving-average window.
    #[serde(default = "default_sma_short")]
    pub sma_short: usize,

    /// Long simple-moving-average window. This is the longest window the
    /// snapshot builder requires, so it sets the minimum bar count.
    #[serde(default = "default_sma_long")]
    pub sma_long: usize,

    /// Fast EMA window (MACD fast line).
    #[serde(default = "default_ema_fast")]
    pub ema_fast: usize,

    /// Slow EMA window (MACD slow line).
    #[serde(default = "default_ema_slow")]
    pub ema_slow: usize,

    /// MACD signal-line smoothing window.
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,

    /// Standard-deviation multiplier for the Bollinger bands.
    #[serde(default = "default_bollinger_k")]
    pub bollinger_k: f64,

    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Neighbors on each side a bar must dominate to count as a pivot.
    #[serde(default = "default_pivot_window")]
    pub pivot_window: usize,

    /// Relative tolerance (percent) within which candidate levels merge.
    #[serde(default = "default_level_tolerance_pct")]
    pub level_tolerance_pct: f64,

    /// Minimum touches for a cluster to qualify as a level.
    #[serde(default = "default_min_touches")]
    pub min_touches: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            sma_short: default_sma_short(),
            sma_long: default_sma_long(),
            ema_fast: default_ema_fast(),
            ema_slow: default_ema_slow(),
            macd_signal: default_macd_signal(),
            rsi_period: default_rsi_period(),
            bollinger_period: default_bollinger_period(),
            bollinger_k: default_bollinger_k(),
            atr_period: default_atr_period(),
            pivot_window: default_pivot_window(),
            level_tolerance_pct: default_level_tolerance_pct(),
            min_touches: default_min_touches(),
        }
    }
}

impl AnalysisParams {
    /// Reject parameter combinations the engine cannot evaluate.
    pub fn validate(&self) -> EngineResult<()> {
        let periods = [
            ("sma_short", self.sma_short),
            ("sma_long", self.sma_long),
            ("ema_fast", self.ema_fast),
            ("ema_slow", self.ema_slow),
            ("macd_signal", self.macd_signal),
            ("rsi_period", self.rsi_period),
            ("bollinger_period", self.bollinger_period),
            ("atr_period", self.atr_period),
            ("pivot_window", self.pivot_window),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(EngineError::InvalidParameter(format!(
                    "{name} must be positive"
                )));
            }
        }
        if self.sma_short >= self.sma_long {
            return Err(EngineError::InvalidParameter(format!(
                "sma_short ({}) must be less than sma_long ({})",
                self.sma_short, self.sma_long
            )));
        }
        if self.ema_fast >= self.ema_slow {
            return Err(EngineError::InvalidParameter(format!(
                "ema_fast ({}) must be less than ema_slow ({})",
                self.ema_fast, self.ema_slow
            )));
        }
        if !self.bollinger_k.is_finite() || self.bollinger_k <= 0.0 {
            return Err(EngineError::InvalidParameter(
                "bollinger_k must be positive".to_string(),
            ));
        }
        if !self.level_tolerance_pct.is_finite() || self.level_tolerance_pct <= 0.0 {
            return Err(EngineError::InvalidParameter(
                "level_tolerance_pct must be positive".to_string(),
            ));
        }
        if self.min_touches < 2 {
            return Err(EngineError::InvalidParameter(
                "min_touches must be at least 2 (a single touch is not a level)".to_string(),
            ));
        }
        Ok(())
    }

    /// Bars required before the snapshot builder can run: the long
    /// moving-average window, whichever family it comes from.
    pub fn min_bars(&self) -> usize {
        self.sma_long.max(self.ema_slow)
    }

    /// Human-readable name of the longest window, for error reporting.
    pub fn longest_window(&self) -> String {
        if self.sma_long >= self.ema_slow {
            format!("SMA({})", self.sma_long)
        } else {
            format!("EMA({})", self.ema_slow)
        }
    }
}

// =============================================================================
// BacktestParams
// =============================================================================

/// Tunables for the strategy simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestParams {
    /// Fixed notional applied identically to every simulated trade.
    #[serde(default = "default_position_size")]
    pub position_size: f64,

    /// Recommendations below this confidence are ignored entirely.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Maximum distance between a recommendation date and the bar used to
    /// price it.
    #[serde(default = "default_price_tolerance_days")]
    pub price_tolerance_days: i64,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            position_size: default_position_size(),
            min_confidence: default_min_confidence(),
            price_tolerance_days: default_price_tolerance_days(),
        }
    }
}

impl BacktestParams {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.position_size.is_finite() || self.position_size <= 0.0 {
            return Err(EngineError::InvalidParameter(
                "position_size must be positive".to_string(),
            ));
        }
        if !self.min_confidence.is_finite() || !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(EngineError::InvalidParameter(
                "min_confidence must be within 0..=100".to_string(),
            ));
        }
        if self.price_tolerance_days <= 0 {
            return Err(EngineError::InvalidParameter(
                "price_tolerance_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration: analysis + backtest sections.
///
/// Every field has a serde default so that older JSON files missing new
/// fields will still deserialise correctly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub analysis: AnalysisParams,

    #[serde(default)]
    pub backtest: BacktestParams,
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise engine config")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }
}

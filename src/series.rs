// =============================================================================
// Price series — validated, immutable OHLCV history
// =============================================================================
//
// The engine operates on a contiguous array of fixed-field bars. Construction
// validates every bar and the chronological ordering once; after that the
// series is immutable and every accessor is read-only.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A single OHLCV price bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Check the per-bar invariants:
    /// all fields finite, `high >= max(open, close)`,
    /// `min(open, close) >= low >= 0`, `volume >= 0`.
    fn validate(&self) -> EngineResult<()> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::InvalidParameter(format!(
                "non-finite field in bar at {}",
                self.timestamp
            )));
        }
        if self.low < 0.0 || self.volume < 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "negative low or volume in bar at {}",
                self.timestamp
            )));
        }
        let body_high = self.open.max(self.close);
        let body_low = self.open.min(self.close);
        if self.high < body_high || body_low < self.low {
            return Err(EngineError::InvalidParameter(format!(
                "bar at {} violates high >= max(open, close) >= min(open, close) >= low",
                self.timestamp
            )));
        }
        Ok(())
    }
}

/// An ordered, validated sequence of price bars for one symbol/timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from chronological bars.
    ///
    /// Returns `InvalidParameter` when any bar violates the OHLCV invariants
    /// or when timestamps are not strictly increasing. An empty bar list is
    /// valid — downstream components decide how to treat it.
    pub fn new(bars: Vec<PriceBar>) -> EngineResult<Self> {
        for bar in &bars {
            bar.validate()?;
        }
        for pair in bars.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(EngineError::InvalidParameter(format!(
                    "timestamps must be strictly increasing: {} followed by {}",
                    pair[0].timestamp, pair[1].timestamp
                )));
            }
        }
        Ok(Self { bars })
    }

    /// A series with no bars.
    pub fn empty() -> Self {
        Self { bars: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn first(&self) -> Option<&PriceBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Dense close-price array (oldest first) for the indicator library.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// Find the bar closest to `date` within `tolerance` on either side.
    ///
    /// Returns `None` when no bar falls inside the window. When two bars are
    /// equally distant the earlier one wins, keeping lookups deterministic.
    pub fn nearest_bar(&self, date: DateTime<Utc>, tolerance: Duration) -> Option<&PriceBar> {
        if self.bars.is_empty() {
            return None;
        }
        // Timestamps are strictly increasing, so a binary partition narrows
        // the candidates down to the two bars straddling `date`.
        let idx = self.bars.partition_point(|b| b.timestamp < date);

        let mut best: Option<&PriceBar> = None;
        for candidate in [idx.checked_sub(1), Some(idx)].into_iter().flatten() {
            let Some(bar) = self.bars.get(candidate) else {
                continue;
            };
            let distance = (bar.timestamp - date).abs();
            if distance > tolerance {
                continue;
            }
            match best {
                Some(current) if (current.timestamp - date).abs() <= distance => {}
                _ => best = Some(bar),
            }
        }
        best
    }
}

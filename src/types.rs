// =============================================================================
// Shared types used across the Borealis analysis engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Per-indicator signal classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Signal {
    /// Numeric score used by the weighted vote: +2 .. -2.
    pub fn score(self) -> f64 {
        match self {
            Self::StrongBuy => 2.0,
            Self::Buy => 1.0,
            Self::Neutral => 0.0,
            Self::Sell => -1.0,
            Self::StrongSell => -2.0,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongBuy => write!(f, "StrongBuy"),
            Self::Buy => write!(f, "Buy"),
            Self::Neutral => write!(f, "Neutral"),
            Self::Sell => write!(f, "Sell"),
            Self::StrongSell => write!(f, "StrongSell"),
        }
    }
}

/// Snapshot-level signal on the full 7-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallSignal {
    StrongBuy,
    Buy,
    WeakBuy,
    Neutral,
    WeakSell,
    Sell,
    StrongSell,
}

impl std::fmt::Display for OverallSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongBuy => write!(f, "StrongBuy"),
            Self::Buy => write!(f, "Buy"),
            Self::WeakBuy => write!(f, "WeakBuy"),
            Self::Neutral => write!(f, "Neutral"),
            Self::WeakSell => write!(f, "WeakSell"),
            Self::Sell => write!(f, "Sell"),
            Self::StrongSell => write!(f, "StrongSell"),
        }
    }
}

/// Direction of the prevailing trend on one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Sideways,
    Unknown,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
            Self::Sideways => write!(f, "Sideways"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Side of a simulated trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// +1 for long exposure, -1 for short.
    pub fn direction(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "Buy"),
            Self::Sell => write!(f, "Sell"),
        }
    }
}

/// An externally supplied trading recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "Buy"),
            Self::Sell => write!(f, "Sell"),
            Self::Hold => write!(f, "Hold"),
        }
    }
}

/// A named scalar produced by the indicator library.
///
/// `value` is `None` when the underlying window has insufficient history or
/// the computation produced a non-finite number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorValue {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub signal: Signal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<usize>,
}

impl IndicatorValue {
    pub fn new(
        name: impl Into<String>,
        value: Option<f64>,
        signal: Signal,
        period: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            signal,
            period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_scores_are_symmetric() {
        assert_eq!(Signal::StrongBuy.score(), -Signal::StrongSell.score());
        assert_eq!(Signal::Buy.score(), -Signal::Sell.score());
        assert_eq!(Signal::Neutral.score(), 0.0);
    }

    #[test]
    fn enums_serialise_snake_case() {
        assert_eq!(
            serde_json::to_string(&OverallSignal::StrongBuy).unwrap(),
            "\"strong_buy\""
        );
        assert_eq!(
            serde_json::to_string(&TrendDirection::Sideways).unwrap(),
            "\"sideways\""
        );
        assert_eq!(
            serde_json::to_string(&Recommendation::Hold).unwrap(),
            "\"hold\""
        );
    }

    #[test]
    fn indicator_value_skips_absent_fields() {
        let iv = IndicatorValue::new("rsi", None, Signal::Neutral, None);
        let json = serde_json::to_string(&iv).unwrap();
        assert!(!json.contains("value"));
        assert!(!json.contains("period"));
    }
}

// =============================================================================
// Multi-Timeframe Aggregation
// =============================================================================
//
// Runs the snapshot builder once per requested timeframe and folds the
// results into a consensus view:
//
//   consensus_signal = majority vote across per-timeframe overall signals
//   trend_alignment  = every successful timeframe reports the same direction
//   key_levels       = per-timeframe support/resistance merged in input order
//
// A failure on one timeframe is recorded but never aborts the others —
// partial results are acceptable.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisParams;
use crate::error::EngineResult;
use crate::series::PriceSeries;
use crate::snapshot::{SnapshotBuilder, TechnicalSnapshot};
use crate::types::OverallSignal;

/// Support/resistance price sets merged across timeframes.
///
/// Merged means concatenated: clustering already happened per timeframe, and
/// a level seen on two timeframes is deliberately kept twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyLevels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

/// Aggregated view across all requested timeframes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiTimeframeResult {
    pub symbol: String,
    pub per_timeframe: BTreeMap<String, TechnicalSnapshot>,
    /// Timeframes whose snapshot failed, with the failure reason.
    pub failed: BTreeMap<String, String>,
    pub consensus_signal: OverallSignal,
    pub trend_alignment: bool,
    pub key_levels: KeyLevels,
}

/// Fans the snapshot builder out over timeframes and merges the results.
#[derive(Debug, Clone)]
pub struct MultiTimeframeAggregator {
    builder: SnapshotBuilder,
}

impl MultiTimeframeAggregator {
    pub fn new(params: AnalysisParams) -> EngineResult<Self> {
        Ok(Self {
            builder: SnapshotBuilder::new(params)?,
        })
    }

    /// Analyze `symbol` over the given `(timeframe, series)` pairs.
    ///
    /// Never fails as a whole: timeframes that cannot be analyzed end up in
    /// `failed` and the consensus is computed from the rest.
    pub fn analyze(
        &self,
        symbol: &str,
        frames: &[(&str, &PriceSeries)],
    ) -> MultiTimeframeResult {
        let mut per_timeframe = BTreeMap::new();
        let mut failed = BTreeMap::new();
        let mut key_levels = KeyLevels::default();
        let mut signals = Vec::with_capacity(frames.len());
        let mut directions = Vec::with_capacity(frames.len());

        for (timeframe, series) in frames {
            match self.builder.build(symbol, timeframe, series) {
                Ok(snapshot) => {
                    signals.push(snapshot.overall_signal);
                    directions.push(snapshot.trend_direction);
                    key_levels
                        .support
                        .extend(snapshot.support_levels.iter().map(|l| l.level));
                    key_levels
                        .resistance
                        .extend(snapshot.resistance_levels.iter().map(|l| l.level));
                    per_timeframe.insert(timeframe.to_string(), snapshot);
                }
                Err(err) => {
                    debug!(
                        symbol,
                        timeframe,
                        error = %err,
                        "timeframe skipped in multi-timeframe analysis"
                    );
                    failed.insert(timeframe.to_string(), err.to_string());
                }
            }
        }

        let consensus_signal = consensus_vote(&signals);
        // Alignment is a positive claim: it needs at least one snapshot.
        let trend_alignment =
            !directions.is_empty() && directions.iter().all(|d| *d == directions[0]);

        debug!(
            symbol,
            computed = per_timeframe.len(),
            failed = failed.len(),
            consensus = %consensus_signal,
            trend_alignment,
            "multi-timeframe analysis complete"
        );

        MultiTimeframeResult {
            symbol: symbol.to_string(),
            per_timeframe,
            failed,
            consensus_signal,
            trend_alignment,
            key_levels,
        }
    }
}

/// Equal-weight majority vote; an empty set or a tied vote is Neutral.
fn consensus_vote(signals: &[OverallSignal]) -> OverallSignal {
    if signals.is_empty() {
        return OverallSignal::Neutral;
    }

    let mut counts: HashMap<OverallSignal, usize> = HashMap::new();
    for signal in signals {
        *counts.entry(*signal).or_insert(0) += 1;
    }

    let max = counts.values().copied().max().unwrap_or(0);
    let mut leaders = counts
        .into_iter()
        .filter(|(_, count)| *count == max)
        .map(|(signal, _)| signal);

    match (leaders.next(), leaders.next()) {
        (Some(winner), None) => winner,
        _ => OverallSignal::Neutral,
    }
}

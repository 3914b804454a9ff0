// =============================================================================
// Weighted signal vote — per-indicator signals to one overall signal
// =============================================================================
//
// Each indicator contributes `weight * score` where score maps StrongBuy..
// StrongSell onto +2..-2. The weighted total lands in [-2, +2] and is mapped
// onto the 7-point overall scale with symmetric thresholds; anything inside
// the neutral band — including an exact tie — resolves to Neutral.

use serde::{Deserialize, Serialize};

use crate::types::{OverallSignal, Signal};

/// Strong-signal threshold on the weighted score.
const STRONG_THRESHOLD: f64 = 1.25;
/// Plain buy/sell threshold.
const FIRM_THRESHOLD: f64 = 0.75;
/// Weak-signal threshold; below this the vote is neutral.
const WEAK_THRESHOLD: f64 = 0.25;

/// A single voter in the weighted ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalInput {
    pub name: String,
    pub weight: f64,
    pub signal: Signal,
}

impl SignalInput {
    pub fn new(name: impl Into<String>, weight: f64, signal: Signal) -> Self {
        Self {
            name: name.into(),
            weight,
            signal,
        }
    }
}

/// The contribution of a single voter to the final score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalContribution {
    pub name: String,
    pub weight: f64,
    pub signal: Signal,
    pub contribution: f64,
}

/// Result of the weighted vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResult {
    pub weighted_score: f64,
    pub overall: OverallSignal,
    pub contributions: Vec<SignalContribution>,
}

/// Run the weighted vote over the given signal inputs.
///
/// An empty input list scores 0.0 and resolves to Neutral.
pub fn weighted_vote(inputs: &[SignalInput]) -> VoteResult {
    let mut contributions = Vec::with_capacity(inputs.len());
    let mut total = 0.0;

    for input in inputs {
        let contribution = input.weight * input.signal.score();
        contributions.push(SignalContribution {
            name: input.name.clone(),
            weight: input.weight,
            signal: input.signal,
            contribution,
        });
        total += contribution;
    }

    VoteResult {
        weighted_score: total,
        overall: map_score(total),
        contributions,
    }
}

fn map_score(total: f64) -> OverallSignal {
    if total >= STRONG_THRESHOLD {
        OverallSignal::StrongBuy
    } else if total >= FIRM_THRESHOLD {
        OverallSignal::Buy
    } else if total >= WEAK_THRESHOLD {
        OverallSignal::WeakBuy
    } else if total <= -STRONG_THRESHOLD {
        OverallSignal::StrongSell
    } else if total <= -FIRM_THRESHOLD {
        OverallSignal::Sell
    } else if total <= -WEAK_THRESHOLD {
        OverallSignal::WeakSell
    } else {
        OverallSignal::Neutral
    }
}

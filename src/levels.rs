// =============================================================================
// Support / Resistance level detection
// =============================================================================
//
// Pipeline:
//   1. Scan for pivot extrema — a bar whose low (high) dominates a symmetric
//      window of `pivot_window` neighbors on each side.
//   2. Candidates are stored densely in an arena and referenced by index.
//   3. Same-kind candidates within `tolerance_pct` of a cluster's running
//      mean merge into one cluster (level = mean of constituent prices,
//      touches = constituent count, last_touch = latest timestamp).
//   4. Clusters are classified against the recent average close, re-merged
//      per side, and clusters with fewer than `min_touches` touches are
//      discarded — a single touch is not a level.
//   5. Strength grows with touches and recency, clamped to 1..=10.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisParams;
use crate::error::{EngineError, EngineResult};
use crate::series::PriceSeries;

/// Window used for the recent-average-close classification boundary.
const RECENT_AVG_WINDOW: usize = 20;

/// Whether a level acts as a floor or a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

impl std::fmt::Display for LevelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Support => write!(f, "Support"),
            Self::Resistance => write!(f, "Resistance"),
        }
    }
}

/// A clustered price level touched at least twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportResistanceLevel {
    pub level: f64,
    pub kind: LevelKind,
    /// 1..=10, monotonic in touches and recency.
    pub strength: u8,
    pub touches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_touch: Option<DateTime<Utc>>,
}

/// Support and resistance lists, each sorted by strength descending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedLevels {
    pub support: Vec<SupportResistanceLevel>,
    pub resistance: Vec<SupportResistanceLevel>,
}

// ---------------------------------------------------------------------------
// Internal candidate arena
// ---------------------------------------------------------------------------

/// One pivot extremum. Candidates live densely in a `Vec` and clusters refer
/// to them by index only.
#[derive(Debug, Clone, Copy)]
struct PivotCandidate {
    price: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LevelCluster {
    level: f64,
    touches: usize,
    last_touch: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Clusters pivot extrema of one timeframe into support/resistance levels.
#[derive(Debug, Clone)]
pub struct LevelDetector {
    pivot_window: usize,
    tolerance_pct: f64,
    min_touches: usize,
}

impl LevelDetector {
    pub fn new(pivot_window: usize, tolerance_pct: f64, min_touches: usize) -> EngineResult<Self> {
        if pivot_window == 0 {
            return Err(EngineError::InvalidParameter(
                "pivot_window must be positive".to_string(),
            ));
        }
        if !tolerance_pct.is_finite() || tolerance_pct <= 0.0 {
            return Err(EngineError::InvalidParameter(
                "tolerance_pct must be positive".to_string(),
            ));
        }
        if min_touches < 2 {
            return Err(EngineError::InvalidParameter(
                "min_touches must be at least 2 (a single touch is not a level)".to_string(),
            ));
        }
        Ok(Self {
            pivot_window,
            tolerance_pct,
            min_touches,
        })
    }

    pub fn from_params(params: &AnalysisParams) -> EngineResult<Self> {
        Self::new(
            params.pivot_window,
            params.level_tolerance_pct,
            params.min_touches,
        )
    }

    /// Detect support and resistance levels over the full series.
    ///
    /// A series too short to contain a single pivot window yields empty
    /// lists rather than an error.
    pub fn detect(&self, series: &PriceSeries) -> DetectedLevels {
        let bars = series.bars();
        let w = self.pivot_window;
        if bars.len() < 2 * w + 1 {
            return DetectedLevels::default();
        }

        // --- 1. Pivot scan --------------------------------------------------
        let mut low_arena: Vec<PivotCandidate> = Vec::new();
        let mut high_arena: Vec<PivotCandidate> = Vec::new();

        for i in w..bars.len() - w {
            let window = &bars[i - w..=i + w];
            let bar = &bars[i];

            if bar.low > 0.0 && window.iter().all(|b| bar.low <= b.low) {
                low_arena.push(PivotCandidate {
                    price: bar.low,
                    timestamp: bar.timestamp,
                });
            }
            if bar.high > 0.0 && window.iter().all(|b| bar.high >= b.high) {
                high_arena.push(PivotCandidate {
                    price: bar.high,
                    timestamp: bar.timestamp,
                });
            }
        }

        // --- 2. Cluster per pivot kind -------------------------------------
        let low_clusters = self.cluster(&low_arena);
        let high_clusters = self.cluster(&high_arena);

        // --- 3. Classify against the recent average close ------------------
        let closes = series.closes();
        let tail = &closes[closes.len().saturating_sub(RECENT_AVG_WINDOW)..];
        let recent_avg = tail.iter().sum::<f64>() / tail.len() as f64;

        let mut support_clusters: Vec<LevelCluster> = Vec::new();
        let mut resistance_clusters: Vec<LevelCluster> = Vec::new();
        for cluster in low_clusters.into_iter().chain(high_clusters) {
            if cluster.level <= recent_avg {
                support_clusters.push(cluster);
            } else {
                resistance_clusters.push(cluster);
            }
        }

        // --- 4. Re-merge per side, drop thin clusters, score ---------------
        let support = self.finalize(support_clusters, LevelKind::Support, series);
        let resistance = self.finalize(resistance_clusters, LevelKind::Resistance, series);

        debug!(
            bars = bars.len(),
            support = support.len(),
            resistance = resistance.len(),
            "level detection complete"
        );

        DetectedLevels {
            support,
            resistance,
        }
    }

    /// Single deterministic grouping pass over price-sorted candidates: a
    /// candidate joins the current cluster while it sits within
    /// `tolerance_pct` of the cluster's running mean.
    fn cluster(&self, arena: &[PivotCandidate]) -> Vec<LevelCluster> {
        let mut order: Vec<usize> = (0..arena.len()).collect();
        order.sort_by(|&a, &b| {
            arena[a]
                .price
                .total_cmp(&arena[b].price)
                .then(arena[a].timestamp.cmp(&arena[b].timestamp))
        });

        let mut clusters: Vec<LevelCluster> = Vec::new();
        let mut members: Vec<usize> = Vec::new();
        let mut price_sum = 0.0;

        let flush = |members: &mut Vec<usize>, price_sum: &mut f64, out: &mut Vec<LevelCluster>| {
            let Some(last_touch) = members.iter().map(|&idx| arena[idx].timestamp).max() else {
                return;
            };
            out.push(LevelCluster {
                level: *price_sum / members.len() as f64,
                touches: members.len(),
                last_touch,
            });
            members.clear();
            *price_sum = 0.0;
        };

        for &idx in &order {
            let price = arena[idx].price;
            if !members.is_empty() {
                let mean = price_sum / members.len() as f64;
                let within = (price - mean) / mean * 100.0 <= self.tolerance_pct;
                if !within {
                    flush(&mut members, &mut price_sum, &mut clusters);
                }
            }
            members.push(idx);
            price_sum += price;
        }
        flush(&mut members, &mut price_sum, &mut clusters);

        clusters
    }

    /// Merge same-kind clusters that ended up within tolerance of each other,
    /// drop those with too few touches, score, and sort.
    fn finalize(
        &self,
        mut clusters: Vec<LevelCluster>,
        kind: LevelKind,
        series: &PriceSeries,
    ) -> Vec<SupportResistanceLevel> {
        clusters.sort_by(|a, b| a.level.total_cmp(&b.level));

        let mut merged: Vec<LevelCluster> = Vec::new();
        for cluster in clusters {
            match merged.last_mut() {
                Some(prev)
                    if (cluster.level - prev.level) / prev.level * 100.0
                        <= self.tolerance_pct =>
                {
                    // Touch-weighted mean keeps the merged level equal to the
                    // mean of all constituent pivot prices.
                    let total = prev.touches + cluster.touches;
                    prev.level = (prev.level * prev.touches as f64
                        + cluster.level * cluster.touches as f64)
                        / total as f64;
                    prev.touches = total;
                    prev.last_touch = prev.last_touch.max(cluster.last_touch);
                }
                _ => merged.push(cluster),
            }
        }

        let mut levels: Vec<SupportResistanceLevel> = merged
            .into_iter()
            .filter(|c| c.touches >= self.min_touches)
            .map(|c| SupportResistanceLevel {
                level: c.level,
                kind,
                strength: self.strength(&c, series),
                touches: c.touches,
                last_touch: Some(c.last_touch),
            })
            .collect();

        levels.sort_by(|a, b| {
            b.strength
                .cmp(&a.strength)
                .then(b.touches.cmp(&a.touches))
                .then(a.level.total_cmp(&b.level))
        });
        levels
    }

    /// Monotonic in touches (2 per touch, capped at five touches) with a +1
    /// recency bonus when the last touch falls in the most recent quarter of
    /// the series timespan.
    fn strength(&self, cluster: &LevelCluster, series: &PriceSeries) -> u8 {
        let base = 2 * cluster.touches.min(5);

        let bonus = match (series.first(), series.last()) {
            (Some(first), Some(last)) => {
                let span = last.timestamp - first.timestamp;
                let threshold = last.timestamp - span / 4;
                usize::from(cluster.last_touch >= threshold)
            }
            _ => 0,
        };

        (base + bonus).clamp(1, 10) as u8
    }
}

// =============================================================================
// Performance Calculator — trade list + benchmark series => BacktestResult
// =============================================================================
//
// All metrics are computed over closed trades only; trades still open at the
// simulation end stay in the trade list but never count toward the numbers.
// The benchmark price series contributes the buy-and-hold return and the
// maximum drawdown for comparison.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backtest::trade::{ClosedTrade, Trade};
use crate::series::PriceSeries;

/// Aggregated outcome of one backtest run. Built once, immutable, derived
/// entirely from the fixed trade list and the benchmark series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy_name: String,
    pub trades: Vec<Trade>,
    /// Closed trades only.
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// `winning / total * 100`; 0 when there are no closed trades.
    pub win_rate: f64,
    /// Capital-weighted sum of per-trade returns, in percent.
    pub total_return: f64,
    pub avg_hold_days: f64,
    /// Benchmark: first-to-last close return of the price series.
    pub buy_hold_return_pct: f64,
    /// Benchmark: largest peak-to-trough decline, as a positive percent.
    pub max_drawdown_pct: f64,
}

pub struct PerformanceCalculator;

impl PerformanceCalculator {
    /// Fold a trade list and its benchmark series into a result.
    pub fn summarize(
        symbol: &str,
        strategy_name: &str,
        trades: Vec<Trade>,
        series: &PriceSeries,
    ) -> BacktestResult {
        let closed: Vec<&ClosedTrade> = trades.iter().filter_map(Trade::as_closed).collect();

        let total_trades = closed.len();
        let winning_trades = closed.iter().filter(|t| t.profit_loss() > 0.0).count();
        let losing_trades = closed.iter().filter(|t| t.profit_loss() < 0.0).count();

        let win_rate = if total_trades == 0 {
            0.0
        } else {
            winning_trades as f64 / total_trades as f64 * 100.0
        };

        // Weight each trade's return by its share of the capital deployed;
        // with identical position sizes this reduces to the plain mean.
        let capital_deployed: f64 = closed.iter().map(|t| t.position_size).sum();
        let total_return = if capital_deployed > 0.0 {
            closed
                .iter()
                .map(|t| t.return_pct() * t.position_size)
                .sum::<f64>()
                / capital_deployed
        } else {
            0.0
        };

        let avg_hold_days = if total_trades == 0 {
            0.0
        } else {
            closed.iter().map(|t| t.hold_days() as f64).sum::<f64>() / total_trades as f64
        };

        let closes = series.closes();
        let buy_hold_return_pct = buy_hold_return(&closes);
        let max_drawdown_pct = max_drawdown(&closes);

        debug!(
            symbol,
            strategy = strategy_name,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            total_return,
            "backtest summarised"
        );

        BacktestResult {
            symbol: symbol.to_string(),
            strategy_name: strategy_name.to_string(),
            trades,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            total_return,
            avg_hold_days,
            buy_hold_return_pct,
            max_drawdown_pct,
        }
    }
}

fn buy_hold_return(closes: &[f64]) -> f64 {
    match (closes.first(), closes.last()) {
        (Some(&first), Some(&last)) if closes.len() >= 2 && first > 0.0 => {
            (last / first - 1.0) * 100.0
        }
        _ => 0.0,
    }
}

fn max_drawdown(closes: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &close in closes {
        if close > peak {
            peak = close;
        }
        if peak > 0.0 {
            let drawdown = (peak - close) / peak * 100.0;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::trade::OpenTrade;
    use crate::series::PriceBar;
    use crate::types::TradeSide;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap()
    }

    fn series_from(values: &[f64]) -> PriceSeries {
        let bars = values
            .iter()
            .enumerate()
            .map(|(i, &v)| PriceBar {
                timestamp: ts(i as u32 + 1),
                open: v,
                high: v,
                low: v,
                close: v,
                volume: 100.0,
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    fn closed(entry: f64, exit: f64, size: f64, entry_day: u32, exit_day: u32) -> Trade {
        Trade::Closed(
            OpenTrade::open("AAPL", TradeSide::Buy, ts(entry_day), entry, size, "test")
                .close(ts(exit_day), exit),
        )
    }

    #[test]
    fn empty_trades_and_series_yield_zeroes() {
        let result =
            PerformanceCalculator::summarize("AAPL", "recommendation", vec![], &PriceSeries::empty());
        assert_eq!(result.total_trades, 0);
        assert_eq!(result.winning_trades, 0);
        assert_eq!(result.losing_trades, 0);
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.total_return, 0.0);
        assert_eq!(result.avg_hold_days, 0.0);
        assert_eq!(result.buy_hold_return_pct, 0.0);
        assert_eq!(result.max_drawdown_pct, 0.0);
    }

    #[test]
    fn one_winner_one_loser_is_exactly_fifty_percent() {
        let trades = vec![
            closed(100.0, 110.0, 10_000.0, 1, 5),
            closed(100.0, 95.0, 10_000.0, 6, 9),
        ];
        let result = PerformanceCalculator::summarize(
            "AAPL",
            "recommendation",
            trades,
            &series_from(&[100.0, 105.0, 110.0]),
        );
        assert_eq!(result.total_trades, 2);
        assert_eq!(result.winning_trades, 1);
        assert_eq!(result.losing_trades, 1);
        assert_eq!(result.win_rate, 50.0);
    }

    #[test]
    fn breakeven_trade_counts_as_neither() {
        let trades = vec![
            closed(100.0, 100.0, 10_000.0, 1, 3),
            closed(100.0, 104.0, 10_000.0, 4, 6),
        ];
        let result = PerformanceCalculator::summarize(
            "AAPL",
            "recommendation",
            trades,
            &series_from(&[100.0, 104.0]),
        );
        assert_eq!(result.total_trades, 2);
        assert_eq!(result.winning_trades, 1);
        assert_eq!(result.losing_trades, 0);
    }

    #[test]
    fn open_trades_are_retained_but_not_counted() {
        let trades = vec![
            closed(100.0, 110.0, 10_000.0, 1, 5),
            Trade::Open(OpenTrade::open(
                "AAPL",
                TradeSide::Buy,
                ts(6),
                108.0,
                10_000.0,
                "test",
            )),
        ];
        let result = PerformanceCalculator::summarize(
            "AAPL",
            "recommendation",
            trades,
            &series_from(&[100.0, 110.0]),
        );
        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.total_trades, 1);
        assert_eq!(result.winning_trades, 1);
        assert_eq!(result.win_rate, 100.0);
        assert!((result.total_return - 10.0).abs() < 1e-10);
    }

    #[test]
    fn equal_sizes_reduce_to_the_mean_return() {
        let trades = vec![
            closed(100.0, 110.0, 10_000.0, 1, 5), // +10%
            closed(100.0, 104.0, 10_000.0, 6, 9), // +4%
        ];
        let result = PerformanceCalculator::summarize(
            "AAPL",
            "recommendation",
            trades,
            &series_from(&[100.0, 104.0]),
        );
        assert!((result.total_return - 7.0).abs() < 1e-10);
    }

    #[test]
    fn unequal_sizes_weight_by_capital_share() {
        let trades = vec![
            closed(100.0, 110.0, 30_000.0, 1, 5), // +10% on 3/4 of capital
            closed(100.0, 102.0, 10_000.0, 6, 9), // +2% on 1/4 of capital
        ];
        let result = PerformanceCalculator::summarize(
            "AAPL",
            "recommendation",
            trades,
            &series_from(&[100.0, 102.0]),
        );
        assert!((result.total_return - 8.0).abs() < 1e-10);
    }

    #[test]
    fn avg_hold_days_over_closed_trades() {
        let trades = vec![
            closed(100.0, 110.0, 10_000.0, 1, 5), // 4 days
            closed(100.0, 104.0, 10_000.0, 6, 12), // 6 days
        ];
        let result = PerformanceCalculator::summarize(
            "AAPL",
            "recommendation",
            trades,
            &series_from(&[100.0, 104.0]),
        );
        assert!((result.avg_hold_days - 5.0).abs() < 1e-10);
    }

    #[test]
    fn buy_hold_return_from_first_to_last_close() {
        let result = PerformanceCalculator::summarize(
            "AAPL",
            "recommendation",
            vec![],
            &series_from(&[100.0, 104.0, 120.0]),
        );
        assert!((result.buy_hold_return_pct - 20.0).abs() < 1e-10);
    }

    #[test]
    fn max_drawdown_finds_the_deepest_trough() {
        // Peak 120, trough 90: drawdown 25%.
        let result = PerformanceCalculator::summarize(
            "AAPL",
            "recommendation",
            vec![],
            &series_from(&[100.0, 120.0, 110.0, 90.0, 115.0]),
        );
        assert!((result.max_drawdown_pct - 25.0).abs() < 1e-10);
    }

    #[test]
    fn monotone_rise_has_zero_drawdown() {
        let result = PerformanceCalculator::summarize(
            "AAPL",
            "recommendation",
            vec![],
            &series_from(&[100.0, 101.0, 102.0, 103.0]),
        );
        assert_eq!(result.max_drawdown_pct, 0.0);
    }
}

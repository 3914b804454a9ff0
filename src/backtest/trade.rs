// =============================================================================
// Trade model — the open / closed life-cycle as distinct types
// =============================================================================
//
// An open trade carries only entry-side state. Closing consumes it and
// returns a `ClosedTrade`, so a trade can be closed exactly once and a
// "still open at report time" trade is a different type, not a bundle of
// nullable fields. `Trade` is the tagged union the result lists carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::types::TradeSide;

/// A position that has been entered but not yet exited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTrade {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
    /// Fixed notional committed to the trade.
    pub position_size: f64,
    /// The signal that opened the trade, e.g. `sma_cross(20/50)`.
    pub strategy_signal: String,
}

impl OpenTrade {
    pub fn open(
        symbol: &str,
        side: TradeSide,
        entry_date: DateTime<Utc>,
        entry_price: f64,
        position_size: f64,
        strategy_signal: &str,
    ) -> Self {
        let id = Uuid::new_v4().to_string();

        info!(
            id = %id,
            symbol,
            side = %side,
            entry_price,
            position_size,
            signal = strategy_signal,
            "trade opened"
        );

        Self {
            id,
            symbol: symbol.to_string(),
            side,
            entry_date,
            entry_price,
            position_size,
            strategy_signal: strategy_signal.to_string(),
        }
    }

    /// Close the trade, consuming it.
    pub fn close(self, exit_date: DateTime<Utc>, exit_price: f64) -> ClosedTrade {
        let closed = ClosedTrade {
            id: self.id,
            symbol: self.symbol,
            side: self.side,
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            position_size: self.position_size,
            strategy_signal: self.strategy_signal,
            exit_date,
            exit_price,
        };

        info!(
            id = %closed.id,
            symbol = %closed.symbol,
            exit_price,
            return_pct = closed.return_pct(),
            profit_loss = closed.profit_loss(),
            hold_days = closed.hold_days(),
            "trade closed"
        );

        closed
    }
}

/// A fully round-tripped trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
    pub position_size: f64,
    pub strategy_signal: String,
    pub exit_date: DateTime<Utc>,
    pub exit_price: f64,
}

impl ClosedTrade {
    /// Signed return in percent, positive when the trade made money.
    pub fn return_pct(&self) -> f64 {
        self.side.direction() * (self.exit_price / self.entry_price - 1.0) * 100.0
    }

    /// Profit or loss on the fixed notional.
    pub fn profit_loss(&self) -> f64 {
        self.position_size * self.return_pct() / 100.0
    }

    /// Whole days between entry and exit.
    pub fn hold_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

/// A trade in either life-cycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Trade {
    Open(OpenTrade),
    Closed(ClosedTrade),
}

impl Trade {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    pub fn as_closed(&self) -> Option<&ClosedTrade> {
        match self {
            Self::Closed(trade) => Some(trade),
            Self::Open(_) => None,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Open(trade) => &trade.symbol,
            Self::Closed(trade) => &trade.symbol,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap()
    }

    fn open_at(price: f64) -> OpenTrade {
        OpenTrade::open("AAPL", TradeSide::Buy, ts(1), price, 10_000.0, "test")
    }

    #[test]
    fn winning_long_round_trip() {
        let closed = open_at(100.0).close(ts(10), 110.0);
        assert!((closed.return_pct() - 10.0).abs() < 1e-10);
        assert!((closed.profit_loss() - 1_000.0).abs() < 1e-10);
        assert_eq!(closed.hold_days(), 9);
    }

    #[test]
    fn losing_long_round_trip() {
        let closed = open_at(100.0).close(ts(5), 92.0);
        assert!((closed.return_pct() + 8.0).abs() < 1e-10);
        assert!((closed.profit_loss() + 800.0).abs() < 1e-10);
        assert_eq!(closed.hold_days(), 4);
    }

    #[test]
    fn short_side_inverts_the_return() {
        let trade = OpenTrade::open("AAPL", TradeSide::Sell, ts(1), 100.0, 10_000.0, "test");
        let closed = trade.close(ts(3), 90.0);
        assert!((closed.return_pct() - 10.0).abs() < 1e-10);
    }

    #[test]
    fn same_day_close_holds_zero_days() {
        let closed = open_at(100.0).close(ts(1), 101.0);
        assert_eq!(closed.hold_days(), 0);
    }

    #[test]
    fn trade_ids_are_unique() {
        assert_ne!(open_at(100.0).id, open_at(100.0).id);
    }

    #[test]
    fn tagged_union_accessors() {
        let open = Trade::Open(open_at(100.0));
        assert!(open.is_open());
        assert!(open.as_closed().is_none());
        assert_eq!(open.symbol(), "AAPL");

        let closed = Trade::Closed(open_at(100.0).close(ts(2), 105.0));
        assert!(!closed.is_open());
        assert!(closed.as_closed().is_some());
    }

    #[test]
    fn serialises_with_a_status_tag() {
        let open = Trade::Open(open_at(100.0));
        let json = serde_json::to_string(&open).unwrap();
        assert!(json.contains("\"status\":\"open\""));

        let closed = Trade::Closed(open_at(100.0).close(ts(2), 105.0));
        let json = serde_json::to_string(&closed).unwrap();
        assert!(json.contains("\"status\":\"closed\""));
        assert!(json.contains("exit_price"));
    }
}

// 1.0: primitives and scale constants. every quantity in the engine is a scaled
// integer; the constants here pin which scale each kind of quantity carries.
// IDs and timestamps are newtypes so the compiler catches type mixups.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketIndex(pub u16);

impl fmt::Display for MarketIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

// 1.1: scale constants. prices and quote values carry 1e6, token balances and
// per-lp accumulators 1e9, weights and margin ratios 1e4.
pub const PRICE_PRECISION: i128 = 1_000_000;
pub const QUOTE_PRECISION: i128 = 1_000_000;
pub const SPOT_BALANCE_PRECISION: i128 = 1_000_000_000;
pub const BASE_PRECISION: i128 = 1_000_000_000;
pub const SPOT_WEIGHT_PRECISION: u32 = 10_000;
pub const MARGIN_PRECISION: u32 = 10_000;
pub const IMF_PRECISION: i128 = 1_000_000;

// flat quote charge per resting leveraged order
pub const OPEN_ORDER_MARGIN_REQUIREMENT: i128 = QUOTE_PRECISION / 100;

// the settlement market: all liabilities and collateral net out in this market
pub const QUOTE_MARKET_INDEX: MarketIndex = MarketIndex(0);

pub const FIVE_MINUTES_MS: i64 = 5 * 60 * 1000;

// normalized health compresses the raw [0,100] score below this floor to zero
pub const HEALTH_BUFFER: i128 = 10;

// 1.2: Initial gates new risk, Maintenance decides forced liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginCategory {
    Initial,
    Maintenance,
}

// sign of a spot balance is carried here, not on the scaled amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceType {
    Deposit,
    Borrow,
}

// 1.3: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}

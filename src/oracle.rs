// 3.0: oracle price snapshots and conservative price selection.
//
// The engine never fetches prices. The data-access layer hands it one
// OraclePrice per market, captured at a single instant, and valuation picks
// between the spot price and a live 5-minute TWAP depending on direction:
// lower for assets, higher for liabilities.

use crate::math::{self, MathError};
use crate::types::{Timestamp, FIVE_MINUTES_MS};
use serde::{Deserialize, Serialize};

// prices carry PRICE_PRECISION (1e6)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OraclePrice {
    pub current: i64,
    pub twap_5min: i64,
    pub historical_twap_5min: i64,
    // when the historical accumulator was last advanced
    pub twap_ts: Timestamp,
}

impl OraclePrice {
    pub fn stable(price: i64, ts: Timestamp) -> Self {
        Self {
            current: price,
            twap_5min: price,
            historical_twap_5min: price,
            twap_ts: ts,
        }
    }

    // 3.1: the stored accumulator lags the present. blend it toward the
    // current price by the time elapsed since its last update so the TWAP
    // reflects "now" rather than the last on-venue crank.
    pub fn live_twap_5min(&self, now: Timestamp) -> Result<i64, MathError> {
        let since = now.millis_since(self.twap_ts).min(FIVE_MINUTES_MS);
        let remaining = FIVE_MINUTES_MS - since;

        let weighted = math::add(
            math::mul(self.historical_twap_5min as i128, remaining as i128)?,
            math::mul(self.current as i128, since as i128)?,
        )?;
        let blended = math::div(weighted, FIVE_MINUTES_MS as i128)?;
        i64::try_from(blended).map_err(|_| MathError::Overflow("twap"))
    }

    pub fn strict(&self, now: Timestamp) -> Result<StrictOraclePrice, MathError> {
        Ok(StrictOraclePrice {
            current: self.current,
            twap_5min: Some(self.live_twap_5min(now)?),
        })
    }

    // non-strict valuation ignores the twap entirely
    pub fn relaxed(&self) -> StrictOraclePrice {
        StrictOraclePrice {
            current: self.current,
            twap_5min: None,
        }
    }
}

// 3.2: a price pair with a direction-dependent conservative read.
#[derive(Debug, Clone, Copy)]
pub struct StrictOraclePrice {
    pub current: i64,
    pub twap_5min: Option<i64>,
}

impl StrictOraclePrice {
    // asset-side price: undervalue what the account owns
    pub fn lower(&self) -> i64 {
        match self.twap_5min {
            Some(twap) => self.current.min(twap),
            None => self.current,
        }
    }

    // liability-side price: overvalue what the account owes
    pub fn upper(&self) -> i64 {
        match self.twap_5min {
            Some(twap) => self.current.max(twap),
            None => self.current,
        }
    }
}

// quote value of a token amount: token * price / 10^decimals, truncating
pub fn token_value(token_amount: i128, decimals: u32, price: i64) -> Result<i128, MathError> {
    if token_amount == 0 {
        return Ok(0);
    }
    math::mul_div(token_amount, price as i128, math::ten_pow(decimals)?)
}

// picks the conservative side of the pair for the amount's direction
pub fn strict_token_value(
    token_amount: i128,
    decimals: u32,
    price: &StrictOraclePrice,
) -> Result<i128, MathError> {
    let chosen = if token_amount >= 0 {
        price.lower()
    } else {
        price.upper()
    };
    token_value(token_amount, decimals, chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PRICE_PRECISION;

    fn price(p: i64) -> i64 {
        p * PRICE_PRECISION as i64
    }

    #[test]
    fn live_twap_blends_toward_current() {
        let oracle = OraclePrice {
            current: price(110),
            twap_5min: price(100),
            historical_twap_5min: price(100),
            twap_ts: Timestamp::from_millis(0),
        };

        // one minute into the window: 4/5 historical, 1/5 current
        let now = Timestamp::from_millis(60_000);
        assert_eq!(oracle.live_twap_5min(now).unwrap(), price(102));

        // a full window later the historical weight is gone
        let later = Timestamp::from_millis(FIVE_MINUTES_MS);
        assert_eq!(oracle.live_twap_5min(later).unwrap(), price(110));
    }

    #[test]
    fn strict_price_is_direction_dependent() {
        let strict = StrictOraclePrice {
            current: price(100),
            twap_5min: Some(price(95)),
        };
        assert_eq!(strict.lower(), price(95));
        assert_eq!(strict.upper(), price(100));

        let relaxed = StrictOraclePrice {
            current: price(100),
            twap_5min: None,
        };
        assert_eq!(relaxed.lower(), price(100));
        assert_eq!(relaxed.upper(), price(100));
    }

    #[test]
    fn token_value_scales_by_decimals() {
        // 2.5 tokens with 6 decimals at $40
        let value = token_value(2_500_000, 6, price(40)).unwrap();
        assert_eq!(value, 100 * QUOTE);

        // 9-decimal token, same economic amount
        let value = token_value(2_500_000_000, 9, price(40)).unwrap();
        assert_eq!(value, 100 * QUOTE);
    }

    #[test]
    fn strict_token_value_undervalues_assets_overvalues_debts() {
        let strict = StrictOraclePrice {
            current: price(100),
            twap_5min: Some(price(90)),
        };
        let deposit = strict_token_value(1_000_000, 6, &strict).unwrap();
        let borrow = strict_token_value(-1_000_000, 6, &strict).unwrap();
        assert_eq!(deposit, 90 * QUOTE);
        assert_eq!(borrow, -100 * QUOTE);
    }

    const QUOTE: i128 = crate::types::QUOTE_PRECISION;
}

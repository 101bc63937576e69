// 5.0: the position ledger. a read-only snapshot of what an account holds on
// the lending venue: spot balances (sign carried by the balance type) and
// leveraged share-based positions. every engine operation is a pure function
// over one of these snapshots; nothing here is ever mutated in place.

use crate::market::SpotMarketConfig;
use crate::math::MathError;
use crate::types::{AccountId, BalanceType, MarketIndex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpotPosition {
    pub market_index: MarketIndex,
    /// Unsigned venue-scaled balance; direction lives in `balance_type`.
    pub scaled_balance: u64,
    pub balance_type: BalanceType,
    /// Resting buy volume in token units, >= 0.
    pub open_bids: i64,
    /// Resting sell volume in token units, <= 0.
    pub open_asks: i64,
    pub open_orders: u8,
}

impl SpotPosition {
    pub fn deposit(market_index: MarketIndex, scaled_balance: u64) -> Self {
        Self {
            market_index,
            scaled_balance,
            balance_type: BalanceType::Deposit,
            open_bids: 0,
            open_asks: 0,
            open_orders: 0,
        }
    }

    pub fn borrow(market_index: MarketIndex, scaled_balance: u64) -> Self {
        Self {
            market_index,
            scaled_balance,
            balance_type: BalanceType::Borrow,
            open_bids: 0,
            open_asks: 0,
            open_orders: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scaled_balance == 0 && self.open_orders == 0 && self.open_bids == 0 && self.open_asks == 0
    }

    pub fn is_borrow(&self) -> bool {
        self.balance_type == BalanceType::Borrow && self.scaled_balance > 0
    }

    pub fn has_open_orders(&self) -> bool {
        self.open_orders > 0 || self.open_bids != 0 || self.open_asks != 0
    }

    // 5.1: signed token amount behind the scaled balance
    pub fn signed_token_amount(&self, market: &SpotMarketConfig) -> Result<i128, MathError> {
        market.token_amount(self.scaled_balance, self.balance_type)
    }
}

// 5.2: a leveraged (perp-equivalent) position. base/quote use entry
// accounting: pnl at price p is base*p + quote. lp fields track the share
// of the market's pooled exposure not yet folded into base/quote.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeveragedPosition {
    pub market_index: MarketIndex,
    /// BASE_PRECISION scale; sign is the position direction.
    pub base_asset_amount: i64,
    /// QUOTE_PRECISION scale; opposite sign to base for an open position.
    pub quote_asset_amount: i64,
    pub quote_entry_amount: i64,
    pub quote_break_even_amount: i64,
    pub lp_shares: u64,
    pub last_base_asset_amount_per_lp: i64,
    pub last_quote_asset_amount_per_lp: i64,
    /// Exponent the last_* accumulators are expressed in.
    pub per_lp_base: i8,
    /// Sub-step base amount carried between settlements.
    pub remainder_base_asset_amount: i64,
    pub open_bids: i64,
    pub open_asks: i64,
    pub open_orders: u8,
    pub last_cumulative_funding_rate: i64,
    pub settled_pnl: i64,
}

impl LeveragedPosition {
    pub fn flat(market_index: MarketIndex) -> Self {
        Self {
            market_index,
            base_asset_amount: 0,
            quote_asset_amount: 0,
            quote_entry_amount: 0,
            quote_break_even_amount: 0,
            lp_shares: 0,
            last_base_asset_amount_per_lp: 0,
            last_quote_asset_amount_per_lp: 0,
            per_lp_base: 0,
            remainder_base_asset_amount: 0,
            open_bids: 0,
            open_asks: 0,
            open_orders: 0,
            last_cumulative_funding_rate: 0,
            settled_pnl: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.base_asset_amount != 0
            || self.quote_asset_amount != 0
            || self.open_orders != 0
            || self.lp_shares != 0
    }

    pub fn has_open_orders(&self) -> bool {
        self.open_orders > 0 || self.open_bids != 0 || self.open_asks != 0
    }

    /// LP exposure persists until both the shares and the step remainder
    /// are gone.
    pub fn has_lp_exposure(&self) -> bool {
        self.lp_shares != 0 || self.remainder_base_asset_amount != 0
    }

    // 5.3: least favorable base amount assuming one whole side of the
    // resting orders fills. ties keep the bid side.
    pub fn worst_case_base_amount(&self) -> i128 {
        let all_bids_fill = self.base_asset_amount as i128 + self.open_bids as i128;
        let all_asks_fill = self.base_asset_amount as i128 + self.open_asks as i128;
        if all_bids_fill.abs() >= all_asks_fill.abs() {
            all_bids_fill
        } else {
            all_asks_fill
        }
    }
}

/// One point-in-time read of an account. Aggregates spot positions (unique
/// per market), leveraged positions, the venue's liquidation flag, and the
/// account's own margin-ratio override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    pub spot_positions: Vec<SpotPosition>,
    pub perp_positions: Vec<LeveragedPosition>,
    pub being_liquidated: bool,
    /// MARGIN_PRECISION scale; tightens Initial weights, never loosens.
    pub custom_margin_ratio: u32,
    /// Lifetime token flow totals, quote-market units.
    pub total_deposits: u64,
    pub total_withdraws: u64,
}

impl AccountSnapshot {
    pub fn empty(account_id: AccountId) -> Self {
        Self {
            account_id,
            spot_positions: Vec::new(),
            perp_positions: Vec::new(),
            being_liquidated: false,
            custom_margin_ratio: 0,
            total_deposits: 0,
            total_withdraws: 0,
        }
    }

    pub fn spot_position(&self, market_index: MarketIndex) -> Option<&SpotPosition> {
        self.spot_positions
            .iter()
            .find(|p| p.market_index == market_index)
    }

    pub fn perp_position(&self, market_index: MarketIndex) -> Option<&LeveragedPosition> {
        self.perp_positions
            .iter()
            .find(|p| p.market_index == market_index)
    }

    pub fn net_lifetime_deposits(&self) -> i128 {
        self.total_deposits as i128 - self.total_withdraws as i128
    }
}

//! Withdrawal and borrow limit calculation.
//!
//! How many tokens a market can release to the account right now, given
//! free collateral, the venue's guard throttles, and the low-risk depositor
//! bypass. Token conversions ceiling-divide so the engine never promises a
//! withdrawal the venue would reject.

use crate::engine::EngineError;
use crate::ledger::AccountSnapshot;
use crate::market::cap_asset_weight;
use crate::math;
use crate::types::{
    BalanceType, MarginCategory, MarketIndex, Timestamp, MARGIN_PRECISION, PRICE_PRECISION,
    QUOTE_PRECISION,
};
use crate::valuation::{valuate, OpenOrderBalances, ValuationRequest};
use crate::venue::VenueData;

/// Maximum token amount withdrawable from `market_index`, in the market's
/// own token precision. With `reduce_only` the account may only draw down
/// its deposit; otherwise remaining free collateral converts into extra
/// borrowable room.
pub fn withdrawal_limit<V: VenueData>(
    snapshot: &AccountSnapshot,
    venue: &V,
    market_index: MarketIndex,
    reduce_only: bool,
    open_order_balances: &OpenOrderBalances,
    now: Timestamp,
) -> Result<i128, EngineError> {
    let market = venue
        .spot_market(market_index)
        .ok_or(EngineError::SpotMarketNotFound(market_index))?;
    let oracle_price = venue
        .oracle_price(market_index)
        .ok_or(EngineError::OracleNotFound(market_index))?;
    let mut guards = venue.guard_limits(market_index, now);

    let request = ValuationRequest::weighted(MarginCategory::Initial, now)
        .with_balances(open_order_balances.clone());
    let valuation = valuate(snapshot, venue, &request)?;
    let free_collateral = (valuation.total_collateral() - valuation.margin_requirement()).max(0);
    let initial_margin_requirement = valuation.margin_requirement();

    // committed funds cannot leave, so they never count as withdrawable
    let committed = open_order_balances.get(&market_index).copied().unwrap_or(0);
    let deposit_amount = match snapshot.spot_position(market_index) {
        Some(position) if position.balance_type == BalanceType::Deposit => {
            math::sub(position.signed_token_amount(market)?, committed)?.max(0)
        }
        _ => 0,
    };
    let is_borrowing = snapshot
        .spot_position(market_index)
        .is_some_and(|p| p.is_borrow());

    // low-risk depositor bypass: small, never-borrowing accounts with
    // non-negative lifetime flow may exceed the standard throttle
    if !is_borrowing
        && snapshot.net_lifetime_deposits() >= 0
        && deposit_amount < market.withdraw_guard_threshold as i128 / 10
    {
        guards.withdraw_limit = guards.withdraw_limit.max(deposit_amount);
    }

    let mut asset_weight = market.asset_weight(deposit_amount, MarginCategory::Initial)?;
    if !market.is_quote_market() {
        asset_weight = cap_asset_weight(asset_weight, snapshot.custom_margin_ratio);
    }

    let withdrawable = if asset_weight == 0 || initial_margin_requirement == 0 {
        deposit_amount
    } else {
        free_collateral_to_tokens_ceil(
            free_collateral,
            asset_weight,
            oracle_price.current,
            market.decimals,
        )?
    };

    let max_withdraw = withdrawable
        .min(deposit_amount)
        .min(guards.withdraw_limit.abs());
    if reduce_only {
        return Ok(max_withdraw.max(0));
    }

    // borrow room comes from whatever free collateral is not already backing
    // this market's own deposit
    let remaining_free_collateral = if deposit_amount > 0 {
        let own = valuate(
            snapshot,
            venue,
            &ValuationRequest::weighted(MarginCategory::Initial, now)
                .with_balances(open_order_balances.clone())
                .without_open_orders()
                .with_filter(market_index),
        )?;
        (free_collateral - own.total_asset_value()).max(0)
    } else {
        free_collateral
    };

    let liability_weight = market.liability_weight(deposit_amount, MarginCategory::Initial)?;
    let borrow_value = math::mul_div(
        remaining_free_collateral,
        MARGIN_PRECISION as i128,
        liability_weight as i128,
    )?;
    let borrow_tokens = quote_value_to_tokens(borrow_value, oracle_price.current, market.decimals)?;

    let limit = math::add(max_withdraw, borrow_tokens)?.min(guards.borrow_limit.abs());
    Ok(limit.max(0))
}

// fc -> tokens, rounding up at each division per the venue's own accounting
fn free_collateral_to_tokens_ceil(
    free_collateral: i128,
    asset_weight: u32,
    oracle_price: i64,
    decimals: u32,
) -> Result<i128, EngineError> {
    let unweighted = math::div_ceil(
        math::mul(free_collateral, MARGIN_PRECISION as i128)?,
        asset_weight as i128,
    )?;
    let in_quote_precision = math::div_ceil(
        math::mul(unweighted, PRICE_PRECISION)?,
        oracle_price as i128,
    )?;
    Ok(math::mul_div(
        in_quote_precision,
        math::ten_pow(decimals)?,
        QUOTE_PRECISION,
    )?)
}

fn quote_value_to_tokens(
    value: i128,
    oracle_price: i64,
    decimals: u32,
) -> Result<i128, EngineError> {
    let in_quote_precision = math::mul_div(value, PRICE_PRECISION, oracle_price as i128)?;
    Ok(math::mul_div(
        in_quote_precision,
        math::ten_pow(decimals)?,
        QUOTE_PRECISION,
    )?)
}

// 6.0: LP-share settlement. a leveraged position that provides liquidity owns
// a slice of the market's pooled inventory, tracked as per-share accumulators.
// before valuing such a position the accumulated slice must be folded into the
// position's own base/quote amounts. this is a pure function: it returns a new
// position value and never touches the caller's snapshot.
// 6.1 has the increase/reduce/close/flip entry accounting at the bottom.

use crate::ledger::LeveragedPosition;
use crate::market::PerpMarketConfig;
use crate::math::{self, MathError};
use crate::types::BASE_PRECISION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionUpdateKind {
    Open,
    Increase,
    Reduce,
    Close,
    Flip,
}

#[derive(Debug, Clone)]
pub struct LpSettlement {
    pub position: LeveragedPosition,
    pub realized_pnl: i128,
    pub update_kind: Option<PositionUpdateKind>,
}

// 6.2: fold the pending per-share deltas into the position.
pub fn settle_lp_shares(
    position: &LeveragedPosition,
    market: &PerpMarketConfig,
) -> Result<LpSettlement, MathError> {
    let mut settled = *position;

    if position.lp_shares == 0 {
        return Ok(LpSettlement {
            position: settled,
            realized_pnl: 0,
            update_kind: None,
        });
    }

    // rebase the recorded accumulators if the market's exponent moved
    let mut last_base_per_lp = position.last_base_asset_amount_per_lp as i128;
    let mut last_quote_per_lp = position.last_quote_asset_amount_per_lp as i128;
    let expo_diff = market.per_lp_base as i32 - position.per_lp_base as i32;
    if expo_diff > 0 {
        let factor = math::ten_pow(expo_diff as u32)?;
        last_base_per_lp = math::mul(last_base_per_lp, factor)?;
        last_quote_per_lp = math::mul(last_quote_per_lp, factor)?;
    } else if expo_diff < 0 {
        let factor = math::ten_pow(expo_diff.unsigned_abs())?;
        last_base_per_lp = math::div(last_base_per_lp, factor)?;
        last_quote_per_lp = math::div(last_quote_per_lp, factor)?;
    }

    let shares = position.lp_shares as i128;
    let delta_base = math::mul_div(
        math::sub(market.base_asset_amount_per_lp as i128, last_base_per_lp)?,
        shares,
        BASE_PRECISION,
    )?;
    let delta_quote = math::mul_div(
        math::sub(market.quote_asset_amount_per_lp as i128, last_quote_per_lp)?,
        shares,
        BASE_PRECISION,
    )?;

    // only whole steps enter the position; the rest carries as remainder
    let step = market.order_step_size as i128;
    let (mut standard_delta, fresh_remainder) = math::standardize(delta_base, step)?;
    let mut remainder = math::add(position.remainder_base_asset_amount as i128, fresh_remainder)?;
    if remainder.abs() >= step {
        let (chunk, rest) = math::standardize(remainder, step)?;
        standard_delta = math::add(standard_delta, chunk)?;
        remainder = rest;
    }

    let outcome = apply_base_quote_delta(
        position.base_asset_amount as i128,
        position.quote_entry_amount as i128,
        position.quote_break_even_amount as i128,
        standard_delta,
        delta_quote,
    )?;

    settled.base_asset_amount = narrow(outcome.new_base)?;
    settled.quote_asset_amount = narrow(math::add(
        position.quote_asset_amount as i128,
        delta_quote,
    )?)?;
    settled.quote_entry_amount = narrow(outcome.new_entry)?;
    settled.quote_break_even_amount = narrow(outcome.new_break_even)?;
    settled.settled_pnl = narrow(math::add(
        position.settled_pnl as i128,
        outcome.realized_pnl,
    )?)?;
    settled.remainder_base_asset_amount = narrow(remainder)?;
    settled.last_base_asset_amount_per_lp = market.base_asset_amount_per_lp;
    settled.last_quote_asset_amount_per_lp = market.quote_asset_amount_per_lp;
    settled.per_lp_base = market.per_lp_base;

    // the LP also backs its share of the pool's resting orders
    if market.total_lp_shares > 0 {
        let pool_bids = math::mul_div(
            market.lp_open_bids as i128,
            shares,
            market.total_lp_shares as i128,
        )?;
        let pool_asks = math::mul_div(
            market.lp_open_asks as i128,
            shares,
            market.total_lp_shares as i128,
        )?;
        settled.open_bids = narrow(math::add(position.open_bids as i128, pool_bids)?)?;
        settled.open_asks = narrow(math::add(position.open_asks as i128, pool_asks)?)?;
    }

    Ok(LpSettlement {
        position: settled,
        realized_pnl: outcome.realized_pnl,
        update_kind: Some(outcome.kind),
    })
}

pub fn classify_update(existing_base: i128, delta_base: i128) -> PositionUpdateKind {
    if existing_base == 0 {
        PositionUpdateKind::Open
    } else if delta_base == 0 || existing_base.signum() == delta_base.signum() {
        PositionUpdateKind::Increase
    } else if delta_base.abs() < existing_base.abs() {
        PositionUpdateKind::Reduce
    } else if delta_base.abs() == existing_base.abs() {
        PositionUpdateKind::Close
    } else {
        PositionUpdateKind::Flip
    }
}

struct DeltaOutcome {
    kind: PositionUpdateKind,
    new_base: i128,
    new_entry: i128,
    new_break_even: i128,
    realized_pnl: i128,
}

// 6.1: entry accounting per update class.
// increase: entry absorbs the quote delta, nothing realizes.
// reduce/close: entry shrinks pro-rata, the difference realizes.
// flip: the prior side fully closes, entry restarts from the residual.
fn apply_base_quote_delta(
    base: i128,
    entry: i128,
    break_even: i128,
    delta_base: i128,
    delta_quote: i128,
) -> Result<DeltaOutcome, MathError> {
    let kind = classify_update(base, delta_base);
    let new_base = math::add(base, delta_base)?;

    let (new_entry, new_break_even, realized_pnl) = match kind {
        PositionUpdateKind::Open | PositionUpdateKind::Increase => (
            math::add(entry, delta_quote)?,
            math::add(break_even, delta_quote)?,
            0,
        ),
        PositionUpdateKind::Reduce => {
            let entry_shrink = math::mul_div(entry, delta_base.abs(), base.abs())?;
            let break_even_shrink = math::mul_div(break_even, delta_base.abs(), base.abs())?;
            (
                math::sub(entry, entry_shrink)?,
                math::sub(break_even, break_even_shrink)?,
                math::add(delta_quote, entry_shrink)?,
            )
        }
        PositionUpdateKind::Close => (0, 0, math::add(delta_quote, entry)?),
        PositionUpdateKind::Flip => {
            let residual_entry = math::sub(
                delta_quote,
                math::mul_div(delta_quote, base.abs(), delta_base.abs())?,
            )?;
            let realized = math::add(entry, math::sub(delta_quote, residual_entry)?)?;
            (residual_entry, residual_entry, realized)
        }
    };

    Ok(DeltaOutcome {
        kind,
        new_base,
        new_entry,
        new_break_even,
        realized_pnl,
    })
}

fn narrow(value: i128) -> Result<i64, MathError> {
    i64::try_from(value).map_err(|_| MathError::Overflow("narrow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketIndex;

    fn lp_market(base_per_lp: i64, quote_per_lp: i64) -> PerpMarketConfig {
        let mut market = PerpMarketConfig::sol_perp();
        market.base_asset_amount_per_lp = base_per_lp;
        market.quote_asset_amount_per_lp = quote_per_lp;
        market.total_lp_shares = 10 * BASE_PRECISION as u64;
        market
    }

    fn lp_position(shares: u64) -> LeveragedPosition {
        let mut position = LeveragedPosition::flat(MarketIndex(1));
        position.lp_shares = shares;
        position
    }

    #[test]
    fn no_shares_is_a_passthrough() {
        let mut position = LeveragedPosition::flat(MarketIndex(1));
        position.base_asset_amount = 50_000_000;
        let market = lp_market(777, 999);

        let settlement = settle_lp_shares(&position, &market).unwrap();
        assert_eq!(settlement.update_kind, None);
        assert_eq!(settlement.realized_pnl, 0);
        assert_eq!(
            settlement.position.base_asset_amount,
            position.base_asset_amount
        );
        assert_eq!(settlement.position.last_base_asset_amount_per_lp, 0);
    }

    #[test]
    fn settles_share_weighted_deltas() {
        // 1 share, per-lp base moved by one step (0.01), quote by -0.50
        let market = lp_market(10_000_000, -500_000);
        let position = lp_position(BASE_PRECISION as u64);

        let settlement = settle_lp_shares(&position, &market).unwrap();
        let settled = settlement.position;

        assert_eq!(settlement.update_kind, Some(PositionUpdateKind::Open));
        assert_eq!(settled.base_asset_amount, 10_000_000);
        assert_eq!(settled.quote_asset_amount, -500_000);
        assert_eq!(settled.quote_entry_amount, -500_000);
        assert_eq!(settled.remainder_base_asset_amount, 0);
        assert_eq!(settled.last_base_asset_amount_per_lp, 10_000_000);
    }

    #[test]
    fn sub_step_delta_carries_as_remainder() {
        // half a step accrues: nothing enters the position yet
        let market = lp_market(5_000_000, -250_000);
        let position = lp_position(BASE_PRECISION as u64);

        let settled = settle_lp_shares(&position, &market).unwrap().position;
        assert_eq!(settled.base_asset_amount, 0);
        assert_eq!(settled.remainder_base_asset_amount, 5_000_000);
        // quote still settles in full
        assert_eq!(settled.quote_asset_amount, -250_000);
        assert!(settled.has_lp_exposure());
    }

    #[test]
    fn accumulated_remainder_folds_into_base() {
        let market = lp_market(6_000_000, 0);
        let mut position = lp_position(BASE_PRECISION as u64);
        position.remainder_base_asset_amount = 7_000_000;

        // fresh delta 0.006 + carried 0.007 = 0.013: one step folds, 0.003 stays
        let settled = settle_lp_shares(&position, &market).unwrap().position;
        assert_eq!(settled.base_asset_amount, 10_000_000);
        assert_eq!(settled.remainder_base_asset_amount, 3_000_000);
    }

    #[test]
    fn rebase_scales_recorded_accumulators() {
        let mut market = lp_market(200_000_000, 0);
        market.per_lp_base = 1;

        let mut position = lp_position(BASE_PRECISION as u64);
        position.last_base_asset_amount_per_lp = 10_000_000; // recorded at exponent 0
        position.per_lp_base = 0;

        // recorded 0.01 rescales to 0.1 under the new exponent; delta = 0.1
        let settled = settle_lp_shares(&position, &market).unwrap().position;
        assert_eq!(settled.base_asset_amount, 100_000_000);
        assert_eq!(settled.per_lp_base, 1);
        assert_eq!(settled.last_base_asset_amount_per_lp, 200_000_000);
    }

    #[test]
    fn reduce_realizes_proportional_pnl() {
        // long 10 steps at 0.50 quote each; pool sells 4 steps back at 0.60
        let outcome = apply_base_quote_delta(
            100_000_000,  // 0.1 base
            -5_000_000,   // paid 5.00
            -5_000_000,
            -40_000_000,  // sell 0.04
            2_400_000,    // receive 2.40
        )
        .unwrap();

        assert_eq!(outcome.kind, PositionUpdateKind::Reduce);
        assert_eq!(outcome.new_base, 60_000_000);
        assert_eq!(outcome.new_entry, -3_000_000);
        // bought at 2.00, sold at 2.40
        assert_eq!(outcome.realized_pnl, 400_000);
    }

    #[test]
    fn close_realizes_against_full_entry() {
        let outcome =
            apply_base_quote_delta(100_000_000, -5_000_000, -5_000_000, -100_000_000, 6_000_000)
                .unwrap();
        assert_eq!(outcome.kind, PositionUpdateKind::Close);
        assert_eq!(outcome.new_base, 0);
        assert_eq!(outcome.new_entry, 0);
        assert_eq!(outcome.realized_pnl, 1_000_000);
    }

    #[test]
    fn flip_restarts_entry_from_residual() {
        // long 0.1 paid 5.00; delta sells 0.15 for 7.50 at the same price
        let outcome =
            apply_base_quote_delta(100_000_000, -5_000_000, -5_000_000, -150_000_000, 7_500_000)
                .unwrap();
        assert_eq!(outcome.kind, PositionUpdateKind::Flip);
        assert_eq!(outcome.new_base, -50_000_000);
        // residual short carries 2.50 of the proceeds
        assert_eq!(outcome.new_entry, 2_500_000);
        assert_eq!(outcome.realized_pnl, 0);
    }

    #[test]
    fn lp_inherits_pro_rata_order_exposure() {
        let mut market = lp_market(0, 0);
        market.lp_open_bids = 50_000_000;
        market.lp_open_asks = -30_000_000;

        // 1 of 10 pooled shares
        let position = lp_position(BASE_PRECISION as u64);
        let settled = settle_lp_shares(&position, &market).unwrap().position;
        assert_eq!(settled.open_bids, 5_000_000);
        assert_eq!(settled.open_asks, -3_000_000);
    }
}

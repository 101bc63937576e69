//! Market registry: per-market static parameters and the weighting curves.
//!
//! Weights are fractions scaled by `SPOT_WEIGHT_PRECISION`. The asset weight
//! discounts what a deposit is worth as collateral; the liability weight
//! inflates what a borrow costs in margin. Both bend with position size
//! through the IMF curve so concentrated positions carry stricter terms.

use crate::math::{self, MathError};
use crate::types::{
    BalanceType, MarginCategory, MarketIndex, BASE_PRECISION, IMF_PRECISION, MARGIN_PRECISION,
    QUOTE_MARKET_INDEX, SPOT_BALANCE_PRECISION, SPOT_WEIGHT_PRECISION,
};
use serde::{Deserialize, Serialize};

/// Static spot-market parameters, immutable for the life of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotMarketConfig {
    pub market_index: MarketIndex,
    /// Token decimal precision; token amounts carry 10^decimals.
    pub decimals: u32,
    pub initial_asset_weight: u32,
    pub maintenance_asset_weight: u32,
    pub initial_liability_weight: u32,
    pub maintenance_liability_weight: u32,
    /// Initial-margin-fraction factor for the size curves, IMF_PRECISION scale.
    pub imf_factor: u32,
    /// Token-amount threshold for the withdraw-guard bypass rule.
    pub withdraw_guard_threshold: u64,
    /// Minimum order increment in token units.
    pub order_step_size: u64,
}

impl SpotMarketConfig {
    /// The settlement market: everything nets out here at face value.
    pub fn quote_market() -> Self {
        Self {
            market_index: QUOTE_MARKET_INDEX,
            decimals: 6,
            initial_asset_weight: SPOT_WEIGHT_PRECISION,
            maintenance_asset_weight: SPOT_WEIGHT_PRECISION,
            initial_liability_weight: SPOT_WEIGHT_PRECISION,
            maintenance_liability_weight: SPOT_WEIGHT_PRECISION,
            imf_factor: 0,
            withdraw_guard_threshold: 1_000_000_000_000, // 1M tokens
            order_step_size: 100,
        }
    }

    /// A 9-decimal volatile collateral market with typical weights.
    pub fn sol_market() -> Self {
        Self {
            market_index: MarketIndex(1),
            decimals: 9,
            initial_asset_weight: 8_000,
            maintenance_asset_weight: 9_000,
            initial_liability_weight: 12_000,
            maintenance_liability_weight: 11_000,
            imf_factor: 3_000, // 0.003
            withdraw_guard_threshold: 100_000_000_000_000,
            order_step_size: 100_000_000,
        }
    }

    pub fn is_quote_market(&self) -> bool {
        self.market_index == QUOTE_MARKET_INDEX
    }

    /// Signed token amount behind a scaled balance. Deposits truncate,
    /// borrows round their magnitude up so debt is never understated.
    pub fn token_amount(
        &self,
        scaled_balance: u64,
        balance_type: BalanceType,
    ) -> Result<i128, MathError> {
        let numerator = math::mul(scaled_balance as i128, math::ten_pow(self.decimals)?)?;
        match balance_type {
            BalanceType::Deposit => math::div(numerator, SPOT_BALANCE_PRECISION),
            BalanceType::Borrow => Ok(-math::div_ceil(numerator, SPOT_BALANCE_PRECISION)?),
        }
    }

    pub fn asset_weight(
        &self,
        token_amount_abs: i128,
        category: MarginCategory,
    ) -> Result<u32, MathError> {
        match category {
            MarginCategory::Initial => size_discount_asset_weight(
                rescale_to_base_units(token_amount_abs, self.decimals)?,
                self.imf_factor,
                self.initial_asset_weight,
            ),
            MarginCategory::Maintenance => Ok(self.maintenance_asset_weight),
        }
    }

    pub fn liability_weight(
        &self,
        token_amount_abs: i128,
        category: MarginCategory,
    ) -> Result<u32, MathError> {
        match category {
            MarginCategory::Initial => size_premium_liability_weight(
                rescale_to_base_units(token_amount_abs, self.decimals)?,
                self.imf_factor,
                self.initial_liability_weight,
                SPOT_WEIGHT_PRECISION,
            ),
            MarginCategory::Maintenance => Ok(self.maintenance_liability_weight),
        }
    }
}

/// An account's stored margin-ratio override tightens the market weights.
/// It must never loosen them, so the asset side caps and the liability
/// side floors.
pub fn cap_asset_weight(weight: u32, custom_margin_ratio: u32) -> u32 {
    weight.min(SPOT_WEIGHT_PRECISION.saturating_sub(custom_margin_ratio))
}

pub fn floor_liability_weight(weight: u32, custom_margin_ratio: u32) -> u32 {
    weight.max(SPOT_WEIGHT_PRECISION.saturating_add(custom_margin_ratio))
}

// the size curves run on BASE_PRECISION (1e9) amounts regardless of the
// market's own decimals
fn rescale_to_base_units(token_amount_abs: i128, decimals: u32) -> Result<i128, MathError> {
    math::mul_div(token_amount_abs, BASE_PRECISION, math::ten_pow(decimals)?)
}

/// Asset weight shrinks as size grows: w = 1.1 / (1 + sqrt(size)·imf),
/// capped at the market's configured weight.
pub fn size_discount_asset_weight(
    size: i128,
    imf_factor: u32,
    asset_weight: u32,
) -> Result<u32, MathError> {
    if imf_factor == 0 {
        return Ok(asset_weight);
    }
    let size_sqrt = math::sqrt(math::add(math::mul(size.abs(), 10)?, 1)? as u128) as i128;
    let imf_numerator = math::add(IMF_PRECISION, IMF_PRECISION / 10)?;

    let denominator = math::add(
        IMF_PRECISION,
        math::mul_div(size_sqrt, imf_factor as i128, 100_000)?,
    )?;
    let discounted = math::div(
        math::mul(imf_numerator, SPOT_WEIGHT_PRECISION as i128)?,
        denominator,
    )?;
    Ok(asset_weight.min(discounted as u32))
}

/// Liability weight grows as size grows: w = 0.8·w + sqrt(size)·imf,
/// floored at the market's configured weight.
pub fn size_premium_liability_weight(
    size: i128,
    imf_factor: u32,
    liability_weight: u32,
    precision: u32,
) -> Result<u32, MathError> {
    if imf_factor == 0 {
        return Ok(liability_weight);
    }
    let size_sqrt = math::sqrt(math::add(math::mul(size.abs(), 10)?, 1)? as u128) as i128;
    let weight_numerator = liability_weight - liability_weight / 5;

    let denominator = math::mul_div(100_000, IMF_PRECISION, precision as i128)?;
    let premium = math::add(
        weight_numerator as i128,
        math::mul_div(size_sqrt, imf_factor as i128, denominator)?,
    )?;
    let premium = u32::try_from(premium).map_err(|_| MathError::Overflow("weight"))?;
    Ok(liability_weight.max(premium))
}

/// Static leveraged-market parameters plus the per-LP-share accumulators
/// captured with the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpMarketConfig {
    pub market_index: MarketIndex,
    /// MARGIN_PRECISION scale.
    pub margin_ratio_initial: u32,
    pub margin_ratio_maintenance: u32,
    pub imf_factor: u32,
    /// Minimum base increment; LP deltas standardize to this.
    pub order_step_size: u64,
    pub base_asset_amount_per_lp: i64,
    pub quote_asset_amount_per_lp: i64,
    /// Exponent the per-LP accumulators are currently expressed in.
    pub per_lp_base: i8,
    pub total_lp_shares: u64,
    /// Aggregate resting order exposure owned by the LP pool.
    pub lp_open_bids: i64,
    pub lp_open_asks: i64,
    pub quote_spot_market_index: MarketIndex,
}

impl PerpMarketConfig {
    pub fn sol_perp() -> Self {
        Self {
            market_index: MarketIndex(1),
            margin_ratio_initial: 1_000,    // 10x max leverage
            margin_ratio_maintenance: 500,  // liquidation at 20x
            imf_factor: 1_000,
            order_step_size: 10_000_000, // 0.01 base
            base_asset_amount_per_lp: 0,
            quote_asset_amount_per_lp: 0,
            per_lp_base: 0,
            total_lp_shares: 0,
            lp_open_bids: 0,
            lp_open_asks: 0,
            quote_spot_market_index: QUOTE_MARKET_INDEX,
        }
    }

    /// Margin ratio for a position of the given worst-case size, bent
    /// through the same premium curve as spot liabilities.
    pub fn margin_ratio(
        &self,
        base_amount_abs: i128,
        category: MarginCategory,
    ) -> Result<u32, MathError> {
        let base_ratio = match category {
            MarginCategory::Initial => self.margin_ratio_initial,
            MarginCategory::Maintenance => self.margin_ratio_maintenance,
        };
        size_premium_liability_weight(
            base_amount_abs,
            self.imf_factor,
            base_ratio,
            MARGIN_PRECISION,
        )
    }
}

/// Venue throttles for a market, read at a point in time. Signed; callers
/// take absolute values when capping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GuardLimits {
    pub borrow_limit: i128,
    pub withdraw_limit: i128,
}

impl GuardLimits {
    pub fn unlimited() -> Self {
        Self {
            borrow_limit: i128::MAX,
            withdraw_limit: i128::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_market_weights_are_face_value() {
        let quote = SpotMarketConfig::quote_market();
        assert!(quote.is_quote_market());
        assert_eq!(
            quote.asset_weight(1_000_000, MarginCategory::Initial).unwrap(),
            SPOT_WEIGHT_PRECISION
        );
        assert_eq!(
            quote
                .liability_weight(1_000_000, MarginCategory::Initial)
                .unwrap(),
            SPOT_WEIGHT_PRECISION
        );
    }

    #[test]
    fn deposit_truncates_borrow_rounds_up() {
        let market = SpotMarketConfig::quote_market();
        // 1.5 scaled units round differently per direction
        assert_eq!(market.token_amount(1_500, BalanceType::Deposit).unwrap(), 1);
        assert_eq!(market.token_amount(1_500, BalanceType::Borrow).unwrap(), -2);
        assert_eq!(market.token_amount(0, BalanceType::Borrow).unwrap(), 0);
    }

    #[test]
    fn small_size_keeps_configured_weights() {
        let market = SpotMarketConfig::sol_market();
        // 10 tokens is far below where the curve bites
        let amount = 10 * 1_000_000_000i128;
        assert_eq!(
            market.asset_weight(amount, MarginCategory::Initial).unwrap(),
            market.initial_asset_weight
        );
        assert_eq!(
            market
                .liability_weight(amount, MarginCategory::Initial)
                .unwrap(),
            market.initial_liability_weight
        );
    }

    #[test]
    fn large_size_tightens_both_weights() {
        let market = SpotMarketConfig::sol_market();
        let amount = 10_000_000 * 1_000_000_000i128; // 10M tokens

        let asset = market.asset_weight(amount, MarginCategory::Initial).unwrap();
        let liability = market
            .liability_weight(amount, MarginCategory::Initial)
            .unwrap();

        assert!(asset < market.initial_asset_weight);
        assert!(liability > market.initial_liability_weight);
    }

    #[test]
    fn maintenance_ignores_the_size_curve() {
        let market = SpotMarketConfig::sol_market();
        let amount = 10_000_000 * 1_000_000_000i128;
        assert_eq!(
            market
                .asset_weight(amount, MarginCategory::Maintenance)
                .unwrap(),
            market.maintenance_asset_weight
        );
    }

    #[test]
    fn custom_ratio_tightens_never_loosens() {
        assert_eq!(cap_asset_weight(8_000, 3_000), 7_000);
        assert_eq!(cap_asset_weight(8_000, 1_000), 8_000);
        assert_eq!(cap_asset_weight(8_000, 20_000), 0);

        assert_eq!(floor_liability_weight(12_000, 3_000), 13_000);
        assert_eq!(floor_liability_weight(12_000, 1_000), 12_000);
    }

    #[test]
    fn perp_margin_ratio_grows_with_size() {
        let market = PerpMarketConfig::sol_perp();
        let small = market
            .margin_ratio(1_000_000_000, MarginCategory::Initial)
            .unwrap();
        let large = market
            .margin_ratio(100_000_000 * 1_000_000_000, MarginCategory::Initial)
            .unwrap();
        assert_eq!(small, market.margin_ratio_initial);
        assert!(large > small);
        assert!(
            market
                .margin_ratio(1_000_000_000, MarginCategory::Maintenance)
                .unwrap()
                < small
        );
    }
}

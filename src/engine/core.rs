// 8.1: the engine itself. owns a venue handle and a config; every operation
// is a pure function of (snapshot, now) on top of them.

use super::config::EngineConfig;
use super::results::{AccountRiskReport, EngineError};
use crate::health;
use crate::ledger::AccountSnapshot;
use crate::limits;
use crate::margin::{margin_summary, MarginRequest, MarginSummary};
use crate::types::{MarginCategory, MarketIndex, Timestamp};
use crate::valuation::{valuate, OpenOrderBalances, ValuationRequest};
use crate::venue::VenueData;

#[derive(Debug, Clone)]
pub struct RiskEngine<V: VenueData> {
    venue: V,
    config: EngineConfig,
}

impl<V: VenueData> RiskEngine<V> {
    pub fn new(venue: V, config: EngineConfig) -> Self {
        Self { venue, config }
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // 8.2: health. collateral and requirement come from the same valuation
    // pass so the two can never mix oracle snapshots.
    pub fn health(&self, snapshot: &AccountSnapshot, now: Timestamp) -> Result<u8, EngineError> {
        let summary = self.health_margin_summary(snapshot, now)?;
        Ok(health::health_score(
            summary.total_collateral,
            summary.margin_requirement,
            snapshot.being_liquidated,
        )?)
    }

    pub fn normalized_health(
        &self,
        snapshot: &AccountSnapshot,
        now: Timestamp,
    ) -> Result<u8, EngineError> {
        let raw = self.health(snapshot, now)?;
        Ok(health::normalized_health(raw)?)
    }

    /// Face-value collateral, before any weighting.
    pub fn total_collateral_value(
        &self,
        snapshot: &AccountSnapshot,
        now: Timestamp,
    ) -> Result<i128, EngineError> {
        let valuation = valuate(snapshot, &self.venue, &ValuationRequest::unweighted(now))?;
        Ok(valuation.total_collateral())
    }

    /// Collateral under the health basis, strict pricing.
    pub fn total_weighted_collateral_value(
        &self,
        snapshot: &AccountSnapshot,
        now: Timestamp,
    ) -> Result<i128, EngineError> {
        Ok(self.health_margin_summary(snapshot, now)?.total_collateral)
    }

    /// Margin requirement under `category`. The liquidation buffer is drawn
    /// from the venue's global ratio iff the snapshot is flagged.
    pub fn margin_requirement(
        &self,
        snapshot: &AccountSnapshot,
        category: MarginCategory,
        now: Timestamp,
    ) -> Result<i128, EngineError> {
        let request = MarginRequest::for_snapshot(category, snapshot, &self.venue, now);
        Ok(margin_summary(snapshot, &self.venue, &request)?.margin_requirement)
    }

    pub fn free_collateral(
        &self,
        snapshot: &AccountSnapshot,
        now: Timestamp,
    ) -> Result<i128, EngineError> {
        let request = MarginRequest::new(MarginCategory::Initial, now);
        Ok(margin_summary(snapshot, &self.venue, &request)?.free_collateral())
    }

    pub fn withdrawal_limit(
        &self,
        snapshot: &AccountSnapshot,
        market_index: MarketIndex,
        reduce_only: bool,
        now: Timestamp,
    ) -> Result<i128, EngineError> {
        limits::withdrawal_limit(
            snapshot,
            &self.venue,
            market_index,
            reduce_only,
            &OpenOrderBalances::new(),
            now,
        )
    }

    pub fn withdrawal_limit_with_balances(
        &self,
        snapshot: &AccountSnapshot,
        market_index: MarketIndex,
        reduce_only: bool,
        open_order_balances: &OpenOrderBalances,
        now: Timestamp,
    ) -> Result<i128, EngineError> {
        limits::withdrawal_limit(
            snapshot,
            &self.venue,
            market_index,
            reduce_only,
            open_order_balances,
            now,
        )
    }

    /// Quote value to repay so health lands exactly on `target_health`.
    /// Weights are whole percentages.
    pub fn repay_amount_for_target_health(
        &self,
        snapshot: &AccountSnapshot,
        target_health: u32,
        repay_asset_weight: u32,
        repay_liability_weight: u32,
        now: Timestamp,
    ) -> Result<i128, EngineError> {
        let summary = self.health_margin_summary(snapshot, now)?;
        let current = health::health_score(
            summary.total_collateral,
            summary.margin_requirement,
            snapshot.being_liquidated,
        )?;
        health::repay_for_target_health(
            summary.total_collateral,
            summary.margin_requirement,
            current,
            target_health,
            repay_asset_weight,
            repay_liability_weight,
        )
    }

    pub fn account_report(
        &self,
        snapshot: &AccountSnapshot,
        now: Timestamp,
    ) -> Result<AccountRiskReport, EngineError> {
        let summary = self.health_margin_summary(snapshot, now)?;
        let health = health::health_score(
            summary.total_collateral,
            summary.margin_requirement,
            snapshot.being_liquidated,
        )?;

        Ok(AccountRiskReport {
            health,
            normalized_health: health::normalized_health(health)?,
            total_collateral: self.total_collateral_value(snapshot, now)?,
            weighted_collateral: summary.total_collateral,
            margin_requirement: summary.margin_requirement,
            free_collateral: summary.free_collateral(),
            being_liquidated: snapshot.being_liquidated,
        })
    }

    fn health_margin_summary(
        &self,
        snapshot: &AccountSnapshot,
        now: Timestamp,
    ) -> Result<MarginSummary, EngineError> {
        let mut request = MarginRequest::new(self.config.health_basis, now);
        request.strict = self.config.strict_health;
        margin_summary(snapshot, &self.venue, &request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SpotPosition;
    use crate::market::SpotMarketConfig;
    use crate::oracle::OraclePrice;
    use crate::types::{AccountId, PRICE_PRECISION, QUOTE_MARKET_INDEX, QUOTE_PRECISION};
    use crate::venue::InMemoryVenue;

    const NOW: Timestamp = Timestamp(1_700_000_000_000);

    fn engine() -> RiskEngine<InMemoryVenue> {
        let mut venue = InMemoryVenue::new();
        venue
            .add_spot_market(SpotMarketConfig::quote_market())
            .add_spot_market(SpotMarketConfig::sol_market())
            .set_oracle(
                QUOTE_MARKET_INDEX,
                OraclePrice::stable(PRICE_PRECISION as i64, NOW),
            )
            .set_oracle(
                MarketIndex(1),
                OraclePrice::stable(100 * PRICE_PRECISION as i64, NOW),
            );
        RiskEngine::new(venue, EngineConfig::default())
    }

    #[test]
    fn empty_account_reports_perfect_health() {
        let engine = engine();
        let snapshot = AccountSnapshot::empty(AccountId(1));

        let report = engine.account_report(&snapshot, NOW).unwrap();
        assert_eq!(report.health, 100);
        assert_eq!(report.normalized_health, 100);
        assert_eq!(report.total_collateral, 0);
        assert_eq!(report.margin_requirement, 0);
    }

    #[test]
    fn liquidation_flag_forces_zero_health() {
        let engine = engine();
        let mut snapshot = AccountSnapshot::empty(AccountId(1));
        snapshot
            .spot_positions
            .push(SpotPosition::deposit(QUOTE_MARKET_INDEX, 1_000_000_000_000));
        snapshot.being_liquidated = true;

        assert_eq!(engine.health(&snapshot, NOW).unwrap(), 0);
    }

    #[test]
    fn venue_parity_uses_maintenance_weights() {
        let mut venue = InMemoryVenue::new();
        venue
            .add_spot_market(SpotMarketConfig::quote_market())
            .add_spot_market(SpotMarketConfig::sol_market())
            .set_oracle(
                QUOTE_MARKET_INDEX,
                OraclePrice::stable(PRICE_PRECISION as i64, NOW),
            )
            .set_oracle(
                MarketIndex(1),
                OraclePrice::stable(100 * PRICE_PRECISION as i64, NOW),
            );

        let mut snapshot = AccountSnapshot::empty(AccountId(1));
        snapshot
            .spot_positions
            .push(SpotPosition::deposit(MarketIndex(1), 10_000_000_000));
        snapshot
            .spot_positions
            .push(SpotPosition::borrow(QUOTE_MARKET_INDEX, 500_000_000_000));

        let strict_engine = RiskEngine::new(venue.clone(), EngineConfig::default());
        let parity_engine = RiskEngine::new(venue, EngineConfig::venue_parity());

        // 80% vs 90% asset weight on the same deposit
        assert!(
            strict_engine
                .total_weighted_collateral_value(&snapshot, NOW)
                .unwrap()
                < parity_engine
                    .total_weighted_collateral_value(&snapshot, NOW)
                    .unwrap()
        );
        assert!(
            strict_engine.health(&snapshot, NOW).unwrap()
                <= parity_engine.health(&snapshot, NOW).unwrap()
        );
    }

    #[test]
    fn repay_solver_round_trips_through_the_engine() {
        let engine = engine();
        let mut snapshot = AccountSnapshot::empty(AccountId(1));
        snapshot
            .spot_positions
            .push(SpotPosition::deposit(MarketIndex(1), 10_000_000_000));
        snapshot
            .spot_positions
            .push(SpotPosition::borrow(QUOTE_MARKET_INDEX, 550_000_000_000));

        let health_before = engine.health(&snapshot, NOW).unwrap();
        assert_eq!(health_before, 31);

        let repay = engine
            .repay_amount_for_target_health(&snapshot, 60, 80, 110, NOW)
            .unwrap();
        assert!(repay > 0);
        assert!(repay < 550 * QUOTE_PRECISION);
    }
}

// Venue Data Integration
//
// This module abstracts how the engine receives venue state. The core engine
// is agnostic to whether snapshots come from an RPC node, an indexer, or a
// replay log. We define a trait any data-access layer can implement; the
// engine only ever sees already-resolved, internally-consistent values.
// There is no module-level state: callers construct and own their venue
// handle explicitly.

use crate::ledger::AccountSnapshot;
use crate::market::{GuardLimits, PerpMarketConfig, SpotMarketConfig};
use crate::oracle::OraclePrice;
use crate::types::{AccountId, MarketIndex, Timestamp};
use std::collections::HashMap;

/// Pre-resolved venue state for one decision. Implementations must hand the
/// engine values captured from a single consistent read; mixing reads across
/// calls is a caller error the engine cannot detect.
pub trait VenueData {
    fn spot_market(&self, market_index: MarketIndex) -> Option<&SpotMarketConfig>;

    fn perp_market(&self, market_index: MarketIndex) -> Option<&PerpMarketConfig>;

    fn oracle_price(&self, market_index: MarketIndex) -> Option<&OraclePrice>;

    fn account_snapshot(&self, account_id: AccountId) -> Option<&AccountSnapshot>;

    /// Venue throttles for a market at the given time. Absent data means
    /// unlimited, not an error.
    fn guard_limits(&self, market_index: MarketIndex, now: Timestamp) -> GuardLimits;

    /// Global liquidation-margin-buffer ratio, MARGIN_PRECISION scale.
    fn liquidation_buffer_ratio(&self) -> u32;
}

/// HashMap-backed venue for tests, replays, and the simulator.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVenue {
    spot_markets: HashMap<MarketIndex, SpotMarketConfig>,
    perp_markets: HashMap<MarketIndex, PerpMarketConfig>,
    oracles: HashMap<MarketIndex, OraclePrice>,
    accounts: HashMap<AccountId, AccountSnapshot>,
    guards: HashMap<MarketIndex, GuardLimits>,
    liquidation_buffer_ratio: u32,
}

impl InMemoryVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_spot_market(&mut self, market: SpotMarketConfig) -> &mut Self {
        self.spot_markets.insert(market.market_index, market);
        self
    }

    pub fn add_perp_market(&mut self, market: PerpMarketConfig) -> &mut Self {
        self.perp_markets.insert(market.market_index, market);
        self
    }

    pub fn set_oracle(&mut self, market_index: MarketIndex, price: OraclePrice) -> &mut Self {
        self.oracles.insert(market_index, price);
        self
    }

    pub fn set_guard_limits(&mut self, market_index: MarketIndex, limits: GuardLimits) -> &mut Self {
        self.guards.insert(market_index, limits);
        self
    }

    pub fn insert_account(&mut self, snapshot: AccountSnapshot) -> &mut Self {
        self.accounts.insert(snapshot.account_id, snapshot);
        self
    }

    pub fn set_liquidation_buffer_ratio(&mut self, ratio: u32) -> &mut Self {
        self.liquidation_buffer_ratio = ratio;
        self
    }
}

impl VenueData for InMemoryVenue {
    fn spot_market(&self, market_index: MarketIndex) -> Option<&SpotMarketConfig> {
        self.spot_markets.get(&market_index)
    }

    fn perp_market(&self, market_index: MarketIndex) -> Option<&PerpMarketConfig> {
        self.perp_markets.get(&market_index)
    }

    fn oracle_price(&self, market_index: MarketIndex) -> Option<&OraclePrice> {
        self.oracles.get(&market_index)
    }

    fn account_snapshot(&self, account_id: AccountId) -> Option<&AccountSnapshot> {
        self.accounts.get(&account_id)
    }

    fn guard_limits(&self, market_index: MarketIndex, _now: Timestamp) -> GuardLimits {
        self.guards
            .get(&market_index)
            .copied()
            .unwrap_or_else(GuardLimits::unlimited)
    }

    fn liquidation_buffer_ratio(&self) -> u32 {
        self.liquidation_buffer_ratio
    }
}

//! Margin requirement calculation for initial and maintenance categories.
//!
//! The requirement is the weighted value of everything liability-like:
//! borrows, worst-case order exposure, leveraged-position margin. Free
//! collateral is whatever weighted collateral exceeds it. A liquidation
//! buffer widens every liability weight so a liquidator sees the account
//! as underwater slightly before the venue does.

use crate::engine::EngineError;
use crate::ledger::AccountSnapshot;
use crate::types::{MarginCategory, Timestamp};
use crate::valuation::{valuate, OpenOrderBalances, ValuationRequest};
use crate::venue::VenueData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginSummary {
    /// Weighted collateral, signed (negative when PnL losses dominate).
    pub total_collateral: i128,
    pub margin_requirement: i128,
}

impl MarginSummary {
    pub fn free_collateral(&self) -> i128 {
        (self.total_collateral - self.margin_requirement).max(0)
    }

    pub fn meets_margin_requirement(&self) -> bool {
        self.total_collateral >= self.margin_requirement
    }
}

#[derive(Debug, Clone)]
pub struct MarginRequest {
    pub category: MarginCategory,
    /// MARGIN_PRECISION scale. Must be the venue's global buffer ratio when
    /// the account is flagged under liquidation, and None otherwise.
    pub liquidation_buffer: Option<u32>,
    pub include_open_orders: bool,
    pub strict: bool,
    pub open_order_balances: OpenOrderBalances,
    pub now: Timestamp,
}

impl MarginRequest {
    pub fn new(category: MarginCategory, now: Timestamp) -> Self {
        Self {
            category,
            liquidation_buffer: None,
            include_open_orders: true,
            strict: false,
            open_order_balances: OpenOrderBalances::new(),
            now,
        }
    }

    pub fn strict(category: MarginCategory, now: Timestamp) -> Self {
        Self {
            strict: true,
            ..Self::new(category, now)
        }
    }

    /// Buffer sourced from the venue's global ratio iff the snapshot is
    /// flagged under liquidation.
    pub fn for_snapshot<V: VenueData>(
        category: MarginCategory,
        snapshot: &AccountSnapshot,
        venue: &V,
        now: Timestamp,
    ) -> Self {
        let buffer = if snapshot.being_liquidated {
            Some(venue.liquidation_buffer_ratio())
        } else {
            None
        };
        Self {
            liquidation_buffer: buffer,
            ..Self::new(category, now)
        }
    }
}

pub fn margin_summary<V: VenueData>(
    snapshot: &AccountSnapshot,
    venue: &V,
    request: &MarginRequest,
) -> Result<MarginSummary, EngineError> {
    let valuation = valuate(
        snapshot,
        venue,
        &ValuationRequest {
            margin_category: Some(request.category),
            strict: request.strict,
            include_open_orders: request.include_open_orders,
            liquidation_buffer: request.liquidation_buffer,
            market_filter: None,
            open_order_balances: request.open_order_balances.clone(),
            now: request.now,
        },
    )?;

    Ok(MarginSummary {
        total_collateral: valuation.total_collateral(),
        margin_requirement: valuation.margin_requirement(),
    })
}

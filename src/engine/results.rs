// 8.0.2: result types and errors for engine operations.

use crate::math::MathError;
use crate::types::{AccountId, MarketIndex};

/// Everything the instruction-building layer reads for one account, in one
/// pass. Values carry QUOTE_PRECISION; health is the 0-100 integer score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRiskReport {
    pub health: u8,
    pub normalized_health: u8,
    pub total_collateral: i128,
    pub weighted_collateral: i128,
    pub margin_requirement: i128,
    pub free_collateral: i128,
    pub being_liquidated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Spot market {0} not found in registry snapshot")]
    SpotMarketNotFound(MarketIndex),

    #[error("Leveraged market {0} not found in registry snapshot")]
    PerpMarketNotFound(MarketIndex),

    #[error("No oracle price for market {0}")]
    OracleNotFound(MarketIndex),

    #[error("Account {0:?} not found")]
    AccountNotFound(AccountId),

    #[error("Target health {target} outside [0, 100]")]
    TargetHealthOutOfRange { target: u32 },

    #[error("Target health {target} does not exceed current health {current}")]
    TargetHealthNotAboveCurrent { target: u32, current: u8 },

    #[error("Repay asset weight {weight} outside [0, 100]")]
    RepayAssetWeightOutOfRange { weight: u32 },

    #[error("Repay liability weight {weight} below 100")]
    RepayLiabilityWeightTooLow { weight: u32 },

    #[error("Arithmetic error: {0}")]
    Math(#[from] MathError),
}

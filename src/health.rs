// 9.0: account health. one integer from 0 (liquidatable now) to 100 (no risk)
// summarizing weighted collateral against the margin requirement, plus the
// closed-form solve for how much to repay to reach a target score.

use crate::engine::EngineError;
use crate::math::{self, MathError};
use crate::types::HEALTH_BUFFER;

// 9.1: raw health score.
// a zero requirement with non-negative collateral is perfectly healthy even
// when the collateral itself is zero (the empty account); that rule is
// checked first so the zero-collateral rule cannot shadow it.
pub fn health_score(
    total_collateral: i128,
    margin_requirement: i128,
    being_liquidated: bool,
) -> Result<u8, MathError> {
    if being_liquidated {
        return Ok(0);
    }
    if margin_requirement == 0 && total_collateral >= 0 {
        return Ok(100);
    }
    if total_collateral <= 0 {
        return Ok(0);
    }

    // a dust requirement must not round up to a perfect score; 100 is
    // reserved for accounts with no requirement at all
    let ratio = math::div_round(
        math::mul(math::sub(total_collateral, margin_requirement)?, 100)?,
        total_collateral,
    )?;
    Ok(math::clamp(ratio, 0, 99) as u8)
}

// 9.2: compress the raw score into the stricter internal scale: everything
// at or below the buffer reads as zero and the rest stretches back to 100.
pub fn normalized_health(raw_health: u8) -> Result<u8, MathError> {
    let scaled = math::div(
        math::mul(math::sub(raw_health as i128, HEALTH_BUFFER)?, 100)?,
        100 - HEALTH_BUFFER,
    )?;
    Ok(math::clamp(scaled, 0, 100) as u8)
}

// 9.3: closed-form repay solve. reducing the liability side by
// repay * lw/100 and the collateral side by repay * aw/100 must land health
// exactly on target:
//   target/100 = 1 - (req - repay*lw/100) / (collateral - repay*aw/100)
// solved for repay and kept in integers throughout.
pub fn repay_for_target_health(
    total_collateral: i128,
    margin_requirement: i128,
    current_health: u8,
    target_health: u32,
    repay_asset_weight: u32,
    repay_liability_weight: u32,
) -> Result<i128, EngineError> {
    if target_health > 100 {
        return Err(EngineError::TargetHealthOutOfRange {
            target: target_health,
        });
    }
    if repay_asset_weight > 100 {
        return Err(EngineError::RepayAssetWeightOutOfRange {
            weight: repay_asset_weight,
        });
    }
    if repay_liability_weight < 100 {
        return Err(EngineError::RepayLiabilityWeightTooLow {
            weight: repay_liability_weight,
        });
    }
    if target_health <= current_health as u32 {
        return Err(EngineError::TargetHealthNotAboveCurrent {
            target: target_health,
            current: current_health,
        });
    }

    let target = target_health as i128;
    let numerator = math::add(
        math::mul(total_collateral, target - 100)?,
        math::mul(margin_requirement, 100)?,
    )?;
    let denominator = math::add(
        math::mul(repay_asset_weight as i128, target - 100)?,
        math::mul(repay_liability_weight as i128, 100)?,
    )?;
    let repay = math::div_round(math::mul(numerator, 100)?, denominator)?;
    Ok(repay)
}

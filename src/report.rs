// 10.0: human-readable rendering. engine math never leaves scaled i128; this
// is the one seam where raw values become decimals for logs and the
// simulator. Decimal handles the scale bookkeeping so display code cannot
// corrupt engine numbers.

use crate::engine::AccountRiskReport;
use crate::types::{PRICE_PRECISION, QUOTE_PRECISION};
use rust_decimal::Decimal;

const QUOTE_SCALE: u32 = 6;
const PRICE_SCALE: u32 = 6;

pub fn quote_value(value: i128) -> Decimal {
    debug_assert_eq!(10i128.pow(QUOTE_SCALE), QUOTE_PRECISION);
    Decimal::from_i128_with_scale(value, QUOTE_SCALE).normalize()
}

pub fn price(value: i64) -> Decimal {
    debug_assert_eq!(10i128.pow(PRICE_SCALE), PRICE_PRECISION);
    Decimal::from_i128_with_scale(value as i128, PRICE_SCALE).normalize()
}

pub fn token_amount(value: i128, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(value, decimals).normalize()
}

pub fn render(report: &AccountRiskReport) -> String {
    format!(
        "health {}/100 (normalized {}), collateral ${}, weighted ${}, \
         margin required ${}, free ${}{}",
        report.health,
        report.normalized_health,
        quote_value(report.total_collateral),
        quote_value(report.weighted_collateral),
        quote_value(report.margin_requirement),
        quote_value(report.free_collateral),
        if report.being_liquidated {
            " [LIQUIDATION]"
        } else {
            ""
        },
    )
}

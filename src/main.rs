//! Margin Risk Engine Simulation.
//!
//! Walks representative account shapes through the engine: valuation and
//! health, worst-case order pricing, LP settlement, withdrawal limits, and
//! the repay-for-target-health solver.

use risk_core::*;

fn main() {
    println!("Margin Account Risk Engine Simulation");
    println!("One venue snapshot, pure valuation, no I/O\n");

    scenario_1_healthy_depositor();
    scenario_2_leveraged_borrower();
    scenario_3_resting_orders();
    scenario_4_lp_settlement();
    scenario_5_withdrawal_limits();
    scenario_6_repay_solver();

    println!("\nAll simulations completed successfully.");
}

const NOW: Timestamp = Timestamp(1_700_000_000_000);
const SOL: MarketIndex = MarketIndex(1);

fn demo_engine() -> RiskEngine<InMemoryVenue> {
    let mut venue = InMemoryVenue::new();
    venue
        .add_spot_market(SpotMarketConfig::quote_market())
        .add_spot_market(SpotMarketConfig::sol_market())
        .add_perp_market(PerpMarketConfig::sol_perp())
        .set_oracle(QUOTE_MARKET_INDEX, OraclePrice::stable(PRICE_PRECISION as i64, NOW))
        .set_oracle(SOL, OraclePrice::stable(100 * PRICE_PRECISION as i64, NOW))
        .set_liquidation_buffer_ratio(200);
    RiskEngine::new(venue, EngineConfig::default())
}

/// Quote-only depositor: no liabilities, full health.
fn scenario_1_healthy_depositor() {
    println!("Scenario 1: Healthy Depositor\n");

    let engine = demo_engine();
    let mut snapshot = AccountSnapshot::empty(AccountId(1));
    snapshot
        .spot_positions
        .push(SpotPosition::deposit(QUOTE_MARKET_INDEX, 50_000_000_000_000));
    snapshot.total_deposits = 50_000_000_000;

    println!("  Alice deposits $50,000 in the quote market");
    let account = engine.account_report(&snapshot, NOW).unwrap();
    println!("  {}\n", report::render(&account));
}

/// Volatile collateral backing a quote borrow.
fn scenario_2_leveraged_borrower() {
    println!("Scenario 2: Leveraged Borrower\n");

    let engine = demo_engine();
    let mut snapshot = AccountSnapshot::empty(AccountId(2));
    snapshot
        .spot_positions
        .push(SpotPosition::deposit(SOL, 100_000_000_000)); // 100 SOL @ $100
    snapshot
        .spot_positions
        .push(SpotPosition::borrow(QUOTE_MARKET_INDEX, 6_000_000_000_000)); // $6,000

    println!("  Bob holds 100 SOL ($10,000) and borrows $6,000");
    let account = engine.account_report(&snapshot, NOW).unwrap();
    println!("  {}", report::render(&account));

    let maintenance = engine
        .margin_requirement(&snapshot, MarginCategory::Maintenance, NOW)
        .unwrap();
    println!(
        "  Maintenance requirement: ${}\n",
        report::quote_value(maintenance)
    );
}

/// Resting orders price at their worst-case fill.
fn scenario_3_resting_orders() {
    println!("Scenario 3: Worst-Case Resting Orders\n");

    let engine = demo_engine();
    let mut snapshot = AccountSnapshot::empty(AccountId(3));
    let mut position = SpotPosition::deposit(SOL, 50_000_000_000); // 50 SOL
    position.open_bids = 20_000_000_000; // bid for 20 more
    position.open_asks = -30_000_000_000; // offer 30 away
    position.open_orders = 2;
    snapshot.spot_positions.push(position);

    println!("  Carol holds 50 SOL, bids for 20, offers 30");
    let weighted = engine
        .total_weighted_collateral_value(&snapshot, NOW)
        .unwrap();
    let plain = engine.total_collateral_value(&snapshot, NOW).unwrap();
    println!(
        "  Collateral ${} face, ${} weighted at the worse fill direction\n",
        report::quote_value(plain),
        report::quote_value(weighted)
    );
}

/// LP shares settle before valuation.
fn scenario_4_lp_settlement() {
    println!("Scenario 4: LP Settlement\n");

    let mut market = PerpMarketConfig::sol_perp();
    market.base_asset_amount_per_lp = 25_000_000; // 0.025 base accrued per share
    market.quote_asset_amount_per_lp = -2_400_000; // -2.40 quote per share
    market.total_lp_shares = 100 * BASE_PRECISION as u64;

    let mut position = LeveragedPosition::flat(SOL);
    position.lp_shares = 2 * BASE_PRECISION as u64;

    let settlement = settle_lp_shares(&position, &market).unwrap();
    let settled = settlement.position;

    println!("  Dave owns 2 LP shares; the pool accrued 0.025 base / -$2.40 per share");
    println!(
        "  Settled: {} base, ${} quote, remainder {} base, update {:?}",
        report::token_amount(settled.base_asset_amount as i128, 9),
        report::quote_value(settled.quote_asset_amount as i128),
        report::token_amount(settled.remainder_base_asset_amount as i128, 9),
        settlement.update_kind.unwrap(),
    );
    println!();
}

/// Guard limits and the low-risk depositor bypass.
fn scenario_5_withdrawal_limits() {
    println!("Scenario 5: Withdrawal Limits\n");

    let engine = demo_engine();
    let mut snapshot = AccountSnapshot::empty(AccountId(5));
    snapshot
        .spot_positions
        .push(SpotPosition::deposit(SOL, 100_000_000_000));
    snapshot
        .spot_positions
        .push(SpotPosition::borrow(QUOTE_MARKET_INDEX, 6_000_000_000_000));
    snapshot.total_deposits = 10_000_000_000;

    let reduce_only = engine
        .withdrawal_limit(&snapshot, SOL, true, NOW)
        .unwrap();
    let with_borrow = engine
        .withdrawal_limit(&snapshot, SOL, false, NOW)
        .unwrap();

    println!("  Bob again: 100 SOL deposit, $6,000 borrowed");
    println!(
        "  Can withdraw {} SOL reduce-only, {} SOL if borrowing more",
        report::token_amount(reduce_only, 9),
        report::token_amount(with_borrow, 9)
    );
    println!();
}

/// Closed-form repay to a target health.
fn scenario_6_repay_solver() {
    println!("Scenario 6: Repay Solver\n");

    let engine = demo_engine();
    let mut snapshot = AccountSnapshot::empty(AccountId(6));
    snapshot
        .spot_positions
        .push(SpotPosition::deposit(SOL, 100_000_000_000));
    snapshot
        .spot_positions
        .push(SpotPosition::borrow(QUOTE_MARKET_INDEX, 7_000_000_000_000));

    let health_now = engine.health(&snapshot, NOW).unwrap();
    println!("  Erin's health sits at {}/100", health_now);

    for target in [50u32, 75, 90] {
        match engine.repay_amount_for_target_health(&snapshot, target, 80, 110, NOW) {
            Ok(repay) => println!(
                "  Repay ${} to reach health {}",
                report::quote_value(repay),
                target
            ),
            Err(e) => println!("  Health {}: {}", target, e),
        }
    }
}

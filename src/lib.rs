// risk-core: off-chain risk engine for a margin/lending account.
// valuation-first architecture: weighted collateral math and solvency limits
// take priority. all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketIndex, Timestamp, scale constants
//   2.x  math.rs: checked i128 fixed-point: div/ceil/round, sqrt, standardize
//   3.x  oracle.rs: oracle snapshots, strict price selection, live 5min TWAP
//   4.x  market.rs: market registry, weight and margin-ratio curves
//   5.x  ledger.rs: spot/leveraged positions, account snapshot
//   6.x  settlement.rs: pure LP-share settlement with step remainder carry
//   7.x  valuation.rs: collateral valuation, worst-case order-fill sim
//   8.x  engine/: facade: health, margin, limits, repay over a venue handle
//   9.x  health.rs: 0-100 health score and repay-for-target solver
//   9.5  margin.rs: margin requirement summaries per category
//   9.6  limits.rs: withdrawal/borrow limit with guard bypass
//   10.x report.rs: decimal rendering for humans
//   11.x venue.rs: VenueData trait + in-memory implementation

// core valuation modules
pub mod health;
pub mod ledger;
pub mod limits;
pub mod margin;
pub mod market;
pub mod math;
pub mod oracle;
pub mod settlement;
pub mod types;
pub mod valuation;

// engine facade and integration modules
pub mod engine;
pub mod report;
pub mod venue;

// re exports for convenience
pub use engine::{AccountRiskReport, EngineConfig, EngineError, RiskEngine};
pub use health::{health_score, normalized_health, repay_for_target_health};
pub use ledger::{AccountSnapshot, LeveragedPosition, SpotPosition};
pub use limits::withdrawal_limit;
pub use margin::{margin_summary, MarginRequest, MarginSummary};
pub use market::{GuardLimits, PerpMarketConfig, SpotMarketConfig};
pub use math::MathError;
pub use oracle::{OraclePrice, StrictOraclePrice};
pub use settlement::{settle_lp_shares, LpSettlement, PositionUpdateKind};
pub use types::*;
pub use valuation::{valuate, OpenOrderBalances, OrderFillOutcome, Valuation, ValuationRequest};
pub use venue::{InMemoryVenue, VenueData};

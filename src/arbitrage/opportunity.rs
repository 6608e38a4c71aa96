//! Opportunity and skip records emitted by the scanners.

use rust_decimal::Decimal;
use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};

use crate::market::{short_address, Address};
use crate::pricing::{Direction, ExchangeRate, RateGraph};

/// Kind of arbitrage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OpportunityKind {
    /// Same pair priced differently by two pools.
    Direct,
    /// Closed loop of three or more conversions.
    Cycle,
}

/// What a leg does within its opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LegRole {
    /// Acquire the base token (direct arbitrage).
    Buy,
    /// Dispose of the base token (direct arbitrage).
    Sell,
    /// One conversion of a cycle.
    Hop,
}

/// One pool used by an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpportunityLeg {
    /// Role of the leg.
    pub role: LegRole,
    /// Pool address.
    pub pool: Address,
    /// Fee tier in ppm.
    pub fee: u32,
    /// Pool liquidity at snapshot time.
    pub liquidity: u128,
    /// Trade direction through the pool.
    pub direction: Direction,
    /// Token the quoted rate is priced from.
    pub source: Address,
    /// Token the quoted rate is priced in.
    pub destination: Address,
    /// Raw mid rate of the edge.
    pub quoted_rate: Decimal,
    /// Rate after fee and slippage.
    pub effective_rate: Decimal,
}

impl OpportunityLeg {
    /// Leg for a graph edge.
    pub fn from_edge(role: LegRole, edge: &ExchangeRate, effective_rate: Decimal) -> Self {
        Self {
            role,
            pool: *edge.pool(),
            fee: edge.fee(),
            liquidity: edge.liquidity(),
            direction: edge.direction,
            source: edge.source,
            destination: edge.destination,
            quoted_rate: edge.rate,
            effective_rate,
        }
    }
}

/// A profitable arbitrage. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Opportunity {
    /// Kind of arbitrage.
    pub kind: OpportunityKind,
    /// Token path. `[base, quote]` for direct, closed loop for cycles.
    pub path: Vec<Address>,
    /// Display tickers of `path`.
    pub tickers: Vec<String>,
    /// Pools used, in trade order.
    pub legs: Vec<OpportunityLeg>,
    /// Rate before any cost.
    pub gross_rate: Decimal,
    /// Rate after fees, slippage and gas.
    pub net_rate: Decimal,
    /// `net_rate − 1`: fractional profit on one unit of the start token.
    pub profit_score: Decimal,
}

impl Opportunity {
    /// Profit as a percentage.
    pub fn profit_pct(&self) -> Decimal {
        self.profit_score * Decimal::ONE_HUNDRED
    }

    /// Pools used, in trade order.
    pub fn pools(&self) -> impl Iterator<Item = &Address> {
        self.legs.iter().map(|l| &l.pool)
    }
}

/// Display tickers for a token path; unknown tokens show their short address.
pub(crate) fn tickers(graph: &RateGraph, path: &[Address]) -> Vec<String> {
    path.iter()
        .map(|a| graph.token(a).map_or_else(|| short_address(a), |t| t.ticker.clone()))
        .collect()
}

/// Why a candidate was not evaluated to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No direct rate to convert the gas cost into the needed token.
    GasConversionUnavailable {
        /// Token the gas cost had to be expressed in.
        token: Address,
    },
    /// A rate product or cost adjustment left the decimal range.
    ArithmeticOverflow,
    /// The per-root path budget ran out before the search finished.
    SearchBudgetExhausted {
        /// Path extensions explored before stopping.
        explored: usize,
    },
}

/// A candidate left out of the results, with its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCandidate {
    /// Scanner that skipped it.
    pub kind: OpportunityKind,
    /// Tokens involved (a pair, a partial path, or a search root).
    pub tokens: Vec<Address>,
    /// Why it was skipped.
    #[serde(flatten)]
    pub reason: SkipReason,
}

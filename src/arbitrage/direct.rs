//! Direct arbitrage: one pair, two pools, buy low and sell high.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::config::ScanConfig;
use crate::market::Address;
use crate::pricing::{ExchangeRate, RateGraph, PRECISION_FLOOR};

use super::costs::{gas_in_token, CostModel};
use super::opportunity::{
    tickers, LegRole, Opportunity, OpportunityKind, OpportunityLeg, SkipReason, SkippedCandidate,
};

/// Output of a direct scan.
#[derive(Debug, Clone, Default)]
pub struct DirectScan {
    /// Profitable pairs, one per unordered pair at most.
    pub opportunities: Vec<Opportunity>,
    /// Pairs that could not be evaluated.
    pub skipped: Vec<SkippedCandidate>,
    /// Pairs quoted by at least two pools.
    pub pairs_scanned: usize,
}

struct Priced<'a> {
    edge: &'a ExchangeRate,
    buy: Decimal,
    sell: Decimal,
}

/// Higher liquidity, then lower fee tier, then lower pool address.
fn tie_break(a: &Priced<'_>, b: &Priced<'_>) -> Ordering {
    b.edge
        .liquidity()
        .cmp(&a.edge.liquidity())
        .then_with(|| a.edge.fee().cmp(&b.edge.fee()))
        .then_with(|| a.edge.pool().cmp(b.edge.pool()))
}

/// Scan every pair quoted by two or more pools.
///
/// Pairs are evaluated from the lower to the higher address: rates are the
/// higher-address token per unit of the lower one, and gas is charged in the
/// higher-address token.
#[instrument(skip_all, fields(tokens = graph.token_count()))]
pub fn scan_direct(graph: &RateGraph, config: &ScanConfig) -> DirectScan {
    let costs = CostModel::from_config(config);
    let mut scan = DirectScan::default();

    for (base, quote) in graph.pairs() {
        let edges = graph.edges(base, quote);
        if edges.len() < 2 {
            continue;
        }
        scan.pairs_scanned += 1;

        match evaluate_pair(graph, config, &costs, base, quote, edges) {
            Ok(Some(opportunity)) => {
                info!(
                    pair = %format!("{}/{}", opportunity.tickers[0], opportunity.tickers[1]),
                    buy_pool = %opportunity.legs[0].pool,
                    sell_pool = %opportunity.legs[1].pool,
                    profit = %opportunity.profit_score,
                    "Direct opportunity detected"
                );
                scan.opportunities.push(opportunity);
            }
            Ok(None) => {}
            Err(reason) => {
                debug!(base = %base, quote = %quote, ?reason, "Pair skipped");
                scan.skipped.push(SkippedCandidate {
                    kind: OpportunityKind::Direct,
                    tokens: vec![*base, *quote],
                    reason,
                });
            }
        }
    }

    scan
}

fn evaluate_pair(
    graph: &RateGraph,
    config: &ScanConfig,
    costs: &CostModel,
    base: &Address,
    quote: &Address,
    edges: &[ExchangeRate],
) -> Result<Option<Opportunity>, SkipReason> {
    let gas = gas_in_token(config, graph, quote)?;

    let priced = edges
        .iter()
        .map(|edge| {
            Some(Priced {
                edge,
                buy: costs.effective_buy(edge.rate, edge.fee())?,
                sell: costs.effective_sell(edge.rate, edge.fee())?,
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or(SkipReason::ArithmeticOverflow)?;

    let Some(buy) = priced
        .iter()
        .min_by(|a, b| a.buy.cmp(&b.buy).then_with(|| tie_break(a, b)))
    else {
        return Ok(None);
    };
    let Some(sell) = priced
        .iter()
        .filter(|p| p.edge.pool() != buy.edge.pool())
        .min_by(|a, b| b.sell.cmp(&a.sell).then_with(|| tie_break(a, b)))
    else {
        return Ok(None);
    };

    let proceeds = sell
        .sell
        .checked_sub(gas)
        .ok_or(SkipReason::ArithmeticOverflow)?;
    let spread = proceeds
        .checked_sub(buy.buy)
        .ok_or(SkipReason::ArithmeticOverflow)?;
    if spread <= PRECISION_FLOOR {
        return Ok(None);
    }

    let gross_rate = sell
        .edge
        .rate
        .checked_div(buy.edge.rate)
        .ok_or(SkipReason::ArithmeticOverflow)?;
    let net_rate = proceeds
        .checked_div(buy.buy)
        .ok_or(SkipReason::ArithmeticOverflow)?;

    let path = vec![*base, *quote];
    Ok(Some(Opportunity {
        kind: OpportunityKind::Direct,
        tickers: tickers(graph, &path),
        path,
        legs: vec![
            OpportunityLeg::from_edge(LegRole::Buy, buy.edge, buy.buy),
            OpportunityLeg::from_edge(LegRole::Sell, sell.edge, sell.sell),
        ],
        gross_rate: gross_rate.normalize(),
        net_rate: net_rate.normalize(),
        profit_score: (net_rate - Decimal::ONE).normalize(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::mock::{address, MockGraphBuilder};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn buys_low_and_sells_high() {
        let graph = MockGraphBuilder::new()
            .pool_with(10, 1, 2, 3000, 1_000, dec!(100))
            .pool_with(11, 1, 2, 3000, 1_000, dec!(105))
            .build();

        let scan = scan_direct(&graph, &ScanConfig::frictionless());

        assert_eq!(scan.pairs_scanned, 1);
        assert_eq!(scan.opportunities.len(), 1);
        let opportunity = &scan.opportunities[0];
        assert_eq!(opportunity.kind, OpportunityKind::Direct);
        assert_eq!(opportunity.path, vec![address(1), address(2)]);
        assert_eq!(opportunity.legs[0].role, LegRole::Buy);
        assert_eq!(opportunity.legs[0].pool, address(10));
        assert_eq!(opportunity.legs[1].role, LegRole::Sell);
        assert_eq!(opportunity.legs[1].pool, address(11));
        assert_eq!(opportunity.gross_rate, dec!(1.05));
        assert_eq!(opportunity.net_rate, dec!(1.05));
        assert_eq!(opportunity.profit_score, dec!(0.05));
    }

    #[test]
    fn agreeing_pools_yield_nothing() {
        let graph = MockGraphBuilder::new()
            .pool(1, 2, 3000, dec!(100))
            .pool(1, 2, 500, dec!(100))
            .pool(1, 2, 100, dec!(100))
            .build();

        assert!(scan_direct(&graph, &ScanConfig::frictionless())
            .opportunities
            .is_empty());
        assert!(scan_direct(&graph, &ScanConfig::default())
            .opportunities
            .is_empty());
    }

    #[test]
    fn single_pool_pairs_are_not_scanned() {
        let graph = MockGraphBuilder::new()
            .pool(1, 2, 3000, dec!(100))
            .pool(2, 3, 3000, dec!(100))
            .build();

        let scan = scan_direct(&graph, &ScanConfig::frictionless());
        assert_eq!(scan.pairs_scanned, 0);
        assert!(scan.opportunities.is_empty());
        assert!(scan.skipped.is_empty());
    }

    #[test]
    fn costs_can_erase_the_spread() {
        let config = ScanConfig {
            slippage_tolerance: dec!(0.005),
            fee_aware: true,
            ..ScanConfig::frictionless()
        };

        // 100 × 1.005 / 0.9995 ≈ 100.55 against 101 × 0.997 / 1.005 ≈ 100.20
        let narrow = MockGraphBuilder::new()
            .pool(1, 2, 500, dec!(100))
            .pool(1, 2, 3000, dec!(101))
            .build();
        assert!(scan_direct(&narrow, &config).opportunities.is_empty());

        // 102 × 0.997 / 1.005 ≈ 101.19
        let wide = MockGraphBuilder::new()
            .pool(1, 2, 500, dec!(100))
            .pool(1, 2, 3000, dec!(102))
            .build();
        let scan = scan_direct(&wide, &config);
        assert_eq!(scan.opportunities.len(), 1);
        let opportunity = &scan.opportunities[0];
        assert!(opportunity.net_rate < opportunity.gross_rate);
        assert!(opportunity.legs[0].effective_rate > dec!(100));
    }

    #[test]
    fn gas_is_charged_in_the_quote_token() {
        let graph = MockGraphBuilder::new()
            .pool(1, 2, 3000, dec!(100))
            .pool(1, 2, 3000, dec!(100.5))
            .build();

        let expensive = ScanConfig {
            gas_cost: dec!(1),
            ..ScanConfig::frictionless()
        };
        assert!(scan_direct(&graph, &expensive).opportunities.is_empty());

        let cheap = ScanConfig {
            gas_cost: dec!(0.4),
            ..ScanConfig::frictionless()
        };
        let scan = scan_direct(&graph, &cheap);
        assert_eq!(scan.opportunities.len(), 1);
        assert_eq!(scan.opportunities[0].net_rate, dec!(1.001));
    }

    #[test]
    fn one_opportunity_per_unordered_pair() {
        // Pool 10 lists the pair reversed; its 1→2 edge is the inverse, 100.
        let graph = MockGraphBuilder::new()
            .pool_with(10, 2, 1, 3000, 1_000, dec!(0.01))
            .pool_with(11, 1, 2, 3000, 1_000, dec!(105))
            .build();

        let scan = scan_direct(&graph, &ScanConfig::frictionless());
        assert_eq!(scan.opportunities.len(), 1);
        let opportunity = &scan.opportunities[0];
        assert_eq!(opportunity.path, vec![address(1), address(2)]);
        assert_eq!(opportunity.legs[0].pool, address(10));
        assert_eq!(opportunity.legs[0].quoted_rate, dec!(100));
    }

    #[test]
    fn ties_prefer_liquidity_then_fee_then_address() {
        let config = ScanConfig::frictionless();

        let by_liquidity = MockGraphBuilder::new()
            .pool_with(10, 1, 2, 3000, 1_000, dec!(100))
            .pool_with(11, 1, 2, 3000, 5_000, dec!(100))
            .pool_with(12, 1, 2, 3000, 1_000, dec!(110))
            .build();
        let scan = scan_direct(&by_liquidity, &config);
        assert_eq!(scan.opportunities[0].legs[0].pool, address(11));

        let by_fee = MockGraphBuilder::new()
            .pool_with(10, 1, 2, 3000, 1_000, dec!(100))
            .pool_with(11, 1, 2, 500, 1_000, dec!(100))
            .pool_with(12, 1, 2, 3000, 1_000, dec!(110))
            .build();
        let scan = scan_direct(&by_fee, &config);
        assert_eq!(scan.opportunities[0].legs[0].pool, address(11));

        let by_address = MockGraphBuilder::new()
            .pool_with(11, 1, 2, 3000, 1_000, dec!(100))
            .pool_with(10, 1, 2, 3000, 1_000, dec!(100))
            .pool_with(12, 1, 2, 3000, 1_000, dec!(110))
            .build();
        let scan = scan_direct(&by_address, &config);
        assert_eq!(scan.opportunities[0].legs[0].pool, address(10));
    }

    #[test]
    fn missing_gas_conversion_is_skipped() {
        let graph = MockGraphBuilder::new()
            .pool(2, 3, 3000, dec!(100))
            .pool(2, 3, 3000, dec!(105))
            .build();
        let config = ScanConfig {
            gas_cost: dec!(1),
            gas_token: Some(address(1)),
            ..ScanConfig::frictionless()
        };

        let scan = scan_direct(&graph, &config);
        assert!(scan.opportunities.is_empty());
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(
            scan.skipped[0].reason,
            SkipReason::GasConversionUnavailable { token: address(3) }
        );
    }

    #[test]
    fn unbounded_gas_cost_is_skipped_not_fatal() {
        let graph = MockGraphBuilder::new()
            .pool(1, 2, 10_000, dec!(100))
            .pool(1, 2, 10_000, dec!(100.5))
            .build();
        let config = ScanConfig {
            fee_aware: true,
            gas_cost: Decimal::MAX,
            ..ScanConfig::frictionless()
        };
        assert!(config.validate().is_ok());

        let scan = scan_direct(&graph, &config);
        assert!(scan.opportunities.is_empty());
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].reason, SkipReason::ArithmeticOverflow);
    }
}

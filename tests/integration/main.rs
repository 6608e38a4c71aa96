//! End-to-end scans over synthetic snapshots.
//!
//! Every test goes through the full pipeline: registry, sqrt-price
//! normalization, graph construction and both scanners.

use pool_arb::arbitrage::{run_scan, LegRole, OpportunityKind};
use pool_arb::config::ScanConfig;
use pool_arb::error::{ConfigError, QuoteError};
use pool_arb::market::mock::{address, MockSnapshotBuilder};
use pool_arb::market::Snapshot;
use pool_arb::pricing::{normalize_quotes, RateGraph, PRECISION_FLOOR};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Three 18-decimal tokens with rates 4, 2.25 and 0.25 around the loop.
fn triangle() -> MockSnapshotBuilder {
    MockSnapshotBuilder::new()
        .token("AAA", 1, 18)
        .token("BBB", 2, 18)
        .token("CCC", 3, 18)
        .pool(1, 2, 500, 2, 1)
        .pool(2, 3, 500, 3, 2)
        .pool(3, 1, 500, 1, 2)
}

fn scan(snapshot: &Snapshot, config: &ScanConfig) -> pool_arb::arbitrage::ScanReport {
    run_scan(&snapshot.registry().unwrap(), &snapshot.quotes, config).unwrap()
}

#[test]
fn triangle_is_found_once_from_sqrt_prices() {
    let report = scan(&triangle().build(), &ScanConfig::frictionless());

    assert!(report.direct.is_empty());
    assert_eq!(report.cycles.len(), 1);

    let cycle = &report.cycles[0];
    assert_eq!(cycle.kind, OpportunityKind::Cycle);
    assert_eq!(
        cycle.path,
        vec![address(1), address(2), address(3), address(1)]
    );
    assert_eq!(cycle.tickers, vec!["AAA", "BBB", "CCC", "AAA"]);
    assert_eq!(cycle.gross_rate, dec!(2.25));
    assert_eq!(cycle.net_rate, dec!(2.25));
    assert!(cycle.legs.iter().all(|l| l.role == LegRole::Hop));
}

#[test]
fn default_costs_shrink_but_keep_a_wide_cycle() {
    let report = scan(&triangle().build(), &ScanConfig::default());

    assert_eq!(report.cycles.len(), 1);
    let cycle = &report.cycles[0];
    assert_eq!(cycle.gross_rate, dec!(2.25));
    assert!(cycle.net_rate < cycle.gross_rate);
    assert!(cycle.net_rate > dec!(2.2));
}

#[test]
fn direct_arbitrage_between_pools_of_one_pair() {
    let snapshot = MockSnapshotBuilder::new()
        .token("AAA", 1, 18)
        .token("BBB", 2, 18)
        .pool(1, 2, 500, 2, 1) // rate 4
        .pool(1, 2, 500, 21, 10) // rate ~4.41
        .build();

    let report = scan(&snapshot, &ScanConfig::default());

    assert!(report.cycles.is_empty());
    assert_eq!(report.direct.len(), 1);
    let direct = &report.direct[0];
    assert_eq!(direct.kind, OpportunityKind::Direct);
    assert_eq!(direct.legs[0].role, LegRole::Buy);
    assert_eq!(direct.legs[0].pool, address(100));
    assert_eq!(direct.legs[1].role, LegRole::Sell);
    assert_eq!(direct.legs[1].pool, address(101));
    assert!(direct.gross_rate > dec!(1.10) && direct.gross_rate < dec!(1.11));
    assert!(direct.net_rate < direct.gross_rate);
}

#[test]
fn decimals_are_applied_before_comparison() {
    // USDC (6) / WETH (18): a 1:1 raw sqrt price is 1e-12 WETH per USDC.
    let snapshot = MockSnapshotBuilder::new()
        .token("USDC", 1, 6)
        .token("WETH", 2, 18)
        .pool(1, 2, 500, 1, 1)
        .pool(1, 2, 3000, 101, 100)
        .build();

    let registry = snapshot.registry().unwrap();
    let normalized = normalize_quotes(&registry, &snapshot.quotes);
    assert_eq!(normalized.accepted[0].forward_rate, dec!(0.000000000001));
    assert_eq!(normalized.accepted[0].inverse_rate, dec!(1000000000000));

    let report = scan(&snapshot, &ScanConfig::frictionless());
    assert_eq!(report.direct.len(), 1);
    let gross = report.direct[0].gross_rate;
    assert!(gross > dec!(1.0200) && gross < dec!(1.0202), "{gross}");
}

#[test]
fn rejected_quotes_do_not_stop_the_scan() {
    let mut zero_liquidity = pool_arb::market::mock::quote(
        90,
        1,
        2,
        500,
        "79228162514264337593543950336",
    );
    zero_liquidity.liquidity = 0;

    let snapshot = triangle()
        .quote(zero_liquidity)
        .quote(pool_arb::market::mock::quote(
            91,
            1,
            7,
            500,
            "79228162514264337593543950336",
        ))
        .build();

    let report = scan(&snapshot, &ScanConfig::frictionless());

    assert_eq!(report.stats.quotes_received, 5);
    assert_eq!(report.stats.quotes_accepted, 3);
    let reasons: Vec<_> = report.rejected.iter().map(|r| r.reason.clone()).collect();
    assert_eq!(
        reasons,
        vec![
            QuoteError::ZeroLiquidity,
            QuoteError::MissingDecimals { token: address(7) },
        ]
    );
    assert_eq!(report.cycles.len(), 1);
}

#[test]
fn parallel_quotes_keep_all_edges_and_stay_symmetric() {
    let snapshot = triangle()
        .pool(1, 2, 3000, 2, 1)
        .pool(2, 1, 100, 1, 2)
        .build();

    let registry = snapshot.registry().unwrap();
    let normalized = normalize_quotes(&registry, &snapshot.quotes);
    let graph = RateGraph::build(&normalized.accepted);

    assert_eq!(graph.edges(&address(1), &address(2)).len(), 3);
    assert_eq!(graph.edges(&address(2), &address(1)).len(), 3);
    assert!(graph.verify_symmetry());

    for quote in &normalized.accepted {
        let product = quote.forward_rate * quote.inverse_rate;
        assert!((product - Decimal::ONE).abs() <= PRECISION_FLOOR);
    }
}

#[test]
fn invalid_config_fails_before_graph_work() {
    let snapshot = triangle().build();
    let config = ScanConfig {
        max_cycle_length: 7,
        ..ScanConfig::default()
    };

    let result = run_scan(&snapshot.registry().unwrap(), &snapshot.quotes, &config);

    assert_eq!(
        result.unwrap_err(),
        ConfigError::CycleLengthOutOfRange {
            length: 7,
            min: 3,
            max: 6
        }
    );
}

#[test]
fn snapshot_file_round_trip_scans_identically() {
    let snapshot = triangle().build();
    let path = std::env::temp_dir().join(format!("pool-arb-{}.json", std::process::id()));
    std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

    let loaded = Snapshot::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, snapshot);
    let first = scan(&snapshot, &ScanConfig::default());
    let second = scan(&loaded, &ScanConfig::default());
    assert_eq!(first.cycles, second.cycles);
    assert_eq!(first.direct, second.direct);
}

//! Scan entry point: normalize, build the graph, run both scanners.

use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::config::ScanConfig;
use crate::error::ConfigError;
use crate::market::{PoolQuote, TokenRegistry};
use crate::metrics;
use crate::pricing::{normalize_quotes, QuoteRejection, RateGraph};

use super::cycle::{scan_cycles, sort_by_profit};
use super::direct::scan_direct;
use super::opportunity::{Opportunity, OpportunityKind, SkippedCandidate};

/// Counters describing one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Quotes received.
    pub quotes_received: usize,
    /// Quotes that made it into the graph.
    pub quotes_accepted: usize,
    /// Quotes rejected during normalization.
    pub quotes_rejected: usize,
    /// Graph nodes.
    pub tokens: usize,
    /// Graph edges (two per accepted quote).
    pub edges: usize,
    /// Pairs quoted by two or more pools.
    pub pairs_scanned: usize,
    /// Closed cycles evaluated.
    pub cycle_candidates: usize,
    /// Candidates skipped by either scanner.
    pub candidates_skipped: usize,
    /// Direct opportunities found.
    pub direct_found: usize,
    /// Cycle opportunities found.
    pub cycles_found: usize,
    /// Wall time of the scan in milliseconds.
    pub duration_ms: u64,
}

/// Full result of one scan. Partial results are always returned alongside
/// the rejection and skip lists.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// When the scan finished.
    #[serde(serialize_with = "serialize_rfc3339")]
    pub scanned_at: OffsetDateTime,
    /// Direct opportunities, best first.
    pub direct: Vec<Opportunity>,
    /// Cycle opportunities, best first.
    pub cycles: Vec<Opportunity>,
    /// Quotes kept out of the graph.
    pub rejected: Vec<QuoteRejection>,
    /// Candidates left unevaluated.
    pub skipped: Vec<SkippedCandidate>,
    /// Scan counters.
    pub stats: ScanStats,
}

impl ScanReport {
    /// Every opportunity, best first.
    pub fn opportunities(&self) -> Vec<&Opportunity> {
        let mut all: Vec<&Opportunity> = self.direct.iter().chain(&self.cycles).collect();
        all.sort_by(|a, b| b.profit_score.cmp(&a.profit_score));
        all
    }

    /// Whether anything profitable was found.
    pub fn has_opportunities(&self) -> bool {
        !self.direct.is_empty() || !self.cycles.is_empty()
    }
}

fn serialize_rfc3339<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

/// Run a full scan over one snapshot.
///
/// The configuration is validated before any graph work. Bad quotes and
/// unevaluable candidates are reported in the result, never as errors.
#[instrument(skip_all, fields(quotes = quotes.len(), tokens = registry.len()))]
pub fn run_scan(
    registry: &TokenRegistry,
    quotes: &[PoolQuote],
    config: &ScanConfig,
) -> Result<ScanReport, ConfigError> {
    config.validate()?;
    let timer = metrics::timer_scan();

    let normalized = normalize_quotes(registry, quotes);
    let graph = RateGraph::build(&normalized.accepted);

    let mut report = scan_validated(&graph, config);
    report.rejected = normalized.rejected;
    report.stats.quotes_received = quotes.len();
    report.stats.quotes_accepted = normalized.accepted.len();
    report.stats.quotes_rejected = report.rejected.len();
    report.stats.duration_ms = timer.elapsed_ms() as u64;

    metrics::inc_scans();
    info!(
        direct = report.stats.direct_found,
        cycles = report.stats.cycles_found,
        rejected = report.stats.quotes_rejected,
        skipped = report.stats.candidates_skipped,
        duration_ms = report.stats.duration_ms,
        "Scan complete"
    );
    Ok(report)
}

/// Run both scanners over a built graph in parallel.
///
/// Applies the same configuration checks as [`run_scan`].
pub fn scan_graph(graph: &RateGraph, config: &ScanConfig) -> Result<ScanReport, ConfigError> {
    config.validate()?;
    Ok(scan_validated(graph, config))
}

fn scan_validated(graph: &RateGraph, config: &ScanConfig) -> ScanReport {
    let (direct, cycles) = rayon::join(|| scan_direct(graph, config), || scan_cycles(graph, config));

    let mut direct_opportunities = direct.opportunities;
    sort_by_profit(&mut direct_opportunities);

    let mut skipped = direct.skipped;
    skipped.extend(cycles.skipped);

    let stats = ScanStats {
        tokens: graph.token_count(),
        edges: graph.edge_count(),
        pairs_scanned: direct.pairs_scanned,
        cycle_candidates: cycles.candidates_evaluated,
        candidates_skipped: skipped.len(),
        direct_found: direct_opportunities.len(),
        cycles_found: cycles.opportunities.len(),
        ..ScanStats::default()
    };

    metrics::add_opportunities(OpportunityKind::Direct.into(), stats.direct_found);
    metrics::add_opportunities(OpportunityKind::Cycle.into(), stats.cycles_found);
    metrics::add_candidates_skipped(stats.candidates_skipped);

    ScanReport {
        scanned_at: OffsetDateTime::now_utc(),
        direct: direct_opportunities,
        cycles: cycles.opportunities,
        rejected: Vec::new(),
        skipped,
        stats,
    }
}

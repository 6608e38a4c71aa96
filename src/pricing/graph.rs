//! Directed multigraph of raw exchange rates.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use strum::Display;
use tracing::{debug, instrument, warn};

use crate::market::{Address, PoolQuote, Token};

use super::normalizer::NormalizedQuote;
use super::reciprocal_tolerance;

/// Which way an edge trades through its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// token0 in, token1 out.
    ZeroForOne,
    /// token1 in, token0 out.
    OneForZero,
}

impl Direction {
    /// The direction of the reverse edge.
    pub fn opposite(self) -> Self {
        match self {
            Self::ZeroForOne => Self::OneForZero,
            Self::OneForZero => Self::ZeroForOne,
        }
    }
}

/// One directed edge: `rate` destination display units per 1 source unit.
///
/// Rates are mid prices. Fees, slippage and gas are applied by the scanners.
#[derive(Debug, Clone)]
pub struct ExchangeRate {
    /// Token given.
    pub source: Address,
    /// Token received.
    pub destination: Address,
    /// Destination units per source unit.
    pub rate: Decimal,
    /// Originating pool quote.
    pub quote: Arc<PoolQuote>,
    /// Trade direction through the pool.
    pub direction: Direction,
}

impl ExchangeRate {
    /// Pool address.
    pub fn pool(&self) -> &Address {
        &self.quote.pool
    }

    /// Pool fee tier in ppm.
    pub fn fee(&self) -> u32 {
        self.quote.fee
    }

    /// Pool liquidity.
    pub fn liquidity(&self) -> u128 {
        self.quote.liquidity
    }
}

/// token → neighbour → parallel edges.
///
/// Built once per scan and read-only afterwards. Parallel edges from distinct
/// pools are kept side by side, in input order.
#[derive(Debug, Clone, Default)]
pub struct RateGraph {
    adjacency: BTreeMap<Address, BTreeMap<Address, Vec<ExchangeRate>>>,
    tokens: BTreeMap<Address, Token>,
    edge_count: usize,
}

impl RateGraph {
    /// Build the graph, adding a forward and an inverse edge per quote.
    #[instrument(skip_all, fields(quotes = quotes.len()))]
    pub fn build(quotes: &[NormalizedQuote]) -> Self {
        let mut graph = Self::default();

        for normalized in quotes {
            let quote = &normalized.quote;
            graph
                .tokens
                .entry(normalized.token0.address)
                .or_insert_with(|| normalized.token0.clone());
            graph
                .tokens
                .entry(normalized.token1.address)
                .or_insert_with(|| normalized.token1.clone());

            graph.push(ExchangeRate {
                source: quote.token0,
                destination: quote.token1,
                rate: normalized.forward_rate,
                quote: Arc::clone(quote),
                direction: Direction::ZeroForOne,
            });
            graph.push(ExchangeRate {
                source: quote.token1,
                destination: quote.token0,
                rate: normalized.inverse_rate,
                quote: Arc::clone(quote),
                direction: Direction::OneForZero,
            });
        }

        debug!(
            tokens = graph.token_count(),
            edges = graph.edge_count(),
            "Rate graph built"
        );
        graph
    }

    fn push(&mut self, edge: ExchangeRate) {
        self.adjacency
            .entry(edge.source)
            .or_default()
            .entry(edge.destination)
            .or_default()
            .push(edge);
        self.edge_count += 1;
    }

    /// Token metadata for a node.
    pub fn token(&self, address: &Address) -> Option<&Token> {
        self.tokens.get(address)
    }

    /// Every node in address order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    /// Number of nodes.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// Parallel edges from `source` to `destination`.
    pub fn edges(&self, source: &Address, destination: &Address) -> &[ExchangeRate] {
        self.adjacency
            .get(source)
            .and_then(|n| n.get(destination))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Outgoing edges of `source`, grouped by destination in address order.
    pub fn neighbors<'a>(
        &'a self,
        source: &Address,
    ) -> impl Iterator<Item = (&'a Address, &'a [ExchangeRate])> + 'a {
        self.adjacency
            .get(source)
            .into_iter()
            .flat_map(|n| n.iter().map(|(dst, edges)| (dst, edges.as_slice())))
    }

    /// Unordered pairs with at least one pool, as `(lower, higher)` addresses.
    pub fn pairs(&self) -> impl Iterator<Item = (&Address, &Address)> {
        self.adjacency.iter().flat_map(|(src, n)| {
            n.keys()
                .filter(move |dst| src < *dst)
                .map(move |dst| (src, dst))
        })
    }

    /// Highest raw rate from `source` to `destination`, if directly quoted.
    pub fn best_rate(&self, source: &Address, destination: &Address) -> Option<&ExchangeRate> {
        self.edges(source, destination)
            .iter()
            .max_by(|a, b| a.rate.cmp(&b.rate))
    }

    /// Check that every edge has a reverse edge from the same pool whose rate
    /// is its reciprocal within rounding.
    pub fn verify_symmetry(&self) -> bool {
        self.adjacency.values().flat_map(|n| n.values()).flatten().all(|edge| {
            let reverse = self
                .edges(&edge.destination, &edge.source)
                .iter()
                .find(|r| r.pool() == edge.pool() && r.direction == edge.direction.opposite());

            let Some(reverse) = reverse else {
                warn!(pool = %edge.pool(), "Edge has no reverse");
                return false;
            };
            let Some(product) = edge.rate.checked_mul(reverse.rate) else {
                return false;
            };
            (product - Decimal::ONE).abs() <= reciprocal_tolerance(edge.rate, reverse.rate)
        })
    }
}

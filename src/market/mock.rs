//! Snapshot and graph builders for unit and integration testing.
//!
//! Addresses are synthesised from small integers so tests can reason about
//! ordering: `address(1) < address(2) < ...`.

use alloy::primitives::U256;
use rust_decimal::Decimal;

use crate::pricing::{NormalizedQuote, RateGraph};

use super::registry::TokenRegistry;
use super::snapshot::Snapshot;
use super::types::{Address, PoolQuote, Token};

/// Liquidity given to builder pools unless overridden.
pub const DEFAULT_LIQUIDITY: u128 = 1_000_000_000;

/// Deterministic address whose last byte is `n`.
pub fn address(n: u8) -> Address {
    Address::with_last_byte(n)
}

/// Token with a synthetic address.
pub fn token(ticker: &str, n: u8, decimals: u8) -> Token {
    Token::new(ticker, address(n), decimals)
}

/// Registry from `(ticker, address id, decimals)` triples.
pub fn registry(entries: &[(&str, u8, u8)]) -> TokenRegistry {
    TokenRegistry::from_tokens(entries.iter().map(|(t, n, d)| token(t, *n, *d)))
        .expect("mock registry has unique addresses")
}

/// Pool quote with default liquidity and a decimal or hex sqrt price.
pub fn quote(pool: u8, token0: u8, token1: u8, fee: u32, sqrt_price_x96: &str) -> PoolQuote {
    PoolQuote {
        token0: address(token0),
        token1: address(token1),
        fee,
        pool: address(pool),
        liquidity: DEFAULT_LIQUIDITY,
        sqrt_price_x96: super::parse_u256(sqrt_price_x96).expect("mock sqrt price parses"),
    }
}

/// `2^96 × numerator / denominator`, i.e. a sqrt price whose rate is
/// `(numerator / denominator)^2` before decimal adjustment.
pub fn sqrt_price_ratio(numerator: u64, denominator: u64) -> U256 {
    (U256::from(numerator) << 96usize) / U256::from(denominator)
}

/// Builder for rate graphs with chosen decimal rates.
///
/// Skips sqrt-price math so scanner tests can state rates directly.
#[derive(Debug, Clone)]
pub struct MockGraphBuilder {
    tokens: Vec<Token>,
    pools: Vec<(PoolQuote, Decimal)>,
    next_pool: u8,
}

impl MockGraphBuilder {
    /// Create an empty builder. Pool addresses start at `address(100)`.
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            pools: Vec::new(),
            next_pool: 100,
        }
    }

    /// Register a token. Unregistered tokens default to 18 decimals.
    pub fn token(mut self, ticker: &str, n: u8, decimals: u8) -> Self {
        self.tokens.push(token(ticker, n, decimals));
        self
    }

    /// Add a pool quoting `rate` token1 per token0.
    pub fn pool(self, token0: u8, token1: u8, fee: u32, rate: Decimal) -> Self {
        let pool = self.next_pool;
        self.pool_with(pool, token0, token1, fee, DEFAULT_LIQUIDITY, rate)
    }

    /// Add a pool with an explicit address id and liquidity.
    pub fn pool_with(
        mut self,
        pool: u8,
        token0: u8,
        token1: u8,
        fee: u32,
        liquidity: u128,
        rate: Decimal,
    ) -> Self {
        let quote = PoolQuote {
            token0: address(token0),
            token1: address(token1),
            fee,
            pool: address(pool),
            liquidity,
            sqrt_price_x96: U256::ZERO,
        };
        self.pools.push((quote, rate));
        self.next_pool = self.next_pool.max(pool.saturating_add(1));
        self
    }

    fn resolve(&self, address: &Address) -> Token {
        self.tokens
            .iter()
            .find(|t| &t.address == address)
            .cloned()
            .unwrap_or_else(|| Token::new("MOCK", *address, 18))
    }

    /// Normalized quotes in insertion order.
    pub fn normalized(&self) -> Vec<NormalizedQuote> {
        self.pools
            .iter()
            .map(|(quote, rate)| {
                let token0 = self.resolve(&quote.token0);
                let token1 = self.resolve(&quote.token1);
                NormalizedQuote::from_rate(quote.clone(), token0, token1, *rate)
                    .expect("mock quote is valid")
            })
            .collect()
    }

    /// Build the rate graph.
    pub fn build(&self) -> RateGraph {
        RateGraph::build(&self.normalized())
    }
}

impl Default for MockGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for full snapshots that go through sqrt-price normalization.
#[derive(Debug, Clone)]
pub struct MockSnapshotBuilder {
    snapshot: Snapshot,
    next_pool: u8,
}

impl MockSnapshotBuilder {
    /// Create an empty builder. Pool addresses start at `address(100)`.
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::default(),
            next_pool: 100,
        }
    }

    /// Register a token.
    pub fn token(mut self, ticker: &str, n: u8, decimals: u8) -> Self {
        self.snapshot.tokens.push(token(ticker, n, decimals));
        self
    }

    /// Add a pool whose sqrt price is `2^96 × numerator / denominator`.
    pub fn pool(mut self, token0: u8, token1: u8, fee: u32, numerator: u64, denominator: u64) -> Self {
        let pool = self.next_pool;
        self.next_pool = self.next_pool.saturating_add(1);
        self.snapshot.quotes.push(PoolQuote {
            token0: address(token0),
            token1: address(token1),
            fee,
            pool: address(pool),
            liquidity: DEFAULT_LIQUIDITY,
            sqrt_price_x96: sqrt_price_ratio(numerator, denominator),
        });
        self
    }

    /// Add an arbitrary quote as-is.
    pub fn quote(mut self, quote: PoolQuote) -> Self {
        self.snapshot.quotes.push(quote);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

impl Default for MockSnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Pricing module: quote normalization and the rate graph.
//!
//! This module handles:
//! - sqrtPriceX96 → decimal exchange rates
//! - Directed multigraph of raw (cost-free) rates

pub mod graph;
pub mod normalizer;

use rust_decimal::Decimal;

pub use graph::{Direction, ExchangeRate, RateGraph};
pub use normalizer::{
    normalize_quote, normalize_quotes, rates_from_sqrt_price, NormalizedQuote, NormalizedQuotes,
    QuoteRejection,
};

/// Rate comparisons closer than this are treated as equal (1e-18).
pub const PRECISION_FLOOR: Decimal = Decimal::from_parts(1, 0, 0, false, 18);

/// Bound on `|a × b − 1|` for a pair of reciprocal rates.
///
/// Each side is rounded at scale 28 or at 29 significant digits, so the
/// relative error of `x` is at most `1e-28 / x` plus one part in 10^28. Tiny
/// rates therefore carry fewer significant digits than the floor alone allows.
pub fn reciprocal_tolerance(a: Decimal, b: Decimal) -> Decimal {
    let ulp = Decimal::new(2, 28);
    PRECISION_FLOOR.saturating_add(a.abs().saturating_add(b.abs()).saturating_mul(ulp))
}

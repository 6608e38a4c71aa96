//! Conversion of square-root pool prices into decimal exchange rates.

use std::collections::HashSet;
use std::sync::Arc;

use alloy::primitives::{U256, U512};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::QuoteError;
use crate::market::{Address, PoolQuote, Token, TokenRegistry, FEE_DENOMINATOR};
use crate::metrics;

/// Largest scale a `Decimal` supports.
const MAX_SCALE: u32 = 28;

/// 2^192, the denominator of a squared Q64.96 value.
static Q192: Lazy<U512> = Lazy::new(|| U512::from(1u8) << 192usize);

/// Largest `Decimal` mantissa (2^96 - 1).
static MAX_MANTISSA: Lazy<U512> = Lazy::new(|| U512::from((1u128 << 96) - 1));

/// A pool quote whose tokens are resolved and whose rates are decimal-adjusted.
///
/// Rates are raw mid prices. Fees and slippage are never folded in here.
#[derive(Debug, Clone)]
pub struct NormalizedQuote {
    /// The originating observation.
    pub quote: Arc<PoolQuote>,
    /// Resolved token0.
    pub token0: Token,
    /// Resolved token1.
    pub token1: Token,
    /// token1 display units received per 1 token0.
    pub forward_rate: Decimal,
    /// token0 display units received per 1 token1.
    pub inverse_rate: Decimal,
}

impl NormalizedQuote {
    /// Build a quote from an already-known forward rate.
    ///
    /// Used when the caller has a decimal rate instead of a sqrt price. The
    /// quote passes the same token, liquidity and fee checks as
    /// [`normalize_quote`].
    pub fn from_rate(
        quote: PoolQuote,
        token0: Token,
        token1: Token,
        forward_rate: Decimal,
    ) -> Result<Self, QuoteError> {
        check_pool_shape(&quote)?;
        if forward_rate <= Decimal::ZERO {
            return Err(QuoteError::ZeroPrice);
        }
        let inverse_rate = Decimal::ONE
            .checked_div(forward_rate)
            .filter(|r| !r.is_zero())
            .ok_or(QuoteError::RateOutOfRange)?;

        Ok(Self {
            quote: Arc::new(quote),
            token0,
            token1,
            forward_rate,
            inverse_rate,
        })
    }

    /// Pool address of the quote.
    pub fn pool(&self) -> &Address {
        &self.quote.pool
    }
}

/// A quote kept out of the graph, with its reason.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteRejection {
    /// Position of the quote in the input sequence.
    pub index: usize,
    /// Pool address of the rejected quote.
    pub pool: Address,
    /// Why the quote was rejected.
    #[serde(serialize_with = "serialize_reason")]
    pub reason: QuoteError,
}

fn serialize_reason<S: serde::Serializer>(
    reason: &QuoteError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&reason.to_string())
}

/// Output of normalizing a batch of quotes.
#[derive(Debug, Clone, Default)]
pub struct NormalizedQuotes {
    /// Accepted quotes in input order.
    pub accepted: Vec<NormalizedQuote>,
    /// Rejected quotes in input order.
    pub rejected: Vec<QuoteRejection>,
}

/// Compute the forward and inverse rate of a sqrt price.
///
/// `rate(0→1) = (sqrtPriceX96 / 2^96)^2 × 10^(decimals0 − decimals1)`.
/// Both directions are derived from the same exact rational value, so their
/// product is 1 up to the decimal rounding of each side.
pub fn rates_from_sqrt_price(
    sqrt_price_x96: U256,
    decimals0: u8,
    decimals1: u8,
) -> Result<(Decimal, Decimal), QuoteError> {
    if sqrt_price_x96.is_zero() {
        return Err(QuoteError::ZeroPrice);
    }

    let sqrt = U512::from_limbs_slice(sqrt_price_x96.as_limbs());
    let squared = sqrt.checked_mul(sqrt).ok_or(QuoteError::RateOutOfRange)?;

    let (scale_num, scale_den) = if decimals0 >= decimals1 {
        (pow10(u32::from(decimals0 - decimals1)), Some(U512::from(1u8)))
    } else {
        (Some(U512::from(1u8)), pow10(u32::from(decimals1 - decimals0)))
    };

    let numerator = scale_num
        .and_then(|s| squared.checked_mul(s))
        .ok_or(QuoteError::RateOutOfRange)?;
    let denominator = scale_den
        .and_then(|s| Q192.checked_mul(s))
        .ok_or(QuoteError::RateOutOfRange)?;

    let forward = ratio_to_decimal(numerator, denominator).ok_or(QuoteError::RateOutOfRange)?;
    let inverse = ratio_to_decimal(denominator, numerator).ok_or(QuoteError::RateOutOfRange)?;
    Ok((forward, inverse))
}

/// Normalize every quote against the registry.
///
/// A bad quote is recorded in `rejected` and never stops the batch.
#[instrument(skip_all, fields(quotes = quotes.len(), tokens = registry.len()))]
pub fn normalize_quotes(registry: &TokenRegistry, quotes: &[PoolQuote]) -> NormalizedQuotes {
    let mut out = NormalizedQuotes::default();
    let mut seen_pools: HashSet<&Address> = HashSet::with_capacity(quotes.len());

    for (index, quote) in quotes.iter().enumerate() {
        let result = if seen_pools.insert(&quote.pool) {
            normalize_quote(registry, quote)
        } else {
            Err(QuoteError::DuplicatePool)
        };

        match result {
            Ok(normalized) => out.accepted.push(normalized),
            Err(reason) => {
                warn!(
                    index,
                    pool = %quote.pool,
                    reason = %reason,
                    "Quote rejected"
                );
                metrics::inc_quotes_rejected();
                out.rejected.push(QuoteRejection {
                    index,
                    pool: quote.pool,
                    reason,
                });
            }
        }
    }

    debug!(
        accepted = out.accepted.len(),
        rejected = out.rejected.len(),
        "Quotes normalized"
    );
    out
}

/// Validate and normalize one quote.
pub fn normalize_quote(
    registry: &TokenRegistry,
    quote: &PoolQuote,
) -> Result<NormalizedQuote, QuoteError> {
    check_pool_shape(quote)?;

    let token0 = registry
        .get(&quote.token0)
        .ok_or_else(|| QuoteError::MissingDecimals {
            token: quote.token0,
        })?;
    let token1 = registry
        .get(&quote.token1)
        .ok_or_else(|| QuoteError::MissingDecimals {
            token: quote.token1,
        })?;

    let (forward_rate, inverse_rate) =
        rates_from_sqrt_price(quote.sqrt_price_x96, token0.decimals, token1.decimals)?;

    Ok(NormalizedQuote {
        quote: Arc::new(quote.clone()),
        token0: token0.clone(),
        token1: token1.clone(),
        forward_rate,
        inverse_rate,
    })
}

/// Checks that need no token metadata.
fn check_pool_shape(quote: &PoolQuote) -> Result<(), QuoteError> {
    if quote.token0 == quote.token1 {
        return Err(QuoteError::SameToken {
            token: quote.token0,
        });
    }
    if quote.liquidity == 0 {
        return Err(QuoteError::ZeroLiquidity);
    }
    if quote.fee >= FEE_DENOMINATOR {
        return Err(QuoteError::InvalidFeeTier { fee: quote.fee });
    }
    Ok(())
}

fn pow10(exponent: u32) -> Option<U512> {
    U512::from(10u8).checked_pow(U512::from(exponent))
}

/// Convert `numerator / denominator` into the most precise `Decimal` that holds it.
fn ratio_to_decimal(numerator: U512, denominator: U512) -> Option<Decimal> {
    if numerator.is_zero() || denominator.is_zero() {
        return None;
    }

    for scale in (0..=MAX_SCALE).rev() {
        let Some(scaled) = pow10(scale).and_then(|p| numerator.checked_mul(p)) else {
            continue;
        };
        let scaled = scaled / denominator;
        if scaled > *MAX_MANTISSA {
            continue;
        }
        if scaled.is_zero() {
            return None;
        }
        let limbs = scaled.as_limbs();
        let mantissa = (u128::from(limbs[1]) << 64) | u128::from(limbs[0]);
        let mantissa = i128::try_from(mantissa).ok()?;
        return Decimal::try_from_i128_with_scale(mantissa, scale)
            .ok()
            .map(|d| d.normalize());
    }

    None
}

//! Unified error types for the arbitrage scanner.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::market::Address;

/// Unified error type for the arbitrage scanner.
#[derive(Error, Debug)]
pub enum ArbError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration values rejected before scanning.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Snapshot loading or validation error.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Prometheus recorder could not be installed.
    #[error("metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Scan parameters that would make comparisons meaningless.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Slippage tolerance below zero.
    #[error("slippage tolerance must not be negative, got {0}")]
    NegativeSlippage(Decimal),

    /// Slippage tolerance of 100% or more.
    #[error("slippage tolerance must be below 1, got {0}")]
    SlippageTooLarge(Decimal),

    /// Profit margin below zero.
    #[error("minimum profit margin must not be negative, got {0}")]
    NegativeMargin(Decimal),

    /// Gas cost below zero.
    #[error("gas cost must not be negative, got {0}")]
    NegativeGasCost(Decimal),

    /// Cycle length outside the supported window.
    #[error("max cycle length {length} outside supported range {min}..={max}")]
    CycleLengthOutOfRange {
        /// Requested length.
        length: usize,
        /// Smallest supported length.
        min: usize,
        /// Largest supported length.
        max: usize,
    },

    /// Search budget of zero paths.
    #[error("max paths per root must be positive")]
    ZeroSearchBudget,
}

/// Reasons a single pool quote is kept out of the rate graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// Token not present in the registry.
    #[error("no decimals known for token {token}")]
    MissingDecimals {
        /// Token without registry entry.
        token: Address,
    },

    /// Pool lists the same token on both sides.
    #[error("pool quotes token {token} against itself")]
    SameToken {
        /// The repeated token.
        token: Address,
    },

    /// Square-root price of zero.
    #[error("square-root price is zero")]
    ZeroPrice,

    /// Pool with no active liquidity.
    #[error("pool has zero liquidity")]
    ZeroLiquidity,

    /// Fee tier that consumes the whole trade.
    #[error("fee tier {fee} ppm must be below 1000000")]
    InvalidFeeTier {
        /// Offending fee tier.
        fee: u32,
    },

    /// Rate overflows or rounds to zero in decimal form.
    #[error("rate is outside the representable decimal range")]
    RateOutOfRange,

    /// Same pool address seen earlier in the snapshot.
    #[error("pool already quoted earlier in this snapshot")]
    DuplicatePool,
}

/// Snapshot input errors.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Snapshot file could not be read.
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Snapshot JSON is malformed.
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    /// Registry lists the same address twice.
    #[error("token {0} listed more than once")]
    DuplicateToken(Address),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ArbError>;

//! Uniswap V3 pool arbitrage scanner.
//!
//! Converts a snapshot of concentrated-liquidity pool quotes into a directed
//! graph of decimal exchange rates and searches it for two kinds of
//! opportunity:
//!
//! ```text
//! Direct:  WETH/USDC at 2000 in pool A, 2010 in pool B
//!          buy WETH in A, sell in B            → 0.5% before costs
//!
//! Cycle:   WETH → USDC → DAI → WETH
//!          2000 × 1.001 × 0.000502             → 1.005 before costs
//! ```
//!
//! Stored rates are raw mid prices. Fees, slippage and gas are applied only
//! when a scanner evaluates a candidate.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Tokens, pool quotes, registry and snapshots
//! - [`pricing`]: Quote normalization and the rate graph
//! - [`arbitrage`]: Direct and cycle scanners
//! - [`api`]: HTTP API for scans, health and metrics
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod pricing;
pub mod utils;

pub use config::{Config, ScanConfig};
pub use error::{ArbError, Result};

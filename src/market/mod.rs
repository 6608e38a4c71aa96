//! Market inputs for the scanner.
//!
//! This module handles:
//! - Token and pool quote types
//! - The explicit token registry
//! - JSON snapshot loading
//! - Snapshot and graph builders for testing

pub mod mock;
pub mod registry;
pub mod snapshot;
pub mod types;

pub use mock::{MockGraphBuilder, MockSnapshotBuilder};
pub use registry::TokenRegistry;
pub use snapshot::Snapshot;
pub use types::{parse_u256, short_address, Address, PoolQuote, Token, FEE_DENOMINATOR};

//! Arbitrage module for detecting opportunities in the rate graph.
//!
//! This module handles:
//! - Fee, slippage and gas cost adjustments
//! - Direct (two-pool) arbitrage detection
//! - Cycle arbitrage search
//! - The combined scan and its report

pub mod costs;
pub mod cycle;
pub mod direct;
pub mod opportunity;
pub mod scanner;

pub use costs::{gas_in_token, CostModel};
pub use cycle::{scan_cycles, CycleScan};
pub use direct::{scan_direct, DirectScan};
pub use opportunity::{
    LegRole, Opportunity, OpportunityKind, OpportunityLeg, SkipReason, SkippedCandidate,
};
pub use scanner::{run_scan, scan_graph, ScanReport, ScanStats};

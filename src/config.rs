//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::market::Address;

/// Shortest cycle the cycle scanner reports.
pub const MIN_CYCLE_LENGTH: usize = 3;

/// Hard cap on the cycle length; search cost grows exponentially with it.
pub const MAX_CYCLE_LENGTH_CAP: usize = 6;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Cost Model ===
    /// Slippage tolerance as a fraction (0.005 = 0.5%).
    #[serde(default = "default_slippage")]
    pub slippage_tolerance: Decimal,

    /// Apply pool fee tiers to effective rates.
    #[serde(default = "default_true")]
    pub fee_aware: bool,

    /// Gas cost per swap. Smallest units of `gas_token` when set, otherwise
    /// display units of whichever token a comparison is made in.
    #[serde(default)]
    pub gas_cost: Decimal,

    /// Token the gas cost is denominated in.
    #[serde(default)]
    pub gas_token: Option<Address>,

    // === Search Bounds ===
    /// Longest cycle to search for.
    #[serde(default = "default_max_cycle_length")]
    pub max_cycle_length: usize,

    /// Required profit beyond break-even (0.001 = 0.1%).
    #[serde(default = "default_min_profit_margin")]
    pub min_profit_margin: Decimal,

    /// Path extensions explored per cycle root before giving up.
    #[serde(default = "default_max_paths_per_root")]
    pub max_paths_per_root: usize,

    // === Server Configuration ===
    /// HTTP server port for the scan API and metrics.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_slippage() -> Decimal {
    Decimal::new(5, 3) // 0.005
}

fn default_true() -> bool {
    true
}

fn default_max_cycle_length() -> usize {
    MIN_CYCLE_LENGTH
}

fn default_min_profit_margin() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_max_paths_per_root() -> usize {
    250_000
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slippage_tolerance: default_slippage(),
            fee_aware: default_true(),
            gas_cost: Decimal::ZERO,
            gas_token: None,
            max_cycle_length: default_max_cycle_length(),
            min_profit_margin: default_min_profit_margin(),
            max_paths_per_root: default_max_paths_per_root(),
            port: default_port(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan_config().validate()
    }

    /// The scanner parameters carried by this configuration.
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            slippage_tolerance: self.slippage_tolerance,
            fee_aware: self.fee_aware,
            gas_cost: self.gas_cost,
            gas_token: self.gas_token,
            max_cycle_length: self.max_cycle_length,
            min_profit_margin: self.min_profit_margin,
            max_paths_per_root: self.max_paths_per_root,
        }
    }
}

/// Parameters of one scan, passed explicitly into the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Slippage tolerance as a fraction.
    pub slippage_tolerance: Decimal,
    /// Apply pool fee tiers.
    pub fee_aware: bool,
    /// Gas cost per swap.
    pub gas_cost: Decimal,
    /// Token the gas cost is denominated in (smallest units).
    pub gas_token: Option<Address>,
    /// Longest cycle searched, in `MIN_CYCLE_LENGTH..=MAX_CYCLE_LENGTH_CAP`.
    pub max_cycle_length: usize,
    /// Required profit beyond break-even.
    pub min_profit_margin: Decimal,
    /// Exploration budget per cycle root.
    pub max_paths_per_root: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Config::default().scan_config()
    }
}

impl ScanConfig {
    /// A cost-free configuration: no fee, slippage, gas or margin.
    pub fn frictionless() -> Self {
        Self {
            slippage_tolerance: Decimal::ZERO,
            fee_aware: false,
            gas_cost: Decimal::ZERO,
            gas_token: None,
            min_profit_margin: Decimal::ZERO,
            ..Self::default()
        }
    }

    /// Reject parameters that make comparisons meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slippage_tolerance < Decimal::ZERO {
            return Err(ConfigError::NegativeSlippage(self.slippage_tolerance));
        }
        if self.slippage_tolerance >= Decimal::ONE {
            return Err(ConfigError::SlippageTooLarge(self.slippage_tolerance));
        }
        if self.min_profit_margin < Decimal::ZERO {
            return Err(ConfigError::NegativeMargin(self.min_profit_margin));
        }
        if self.gas_cost < Decimal::ZERO {
            return Err(ConfigError::NegativeGasCost(self.gas_cost));
        }
        if !(MIN_CYCLE_LENGTH..=MAX_CYCLE_LENGTH_CAP).contains(&self.max_cycle_length) {
            return Err(ConfigError::CycleLengthOutOfRange {
                length: self.max_cycle_length,
                min: MIN_CYCLE_LENGTH,
                max: MAX_CYCLE_LENGTH_CAP,
            });
        }
        if self.max_paths_per_root == 0 {
            return Err(ConfigError::ZeroSearchBudget);
        }
        Ok(())
    }
}

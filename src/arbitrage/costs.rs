//! Fee, slippage and gas adjustments applied on top of raw rates.

use rust_decimal::Decimal;

use crate::config::ScanConfig;
use crate::market::{Address, FEE_DENOMINATOR};
use crate::pricing::RateGraph;

use super::opportunity::SkipReason;

/// Fee and slippage model shared by both scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    slippage: Decimal,
    fee_aware: bool,
}

impl CostModel {
    /// Create a cost model.
    pub fn new(slippage: Decimal, fee_aware: bool) -> Self {
        Self {
            slippage,
            fee_aware,
        }
    }

    /// Cost model of a scan configuration.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.slippage_tolerance, config.fee_aware)
    }

    /// Fee tier as a fraction, or zero in fee-naive mode.
    pub fn fee_fraction(&self, fee: u32) -> Decimal {
        if self.fee_aware {
            Decimal::from(fee) / Decimal::from(FEE_DENOMINATOR)
        } else {
            Decimal::ZERO
        }
    }

    /// Price paid per unit when buying at `rate`: `rate × (1 + s) / (1 − f)`.
    pub fn effective_buy(&self, rate: Decimal, fee: u32) -> Option<Decimal> {
        rate.checked_mul(Decimal::ONE + self.slippage)?
            .checked_div(Decimal::ONE - self.fee_fraction(fee))
    }

    /// Proceeds per unit when selling at `rate`: `rate × (1 − f) / (1 + s)`.
    ///
    /// Also the effective rate of one hop in a cycle.
    pub fn effective_sell(&self, rate: Decimal, fee: u32) -> Option<Decimal> {
        rate.checked_mul(Decimal::ONE - self.fee_fraction(fee))?
            .checked_div(Decimal::ONE + self.slippage)
    }
}

/// Gas cost of one swap expressed in display units of `token`.
///
/// With a gas token configured, the cost is in that token's smallest unit and
/// is converted at the best direct rate. Without one, it is used as given.
pub fn gas_in_token(
    config: &ScanConfig,
    graph: &RateGraph,
    token: &Address,
) -> Result<Decimal, SkipReason> {
    if config.gas_cost.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let Some(gas_token) = &config.gas_token else {
        return Ok(config.gas_cost);
    };

    let unavailable = || SkipReason::GasConversionUnavailable {
        token: *token,
    };
    let decimals = graph.token(gas_token).ok_or_else(unavailable)?.decimals;
    let display = Decimal::try_from_i128_with_scale(1, u32::from(decimals))
        .ok()
        .and_then(|unit| config.gas_cost.checked_mul(unit))
        .ok_or(SkipReason::ArithmeticOverflow)?;

    if gas_token == token {
        return Ok(display);
    }

    let edge = graph.best_rate(gas_token, token).ok_or_else(unavailable)?;
    display
        .checked_mul(edge.rate)
        .ok_or(SkipReason::ArithmeticOverflow)
}

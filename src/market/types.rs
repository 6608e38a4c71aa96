//! Token and pool quote types consumed by the scanner.

pub use alloy::primitives::Address;
use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Parts-per-million denominator for fee tiers.
pub const FEE_DENOMINATOR: u32 = 1_000_000;

/// Short checksummed form for log lines, e.g. `0xC02a…6Cc2`.
pub fn short_address(address: &Address) -> String {
    format!("{address:#}")
}

/// ERC-20 token identity as loaded from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Display ticker (not unique).
    pub ticker: String,
    /// Contract address (unique key).
    pub address: Address,
    /// Power-of-ten scale of raw balances.
    pub decimals: u8,
}

impl Token {
    /// Create a new token.
    pub fn new(ticker: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self {
            ticker: ticker.into(),
            address,
            decimals,
        }
    }
}

/// Instantaneous state of one concentrated-liquidity pool.
///
/// Tokens are in the pool contract's order, which need not match registry
/// order. `sqrt_price_x96` is √(token1 raw / token0 raw) scaled by 2^96.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolQuote {
    /// First token of the pool.
    pub token0: Address,
    /// Second token of the pool.
    pub token1: Address,
    /// Fee tier in parts-per-million (3000 = 0.3%).
    pub fee: u32,
    /// Pool contract address.
    pub pool: Address,
    /// Active liquidity.
    pub liquidity: u128,
    /// Square-root price as Q64.96 fixed point.
    #[serde(
        serialize_with = "serialize_u256",
        deserialize_with = "deserialize_u256"
    )]
    pub sqrt_price_x96: U256,
}

impl PoolQuote {
    /// Whether this pool trades the given unordered pair.
    pub fn connects(&self, a: &Address, b: &Address) -> bool {
        (&self.token0 == a && &self.token1 == b) || (&self.token0 == b && &self.token1 == a)
    }
}

/// Parse a decimal or 0x-prefixed hex string into a U256.
pub fn parse_u256(value: &str) -> Option<U256> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_str_radix(value, 10).ok(),
    }
}

fn serialize_u256<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn deserialize_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_u256(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid sqrtPriceX96 value: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parses_any_case_and_orders_numerically() {
        let mixed: Address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".parse().unwrap();
        let lower: Address = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".parse().unwrap();
        assert_eq!(mixed, lower);
        assert_eq!(short_address(&mixed), "0xC02a…6Cc2");

        let low: Address = "0x0000000000000000000000000000000000000001".parse().unwrap();
        let high: Address = "0xA000000000000000000000000000000000000000".parse().unwrap();
        assert!(low < high);
    }

    #[test]
    fn address_rejects_bad_input() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xZZ2aaa39b223fe8d0a0e5c4f27ead9083c756cc2".parse::<Address>().is_err());
    }

    #[test]
    fn address_serializes_as_hex_string() {
        let address: Address = "0x0000000000000000000000000000000000000001".parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000001\"");
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);
    }

    #[test]
    fn parse_u256_accepts_decimal_and_hex() {
        assert_eq!(
            parse_u256("79228162514264337593543950336"),
            Some(U256::from(1u8) << 96usize)
        );
        assert_eq!(parse_u256("0x1000000000000000000000000"), Some(U256::from(1u8) << 96usize));
        assert_eq!(parse_u256("not a number"), None);
    }

    #[test]
    fn pool_quote_deserializes_from_json() {
        let json = r#"{
            "token0": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            "token1": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            "fee": 500,
            "pool": "0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640",
            "liquidity": 12345,
            "sqrt_price_x96": "79228162514264337593543950336"
        }"#;

        let quote: PoolQuote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.fee, 500);
        assert_eq!(quote.sqrt_price_x96, U256::from(1u8) << 96usize);
        assert!(quote.connects(&quote.token1, &quote.token0));
    }
}

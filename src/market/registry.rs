//! Token registry: ticker ↔ address ↔ decimals.

use std::collections::HashMap;

use crate::error::SnapshotError;

use super::types::{Address, Token};

/// Immutable lookup of known tokens, keyed by address.
///
/// Passed explicitly into the normalizer; there is no process-wide cache.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<Address, Token>,
}

impl TokenRegistry {
    /// Build a registry, rejecting duplicate addresses.
    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Result<Self, SnapshotError> {
        let mut map = HashMap::new();
        for token in tokens {
            if map.contains_key(&token.address) {
                return Err(SnapshotError::DuplicateToken(token.address));
            }
            map.insert(token.address, token);
        }
        Ok(Self { tokens: map })
    }

    /// Look up a token by address.
    pub fn get(&self, address: &Address) -> Option<&Token> {
        self.tokens.get(address)
    }

    /// Decimals for a token, if registered.
    pub fn decimals(&self, address: &Address) -> Option<u8> {
        self.get(address).map(|t| t.decimals)
    }

    /// All tokens sharing a ticker (case-insensitive). Tickers are not unique.
    pub fn find_by_ticker(&self, ticker: &str) -> Vec<&Token> {
        let mut found: Vec<&Token> = self
            .tokens
            .values()
            .filter(|t| t.ticker.eq_ignore_ascii_case(ticker))
            .collect();
        found.sort_by(|a, b| a.address.cmp(&b.address));
        found
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

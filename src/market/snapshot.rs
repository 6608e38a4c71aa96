//! JSON snapshot input: token registry plus pool quotes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SnapshotError;

use super::registry::TokenRegistry;
use super::types::{PoolQuote, Token};

/// One immutable observation of the pool set, as produced by the fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tokens with their decimals.
    pub tokens: Vec<Token>,
    /// Pool quotes in fetch order.
    pub quotes: Vec<PoolQuote>,
}

impl Snapshot {
    /// Parse a snapshot from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a snapshot file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot = Self::from_json(&raw)?;
        debug!(
            tokens = snapshot.tokens.len(),
            quotes = snapshot.quotes.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Build the token registry for this snapshot.
    pub fn registry(&self) -> Result<TokenRegistry, SnapshotError> {
        TokenRegistry::from_tokens(self.tokens.iter().cloned())
    }
}

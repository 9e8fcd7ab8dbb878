use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Instrument classification used to pick a provider lookup code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolKind {
    /// Market index, looked up without a market suffix
    Index,
    /// Listed equity, looked up with the market suffix
    Equity,
}

/// A normalized instrument identifier
///
/// `storage_key` is the only identity persisted by the store.
/// `lookup_code` is provider-facing and is always derived from `storage_key`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Symbol {
    /// Identifier as it was supplied by the universe
    pub raw_key: String,

    /// Trimmed, uppercased identifier (e.g., "RELIANCE", "^NSEI")
    pub storage_key: String,

    /// Code sent to the quote provider (e.g., "RELIANCE.NS")
    pub lookup_code: String,

    pub kind: SymbolKind,
}

impl Symbol {
    pub fn is_index(&self) -> bool {
        self.kind == SymbolKind::Index
    }
}

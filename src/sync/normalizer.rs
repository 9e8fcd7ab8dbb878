use std::collections::HashSet;

use crate::config::NormalizerConfig;
use crate::models::{Symbol, SymbolKind};

/// Canonicalizes raw instrument identifiers
///
/// Index classification is table-driven: the index set and marker come from
/// configuration, so adding an index never touches fetch logic.
#[derive(Debug, Clone)]
pub struct SymbolNormalizer {
    index_symbols: HashSet<String>,
    index_marker: char,
    market_suffix: String,
}

impl SymbolNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            index_symbols: config
                .index_symbols
                .iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            index_marker: config.index_marker,
            market_suffix: config.market_suffix.trim().to_uppercase(),
        }
    }

    /// Normalize a raw identifier. Pure and total.
    pub fn normalize(&self, raw: &str) -> Symbol {
        let storage_key = raw.trim().to_uppercase();
        let kind = self.classify(&storage_key);

        let lookup_code = match kind {
            SymbolKind::Index => storage_key.clone(),
            SymbolKind::Equity if storage_key.ends_with(&self.market_suffix) => storage_key.clone(),
            SymbolKind::Equity => format!("{}{}", storage_key, self.market_suffix),
        };

        Symbol {
            raw_key: raw.to_string(),
            storage_key,
            lookup_code,
            kind,
        }
    }

    /// Normalize a universe, dropping blank identifiers and duplicate storage keys
    ///
    /// First occurrence wins; input order is kept.
    pub fn normalize_all<I, S>(&self, raw: I) -> Vec<Symbol>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        raw.into_iter()
            .map(|r| self.normalize(r.as_ref()))
            .filter(|symbol| {
                if symbol.storage_key.is_empty() {
                    tracing::warn!("Ignoring blank symbol in universe");
                    return false;
                }
                seen.insert(symbol.storage_key.clone())
            })
            .collect()
    }

    pub fn is_index(&self, storage_key: &str) -> bool {
        self.classify(storage_key) == SymbolKind::Index
    }

    fn classify(&self, storage_key: &str) -> SymbolKind {
        if self.index_symbols.contains(storage_key) || storage_key.starts_with(self.index_marker) {
            SymbolKind::Index
        } else {
            SymbolKind::Equity
        }
    }
}

impl Default for SymbolNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

//! Symbol table
//!
//! Maps human-friendly asset symbols ("SUI", "usdc") to canonical Sui coin
//! types. The table is built once at startup and shared read-only by every
//! query; it is the single source of truth for symbol resolution.

use crate::error::QueryError;
use std::collections::{BTreeMap, HashMap};

/// Well-known Sui mainnet coin types
pub mod coin_types {
    pub const SUI: &str = "0x2::sui::SUI";
    pub const USDC: &str =
        "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";
    pub const USDT: &str =
        "0xc060006111016b8a020ad5b33834984a437aaa7d3c74c18e09a95d48aceab08c::coin::COIN";
    pub const WETH: &str =
        "0xaf8cd5edc19c4512f4259f0bee101a40d41ebed738ade5874359610ef8eeced5::coin::COIN";
    pub const CETUS: &str =
        "0x06864a6f921804860930db6ddbe2e16acdf8504495ea7481637a1c8b9a8fe54b::cetus::CETUS";
    pub const DEEP: &str =
        "0xdeeb7a4662eec9f2f3def03fb937a663dddaa2e215b8078a284d026b7946c270::deep::DEEP";
    pub const AFSUI: &str =
        "0xf325ce1300e8dac124071d3152c5c5ee6174914f8bc2161e88329cf579246efc::afsui::AFSUI";
    pub const VSUI: &str =
        "0x549e8b69270defbfafd4f94e17ec44cdbdd99820b33bda2278dea3b9a32d3f55::cert::CERT";
    pub const HASUI: &str =
        "0xbde4ba4c2e274a60ce15c1cfff9e5c42e41654ac8b6d906a57efa4bd3c29f47d::hasui::HASUI";
    pub const NAVX: &str =
        "0xa99b8952d4f7d947ea77fe0ecdcc9e5fc0bcab2841d6e2a5aa00c3044e5544b5::navx::NAVX";
    pub const SCA: &str =
        "0x7016aae72cfc67f2fadf55769c0a7dd54291a583b63051a5ed71081cce836ac6::sca::SCA";
    pub const BUCK: &str =
        "0xce7ff77a83ea0cb6fd39bd8748e2ec89a3f41e8efdc3f4eb123e0ca37b184db2::buck::BUCK";
    pub const WAL: &str =
        "0x356a26eb9e012a68958082340d4c4116e7f55615cf27affcff209cf0ae544f59::wal::WAL";
}

/// Symbol → canonical identifier table
#[derive(Debug, Clone)]
pub struct SymbolTable {
    /// Keyed by upper-cased symbol
    by_symbol: BTreeMap<String, String>,
    /// Reverse index for display
    by_id: HashMap<String, String>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn empty() -> Self {
        Self {
            by_symbol: BTreeMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Create a table with all built-in Sui coins
    pub fn builtin() -> Self {
        use coin_types::*;

        let mut table = Self::empty();
        for (symbol, id) in [
            ("SUI", SUI),
            ("USDC", USDC),
            ("USDT", USDT),
            ("WETH", WETH),
            ("CETUS", CETUS),
            ("DEEP", DEEP),
            ("AFSUI", AFSUI),
            ("VSUI", VSUI),
            ("HASUI", HASUI),
            ("NAVX", NAVX),
            ("SCA", SCA),
            ("BUCK", BUCK),
            ("WAL", WAL),
        ] {
            table.insert(symbol, id);
        }
        table
    }

    /// Add or replace an entry.
    ///
    /// Several symbols may resolve to one identifier. The first symbol
    /// registered for an identifier keeps its display name.
    pub fn insert(&mut self, symbol: &str, id: &str) {
        let symbol = symbol.trim().to_uppercase();
        if let Some(previous) = self.by_symbol.insert(symbol.clone(), id.to_string()) {
            if self.by_id.get(&previous) == Some(&symbol) {
                self.by_id.remove(&previous);
                // Hand the old identifier to a remaining alias, if any
                if let Some(alias) = self
                    .by_symbol
                    .iter()
                    .find(|(_, other)| **other == previous)
                    .map(|(alias, _)| alias.clone())
                {
                    self.by_id.insert(previous, alias);
                }
            }
        }

        match self.by_id.get(id) {
            Some(owner) if *owner != symbol => {
                tracing::warn!(
                    symbol = %symbol,
                    id = id,
                    display = %owner,
                    "Identifier already has a symbol; adding as alias"
                );
            }
            _ => {
                self.by_id.insert(id.to_string(), symbol);
            }
        }
    }

    /// Merge configured overrides over the current entries
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Self {
        for (symbol, id) in overrides {
            self.insert(symbol, id);
        }
        self
    }

    /// Resolve a symbol to its canonical identifier.
    ///
    /// Symbols match case-insensitively. A value that already is a known
    /// canonical identifier is returned unchanged.
    pub fn resolve(&self, symbol: &str) -> Result<String, QueryError> {
        let trimmed = symbol.trim();
        if let Some(id) = self.by_symbol.get(&trimmed.to_uppercase()) {
            return Ok(id.clone());
        }
        if self.by_id.contains_key(trimmed) {
            return Ok(trimmed.to_string());
        }
        Err(QueryError::UnknownSymbol(trimmed.to_string()))
    }

    /// Symbol registered for a canonical identifier
    pub fn symbol_for(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// Human-readable name for an identifier: its symbol, or the last
    /// `::` segment of an unknown coin type
    pub fn display_name(&self, id: &str) -> String {
        match self.symbol_for(id) {
            Some(symbol) => symbol.to_string(),
            None => id.rsplit("::").next().unwrap_or(id).to_string(),
        }
    }

    /// Entries in symbol order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_symbol
            .iter()
            .map(|(symbol, id)| (symbol.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        let table = SymbolTable::builtin();
        assert_eq!(table.resolve("sui").unwrap(), coin_types::SUI);
        assert_eq!(table.resolve(" USDC ").unwrap(), coin_types::USDC);
    }

    #[test]
    fn test_canonical_id_passes_through() {
        let table = SymbolTable::builtin();
        assert_eq!(table.resolve(coin_types::CETUS).unwrap(), coin_types::CETUS);
    }

    #[test]
    fn test_unknown_symbol() {
        let table = SymbolTable::builtin();
        let err = table.resolve("DOGE").unwrap_err();
        assert!(matches!(err, QueryError::UnknownSymbol(ref s) if s == "DOGE"));
    }

    #[test]
    fn test_display_name() {
        let table = SymbolTable::builtin();
        assert_eq!(table.display_name(coin_types::WETH), "WETH");
        assert_eq!(table.display_name("0x123::fud::FUD"), "FUD");
        assert_eq!(table.display_name("plain"), "plain");
    }

    #[test]
    fn test_overrides_replace_reverse_index() {
        let overrides: HashMap<String, String> =
            [("SUI".to_string(), "0xabc::sui::SUI".to_string())].into();
        let table = SymbolTable::builtin().with_overrides(&overrides);
        assert_eq!(table.resolve("SUI").unwrap(), "0xabc::sui::SUI");
        assert!(table.symbol_for(coin_types::SUI).is_none());
        assert_eq!(table.symbol_for("0xabc::sui::SUI"), Some("SUI"));
    }

    #[test]
    fn test_override_onto_owned_id_is_alias() {
        let overrides: HashMap<String, String> =
            [("MYSUI".to_string(), coin_types::SUI.to_string())].into();
        let table = SymbolTable::builtin().with_overrides(&overrides);
        assert_eq!(table.resolve("mysui").unwrap(), coin_types::SUI);
        assert_eq!(table.symbol_for(coin_types::SUI), Some("SUI"));
        assert_eq!(table.display_name(coin_types::SUI), "SUI");
    }

    #[test]
    fn test_repointing_owner_hands_id_to_alias() {
        let mut table = SymbolTable::builtin();
        table.insert("MYSUI", coin_types::SUI);
        table.insert("SUI", "0xabc::sui::SUI");
        assert_eq!(table.symbol_for(coin_types::SUI), Some("MYSUI"));
        assert_eq!(table.resolve(coin_types::SUI).unwrap(), coin_types::SUI);
        assert_eq!(table.symbol_for("0xabc::sui::SUI"), Some("SUI"));

        // Re-pointing the alias leaves the owner's reverse entry alone
        table.insert("MYSUI", coin_types::USDC);
        assert_eq!(table.symbol_for("0xabc::sui::SUI"), Some("SUI"));
        assert_eq!(table.symbol_for(coin_types::USDC), Some("USDC"));
        assert!(table.symbol_for(coin_types::SUI).is_none());
    }

    #[test]
    fn test_builtin_entries_sorted() {
        let table = SymbolTable::builtin();
        let symbols: Vec<&str> = table.entries().map(|(s, _)| s).collect();
        let mut sorted = symbols.clone();
        sorted.sort();
        assert_eq!(symbols, sorted);
        assert_eq!(table.len(), 13);
    }
}

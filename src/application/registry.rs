//! Registry of token transfer sinks.
//!
//! The registry maps a lower-cased token symbol to the sink bound to that
//! token's contract. It is populated once at startup and shared read-only
//! afterwards.

use crate::application::ports::TransferSink;
use std::collections::HashMap;
use std::sync::Arc;

/// Error returned when a symbol is registered twice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("token symbol {0:?} is registered more than once")]
pub struct DuplicateToken(pub String);

/// Symbol to sink mapping.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<String, Arc<dyn TransferSink>>,
}

impl TokenRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink under `symbol` (case-insensitive).
    ///
    /// # Errors
    /// Returns `DuplicateToken` if the symbol is already registered.
    pub fn register(
        &mut self,
        symbol: &str,
        sink: Arc<dyn TransferSink>,
    ) -> Result<(), DuplicateToken> {
        let key = symbol.trim().to_lowercase();
        if self.tokens.contains_key(&key) {
            return Err(DuplicateToken(key));
        }
        self.tokens.insert(key, sink);
        Ok(())
    }

    /// Look up the sink for `symbol` (case-insensitive).
    pub fn get(&self, symbol: &str) -> Option<&Arc<dyn TransferSink>> {
        match self.tokens.get(symbol) {
            Some(sink) => Some(sink),
            None => self.tokens.get(&symbol.to_lowercase()),
        }
    }

    /// Registered symbols, sorted.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.tokens.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens are registered.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockSink;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = TokenRegistry::new();
        registry
            .register("USDT", Arc::new(MockSink::new("0xfaucet")))
            .unwrap();

        assert!(registry.get("usdt").is_some());
        assert!(registry.get("UsDt").is_some());
        assert!(registry.get("foo").is_none());
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let mut registry = TokenRegistry::new();
        registry
            .register("dai", Arc::new(MockSink::new("0xfaucet")))
            .unwrap();

        let err = registry
            .register("DAI", Arc::new(MockSink::new("0xfaucet")))
            .unwrap_err();
        assert_eq!(err, DuplicateToken("dai".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_symbols_sorted() {
        let mut registry = TokenRegistry::new();
        for symbol in ["usdt", "dai", "link"] {
            registry
                .register(symbol, Arc::new(MockSink::new("0xfaucet")))
                .unwrap();
        }
        assert_eq!(registry.symbols(), vec!["dai", "link", "usdt"]);
    }
}

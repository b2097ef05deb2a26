use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::option::OptionChain;
use crate::models::price::PriceBar;
use crate::models::symbol::SymbolMetadata;

use super::alphavantage::AlphaVantageProvider;
#[cfg(not(target_arch = "wasm32"))]
use super::yahoo_finance::YahooFinanceProvider;
use super::traits::MarketDataProvider;

/// Ordered list of market data providers.
///
/// History and option chains come from the first provider that answers;
/// metadata is merged across all of them.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn MarketDataProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // Yahoo Finance: no API key needed (primary).
        // Not available on WASM (uses native reqwest/tokio connectors)
        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Ok(yahoo) = YahooFinanceProvider::new() {
                registry.register(Box::new(yahoo));
            }
        }

        // Alpha Vantage: requires API key (sector/industry/address metadata, fallback history)
        if let Some(key) = api_keys.get("alphavantage") {
            registry.register(Box::new(AlphaVantageProvider::new(key.clone())));
        }

        registry
    }

    /// Register a new provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn MarketDataProvider>) {
        self.providers.push(provider);
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Merge metadata from every provider in priority order. Each sentinel
    /// field is filled by the first provider that knows it.
    ///
    /// Fails only if every provider fails.
    pub async fn fetch_metadata(&self, symbol: &str) -> Result<SymbolMetadata, CoreError> {
        let mut merged: Option<SymbolMetadata> = None;
        let mut last_error = None;

        for provider in &self.providers {
            match provider.fetch_metadata(symbol).await {
                Ok(meta) => {
                    let merged = merged.get_or_insert_with(SymbolMetadata::default);
                    merged.merge(&meta.sanitized());
                    if merged.missing_fields() == 0 {
                        break;
                    }
                }
                Err(e) => {
                    debug!("{} metadata for {symbol} failed: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }

        merged.ok_or_else(|| last_error.unwrap_or(CoreError::NoProvider))
    }

    /// History from the first provider that succeeds, with fallback.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, CoreError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.fetch_history(symbol, since).await {
                Ok(bars) if !bars.is_empty() => return Ok(bars),
                Ok(_) => {
                    last_error = Some(CoreError::Api {
                        provider: provider.name().to_string(),
                        message: format!("No price history for {symbol}"),
                    });
                }
                Err(e) => {
                    debug!("{} history for {symbol} failed: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }

    /// Option chain from the first provider that returns a non-empty one.
    /// An empty chain is a valid answer when no provider has options.
    pub async fn fetch_option_chain(&self, symbol: &str) -> Result<OptionChain, CoreError> {
        if self.providers.is_empty() {
            return Err(CoreError::NoProvider);
        }
        let mut last_error = None;
        let mut answered = false;
        for provider in &self.providers {
            match provider.fetch_option_chain(symbol).await {
                Ok(chain) if !chain.is_empty() => return Ok(chain),
                Ok(_) => answered = true,
                Err(e) => last_error = Some(e),
            }
        }
        match (answered, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(OptionChain::default()),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

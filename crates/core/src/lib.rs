pub mod errors;
pub mod format;
pub mod models;
pub mod providers;
pub mod services;

use models::{
    attribute::Attribute,
    chart::{ChartData, ChartRequest},
    collection::SymbolCollection,
    filter::{FilterCriterion, FilterMode},
    portfolio::PortfolioWeights,
    price::{PriceTable, SeriesPoint},
    settings::Settings,
    symbol::SymbolRecord,
    window::WindowSpec,
};
use providers::registry::ProviderRegistry;
use services::{
    chart_service::ChartPipeline,
    filter_service::AttributeFilter,
    ingest_service::{parse_symbols_file, parse_symbols_text, IngestReport, IngestService},
    portfolio_service::PortfolioAggregator,
    window_service::TimeWindowSelector,
};
use std::collections::BTreeSet;

use errors::CoreError;

/// Main entry point for the ticker dashboard core library.
///
/// Owns one session: the symbols loaded so far, the settings, and the
/// services that filter and chart them. The presentation layer holds a
/// `Dashboard` and calls into it once per interaction.
#[must_use]
pub struct Dashboard {
    collection: SymbolCollection,
    settings: Settings,
    registry: ProviderRegistry,
    ingest_service: IngestService,
    attribute_filter: AttributeFilter,
    chart_pipeline: ChartPipeline,
    window_selector: TimeWindowSelector,
    aggregator: PortfolioAggregator,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("symbols", &self.collection.len())
            .field("settings", &self.settings)
            .field("providers", &self.registry.provider_names())
            .finish()
    }
}

impl Dashboard {
    /// Create an empty session with default settings and providers.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Create an empty session; providers are configured from the settings' API keys.
    pub fn with_settings(settings: Settings) -> Self {
        let registry = ProviderRegistry::new_with_defaults(&settings.api_keys);
        Self::with_registry(settings, registry)
    }

    /// Create an empty session backed by a caller-supplied provider registry.
    pub fn with_registry(settings: Settings, registry: ProviderRegistry) -> Self {
        Self {
            collection: SymbolCollection::new(),
            settings,
            registry,
            ingest_service: IngestService::new(),
            attribute_filter: AttributeFilter::new(),
            chart_pipeline: ChartPipeline::new(),
            window_selector: TimeWindowSelector::new(),
            aggregator: PortfolioAggregator::new(),
        }
    }

    /// Create a session from a JSON settings document.
    pub fn from_settings_json(json: &str) -> Result<Self, CoreError> {
        Ok(Self::with_settings(Settings::from_json(json)?))
    }

    // ── Symbol Ingestion ────────────────────────────────────────────

    /// Add symbols typed as whitespace-separated text (case-insensitive).
    /// Symbols that fail to fetch are omitted and listed in the report.
    pub async fn add_symbols(&mut self, text: &str) -> Result<IngestReport, CoreError> {
        let symbols = parse_symbols_text(text);
        self.add_symbol_list(&symbols).await
    }

    /// Add symbols from an uploaded file with one symbol per line.
    pub async fn add_symbols_from_file(
        &mut self,
        contents: &str,
    ) -> Result<IngestReport, CoreError> {
        let symbols = parse_symbols_file(contents);
        self.add_symbol_list(&symbols).await
    }

    /// Fetch and add an already-parsed list of symbols.
    pub async fn add_symbol_list(&mut self, symbols: &[String]) -> Result<IngestReport, CoreError> {
        if symbols.is_empty() {
            return Ok(IngestReport::default());
        }
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }
        self.ingest_service
            .ingest(
                &self.registry,
                &mut self.collection,
                symbols,
                self.settings.history_start,
            )
            .await
    }

    /// Add a record obtained elsewhere. Returns `false` if the symbol is already loaded.
    pub fn add_record(&mut self, record: SymbolRecord) -> bool {
        self.collection.add_symbol(record)
    }

    // ── Session Contents ────────────────────────────────────────────

    /// Every loaded record, alphabetical by symbol.
    #[must_use]
    pub fn get_all(&self) -> Vec<&SymbolRecord> {
        self.collection.get_all().collect()
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&SymbolRecord> {
        self.collection.get(symbol)
    }

    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.collection.symbols()
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.collection.len()
    }

    #[must_use]
    pub fn collection(&self) -> &SymbolCollection {
        &self.collection
    }

    // ── Filters ─────────────────────────────────────────────────────

    /// Legal selections for an attribute: its distinct values, sorted.
    #[must_use]
    pub fn attribute_options(&self, attribute: Attribute) -> Vec<String> {
        self.attribute_filter.options(&self.collection, attribute)
    }

    /// Values to pre-select for an attribute under `mode`.
    #[must_use]
    pub fn default_selection(&self, attribute: Attribute, mode: FilterMode) -> BTreeSet<String> {
        self.attribute_filter
            .default_selection(&self.collection, attribute, mode)
    }

    /// Run one filter round with the attribute and mode given by name.
    pub fn filter(
        &self,
        attribute: &str,
        selected: &BTreeSet<String>,
        mode: &str,
    ) -> Result<BTreeSet<String>, CoreError> {
        self.attribute_filter
            .filter_by_name(&self.collection, attribute, selected, mode)
    }

    /// Combine several filter rounds under one mode.
    #[must_use]
    pub fn filter_symbols(&self, rounds: &[FilterCriterion], mode: FilterMode) -> BTreeSet<String> {
        self.attribute_filter
            .apply_rounds(&self.collection, rounds, mode)
    }

    #[must_use]
    pub fn select_all(&self) -> BTreeSet<String> {
        self.attribute_filter.select_all(&self.collection)
    }

    // ── Charts ──────────────────────────────────────────────────────

    /// Price table for the given symbols. Fails with `UnknownSymbol` if any isn't loaded.
    pub fn price_table<S: AsRef<str>>(&self, symbols: &[S]) -> Result<PriceTable, CoreError> {
        self.collection.price_table(symbols)
    }

    /// Chart request pre-filled from the session settings.
    #[must_use]
    pub fn default_chart_request(&self, symbol_count: usize) -> ChartRequest {
        ChartPipeline::default_request(&self.settings, symbol_count)
    }

    /// Windowed, optionally normalized chart data for `symbols`.
    pub fn chart<S: AsRef<str>>(
        &self,
        symbols: &[S],
        request: &ChartRequest,
    ) -> Result<ChartData, CoreError> {
        let table = self.price_table(symbols)?;
        self.chart_pipeline.render(&table, request)
    }

    /// Normalized adjusted-close chart for `symbols` with the weighted
    /// portfolio overlaid.
    pub fn portfolio_chart<S: AsRef<str>>(
        &self,
        symbols: &[S],
        weights: &PortfolioWeights,
        window: WindowSpec,
    ) -> Result<ChartData, CoreError> {
        let table = self.price_table(symbols)?;
        self.chart_pipeline.portfolio_chart(&table, weights, window)
    }

    /// Weighted portfolio growth series over `window`, using every weighted symbol.
    pub fn aggregate_portfolio(
        &self,
        weights: &PortfolioWeights,
        window: WindowSpec,
    ) -> Result<Vec<SeriesPoint>, CoreError> {
        let symbols: Vec<&str> = weights.symbols().collect();
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let table = self.price_table(symbols.as_slice())?;
        let (start, end) = self.window_selector.resolve(&table, &window)?;
        self.aggregator.aggregate_window(weights, &table, start, end)
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Set an API key for a provider (e.g., "alphavantage").
    /// Rebuilds the provider registry so the new key takes effect immediately.
    pub fn set_api_key(&mut self, provider: String, key: String) {
        self.settings.api_keys.insert(provider, key);
        self.registry = ProviderRegistry::new_with_defaults(&self.settings.api_keys);
    }

    /// Remove an API key for a provider.
    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        let removed = self.settings.api_keys.remove(provider).is_some();
        if removed {
            self.registry = ProviderRegistry::new_with_defaults(&self.settings.api_keys);
        }
        removed
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.registry.provider_names()
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Snapshot of every loaded record as JSON (for debugging/display).
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.collection)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize session: {e}")))
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

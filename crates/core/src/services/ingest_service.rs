use chrono::{NaiveDate, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::CoreError;
use crate::models::collection::SymbolCollection;
use crate::models::symbol::SymbolRecord;
use crate::providers::registry::ProviderRegistry;

/// Parse whitespace-separated symbols typed by the user.
/// Uppercased, blank entries dropped, deduplicated and sorted.
#[must_use]
pub fn parse_symbols_text(text: &str) -> Vec<String> {
    normalize_symbols(text.split_whitespace())
}

/// Parse an uploaded list with one symbol per line.
#[must_use]
pub fn parse_symbols_file(contents: &str) -> Vec<String> {
    normalize_symbols(contents.lines())
}

fn normalize_symbols<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    raw.map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Newly added to the session
    pub added: Vec<String>,
    /// Already in the session, not fetched again
    pub skipped: Vec<String>,
    /// Omitted because fetching failed, with the reason
    pub failed: Vec<(String, String)>,
}

/// Fetches symbols one at a time and appends them to the session.
pub struct IngestService;

impl IngestService {
    pub fn new() -> Self {
        Self
    }

    /// Fetch everything the session keeps for one symbol:
    /// metadata, price history, then the option chain.
    pub async fn fetch_record(
        &self,
        registry: &ProviderRegistry,
        symbol: &str,
        since: Option<NaiveDate>,
    ) -> Result<SymbolRecord, CoreError> {
        let as_of = Utc::now();

        debug!("Getting {symbol} metadata");
        let metadata = registry.fetch_metadata(symbol).await?;

        debug!("Getting {symbol} price history");
        let history = registry.fetch_history(symbol, since).await?;

        debug!("Getting {symbol} option chain");
        let option_chain = registry.fetch_option_chain(symbol).await?;

        Ok(SymbolRecord::new(symbol, as_of, metadata, history, option_chain))
    }

    /// Fetch `symbols` sequentially and add each success to `collection`.
    ///
    /// Any error while fetching a symbol is wrapped as a `FetchFailure`,
    /// logged and reported; the symbol is left out and the batch carries on.
    pub async fn ingest(
        &self,
        registry: &ProviderRegistry,
        collection: &mut SymbolCollection,
        symbols: &[String],
        since: Option<NaiveDate>,
    ) -> Result<IngestReport, CoreError> {
        let mut report = IngestReport::default();
        let pending: BTreeSet<String> = symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        for symbol in pending {
            if collection.contains(&symbol) {
                report.skipped.push(symbol);
                continue;
            }

            match self.fetch_record(registry, &symbol, since).await {
                Ok(record) => {
                    collection.add_symbol(record);
                    report.added.push(symbol);
                }
                Err(e) => {
                    let failure = CoreError::fetch_failure(&symbol, &e);
                    if e.is_fetch_failure() {
                        warn!("{failure}; omitting {symbol}");
                    } else {
                        error!("{failure}; omitting {symbol}");
                    }
                    report.failed.push((symbol, e.to_string()));
                }
            }
        }

        info!(
            "Ingested {} symbols ({} skipped, {} failed); session holds {}",
            report.added.len(),
            report.skipped.len(),
            report.failed.len(),
            collection.len()
        );
        Ok(report)
    }
}

impl Default for IngestService {
    fn default() -> Self {
        Self::new()
    }
}

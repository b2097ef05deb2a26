use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::attribute::Attribute;
use super::price::PriceTable;
use super::symbol::SymbolRecord;
use crate::errors::CoreError;

/// All symbols loaded into the session, keyed by uppercase symbol.
///
/// Append-only: a symbol is added once and never replaced or removed.
/// Iteration is alphabetical.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolCollection {
    records: BTreeMap<String, SymbolRecord>,
}

impl SymbolCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Returns `false` (and keeps the existing record) if the
    /// symbol is already present. The stored record's symbol is uppercased
    /// to match its key.
    pub fn add_symbol(&mut self, mut record: SymbolRecord) -> bool {
        let key = record.symbol.trim().to_uppercase();
        if self.records.contains_key(&key) {
            return false;
        }
        record.symbol.clone_from(&key);
        self.records.insert(key, record);
        true
    }

    /// Every record, alphabetical by symbol.
    pub fn get_all(&self) -> impl Iterator<Item = &SymbolRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&SymbolRecord> {
        self.records.get(&symbol.trim().to_uppercase())
    }

    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.records.contains_key(&symbol.trim().to_uppercase())
    }

    /// Symbols, alphabetical.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct values of `attribute` across the collection, sorted.
    #[must_use]
    pub fn distinct_values(&self, attribute: Attribute) -> BTreeSet<String> {
        self.records
            .values()
            .map(|r| attribute.value_of(&r.metadata).to_string())
            .collect()
    }

    /// Restrict the collection to `symbols`, keeping only those present.
    #[must_use]
    pub fn subset<'a, I>(&self, symbols: I) -> SymbolCollection
    where
        I: IntoIterator<Item = &'a str>,
    {
        let records = symbols
            .into_iter()
            .filter_map(|s| self.get(s))
            .map(|r| (r.symbol.clone(), r.clone()))
            .collect();
        SymbolCollection { records }
    }

    /// Combined price table for `symbols`.
    /// Fails with `UnknownSymbol` for any symbol not in the collection.
    pub fn price_table<I, S>(&self, symbols: I) -> Result<PriceTable, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = PriceTable::new();
        for symbol in symbols {
            let symbol = symbol.as_ref();
            let record = self
                .get(symbol)
                .ok_or_else(|| CoreError::UnknownSymbol(symbol.to_uppercase()))?;
            table.insert(&record.symbol, record.historical_prices.clone());
        }
        Ok(table)
    }
}

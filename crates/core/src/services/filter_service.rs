use std::collections::BTreeSet;

use crate::errors::CoreError;
use crate::models::attribute::Attribute;
use crate::models::collection::SymbolCollection;
use crate::models::filter::{FilterCriterion, FilterMode};

/// Selects symbols by their metadata attributes.
///
/// A single round picks symbols by one attribute. Several rounds combine
/// according to the mode: `Any` unions each round's matches over the whole
/// collection, while `All` and `Exclude` filter each round within the
/// survivors of the previous one.
pub struct AttributeFilter;

impl AttributeFilter {
    pub fn new() -> Self {
        Self
    }

    /// Run one filter round over `records`.
    ///
    /// In `All` mode an empty selection auto-selects the attribute's only
    /// value when the collection has exactly one distinct value for it.
    #[must_use]
    pub fn filter(
        &self,
        records: &SymbolCollection,
        attribute: Attribute,
        selected: &BTreeSet<String>,
        mode: FilterMode,
    ) -> BTreeSet<String> {
        match mode {
            FilterMode::Any => filter_any(records, attribute, selected),
            FilterMode::All => {
                if selected.is_empty() {
                    let auto = self.default_selection(records, attribute, mode);
                    filter_all(records, attribute, &auto)
                } else {
                    filter_all(records, attribute, selected)
                }
            }
            FilterMode::Exclude => filter_exclude(records, attribute, selected),
        }
    }

    /// Like [`filter`](Self::filter), with the attribute and mode given by name.
    pub fn filter_by_name(
        &self,
        records: &SymbolCollection,
        attribute: &str,
        selected: &BTreeSet<String>,
        mode: &str,
    ) -> Result<BTreeSet<String>, CoreError> {
        let attribute: Attribute = attribute.parse()?;
        let mode: FilterMode = mode.parse()?;
        Ok(self.filter(records, attribute, selected, mode))
    }

    /// Legal choices for `attribute`: its distinct values in `records`, sorted.
    #[must_use]
    pub fn options(&self, records: &SymbolCollection, attribute: Attribute) -> Vec<String> {
        records.distinct_values(attribute).into_iter().collect()
    }

    /// Selection to pre-fill for a round. `All` pre-selects a lone value;
    /// every other case starts empty.
    #[must_use]
    pub fn default_selection(
        &self,
        records: &SymbolCollection,
        attribute: Attribute,
        mode: FilterMode,
    ) -> BTreeSet<String> {
        let options = records.distinct_values(attribute);
        match mode {
            FilterMode::All if options.len() == 1 => options,
            _ => BTreeSet::new(),
        }
    }

    /// Evaluate several rounds under one mode.
    ///
    /// `Any` starts from nothing and adds each round's matches against the
    /// full collection. `All`/`Exclude` start from every symbol and narrow
    /// the set round by round.
    #[must_use]
    pub fn apply_rounds(
        &self,
        records: &SymbolCollection,
        rounds: &[FilterCriterion],
        mode: FilterMode,
    ) -> BTreeSet<String> {
        match mode {
            FilterMode::Any => rounds
                .iter()
                .flat_map(|c| self.filter(records, c.attribute, &c.selected_values, mode))
                .collect(),
            FilterMode::All | FilterMode::Exclude => {
                let mut survivors: BTreeSet<String> = records.symbols().into_iter().collect();
                for criterion in rounds {
                    let pool = records.subset(survivors.iter().map(String::as_str));
                    survivors =
                        self.filter(&pool, criterion.attribute, &criterion.selected_values, mode);
                }
                survivors
            }
        }
    }

    /// Every symbol in the collection.
    #[must_use]
    pub fn select_all(&self, records: &SymbolCollection) -> BTreeSet<String> {
        records.symbols().into_iter().collect()
    }
}

impl Default for AttributeFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn filter_any(
    records: &SymbolCollection,
    attribute: Attribute,
    selected: &BTreeSet<String>,
) -> BTreeSet<String> {
    records
        .get_all()
        .filter(|r| selected.contains(attribute.value_of(&r.metadata)))
        .map(|r| r.symbol.clone())
        .collect()
}

fn filter_all(
    records: &SymbolCollection,
    attribute: Attribute,
    selected: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut out: BTreeSet<String> = records.symbols().into_iter().collect();
    for record in records.get_all() {
        if !selected.contains(attribute.value_of(&record.metadata)) {
            out.remove(&record.symbol);
        }
    }
    out
}

fn filter_exclude(
    records: &SymbolCollection,
    attribute: Attribute,
    selected: &BTreeSet<String>,
) -> BTreeSet<String> {
    records
        .get_all()
        .filter(|r| !selected.contains(attribute.value_of(&r.metadata)))
        .map(|r| r.symbol.clone())
        .collect()
}

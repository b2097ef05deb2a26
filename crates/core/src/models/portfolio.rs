use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Symbol → weight used to build a weighted portfolio series.
///
/// Weights are used as given: they may be negative and need not sum to 1.
/// Zero weights are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeights {
    weights: BTreeMap<String, f64>,
}

impl PortfolioWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a symbol's weight. A zero weight removes the symbol.
    pub fn set(&mut self, symbol: &str, weight: f64) {
        let key = symbol.trim().to_uppercase();
        if weight == 0.0 {
            self.weights.remove(&key);
        } else {
            self.weights.insert(key, weight);
        }
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.weights.get(&symbol.to_uppercase()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(s, w)| (s.as_str(), *w))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for PortfolioWeights {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut weights = PortfolioWeights::new();
        for (symbol, weight) in iter {
            weights.set(symbol.as_ref(), weight);
        }
        weights
    }
}

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::portfolio::PortfolioWeights;
use crate::models::price::{PriceBar, PriceTable, SeriesPoint};

/// Builds a weighted portfolio growth series from per-symbol adjusted closes.
pub struct PortfolioAggregator;

impl PortfolioAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Cumulative growth of the weighted sum of simple daily returns.
    ///
    /// 1. Each symbol's return is `adj[t] / adj[t-1] - 1`, with 0 on its first date.
    /// 2. Returns are scaled by weight and summed per date over the union of
    ///    all weighted symbols' dates; a missing date contributes 0.
    /// 3. The combined series is compounded from 1.0.
    ///
    /// Zero-weight symbols take no part, so their dates don't enter the union.
    /// Fails with `UnknownSymbol` if a weighted symbol isn't in `prices`.
    pub fn aggregate(
        &self,
        weights: &PortfolioWeights,
        prices: &PriceTable,
    ) -> Result<Vec<SeriesPoint>, CoreError> {
        check_known(weights, prices)?;
        Ok(compound(weights, prices))
    }

    /// Like [`aggregate`](Self::aggregate), restricted to `start..=end`.
    ///
    /// Membership is checked against the full table, so a weighted symbol
    /// with no rows inside the window contributes nothing instead of
    /// failing as unknown.
    pub fn aggregate_window(
        &self,
        weights: &PortfolioWeights,
        prices: &PriceTable,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SeriesPoint>, CoreError> {
        check_known(weights, prices)?;
        Ok(compound(weights, &prices.between(start, end)))
    }
}

fn weighted(weights: &PortfolioWeights) -> impl Iterator<Item = (&str, f64)> {
    weights.iter().filter(|(_, w)| *w != 0.0)
}

fn check_known(weights: &PortfolioWeights, prices: &PriceTable) -> Result<(), CoreError> {
    match weighted(weights).find(|(symbol, _)| !prices.contains(symbol)) {
        Some((symbol, _)) => Err(CoreError::UnknownSymbol(symbol.to_string())),
        None => Ok(()),
    }
}

fn compound(weights: &PortfolioWeights, prices: &PriceTable) -> Vec<SeriesPoint> {
    let mut combined: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for (symbol, weight) in weighted(weights) {
        let Some(bars) = prices.get(symbol) else {
            continue;
        };
        for point in simple_returns(bars) {
            *combined.entry(point.date).or_insert(0.0) += point.value * weight;
        }
    }

    let mut growth = 1.0;
    combined
        .into_iter()
        .map(|(date, ret)| {
            growth *= 1.0 + ret;
            SeriesPoint {
                date,
                value: growth,
            }
        })
        .collect()
}

impl Default for PortfolioAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Period-over-period adjusted-close returns; the first period is 0.
/// An undefined return (0/0) is treated as 0.
pub fn simple_returns(bars: &[PriceBar]) -> Vec<SeriesPoint> {
    let mut prev: Option<f64> = None;
    bars.iter()
        .map(|bar| {
            let value = match prev {
                Some(p) => {
                    let r = bar.adj_close / p - 1.0;
                    if r.is_nan() { 0.0 } else { r }
                }
                None => 0.0,
            };
            prev = Some(bar.adj_close);
            SeriesPoint {
                date: bar.date,
                value,
            }
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════
// Service Tests — AttributeFilter, TimeWindowSelector, SeriesNormalizer,
// PortfolioAggregator, ChartPipeline, IngestService
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ticker_dashboard_core::errors::CoreError;
use ticker_dashboard_core::models::attribute::Attribute;
use ticker_dashboard_core::models::chart::{ChartRequest, PlotStyle};
use ticker_dashboard_core::models::collection::SymbolCollection;
use ticker_dashboard_core::models::filter::{FilterCriterion, FilterMode};
use ticker_dashboard_core::models::option::OptionChain;
use ticker_dashboard_core::models::portfolio::PortfolioWeights;
use ticker_dashboard_core::models::price::{PriceBar, PriceField, PriceTable, SeriesPoint};
use ticker_dashboard_core::models::settings::Settings;
use ticker_dashboard_core::models::symbol::{SymbolMetadata, SymbolRecord};
use ticker_dashboard_core::models::window::{Period, WindowSpec};
use ticker_dashboard_core::providers::registry::ProviderRegistry;
use ticker_dashboard_core::providers::traits::MarketDataProvider;
use ticker_dashboard_core::services::chart_service::{ChartPipeline, PORTFOLIO_OVERLAY};
use ticker_dashboard_core::services::filter_service::AttributeFilter;
use ticker_dashboard_core::services::ingest_service::{
    parse_symbols_file, parse_symbols_text, IngestService,
};
use ticker_dashboard_core::services::normalize_service::SeriesNormalizer;
use ticker_dashboard_core::services::portfolio_service::{simple_returns, PortfolioAggregator};
use ticker_dashboard_core::services::window_service::TimeWindowSelector;

const EPS: f64 = 1e-12;

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bar(date: NaiveDate, price: f64) -> PriceBar {
    PriceBar {
        date,
        open: price,
        high: price,
        low: price,
        close: price,
        adj_close: price,
        volume: 0,
    }
}

/// Consecutive daily bars starting at `start`.
fn daily(start: NaiveDate, prices: &[f64]) -> Vec<PriceBar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, p)| bar(start + chrono::Duration::days(i as i64), *p))
        .collect()
}

fn meta(sector: &str, country: &str, asset_type: &str) -> SymbolMetadata {
    SymbolMetadata {
        sector: sector.into(),
        country: country.into(),
        asset_type: asset_type.into(),
        ..SymbolMetadata::default()
    }
}

fn record(symbol: &str, metadata: SymbolMetadata) -> SymbolRecord {
    SymbolRecord::new(symbol, Utc::now(), metadata, vec![], OptionChain::default())
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// A: Tech/US/EQUITY, B: Energy/US/EQUITY, C: Tech/CA/EQUITY, D: Energy/CA/ETF
fn sample_collection() -> SymbolCollection {
    let mut c = SymbolCollection::new();
    c.add_symbol(record("A", meta("Tech", "US", "EQUITY")));
    c.add_symbol(record("B", meta("Energy", "US", "EQUITY")));
    c.add_symbol(record("C", meta("Tech", "CA", "EQUITY")));
    c.add_symbol(record("D", meta("Energy", "CA", "ETF")));
    c
}

fn two_symbol_table() -> PriceTable {
    let mut t = PriceTable::new();
    t.insert("A", daily(d(2024, 1, 1), &[100.0, 110.0, 121.0]));
    t.insert("B", daily(d(2024, 1, 1), &[50.0, 45.0, 49.5]));
    t
}

fn assert_series(actual: &[SeriesPoint], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch: {actual:?}");
    for (p, e) in actual.iter().zip(expected) {
        assert!(
            (p.value - e).abs() < 1e-9,
            "{} expected {e}, got {}",
            p.date,
            p.value
        );
    }
}

// ═══════════════════════════════════════════════════════════════════
// AttributeFilter
// ═══════════════════════════════════════════════════════════════════

mod attribute_filter {
    use super::*;

    #[test]
    fn any_returns_matching_symbols() {
        let mut c = SymbolCollection::new();
        c.add_symbol(record("A", meta("Tech", "US", "EQUITY")));
        c.add_symbol(record("B", meta("Energy", "US", "EQUITY")));
        c.add_symbol(record("C", meta("Tech", "US", "EQUITY")));
        let f = AttributeFilter::new();
        let out = f.filter(&c, Attribute::Sector, &set(&["Tech"]), FilterMode::Any);
        assert_eq!(out, set(&["A", "C"]));
    }

    #[test]
    fn lowercase_record_symbol_is_matched_in_every_mode() {
        let mut lower = record("AAA", meta("Tech", "US", "EQUITY"));
        lower.symbol = "aaa".into();
        let mut c = SymbolCollection::new();
        c.add_symbol(lower);
        c.add_symbol(record("BBB", meta("Energy", "US", "EQUITY")));
        let f = AttributeFilter::new();

        let any = f.filter(&c, Attribute::Sector, &set(&["Tech"]), FilterMode::Any);
        assert_eq!(any, set(&["AAA"]));
        let all = f.filter(&c, Attribute::Sector, &set(&["Energy"]), FilterMode::All);
        assert_eq!(all, set(&["BBB"]));
        let exclude = f.filter(&c, Attribute::Sector, &set(&["Energy"]), FilterMode::Exclude);
        assert_eq!(exclude, set(&["AAA"]));
    }

    #[test]
    fn exclude_returns_complement() {
        let mut c = SymbolCollection::new();
        c.add_symbol(record("A", meta("Tech", "US", "EQUITY")));
        c.add_symbol(record("B", meta("Energy", "US", "EQUITY")));
        c.add_symbol(record("C", meta("Tech", "US", "EQUITY")));
        let f = AttributeFilter::new();
        let out = f.filter(&c, Attribute::Sector, &set(&["Tech"]), FilterMode::Exclude);
        assert_eq!(out, set(&["B"]));
    }

    #[test]
    fn any_and_exclude_partition_the_collection() {
        let c = sample_collection();
        let f = AttributeFilter::new();
        for selected in [set(&["US"]), set(&["CA"]), set(&["US", "CA"])] {
            let any = f.filter(&c, Attribute::Country, &selected, FilterMode::Any);
            let excl = f.filter(&c, Attribute::Country, &selected, FilterMode::Exclude);
            assert!(any.is_disjoint(&excl));
            let union: BTreeSet<String> = any.union(&excl).cloned().collect();
            assert_eq!(union, f.select_all(&c));
        }
    }

    #[test]
    fn any_with_empty_selection_is_empty() {
        let c = sample_collection();
        let out = AttributeFilter::new().filter(&c, Attribute::Sector, &set(&[]), FilterMode::Any);
        assert!(out.is_empty());
    }

    #[test]
    fn exclude_with_empty_selection_keeps_everything() {
        let c = sample_collection();
        let out =
            AttributeFilter::new().filter(&c, Attribute::Sector, &set(&[]), FilterMode::Exclude);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn all_keeps_members_of_selection() {
        let c = sample_collection();
        let f = AttributeFilter::new();
        let out = f.filter(&c, Attribute::Sector, &set(&["Energy"]), FilterMode::All);
        assert_eq!(out, set(&["B", "D"]));
    }

    #[test]
    fn all_is_idempotent() {
        let c = sample_collection();
        let f = AttributeFilter::new();
        let selected = set(&["Tech"]);
        let once = f.filter(&c, Attribute::Sector, &selected, FilterMode::All);
        let pool = c.subset(once.iter().map(String::as_str));
        let twice = f.filter(&pool, Attribute::Sector, &selected, FilterMode::All);
        assert_eq!(once, twice);
    }

    #[test]
    fn all_auto_selects_single_distinct_value() {
        let mut c = SymbolCollection::new();
        c.add_symbol(record("A", meta("Tech", "US", "EQUITY")));
        c.add_symbol(record("B", meta("Energy", "US", "EQUITY")));
        let f = AttributeFilter::new();
        assert_eq!(
            f.default_selection(&c, Attribute::Country, FilterMode::All),
            set(&["US"])
        );
        let out = f.filter(&c, Attribute::Country, &set(&[]), FilterMode::All);
        assert_eq!(out, set(&["A", "B"]));
    }

    #[test]
    fn all_with_empty_selection_and_several_values_is_empty() {
        let c = sample_collection();
        let f = AttributeFilter::new();
        assert!(f.default_selection(&c, Attribute::Sector, FilterMode::All).is_empty());
        assert!(f.filter(&c, Attribute::Sector, &set(&[]), FilterMode::All).is_empty());
    }

    #[test]
    fn default_selection_is_empty_for_any_and_exclude() {
        let mut c = SymbolCollection::new();
        c.add_symbol(record("A", meta("Tech", "US", "EQUITY")));
        let f = AttributeFilter::new();
        assert!(f.default_selection(&c, Attribute::Sector, FilterMode::Any).is_empty());
        assert!(f.default_selection(&c, Attribute::Sector, FilterMode::Exclude).is_empty());
    }

    #[test]
    fn options_are_sorted_distinct_values() {
        let c = sample_collection();
        assert_eq!(
            AttributeFilter::new().options(&c, Attribute::AssetType),
            vec!["EQUITY".to_string(), "ETF".to_string()]
        );
    }

    #[test]
    fn filter_by_name_validates_inputs() {
        let c = sample_collection();
        let f = AttributeFilter::new();
        assert_eq!(
            f.filter_by_name(&c, "sector", &set(&["Tech"]), "Any").unwrap(),
            set(&["A", "C"])
        );
        assert!(matches!(
            f.filter_by_name(&c, "colour", &set(&["Tech"]), "Any"),
            Err(CoreError::InvalidAttribute(_))
        ));
        assert!(matches!(
            f.filter_by_name(&c, "sector", &set(&["Tech"]), "Some"),
            Err(CoreError::InvalidMode(_))
        ));
    }

    #[test]
    fn any_rounds_are_unioned() {
        let c = sample_collection();
        let rounds = vec![
            FilterCriterion::new(Attribute::Sector, ["Tech"]),
            FilterCriterion::new(Attribute::AssetType, ["ETF"]),
        ];
        let out = AttributeFilter::new().apply_rounds(&c, &rounds, FilterMode::Any);
        assert_eq!(out, set(&["A", "C", "D"]));
    }

    #[test]
    fn all_rounds_are_intersected() {
        let c = sample_collection();
        let rounds = vec![
            FilterCriterion::new(Attribute::Sector, ["Tech"]),
            FilterCriterion::new(Attribute::Country, ["US"]),
        ];
        let out = AttributeFilter::new().apply_rounds(&c, &rounds, FilterMode::All);
        assert_eq!(out, set(&["A"]));
    }

    #[test]
    fn exclude_rounds_narrow_survivors() {
        let c = sample_collection();
        let rounds = vec![
            FilterCriterion::new(Attribute::Sector, ["Tech"]),
            FilterCriterion::new(Attribute::AssetType, ["ETF"]),
        ];
        let out = AttributeFilter::new().apply_rounds(&c, &rounds, FilterMode::Exclude);
        assert_eq!(out, set(&["B"]));
    }

    #[test]
    fn more_any_rounds_never_shrink_more_all_rounds_never_grow() {
        let c = sample_collection();
        let f = AttributeFilter::new();
        let first = FilterCriterion::new(Attribute::Country, ["US"]);
        let second = FilterCriterion::new(Attribute::Sector, ["Energy"]);

        let any_one = f.apply_rounds(&c, &[first.clone()], FilterMode::Any);
        let any_two = f.apply_rounds(&c, &[first.clone(), second.clone()], FilterMode::Any);
        assert!(any_one.is_subset(&any_two));

        let all_one = f.apply_rounds(&c, &[first.clone()], FilterMode::All);
        let all_two = f.apply_rounds(&c, &[first, second], FilterMode::All);
        assert!(all_two.is_subset(&all_one));
    }

    #[test]
    fn all_round_auto_selects_within_survivors() {
        // After narrowing to US symbols, only EQUITY remains as an asset type,
        // so an empty asset-type round keeps every survivor.
        let c = sample_collection();
        let rounds = vec![
            FilterCriterion::new(Attribute::Country, ["US"]),
            FilterCriterion::new(Attribute::AssetType, Vec::<String>::new()),
        ];
        let out = AttributeFilter::new().apply_rounds(&c, &rounds, FilterMode::All);
        assert_eq!(out, set(&["A", "B"]));
    }

    #[test]
    fn no_rounds() {
        let c = sample_collection();
        let f = AttributeFilter::new();
        assert!(f.apply_rounds(&c, &[], FilterMode::Any).is_empty());
        assert_eq!(f.apply_rounds(&c, &[], FilterMode::All).len(), 4);
        assert_eq!(f.apply_rounds(&c, &[], FilterMode::Exclude).len(), 4);
    }
}

// ═══════════════════════════════════════════════════════════════════
// TimeWindowSelector
// ═══════════════════════════════════════════════════════════════════

mod window_selector {
    use super::*;

    /// Daily bars for every day of 2022 and 2023, for two symbols.
    fn long_table() -> PriceTable {
        let start = d(2022, 1, 1);
        let prices: Vec<f64> = (0..730).map(|i| 100.0 + i as f64).collect();
        let mut t = PriceTable::new();
        t.insert("A", daily(start, &prices));
        t.insert("B", daily(start + chrono::Duration::days(10), &prices[..700]));
        t
    }

    #[test]
    fn all_returns_table_unchanged() {
        let t = long_table();
        let out = TimeWindowSelector::new()
            .select(&t, &WindowSpec::Named(Period::All))
            .unwrap();
        assert_eq!(out, t);
    }

    #[test]
    fn named_period_ends_on_latest_date() {
        let t = long_table();
        let sel = TimeWindowSelector::new();
        let (_, max) = t.date_bounds().unwrap();
        let (start, end) = sel.resolve(&t, &WindowSpec::Named(Period::OneMonth)).unwrap();
        assert_eq!(end, max);
        assert_eq!(start, max - chrono::Duration::days(30));
    }

    #[test]
    fn named_period_filters_every_symbol_by_date() {
        let t = long_table();
        let out = TimeWindowSelector::new()
            .select(&t, &WindowSpec::Named(Period::OneWeek))
            .unwrap();
        // 7 days back from the last date, inclusive of both ends
        assert_eq!(out.get("A").unwrap().len(), 8);
        // B ends 20 days before A, so it falls out of the window entirely
        assert!(!out.contains("B"));
    }

    #[test]
    fn period_longer_than_history_clamps_to_first_date() {
        let t = long_table();
        let sel = TimeWindowSelector::new();
        let (start, _) = sel.resolve(&t, &WindowSpec::Named(Period::TenYears)).unwrap();
        assert_eq!(start, d(2022, 1, 1));
        assert_eq!(sel.select(&t, &Period::TenYears.into()).unwrap(), t);
    }

    #[test]
    fn manual_range_is_inclusive() {
        let t = long_table();
        let out = TimeWindowSelector::new()
            .select(
                &t,
                &WindowSpec::Manual {
                    start: d(2022, 3, 1),
                    end: d(2022, 3, 10),
                },
            )
            .unwrap();
        let a = out.get("A").unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(a.first().unwrap().date, d(2022, 3, 1));
        assert_eq!(a.last().unwrap().date, d(2022, 3, 10));
    }

    #[test]
    fn manual_range_is_clamped_to_table() {
        let t = long_table();
        let sel = TimeWindowSelector::new();
        let (start, end) = sel
            .resolve(
                &t,
                &WindowSpec::Manual {
                    start: d(2000, 1, 1),
                    end: d(2030, 1, 1),
                },
            )
            .unwrap();
        assert_eq!((start, end), t.date_bounds().unwrap());
    }

    #[test]
    fn reversed_range_is_invalid() {
        let t = long_table();
        let err = TimeWindowSelector::new()
            .select(
                &t,
                &WindowSpec::Manual {
                    start: d(2023, 6, 1),
                    end: d(2023, 1, 1),
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRange { .. }));
    }

    #[test]
    fn range_entirely_after_table_clamps_to_last_day() {
        let t = long_table();
        let out = TimeWindowSelector::new()
            .select(
                &t,
                &WindowSpec::Manual {
                    start: d(2030, 1, 1),
                    end: d(2031, 1, 1),
                },
            )
            .unwrap();
        assert_eq!(out.row_count(), 1);
    }

    #[test]
    fn empty_table_is_an_error() {
        let err = TimeWindowSelector::new()
            .select(&PriceTable::new(), &WindowSpec::Named(Period::All))
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyTable));
    }
}

// ═══════════════════════════════════════════════════════════════════
// SeriesNormalizer
// ═══════════════════════════════════════════════════════════════════

mod normalizer {
    use super::*;

    fn ohlc(date: NaiveDate, open: f64, close: f64) -> PriceBar {
        PriceBar {
            date,
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            adj_close: close * 0.9,
            volume: 1_000,
        }
    }

    fn table() -> PriceTable {
        let mut t = PriceTable::new();
        t.insert(
            "A",
            vec![ohlc(d(2024, 1, 1), 10.0, 12.0), ohlc(d(2024, 1, 2), 12.0, 15.0)],
        );
        t.insert(
            "B",
            vec![ohlc(d(2024, 1, 1), 200.0, 190.0), ohlc(d(2024, 1, 2), 190.0, 210.0)],
        );
        t
    }

    #[test]
    fn first_value_becomes_one_for_every_field_choice() {
        let t = table();
        let n = SeriesNormalizer::new();
        for field in PriceField::ALL {
            let out = n.normalize(&t, field, true).unwrap();
            for (symbol, bars) in out.iter() {
                let first = bars[0].get(field);
                assert!((first - 1.0).abs() < EPS, "{symbol} {field}: {first}");
            }
        }
    }

    #[test]
    fn every_field_is_divided_by_the_same_datum() {
        let t = table();
        let out = SeriesNormalizer::new()
            .normalize(&t, PriceField::Close, true)
            .unwrap();
        let a = out.get("A").unwrap();
        // datum = first close of A = 12
        assert!((a[0].open - 10.0 / 12.0).abs() < EPS);
        assert!((a[1].close - 15.0 / 12.0).abs() < EPS);
        assert!((a[1].high - 16.0 / 12.0).abs() < EPS);
        assert_eq!(a[1].volume, 1_000);
    }

    #[test]
    fn symbols_are_normalized_independently() {
        let t = table();
        let out = SeriesNormalizer::new()
            .normalize(&t, PriceField::Open, true)
            .unwrap();
        assert!((out.get("A").unwrap()[1].open - 1.2).abs() < EPS);
        assert!((out.get("B").unwrap()[1].open - 0.95).abs() < EPS);
    }

    #[test]
    fn disabled_passes_values_through() {
        let t = table();
        let out = SeriesNormalizer::new()
            .normalize(&t, PriceField::Close, false)
            .unwrap();
        assert_eq!(out, t);
    }

    #[test]
    fn candlestick_anchors_on_open() {
        let t = table();
        let out = SeriesNormalizer::new()
            .normalize_for(&t, PriceField::Close, PlotStyle::Candlestick, true)
            .unwrap();
        assert!((out.get("A").unwrap()[0].open - 1.0).abs() < EPS);
        assert!((out.get("A").unwrap()[0].close - 1.2).abs() < EPS);
    }

    #[test]
    fn zero_datum_fails_fast() {
        let mut t = PriceTable::new();
        t.insert("Z", vec![bar(d(2024, 1, 1), 0.0), bar(d(2024, 1, 2), 1.0)]);
        let err = SeriesNormalizer::new()
            .normalize(&t, PriceField::AdjClose, true)
            .unwrap_err();
        assert!(matches!(err, CoreError::ZeroDatum { ref symbol } if symbol == "Z"));
    }

    #[test]
    fn zero_datum_is_ignored_when_not_normalizing() {
        let mut t = PriceTable::new();
        t.insert("Z", vec![bar(d(2024, 1, 1), 0.0)]);
        assert!(SeriesNormalizer::new()
            .normalize(&t, PriceField::AdjClose, false)
            .is_ok());
    }
}

// ═══════════════════════════════════════════════════════════════════
// PortfolioAggregator
// ═══════════════════════════════════════════════════════════════════

mod aggregator {
    use super::*;

    #[test]
    fn simple_returns_start_at_zero() {
        let r = simple_returns(&daily(d(2024, 1, 1), &[100.0, 110.0, 121.0]));
        assert_series(&r, &[0.0, 0.10, 0.10]);
    }

    #[test]
    fn two_symbol_equal_weight_scenario() {
        let weights: PortfolioWeights = [("A", 0.5), ("B", 0.5)].into_iter().collect();
        let out = PortfolioAggregator::new()
            .aggregate(&weights, &two_symbol_table())
            .unwrap();
        assert_series(&out, &[1.0, 1.0, 1.10]);
        assert_eq!(out[0].date, d(2024, 1, 1));
    }

    #[test]
    fn single_symbol_full_weight_matches_compounded_returns() {
        let prices = [100.0, 103.0, 99.5, 101.2, 108.0, 107.1];
        let bars = daily(d(2024, 2, 1), &prices);
        let mut t = PriceTable::new();
        t.insert("X", bars.clone());

        let weights: PortfolioWeights = [("X", 1.0)].into_iter().collect();
        let out = PortfolioAggregator::new().aggregate(&weights, &t).unwrap();

        let mut growth = 1.0;
        let expected: Vec<f64> = simple_returns(&bars)
            .iter()
            .map(|r| {
                growth *= 1.0 + r.value;
                growth
            })
            .collect();
        assert_series(&out, &expected);
        // compounded simple returns telescope back to the price ratio
        assert!((out.last().unwrap().value - 107.1 / 100.0).abs() < 1e-9);
    }

    #[test]
    fn dates_are_unioned_missing_dates_contribute_zero() {
        let mut t = PriceTable::new();
        t.insert("A", daily(d(2024, 1, 1), &[100.0, 110.0]));
        t.insert("B", daily(d(2024, 1, 2), &[50.0, 55.0]));
        let weights: PortfolioWeights = [("A", 1.0), ("B", 1.0)].into_iter().collect();
        let out = PortfolioAggregator::new().aggregate(&weights, &t).unwrap();
        // day1: A 0; day2: A 0.1 + B 0 (first); day3: B 0.1
        assert_eq!(out.len(), 3);
        assert_series(&out, &[1.0, 1.1, 1.21]);
    }

    #[test]
    fn zero_weight_symbols_do_not_extend_dates() {
        let mut t = PriceTable::new();
        t.insert("A", daily(d(2024, 1, 1), &[100.0, 110.0]));
        t.insert("B", daily(d(2023, 12, 1), &[50.0, 55.0, 60.0]));
        let weights: PortfolioWeights = [("A", 1.0), ("B", 0.0)].into_iter().collect();
        let out = PortfolioAggregator::new().aggregate(&weights, &t).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, d(2024, 1, 1));
    }

    #[test]
    fn negative_weights_short_the_symbol() {
        let weights: PortfolioWeights = [("A", -1.0)].into_iter().collect();
        let out = PortfolioAggregator::new()
            .aggregate(&weights, &two_symbol_table())
            .unwrap();
        assert_series(&out, &[1.0, 0.9, 0.81]);
    }

    #[test]
    fn unknown_symbol_fails() {
        let weights: PortfolioWeights = [("A", 0.5), ("Q", 0.5)].into_iter().collect();
        let err = PortfolioAggregator::new()
            .aggregate(&weights, &two_symbol_table())
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownSymbol(ref s) if s == "Q"));
    }

    fn stale_and_fresh_table() -> PriceTable {
        let mut t = PriceTable::new();
        t.insert("OLD", daily(d(2020, 3, 2), &[10.0, 11.0]));
        t.insert("NEW", daily(d(2024, 1, 1), &[100.0, 110.0, 121.0]));
        t
    }

    #[test]
    fn loaded_symbol_outside_window_contributes_nothing() {
        let weights: PortfolioWeights = [("OLD", 0.5), ("NEW", 0.5)].into_iter().collect();
        let out = PortfolioAggregator::new()
            .aggregate_window(&weights, &stale_and_fresh_table(), d(2024, 1, 1), d(2024, 1, 3))
            .unwrap();
        assert_eq!(out[0].date, d(2024, 1, 1));
        assert_series(&out, &[1.0, 1.05, 1.1025]);
    }

    #[test]
    fn windowed_aggregate_still_rejects_unloaded_symbols() {
        let weights: PortfolioWeights = [("NEW", 0.5), ("Q", 0.5)].into_iter().collect();
        let err = PortfolioAggregator::new()
            .aggregate_window(&weights, &stale_and_fresh_table(), d(2024, 1, 1), d(2024, 1, 3))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownSymbol(ref s) if s == "Q"));
    }

    #[test]
    fn no_weights_gives_empty_series() {
        let out = PortfolioAggregator::new()
            .aggregate(&PortfolioWeights::new(), &two_symbol_table())
            .unwrap();
        assert!(out.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// ChartPipeline
// ═══════════════════════════════════════════════════════════════════

mod chart_pipeline {
    use super::*;

    #[test]
    fn render_windows_then_normalizes() {
        let t = two_symbol_table();
        let request = ChartRequest {
            window: WindowSpec::Manual {
                start: d(2024, 1, 2),
                end: d(2024, 1, 3),
            },
            price_field: PriceField::AdjClose,
            plot_style: PlotStyle::Line,
            normalize: true,
            log_y: true,
        };
        let chart = ChartPipeline::new().render(&t, &request).unwrap();
        assert_eq!((chart.start, chart.end), (d(2024, 1, 2), d(2024, 1, 3)));
        assert!(chart.log_y);
        assert!(chart.normalized);
        // datum is the first in-window value, not the first overall
        assert_series(&chart.line("A").unwrap(), &[1.0, 1.1]);
        assert_series(&chart.line("B").unwrap(), &[1.0, 1.1]);
        assert!(chart.overlays.is_empty());
    }

    #[test]
    fn render_without_normalize_keeps_prices() {
        let t = two_symbol_table();
        let chart = ChartPipeline::new()
            .render(
                &t,
                &ChartRequest {
                    window: WindowSpec::Named(Period::All),
                    ..ChartRequest::default()
                },
            )
            .unwrap();
        assert_series(&chart.line("B").unwrap(), &[50.0, 45.0, 49.5]);
    }

    #[test]
    fn render_propagates_invalid_range() {
        let t = two_symbol_table();
        let err = ChartPipeline::new()
            .render(
                &t,
                &ChartRequest {
                    window: WindowSpec::Manual {
                        start: d(2024, 1, 3),
                        end: d(2024, 1, 1),
                    },
                    ..ChartRequest::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRange { .. }));
    }

    #[test]
    fn portfolio_chart_overlays_weighted_series() {
        let t = two_symbol_table();
        let weights: PortfolioWeights = [("A", 0.5), ("B", 0.5)].into_iter().collect();
        let chart = ChartPipeline::new()
            .portfolio_chart(&t, &weights, WindowSpec::Named(Period::All))
            .unwrap();
        assert!(chart.normalized);
        assert_eq!(chart.price_field, PriceField::AdjClose);
        assert_eq!(chart.overlays.len(), 1);
        assert_eq!(chart.overlays[0].name, PORTFOLIO_OVERLAY);
        assert_series(&chart.overlays[0].points, &[1.0, 1.0, 1.10]);
    }

    #[test]
    fn portfolio_chart_with_symbol_outside_named_window() {
        let mut t = PriceTable::new();
        t.insert("OLD", daily(d(2020, 3, 2), &[10.0, 11.0]));
        t.insert("NEW", daily(d(2024, 1, 1), &[100.0, 110.0, 121.0]));
        let weights: PortfolioWeights = [("OLD", 0.5), ("NEW", 0.5)].into_iter().collect();
        let chart = ChartPipeline::new()
            .portfolio_chart(&t, &weights, WindowSpec::Named(Period::OneYear))
            .unwrap();
        assert_eq!(chart.table.symbols().collect::<Vec<_>>(), vec!["NEW"]);
        assert_series(&chart.overlays[0].points, &[1.0, 1.05, 1.1025]);
    }

    #[test]
    fn default_request_normalizes_only_multi_symbol() {
        let settings = Settings::default();
        assert!(!ChartPipeline::default_request(&settings, 1).normalize);
        assert!(ChartPipeline::default_request(&settings, 2).normalize);

        let off = Settings {
            normalize_multi_symbol: false,
            ..Settings::default()
        };
        assert!(!ChartPipeline::default_request(&off, 3).normalize);
        assert_eq!(
            ChartPipeline::default_request(&settings, 1).window,
            WindowSpec::Named(Period::OneYear)
        );
    }
}

// ═══════════════════════════════════════════════════════════════════
// Ingestion
// ═══════════════════════════════════════════════════════════════════

/// Serves canned data; symbols listed in `failing` return a network error,
/// symbols in `garbled` a deserialization error.
struct MockProvider {
    failing: HashSet<String>,
    garbled: HashSet<String>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            garbled: HashSet::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn garbled(mut self, symbols: &[&str]) -> Self {
        self.garbled = symbols.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn fetch_metadata(&self, symbol: &str) -> Result<SymbolMetadata, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(symbol) {
            return Err(CoreError::Network(format!("{symbol} unreachable")));
        }
        if self.garbled.contains(symbol) {
            let err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
            return Err(err.into());
        }
        let sectors: HashMap<&str, &str> = [("AAPL", "Technology"), ("XOM", "Energy")].into();
        Ok(SymbolMetadata {
            sector: sectors.get(symbol).copied().unwrap_or("").to_string(),
            ..SymbolMetadata::default()
        })
    }

    async fn fetch_history(
        &self,
        _symbol: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, CoreError> {
        let bars = daily(d(2024, 1, 1), &[10.0, 11.0, 12.0]);
        Ok(bars
            .into_iter()
            .filter(|b| since.map_or(true, |s| b.date >= s))
            .collect())
    }
}

mod ingestion {
    use super::*;

    #[test]
    fn text_input_is_uppercased_deduplicated_sorted() {
        assert_eq!(
            parse_symbols_text("msft aapl  MSFT\tgoog "),
            vec!["AAPL", "GOOG", "MSFT"]
        );
        assert!(parse_symbols_text("   ").is_empty());
    }

    #[test]
    fn file_input_is_line_delimited() {
        assert_eq!(
            parse_symbols_file("aapl\n\n  xom \r\nAapl\n"),
            vec!["AAPL", "XOM"]
        );
    }

    #[tokio::test]
    async fn fetch_failures_are_omitted_not_fatal() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockProvider::new(&["BAD"])));
        let mut collection = SymbolCollection::new();

        let report = IngestService::new()
            .ingest(
                &registry,
                &mut collection,
                &["XOM".into(), "BAD".into(), "AAPL".into()],
                None,
            )
            .await
            .unwrap();

        assert_eq!(report.added, vec!["AAPL", "XOM"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "BAD");
        assert_eq!(collection.symbols(), vec!["AAPL", "XOM"]);
        assert_eq!(collection.get("AAPL").unwrap().metadata.sector, "Technology");
    }

    #[tokio::test]
    async fn non_network_error_mid_batch_is_omitted_not_fatal() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockProvider::new(&[]).garbled(&["BBB"])));
        let mut collection = SymbolCollection::new();

        let report = IngestService::new()
            .ingest(
                &registry,
                &mut collection,
                &["AAA".into(), "BBB".into(), "CCC".into()],
                None,
            )
            .await
            .unwrap();

        assert_eq!(report.added, vec!["AAA", "CCC"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "BBB");
        assert!(report.failed[0].1.starts_with("Deserialization error"));
        assert_eq!(collection.symbols(), vec!["AAA", "CCC"]);
    }

    #[tokio::test]
    async fn existing_symbols_are_skipped_without_fetching() {
        let provider = MockProvider::new(&[]);
        let calls = provider.calls.clone();
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(provider));
        let mut collection = SymbolCollection::new();
        let service = IngestService::new();

        service
            .ingest(&registry, &mut collection, &["AAPL".into()], None)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let report = service
            .ingest(&registry, &mut collection, &["aapl".into(), "XOM".into()], None)
            .await
            .unwrap();
        assert_eq!(report.skipped, vec!["AAPL"]);
        assert_eq!(report.added, vec!["XOM"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn history_start_is_passed_to_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockProvider::new(&[])));
        let record = IngestService::new()
            .fetch_record(&registry, "AAPL", Some(d(2024, 1, 2)))
            .await
            .unwrap();
        assert_eq!(record.historical_prices.len(), 2);
        assert!(record.option_chain.is_empty());
    }

    #[tokio::test]
    async fn empty_registry_reports_every_symbol_failed() {
        let registry = ProviderRegistry::new();
        let mut collection = SymbolCollection::new();
        let report = IngestService::new()
            .ingest(&registry, &mut collection, &["AAPL".into()], None)
            .await
            .unwrap();
        assert!(report.added.is_empty());
        assert_eq!(report.failed.len(), 1);
    }
}

use log::debug;

use crate::errors::CoreError;
use crate::models::chart::{ChartData, ChartRequest, Overlay, PlotStyle};
use crate::models::portfolio::PortfolioWeights;
use crate::models::price::{PriceField, PriceTable};
use crate::models::settings::Settings;
use crate::models::window::WindowSpec;
use crate::services::normalize_service::SeriesNormalizer;
use crate::services::portfolio_service::PortfolioAggregator;
use crate::services::window_service::TimeWindowSelector;

/// Name of the overlay line added by [`ChartPipeline::portfolio_chart`].
pub const PORTFOLIO_OVERLAY: &str = "Weighted Portfolio";

/// Generates chart-ready data sets from price tables.
///
/// The core computes all the numbers; the renderer only draws.
/// Stages run in order: window selection, then normalization.
pub struct ChartPipeline {
    selector: TimeWindowSelector,
    normalizer: SeriesNormalizer,
    aggregator: PortfolioAggregator,
}

impl ChartPipeline {
    pub fn new() -> Self {
        Self {
            selector: TimeWindowSelector::new(),
            normalizer: SeriesNormalizer::new(),
            aggregator: PortfolioAggregator::new(),
        }
    }

    /// Request pre-filled from settings. Normalization defaults on only when
    /// more than one symbol is shown and the settings allow it.
    #[must_use]
    pub fn default_request(settings: &Settings, symbol_count: usize) -> ChartRequest {
        ChartRequest {
            window: WindowSpec::Named(settings.default_period),
            price_field: settings.default_price_field,
            plot_style: settings.default_plot_style,
            normalize: settings.normalize_multi_symbol && symbol_count > 1,
            log_y: false,
        }
    }

    /// Window and normalize `table` as described by `request`.
    pub fn render(
        &self,
        table: &PriceTable,
        request: &ChartRequest,
    ) -> Result<ChartData, CoreError> {
        let (start, end) = self.selector.resolve(table, &request.window)?;
        let windowed = table.between(start, end);
        let prepared = self.normalizer.normalize_for(
            &windowed,
            request.price_field,
            request.plot_style,
            request.normalize,
        )?;

        debug!(
            "chart {} / {}: {} symbols, {start}..={end}, normalized={}",
            request.plot_style,
            request.price_field,
            prepared.symbol_count(),
            request.normalize
        );

        Ok(ChartData {
            style: request.plot_style,
            price_field: request.price_field,
            normalized: request.normalize,
            log_y: request.log_y,
            start,
            end,
            table: prepared,
            overlays: Vec::new(),
        })
    }

    /// Normalized adjusted-close line chart over `window` with the weighted
    /// portfolio series overlaid.
    ///
    /// The portfolio is built from the windowed data, so its growth series
    /// starts at the window's first date. A weighted symbol with no rows in
    /// the window contributes nothing; one missing from `table` is unknown.
    pub fn portfolio_chart(
        &self,
        table: &PriceTable,
        weights: &PortfolioWeights,
        window: WindowSpec,
    ) -> Result<ChartData, CoreError> {
        let request = ChartRequest {
            window,
            price_field: PriceField::AdjClose,
            plot_style: PlotStyle::Line,
            normalize: true,
            log_y: false,
        };
        let mut chart = self.render(table, &request)?;
        let points = self
            .aggregator
            .aggregate_window(weights, table, chart.start, chart.end)?;
        chart.overlays.push(Overlay {
            name: PORTFOLIO_OVERLAY.to_string(),
            points,
        });
        Ok(chart)
    }
}

impl Default for ChartPipeline {
    fn default() -> Self {
        Self::new()
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use yahoo_finance_api::{YQuoteSummary, YahooConnector};

use crate::errors::CoreError;
use crate::models::price::PriceBar;
use crate::models::symbol::SymbolMetadata;
use super::traits::MarketDataProvider;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance provider for price history and quote metadata.
///
/// - **Free**: No API key required.
/// - **Data**: full daily OHLC + adjusted close history. Metadata comes from
///   the quote summary (asset profile: sector, industry, country, state,
///   city; quote type: exchange, names) with ticker search filling gaps.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio).
pub struct YahooFinanceProvider {
    // quote summaries refresh the connector's cookie and crumb, which needs `&mut`
    connector: Mutex<YahooConnector>,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = YahooConnector::new().map_err(|e| api_error(
            format!("Failed to create connector: {e}"),
        ))?;
        Ok(Self {
            connector: Mutex::new(connector),
        })
    }

    /// Midnight UTC of `date` as a `time::OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let ts = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| api_error(format!("Invalid date {date}")))?;
        OffsetDateTime::from_unix_timestamp(ts)
            .map_err(|e| api_error(format!("Invalid date {date}: {e}")))
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    async fn search_metadata(&self, symbol: &str) -> Result<SymbolMetadata, CoreError> {
        let result = self
            .connector
            .lock()
            .await
            .search_ticker(symbol)
            .await
            .map_err(|e| api_error(format!("Ticker search failed for {symbol}: {e}")))?;

        let item = result
            .quotes
            .iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| api_error(format!("{symbol} not found")))?;

        Ok(SymbolMetadata {
            asset_type: item.quote_type.clone(),
            exchange: item.exchange.clone(),
            short_name: item.short_name.clone(),
            long_name: item.long_name.clone(),
            ..SymbolMetadata::default()
        }
        .sanitized())
    }
}

fn api_error(message: String) -> CoreError {
    CoreError::Api {
        provider: PROVIDER.into(),
        message,
    }
}

/// Metadata carried by a quote summary. Fields the summary lacks stay as
/// the sentinel; funds usually have no asset profile at all.
pub fn summary_metadata(summary: &YQuoteSummary) -> SymbolMetadata {
    let data = summary
        .quote_summary
        .as_ref()
        .and_then(|s| s.result.as_ref())
        .and_then(|r| r.first());
    let Some(data) = data else {
        return SymbolMetadata::default();
    };

    let mut meta = SymbolMetadata::default();
    fn set(field: &mut String, value: &Option<String>) {
        if let Some(value) = value {
            field.clone_from(value);
        }
    }
    if let Some(profile) = &data.asset_profile {
        set(&mut meta.sector, &profile.sector);
        set(&mut meta.industry, &profile.industry);
        set(&mut meta.country, &profile.country);
        set(&mut meta.state, &profile.state);
        set(&mut meta.city, &profile.city);
    }
    if let Some(quote_type) = &data.quote_type {
        set(&mut meta.asset_type, &quote_type.quote_type);
        set(&mut meta.exchange, &quote_type.exchange);
        set(&mut meta.short_name, &quote_type.short_name);
        set(&mut meta.long_name, &quote_type.long_name);
    }
    meta.sanitized()
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    /// Quote summary first, then ticker search for whatever it left out.
    /// Fails only if both lookups fail.
    async fn fetch_metadata(&self, symbol: &str) -> Result<SymbolMetadata, CoreError> {
        let summary = self.connector.lock().await.get_ticker_info(symbol).await;
        let mut metadata = match summary {
            Ok(summary) => Some(summary_metadata(&summary)),
            Err(e) => {
                debug!("{PROVIDER} quote summary for {symbol} failed: {e}");
                None
            }
        };

        if metadata.as_ref().map_or(true, |m| m.missing_fields() > 0) {
            match self.search_metadata(symbol).await {
                Ok(found) => metadata
                    .get_or_insert_with(SymbolMetadata::default)
                    .merge(&found),
                Err(e) if metadata.is_none() => return Err(e),
                Err(e) => debug!("{PROVIDER} ticker search for {symbol} failed: {e}"),
            }
        }

        metadata.ok_or_else(|| api_error(format!("No metadata for {symbol}")))
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, CoreError> {
        let resp = match since {
            Some(from) => {
                let start = Self::to_offset_datetime(from)?;
                let end = OffsetDateTime::now_utc();
                self.connector.lock().await.get_quote_history(symbol, start, end).await
            }
            None => {
                self.connector
                    .lock()
                    .await
                    .get_quote_range(symbol, "1d", "max")
                    .await
            }
        }
        .map_err(|e| api_error(format!("Failed to fetch history for {symbol}: {e}")))?;

        let quotes = resp
            .quotes()
            .map_err(|e| api_error(format!("Failed to parse quotes for {symbol}: {e}")))?;

        let mut bars: Vec<PriceBar> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp)?;
                Some(PriceBar {
                    date,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    adj_close: q.adjclose,
                    volume: q.volume,
                })
            })
            .collect();

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::PriceBar;
use crate::models::symbol::SymbolMetadata;
use super::traits::MarketDataProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage provider for company overview metadata and daily history.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (set via settings as "alphavantage").
/// - **Metadata**: sector, industry, country, exchange, asset type, and
///   city/state parsed from the company address.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }
}

fn api_error(message: String) -> CoreError {
    CoreError::Api {
        provider: PROVIDER.into(),
        message,
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OverviewResponse {
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
    #[serde(rename = "AssetType")]
    asset_type: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Exchange")]
    exchange: Option<String>,
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "Address")]
    address: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyAdjusted>>,
}

#[derive(Deserialize)]
struct DailyAdjusted {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. adjusted close")]
    adjusted_close: String,
    #[serde(rename = "6. volume")]
    volume: String,
}

impl OverviewResponse {
    /// Map the overview onto metadata. Alpha Vantage reports missing values
    /// as "None" or "-", which become the sentinel.
    pub fn into_metadata(self) -> SymbolMetadata {
        fn known(v: Option<String>) -> String {
            match v {
                Some(s) if !matches!(s.trim(), "" | "None" | "-") => s,
                _ => String::new(),
            }
        }

        let (city, state) = self
            .address
            .as_deref()
            .map(parse_city_state)
            .unwrap_or_default();

        SymbolMetadata {
            asset_type: known(self.asset_type),
            exchange: known(self.exchange),
            sector: known(self.sector),
            industry: known(self.industry),
            country: known(self.country),
            state,
            city,
            short_name: String::new(),
            long_name: known(self.name),
        }
        .sanitized()
    }
}

/// Pull (city, state) out of an address like
/// `ONE APPLE PARK WAY, CUPERTINO, CA, UNITED STATES`.
/// Needs at least street, city, state and country parts.
pub fn parse_city_state(address: &str) -> (String, String) {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    if parts.len() < 4 {
        return (String::new(), String::new());
    }
    let n = parts.len();
    (parts[n - 3].to_string(), parts[n - 2].to_string())
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketDataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_metadata(&self, symbol: &str) -> Result<SymbolMetadata, CoreError> {
        let resp: OverviewResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "OVERVIEW"),
                ("symbol", &symbol.to_uppercase()),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| api_error(format!("Failed to parse overview for {symbol}: {e}")))?;

        if resp.symbol.is_none() {
            return Err(api_error(format!(
                "No overview data for {symbol}. API limit may be exceeded."
            )));
        }
        Ok(resp.into_metadata())
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, CoreError> {
        let resp: TimeSeriesResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY_ADJUSTED"),
                ("symbol", &symbol.to_uppercase()),
                ("outputsize", "full"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| api_error(format!("Failed to parse time series for {symbol}: {e}")))?;

        let series = resp.time_series.ok_or_else(|| {
            api_error(format!(
                "No time series data for {symbol}. API limit may be exceeded."
            ))
        })?;

        let mut bars: Vec<PriceBar> = series
            .iter()
            .filter_map(|(date_str, d)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                if since.is_some_and(|from| date < from) {
                    return None;
                }
                Some(PriceBar {
                    date,
                    open: d.open.parse().ok()?,
                    high: d.high.parse().ok()?,
                    low: d.low.parse().ok()?,
                    close: d.close.parse().ok()?,
                    adj_close: d.adjusted_close.parse().ok()?,
                    volume: d.volume.parse().unwrap_or(0),
                })
            })
            .collect();

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

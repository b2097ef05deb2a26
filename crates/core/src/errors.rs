use chrono::NaiveDate;
use thiserror::Error;

/// Unified error type for the entire ticker-dashboard-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Filter / Chart Preconditions ────────────────────────────────
    #[error("Invalid filter attribute: {0}")]
    InvalidAttribute(String),

    #[error("Invalid filter mode: {0} (expected Any, All or Exclude)")]
    InvalidMode(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid time period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid price field: {0}")]
    InvalidPriceField(String),

    #[error("Invalid plot style: {0}")]
    InvalidPlotStyle(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Cannot normalize {symbol}: first value in window is zero")]
    ZeroDatum { symbol: String },

    #[error("Price table is empty")]
    EmptyTable,

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("Failed to fetch {symbol}: {message}")]
    FetchFailure { symbol: String, message: String },

    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No market data provider configured")]
    NoProvider,

    // ── Serialization ───────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl CoreError {
    /// Wrap any error raised while retrieving `symbol` as a per-symbol fetch failure.
    pub fn fetch_failure(symbol: impl Into<String>, source: &CoreError) -> Self {
        CoreError::FetchFailure {
            symbol: symbol.into(),
            message: source.to_string(),
        }
    }

    /// Provider-side failures, as opposed to bad data or a bug in this crate.
    #[must_use]
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            CoreError::FetchFailure { .. }
                | CoreError::Api { .. }
                | CoreError::Network(_)
                | CoreError::NoProvider
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL, including the apikey query parameter
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}

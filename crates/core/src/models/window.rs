use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

/// Named look-back periods, measured back from the latest date in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "2Y")]
    TwoYears,
    #[serde(rename = "5Y")]
    FiveYears,
    #[serde(rename = "10Y")]
    TenYears,
    #[serde(rename = "all")]
    All,
}

impl Period {
    pub const ALL: [Period; 9] = [
        Period::OneYear,
        Period::SixMonths,
        Period::ThreeMonths,
        Period::OneMonth,
        Period::OneWeek,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::All,
    ];

    /// Look-back length on a 365-day year. Fractional-month periods are
    /// truncated to whole days (1mo = 30, 3mo = 91, 6mo = 182).
    /// `None` for [`Period::All`].
    #[must_use]
    pub fn length(&self) -> Option<Duration> {
        let days = match self {
            Period::OneWeek => 7,
            Period::OneMonth => 365 / 12,
            Period::ThreeMonths => 365 / 4,
            Period::SixMonths => 365 / 2,
            Period::OneYear => 365,
            Period::TwoYears => 365 * 2,
            Period::FiveYears => 365 * 5,
            Period::TenYears => 365 * 10,
            Period::All => return None,
        };
        Some(Duration::days(days))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Period::OneWeek => "1wk",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1Y",
            Period::TwoYears => "2Y",
            Period::FiveYears => "5Y",
            Period::TenYears => "10Y",
            Period::All => "all",
        };
        write!(f, "{label}")
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.to_string() == s.trim())
            .ok_or_else(|| CoreError::InvalidPeriod(s.to_string()))
    }
}

/// Date window requested for a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowSpec {
    Named(Period),
    /// Inclusive bounds, clamped to the table's date range.
    Manual { start: NaiveDate, end: NaiveDate },
}

impl Default for WindowSpec {
    fn default() -> Self {
        WindowSpec::Named(Period::default())
    }
}

impl From<Period> for WindowSpec {
    fn from(period: Period) -> Self {
        WindowSpec::Named(period)
    }
}
